//! adb subprocess execution.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::DeviceError;
use crate::OverlayToggle;

/// Broadcast that hides the portal's visual overlay.
const TOGGLE_OVERLAY_BROADCAST: &[&str] = &[
    "am",
    "broadcast",
    "-a",
    "com.droidrun.portal.TOGGLE_OVERLAY",
    "--ez",
    "overlay_visible",
    "false",
];

/// Drives one device through the adb binary.
#[derive(Debug, Clone)]
pub struct AdbController {
    adb_path: String,
    serial: String,
}

impl AdbController {
    /// Create a controller for the device with the given serial.
    ///
    /// `adb_path` can be just "adb" to use PATH lookup, or a full path.
    pub fn new(adb_path: impl Into<String>, serial: impl Into<String>) -> Self {
        Self {
            adb_path: adb_path.into(),
            serial: serial.into(),
        }
    }

    /// Serial of the device this controller is bound to.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Run an adb command against this device and return its stdout.
    pub async fn run(&self, args: &[&str]) -> Result<String, DeviceError> {
        trace!(serial = %self.serial, ?args, "running adb command");

        let output = Command::new(&self.adb_path)
            .arg("-s")
            .arg(&self.serial)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(DeviceError::CommandFailed {
                command: args.join(" "),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run a shell command on the device.
    pub async fn shell(&self, args: &[&str]) -> Result<String, DeviceError> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push("shell");
        full.extend_from_slice(args);
        self.run(&full).await
    }

    /// Install an APK, optionally replacing an existing install. Runtime
    /// permissions are granted at install time.
    pub async fn install_apk(&self, apk: &Path, reinstall: bool) -> Result<(), DeviceError> {
        let apk = apk.to_string_lossy();
        let args = install_args(&apk, reinstall);
        debug!(serial = %self.serial, apk = %apk, "installing APK");
        self.run(&args.iter().map(String::as_str).collect::<Vec<_>>())
            .await?;
        Ok(())
    }

    /// Connect adb to a remote device endpoint.
    pub async fn connect(adb_path: &str, host: &str, port: u16) -> Result<(), DeviceError> {
        let endpoint = format!("{host}:{port}");
        debug!(endpoint = %endpoint, "connecting to device");

        let output = Command::new(adb_path)
            .arg("connect")
            .arg(&endpoint)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(DeviceError::CommandFailed {
                command: format!("connect {endpoint}"),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl OverlayToggle for AdbController {
    async fn disable_overlay(&self) -> Result<(), DeviceError> {
        self.shell(TOGGLE_OVERLAY_BROADCAST).await?;
        trace!(serial = %self.serial, "overlay disabled once");
        Ok(())
    }
}

fn install_args(apk: &str, reinstall: bool) -> Vec<String> {
    let mut args = vec!["install".to_string()];
    if reinstall {
        args.push("-r".to_string());
    }
    args.push("-g".to_string());
    args.push(apk.to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_args_with_reinstall() {
        assert_eq!(
            install_args("/tmp/portal.apk", true),
            vec!["install", "-r", "-g", "/tmp/portal.apk"]
        );
    }

    #[test]
    fn test_install_args_fresh() {
        assert_eq!(
            install_args("portal.apk", false),
            vec!["install", "-g", "portal.apk"]
        );
    }

    #[test]
    fn test_overlay_broadcast_targets_portal() {
        assert!(TOGGLE_OVERLAY_BROADCAST.contains(&"com.droidrun.portal.TOGGLE_OVERLAY"));
        assert_eq!(TOGGLE_OVERLAY_BROADCAST.last(), Some(&"false"));
    }
}
