//! Environment boot sequence.

use std::error::Error;
use std::path::Path;
use std::time::Duration;

use tracing::info;

use droidbench_device::{AdbController, CapabilityControl};
use droidbench_env::EnvClient;

/// How long to wait for the environment to report healthy.
const BOOT_TIMEOUT: Duration = Duration::from_secs(300);

/// Bring the environment and device to a runnable state: wait for the
/// environment's health endpoint, install the portal APK when a path is
/// given, and make sure the accessibility capability can be enabled.
pub async fn boot_environment(
    env: &EnvClient,
    adb: &AdbController,
    portal_apk: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    info!(base_url = %env.base_url(), "waiting for environment to become ready");
    env.wait_ready(BOOT_TIMEOUT).await?;
    info!(base_url = %env.base_url(), "environment is ready");

    if let Some(apk) = portal_apk {
        info!(apk = %apk.display(), "installing portal");
        adb.install_apk(apk, true).await?;
        info!("portal installed");
    }

    adb.enable_capability(false).await?;
    info!(serial = %adb.serial(), "device is ready");

    Ok(())
}
