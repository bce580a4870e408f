//! Droidbench Device Control
//!
//! Thin adb wrapper for the device-side operations the benchmark needs:
//! toggling the accessibility overlay, enabling the accessibility service,
//! installing the portal APK, and connecting to remote devices. Commands are
//! executed as `adb -s <serial> ...` subprocesses via `tokio::process`.

mod accessibility;
mod adb;
mod error;

use async_trait::async_trait;

pub use accessibility::{COMBINED_A11Y_SERVICES, FORWARDER_A11Y_SERVICE, PORTAL_A11Y_SERVICE};
pub use adb::AdbController;
pub use error::DeviceError;

/// Ability to suppress the device-side overlay.
///
/// The overlay keepalive depends on this capability rather than on adb
/// directly, so tests can count toggle commands without a device.
#[async_trait]
pub trait OverlayToggle: Send + Sync {
    /// Issue a single "hide overlay" command to the device.
    async fn disable_overlay(&self) -> Result<(), DeviceError>;
}

/// Ability to (re-)enable the device-side accessibility capability.
#[async_trait]
pub trait CapabilityControl: Send + Sync {
    /// Enable the accessibility service the agent relies on, optionally
    /// clearing any previously enabled services first.
    async fn enable_capability(&self, disable_first: bool) -> Result<(), DeviceError>;
}
