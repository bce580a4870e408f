//! Accessibility service enablement.
//!
//! The agent relies on the portal accessibility service for UI introspection;
//! the environment's own forwarder service must stay enabled alongside it, so
//! both are written as one colon-separated settings value.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::adb::AdbController;
use crate::error::DeviceError;
use crate::CapabilityControl;

/// Accessibility service of the on-device portal.
pub const PORTAL_A11Y_SERVICE: &str =
    "com.droidrun.portal/com.droidrun.portal.DroidrunAccessibilityService";

/// Accessibility forwarder the environment uses for its own event stream.
pub const FORWARDER_A11Y_SERVICE: &str = "com.google.androidenv.accessibilityforwarder/com.google.androidenv.accessibilityforwarder.AccessibilityForwarder";

/// Settings value enabling both services at once.
pub const COMBINED_A11Y_SERVICES: &str = "com.droidrun.portal/com.droidrun.portal.DroidrunAccessibilityService:com.google.androidenv.accessibilityforwarder/com.google.androidenv.accessibilityforwarder.AccessibilityForwarder";

/// Delay after clearing the enabled-services list, letting the system settle
/// before the new value is written.
const DISABLE_SETTLE: Duration = Duration::from_secs(2);

/// Delay after each settings write.
const ENABLE_SETTLE: Duration = Duration::from_secs(1);

#[async_trait]
impl CapabilityControl for AdbController {
    async fn enable_capability(&self, disable_first: bool) -> Result<(), DeviceError> {
        info!(serial = %self.serial(), "configuring accessibility services");

        if disable_first {
            match self
                .shell(&[
                    "settings",
                    "put",
                    "secure",
                    "enabled_accessibility_services",
                    "''",
                ])
                .await
            {
                Ok(_) => debug!("cleared enabled accessibility services"),
                // Clearing is best-effort; the enable below still overwrites
                // the full list.
                Err(e) => warn!(error = %e, "could not clear accessibility services"),
            }
            tokio::time::sleep(DISABLE_SETTLE).await;
        }

        self.shell(&[
            "settings",
            "put",
            "secure",
            "enabled_accessibility_services",
            COMBINED_A11Y_SERVICES,
        ])
        .await?;
        tokio::time::sleep(ENABLE_SETTLE).await;

        self.shell(&["settings", "put", "secure", "accessibility_enabled", "1"])
            .await?;
        tokio::time::sleep(ENABLE_SETTLE).await;

        debug!(serial = %self.serial(), "accessibility services enabled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_value_joins_both_services() {
        assert_eq!(
            COMBINED_A11Y_SERVICES,
            format!("{PORTAL_A11Y_SERVICE}:{FORWARDER_A11Y_SERVICE}")
        );
    }
}
