//! Device control errors.

use thiserror::Error;

/// Errors that can occur while driving the device over adb.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Failed to spawn the adb process.
    #[error("Failed to spawn adb: {0}")]
    Spawn(#[from] std::io::Error),

    /// adb exited with a non-zero status.
    #[error("adb {command:?} exited with code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },
}
