//! Settings for staging the static SFTP server binary into user pods.

use serde::{Deserialize, Serialize};

use crate::consts;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SftpSettings {
    /// Path to the static SFTP server binary inside the server image.
    #[serde(default = "SftpSettings::default_static_binary_path")]
    pub static_binary_path: std::path::PathBuf,

    /// Path inside the user pod the binary is staged to before being run.
    #[serde(default = "SftpSettings::default_remote_path")]
    pub remote_path: String,

    /// Directory template (`{username}` substituted) created with `mkdir -p`
    /// before the binary is staged.
    #[serde(default = "SftpSettings::default_home_directory")]
    pub home_directory: String,
}

impl SftpSettings {
    fn default_static_binary_path() -> std::path::PathBuf {
        consts::DEFAULT_SFTP_STATIC_BINARY_PATH.into()
    }

    fn default_remote_path() -> String { consts::DEFAULT_SFTP_REMOTE_PATH.to_string() }

    fn default_home_directory() -> String { "/home/{username}".to_string() }
}

impl Default for SftpSettings {
    fn default() -> Self {
        Self {
            static_binary_path: Self::default_static_binary_path(),
            remote_path: Self::default_remote_path(),
            home_directory: Self::default_home_directory(),
        }
    }
}
