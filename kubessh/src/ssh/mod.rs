//! Loads the server's host key off disk.

mod error;

use std::path::Path;

use russh::keys::PrivateKey;
use snafu::ResultExt;

pub use self::error::Error;

/// Reads and decodes a host key file. The key is never password-protected:
/// host keys live on the server's own filesystem with no interactive prompt
/// available to supply a passphrase.
pub async fn load_secret_key<P: AsRef<Path>>(secret_key_file_path: P) -> Result<PrivateKey, Error> {
    let secret = tokio::fs::read_to_string(secret_key_file_path.as_ref())
        .await
        .with_context(|_| error::ReadSshPrivateKeySnafu {
            file_path: secret_key_file_path.as_ref().to_path_buf(),
        })?;
    russh::keys::decode_secret_key(secret.trim(), None).map_err(|_| {
        error::ParseSshPrivateKeySnafu { file_path: secret_key_file_path.as_ref().to_path_buf() }.build()
    })
}
