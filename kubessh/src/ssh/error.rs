//! Errors from loading a host key off disk.

use std::path::PathBuf;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("failed to read host key file {}, error: {source}", file_path.display()))]
    ReadSshPrivateKey { file_path: PathBuf, source: std::io::Error },

    #[snafu(display("failed to parse host key file {}", file_path.display()))]
    ParseSshPrivateKey { file_path: PathBuf },
}
