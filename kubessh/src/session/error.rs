use std::{net::SocketAddr, path::PathBuf};

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("{source}"))]
    Reconcile { source: crate::pod::Error },

    #[snafu(display("failed to attach to pod {pod_name} in namespace {namespace}, error: {source}"))]
    Attach {
        namespace: String,
        pod_name: String,
        #[snafu(source(from(kube::Error, Box::new)))]
        source: Box<kube::Error>,
    },

    #[snafu(display("{stream} stream requested from attached process but missing"))]
    AttachStream { stream: &'static str },

    #[snafu(display("failed to get terminal size writer for attached process"))]
    GetTerminalSizeWriter,

    #[snafu(display("failed to send terminal size update to attached process"))]
    ChangeTerminalSize,

    #[snafu(display("failed to bind TCP socket {socket_address}, error: {source}"))]
    BindTcpSocket { socket_address: SocketAddr, source: std::io::Error },

    #[snafu(display("failed to accept TCP socket {socket_address}, error: {source}"))]
    AcceptTcpSocket { socket_address: SocketAddr, source: std::io::Error },

    #[snafu(display("failed to open port-forward stream to {pod_name}:{target_port}, error: {source}"))]
    CreatePodStream {
        pod_name: String,
        target_port: u16,
        #[snafu(source(from(kube::Error, Box::new)))]
        source: Box<kube::Error>,
    },

    #[snafu(display("error copying bytes bidirectionally, error: {source}"))]
    CopyBidirectionalIo { source: std::io::Error },

    #[snafu(display("failed to read static SFTP server binary at {}, error: {source}", path.display()))]
    ReadSftpBinary { path: PathBuf, source: std::io::Error },

    #[snafu(display("failed to stage SFTP server binary into pod {pod_name}, error: {source}"))]
    StageSftpBinary {
        pod_name: String,
        #[snafu(source(from(kube::Error, Box::new)))]
        source: Box<kube::Error>,
    },

    #[snafu(display("ssh protocol error, error: {source}"))]
    Ssh { source: russh::Error },
}

impl From<russh::Error> for Error {
    fn from(source: russh::Error) -> Self { Self::Ssh { source } }
}
