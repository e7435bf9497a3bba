use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("{source}"))]
    Configuration { source: crate::config::Error },

    #[snafu(display("{source}"))]
    Session { source: crate::session::Error },

    #[snafu(display("{source}"))]
    Ssh { source: crate::ssh::Error },

    #[snafu(display("failed to initialize Kubernetes client, error: {source}"))]
    KubeConfig { source: kube::Error },

    #[snafu(display("failed to generate an ephemeral host key"))]
    GenerateHostKey,

    #[snafu(display("failed to serve the SSH listener on {listen_address}, error: {source}"))]
    RunServer { listen_address: String, source: std::io::Error },
}

impl From<crate::config::Error> for Error {
    fn from(source: crate::config::Error) -> Self { Self::Configuration { source } }
}

impl From<crate::session::Error> for Error {
    fn from(source: crate::session::Error) -> Self { Self::Session { source } }
}

impl From<crate::ssh::Error> for Error {
    fn from(source: crate::ssh::Error) -> Self { Self::Ssh { source } }
}
