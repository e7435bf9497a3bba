//! `kubessh` is an SSH server that attaches sessions directly to per-user
//! Kubernetes pods: logging in as a user reconciles (creating if absent) a
//! deterministically-named pod and drops the session into a shell, `exec`,
//! SFTP transfer, or port forward running against it.

mod auth;
mod config;
mod consts;
mod error;
mod pod;
mod session;
mod ssh;

/// Build-time information embedded via `shadow-rs`: version, commit hash,
/// build date.
mod shadow {
    #![allow(clippy::needless_raw_string_hashes)]
    use shadow_rs::shadow;
    shadow!(build);

    pub use self::build::*;
}

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use rand::rngs::OsRng;
use russh::keys::{Algorithm, PrivateKey};
use snafu::ResultExt;

pub use self::error::Error;
use self::{
    auth::{Authenticator, DummyAuthenticator, GithubAuthenticator, GitlabAuthenticator},
    config::{AuthKind, Settings},
    session::AppState,
};

/// An SSH server that attaches sessions to per-user Kubernetes pods.
#[derive(Parser)]
#[command(name = "kubessh", author, version, long_version = shadow::CLAP_LONG_VERSION)]
struct Cli {
    /// Path to the configuration file.
    #[clap(
        long = "config",
        short = 'c',
        env = "KUBESSH_CONFIG_FILE_PATH",
        help = "Path to the configuration file"
    )]
    config_file: Option<PathBuf>,

    /// Overrides the configured listen address.
    #[clap(long = "listen-address", env = "KUBESSH_LISTEN_ADDRESS")]
    listen_address: Option<String>,
}

impl Cli {
    fn load_settings(&self) -> Result<Settings, Error> {
        let mut settings =
            Settings::load(self.config_file.clone().unwrap_or_else(Settings::search_config_file_path))?;
        if let Some(listen_address) = &self.listen_address {
            settings.listen_address = listen_address.clone();
        }
        Ok(settings)
    }
}

fn build_authenticator(settings: &Settings) -> Arc<dyn Authenticator> {
    match settings.auth.kind {
        AuthKind::Dummy => Arc::new(DummyAuthenticator::default()),
        AuthKind::Github => Arc::new(GithubAuthenticator::new(settings.auth.github.allowed_users.clone())),
        AuthKind::Gitlab => Arc::new(GitlabAuthenticator::new(
            settings.auth.gitlab.instance_url.clone(),
            settings.auth.gitlab.allowed_users.clone(),
        )),
    }
}

/// Loads the configured host key, or generates and logs the fingerprint of
/// an ephemeral one. Ephemeral keys mean every restart invalidates clients'
/// known_hosts entries; operators who care about that set `hostKeyPath`.
async fn load_or_generate_host_key(settings: &Settings) -> Result<PrivateKey, Error> {
    if let Some(path) = &settings.host_key_path {
        return ssh::load_secret_key(path).await.map_err(Into::into);
    }

    let key = PrivateKey::random(&mut OsRng, Algorithm::Ed25519).map_err(|_| Error::GenerateHostKey)?;
    let public_key = key.public_key().to_openssh().unwrap_or_default();
    tracing::warn!(public_key, "no hostKeyPath configured, generated an ephemeral Ed25519 host key");
    Ok(key)
}

async fn run(cli: Cli) -> Result<(), Error> {
    let settings = cli.load_settings()?;
    settings.log.registry();

    let kube_client = kube::Client::try_default().await.context(error::KubeConfigSnafu)?;
    let host_key = load_or_generate_host_key(&settings).await?;
    let listen_address = settings.listen_address.clone();

    let state = AppState {
        authenticator: build_authenticator(&settings),
        settings: Arc::new(settings),
        kube_client,
        pod_locks: pod::PodLocks::new(),
    };

    let config = Arc::new(russh::server::Config {
        keys: vec![host_key],
        keepalive_interval: Some(consts::SSH_KEEPALIVE_INTERVAL),
        ..Default::default()
    });

    tracing::info!(%listen_address, "listening");
    let mut server = session::Server::new(state);
    russh::server::Server::run_on_address(&mut server, config, &listen_address)
        .await
        .context(error::RunServerSnafu { listen_address })
}

fn main() {
    let cli = Cli::parse();
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start the async runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(run(cli)) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
