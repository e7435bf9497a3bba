//! SSH server bootstrap: one [`SessionHandler`] per accepted connection,
//! sharing an immutable [`AppState`].

mod error;
mod exec_attach;
mod handler;
mod port_forward;
mod sftp_bridge;
mod spinner;

use std::{net::SocketAddr, sync::Arc};

pub use self::{error::Error, handler::SessionHandler};
use crate::{auth::Authenticator, config::Settings, pod::PodLocks};

/// Shared, immutable state handed to every connection's [`SessionHandler`].
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub kube_client: kube::Client,
    pub pod_locks: PodLocks,
    pub authenticator: Arc<dyn Authenticator>,
}

/// Builds a fresh [`SessionHandler`] for every accepted connection.
pub struct Server {
    state: AppState,
}

impl Server {
    #[must_use]
    pub fn new(state: AppState) -> Self { Self { state } }
}

impl russh::server::Server for Server {
    type Handler = SessionHandler;

    fn new_client(&mut self, peer_addr: Option<SocketAddr>) -> Self::Handler {
        SessionHandler::new(self.state.clone(), peer_addr)
    }

    fn handle_session_error(&mut self, error: <Self::Handler as russh::server::Handler>::Error) {
        tracing::warn!("session ended with error: {error}");
    }
}
