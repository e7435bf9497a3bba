//! Per-connection cache of supervised port-forward helpers.
//!
//! Each cached entry owns a local ephemeral `TcpListener`; every connection
//! accepted on it opens a fresh `kube::Api::portforward` stream into the pod
//! and splices the two bidirectionally. Entries are keyed by `(pod_name,
//! target_port)` so repeated direct-TCP channels on one SSH connection reuse
//! the same local port. Supervision uses a `CancellationToken` rather than a
//! process-wide signal handler, since the cache's helpers are torn down with
//! the owning connection rather than the process.

use std::collections::HashMap;

use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use snafu::ResultExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use super::error::{self, Error};

pub struct ForwardCache {
    pod_api: Api<Pod>,
    pod_name: String,
    cancel_token: CancellationToken,
    local_ports: HashMap<u16, u16>,
}

impl ForwardCache {
    pub fn new(pod_api: Api<Pod>, pod_name: String) -> Self {
        Self { pod_api, pod_name, cancel_token: CancellationToken::new(), local_ports: HashMap::new() }
    }

    /// Returns the local port forwarding to `target_port`, spawning a
    /// supervised helper on first use. Subsequent calls for the same
    /// `target_port` on this connection return the same port.
    pub async fn local_port_for(&mut self, target_port: u16) -> Result<u16, Error> {
        if let Some(&local_port) = self.local_ports.get(&target_port) {
            return Ok(local_port);
        }

        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .with_context(|_| error::BindTcpSocketSnafu { socket_address: local_bind_addr() })?;
        let local_port = listener
            .local_addr()
            .with_context(|_| error::BindTcpSocketSnafu { socket_address: local_bind_addr() })?
            .port();

        let pod_api = self.pod_api.clone();
        let pod_name = self.pod_name.clone();
        let cancel_token = self.cancel_token.clone();
        tokio::spawn(async move {
            run_helper(listener, pod_api, pod_name, target_port, cancel_token).await;
        });

        probe_ready(local_port).await;
        self.local_ports.insert(target_port, local_port);
        Ok(local_port)
    }

    /// Connects to an entry's local port. Caller is responsible for splicing
    /// the returned stream with the SSH channel.
    pub async fn dial(local_port: u16) -> Result<TcpStream, Error> {
        TcpStream::connect(("127.0.0.1", local_port))
            .await
            .with_context(|_| error::BindTcpSocketSnafu { socket_address: local_bind_addr() })
    }
}

impl Drop for ForwardCache {
    /// Terminates every helper owned by this connection.
    fn drop(&mut self) { self.cancel_token.cancel(); }
}

fn local_bind_addr() -> std::net::SocketAddr {
    std::net::SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST), 0)
}

async fn run_helper(
    listener: TcpListener,
    pod_api: Api<Pod>,
    pod_name: String,
    target_port: u16,
    cancel_token: CancellationToken,
) {
    loop {
        let accepted = tokio::select! {
            () = cancel_token.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        let Ok((mut local_stream, _peer)) = accepted else { break };

        let pod_api = pod_api.clone();
        let pod_name = pod_name.clone();
        tokio::spawn(async move {
            let stream_res =
                pod_api.portforward(&pod_name, &[target_port]).await.map(|mut pf| pf.take_stream(target_port));

            let mut pod_stream = match stream_res {
                Ok(Some(stream)) => stream,
                Ok(None) => return,
                Err(source) => {
                    tracing::warn!(
                        "{}",
                        error::CreatePodStreamSnafu { pod_name, target_port, source: Box::new(source) }
                            .build()
                    );
                    return;
                }
            };

            if let Err(err) = tokio::io::copy_bidirectional(&mut local_stream, &mut pod_stream).await {
                tracing::warn!("port-forward stream to {pod_name}:{target_port} closed: {err}");
            }
        });
    }
}

async fn probe_ready(local_port: u16) {
    for _ in 0..50 {
        if TcpStream::connect(("127.0.0.1", local_port)).await.is_ok() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}
