//! Stages and runs the static SFTP server binary inside a user's pod, and
//! relays the raw SFTP wire protocol between the SSH `sftp` subsystem channel
//! and the staged process's stdio.
//!
//! The two directions are asymmetric. Bytes arriving from the SSH channel are
//! already-stripped SFTP packet bodies (`russh` hands subsystem data as plain
//! channel data, with no framing of its own) so a 4-byte big-endian length
//! prefix has to be re-added before they reach the delegate's stdin. Bytes
//! read from the delegate's stdout are already valid SFTP-wire frames (each
//! one carries its own 4-byte length header) and must be relayed unchanged.

use std::pin::Pin;

use k8s_openapi::api::core::v1::Pod;
use kube::{Api, api::AttachParams};
use russh::{ChannelId, CryptoVec, server};
use snafu::{OptionExt, ResultExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::error::{self, Error};
use crate::config::SftpSettings;

/// The write half of a staged SFTP delegate process.
pub struct SftpInput {
    stdin: Pin<Box<dyn AsyncWrite + Send>>,
}

impl SftpInput {
    /// Forwards one SFTP packet body arriving from the SSH channel,
    /// prefixing it with the 4-byte length header the delegate expects.
    pub async fn send_packet(&mut self, body: &[u8]) -> std::io::Result<()> {
        let len = u32::try_from(body.len()).unwrap_or(u32::MAX);
        self.stdin.write_all(&len.to_be_bytes()).await?;
        self.stdin.write_all(body).await?;
        self.stdin.flush().await
    }

    pub async fn send_eof(&mut self) -> std::io::Result<()> { self.stdin.shutdown().await }
}

/// Ensures `home_directory` exists in the pod, stages the static SFTP server
/// binary into it, starts it, and wires its output back to `channel_id`.
pub async fn start(
    pod_api: Api<Pod>,
    namespace: &str,
    pod_name: &str,
    container: &str,
    username: &str,
    settings: &SftpSettings,
    channel_id: ChannelId,
    handle: server::Handle,
) -> Result<SftpInput, Error> {
    let home_directory = settings.home_directory.replace("{username}", &crate::pod::escape(username));

    run_to_completion(
        &pod_api,
        namespace,
        pod_name,
        container,
        vec!["sh".to_string(), "-c".to_string(), format!("mkdir -p {home_directory}")],
    )
    .await?;

    let binary = tokio::fs::read(&settings.static_binary_path)
        .await
        .with_context(|_| error::ReadSftpBinarySnafu { path: settings.static_binary_path.clone() })?;
    stage_binary(&pod_api, namespace, pod_name, container, &settings.remote_path, binary).await?;

    let mut attached = pod_api
        .exec(pod_name, vec![settings.remote_path.clone()], &AttachParams {
            container: Some(container.to_string()),
            stdin: true,
            stdout: true,
            stderr: false,
            tty: false,
            ..AttachParams::default()
        })
        .await
        .with_context(|_| error::AttachSnafu {
            namespace: namespace.to_string(),
            pod_name: pod_name.to_string(),
        })?;

    let stdin = attached.stdin().context(error::AttachStreamSnafu { stream: "stdin" })?;
    let stdout = attached.stdout().context(error::AttachStreamSnafu { stream: "stdout" })?;

    tokio::spawn(async move {
        relay_outgoing(stdout, channel_id, &handle).await;
        let _unused = attached.join().await;
        let _unused = handle.eof(channel_id).await;
        let _unused = handle.close(channel_id).await;
    });

    Ok(SftpInput { stdin: Box::pin(stdin) })
}

/// Runs `command` to completion in the pod and discards its output, used for
/// the `mkdir -p` staging step.
async fn run_to_completion(
    pod_api: &Api<Pod>,
    namespace: &str,
    pod_name: &str,
    container: &str,
    command: Vec<String>,
) -> Result<(), Error> {
    let mut attached = pod_api
        .exec(pod_name, command, &AttachParams {
            container: Some(container.to_string()),
            stdin: false,
            stdout: false,
            stderr: false,
            tty: false,
            ..AttachParams::default()
        })
        .await
        .with_context(|_| error::AttachSnafu {
            namespace: namespace.to_string(),
            pod_name: pod_name.to_string(),
        })?;
    attached.join().await.with_context(|_| error::StageSftpBinarySnafu { pod_name: pod_name.to_string() })
}

/// Streams `binary`'s bytes into `cat > {remote_path} && chmod +x
/// {remote_path}` run inside the pod.
async fn stage_binary(
    pod_api: &Api<Pod>,
    namespace: &str,
    pod_name: &str,
    container: &str,
    remote_path: &str,
    binary: Vec<u8>,
) -> Result<(), Error> {
    let command = vec!["sh".to_string(), "-c".to_string(), format!("cat > {remote_path} && chmod +x {remote_path}")];
    let mut attached = pod_api
        .exec(pod_name, command, &AttachParams {
            container: Some(container.to_string()),
            stdin: true,
            stdout: false,
            stderr: false,
            tty: false,
            ..AttachParams::default()
        })
        .await
        .with_context(|_| error::AttachSnafu {
            namespace: namespace.to_string(),
            pod_name: pod_name.to_string(),
        })?;

    let mut stdin = attached.stdin().context(error::AttachStreamSnafu { stream: "stdin" })?;
    stdin
        .write_all(&binary)
        .await
        .with_context(|_| error::StageSftpBinarySnafu { pod_name: pod_name.to_string() })?;
    stdin.shutdown().await.with_context(|_| error::StageSftpBinarySnafu { pod_name: pod_name.to_string() })?;
    drop(stdin);

    attached.join().await.with_context(|_| error::StageSftpBinarySnafu { pod_name: pod_name.to_string() })
}

/// Relays the delegate's stdout to the SSH channel byte-for-byte: each SFTP
/// frame already carries its own 4-byte length header, so no reframing is
/// needed in this direction.
async fn relay_outgoing(mut stdout: impl AsyncRead + Unpin, channel_id: ChannelId, handle: &server::Handle) {
    let mut buffer = vec![0u8; 32 * 1024];
    loop {
        match stdout.read(&mut buffer).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if handle.data(channel_id, CryptoVec::from(buffer[..n].to_vec())).await.is_err() {
                    break;
                }
            }
        }
    }
}
