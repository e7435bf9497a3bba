//! Per-connection `russh` server handler.
//!
//! One `SessionHandler` is built per accepted TCP connection. It owns
//! nothing about the pod until authentication succeeds and a username is
//! known; after that, every exec/shell/sftp/direct-tcpip request on the
//! connection is served against that one deterministic pod.

use std::{collections::HashMap, net::SocketAddr};

use futures::StreamExt;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod};
use kube::Api;
use russh::{
    Channel, ChannelId, CryptoVec, MethodSet, Pty,
    keys::PublicKey,
    server::{Auth, Handle, Handler, Msg, Session},
};
use snafu::ResultExt;

use super::{
    AppState,
    error::{self, Error},
    exec_attach::{self, AttachedInput, PtyRequest},
    port_forward::ForwardCache,
    sftp_bridge::{self, SftpInput},
    spinner::Spinner,
};
use crate::{consts, pod};

enum ChannelInput {
    Exec(AttachedInput),
    Sftp(SftpInput),
}

pub struct SessionHandler {
    state: AppState,
    peer_addr: Option<SocketAddr>,
    username: Option<String>,
    authorized_keys: Vec<PublicKey>,
    user_pod: Option<pod::UserPod>,
    ptys: HashMap<ChannelId, PtyRequest>,
    inputs: HashMap<ChannelId, ChannelInput>,
    forward_cache: Option<ForwardCache>,
}

impl SessionHandler {
    #[must_use]
    pub fn new(state: AppState, peer_addr: Option<SocketAddr>) -> Self {
        Self {
            state,
            peer_addr,
            username: None,
            authorized_keys: Vec::new(),
            user_pod: None,
            ptys: HashMap::new(),
            inputs: HashMap::new(),
            forward_cache: None,
        }
    }

    async fn load_authorized_keys(&mut self, user: &str) {
        if self.username.as_deref() != Some(user) {
            self.authorized_keys = self.state.authenticator.begin_auth(user).await;
        }
    }

    fn finalize_auth(&mut self, user: &str) {
        let namespace = self.state.settings.resolve_default_namespace();
        self.user_pod = Some(pod::UserPod::new(
            user,
            namespace,
            self.state.settings.pod_template.clone(),
            self.state.settings.pvc_templates.clone(),
        ));
        self.username = Some(user.to_string());
        tracing::info!(user, peer_addr = ?self.peer_addr, "authenticated");
    }

    /// Drives the connection's pod to `Running`, relaying spinner frames to
    /// `channel` while it reconciles. Returns the namespaced pod API handle
    /// once ready.
    async fn ensure_pod_running(&mut self, channel: ChannelId, handle: &Handle) -> Result<Api<Pod>, Error> {
        self.ensure_pod_running_with_feedback(Some((channel, handle))).await
    }

    /// Drives the connection's pod to `Running` without writing spinner
    /// frames anywhere, for callers whose channel is a raw byte stream
    /// (direct-tcpip) rather than a terminal.
    async fn ensure_pod_running_silent(&mut self) -> Result<Api<Pod>, Error> {
        self.ensure_pod_running_with_feedback(None).await
    }

    async fn ensure_pod_running_with_feedback(
        &mut self,
        feedback: Option<(ChannelId, &Handle)>,
    ) -> Result<Api<Pod>, Error> {
        let user_pod = self.user_pod.clone().expect("username resolved before any channel request");
        let pod_api: Api<Pod> = Api::namespaced(self.state.kube_client.clone(), &user_pod.namespace);
        let pvc_api: Api<PersistentVolumeClaim> =
            Api::namespaced(self.state.kube_client.clone(), &user_pod.namespace);

        let stream =
            pod::ensure_running(pod_api.clone(), pvc_api, self.state.pod_locks.clone(), user_pod);
        futures::pin_mut!(stream);

        let mut spinner = Spinner::new();
        while let Some(state) = stream.next().await {
            let state = state.context(error::ReconcileSnafu)?;
            if let Some((channel, handle)) = feedback {
                let frame = spinner.render(state);
                if !frame.is_empty() {
                    let _unused = handle.data(channel, CryptoVec::from(frame)).await;
                }
            }
            if state == pod::PodState::Running {
                break;
            }
        }

        Ok(pod_api)
    }
}

impl Handler for SessionHandler {
    type Error = Error;

    async fn auth_publickey_offered(
        &mut self,
        user: &str,
        key: &PublicKey,
    ) -> Result<Auth, Self::Error> {
        self.load_authorized_keys(user).await;
        if self.authorized_keys.contains(key) {
            Ok(Auth::Accept)
        } else {
            Ok(Auth::Reject { proceed_with_methods: Some(MethodSet::PASSWORD) })
        }
    }

    async fn auth_publickey(&mut self, user: &str, key: &PublicKey) -> Result<Auth, Self::Error> {
        if self.authorized_keys.contains(key) {
            self.finalize_auth(user);
            Ok(Auth::Accept)
        } else {
            Ok(Auth::Reject { proceed_with_methods: None })
        }
    }

    async fn auth_password(&mut self, user: &str, password: &str) -> Result<Auth, Self::Error> {
        if self.state.authenticator.password(user, password).await {
            self.finalize_auth(user);
            Ok(Auth::Accept)
        } else {
            Ok(Auth::Reject { proceed_with_methods: None })
        }
    }

    async fn channel_open_session(
        &mut self,
        _channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }

    async fn pty_request(
        &mut self,
        channel: ChannelId,
        _term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let _unused = self.ptys.insert(channel, PtyRequest { col_width, row_height });
        session.channel_success(channel);
        Ok(())
    }

    async fn shell_request(&mut self, channel: ChannelId, session: &mut Session) -> Result<(), Self::Error> {
        let handle = session.handle();
        let pod_api = self.ensure_pod_running(channel, &handle).await?;
        let user_pod = self.user_pod.clone().expect("username resolved before any channel request");
        let pty = self.ptys.get(&channel).copied();
        let command = vec![consts::DEFAULT_LOGIN_SHELL.to_string()];

        let input = exec_attach::attach(
            pod_api,
            &user_pod.namespace,
            &user_pod.pod_name,
            consts::SHELL_CONTAINER_NAME,
            command,
            pty.as_ref(),
            channel,
            handle,
        )
        .await?;
        let _unused = self.inputs.insert(channel, ChannelInput::Exec(input));
        session.channel_success(channel);
        Ok(())
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let command_line = String::from_utf8_lossy(data).into_owned();
        let command = shlex::split(&command_line).unwrap_or_else(|| vec![command_line.clone()]);

        let handle = session.handle();
        let pod_api = self.ensure_pod_running(channel, &handle).await?;
        let user_pod = self.user_pod.clone().expect("username resolved before any channel request");
        let pty = self.ptys.get(&channel).copied();

        let input = exec_attach::attach(
            pod_api,
            &user_pod.namespace,
            &user_pod.pod_name,
            consts::SHELL_CONTAINER_NAME,
            command,
            pty.as_ref(),
            channel,
            handle,
        )
        .await?;
        let _unused = self.inputs.insert(channel, ChannelInput::Exec(input));
        session.channel_success(channel);
        Ok(())
    }

    async fn subsystem_request(
        &mut self,
        channel: ChannelId,
        name: &str,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        if name != "sftp" {
            session.channel_failure(channel);
            return Ok(());
        }

        let handle = session.handle();
        let pod_api = self.ensure_pod_running(channel, &handle).await?;
        let user_pod = self.user_pod.clone().expect("username resolved before any channel request");

        let input = sftp_bridge::start(
            pod_api,
            &user_pod.namespace,
            &user_pod.pod_name,
            consts::SHELL_CONTAINER_NAME,
            &user_pod.username,
            &self.state.settings.sftp,
            channel,
            handle,
        )
        .await?;
        let _unused = self.inputs.insert(channel, ChannelInput::Sftp(input));
        session.channel_success(channel);
        Ok(())
    }

    async fn data(&mut self, channel: ChannelId, data: &[u8], _session: &mut Session) -> Result<(), Self::Error> {
        match self.inputs.get_mut(&channel) {
            Some(ChannelInput::Exec(input)) => {
                let _unused = input.send_data(data).await;
            }
            Some(ChannelInput::Sftp(input)) => {
                let _unused = input.send_packet(data).await;
            }
            None => {}
        }
        Ok(())
    }

    async fn window_change_request(
        &mut self,
        channel: ChannelId,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        if let Some(ChannelInput::Exec(input)) = self.inputs.get_mut(&channel) {
            input.resize(col_width, row_height).await;
        }
        Ok(())
    }

    async fn channel_eof(&mut self, channel: ChannelId, _session: &mut Session) -> Result<(), Self::Error> {
        match self.inputs.get_mut(&channel) {
            Some(ChannelInput::Exec(input)) => {
                let _unused = input.send_eof().await;
            }
            Some(ChannelInput::Sftp(input)) => {
                let _unused = input.send_eof().await;
            }
            None => {}
        }
        Ok(())
    }

    async fn channel_close(&mut self, channel: ChannelId, _session: &mut Session) -> Result<(), Self::Error> {
        let _unused = self.inputs.remove(&channel);
        let _unused = self.ptys.remove(&channel);
        Ok(())
    }

    /// Policy: only loopback targets may be forwarded to, matching the
    /// single-tenant trust model (a pod's own ports, never another host's).
    async fn channel_open_direct_tcpip(
        &mut self,
        channel: Channel<Msg>,
        host_to_connect: &str,
        port_to_connect: u32,
        _originator_address: &str,
        _originator_port: u32,
        session: &mut Session,
    ) -> Result<bool, Self::Error> {
        if host_to_connect != "127.0.0.1" && host_to_connect != "localhost" {
            session.channel_failure(channel.id());
            return Ok(false);
        }

        let Ok(target_port) = u16::try_from(port_to_connect) else {
            session.channel_failure(channel.id());
            return Ok(false);
        };

        if self.user_pod.is_none() {
            session.channel_failure(channel.id());
            return Ok(false);
        }

        if self.forward_cache.is_none() {
            let pod_api = self.ensure_pod_running_silent().await?;
            let user_pod = self.user_pod.clone().expect("checked above");
            self.forward_cache = Some(ForwardCache::new(pod_api, user_pod.pod_name));
        }

        let local_port =
            self.forward_cache.as_mut().expect("just initialized above").local_port_for(target_port).await?;
        let mut local_stream = ForwardCache::dial(local_port).await?;

        tokio::spawn(async move {
            let mut channel_stream = channel.into_stream();
            if let Err(err) = tokio::io::copy_bidirectional(&mut channel_stream, &mut local_stream).await {
                tracing::debug!("direct-tcpip stream to 127.0.0.1:{target_port} closed: {err}");
            }
        });

        Ok(true)
    }
}
