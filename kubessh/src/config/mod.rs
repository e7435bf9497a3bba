//! Configuration management for the SSH-to-pod session server.
//!
//! Loads a single YAML settings document into an immutable [`Settings`]
//! record at startup, resolving relative paths. The reconciler and
//! authenticators are handed shared references to it; nothing mutates it
//! afterwards.

mod auth;
mod error;
mod log;
mod sftp;

use std::path::{Path, PathBuf};

use resolve_path::PathResolveExt;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use snafu::ResultExt;

pub use self::{
    auth::{AuthKind, AuthSettings, GithubAuthSettings, GitlabAuthSettings},
    error::Error,
    log::LogConfig,
    sftp::SftpSettings,
};
use crate::consts;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Settings {
    /// TCP address the server binds its SSH listener to.
    #[serde(default = "Settings::default_listen_address")]
    pub listen_address: String,

    /// Path to a host key file. If absent, an ephemeral key is generated
    /// each startup and only its fingerprint is logged.
    pub host_key_path: Option<PathBuf>,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub sftp: SftpSettings,

    #[serde(default)]
    pub auth: AuthSettings,

    /// Namespace user pods are created in.
    pub default_namespace: Option<String>,

    /// Base pod document, deep-merged under required labels/name per user.
    #[serde(default)]
    pub pod_template: Value,

    /// PVC documents deep-merged and created alongside the pod.
    #[serde(default)]
    pub pvc_templates: Vec<Value>,
}

impl Settings {
    pub fn search_config_file_path() -> PathBuf {
        let paths = std::iter::once(Self::default_path())
            .chain(kubessh_base::fallback_project_config_directories().into_iter().map(
                |mut path| {
                    path.push(kubessh_base::CLI_CONFIG_NAME);
                    path
                },
            ))
            .collect::<Vec<_>>();
        for path in paths {
            if path.try_exists().unwrap_or(false) {
                return path;
            }
        }
        Self::default_path()
    }

    #[inline]
    pub fn default_path() -> PathBuf {
        [kubessh_base::project_config_dir(), PathBuf::from(kubessh_base::CLI_CONFIG_NAME)]
            .into_iter()
            .collect()
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let mut settings: Self = {
            let path =
                path.as_ref().try_resolve().map(|path| path.to_path_buf()).with_context(|_| {
                    error::ResolveFilePathSnafu { file_path: path.as_ref().to_path_buf() }
                })?;
            let data =
                std::fs::read(&path).context(error::OpenConfigSnafu { filename: path.clone() })?;
            serde_yaml::from_slice(&data).context(error::ParseConfigSnafu { filename: path })?
        };

        let try_resolve_path = |path: Option<&PathBuf>| -> Result<Option<PathBuf>, Error> {
            match path.map(|path| {
                path.try_resolve()
                    .map(|path| path.to_path_buf())
                    .with_context(|_| error::ResolveFilePathSnafu { file_path: path.clone() })
            }) {
                Some(Ok(path)) => Ok(Some(path)),
                Some(Err(err)) => Err(err),
                None => Ok(None),
            }
        };

        settings.host_key_path = try_resolve_path(settings.host_key_path.as_ref())?;
        settings.log.file_path = try_resolve_path(settings.log.file_path.as_ref())?;
        settings.sftp.static_binary_path = try_resolve_path(Some(&settings.sftp.static_binary_path))?
            .expect("static_binary_path is always `Some` going in");

        Ok(settings)
    }

    /// Namespace user pods are created in: the configured value, falling back
    /// to the in-cluster service-account namespace file, falling back to
    /// `default`.
    #[must_use]
    pub fn resolve_default_namespace(&self) -> String {
        self.default_namespace.clone().unwrap_or_else(|| {
            std::fs::read_to_string(consts::SERVICE_ACCOUNT_NAMESPACE_FILE)
                .map(|contents| contents.trim().to_string())
                .unwrap_or_else(|_| consts::DEFAULT_NAMESPACE.to_string())
        })
    }

    fn default_listen_address() -> String { consts::DEFAULT_LISTEN_ADDRESS.to_string() }
}

#[cfg(test)]
mod tests {
    use super::Settings;

    #[test]
    fn minimal_document_loads_with_defaults() {
        let settings: Settings = serde_yaml::from_str("defaultNamespace: users\n").unwrap();
        assert_eq!(settings.listen_address, "0.0.0.0:8022");
        assert_eq!(settings.default_namespace.as_deref(), Some("users"));
        assert!(settings.host_key_path.is_none());
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(serde_yaml::from_str::<Settings>("bogusKey: true\n").is_err());
    }
}
