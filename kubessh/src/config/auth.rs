//! Authenticator selection and per-authenticator settings.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthKind {
    #[default]
    Dummy,
    Github,
    Gitlab,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSettings {
    #[serde(rename = "type", default)]
    pub kind: AuthKind,

    #[serde(default)]
    pub github: GithubAuthSettings,

    #[serde(default)]
    pub gitlab: GitlabAuthSettings,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubAuthSettings {
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitlabAuthSettings {
    #[serde(default = "GitlabAuthSettings::default_instance_url")]
    pub instance_url: String,

    #[serde(default)]
    pub allowed_users: Vec<String>,
}

impl GitlabAuthSettings {
    fn default_instance_url() -> String { "https://gitlab.com".to_string() }
}

impl Default for GitlabAuthSettings {
    fn default() -> Self {
        Self { instance_url: Self::default_instance_url(), allowed_users: Vec::new() }
    }
}
