use russh::keys::PublicKey;

use super::{Authenticator, allow_list_permits, fetch_authorized_keys};
use crate::consts::AUTH_FETCH_TIMEOUT;

/// Fetches a user's public keys from `{instance_url}/{username}.keys`,
/// GitLab's plain-text authorized-keys endpoint.
#[derive(Clone, Debug)]
pub struct GitlabAuthenticator {
    client: reqwest::Client,
    instance_url: String,
    allowed_users: Vec<String>,
}

impl GitlabAuthenticator {
    #[must_use]
    pub fn new(instance_url: String, allowed_users: Vec<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(AUTH_FETCH_TIMEOUT)
            .build()
            .expect("building a reqwest client with only a timeout set never fails");
        Self { client, instance_url: instance_url.trim_end_matches('/').to_string(), allowed_users }
    }
}

impl Authenticator for GitlabAuthenticator {
    async fn begin_auth(&self, username: &str) -> Vec<PublicKey> {
        if !allow_list_permits(&self.allowed_users, username) {
            return Vec::new();
        }

        let url = format!("{}/{username}.keys", self.instance_url);
        match fetch_authorized_keys(&self.client, &url, username).await {
            Ok(keys) => keys,
            Err(err) => {
                tracing::warn!("{err}");
                Vec::new()
            }
        }
    }
}
