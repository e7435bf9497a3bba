use russh::keys::PublicKey;

use super::{Authenticator, allow_list_permits, fetch_authorized_keys};
use crate::consts::AUTH_FETCH_TIMEOUT;

/// Fetches a user's public keys from `https://github.com/{username}.keys`,
/// GitHub's well-known plain-text authorized-keys endpoint.
#[derive(Clone, Debug)]
pub struct GithubAuthenticator {
    client: reqwest::Client,
    allowed_users: Vec<String>,
}

impl GithubAuthenticator {
    #[must_use]
    pub fn new(allowed_users: Vec<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(AUTH_FETCH_TIMEOUT)
            .build()
            .expect("building a reqwest client with only a timeout set never fails");
        Self { client, allowed_users }
    }
}

impl Authenticator for GithubAuthenticator {
    async fn begin_auth(&self, username: &str) -> Vec<PublicKey> {
        if !allow_list_permits(&self.allowed_users, username) {
            return Vec::new();
        }

        let url = format!("https://github.com/{username}.keys");
        match fetch_authorized_keys(&self.client, &url, username).await {
            Ok(keys) => keys,
            Err(err) => {
                tracing::warn!("{err}");
                Vec::new()
            }
        }
    }
}
