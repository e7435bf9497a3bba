//! Authenticator plugin interface.
//!
//! The core never decides *who* may log in, it asks an `Authenticator`.
//! Each implementation fetches (or hard-codes) the set of public keys
//! authorized for a username, and optionally validates a password. Unknown
//! users and users excluded by a configured allow-list both result in an
//! empty key set, which the SSH handler treats as a hard refusal.

mod dummy;
mod error;
mod github;
mod gitlab;

use russh::keys::PublicKey;

pub use self::{dummy::DummyAuthenticator, error::Error, github::GithubAuthenticator, gitlab::GitlabAuthenticator};

/// A source of truth for which keys (and passwords) may authenticate as a
/// given username.
#[allow(async_fn_in_trait)]
pub trait Authenticator: Send + Sync {
    /// Called once per connection before any public-key offer is checked.
    /// Returns the keys authorized for `username`; an empty vector means the
    /// user is unknown or excluded by policy and every key offer is refused.
    async fn begin_auth(&self, username: &str) -> Vec<PublicKey>;

    /// Validates a password-based login attempt. Authenticators that only
    /// support public-key auth should leave the default `false`.
    async fn password(&self, _username: &str, _password: &str) -> bool { false }
}

fn allow_list_permits(allowed_users: &[String], username: &str) -> bool {
    allowed_users.is_empty() || allowed_users.iter().any(|allowed| allowed == username)
}

/// Fetches a plain-text, one-key-per-line authorized-keys document from
/// `url` and parses each line as an OpenSSH public key, skipping (and
/// logging) any line that fails to parse.
async fn fetch_authorized_keys(
    client: &reqwest::Client,
    url: &str,
    username: &str,
) -> Result<Vec<PublicKey>, Error> {
    use snafu::ResultExt;

    let body = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .with_context(|_| error::FetchKeysSnafu { username: username.to_string(), url: url.to_string() })?
        .text()
        .await
        .with_context(|_| error::FetchKeysSnafu { username: username.to_string(), url: url.to_string() })?;

    let mut keys = Vec::new();
    for line in body.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match PublicKey::from_openssh(line) {
            Ok(key) => keys.push(key),
            Err(parse_err) => {
                let err = error::ParseKeySnafu { username: username.to_string() }.build();
                tracing::warn!("{err} from {url}: {parse_err}");
            }
        }
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::allow_list_permits;

    #[test]
    fn empty_allow_list_permits_everyone() {
        assert!(allow_list_permits(&[], "anyone"));
    }

    #[test]
    fn nonempty_allow_list_permits_only_listed_users() {
        let allowed = vec!["alice".to_string(), "bob".to_string()];
        assert!(allow_list_permits(&allowed, "alice"));
        assert!(!allow_list_permits(&allowed, "carol"));
    }
}
