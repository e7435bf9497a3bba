use russh::keys::PublicKey;

use super::Authenticator;

/// Authenticator for local testing: installs no authorized keys, so it is
/// only useful paired with password logins, and accepts a password login
/// when the password equals the username.
#[derive(Clone, Debug, Default)]
pub struct DummyAuthenticator;

impl Authenticator for DummyAuthenticator {
    async fn begin_auth(&self, _username: &str) -> Vec<PublicKey> { Vec::new() }

    async fn password(&self, username: &str, password: &str) -> bool {
        tracing::info!(username, "login attempted");
        username == password
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepts_password_matching_username() {
        let auth = DummyAuthenticator;
        assert!(auth.password("alice", "alice").await);
        assert!(!auth.password("alice", "wrong").await);
    }
}
