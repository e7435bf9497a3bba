//! The logical binding of an SSH username to a cluster workload.

use std::collections::BTreeMap;

use serde_yaml::Value;

use crate::consts::{self, k8s::labels as k8s_labels};

/// DNS-label-safe escape: every byte outside `[a-z0-9]` becomes `-HH`,
/// lower-case hex of the byte.
#[must_use]
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        if byte.is_ascii_lowercase() || byte.is_ascii_digit() {
            out.push(byte as char);
        } else {
            out.push_str(&format!("-{byte:02x}"));
        }
    }
    out
}

/// Derives the deterministic pod name for a username: `ssh-{escape(username)}`.
#[must_use]
pub fn pod_name_for(username: &str) -> String { format!("ssh-{}", escape(username)) }

/// The logical binding of a username to a cluster workload: namespace, the
/// deterministic pod name, the labels every created pod must carry, and the
/// admin-supplied templates to render it from.
#[derive(Clone, Debug)]
pub struct UserPod {
    pub username: String,
    pub namespace: String,
    pub pod_name: String,
    pub required_labels: BTreeMap<String, String>,
    pub pod_template: Value,
    pub pvc_templates: Vec<Value>,
}

impl UserPod {
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        namespace: impl Into<String>,
        pod_template: Value,
        pvc_templates: Vec<Value>,
    ) -> Self {
        let username = username.into();
        let pod_name = pod_name_for(&username);

        let mut required_labels = BTreeMap::new();
        let _ = required_labels
            .insert(k8s_labels::MANAGED_BY.to_string(), env!("CARGO_PKG_NAME").to_string());
        let _ = required_labels
            .insert(k8s_labels::DEFAULT_CONTAINER.to_string(), consts::SHELL_CONTAINER_NAME.to_string());
        let _ = required_labels.insert(consts::USERNAME_LABEL.to_string(), escape(&username));

        Self { username, namespace: namespace.into(), pod_name, required_labels, pod_template, pvc_templates }
    }
}

#[cfg(test)]
mod tests {
    use super::{escape, pod_name_for};

    #[test]
    fn escapes_only_lowercase_alphanumeric_bytes() {
        assert_eq!(escape("test-name"), "test-2dname");
        assert_eq!(escape("alice"), "alice");
        assert_eq!(escape("Bob.Smith"), "-42ob-2e-53mith");
    }

    #[test]
    fn pod_name_escapes_non_dns_safe_bytes() {
        assert_eq!(pod_name_for("test-name"), "ssh-test-2dname");
        assert_eq!(pod_name_for("alice"), "ssh-alice");
    }

    #[test]
    fn escape_is_idempotent_on_already_safe_input() {
        let safe = "already-safe123";
        assert_eq!(escape(&escape(safe)), escape(safe));
    }
}
