//! Per-pod single-slot serialization for cluster mutation calls.
//!
//! Every `UserPod` gets its own `tokio::sync::Mutex<()>`, looked up (and
//! lazily inserted) in a process-wide registry. Only pod *creation* steps are
//! held under the lock, reads and the `Running` poll are not, so two
//! sessions for the same user never race a create, but neither blocks the
//! other's readiness poll.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::Mutex as AsyncMutex;

#[derive(Clone, Default)]
pub struct PodLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl PodLocks {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn get(&self, pod_name: &str) -> Arc<AsyncMutex<()>> {
        let mut registry = self.inner.lock().expect("pod lock registry mutex is never poisoned");
        Arc::clone(registry.entry(pod_name.to_string()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::PodLocks;

    #[test]
    fn same_pod_name_yields_the_same_lock() {
        let locks = PodLocks::new();
        assert!(Arc::ptr_eq(&locks.get("ssh-alice"), &locks.get("ssh-alice")));
        assert!(!Arc::ptr_eq(&locks.get("ssh-alice"), &locks.get("ssh-bob")));
    }
}
