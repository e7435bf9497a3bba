//! Kubernetes label/annotation keys used by this server.

pub mod labels {
    //! Labels applied to resources this server creates.

    /// The `app.kubernetes.io/managed-by` label value.
    pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";

    /// The `kubectl.kubernetes.io/default-container` annotation, pointed at
    /// the shell container so `kubectl attach`/`logs` default sensibly.
    pub const DEFAULT_CONTAINER: &str = "kubectl.kubernetes.io/default-container";
}
