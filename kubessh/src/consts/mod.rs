pub mod k8s;

/// The label key that every pod created by this server carries, set to the
/// DNS-safe escape of the SSH username that owns the pod.
pub const USERNAME_LABEL: &str = "kubessh.yuvi.in/username";

/// Default namespace used when neither the in-cluster service account file
/// nor configuration supplies one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Default TCP address the SSH server listens on.
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:8022";

/// Container name the server attaches to for interactive shells and exec.
pub const SHELL_CONTAINER_NAME: &str = "shell";

/// Default login shell used when the client requests a PTY without a command.
pub const DEFAULT_LOGIN_SHELL: &str = "/bin/sh";

/// Path to the namespace file injected into in-cluster pods by the service
/// account admission controller.
pub const SERVICE_ACCOUNT_NAMESPACE_FILE: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Default location of the static SFTP server binary inside the server image.
pub const DEFAULT_SFTP_STATIC_BINARY_PATH: &str = "/usr/local/libexec/kubessh-sftp-server";

/// Default location inside the user pod the SFTP server binary is staged to.
pub const DEFAULT_SFTP_REMOTE_PATH: &str = "/tmp/kubessh-sftp-server";

/// Spinner glyph cycle written on the wire while a pod reconciles.
pub const SPINNER_GLYPHS: [char; 4] = ['-', '/', '|', '\\'];

/// Interval between reconciler polls of pod status while not yet running.
pub const RECONCILE_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);

/// SSH keepalive interval advertised to clients.
pub const SSH_KEEPALIVE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

/// Upper bound on authenticator HTTPS key-fetch requests.
pub const AUTH_FETCH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(8);
