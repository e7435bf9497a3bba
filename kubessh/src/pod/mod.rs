//! Pod templating and lifecycle reconciliation.

mod error;
mod locks;
mod reconciler;
mod template;
mod user_pod;

pub use self::{
    error::Error,
    locks::PodLocks,
    reconciler::{PodState, ensure_running},
    template::{deep_merge, render_pod, render_pvc},
    user_pod::{UserPod, escape, pod_name_for},
};
