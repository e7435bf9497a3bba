//! Idempotently drives a named pod to `Running`, emitting progress states.

use futures::Stream;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod};
use kube::{
    Api,
    api::{DeleteParams, Preconditions},
};
use snafu::ResultExt;

use super::{error, error::Error, locks::PodLocks, template, user_pod::UserPod};
use crate::consts::RECONCILE_POLL_INTERVAL;

/// Progress emitted by [`ensure_running`]. Only `Starting` and `Running` are
/// ever observed by a consumer; `Unknown` exists as the state a consumer may
/// assume before the stream has produced anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PodState {
    Unknown,
    Starting,
    Running,
}

fn api_status_code(err: &kube::Error) -> Option<u16> {
    match err {
        kube::Error::Api(status) => Some(status.code),
        _ => None,
    }
}

async fn create_pvcs(
    pvc_api: &Api<PersistentVolumeClaim>,
    user_pod: &UserPod,
) -> Result<(), Error> {
    for (index, pvc_template) in user_pod.pvc_templates.iter().enumerate() {
        let pvc = template::render_pvc(pvc_template, user_pod, index)?;
        let pvc_name = pvc.metadata.name.clone().expect("validated by render_pvc");

        if let Err(source) = pvc_api.create(&Default::default(), &pvc).await {
            match api_status_code(&source) {
                Some(409) => {} // AlreadyExists: another session's create won the race.
                Some(403) => {
                    // Possibly a quota rejection racing a concurrent create; if the PVC
                    // showed up anyway, proceed, otherwise this really is quota exhaustion.
                    let exists = pvc_api.get_opt(&pvc_name).await.ok().flatten().is_some();
                    if !exists {
                        return Err(Error::CreatePvc {
                            namespace: user_pod.namespace.clone(),
                            pvc_name,
                            source: Box::new(source),
                        });
                    }
                }
                _ => {
                    return Err(Error::CreatePvc {
                        namespace: user_pod.namespace.clone(),
                        pvc_name,
                        source: Box::new(source),
                    });
                }
            }
        }
    }
    Ok(())
}

async fn create_pod(api: &Api<Pod>, user_pod: &UserPod) -> Result<(), Error> {
    let pod = template::render_pod(user_pod)?;
    if let Err(source) = api.create(&Default::default(), &pod).await {
        if api_status_code(&source) != Some(409) {
            return Err(Error::CreatePod {
                namespace: user_pod.namespace.clone(),
                pod_name: user_pod.pod_name.clone(),
                source: Box::new(source),
            });
        }
    }
    Ok(())
}

async fn await_deletion_observed(api: &Api<Pod>, pod_name: &str) -> Result<(), kube::Error> {
    loop {
        if api.get_opt(pod_name).await?.is_none() {
            return Ok(());
        }
        tokio::time::sleep(RECONCILE_POLL_INTERVAL).await;
    }
}

/// Idempotently drives `user_pod`'s pod to `Running`, yielding progress
/// states. The stream is finite and yields exactly one terminal `Running`.
///
/// Pod/PVC *creation* is serialized per pod name through `locks` so that two
/// concurrent sessions for the same user rendezvous on `AlreadyExists`
/// instead of racing; the read/poll loop itself is never held under the lock.
pub fn ensure_running(
    pod_api: Api<Pod>,
    pvc_api: Api<PersistentVolumeClaim>,
    locks: PodLocks,
    user_pod: UserPod,
) -> impl Stream<Item = Result<PodState, Error>> {
    async_stream::try_stream! {
        loop {
            let existing = pod_api
                .get_opt(&user_pod.pod_name)
                .await
                .with_context(|_| error::GetPodSnafu {
                    namespace: user_pod.namespace.clone(),
                    pod_name: user_pod.pod_name.clone(),
                })?;

            let Some(pod) = existing else {
                let create_lock = locks.get(&user_pod.pod_name).lock_owned().await;
                create_pvcs(&pvc_api, &user_pod).await?;
                create_pod(&pod_api, &user_pod).await?;
                drop(create_lock);
                yield PodState::Starting;
                tokio::time::sleep(RECONCILE_POLL_INTERVAL).await;
                continue;
            };

            let phase = pod.status.as_ref().and_then(|status| status.phase.as_deref());
            match phase {
                Some("Running") => {
                    yield PodState::Running;
                    return;
                }
                Some("Failed" | "Succeeded") => {
                    let delete_params = DeleteParams {
                        grace_period_seconds: Some(0),
                        preconditions: Some(Preconditions {
                            uid: pod.metadata.uid.clone(),
                            resource_version: None,
                        }),
                        ..Default::default()
                    };
                    if let Err(source) = pod_api.delete(&user_pod.pod_name, &delete_params).await {
                        if api_status_code(&source) != Some(404) {
                            Err(Error::DeletePod {
                                namespace: user_pod.namespace.clone(),
                                pod_name: user_pod.pod_name.clone(),
                                source: Box::new(source),
                            })?;
                        }
                    }
                    await_deletion_observed(&pod_api, &user_pod.pod_name).await.with_context(|_| {
                        error::GetPodSnafu {
                            namespace: user_pod.namespace.clone(),
                            pod_name: user_pod.pod_name.clone(),
                        }
                    })?;
                    yield PodState::Starting;
                    continue;
                }
                _ => {
                    yield PodState::Starting;
                    tokio::time::sleep(RECONCILE_POLL_INTERVAL).await;
                    continue;
                }
            }
        }
    }
}
