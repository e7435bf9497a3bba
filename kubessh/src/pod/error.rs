use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("failed to read pod {pod_name} in namespace {namespace}, error: {source}"))]
    GetPod {
        namespace: String,
        pod_name: String,
        #[snafu(source(from(kube::Error, Box::new)))]
        source: Box<kube::Error>,
    },

    #[snafu(display("failed to delete pod {pod_name} in namespace {namespace}, error: {source}"))]
    DeletePod {
        namespace: String,
        pod_name: String,
        #[snafu(source(from(kube::Error, Box::new)))]
        source: Box<kube::Error>,
    },

    #[snafu(display("failed to create pod {pod_name} in namespace {namespace}, error: {source}"))]
    CreatePod {
        namespace: String,
        pod_name: String,
        #[snafu(source(from(kube::Error, Box::new)))]
        source: Box<kube::Error>,
    },

    #[snafu(display(
        "failed to create pvc {pvc_name} in namespace {namespace}, error: {source}"
    ))]
    CreatePvc {
        namespace: String,
        pvc_name: String,
        #[snafu(source(from(kube::Error, Box::new)))]
        source: Box<kube::Error>,
    },

    #[snafu(display(
        "pvc template at index {index} has no metadata.name and cannot be created"
    ))]
    PvcTemplateMissingName { index: usize },

    #[snafu(display("failed to render pod template, error: {source}"))]
    RenderPod { source: serde_yaml::Error },

    #[snafu(display("failed to render pvc template at index {index}, error: {source}"))]
    RenderPvc { index: usize, source: serde_yaml::Error },
}
