//! Renders admin-supplied pod/PVC templates into cluster-ready objects.

use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod};
use serde_yaml::Value;
use snafu::OptionExt;

use super::{error, error::Error, user_pod::UserPod};

/// Deep-merges `over` onto `base`: mappings recurse key-by-key, sequences
/// merge element-wise by index, everything else is right-biased (an `over`
/// value, including `Value::Null` written explicitly, replaces `base`'s).
#[must_use]
pub fn deep_merge(base: &Value, over: &Value) -> Value {
    match (base, over) {
        (Value::Mapping(base_map), Value::Mapping(over_map)) => {
            let mut merged = base_map.clone();
            for (key, over_value) in over_map {
                let merged_value = match merged.get(key) {
                    Some(base_value) => deep_merge(base_value, over_value),
                    None => over_value.clone(),
                };
                let _ = merged.insert(key.clone(), merged_value);
            }
            Value::Mapping(merged)
        }
        (Value::Sequence(base_seq), Value::Sequence(over_seq)) => {
            let len = base_seq.len().max(over_seq.len());
            let merged = (0..len)
                .map(|i| match (base_seq.get(i), over_seq.get(i)) {
                    (Some(b), Some(o)) => deep_merge(b, o),
                    (Some(b), None) => b.clone(),
                    (None, Some(o)) => o.clone(),
                    (None, None) => unreachable!("index bounded by max of the two lengths"),
                })
                .collect();
            Value::Sequence(merged)
        }
        _ => over.clone(),
    }
}

/// Replaces every `{username}` occurrence in every string-typed leaf with
/// the DNS-safe escape of `username`.
fn substitute_username(value: Value, escaped_username: &str) -> Value {
    match value {
        Value::String(s) => Value::String(s.replace("{username}", escaped_username)),
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    (substitute_username(k, escaped_username), substitute_username(v, escaped_username))
                })
                .collect(),
        ),
        Value::Sequence(seq) => {
            Value::Sequence(seq.into_iter().map(|v| substitute_username(v, escaped_username)).collect())
        }
        other => other,
    }
}

fn required_labels_overlay(user_pod: &UserPod) -> Value {
    let mut labels = serde_yaml::Mapping::new();
    for (key, value) in &user_pod.required_labels {
        let _ = labels.insert(Value::String(key.clone()), Value::String(value.clone()));
    }
    let mut metadata = serde_yaml::Mapping::new();
    let _ = metadata.insert(Value::String("labels".to_string()), Value::Mapping(labels));
    let _ = metadata.insert(
        Value::String("name".to_string()),
        Value::String(user_pod.pod_name.clone()),
    );
    let mut root = serde_yaml::Mapping::new();
    let _ = root.insert(Value::String("metadata".to_string()), Value::Mapping(metadata));
    Value::Mapping(root)
}

fn remove_generate_name(value: &mut Value) {
    if let Value::Mapping(root) = value
        && let Some(Value::Mapping(metadata)) = root.get_mut(Value::String("metadata".to_string()))
    {
        let _ = metadata.remove(Value::String("generateName".to_string()));
    }
}

/// Renders `user_pod.pod_template` into a cluster-ready [`Pod`]: required
/// labels win over template labels, `metadata.name` is forced to the
/// deterministic pod name, and `generateName` is stripped.
pub fn render_pod(user_pod: &UserPod) -> Result<Pod, Error> {
    let overlay = required_labels_overlay(user_pod);
    let merged = deep_merge(&user_pod.pod_template, &overlay);
    let mut merged = substitute_username(merged, &super::user_pod::escape(&user_pod.username));
    remove_generate_name(&mut merged);

    serde_yaml::from_value(merged).context(error::RenderPodSnafu)
}

/// Renders one PVC template: username substitution only. The template must
/// already carry `metadata.name`; PVCs are not subject to the pod's
/// required-label/forced-name rules.
pub fn render_pvc(
    template: &Value,
    user_pod: &UserPod,
    index: usize,
) -> Result<PersistentVolumeClaim, Error> {
    let substituted = substitute_username(template.clone(), &super::user_pod::escape(&user_pod.username));
    let pvc: PersistentVolumeClaim =
        serde_yaml::from_value(substituted).context(error::RenderPvcSnafu { index })?;
    pvc.metadata.name.as_ref().context(error::PvcTemplateMissingNameSnafu { index })?;
    Ok(pvc)
}

#[cfg(test)]
mod tests {
    use serde_yaml::Value;

    use super::*;

    fn yaml(s: &str) -> Value { serde_yaml::from_str(s).unwrap() }

    #[test]
    fn scalar_conflicts_are_right_biased() {
        let base = yaml("image: alpine:3.6\nreplicas: 1\n");
        let over = yaml("image: alpine:3.9\n");
        let merged = deep_merge(&base, &over);
        assert_eq!(merged["image"].as_str(), Some("alpine:3.9"));
        assert_eq!(merged["replicas"].as_i64(), Some(1));
    }

    #[test]
    fn merge_is_associative_for_disjoint_keys() {
        let a = yaml("a: 1\n");
        let b = yaml("b: 2\n");
        let c = yaml("c: 3\n");
        let left = deep_merge(&deep_merge(&a, &b), &c);
        let right = deep_merge(&a, &deep_merge(&b, &c));
        assert_eq!(left, right);
    }

    #[test]
    fn lists_merge_by_index_not_concatenation() {
        let base = yaml("containers:\n- name: shell\n  image: old\n");
        let over = yaml("containers:\n- image: new\n");
        let merged = deep_merge(&base, &over);
        let containers = merged["containers"].as_sequence().unwrap();
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0]["name"].as_str(), Some("shell"));
        assert_eq!(containers[0]["image"].as_str(), Some("new"));
    }

    #[test]
    fn required_labels_win_over_template_labels() {
        let user_pod = UserPod::new("alice", "default", yaml("metadata:\n  labels:\n    kubessh.yuvi.in/username: bogus\n  name: whatever\n"), Vec::new());
        let pod = render_pod(&user_pod).unwrap();
        let labels = pod.metadata.labels.unwrap();
        assert_eq!(labels.get("kubessh.yuvi.in/username").map(String::as_str), Some("alice"));
        assert_eq!(pod.metadata.name.as_deref(), Some("ssh-alice"));
    }

    #[test]
    fn username_placeholder_is_substituted_in_string_leaves() {
        let user_pod = UserPod::new(
            "bob",
            "default",
            yaml("spec:\n  containers:\n  - name: shell\n    image: alpine\n    workingDir: /home/{username}\n"),
            Vec::new(),
        );
        let pod = render_pod(&user_pod).unwrap();
        let container = &pod.spec.unwrap().containers[0];
        assert_eq!(container.working_dir.as_deref(), Some("/home/bob"));
    }
}
