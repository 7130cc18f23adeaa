use serde_json::Value;
use tracing::warn;

use kubeprobe_types::{ProbeError, Resource};

/// Names of all deployments in `data`, in source order
pub fn discover_deployments(data: &Value) -> Result<Vec<String>, ProbeError> {
    let names = items(data)?
        .iter()
        .filter_map(|item| {
            let name = item_name(item);
            if name.is_none() {
                warn!("skipping deployment without metadata.name");
            }
            name.map(str::to_string)
        })
        .collect();

    Ok(names)
}

/// Value of `status[key]` for the first deployment named `resource_name`
///
/// `key` is matched as given, then in camelCase, so `ready_replicas` finds
/// the API's `readyReplicas`.
pub fn get_deployments(data: &Value, resource_name: &str, key: &str) -> Result<Value, ProbeError> {
    let deployment = items(data)?
        .iter()
        .find(|item| item_name(item) == Some(resource_name))
        .ok_or_else(|| ProbeError::NotFound {
            resource: Resource::Deployments,
            name: resource_name.to_string(),
        })?;

    let key_not_found = || ProbeError::KeyNotFound {
        name: resource_name.to_string(),
        key: key.to_string(),
    };

    let status = deployment
        .get("status")
        .and_then(Value::as_object)
        .ok_or_else(key_not_found)?;

    status
        .get(key)
        .or_else(|| status.get(&snake_to_camel(key)))
        .cloned()
        .ok_or_else(key_not_found)
}

/// Render a JSON value for plain-text output
///
/// Strings print without quotes; everything else prints as compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn items(data: &Value) -> Result<&Vec<Value>, ProbeError> {
    data.get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| ProbeError::MalformedData {
            resource: Resource::Deployments,
            reason: "missing 'items' list".to_string(),
        })
}

fn item_name(item: &Value) -> Option<&str> {
    item.get("metadata")?.get("name")?.as_str()
}

fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for c in key.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "items": [
                {"metadata": {"name": "a"}, "status": {"ready_replicas": 3}},
                {"metadata": {"name": "b"}}
            ]
        })
    }

    #[test]
    fn test_discover_keeps_source_order() {
        let data = json!({
            "items": [
                {"metadata": {"name": "zeta"}},
                {"metadata": {"name": "alpha"}},
                {"metadata": {"name": "mid"}}
            ]
        });
        assert_eq!(
            discover_deployments(&data).unwrap(),
            vec!["zeta", "alpha", "mid"]
        );
    }

    #[test]
    fn test_discover_names() {
        assert_eq!(discover_deployments(&sample()).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_discover_empty_list() {
        let data = json!({"items": []});
        assert!(discover_deployments(&data).unwrap().is_empty());
    }

    #[test]
    fn test_discover_skips_unnamed_items() {
        let data = json!({"items": [{"metadata": {}}, {"metadata": {"name": "a"}}]});
        assert_eq!(discover_deployments(&data).unwrap(), vec!["a"]);
    }

    #[test]
    fn test_missing_items_is_malformed() {
        let err = discover_deployments(&json!({"kind": "DeploymentList"})).unwrap_err();
        assert!(matches!(err, ProbeError::MalformedData { .. }));
    }

    #[test]
    fn test_get_status_value() {
        let value = get_deployments(&sample(), "a", "ready_replicas").unwrap();
        assert_eq!(value, json!(3));
        assert_eq!(render_value(&value), "3");
    }

    #[test]
    fn test_get_falls_back_to_camel_case() {
        let data = json!({
            "items": [{"metadata": {"name": "web"}, "status": {"readyReplicas": 2, "replicas": 4}}]
        });
        assert_eq!(get_deployments(&data, "web", "ready_replicas").unwrap(), json!(2));
        assert_eq!(get_deployments(&data, "web", "readyReplicas").unwrap(), json!(2));
        assert_eq!(get_deployments(&data, "web", "replicas").unwrap(), json!(4));
    }

    #[test]
    fn test_get_first_match_wins() {
        let data = json!({
            "items": [
                {"metadata": {"name": "web", "namespace": "one"}, "status": {"replicas": 1}},
                {"metadata": {"name": "web", "namespace": "two"}, "status": {"replicas": 2}}
            ]
        });
        assert_eq!(get_deployments(&data, "web", "replicas").unwrap(), json!(1));
    }

    #[test]
    fn test_get_unknown_name_is_not_found() {
        let err = get_deployments(&sample(), "missing", "ready_replicas").unwrap_err();
        assert!(matches!(err, ProbeError::NotFound { ref name, .. } if name == "missing"));
    }

    #[test]
    fn test_get_unknown_key() {
        let err = get_deployments(&sample(), "a", "bogus").unwrap_err();
        assert!(matches!(err, ProbeError::KeyNotFound { ref key, .. } if key == "bogus"));
    }

    #[test]
    fn test_get_without_status() {
        let err = get_deployments(&sample(), "b", "ready_replicas").unwrap_err();
        assert!(matches!(err, ProbeError::KeyNotFound { .. }));
    }

    #[test]
    fn test_get_null_field() {
        let data = json!({
            "items": [{"metadata": {"name": "idle"}, "status": {"readyReplicas": null}}]
        });
        let value = get_deployments(&data, "idle", "ready_replicas").unwrap();
        assert_eq!(render_value(&value), "null");
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&json!("True")), "True");
        assert_eq!(render_value(&json!(false)), "false");
        assert_eq!(render_value(&json!([{"type": "Available"}])), r#"[{"type":"Available"}]"#);
    }

    #[test]
    fn test_snake_to_camel() {
        assert_eq!(snake_to_camel("ready_replicas"), "readyReplicas");
        assert_eq!(snake_to_camel("observed_generation"), "observedGeneration");
        assert_eq!(snake_to_camel("replicas"), "replicas");
    }
}
