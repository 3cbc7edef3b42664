//! Kubernetes manifests for rendered configuration

use std::collections::BTreeMap;

use serde_json::{json, Value as JsonValue};
use serde_yaml::{Mapping, Value};

use crate::error::{E2eError, E2eResult};
use crate::options::DeploymentOptions;

const MANAGED_BY: &str = "devhub-e2e";

/// Operator custom resource API version
pub const BACKSTAGE_API_VERSION: &str = "rhdh.redhat.com/v1alpha3";

fn labels() -> JsonValue {
    json!({ "app.kubernetes.io/managed-by": MANAGED_BY })
}

pub fn namespace(name: &str) -> JsonValue {
    json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": { "name": name, "labels": labels() }
    })
}

/// ConfigMap holding one file
pub fn config_map(name: &str, namespace: &str, file_name: &str, content: &str) -> JsonValue {
    json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": { "name": name, "namespace": namespace, "labels": labels() },
        "data": { file_name: content }
    })
}

/// Opaque Secret from string data
pub fn secret(name: &str, namespace: &str, data: &BTreeMap<String, String>) -> JsonValue {
    json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "type": "Opaque",
        "metadata": { "name": name, "namespace": namespace, "labels": labels() },
        "stringData": data
    })
}

/// `Backstage` resource consumed by the operator
pub fn backstage(options: &DeploymentOptions) -> JsonValue {
    json!({
        "apiVersion": BACKSTAGE_API_VERSION,
        "kind": "Backstage",
        "metadata": {
            "name": options.release_name,
            "namespace": options.namespace,
            "labels": labels()
        },
        "spec": {
            "application": {
                "appConfig": {
                    "mountPath": "/opt/app-root/src",
                    "configMaps": [{ "name": options.app_config_map() }]
                },
                "dynamicPluginsConfigMapName": options.dynamic_plugins_map(),
                "extraEnvs": {
                    "secrets": [{ "name": options.secret_name() }]
                },
                "route": { "enabled": true }
            }
        }
    })
}

/// Flatten a merged secrets mapping into Secret string data.
///
/// Scalars are stringified and null becomes empty; nested values are rejected.
pub fn secret_string_data(secrets: &Mapping) -> E2eResult<BTreeMap<String, String>> {
    let mut data = BTreeMap::new();
    for (key, value) in secrets {
        let Some(key) = key.as_str() else {
            return Err(E2eError::InvalidOptions(format!(
                "secret keys must be strings, got {:?}",
                key
            )));
        };
        let value = match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            _ => {
                return Err(E2eError::InvalidOptions(format!(
                    "secret '{}' must be a scalar",
                    key
                )))
            }
        };
        data.insert(key.to_string(), value);
    }
    Ok(data)
}
