//! A `BaseTransport` that applies a model's `patchRequest` JSON merge-patch
//! to the request body before forwarding it. Sits beneath the Auth
//! Transport so patched bodies and header overrides still pass through
//! the bearer-token/beta-header injection above them.

use async_trait::async_trait;
use cpe_transport::BaseTransport;
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::Value;
use std::sync::Arc;

pub struct PatchTransport {
    patch: Option<Value>,
    inner: Arc<dyn BaseTransport>,
}

impl PatchTransport {
    pub fn new(patch: Option<Value>, inner: Arc<dyn BaseTransport>) -> Self {
        Self { patch, inner }
    }
}

#[async_trait]
impl BaseTransport for PatchTransport {
    async fn execute(&self, mut request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error> {
        if let Some(patch) = &self.patch {
            apply_patch_to_request(&mut request, patch);
        }
        self.inner.execute(request).await
    }
}

/// Patches the request body in place if it's buffered JSON; a streaming
/// body (no `as_bytes`) or non-JSON payload is left untouched.
fn apply_patch_to_request(request: &mut reqwest::Request, patch: &Value) {
    let Some(body_bytes) = request.body().and_then(|b| b.as_bytes()) else {
        return;
    };
    let Ok(mut body) = serde_json::from_slice::<Value>(body_bytes) else {
        return;
    };
    merge_patch(&mut body, patch);
    let Ok(encoded) = serde_json::to_vec(&body) else {
        return;
    };
    *request.body_mut() = Some(encoded.into());

    if let Some(Value::Object(headers_patch)) = patch.get("__headers") {
        for (key, value) in headers_patch {
            if let (Ok(name), Some(text)) = (HeaderName::try_from(key.as_str()), value.as_str()) {
                if let Ok(header_value) = HeaderValue::from_str(text) {
                    request.headers_mut().insert(name, header_value);
                }
            }
        }
    }
}

/// RFC 7396 JSON Merge Patch: objects merge key-by-key, `null` deletes a
/// key, any other value (including arrays) replaces wholesale.
fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    let Value::Object(target_map) = target else {
        return;
    };

    for (key, value) in patch_map {
        if key == "__headers" {
            continue;
        }
        if value.is_null() {
            target_map.remove(key);
            continue;
        }
        merge_patch(target_map.entry(key.clone()).or_insert(Value::Null), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_patch_replaces_scalar_fields() {
        let mut target = serde_json::json!({"model": "a", "temperature": 0.5});
        let patch = serde_json::json!({"temperature": 1.0});
        merge_patch(&mut target, &patch);
        assert_eq!(target["temperature"], 1.0);
        assert_eq!(target["model"], "a");
    }

    #[test]
    fn merge_patch_null_removes_key() {
        let mut target = serde_json::json!({"a": 1, "b": 2});
        merge_patch(&mut target, &serde_json::json!({"b": null}));
        assert_eq!(target, serde_json::json!({"a": 1}));
    }

    #[test]
    fn merge_patch_recurses_into_nested_objects() {
        let mut target = serde_json::json!({"metadata": {"a": 1, "b": 2}});
        merge_patch(&mut target, &serde_json::json!({"metadata": {"b": 3, "c": 4}}));
        assert_eq!(target, serde_json::json!({"metadata": {"a": 1, "b": 3, "c": 4}}));
    }

    #[test]
    fn merge_patch_array_replaces_wholesale() {
        let mut target = serde_json::json!({"tags": [1, 2, 3]});
        merge_patch(&mut target, &serde_json::json!({"tags": [9]}));
        assert_eq!(target, serde_json::json!({"tags": [9]}));
    }
}
