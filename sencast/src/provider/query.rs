//! Small helpers shared by the provider implementations.

use serde_json::Value;
use tracing::warn;

use super::types::ProviderError;
use crate::scene::SceneDescriptor;

/// Builds `base` with URL-encoded query parameters.
pub(crate) fn url_with_params(base: &str, params: &[(&str, String)]) -> Result<String, ProviderError> {
    reqwest::Url::parse_with_params(base, params)
        .map(String::from)
        .map_err(|e| ProviderError::InvalidResponse(format!("invalid URL {}: {}", base, e)))
}

pub(crate) fn parse_json(bytes: &[u8]) -> Result<Value, ProviderError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// A JSON field that may hold one object or an array of them.
pub(crate) fn one_or_many(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other],
    }
}

/// String field, or an `InvalidResponse` naming what was missing.
pub(crate) fn require_str<'a>(value: &'a Value, field: &str) -> Result<&'a str, ProviderError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::InvalidResponse(format!("missing '{}' in response", field)))
}

/// Numeric field that some APIs encode as a string.
pub(crate) fn lenient_u64(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Builds a descriptor, skipping products whose names are not Level-1
/// scenes of a known sensor.
pub(crate) fn descriptor_or_skip(
    provider: &str,
    id: &str,
    name: &str,
) -> Option<SceneDescriptor> {
    match SceneDescriptor::from_product_name(id, name) {
        Ok(descriptor) => Some(descriptor),
        Err(e) => {
            warn!(provider, product = name, error = %e, "Skipping unrecognised product");
            None
        }
    }
}
