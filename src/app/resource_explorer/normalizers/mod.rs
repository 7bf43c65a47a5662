use crate::app::resource_explorer::state::*;
use anyhow::Result;

pub mod ec2;
pub mod network;
pub mod s3;
pub mod security_groups;

pub use ec2::*;
pub use network::*;
pub use s3::*;
pub use security_groups::*;

/// Trait for normalizing backend payloads of one resource family into the
/// canonical record shape
pub trait ResourceNormalizer {
    type Output;

    /// Normalize a raw backend response body.
    ///
    /// `region` is the region the query was issued for, or [`ABSENT`] when
    /// the backend chose its own default. Per-resource region fields in the
    /// payload take precedence.
    fn normalize(&self, raw_response: serde_json::Value, region: &str) -> Result<Self::Output>;

    /// Get the resource family this normalizer handles
    fn family(&self) -> ResourceFamily;
}

pub mod utils {
    use super::*;
    use serde_json::Value;

    /// Values the backend uses to say "no value"
    fn is_placeholder(s: &str) -> bool {
        let trimmed = s.trim();
        trimmed.is_empty() || trimmed == "N/A" || trimmed == ABSENT
    }

    /// Read a scalar field as a display string, substituting [`ABSENT`] for
    /// missing, null, empty and "N/A" values
    pub fn field(raw: &Value, key: &str) -> String {
        match raw.get(key) {
            Some(Value::String(s)) if !is_placeholder(s) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => ABSENT.to_string(),
        }
    }

    /// Like [`field`], trying each key in turn
    pub fn first_field(raw: &Value, keys: &[&str]) -> String {
        keys.iter()
            .map(|k| field(raw, k))
            .find(|v| !is_absent(v))
            .unwrap_or_else(|| ABSENT.to_string())
    }

    pub fn flag(raw: &Value, key: &str) -> bool {
        raw.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    pub fn count(raw: &Value, key: &str) -> u64 {
        raw.get(key).and_then(|v| v.as_u64()).unwrap_or(0)
    }

    /// Extract the tag sequence. Accepts `tags` or `Tags`, and both
    /// `{Key, Value}` and `{key, value}` entries. Malformed entries are
    /// skipped; the result is empty rather than absent.
    pub fn extract_tags(raw: &Value) -> Vec<ResourceTag> {
        let Some(tags) = raw
            .get("tags")
            .or_else(|| raw.get("Tags"))
            .and_then(|v| v.as_array())
        else {
            return Vec::new();
        };

        tags.iter()
            .filter_map(|tag| match serde_json::from_value::<ResourceTag>(tag.clone()) {
                Ok(t) => Some(t),
                Err(e) => {
                    tracing::debug!("Skipping malformed tag {}: {}", tag, e);
                    None
                }
            })
            .collect()
    }

    /// Pick a display name: the first present name field, then a `Name` tag,
    /// then the resource id
    pub fn extract_display_name(
        raw: &Value,
        name_keys: &[&str],
        tags: &[ResourceTag],
        fallback_id: &str,
    ) -> String {
        let name = first_field(raw, name_keys);
        if !is_absent(&name) {
            return name;
        }

        if let Some(tag) = tags.iter().find(|t| t.key == "Name" && !is_placeholder(&t.value)) {
            return tag.value.clone();
        }

        fallback_id.to_string()
    }

    /// Describe a JSON value's shape for error messages
    pub fn kind_of(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "a list",
            Value::Object(_) => "an object",
        }
    }

    /// Elements of an array field, empty if the field is missing or not an array
    pub fn array<'a>(raw: &'a Value, key: &str) -> &'a [Value] {
        raw.get(key)
            .and_then(|v| v.as_array())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

}
