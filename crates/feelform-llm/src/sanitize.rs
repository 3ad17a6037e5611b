//! Turning untrusted model output into bounded values.
//!
//! Only [`extract_json`] can fail. Every field resolver is total: a missing,
//! mistyped or out-of-range value is replaced and clamped, never propagated.

use std::str::FromStr;

use serde_json::{Map, Value};

use feelform_core::errors::GatewayError;
use feelform_core::value::{finite_number, truncate_chars};

pub type JsonObject = Map<String, Value>;

/// Extract the first JSON object from free-form model output.
///
/// Tries a strict parse first, then every balanced `{...}` span in order of
/// its opening brace. Braces inside string literals are ignored while
/// matching.
pub fn extract_json(raw: &str) -> Result<JsonObject, GatewayError> {
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(raw.trim()) {
        return Ok(obj);
    }

    for (start, end) in balanced_spans(raw.as_bytes()) {
        if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(&raw[start..=end]) {
            return Ok(obj);
        }
    }

    Err(GatewayError::malformed(raw))
}

/// Every matched `{`/`}` pair, found in a single pass and sorted by start.
/// Unclosed braces stay on the stack and never produce a span.
fn balanced_spans(bytes: &[u8]) -> Vec<(usize, usize)> {
    let mut open = Vec::new();
    let mut spans = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            // Quotes only matter inside an object.
            b'"' if !open.is_empty() => in_string = true,
            b'{' => open.push(i),
            b'}' => {
                if let Some(start) = open.pop() {
                    spans.push((start, i));
                }
            }
            _ => {}
        }
    }
    spans.sort_unstable_by_key(|&(start, _)| start);
    spans
}

/// A numeric field bounded to `[min, max]`.
///
/// `K` is the trusted input the fallback formula is computed from.
pub struct NumberField<K> {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub fallback: Option<fn(&K) -> f64>,
}

impl<K> NumberField<K> {
    pub fn resolve(&self, obj: Option<&JsonObject>, known: &K) -> f64 {
        let value = obj
            .and_then(|o| o.get(self.name))
            .and_then(finite_number)
            .unwrap_or_else(|| self.fallback_value(known));
        self.clamp(value)
    }

    /// The fallback formula is clamped like any other source.
    pub fn fallback_value(&self, known: &K) -> f64 {
        let value = self.fallback.map_or(self.default, |f| f(known));
        if value.is_finite() {
            self.clamp(value)
        } else {
            self.clamp(self.default)
        }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// A free-text field, trimmed and truncated to `max_chars`.
pub struct TextField {
    pub name: &'static str,
    pub max_chars: usize,
    pub default: &'static str,
}

impl TextField {
    pub fn resolve(&self, obj: &JsonObject) -> String {
        match obj.get(self.name).and_then(Value::as_str).map(str::trim) {
            Some(s) if !s.is_empty() => truncate_chars(s, self.max_chars),
            _ => self.default.to_owned(),
        }
    }
}

/// A list of short strings. Scalars are stringified, blanks dropped.
pub struct ListField {
    pub name: &'static str,
    pub max_items: usize,
    pub max_chars: usize,
    pub default: &'static [&'static str],
}

impl ListField {
    pub fn resolve(&self, obj: &JsonObject) -> Vec<String> {
        let items: Vec<String> = obj
            .get(self.name)
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(scalar_text)
                    .map(|s| truncate_chars(s.trim(), self.max_chars))
                    .filter(|s| !s.is_empty())
                    .take(self.max_items)
                    .collect()
            })
            .unwrap_or_default();

        if items.is_empty() {
            self.default.iter().map(|s| (*s).to_owned()).collect()
        } else {
            items
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Resolve an enum field. Out-of-set or missing tags become `default`.
pub fn resolve_enum<T: FromStr>(obj: &JsonObject, name: &str, default: T) -> T {
    obj.get(name)
        .and_then(Value::as_str)
        .and_then(|s| s.trim().to_ascii_lowercase().parse().ok())
        .unwrap_or(default)
}

/// A nested object field, if present and actually an object.
pub fn object_field<'a>(obj: &'a JsonObject, name: &str) -> Option<&'a JsonObject> {
    obj.get(name).and_then(Value::as_object)
}
