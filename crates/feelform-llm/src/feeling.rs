use serde::{Deserialize, Serialize};
use serde_json::Value;

use feelform_core::errors::GatewayError;

use crate::sanitize::{extract_json, JsonObject, ListField, NumberField};

pub const WARMTH: NumberField<()> = unit_field("warmth");
pub const CALM: NumberField<()> = unit_field("calm");
pub const ENERGY: NumberField<()> = unit_field("energy");

pub const KEYWORDS: ListField = ListField {
    name: "keywords",
    max_items: 8,
    max_chars: 24,
    default: &["mood"],
};

const fn unit_field(name: &'static str) -> NumberField<()> {
    NumberField {
        name,
        min: 0.0,
        max: 1.0,
        default: 0.5,
        fallback: None,
    }
}

/// Emotional reading of a piece of text. Every score is in `[0, 1]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feeling {
    pub warmth: f64,
    pub calm: f64,
    pub energy: f64,
    pub keywords: Vec<String>,
}

impl Default for Feeling {
    fn default() -> Self {
        Self::sanitize(&JsonObject::new())
    }
}

impl Feeling {
    pub fn sanitize(obj: &JsonObject) -> Self {
        Self {
            warmth: WARMTH.resolve(Some(obj), &()),
            calm: CALM.resolve(Some(obj), &()),
            energy: ENERGY.resolve(Some(obj), &()),
            keywords: KEYWORDS.resolve(obj),
        }
    }

    /// Sanitize an arbitrary JSON value; non-objects yield the default feeling.
    pub fn from_value(value: &Value) -> Self {
        value
            .as_object()
            .map_or_else(Self::default, Self::sanitize)
    }

    /// Parse raw model output. Fails only if no JSON object can be found.
    pub fn from_model_output(raw: &str) -> Result<Self, GatewayError> {
        extract_json(raw).map(|obj| Self::sanitize(&obj))
    }
}
