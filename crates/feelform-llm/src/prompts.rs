use std::fmt::Write as _;

use feelform_core::value::truncate_chars;

use crate::feeling::Feeling;
use crate::motion::{MotionMode, PARAM_FIELDS};
use crate::provider::CompletionRequest;

/// Longest user text forwarded to the model, in characters.
pub const MAX_INPUT_CHARS: usize = 280;

const FEELING_SYSTEM: &str = "You are an emotion analysis API. Quantify the feeling of the \
user's text and reply with the requested JSON only. Do not write anything else.";

const MOTION_SYSTEM: &str = "You are a motion designer for an abstract generative animation. \
Translate the user's text and its feeling scores into animation parameters. Reply with the \
requested JSON only. Do not write anything else.";

/// Trim and cap user text. `None` when nothing is left.
pub fn prepare_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(truncate_chars(trimmed, MAX_INPUT_CHARS))
    }
}

pub fn feeling_request(text: &str) -> CompletionRequest {
    let user = format!(
        "Analyze the feeling of the following text and return JSON only.\n\n\
         Required output JSON:\n\
         {{\n  \"warmth\": 0-1,\n  \"calm\": 0-1,\n  \"energy\": 0-1,\n  \"keywords\": [\"...\", \"...\"]\n}}\n\n\
         Text:\n\"\"\"{text}\"\"\""
    );
    CompletionRequest {
        system: FEELING_SYSTEM.to_owned(),
        user,
    }
}

pub fn motion_request(text: &str, feeling: &Feeling) -> CompletionRequest {
    let modes = MotionMode::ALL
        .iter()
        .map(|m| format!("\"{m}\""))
        .collect::<Vec<_>>()
        .join(" | ");

    let mut params = String::new();
    for field in PARAM_FIELDS {
        let _ = writeln!(params, "    \"{}\": {}-{},", field.name, field.min, field.max);
    }

    let user = format!(
        "Design a motion plan for the following text and return JSON only.\n\n\
         Feeling scores: warmth={:.2}, calm={:.2}, energy={:.2}, keywords={}\n\n\
         Required output JSON:\n\
         {{\n  \"mood\": \"short label\",\n  \"evidence\": \"short quote from the text\",\n  \
         \"motion\": {modes},\n  \"params\": {{\n{params}  }}\n}}\n\n\
         Text:\n\"\"\"{text}\"\"\"",
        feeling.warmth,
        feeling.calm,
        feeling.energy,
        feeling.keywords.join(", "),
    );
    CompletionRequest {
        system: MOTION_SYSTEM.to_owned(),
        user,
    }
}
