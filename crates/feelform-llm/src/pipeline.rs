//! The two chained calls: text -> feeling, then (text, feeling) -> motion plan.
//!
//! Calls are independent per request and never retried. A malformed reply
//! fails the call; no parameters are synthesized at this layer.

use tracing::instrument;

use feelform_core::errors::GatewayError;

use crate::feeling::Feeling;
use crate::motion::MotionPlan;
use crate::prompts::{self, prepare_text};
use crate::provider::TextGenerator;

#[instrument(skip_all, fields(model = %generator.model()))]
pub async fn analyze_feeling(
    generator: &dyn TextGenerator,
    text: &str,
) -> Result<Feeling, GatewayError> {
    let text = require_text(text)?;
    let content = generator.complete(&prompts::feeling_request(&text)).await?;
    let feeling = Feeling::from_model_output(&content).inspect_err(log_failure)?;
    tracing::debug!(
        warmth = feeling.warmth,
        calm = feeling.calm,
        energy = feeling.energy,
        "feeling analyzed"
    );
    Ok(feeling)
}

/// `feeling` is the trusted input for parameter fallbacks.
#[instrument(skip_all, fields(model = %generator.model()))]
pub async fn plan_motion(
    generator: &dyn TextGenerator,
    text: &str,
    feeling: &Feeling,
) -> Result<MotionPlan, GatewayError> {
    let text = require_text(text)?;
    let content = generator
        .complete(&prompts::motion_request(&text, feeling))
        .await?;
    let plan = MotionPlan::from_model_output(&content, feeling).inspect_err(log_failure)?;
    tracing::debug!(motion = %plan.motion, mood = %plan.mood, "motion planned");
    Ok(plan)
}

/// Both calls in sequence. Either failure fails the whole request.
pub async fn feel(
    generator: &dyn TextGenerator,
    text: &str,
) -> Result<(Feeling, MotionPlan), GatewayError> {
    let feeling = analyze_feeling(generator, text).await?;
    let plan = plan_motion(generator, text, &feeling).await?;
    Ok((feeling, plan))
}

fn require_text(text: &str) -> Result<String, GatewayError> {
    prepare_text(text).ok_or_else(|| GatewayError::InvalidRequest("text is required".into()))
}

fn log_failure(err: &GatewayError) {
    if let GatewayError::MalformedModelOutput { raw } = err {
        tracing::warn!(raw_len = raw.len(), "model output contained no JSON object");
    }
}
