pub mod cell;
pub mod feeling;
pub mod mock;
pub mod motion;
pub mod pipeline;
pub mod prompts;
pub mod provider;
pub mod sanitize;

pub use cell::PlanCell;
pub use feeling::Feeling;
pub use mock::{MockGenerator, MockResponse};
pub use motion::{MotionMode, MotionParams, MotionPlan};
pub use provider::{ChatCompletionsClient, CompletionRequest, TextGenerator};
