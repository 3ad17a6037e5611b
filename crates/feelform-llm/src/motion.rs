//! Motion plan: the parameter set that drives the animation.
//!
//! Every numeric parameter has a declared range and a fallback formula
//! computed from the (already sanitized) feeling, so a plan can always be
//! completed even when the model omits or garbles fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use feelform_core::errors::GatewayError;

use crate::feeling::Feeling;
use crate::sanitize::{
    extract_json, object_field, resolve_enum, JsonObject, NumberField, TextField,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionMode {
    Breathing,
    Tremble,
    Pulse,
    #[default]
    Drift,
}

impl MotionMode {
    pub const ALL: [MotionMode; 4] = [Self::Breathing, Self::Tremble, Self::Pulse, Self::Drift];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breathing => "breathing",
            Self::Tremble => "tremble",
            Self::Pulse => "pulse",
            Self::Drift => "drift",
        }
    }
}

impl FromStr for MotionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown motion mode: {s}"))
    }
}

impl fmt::Display for MotionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const MOOD: TextField = TextField {
    name: "mood",
    max_chars: 40,
    default: "neutral",
};

pub const EVIDENCE: TextField = TextField {
    name: "evidence",
    max_chars: 120,
    default: "",
};

macro_rules! param {
    ($name:literal, $min:expr, $max:expr, $default:expr, |$f:ident| $formula:expr) => {
        NumberField {
            name: $name,
            min: $min,
            max: $max,
            default: $default,
            fallback: Some(|$f: &Feeling| $formula),
        }
    };
}

pub const HUE: NumberField<Feeling> =
    param!("hue", 0.0, 360.0, 210.0, |f| 220.0 - 200.0 * f.warmth);
pub const SAT: NumberField<Feeling> = param!("sat", 10.0, 95.0, 40.0, |f| 25.0 + 60.0 * f.energy);
pub const BRI: NumberField<Feeling> = param!("bri", 10.0, 95.0, 80.0, |f| 45.0 + 45.0 * f.calm);
pub const BASE_RADIUS: NumberField<Feeling> =
    param!("baseRadius", 70.0, 240.0, 140.0, |f| 100.0 + 110.0 * f.calm);
pub const NOISE_SCALE: NumberField<Feeling> =
    param!("noiseScale", 0.2, 1.6, 0.8, |f| 0.3 + 1.2 * f.energy);
pub const NOISE_AMP: NumberField<Feeling> = param!("noiseAmp", 5.0, 110.0, 35.0, |f| {
    10.0 + 90.0 * f.energy * (1.0 - 0.5 * f.calm)
});
pub const ROT_SPEED: NumberField<Feeling> =
    param!("rotSpeed", 0.0005, 0.016, 0.004, |f| 0.001 + 0.012 * f.energy);
pub const STROKE_W: NumberField<Feeling> =
    param!("strokeW", 0.6, 2.2, 1.2, |f| 0.8 + 1.2 * f.calm);
pub const BREATH_SPEED: NumberField<Feeling> =
    param!("breathSpeed", 0.2, 2.2, 0.9, |f| 0.3 + 1.7 * f.energy);
pub const PULSE_POWER: NumberField<Feeling> =
    param!("pulsePower", 1.0, 4.0, 2.0, |f| 1.0 + 2.8 * f.energy);
pub const JITTER: NumberField<Feeling> =
    param!("jitter", 0.0, 12.0, 2.0, |f| 12.0 * f.energy * (1.0 - f.calm));
pub const ALPHA: NumberField<Feeling> =
    param!("alpha", 20.0, 100.0, 85.0, |f| 55.0 + 40.0 * f.calm);

/// All parameter fields, in wire order.
pub const PARAM_FIELDS: [&NumberField<Feeling>; 12] = [
    &HUE,
    &SAT,
    &BRI,
    &BASE_RADIUS,
    &NOISE_SCALE,
    &NOISE_AMP,
    &ROT_SPEED,
    &STROKE_W,
    &BREATH_SPEED,
    &PULSE_POWER,
    &JITTER,
    &ALPHA,
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionParams {
    pub hue: f64,
    pub sat: f64,
    pub bri: f64,
    pub base_radius: f64,
    pub noise_scale: f64,
    pub noise_amp: f64,
    pub rot_speed: f64,
    pub stroke_w: f64,
    pub breath_speed: f64,
    pub pulse_power: f64,
    pub jitter: f64,
    pub alpha: f64,
}

impl MotionParams {
    /// Resolve every field from `raw`, falling back to formulas over `feeling`.
    pub fn sanitize(raw: Option<&JsonObject>, feeling: &Feeling) -> Self {
        Self {
            hue: HUE.resolve(raw, feeling),
            sat: SAT.resolve(raw, feeling),
            bri: BRI.resolve(raw, feeling),
            base_radius: BASE_RADIUS.resolve(raw, feeling),
            noise_scale: NOISE_SCALE.resolve(raw, feeling),
            noise_amp: NOISE_AMP.resolve(raw, feeling),
            rot_speed: ROT_SPEED.resolve(raw, feeling),
            stroke_w: STROKE_W.resolve(raw, feeling),
            breath_speed: BREATH_SPEED.resolve(raw, feeling),
            pulse_power: PULSE_POWER.resolve(raw, feeling),
            jitter: JITTER.resolve(raw, feeling),
            alpha: ALPHA.resolve(raw, feeling),
        }
    }

    /// `(wire name, value)` pairs in the same order as [`PARAM_FIELDS`].
    pub fn values(&self) -> [(&'static str, f64); 12] {
        [
            (HUE.name, self.hue),
            (SAT.name, self.sat),
            (BRI.name, self.bri),
            (BASE_RADIUS.name, self.base_radius),
            (NOISE_SCALE.name, self.noise_scale),
            (NOISE_AMP.name, self.noise_amp),
            (ROT_SPEED.name, self.rot_speed),
            (STROKE_W.name, self.stroke_w),
            (BREATH_SPEED.name, self.breath_speed),
            (PULSE_POWER.name, self.pulse_power),
            (JITTER.name, self.jitter),
            (ALPHA.name, self.alpha),
        ]
    }
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            hue: HUE.default,
            sat: SAT.default,
            bri: BRI.default,
            base_radius: BASE_RADIUS.default,
            noise_scale: NOISE_SCALE.default,
            noise_amp: NOISE_AMP.default,
            rot_speed: ROT_SPEED.default,
            stroke_w: STROKE_W.default,
            breath_speed: BREATH_SPEED.default,
            pulse_power: PULSE_POWER.default,
            jitter: JITTER.default,
            alpha: ALPHA.default,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionPlan {
    pub mood: String,
    pub evidence: String,
    pub motion: MotionMode,
    pub params: MotionParams,
}

impl Default for MotionPlan {
    fn default() -> Self {
        Self {
            mood: MOOD.default.to_owned(),
            evidence: EVIDENCE.default.to_owned(),
            motion: MotionMode::default(),
            params: MotionParams::default(),
        }
    }
}

impl MotionPlan {
    pub fn sanitize(obj: &JsonObject, feeling: &Feeling) -> Self {
        Self {
            mood: MOOD.resolve(obj),
            evidence: EVIDENCE.resolve(obj),
            motion: resolve_enum(obj, "motion", MotionMode::default()),
            params: MotionParams::sanitize(object_field(obj, "params"), feeling),
        }
    }

    /// Parse raw model output. Fails only if no JSON object can be found.
    pub fn from_model_output(raw: &str, feeling: &Feeling) -> Result<Self, GatewayError> {
        extract_json(raw).map(|obj| Self::sanitize(&obj, feeling))
    }
}
