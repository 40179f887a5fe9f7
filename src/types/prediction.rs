//! Ranked prediction data structures

use serde::Serialize;
use std::fmt;

/// One class paired with its model output value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Position in the model output vector
    pub index: usize,
    /// Class name from the label table
    pub class_name: String,
    /// Model output at `index` (0.0 - 1.0 for softmax heads)
    pub probability: f32,
}

impl Prediction {
    pub fn new(index: usize, class_name: impl Into<String>, probability: f32) -> Self {
        Self {
            index,
            class_name: class_name.into(),
            probability,
        }
    }
}

impl fmt::Display for Prediction {
    /// `<label>: <probability>` with exactly six decimals
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class_name, fixed6(self.probability))
    }
}

/// Six-decimal fixed point where exact halves round away from zero.
///
/// `{:.6}` rounds exact halves to even instead. An f32 sits exactly halfway
/// between two six-decimal values only when it is an odd multiple of 1/128.
pub fn fixed6(value: f32) -> String {
    if value == 0.0 {
        // Also drops the sign of -0.0
        return "0.000000".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let scaled = f64::from(value).abs() * 128.0;
    if scaled.fract() == 0.0 && scaled % 2.0 == 1.0 {
        // value * 10^6 = m * 7812.5 for odd m; take the upper neighbour
        let micros = (scaled as u64 * 15_625 + 1) / 2;
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{}{}.{:06}", sign, micros / 1_000_000, micros % 1_000_000);
    }

    format!("{:.6}", value)
}

/// Content of the prediction list; each render replaces the previous one
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum PredictionList {
    #[default]
    Empty,
    Ranked(Vec<Prediction>),
    Error(String),
}

impl PredictionList {
    /// Text of every entry, in display order
    pub fn entries(&self) -> Vec<String> {
        match self {
            PredictionList::Empty => Vec::new(),
            PredictionList::Ranked(predictions) => {
                predictions.iter().map(ToString::to_string).collect()
            }
            PredictionList::Error(message) => {
                vec![format!("Error durante la predicción: {}", message)]
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, PredictionList::Empty)
    }
}
