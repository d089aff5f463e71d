use crate::protocol::window::{DataWindow, EventFlag, Prediction};
use serde_json::{Map, Value};

/// Message tag carrying a telemetry window.
pub const DATA_WINDOW_TAG: &str = "new_data_window";

const CHANNEL_FIELDS: [&str; 3] = ["ch1", "ch2", "ch3"];

/// Outcome of decoding one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Window(DataWindow),
    /// Message kind this client does not consume.
    Ignored { kind: String },
}

/// A recognized message whose payload has the wrong shape.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed message at `{field}`: {reason}")]
pub struct MalformedMessage {
    pub field: String,
    pub reason: String,
}

impl MalformedMessage {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type DecodeResult = Result<Decoded, MalformedMessage>;

/// Parses a raw text frame and decodes it.
pub fn decode_text(text: &str) -> DecodeResult {
    let value: Value = serde_json::from_str(text)
        .map_err(|err| MalformedMessage::new("payload", format!("invalid JSON: {err}")))?;
    decode(&value)
}

/// Decodes an already-parsed message.
pub fn decode(message: &Value) -> DecodeResult {
    let object = message
        .as_object()
        .ok_or_else(|| MalformedMessage::new("type", "message is not an object"))?;
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| MalformedMessage::new("type", "missing string discriminator"))?;

    if kind != DATA_WINDOW_TAG {
        return Ok(Decoded::Ignored {
            kind: kind.to_string(),
        });
    }

    let data = object
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| MalformedMessage::new("data", "expected an object"))?;

    let station_id = data
        .get("station_id")
        .and_then(Value::as_str)
        .ok_or_else(|| MalformedMessage::new("station_id", "expected a string"))?
        .to_string();

    let [a, b, c] = CHANNEL_FIELDS;
    let channel_a = channel(data, a)?;
    let channel_b = channel(data, b)?;
    let channel_c = channel(data, c)?;
    let prediction = prediction(data)?;

    Ok(Decoded::Window(DataWindow::new(
        station_id, channel_a, channel_b, channel_c, prediction,
    )))
}

fn channel(data: &Map<String, Value>, field: &str) -> Result<Vec<f64>, MalformedMessage> {
    let samples = data
        .get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| MalformedMessage::new(field, "expected a numeric array"))?;

    samples
        .iter()
        .enumerate()
        .map(|(idx, sample)| {
            sample.as_f64().ok_or_else(|| {
                MalformedMessage::new(field, format!("sample {idx} is not a number"))
            })
        })
        .collect()
}

fn prediction(data: &Map<String, Value>) -> Result<Prediction, MalformedMessage> {
    let tuple = data
        .get("prediction")
        .and_then(Value::as_array)
        .ok_or_else(|| MalformedMessage::new("prediction", "expected a 3-element array"))?;

    let [flag, magnitude, p_arrival] = tuple.as_slice() else {
        return Err(MalformedMessage::new(
            "prediction",
            format!("expected 3 elements, got {}", tuple.len()),
        ));
    };

    let is_event = flag
        .as_f64()
        .filter(|v| *v == 0.0 || *v == 1.0)
        .and_then(|v| EventFlag::from_indicator(v as u8))
        .ok_or_else(|| MalformedMessage::new("prediction[0]", format!("expected 0 or 1, got {flag}")))?;

    let magnitude = match magnitude {
        Value::Null => None,
        other => Some(other.as_f64().ok_or_else(|| {
            MalformedMessage::new("prediction[1]", format!("expected number or null, got {other}"))
        })?),
    };

    let p_arrival_sample_index = match p_arrival {
        Value::Null => None,
        other => Some(sample_index(other).ok_or_else(|| {
            MalformedMessage::new(
                "prediction[2]",
                format!("expected integral sample index or null, got {other}"),
            )
        })?),
    };

    Ok(Prediction::new(is_event, magnitude, p_arrival_sample_index))
}

/// Accepts integers and integral floats (`120` and `120.0`).
fn sample_index(value: &Value) -> Option<i64> {
    if let Some(idx) = value.as_i64() {
        return Some(idx);
    }
    let float = value.as_f64()?;
    if float.fract() == 0.0 && float >= i64::MIN as f64 && float < i64::MAX as f64 {
        Some(float as i64)
    } else {
        None
    }
}
