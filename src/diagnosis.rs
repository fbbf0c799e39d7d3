//! Diagnosis prompt, reply parsing and the seam to the generation backend.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::encoder::ImagePayload;
use crate::error::{DetectorError, Result};

/// Value of `disease` the model is told to return when the crop looks healthy.
pub const NO_DISEASE_SENTINEL: &str = "No crop disease detected.";

pub const DIAGNOSIS_PROMPT: &str = r#"You are the best in class crop disease detector equipped with cutting-edge technology to identify and diagnose even the most elusive crop diseases with precision and speed. Detect the disease in the crop image below and provide details on the disease, its cause, and precautions to take to prevent it.

KEY POINTS:
- Return JSON only. Do not wrap it in a code block and do not write "json" before it.

Return the result with exactly this structure:
{
  "disease": "The disease detected in the crop.",
  "cause": "The cause of the disease.",
  "precautions": ["The precautions to take to prevent the disease, one per string."]
}

If no disease is detected, return:
{
  "disease": "No crop disease detected.",
  "cause": "N/A",
  "precautions": ["N/A"]
}
"#;

/// Anything that can answer a text prompt about a set of images.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, prompt: &str, images: &[ImagePayload]) -> Result<String>;
}

/// Parsed model reply. Keys the model left out (or sent as `null`) stay `None`;
/// non-string values are kept as their JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    #[serde(default, deserialize_with = "lenient_text")]
    pub disease: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub cause: Option<String>,
    #[serde(default)]
    pub precautions: Precautions,
}

impl DiagnosisResult {
    pub fn is_negative(&self) -> bool {
        self.disease.as_deref() == Some(NO_DISEASE_SENTINEL)
    }
}

/// `precautions` as the model sent it: any array becomes a list, anything else is unavailable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Precautions {
    List(Vec<String>),
    Unavailable(Value),
}

impl Default for Precautions {
    fn default() -> Self {
        Precautions::Unavailable(Value::Null)
    }
}

impl<'de> Deserialize<'de> for Precautions {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => Precautions::List(items.into_iter().map(display_text).collect()),
            other => Precautions::Unavailable(other),
        })
    }
}

/// Text shown for a JSON value: strings verbatim, `null` empty, the rest as JSON.
fn display_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        other => Some(display_text(other)),
    })
}

impl Precautions {
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Precautions::List(items) => Some(items.as_slice()),
            Precautions::Unavailable(_) => None,
        }
    }
}

/// Strips a surrounding markdown code fence (```json ... ```), if any.
pub fn extract_json(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // drop the info string ("json") on the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parses the model's text reply. Only a JSON object is accepted; its fields are not type-checked.
pub fn parse_reply(reply: &str) -> Result<DiagnosisResult> {
    let value: Value = serde_json::from_str(extract_json(reply))?;
    if !value.is_object() {
        return Err(DetectorError::NotAnObject);
    }
    Ok(serde_json::from_value(value)?)
}

/// Sends the fixed prompt plus `images` to `model` and parses what comes back.
pub async fn diagnose(model: &dyn GenerativeModel, images: &[ImagePayload]) -> Result<DiagnosisResult> {
    if images.is_empty() {
        return Err(DetectorError::NoImage);
    }

    info!(images = images.len(), "requesting crop diagnosis");
    let reply = model.generate(DIAGNOSIS_PROMPT, images).await?;
    debug!(reply = %reply, "model reply");

    let result = parse_reply(&reply).inspect_err(|e| warn!(error = %e, "could not parse model reply"))?;
    info!(disease = ?result.disease, negative = result.is_negative(), "diagnosis parsed");
    Ok(result)
}
