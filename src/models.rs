//! Records exchanged with the mirror backend.
//!
//! Response types are lenient: missing fields and explicit `null`s fall back
//! to the field's default, the way the form renders a partially filled
//! record rather than refusing it.

use serde::{Deserialize, Deserializer, Serialize};

/// Confidence assigned to a record when none is given.
pub const DEFAULT_CONFIDENCE: f64 = 0.7;

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

/// Treats `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default_confidence<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(DEFAULT_CONFIDENCE))
}

/// A typed statement about a subject, e.g. `{type: "employer", value: "Acme"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
    #[serde(
        default = "default_confidence",
        deserialize_with = "null_as_default_confidence"
    )]
    pub confidence: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
}

impl Default for Fact {
    fn default() -> Self {
        Self {
            kind: String::new(),
            value: String::new(),
            confidence: DEFAULT_CONFIDENCE,
            source: String::new(),
        }
    }
}

/// A subject's stated or inferred preference within a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preference {
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
    #[serde(
        default = "default_confidence",
        deserialize_with = "null_as_default_confidence"
    )]
    pub confidence: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
}

impl Default for Preference {
    fn default() -> Self {
        Self {
            category: String::new(),
            value: String::new(),
            confidence: DEFAULT_CONFIDENCE,
            source: String::new(),
        }
    }
}

/// Writing style the backend derived for a subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleGuide {
    #[serde(default, deserialize_with = "null_as_default")]
    pub subject_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tone: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub writing_examples: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub response_tips: Vec<String>,
}

/// `GET /facts/{subject_id}` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactsDocument {
    #[serde(default)]
    pub facts: Option<Vec<Fact>>,
    #[serde(default)]
    pub preferences: Option<Vec<Preference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleGuide>,
}

impl FactsDocument {
    pub fn facts_len(&self) -> usize {
        self.facts.as_ref().map_or(0, Vec::len)
    }

    pub fn preferences_len(&self) -> usize {
        self.preferences.as_ref().map_or(0, Vec::len)
    }
}

/// `POST /facts/{subject_id}` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveFactsRequest {
    pub facts: Vec<Fact>,
    pub preferences: Vec<Preference>,
}

/// `POST /facts/{subject_id}` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveFactsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ok: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub facts_count: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub preferences_count: usize,
}

/// `POST /chat` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub subject_id: String,
    pub message: String,
    pub voice: bool,
    pub voice_id: String,
}

/// `POST /chat` response. Citations are passed through uninterpreted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatReply {
    #[serde(default, deserialize_with = "null_as_default")]
    pub reply: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub citations: Vec<serde_json::Value>,
    #[serde(default)]
    pub audio_url: Option<String>,
}

/// A file selected for upload to `/ingest/files`.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}
