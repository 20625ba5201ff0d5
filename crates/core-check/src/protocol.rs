//! Wire schema of the remote checking service.
//!
//! The service's linguistic judgment is opaque; all we specify is the JSON
//! shape we accept. Deserialization is deliberately defensive: every field
//! that can be absent defaults, and anything that still fails to decode is
//! treated by the client as "no result" rather than an error the pipeline
//! could see.

use serde::Deserialize;

/// A full response to one check request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckResponse {
    #[serde(default)]
    pub matches: Vec<RawMatch>,
    #[serde(default)]
    pub language: Option<ResponseLanguage>,
}

/// Language block; only the detected language matters to us.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponseLanguage {
    #[serde(rename = "detectedLanguage", default)]
    pub detected_language: Option<LanguageRef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LanguageRef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
}

/// One flagged span, offsets in chars into the exact submitted text.
/// Opaque and immutable once received.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawMatch {
    pub offset: usize,
    pub length: usize,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub replacements: Vec<Replacement>,
    #[serde(default)]
    pub rule: Option<Rule>,
    #[serde(default)]
    pub sentence: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Replacement {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct Rule {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "issueType", default)]
    pub issue_type: Option<String>,
    #[serde(default)]
    pub category: Option<RuleCategory>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct RuleCategory {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}
