//! Parsing of the model's image-recognition reply.
//!
//! Models wrap JSON in Markdown fences, add prose around it, answer
//! "unknown" and give years as strings like "circa 2019". The parser
//! tolerates all of that and keeps only usable values.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use super::AiError;

static YEAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4})\b").expect("year pattern is a valid regex")
});

/// Placeholder answers that mean "not recognized".
const UNKNOWN_VALUES: &[&str] = &["unknown", "n/a", "na", "none", "null", "unsure", "-"];

/// Plausible model years.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1886..=2100;

/// Years either side of a recognized year that still count as similar.
pub const YEAR_TOLERANCE: i32 = 2;

/// What the model recognized in a photo. Absent fields were not recognized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageAnalysis {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub color: Option<String>,
}

impl ImageAnalysis {
    /// Whether nothing at all was recognized.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.make.is_none() && self.model.is_none() && self.year.is_none() && self.color.is_none()
    }

    /// Inclusive year window around the recognized year.
    #[must_use]
    pub const fn year_window(&self) -> Option<(i32, i32)> {
        match self.year {
            Some(y) => Some((y.saturating_sub(YEAR_TOLERANCE), y.saturating_add(YEAR_TOLERANCE))),
            None => None,
        }
    }
}

/// Parse the raw text of an image-recognition reply.
///
/// # Errors
///
/// Returns `AiError::Parse` if the reply contains no JSON object.
pub fn parse_image_analysis(raw: &str) -> Result<ImageAnalysis, AiError> {
    let json = extract_json_object(raw)
        .ok_or_else(|| AiError::Parse(format!("no JSON object in reply: {raw:.200}")))?;
    let value: Value = serde_json::from_str(json)
        .map_err(|e| AiError::Parse(format!("invalid JSON in reply: {e}")))?;
    let Value::Object(fields) = value else {
        return Err(AiError::Parse("reply is not a JSON object".to_string()));
    };

    Ok(ImageAnalysis {
        make: fields.get("make").and_then(known_text),
        model: fields.get("model").and_then(known_text),
        year: fields.get("year").and_then(extract_year),
        color: fields.get("color").and_then(known_text),
    })
}

/// Strip Markdown fences and surrounding prose, returning the outermost
/// `{...}` span.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| raw.get(start..=end)).flatten()
}

/// A string value that is neither blank nor a placeholder.
fn known_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let lower = text.to_lowercase();
    (!text.is_empty() && !UNKNOWN_VALUES.contains(&lower.as_str())).then_some(text)
}

/// The first standalone four-digit number, if it is a plausible model year.
fn extract_year(value: &Value) -> Option<i32> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let captures = YEAR_PATTERN.captures(&text)?;
    let year = captures.get(1)?.as_str().parse::<i32>().ok()?;
    YEAR_RANGE.contains(&year).then_some(year)
}
