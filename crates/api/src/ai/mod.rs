//! AI listing assistant.
//!
//! Listing creation asks the assistant for marketing copy, and
//! search-by-image asks it to recognize a car in a photo. Both features are
//! optional: with no `GEMINI_API_KEY` the state holds no assistant, listings
//! are created without a description and image search answers 503.
//!
//! [`GeminiClient`] talks to the Google Generative Language API. Tests plug
//! in their own [`ListingAssistant`].

mod analysis;
mod client;
mod error;
mod types;

use async_trait::async_trait;

pub use analysis::{ImageAnalysis, parse_image_analysis};
pub use client::GeminiClient;
pub use error::AiError;

/// Facts about a listing used to write its description.
#[derive(Debug, Clone)]
pub struct ListingFacts {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub mileage: i32,
    pub condition: String,
    pub engine: Option<String>,
    pub transmission: Option<String>,
    pub color: Option<String>,
}

impl ListingFacts {
    /// Prompt asking for a short listing description.
    #[must_use]
    pub fn description_prompt(&self) -> String {
        let mut prompt = format!(
            "Write a compelling, honest description for a used car listing in 3 to 5 \
             sentences. Do not invent features that are not listed.\n\
             Make: {}\nModel: {}\nYear: {}\nMileage: {} miles\nCondition: {}\n",
            self.make, self.model, self.year, self.mileage, self.condition
        );
        for (label, value) in [
            ("Engine", &self.engine),
            ("Transmission", &self.transmission),
            ("Color", &self.color),
        ] {
            if let Some(value) = value {
                prompt.push_str(label);
                prompt.push_str(": ");
                prompt.push_str(value);
                prompt.push('\n');
            }
        }
        prompt
    }
}

/// Prompt asking the model to identify a car in a photo.
pub const IMAGE_ANALYSIS_PROMPT: &str = "Identify the car in this image. Respond with only a \
JSON object with the keys \"make\", \"model\", \"year\" and \"color\". Use the string \
\"unknown\" for anything you cannot determine. Do not add any other text.";

/// Generates listing copy and recognizes cars in photos.
#[async_trait]
pub trait ListingAssistant: Send + Sync {
    /// Write a description for a listing.
    async fn describe_listing(&self, facts: &ListingFacts) -> Result<String, AiError>;

    /// Identify the make, model, year and color of the car in a photo.
    async fn analyze_image(&self, image: &[u8], mime_type: &str)
    -> Result<ImageAnalysis, AiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_prompt_lists_optional_details() {
        let facts = ListingFacts {
            make: "Toyota".to_string(),
            model: "Camry".to_string(),
            year: 2018,
            mileage: 61_000,
            condition: "Good".to_string(),
            engine: Some("2.5L I4".to_string()),
            transmission: None,
            color: Some("Silver".to_string()),
        };
        let prompt = facts.description_prompt();
        assert!(prompt.contains("Make: Toyota"));
        assert!(prompt.contains("Engine: 2.5L I4"));
        assert!(prompt.contains("Color: Silver"));
        assert!(!prompt.contains("Transmission"));
    }
}
