//! Generation records and request enums.
//!
//! A `GenerationRecord` is written after the upstream call resolves, success
//! or failure, and is immutable afterwards. It exists for audit and support
//! investigation - balances are computed from the credit ledger, never from
//! these records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CustomerId, GenerationId};

/// Fallback pixel size when no aspect ratio is given.
pub const DEFAULT_IMAGE_SIZE: &str = "1024x1024";

/// An audit record of one generation attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Unique record id (ULID, time-ordered).
    pub id: GenerationId,

    /// The customer who requested the generation.
    pub customer_id: CustomerId,

    /// The prompt as the user typed it, before any enhancement.
    pub prompt: String,

    /// The enhanced prompt actually sent upstream, when enhancement ran.
    pub enhanced_prompt: Option<String>,

    /// The upstream model used.
    pub model: ImageModel,

    /// Resulting image URL; unset when the generation failed.
    pub image_url: Option<String>,

    /// Outcome of the upstream call.
    pub status: GenerationStatus,

    /// Credits debited for this attempt (refunded when `status` is failed).
    pub credits_cost: i64,

    /// Request parameters (style, aspect ratio, size, provider).
    pub metadata: serde_json::Value,

    /// When the record was written.
    pub created_at: DateTime<Utc>,
}

/// Outcome of a generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// The upstream returned a usable image.
    Succeeded,

    /// The upstream failed, timed out, or returned an unusable result.
    Failed,
}

/// Supported aspect ratios, mapped to upstream pixel sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 1:1 - 1024x1024.
    #[default]
    #[serde(rename = "1:1")]
    Square,

    /// 16:9 - 1920x1080.
    #[serde(rename = "16:9")]
    Wide,

    /// 9:16 - 1080x1920.
    #[serde(rename = "9:16")]
    Tall,

    /// 4:3 - 1280x960.
    #[serde(rename = "4:3")]
    Classic,

    /// 3:4 - 960x1280.
    #[serde(rename = "3:4")]
    Portrait,
}

impl AspectRatio {
    /// The upstream pixel size for this ratio.
    #[must_use]
    pub const fn size(self) -> &'static str {
        match self {
            Self::Square => "1024x1024",
            Self::Wide => "1920x1080",
            Self::Tall => "1080x1920",
            Self::Classic => "1280x960",
            Self::Portrait => "960x1280",
        }
    }
}

/// Visual styles, mapped to enhancement hint phrases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    /// Photorealistic photography.
    Photo,

    /// Painterly artwork.
    Art,

    /// Anime / manga illustration.
    Anime,

    /// Cinematic film still.
    Cinematic,

    /// No particular style direction.
    #[default]
    Default,
}

impl Style {
    /// The style direction woven into the enhancement prompt.
    #[must_use]
    pub const fn hint(self) -> &'static str {
        match self {
            Self::Photo => {
                "photorealistic photography, natural lighting, high resolution, sharp focus, professional camera"
            }
            Self::Art => {
                "artistic masterpiece, painterly style, vibrant colors, expressive brushstrokes, gallery quality"
            }
            Self::Anime => {
                "anime style, manga illustration, cel shading, vibrant colors, Japanese animation aesthetic"
            }
            Self::Cinematic => {
                "cinematic film still, dramatic lighting, movie scene, epic composition, anamorphic lens"
            }
            Self::Default => "highly detailed, professional quality, stunning visual",
        }
    }
}

/// Upstream image models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageModel {
    /// Latest model, supports rendering CJK text.
    #[default]
    #[serde(rename = "cogview-4")]
    CogView4,

    /// GLM image model.
    #[serde(rename = "glm-image")]
    GlmImage,

    /// Fast, lower-cost model.
    #[serde(rename = "cogview-3-flash")]
    CogView3Flash,
}

impl ImageModel {
    /// The model identifier sent upstream.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CogView4 => "cogview-4",
            Self::GlmImage => "glm-image",
            Self::CogView3Flash => "cogview-3-flash",
        }
    }
}

impl std::fmt::Display for ImageModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratio_sizes() {
        assert_eq!(AspectRatio::Square.size(), DEFAULT_IMAGE_SIZE);
        assert_eq!(AspectRatio::Wide.size(), "1920x1080");
        assert_eq!(AspectRatio::Portrait.size(), "960x1280");
    }

    #[test]
    fn aspect_ratio_deserializes_from_ratio_string() {
        let ratio: AspectRatio = serde_json::from_str("\"16:9\"").unwrap();
        assert_eq!(ratio, AspectRatio::Wide);
    }

    #[test]
    fn unknown_aspect_ratio_rejected() {
        assert!(serde_json::from_str::<AspectRatio>("\"2:1\"").is_err());
    }

    #[test]
    fn model_identifiers() {
        assert_eq!(ImageModel::CogView4.as_str(), "cogview-4");
        let model: ImageModel = serde_json::from_str("\"cogview-3-flash\"").unwrap();
        assert_eq!(model, ImageModel::CogView3Flash);
    }

    #[test]
    fn default_style_has_a_hint() {
        assert!(!Style::Default.hint().is_empty());
    }
}
