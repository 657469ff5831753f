use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, Result};

/// Tunables for one document-processing pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Paragraphs with fewer digit-free words are dropped.
    pub min_words_per_paragraph: usize,
    /// Near-duplicate clusters of at least this size are dropped entirely.
    pub max_paragraph_repetitions: usize,
    /// Vertical distance within which spans share a line.
    pub line_y_tolerance: f32,
    /// Runs drawn larger than this are treated as watermarks.
    pub watermark_font_size: f32,
    /// Padding applied to a paragraph box before scoping evidence lines.
    pub evidence_bbox_padding: f32,
    /// Fuzzy score a match has to reach, on a 0..=100 scale.
    pub fuzzy_threshold: u8,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            min_words_per_paragraph: 6,
            max_paragraph_repetitions: 3,
            line_y_tolerance: 2.5,
            watermark_font_size: 20.0,
            evidence_bbox_padding: 1.5,
            fuzzy_threshold: 90,
        }
    }
}

impl ReaderConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|source| LayoutError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&data).map_err(|err| LayoutError::InvalidConfig {
                field: "config",
                reason: err.to_string(),
            })?;
        config.validated()
    }

    /// Consume the config, returning it only when every field is usable.
    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_paragraph_repetitions == 0 {
            return Err(invalid("max_paragraph_repetitions", "must be at least 1"));
        }
        positive("line_y_tolerance", self.line_y_tolerance)?;
        positive("watermark_font_size", self.watermark_font_size)?;
        if !self.evidence_bbox_padding.is_finite() || self.evidence_bbox_padding < 0.0 {
            return Err(invalid(
                "evidence_bbox_padding",
                "must be a finite, non-negative number",
            ));
        }
        if self.fuzzy_threshold > 100 {
            return Err(invalid("fuzzy_threshold", "must be within 0..=100"));
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be positive, got {value}")))
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> LayoutError {
    LayoutError::InvalidConfig {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ReaderConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_tolerance() {
        let config = ReaderConfig {
            line_y_tolerance: 0.0,
            ..ReaderConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            LayoutError::InvalidConfig {
                field: "line_y_tolerance",
                ..
            }
        ));
    }

    #[test]
    fn rejects_zero_repetition_limit() {
        let config = ReaderConfig {
            max_paragraph_repetitions: 0,
            ..ReaderConfig::default()
        };
        assert!(config.validated().is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ReaderConfig =
            serde_json::from_str(r#"{ "min_words_per_paragraph": 10 }"#).unwrap();
        assert_eq!(config.min_words_per_paragraph, 10);
        assert_eq!(config.max_paragraph_repetitions, 3);
    }

    #[test]
    fn negative_word_minimum_fails_to_parse() {
        let parsed = serde_json::from_str::<ReaderConfig>(r#"{ "min_words_per_paragraph": -1 }"#);
        assert!(parsed.is_err());
    }
}
