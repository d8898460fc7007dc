//! Classifier configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{ClassifierError, Label};

/// Classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// ONNX model path. Without one the classifier reports `fallback_label`.
    pub model_path: Option<PathBuf>,

    /// Square model input edge in pixels
    pub input_size: u32,

    /// Probability at or above which a frame is drowsy
    pub drowsy_threshold: f32,

    /// Label reported when no model is loaded
    pub fallback_label: Label,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            input_size: 224,
            drowsy_threshold: 0.5,
            fallback_label: Label::Alert,
        }
    }
}

impl ClassifierConfig {
    /// Check value ranges
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.input_size == 0 {
            return Err(ClassifierError::Config("input_size must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.drowsy_threshold) {
            return Err(ClassifierError::Config(format!(
                "drowsy_threshold {} outside [0, 1]",
                self.drowsy_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ClassifierConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range() {
        let config = ClassifierConfig {
            drowsy_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ClassifierError::Config(_))));

        let config = ClassifierConfig {
            input_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: ClassifierConfig =
            serde_json::from_str(r#"{ "drowsy_threshold": 0.7 }"#).unwrap();
        assert_eq!(config.input_size, 224);
        assert_eq!(config.drowsy_threshold, 0.7);
        assert!(config.model_path.is_none());
    }
}
