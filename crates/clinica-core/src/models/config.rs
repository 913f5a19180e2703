//! Configuration structures for the ingestion pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::error::ConfigError;
use crate::report::{PatternTable, ReportParser};

/// Main configuration for the clinica pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicaConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Field patterns for surgical reports.
    pub parser: PatternTable,

    /// Reference matching configuration.
    pub matching: MatchingConfig,

    /// Backend connection.
    pub backend: BackendConfig,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Document language (informational; the recognition model decides).
    pub language: String,

    /// Directory containing model files. Unset means the per-user data dir.
    pub model_dir: Option<PathBuf>,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Keep the recognizer's `[UNK]` tokens instead of blanking them.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "spa".to_string(),
            model_dir: None,
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            keep_unk: false,
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Try the empty user password on encrypted PDFs.
    pub decrypt_empty_password: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            decrypt_empty_password: true,
        }
    }
}

/// Reference matching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Characters of the practice text compared against study names.
    pub study_prefix_chars: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            study_prefix_chars: 20,
        }
    }
}

/// Backend connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the clinic API, e.g. `https://api.example.com/v1/`.
    pub base_url: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
        }
    }
}

impl BackendConfig {
    /// Validate the base URL.
    ///
    /// The returned URL always ends with `/` so collection paths can be
    /// joined onto it without dropping the last segment.
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let raw = self
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingBackendUrl)?;

        let mut url = Url::parse(raw).map_err(|e| ConfigError::InvalidBackendUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBackendUrl {
                url: raw.to_string(),
                reason: "expected an http(s) URL".to_string(),
            });
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(url)
    }
}

impl ClinicaConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Compile the pattern table, failing on the first invalid pattern.
    pub fn build_parser(&self) -> Result<ReportParser, ConfigError> {
        ReportParser::from_table(&self.parser)
    }

    /// Check everything that can be checked before any file is touched:
    /// the pattern table must compile and a configured backend URL must be valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.build_parser()?;
        if self.backend.base_url.is_some() {
            self.backend.endpoint()?;
        }
        Ok(())
    }
}

impl OcrConfig {
    /// Paths of the detection model, recognition model and dictionary.
    pub fn model_files(&self, model_dir: &std::path::Path) -> [PathBuf; 3] {
        [
            model_dir.join(&self.detection_model),
            model_dir.join(&self.recognition_model),
            model_dir.join(&self.dictionary),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn backend(url: Option<&str>) -> BackendConfig {
        BackendConfig {
            base_url: url.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_endpoint_requires_url() {
        assert!(matches!(
            backend(None).endpoint(),
            Err(ConfigError::MissingBackendUrl)
        ));
        assert!(matches!(
            backend(Some("  ")).endpoint(),
            Err(ConfigError::MissingBackendUrl)
        ));
    }

    #[test]
    fn test_endpoint_appends_slash() {
        let url = backend(Some("https://api.example.com/v1")).endpoint().unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/");
        assert_eq!(
            url.join("doctors").unwrap().as_str(),
            "https://api.example.com/v1/doctors"
        );
    }

    #[test]
    fn test_endpoint_rejects_garbage() {
        assert!(matches!(
            backend(Some("not a url")).endpoint(),
            Err(ConfigError::InvalidBackendUrl { .. })
        ));
        assert!(matches!(
            backend(Some("mailto:admin@example.com")).endpoint(),
            Err(ConfigError::InvalidBackendUrl { .. })
        ));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ClinicaConfig =
            serde_json::from_str(r#"{"backend": {"base_url": "http://localhost:8080"}}"#).unwrap();
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.matching.study_prefix_chars, 20);
        assert_eq!(config.ocr.language, "spa");
        assert!(config.build_parser().is_ok());
    }

    #[test]
    fn test_validate() {
        assert!(ClinicaConfig::default().validate().is_ok());

        let mut config = ClinicaConfig::default();
        config.backend.base_url = Some("ftp://files.example.com".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBackendUrl { .. })
        ));

        let mut config = ClinicaConfig::default();
        config.parser.date = vec!["Fecha [".to_string()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_model_files() {
        let [det, rec, dict] = OcrConfig::default().model_files(std::path::Path::new("/models"));
        assert_eq!(det, PathBuf::from("/models/det.onnx"));
        assert_eq!(rec, PathBuf::from("/models/latin_rec.onnx"));
        assert_eq!(dict, PathBuf::from("/models/latin_dict.txt"));
    }
}
