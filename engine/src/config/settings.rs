// Engine settings, loaded from a JSON file; every field has a default.
use crate::error::EngineError;
use serde::Deserialize;
use shared::models::IndicatorSpec;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    pub data_dir: PathBuf,
    pub news_dir: PathBuf,
    pub lookback_days: u32,
    pub normalize: bool,
    pub sma_windows: Vec<usize>,
    pub rsi_window: Option<usize>,
    pub max_concurrent_fetches: usize,
    pub csv_delimiter: String, // Should be a single byte, JSON string is easier
    pub news_days: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            data_dir: PathBuf::from("data/prices"),
            news_dir: PathBuf::from("data/news"),
            lookback_days: 30,
            normalize: true,
            sma_windows: vec![50],
            rsi_window: Some(14),
            max_concurrent_fetches: 4,
            csv_delimiter: ",".to_string(),
            news_days: 7,
        }
    }
}

impl EngineSettings {
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw).map_err(|e| match e {
            EngineError::ConfigError(msg) => EngineError::ConfigError(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, EngineError> {
        let settings: EngineSettings = serde_json::from_str(raw)
            .map_err(|e| EngineError::ConfigError(format!("Invalid settings JSON: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_concurrent_fetches == 0 {
            return Err(EngineError::ConfigError("max_concurrent_fetches must be at least 1".to_string()));
        }
        if self.sma_windows.iter().chain(self.rsi_window.iter()).any(|w| *w == 0) {
            return Err(EngineError::ConfigError("indicator windows must be at least 1".to_string()));
        }
        self.delimiter()?;
        Ok(())
    }

    pub fn delimiter(&self) -> Result<u8, EngineError> {
        match self.csv_delimiter.as_bytes() {
            [byte] => Ok(*byte),
            _ => Err(EngineError::ConfigError(format!(
                "csv_delimiter must be a single byte, got '{}'",
                self.csv_delimiter
            ))),
        }
    }

    pub fn indicator_specs(&self) -> Vec<IndicatorSpec> {
        let mut specs: Vec<IndicatorSpec> = self
            .sma_windows
            .iter()
            .map(|&window| IndicatorSpec::Sma { window })
            .collect();
        specs.extend(self.rsi_window.map(|window| IndicatorSpec::Rsi { window }));
        specs
    }
}
