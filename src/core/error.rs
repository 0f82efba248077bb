use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GateError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Rulebook parse error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Rulebook render error: {0}")]
    TomlRenderError(#[from] toml::ser::Error),
    #[error("Invalid rulebook: {0}")]
    RulesError(String),
    #[error("Not found: {0}")]
    NotFound(PathBuf),
    #[error("Delivery blocked: {0}")]
    ValidationError(String),
}

impl GateError {
    /// True when the error means "the gate ran and blocked release", as opposed
    /// to an environment failure that prevented the gate from running.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::ValidationError(_))
    }
}
