use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Caller-supplied extraction settings, usually loaded from a TOML file.
/// Each format section is optional; an importer only needs its own.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    pub email: Option<EmailConfig>,
    pub csv: Option<CsvConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Statement year; the email format's date tokens carry only month/day.
    pub year: i32,
    #[serde(default = "default_home_currency")]
    pub currency: String,
    /// Funding source string → offsetting account path.
    #[serde(default)]
    pub funding_accounts: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CsvConfig {
    /// Home account offsetting every entry of this format.
    pub cash_account: String,
    #[serde(default = "default_statement_currency")]
    pub currency: String,
    /// Type code whose descriptions carry an embedded transaction date.
    #[serde(default = "default_card_marker")]
    pub card_marker: String,
}

fn default_home_currency() -> String {
    "RMB".to_string()
}

fn default_statement_currency() -> String {
    "SGD".to_string()
}

fn default_card_marker() -> String {
    "DEBIT PURCHASE".to_string()
}

impl ExtractConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}
