/// Configuration management
use chrono::Duration;
use credential_core::SignerConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub server_host: String,
    #[serde(default = "default_port")]
    pub server_port: u16,
    pub database_url: String,

    /// Signing secret for access tokens. Independent from the refresh secret
    /// so a compromise of one does not let an attacker forge the other.
    pub access_token_secret: String,
    pub refresh_token_secret: String,

    #[serde(default = "default_issuer")]
    pub token_issuer: String,
    #[serde(default = "default_access_audience")]
    pub access_token_audience: String,
    #[serde(default = "default_refresh_audience")]
    pub refresh_token_audience: String,

    #[serde(default = "default_access_ttl_minutes")]
    pub access_token_ttl_minutes: i64,
    #[serde(default = "default_refresh_ttl_days")]
    pub refresh_token_ttl_days: i64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8084
}

fn default_issuer() -> String {
    "classloop-auth".to_string()
}

fn default_access_audience() -> String {
    "classloop:access".to_string()
}

fn default_refresh_audience() -> String {
    "classloop:refresh".to_string()
}

fn default_access_ttl_minutes() -> i64 {
    15
}

fn default_refresh_ttl_days() -> i64 {
    30
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Materialize the immutable signing configuration.
    pub fn signer_config(&self) -> SignerConfig {
        SignerConfig {
            access_secret: self.access_token_secret.clone(),
            refresh_secret: self.refresh_token_secret.clone(),
            issuer: self.token_issuer.clone(),
            access_audience: self.access_token_audience.clone(),
            refresh_audience: self.refresh_token_audience.clone(),
            access_ttl: Duration::minutes(self.access_token_ttl_minutes),
            refresh_ttl: Duration::days(self.refresh_token_ttl_days),
        }
    }
}
