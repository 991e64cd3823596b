//! Application configuration management.

use base64::Engine as _;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Central database configuration.
    pub database: DatabaseConfig,
    /// Field encryption configuration.
    #[serde(default)]
    pub encryption: EncryptionConfig,
    /// SMTP notification configuration.
    #[serde(default)]
    pub email: EmailConfig,
    /// Export file configuration.
    #[serde(default)]
    pub exports: ExportConfig,
    /// Exchange rate lookup configuration.
    #[serde(default)]
    pub rates: RatesConfig,
    /// Index maintenance tuning.
    #[serde(default)]
    pub index: IndexConfig,
}

/// Central database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

/// Field encryption secrets.
///
/// Both keys are base64-encoded. When either is absent the encrypted-field
/// codec reports itself unavailable and callers store plaintext instead of
/// blocking saves.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EncryptionConfig {
    /// Base64-encoded 32-byte AES key.
    pub cipher_key: Option<String>,
    /// Base64-encoded HMAC key (any length, 32+ bytes recommended).
    pub hmac_key: Option<String>,
}

impl EncryptionConfig {
    /// Decodes the cipher key, if configured and exactly 32 bytes.
    #[must_use]
    pub fn cipher_key_bytes(&self) -> Option<[u8; 32]> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(self.cipher_key.as_deref()?)
            .ok()?;
        decoded.try_into().ok()
    }

    /// Decodes the HMAC key, if configured and non-empty.
    #[must_use]
    pub fn hmac_key_bytes(&self) -> Option<Vec<u8>> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(self.hmac_key.as_deref()?)
            .ok()?;
        if decoded.is_empty() {
            None
        } else {
            Some(decoded)
        }
    }
}

/// SMTP notification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username.
    pub smtp_username: String,
    /// SMTP password.
    pub smtp_password: String,
    /// From address for outgoing mail.
    pub from_address: String,
    /// Base URL of the operator dashboard, used to build request links.
    pub dashboard_url: String,
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "localhost".to_string(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_address: "payments@example.test".to_string(),
            dashboard_url: "https://central.example.test".to_string(),
        }
    }
}

/// Export file configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Directory export files are materialized into.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// NACHA immediate destination routing number (the receiving bank).
    #[serde(default)]
    pub immediate_destination: String,
    /// NACHA immediate origin identification (our company id).
    #[serde(default)]
    pub immediate_origin: String,
    /// Company name stamped on batch headers and check stubs.
    #[serde(default = "default_company_name")]
    pub company_name: String,
}

fn default_output_dir() -> String {
    "exports".to_string()
}

fn default_company_name() -> String {
    "PAYRAIL".to_string()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            immediate_destination: String::new(),
            immediate_origin: String::new(),
            company_name: default_company_name(),
        }
    }
}

/// Exchange rate lookup configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RatesConfig {
    /// Base URL of the exchange rate API.
    #[serde(default = "default_rates_url")]
    pub api_url: String,
    /// Cache time-to-live in seconds.
    #[serde(default = "default_rates_ttl")]
    pub cache_ttl_secs: u64,
}

fn default_rates_url() -> String {
    "https://api.exchangerate.host".to_string()
}

fn default_rates_ttl() -> u64 {
    86_400 // 24 hours
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            api_url: default_rates_url(),
            cache_ttl_secs: default_rates_ttl(),
        }
    }
}

/// Index maintenance tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    /// Maximum tenants visited per rebuild run.
    #[serde(default = "default_tenant_page_size")]
    pub tenant_page_size: u32,
    /// Requests fetched per page within a tenant.
    #[serde(default = "default_request_page_size")]
    pub request_page_size: u32,
    /// Seconds between scheduled full rebuilds.
    #[serde(default = "default_rebuild_interval")]
    pub rebuild_interval_secs: u64,
}

fn default_tenant_page_size() -> u32 {
    1000
}

fn default_request_page_size() -> u32 {
    20
}

fn default_rebuild_interval() -> u64 {
    3600
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            tenant_page_size: default_tenant_page_size(),
            request_page_size: default_request_page_size(),
            rebuild_interval_secs: default_rebuild_interval(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("PAYRAIL").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
