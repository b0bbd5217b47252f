//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "otp": { "ttlMinutes": 15 },
//!   "password": { "timeCost": 3, "memoryCost": 65536, "parallelism": 4, "minLength": 8 },
//!   "notifier": { "kind": "console", "webhookUrl": null },
//!   "audit": { "ipAddress": "127.0.0.1" }
//! }
//! ```
//! Keys this crate does not know about are kept when saving.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::services::PasswordPolicy;

pub const DEFAULT_OTP_TTL_MINUTES: i64 = 15;

/// Longest accepted one-time code lifetime: one day
pub const MAX_OTP_TTL_MINUTES: i64 = 24 * 60;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    otp: OtpSettings,
    #[serde(default)]
    password: PasswordSettings,
    #[serde(default)]
    notifier: NotifierSettings,
    #[serde(default)]
    audit: AuditSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OtpSettings {
    #[serde(default = "default_ttl")]
    ttl_minutes: i64,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

fn default_ttl() -> i64 {
    DEFAULT_OTP_TTL_MINUTES
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self {
            ttl_minutes: DEFAULT_OTP_TTL_MINUTES,
            other: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordSettings {
    #[serde(default)]
    time_cost: Option<u32>,
    #[serde(default)]
    memory_cost: Option<u32>,
    #[serde(default)]
    parallelism: Option<u32>,
    #[serde(default)]
    min_length: Option<usize>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotifierSettings {
    #[serde(default)]
    kind: NotifierKind,
    #[serde(default)]
    webhook_url: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditSettings {
    #[serde(default = "default_ip")]
    ip_address: String,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

fn default_ip() -> String {
    "127.0.0.1".to_string()
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            ip_address: default_ip(),
            other: HashMap::new(),
        }
    }
}

/// How one-time codes reach their owner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    /// Print the code on stderr
    #[default]
    Console,
    /// POST the code to `webhookUrl`
    Webhook,
}

/// NovaBank configuration (resolved view of settings.json + environment)
#[derive(Debug, Clone)]
pub struct Config {
    pub otp_ttl_minutes: i64,
    pub password: PasswordPolicy,
    pub notifier: NotifierKind,
    pub webhook_url: Option<String>,
    /// Address recorded in audit rows for operations started locally
    pub audit_ip_address: String,
    raw: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_settings(SettingsFile::default())
    }
}

impl Config {
    fn from_settings(raw: SettingsFile) -> Self {
        let defaults = PasswordPolicy::default();
        let password = PasswordPolicy {
            time_cost: raw.password.time_cost.unwrap_or(defaults.time_cost),
            memory_cost: raw.password.memory_cost.unwrap_or(defaults.memory_cost),
            parallelism: raw.password.parallelism.unwrap_or(defaults.parallelism),
            min_length: raw.password.min_length.unwrap_or(defaults.min_length),
        };
        Self {
            otp_ttl_minutes: raw.otp.ttl_minutes,
            password,
            notifier: raw.notifier.kind,
            webhook_url: raw.notifier.webhook_url.clone(),
            audit_ip_address: raw.audit.ip_address.clone(),
            raw,
        }
    }

    /// Load config from the data directory
    ///
    /// A missing or unreadable settings file yields defaults. Environment
    /// overrides:
    /// - `NOVABANK_OTP_TTL_MINUTES`: code lifetime in minutes
    /// - `NOVABANK_WEBHOOK_URL`: deliver codes to this webhook
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("ignoring malformed {}: {}", settings_path.display(), e);
                SettingsFile::default()
            })
        } else {
            SettingsFile::default()
        };

        let mut config = Self::from_settings(raw);

        if let Ok(ttl) = std::env::var("NOVABANK_OTP_TTL_MINUTES") {
            config.otp_ttl_minutes = ttl.trim().parse().map_err(|_| {
                Error::validation(format!("NOVABANK_OTP_TTL_MINUTES is not a number: {}", ttl))
            })?;
        }
        if let Ok(url) = std::env::var("NOVABANK_WEBHOOK_URL") {
            if !url.trim().is_empty() {
                config.notifier = NotifierKind::Webhook;
                config.webhook_url = Some(url.trim().to_string());
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise fail later at first use
    pub fn validate(&self) -> Result<()> {
        if self.otp_ttl_minutes <= 0 || self.otp_ttl_minutes > MAX_OTP_TTL_MINUTES {
            return Err(Error::validation(format!(
                "otp.ttlMinutes must be between 1 and {}",
                MAX_OTP_TTL_MINUTES
            )));
        }
        if self.password.min_length == 0 {
            return Err(Error::validation("password.minLength must be positive"));
        }
        if self.notifier == NotifierKind::Webhook {
            let url = self
                .webhook_url
                .as_deref()
                .ok_or_else(|| Error::validation("notifier.webhookUrl is required for the webhook notifier"))?;
            url::Url::parse(url)
                .map_err(|e| Error::validation(format!("notifier.webhookUrl is invalid: {}", e)))?;
        }
        Ok(())
    }

    /// One-time code lifetime, clamped to the accepted range
    pub fn otp_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.otp_ttl_minutes.clamp(1, MAX_OTP_TTL_MINUTES))
    }

    /// Save config to the data directory, keeping keys this crate does not manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(data_dir)?;
        let settings_path = data_dir.join("settings.json");

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_else(|_| self.raw.clone())
        } else {
            self.raw.clone()
        };

        settings.otp.ttl_minutes = self.otp_ttl_minutes;
        settings.password.time_cost = Some(self.password.time_cost);
        settings.password.memory_cost = Some(self.password.memory_cost);
        settings.password.parallelism = Some(self.password.parallelism);
        settings.password.min_length = Some(self.password.min_length);
        settings.notifier.kind = self.notifier;
        settings.notifier.webhook_url = self.webhook_url.clone();
        settings.audit.ip_address = self.audit_ip_address.clone();

        let content = serde_json::to_string_pretty(&settings)
            .map_err(|e| Error::persistence(format!("Failed to serialize settings: {}", e)))?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}
