//! Service configuration.
//!
//! Values are layered: built-in defaults, then an optional `config.toml`, then
//! `RETREAT__SECTION__KEY` environment variables (after `.env` is loaded).
//! Every collaborator receives its settings explicitly at construction time.

use anyhow::{Context, Result};
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use retreat_calendar::ExpandOptions;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub content: ContentConfig,
    pub calendar: CalendarConfig,
    pub payments: PaymentsConfig,
    pub mail: MailConfig,
    pub verification: VerificationConfig,
    pub revalidation: RevalidationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// "host:port" for the listener.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    /// Query endpoint of the content backend.
    pub api_url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
    /// How long fetched content is served from the cache.
    pub revalidate_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    /// IANA zone the recurrence rules are evaluated in.
    pub timezone: String,
    pub max_occurrences: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentsConfig {
    pub api_url: String,
    pub secret_key: String,
    pub currency: String,
    /// Smallest accepted donation, in the currency's smallest unit.
    pub min_amount: u64,
    pub max_amount: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
    /// Where contact-form submissions are delivered.
    pub operator_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    pub verify_url: String,
    pub secret: String,
    /// Submissions scoring below this are rejected.
    pub min_score: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RevalidationConfig {
    /// Shared secret expected in the `x-revalidate-secret` header.
    pub secret: String,
}

impl Settings {
    /// Loads configuration from `config.toml` (optional) and the environment.
    /// Environment variables take precedence over file values.
    ///
    /// # Errors
    /// Returns an error if a required value is missing or a value is invalid.
    pub fn load() -> Result<Self> {
        let config = with_defaults(Config::builder())?
            .add_source(File::with_name("config.toml").required(false))
            .add_source(
                Environment::with_prefix("RETREAT")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;
        Self::from_config(config)
    }

    /// Loads configuration from a TOML document on top of the defaults.
    ///
    /// # Errors
    /// Returns an error if a required value is missing or a value is invalid.
    pub fn from_toml(toml: &str) -> Result<Self> {
        let config = with_defaults(Config::builder())?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .context("Failed to read configuration")?;
        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self> {
        let settings: Settings = config
            .try_deserialize()
            .context("Invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        self.expand_options()?;
        anyhow::ensure!(
            !self.revalidation.secret.trim().is_empty(),
            "revalidation.secret must not be empty"
        );
        anyhow::ensure!(
            self.payments.min_amount > 0 && self.payments.min_amount <= self.payments.max_amount,
            "payments.min_amount must be positive and not above payments.max_amount"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.verification.min_score),
            "verification.min_score must be between 0 and 1"
        );
        Ok(())
    }

    /// Expansion options for the configured calendar timezone.
    ///
    /// # Errors
    /// Returns an error if `calendar.timezone` is not a known IANA zone.
    pub fn expand_options(&self) -> Result<ExpandOptions> {
        let options = ExpandOptions::for_timezone(&self.calendar.timezone)
            .context("Invalid calendar.timezone")?;
        Ok(options.with_max_occurrences(self.calendar.max_occurrences))
    }
}

fn with_defaults(
    builder: ConfigBuilder<config::builder::DefaultState>,
) -> Result<ConfigBuilder<config::builder::DefaultState>> {
    Ok(builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("logging.level", "info")?
        .set_default("content.timeout_secs", 10)?
        .set_default("content.revalidate_secs", 300)?
        .set_default("calendar.timezone", "UTC")?
        .set_default(
            "calendar.max_occurrences",
            i64::from(retreat_calendar::MAX_OCCURRENCES),
        )?
        .set_default("payments.api_url", "https://api.stripe.com/v1")?
        .set_default("payments.currency", "usd")?
        .set_default("payments.min_amount", 100)?
        .set_default("payments.max_amount", 2_500_000)?
        .set_default(
            "verification.verify_url",
            "https://www.google.com/recaptcha/api/siteverify",
        )?
        .set_default("verification.min_score", 0.5)?)
}

/// Loads `.env` (if present), then the configuration.
///
/// # Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
