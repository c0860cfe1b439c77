//! Configuration
//!
//! CLI arguments with environment fallbacks. A `.env` file is read first if present.

use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};
use rusty_money::iso::{self, Currency};
use thiserror::Error;

use crate::{
    cart::{CART_STORAGE_KEY, CartStore},
    storage::FileStorage,
};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configured currency isn't an ISO 4217 code.
    #[error("unknown currency code {0}")]
    UnknownCurrency(String),

    /// Arguments or environment could not be parsed.
    #[error(transparent)]
    Cli(#[from] clap::Error),
}

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Cart persistence settings.
#[derive(Debug, Args)]
pub struct StorageConfig {
    /// Directory holding persisted carts
    #[arg(long, env = "VITRINE_STORAGE_DIR", default_value = ".vitrine")]
    pub storage_dir: PathBuf,

    /// Storage key of the cart, one per session
    #[arg(long, env = "VITRINE_CART_KEY", default_value = CART_STORAGE_KEY)]
    pub cart_key: String,

    /// ISO 4217 currency carts are priced in
    #[arg(long, env = "VITRINE_CURRENCY", default_value = "BRL")]
    pub currency: String,
}

impl StorageConfig {
    /// Resolve the configured currency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownCurrency`] for codes `rusty_money` doesn't know.
    pub fn currency(&self) -> Result<&'static Currency, ConfigError> {
        iso::find(&self.currency).ok_or_else(|| ConfigError::UnknownCurrency(self.currency.clone()))
    }

    /// Open the file-backed cart store described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownCurrency`] for an unknown currency.
    pub fn open_store(&self) -> Result<CartStore<FileStorage>, ConfigError> {
        Ok(
            CartStore::new(FileStorage::new(&self.storage_dir), self.currency()?)
                .with_key(&self.cart_key),
        )
    }
}

/// Full cart configuration.
#[derive(Debug, Args)]
pub struct CartConfig {
    /// Persistence settings.
    #[command(flatten)]
    pub storage: StorageConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,
}

/// Load configuration from environment and CLI arguments
///
/// # Errors
///
/// Returns an error if configuration cannot be parsed
pub fn load<P: Parser>() -> Result<P, ConfigError> {
    // Load .env file if present (ignore if missing)
    _ = dotenvy::dotenv();

    Ok(P::try_parse()?)
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[derive(Debug, Parser)]
    struct TestArgs {
        #[command(flatten)]
        config: CartConfig,
    }

    #[test]
    fn flags_override_defaults() -> TestResult {
        let args = TestArgs::try_parse_from([
            "vitrine",
            "--storage-dir",
            "/tmp/carts",
            "--cart-key",
            "cart-abc",
            "--currency",
            "USD",
            "--log-format",
            "json",
        ])?;

        assert_eq!(args.config.storage.storage_dir, PathBuf::from("/tmp/carts"));
        assert_eq!(args.config.storage.cart_key, "cart-abc");
        assert_eq!(args.config.storage.currency()?.iso_alpha_code, "USD");
        assert_eq!(args.config.logging.log_format, LogFormat::Json);

        Ok(())
    }

    #[test]
    fn unknown_currency_is_rejected() -> TestResult {
        let args = TestArgs::try_parse_from(["vitrine", "--currency", "XXZ"])?;

        assert!(matches!(
            args.config.storage.currency(),
            Err(ConfigError::UnknownCurrency(code)) if code == "XXZ"
        ));

        Ok(())
    }

    #[test]
    fn open_store_uses_configured_key() -> TestResult {
        let dir = tempfile::tempdir()?;
        let dir_arg = dir.path().to_string_lossy().into_owned();

        let args = TestArgs::try_parse_from([
            "vitrine",
            "--storage-dir",
            dir_arg.as_str(),
            "--cart-key",
            "session-7",
            "--currency",
            "BRL",
        ])?;

        let store = args.config.storage.open_store()?;

        assert_eq!(store.key(), "session-7");
        assert_eq!(store.storage().root(), dir.path());
        assert_eq!(store.currency().iso_alpha_code, "BRL");

        Ok(())
    }
}
