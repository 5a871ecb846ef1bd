//! Composition root: turns parsed flags into a frozen [`RelayConfig`] and
//! the proxy state built from it.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use relaylm_core::RelayConfig;
use relaylm_proxy::ProxyState;

use crate::catalog::{load_models_file, merge};
use crate::parser::Cli;

/// Build the process configuration from CLI flags.
pub fn build_config(cli: &Cli) -> Result<RelayConfig> {
    let file_models = match &cli.models_file {
        Some(path) => load_models_file(path)?,
        None => Vec::new(),
    };

    let config = RelayConfig::builder(cli.upstream_url.clone())
        .with_optional_api_key(cli.api_key.clone())
        .with_model_override(cli.model_override.clone())
        .with_default_model(cli.default_model.clone())
        .with_models(merge(&cli.models, file_models))
        .with_default_max_tokens(cli.max_tokens)
        .with_request_timeout(Duration::from_secs(cli.timeout_secs))
        .with_upstream_style(cli.upstream_style)
        .build()
        .context("Invalid upstream configuration")?;

    if config.api_key().is_none() {
        warn!("No upstream API key configured; requests are sent unauthenticated");
    }
    if config.catalog().is_empty() {
        warn!("Model catalog is empty; /api/tags and /v1/models will list nothing");
    }
    info!(
        style = %config.upstream_style(),
        models = config.catalog().len(),
        "Configuration loaded"
    );

    Ok(config)
}

/// Build the proxy state for `cli`.
pub fn bootstrap(cli: &Cli) -> Result<ProxyState> {
    let config = build_config(cli)?;
    ProxyState::with_random_metadata(config).context("Failed to create upstream client")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use relaylm_core::UpstreamStyle;
    use std::io::Write;

    #[test]
    fn test_config_from_flags() {
        let cli = Cli::parse_from([
            "relaylm",
            "--upstream-url",
            "https://generativelanguage.googleapis.com",
            "--api-key",
            "secret",
            "--models",
            "gemini-1.5-flash",
            "--timeout-secs",
            "5",
        ]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.upstream_style(), UpstreamStyle::ContentGeneration);
        assert_eq!(config.api_key(), Some("secret"));
        assert_eq!(config.catalog(), ["gemini-1.5-flash"]);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_models_file_is_merged() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "m2\nm1").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let cli = Cli::parse_from([
            "relaylm",
            "--upstream-url",
            "http://localhost:8080",
            "--models",
            "m1",
            "--models-file",
            &path,
        ]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.catalog(), ["m1", "m2"]);
    }

    #[test]
    fn test_bad_upstream_url() {
        let cli = Cli::parse_from(["relaylm", "--upstream-url", "not a url"]);
        assert!(build_config(&cli).is_err());
    }
}
