//! Command-line flags. Every flag can also come from a `RELAYLM_*`
//! environment variable (or a `.env` file).

use std::path::PathBuf;

use clap::Parser;
use relaylm_core::UpstreamStyle;

/// Relay local-runner and OpenAI-compatible clients to one upstream provider.
#[derive(Debug, Parser)]
#[command(name = "relaylm")]
#[command(about = "Serve local-runner and OpenAI-compatible APIs on top of a single upstream")]
#[command(version)]
pub struct Cli {
    /// Address to listen on
    #[arg(long, env = "RELAYLM_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "RELAYLM_PORT", default_value_t = 11434)]
    pub port: u16,

    /// Upstream base URL (OpenAI-compatible endpoint or the content-generation API)
    #[arg(long = "upstream-url", env = "RELAYLM_UPSTREAM_URL")]
    pub upstream_url: String,

    /// Upstream protocol (`openai` or `content-generation`); detected from the host when unset
    #[arg(long = "upstream-style", env = "RELAYLM_UPSTREAM_STYLE", value_parser = parse_style)]
    pub upstream_style: Option<UpstreamStyle>,

    /// Credential sent to the upstream
    #[arg(long = "api-key", env = "RELAYLM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Send every request to this model, whatever the client asked for
    #[arg(long = "model-override", env = "RELAYLM_MODEL_OVERRIDE")]
    pub model_override: Option<String>,

    /// Model used when a request names none
    #[arg(long = "default-model", env = "RELAYLM_DEFAULT_MODEL")]
    pub default_model: Option<String>,

    /// Model catalog, comma separated
    #[arg(long, env = "RELAYLM_MODELS", value_delimiter = ',')]
    pub models: Vec<String>,

    /// File holding the model catalog (JSON array or one name per line)
    #[arg(long = "models-file", env = "RELAYLM_MODELS_FILE")]
    pub models_file: Option<PathBuf>,

    /// `max_tokens` sent upstream when the client sets none
    #[arg(long = "max-tokens", env = "RELAYLM_MAX_TOKENS", default_value_t = 4096)]
    pub max_tokens: u32,

    /// Timeout for non-streaming upstream calls, in seconds
    #[arg(long = "timeout-secs", env = "RELAYLM_TIMEOUT_SECS", default_value_t = 60)]
    pub timeout_secs: u64,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_style(value: &str) -> Result<UpstreamStyle, String> {
    UpstreamStyle::parse(value)
        .ok_or_else(|| format!("unknown upstream style '{value}' (expected openai or content-generation)"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["relaylm", "--upstream-url", "https://api.openai.com"]);
        assert_eq!(cli.bind_address(), "127.0.0.1:11434");
        assert_eq!(cli.max_tokens, 4096);
        assert_eq!(cli.timeout_secs, 60);
        assert!(cli.models.is_empty());
        assert!(cli.upstream_style.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_models_are_comma_separated() {
        let cli = Cli::parse_from([
            "relaylm",
            "--upstream-url",
            "http://localhost:8080",
            "--models",
            "a,b:latest",
            "--port",
            "9000",
            "-v",
        ]);
        assert_eq!(cli.models, ["a", "b:latest"]);
        assert_eq!(cli.port, 9000);
        assert!(cli.verbose);
    }

    #[test]
    fn test_upstream_style_flag() {
        let cli = Cli::parse_from([
            "relaylm",
            "--upstream-url",
            "http://gateway.internal",
            "--upstream-style",
            "content-generation",
        ]);
        assert_eq!(cli.upstream_style, Some(UpstreamStyle::ContentGeneration));

        let bad = Cli::try_parse_from([
            "relaylm",
            "--upstream-url",
            "http://gateway.internal",
            "--upstream-style",
            "bogus",
        ]);
        assert!(bad.is_err());
    }
}
