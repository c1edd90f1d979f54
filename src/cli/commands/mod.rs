//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod completions;
pub mod config;
pub mod fetch;
pub mod run;
pub mod version;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cli::args::{Cli, Commands, ConfigSubcommand, SourceArgs};
use crate::config::{ConfigLoader, RevealConfig, Validator};
use crate::error::{ConfigError, PunchlineError};
use crate::joke::{HttpJokeProvider, JokeProvider, StaticJokeProvider};

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// `cancel` fires on the first Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli, cancel: CancellationToken) -> Result<(), PunchlineError> {
    match cli.command {
        Commands::Run(args) => run::run(&args, cli.quiet, cancel).await,
        Commands::Fetch(args) => fetch::run(&args, cancel).await,
        Commands::Config(cmd) => match cmd.subcommand {
            ConfigSubcommand::Validate(args) => config::validate(&args),
        },
        Commands::Completions(args) => {
            completions::run(&args);
            Ok(())
        }
        Commands::Version(args) => version::run(&args),
    }
}

/// Resolves the effective configuration and joke provider for `run` and
/// `fetch`.
///
/// Precedence: `--endpoint` over the config file over built-in defaults.
/// `--offline` ignores the endpoint entirely.
///
/// # Errors
///
/// Returns a config error if the file fails to load or the overridden
/// endpoint does not validate.
pub(crate) fn resolve_source(
    source: &SourceArgs,
) -> Result<(RevealConfig, Arc<dyn JokeProvider>), PunchlineError> {
    let mut config = if let Some(ref path) = source.config {
        tracing::info!(config = %path.display(), "loading configuration");
        let load_result = ConfigLoader::with_defaults().load(path)?;
        for warning in &load_result.warnings {
            tracing::warn!(location = %warning.path, "{}", warning.message);
        }
        load_result.config
    } else {
        RevealConfig::default()
    };

    if let Some(ref endpoint) = source.endpoint {
        config.endpoint.clone_from(endpoint);
        let result = Validator::new().validate(&config);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: "--endpoint".to_string(),
                errors: result.errors,
            }
            .into());
        }
    }

    let provider: Arc<dyn JokeProvider> = if source.offline {
        Arc::new(StaticJokeProvider::offline())
    } else {
        Arc::new(HttpJokeProvider::new(config.provider_options())?)
    };
    tracing::debug!(provider = %provider.describe(), "joke provider ready");

    Ok((config, provider))
}
