//! `fetch` command
//!
//! One provider call, printed without the reveal.

use tokio_util::sync::CancellationToken;

use crate::cli::args::{FetchArgs, OutputFormat};
use crate::error::{PunchlineError, RevealError};

/// Fetch a single joke and print it to stdout.
///
/// # Errors
///
/// Returns a fetch error if the provider fails, or
/// `RevealError::Shutdown` when interrupted.
pub async fn run(args: &FetchArgs, cancel: CancellationToken) -> Result<(), PunchlineError> {
    let (_, provider) = super::resolve_source(&args.source)?;

    let joke = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(RevealError::Shutdown.into()),
        result = provider.fetch_random_joke() => result?,
    };
    tracing::info!(joke_id = joke.id, kind = %joke.kind, "joke fetched");

    match args.format {
        OutputFormat::Human => {
            println!("{}", joke.setup);
            println!("{}", joke.punchline);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&joke)?);
        }
    }

    Ok(())
}
