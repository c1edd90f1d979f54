//! Version information display
//!
//! Prints version and build metadata in human or JSON format.

use crate::cli::args::{OutputFormat, VersionArgs};
use crate::error::PunchlineError;
use crate::joke::DEFAULT_ENDPOINT;

/// Print version and build information.
///
/// # Errors
///
/// Returns a JSON error if the metadata cannot be serialized.
pub fn run(args: &VersionArgs) -> Result<(), PunchlineError> {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");

    match args.format {
        OutputFormat::Human => {
            println!("{name} {version}");
        }
        OutputFormat::Json => {
            let info = serde_json::json!({
                "name": name,
                "version": version,
                "default_endpoint": DEFAULT_ENDPOINT,
            });
            println!("{}", serde_json::to_string(&info)?);
        }
    }

    Ok(())
}
