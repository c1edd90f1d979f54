//! Joke data and providers
//!
//! A [`Joke`] is the single record the reveal cycle works with. Providers
//! hide where it comes from:
//!
//! - [`HttpJokeProvider`]: the public random-joke endpoint over HTTP
//! - [`StaticJokeProvider`]: a fixed rotation, for offline play and tests

pub mod fixed;
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::JokeFetchError;

pub use fixed::StaticJokeProvider;
pub use http::{DEFAULT_ENDPOINT, HttpJokeProvider, HttpProviderOptions};

/// A fetched joke.
///
/// Field names match the wire format of the public joke API, except that
/// `type` is exposed as `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Joke {
    /// Category, e.g. `"general"` or `"programming"`
    #[serde(rename = "type")]
    pub kind: String,
    /// First line, shown during `SetupReveal`
    pub setup: String,
    /// Payoff, shown during `PunchlineReveal`
    pub punchline: String,
    /// Provider-assigned identifier
    pub id: i64,
}

impl Joke {
    /// Builds a joke from its parts.
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        setup: impl Into<String>,
        punchline: impl Into<String>,
        id: i64,
    ) -> Self {
        Self {
            kind: kind.into(),
            setup: setup.into(),
            punchline: punchline.into(),
            id,
        }
    }
}

/// Source of random jokes.
///
/// Implementations must be cheap to share behind an `Arc`; the reveal
/// machine calls [`fetch_random_joke`](Self::fetch_random_joke) once per
/// cycle from a spawned task.
#[async_trait]
pub trait JokeProvider: Send + Sync {
    /// Fetches one joke.
    ///
    /// # Errors
    ///
    /// Returns a [`JokeFetchError`] on transport failure or a malformed
    /// payload.
    async fn fetch_random_joke(&self) -> Result<Joke, JokeFetchError>;

    /// Short label for logs.
    fn describe(&self) -> String;
}

/// Decodes a joke payload.
///
/// Unknown fields are ignored. Missing fields, wrong types, and blank
/// setup or punchline text are decode errors.
///
/// # Errors
///
/// Returns `JokeFetchError::Decode` when the payload is not a usable joke.
pub fn decode_joke(bytes: &[u8]) -> Result<Joke, JokeFetchError> {
    let joke: Joke =
        serde_json::from_slice(bytes).map_err(|e| JokeFetchError::Decode(e.to_string()))?;

    if joke.setup.trim().is_empty() {
        return Err(JokeFetchError::Decode("setup is blank".to_string()));
    }
    if joke.punchline.trim().is_empty() {
        return Err(JokeFetchError::Decode("punchline is blank".to_string()));
    }

    Ok(joke)
}
