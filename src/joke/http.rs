//! HTTP joke provider.
//!
//! Issues a GET against the public random-joke endpoint and decodes the
//! JSON body into a [`Joke`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, redirect};
use tracing::debug;

use crate::error::JokeFetchError;

use super::{Joke, JokeProvider, decode_joke};

/// Public random-joke endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://official-joke-api.appspot.com/random_joke";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum accepted response body size in bytes.
pub const MAX_RESPONSE_SIZE: usize = 64 * 1024;

/// Options for [`HttpJokeProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpProviderOptions {
    /// URL answering GET with a single joke object
    pub endpoint: String,
    /// Whole-request timeout, body included
    pub timeout: Duration,
    /// Body size cap in bytes
    pub max_response_size: usize,
}

impl Default for HttpProviderOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_response_size: MAX_RESPONSE_SIZE,
        }
    }
}

/// Fetches jokes over HTTP.
#[derive(Debug, Clone)]
pub struct HttpJokeProvider {
    client: reqwest::Client,
    options: HttpProviderOptions,
}

impl HttpJokeProvider {
    /// Creates a provider with its own HTTP client.
    ///
    /// Redirects are not followed.
    ///
    /// # Errors
    ///
    /// Returns `JokeFetchError::Network` if the HTTP client cannot be built.
    pub fn new(options: HttpProviderOptions) -> Result<Self, JokeFetchError> {
        let client = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| JokeFetchError::Network(e.to_string()))?;
        Ok(Self { client, options })
    }

    /// Creates a provider reusing an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client, options: HttpProviderOptions) -> Self {
        Self { client, options }
    }

    /// Returns the configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.options.endpoint
    }

    async fn fetch_body(&self) -> Result<Vec<u8>, JokeFetchError> {
        let response = self
            .client
            .get(&self.options.endpoint)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| JokeFetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(JokeFetchError::HttpStatus(status.as_u16()));
        }

        let limit = self.options.max_response_size;
        if let Some(len) = response.content_length() {
            if !usize::try_from(len).is_ok_and(|len| len <= limit) {
                return Err(JokeFetchError::TooLarge { limit });
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| JokeFetchError::Network(e.to_string()))?;

        if bytes.len() > limit {
            return Err(JokeFetchError::TooLarge { limit });
        }

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl JokeProvider for HttpJokeProvider {
    async fn fetch_random_joke(&self) -> Result<Joke, JokeFetchError> {
        debug!(endpoint = %self.options.endpoint, "requesting random joke");

        let body = tokio::time::timeout(self.options.timeout, self.fetch_body())
            .await
            .map_err(|_| JokeFetchError::Timeout)??;

        decode_joke(&body)
    }

    fn describe(&self) -> String {
        format!("http({})", self.options.endpoint)
    }
}
