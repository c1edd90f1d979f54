//! Fixed-rotation joke provider.
//!
//! Serves a preloaded list of jokes in order, wrapping around at the end.
//! Backs `--offline` play.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::JokeFetchError;

use super::{Joke, JokeProvider};

/// Provider cycling through a fixed list of jokes.
#[derive(Debug)]
pub struct StaticJokeProvider {
    jokes: Vec<Joke>,
    cursor: AtomicUsize,
}

impl StaticJokeProvider {
    /// Creates a provider over the given jokes.
    #[must_use]
    pub const fn new(jokes: Vec<Joke>) -> Self {
        Self {
            jokes,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Creates a provider with the built-in offline set.
    #[must_use]
    pub fn offline() -> Self {
        Self::new(vec![
            Joke::new(
                "general",
                "Why did the scarecrow win an award?",
                "Because he was outstanding in his field.",
                1,
            ),
            Joke::new(
                "programming",
                "Why do programmers prefer dark mode?",
                "Because light attracts bugs.",
                2,
            ),
            Joke::new(
                "general",
                "What do you call a fake noodle?",
                "An impasta.",
                3,
            ),
            Joke::new(
                "programming",
                "How many programmers does it take to change a light bulb?",
                "None, that's a hardware problem.",
                4,
            ),
        ])
    }

    /// Number of jokes in the rotation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jokes.len()
    }

    /// Returns `true` if the rotation is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jokes.is_empty()
    }
}

#[async_trait]
impl JokeProvider for StaticJokeProvider {
    async fn fetch_random_joke(&self) -> Result<Joke, JokeFetchError> {
        if self.jokes.is_empty() {
            return Err(JokeFetchError::Exhausted);
        }
        let index = self.cursor.fetch_add(1, Ordering::SeqCst) % self.jokes.len();
        Ok(self.jokes[index].clone())
    }

    fn describe(&self) -> String {
        format!("static({} jokes)", self.jokes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rotation_wraps() {
        let provider = StaticJokeProvider::new(vec![
            Joke::new("general", "A", "a", 1),
            Joke::new("general", "B", "b", 2),
        ]);
        assert_eq!(provider.fetch_random_joke().await.unwrap().id, 1);
        assert_eq!(provider.fetch_random_joke().await.unwrap().id, 2);
        assert_eq!(provider.fetch_random_joke().await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_empty_is_exhausted() {
        let provider = StaticJokeProvider::new(vec![]);
        assert!(provider.is_empty());
        assert_eq!(
            provider.fetch_random_joke().await.unwrap_err(),
            JokeFetchError::Exhausted
        );
    }

    #[test]
    fn test_offline_set_is_usable() {
        let provider = StaticJokeProvider::offline();
        assert!(provider.len() >= 2);
        assert_eq!(provider.describe(), format!("static({} jokes)", provider.len()));
    }
}
