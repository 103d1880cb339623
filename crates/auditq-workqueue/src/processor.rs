//! URL processors.

use std::fmt::Display;
use std::future::Future;

use async_trait::async_trait;

/// Processes one URL.
///
/// Errors are stored by their `Display` text; the queue decides whether the
/// URL is retried.
#[async_trait]
pub trait UrlProcessor: Send + Sync + 'static {
    /// Result payload on success.
    type Output: Send + 'static;
    /// Error on failure.
    type Error: Display + Send + 'static;

    async fn process(&self, url: &str) -> Result<Self::Output, Self::Error>;
}

/// Processor backed by an async closure.
pub struct FnProcessor<F> {
    f: F,
}

/// Wrap an async closure as a [`UrlProcessor`].
pub fn processor_fn<F, Fut, T, E>(f: F) -> FnProcessor<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    FnProcessor { f }
}

#[async_trait]
impl<F, Fut, T, E> UrlProcessor for FnProcessor<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    type Output = T;
    type Error = E;

    async fn process(&self, url: &str) -> Result<T, E> {
        (self.f)(url.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_processor_fn() {
        let processor = processor_fn(|url: String| async move {
            if url.ends_with("/bad") {
                Err(format!("cannot fetch {}", url))
            } else {
                Ok(url.len())
            }
        });

        assert_eq!(processor.process("https://x.test/").await, Ok(15));
        assert_eq!(
            processor.process("https://x.test/bad").await,
            Err("cannot fetch https://x.test/bad".to_string())
        );
    }
}
