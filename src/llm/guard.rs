//! Bounded, cancellable external calls.
//!
//! Every provider and search call made on behalf of a user turn goes through a
//! [`CallGuard`]. Expiry maps to [`AppError::Timeout`] (a provider failure) and a
//! cancelled turn token maps to [`AppError::Cancelled`].

use crate::types::{AppError, Result};
use crate::utils::toml_config::AcipConfig;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Per-call time limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub llm: Duration,
    pub search: Duration,
}

impl Timeouts {
    pub fn from_config(config: &AcipConfig) -> Self {
        Self {
            llm: config.llm_timeout(),
            search: config.search_timeout(),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            llm: Duration::from_secs(60),
            search: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CallGuard {
    timeout: Duration,
    token: CancellationToken,
}

impl CallGuard {
    pub fn new(timeout: Duration, token: CancellationToken) -> Self {
        Self { timeout, token }
    }

    /// Run `fut` until it completes, the timeout elapses, or the turn is cancelled.
    pub async fn run<T, F>(&self, label: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.token.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                tracing::debug!("{} cancelled", label);
                Err(AppError::Cancelled)
            }
            result = tokio::time::timeout(self.timeout, fut) => match result {
                Ok(inner) => inner,
                Err(_) => {
                    tracing::warn!("{} timed out after {:?}", label, self.timeout);
                    Err(AppError::Timeout(format!(
                        "{} did not respond within {:?}",
                        label, self.timeout
                    )))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_through_result() {
        let guard = CallGuard::new(Duration::from_secs(1), CancellationToken::new());
        let value = guard.run("ok", async { Ok::<_, AppError>(7) }).await.unwrap();
        assert_eq!(value, 7);

        let err = guard
            .run("err", async {
                Err::<(), _>(AppError::Provider("boom".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Provider(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_provider_failure() {
        let guard = CallGuard::new(Duration::from_millis(30), CancellationToken::new());
        let err = guard
            .run("slow", async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, AppError>(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Timeout(_)));
        assert!(err.is_provider_failure());
    }

    #[tokio::test]
    async fn test_cancellation() {
        let token = CancellationToken::new();
        let guard = CallGuard::new(Duration::from_secs(60), token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let err = guard
            .run("pending", std::future::pending::<Result<()>>())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn test_already_cancelled_short_circuits() {
        let token = CancellationToken::new();
        token.cancel();
        let guard = CallGuard::new(Duration::from_secs(1), token);
        let err = guard.run("x", async { Ok::<_, AppError>(1) }).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
