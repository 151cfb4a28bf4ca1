//! Per-call execution context.

use std::future::Future;
use std::time::Duration;

use crate::error::DatabaseError;

/// Bounds a database call.
///
/// `ExecContext::background()` carries no deadline. A context with a timeout
/// turns an elapsed wait into [`DatabaseError::Timeout`]; dropping the call's
/// future is how cancellation reaches the adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecContext {
    timeout: Option<Duration>,
}

impl ExecContext {
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Keep this context's timeout if set, otherwise fall back to `fallback`.
    pub fn or_timeout(self, fallback: Option<Duration>) -> Self {
        Self {
            timeout: self.timeout.or(fallback),
        }
    }

    pub(crate) async fn run<F, T>(&self, operation: &str, fut: F) -> Result<T, DatabaseError>
    where
        F: Future<Output = Result<T, DatabaseError>>,
    {
        match self.timeout {
            Some(after) => tokio::time::timeout(after, fut)
                .await
                .map_err(|_| DatabaseError::timeout(operation, after))?,
            None => fut.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn elapsed_deadline_becomes_timeout_error() {
        let ctx = ExecContext::with_timeout(Duration::from_millis(10));
        let result: Result<(), _> = ctx
            .run("query", async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            })
            .await;

        assert_eq!(
            result.unwrap_err(),
            DatabaseError::timeout("query", Duration::from_millis(10))
        );
    }

    #[tokio::test]
    async fn background_context_waits() {
        let result = ExecContext::background()
            .run("execute", async { Ok::<_, DatabaseError>(3u64) })
            .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn explicit_timeout_wins_over_fallback() {
        let ctx = ExecContext::with_timeout(Duration::from_secs(1))
            .or_timeout(Some(Duration::from_secs(9)));
        assert_eq!(ctx.timeout(), Some(Duration::from_secs(1)));

        let ctx = ExecContext::background().or_timeout(Some(Duration::from_secs(9)));
        assert_eq!(ctx.timeout(), Some(Duration::from_secs(9)));
    }
}
