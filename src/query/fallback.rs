//! Explicit fallback combinator for degradable store calls.

use std::future::Future;

use crate::error::{AppError, AppResult};

/// Await `primary`; if it fails, hand the error to `fallback` and await that
/// instead. Only the fallback's error can escape.
pub async fn try_or_else<T, P, F, Fut>(primary: P, fallback: F) -> AppResult<T>
where
    P: Future<Output = AppResult<T>>,
    F: FnOnce(AppError) -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    match primary.await {
        Ok(value) => Ok(value),
        Err(err) => fallback(err).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_primary_wins() {
        let value = try_or_else(async { Ok(1) }, |_| async { Ok(2) }).await.unwrap();
        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn test_fallback_sees_primary_error() {
        let value = try_or_else(
            async { Err::<u64, _>(AppError::Store("timed out".into())) },
            |err| async move {
                assert!(err.to_string().contains("timed out"));
                Ok(7)
            },
        )
        .await
        .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_fallback_error_escapes() {
        let result = try_or_else(
            async { Err::<u64, _>(AppError::Store("first".into())) },
            |_| async { Err(AppError::Store("second".into())) },
        )
        .await;
        assert!(result.unwrap_err().to_string().contains("second"));
    }
}
