// common/src/utils.rs
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::error::{ServiceError, StoreError};

/// Setup tracing for consistent logging across services
pub fn setup_tracing(level: &str) {
    let level = Level::from_str(level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Run a store operation with an upper bound on its duration.
pub async fn with_timeout<T, F>(limit: Duration, op: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, op).await {
        Ok(result) => result.map_err(ServiceError::from),
        Err(_) => {
            tracing::error!("Store operation exceeded {:?}", limit);
            Err(ServiceError::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_results() {
        let ok = with_timeout(Duration::from_secs(1), async { Ok::<_, StoreError>(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let conflict = with_timeout(Duration::from_secs(1), async {
            Err::<(), _>(StoreError::Conflict("email".into()))
        })
        .await;
        assert!(matches!(conflict, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn stalled_operation_times_out() {
        let stalled = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, StoreError>(())
        })
        .await;
        assert!(matches!(stalled, Err(ServiceError::Timeout)));
    }
}
