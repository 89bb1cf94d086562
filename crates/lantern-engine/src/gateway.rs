use std::time::Duration;

use lantern_core::Message;
use lantern_store::{MessageStore, StoreError};

use crate::error::EngineError;

/// Capped exponential backoff for transient store failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub factor: u32,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(200),
            factor: 2,
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given zero-based failed attempt:
    /// 200ms, 400ms, 800ms, 1600ms with the defaults.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * self.factor.saturating_pow(attempt)
    }
}

/// Retrying adapter over the message store. Transient failures are
/// absorbed here; exhaustion surfaces as `StoreUnavailable` so the
/// caller can degrade instead of crashing.
pub struct StoreGateway {
    store: MessageStore,
    policy: RetryPolicy,
}

impl StoreGateway {
    pub fn new(store: MessageStore) -> Self {
        Self {
            store,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(store: MessageStore, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    pub async fn range_backward(
        &mut self,
        from_id: i64,
        limit: usize,
        ceiling_id: i64,
    ) -> Result<Vec<Message>, EngineError> {
        self.with_retry("range_backward", |s| {
            s.range_backward(from_id, limit, ceiling_id)
        })
        .await
    }

    pub async fn above(&mut self, watermark: i64) -> Result<Vec<Message>, EngineError> {
        self.with_retry("above", |s| s.above(watermark)).await
    }

    pub async fn max_id(&mut self) -> Result<i64, EngineError> {
        self.with_retry("max_id", |s| s.max_id()).await
    }

    pub async fn insert(&mut self, content: &str) -> Result<Message, EngineError> {
        match self.with_retry("insert", |s| s.insert(content)).await {
            Err(EngineError::StoreUnavailable {
                source: StoreError::ContentRejected(reason),
                ..
            }) => Err(EngineError::RejectedSubmission(reason)),
            other => other,
        }
    }

    // Exclusive access keeps the futures `Send`: the SQLite connection is
    // `Send` but not `Sync`, so a shared borrow held across the backoff
    // sleep would pin the whole call to one thread.
    async fn with_retry<T>(
        &mut self,
        op: &str,
        f: impl Fn(&MessageStore) -> lantern_store::Result<T>,
    ) -> Result<T, EngineError> {
        let mut attempt = 0u32;
        loop {
            match f(&self.store) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt + 1 < self.policy.max_attempts => {
                    let delay = self.policy.delay(attempt);
                    tracing::warn!(
                        op,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "transient store failure, retrying: {e}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(EngineError::StoreUnavailable {
                        attempts: attempt + 1,
                        source: e,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_from_base() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_millis(200));
        assert_eq!(policy.delay(1), Duration::from_millis(400));
        assert_eq!(policy.delay(2), Duration::from_millis(800));
        assert_eq!(policy.delay(3), Duration::from_millis(1600));
    }

    #[tokio::test]
    async fn test_passthrough_reads() {
        let store = MessageStore::open_in_memory().unwrap();
        store.insert_at("first", 1_700_000_000).unwrap();
        store.insert_at("second", 1_700_000_060).unwrap();

        let mut gateway = StoreGateway::new(store);
        assert_eq!(gateway.max_id().await.unwrap(), 2);
        assert_eq!(gateway.above(1).await.unwrap().len(), 1);
        assert_eq!(gateway.range_backward(2, 10, 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_content_is_not_store_unavailable() {
        let mut gateway = StoreGateway::new(MessageStore::open_in_memory().unwrap());
        match gateway.insert("").await {
            Err(EngineError::RejectedSubmission(_)) => {}
            other => panic!("expected RejectedSubmission, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_gateway_futures_are_send() {
        fn spawnable<F>(f: F) -> F
        where
            F: std::future::Future + Send,
        {
            f
        }

        let mut gateway = StoreGateway::new(MessageStore::open_in_memory().unwrap());
        spawnable(gateway.insert("a message worth keeping"))
            .await
            .unwrap();
        assert_eq!(spawnable(gateway.max_id()).await.unwrap(), 1);
    }
}
