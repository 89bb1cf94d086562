//! Dual-cursor pagination over the message store: a backward historical
//! cursor for filler and a forward watermark for new submissions, with a
//! bounded priority queue between them.

use std::collections::BTreeSet;

use serde::Serialize;

use lantern_core::{Message, PriorityQueue};

use crate::error::EngineError;
use crate::gateway::StoreGateway;

/// One replenishment batch. Every message that arrived through the
/// priority path (queue or fresh above-watermark read) is reported in
/// `priority_ids`.
#[derive(Debug, Default)]
pub struct Replenishment {
    pub messages: Vec<Message>,
    pub priority_ids: Vec<i64>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PoolStats {
    pub historical_cursor: Option<i64>,
    pub watermark: i64,
    pub queue_depth: usize,
    pub queue_dropped: u64,
}

pub struct PoolManager {
    gateway: StoreGateway,
    queue: PriorityQueue,
    /// Next id the descending historical scan reads. `None` means
    /// exhausted; the next read recycles from the current max id.
    historical_cursor: Option<i64>,
    /// Highest id ever observed. Ids above it are new and enter the
    /// queue when polled.
    watermark: i64,
}

impl PoolManager {
    pub fn new(gateway: StoreGateway, queue_max_size: usize) -> Self {
        Self {
            gateway,
            queue: PriorityQueue::new(queue_max_size),
            historical_cursor: None,
            watermark: 0,
        }
    }

    pub async fn initialize(&mut self) -> Result<(), EngineError> {
        let max = self.gateway.max_id().await?;
        self.watermark = max;
        self.historical_cursor = if max == 0 { None } else { Some(max) };
        tracing::debug!(watermark = max, "pool initialized");
        Ok(())
    }

    /// Fetch everything above the watermark into the queue and advance
    /// the watermark to the highest id observed — regardless of queue
    /// admission, so burst overflow cannot resurface dropped ids as new.
    pub async fn poll_new(&mut self) -> Result<usize, EngineError> {
        let rows = self.gateway.above(self.watermark).await?;
        let mut admitted = 0;
        for message in rows {
            if message.id > self.watermark {
                self.watermark = message.id;
            }
            if self.queue.push(message) {
                admitted += 1;
            }
        }
        Ok(admitted)
    }

    /// Three-stage fill: drain the queue, poll above the watermark and
    /// drain again, then fall back to the historical scan. Ids in
    /// `exclude` (the caller's working set), already chosen this batch,
    /// or still queued are skipped — replenishment can never introduce a
    /// duplicate. May return fewer than `count`; callers tolerate
    /// deficits.
    pub async fn next_batch(
        &mut self,
        count: usize,
        exclude: &BTreeSet<i64>,
    ) -> Result<Replenishment, EngineError> {
        let mut batch = Replenishment::default();
        let mut chosen: BTreeSet<i64> = BTreeSet::new();

        self.drain_queue(count, exclude, &mut chosen, &mut batch);

        if batch.messages.len() < count {
            self.poll_new().await?;
            self.drain_queue(count, exclude, &mut chosen, &mut batch);
        }

        let mut recycled = false;
        while batch.messages.len() < count {
            let from = match self.historical_cursor {
                Some(id) if id > 0 => id,
                _ => {
                    if recycled {
                        break;
                    }
                    recycled = true;
                    let max = self.gateway.max_id().await?;
                    if max == 0 {
                        break; // entirely empty store
                    }
                    tracing::debug!(cursor = max, "historical cursor recycled");
                    self.historical_cursor = Some(max);
                    max
                }
            };

            let deficit = count - batch.messages.len();
            let rows = self
                .gateway
                .range_backward(from, deficit, self.watermark)
                .await?;

            match rows.last() {
                Some(lowest) => {
                    self.historical_cursor = if lowest.id > 1 {
                        Some(lowest.id - 1)
                    } else {
                        None
                    };
                }
                None => {
                    self.historical_cursor = None;
                    continue;
                }
            }

            for message in rows {
                if exclude.contains(&message.id)
                    || chosen.contains(&message.id)
                    || self.queue.contains(message.id)
                {
                    continue;
                }
                chosen.insert(message.id);
                batch.messages.push(message);
            }
        }

        Ok(batch)
    }

    /// Register a message the intake path just created. Ignored when the
    /// id is at or below the watermark — the historical scan already
    /// covers it.
    pub fn mark_new_submission(&mut self, message: Message) -> bool {
        if message.id <= self.watermark {
            return false;
        }
        self.watermark = message.id;
        self.queue.push(message);
        true
    }

    /// Insert through the gateway and mark the result as new. The
    /// coordinator's submit path.
    pub async fn insert_submission(&mut self, content: &str) -> Result<Message, EngineError> {
        let message = self.gateway.insert(content).await?;
        self.mark_new_submission(message.clone());
        Ok(message)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            historical_cursor: self.historical_cursor,
            watermark: self.watermark,
            queue_depth: self.queue.len(),
            queue_dropped: self.queue.dropped(),
        }
    }

    fn drain_queue(
        &mut self,
        count: usize,
        exclude: &BTreeSet<i64>,
        chosen: &mut BTreeSet<i64>,
        batch: &mut Replenishment,
    ) {
        while batch.messages.len() < count {
            let Some(message) = self.queue.pop_front() else {
                break;
            };
            // An excluded id is already in the working set — discard it.
            if exclude.contains(&message.id) || chosen.contains(&message.id) {
                continue;
            }
            chosen.insert(message.id);
            batch.priority_ids.push(message.id);
            batch.messages.push(message);
        }
    }
}
