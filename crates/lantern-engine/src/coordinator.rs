//! The traversal coordinator: owns the working set, runs the cycle and
//! poll timers, and emits the public events. All mutable state lives
//! behind one mutex, so cycle, poll and submit are serialized — the only
//! exclusion the engine needs.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use lantern_core::{
    ClusterDefect, EngineConfig, InsertOutcome, Message, MessageCluster, WorkingSet,
    select_cluster, verify_cluster,
};
use lantern_store::MessageStore;

use crate::error::EngineError;
use crate::events::{EngineEvent, EventBus};
use crate::gateway::StoreGateway;
use crate::pool::{PoolManager, Replenishment};

const EVENT_BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Uninitialized,
    Initializing,
    Running,
    /// Cycle ticks are skipped; background polling continues.
    Paused,
    /// Terminal.
    Stopped,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub lifecycle: Lifecycle,
    pub working_set_len: usize,
    pub working_set_capacity: usize,
    pub priority_members: usize,
    pub total_shown: u64,
    pub skipped_cycles: u64,
    pub pool: crate::pool::PoolStats,
}

struct EngineState {
    pool: PoolManager,
    working_set: WorkingSet,
    /// Working-set ids still awaiting their first featured appearance.
    priority_members: BTreeSet<i64>,
    current: Option<MessageCluster>,
    total_shown: u64,
    skipped_cycles: u64,
    /// The empty-store placeholder is emitted once per transition into
    /// the empty regime, not every tick.
    placeholder_emitted: bool,
}

struct Inner {
    config: EngineConfig,
    state: Mutex<EngineState>,
    bus: EventBus,
    lifecycle: watch::Sender<Lifecycle>,
    cancel: CancellationToken,
}

/// Cheap-to-clone handle; all clones share one engine.
#[derive(Clone)]
pub struct TraversalEngine {
    inner: Arc<Inner>,
}

impl TraversalEngine {
    pub fn new(store: MessageStore, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let gateway = StoreGateway::new(store);
        let state = EngineState {
            pool: PoolManager::new(gateway, config.priority_queue_max_size),
            working_set: WorkingSet::new(config.working_set_size),
            priority_members: BTreeSet::new(),
            current: None,
            total_shown: 0,
            skipped_cycles: 0,
            placeholder_emitted: false,
        };
        let (lifecycle, _) = watch::channel(Lifecycle::Uninitialized);
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(state),
                bus: EventBus::new(EVENT_BUS_CAPACITY),
                lifecycle,
                cancel: CancellationToken::new(),
            }),
        })
    }

    /// Boot the engine: initialize the pool, fill the working set (or
    /// accept the empty regime), emit the first cluster, and start the
    /// cycle and poll loops.
    pub async fn initialize(&self) -> Result<(), EngineError> {
        if self.lifecycle() != Lifecycle::Uninitialized {
            return Err(EngineError::AlreadyInitialized);
        }
        self.set_lifecycle(Lifecycle::Initializing);

        {
            let mut state = self.inner.state.lock().await;
            state.pool.initialize().await?;
            self.enter_from_empty(&mut state).await?;
            tracing::info!(
                members = state.working_set.len(),
                capacity = state.working_set.capacity(),
                "engine initialized"
            );
        }

        self.set_lifecycle(Lifecycle::Running);
        self.spawn_cycle_loop();
        self.spawn_poll_loop();
        Ok(())
    }

    /// One evict-replenish-select-emit iteration. Public so tests can
    /// drive cycles deterministically; the spawned loop calls the same
    /// method on the timer.
    pub async fn run_cycle(&self) -> Result<(), EngineError> {
        let mut state = self.inner.state.lock().await;
        if self.lifecycle() == Lifecycle::Stopped {
            return Ok(());
        }

        let Some(current) = state.current.clone() else {
            // Empty regime: retry replenishment each tick, silently until
            // content exists.
            return self.enter_from_empty(&mut state).await;
        };

        // 1. Outgoing: related minus next. The focus is never in related,
        //    so the continuity-preserved member always survives.
        let next_id = current.next.id;
        let outgoing: Vec<i64> = current
            .related
            .iter()
            .map(|r| r.message.id)
            .filter(|id| *id != next_id)
            .collect();

        // 2. Replenish before touching the set — on StoreUnavailable the
        //    set is left intact and the tick skipped. The request covers
        //    the outgoing members plus any standing deficit, so a set
        //    that started under capacity regrows as the store grows.
        let request = self.inner.config.working_set_size
            - (state.working_set.len() - outgoing.len()).min(self.inner.config.working_set_size);
        let exclude = state.working_set.ids();
        let replacement = match state.pool.next_batch(request, &exclude).await {
            Ok(batch) => batch,
            Err(e) => {
                state.skipped_cycles += 1;
                return Err(e);
            }
        };
        if self.lifecycle() == Lifecycle::Stopped {
            return Ok(()); // stop() raced the store read; discard results
        }

        // 3. Apply eviction and replenishment.
        let mut removed = Vec::with_capacity(outgoing.len());
        for id in &outgoing {
            if state.working_set.remove(*id).is_some() {
                removed.push(*id);
            }
            // An evicted id loses priority status with its membership.
            state.priority_members.remove(id);
        }
        let added = Self::admit(&mut state, replacement);

        // 4. Membership event before the cluster that depends on it.
        self.inner.bus.publish(EngineEvent::WorkingSetChanged {
            removed,
            added,
        });

        // 5. Select with the previous cluster as continuity hint; on a
        //    postcondition defect, log everything and retry without the
        //    hint as last-resort recovery.
        let cluster = match self.select_checked(&state, Some(&current)) {
            Ok(cluster) => cluster,
            Err(defect) => {
                tracing::error!(
                    %defect,
                    working_set = state.working_set.len(),
                    priority = state.priority_members.len(),
                    total_shown = state.total_shown,
                    "cluster postcondition failed; dropping continuity hint"
                );
                match self.select_checked(&state, None) {
                    Ok(cluster) => cluster,
                    Err(defect) => {
                        state.skipped_cycles += 1;
                        return Err(EngineError::InvariantViolation(defect.to_string()));
                    }
                }
            }
        };

        match cluster {
            Some(cluster) => self.commit_cluster(&mut state, cluster),
            None => {
                // The set drained to empty — fall into the placeholder
                // regime and let the next tick retry.
                state.current = None;
                if !state.placeholder_emitted {
                    self.inner
                        .bus
                        .publish(EngineEvent::ClusterChanged { cluster: None });
                    state.placeholder_emitted = true;
                }
            }
        }
        Ok(())
    }

    /// Fold newly submitted messages into the queue without waiting for a
    /// cycle. Public for tests; the poll loop calls it on the timer.
    pub async fn poll_once(&self) -> Result<usize, EngineError> {
        let mut state = self.inner.state.lock().await;
        let discovered = state.pool.poll_new().await?;
        if discovered > 0 {
            tracing::debug!(discovered, "poll found new submissions");
        }
        Ok(discovered)
    }

    /// The renderer's one inbound call: validate, insert, and mark the
    /// message for the priority path.
    pub async fn submit(&self, content: &str) -> Result<Message, EngineError> {
        let mut state = self.inner.state.lock().await;
        let message = state.pool.insert_submission(content).await?;
        tracing::debug!(id = message.id, "submission accepted");
        Ok(message)
    }

    pub async fn current_cluster(&self) -> Option<MessageCluster> {
        self.inner.state.lock().await.current.clone()
    }

    pub async fn stats(&self) -> EngineStats {
        let state = self.inner.state.lock().await;
        EngineStats {
            lifecycle: self.lifecycle(),
            working_set_len: state.working_set.len(),
            working_set_capacity: state.working_set.capacity(),
            priority_members: state.priority_members.len(),
            total_shown: state.total_shown,
            skipped_cycles: state.skipped_cycles,
            pool: state.pool.stats(),
        }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EngineEvent> {
        self.inner.bus.subscribe()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.inner.lifecycle.borrow()
    }

    pub fn pause(&self) {
        if self.lifecycle() == Lifecycle::Running {
            self.set_lifecycle(Lifecycle::Paused);
        }
    }

    pub fn resume(&self) {
        if self.lifecycle() == Lifecycle::Paused {
            self.set_lifecycle(Lifecycle::Running);
        }
    }

    /// Idempotent; halts both timers synchronously. In-flight store calls
    /// complete and their results are discarded.
    pub fn stop(&self) {
        if self.lifecycle() == Lifecycle::Stopped {
            return;
        }
        self.inner.cancel.cancel();
        self.set_lifecycle(Lifecycle::Stopped);
        tracing::info!("traversal engine stopped");
    }

    // --- Internals ---

    fn set_lifecycle(&self, value: Lifecycle) {
        self.inner.lifecycle.send_replace(value);
    }

    /// Fill the set from scratch and emit the first cluster, or the
    /// placeholder when the store is empty. Shared by initialize and the
    /// empty-regime tick.
    async fn enter_from_empty(&self, state: &mut EngineState) -> Result<(), EngineError> {
        let added = Self::fill_working_set(state).await?;
        if state.working_set.is_empty() {
            if !state.placeholder_emitted {
                self.inner
                    .bus
                    .publish(EngineEvent::ClusterChanged { cluster: None });
                state.placeholder_emitted = true;
                tracing::info!("store is empty; emitted placeholder cluster");
            }
            return Ok(());
        }
        self.inner.bus.publish(EngineEvent::WorkingSetChanged {
            removed: Vec::new(),
            added,
        });
        match self.select_checked(state, None) {
            Ok(Some(cluster)) => {
                self.commit_cluster(state, cluster);
                Ok(())
            }
            // Non-empty set always selects; keep the error shape anyway.
            Ok(None) => Ok(()),
            Err(defect) => Err(EngineError::InvariantViolation(defect.to_string())),
        }
    }

    /// Repeated `next_batch` until the set is full or the store is
    /// provably exhausted. Smaller sets are accepted.
    async fn fill_working_set(state: &mut EngineState) -> Result<Vec<Message>, EngineError> {
        let mut added = Vec::new();
        loop {
            let deficit = state.working_set.capacity() - state.working_set.len();
            if deficit == 0 {
                break;
            }
            let exclude = state.working_set.ids();
            let batch = state.pool.next_batch(deficit, &exclude).await?;
            if batch.messages.is_empty() {
                break;
            }
            added.extend(Self::admit(state, batch));
        }
        Ok(added)
    }

    /// Insert a replenishment batch, tracking priority status for the
    /// ids that actually entered the set. Returns the admitted messages.
    fn admit(state: &mut EngineState, batch: Replenishment) -> Vec<Message> {
        let priority: BTreeSet<i64> = batch.priority_ids.into_iter().collect();
        let mut added = Vec::new();
        for message in batch.messages {
            let id = message.id;
            if state.working_set.insert(message.clone()) == InsertOutcome::Inserted {
                if priority.contains(&id) {
                    state.priority_members.insert(id);
                }
                added.push(message);
            }
        }
        added
    }

    fn select_checked(
        &self,
        state: &EngineState,
        previous: Option<&MessageCluster>,
    ) -> Result<Option<MessageCluster>, ClusterDefect> {
        let cluster = select_cluster(
            &state.working_set,
            &state.priority_members,
            previous,
            &self.inner.config,
            state.total_shown + 1,
        );
        if let Some(cluster) = &cluster {
            verify_cluster(cluster, state.working_set.len(), self.inner.config.cluster_size)?;
        }
        Ok(cluster)
    }

    /// Demote the featured members, retain the cluster, and emit it.
    fn commit_cluster(&self, state: &mut EngineState, cluster: MessageCluster) {
        state.priority_members.remove(&cluster.focus.id);
        state.priority_members.remove(&cluster.next.id);
        state.total_shown = cluster.total_shown;
        state.current = Some(cluster.clone());
        state.placeholder_emitted = false;
        self.inner.bus.publish(EngineEvent::ClusterChanged {
            cluster: Some(cluster),
        });
    }

    fn spawn_cycle_loop(&self) {
        let engine = self.clone();
        let cancel = self.inner.cancel.clone();
        let period = Duration::from_millis(self.inner.config.cluster_duration_ms);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // A cycle still in flight when the next tick is due must not
            // double-invoke; skipping is the in-flight guard.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await; // the immediate first tick
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if engine.lifecycle() != Lifecycle::Running {
                            continue;
                        }
                        if let Err(e) = engine.run_cycle().await {
                            tracing::warn!("cycle skipped: {e}");
                        }
                    }
                }
            }
        });
    }

    fn spawn_poll_loop(&self) {
        let engine = self.clone();
        let cancel = self.inner.cancel.clone();
        let period = Duration::from_millis(self.inner.config.polling_interval_ms);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        // Polling runs while Running or Paused.
                        if self_polls(engine.lifecycle())
                            && let Err(e) = engine.poll_once().await
                        {
                            tracing::warn!("poll skipped: {e}");
                        }
                    }
                }
            }
        });
    }
}

fn self_polls(lifecycle: Lifecycle) -> bool {
    matches!(lifecycle, Lifecycle::Running | Lifecycle::Paused)
}
