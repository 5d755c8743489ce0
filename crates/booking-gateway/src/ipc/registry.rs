//! Correlation registry: the table of callers waiting for a response.
//!
//! Maps correlation IDs to waiters. Written by every request handler,
//! resolved by the response listener, expired by the deadline sweep.
//!
//! Flow:
//! 1. Handler generates a CorrelationId and calls `register()` with a deadline
//! 2. Handler publishes the request and awaits the returned [`Waiter`]
//! 3. Listener receives the response and calls `resolve()`
//! 4. Otherwise the deadline passes and the waiter settles as timed out
//!
//! Every settlement path removes the entry through a single `DashMap` removal,
//! so whichever path gets there first wins and the others see nothing.

use crate::domain::correlation::CorrelationId;
use crate::domain::envelope::ResponseEnvelope;
use crate::domain::error::RegistryError;
use crate::domain::operation::Operation;
use booking_telemetry::{PENDING_WAITERS, RESPONSE_DURATION};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// How a waiter was settled
#[derive(Debug)]
pub enum Settlement {
    /// Correlated response arrived
    Response(ResponseEnvelope),
    /// Deadline passed first
    TimedOut { waited: Duration },
    /// Entry was removed without a result
    Cancelled,
}

/// A registered waiter
struct PendingWaiter {
    /// Channel to hand over the settlement
    sender: oneshot::Sender<Settlement>,
    /// When the waiter was registered
    created_at: Instant,
    /// When the waiter times out
    deadline: Instant,
    /// Operation (for logging and metrics)
    operation: Operation,
}

/// Statistics for the correlation registry
#[derive(Debug, Default)]
pub struct RegistryStats {
    /// Total waiters registered
    pub registered: AtomicU64,
    /// Total waiters settled with a response
    pub resolved: AtomicU64,
    /// Total waiters settled by their deadline
    pub timed_out: AtomicU64,
    /// Total waiters removed by their owner
    pub cancelled: AtomicU64,
    /// Responses with no waiter to deliver to
    pub dropped: AtomicU64,
}

/// Correlation registry.
pub struct CorrelationRegistry {
    pending: DashMap<CorrelationId, PendingWaiter>,
    accepting: AtomicBool,
    stats: RegistryStats,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            accepting: AtomicBool::new(true),
            stats: RegistryStats::default(),
        }
    }

    /// Register a waiter that settles no later than `deadline`.
    pub fn register(
        self: &Arc<Self>,
        correlation_id: CorrelationId,
        deadline: Instant,
        operation: Operation,
    ) -> Result<Waiter, RegistryError> {
        if !self.accepting.load(Ordering::Acquire) {
            return Err(RegistryError::ShuttingDown);
        }

        let (tx, rx) = oneshot::channel();
        match self.pending.entry(correlation_id) {
            Entry::Occupied(_) => return Err(RegistryError::Duplicate(correlation_id)),
            Entry::Vacant(slot) => {
                slot.insert(PendingWaiter {
                    sender: tx,
                    created_at: Instant::now(),
                    deadline,
                    operation,
                });
            }
        }

        self.stats.registered.fetch_add(1, Ordering::Relaxed);
        PENDING_WAITERS.inc();

        debug!(
            correlation_id = %correlation_id,
            operation = %operation,
            "Registered waiter"
        );

        Ok(Waiter {
            correlation_id,
            deadline,
            receiver: rx,
            registry: Arc::clone(self),
            settled: false,
        })
    }

    /// Settle the waiter matching the response's correlation id.
    ///
    /// Returns false when no waiter exists; the response is dropped.
    pub fn resolve(&self, response: ResponseEnvelope) -> bool {
        let correlation_id = response.correlation_id;
        let Some((_, waiter)) = self.pending.remove(&correlation_id) else {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                correlation_id = %correlation_id,
                "Response for unknown or already settled correlation ID"
            );
            return false;
        };

        PENDING_WAITERS.dec();
        let elapsed = waiter.created_at.elapsed();
        RESPONSE_DURATION
            .with_label_values(&[waiter.operation.as_str()])
            .observe(elapsed.as_secs_f64());

        match waiter.sender.send(Settlement::Response(response)) {
            Ok(()) => {
                self.stats.resolved.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    operation = %waiter.operation,
                    response_time_ms = elapsed.as_millis() as u64,
                    "Resolved waiter"
                );
                true
            }
            Err(_) => {
                // Owner went away between removal and hand-over
                self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(correlation_id = %correlation_id, "Waiter receiver dropped");
                false
            }
        }
    }

    /// Time out one waiter if its deadline has passed.
    pub fn expire(&self, correlation_id: &CorrelationId) -> bool {
        self.expire_if_due(correlation_id, Instant::now())
    }

    /// Time out every waiter whose deadline is at or before `now`.
    ///
    /// Returns the number of waiters settled.
    pub fn expire_due(&self, now: Instant) -> usize {
        let due: Vec<CorrelationId> = self
            .pending
            .iter()
            .filter(|entry| entry.deadline <= now)
            .map(|entry| *entry.key())
            .collect();

        due.iter()
            .filter(|id| self.expire_if_due(id, now))
            .count()
    }

    fn expire_if_due(&self, correlation_id: &CorrelationId, now: Instant) -> bool {
        let Some((_, waiter)) = self
            .pending
            .remove_if(correlation_id, |_, waiter| waiter.deadline <= now)
        else {
            return false;
        };

        PENDING_WAITERS.dec();
        self.stats.timed_out.fetch_add(1, Ordering::Relaxed);
        let waited = now.saturating_duration_since(waiter.created_at);
        warn!(
            correlation_id = %correlation_id,
            operation = %waiter.operation,
            waited_ms = waited.as_millis() as u64,
            "Waiter expired without a response"
        );
        let _ = waiter.sender.send(Settlement::TimedOut { waited });
        true
    }

    /// Remove a waiter without settling it with a result.
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        if let Some((_, waiter)) = self.pending.remove(correlation_id) {
            PENDING_WAITERS.dec();
            self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(
                correlation_id = %correlation_id,
                operation = %waiter.operation,
                "Cancelled waiter"
            );
            true
        } else {
            false
        }
    }

    /// Stop accepting new waiters. Existing ones still settle normally.
    pub fn close(&self) {
        if self.accepting.swap(false, Ordering::AcqRel) {
            info!(pending = self.pending.len(), "Correlation registry closed");
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Get number of waiters not yet settled
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a correlation ID is pending
    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }

    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }
}

impl Default for CorrelationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle held by the caller for one registered waiter.
///
/// Dropping it before settlement removes the registry entry.
pub struct Waiter {
    correlation_id: CorrelationId,
    deadline: Instant,
    receiver: oneshot::Receiver<Settlement>,
    registry: Arc<CorrelationRegistry>,
    settled: bool,
}

impl Waiter {
    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Suspend until the waiter settles. Never outlives the deadline.
    pub async fn wait(mut self) -> Settlement {
        let early = tokio::select! {
            biased;
            settled = &mut self.receiver => Some(settled),
            _ = tokio::time::sleep_until(self.deadline) => None,
        };

        let outcome = match early {
            Some(outcome) => outcome,
            None => {
                // The listener may have resolved it in the meantime
                self.registry.expire(&self.correlation_id);
                (&mut self.receiver).await
            }
        };

        self.settled = true;
        outcome.unwrap_or(Settlement::Cancelled)
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        if !self.settled {
            self.registry.cancel(&self.correlation_id);
        }
    }
}

/// Background task expiring overdue waiters until `shutdown` flips to true.
pub async fn run_sweeper(
    registry: Arc<CorrelationRegistry>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let expired = registry.expire_due(Instant::now());
                if expired > 0 {
                    debug!(expired = expired, "Swept expired waiters");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    debug!("Expiry sweeper stopped");
}
