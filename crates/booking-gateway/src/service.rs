//! Booking bridge service: wiring and lifecycle.
//!
//! Transport handles are injected, never global. `start()` attaches to the
//! inbound subscription exactly once and spawns the response listener and the
//! expiry sweeper. `shutdown()` stops new registrations, lets in-flight
//! waiters drain or time out within the grace period, then stops both tasks.

use crate::domain::config::GatewayConfig;
use crate::domain::error::{BridgeError, ConfigError};
use crate::handler::RequestHandler;
use crate::ipc::listener::ResponseListener;
use crate::ipc::publisher::MessagePublisher;
use crate::ipc::registry::{run_sweeper, CorrelationRegistry};
use shared_bus::{Publisher, Subscriber};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

/// How often shutdown re-checks the number of outstanding waiters
const DRAIN_POLL: Duration = Duration::from_millis(10);

/// The booking bridge service
pub struct BookingBridge {
    config: GatewayConfig,
    registry: Arc<CorrelationRegistry>,
    handler: Arc<RequestHandler>,
    subscriber: Arc<dyn Subscriber>,
    shutdown_tx: Option<watch::Sender<bool>>,
    tasks: Vec<JoinHandle<()>>,
}

impl BookingBridge {
    /// Create a new bridge. Nothing runs until [`start`](Self::start).
    pub fn new(
        config: GatewayConfig,
        publisher: Arc<dyn Publisher>,
        subscriber: Arc<dyn Subscriber>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let registry = Arc::new(CorrelationRegistry::new());
        let handler = Arc::new(RequestHandler::new(
            Arc::clone(&registry),
            MessagePublisher::new(publisher),
            config.transport.outbound_topic.clone(),
            config.timeouts.clone(),
        ));

        Ok(Self {
            config,
            registry,
            handler,
            subscriber,
            shutdown_tx: None,
            tasks: Vec::new(),
        })
    }

    /// Subscribe to the inbound subscription and spawn the background tasks.
    pub async fn start(&mut self) -> Result<(), BridgeError> {
        if self.shutdown_tx.is_some() {
            return Err(BridgeError::Internal("bridge already started".to_string()));
        }
        if !self.registry.is_accepting() {
            return Err(BridgeError::ShuttingDown);
        }

        let subscription = &self.config.transport.inbound_subscription;
        let stream = self
            .subscriber
            .subscribe(subscription)
            .await
            .map_err(BridgeError::Subscribe)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let listener = ResponseListener::new(Arc::clone(&self.registry), stream);
        self.tasks
            .push(tokio::spawn(listener.run(shutdown_rx.clone())));
        self.tasks.push(tokio::spawn(run_sweeper(
            Arc::clone(&self.registry),
            self.config.timeouts.sweep_interval,
            shutdown_rx,
        )));
        self.shutdown_tx = Some(shutdown_tx);

        info!(
            outbound_topic = %self.config.transport.outbound_topic,
            inbound_subscription = %subscription,
            default_timeout_ms = self.config.timeouts.default.as_millis() as u64,
            "Booking bridge started"
        );
        Ok(())
    }

    /// Stop accepting requests and wind the bridge down.
    ///
    /// Returns the number of waiters still outstanding when the grace period
    /// ran out (they keep their own deadlines).
    pub async fn shutdown(&mut self) -> usize {
        self.registry.close();

        let grace_end = Instant::now() + self.config.timeouts.shutdown_grace;
        while self.registry.pending_count() > 0 && Instant::now() < grace_end {
            tokio::time::sleep(DRAIN_POLL).await;
        }
        let remaining = self.registry.pending_count();
        if remaining > 0 {
            warn!(remaining = remaining, "Shutdown grace elapsed with waiters outstanding");
        }

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }

        info!("Booking bridge stopped");
        remaining
    }

    /// Shared handler for all booking operations
    pub fn handler(&self) -> Arc<RequestHandler> {
        Arc::clone(&self.handler)
    }

    pub fn registry(&self) -> Arc<CorrelationRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Started and not yet shut down
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }
}
