//! # Test Harness
//!
//! A simulated remote booking service living on the same [`InMemoryPubSub`]
//! as the bridge. It consumes the outbound topic, asks a [`Responder`] what
//! to answer, and publishes the answer on the response topic tagged with the
//! request's correlation id. Every request is answered from its own task, so
//! delayed replies overtake each other exactly like on a real backbone.

use anyhow::Context;
use booking_gateway::{BookingBridge, GatewayConfig};
use futures::StreamExt;
use serde_json::{json, Value};
use shared_bus::{
    Attributes, InMemoryPubSub, MessageId, Publisher, Subscriber, TransportError,
    ATTR_CORRELATION_ID, ATTR_OPERATION,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Topic the remote service answers on
pub const RESPONSE_TOPIC: &str = "booking-responses";
/// Subscription the remote service consumes requests from
pub const BACKEND_SUBSCRIPTION: &str = "booking-backend-sub";

/// What the remote service does with one request
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer with a JSON body
    Json(Value),
    /// Answer with raw bytes
    Raw(Vec<u8>),
    /// Answer the same body twice
    Twice(Value),
    /// Answer after a delay
    Delayed(Duration, Box<Reply>),
    /// Never answer
    Silent,
}

/// Request as seen by the remote service
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub operation: String,
    pub params: Option<Value>,
}

impl IncomingRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.as_ref()?.get(name)?.as_str()
    }
}

/// Decides the reply for each request
pub type Responder = Arc<dyn Fn(&IncomingRequest) -> Reply + Send + Sync>;

/// Responder answering every request with the same reply
pub fn always(reply: Reply) -> Responder {
    Arc::new(move |_: &IncomingRequest| reply.clone())
}

/// Responder behaving like the deployed booking backend
pub fn booking_backend() -> Responder {
    Arc::new(|request: &IncomingRequest| match request.operation.as_str() {
        "getAllScheduleLots" => Reply::Json(json!([
            {"id": "slot-1", "capacity": 4},
            {"id": "slot-2", "capacity": 2}
        ])),
        "userSchedulesLots" => match request.param("userId") {
            Some("nobody") => Reply::Json(json!([])),
            Some(user) => Reply::Json(json!([{"userId": user, "scheduleSlotId": "slot-1"}])),
            None => Reply::Json(Value::Null),
        },
        "allScheduleSlots" => Reply::Json(json!({
            "status": 200,
            "message": [{"id": "slot-1"}, {"id": "slot-2"}, {"id": "slot-3"}]
        })),
        "bookedScheduleSlots" => Reply::Json(json!({
            "status": 404,
            "message": "No booked schedule slots"
        })),
        "bookScheduleSlot" => {
            let people: u32 = request
                .param("peopleQuantity")
                .and_then(|q| q.parse().ok())
                .unwrap_or(0);
            if people == 0 || people > 4 {
                Reply::Json(json!({"status": 400, "error": "Not enough capacity"}))
            } else {
                Reply::Json(json!({
                    "status": 201,
                    "message": {
                        "bookingId": "booking-1",
                        "scheduleSlotId": request.param("scheduleSlotId"),
                        "peopleQuantity": people
                    }
                }))
            }
        }
        _ => Reply::Silent,
    })
}

/// The simulated remote booking service
pub struct RemoteBookingService {
    handle: JoinHandle<()>,
    requests: Arc<AtomicUsize>,
}

impl RemoteBookingService {
    /// Attach to [`BACKEND_SUBSCRIPTION`] and start answering.
    pub async fn spawn(bus: Arc<InMemoryPubSub>, responder: Responder) -> anyhow::Result<Self> {
        let mut stream = bus
            .subscribe(BACKEND_SUBSCRIPTION)
            .await
            .context("remote service subscribe")?;
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&requests);

        let handle = tokio::spawn(async move {
            while let Some(Ok(message)) = stream.next().await {
                counter.fetch_add(1, Ordering::SeqCst);

                let correlation_id = message
                    .attribute(ATTR_CORRELATION_ID)
                    .unwrap_or_default()
                    .to_string();
                let request = IncomingRequest {
                    operation: message.attribute(ATTR_OPERATION).unwrap_or_default().to_string(),
                    params: serde_json::from_slice(message.payload()).ok(),
                };
                message.ack();

                let reply = responder(&request);
                let bus = Arc::clone(&bus);
                tokio::spawn(async move {
                    if let Err(e) = answer(bus, correlation_id, reply).await {
                        eprintln!("remote service could not answer: {}", e);
                    }
                });
            }
        });

        Ok(Self { handle, requests })
    }

    /// Requests received so far
    pub fn requests_seen(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for RemoteBookingService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn answer(
    bus: Arc<InMemoryPubSub>,
    correlation_id: String,
    mut reply: Reply,
) -> Result<(), TransportError> {
    loop {
        match reply {
            Reply::Delayed(delay, inner) => {
                tokio::time::sleep(delay).await;
                reply = *inner;
            }
            Reply::Silent => return Ok(()),
            Reply::Json(body) => {
                publish_response(&bus, &correlation_id, body.to_string().into_bytes()).await?;
                return Ok(());
            }
            Reply::Raw(bytes) => {
                publish_response(&bus, &correlation_id, bytes).await?;
                return Ok(());
            }
            Reply::Twice(body) => {
                let bytes = body.to_string().into_bytes();
                publish_response(&bus, &correlation_id, bytes.clone()).await?;
                publish_response(&bus, &correlation_id, bytes).await?;
                return Ok(());
            }
        }
    }
}

/// Publish a response body tagged with `correlation_id` on [`RESPONSE_TOPIC`].
pub async fn publish_response(
    bus: &InMemoryPubSub,
    correlation_id: &str,
    body: Vec<u8>,
) -> Result<MessageId, TransportError> {
    let mut attributes = Attributes::new();
    attributes.insert(ATTR_CORRELATION_ID.to_string(), correlation_id.to_string());
    bus.publish(RESPONSE_TOPIC, body, attributes).await
}

/// Bridge, backbone and remote service wired together and running
pub struct Harness {
    pub bus: Arc<InMemoryPubSub>,
    pub bridge: BookingBridge,
    pub remote: RemoteBookingService,
}

impl Harness {
    /// Create topics and subscriptions for `config`, start the remote
    /// service and the bridge.
    pub async fn start(config: GatewayConfig, responder: Responder) -> anyhow::Result<Self> {
        let bus = Arc::new(InMemoryPubSub::new());
        bus.create_subscription(&config.transport.outbound_topic, BACKEND_SUBSCRIPTION)?;
        bus.create_subscription(RESPONSE_TOPIC, &config.transport.inbound_subscription)?;

        let remote = RemoteBookingService::spawn(Arc::clone(&bus), responder).await?;

        let mut bridge = BookingBridge::new(config, bus.clone(), bus.clone())?;
        bridge.start().await?;

        Ok(Self {
            bus,
            bridge,
            remote,
        })
    }

    /// Number of responses the bridge's inbound subscription has acknowledged
    pub fn inbound_acked(&self) -> u64 {
        let name = &self.bridge.config().transport.inbound_subscription;
        self.bus
            .subscription_stats(name)
            .map(|stats| stats.acked.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

/// Configuration with short deadlines for tests
pub fn test_config(deadline: Duration) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.timeouts.default = deadline;
    config.timeouts.write = deadline;
    config.timeouts.sweep_interval = Duration::from_millis(50);
    config.timeouts.shutdown_grace = Duration::from_secs(1);
    config
}
