//! # Failure Paths
//!
//! Silent backend, late, malformed and stray responses, and an unreachable
//! outbound topic. None of them may leave a waiter behind or disturb
//! unrelated callers.

#[cfg(test)]
mod tests {
    use crate::harness::{
        always, publish_response, test_config, Harness, IncomingRequest, Reply, Responder,
        RESPONSE_TOPIC,
    };
    use booking_gateway::{BookingBridge, BridgeError, Operation, Params};
    use serde_json::json;
    use shared_bus::{Attributes, InMemoryPubSub, Publisher, TransportError};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    /// A 2 second deadline with no response settles as a timeout, no earlier
    #[tokio::test]
    async fn test_silent_backend_times_out() {
        let harness = Harness::start(test_config(Duration::from_secs(2)), always(Reply::Silent))
            .await
            .unwrap();
        let started = Instant::now();

        let err = harness
            .bridge
            .handler()
            .available_schedule_slots(&Params::new())
            .await
            .unwrap_err();

        assert!(started.elapsed() >= Duration::from_secs(2));
        assert!(matches!(
            err,
            BridgeError::Timeout {
                operation: Operation::AvailableScheduleSlots,
                ..
            }
        ));
        assert_eq!(err.status_code(), 504);
        assert_eq!(harness.bridge.registry().pending_count(), 0);
        assert_eq!(harness.remote.requests_seen(), 1);
    }

    /// A corrupt body is acknowledged and dropped; the caller times out
    #[tokio::test]
    async fn test_malformed_response_times_out() {
        let harness = Harness::start(
            test_config(Duration::from_millis(300)),
            always(Reply::Raw(b"{broken".to_vec())),
        )
        .await
        .unwrap();

        let err = harness
            .bridge
            .handler()
            .all_schedule_slots(&Params::new())
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Timeout { .. }));
        assert_eq!(harness.inbound_acked(), 1);
        assert_eq!(harness.bridge.registry().pending_count(), 0);
    }

    /// A response arriving after the deadline finds nobody waiting
    #[tokio::test]
    async fn test_late_response_dropped() {
        let harness = Harness::start(
            test_config(Duration::from_millis(100)),
            always(Reply::Delayed(
                Duration::from_millis(300),
                Box::new(Reply::Json(json!("late"))),
            )),
        )
        .await
        .unwrap();

        let err = harness
            .bridge
            .handler()
            .get_all_schedule_slots(&Params::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Timeout { .. }));

        tokio::time::sleep(Duration::from_millis(400)).await;

        let registry = harness.bridge.registry();
        let stats = registry.stats();
        assert_eq!(stats.timed_out.load(Ordering::Relaxed), 1);
        assert_eq!(stats.dropped.load(Ordering::Relaxed), 1);
        assert_eq!(harness.inbound_acked(), 1);
    }

    /// Stray traffic on the inbound subscription does not reach a pending caller
    #[tokio::test]
    async fn test_stray_messages_ignored() {
        let responder: Responder = Arc::new(|_: &IncomingRequest| {
            Reply::Delayed(
                Duration::from_millis(150),
                Box::new(Reply::Json(json!(["mine"]))),
            )
        });
        let harness = Harness::start(test_config(Duration::from_secs(2)), responder)
            .await
            .unwrap();

        let handler = harness.bridge.handler();
        let call = tokio::spawn(async move { handler.available_schedule_slots(&Params::new()).await });

        tokio::time::sleep(Duration::from_millis(30)).await;
        // No correlation id at all
        harness
            .bus
            .publish(RESPONSE_TOPIC, br#"["theirs"]"#.to_vec(), Attributes::new())
            .await
            .unwrap();
        // Unparsable correlation id
        publish_response(&harness.bus, "not-a-uuid", br#"["theirs"]"#.to_vec())
            .await
            .unwrap();
        // Well formed id nobody is waiting for
        publish_response(
            &harness.bus,
            &booking_gateway::CorrelationId::new().to_string(),
            br#"["theirs"]"#.to_vec(),
        )
        .await
        .unwrap();

        assert_eq!(call.await.unwrap().unwrap(), json!(["mine"]));
        assert_eq!(harness.inbound_acked(), 4);
        assert_eq!(
            harness
                .bridge
                .registry()
                .stats()
                .dropped
                .load(Ordering::Relaxed),
            1
        );
    }

    /// Publish failure surfaces unmodified and leaves no orphaned waiter
    #[tokio::test]
    async fn test_publish_failure_deregisters() {
        let config = test_config(Duration::from_secs(2));
        let bus = Arc::new(InMemoryPubSub::new());
        // Inbound side exists, outbound topic does not
        bus.create_subscription(RESPONSE_TOPIC, &config.transport.inbound_subscription)
            .unwrap();

        let mut bridge = BookingBridge::new(config, bus.clone(), bus.clone()).unwrap();
        bridge.start().await.unwrap();

        let err = bridge
            .handler()
            .all_schedule_slots(&Params::new())
            .await
            .unwrap_err();

        match &err {
            BridgeError::Publish(TransportError::TopicNotFound(topic)) => {
                assert_eq!(topic, "booking-backend")
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.status_code(), 500);

        let registry = bridge.registry();
        assert_eq!(registry.pending_count(), 0);
        assert_eq!(registry.stats().registered.load(Ordering::Relaxed), 1);
        assert_eq!(registry.stats().cancelled.load(Ordering::Relaxed), 1);

        bridge.shutdown().await;
    }
}
