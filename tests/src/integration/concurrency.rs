//! # Concurrent Callers
//!
//! Many outstanding requests share one inbound subscription. Responses arrive
//! in arbitrary order and must reach exactly the caller they belong to.

#[cfg(test)]
mod tests {
    use crate::harness::{always, test_config, Harness, IncomingRequest, Reply, Responder};
    use booking_gateway::Params;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    const CALLERS: usize = 50;

    fn user(n: usize) -> Params {
        let mut params = Params::new();
        params.insert("userId".to_string(), format!("user-{}", n));
        params
    }

    /// Echo the user back, answering later requests first
    fn reversed_echo() -> Responder {
        Arc::new(|request: &IncomingRequest| {
            let user = request.param("userId").unwrap_or_default().to_string();
            let n: u64 = user
                .trim_start_matches("user-")
                .parse()
                .unwrap_or_default();
            let delay = Duration::from_millis((CALLERS as u64 - n) * 4);
            Reply::Delayed(delay, Box::new(Reply::Json(json!([{"userId": user}]))))
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_out_of_order_responses_no_cross_talk() {
        let harness = Harness::start(test_config(Duration::from_secs(5)), reversed_echo())
            .await
            .unwrap();
        let handler = harness.bridge.handler();

        let calls = (0..CALLERS).map(|n| {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move { (n, handler.user_schedule_slots(&user(n)).await) })
        });

        let results = futures::future::join_all(calls).await;
        for joined in results {
            let (n, result) = joined.unwrap();
            let body = result.unwrap();
            assert_eq!(
                body[0]["userId"],
                format!("user-{}", n),
                "caller {} received someone else's response",
                n
            );
        }

        let registry = harness.bridge.registry();
        assert_eq!(registry.pending_count(), 0);
        assert_eq!(
            registry.stats().resolved.load(Ordering::Relaxed),
            CALLERS as u64
        );
    }

    /// A duplicated response settles nothing twice and leaves others alone
    #[tokio::test]
    async fn test_duplicate_response_dropped() {
        let responder: Responder = Arc::new(|request: &IncomingRequest| {
            match request.param("userId") {
                Some("twice") => Reply::Twice(json!(["first"])),
                _ => Reply::Delayed(
                    Duration::from_millis(200),
                    Box::new(Reply::Json(json!(["slow"]))),
                ),
            }
        });
        let harness = Harness::start(test_config(Duration::from_secs(2)), responder)
            .await
            .unwrap();
        let handler = harness.bridge.handler();

        let mut slow_params = Params::new();
        slow_params.insert("userId".into(), "slow".into());
        let slow_handler = Arc::clone(&handler);
        let slow = tokio::spawn(async move { slow_handler.user_schedule_slots(&slow_params).await });

        let mut twice_params = Params::new();
        twice_params.insert("userId".into(), "twice".into());
        let result = handler.user_schedule_slots(&twice_params).await.unwrap();
        assert_eq!(result, json!(["first"]));

        assert_eq!(slow.await.unwrap().unwrap(), json!(["slow"]));

        let registry = harness.bridge.registry();
        let stats = registry.stats();
        assert_eq!(stats.resolved.load(Ordering::Relaxed), 2);
        assert_eq!(stats.dropped.load(Ordering::Relaxed), 1);
    }

    /// Reads and writes in flight together
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_mixed_operations_in_flight() {
        let harness = Harness::start(
            test_config(Duration::from_secs(2)),
            always(Reply::Delayed(
                Duration::from_millis(20),
                Box::new(Reply::Json(json!({"status": 200, "message": "ok"}))),
            )),
        )
        .await
        .unwrap();
        let handler = harness.bridge.handler();

        let mut booking = Params::new();
        booking.insert("userId".into(), "u1".into());
        booking.insert("scheduleSlotId".into(), "slot-1".into());
        booking.insert("peopleQuantity".into(), "2".into());

        let empty = Params::new();
        let (all, booked, book) = tokio::join!(
            handler.all_schedule_slots(&empty),
            handler.booked_schedule_slots(&empty),
            handler.book_schedule_slot(&booking),
        );

        assert_eq!(all.unwrap(), json!("ok"));
        assert_eq!(booked.unwrap(), json!("ok"));
        assert_eq!(book.unwrap(), json!("ok"));
        assert_eq!(harness.remote.requests_seen(), 3);
    }
}
