// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Queue consumers for asynchronous booking creation and cancellation.
//!
//! One task per consumed queue, all tracked by a shared [`TaskTracker`] and
//! stopped by a shared [`CancellationToken`]. A delivery is acked when its
//! handler succeeds and nacked without requeue otherwise, so a poison message
//! is dropped instead of looping forever.

use std::sync::Arc;

use carwash_api::pb::booking::v1::{
    CancelBookingRequest, CreateBookingRequest, booking_server::Booking,
};
use carwash_broker::{Delivery, DeliveryStream, Queue, Subscriber};
use futures::StreamExt;
use snafu::ResultExt;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tonic::Request;
use tracing::{error, info, warn};

use crate::{
    error::{InvalidMessageSnafu, Result, RejectedSnafu, UnconsumedQueueSnafu},
    service::BookingService,
};

/// Running consumer tasks.
pub struct ConsumerHandle {
    tracker:            TaskTracker,
    cancellation_token: CancellationToken,
}

impl ConsumerHandle {
    /// Asks every consumer loop to stop after its current delivery.
    pub fn shutdown(&self) { self.cancellation_token.cancel(); }

    /// Resolves once every consumer loop has exited.
    pub async fn wait(&self) { self.tracker.wait().await; }

    pub fn is_finished(&self) -> bool { self.tracker.is_empty() }
}

/// Subscribes to [`Queue::CONSUMED`] and spawns one loop per queue.
///
/// Cancelling `cancellation_token` (or calling
/// [`ConsumerHandle::shutdown`]) stops all of them.
pub async fn start_consumers(
    subscriber: &dyn Subscriber,
    service: Arc<BookingService>,
    cancellation_token: CancellationToken,
) -> Result<ConsumerHandle> {
    let tracker = TaskTracker::new();
    for queue in Queue::CONSUMED {
        let stream = subscriber.subscribe(queue).await?;
        tracker.spawn(consume(
            queue,
            stream,
            service.clone(),
            cancellation_token.clone(),
        ));
        info!(%queue, "consumer started");
    }
    tracker.close();
    Ok(ConsumerHandle {
        tracker,
        cancellation_token,
    })
}

async fn consume(
    queue: Queue,
    mut stream: DeliveryStream,
    service: Arc<BookingService>,
    cancellation_token: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancellation_token.cancelled() => {
                info!(%queue, "consumer received shutdown signal");
                break;
            }
            next = stream.next() => match next {
                Some(Ok(delivery)) => settle(queue, delivery, &service).await,
                Some(Err(err)) => error!(%queue, error = %err, "failed to receive delivery"),
                None => {
                    warn!(%queue, "delivery stream closed");
                    break;
                }
            },
        }
    }
    info!(%queue, "consumer stopped");
}

async fn settle(queue: Queue, delivery: Box<dyn Delivery>, service: &BookingService) {
    let body = delivery.body().to_vec();
    let outcome = handle(queue, &body, service).await;
    let settled = match outcome {
        Ok(()) => delivery.ack().await,
        Err(err) => {
            warn!(%queue, error = %err, "dropping message");
            delivery.nack().await
        }
    };
    if let Err(err) = settled {
        error!(%queue, error = %err, "failed to settle delivery");
    }
}

async fn handle(queue: Queue, body: &[u8], service: &BookingService) -> Result<()> {
    match queue {
        Queue::CreateBooking => {
            let req: CreateBookingRequest =
                serde_json::from_slice(body).context(InvalidMessageSnafu { queue })?;
            let booking = service
                .create_booking(Request::new(req))
                .await
                .map_err(|status| RejectedSnafu { queue, status }.build())?
                .into_inner();
            info!(booking_id = %booking.id, "booking created from queue");
        }
        Queue::BookingCancelled => {
            let req: CancelBookingRequest =
                serde_json::from_slice(body).context(InvalidMessageSnafu { queue })?;
            let id = req.id.clone();
            service
                .cancel_booking(Request::new(req))
                .await
                .map_err(|status| RejectedSnafu { queue, status }.build())?;
            info!(booking_id = %id, "booking cancelled from queue");
        }
        Queue::PaymentProcessed | Queue::ReviewSubmitted => {
            return UnconsumedQueueSnafu { queue }.fail();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use carwash_api::pb::booking::v1::ListRequest;
    use carwash_broker::{
        Publisher,
        memory::{MemoryBroker, Settlement},
        publish_json,
    };

    use carwash_error::ErrorExt;

    use super::*;
    use crate::{BookingError, store::MemoryStore};

    async fn wait_for_outcomes(broker: &MemoryBroker, n: usize) {
        for _ in 0..100 {
            if broker.outcomes().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {n} settled deliveries, got {:?}", broker.outcomes());
    }

    async fn bookings(service: &BookingService) -> usize {
        service
            .list_bookings(Request::new(ListRequest::default()))
            .await
            .unwrap()
            .into_inner()
            .bookings
            .len()
    }

    #[tokio::test]
    async fn test_create_then_cancel_through_queues() {
        carwash_common_telemetry::logging::init_default_ut_logging();
        let broker = MemoryBroker::new();
        let service = Arc::new(BookingService::new(Arc::new(MemoryStore::new())));
        let handle = start_consumers(&broker, service.clone(), CancellationToken::new())
            .await
            .unwrap();

        publish_json(&broker, Queue::CreateBooking, &CreateBookingRequest {
            user_id: "u1".into(),
            ..Default::default()
        })
        .await
        .unwrap();
        wait_for_outcomes(&broker, 1).await;
        assert_eq!(broker.outcomes()[0].settlement, Settlement::Acked);
        assert_eq!(bookings(&service).await, 1);

        let id = service
            .list_bookings(Request::new(ListRequest::default()))
            .await
            .unwrap()
            .into_inner()
            .bookings[0]
            .id
            .clone();
        publish_json(&broker, Queue::BookingCancelled, &CancelBookingRequest { id })
            .await
            .unwrap();
        wait_for_outcomes(&broker, 2).await;
        assert_eq!(broker.outcomes()[1].settlement, Settlement::Acked);
        assert_eq!(bookings(&service).await, 0);

        handle.shutdown();
        handle.wait().await;
    }

    #[tokio::test]
    async fn test_malformed_message_is_nacked_and_loop_survives() {
        let broker = MemoryBroker::new();
        let service = Arc::new(BookingService::new(Arc::new(MemoryStore::new())));
        let handle = start_consumers(&broker, service.clone(), CancellationToken::new())
            .await
            .unwrap();

        broker
            .publish(Queue::CreateBooking, b"{not json".to_vec())
            .await
            .unwrap();
        wait_for_outcomes(&broker, 1).await;
        assert_eq!(broker.outcomes()[0].settlement, Settlement::Nacked);

        // Cancelling an unknown booking fails in the handler and is dropped too.
        publish_json(&broker, Queue::BookingCancelled, &CancelBookingRequest {
            id: "66f0c0ffee0000000000beef".into(),
        })
        .await
        .unwrap();
        wait_for_outcomes(&broker, 2).await;
        assert_eq!(broker.outcomes()[1].settlement, Settlement::Nacked);

        publish_json(&broker, Queue::CreateBooking, &CreateBookingRequest::default())
            .await
            .unwrap();
        wait_for_outcomes(&broker, 3).await;
        assert_eq!(broker.outcomes()[2].settlement, Settlement::Acked);
        assert_eq!(bookings(&service).await, 1);

        handle.shutdown();
        handle.wait().await;
    }

    #[tokio::test]
    async fn test_notification_queues_have_no_handler() {
        let service = BookingService::new(Arc::new(MemoryStore::new()));
        for queue in [Queue::PaymentProcessed, Queue::ReviewSubmitted] {
            assert!(!Queue::CONSUMED.contains(&queue));
            let err = handle(queue, b"{}", &service).await.unwrap_err();
            assert!(matches!(err, BookingError::UnconsumedQueue { .. }));
            assert_eq!(err.status_code(), carwash_error::StatusCode::Internal);
        }
        assert_eq!(bookings(&service).await, 0);
    }

    #[tokio::test]
    async fn test_cancellation_drains_every_consumer() {
        let broker = MemoryBroker::new();
        let token = CancellationToken::new();
        let service = Arc::new(BookingService::new(Arc::new(MemoryStore::new())));
        let handle = start_consumers(&broker, service, token.clone())
            .await
            .unwrap();
        assert!(!handle.is_finished());

        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle.wait())
            .await
            .unwrap();
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_closed_stream_ends_loop() {
        let broker = MemoryBroker::new();
        let service = Arc::new(BookingService::new(Arc::new(MemoryStore::new())));
        let handle = start_consumers(&broker, service, CancellationToken::new())
            .await
            .unwrap();

        for queue in Queue::CONSUMED {
            broker.close(queue);
        }
        tokio::time::timeout(Duration::from_secs(5), handle.wait())
            .await
            .unwrap();
    }
}
