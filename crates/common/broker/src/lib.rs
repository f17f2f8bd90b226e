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

//! Booking lifecycle events over named queues.
//!
//! The gateway publishes JSON payloads through a [`Publisher`]; the booking
//! service pulls them back out through a [`Subscriber`] and settles every
//! [`Delivery`] with an ack or a requeue-free nack. Two backends implement
//! both traits: [`amqp::AmqpBroker`] for a RabbitMQ-compatible server and
//! [`memory::MemoryBroker`] for in-process use.

pub mod amqp;
pub mod error;
pub mod memory;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;
use snafu::ResultExt;

pub use crate::error::{BrokerError, Result};

/// Content type stamped on every published message.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// The fixed set of queues. Names are the wire names.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
    strum_macros::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum Queue {
    /// Payload: `CreateBookingRequest`.
    CreateBooking,
    /// Payload: `CancelBookingRequest`.
    BookingCancelled,
    /// Payload: the created `Payment`. Notification only.
    PaymentProcessed,
    /// Payload: the created `Review`. Notification only.
    ReviewSubmitted,
}

impl Queue {
    /// Queues the booking service consumes.
    pub const CONSUMED: [Self; 2] = [Self::CreateBooking, Self::BookingCancelled];
}

#[async_trait]
pub trait Publisher: Send + Sync + 'static {
    async fn publish(&self, queue: Queue, body: Vec<u8>) -> Result<()>;
}

/// Serializes `value` as JSON and publishes it to `queue`.
pub async fn publish_json<T: Serialize + Sync>(
    publisher: &dyn Publisher,
    queue: Queue,
    value: &T,
) -> Result<()> {
    let body = serde_json::to_vec(value).context(error::EncodeSnafu)?;
    publisher.publish(queue, body).await
}

/// A received message that must be settled exactly once.
#[async_trait]
pub trait Delivery: Send {
    fn body(&self) -> &[u8];

    async fn ack(self: Box<Self>) -> Result<()>;

    /// Rejects the message without requeueing it.
    async fn nack(self: Box<Self>) -> Result<()>;
}

pub type DeliveryStream = BoxStream<'static, Result<Box<dyn Delivery>>>;

#[async_trait]
pub trait Subscriber: Send + Sync + 'static {
    /// Declares `queue` and starts consuming it. The stream ends when the
    /// underlying channel closes.
    async fn subscribe(&self, queue: Queue) -> Result<DeliveryStream>;
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_queue_wire_names() {
        let names: Vec<String> = Queue::iter().map(|q| q.to_string()).collect();
        assert_eq!(names, vec![
            "create_booking",
            "booking_cancelled",
            "payment_processed",
            "review_submitted"
        ]);
        assert_eq!(
            "booking_cancelled".parse::<Queue>().unwrap(),
            Queue::BookingCancelled
        );
        assert_eq!(Queue::CreateBooking.as_ref(), "create_booking");
    }
}
