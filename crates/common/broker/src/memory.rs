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

//! In-process broker with the same delivery contract as AMQP: each message
//! goes to one consumer, is settled once, and a nack drops it for good.
//! Every publish and every settlement is recorded for inspection.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use futures::{StreamExt, stream};
use tokio::sync::mpsc;

use crate::{
    Delivery, DeliveryStream, Publisher, Queue, Subscriber,
    error::{AlreadySubscribedSnafu, ClosedSnafu, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Acked,
    Nacked,
}

/// A settled delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub queue:      Queue,
    pub body:       Vec<u8>,
    pub settlement: Settlement,
}

struct Channel {
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    rx: Option<mpsc::UnboundedReceiver<Vec<u8>>>,
}

impl Channel {
    fn open() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Some(tx),
            rx: Some(rx),
        }
    }
}

#[derive(Default)]
struct State {
    channels:  HashMap<Queue, Channel>,
    published: Vec<(Queue, Vec<u8>)>,
    outcomes:  Vec<Outcome>,
}

#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<State>>,
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryBroker {
    pub fn new() -> Self { Self::default() }

    /// Every message published so far, in order.
    pub fn published(&self) -> Vec<(Queue, Vec<u8>)> { lock(&self.state).published.clone() }

    /// Every settlement so far, in order.
    pub fn outcomes(&self) -> Vec<Outcome> { lock(&self.state).outcomes.clone() }

    /// Closes `queue`: its consumer stream ends once drained and further
    /// publishes fail.
    pub fn close(&self, queue: Queue) {
        let mut state = lock(&self.state);
        state.channels.entry(queue).or_insert_with(Channel::open).tx = None;
    }
}

#[async_trait]
impl Publisher for MemoryBroker {
    async fn publish(&self, queue: Queue, body: Vec<u8>) -> Result<()> {
        let mut state = lock(&self.state);
        let channel = state.channels.entry(queue).or_insert_with(Channel::open);
        let Some(tx) = channel.tx.as_ref() else {
            return ClosedSnafu { queue }.fail();
        };
        if tx.send(body.clone()).is_err() {
            return ClosedSnafu { queue }.fail();
        }
        state.published.push((queue, body));
        Ok(())
    }
}

#[async_trait]
impl Subscriber for MemoryBroker {
    async fn subscribe(&self, queue: Queue) -> Result<DeliveryStream> {
        let rx = {
            let mut state = lock(&self.state);
            let channel = state.channels.entry(queue).or_insert_with(Channel::open);
            channel.rx.take()
        };
        let Some(rx) = rx else {
            return AlreadySubscribedSnafu { queue }.fail();
        };
        let state = Arc::clone(&self.state);
        Ok(stream::unfold(rx, move |mut rx| {
            let state = Arc::clone(&state);
            async move {
                let body = rx.recv().await?;
                let delivery: Box<dyn Delivery> = Box::new(MemoryDelivery { queue, body, state });
                Some((Ok(delivery), rx))
            }
        })
        .boxed())
    }
}

struct MemoryDelivery {
    queue: Queue,
    body:  Vec<u8>,
    state: Arc<Mutex<State>>,
}

impl MemoryDelivery {
    fn settle(self, settlement: Settlement) {
        lock(&self.state).outcomes.push(Outcome {
            queue: self.queue,
            body: self.body,
            settlement,
        });
    }
}

#[async_trait]
impl Delivery for MemoryDelivery {
    fn body(&self) -> &[u8] { &self.body }

    async fn ack(self: Box<Self>) -> Result<()> {
        self.settle(Settlement::Acked);
        Ok(())
    }

    async fn nack(self: Box<Self>) -> Result<()> {
        self.settle(Settlement::Nacked);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::publish_json;

    #[tokio::test]
    async fn test_publish_then_consume_in_order() {
        let broker = MemoryBroker::new();
        broker.publish(Queue::CreateBooking, b"one".to_vec()).await.unwrap();
        broker.publish(Queue::CreateBooking, b"two".to_vec()).await.unwrap();

        let mut stream = broker.subscribe(Queue::CreateBooking).await.unwrap();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.body(), b"one");
        first.ack().await.unwrap();
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.body(), b"two");
        second.nack().await.unwrap();

        let outcomes = broker.outcomes();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].settlement, Settlement::Acked);
        assert_eq!(outcomes[1].settlement, Settlement::Nacked);
    }

    #[tokio::test]
    async fn test_queues_are_isolated() {
        let broker = MemoryBroker::new();
        publish_json(&broker, Queue::ReviewSubmitted, &serde_json::json!({"rating": 5}))
            .await
            .unwrap();
        broker.close(Queue::CreateBooking);

        let mut stream = broker.subscribe(Queue::CreateBooking).await.unwrap();
        assert!(stream.next().await.is_none());

        let published = broker.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, Queue::ReviewSubmitted);
    }

    #[tokio::test]
    async fn test_single_consumer_per_queue() {
        let broker = MemoryBroker::new();
        let _stream = broker.subscribe(Queue::BookingCancelled).await.unwrap();
        assert!(broker.subscribe(Queue::BookingCancelled).await.is_err());
    }

    #[tokio::test]
    async fn test_publish_to_closed_queue_fails() {
        let broker = MemoryBroker::new();
        broker.close(Queue::PaymentProcessed);
        assert!(
            broker
                .publish(Queue::PaymentProcessed, b"x".to_vec())
                .await
                .is_err()
        );
        assert!(broker.published().is_empty());
    }
}
