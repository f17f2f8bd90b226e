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

use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
        QueueDeclareOptions,
    },
    types::FieldTable,
};
use snafu::ResultExt;
use strum::IntoEnumIterator;
use tracing::{debug, info};

use crate::{
    CONTENT_TYPE_JSON, Delivery, DeliveryStream, Publisher, Queue, Subscriber,
    error::{
        ChannelSnafu, ConnectSnafu, ConsumeSnafu, DeclareSnafu, PublishSnafu, Result, SettleSnafu,
    },
};

/// One AMQP connection with a single shared channel.
///
/// All four queues are declared on connect so that publishes made before the
/// booking service starts are not routed into the void.
pub struct AmqpBroker {
    connection: Connection,
    channel:    Channel,
}

impl AmqpBroker {
    pub async fn connect(uri: &str) -> Result<Self> {
        let connection = Connection::connect(uri, ConnectionProperties::default())
            .await
            .context(ConnectSnafu { uri })?;
        let channel = connection.create_channel().await.context(ChannelSnafu)?;
        let broker = Self {
            connection,
            channel,
        };
        for queue in Queue::iter() {
            broker.declare(queue).await?;
        }
        info!("connected to message broker");
        Ok(broker)
    }

    /// Non-durable, non-exclusive, not auto-deleted.
    async fn declare(&self, queue: Queue) -> Result<()> {
        self.channel
            .queue_declare(
                queue.as_ref(),
                QueueDeclareOptions::default(),
                FieldTable::default(),
            )
            .await
            .context(DeclareSnafu { queue })?;
        Ok(())
    }

    pub async fn close(&self) -> Result<()> {
        self.channel
            .close(200, "closing")
            .await
            .context(ChannelSnafu)?;
        self.connection
            .close(200, "closing")
            .await
            .context(ChannelSnafu)
    }
}

#[async_trait]
impl Publisher for AmqpBroker {
    async fn publish(&self, queue: Queue, body: Vec<u8>) -> Result<()> {
        self.channel
            .basic_publish(
                "",
                queue.as_ref(),
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default().with_content_type(CONTENT_TYPE_JSON.into()),
            )
            .await
            .context(PublishSnafu { queue })?
            .await
            .context(PublishSnafu { queue })?;
        debug!(%queue, bytes = body.len(), "message published");
        Ok(())
    }
}

#[async_trait]
impl Subscriber for AmqpBroker {
    async fn subscribe(&self, queue: Queue) -> Result<DeliveryStream> {
        self.declare(queue).await?;
        let consumer = self
            .channel
            .basic_consume(
                queue.as_ref(),
                &format!("carwash-booking-{queue}"),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .context(ConsumeSnafu { queue })?;
        info!(%queue, "consuming");
        Ok(consumer
            .map(move |delivery| {
                delivery
                    .map(|d| Box::new(AmqpDelivery(d)) as Box<dyn Delivery>)
                    .context(ConsumeSnafu { queue })
            })
            .boxed())
    }
}

struct AmqpDelivery(lapin::message::Delivery);

#[async_trait]
impl Delivery for AmqpDelivery {
    fn body(&self) -> &[u8] { &self.0.data }

    async fn ack(self: Box<Self>) -> Result<()> {
        self.0
            .acker
            .ack(BasicAckOptions::default())
            .await
            .context(SettleSnafu)
    }

    async fn nack(self: Box<Self>) -> Result<()> {
        self.0
            .acker
            .nack(BasicNackOptions {
                requeue:  false,
                multiple: false,
            })
            .await
            .context(SettleSnafu)
    }
}
