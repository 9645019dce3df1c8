// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! AMQP transport for [`procrun_core::Message`] between the producer and
//! the consumer (SPEC_FULL.md §4.3, §4.4, §6).

use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use procrun_core::Message;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),
    #[error("message serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("consumer stream closed")]
    StreamClosed,
}

/// A connected channel bound to the one queue this system uses to carry
/// process-start messages.
pub struct MessageBus {
    channel: Channel,
    queue_name: String,
}

impl MessageBus {
    pub async fn connect(amqp_url: &str, queue_name: &str) -> Result<Self, BusError> {
        let connection =
            Connection::connect(amqp_url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        channel
            .queue_declare(
                queue_name,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(Self {
            channel,
            queue_name: queue_name.to_string(),
        })
    }

    /// `true` iff the underlying AMQP channel is still usable. Backs the
    /// consumer's `/healthz` bus check.
    pub fn is_ready(&self) -> bool {
        self.channel.status().connected()
    }

    pub async fn publish(&self, message: &Message) -> Result<(), BusError> {
        let body = serde_json::to_vec(message)?;
        self.channel
            .basic_publish(
                "",
                &self.queue_name,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await?
            .await?;
        Ok(())
    }

    /// Open a consumer on this queue. The returned [`MessageConsumer`]
    /// acks or nacks each delivery explicitly; the consumer loop decides
    /// based on whether the message was already processed (idempotent,
    /// ack) or transiently failed (nack + requeue).
    pub async fn consumer(&self, tag: &str) -> Result<MessageConsumer, BusError> {
        let inner = self
            .channel
            .basic_consume(
                &self.queue_name,
                tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;
        Ok(MessageConsumer { inner })
    }
}

pub struct MessageConsumer {
    inner: lapin::Consumer,
}

/// A delivered message paired with the handle needed to ack/nack it.
pub struct Delivery {
    pub message: Message,
    handle: lapin::message::Delivery,
}

impl Delivery {
    pub async fn ack(self) -> Result<(), BusError> {
        self.handle.ack(BasicAckOptions::default()).await?;
        Ok(())
    }

    pub async fn nack_requeue(self) -> Result<(), BusError> {
        self.handle
            .nack(BasicNackOptions {
                requeue: true,
                ..BasicNackOptions::default()
            })
            .await?;
        Ok(())
    }
}

impl MessageConsumer {
    /// Await the next delivery. Returns `Ok(None)` only if the consumer
    /// stream itself closes (e.g. channel dropped on shutdown).
    pub async fn next(&mut self) -> Result<Option<Delivery>, BusError> {
        match self.inner.next().await {
            Some(Ok(handle)) => {
                let message: Message = serde_json::from_slice(&handle.data)?;
                Ok(Some(Delivery { message, handle }))
            }
            Some(Err(err)) => Err(err.into()),
            None => Ok(None),
        }
    }
}
