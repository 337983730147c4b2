use std::sync::Arc;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use lapin::{
    BasicProperties, Channel as AmqpChannel, Connection, ConnectionProperties, Consumer,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
        BasicRejectOptions, QueueDeclareOptions,
    },
    types::{AMQPValue, FieldTable},
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    config::Config,
    models::{
        message::DlqMessage,
        retry::RetryConfig,
        routing::{Channel, ForwardRecord},
    },
    utils::retry_with_backoff,
};

/// Downstream hand-off for routed events.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, record: ForwardRecord) -> Result<(), Error>;
}

/// Retries a [`Forwarder`] with jittered exponential backoff. Every attempt
/// carries the same record.
pub struct RetryingForwarder {
    inner: Arc<dyn Forwarder>,
    retry_config: RetryConfig,
}

impl RetryingForwarder {
    pub fn new(inner: Arc<dyn Forwarder>, retry_config: RetryConfig) -> Self {
        Self {
            inner,
            retry_config,
        }
    }
}

#[async_trait]
impl Forwarder for RetryingForwarder {
    async fn forward(&self, record: ForwardRecord) -> Result<(), Error> {
        let channel = record.channel;

        retry_with_backoff(&self.retry_config, || self.inner.forward(record.clone()))
            .await
            .map_err(|e| anyhow!("Failed to forward to {}: {}", channel, e))
    }
}

pub struct RabbitMqClient {
    channel: AmqpChannel,
    inbound_queue_name: String,
    partner_queue_name: String,
    call_center_queue_name: String,
    failed_queue_name: String,
}

impl RabbitMqClient {
    pub async fn connect(config: &Config) -> Result<Self, Error> {
        info!("Connecting to RabbitMQ");

        let connection = Connection::connect(&config.rabbitmq_url, ConnectionProperties::default())
            .await
            .map_err(|e| anyhow!("Failed to connect to RabbitMQ: {}", e))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| anyhow!("RabbitMQ channel creation failed: {}", e))?;

        channel
            .basic_qos(config.prefetch_count, BasicQosOptions::default())
            .await
            .map_err(|e| anyhow!("Failed to set up QoS: {}", e))?;

        for queue_name in [
            &config.inbound_queue_name,
            &config.partner_queue_name,
            &config.call_center_queue_name,
            &config.failed_queue_name,
        ] {
            channel
                .queue_declare(
                    queue_name,
                    QueueDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    FieldTable::default(),
                )
                .await
                .map_err(|e| anyhow!("Failed to declare queue {}: {}", queue_name, e))?;

            debug!(queue = %queue_name, "Queue declared");
        }

        info!("RabbitMQ connection established");

        Ok(Self {
            channel,
            inbound_queue_name: config.inbound_queue_name.clone(),
            partner_queue_name: config.partner_queue_name.clone(),
            call_center_queue_name: config.call_center_queue_name.clone(),
            failed_queue_name: config.failed_queue_name.clone(),
        })
    }

    pub async fn create_consumer(&self) -> Result<Consumer, Error> {
        let consumer = self
            .channel
            .basic_consume(
                &self.inbound_queue_name,
                "notification_router",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| anyhow!("Failed to create consumer: {}", e))?;

        info!(queue = %self.inbound_queue_name, "Consumer created");

        Ok(consumer)
    }

    pub async fn acknowledge(&self, delivery_tag: u64) -> Result<(), Error> {
        self.channel
            .basic_ack(delivery_tag, BasicAckOptions::default())
            .await
            .map_err(|e| anyhow!("Failed to acknowledge message: {}", e))?;

        Ok(())
    }

    pub async fn reject(&self, delivery_tag: u64, requeue: bool) -> Result<(), Error> {
        self.channel
            .basic_reject(delivery_tag, BasicRejectOptions { requeue })
            .await
            .map_err(|e| anyhow!("Failed to reject message: {}", e))?;

        Ok(())
    }

    pub async fn publish_to_dlq(&self, message: &DlqMessage) -> Result<(), Error> {
        let payload = serde_json::to_vec(message)?;

        self.publish(&self.failed_queue_name, &payload, BasicProperties::default())
            .await
            .map_err(|e| anyhow!("Failed to publish message to dlq: {}", e))
    }

    fn queue_for(&self, channel: Channel) -> &str {
        match channel {
            Channel::Partner => &self.partner_queue_name,
            Channel::CallCenter => &self.call_center_queue_name,
        }
    }

    async fn publish(
        &self,
        queue_name: &str,
        payload: &[u8],
        properties: BasicProperties,
    ) -> Result<(), Error> {
        self.channel
            .basic_publish(
                "",
                queue_name,
                BasicPublishOptions::default(),
                payload,
                properties.with_delivery_mode(2),
            )
            .await?
            .await?;

        Ok(())
    }
}

#[async_trait]
impl Forwarder for RabbitMqClient {
    async fn forward(&self, record: ForwardRecord) -> Result<(), Error> {
        let queue_name = self.queue_for(record.channel);
        let payload = serde_json::to_vec(&record.event)?;

        let mut headers = FieldTable::default();
        headers.insert(
            "key".into(),
            AMQPValue::LongString(record.key.clone().into()),
        );
        headers.insert(
            "dff_qualifier".into(),
            AMQPValue::LongString(record.event.dff_qualifier.clone().into()),
        );

        let properties = BasicProperties::default()
            .with_message_id(Uuid::new_v4().to_string().into())
            .with_content_type("application/json".into())
            .with_headers(headers);

        self.publish(queue_name, &payload, properties)
            .await
            .map_err(|e| anyhow!("Publish to {} failed: {}", queue_name, e))?;

        debug!(
            key = %record.key,
            channel = %record.channel,
            dff_qualifier = %record.event.dff_qualifier,
            "Event forwarded"
        );

        Ok(())
    }
}
