use async_trait::async_trait;
use bejaia_core::{ContactMessage, Notifier, RepoError};
use bejaia_shared::models::events::{ContactMessageEvent, VerificationRequestedEvent};
use chrono::Utc;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{error, info};

use crate::app_config::KafkaConfig;

/// Publishes notification requests for the mailer service
#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
    verification_topic: String,
    contact_topic: String,
}

impl EventProducer {
    pub fn new(config: &KafkaConfig) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self {
            producer,
            verification_topic: config.verification_topic.clone(),
            contact_topic: config.contact_topic.clone(),
        })
    }

    pub async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), rdkafka::error::KafkaError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
            Ok(delivery) => {
                info!("Sent message to {}: partition {} offset {}", topic, delivery.partition, delivery.offset);
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to send message to {}: {}", topic, e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Notifier for EventProducer {
    async fn verification_requested(&self, email: &str, token: &str) -> Result<(), RepoError> {
        let event = VerificationRequestedEvent {
            email: email.to_string(),
            token: token.to_string(),
            timestamp: Utc::now().timestamp(),
        };
        let payload = serde_json::to_string(&event)?;
        self.publish(&self.verification_topic, email, &payload).await?;
        Ok(())
    }

    async fn contact_message(&self, message: &ContactMessage) -> Result<(), RepoError> {
        let event = ContactMessageEvent {
            subject: message.subject.clone(),
            name: message.name.clone(),
            email: message.email.clone(),
            phone: message.phone.clone(),
            message: message.message.clone(),
            timestamp: Utc::now().timestamp(),
        };
        let payload = serde_json::to_string(&event)?;
        let key = message.email.as_deref().unwrap_or("anonymous");
        self.publish(&self.contact_topic, key, &payload).await?;
        Ok(())
    }
}
