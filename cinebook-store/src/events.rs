use async_trait::async_trait;
use cinebook_core::{BoxError, EventSink};
use cinebook_shared::TicketEvent;
use std::sync::Arc;

/// Appends each event to every sink in order, stopping at the first failure.
pub struct FanoutEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutEventSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl EventSink for FanoutEventSink {
    async fn append(&self, event: &TicketEvent) -> Result<(), BoxError> {
        for sink in &self.sinks {
            sink.append(event).await?;
        }
        Ok(())
    }
}

#[cfg(feature = "kafka")]
mod kafka {
    use async_trait::async_trait;
    use cinebook_core::{BoxError, EventSink};
    use cinebook_shared::TicketEvent;
    use rdkafka::config::ClientConfig;
    use rdkafka::error::KafkaError;
    use rdkafka::producer::{FutureProducer, FutureRecord};
    use rdkafka::util::Timeout;
    use std::time::Duration;
    use tracing::{error, info};

    use crate::app_config::KafkaConfig;

    /// Publishes ticket events as JSON, keyed by ticket so one ticket's history
    /// stays on one partition.
    #[derive(Clone)]
    pub struct KafkaEventSink {
        producer: FutureProducer,
        topic: String,
    }

    impl KafkaEventSink {
        pub fn new(config: &KafkaConfig) -> Result<Self, KafkaError> {
            let producer: FutureProducer = ClientConfig::new()
                .set("bootstrap.servers", &config.brokers)
                .set("message.timeout.ms", "5000")
                .create()?;

            Ok(Self {
                producer,
                topic: config.topic.clone(),
            })
        }

        pub fn topic(&self) -> &str {
            &self.topic
        }

        /// Key and JSON payload of the record published for `event`.
        pub fn message_for(event: &TicketEvent) -> Result<(String, String), serde_json::Error> {
            Ok((event.partition_key(), event.to_json()?))
        }
    }

    #[async_trait]
    impl EventSink for KafkaEventSink {
        async fn append(&self, event: &TicketEvent) -> Result<(), BoxError> {
            let (key, payload) = Self::message_for(event)?;
            let record = FutureRecord::to(&self.topic).key(&key).payload(&payload);

            match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
                Ok(delivery) => {
                    info!(
                        "Published {} event {} to {}: partition {} offset {}",
                        event.event_type, event.id, self.topic, delivery.partition, delivery.offset
                    );
                    Ok(())
                }
                Err((e, _msg)) => {
                    error!("Failed to publish {} event {} to {}: {}", event.event_type, event.id, self.topic, e);
                    Err(e.into())
                }
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::Utc;
        use cinebook_shared::TicketEventType;
        use uuid::Uuid;

        fn local_config() -> KafkaConfig {
            KafkaConfig {
                brokers: "localhost:9092".to_string(),
                topic: "ticket.events".to_string(),
            }
        }

        #[tokio::test]
        async fn test_sink_builds_without_broker() {
            let sink = KafkaEventSink::new(&local_config()).unwrap();
            assert_eq!(sink.topic(), "ticket.events");
        }

        #[test]
        fn test_message_keyed_by_ticket() {
            let ticket_id = Uuid::new_v4();
            let event = TicketEvent::new(
                TicketEventType::SeatChanged,
                Some(ticket_id),
                "Seat changed from 4 to 9",
                Utc::now(),
            );

            let (key, payload) = KafkaEventSink::message_for(&event).unwrap();

            assert_eq!(key, event.partition_key());
            assert_eq!(payload, event.to_json().unwrap());
            let decoded: TicketEvent = serde_json::from_str(&payload).unwrap();
            assert_eq!(decoded, event);
        }
    }
}

#[cfg(feature = "kafka")]
pub use kafka::KafkaEventSink;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cinebook_core::memory::InMemoryEventLog;
    use cinebook_core::EventHistory;
    use cinebook_shared::TicketEventType;

    struct Unavailable;

    #[async_trait]
    impl EventSink for Unavailable {
        async fn append(&self, _event: &TicketEvent) -> Result<(), BoxError> {
            Err("broker down".into())
        }
    }

    fn booked() -> TicketEvent {
        TicketEvent::new(TicketEventType::Booked, None, "booked", Utc::now())
    }

    #[tokio::test]
    async fn test_fanout_writes_every_sink() {
        let first = Arc::new(InMemoryEventLog::new());
        let second = Arc::new(InMemoryEventLog::new());
        let sinks: Vec<Arc<dyn EventSink>> = vec![first.clone() as Arc<dyn EventSink>, second.clone()];
        let fanout = FanoutEventSink::new(sinks);

        fanout.append(&booked()).await.unwrap();

        assert_eq!(first.list_events().await.unwrap().len(), 1);
        assert_eq!(second.len(), 1);
    }

    #[tokio::test]
    async fn test_fanout_stops_at_first_failure() {
        let primary = Arc::new(InMemoryEventLog::new());
        let after = Arc::new(InMemoryEventLog::new());
        let sinks: Vec<Arc<dyn EventSink>> = vec![
            primary.clone() as Arc<dyn EventSink>,
            Arc::new(Unavailable),
            after.clone(),
        ];
        let fanout = FanoutEventSink::new(sinks);

        assert!(fanout.append(&booked()).await.is_err());
        assert_eq!(primary.len(), 1);
        assert!(after.is_empty());
    }
}
