use serde::{Deserialize, Serialize};

use super::error::{Error, Result};
use super::topic::{ProducerMessage, ProducerResponse, check_produced, check_schema};
use super::transport::Call;
use super::Kafka;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Replica {
    pub broker: i32,
    pub leader: bool,
    pub in_sync: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Partition {
    pub partition: i32,
    pub leader: i32,
    pub replicas: Vec<Replica>,
}

impl Partition {
    pub fn in_sync_replicas(&self) -> impl Iterator<Item = i32> + '_ {
        self.replicas.iter().filter(|r| r.in_sync).map(|r| r.broker)
    }
}

/// Partition lookup and produce, optionally bound to one topic.
///
/// Each call takes an optional topic name that wins over the bound one.
#[derive(Debug, Clone)]
pub struct Partitions {
    kafka: Kafka,
    topic: Option<String>,
}

impl Partitions {
    pub(crate) fn new(kafka: Kafka, topic: Option<String>) -> Self {
        Self { kafka, topic }
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    fn topic_name<'a>(&'a self, topic: Option<&'a str>) -> Result<&'a str> {
        topic
            .filter(|t| !t.is_empty())
            .or(self.topic.as_deref().filter(|t| !t.is_empty()))
            .ok_or(Error::MissingArgument("topicName"))
    }

    pub async fn list(&self, topic: Option<&str>) -> Result<Vec<Partition>> {
        let name = self.topic_name(topic)?;
        self.kafka
            .transport()
            .fetch(Call::get(&["topics", name, "partitions"]))
            .await
    }

    pub async fn get(&self, id: i32, topic: Option<&str>) -> Result<Partition> {
        let name = self.topic_name(topic)?;
        let id = id.to_string();
        self.kafka
            .transport()
            .fetch(Call::get(&["topics", name, "partitions", id.as_str()]))
            .await
    }

    /// Produces every record of `message` to partition `id`.
    pub async fn produce(
        &self,
        id: i32,
        message: &ProducerMessage,
        topic: Option<&str>,
    ) -> Result<ProducerResponse> {
        check_schema(self.kafka.config().format, message)?;
        let name = self.topic_name(topic)?;

        let id_segment = id.to_string();
        let path = ["topics", name, "partitions", id_segment.as_str()];
        let call = Call::post(&path).json(message)?;
        let response = self.kafka.transport().fetch(call).await?;
        check_produced(format!("partition {} of topic {}", id, name), response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kafka::Config;

    fn partitions(topic: Option<&str>) -> Partitions {
        Kafka::new(Config::default()).unwrap().topics().partitions(topic)
    }

    #[test]
    fn explicit_topic_wins_over_bound_topic() {
        let ps = partitions(Some("bound"));
        assert_eq!(ps.topic_name(Some("explicit")).unwrap(), "explicit");
        assert_eq!(ps.topic_name(None).unwrap(), "bound");
        assert_eq!(ps.topic_name(Some("")).unwrap(), "bound");
    }

    #[test]
    fn missing_topic_is_rejected() {
        let ps = partitions(None);
        assert!(matches!(ps.topic_name(None), Err(Error::MissingArgument("topicName"))));
    }

    #[test]
    fn in_sync_replicas_filters() {
        let p = Partition {
            partition: 0,
            leader: 1,
            replicas: vec![
                Replica { broker: 1, leader: true, in_sync: true },
                Replica { broker: 2, leader: false, in_sync: false },
                Replica { broker: 3, leader: false, in_sync: true },
            ],
        };
        assert_eq!(p.in_sync_replicas().collect::<Vec<_>>(), vec![1, 3]);
    }
}
