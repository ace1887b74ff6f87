use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::Format;
use super::error::{Error, Result};
use super::partition::{Partition, Partitions};
use super::transport::Call;
use super::Kafka;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Topic {
    pub name: String,
    /// Topic level overrides exactly as the proxy reports them
    pub configs: Value,
    pub partitions: Vec<Partition>,
}

/// A batch of records to produce, with the schemas needed for Avro
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_schema_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_schema_id: Option<i32>,
    pub records: Vec<ProducerRecord>,
}

impl ProducerMessage {
    pub fn new(records: Vec<ProducerRecord>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    fn has_value_schema(&self) -> bool {
        self.value_schema.as_deref().is_some_and(|s| !s.is_empty())
            || self.value_schema_id.is_some_and(|id| id != 0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Value>,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<i32>,
}

impl ProducerRecord {
    pub fn new(value: Value) -> Self {
        Self {
            key: None,
            value,
            partition: None,
        }
    }

    pub fn with_key(mut self, key: Value) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_partition(mut self, partition: i32) -> Self {
        self.partition = Some(partition);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerResponse {
    pub key_schema_id: Option<i32>,
    pub value_schema_id: Option<i32>,
    pub offsets: Vec<ProducerOffset>,
}

/// Where one record landed, or why it did not
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerOffset {
    pub partition: Option<i32>,
    pub offset: Option<i64>,
    pub error_code: Option<i64>,
    pub error: Option<String>,
}

impl ProducerOffset {
    pub fn is_error(&self) -> bool {
        self.error_code.is_some_and(|code| code != 0)
    }
}

/// Rejects Avro batches without a value schema before anything is sent.
pub(crate) fn check_schema(format: Format, message: &ProducerMessage) -> Result<()> {
    if format == Format::Avro && !message.has_value_schema() {
        return Err(Error::SchemaRequired);
    }
    Ok(())
}

/// Turns per-record failures in an otherwise successful response into an error.
pub(crate) fn check_produced(target: String, response: ProducerResponse) -> Result<ProducerResponse> {
    let failures: Vec<String> = response
        .offsets
        .iter()
        .filter(|o| o.is_error())
        .map(|o| match &o.error {
            Some(e) if !e.is_empty() => e.clone(),
            _ => format!("error code {}", o.error_code.unwrap_or_default()),
        })
        .collect();

    if failures.is_empty() {
        debug!("Produced {} records to {}", response.offsets.len(), target);
        return Ok(response);
    }

    warn!("{} of {} records to {} failed", failures.len(), response.offsets.len(), target);
    Err(Error::Produce {
        target,
        response: Box::new(response),
        failures,
    })
}

/// Topic listing, lookup and produce
#[derive(Debug, Clone)]
pub struct Topics {
    kafka: Kafka,
}

impl Topics {
    pub(crate) fn new(kafka: Kafka) -> Self {
        Self { kafka }
    }

    pub async fn names(&self) -> Result<Vec<String>> {
        self.kafka.transport().fetch(Call::get(&["topics"])).await
    }

    pub async fn topic(&self, name: &str) -> Result<Topic> {
        if name.is_empty() {
            return Err(Error::MissingArgument("topicName"));
        }
        self.kafka.transport().fetch(Call::get(&["topics", name])).await
    }

    /// Every topic with its metadata, fetched one after the other.
    pub async fn topics(&self) -> Result<Vec<Topic>> {
        let names = self.names().await?;
        let mut topics = Vec::with_capacity(names.len());
        for name in &names {
            topics.push(self.topic(name).await?);
        }
        Ok(topics)
    }

    /// Produces to the topic, letting the proxy pick partitions.
    ///
    /// When only some records fail the call returns `Error::Produce`, which
    /// still carries the decoded response.
    pub async fn produce(&self, name: &str, message: &ProducerMessage) -> Result<ProducerResponse> {
        check_schema(self.kafka.config().format, message)?;
        if name.is_empty() {
            return Err(Error::MissingArgument("topicName"));
        }

        let path = ["topics", name];
        let call = Call::post(&path).json(message)?;
        let response = self.kafka.transport().fetch(call).await?;
        check_produced(format!("topic {}", name), response)
    }

    /// Partition operations, bound to `topic` when given.
    pub fn partitions(&self, topic: Option<&str>) -> Partitions {
        Partitions::new(self.kafka.clone(), topic.map(str::to_string))
    }
}
