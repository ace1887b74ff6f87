use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::kafka::config::{Config, Format, Offset};

/// Settings for a new consumer instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumerRequest {
    pub format: Format,
    #[serde(rename = "auto.offset.reset")]
    pub offset: Offset,
    /// Sent as the string "true" or "false"
    #[serde(
        rename = "auto.commit.enable",
        serialize_with = "bool_as_str",
        deserialize_with = "bool_from_str"
    )]
    pub auto_commit: bool,
    /// Left out to let the proxy generate a name
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
}

impl ConsumerRequest {
    /// Format and reset policy taken from the client configuration, auto commit on.
    pub fn from_config(config: &Config) -> Self {
        Self {
            format: config.format,
            offset: config.offset,
            auto_commit: true,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_auto_commit(mut self, auto_commit: bool) -> Self {
        self.auto_commit = auto_commit;
        self
    }
}

fn bool_as_str<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "true" } else { "false" })
}

fn bool_from_str<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let s = String::deserialize(deserializer)?;
    Ok(s.eq_ignore_ascii_case("true"))
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerInstance {
    #[serde(rename = "instance_id")]
    pub name: String,
    pub base_uri: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerOffset {
    pub partition: i32,
    pub offset: i64,
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl ConsumerOffset {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            partition,
            offset,
            topic: topic.into(),
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerOffsets {
    pub offsets: Vec<ConsumerOffset>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerPartition {
    pub partition: i32,
    pub topic: String,
}

impl ConsumerPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            partition,
            topic: topic.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerPartitions {
    pub partitions: Vec<ConsumerPartition>,
}

/// What a consumer subscribes to: a fixed topic list or a topic name pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopicSubscription {
    Topics { topics: Vec<String> },
    Pattern { topic_pattern: String },
}

impl TopicSubscription {
    pub fn topics<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TopicSubscription::Topics {
            topics: topics.into_iter().map(Into::into).collect(),
        }
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        TopicSubscription::Pattern {
            topic_pattern: pattern.into(),
        }
    }
}

/// Current subscription as reported by the proxy
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicsSubscription {
    pub topics: Vec<String>,
}

/// A consumed record. Key and value are left as raw JSON since their shape
/// depends on the embedded format (base64 string for binary, any JSON otherwise).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    pub topic: String,
    pub key: Option<Value>,
    pub value: Value,
    pub partition: i32,
    pub offset: i64,
}

/// Parameters of a single fetch, shared by `records`, `messages` and polling
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Argument {
    /// Only used by the v1 `messages` call
    pub topic_name: String,
    pub consumer_name: String,
    /// Falls back to the default group of the `Consumers`
    pub consumer_group: Option<String>,
    /// Cap on unencoded key and value bytes in the response
    pub max_bytes: Option<u64>,
    /// Milliseconds the proxy may spend fetching, v2 only
    pub timeout: Option<u64>,
}

impl Argument {
    pub fn new(topic_name: impl Into<String>, consumer_name: impl Into<String>) -> Self {
        Self {
            topic_name: topic_name.into(),
            consumer_name: consumer_name.into(),
            ..Default::default()
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.consumer_group = Some(group.into());
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(timeout_ms);
        self
    }
}
