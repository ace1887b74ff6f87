//! Typed async client for the Kafka REST proxy: brokers, topics, partitions,
//! producing, consumer instances and a polling consumer loop.

pub mod kafka;

pub use kafka::consumer::{
    Argument, ConsumerInstance, ConsumerOffset, ConsumerOffsets, ConsumerPartition,
    ConsumerPartitions, ConsumerRequest, Message, MessageSource, PollHandle, TopicSubscription,
    TopicsSubscription,
};
pub use kafka::partition::{Partition, Replica};
pub use kafka::topic::{ProducerMessage, ProducerOffset, ProducerRecord, ProducerResponse, Topic};
pub use kafka::{
    Broker, Config, Consumers, Error, ErrorMessage, Format, Kafka, Offset, Partitions, Result,
    Topics, Version, to_pretty_json, url_join,
};
