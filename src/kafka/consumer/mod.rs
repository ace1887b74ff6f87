pub mod poll;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use reqwest::StatusCode;

use super::config::Version;
use super::error::{Error, Result};
use super::transport::Call;
use super::Kafka;

pub use poll::{MessageSource, PollHandle};
pub use types::{
    Argument, ConsumerInstance, ConsumerOffset, ConsumerOffsets, ConsumerPartition,
    ConsumerPartitions, ConsumerRequest, Message, TopicSubscription, TopicsSubscription,
};

/// Consumer instance management and fetching for consumer groups.
///
/// Every call takes an optional group; when it is `None` (or empty) the
/// default group given at construction is used instead.
#[derive(Debug, Clone)]
pub struct Consumers {
    kafka: Kafka,
    default_group: Option<String>,
}

impl Consumers {
    pub(crate) fn new(kafka: Kafka, default_group: Option<String>) -> Self {
        Self {
            kafka,
            default_group,
        }
    }

    pub fn default_group(&self) -> Option<&str> {
        self.default_group.as_deref()
    }

    fn group<'a>(&'a self, group: Option<&'a str>) -> Result<&'a str> {
        group
            .filter(|g| !g.is_empty())
            .or(self.default_group.as_deref().filter(|g| !g.is_empty()))
            .ok_or(Error::MissingArgument("consumerGroup"))
    }

    /// `/consumers/{group}/instances/{name}` followed by `rest`
    fn instance_path<'a>(
        &'a self,
        name: &'a str,
        group: Option<&'a str>,
        rest: &[&'a str],
    ) -> Result<Vec<&'a str>> {
        let group = self.group(group)?;
        if name.is_empty() {
            return Err(Error::MissingArgument("consumerName"));
        }
        let mut path = vec!["consumers", group, "instances", name];
        path.extend_from_slice(rest);
        Ok(path)
    }

    /// Creates a consumer instance in the group.
    pub async fn create(
        &self,
        request: &ConsumerRequest,
        group: Option<&str>,
    ) -> Result<ConsumerInstance> {
        let path = ["consumers", self.group(group)?];
        let call = Call::post(&path).json(request)?;
        self.kafka.transport().fetch(call).await
    }

    /// Destroys the consumer instance.
    pub async fn delete(&self, name: &str, group: Option<&str>) -> Result<()> {
        let path = self.instance_path(name, group, &[])?;
        let call = Call::delete(&path).expect(StatusCode::NO_CONTENT);
        self.kafka.transport().send(call).await?;
        Ok(())
    }

    /// Commits a list of offsets for the consumer.
    pub async fn commit_offsets(
        &self,
        offsets: &ConsumerOffsets,
        name: &str,
        group: Option<&str>,
    ) -> Result<()> {
        let path = self.instance_path(name, group, &["offsets"])?;
        let call = Call::post(&path).json(offsets)?;
        self.kafka.transport().send(call).await?;
        Ok(())
    }

    /// Last committed offsets for the given partitions.
    pub async fn offsets(
        &self,
        partitions: &ConsumerPartitions,
        name: &str,
        group: Option<&str>,
    ) -> Result<ConsumerOffsets> {
        let path = self.instance_path(name, group, &["offsets"])?;
        let call = Call::get(&path).json(partitions)?;
        self.kafka.transport().fetch(call).await
    }

    pub async fn subscribe(
        &self,
        subscription: &TopicSubscription,
        name: &str,
        group: Option<&str>,
    ) -> Result<()> {
        let path = self.instance_path(name, group, &["subscription"])?;
        let call = Call::post(&path)
            .json(subscription)?
            .expect(StatusCode::NO_CONTENT);
        self.kafka.transport().send(call).await?;
        Ok(())
    }

    pub async fn subscriptions(&self, name: &str, group: Option<&str>) -> Result<TopicsSubscription> {
        let path = self.instance_path(name, group, &["subscription"])?;
        self.kafka.transport().fetch(Call::get(&path)).await
    }

    pub async fn unsubscribe(&self, name: &str, group: Option<&str>) -> Result<()> {
        let path = self.instance_path(name, group, &["subscription"])?;
        let call = Call::delete(&path).expect(StatusCode::NO_CONTENT);
        self.kafka.transport().send(call).await?;
        Ok(())
    }

    /// Manually assigns partitions to the consumer.
    pub async fn assign(
        &self,
        partitions: &ConsumerPartitions,
        name: &str,
        group: Option<&str>,
    ) -> Result<()> {
        let path = self.instance_path(name, group, &["assignments"])?;
        let call = Call::post(&path)
            .json(partitions)?
            .expect(StatusCode::NO_CONTENT);
        self.kafka.transport().send(call).await?;
        Ok(())
    }

    pub async fn assignments(&self, name: &str, group: Option<&str>) -> Result<ConsumerPartitions> {
        let path = self.instance_path(name, group, &["assignments"])?;
        self.kafka.transport().fetch(Call::get(&path)).await
    }

    /// Overrides the offsets the next fetch starts from.
    pub async fn seek(&self, offsets: &ConsumerOffsets, name: &str, group: Option<&str>) -> Result<()> {
        let path = self.instance_path(name, group, &["positions"])?;
        self.seek_call(&path, offsets).await
    }

    pub async fn seek_to_beginning(
        &self,
        partitions: &ConsumerPartitions,
        name: &str,
        group: Option<&str>,
    ) -> Result<()> {
        let path = self.instance_path(name, group, &["positions", "beginning"])?;
        self.seek_call(&path, partitions).await
    }

    pub async fn seek_to_end(
        &self,
        partitions: &ConsumerPartitions,
        name: &str,
        group: Option<&str>,
    ) -> Result<()> {
        let path = self.instance_path(name, group, &["positions", "end"])?;
        self.seek_call(&path, partitions).await
    }

    async fn seek_call<B: serde::Serialize>(&self, path: &[&str], body: &B) -> Result<()> {
        let call = Call::post(path).json(body)?.expect(StatusCode::NO_CONTENT);
        self.kafka.transport().send(call).await?;
        Ok(())
    }

    /// Fetches records for the subscribed topics or assigned partitions (API v2).
    pub async fn records(&self, argument: &Argument) -> Result<Vec<Message>> {
        let path = self.instance_path(
            &argument.consumer_name,
            argument.consumer_group.as_deref(),
            &["records"],
        )?;

        let mut call = Call::get(&path);
        if let Some(timeout) = argument.timeout.filter(|t| *t != 0) {
            call = call.query("timeout", timeout);
        }
        if let Some(max_bytes) = argument.max_bytes.filter(|m| *m != 0) {
            call = call.query("max_bytes", max_bytes);
        }
        self.kafka.transport().fetch(call).await
    }

    /// Consumes messages from one topic (API v1).
    pub async fn messages(&self, argument: &Argument) -> Result<Vec<Message>> {
        let path = self.instance_path(
            &argument.consumer_name,
            argument.consumer_group.as_deref(),
            &["topics", argument.topic_name.as_str()],
        )?;
        if argument.topic_name.is_empty() {
            return Err(Error::MissingArgument("topicName"));
        }

        let mut call = Call::get(&path);
        if let Some(max_bytes) = argument.max_bytes.filter(|m| *m != 0) {
            call = call.query("max_bytes", max_bytes);
        }
        self.kafka.transport().fetch(call).await
    }

    /// One fetch through `messages` or `records`, depending on the configured API version.
    pub async fn consume(&self, argument: &Argument) -> Result<Vec<Message>> {
        match self.kafka.config().version {
            Version::V1 => self.messages(argument).await,
            Version::V2 => self.records(argument).await,
        }
    }

    /// Starts polling every `interval` on a background task, handing each
    /// batch to `on_message`.
    ///
    /// The first fetch happens one interval after the call. A failed fetch is
    /// handed over once and ends the polling. Must be called within a tokio runtime.
    pub fn poll<F>(&self, interval: Duration, argument: Argument, on_message: F) -> Result<PollHandle>
    where
        F: FnMut(Result<Vec<Message>>) + Send + 'static,
    {
        poll::spawn(self.clone(), interval, argument, on_message)
    }

    /// Same schedule as [`Consumers::poll`], as a stream that yields a failed
    /// fetch once and then ends. Dropping the stream stops polling.
    pub fn poll_stream(
        &self,
        interval: Duration,
        argument: Argument,
    ) -> Result<BoxStream<'static, Result<Vec<Message>>>> {
        poll::stream(self.clone(), interval, argument)
    }
}

#[async_trait]
impl MessageSource for Consumers {
    async fn fetch(&self, argument: &Argument) -> Result<Vec<Message>> {
        self.consume(argument).await
    }
}
