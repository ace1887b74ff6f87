use std::time::Duration;

use anyhow::Context;
use kafka_rest::{
    Argument, Config, ConsumerRequest, Kafka, ProducerMessage, ProducerRecord, to_pretty_json,
};
use log::{error, info, warn};
use serde_json::json;

const TOPIC_NAME: &str = "kafka-topic";
const CONSUMER_GROUP: &str = "consumer-group";

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::init();

    let config = Config::from_env().context("reading KAFKA_REST_* settings")?;
    info!("Using Kafka REST proxy at {}", config.url);
    let kafka = Kafka::new(config)?;

    let brokers = kafka.brokers().await?;
    info!("Brokers: {:?}", brokers.brokers);

    let topics = kafka.topics();
    for name in topics.names().await? {
        info!("Topic: {}", name);
    }

    let topic = topics.topic(TOPIC_NAME).await?;
    info!("{} configs: {}", topic.name, topic.configs);
    for partition in &topic.partitions {
        info!("{}", to_pretty_json(partition)?);
    }

    let partitions = topics.partitions(Some(TOPIC_NAME));
    for partition in partitions.list(None).await? {
        info!(
            "Partition {} led by {}, in sync: {:?}",
            partition.partition,
            partition.leader,
            partition.in_sync_replicas().collect::<Vec<_>>()
        );
    }

    let message = ProducerMessage::new(vec![
        ProducerRecord::new(json!("a2Fma2E=")).with_key(json!("djU=")),
        ProducerRecord::new(json!("Z28=")),
    ]);
    match partitions.produce(0, &message, None).await {
        Ok(response) => info!("Produced: {}", to_pretty_json(&response)?),
        Err(e) => match e.produce_response() {
            Some(response) => warn!("Partially produced: {}\n{}", e, to_pretty_json(response)?),
            None => return Err(e.into()),
        },
    }

    let consumers = kafka.consumers(Some(CONSUMER_GROUP));
    let request = ConsumerRequest::from_config(kafka.config());
    let instance = consumers.create(&request, None).await?;
    info!("Consumer instance: {}", to_pretty_json(&instance)?);

    let argument = Argument::new(TOPIC_NAME, instance.name.clone());
    let handle = consumers.poll(Duration::from_secs(3), argument, |batch| match batch {
        Ok(messages) => {
            for message in messages {
                info!(
                    "{}[{}]@{}: {}",
                    message.topic, message.partition, message.offset, message.value
                );
            }
        }
        Err(e) => error!("Polling failed: {}", e),
    })?;

    tokio::time::sleep(Duration::from_secs(10)).await;
    handle.stop().await;

    consumers.delete(&instance.name, None).await?;
    info!("Deleted consumer instance {}", instance.name);
    Ok(())
}
