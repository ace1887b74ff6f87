pub mod broker;
pub mod config;
pub mod consumer;
pub mod error;
pub mod partition;
pub mod topic;
pub(crate) mod transport;

use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;

pub use broker::Broker;
pub use config::{Config, Format, Offset, Version};
pub use consumer::Consumers;
pub use error::{Error, ErrorMessage, Result};
pub use partition::Partitions;
pub use topic::Topics;
pub use transport::url_join;

use transport::{Call, Transport};

/// Handle on a Kafka REST proxy.
///
/// Cloning is cheap: clones share the configuration and the HTTP connection pool.
#[derive(Debug, Clone)]
pub struct Kafka {
    config: Arc<Config>,
    transport: Transport,
}

impl Kafka {
    pub fn new(config: Config) -> Result<Self> {
        let transport = Transport::new(&config)?;

        if config.offset.version() != config.version {
            warn!(
                "Offset reset policy {} is not understood by API {}",
                config.offset, config.version
            );
        }
        debug!("Kafka REST client for {} (API {})", transport.base(), config.version);

        Ok(Self {
            config: Arc::new(config),
            transport,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Lists the broker ids of the cluster.
    pub async fn brokers(&self) -> Result<Broker> {
        self.transport.fetch(Call::get(&["brokers"])).await
    }

    pub fn topics(&self) -> Topics {
        Topics::new(self.clone())
    }

    /// Consumer operations, with `default_group` used whenever a call does not name a group.
    pub fn consumers(&self, default_group: Option<&str>) -> Consumers {
        Consumers::new(self.clone(), default_group.map(str::to_string))
    }
}

/// Pretty-printed JSON rendering of any payload, for display.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
