use serde::{Deserialize, Serialize};

/// Broker ids currently in the cluster
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Broker {
    pub brokers: Vec<i32>,
}
