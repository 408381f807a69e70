use serde::{Deserialize, Serialize};

pub const CONNECTION_TYPE: &str = "Binance_P2P";

/// Static description of this data source for host registries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionData {
    pub connection_type: String,
    pub fields: Vec<String>,
}

impl Default for ConnectionData {
    fn default() -> Self {
        Self {
            connection_type: CONNECTION_TYPE.to_string(),
            fields: vec!["trading_pair".to_string(), "target_directory".to_string()],
        }
    }
}
