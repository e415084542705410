//! Server configuration.

use sfrodb_core::{CacheConfig, DataConfig};

/// Everything needed to bind and run a [`crate::Server`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host both listeners bind to.
    pub host: String,
    /// Port for the read-only main channel.
    pub main_port: u16,
    /// Port for the mutating aux channel.
    pub aux_port: u16,
    /// Data folder and file extension.
    pub data: DataConfig,
    /// Cache volume/TTL budgets.
    pub cache: CacheConfig,
}

impl ServerConfig {
    /// The address the main listener binds to.
    #[must_use]
    pub fn main_addr(&self) -> String {
        format!("{}:{}", self.host, self.main_port)
    }

    /// The address the aux listener binds to.
    #[must_use]
    pub fn aux_addr(&self) -> String {
        format!("{}:{}", self.host, self.aux_port)
    }
}
