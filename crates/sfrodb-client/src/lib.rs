//! The SFRODB client core and pooled client.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod pool;

pub use client::{Client, ClientConfig};
pub use pool::{ClientPool, PooledClient};
