//! Client binding core for a clustered key-value store
//!
//! Implements the asynchronous put path between a host language runtime and
//! a transport: argument conversion, submission with the host lock released,
//! and exactly-once completion dispatch back into host code. Also provides
//! the partition filter codec used by scans and queries.

mod client;
mod config;
mod errors;
mod host;
mod key;
mod partition;
mod policy;
mod record;
mod transport;
mod utils;
mod value;

pub use client::*;
pub use config::*;
pub use errors::*;
pub use host::*;
pub use key::*;
pub use partition::*;
pub use policy::*;
pub use record::*;
pub use transport::*;
pub use value::*;
