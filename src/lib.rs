//! Ethereum ABI call data: type descriptors, function selectors, head/tail
//! encoding and decoding, and matching of encoded calls against an
//! address's transaction history.

mod abi;
mod coerce;
mod config;
mod contract;
mod error;
mod history;
mod matcher;
mod params;
mod rpc;
mod selector;
mod typed_data;
mod types;
mod values;

pub use abi::*;
pub use coerce::*;
pub use config::*;
pub use contract::*;
pub use error::{Error, Result};
pub use history::*;
pub use matcher::*;
pub use params::*;
pub use rpc::*;
pub use selector::*;
pub use typed_data::*;
pub use types::*;
pub use values::*;
