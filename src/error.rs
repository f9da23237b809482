use thiserror::Error;

use crate::selector::Selector;

/// Errors produced while building, encoding, decoding or matching contract calls.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing method name, signature or argument list.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// Type list and value list differ in length.
    #[error("types/values length mismatch: {types} types, {values} values")]
    LengthMismatch { types: usize, values: usize },

    /// A type string does not follow the ABI type grammar.
    #[error("invalid type `{ty}`: {reason}")]
    Type { ty: String, reason: String },

    /// A value cannot be represented in its declared type.
    #[error("cannot encode argument {index} as {ty}: {reason}")]
    Encoding {
        index: usize,
        ty: String,
        reason: String,
    },

    /// Call data selector matches no function of the interface.
    #[error("function selector {selector} not found in ABI")]
    SelectorNotFound { selector: Selector },

    /// Encoded data is truncated or points outside its buffer.
    #[error("decoding failed: {0}")]
    Decoding(String),

    /// Transaction history fetch failed. The transport error is logged, not exposed.
    #[error("Failed to fetch transaction logs.")]
    Provider,

    /// Malformed interface document.
    #[error("invalid ABI: {0}")]
    Abi(String),

    /// No dispatch table entry for the requested method.
    #[error("no matching function `{name}` in ABI")]
    FunctionNotFound { name: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// Failure reported by the typed-data signing primitive.
    #[error("signing error: {0}")]
    Signing(String),
}

pub type Result<T> = std::result::Result<T, Error>;
