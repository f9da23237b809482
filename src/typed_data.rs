//! Structured (EIP-712) data payloads and the seam to whatever signs or
//! verifies them.
//!
//! Hashing and elliptic curve work belong to the signing primitive behind
//! [`TypedDataSigner`] and [`TypedDataVerifier`]. This module only checks
//! that a payload is well formed before handing it over.

use std::{collections::BTreeMap, fmt, str::FromStr};

use async_trait::async_trait;
use ethereum_types::H160;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    types::Type,
};

/// Signing domain. Every field is optional but at least one must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Domain {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

impl Eip712Domain {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Member of a struct type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
}

impl TypedField {
    pub fn new(name: impl Into<String>, type_: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_: type_.into(),
        }
    }
}

/// Payload in the `eth_signTypedData_v4` layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    pub domain: Option<Eip712Domain>,
    pub types: BTreeMap<String, Vec<TypedField>>,
    pub primary_type: String,
    pub message: serde_json::Value,
}

impl TypedData {
    /// Checks the payload shape: a non-empty domain, a declared primary type,
    /// members whose types are ABI types or declared struct names, and an
    /// object message.
    pub fn validate(&self) -> Result<()> {
        match &self.domain {
            Some(domain) if !domain.is_empty() => {}
            _ => return Err(Error::Argument("typed data has no domain".to_string())),
        }

        if !self.types.contains_key(&self.primary_type) {
            return Err(Error::Argument(format!(
                "primary type `{}` is not declared",
                self.primary_type
            )));
        }

        for (struct_name, fields) in &self.types {
            for field in fields {
                if !self.is_known_type(&field.type_) {
                    return Err(Error::Argument(format!(
                        "member `{}.{}` has unknown type `{}`",
                        struct_name, field.name, field.type_
                    )));
                }
            }
        }

        if !self.message.is_object() {
            return Err(Error::Argument("typed data message must be an object".to_string()));
        }

        Ok(())
    }

    fn is_known_type(&self, ty: &str) -> bool {
        // Struct references may carry array suffixes, e.g. `Person[]`.
        let base = ty.split('[').next().unwrap_or(ty);

        self.types.contains_key(base) || Type::from_str(ty).is_ok()
    }
}

/// 65 byte `r || s || v` signature.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub const LEN: usize = 65;

    pub fn from_slice(bs: &[u8]) -> Result<Self> {
        if bs.len() != Self::LEN {
            return Err(Error::Argument(format!(
                "signature must be {} bytes, got {}",
                Self::LEN,
                bs.len()
            )));
        }

        Ok(Self(bs.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

impl FromStr for Signature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bs = hex::decode(digits)
            .map_err(|e| Error::Argument(format!("invalid signature hex: {}", e)))?;

        Self::from_slice(&bs)
    }
}

/// Signs typed data, e.g. with a local key or a remote wallet.
#[async_trait]
pub trait TypedDataSigner: Send + Sync {
    async fn sign_typed_data(&self, data: &TypedData) -> Result<Vec<u8>>;
}

/// Recovers the address that produced a typed-data signature.
pub trait TypedDataVerifier {
    fn recover(&self, data: &TypedData, signature: &Signature) -> Result<H160>;
}

/// Validates `data` and has `signer` sign it.
pub async fn sign_typed_data<S>(signer: &S, data: &TypedData) -> Result<Signature>
where
    S: TypedDataSigner + ?Sized,
{
    data.validate()?;

    let bs = signer.sign_typed_data(data).await?;

    Signature::from_slice(&bs).map_err(|_| {
        Error::Signing(format!(
            "signer returned {} bytes instead of {}",
            bs.len(),
            Signature::LEN
        ))
    })
}

/// Validates `data` and `signature`, then recovers the signing address.
pub fn recover_signer<V>(verifier: &V, data: &TypedData, signature: &[u8]) -> Result<H160>
where
    V: TypedDataVerifier + ?Sized,
{
    data.validate()?;
    let signature = Signature::from_slice(signature)?;

    verifier.recover(data, &signature)
}
