use std::{fmt, str::FromStr, sync::OnceLock};

use regex::Regex;

use crate::{
    coerce::coerce_values,
    error::{Error, Result},
    types::Type,
    values::Value,
};

// Solidity identifier.
const METHOD_NAME_PATTERN: &str = r"^[A-Za-z_$][A-Za-z0-9_$]*$";

/// First four bytes of the keccak-256 hash of a canonical function signature.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Selector(pub [u8; 4]);

impl Selector {
    /// Hashes a signature string as given, without normalizing it.
    pub fn from_signature(signature: &str) -> Selector {
        let hash = keccak256(signature.as_bytes());

        let mut sel = [0u8; 4];
        sel.copy_from_slice(&hash[0..4]);

        Selector(sel)
    }

    /// Reads the selector from the first four bytes of call data.
    pub fn from_calldata(calldata: &[u8]) -> Result<Selector> {
        let head = calldata.get(0..4).ok_or_else(|| {
            Error::Decoding(format!(
                "call data is {} bytes, a selector needs 4",
                calldata.len()
            ))
        })?;

        let mut sel = [0u8; 4];
        sel.copy_from_slice(head);

        Ok(Selector(sel))
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Selector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);

        let mut sel = [0u8; 4];
        hex::decode_to_slice(digits, &mut sel)
            .map_err(|e| Error::Argument(format!("invalid selector `{}`: {}", s, e)))?;

        Ok(Selector(sel))
    }
}

pub(crate) fn keccak256(bytes: &[u8]) -> [u8; 32] {
    use tiny_keccak::{Hasher, Keccak};

    let mut keccak_out = [0u8; 32];
    let mut hasher = Keccak::v256();
    hasher.update(bytes);
    hasher.finalize(&mut keccak_out);

    keccak_out
}

/// Builds the canonical `name(type1,type2,...)` signature.
///
/// Type strings are parsed and re-rendered, so `uint` becomes `uint256` and
/// whitespace is dropped.
pub fn signature<S: AsRef<str>>(name: &str, tys: &[S]) -> Result<String> {
    check_method_name(name)?;

    let tys = Type::parse_list(tys)?;

    Ok(canonical_signature(name, &tys))
}

pub(crate) fn canonical_signature(name: &str, tys: &[Type]) -> String {
    format!(
        "{}({})",
        name,
        tys.iter()
            .map(Type::to_string)
            .collect::<Vec<_>>()
            .join(",")
    )
}

/// Selector for a method name and its parameter types.
pub fn selector<S: AsRef<str>>(name: &str, tys: &[S]) -> Result<Selector> {
    signature(name, tys).map(|sig| Selector::from_signature(&sig))
}

/// Selector for a complete signature string such as `transfer(address,uint256)`.
pub fn generate_function_selector(signature: &str) -> Result<Selector> {
    if signature.trim().is_empty() {
        return Err(Error::Argument("invalid function signature provided".to_string()));
    }

    Ok(Selector::from_signature(signature))
}

fn method_name_regex() -> &'static Regex {
    static METHOD_NAME: OnceLock<Regex> = OnceLock::new();

    // The pattern is a literal, so compiling it cannot fail at run time.
    METHOD_NAME.get_or_init(|| Regex::new(METHOD_NAME_PATTERN).expect("valid method name pattern"))
}

fn check_method_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Argument("method name is empty".to_string()));
    }

    if !method_name_regex().is_match(name) {
        return Err(Error::Argument(format!("invalid method name `{}`", name)));
    }

    Ok(())
}

/// Selector followed by the head/tail encoded arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallData {
    pub selector: Selector,
    pub args: Vec<u8>,
}

impl CallData {
    pub fn new(selector: Selector, args: Vec<u8>) -> Self {
        CallData { selector, args }
    }

    pub fn len(&self) -> usize {
        4 + self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut bs = Vec::with_capacity(self.len());
        bs.extend_from_slice(&self.selector.0);
        bs.extend_from_slice(&self.args);

        bs
    }

    /// Lowercase hex with a `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_vec()))
    }
}

/// Builds the call data a contract would receive for `name(tys...)` called
/// with `values`.
pub fn encode_call<S: AsRef<str>>(
    name: &str,
    tys: &[S],
    values: &[serde_json::Value],
) -> Result<CallData> {
    check_method_name(name)?;
    let tys = Type::parse_list(tys)?;
    let selector = Selector::from_signature(&canonical_signature(name, &tys));

    let values = coerce_values(&tys, values)?;
    let args = Value::encode(&tys, &values)?;

    Ok(CallData::new(selector, args))
}
