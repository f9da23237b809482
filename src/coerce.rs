use ethereum_types::{H160, U256};
use serde_json::Value as JsonValue;

use crate::{
    error::{Error, Result},
    selector::keccak256,
    types::Type,
    values::Value,
};

/// Converts untyped argument values into typed [`Value`]s for `tys`.
///
/// Numbers may be JSON numbers, decimal strings or `0x` hex strings, signed
/// integers accept a leading `-`. Addresses are `0x` hex and, when written in
/// mixed case, must carry a valid EIP-55 checksum. Byte strings are hex.
/// Arrays and tuples are JSON arrays.
pub fn coerce_values(tys: &[Type], raw: &[JsonValue]) -> Result<Vec<Value>> {
    if tys.len() != raw.len() {
        return Err(Error::LengthMismatch {
            types: tys.len(),
            values: raw.len(),
        });
    }

    tys.iter()
        .zip(raw)
        .enumerate()
        .map(|(index, (ty, raw))| {
            coerce(ty, raw).map_err(|reason| Error::Encoding {
                index,
                ty: ty.to_string(),
                reason,
            })
        })
        .collect()
}

fn coerce(ty: &Type, raw: &JsonValue) -> std::result::Result<Value, String> {
    match ty {
        Type::Uint(size) => {
            let uint = match raw {
                JsonValue::Number(n) => n
                    .as_u64()
                    .map(U256::from)
                    .ok_or_else(|| format!("{} is not an unsigned integer", n))?,
                JsonValue::String(s) => parse_unsigned(s)?,
                _ => return Err(unexpected("a number", raw)),
            };

            if uint.bits() > *size {
                return Err(format!("{} overflows uint{}", uint, size));
            }

            Ok(Value::Uint(uint, *size))
        }

        Type::Int(size) => {
            let (negative, magnitude) = match raw {
                JsonValue::Number(n) => {
                    if let Some(u) = n.as_u64() {
                        (false, U256::from(u))
                    } else if let Some(i) = n.as_i64() {
                        (i < 0, U256::from(i.unsigned_abs()))
                    } else {
                        return Err(format!("{} is not an integer", n));
                    }
                }
                JsonValue::String(s) => match s.trim().strip_prefix('-') {
                    Some(digits) => (true, parse_unsigned(digits)?),
                    None => (false, parse_unsigned(s)?),
                },
                _ => return Err(unexpected("a number", raw)),
            };

            // int<N> holds [-2^(N-1), 2^(N-1) - 1]
            let limit = U256::one() << (*size - 1);
            let out_of_range = if negative {
                magnitude > limit
            } else {
                magnitude >= limit
            };
            if out_of_range {
                return Err(format!("value does not fit in int{}", size));
            }

            let int = if negative {
                (!magnitude).overflowing_add(U256::one()).0
            } else {
                magnitude
            };

            Ok(Value::Int(int, *size))
        }

        Type::Address => match raw {
            JsonValue::String(s) => parse_address(s)
                .map(Value::Address)
                .map_err(|e| e.to_string()),
            _ => Err(unexpected("an address string", raw)),
        },

        Type::Bool => match raw {
            JsonValue::Bool(b) => Ok(Value::Bool(*b)),
            JsonValue::String(s) if s == "true" => Ok(Value::Bool(true)),
            JsonValue::String(s) if s == "false" => Ok(Value::Bool(false)),
            _ => Err(unexpected("a boolean", raw)),
        },

        Type::String => match raw {
            JsonValue::String(s) => Ok(Value::String(s.clone())),
            _ => Err(unexpected("a string", raw)),
        },

        Type::Bytes => parse_hex_bytes(raw).map(Value::Bytes),

        Type::FixedBytes(size) => {
            let bytes = parse_hex_bytes(raw)?;

            if bytes.len() != *size {
                return Err(format!("expected {} bytes, got {}", size, bytes.len()));
            }

            Ok(Value::FixedBytes(bytes))
        }

        Type::FixedArray(ty, size) => {
            let items = as_array(raw)?;

            if items.len() != *size {
                return Err(format!("expected {} elements, got {}", size, items.len()));
            }

            coerce_all(ty, items).map(Value::Array)
        }

        Type::Array(ty) => coerce_all(ty, as_array(raw)?).map(Value::Array),

        Type::Tuple(tys) => {
            let items = as_array(raw)?;

            if items.len() != tys.len() {
                return Err(format!(
                    "expected {} tuple members, got {}",
                    tys.len(),
                    items.len()
                ));
            }

            tys.iter()
                .zip(items)
                .map(|(ty, raw)| coerce(ty, raw))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::Tuple)
        }
    }
}

fn coerce_all(ty: &Type, items: &[JsonValue]) -> std::result::Result<Vec<Value>, String> {
    items.iter().map(|raw| coerce(ty, raw)).collect()
}

fn as_array(raw: &JsonValue) -> std::result::Result<&Vec<JsonValue>, String> {
    raw.as_array().ok_or_else(|| unexpected("an array", raw))
}

fn unexpected(expected: &str, raw: &JsonValue) -> String {
    format!("expected {}, got {}", expected, raw)
}

fn parse_unsigned(s: &str) -> std::result::Result<U256, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty number".to_string());
    }

    match s.strip_prefix("0x") {
        Some(digits) if !digits.is_empty() => U256::from_str_radix(digits, 16)
            .map_err(|e| format!("invalid hex number `{}`: {:?}", s, e)),
        Some(_) => Err("empty hex number".to_string()),
        None => {
            U256::from_dec_str(s).map_err(|e| format!("invalid number `{}`: {:?}", s, e))
        }
    }
}

fn parse_hex_bytes(raw: &JsonValue) -> std::result::Result<Vec<u8>, String> {
    let s = raw.as_str().ok_or_else(|| unexpected("a hex string", raw))?;
    let digits = s.strip_prefix("0x").unwrap_or(s);

    hex::decode(digits).map_err(|e| format!("invalid hex `{}`: {}", s, e))
}

/// Parses a `0x` prefixed 20-byte address.
///
/// All-lowercase and all-uppercase forms are accepted as is. Mixed case is
/// treated as an EIP-55 checksum and rejected when it does not verify.
pub fn parse_address(s: &str) -> Result<H160> {
    let invalid = |reason: &str| Error::Argument(format!("invalid address `{}`: {}", s, reason));

    let digits = s.strip_prefix("0x").ok_or_else(|| invalid("missing 0x prefix"))?;
    if digits.len() != 40 {
        return Err(invalid("expected 20 bytes"));
    }

    let mut addr = [0u8; 20];
    hex::decode_to_slice(digits, &mut addr).map_err(|e| invalid(&e.to_string()))?;
    let addr = H160::from(addr);

    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && checksum_address(&addr) != s {
        return Err(invalid("bad checksum"));
    }

    Ok(addr)
}

/// EIP-55 mixed-case rendering of an address.
pub fn checksum_address(addr: &H160) -> String {
    let lower = hex::encode(addr.as_bytes());
    let hash = keccak256(lower.as_bytes());

    let checksummed: String = lower
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;

            if c.is_ascii_alphabetic() && nibble >= 8 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect();

    format!("0x{}", checksummed)
}
