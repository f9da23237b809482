use std::iter;

use ethereum_types::{H160, U256};

use crate::{
    error::{Error, Result},
    types::Type,
};

/// A typed ABI value.
///
/// Signed integers are stored as their 256-bit two's complement word.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Value {
    Uint(U256, usize),
    Int(U256, usize),
    Address(H160),
    Bool(bool),
    String(String),
    FixedBytes(Vec<u8>),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
}

impl Value {
    /// Head/tail encodes `values` as the arguments of a call with parameter
    /// types `tys`. The selector is not included.
    pub fn encode(tys: &[Type], values: &[Value]) -> Result<Vec<u8>> {
        if tys.len() != values.len() {
            return Err(Error::LengthMismatch {
                types: tys.len(),
                values: values.len(),
            });
        }

        // Encode arguments one by one first so a failure names its index.
        let encoded = tys
            .iter()
            .zip(values)
            .enumerate()
            .map(|(index, (ty, value))| {
                Self::encode_value(ty, value).map_err(|reason| Error::Encoding {
                    index,
                    ty: ty.to_string(),
                    reason,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::layout(tys.iter().zip(encoded).collect()).map_err(|(index, reason)| {
            Error::Encoding {
                index,
                ty: tys[index].to_string(),
                reason,
            }
        })
    }

    /// Places already encoded items into head and tail regions. Fails with
    /// the index of the item at which the head region stops fitting in
    /// `usize`.
    fn layout(items: Vec<(&Type, Vec<u8>)>) -> std::result::Result<Vec<u8>, (usize, String)> {
        let head_len = items
            .iter()
            .enumerate()
            .try_fold(0usize, |acc, (index, (ty, _))| {
                ty.head_size()
                    .and_then(|size| acc.checked_add(size))
                    .ok_or_else(|| (index, "head region size overflows usize".to_string()))
            })?;

        let mut head = Vec::with_capacity(head_len);
        let mut tail = vec![];

        for (ty, encoded) in items {
            if ty.is_dynamic() {
                head.extend_from_slice(&Self::usize_word(head_len + tail.len()));
                tail.extend(encoded);
            } else {
                head.extend(encoded);
            }
        }

        head.extend(tail);

        Ok(head)
    }

    fn encode_sequence<'a, I>(items: I) -> std::result::Result<Vec<u8>, String>
    where
        I: Iterator<Item = (&'a Type, &'a Value)>,
    {
        let encoded = items
            .map(|(ty, value)| Self::encode_value(ty, value).map(|bs| (ty, bs)))
            .collect::<std::result::Result<Vec<_>, String>>()?;

        Self::layout(encoded).map_err(|(_, reason)| reason)
    }

    fn encode_value(ty: &Type, value: &Value) -> std::result::Result<Vec<u8>, String> {
        match (ty, value) {
            (Type::Uint(size), Value::Uint(uint, _)) => {
                if uint.bits() > *size {
                    return Err(format!("{} overflows uint{}", uint, size));
                }

                Ok(Self::uint_word(uint).to_vec())
            }

            (Type::Int(size), Value::Int(int, _)) => {
                if !Self::fits_signed(int, *size) {
                    return Err(format!("value does not fit in int{}", size));
                }

                Ok(Self::uint_word(int).to_vec())
            }

            (Type::Address, Value::Address(addr)) => {
                let mut word = [0u8; 32];
                word[12..].copy_from_slice(addr.as_bytes());

                Ok(word.to_vec())
            }

            (Type::Bool, Value::Bool(b)) => {
                let mut word = [0u8; 32];
                word[31] = *b as u8;

                Ok(word.to_vec())
            }

            (Type::FixedBytes(size), Value::FixedBytes(bytes)) => {
                if bytes.len() != *size {
                    return Err(format!(
                        "expected {} bytes, got {}",
                        size,
                        bytes.len()
                    ));
                }

                Ok(Self::pad_right(bytes))
            }

            (Type::Bytes, Value::Bytes(bytes)) => Ok(Self::encode_packed_bytes(bytes)),

            (Type::String, Value::String(s)) => Ok(Self::encode_packed_bytes(s.as_bytes())),

            (Type::FixedArray(ty, size), Value::Array(values)) => {
                if values.len() != *size {
                    return Err(format!(
                        "expected {} elements, got {}",
                        size,
                        values.len()
                    ));
                }

                Self::encode_sequence(iter::repeat(ty.as_ref()).zip(values))
            }

            (Type::Array(ty), Value::Array(values)) => {
                let mut bs = Self::usize_word(values.len()).to_vec();
                bs.extend(Self::encode_sequence(iter::repeat(ty.as_ref()).zip(values))?);

                Ok(bs)
            }

            (Type::Tuple(tys), Value::Tuple(values)) => {
                if values.len() != tys.len() {
                    return Err(format!(
                        "expected {} tuple members, got {}",
                        tys.len(),
                        values.len()
                    ));
                }

                Self::encode_sequence(tys.iter().zip(values))
            }

            (ty, value) => Err(format!("{} value does not match type {}", value.kind_name(), ty)),
        }
    }

    // Length prefix followed by the zero padded payload.
    fn encode_packed_bytes(bytes: &[u8]) -> Vec<u8> {
        let mut bs = Self::usize_word(bytes.len()).to_vec();
        bs.extend(Self::pad_right(bytes));

        bs
    }

    fn pad_right(bytes: &[u8]) -> Vec<u8> {
        let mut bs = bytes.to_vec();
        bs.resize(Self::padded32_size(bytes.len()), 0);

        bs
    }

    fn uint_word(uint: &U256) -> [u8; 32] {
        let mut word = [0u8; 32];
        uint.to_big_endian(&mut word);

        word
    }

    fn usize_word(n: usize) -> [u8; 32] {
        Self::uint_word(&U256::from(n as u64))
    }

    // A two's complement word fits in `size` bits when every bit above the
    // sign bit equals the sign bit.
    fn fits_signed(int: &U256, size: usize) -> bool {
        if size >= 256 {
            return true;
        }

        let upper = *int >> (size - 1);

        upper.is_zero() || upper == (U256::MAX >> (size - 1))
    }

    /// Decodes head/tail encoded `bs` (no selector) as values of `tys`.
    pub fn decode_from_slice(bs: &[u8], tys: &[Type]) -> Result<Vec<Value>> {
        Self::decode_sequence(bs, tys.iter(), tys.len())
    }

    // Decodes `count` items laid out as a tuple starting at the first byte of
    // `bs`. Offsets found in head slots are relative to `bs`.
    fn decode_sequence<'a, I>(bs: &[u8], tys: I, count: usize) -> Result<Vec<Value>>
    where
        I: Iterator<Item = &'a Type>,
    {
        let mut values = Vec::with_capacity(count);
        let mut at = 0usize;

        for ty in tys {
            let region = if ty.is_dynamic() {
                let offset = Self::read_usize(bs, at)?;

                bs.get(offset..).ok_or_else(|| {
                    Error::Decoding(format!(
                        "offset {} at byte {} points outside {} bytes",
                        offset,
                        at,
                        bs.len()
                    ))
                })?
            } else {
                bs.get(at..).ok_or_else(|| {
                    Error::Decoding(format!("head slot at byte {} exceeds {} bytes", at, bs.len()))
                })?
            };

            values.push(Self::decode_value(region, ty)?);

            at = ty
                .head_size()
                .and_then(|size| at.checked_add(size))
                .ok_or_else(|| Error::Decoding(format!("head size of {} overflows usize", ty)))?;
        }

        Ok(values)
    }

    fn decode_value(bs: &[u8], ty: &Type) -> Result<Value> {
        let value = match ty {
            Type::Uint(size) => {
                let uint = U256::from_big_endian(Self::word(bs, 0)?);

                if uint.bits() > *size {
                    return Err(Error::Decoding(format!("{:#x} overflows uint{}", uint, size)));
                }

                Value::Uint(uint, *size)
            }

            Type::Int(size) => {
                let int = U256::from_big_endian(Self::word(bs, 0)?);

                if !Self::fits_signed(&int, *size) {
                    return Err(Error::Decoding(format!("{:#x} does not fit in int{}", int, size)));
                }

                Value::Int(int, *size)
            }

            Type::Address => Value::Address(H160::from_slice(&Self::word(bs, 0)?[12..])),

            Type::Bool => {
                let word = U256::from_big_endian(Self::word(bs, 0)?);

                if word.is_zero() {
                    Value::Bool(false)
                } else if word == U256::one() {
                    Value::Bool(true)
                } else {
                    return Err(Error::Decoding(format!("invalid bool word {:#x}", word)));
                }
            }

            Type::FixedBytes(size) => Value::FixedBytes(Self::word(bs, 0)?[..*size].to_vec()),

            Type::Bytes => Value::Bytes(Self::read_packed_bytes(bs)?.to_vec()),

            Type::String => {
                let bytes = Self::read_packed_bytes(bs)?.to_vec();
                let s = String::from_utf8(bytes).map_err(|e| Error::Decoding(e.to_string()))?;

                Value::String(s)
            }

            Type::FixedArray(ty, size) => {
                Self::check_array_fits(bs.len(), ty, *size)?;

                Value::Array(Self::decode_sequence(bs, iter::repeat(ty.as_ref()).take(*size), *size)?)
            }

            Type::Array(ty) => {
                let len = Self::read_usize(bs, 0)?;

                // elements start after the length word
                let bs = &bs[32..];
                Self::check_array_fits(bs.len(), ty, len)?;

                Value::Array(Self::decode_sequence(bs, iter::repeat(ty.as_ref()).take(len), len)?)
            }

            Type::Tuple(tys) => Value::Tuple(Self::decode_sequence(bs, tys.iter(), tys.len())?),
        };

        Ok(value)
    }

    fn read_packed_bytes(bs: &[u8]) -> Result<&[u8]> {
        let len = Self::read_usize(bs, 0)?;

        32usize
            .checked_add(len)
            .and_then(|end| bs.get(32..end))
            .ok_or_else(|| {
                Error::Decoding(format!(
                    "length {} exceeds the {} bytes available",
                    len,
                    bs.len().saturating_sub(32)
                ))
            })
    }

    // Rejects element counts the remaining input cannot possibly hold, before
    // anything is allocated for them.
    fn check_array_fits(available: usize, ty: &Type, len: usize) -> Result<()> {
        let needed = ty
            .head_size()
            .and_then(|size| len.checked_mul(size.max(1)));

        match needed {
            Some(needed) if needed <= available => Ok(()),
            _ => Err(Error::Decoding(format!(
                "array of {} {} elements exceeds the {} bytes available",
                len, ty, available
            ))),
        }
    }

    fn word(bs: &[u8], at: usize) -> Result<&[u8]> {
        at.checked_add(32)
            .and_then(|end| bs.get(at..end))
            .ok_or_else(|| {
                Error::Decoding(format!(
                    "word at byte {} exceeds {} bytes",
                    at,
                    bs.len()
                ))
            })
    }

    fn read_usize(bs: &[u8], at: usize) -> Result<usize> {
        let value = U256::from_big_endian(Self::word(bs, at)?);

        if value > U256::from(usize::MAX as u64) {
            return Err(Error::Decoding(format!(
                "offset or length {:#x} at byte {} is out of range",
                value, at
            )));
        }

        Ok(value.low_u64() as usize)
    }

    // Computes the padded size for a given size, e.g.:
    // padded32_size(20) == 32
    // padded32_size(32) == 32
    // padded32_size(40) == 64
    fn padded32_size(size: usize) -> usize {
        let r = size % 32;

        if r == 0 {
            size
        } else {
            size + 32 - r
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Value::Uint(_, _) => "uint",
            Value::Int(_, _) => "int",
            Value::Address(_) => "address",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::FixedBytes(_) => "fixed bytes",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Tuple(_) => "tuple",
        }
    }
}
