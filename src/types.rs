use std::{fmt, str::FromStr};

use serde::{de::Visitor, Deserialize, Deserializer};

use crate::error::Error;

/// ABI type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Uint(usize),
    Int(usize),
    Address,
    Bool,
    String,
    FixedBytes(usize),
    Bytes,
    FixedArray(Box<Type>, usize),
    Array(Box<Type>),
    Tuple(Vec<Type>),
}

/// Shape of a type descriptor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Elementary,
    Array,
    DynamicArray,
    Tuple,
}

impl Type {
    pub fn kind(&self) -> TypeKind {
        match self {
            Type::FixedArray(_, _) => TypeKind::Array,
            Type::Array(_) => TypeKind::DynamicArray,
            Type::Tuple(_) => TypeKind::Tuple,
            _ => TypeKind::Elementary,
        }
    }

    /// Whether values of this type live in the tail region of an encoding.
    pub fn is_dynamic(&self) -> bool {
        match self {
            Type::String | Type::Bytes | Type::Array(_) => true,
            Type::FixedArray(ty, _) => ty.is_dynamic(),
            Type::Tuple(tys) => tys.iter().any(Type::is_dynamic),
            _ => false,
        }
    }

    /// Number of bytes the type occupies in the head region of its enclosing
    /// encoding: one offset word for dynamic types, the inline size otherwise.
    ///
    /// `None` when the inline size does not fit in `usize`, which large
    /// nested fixed arrays such as `uint256[2**60][2]` can reach.
    pub fn head_size(&self) -> Option<usize> {
        if self.is_dynamic() {
            return Some(32);
        }

        match self {
            Type::FixedArray(ty, size) => ty.head_size()?.checked_mul(*size),
            Type::Tuple(tys) => tys
                .iter()
                .try_fold(0usize, |acc, ty| acc.checked_add(ty.head_size()?)),
            _ => Some(32),
        }
    }

    /// Parses a list of type strings, reporting the first one that fails.
    pub fn parse_list<S: AsRef<str>>(tys: &[S]) -> Result<Vec<Type>, Error> {
        tys.iter().map(|ty| ty.as_ref().parse()).collect()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Uint(size) => write!(f, "uint{}", size),
            Type::Int(size) => write!(f, "int{}", size),
            Type::Address => write!(f, "address"),
            Type::Bool => write!(f, "bool"),
            Type::String => write!(f, "string"),
            Type::FixedBytes(size) => write!(f, "bytes{}", size),
            Type::Bytes => write!(f, "bytes"),
            Type::FixedArray(ty, size) => write!(f, "{}[{}]", ty, size),
            Type::Array(ty) => write!(f, "{}[]", ty),
            Type::Tuple(tys) => {
                let tys = tys.iter().map(Type::to_string).collect::<Vec<_>>();

                write!(f, "({})", tys.join(","))
            }
        }
    }
}

impl FromStr for Type {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The grammar has no whitespace so it is stripped up front.
        let compact = s.chars().filter(|c| !c.is_whitespace()).collect::<String>();

        parsers::parse_exact_type(&compact)
            .map(|(_, ty)| ty)
            .map_err(|e| Error::Type {
                ty: s.to_string(),
                reason: e.to_string(),
            })
    }
}

impl<'de> Deserialize<'de> for Type {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(TypeVisitor)
    }
}

struct TypeVisitor;

impl<'de> Visitor<'de> for TypeVisitor {
    type Value = Type;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an ABI type")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.parse().map_err(E::custom)
    }
}

mod parsers {
    use nom::{
        branch::alt,
        bytes::complete::tag,
        character::complete::{char, digit1},
        combinator::{all_consuming, map_res, opt, verify},
        error::{Error, ErrorKind},
        multi::{many0, separated_list0},
        sequence::delimited,
        IResult,
    };

    use super::Type;

    pub fn parse_exact_type(input: &str) -> IResult<&str, Type> {
        all_consuming(parse_type)(input)
    }

    fn parse_type(input: &str) -> IResult<&str, Type> {
        let (i, ty) = alt((parse_tuple, parse_simple_type))(input)?;

        let (i, sizes) = many0(delimited(char('['), opt(parse_integer), char(']')))(i)?;

        let arr_ty = sizes.into_iter().fold(ty, |ty, size| match size {
            None => Type::Array(Box::new(ty)),
            Some(size) => Type::FixedArray(Box::new(ty), size),
        });

        Ok((i, arr_ty))
    }

    fn parse_simple_type(input: &str) -> IResult<&str, Type> {
        alt((
            parse_uint,
            parse_int,
            parse_bytes,
            parse_string,
            parse_address,
            parse_bool,
        ))(input)
    }

    fn parse_uint(input: &str) -> IResult<&str, Type> {
        parse_sized("uint", input).map(|(i, size)| (i, Type::Uint(size)))
    }

    fn parse_int(input: &str) -> IResult<&str, Type> {
        parse_sized("int", input).map(|(i, size)| (i, Type::Int(size)))
    }

    fn parse_address(input: &str) -> IResult<&str, Type> {
        tag("address")(input).map(|(i, _)| (i, Type::Address))
    }

    fn parse_bool(input: &str) -> IResult<&str, Type> {
        tag("bool")(input).map(|(i, _)| (i, Type::Bool))
    }

    fn parse_string(input: &str) -> IResult<&str, Type> {
        tag("string")(input).map(|(i, _)| (i, Type::String))
    }

    fn parse_bytes(input: &str) -> IResult<&str, Type> {
        let (i, _) = tag("bytes")(input)?;
        let (i, size) = opt(verify(parse_integer, check_fixed_bytes_size))(i)?;

        let ty = size.map_or(Type::Bytes, Type::FixedBytes);

        Ok((i, ty))
    }

    fn parse_tuple(input: &str) -> IResult<&str, Type> {
        delimited(char('('), separated_list0(char(','), parse_type), char(')'))(input)
            .map(|(i, tys)| (i, Type::Tuple(tys)))
    }

    // Bare `uint`/`int` are aliases for the 256-bit variants.
    fn parse_sized<'a>(t: &'static str, input: &'a str) -> IResult<&'a str, usize> {
        let (i, _) = tag(t)(input)?;
        let (i, size) = opt(parse_integer)(i)?;
        let size = size.unwrap_or(256);

        if !check_int_size(&size) {
            return Err(nom::Err::Error(Error::new(input, ErrorKind::Verify)));
        }

        Ok((i, size))
    }

    fn parse_integer(input: &str) -> IResult<&str, usize> {
        map_res(digit1, str::parse)(input)
    }

    fn check_int_size(i: &usize) -> bool {
        let i = *i;

        i > 0 && i <= 256 && i % 8 == 0
    }

    fn check_fixed_bytes_size(i: &usize) -> bool {
        let i = *i;

        i > 0 && i <= 32
    }

    #[cfg(test)]
    mod test {
        use super::super::Type;
        use super::*;

        #[test]
        fn parse_uint() {
            for i in (8..=256).step_by(8) {
                let s = format!("uint{}", i);

                assert_eq!(parse_exact_type(&s), Ok(("", Type::Uint(i))));
            }

            assert_eq!(parse_exact_type("uint"), Ok(("", Type::Uint(256))));
            assert!(parse_exact_type("uint7").is_err());
            assert!(parse_exact_type("uint264").is_err());
        }

        #[test]
        fn parse_int() {
            for i in (8..=256).step_by(8) {
                let s = format!("int{}", i);

                assert_eq!(parse_exact_type(&s), Ok(("", Type::Int(i))));
            }

            assert_eq!(parse_exact_type("int"), Ok(("", Type::Int(256))));
        }

        #[test]
        fn parse_bytes() {
            assert_eq!(parse_exact_type("bytes"), Ok(("", Type::Bytes)));

            for i in 1..=32 {
                let s = format!("bytes{}", i);

                assert_eq!(parse_exact_type(&s), Ok(("", Type::FixedBytes(i))));
            }

            assert!(parse_exact_type("bytes33").is_err());
            assert!(parse_exact_type("bytes0").is_err());
        }

        #[test]
        fn parse_array() {
            assert_eq!(
                parse_exact_type("uint256[]"),
                Ok(("", Type::Array(Box::new(Type::Uint(256)))))
            );

            // Nested arrays
            assert_eq!(
                parse_exact_type("address[][]"),
                Ok((
                    "",
                    Type::Array(Box::new(Type::Array(Box::new(Type::Address))))
                ))
            );

            // Mixed arrays
            assert_eq!(
                parse_exact_type("string[2][]"),
                Ok((
                    "",
                    Type::Array(Box::new(Type::FixedArray(Box::new(Type::String), 2)))
                ))
            );
            assert_eq!(
                parse_exact_type("string[][3]"),
                Ok((
                    "",
                    Type::FixedArray(Box::new(Type::Array(Box::new(Type::String))), 3)
                ))
            );
        }

        #[test]
        fn parse_tuple() {
            assert_eq!(
                parse_exact_type("(uint256,string,address[])"),
                Ok((
                    "",
                    Type::Tuple(vec![
                        Type::Uint(256),
                        Type::String,
                        Type::Array(Box::new(Type::Address))
                    ])
                ))
            );

            assert_eq!(parse_exact_type("()"), Ok(("", Type::Tuple(vec![]))));
        }

        #[test]
        fn parse_tuple_array() {
            assert_eq!(
                parse_exact_type("(address,(bool,bytes32))[]"),
                Ok((
                    "",
                    Type::Array(Box::new(Type::Tuple(vec![
                        Type::Address,
                        Type::Tuple(vec![Type::Bool, Type::FixedBytes(32)]),
                    ])))
                ))
            );
        }

        #[test]
        fn reject_garbage() {
            for s in &["", "uint256]", "(address", "address,", "addresss", "[]", "float"] {
                assert!(parse_exact_type(s).is_err(), "accepted `{}`", s);
            }
        }
    }
}
