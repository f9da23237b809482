use std::collections::HashMap;

use serde::{de::Visitor, Deserialize};

use crate::{
    error::{Error, Result},
    params::{DecodedParams, Param},
    selector::{canonical_signature, Selector},
    types::Type,
    values::Value,
};

/// Contract interface: its functions plus a selector dispatch table built
/// once when the document is loaded.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Abi {
    functions: Vec<Function>,
    by_selector: HashMap<Selector, usize>,
}

impl Abi {
    pub fn new(functions: Vec<Function>) -> Abi {
        let mut by_selector = HashMap::with_capacity(functions.len());

        // The first declaration wins when two entries share a selector.
        for (i, f) in functions.iter().enumerate() {
            by_selector.entry(f.selector()).or_insert(i);
        }

        Abi {
            functions,
            by_selector,
        }
    }

    pub fn from_str(s: &str) -> Result<Abi> {
        serde_json::from_str(s).map_err(|e| Error::Abi(e.to_string()))
    }

    pub fn from_reader<R>(rdr: R) -> Result<Abi>
    where
        R: std::io::Read,
    {
        serde_json::from_reader(rdr).map_err(|e| Error::Abi(e.to_string()))
    }

    /// Functions in declaration order.
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Exact lookup over all four selector bytes.
    pub fn function_by_selector(&self, selector: &Selector) -> Option<&Function> {
        self.by_selector
            .get(selector)
            .and_then(|&i| self.functions.get(i))
    }

    /// Looks a function up by name and input types, which tells overloads apart.
    pub fn function<S: AsRef<str>>(&self, name: &str, tys: &[S]) -> Result<&Function> {
        let tys = Type::parse_list(tys)?;
        let signature = canonical_signature(name, &tys);

        // A selector shared with another declaration resolves to the first
        // one, which then fails the name check.
        self.function_by_selector(&Selector::from_signature(&signature))
            .filter(|f| f.name == name && f.input_types() == tys)
            .ok_or(Error::FunctionNotFound { name: signature })
    }

    /// Resolves the function called by `input` from its selector and decodes
    /// the arguments.
    pub fn decode_input_from_slice(&self, input: &[u8]) -> Result<(&Function, DecodedParams)> {
        let selector = Selector::from_calldata(input)?;

        let f = self
            .function_by_selector(&selector)
            .ok_or(Error::SelectorNotFound { selector })?;

        let decoded = f.decode_input(&input[4..])?;

        Ok((f, decoded))
    }

    /// Same as [`Abi::decode_input_from_slice`] for hex input, `0x` optional.
    pub fn decode_input_from_hex(&self, input: &str) -> Result<(&Function, DecodedParams)> {
        let input = input.trim();
        let digits = input.strip_prefix("0x").unwrap_or(input);

        let bytes = hex::decode(digits)
            .map_err(|e| Error::Decoding(format!("invalid call data hex: {}", e)))?;

        self.decode_input_from_slice(&bytes)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AbiEntry {
    #[serde(rename = "type")]
    type_: Option<String>,
    name: Option<String>,
    inputs: Option<Vec<Param>>,
    outputs: Option<Vec<Param>>,
    state_mutability: Option<StateMutability>,
    constant: Option<bool>,
    payable: Option<bool>,
}

/// Contract function definition.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Function {
    pub name: String,
    pub inputs: Vec<Param>,
    pub outputs: Vec<Param>,
    pub state_mutability: StateMutability,
}

impl Function {
    pub fn selector(&self) -> Selector {
        Selector::from_signature(&self.signature())
    }

    pub fn signature(&self) -> String {
        canonical_signature(&self.name, &self.input_types())
    }

    pub fn input_types(&self) -> Vec<Type> {
        self.inputs.iter().map(|p| p.type_.clone()).collect()
    }

    pub fn output_types(&self) -> Vec<Type> {
        self.outputs.iter().map(|p| p.type_.clone()).collect()
    }

    /// Whether calling the function leaves chain state untouched.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self.state_mutability,
            StateMutability::View | StateMutability::Pure
        )
    }

    /// Selector followed by the encoded arguments.
    pub fn encode_input(&self, values: &[Value]) -> Result<Vec<u8>> {
        let mut bs = self.selector().0.to_vec();
        bs.extend(Value::encode(&self.input_types(), values)?);

        Ok(bs)
    }

    /// Decodes arguments that follow the selector.
    pub fn decode_input(&self, bs: &[u8]) -> Result<DecodedParams> {
        Self::decode_params(&self.inputs, bs)
    }

    /// Decodes the data returned by a call to this function.
    pub fn decode_output(&self, bs: &[u8]) -> Result<DecodedParams> {
        Self::decode_params(&self.outputs, bs)
    }

    fn decode_params(params: &[Param], bs: &[u8]) -> Result<DecodedParams> {
        let tys = params.iter().map(|p| p.type_.clone()).collect::<Vec<_>>();
        let values = Value::decode_from_slice(bs, &tys)?;

        Ok(DecodedParams::from(
            params.iter().cloned().zip(values).collect::<Vec<_>>(),
        ))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    Payable,
    NonPayable,
    View,
    Pure,
}

impl<'de> Deserialize<'de> for Abi {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(AbiVisitor)
    }
}

struct AbiVisitor;

impl<'de> Visitor<'de> for AbiVisitor {
    type Value = Abi;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "ABI")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let mut functions = vec![];

        while let Some(entry) = seq.next_element::<AbiEntry>()? {
            // Old compilers omit `type` on functions.
            match entry.type_.as_deref().unwrap_or("function") {
                "constructor" | "event" | "error" | "receive" | "fallback" => {}

                "function" => {
                    let name = entry.name.ok_or_else(|| {
                        serde::de::Error::custom("missing function name".to_string())
                    })?;

                    // Pre-0.6 documents describe mutability with flags.
                    let state_mutability = match entry.state_mutability {
                        Some(sm) => sm,
                        None if entry.constant.unwrap_or(false) => StateMutability::View,
                        None if entry.payable.unwrap_or(false) => StateMutability::Payable,
                        None => StateMutability::NonPayable,
                    };

                    functions.push(Function {
                        name,
                        inputs: entry.inputs.unwrap_or_default(),
                        outputs: entry.outputs.unwrap_or_default(),
                        state_mutability,
                    });
                }

                other => {
                    return Err(serde::de::Error::custom(format!(
                        "invalid ABI entry type: {}",
                        other
                    )))
                }
            }
        }

        Ok(Abi::new(functions))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use assert_matches::assert_matches;
    use ethereum_types::{H160, U256};
    use pretty_assertions::assert_eq;

    const TOKEN_ABI: &str = r#"[
        {"inputs":[{"internalType":"string","name":"name_","type":"string"}],"stateMutability":"nonpayable","type":"constructor"},
        {"anonymous":false,"inputs":[{"indexed":true,"internalType":"address","name":"from","type":"address"},{"indexed":true,"internalType":"address","name":"to","type":"address"},{"indexed":false,"internalType":"uint256","name":"value","type":"uint256"}],"name":"Transfer","type":"event"},
        {"inputs":[{"internalType":"address","name":"account","type":"address"}],"name":"balanceOf","outputs":[{"internalType":"uint256","name":"","type":"uint256"}],"stateMutability":"view","type":"function"},
        {"inputs":[{"internalType":"address","name":"to","type":"address"},{"internalType":"uint256","name":"value","type":"uint256"}],"name":"transfer","outputs":[{"internalType":"bool","name":"","type":"bool"}],"stateMutability":"nonpayable","type":"function"},
        {"inputs":[{"internalType":"address","name":"to","type":"address"},{"internalType":"uint256","name":"value","type":"uint256"},{"internalType":"bytes","name":"data","type":"bytes"}],"name":"transfer","outputs":[],"stateMutability":"nonpayable","type":"function"},
        {"inputs":[{"components":[{"internalType":"address","name":"to","type":"address"},{"internalType":"uint256","name":"amount","type":"uint256"}],"internalType":"struct Token.Payout[]","name":"payouts","type":"tuple[]"}],"name":"batchPay","outputs":[],"stateMutability":"payable","type":"function"},
        {"stateMutability":"payable","type":"receive"}
    ]"#;

    fn token_abi() -> Abi {
        Abi::from_str(TOKEN_ABI).unwrap()
    }

    fn test_function() -> Function {
        Function {
            name: "funname".to_string(),
            inputs: vec![
                Param::new("", Type::Address),
                Param::new("x", Type::FixedArray(Box::new(Type::Uint(56)), 5)),
            ],
            outputs: vec![],
            state_mutability: StateMutability::Pure,
        }
    }

    #[test]
    fn function_signature() {
        let fun = test_function();
        assert_eq!(fun.signature(), "funname(address,uint56[5])");
    }

    #[test]
    fn function_selector() {
        let fun = test_function();
        assert_eq!(fun.selector(), Selector([0xab, 0xa0, 0xe6, 0x3a]));
    }

    #[test]
    fn parses_functions_only() {
        let abi = token_abi();

        let names = abi.functions().iter().map(|f| f.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["balanceOf", "transfer", "transfer", "batchPay"]);

        assert_eq!(
            abi.functions()[3].signature(),
            "batchPay((address,uint256)[])"
        );
        assert_eq!(abi.functions()[3].state_mutability, StateMutability::Payable);
        assert!(abi.functions()[0].is_read_only());
        assert!(!abi.functions()[1].is_read_only());
    }

    #[test]
    fn legacy_mutability_flags() {
        let abi = Abi::from_str(
            r#"[{"constant":true,"inputs":[],"name":"totalSupply","outputs":[{"name":"","type":"uint256"}],"payable":false,"type":"function"}]"#,
        )
        .unwrap();

        assert_eq!(abi.functions()[0].state_mutability, StateMutability::View);
    }

    #[test]
    fn rejects_unknown_entries() {
        assert_matches!(
            Abi::from_str(r#"[{"type":"modifier","name":"x"}]"#),
            Err(Error::Abi(_))
        );
        assert_matches!(Abi::from_str("{}"), Err(Error::Abi(_)));
    }

    #[test]
    fn dispatch_by_selector() {
        let abi = token_abi();

        let transfer = abi
            .function_by_selector(&"0xa9059cbb".parse().unwrap())
            .unwrap();
        assert_eq!(transfer.signature(), "transfer(address,uint256)");

        assert!(abi
            .function_by_selector(&"0xa9059cbc".parse().unwrap())
            .is_none());
    }

    #[test]
    fn overloads_by_types() {
        let abi = token_abi();

        let f = abi.function("transfer", &["address", "uint256", "bytes"]).unwrap();
        assert_eq!(f.signature(), "transfer(address,uint256,bytes)");

        assert_matches!(
            abi.function("transfer", &["address"]),
            Err(Error::FunctionNotFound { name }) if name == "transfer(address)"
        );
    }

    #[test]
    fn decode_transfer_input() {
        let abi = token_abi();
        let input = "0xa9059cbb0000000000000000000000000ae72a82621a5a7beac3e215c96642077643ef780000000000000000000000000000000000000000000000008ac7230489e80000";

        let (f, decoded) = abi.decode_input_from_hex(input).unwrap();

        assert_eq!(f.name, "transfer");
        assert_eq!(
            decoded.into_values(),
            vec![
                Value::Address(H160::from_slice(
                    &hex::decode("0ae72a82621a5a7beac3e215c96642077643ef78").unwrap()
                )),
                Value::Uint(U256::exp10(19), 256),
            ]
        );
    }

    #[test]
    fn encode_then_decode_through_function() {
        let abi = token_abi();
        let f = abi.function("batchPay", &["(address,uint256)[]"]).unwrap();

        let payouts = Value::Array(vec![
            Value::Tuple(vec![
                Value::Address(H160::from_low_u64_be(1)),
                Value::Uint(U256::from(10), 256),
            ]),
            Value::Tuple(vec![
                Value::Address(H160::from_low_u64_be(2)),
                Value::Uint(U256::from(20), 256),
            ]),
        ]);

        let input = f.encode_input(&[payouts.clone()]).unwrap();
        let (decoded_f, decoded) = abi.decode_input_from_slice(&input).unwrap();

        assert_eq!(decoded_f, f);
        assert_eq!(decoded.get("payouts"), Some(&payouts));
    }

    #[test]
    fn unknown_selector() {
        let abi = token_abi();
        let input = "0xff42c81200000000000000000000000000000000000000000000000000000000000000c0";

        assert_matches!(
            abi.decode_input_from_hex(input),
            Err(Error::SelectorNotFound { selector }) if selector.to_string() == "0xff42c812"
        );
    }

    #[test]
    fn short_input() {
        let abi = token_abi();

        assert_matches!(abi.decode_input_from_hex("0xa905"), Err(Error::Decoding(_)));
        assert_matches!(abi.decode_input_from_hex("0xzz"), Err(Error::Decoding(_)));
        assert_matches!(
            abi.decode_input_from_hex("0xa9059cbb00"),
            Err(Error::Decoding(_))
        );
    }

    #[test]
    fn dispatch_table_covers_every_function() {
        let abi = token_abi();

        for f in abi.functions() {
            assert_eq!(abi.function_by_selector(&f.selector()), Some(f));
            assert_eq!(
                abi.function(&f.name, &f.input_types().iter().map(Type::to_string).collect::<Vec<_>>())
                    .unwrap(),
                f
            );
        }

        // aliases resolve to the canonical entry
        let f = abi.function("transfer", &["address", "uint"]).unwrap();
        assert_eq!(f.signature(), "transfer(address,uint256)");

        assert_matches!(abi.function("transfer", &["addr"]), Err(Error::Type { .. }));
    }

    #[test]
    fn decode_oversized_fixed_array() {
        let abi = Abi::from_str(
            r#"[{"type":"function","name":"f","stateMutability":"pure","inputs":[{"name":"x","type":"uint256[999999999999999999][2]"}],"outputs":[]}]"#,
        )
        .unwrap();

        let mut input = abi.functions()[0].selector().0.to_vec();
        input.extend_from_slice(&[0u8; 64]);

        assert_matches!(abi.decode_input_from_slice(&input), Err(Error::Decoding(_)));
    }

    #[test]
    fn decode_output() {
        let abi = token_abi();
        let f = abi.function("balanceOf", &["address"]).unwrap();

        let mut bs = [0u8; 32];
        bs[31] = 42;

        assert_eq!(
            f.decode_output(&bs).unwrap().into_values(),
            vec![Value::Uint(U256::from(42), 256)]
        );
    }
}
