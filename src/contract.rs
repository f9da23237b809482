use async_trait::async_trait;
use ethereum_types::H160;
use tracing::debug;

use crate::{
    abi::{Abi, Function},
    coerce::{coerce_values, parse_address},
    error::{Error, Result},
    params::DecodedParams,
    rpc::TransactionReceipt,
};

/// Executes read-only calls against a deployed contract.
#[async_trait]
pub trait CallTransport: Send + Sync {
    /// Runs `data` against `to` without creating a transaction and returns
    /// the raw return data.
    async fn call(&self, to: &H160, data: &[u8]) -> Result<Vec<u8>>;
}

/// Submits state-changing calls. Implementations own signing, broadcasting
/// and waiting for the transaction to be mined.
#[async_trait]
pub trait ConfirmingTransport: Send + Sync {
    async fn send_and_confirm(&self, to: &H160, data: &[u8]) -> Result<TransactionReceipt>;
}

/// A deployed contract: its address, its interface and a transport.
#[derive(Debug, Clone)]
pub struct Contract<T> {
    address: H160,
    abi: Abi,
    transport: T,
}

impl<T> Contract<T> {
    pub fn new(address: H160, abi: Abi, transport: T) -> Self {
        Self {
            address,
            abi,
            transport,
        }
    }

    /// Same as [`Contract::new`] with the address given as `0x` hex.
    pub fn at(address: &str, abi: Abi, transport: T) -> Result<Self> {
        Ok(Self::new(parse_address(address)?, abi, transport))
    }

    pub fn address(&self) -> &H160 {
        &self.address
    }

    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Selects `name(tys...)` from the interface.
    pub fn method<S: AsRef<str>>(&self, name: &str, tys: &[S]) -> Result<Method<'_, T>> {
        let function = self.abi.function(name, tys)?;

        Ok(Method {
            contract: self,
            function,
        })
    }
}

/// A contract function bound to its contract, ready to be invoked.
#[derive(Debug)]
pub struct Method<'a, T> {
    contract: &'a Contract<T>,
    function: &'a Function,
}

impl<'a, T> Method<'a, T> {
    pub fn function(&self) -> &'a Function {
        self.function
    }

    /// Call data for this function with `args`.
    pub fn encode(&self, args: &[serde_json::Value]) -> Result<Vec<u8>> {
        let values = coerce_values(&self.function.input_types(), args)?;

        self.function.encode_input(&values)
    }
}

impl<'a, T: CallTransport> Method<'a, T> {
    /// Reads through the transport and decodes the returned values. Only
    /// `view` and `pure` functions can be called.
    pub async fn call(&self, args: &[serde_json::Value]) -> Result<DecodedParams> {
        if !self.function.is_read_only() {
            return Err(Error::Argument(format!(
                "`{}` changes state and cannot be called, submit a transaction instead",
                self.function.signature()
            )));
        }

        let data = self.encode(args)?;

        debug!(method = %self.function.signature(), "calling contract");

        let out = self
            .contract
            .transport
            .call(&self.contract.address, &data)
            .await?;

        self.function.decode_output(&out)
    }
}

impl<'a, T: ConfirmingTransport> Method<'a, T> {
    /// Submits a transaction invoking this function and waits for its receipt.
    pub async fn transact(&self, args: &[serde_json::Value]) -> Result<TransactionReceipt> {
        let data = self.encode(args)?;

        debug!(method = %self.function.signature(), "submitting contract transaction");

        self.contract
            .transport
            .send_and_confirm(&self.contract.address, &data)
            .await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use ethereum_types::U256;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::values::Value;

    const TOKEN: &str = "0x1111111111111111111111111111111111111111";
    const RECIPIENT: &str = "0x0ae72a82621a5a7beac3e215c96642077643ef78";

    const ABI: &str = r#"[
        {
            "type": "function",
            "name": "balanceOf",
            "stateMutability": "view",
            "inputs": [{"name": "owner", "type": "address"}],
            "outputs": [{"name": "balance", "type": "uint256"}]
        },
        {
            "type": "function",
            "name": "transfer",
            "stateMutability": "nonpayable",
            "inputs": [
                {"name": "to", "type": "address"},
                {"name": "amount", "type": "uint256"}
            ],
            "outputs": [{"name": "", "type": "bool"}]
        }
    ]"#;

    #[derive(Debug, Default)]
    struct FakeTransport {
        sent: Mutex<Vec<(H160, Vec<u8>)>>,
        output: Vec<u8>,
    }

    impl FakeTransport {
        fn returning(output: Vec<u8>) -> Self {
            FakeTransport {
                sent: Mutex::new(vec![]),
                output,
            }
        }

        fn sent(&self) -> Vec<(H160, Vec<u8>)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CallTransport for FakeTransport {
        async fn call(&self, to: &H160, data: &[u8]) -> Result<Vec<u8>> {
            self.sent.lock().unwrap().push((*to, data.to_vec()));
            Ok(self.output.clone())
        }
    }

    #[async_trait]
    impl ConfirmingTransport for FakeTransport {
        async fn send_and_confirm(&self, to: &H160, data: &[u8]) -> Result<TransactionReceipt> {
            self.sent.lock().unwrap().push((*to, data.to_vec()));
            Ok(TransactionReceipt {
                transaction_hash: "0xabc".to_string(),
                block_number: Some("0x1".to_string()),
                gas_used: "0x5208".to_string(),
                status: Some("0x1".to_string()),
                contract_address: None,
            })
        }
    }

    fn contract(transport: FakeTransport) -> Contract<FakeTransport> {
        Contract::at(TOKEN, Abi::from_str(ABI).unwrap(), transport).unwrap()
    }

    #[tokio::test]
    async fn call_view_function() {
        let output = Value::encode(&[crate::Type::Uint(256)], &[Value::Uint(U256::from(42), 256)]).unwrap();
        let token = contract(FakeTransport::returning(output));

        let decoded = token
            .method("balanceOf", &["address"])
            .unwrap()
            .call(&[json!(RECIPIENT)])
            .await
            .unwrap();

        assert_eq!(decoded.get("balance"), Some(&Value::Uint(U256::from(42), 256)));

        let sent = token.transport().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, parse_address(TOKEN).unwrap());
        assert_eq!(
            hex::encode(&sent[0].1),
            "70a082310000000000000000000000000ae72a82621a5a7beac3e215c96642077643ef78"
        );
    }

    #[tokio::test]
    async fn transact_state_changing_function() {
        let token = contract(FakeTransport::default());

        let receipt = token
            .method("transfer", &["address", "uint256"])
            .unwrap()
            .transact(&[json!(RECIPIENT), json!("10000000000000000000")])
            .await
            .unwrap();

        assert!(receipt.succeeded());
        assert_eq!(
            hex::encode(&token.transport().sent()[0].1),
            "a9059cbb0000000000000000000000000ae72a82621a5a7beac3e215c96642077643ef780000000000000000000000000000000000000000000000008ac7230489e80000"
        );
    }

    #[tokio::test]
    async fn call_rejects_state_changing_function() {
        let token = contract(FakeTransport::default());

        assert_matches!(
            token
                .method("transfer", &["address", "uint256"])
                .unwrap()
                .call(&[json!(RECIPIENT), json!(1)])
                .await,
            Err(Error::Argument(msg)) if msg.contains("transfer(address,uint256)")
        );
        assert!(token.transport().sent().is_empty());
    }

    #[test]
    fn unknown_method() {
        let token = contract(FakeTransport::default());

        assert_matches!(
            token.method("mint", &["address", "uint256"]),
            Err(Error::FunctionNotFound { name }) if name == "mint(address,uint256)"
        );
        assert_matches!(
            token.method("transfer", &["address"]),
            Err(Error::FunctionNotFound { .. })
        );
    }

    #[tokio::test]
    async fn bad_arguments_are_not_sent() {
        let token = contract(FakeTransport::default());

        assert_matches!(
            token
                .method("balanceOf", &["address"])
                .unwrap()
                .call(&[json!("0x1234")])
                .await,
            Err(Error::Encoding { index: 0, .. })
        );
        assert_matches!(
            token
                .method("balanceOf", &["address"])
                .unwrap()
                .call(&[])
                .await,
            Err(Error::LengthMismatch { types: 1, values: 0 })
        );
        assert!(token.transport().sent().is_empty());
    }

    #[test]
    fn invalid_contract_address() {
        assert_matches!(
            Contract::at("0xzz", Abi::from_str(ABI).unwrap(), FakeTransport::default()),
            Err(Error::Argument(_))
        );
    }
}
