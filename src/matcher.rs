use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    coerce::parse_address,
    error::{Error, Result},
    history::{NetworkId, TransactionHistory, TransactionRecord},
    selector::{encode_call, CallData},
};

/// Summary of the transaction whose input equals the expected call data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub hash: String,
    pub data: String,
    pub from: String,
    pub to: Option<String>,
    pub value: String,
    pub gas_limit: String,
    pub status: bool,
}

impl From<&TransactionRecord> for MatchResult {
    fn from(record: &TransactionRecord) -> Self {
        MatchResult {
            hash: record.hash.clone(),
            data: record.input.clone(),
            from: record.from.clone(),
            to: record.to.clone(),
            value: record.value.clone(),
            gas_limit: record.gas_limit.clone(),
            status: record.status_flag.as_deref() == Some("1"),
        }
    }
}

/// Finds the transaction that invoked a given method with given arguments.
pub struct CallMatcher<P> {
    provider: P,
}

impl<P: TransactionHistory> CallMatcher<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Rebuilds the call data for `method(tys...)` with `values` and returns
    /// the first transaction of `address`'s history, in provider order, whose
    /// input is exactly that call data.
    ///
    /// `Ok(None)` means nothing matched, which includes an empty history.
    pub async fn find_transaction<S: AsRef<str>>(
        &self,
        network: NetworkId,
        address: &str,
        method: &str,
        tys: &[S],
        values: &[serde_json::Value],
    ) -> Result<Option<MatchResult>> {
        let address = parse_address(address)?;

        let expected = encode_call(method, tys, values).map_err(|e| match e {
            Error::LengthMismatch { types, values } => Error::Argument(format!(
                "parameter types and values must have the same length ({} != {})",
                types, values
            )),
            e => e,
        })?;

        let records = self.provider.fetch(network, &address).await.map_err(|e| {
            warn!(error = %e, network, "transaction history fetch failed");
            Error::Provider
        })?;

        let found = Self::find_in(&records, &expected).map(MatchResult::from);

        match &found {
            Some(m) => debug!(hash = %m.hash, records = records.len(), "matched transaction"),
            None => debug!(records = records.len(), "no matching transaction"),
        }

        Ok(found)
    }

    /// First record whose input string equals the `0x` lowercase hex
    /// rendering of `expected`, byte for byte.
    pub fn find_in<'a>(
        records: &'a [TransactionRecord],
        expected: &CallData,
    ) -> Option<&'a TransactionRecord> {
        let expected = expected.to_hex();

        records.iter().find(|record| record.input == expected)
    }
}
