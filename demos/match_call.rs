//! Looks for the transaction that called `transfer(to, amount)` on a token.
//!
//! Needs `MORALIS_API_KEY`. Usage:
//!
//! ```sh
//! cargo run --example match_call -- <token> <to> <amount>
//! ```

use anyhow::{bail, Result};
use ethereum_calldata::{CallMatcher, HistoryConfig, MoralisClient};
use serde_json::json;
use tracing_subscriber::EnvFilter;

// BSC testnet
const NETWORK: u64 = 97;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let (token, to, amount) = match args.as_slice() {
        [token, to, amount] => (token, to, amount),
        _ => bail!("usage: match_call <token> <to> <amount>"),
    };

    let matcher = CallMatcher::new(MoralisClient::new(HistoryConfig::from_env()?)?);

    let found = matcher
        .find_transaction(
            NETWORK,
            token,
            "transfer",
            &["address", "uint256"],
            &[json!(to), json!(amount)],
        )
        .await?;

    match found {
        Some(tx) => println!("{}", serde_json::to_string_pretty(&tx)?),
        None => println!("no matching transaction"),
    }

    Ok(())
}
