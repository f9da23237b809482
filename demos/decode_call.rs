use anyhow::Result;
use ethereum_calldata::{encode_call, Abi};
use serde_json::json;

const FACTORY_ABI: &str = r#"[
    {
        "type": "function",
        "name": "createPool",
        "stateMutability": "nonpayable",
        "inputs": [
            {"internalType": "address", "name": "tokenA", "type": "address"},
            {"internalType": "address", "name": "tokenB", "type": "address"},
            {"internalType": "uint24", "name": "fee", "type": "uint24"}
        ],
        "outputs": [{"internalType": "address", "name": "pool", "type": "address"}]
    },
    {
        "type": "event",
        "name": "OwnerChanged",
        "anonymous": false,
        "inputs": [
            {"indexed": true, "name": "oldOwner", "type": "address"},
            {"indexed": true, "name": "newOwner", "type": "address"}
        ]
    }
]"#;

fn main() -> Result<()> {
    let abi = Abi::from_str(FACTORY_ABI)?;

    // Decode contract input
    // From: https://etherscan.io/tx/0x535e880ab0d966fbc7a354c322046fe6f01581e94b0d9b76a12683feefb98481
    let encoded_input = "a1671295000000000000000000000000a0b211418d87c9f5918e6213fec3b13290aa5f26000000000000000000000000c02aaa39b223fe8d0a0e5c4f27ead9083c756cc20000000000000000000000000000000000000000000000000000000000000bb8";
    let (func, decoded_input) = abi.decode_input_from_hex(encoded_input)?;

    println!("function called: {}", func.signature());
    for (param, value) in decoded_input.iter() {
        println!("  {} = {:?}", param.name, value);
    }

    // Build the same call from untyped arguments
    let call = encode_call(
        "createPool",
        &["address", "address", "uint24"],
        &[
            json!("0xa0b211418d87c9f5918e6213fec3b13290aa5f26"),
            json!("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"),
            json!(3000),
        ],
    )?;

    println!("re-encoded matches: {}", call.to_hex().trim_start_matches("0x") == encoded_input);

    Ok(())
}
