use crate::client::ChainClient;
use anyhow::{Context, Result};
use ethers::abi::{Abi, Detokenize, Tokenize};
use ethers::contract::BaseContract;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, U256};

const ERC20_ABI: &str = r#"[
    {"constant":true,"inputs":[{"name":"_owner","type":"address"}],"name":"balanceOf","outputs":[{"name":"balance","type":"uint256"}],"type":"function"},
    {"constant":true,"inputs":[],"name":"decimals","outputs":[{"name":"","type":"uint8"}],"type":"function"},
    {"constant":true,"inputs":[],"name":"symbol","outputs":[{"name":"","type":"string"}],"type":"function"},
    {"constant":true,"inputs":[{"name":"_owner","type":"address"},{"name":"_spender","type":"address"}],"name":"allowance","outputs":[{"name":"","type":"uint256"}],"type":"function"},
    {"constant":false,"inputs":[{"name":"_spender","type":"address"},{"name":"_value","type":"uint256"}],"name":"approve","outputs":[{"name":"","type":"bool"}],"type":"function"}
]"#;

/// Builds a `BaseContract` from an inline JSON ABI.
pub fn contract_from_json(abi_json: &str) -> Result<BaseContract> {
    let abi: Abi = serde_json::from_str(abi_json).context("Invalid contract ABI")?;
    Ok(BaseContract::from(abi))
}

pub fn erc20() -> Result<BaseContract> {
    contract_from_json(ERC20_ABI)
}

/// Balance, decimals and symbol of an ERC20 holding.
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub balance: U256,
    pub decimals: u32,
    pub symbol: String,
}

/// Encodes, `eth_call`s and decodes a view function.
pub async fn read<T: Tokenize, D: Detokenize>(
    client: &dyn ChainClient,
    contract: &BaseContract,
    target: Address,
    function: &str,
    args: T,
) -> Result<D> {
    let data = contract
        .encode(function, args)
        .with_context(|| format!("Failed to encode {}", function))?;
    let tx: TypedTransaction = TransactionRequest::new().to(target).data(data).into();
    let output: Bytes = client.call(&tx).await?;
    contract
        .decode_output(function, output)
        .with_context(|| format!("Failed to decode {} output", function))
}

pub async fn balance_of(client: &dyn ChainClient, token: Address, owner: Address) -> Result<U256> {
    read(client, &erc20()?, token, "balanceOf", owner).await
}

pub async fn token_info(client: &dyn ChainClient, token: Address, owner: Address) -> Result<TokenInfo> {
    let contract = erc20()?;
    let balance: U256 = read(client, &contract, token, "balanceOf", owner).await?;
    let decimals: u8 = read(client, &contract, token, "decimals", ()).await?;
    let symbol: String = read(client, &contract, token, "symbol", ()).await?;
    Ok(TokenInfo {
        balance,
        decimals: decimals as u32,
        symbol,
    })
}

pub async fn allowance(
    client: &dyn ChainClient,
    token: Address,
    owner: Address,
    spender: Address,
) -> Result<U256> {
    read(client, &erc20()?, token, "allowance", (owner, spender)).await
}

pub fn approve_calldata(spender: Address, amount: U256) -> Result<Bytes> {
    erc20()?
        .encode("approve", (spender, amount))
        .context("Failed to encode approve")
}
