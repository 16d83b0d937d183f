//! Deployed addresses and the ABI fragments the integrations call.

use crate::utils::erc20::contract_from_json;
use anyhow::{Context, Result};
use ethers::contract::BaseContract;
use ethers::types::Address;

pub const BITLAYER_LOTTERY: &str = "0x1fdaca95c6ba567044ea4f4c977897bebfa16b41";
pub const OWLTO: &str = "0xa9d27096bae2f47caa03ae6a1692119c7d19b4b0";
pub const BITCOW: &str = "0xf42f777538911510a38c80ad28b5e358a110b88a";
pub const AVALON: &str = "0x5a4247763709c251c8da359674d5c362fdac626d";
pub const AVALON_POOL: &str = "0xea5c99a3cca5f95ef6870a1b989755f67b6b1939";
pub const LAYERBANK: &str = "0xf1e25704e75da0496b46bf4e3856c5480a3c247f";
pub const LAYERBANK_LBTC: &str = "0x1471b4FAc13d42F3447fBA145bdfE95C6e7e7540";

pub const WBTC: &str = "0xfF204e2681A6fA0e2C3FaDe68a1B28fb90E4Fc5F";
pub const BITUSD: &str = "0x07373d112edc4570b46996ad1187bc4ac9fb5ed0";
/// BitCow BTC/BITUSD pool.
pub const BITUSD_POOL: &str = "0xDFA33A77ce4420bf4cA7bFa9c1a57A40307a092e";

pub const MINIBRIDGE_MAKER: &str = "0x00000000000007736e2F9aA5630B8c812E1F3fc9";

pub const LOTTERY_ABI: &str = r#"[
    {"type":"function","name":"lotteryReveal","stateMutability":"nonpayable","inputs":[{"name":"lotteryId_","type":"string"},{"name":"expiredTime_","type":"uint256"}],"outputs":[]}
]"#;

pub const WBTC_ABI: &str = r#"[
    {"type":"function","name":"deposit","stateMutability":"payable","inputs":[],"outputs":[]},
    {"type":"function","name":"withdraw","stateMutability":"nonpayable","inputs":[{"name":"amount","type":"uint256"}],"outputs":[]}
]"#;

pub const BITCOW_ABI: &str = r#"[
    {"type":"function","name":"swapBTCtoWBTC","stateMutability":"payable","inputs":[{"name":"wbtc","type":"address"}],"outputs":[]},
    {"type":"function","name":"swapWBTCtoBTC","stateMutability":"nonpayable","inputs":[{"name":"wbtc","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[]},
    {"type":"function","name":"swapBTCtoERC20","stateMutability":"payable","inputs":[{"name":"pools","type":"address[]"},{"name":"isXtoYs","type":"bool[]"},{"name":"minOutputAmount","type":"uint256"}],"outputs":[]},
    {"type":"function","name":"swap","stateMutability":"nonpayable","inputs":[{"name":"inputAmount","type":"uint256"},{"name":"pools","type":"address[]"},{"name":"isXtoYs","type":"bool[]"},{"name":"minOutputAmount","type":"uint256"}],"outputs":[]}
]"#;

pub const OWLTO_ABI: &str = r#"[
    {"type":"function","name":"checkIn","stateMutability":"nonpayable","inputs":[{"name":"date","type":"uint256"}],"outputs":[]}
]"#;

pub const AVALON_ABI: &str = r#"[
    {"type":"function","name":"depositETH","stateMutability":"payable","inputs":[{"name":"poolAddress","type":"address"},{"name":"onBehalfOf","type":"address"},{"name":"referralCode","type":"uint16"}],"outputs":[]}
]"#;

pub const LAYERBANK_ABI: &str = r#"[
    {"type":"function","name":"supply","stateMutability":"payable","inputs":[{"name":"lToken","type":"address"},{"name":"uAmount","type":"uint256"}],"outputs":[{"name":"","type":"uint256"}]}
]"#;

pub fn address(value: &str) -> Result<Address> {
    value
        .parse()
        .with_context(|| format!("Invalid address {}", value))
}

/// Address and ABI together, ready for `encode`.
pub fn contract(at: &str, abi: &str) -> Result<(Address, BaseContract)> {
    Ok((address(at)?, contract_from_json(abi)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_fragments_parse() {
        for (at, abi) in [
            (BITLAYER_LOTTERY, LOTTERY_ABI),
            (WBTC, WBTC_ABI),
            (BITCOW, BITCOW_ABI),
            (OWLTO, OWLTO_ABI),
            (AVALON, AVALON_ABI),
            (LAYERBANK, LAYERBANK_ABI),
        ] {
            assert!(contract(at, abi).is_ok(), "{}", at);
        }
        for at in [AVALON_POOL, LAYERBANK_LBTC, BITUSD, BITUSD_POOL, MINIBRIDGE_MAKER] {
            assert!(address(at).is_ok(), "{}", at);
        }
    }
}
