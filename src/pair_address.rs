//! Deterministic pair address derivation
//!
//! Pairs are deployed by the factory with CREATE2, salted by the packed
//! (sorted) token addresses, so a pair's address is known without any RPC.

use alloy::primitives::{b256, keccak256, Address, B256};

/// keccak256 of the pair contract's creation bytecode
pub const DEFAULT_PAIR_CODE_HASH: B256 =
    b256!("dcfe4762e3a571007d8629d1e6a9d3bbb10f19a309c88f80c88a995c89753f81");

/// Order two tokens the way the factory does (ascending address)
pub fn sort_tokens(token_a: Address, token_b: Address) -> (Address, Address) {
    if token_a < token_b {
        (token_a, token_b)
    } else {
        (token_b, token_a)
    }
}

/// CREATE2 salt: keccak256(abi.encodePacked(token0, token1))
pub fn pair_salt(token_a: Address, token_b: Address) -> B256 {
    let (token0, token1) = sort_tokens(token_a, token_b);
    keccak256([token0.as_slice(), token1.as_slice()].concat())
}

/// Compute the pair address for two tokens under `factory`
pub fn compute_pair_address(
    factory: Address,
    token_a: Address,
    token_b: Address,
    init_code_hash: B256,
) -> Address {
    let salt = pair_salt(token_a, token_b);
    factory.create2(salt.0, init_code_hash.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    // Uniswap V2 mainnet: factory, init code hash and the USDC/WETH pair
    const UNI_FACTORY: Address = address!("5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f");
    const UNI_CODE_HASH: B256 =
        b256!("96e8ac4277198ff8b6f785478aa9a39f403cb768dd02cbee326c3e7da348845f");
    const USDC: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
    const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

    #[test]
    fn test_sort_tokens() {
        assert_eq!(sort_tokens(WETH, USDC), (USDC, WETH));
        assert_eq!(sort_tokens(USDC, WETH), (USDC, WETH));
    }

    #[test]
    fn test_known_uniswap_pair() {
        let pair = compute_pair_address(UNI_FACTORY, WETH, USDC, UNI_CODE_HASH);
        assert_eq!(pair, address!("B4e16d0168e52d35CaCD2c6185b44281Ec28C9Dc"));
    }

    #[test]
    fn test_argument_order_irrelevant() {
        let factory = Address::repeat_byte(0x42);
        let a = compute_pair_address(factory, WETH, USDC, DEFAULT_PAIR_CODE_HASH);
        let b = compute_pair_address(factory, USDC, WETH, DEFAULT_PAIR_CODE_HASH);
        assert_eq!(a, b);
        assert_ne!(a, compute_pair_address(factory, WETH, USDC, UNI_CODE_HASH));
    }
}
