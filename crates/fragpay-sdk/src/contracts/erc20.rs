use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

sol! {
    #[allow(non_camel_case_types)]
    contract Erc20 {
        function transfer(address to, uint256 amount) returns (bool);
    }
}

pub fn transfer_calldata(to: Address, amount: U256) -> Bytes {
    Bytes::from(Erc20::transferCall { to, amount }.abi_encode())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::hex;

    #[test]
    fn transfer_selector_and_layout() {
        let to = Address::repeat_byte(0x42);
        let data = transfer_calldata(to, U256::from(1_000u64));
        assert_eq!(&data[..4], &hex!("a9059cbb"));
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[16..36], to.as_slice());
        assert_eq!(U256::from_be_slice(&data[36..68]), U256::from(1_000u64));
    }
}
