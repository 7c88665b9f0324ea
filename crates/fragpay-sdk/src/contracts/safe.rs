//! Safe wallet, Safe proxy factory and the EIP-712 `SafeTx` envelope.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{eip712_domain, sol, SolCall, SolStruct};

use crate::{
    contracts::erc20,
    error::{Error, Result},
    transport::{EvmCall, EvmViewTransport},
};

sol! {
    #[allow(non_camel_case_types)]
    contract Safe {
        function setup(
            address[] owners,
            uint256 threshold,
            address to,
            bytes data,
            address fallbackHandler,
            address paymentToken,
            uint256 payment,
            address paymentReceiver
        );

        function execTransaction(
            address to,
            uint256 value,
            bytes data,
            uint8 operation,
            uint256 safeTxGas,
            uint256 baseGas,
            uint256 gasPrice,
            address gasToken,
            address refundReceiver,
            bytes signatures
        ) payable returns (bool success);

        function nonce() view returns (uint256 current);
    }

    #[allow(non_camel_case_types)]
    contract SafeProxyFactory {
        function createProxyWithNonce(address singleton, bytes initializer, uint256 saltNonce)
            returns (address proxy);
    }

    struct SafeTx {
        address to;
        uint256 value;
        bytes data;
        uint8 operation;
        uint256 safeTxGas;
        uint256 baseGas;
        uint256 gasPrice;
        address gasToken;
        address refundReceiver;
        uint256 nonce;
    }
}

/// `Call` (0) or `DelegateCall` (1).
pub const OPERATION_CALL: u8 = 0;

/// A Safe transaction before signing. Gas refund fields stay zero: the
/// sponsor pays gas for the whole batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SafeTransaction {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub operation: u8,
    pub safe_tx_gas: U256,
    pub base_gas: U256,
    pub gas_price: U256,
    pub gas_token: Address,
    pub refund_receiver: Address,
    pub nonce: U256,
}

impl SafeTransaction {
    pub fn call(to: Address, value: U256, data: Bytes, nonce: u64) -> Self {
        Self {
            to,
            value,
            data,
            operation: OPERATION_CALL,
            safe_tx_gas: U256::ZERO,
            base_gas: U256::ZERO,
            gas_price: U256::ZERO,
            gas_token: Address::ZERO,
            refund_receiver: Address::ZERO,
            nonce: U256::from(nonce),
        }
    }

    /// Moves `amount` of `token` to `recipient`. The zero token address means
    /// the chain's native coin.
    pub fn token_transfer(token: Address, recipient: Address, amount: U256, nonce: u64) -> Self {
        if token == Address::ZERO {
            Self::call(recipient, amount, Bytes::new(), nonce)
        } else {
            Self::call(token, U256::ZERO, erc20::transfer_calldata(recipient, amount), nonce)
        }
    }

    fn typed(&self) -> SafeTx {
        SafeTx {
            to: self.to,
            value: self.value,
            data: self.data.clone(),
            operation: self.operation,
            safeTxGas: self.safe_tx_gas,
            baseGas: self.base_gas,
            gasPrice: self.gas_price,
            gasToken: self.gas_token,
            refundReceiver: self.refund_receiver,
            nonce: self.nonce,
        }
    }

    /// EIP-712 hash the Safe owner signs, bound to one wallet on one chain.
    pub fn signing_hash(&self, safe: Address, chain_id: u64) -> B256 {
        let domain = eip712_domain! {
            chain_id: chain_id,
            verifying_contract: safe,
        };
        self.typed().eip712_signing_hash(&domain)
    }

    /// `execTransaction` calldata carrying the owner signatures.
    pub fn exec_calldata(&self, signatures: Bytes) -> Bytes {
        Bytes::from(
            Safe::execTransactionCall {
                to: self.to,
                value: self.value,
                data: self.data.clone(),
                operation: self.operation,
                safeTxGas: self.safe_tx_gas,
                baseGas: self.base_gas,
                gasPrice: self.gas_price,
                gasToken: self.gas_token,
                refundReceiver: self.refund_receiver,
                signatures,
            }
            .abi_encode(),
        )
    }
}

/// Safe `setup` initializer for a single-owner, threshold-1 wallet.
pub fn single_owner_setup(owner: Address, fallback_handler: Address) -> Bytes {
    Bytes::from(
        Safe::setupCall {
            owners: vec![owner],
            threshold: U256::from(1u8),
            to: Address::ZERO,
            data: Bytes::new(),
            fallbackHandler: fallback_handler,
            paymentToken: Address::ZERO,
            payment: U256::ZERO,
            paymentReceiver: Address::ZERO,
        }
        .abi_encode(),
    )
}

pub fn create_proxy_calldata(singleton: Address, initializer: Bytes, salt_nonce: u64) -> Bytes {
    Bytes::from(
        SafeProxyFactory::createProxyWithNonceCall {
            singleton,
            initializer,
            saltNonce: U256::from(salt_nonce),
        }
        .abi_encode(),
    )
}

pub fn read_nonce<T: EvmViewTransport + ?Sized>(transport: &T, safe: Address) -> Result<U256> {
    let calldata = Safe::nonceCall {}.abi_encode();
    let raw = transport.call_view(EvmCall::new(safe, calldata, U256::ZERO))?;
    let decoded = Safe::nonceCall::abi_decode_returns(&raw, true)
        .map_err(|err| Error::Transport(format!("nonce decode: {err}")))?;
    Ok(decoded.current)
}
