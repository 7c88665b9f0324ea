//! Wallet deployment collaborators.

use alloy_primitives::{Address, Bytes};
use fragment_core::Fragment;
use serde::{Deserialize, Serialize};

use crate::{
    config::SettlementConfig,
    contracts::{create_proxy_calldata, safe, single_owner_setup},
    error::{Error, Result},
    transport::EvmViewTransport,
};

/// On-chain wallet state reads.
pub trait WalletStatus: Send + Sync {
    fn is_deployed(&self, wallet: Address) -> Result<bool>;
    /// Only meaningful once the wallet is deployed.
    fn read_nonce(&self, wallet: Address) -> Result<u64>;
}

/// Everything needed to deploy one fragment's wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletDeployment {
    pub owner: Address,
    pub wallet: Address,
    pub salt_nonce: u64,
}

impl From<&Fragment> for WalletDeployment {
    fn from(fragment: &Fragment) -> Self {
        Self {
            owner: fragment.owner_address,
            wallet: fragment.wallet_address,
            salt_nonce: fragment.selection_index,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentCall {
    pub target: Address,
    pub data: Bytes,
}

pub trait DeploymentBuilder: Send + Sync {
    fn deployment_call(&self, deployment: &WalletDeployment) -> Result<DeploymentCall>;
}

/// Deploys single-owner Safes through `createProxyWithNonce`, salted with
/// the fragment's selection index.
#[derive(Clone, Debug)]
pub struct SafeProxyDeployer {
    pub factory: Address,
    pub singleton: Address,
    pub fallback_handler: Address,
}

impl SafeProxyDeployer {
    pub fn from_config(config: &SettlementConfig) -> Self {
        Self {
            factory: config.proxy_factory,
            singleton: config.safe_singleton,
            fallback_handler: config.fallback_handler,
        }
    }
}

impl DeploymentBuilder for SafeProxyDeployer {
    fn deployment_call(&self, deployment: &WalletDeployment) -> Result<DeploymentCall> {
        if deployment.owner == Address::ZERO {
            return Err(Error::InvalidInput(format!(
                "wallet {} has no owner",
                deployment.wallet
            )));
        }
        let initializer = single_owner_setup(deployment.owner, self.fallback_handler);
        Ok(DeploymentCall {
            target: self.factory,
            data: create_proxy_calldata(self.singleton, initializer, deployment.salt_nonce),
        })
    }
}

/// [`WalletStatus`] over a view transport: code presence and Safe `nonce()`.
pub struct EvmWalletStatus<T: EvmViewTransport> {
    transport: T,
}

impl<T: EvmViewTransport> EvmWalletStatus<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: EvmViewTransport> WalletStatus for EvmWalletStatus<T> {
    fn is_deployed(&self, wallet: Address) -> Result<bool> {
        Ok(!self.transport.code_at(wallet)?.is_empty())
    }

    fn read_nonce(&self, wallet: Address) -> Result<u64> {
        let nonce = safe::read_nonce(&self.transport, wallet)?;
        u64::try_from(nonce).map_err(|_| Error::Transport(format!("nonce {nonce} overflows u64")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::EvmCall;
    use alloy_primitives::U256;
    use alloy_sol_types::SolValue;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MockView {
        code: Arc<Mutex<Bytes>>,
        view_calls: Arc<Mutex<Vec<EvmCall>>>,
        nonce: Arc<Mutex<Option<U256>>>,
    }

    impl EvmViewTransport for MockView {
        fn call_view(&self, call: EvmCall) -> Result<Bytes> {
            self.view_calls.lock().unwrap().push(call);
            self.nonce
                .lock()
                .unwrap()
                .map(|n| Bytes::from(n.abi_encode()))
                .ok_or_else(|| Error::Transport("no view response".into()))
        }

        fn code_at(&self, _address: Address) -> Result<Bytes> {
            Ok(self.code.lock().unwrap().clone())
        }

        fn chain_id(&self) -> u64 {
            31337
        }
    }

    #[test]
    fn code_presence_means_deployed() {
        let view = MockView::default();
        let status = EvmWalletStatus::new(view.clone());
        assert!(!status.is_deployed(Address::repeat_byte(1)).unwrap());
        *view.code.lock().unwrap() = Bytes::from(vec![0x60, 0x80]);
        assert!(status.is_deployed(Address::repeat_byte(1)).unwrap());
    }

    #[test]
    fn nonce_reads_safe_nonce_view() {
        let view = MockView::default();
        *view.nonce.lock().unwrap() = Some(U256::from(4u8));
        let status = EvmWalletStatus::new(view.clone());
        assert_eq!(status.read_nonce(Address::repeat_byte(3)).unwrap(), 4);
        let calls = view.view_calls.lock().unwrap();
        assert_eq!(calls[0].to, Address::repeat_byte(3));
        assert_eq!(&calls[0].data[..], &alloy_primitives::hex!("affed0e0"));
    }

    #[test]
    fn proxy_deployment_targets_factory() {
        let deployer = SafeProxyDeployer {
            factory: Address::repeat_byte(0xfa),
            singleton: Address::repeat_byte(0x51),
            fallback_handler: Address::repeat_byte(0xfb),
        };
        let call = deployer
            .deployment_call(&WalletDeployment {
                owner: Address::repeat_byte(0x0a),
                wallet: Address::repeat_byte(0x0b),
                salt_nonce: 12,
            })
            .unwrap();
        assert_eq!(call.target, Address::repeat_byte(0xfa));
        // salt nonce is the last static word before the initializer bytes
        assert_eq!(U256::from_be_slice(&call.data[68..100]), U256::from(12u8));

        let err = deployer
            .deployment_call(&WalletDeployment {
                owner: Address::ZERO,
                wallet: Address::repeat_byte(0x0b),
                salt_nonce: 0,
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
