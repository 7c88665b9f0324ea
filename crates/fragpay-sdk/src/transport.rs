//! Transport abstractions for EVM RPC interactions.

use alloy_primitives::{Address, Bytes, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::eth::transaction::{TransactionInput, TransactionRequest};
use log::warn;
use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::error::Error;
use crate::error::Result;

/// Encoded EVM call that can be dispatched via a transport.
#[derive(Clone, Debug)]
pub struct EvmCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl EvmCall {
    pub fn new(to: Address, data: impl Into<Bytes>, value: U256) -> Self {
        Self {
            to,
            data: data.into(),
            value,
        }
    }
}

/// Abstraction over read-only chain queries.
pub trait EvmViewTransport: Send + Sync {
    fn call_view(&self, call: EvmCall) -> Result<Bytes>;
    /// Runtime bytecode at `address`; empty when nothing is deployed.
    fn code_at(&self, address: Address) -> Result<Bytes>;
    fn chain_id(&self) -> u64;
}

/// Read-only JSON-RPC transport backed by Alloy's provider stack. Submission
/// goes through the sponsor, never through this transport.
pub struct AlloyHttpTransport {
    rpc_url: reqwest::Url,
    runtime: Arc<Runtime>,
    chain_id: u64,
}

impl AlloyHttpTransport {
    /// Connects to `rpc_url` and caches its chain id.
    pub fn new(rpc_url: &str) -> Result<Self> {
        let runtime = Runtime::new().map_err(|err| transport_err("runtime", err))?;
        let url = reqwest::Url::parse(rpc_url).map_err(|err| transport_err("url parse", err))?;

        let base_provider = ProviderBuilder::new().on_http(url.clone());
        let chain_id = runtime
            .block_on(base_provider.get_chain_id())
            .map_err(|err| transport_err("chain_id", err))?;

        Ok(Self {
            rpc_url: url,
            runtime: Arc::new(runtime),
            chain_id,
        })
    }
}

fn view_request(call: EvmCall) -> TransactionRequest {
    let mut tx = TransactionRequest::default()
        .input(TransactionInput::from(call.data))
        .value(call.value);
    tx.to = Some(alloy_primitives::TxKind::Call(call.to));
    tx
}

impl EvmViewTransport for AlloyHttpTransport {
    fn call_view(&self, call: EvmCall) -> Result<Bytes> {
        let req = view_request(call);
        let rpc_url = self.rpc_url.clone();
        let fut = async move {
            let provider = ProviderBuilder::new().on_http(rpc_url);
            provider.call(&req).await
        };
        self.runtime
            .block_on(fut)
            .map_err(|err| transport_err("call_view", err))
    }

    fn code_at(&self, address: Address) -> Result<Bytes> {
        let rpc_url = self.rpc_url.clone();
        let fut = async move {
            let provider = ProviderBuilder::new().on_http(rpc_url);
            provider.get_code_at(address).await
        };
        self.runtime
            .block_on(fut)
            .map_err(|err| transport_err("code_at", err))
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

fn transport_err(op: &str, err: impl std::fmt::Debug) -> Error {
    warn!("provider error ({op}): {err:?}");
    Error::Transport(format!("{op}: {err:?}"))
}
