use std::path::Path;
use std::time::Duration;

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use sponsor_rpc::SponsorAuth;

use crate::error::{Error, Result};

/// Chain and sponsor settings for one deployment of the payment pipeline.
/// Contract defaults are the canonical Safe v1.3.0 deployments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    pub chain_id: u64,
    pub rpc_url: Option<String>,
    pub safe_singleton: Address,
    pub proxy_factory: Address,
    pub fallback_handler: Address,
    pub sponsor_endpoint: String,
    pub sponsor_api_key: Option<String>,
    pub sponsor_timeout_secs: u64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            rpc_url: None,
            safe_singleton: address!("3E5c63644E683549055b9Be8653de26E0B4CD36E"),
            proxy_factory: address!("a6B71E26C5e0845f74c812102Ca7114b6a896AB2"),
            fallback_handler: address!("f48f2B2d2a534e402487b3ee7C18c33Aec0Fe5e4"),
            sponsor_endpoint: String::new(),
            sponsor_api_key: None,
            sponsor_timeout_secs: 180,
        }
    }
}

impl SettlementConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| Error::InvalidInput(format!("settlement config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|err| {
            Error::InvalidInput(format!("read config {}: {err}", path.display()))
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chain_id == 0 {
            return Err(Error::InvalidInput("chain_id must be non-zero".into()));
        }
        for (name, addr) in [
            ("safe_singleton", self.safe_singleton),
            ("proxy_factory", self.proxy_factory),
        ] {
            if addr == Address::ZERO {
                return Err(Error::InvalidInput(format!("{name} must be set")));
            }
        }
        if self.sponsor_timeout_secs == 0 {
            return Err(Error::InvalidInput("sponsor_timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn sponsor_timeout(&self) -> Duration {
        Duration::from_secs(self.sponsor_timeout_secs)
    }

    pub fn sponsor_auth(&self) -> Option<SponsorAuth> {
        self.sponsor_api_key
            .as_ref()
            .filter(|key| !key.is_empty())
            .map(|key| SponsorAuth::ApiKey(key.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_contract_defaults() {
        let config = SettlementConfig::from_json(
            r#"{"chain_id": 8453, "sponsor_endpoint": "http://localhost:1"}"#,
        )
        .unwrap();
        assert_eq!(config.chain_id, 8453);
        assert_eq!(config.proxy_factory, SettlementConfig::default().proxy_factory);
        assert_eq!(config.sponsor_timeout(), Duration::from_secs(180));
        assert!(config.sponsor_auth().is_none());
    }

    #[test]
    fn config_only_carries_the_settlement_path() {
        let config = SettlementConfig::from_json(
            r#"{"chain_id": 8453, "chain_name": "base", "multicall": "0xcA11bde05977b3631167028862bE2a173976CA11"}"#,
        )
        .unwrap();
        let rendered = serde_json::to_value(&config).unwrap();
        let keys: Vec<&str> = rendered
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert!(!keys.contains(&"chain_name"));
        assert!(!keys.contains(&"multicall"));
        assert!(keys.contains(&"fallback_handler"));
    }

    #[test]
    fn rejects_zero_chain_and_missing_factory() {
        assert!(SettlementConfig::from_json(r#"{"chain_id": 0}"#).is_err());
        let err = SettlementConfig::from_json(
            r#"{"proxy_factory": "0x0000000000000000000000000000000000000000"}"#,
        )
        .unwrap_err();
        assert_eq!(err, Error::InvalidInput("proxy_factory must be set".into()));
    }
}
