pub mod erc20;
pub mod safe;

pub use safe::{create_proxy_calldata, single_owner_setup, SafeTransaction};
