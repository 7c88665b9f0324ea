//! fragment-core: coin selection over pseudonymous fragments.
//!
//! Pieces:
//! - TokenAmount: fixed-point amounts in minor units
//! - FragmentSource: boundary to whatever stores fragments, plus filters
//! - CoinSelector: exact match, branch-and-bound, knapsack, largest-first,
//!   smallest-first, first covering strategy wins
//! - ChangeAdvisor: classifies leftover value and recommends a disposition
//!
//! Nothing here touches the chain; settlement lives in fragpay-sdk.
pub mod amount;
mod bnb;
pub mod change;
pub mod config;
mod knapsack;
pub mod model;
pub mod score;
pub mod selector;
pub mod source;

pub use amount::TokenAmount;
pub use change::{
    advise, advise_default, ChangeAction, ChangeAdvisor, ChangeClass, ChangeDisposition,
};
pub use config::{ChangePolicy, ScoreWeights, SelectorConfig};
pub use model::{ChosenFragment, Fragment, Selection, Strategy};
pub use score::Score;
pub use selector::{select, CoinSelector};
pub use source::{
    fragments_from_json, BalanceField, FragmentFilter, FragmentRecord, FragmentSource,
    InMemorySource,
};
