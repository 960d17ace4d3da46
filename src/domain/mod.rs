mod account;
mod amount;
mod asset;
mod credential;
mod network;
mod plan;
mod strkey;

pub use account::*;
pub use amount::*;
pub use asset::*;
pub use credential::*;
pub use network::*;
pub use plan::*;
pub use strkey::{AccountId, KeyVersion, STRKEY_LEN, StrKeyError};
