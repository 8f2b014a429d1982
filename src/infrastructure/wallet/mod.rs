pub mod provider;

pub use provider::{AccountEvent, AlloyWallet, WalletError, WalletProvider};
