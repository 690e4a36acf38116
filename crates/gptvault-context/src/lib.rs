//! The surface GPTVault consumers talk to.
//!
//! [`VaultContext`] binds a [`Vault`](gptvault_secrets::Vault) to a
//! [`SessionManager`](gptvault_session::SessionManager): secrets are only
//! readable while the session is active, and the vault drops its key as
//! soon as the session locks.

pub mod context;
pub mod error;

pub use context::{ContextOptions, VaultContext, SETTINGS_KEY};
pub use error::{ContextError, Result};
