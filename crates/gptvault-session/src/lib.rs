//! Session state machine for GPTVault.
//!
//! Tracks whether secrets may be decrypted right now. The session starts
//! `locked`, becomes `unlocked` once the caller has verified a passphrase,
//! moves to `warning` as the inactivity timeout approaches, and locks again
//! when it expires. The manager never touches key material; whoever owns
//! the vault observes the `locked` transition and drops the key.

pub mod error;
pub mod manager;
pub mod state;

pub use error::{Result, SessionError};
pub use manager::{SessionManager, Subscription};
pub use state::{SessionConfigUpdate, SessionState, SessionStatus};
