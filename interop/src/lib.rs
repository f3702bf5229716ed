//! Interoperability Contract - Hub of a Hub-and-Sidechain Network
//!
//! This contract keeps the hub's registry of sidechains and routes
//! cross-chain messages (CCMs) between them through per-chain Merkle inbox
//! and outbox accumulators.
//!
//! # Registration
//! 1. Anyone registers a sidechain with its validator set and pays the fee
//! 2. The hub opens a channel and queues a `registration` message for it
//! 3. The first certificate from the sidechain makes it `Active`
//!
//! # Cross-chain Updates
//! 1. A relayer submits a certificate signed by the sidechain validators
//!    together with the messages the sidechain sent since the last update
//! 2. The hub checks the certificate signature and the inclusion of the
//!    messages in the sidechain's certified outbox root
//! 3. Each message is applied on the hub, forwarded to its receiving
//!    chain's outbox, or bounced back to its sender
//!
//! # Termination & Recovery
//! - A chain that does not certify for 30 days can be terminated by anyone
//! - A chain that misbehaves is terminated while its messages are processed
//! - Messages stuck in a terminated chain's outbox are proven against its
//!   frozen outbox root and sent back to where they came from

pub mod certificate;
pub mod channel;
pub mod context;
pub mod contract;
pub mod cross_chain;
mod delivery;
pub mod error;
pub mod events;
mod execute;
pub mod liveness;
pub mod msg;
mod query;
pub mod state;
pub mod termination;
pub mod validation;

pub use crate::error::{CertificateError, ContractError};
pub use crate::events::{CcmProcessedCode, CcmProcessedResult};
pub use crate::execute::{CrossChainUpdate, UpdateOutcome};
