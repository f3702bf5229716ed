//! Execute handlers for the interoperability contract.
//!
//! - `registration` - RegisterSidechain
//! - `cross_chain_update` - SubmitCrossChainUpdate
//! - `message_recovery` - InitializeMessageRecovery, RecoverMessage
//! - `liveness_termination` - TerminateSidechainForLiveness

mod cross_chain_update;
mod liveness_termination;
mod message_recovery;
mod registration;

pub use cross_chain_update::*;
pub use liveness_termination::*;
pub use message_recovery::*;
pub use registration::*;
