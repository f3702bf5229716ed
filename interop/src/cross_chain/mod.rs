//! Cross-chain commands and the modules that serve them.
//!
//! A module registers the commands it handles plus optional hooks that run
//! around every inbound message, whichever module it targets. Hooks run in
//! registration order.

mod interoperability;

pub use interoperability::{ChannelTerminatedCommand, InteroperabilityModule, RegistrationCommand};

use std::collections::BTreeMap;

use common::types::CrossChainMessage;

use crate::context::StoreContext;
use crate::error::ContractError;

/// Handler for one `(module, cross_chain_command)` pair.
pub trait CrossChainCommand {
    fn name(&self) -> &'static str;

    /// Read-only checks. A failure discards the message as a failed CCM.
    fn verify(&self, _ctx: &StoreContext, _ccm: &CrossChainMessage) -> Result<(), ContractError> {
        Ok(())
    }

    /// State changes of the message. On failure its writes are rolled back
    /// and the message is discarded as a failed CCM.
    fn execute(&self, ctx: &mut StoreContext, ccm: &CrossChainMessage) -> Result<(), ContractError>;
}

pub trait InteroperableModule {
    fn name(&self) -> &'static str;

    fn cross_chain_commands(&self) -> Vec<Box<dyn CrossChainCommand>>;

    /// Runs before any message applied on this chain. Failing terminates the
    /// sending chain.
    fn verify_cross_chain_message(
        &self,
        _ctx: &StoreContext,
        _ccm: &CrossChainMessage,
    ) -> Result<(), ContractError> {
        Ok(())
    }

    fn before_cross_chain_command_execute(
        &self,
        _ctx: &mut StoreContext,
        _ccm: &CrossChainMessage,
    ) -> Result<(), ContractError> {
        Ok(())
    }

    fn after_cross_chain_command_execute(
        &self,
        _ctx: &mut StoreContext,
        _ccm: &CrossChainMessage,
    ) -> Result<(), ContractError> {
        Ok(())
    }

    /// Runs before a message is forwarded to another chain. Failing bounces
    /// the message.
    fn before_cross_chain_message_forwarding(
        &self,
        _ctx: &mut StoreContext,
        _ccm: &CrossChainMessage,
    ) -> Result<(), ContractError> {
        Ok(())
    }

    fn before_recover_ccm(
        &self,
        _ctx: &mut StoreContext,
        _ccm: &CrossChainMessage,
    ) -> Result<(), ContractError> {
        Ok(())
    }
}

/// Modules served by this chain and their commands.
pub struct CommandRegistry {
    modules: Vec<Box<dyn InteroperableModule>>,
    commands: BTreeMap<(String, String), Box<dyn CrossChainCommand>>,
}

impl CommandRegistry {
    /// A registry with no modules at all.
    pub fn empty() -> Self {
        Self {
            modules: vec![],
            commands: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, module: Box<dyn InteroperableModule>) -> Result<(), ContractError> {
        if self.has_module(module.name()) {
            return Err(ContractError::ModuleAlreadyRegistered {
                module: module.name().to_string(),
            });
        }
        self.insert(module);
        Ok(())
    }

    fn insert(&mut self, module: Box<dyn InteroperableModule>) {
        for command in module.cross_chain_commands() {
            self.commands
                .insert((module.name().to_string(), command.name().to_string()), command);
        }
        self.modules.push(module);
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.modules.iter().any(|module| module.name() == name)
    }

    pub fn command(&self, module: &str, command: &str) -> Option<&dyn CrossChainCommand> {
        self.commands
            .get(&(module.to_string(), command.to_string()))
            .map(|command| command.as_ref())
    }

    pub fn modules(&self) -> impl Iterator<Item = &dyn InteroperableModule> {
        self.modules.iter().map(|module| module.as_ref())
    }
}

impl Default for CommandRegistry {
    /// The hub's registry: only the interoperability module.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.insert(Box::new(InteroperabilityModule));
        registry
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use common::types::{
        CROSS_CHAIN_COMMAND_CHANNEL_TERMINATED, CROSS_CHAIN_COMMAND_REGISTRATION,
        CROSS_CHAIN_COMMAND_SIDECHAIN_TERMINATED, MODULE_NAME_INTEROPERABILITY,
    };
    use cosmwasm_std::{Event, StdError};

    /// Test module `token` with a `transfer` command that writes a marker key
    /// and fails when the first param byte is 0xff. `fail_hook` names a hook
    /// that always fails. The recovery hook also marks the recovered nonce
    /// and rejects messages whose first param byte is 0xff.
    pub struct TokenModule {
        pub fail_hook: Option<&'static str>,
    }

    pub const TOKEN_MODULE: &str = "token";
    pub const TRANSFER_MARKER: &[u8] = b"token_transfer_applied";
    pub const HOOK_MARKER: &[u8] = b"token_before_hook_ran";
    pub const RECOVER_MARKER_PREFIX: &[u8] = b"token_recovered_";
    pub const EVENT_TOKEN_RECOVER: &str = "token_recover";

    pub fn recover_marker(nonce: u64) -> Vec<u8> {
        [RECOVER_MARKER_PREFIX, &nonce.to_be_bytes()].concat()
    }

    struct TransferCommand;

    impl CrossChainCommand for TransferCommand {
        fn name(&self) -> &'static str {
            "transfer"
        }

        fn execute(&self, ctx: &mut StoreContext, ccm: &CrossChainMessage) -> Result<(), ContractError> {
            ctx.storage_mut().set(TRANSFER_MARKER, &ccm.nonce.to_be_bytes());
            if ccm.params.first() == Some(&0xff) {
                return Err(StdError::generic_err("transfer rejected").into());
            }
            Ok(())
        }
    }

    impl TokenModule {
        fn hook(&self, name: &str) -> Result<(), ContractError> {
            if self.fail_hook == Some(name) {
                return Err(StdError::generic_err(format!("{} failed", name)).into());
            }
            Ok(())
        }
    }

    impl InteroperableModule for TokenModule {
        fn name(&self) -> &'static str {
            TOKEN_MODULE
        }

        fn cross_chain_commands(&self) -> Vec<Box<dyn CrossChainCommand>> {
            vec![Box::new(TransferCommand)]
        }

        fn verify_cross_chain_message(
            &self,
            _ctx: &StoreContext,
            _ccm: &CrossChainMessage,
        ) -> Result<(), ContractError> {
            self.hook("verify")
        }

        fn before_cross_chain_command_execute(
            &self,
            ctx: &mut StoreContext,
            _ccm: &CrossChainMessage,
        ) -> Result<(), ContractError> {
            ctx.storage_mut().set(HOOK_MARKER, b"1");
            self.hook("before")
        }

        fn after_cross_chain_command_execute(
            &self,
            _ctx: &mut StoreContext,
            _ccm: &CrossChainMessage,
        ) -> Result<(), ContractError> {
            self.hook("after")
        }

        fn before_cross_chain_message_forwarding(
            &self,
            _ctx: &mut StoreContext,
            _ccm: &CrossChainMessage,
        ) -> Result<(), ContractError> {
            self.hook("forward")
        }

        fn before_recover_ccm(
            &self,
            ctx: &mut StoreContext,
            ccm: &CrossChainMessage,
        ) -> Result<(), ContractError> {
            ctx.storage_mut().set(&recover_marker(ccm.nonce), b"1");
            ctx.emit(Event::new(EVENT_TOKEN_RECOVER).add_attribute("nonce", ccm.nonce.to_string()));
            if ccm.params.first() == Some(&0xff) {
                return Err(StdError::generic_err("recovery rejected").into());
            }
            self.hook("recover")
        }
    }

    pub fn registry_with_token(fail_hook: Option<&'static str>) -> CommandRegistry {
        let mut registry = CommandRegistry::default();
        registry
            .register(Box::new(TokenModule { fail_hook }))
            .unwrap();
        registry
    }

    #[test]
    fn test_default_registry_serves_interoperability_commands() {
        let registry = CommandRegistry::default();
        assert!(registry.has_module(MODULE_NAME_INTEROPERABILITY));
        assert!(registry
            .command(MODULE_NAME_INTEROPERABILITY, CROSS_CHAIN_COMMAND_REGISTRATION)
            .is_some());
        assert!(registry
            .command(MODULE_NAME_INTEROPERABILITY, CROSS_CHAIN_COMMAND_CHANNEL_TERMINATED)
            .is_some());
        assert!(registry
            .command(MODULE_NAME_INTEROPERABILITY, CROSS_CHAIN_COMMAND_SIDECHAIN_TERMINATED)
            .is_none());
        assert!(!registry.has_module(TOKEN_MODULE));
    }

    #[test]
    fn test_register_rejects_duplicate_module() {
        let mut registry = registry_with_token(None);
        assert!(registry.command(TOKEN_MODULE, "transfer").is_some());
        assert_eq!(
            registry.register(Box::new(TokenModule { fail_hook: None })),
            Err(ContractError::ModuleAlreadyRegistered {
                module: TOKEN_MODULE.to_string()
            })
        );
        let names: Vec<&str> = registry.modules().map(|m| m.name()).collect();
        assert_eq!(names, vec![MODULE_NAME_INTEROPERABILITY, TOKEN_MODULE]);
    }
}
