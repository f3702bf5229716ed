//! Commands of the interoperability module itself.

use common::codec::Decode;
use common::types::{
    CcmStatus, CrossChainMessage, RegistrationParams, CROSS_CHAIN_COMMAND_CHANNEL_TERMINATED,
    CROSS_CHAIN_COMMAND_REGISTRATION, MODULE_NAME_INTEROPERABILITY,
};

use super::{CrossChainCommand, InteroperableModule};
use crate::context::StoreContext;
use crate::error::ContractError;
use crate::state::{CHANNELS, OWN_CHAIN_ACCOUNT};
use crate::termination::terminate_chain;

pub struct InteroperabilityModule;

impl InteroperableModule for InteroperabilityModule {
    fn name(&self) -> &'static str {
        MODULE_NAME_INTEROPERABILITY
    }

    fn cross_chain_commands(&self) -> Vec<Box<dyn CrossChainCommand>> {
        vec![Box::new(RegistrationCommand), Box::new(ChannelTerminatedCommand)]
    }
}

/// Registration handshake from a sidechain. It must be the first message the
/// chain sends and must name this chain; anything else terminates the sender.
pub struct RegistrationCommand;

impl CrossChainCommand for RegistrationCommand {
    fn name(&self) -> &'static str {
        CROSS_CHAIN_COMMAND_REGISTRATION
    }

    fn verify(&self, _ctx: &StoreContext, ccm: &CrossChainMessage) -> Result<(), ContractError> {
        RegistrationParams::decode(&ccm.params)?;
        Ok(())
    }

    fn execute(&self, ctx: &mut StoreContext, ccm: &CrossChainMessage) -> Result<(), ContractError> {
        let params = RegistrationParams::decode(&ccm.params)?;
        let own_chain = OWN_CHAIN_ACCOUNT.load(ctx.storage())?;
        let channel = CHANNELS.load(ctx.storage(), &ccm.sending_chain_id)?;

        let valid = ccm.status == CcmStatus::Ok
            && params.chain_id == own_chain.chain_id
            && params.name == own_chain.name
            && params.message_fee_token_id == channel.message_fee_token_id
            && channel.inbox.size == 1;
        if !valid {
            terminate_chain(ctx, &ccm.sending_chain_id)?;
        }
        Ok(())
    }
}

/// The sending chain closed its channel with this chain.
pub struct ChannelTerminatedCommand;

impl CrossChainCommand for ChannelTerminatedCommand {
    fn name(&self) -> &'static str {
        CROSS_CHAIN_COMMAND_CHANNEL_TERMINATED
    }

    fn execute(&self, ctx: &mut StoreContext, ccm: &CrossChainMessage) -> Result<(), ContractError> {
        terminate_chain(ctx, &ccm.sending_chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::codec::Encode;
    use common::types::{ChainId, ChannelData};
    use cosmwasm_std::testing::{mock_dependencies, mock_env};
    use cosmwasm_std::Storage;

    use crate::context::tests::{save_own_chain, HUB};
    use crate::state::{ChainAccount, ChainStatus, LastCertificate, CHAIN_ACCOUNTS};

    const SIDECHAIN: ChainId = [4, 0, 0, 1];
    const FEE_TOKEN: [u8; 8] = [4, 0, 0, 0, 0, 0, 0, 0];

    fn setup(storage: &mut dyn Storage, inbox_size: u64) {
        save_own_chain(storage);
        CHAIN_ACCOUNTS
            .save(
                storage,
                &SIDECHAIN,
                &ChainAccount {
                    name: "sidechain".to_string(),
                    status: ChainStatus::Active,
                    last_certificate: LastCertificate {
                        height: 1,
                        timestamp: 1,
                        state_root: [0u8; 32],
                        validators_hash: [0u8; 32],
                    },
                },
            )
            .unwrap();
        let mut channel = ChannelData::new(FEE_TOKEN, 1_000);
        for i in 0..inbox_size {
            channel.inbox.append(&i.to_be_bytes());
        }
        CHANNELS.save(storage, &SIDECHAIN, &channel).unwrap();
    }

    fn registration(params: RegistrationParams) -> CrossChainMessage {
        CrossChainMessage {
            module: MODULE_NAME_INTEROPERABILITY.to_string(),
            cross_chain_command: CROSS_CHAIN_COMMAND_REGISTRATION.to_string(),
            nonce: 0,
            fee: 0,
            sending_chain_id: SIDECHAIN,
            receiving_chain_id: HUB,
            params: params.encode(),
            status: CcmStatus::Ok,
        }
    }

    fn params() -> RegistrationParams {
        RegistrationParams {
            name: "hub".to_string(),
            chain_id: HUB,
            message_fee_token_id: FEE_TOKEN,
            min_return_fee_per_byte: 1_000,
        }
    }

    fn status(storage: &dyn Storage) -> ChainStatus {
        CHAIN_ACCOUNTS.load(storage, &SIDECHAIN).unwrap().status
    }

    #[test]
    fn test_registration_accepted_as_first_message() {
        let mut deps = mock_dependencies();
        setup(deps.as_mut().storage, 1);
        let env = mock_env();
        let mut ctx = StoreContext::new(&mut deps.storage, &env).unwrap();

        let ccm = registration(params());
        RegistrationCommand.verify(&ctx, &ccm).unwrap();
        RegistrationCommand.execute(&mut ctx, &ccm).unwrap();
        assert_eq!(status(ctx.storage()), ChainStatus::Active);
    }

    #[test]
    fn test_registration_mismatch_terminates_sender() {
        let mut wrong_name = params();
        wrong_name.name = "other".to_string();
        let mut wrong_token = params();
        wrong_token.message_fee_token_id = [9u8; 8];

        for (invalid, inbox_size) in [(wrong_name, 1), (wrong_token, 1), (params(), 2)] {
            let mut deps = mock_dependencies();
            setup(deps.as_mut().storage, inbox_size);
            let env = mock_env();
            let mut ctx = StoreContext::new(&mut deps.storage, &env).unwrap();

            RegistrationCommand
                .execute(&mut ctx, &registration(invalid))
                .unwrap();
            assert_eq!(status(ctx.storage()), ChainStatus::Terminated);
        }
    }

    #[test]
    fn test_registration_params_must_decode() {
        let mut deps = mock_dependencies();
        setup(deps.as_mut().storage, 1);
        let env = mock_env();
        let ctx = StoreContext::new(&mut deps.storage, &env).unwrap();

        let mut ccm = registration(params());
        ccm.params.truncate(3);
        assert!(matches!(
            RegistrationCommand.verify(&ctx, &ccm),
            Err(ContractError::Codec(_))
        ));
    }

    #[test]
    fn test_channel_terminated_terminates_sender() {
        let mut deps = mock_dependencies();
        setup(deps.as_mut().storage, 3);
        let env = mock_env();
        let mut ctx = StoreContext::new(&mut deps.storage, &env).unwrap();

        let mut ccm = registration(params());
        ccm.cross_chain_command = CROSS_CHAIN_COMMAND_CHANNEL_TERMINATED.to_string();
        ccm.params = vec![];
        ChannelTerminatedCommand.execute(&mut ctx, &ccm).unwrap();
        assert_eq!(status(ctx.storage()), ChainStatus::Terminated);
    }
}
