//! Chain termination.

use common::types::{
    chain_id_to_hex, CcmStatus, ChainId, CROSS_CHAIN_COMMAND_CHANNEL_TERMINATED,
    MODULE_NAME_INTEROPERABILITY,
};

use crate::channel::{send_notice, OutgoingMessage};
use crate::context::StoreContext;
use crate::error::ContractError;
use crate::events::{chain_account_updated, terminated_state_created};
use crate::state::{
    ChainStatus, TerminatedStateAccount, CHAIN_ACCOUNTS, CHANNELS, TERMINATED_STATE_ACCOUNTS,
};

/// Terminate `chain_id`: notify it through its outbox, mark the account
/// terminated and freeze its last certified state root for recovery.
///
/// Terminating an already terminated chain does nothing.
pub fn terminate_chain(ctx: &mut StoreContext, chain_id: &ChainId) -> Result<(), ContractError> {
    let mut account = CHAIN_ACCOUNTS
        .may_load(ctx.storage(), chain_id)?
        .ok_or_else(|| ContractError::ChainNotFound {
            chain_id: chain_id_to_hex(chain_id),
        })?;
    if account.status == ChainStatus::Terminated {
        return Ok(());
    }

    if CHANNELS.has(ctx.storage(), chain_id) {
        send_notice(
            ctx,
            OutgoingMessage {
                receiving_chain_id: *chain_id,
                module: MODULE_NAME_INTEROPERABILITY,
                cross_chain_command: CROSS_CHAIN_COMMAND_CHANNEL_TERMINATED,
                fee: 0,
                status: CcmStatus::Ok,
                params: vec![],
            },
        )?;
    }

    account.status = ChainStatus::Terminated;
    CHAIN_ACCOUNTS.save(ctx.storage_mut(), chain_id, &account)?;

    let state_root = account.last_certificate.state_root;
    TERMINATED_STATE_ACCOUNTS.save(
        ctx.storage_mut(),
        chain_id,
        &TerminatedStateAccount {
            state_root,
            mainchain_state_root: [0u8; 32],
            initialized: true,
        },
    )?;

    ctx.emit(chain_account_updated(chain_id, ChainStatus::Terminated));
    ctx.emit(terminated_state_created(chain_id, &state_root));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::ChannelData;
    use cosmwasm_std::testing::{mock_dependencies, mock_env};

    use crate::context::tests::save_own_chain;
    use crate::events::{EVENT_CCM_SEND_SUCCESS, EVENT_TERMINATED_STATE_CREATED};
    use crate::state::{ChainAccount, LastCertificate, OWN_CHAIN_ACCOUNT};

    const SIDECHAIN: ChainId = [4, 0, 0, 1];

    fn save_sidechain(storage: &mut dyn cosmwasm_std::Storage, status: ChainStatus) {
        CHAIN_ACCOUNTS
            .save(
                storage,
                &SIDECHAIN,
                &ChainAccount {
                    name: "sidechain".to_string(),
                    status,
                    last_certificate: LastCertificate {
                        height: 5,
                        timestamp: 1_000,
                        state_root: [3u8; 32],
                        validators_hash: [0u8; 32],
                    },
                },
            )
            .unwrap();
        CHANNELS
            .save(storage, &SIDECHAIN, &ChannelData::new([0u8; 8], 0))
            .unwrap();
    }

    #[test]
    fn test_terminate_chain() {
        let mut deps = mock_dependencies();
        save_own_chain(deps.as_mut().storage);
        save_sidechain(deps.as_mut().storage, ChainStatus::Active);

        let env = mock_env();
        let mut ctx = StoreContext::new(&mut deps.storage, &env).unwrap();
        terminate_chain(&mut ctx, &SIDECHAIN).unwrap();

        let types: Vec<&str> = ctx.events().iter().map(|e| e.ty.as_str()).collect();
        assert_eq!(types[0], EVENT_CCM_SEND_SUCCESS);
        assert!(types.contains(&EVENT_TERMINATED_STATE_CREATED));
        drop(ctx);

        let account = CHAIN_ACCOUNTS.load(&deps.storage, &SIDECHAIN).unwrap();
        assert_eq!(account.status, ChainStatus::Terminated);
        let state = TERMINATED_STATE_ACCOUNTS.load(&deps.storage, &SIDECHAIN).unwrap();
        assert_eq!(state.state_root, [3u8; 32]);
        assert!(state.initialized);

        let channel = CHANNELS.load(&deps.storage, &SIDECHAIN).unwrap();
        assert_eq!(channel.outbox.size, 1);
        assert_eq!(OWN_CHAIN_ACCOUNT.load(&deps.storage).unwrap().nonce, 1);
    }

    #[test]
    fn test_terminate_chain_is_idempotent() {
        let mut deps = mock_dependencies();
        save_own_chain(deps.as_mut().storage);
        save_sidechain(deps.as_mut().storage, ChainStatus::Registered);

        let env = mock_env();
        let mut ctx = StoreContext::new(&mut deps.storage, &env).unwrap();
        terminate_chain(&mut ctx, &SIDECHAIN).unwrap();
        let events = ctx.events().len();
        terminate_chain(&mut ctx, &SIDECHAIN).unwrap();
        assert_eq!(ctx.events().len(), events);
        drop(ctx);

        assert_eq!(CHANNELS.load(&deps.storage, &SIDECHAIN).unwrap().outbox.size, 1);
    }

    #[test]
    fn test_terminate_unknown_chain() {
        let mut deps = mock_dependencies();
        save_own_chain(deps.as_mut().storage);
        let env = mock_env();
        let mut ctx = StoreContext::new(&mut deps.storage, &env).unwrap();
        assert!(matches!(
            terminate_chain(&mut ctx, &SIDECHAIN),
            Err(ContractError::ChainNotFound { .. })
        ));
    }
}
