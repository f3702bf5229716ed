//! Permissionless termination of chains that stopped certifying.

use cosmwasm_std::{Binary, DepsMut, Env, Response, Storage};

use common::types::{chain_id_to_hex, ChainId};

use crate::context::StoreContext;
use crate::error::ContractError;
use crate::liveness::is_stale_for_termination;
use crate::state::{ChainStatus, CHAIN_ACCOUNTS, OWN_CHAIN_ACCOUNT};
use crate::termination::terminate_chain;
use crate::validation::parse_chain_id;

pub fn verify_liveness_termination(
    storage: &dyn Storage,
    chain_id: &[u8],
    timestamp: u64,
) -> Result<ChainId, ContractError> {
    let chain_id = parse_chain_id(chain_id)?;
    if chain_id == OWN_CHAIN_ACCOUNT.load(storage)?.chain_id {
        return Err(ContractError::InvalidChainId {
            reason: "the hub cannot be terminated".to_string(),
        });
    }

    let account = CHAIN_ACCOUNTS
        .may_load(storage, &chain_id)?
        .ok_or_else(|| ContractError::ChainNotFound {
            chain_id: chain_id_to_hex(&chain_id),
        })?;
    if account.status == ChainStatus::Terminated {
        return Err(ContractError::ChainTerminated {
            chain_id: chain_id_to_hex(&chain_id),
        });
    }
    if !is_stale_for_termination(&account, timestamp) {
        return Err(ContractError::ChainStillLive {
            chain_id: chain_id_to_hex(&chain_id),
        });
    }
    Ok(chain_id)
}

/// Execute handler for `TerminateSidechainForLiveness`.
pub fn execute_terminate_sidechain_for_liveness(
    deps: DepsMut,
    env: Env,
    chain_id: Binary,
) -> Result<Response, ContractError> {
    let chain_id = verify_liveness_termination(deps.storage, &chain_id, env.block.time.seconds())?;

    let mut ctx = StoreContext::new(deps.storage, &env)?;
    terminate_chain(&mut ctx, &chain_id)?;

    Ok(Response::new()
        .add_events(ctx.into_events())
        .add_attribute("method", "terminate_sidechain_for_liveness")
        .add_attribute("chain_id", chain_id_to_hex(&chain_id)))
}
