//! Request-scoped execution context.
//!
//! Cross-chain message handling needs to undo the effects of one message
//! without failing the whole transaction. [`JournaledStorage`] records the
//! previous value of every key it writes, and [`StoreContext`] pairs it with
//! the event queue of the request so a [`SnapshotId`] can roll back both.

use cosmwasm_std::{Env, Event, Order, Record, StdResult, Storage};

use common::types::ChainId;

use crate::state::OWN_CHAIN_ACCOUNT;

/// Storage adaptor with an undo log.
pub struct JournaledStorage<'a> {
    inner: &'a mut dyn Storage,
    journal: Vec<(Vec<u8>, Option<Vec<u8>>)>,
}

impl<'a> JournaledStorage<'a> {
    pub fn new(inner: &'a mut dyn Storage) -> Self {
        Self {
            inner,
            journal: vec![],
        }
    }

    fn record(&mut self, key: &[u8]) {
        let previous = self.inner.get(key);
        self.journal.push((key.to_vec(), previous));
    }

    fn revert_to(&mut self, len: usize) {
        while self.journal.len() > len {
            let Some((key, previous)) = self.journal.pop() else {
                break;
            };
            match previous {
                Some(value) => self.inner.set(&key, &value),
                None => self.inner.remove(&key),
            }
        }
    }
}

impl Storage for JournaledStorage<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.get(key)
    }

    fn range<'b>(
        &'b self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        order: Order,
    ) -> Box<dyn Iterator<Item = Record> + 'b> {
        self.inner.range(start, end, order)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.record(key);
        self.inner.set(key, value);
    }

    fn remove(&mut self, key: &[u8]) {
        self.record(key);
        self.inner.remove(key);
    }
}

/// Handle to a point in the request that can be restored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnapshotId {
    journal_len: usize,
    events_len: usize,
}

/// Block header fields the protocol reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub height: u64,
    /// Seconds
    pub timestamp: u64,
}

pub struct StoreContext<'a> {
    storage: JournaledStorage<'a>,
    events: Vec<Event>,
    pub header: BlockHeader,
    pub own_chain_id: ChainId,
}

impl<'a> StoreContext<'a> {
    pub fn new(storage: &'a mut dyn Storage, env: &Env) -> StdResult<Self> {
        let own_chain_id = OWN_CHAIN_ACCOUNT.load(storage)?.chain_id;
        Ok(Self {
            storage: JournaledStorage::new(storage),
            events: vec![],
            header: BlockHeader {
                height: env.block.height,
                timestamp: env.block.time.seconds(),
            },
            own_chain_id,
        })
    }

    pub fn storage(&self) -> &dyn Storage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut dyn Storage {
        &mut self.storage
    }

    pub fn timestamp(&self) -> u64 {
        self.header.timestamp
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn create_snapshot(&self) -> SnapshotId {
        SnapshotId {
            journal_len: self.storage.journal.len(),
            events_len: self.events.len(),
        }
    }

    /// Undo every write and event since `snapshot`. Snapshots taken after it
    /// become invalid.
    pub fn restore_snapshot(&mut self, snapshot: SnapshotId) {
        self.storage.revert_to(snapshot.journal_len);
        self.events.truncate(snapshot.events_len);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use cosmwasm_std::testing::{mock_dependencies, mock_env};

    use crate::state::OwnChainAccount;

    pub const HUB: ChainId = [4, 0, 0, 0];

    pub fn save_own_chain(storage: &mut dyn Storage) {
        OWN_CHAIN_ACCOUNT
            .save(
                storage,
                &OwnChainAccount {
                    chain_id: HUB,
                    name: "hub".to_string(),
                    nonce: 0,
                },
            )
            .unwrap();
    }

    #[test]
    fn test_restore_undoes_writes_and_events() {
        let mut deps = mock_dependencies();
        save_own_chain(deps.as_mut().storage);
        deps.storage.set(b"kept", b"1");
        deps.storage.set(b"changed", b"old");

        let env = mock_env();
        let mut ctx = StoreContext::new(&mut deps.storage, &env).unwrap();
        assert_eq!(ctx.own_chain_id, HUB);
        ctx.emit(Event::new("before"));

        let snapshot = ctx.create_snapshot();
        ctx.storage_mut().set(b"changed", b"new");
        ctx.storage_mut().set(b"created", b"x");
        ctx.storage_mut().remove(b"kept");
        ctx.emit(Event::new("after"));
        assert_eq!(ctx.storage().get(b"changed"), Some(b"new".to_vec()));

        ctx.restore_snapshot(snapshot);
        assert_eq!(ctx.storage().get(b"changed"), Some(b"old".to_vec()));
        assert_eq!(ctx.storage().get(b"created"), None);
        assert_eq!(ctx.storage().get(b"kept"), Some(b"1".to_vec()));
        assert_eq!(ctx.events().len(), 1);
        assert_eq!(ctx.events()[0].ty, "before");
    }

    #[test]
    fn test_nested_snapshots() {
        let mut deps = mock_dependencies();
        save_own_chain(deps.as_mut().storage);
        let env = mock_env();
        let mut ctx = StoreContext::new(&mut deps.storage, &env).unwrap();

        let outer = ctx.create_snapshot();
        ctx.storage_mut().set(b"a", b"1");
        let inner = ctx.create_snapshot();
        ctx.storage_mut().set(b"a", b"2");
        ctx.storage_mut().set(b"b", b"2");

        ctx.restore_snapshot(inner);
        assert_eq!(ctx.storage().get(b"a"), Some(b"1".to_vec()));
        assert_eq!(ctx.storage().get(b"b"), None);

        ctx.restore_snapshot(outer);
        assert_eq!(ctx.storage().get(b"a"), None);
    }

    #[test]
    fn test_writes_survive_without_restore() {
        let mut deps = mock_dependencies();
        save_own_chain(deps.as_mut().storage);
        let env = mock_env();
        {
            let mut ctx = StoreContext::new(&mut deps.storage, &env).unwrap();
            let _ = ctx.create_snapshot();
            ctx.storage_mut().set(b"a", b"1");
        }
        assert_eq!(deps.storage.get(b"a"), Some(b"1".to_vec()));
    }
}
