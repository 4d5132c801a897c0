//! In-memory reference host (deterministic, no chain node).

use crate::error::HostError;
use crate::{ExecutionMode, HostApi, TxContext, RANDOMNESS_BLOCK_LEN};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

const DEFAULT_GAS_LIMIT: u64 = 10_000_000;

/// BTreeMap-backed host with a gas meter, event log, message outbox, and
/// randomness blocks derived as `SHA256(chain_seed || domain)`.
pub struct MemoryHost {
    state: BTreeMap<Vec<u8>, Vec<u8>>,
    events: Vec<(String, Vec<u8>)>,
    outbox: Vec<(Vec<u8>, Vec<u8>)>,
    gas_used: u64,
    gas_limit: u64,
    chain_seed: [u8; 32],
    fixed_block: Option<[u8; RANDOMNESS_BLOCK_LEN]>,
    ctx: TxContext,
    mode: ExecutionMode,
}

impl MemoryHost {
    pub fn new(ctx: TxContext) -> Self {
        Self {
            state: BTreeMap::new(),
            events: Vec::new(),
            outbox: Vec::new(),
            gas_used: 0,
            gas_limit: DEFAULT_GAS_LIMIT,
            chain_seed: [0u8; 32],
            fixed_block: None,
            ctx,
            mode: ExecutionMode::Transaction,
        }
    }

    /// Fixed dev context (tx hash `0x11..`, sender `alice`), checkpoint mode.
    pub fn dev() -> Self {
        let ctx = TxContext {
            tx_hash: vec![0x11; 32],
            sender: b"alice".to_vec(),
            timestamp_ms: 1_700_000_000_000,
            block_height: 42,
        };
        Self::new(ctx).with_mode(ExecutionMode::Checkpoint)
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_gas_limit(mut self, limit: u64) -> Self {
        self.gas_limit = limit;
        self
    }

    pub fn with_chain_seed(mut self, seed: [u8; 32]) -> Self {
        self.chain_seed = seed;
        self
    }

    /// Make every `randomness()` call return the same block. Used to
    /// reproduce pinned PRNG scenarios in tests.
    pub fn with_fixed_randomness(mut self, block: [u8; RANDOMNESS_BLOCK_LEN]) -> Self {
        self.fixed_block = Some(block);
        self
    }

    pub fn gas_used(&self) -> u64 {
        self.gas_used
    }

    pub fn events(&self) -> &[(String, Vec<u8>)] {
        &self.events
    }

    pub fn outbox(&self) -> &[(Vec<u8>, Vec<u8>)] {
        &self.outbox
    }

    pub fn take_outbox(&mut self) -> Vec<(Vec<u8>, Vec<u8>)> {
        std::mem::take(&mut self.outbox)
    }

    /// Advance the ambient block, as the chain would between invocations.
    pub fn advance_block(&mut self, blocks: u64, ms: u64) {
        self.ctx.block_height += blocks;
        self.ctx.timestamp_ms += ms;
    }
}

impl HostApi for MemoryHost {
    fn get_state(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, HostError> {
        Ok(self.state.get(key).cloned())
    }

    fn set_state(&mut self, key: &[u8], value: &[u8]) -> Result<(), HostError> {
        self.state.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete_state(&mut self, key: &[u8]) -> Result<(), HostError> {
        self.state.remove(key);
        Ok(())
    }

    fn emit_event(&mut self, topic: &str, payload: &[u8]) -> Result<(), HostError> {
        tracing::trace!(topic, len = payload.len(), "event emitted");
        self.events.push((topic.to_owned(), payload.to_vec()));
        Ok(())
    }

    fn charge_gas(&mut self, amount: u64) -> Result<(), HostError> {
        let next = self.gas_used.saturating_add(amount);
        if next > self.gas_limit {
            return Err(HostError::OutOfGas);
        }
        self.gas_used = next;
        Ok(())
    }

    fn randomness(&mut self, domain: &[u8]) -> Result<[u8; RANDOMNESS_BLOCK_LEN], HostError> {
        if let Some(block) = self.fixed_block {
            return Ok(block);
        }
        let mut hasher = Sha256::new();
        hasher.update(self.chain_seed);
        hasher.update(domain);
        Ok(hasher.finalize().into())
    }

    fn send_message(&mut self, address: &[u8], payload: &[u8]) -> Result<(), HostError> {
        tracing::debug!(
            address = %hex::encode(address),
            len = payload.len(),
            "message queued"
        );
        self.outbox.push((address.to_vec(), payload.to_vec()));
        Ok(())
    }

    fn context(&self) -> TxContext {
        self.ctx.clone()
    }

    fn execution_mode(&self) -> ExecutionMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── State ────────────────────────────────────────────────────

    #[test]
    fn state_set_get_delete() {
        let mut host = MemoryHost::dev();
        assert_eq!(host.get_state(b"k").unwrap(), None);
        host.set_state(b"k", b"v1").unwrap();
        assert_eq!(host.get_state(b"k").unwrap(), Some(b"v1".to_vec()));
        host.set_state(b"k", b"v2").unwrap();
        assert_eq!(host.get_state(b"k").unwrap(), Some(b"v2".to_vec()));
        host.delete_state(b"k").unwrap();
        assert_eq!(host.get_state(b"k").unwrap(), None);
    }

    #[test]
    fn delete_absent_key_is_idempotent() {
        let mut host = MemoryHost::dev();
        host.delete_state(b"missing").unwrap();
        host.delete_state(b"missing").unwrap();
    }

    // ── Gas ──────────────────────────────────────────────────────

    #[test]
    fn gas_meter_trips_at_limit() {
        let mut host = MemoryHost::dev().with_gas_limit(100);
        host.charge_gas(60).unwrap();
        host.charge_gas(40).unwrap();
        assert_eq!(host.gas_used(), 100);
        assert_eq!(host.charge_gas(1), Err(HostError::OutOfGas));
    }

    // ── Randomness ───────────────────────────────────────────────

    #[test]
    fn randomness_is_pure_in_seed_and_domain() {
        let mut a = MemoryHost::dev().with_chain_seed([7; 32]);
        let mut b = MemoryHost::dev().with_chain_seed([7; 32]);
        assert_eq!(a.randomness(b"d1").unwrap(), b.randomness(b"d1").unwrap());
        assert_ne!(a.randomness(b"d1").unwrap(), a.randomness(b"d2").unwrap());

        let mut c = MemoryHost::dev().with_chain_seed([8; 32]);
        assert_ne!(a.randomness(b"d1").unwrap(), c.randomness(b"d1").unwrap());
    }

    #[test]
    fn fixed_randomness_overrides_derivation() {
        let mut host = MemoryHost::dev().with_fixed_randomness([0x2a; 32]);
        assert_eq!(host.randomness(b"anything").unwrap(), [0x2a; 32]);
        assert_eq!(host.randomness(b"other").unwrap(), [0x2a; 32]);
    }

    // ── Events and messages ──────────────────────────────────────

    #[test]
    fn events_and_outbox_accumulate_in_order() {
        let mut host = MemoryHost::dev();
        host.emit_event("t1", b"a").unwrap();
        host.emit_event("t2", b"b").unwrap();
        host.send_message(b"addr", b"m1").unwrap();
        assert_eq!(host.events().len(), 2);
        assert_eq!(host.events()[0].0, "t1");
        assert_eq!(host.outbox().len(), 1);
        assert_eq!(host.take_outbox().len(), 1);
        assert!(host.outbox().is_empty());
    }
}
