//! Host bridge surface consumed by PVM contract code.
//!
//! The chain node implements [`HostApi`]; the SDK only calls through it.
//! [`MemoryHost`] is the in-memory reference implementation used by tests
//! and local embeddings.

pub mod checkpoint;
pub mod error;
pub mod memory;

pub use checkpoint::{CheckpointProvider, CountingCheckpoint};
pub use error::HostError;
pub use memory::MemoryHost;

use serde::{Deserialize, Serialize};

/// Number of bytes in one host randomness block.
pub const RANDOMNESS_BLOCK_LEN: usize = 32;

/// Ambient transaction context, as returned by the host's `context()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxContext {
    pub tx_hash: Vec<u8>,
    pub sender: Vec<u8>,
    pub timestamp_ms: u64,
    pub block_height: u64,
}

/// How the current invocation may terminate.
///
/// Checkpoint-based suspension (the runner/actor bridges) is only available
/// under `Checkpoint`; a plain `Transaction` runs to completion or aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Transaction,
    Checkpoint,
}

/// Primitive operations backed by the deterministic ledger/storage layer.
///
/// All state reads and writes within one invocation are sequential; the
/// ledger serializes transactions, so implementations need no internal
/// locking for contract-visible state.
pub trait HostApi {
    fn get_state(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, HostError>;
    fn set_state(&mut self, key: &[u8], value: &[u8]) -> Result<(), HostError>;
    /// Idempotent: deleting an absent key succeeds.
    fn delete_state(&mut self, key: &[u8]) -> Result<(), HostError>;
    fn emit_event(&mut self, topic: &str, payload: &[u8]) -> Result<(), HostError>;
    fn charge_gas(&mut self, amount: u64) -> Result<(), HostError>;
    /// One block of deterministic randomness for `domain`. The same domain
    /// always yields the same block within a chain.
    fn randomness(&mut self, domain: &[u8]) -> Result<[u8; RANDOMNESS_BLOCK_LEN], HostError>;
    fn send_message(&mut self, address: &[u8], payload: &[u8]) -> Result<(), HostError>;
    fn context(&self) -> TxContext;
    fn execution_mode(&self) -> ExecutionMode;
}
