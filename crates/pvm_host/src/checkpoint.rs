//! Suspension primitive seam.
//!
//! The native checkpoint module persists the executing call boundary and
//! exits the invocation; resumption re-enters the contract entry point from
//! the top. The module may be entirely absent in non-checkpoint execution
//! modes, so callers hold an `Option<&mut dyn CheckpointProvider>`.

use crate::error::HostError;

pub trait CheckpointProvider {
    /// Persist the current call boundary and signal the host to suspend.
    ///
    /// Returning `Ok(())` means the suspension was recorded; the caller must
    /// then end the invocation and wait for re-entry.
    fn checkpoint(&mut self) -> Result<(), HostError>;
}

/// Reference provider: counts how many times the primitive fired.
///
/// Stands in for the native module in tests and local embeddings.
#[derive(Debug, Default)]
pub struct CountingCheckpoint {
    pub taken: u32,
}

impl CountingCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointProvider for CountingCheckpoint {
    fn checkpoint(&mut self) -> Result<(), HostError> {
        self.taken += 1;
        tracing::debug!(taken = self.taken, "checkpoint taken");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_invocations() {
        let mut cp = CountingCheckpoint::new();
        assert_eq!(cp.taken, 0);
        cp.checkpoint().unwrap();
        cp.checkpoint().unwrap();
        assert_eq!(cp.taken, 2);
    }
}
