//! Contract-side SDK for the PVM continuation/checkpoint execution model.
//!
//! A long-running contract suspends by persisting a continuation record
//! keyed by a deterministic id, checkpointing, and exiting; the next
//! invocation re-derives the same id from the ambient transaction context
//! and picks up where it left off.

pub mod actor;
pub mod codec;
pub mod continuation;
pub mod error;
pub mod random;
pub mod runner;
pub mod value;
pub mod verify;

pub use continuation::{
    delete_cont, load_cont, new_cid, save_cont, ContinuationId, ContinuationRecord,
};
pub use error::{Result, SdkError};
pub use random::{PvmRng, RngState, Seed};
pub use runner::{http, llm, Awaited};
pub use value::{Capture, Value};
pub use verify::{
    json_schema_valid, majority_vote, structured_match, Check, VerifyBuilder, VerifyPolicy,
};
