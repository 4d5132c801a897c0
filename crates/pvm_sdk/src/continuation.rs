//! Durable continuation records keyed by deterministic 32-byte ids.
//!
//! The id is a pure function of the ambient transaction context plus a
//! call-site discriminator, so the same logical call site re-executed after
//! a checkpoint recomputes the same id and finds its own prior record.
//! Records live under the reserved `__continuation:` key prefix; nothing
//! outside this SDK may write there.

use crate::codec;
use crate::error::{Result, SdkError};
use crate::value::{Capture, Value};
use pvm_host::{HostApi, TxContext};
use sha2::{Digest, Sha256};
use std::fmt;

/// Reserved state-key prefix for continuation records.
pub const CONTINUATION_PREFIX: &[u8] = b"__continuation:";

/// 32-byte continuation id: `SHA256(tx_hash || sender || utf8(name))`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContinuationId([u8; 32]);

impl ContinuationId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive the id for `name` under the given transaction context.
    pub fn derive(ctx: &TxContext, name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(&ctx.tx_hash);
        hasher.update(&ctx.sender);
        hasher.update(name.as_bytes());
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for ContinuationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

// Debug prints the hex form; the raw array is noise in logs.
impl fmt::Debug for ContinuationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContinuationId({self})")
    }
}

/// Derive a continuation id from the host's ambient context.
pub fn new_cid(host: &dyn HostApi, name: &str) -> ContinuationId {
    ContinuationId::derive(&host.context(), name)
}

/// One durable record per continuation id; a second save overwrites.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuationRecord {
    /// Caller-defined program-counter/step marker.
    pub state: i64,
    /// Caller-defined context, restored verbatim on load.
    pub ctx: Capture,
    /// Identifier of the resumption routine.
    pub handler: String,
    /// Carried as data only; nothing in this layer expires continuations.
    pub timeout_blocks: u64,
    /// Carried as data only; staleness checks are the caller's business.
    pub guard_unchanged: Option<Value>,
}

impl ContinuationRecord {
    pub fn new(state: i64, ctx: Capture, handler: impl Into<String>) -> Self {
        Self {
            state,
            ctx,
            handler: handler.into(),
            timeout_blocks: 0,
            guard_unchanged: None,
        }
    }

    pub fn with_timeout_blocks(mut self, blocks: u64) -> Self {
        self.timeout_blocks = blocks;
        self
    }

    pub fn with_guard(mut self, guard: Value) -> Self {
        self.guard_unchanged = Some(guard);
        self
    }
}

fn cont_key(cid: &ContinuationId) -> Vec<u8> {
    let mut key = Vec::with_capacity(CONTINUATION_PREFIX.len() + 32);
    key.extend_from_slice(CONTINUATION_PREFIX);
    key.extend_from_slice(cid.as_bytes());
    key
}

/// Persist `record` under `cid`, unconditionally overwriting any prior
/// record for the same id.
pub fn save_cont(
    host: &mut dyn HostApi,
    cid: &ContinuationId,
    record: &ContinuationRecord,
) -> Result<()> {
    let mut body = serde_json::Map::with_capacity(5);
    body.insert("state".to_owned(), serde_json::Value::from(record.state));
    body.insert(
        "ctx".to_owned(),
        codec::encode_value(&Value::Map(record.ctx.as_map().clone())),
    );
    body.insert(
        "handler".to_owned(),
        serde_json::Value::String(record.handler.clone()),
    );
    body.insert(
        "timeout_blocks".to_owned(),
        serde_json::Value::from(record.timeout_blocks),
    );
    body.insert(
        "guard_unchanged".to_owned(),
        match &record.guard_unchanged {
            Some(guard) => codec::encode_value(guard),
            None => serde_json::Value::Null,
        },
    );
    let bytes = codec::encode_json(&serde_json::Value::Object(body))?;
    host.set_state(&cont_key(cid), &bytes)?;
    tracing::debug!(cid = %cid, state = record.state, handler = %record.handler, "continuation saved");
    Ok(())
}

/// Load the record for `cid`. A missing record is fatal: it means the
/// continuation was never saved or the id derivation diverged.
pub fn load_cont(host: &mut dyn HostApi, cid: &ContinuationId) -> Result<ContinuationRecord> {
    let raw = host
        .get_state(&cont_key(cid))?
        .ok_or(SdkError::ContinuationMissing)?;
    let parsed = codec::decode_json(&raw)?;
    let obj = parsed
        .as_object()
        .ok_or_else(|| SdkError::Decode("continuation record must be an object".into()))?;

    let state = obj
        .get("state")
        .and_then(serde_json::Value::as_i64)
        .ok_or_else(|| SdkError::Decode("continuation record: bad 'state'".into()))?;
    let handler = obj
        .get("handler")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| SdkError::Decode("continuation record: bad 'handler'".into()))?
        .to_owned();
    let timeout_blocks = obj
        .get("timeout_blocks")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| SdkError::Decode("continuation record: bad 'timeout_blocks'".into()))?;

    let ctx_value = obj
        .get("ctx")
        .ok_or_else(|| SdkError::Decode("continuation record: missing 'ctx'".into()))?;
    let ctx = match codec::decode_value(ctx_value)? {
        Value::Map(map) => Capture::from_map(map),
        _ => return Err(SdkError::Decode("continuation record: 'ctx' must be a map".into())),
    };

    let guard_unchanged = match obj.get("guard_unchanged") {
        None | Some(serde_json::Value::Null) => None,
        Some(guard) => Some(codec::decode_value(guard)?),
    };

    tracing::debug!(cid = %cid, state, handler = %handler, "continuation loaded");
    Ok(ContinuationRecord {
        state,
        ctx,
        handler,
        timeout_blocks,
        guard_unchanged,
    })
}

/// Remove the record for `cid`; safe on an absent id.
pub fn delete_cont(host: &mut dyn HostApi, cid: &ContinuationId) -> Result<()> {
    host.delete_state(&cont_key(cid))?;
    tracing::debug!(cid = %cid, "continuation deleted");
    Ok(())
}
