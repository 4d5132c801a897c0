//! Runner bridge: issue external jobs (LLM, HTTP) and await their results
//! through checkpoint suspension.
//!
//! The await is not scheduling, it is sugar over poll/send/suspend: look for
//! a cached result keyed by the deterministic continuation id; if absent,
//! send the job message and checkpoint. The next invocation re-derives the
//! same id and polls again. A result is consumed at most once (read deletes
//! it); the job message may be sent more than once across resumptions —
//! the runner de-duplicates on cid.

use crate::codec;
use crate::continuation::{new_cid, ContinuationId};
use crate::error::{Result, SdkError};
use crate::value::{Capture, Value};
use pvm_host::{CheckpointProvider, ExecutionMode, HostApi};

/// Well-known address the runner subsystem listens on.
pub const RUNNER_ADDRESS: &[u8] = b"__pvm_runner__";

/// Reserved state-key prefix under which the runner writes results.
pub const RUNNER_RESULT_PREFIX: &[u8] = b"__runner_result:";

pub const RUNNER_JOB_KIND: &str = "runner_job";

/// Resumption routine named in outgoing job messages: the contract entry
/// point, since resumption always re-enters from the top.
pub const REPLY_HANDLER: &str = "main";

/// Outcome of an await: either the result arrived, or the invocation was
/// checkpointed and must end now. Suspension is normal control flow, not an
/// error — the embedding exits on `Suspended` and re-invokes later.
#[derive(Debug, Clone, PartialEq)]
pub enum Awaited {
    Ready(Value),
    Suspended(ContinuationId),
}

/// Issue an LLM job and await its result.
pub fn llm(
    host: &mut dyn HostApi,
    checkpoint: Option<&mut dyn CheckpointProvider>,
    args: &[Value],
    kwargs: &Capture,
) -> Result<Awaited> {
    call(host, checkpoint, "llm", args, kwargs)
}

/// Issue an HTTP job and await its result.
pub fn http(
    host: &mut dyn HostApi,
    checkpoint: Option<&mut dyn CheckpointProvider>,
    args: &[Value],
    kwargs: &Capture,
) -> Result<Awaited> {
    call(host, checkpoint, "http", args, kwargs)
}

/// Shared poll/send/suspend sequence for any job type.
pub fn call(
    host: &mut dyn HostApi,
    checkpoint: Option<&mut dyn CheckpointProvider>,
    job_type: &str,
    args: &[Value],
    kwargs: &Capture,
) -> Result<Awaited> {
    let cid = new_cid(host, job_type);
    if let Some(result) = try_get_result(host, &cid)? {
        tracing::debug!(cid = %cid, job_type, "runner result consumed");
        return Ok(Awaited::Ready(result));
    }

    if host.execution_mode() != ExecutionMode::Checkpoint {
        return Err(SdkError::CheckpointModeRequired);
    }
    let Some(cp) = checkpoint else {
        return Err(SdkError::CheckpointUnavailable);
    };

    let payload = job_message(&cid, job_type, args, kwargs)?;
    host.send_message(RUNNER_ADDRESS, &payload)?;
    tracing::debug!(cid = %cid, job_type, "runner job sent, checkpointing");
    cp.checkpoint()?;
    Ok(Awaited::Suspended(cid))
}

/// State key under which the runner subsystem delivers the result for `cid`.
pub fn result_key(cid: &ContinuationId) -> Vec<u8> {
    let mut key = Vec::with_capacity(RUNNER_RESULT_PREFIX.len() + 32);
    key.extend_from_slice(RUNNER_RESULT_PREFIX);
    key.extend_from_slice(cid.as_bytes());
    key
}

/// Read-and-delete poll: `None` means "still pending", which is not an
/// error. A present result is removed immediately so it is consumed at most
/// once.
pub(crate) fn try_get_result(
    host: &mut dyn HostApi,
    cid: &ContinuationId,
) -> Result<Option<Value>> {
    let key = result_key(cid);
    let Some(raw) = host.get_state(&key)? else {
        return Ok(None);
    };
    host.delete_state(&key)?;
    Ok(Some(codec::decode_payload(&raw)?))
}

fn job_message(
    cid: &ContinuationId,
    job_type: &str,
    args: &[Value],
    kwargs: &Capture,
) -> Result<Vec<u8>> {
    let payload = Capture::new()
        .with("args", Value::Seq(args.to_vec()))
        .with("kwargs", kwargs.clone());
    let message = Capture::new()
        .with("kind", RUNNER_JOB_KIND)
        .with("job_type", job_type)
        .with("payload", payload)
        .with("cid", Value::bytes(cid.as_bytes().to_vec()))
        .with("reply_handler", REPLY_HANDLER);
    codec::encode_payload(&Value::from(message))
}
