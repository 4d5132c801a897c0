//! Actor bridge: asynchronous calls to other actors, awaited through the
//! same poll/send/checkpoint sequence as runner jobs, with a narrower
//! surface: the caller names the target address and method, and replies
//! arrive under the shared result namespace keyed by cid.

use crate::codec;
use crate::continuation::new_cid;
use crate::error::{Result, SdkError};
use crate::runner::{self, Awaited, REPLY_HANDLER};
use crate::value::{Capture, Value};
use pvm_host::{CheckpointProvider, ExecutionMode, HostApi};

pub const ACTOR_CALL_KIND: &str = "actor_call";

/// Call `method` on the actor at `target` and await the reply. Only valid
/// under checkpoint execution mode.
pub fn async_call(
    host: &mut dyn HostApi,
    checkpoint: Option<&mut dyn CheckpointProvider>,
    target: &[u8],
    method: &str,
    args: &[Value],
    kwargs: &Capture,
) -> Result<Awaited> {
    if host.execution_mode() != ExecutionMode::Checkpoint {
        return Err(SdkError::CheckpointModeRequired);
    }

    let cid = new_cid(host, method);
    if let Some(result) = runner::try_get_result(host, &cid)? {
        tracing::debug!(cid = %cid, method, "actor reply consumed");
        return Ok(Awaited::Ready(result));
    }

    let Some(cp) = checkpoint else {
        return Err(SdkError::CheckpointUnavailable);
    };

    let payload = Capture::new()
        .with("args", Value::Seq(args.to_vec()))
        .with("kwargs", kwargs.clone());
    let message = Capture::new()
        .with("kind", ACTOR_CALL_KIND)
        .with("method", method)
        .with("payload", payload)
        .with("cid", Value::bytes(cid.as_bytes().to_vec()))
        .with("reply_handler", REPLY_HANDLER);
    let bytes = codec::encode_payload(&Value::from(message))?;
    host.send_message(target, &bytes)?;
    tracing::debug!(cid = %cid, method, "actor call sent, checkpointing");
    cp.checkpoint()?;
    Ok(Awaited::Suspended(cid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pvm_host::{CountingCheckpoint, MemoryHost};

    const TARGET: &[u8] = b"escrow-actor";

    #[test]
    fn call_sends_to_target_and_suspends() {
        let mut host = MemoryHost::dev();
        let mut cp = CountingCheckpoint::new();
        let args = [Value::Int(250)];
        let out = async_call(
            &mut host,
            Some(&mut cp),
            TARGET,
            "release_funds",
            &args,
            &Capture::new(),
        )
        .unwrap();

        assert_eq!(out, Awaited::Suspended(new_cid(&host, "release_funds")));
        assert_eq!(cp.taken, 1);
        assert_eq!(host.outbox().len(), 1);
        assert_eq!(host.outbox()[0].0, TARGET);
        let sent = String::from_utf8(host.outbox()[0].1.clone()).unwrap();
        assert!(sent.contains(r#""kind":"actor_call""#), "sent: {sent}");
        assert!(sent.contains(r#""method":"release_funds""#), "sent: {sent}");
    }

    #[test]
    fn reply_is_consumed_exactly_once() {
        let mut host = MemoryHost::dev();
        let cid = new_cid(&host, "release_funds");
        let reply = codec::encode_payload(&Value::str("released")).unwrap();
        host.set_state(&runner::result_key(&cid), &reply).unwrap();

        let out = async_call(&mut host, None, TARGET, "release_funds", &[], &Capture::new())
            .unwrap();
        assert_eq!(out, Awaited::Ready(Value::str("released")));
        assert_eq!(host.get_state(&runner::result_key(&cid)).unwrap(), None);
        assert!(host.outbox().is_empty());
    }

    #[test]
    fn mode_gate_applies_before_polling() {
        let mut host = MemoryHost::dev().with_mode(ExecutionMode::Transaction);
        let cid = new_cid(&host, "release_funds");
        let reply = codec::encode_payload(&Value::str("released")).unwrap();
        host.set_state(&runner::result_key(&cid), &reply).unwrap();

        // Unlike the runner, async_call is only valid under checkpoint mode,
        // so even a cached reply does not rescue a transaction-mode call.
        let err = async_call(&mut host, None, TARGET, "release_funds", &[], &Capture::new())
            .unwrap_err();
        assert!(matches!(err, SdkError::CheckpointModeRequired), "got: {err}");
        assert!(host.get_state(&runner::result_key(&cid)).unwrap().is_some());
    }

    #[test]
    fn absent_checkpoint_module_is_fatal() {
        let mut host = MemoryHost::dev();
        let err =
            async_call(&mut host, None, TARGET, "ping", &[], &Capture::new()).unwrap_err();
        assert!(matches!(err, SdkError::CheckpointUnavailable), "got: {err}");
    }
}
