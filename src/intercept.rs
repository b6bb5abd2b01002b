//! Interception layer — the seam between a caller's request/response pair
//! and an active recording or replaying session (§4.H, §9).
//!
//! A single process-wide session slot is guarded by a mutex: at most one
//! [`Recorder`] or [`Replayer`] is active at a time, mirroring the global
//! `_active_recorder` / `_active_replayer` slot of the reference SDK's
//! context module. Callers never touch the slot directly; they call
//! [`begin_recording`] / [`begin_replaying`] / [`end_session`] / [`intercept`].

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use serde_json::Value;
use tracing::warn;

use crate::error::{GhostlineError, Result};
use crate::recorder::{Recorder, RecorderConfig};
use crate::replayer::Replayer;

/// Anything that can actually perform the outbound call when there is no
/// replay hit to serve instead. Production callers implement this over
/// their real HTTP client; tests implement it over a canned response.
pub trait CallAdapter {
    fn invoke(&self, request_bytes: &[u8]) -> Result<Vec<u8>>;
}

/// Canonicalize JSON-shaped call arguments into sorted-key UTF-8 bytes, the
/// same request representation the reference SDK produces with
/// `json.dumps(kwargs, sort_keys=True, default=str)`. `serde_json::Value`'s
/// object variant is a `BTreeMap` (the `preserve_order` feature is not
/// enabled), so ordinary serialization already emits keys in sorted order
/// at every nesting level.
pub fn canonicalize_request(value: &Value) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| GhostlineError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())))
}

enum ActiveSession {
    Idle,
    Recording(Recorder<File>),
    Replaying(Replayer<File>),
}

static SESSION: Mutex<ActiveSession> = Mutex::new(ActiveSession::Idle);

/// Open a recording session writing to `path`, replacing any prior session.
pub fn begin_recording(path: impl AsRef<Path>, config: RecorderConfig) -> Result<()> {
    let path: PathBuf = path.as_ref().to_path_buf();
    let mut recorder = Recorder::new(config, move || File::create(&path));
    recorder.start()?;

    let mut guard = SESSION.lock().expect("session mutex poisoned");
    end_session_locked(&mut guard)?;
    *guard = ActiveSession::Recording(recorder);
    Ok(())
}

/// Open a replaying session reading from `path`, replacing any prior session.
pub fn begin_replaying(path: impl AsRef<Path>) -> Result<()> {
    let path: PathBuf = path.as_ref().to_path_buf();
    let mut replayer = Replayer::new(move || File::open(&path));
    replayer.start()?;

    let mut guard = SESSION.lock().expect("session mutex poisoned");
    end_session_locked(&mut guard)?;
    *guard = ActiveSession::Replaying(replayer);
    Ok(())
}

/// Close whatever session is active. Idempotent.
pub fn end_session() -> Result<()> {
    let mut guard = SESSION.lock().expect("session mutex poisoned");
    end_session_locked(&mut guard)
}

fn end_session_locked(guard: &mut ActiveSession) -> Result<()> {
    match std::mem::replace(guard, ActiveSession::Idle) {
        ActiveSession::Idle => Ok(()),
        ActiveSession::Recording(mut recorder) => recorder.stop(),
        ActiveSession::Replaying(mut replayer) => {
            replayer.stop();
            Ok(())
        }
    }
}

/// The canonical interception point: given an already-canonicalized request
/// and an adapter that knows how to make the real call, resolve a response
/// either from the replay cache or by invoking `adapter` and recording the
/// result, depending on which session is active.
///
/// With no active session, `adapter` is invoked directly and nothing is
/// recorded — interception is opt-in.
pub fn intercept(request_bytes: &[u8], adapter: &dyn CallAdapter) -> Result<Vec<u8>> {
    let mut guard = SESSION.lock().expect("session mutex poisoned");
    match &mut *guard {
        ActiveSession::Idle => adapter.invoke(request_bytes),
        ActiveSession::Replaying(replayer) => match replayer.lookup(request_bytes)? {
            Some(response) => Ok(response),
            None => {
                warn!("replay miss, no recorded frame for this request");
                Err(GhostlineError::CacheMiss)
            }
        },
        ActiveSession::Recording(recorder) => {
            let started = Instant::now();
            let response_bytes = adapter.invoke(request_bytes)?;
            let latency_ms = started.elapsed().as_millis() as u64;
            recorder.capture(request_bytes, &response_bytes, latency_ms)?;
            Ok(response_bytes)
        }
    }
}
