//! Recorder session lifecycle: `Idle → Open → Idle`. Wraps a
//! [`ContainerWriter`], applies scrubbing inline, and assigns timestamps
//! (§4.E).

use std::io::{Seek, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::container::ContainerWriter;
use crate::error::{GhostlineError, Result};
use crate::frame::Frame;
use crate::header::{ForkMeta, GIT_SHA_LEN};
use crate::scrub::{ScrubConfig, Scrubber};

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_millis() as u64
}

/// Configuration for a [`Recorder`]: optional git SHA, fork lineage, and
/// scrubbing configuration. `fork` bundles `parent_run_id`/`fork_at_step`
/// together so they can't be set independently of one another.
#[derive(Default)]
pub struct RecorderConfig {
    pub git_sha: Option<[u8; GIT_SHA_LEN]>,
    pub fork: Option<ForkMeta>,
    pub scrub: Option<ScrubConfig>,
}

enum SessionState<W: Write + Seek> {
    Idle,
    Open { writer: ContainerWriter<W>, scrubber: Option<Scrubber> },
}

pub struct Recorder<W: Write + Seek> {
    state: SessionState<W>,
    config: RecorderConfig,
    sink_factory: Box<dyn FnMut() -> std::io::Result<W>>,
}

impl<W: Write + Seek> Recorder<W> {
    /// `sink_factory` opens a fresh sink each time `start` is called,
    /// matching "reopen after `stop` is permitted" (§4.C session state).
    pub fn new(config: RecorderConfig, sink_factory: impl FnMut() -> std::io::Result<W> + 'static) -> Self {
        Self { state: SessionState::Idle, config, sink_factory: Box::new(sink_factory) }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open { .. })
    }

    /// Idempotent if already `Open`.
    pub fn start(&mut self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }
        let started_at = now_ms();
        let sink = (self.sink_factory)()?;
        let writer = ContainerWriter::open(sink, started_at, self.config.git_sha, self.config.fork.clone())?;
        let scrubber = self.config.scrub.as_ref().map(Scrubber::new);
        info!(started_at, "recorder started");
        self.state = SessionState::Open { writer, scrubber };
        Ok(())
    }

    /// Requires `Open`; fails with `NotStarted` otherwise.
    pub fn capture(&mut self, request_bytes: &[u8], response_bytes: &[u8], latency_ms: u64) -> Result<()> {
        let SessionState::Open { writer, scrubber } = &mut self.state else {
            return Err(GhostlineError::NotStarted);
        };

        let (request_bytes, response_bytes) = match scrubber {
            Some(s) => (s.scrub(request_bytes), s.scrub(response_bytes)),
            None => (request_bytes.to_vec(), response_bytes.to_vec()),
        };

        let timestamp = now_ms();
        let frame = Frame::new(request_bytes, response_bytes, latency_ms, timestamp);
        debug!(latency_ms, timestamp, "captured frame");
        writer.append(&frame)
    }

    /// Idempotent if already `Idle`.
    pub fn stop(&mut self) -> Result<()> {
        let state = std::mem::replace(&mut self.state, SessionState::Idle);
        if let SessionState::Open { writer, .. } = state {
            writer.finish()?;
            info!("recorder stopped");
        }
        Ok(())
    }
}

impl<W: Write + Seek> Drop for Recorder<W> {
    fn drop(&mut self) {
        // Best-effort: `stop` during an in-flight capture is the caller's
        // responsibility to fence (§5); Drop does not retry on failure.
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerReader;
    use std::io::{Cursor, SeekFrom};
    use std::sync::{Arc, Mutex};

    /// A `Write + Seek` sink over a shared buffer, so a test can inspect
    /// what a `Recorder` wrote after `stop()` drops the `ContainerWriter`.
    struct SharedSink {
        buf: Arc<Mutex<Vec<u8>>>,
        pos: u64,
    }

    impl Write for SharedSink {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            let mut buf = self.buf.lock().unwrap();
            let end = self.pos as usize + data.len();
            if buf.len() < end {
                buf.resize(end, 0);
            }
            buf[self.pos as usize..end].copy_from_slice(data);
            self.pos = end as u64;
            Ok(data.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Seek for SharedSink {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            let len = self.buf.lock().unwrap().len() as u64;
            self.pos = match pos {
                SeekFrom::Start(p) => p,
                SeekFrom::End(p) => (len as i64 + p) as u64,
                SeekFrom::Current(p) => (self.pos as i64 + p) as u64,
            };
            Ok(self.pos)
        }
    }

    fn recorder_over_shared(
        config: RecorderConfig,
    ) -> (Recorder<SharedSink>, Arc<Mutex<Vec<u8>>>) {
        let storage = Arc::new(Mutex::new(Vec::new()));
        let storage_for_factory = storage.clone();
        let recorder =
            Recorder::new(config, move || Ok(SharedSink { buf: storage_for_factory.clone(), pos: 0 }));
        (recorder, storage)
    }

    #[test]
    fn capture_without_start_fails() {
        let (mut recorder, _storage) = recorder_over_shared(RecorderConfig::default());
        let err = recorder.capture(b"req", b"res", 1).unwrap_err();
        assert!(matches!(err, GhostlineError::NotStarted));
    }

    #[test]
    fn capture_after_start_then_stop_is_readable() {
        let (mut recorder, storage) = recorder_over_shared(RecorderConfig::default());
        recorder.start().unwrap();
        recorder.capture(b"my request", b"my response", 42).unwrap();
        recorder.stop().unwrap();

        let bytes = storage.lock().unwrap().clone();
        let mut reader = ContainerReader::open(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.frame_count(), 1);
        assert_eq!(reader.get_frame(0).unwrap().response_bytes, b"my response");
    }

    #[test]
    fn scrubbing_redacts_before_write() {
        let (mut recorder, storage) =
            recorder_over_shared(RecorderConfig { scrub: Some(ScrubConfig::default()), ..Default::default() });
        recorder.start().unwrap();
        recorder
            .capture(
                br#"{"api_key":"sk-ant-REDACTED","prompt":"hello"}"#,
                br#"{"text":"hi","meta":{"email":"user@test.com"}}"#,
                1,
            )
            .unwrap();
        recorder.stop().unwrap();

        let bytes = storage.lock().unwrap().clone();
        let mut reader = ContainerReader::open(Cursor::new(bytes)).unwrap();
        let frame = reader.get_frame(0).unwrap();
        let req_text = String::from_utf8(frame.request_bytes).unwrap();
        let resp_text = String::from_utf8(frame.response_bytes).unwrap();
        assert!(req_text.contains("[REDACTED_ANTHROPIC_KEY]"));
        assert!(req_text.contains("hello"));
        assert!(!req_text.contains("sk-ant-"));
        assert!(resp_text.contains("[REDACTED_EMAIL]"));
        assert!(resp_text.contains("hi"));
        assert!(!resp_text.contains("@test.com"));
    }

    #[test]
    fn start_is_idempotent() {
        let (mut recorder, _storage) = recorder_over_shared(RecorderConfig::default());
        recorder.start().unwrap();
        recorder.start().unwrap();
        assert!(recorder.is_open());
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut recorder, _storage) = recorder_over_shared(RecorderConfig::default());
        recorder.start().unwrap();
        recorder.stop().unwrap();
        recorder.stop().unwrap();
        assert!(!recorder.is_open());
    }
}
