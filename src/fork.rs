//! Fork — derive a child file from a prefix of a parent, computing
//! lineage identifiers (§4.G).

use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::container::{ContainerReader, ContainerWriter};
use crate::error::{GhostlineError, Result};
use crate::header::{run_id, ForkMeta};

/// Fork `source` at `at_step` (inclusive) into `sink`. Returns the sink so
/// callers can inspect or further write to it if needed.
pub fn fork<R: Read + Seek, W: Write + Seek>(source: R, at_step: u32, sink: W) -> Result<W> {
    let mut reader = ContainerReader::open(source)?;
    let frame_count = reader.frame_count();

    if frame_count == 0 || at_step >= frame_count {
        return Err(GhostlineError::StepOutOfRange { at_step, frame_count });
    }

    let frame0 = reader.get_frame(0)?;
    let parent_run_id = run_id(reader.header().started_at, &frame0.request_hash);

    let mut writer = ContainerWriter::open(
        sink,
        reader.header().started_at,
        reader.header().git_sha,
        Some(ForkMeta { parent_run_id, fork_at_step: at_step }),
    )?;

    for idx in 0..=at_step {
        let frame = if idx == 0 { frame0.clone() } else { reader.get_frame(idx)? };
        writer.append(&frame)?;
    }

    info!(at_step, frame_count = at_step + 1, "forked run");
    writer.finish()
}

/// Path-based convenience wrapper: `fork(source_path, at_step, output_path?)
/// -> output_path`. When `output_path` is omitted, the sibling
/// `<source>.fork-<at_step>.ghostline` is used.
pub fn fork_file(source_path: &Path, at_step: u32, output_path: Option<&Path>) -> Result<PathBuf> {
    let output_path = match output_path {
        Some(p) => p.to_path_buf(),
        None => default_fork_output_path(source_path, at_step),
    };

    let source = File::open(source_path)?;
    let sink = File::create(&output_path)?;
    fork(source, at_step, sink)?;
    Ok(output_path)
}

fn default_fork_output_path(source_path: &Path, at_step: u32) -> PathBuf {
    let stem = source_path.file_stem().and_then(|s| s.to_str()).unwrap_or("run");
    let dir = source_path.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("{stem}.fork-{at_step}.ghostline"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use std::io::Cursor;

    fn source_with_frames(n: u32) -> Vec<u8> {
        let mut writer = ContainerWriter::open(Cursor::new(Vec::new()), 7, None, None).unwrap();
        for i in 0..n {
            writer
                .append(&Frame::new(format!("req{i}").into_bytes(), format!("res{i}").into_bytes(), i as u64, i as u64))
                .unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn fork_prefix_preserves_frames_and_lineage() {
        let src_bytes = source_with_frames(5);
        let src_cursor = Cursor::new(src_bytes.clone());
        let out = fork(src_cursor, 2, Cursor::new(Vec::new())).unwrap().into_inner();

        let mut src_reader = ContainerReader::open(Cursor::new(src_bytes)).unwrap();
        let mut child_reader = ContainerReader::open(Cursor::new(out)).unwrap();

        assert_eq!(child_reader.frame_count(), 3);
        for i in 0..3u32 {
            assert_eq!(child_reader.get_frame(i).unwrap(), src_reader.get_frame(i).unwrap());
        }

        let expected_parent = run_id(src_reader.header().started_at, &src_reader.get_frame(0).unwrap().request_hash);
        let fork_meta = child_reader.header().fork.clone().unwrap();
        assert_eq!(fork_meta.parent_run_id, expected_parent);
        assert_eq!(fork_meta.fork_at_step, 2);
        assert_eq!(child_reader.header().started_at, src_reader.header().started_at);
    }

    #[test]
    fn fork_rejects_out_of_range_step() {
        let src_bytes = source_with_frames(5);
        let err = fork(Cursor::new(src_bytes), 5, Cursor::new(Vec::new())).unwrap_err();
        assert!(matches!(err, GhostlineError::StepOutOfRange { at_step: 5, frame_count: 5 }));
    }

    #[test]
    fn fork_rejects_empty_source() {
        let src_bytes = source_with_frames(0);
        let err = fork(Cursor::new(src_bytes), 0, Cursor::new(Vec::new())).unwrap_err();
        assert!(matches!(err, GhostlineError::StepOutOfRange { at_step: 0, frame_count: 0 }));
    }
}
