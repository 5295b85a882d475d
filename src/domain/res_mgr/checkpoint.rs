use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::domain::pledge::Pledge;
use crate::error::{Error, Result};

const CKPT_PREFIX: &str = "resmgr.ckpt.";

/// Checkpoints older than this are unlinked even when within the keep
/// count.
const MAX_CKPT_AGE: Duration = Duration::from_secs(90 * 24 * 3600);

fn ckpt_path(dir: &str, seq: u64) -> PathBuf {
    Path::new(dir).join(format!("{}{:06}", CKPT_PREFIX, seq))
}

/// One past the highest suffix already present, so restarts keep the
/// sequence monotone.
pub fn next_seq(dir: &str) -> u64 {
    let Ok(entries) = fs::read_dir(dir) else {
        return 1;
    };

    let mut max = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(suffix) = name.to_string_lossy().strip_prefix(CKPT_PREFIX).map(|s| s.to_string()) else {
            continue;
        };
        if let Ok(seq) = suffix.parse::<u64>() {
            max = max.max(seq);
        }
    }

    max + 1
}

/// Serialises the inventory, one self-describing JSON pledge per line.
/// Returns the file written.
pub fn write_checkpoint<'a>(pledges: impl Iterator<Item = &'a Pledge>, dir: &str, seq: u64) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| Error::CheckpointWriteFailed(format!("{}: {}", dir, e)))?;

    let path = ckpt_path(dir, seq);
    let mut file = fs::File::create(&path).map_err(|e| Error::CheckpointWriteFailed(format!("{}: {}", path.display(), e)))?;

    for pledge in pledges {
        let line = serde_json::to_string(pledge).map_err(|e| Error::CheckpointWriteFailed(e.to_string()))?;
        writeln!(file, "{}", line).map_err(|e| Error::CheckpointWriteFailed(format!("{}: {}", path.display(), e)))?;
    }

    Ok(path)
}

/// Unlinks all but the `keep` most recent checkpoints, and anything past
/// the age ceiling regardless.
pub fn prune(dir: &str, keep: usize) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    let mut ckpts: Vec<(u64, PathBuf)> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            let seq = name.strip_prefix(CKPT_PREFIX)?.parse::<u64>().ok()?;
            Some((seq, entry.path()))
        })
        .collect();

    ckpts.sort_by_key(|(seq, _)| *seq);

    let cutoff = ckpts.len().saturating_sub(keep);
    let now = SystemTime::now();

    for (i, (_, path)) in ckpts.iter().enumerate() {
        let too_old = fs::metadata(path)
            .and_then(|m| m.modified())
            .map(|mtime| now.duration_since(mtime).unwrap_or_default() > MAX_CKPT_AGE)
            .unwrap_or(false);

        if i < cutoff || too_old {
            if let Err(e) = fs::remove_file(path) {
                log::warn!("could not remove old checkpoint {}: {}", path.display(), e);
            }
        }
    }
}

/// Reads a checkpoint back. Expired pledges are dropped; lines that do not
/// parse (unknown ptype, trailing garbage) are skipped with a warning so one
/// bad record never sinks the rest.
pub fn load_checkpoint(file: &str, now: i64) -> Result<Vec<Pledge>> {
    let data = fs::read_to_string(file).map_err(Error::IoError)?;
    let mut pledges = Vec::new();

    for (lineno, line) in data.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Pledge>(line) {
            Ok(pledge) => {
                if pledge.is_expired(now) {
                    log::debug!("checkpoint line {}: {} expired; dropped", lineno + 1, pledge.name());
                    continue;
                }
                pledges.push(pledge);
            }
            Err(e) => {
                log::warn!("checkpoint line {}: unparsable record skipped: {}", lineno + 1, e);
            }
        }
    }

    Ok(pledges)
}
