//! Output freshness checks for memoized commands

use crate::error::{ExecutionError, ExecutionResult};
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Whether `creates` is up to date.
///
/// The output must exist. With no sources that is enough; otherwise no file
/// matched by a source pattern may be newer than the output.
pub fn is_fresh(creates: &Path, sources: &[String]) -> ExecutionResult<bool> {
    let output = match fs::metadata(creates) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(source) => {
            return Err(ExecutionError::Freshness {
                path: creates.to_path_buf(),
                source,
            })
        }
    };

    if sources.is_empty() {
        return Ok(true);
    }

    let output_time = modified(creates, output.modified())?;

    for pattern in sources {
        let entries = glob::glob(pattern).map_err(|e| ExecutionError::Pattern {
            pattern: pattern.clone(),
            error: e.to_string(),
        })?;
        for entry in entries {
            let path = entry.map_err(|e| ExecutionError::Freshness {
                path: e.path().to_path_buf(),
                source: e.into_error(),
            })?;
            let source_time = modified(&path, fs::metadata(&path).and_then(|m| m.modified()))?;
            if source_time > output_time {
                return Ok(false);
            }
        }
    }

    Ok(true)
}

fn modified(path: &Path, time: io::Result<SystemTime>) -> ExecutionResult<SystemTime> {
    time.map_err(|source| ExecutionError::Freshness {
        path: path.to_path_buf(),
        source,
    })
}
