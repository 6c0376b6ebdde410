use log::info;
use std::fs;
use std::path::Path;
use txload_core::domain::LoadResult;
use txload_core::foundation::{LoadError, Result};

/// Writes `result` as pretty-printed JSON, creating parent directories as needed.
pub fn write_result(path: &Path, result: &LoadResult) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|err| LoadError::Io { operation: format!("create {}", parent.display()), details: err.to_string() })?;
    }
    let body = serde_json::to_string_pretty(result)?;
    fs::write(path, body).map_err(|err| LoadError::Io { operation: format!("write {}", path.display()), details: err.to_string() })?;
    info!(
        "result written path={} total_transactions={} node_count={} achieved_tps={:.2}",
        path.display(),
        result.total_transactions,
        result.node_count,
        result.achieved_tps
    );
    Ok(())
}

pub fn read_result(path: &Path) -> Result<LoadResult> {
    let body = fs::read_to_string(path).map_err(|err| LoadError::Io { operation: format!("read {}", path.display()), details: err.to_string() })?;
    Ok(serde_json::from_str(&body)?)
}
