use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const RUNS_DIR: &str = "runs";
const RUN_SPEC_FILE: &str = "run_spec.json";
const INTERACTION_TRACES_DIR: &str = "interaction_traces";

/// Layout of a run's output directory.
///
/// - `{output_path}/runs/{run_name}/run_spec.json`
/// - `{output_path}/runs/{run_name}/interaction_traces/{trace_id}.json`
pub struct RunPaths;

impl RunPaths {
    pub fn run_dir(output_path: &Path, run_name: &str) -> PathBuf {
        output_path.join(RUNS_DIR).join(run_name)
    }

    pub fn run_spec(output_path: &Path, run_name: &str) -> PathBuf {
        Self::run_dir(output_path, run_name).join(RUN_SPEC_FILE)
    }

    pub fn interaction_traces_dir(output_path: &Path, run_name: &str) -> PathBuf {
        Self::run_dir(output_path, run_name).join(INTERACTION_TRACES_DIR)
    }
}

/// Rejects names that would escape their parent directory when joined.
pub fn validate_path_component(kind: &str, value: &str) -> Result<()> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);
    if invalid {
        return Err(Error::InvalidRequest(format!("invalid {kind}: {value:?}")));
    }
    Ok(())
}
