//! Model loading: dispatches over the three external file formats
//! (spec.md §6) and manages the staging directory used by the `.lts`
//! conversion subprocess.

use std::path::{Path, PathBuf};

use fs_err as fs;

use crate::automaton::{io, Automaton};
use crate::error::{EngineError, Result};

/// A reference to a model file together with the format needed to read
/// it. Dispatch happens once, at [`Model::load`], so the format is
/// determined a single time rather than re-sniffed at every use.
#[derive(Debug, Clone)]
pub enum Model {
    /// A process-algebra `.lts` file, converted via an external helper.
    Lts(PathBuf),
    /// An FSM text file (also the canonical on-disk form).
    Fsm(PathBuf),
    /// An explicit automaton JSON file.
    Json(PathBuf),
}

impl Model {
    /// Loads the automaton this model refers to. `helper` is the path to
    /// the external `.lts`-to-JSON converter; it is required only for
    /// [`Model::Lts`] inputs.
    pub fn load(&self, helper: Option<&Path>) -> Result<Automaton> {
        match self {
            Model::Fsm(path) => {
                let file = fs::File::open(path)?;
                io::read_fsm(file, path)
            }
            Model::Json(path) => io::read_json(path),
            Model::Lts(path) => {
                let helper = helper.ok_or_else(|| {
                    EngineError::InvalidConfig(
                        "an .lts model requires a converter helper path".to_owned(),
                    )
                })?;
                io::convert_lts(helper, path)
            }
        }
    }

    /// Infers a [`Model`] from a path's extension: `.lts` for process
    /// algebra, `.json` for explicit automaton JSON, anything else is
    /// treated as FSM text.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("lts") => Model::Lts(path),
            Some("json") => Model::Json(path),
            _ => Model::Fsm(path),
        }
    }
}

/// RAII guard for the staging directory used by the `.lts` converter and
/// by any other intermediate file the engine needs while composing
/// models. Created fresh (removing any stale leftovers) and removed on
/// drop, mirroring the `tmp/` directory the original Python
/// implementation creates at the start of a synthesis run and never
/// bothered to clean up — we do.
pub struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    /// Creates the staging directory at `path`, removing it first if it
    /// already exists from a previous, interrupted run.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            fs::remove_dir_all(&path)?;
        }
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    /// The staging directory's path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_path_dispatches_on_extension() {
        assert!(matches!(Model::from_path("a.lts"), Model::Lts(_)));
        assert!(matches!(Model::from_path("a.json"), Model::Json(_)));
        assert!(matches!(Model::from_path("a.fsm"), Model::Fsm(_)));
        assert!(matches!(Model::from_path("a"), Model::Fsm(_)));
    }

    #[test]
    fn lts_without_helper_is_invalid_config() {
        let model = Model::Lts(PathBuf::from("a.lts"));
        let err = model.load(None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn staging_dir_creates_and_removes() {
        let base = tempfile::tempdir().unwrap();
        let staging_path = base.path().join("tmp");
        let path = {
            let staging = StagingDir::new(&staging_path).unwrap();
            assert!(staging.path().is_dir());
            staging.path().to_owned()
        };
        assert!(!path.exists());
    }
}
