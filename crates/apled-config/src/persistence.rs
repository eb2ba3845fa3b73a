// File-backed state documents
//
// `controller.json` and `schedules.json` under the data dir. Writes go to
// a temp file in the same directory and are renamed over the target, so a
// crash mid-write leaves the previous document intact.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::debug;

use apled_api::ControllerConfig;
use apled_core::{CoreError, Persistence, Schedule};

use crate::ConfigError;

const CONFIG_FILE: &str = "controller.json";
const SCHEDULES_FILE: &str = "schedules.json";

#[derive(Debug, Clone)]
pub struct FilePersistence {
    dir: PathBuf,
}

impl Default for FilePersistence {
    fn default() -> Self {
        Self::new(crate::data_dir())
    }
}

impl FilePersistence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn schedules_path(&self) -> PathBuf {
        self.dir.join(SCHEDULES_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, value)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(path)?;
        debug!(path = %path.display(), "state document written");
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ConfigError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn to_core(err: ConfigError) -> CoreError {
    CoreError::persistence(err.to_string())
}

impl Persistence for FilePersistence {
    fn save_config(&self, config: &ControllerConfig) -> Result<(), CoreError> {
        self.write_json(&self.config_path(), config).map_err(to_core)
    }

    fn load_config(&self) -> Result<ControllerConfig, CoreError> {
        Self::read_json(&self.config_path())
            .map(Option::unwrap_or_default)
            .map_err(to_core)
    }

    fn save_schedules(&self, schedules: &[Schedule]) -> Result<(), CoreError> {
        self.write_json(&self.schedules_path(), schedules)
            .map_err(to_core)
    }

    fn load_schedules(&self) -> Result<Vec<Schedule>, CoreError> {
        Self::read_json(&self.schedules_path())
            .map(Option::unwrap_or_default)
            .map_err(to_core)
    }
}
