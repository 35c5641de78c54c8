//! JSON file backend persisting [`Database`] snapshots atomically.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use super::{Database, StoreResult};

const DATA_FILE: &str = "payplan.json";
const TMP_SUFFIX: &str = "tmp";
const APP_DIR: &str = "payplan";

/// Stores the whole database as pretty-printed JSON in a single file,
/// written atomically (tmp file + rename) so a crash never leaves a
/// truncated snapshot behind.
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
    data_file: PathBuf,
}

impl JsonStore {
    pub fn new(root: Option<PathBuf>) -> StoreResult<Self> {
        let root = root.unwrap_or_else(default_root);
        fs::create_dir_all(&root)?;
        let data_file = root.join(DATA_FILE);
        Ok(Self { root, data_file })
    }

    pub fn new_default() -> StoreResult<Self> {
        Self::new(None)
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn data_path(&self) -> &Path {
        &self.data_file
    }

    /// Loads the persisted snapshot, or an empty database when none exists.
    pub fn load(&self) -> StoreResult<Database> {
        if !self.data_file.exists() {
            return Ok(Database::default());
        }
        let data = fs::read_to_string(&self.data_file)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Persists the snapshot atomically.
    pub fn save(&self, database: &Database) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(database)?;
        let tmp = tmp_path(&self.data_file);
        write_all(&tmp, &json)?;
        fs::rename(&tmp, &self.data_file)?;
        Ok(())
    }
}

fn default_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_all(path: &Path, data: &str) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
