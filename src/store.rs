use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::Builder;

use crate::error::LoaderError;

const SAMPLE_INDEX_FILE: &str = "sample_index.json";
const STATION_INDEX_FILE: &str = "station_index.json";

/// Local scratch area: downloaded spreadsheets and the rebuilt lookup stores.
#[derive(Debug, Clone)]
pub struct Workspace {
    scratch_root: Utf8PathBuf,
}

impl Workspace {
    pub fn new() -> Result<Self, LoaderError> {
        let scratch_root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("muscope-loader"))
                    .ok()
            })
            .ok_or_else(|| {
                LoaderError::Filesystem("unable to resolve scratch directory".to_string())
            })?;
        Ok(Self { scratch_root })
    }

    pub fn new_with_root(scratch_root: Utf8PathBuf) -> Self {
        Self { scratch_root }
    }

    pub fn scratch_root(&self) -> &Utf8Path {
        &self.scratch_root
    }

    pub fn downloads_dir(&self) -> Utf8PathBuf {
        self.scratch_root.join("downloads")
    }

    /// Local copy of a remote file; downloads are flat, keyed by file name.
    pub fn download_path(&self, remote_path: &Utf8Path) -> Utf8PathBuf {
        let name = remote_path.file_name().unwrap_or(remote_path.as_str());
        self.downloads_dir().join(name)
    }

    pub fn sample_index_path(&self) -> Utf8PathBuf {
        self.scratch_root.join(SAMPLE_INDEX_FILE)
    }

    pub fn station_index_path(&self) -> Utf8PathBuf {
        self.scratch_root.join(STATION_INDEX_FILE)
    }

    pub fn ensure_downloads_dir(&self) -> Result<(), LoaderError> {
        fs::create_dir_all(self.downloads_dir().as_std_path())
            .map_err(|err| LoaderError::Filesystem(err.to_string()))
    }

    pub fn remove_file(path: &Utf8Path) -> Result<(), LoaderError> {
        if path.as_std_path().exists() {
            fs::remove_file(path.as_std_path())
                .map_err(|err| LoaderError::Filesystem(err.to_string()))?;
        }
        Ok(())
    }

    pub fn write_json_atomic<T: Serialize>(path: &Utf8Path, value: &T) -> Result<(), LoaderError> {
        let parent = path
            .parent()
            .ok_or_else(|| LoaderError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| LoaderError::Filesystem(err.to_string()))?;
        let content = serde_json::to_vec_pretty(value)
            .map_err(|err| LoaderError::Filesystem(err.to_string()))?;
        let temp = Builder::new()
            .prefix("muscope-loader")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| LoaderError::Filesystem(err.to_string()))?;
        fs::write(temp.path(), &content).map_err(|err| LoaderError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| LoaderError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn read_json<T: DeserializeOwned>(path: &Utf8Path) -> Result<Option<T>, LoaderError> {
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| LoaderError::Filesystem(format!("read {path}: {err}")))?;
        let value = serde_json::from_str(&content)
            .map_err(|err| LoaderError::Filesystem(format!("parse {path}: {err}")))?;
        Ok(Some(value))
    }
}
