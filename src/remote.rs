use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::error::LoaderError;

/// Contents of one collection: data objects and subcollections, as remote paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub files: Vec<Utf8PathBuf>,
    pub collections: Vec<Utf8PathBuf>,
}

/// Hierarchical data store holding the spreadsheets and sequence files.
pub trait FileStore {
    fn list(&self, collection: &Utf8Path) -> Result<Listing, LoaderError>;
    fn download(&self, remote_path: &Utf8Path, local_path: &Utf8Path) -> Result<(), LoaderError>;
    fn exists(&self, remote_path: &Utf8Path) -> bool;
}

/// Data store mounted on the local filesystem; remote absolute paths are
/// resolved below `mount_root`.
#[derive(Debug, Clone)]
pub struct MountedStore {
    mount_root: Utf8PathBuf,
}

impl MountedStore {
    pub fn new(mount_root: Utf8PathBuf) -> Self {
        Self { mount_root }
    }

    pub fn mount_root(&self) -> &Utf8Path {
        &self.mount_root
    }

    pub fn local_path(&self, remote_path: &Utf8Path) -> Utf8PathBuf {
        self.mount_root
            .join(remote_path.as_str().trim_start_matches('/'))
    }
}

impl FileStore for MountedStore {
    fn list(&self, collection: &Utf8Path) -> Result<Listing, LoaderError> {
        let local = self.local_path(collection);
        let entries = fs::read_dir(local.as_std_path())
            .map_err(|err| LoaderError::Filesystem(format!("list {collection}: {err}")))?;

        let mut listing = Listing::default();
        for entry in entries {
            let entry = entry.map_err(|err| LoaderError::Filesystem(err.to_string()))?;
            let name = entry
                .file_name()
                .into_string()
                .map_err(|_| LoaderError::Filesystem(format!("non UTF-8 name in {collection}")))?;
            let remote = collection.join(name);
            if entry.path().is_dir() {
                listing.collections.push(remote);
            } else {
                listing.files.push(remote);
            }
        }
        listing.files.sort();
        listing.collections.sort();
        debug!(
            collection = %collection,
            files = listing.files.len(),
            collections = listing.collections.len(),
            "listed collection"
        );
        Ok(listing)
    }

    fn download(&self, remote_path: &Utf8Path, local_path: &Utf8Path) -> Result<(), LoaderError> {
        if let Some(parent) = local_path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| LoaderError::Filesystem(err.to_string()))?;
        }
        fs::copy(
            self.local_path(remote_path).as_std_path(),
            local_path.as_std_path(),
        )
        .map_err(|err| LoaderError::Filesystem(format!("download {remote_path}: {err}")))?;
        Ok(())
    }

    fn exists(&self, remote_path: &Utf8Path) -> bool {
        self.local_path(remote_path).as_std_path().exists()
    }
}
