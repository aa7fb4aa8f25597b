//! Directory-backed backend client.
//!
//! Each blob is a file under `root` named by the URL-safe base64 encoding of
//! the blob name, since tag names may contain `/` and `:`.

use super::BackendClient;
use crate::BackendError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// A backend client storing blobs as files in one directory.
#[derive(Debug)]
pub struct FsBackend {
    root: PathBuf,
    next_upload: AtomicU64,
}

impl FsBackend {
    /// Create a client rooted at `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, BackendError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .map_err(|e| BackendError::Client(format!("create {}: {}", root.display(), e)))?;
        Ok(Self {
            root,
            next_upload: AtomicU64::new(0),
        })
    }

    /// Directory holding the blobs.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, name: &str) -> PathBuf {
        self.root.join(URL_SAFE_NO_PAD.encode(name))
    }
}

impl BackendClient for FsBackend {
    fn download(&self, name: &str, dst: &mut dyn Write) -> Result<(), BackendError> {
        let mut file = match File::open(self.blob_path(name)) {
            Ok(file) => file,
            // A missing blob only counts as absent while the root is intact
            Err(e) if e.kind() == io::ErrorKind::NotFound && self.root.is_dir() => {
                return Err(BackendError::BlobNotFound);
            }
            Err(e) => {
                return Err(BackendError::Client(format!("download {}: {}", name, e)));
            }
        };
        io::copy(&mut file, dst)
            .map_err(|e| BackendError::Client(format!("download {}: {}", name, e)))?;
        Ok(())
    }

    fn upload(&self, name: &str, src: &mut dyn Read) -> Result<(), BackendError> {
        // Write to a unique temp file and rename so a concurrent download
        // never observes a partial blob.
        let seq = self.next_upload.fetch_add(1, Ordering::Relaxed);
        let tmp = self.root.join(format!(
            ".upload-{}-{}-{}",
            std::process::id(),
            seq,
            URL_SAFE_NO_PAD.encode(name)
        ));

        let result = (|| {
            let mut file = File::create(&tmp)?;
            io::copy(src, &mut file)?;
            file.sync_all()?;
            fs::rename(&tmp, self.blob_path(name))
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(BackendError::Client(format!("upload {}: {}", name, e)));
        }
        Ok(())
    }
}
