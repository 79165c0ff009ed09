//! # TOC cache
//!
//! The Crazyflie describes its log variables and parameters in tables of content (TOC) identified by a CRC32.
//! Fetching them over the radio takes most of the connection time, [FileTocCache] keeps them on disk so that the
//! next connection to the same firmware only fetches the checksum.
//!
//! Each TOC is one file named after its checksum, `<dir>/<CRC32 in hex>.json`. Cache errors are never fatal: a
//! TOC that cannot be read is fetched again and a TOC that cannot be written is logged and forgotten.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crazyflie_lib::TocCache;
use log::{debug, warn};

/// Default cache directory, relative to the working directory
pub const DEFAULT_CACHE_DIR: &str = "./cache";

/// TOC cache storing one file per TOC in a directory
#[derive(Debug, Clone)]
pub struct FileTocCache {
    dir: Arc<PathBuf>,
}

impl FileTocCache {
    /// Cache in `dir`, the directory is created when the first TOC is stored
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Arc::new(dir.into()),
        }
    }

    /// Cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, crc32: u32) -> PathBuf {
        self.dir.join(format!("{:08X}.json", crc32))
    }
}

impl Default for FileTocCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DIR)
    }
}

impl TocCache for FileTocCache {
    fn get_toc(&self, crc32: u32) -> Option<String> {
        let path = self.path(crc32);
        match std::fs::read_to_string(&path) {
            Ok(toc) => {
                debug!("TOC {:08X} read from {}", crc32, path.display());
                Some(toc)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Cannot read cached TOC {}: {}", path.display(), e);
                None
            }
        }
    }

    fn store_toc(&self, crc32: u32, toc: &str) {
        let path = self.path(crc32);
        let stored = std::fs::create_dir_all(self.dir.as_path()).and_then(|_| std::fs::write(&path, toc));
        match stored {
            Ok(()) => debug!("TOC {:08X} stored in {}", crc32, path.display()),
            Err(e) => warn!("Cannot store TOC in {}: {}", path.display(), e),
        }
    }
}
