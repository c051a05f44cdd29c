//! File-based single-instance lock.
//!
//! One lock file per user profile (data dir). `create_new` gives us the
//! atomic create-or-fail we need; the file is removed when the holder drops
//! the lock or exits cleanly.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::host::{AlreadyRunning, InstanceLock};

#[derive(Debug)]
pub struct FileInstanceLock {
    path: PathBuf,
    held: bool,
}

impl FileInstanceLock {
    pub fn new(path: PathBuf) -> Self {
        FileInstanceLock { path, held: false }
    }
}

impl InstanceLock for FileInstanceLock {
    fn acquire(&mut self) -> Result<(), AlreadyRunning> {
        if self.held {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return Err(AlreadyRunning);
            }
        }
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                self.held = true;
                Ok(())
            }
            Err(_) => Err(AlreadyRunning),
        }
    }
}

impl Drop for FileInstanceLock {
    fn drop(&mut self) {
        if self.held {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn second_acquire_from_another_lock_loses() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("instance.lock");

        let mut first = FileInstanceLock::new(path.clone());
        first.acquire().expect("first acquire failed");
        // Re-acquiring an already-held lock is a no-op.
        first.acquire().expect("re-acquire failed");

        let mut second = FileInstanceLock::new(path.clone());
        assert!(second.acquire().is_err());

        drop(first);
        let mut third = FileInstanceLock::new(path);
        third.acquire().expect("acquire after release failed");
    }
}
