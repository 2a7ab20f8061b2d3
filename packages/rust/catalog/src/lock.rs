use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use tabcatalog_shared::{Result, TabCatalogError};

use crate::CATALOG_FILE_NAME;

/// Exclusive hold on a catalog directory for the lifetime of the guard.
///
/// The lock is a sibling file `all_tabs.md.lock` created with `create_new`,
/// so a second writer fails instead of interleaving blocks. The file holds
/// the owner's pid; a lock whose owner is no longer running is reclaimed.
#[derive(Debug)]
pub struct CatalogLock {
    path: PathBuf,
}

impl CatalogLock {
    pub fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join(format!("{CATALOG_FILE_NAME}.lock"));

        match create_lock_file(&path) {
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if !reclaim_stale(&path) {
                    return Err(TabCatalogError::Lock(format!(
                        "{} is held by another writer (remove it if no other run is active)",
                        path.display()
                    )));
                }
                create_lock_file(&path).map_err(|e| held_or_io(&path, e))?;
            }
            Err(e) => return Err(TabCatalogError::io(&path, e)),
            Ok(()) => {}
        }

        debug!(path = %path.display(), "catalog lock acquired");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CatalogLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release catalog lock");
        } else {
            debug!(path = %self.path.display(), "catalog lock released");
        }
    }
}

/// Create the lock file and record our pid in it. A lock without a pid could
/// never be reclaimed, so a failed write removes the file again.
fn create_lock_file(path: &Path) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;

    if let Err(e) = writeln!(file, "{}", std::process::id()).and_then(|()| file.sync_all()) {
        warn!(path = %path.display(), error = %e, "failed to write catalog lock owner");
        drop(file);
        std::fs::remove_file(path).ok();
        return Err(e);
    }
    Ok(())
}

fn held_or_io(path: &Path, e: std::io::Error) -> TabCatalogError {
    if e.kind() == ErrorKind::AlreadyExists {
        TabCatalogError::Lock(format!("{} was taken by another writer", path.display()))
    } else {
        TabCatalogError::io(path, e)
    }
}

/// Remove the lock at `path` if its recorded owner has exited.
///
/// Unreadable or pid-less locks are left alone: their owner may still be
/// between creating the file and writing to it.
fn reclaim_stale(path: &Path) -> bool {
    let Ok(content) = std::fs::read_to_string(path) else {
        return false;
    };
    let Ok(pid) = content.trim().parse::<u32>() else {
        return false;
    };
    if pid == std::process::id() || process_alive(pid) {
        return false;
    }

    warn!(path = %path.display(), pid, "reclaiming catalog lock of exited process");
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to remove stale catalog lock");
            false
        }
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // Signal 0 only checks for existence. EPERM means it exists under
    // another user.
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}
