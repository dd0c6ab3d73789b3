//! Single instance lock using Unix socket.
//!
//! One running service owns the atmosphere sensor and the AC transmitter, so a
//! second instance on the same host must refuse to start. The lock is a bound
//! Unix socket: the OS releases it when the process dies, so a crash never
//! leaves a lock behind that blocks the next start.

use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Socket file name used by the service.
pub const LOCK_NAME: &str = "mattori-home.sock";

/// Error types for instance lock operations.
#[derive(Debug, Error)]
pub enum InstanceLockError {
    /// Another instance is already running.
    #[error("another mattori-home instance is already running ({0})")]
    AlreadyRunning(PathBuf),

    /// I/O error during lock acquisition.
    #[error("failed to acquire instance lock: {0}")]
    Io(#[from] io::Error),
}

/// Held for the lifetime of the service; the socket file is removed on drop.
pub struct InstanceLock {
    _listener: UnixListener,
    path: PathBuf,
}

impl InstanceLock {
    /// Acquire the lock in the runtime directory.
    pub fn acquire() -> Result<Self, InstanceLockError> {
        Self::acquire_at(Self::socket_path())
    }

    /// Acquire the lock at an explicit socket path.
    pub fn acquire_at(path: PathBuf) -> Result<Self, InstanceLockError> {
        // A socket file nobody answers on is left over from a SIGKILL'd process
        if path.exists() {
            if UnixStream::connect(&path).is_ok() {
                return Err(InstanceLockError::AlreadyRunning(path));
            }
            let _ = std::fs::remove_file(&path);
        }

        match UnixListener::bind(&path) {
            Ok(listener) => Ok(Self {
                _listener: listener,
                path,
            }),
            // Lost the race against another instance binding first
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                Err(InstanceLockError::AlreadyRunning(path))
            }
            Err(e) => Err(InstanceLockError::Io(e)),
        }
    }

    /// Path of the held socket.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Default socket path: `$XDG_RUNTIME_DIR` when set, `/tmp` otherwise.
    pub fn socket_path() -> PathBuf {
        socket_path_in(std::env::var("XDG_RUNTIME_DIR").ok().as_deref())
    }
}

fn socket_path_in(runtime_dir: Option<&str>) -> PathBuf {
    runtime_dir
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(LOCK_NAME)
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
