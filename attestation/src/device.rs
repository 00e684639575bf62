//! Confined access to the Gramine attestation pseudo-files.
//!
//! The quote generation protocol is stateful: the quoting enclave signs
//! whatever was last written to `user_report_data`. Every multi-file
//! sequence therefore runs under the process-wide enclave lock.

use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{FromRawFd, RawFd};
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use nix::fcntl::{OFlag, open, openat};
use nix::sys::stat::{Mode, SFlag, fstat};
use nix::unistd::close;

use oracle_shared::{OracleError, Result};

/// Local enclave target info (read).
pub const MY_TARGET_INFO: &str = "my_target_info";
/// Destination target info for the next report (write).
pub const TARGET_INFO: &str = "target_info";
/// 64 bytes of user data the next quote or report will bind to (write).
pub const USER_REPORT_DATA: &str = "user_report_data";
/// Local EREPORT output (read).
pub const REPORT: &str = "report";
/// Platform-signed quote; reading triggers quote generation (read).
pub const QUOTE: &str = "quote";

pub const DEFAULT_ATTESTATION_ROOT: &str = "/dev/attestation";

static ENCLAVE_LOCK: Mutex<()> = Mutex::new(());

/// Serialize all pseudo-file sequences.
pub(crate) fn enclave_lock() -> MutexGuard<'static, ()> {
    ENCLAVE_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// Handle to the attestation pseudo-file directory.
#[derive(Debug, Clone)]
pub struct AttestationDevice {
    root: PathBuf,
}

impl AttestationDevice {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let mut file = self.open_confined(name, OFlag::O_RDONLY)?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .map_err(|e| OracleError::EnclaveRead {
                path: name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(buf)
    }

    pub(crate) fn write_file(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let mut file = self.open_confined(name, OFlag::O_WRONLY)?;
        file.write_all(bytes).map_err(|e| OracleError::EnclaveWrite {
            path: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Open a pseudo-file without ever leaving the attestation root: each
    /// path segment is resolved relative to the previously opened directory
    /// with `O_NOFOLLOW`, so symlinks and mount-point crossings fail.
    fn open_confined(&self, name: &str, leaf_flags: OFlag) -> Result<File> {
        let fail = |reason: String| OracleError::EnclaveOpen {
            path: name.to_string(),
            reason,
        };

        let segments = self.confined_segments(name)?;
        let (leaf, dirs) = segments.split_last().expect("segments checked non-empty");

        let mut dir = Fd(open(
            self.root.as_path(),
            OFlag::O_RDONLY | OFlag::O_DIRECTORY | OFlag::O_CLOEXEC,
            Mode::empty(),
        )
        .map_err(|e| fail(e.to_string()))?);
        let root_dev = fstat(dir.0).map_err(|e| fail(e.to_string()))?.st_dev;

        for segment in dirs {
            let next = Fd(openat(
                dir.0,
                segment.as_path(),
                OFlag::O_RDONLY | OFlag::O_DIRECTORY | OFlag::O_NOFOLLOW | OFlag::O_CLOEXEC,
                Mode::empty(),
            )
            .map_err(|e| fail(e.to_string()))?);
            let stat = fstat(next.0).map_err(|e| fail(e.to_string()))?;
            if stat.st_dev != root_dev {
                return Err(fail("path crosses devices".into()));
            }
            if stat.st_mode & SFlag::S_IFMT.bits() != SFlag::S_IFDIR.bits() {
                return Err(fail("path segment is not a directory".into()));
            }
            dir = next;
        }

        let fd = openat(
            dir.0,
            leaf.as_path(),
            leaf_flags | OFlag::O_NOFOLLOW | OFlag::O_CLOEXEC,
            Mode::empty(),
        )
        .map_err(|e| fail(e.to_string()))?;
        Ok(unsafe { File::from_raw_fd(fd) })
    }

    /// Normalize `name` into path segments below the root. A leading copy
    /// of the root itself is stripped; anything else that would escape the
    /// root (`..`, a foreign absolute path) is refused.
    fn confined_segments(&self, name: &str) -> Result<Vec<PathBuf>> {
        let fail = |reason: &str| OracleError::EnclaveOpen {
            path: name.to_string(),
            reason: reason.to_string(),
        };

        let path = Path::new(name);
        let rel = match path.strip_prefix(&self.root) {
            Ok(rel) => rel,
            Err(_) if path.is_absolute() => {
                return Err(fail("absolute path outside the attestation root"));
            }
            Err(_) => path,
        };

        let mut segments = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(seg) => segments.push(PathBuf::from(seg)),
                Component::CurDir => {}
                _ => return Err(fail("path escapes the attestation root")),
            }
        }
        if segments.is_empty() {
            return Err(fail("empty pseudo-file path"));
        }
        Ok(segments)
    }
}

struct Fd(RawFd);

impl Drop for Fd {
    fn drop(&mut self) {
        let _ = close(self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> (tempfile::TempDir, AttestationDevice) {
        let dir = tempfile::tempdir().unwrap();
        let device = AttestationDevice::new(dir.path());
        (dir, device)
    }

    #[test]
    fn reads_and_writes_inside_the_root() {
        let (dir, device) = device();
        std::fs::write(dir.path().join(QUOTE), b"quote bytes").unwrap();
        assert_eq!(device.read_file(QUOTE).unwrap(), b"quote bytes");

        std::fs::write(dir.path().join(USER_REPORT_DATA), b"").unwrap();
        device.write_file(USER_REPORT_DATA, &[7u8; 64]).unwrap();
        assert_eq!(
            std::fs::read(dir.path().join(USER_REPORT_DATA)).unwrap(),
            vec![7u8; 64]
        );
    }

    #[test]
    fn accepts_paths_spelled_with_the_root_prefix() {
        let (dir, device) = device();
        std::fs::write(dir.path().join(QUOTE), b"q").unwrap();
        let absolute = dir.path().join(QUOTE);
        assert_eq!(
            device.read_file(absolute.to_str().unwrap()).unwrap(),
            b"q"
        );
    }

    #[test]
    fn rejects_escaping_paths() {
        let (_dir, device) = device();
        assert!(matches!(
            device.read_file("../etc/passwd"),
            Err(OracleError::EnclaveOpen { .. })
        ));
        assert!(matches!(
            device.read_file("/etc/passwd"),
            Err(OracleError::EnclaveOpen { .. })
        ));
    }

    #[test]
    fn refuses_to_follow_symlinks() {
        let (dir, device) = device();
        let outside = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(outside.path(), b"secret").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
        assert!(matches!(
            device.read_file("link"),
            Err(OracleError::EnclaveOpen { .. })
        ));
    }

    #[test]
    fn walks_nested_directories_relative_to_the_root() {
        let (dir, device) = device();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/file"), b"deep").unwrap();
        assert_eq!(device.read_file("nested/file").unwrap(), b"deep");
    }
}
