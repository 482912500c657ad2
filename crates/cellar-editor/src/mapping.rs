//! Read-only file mapping: the byte source behind COLD lines.
//!
//! On unix the file is mapped with `mmap(PROT_READ, MAP_PRIVATE)` and the
//! kernel pages it in as lines are first touched. Elsewhere the file is read
//! into an owned buffer, which keeps the same interface at the cost of an
//! up-front read.
//!
//! A mapping over a file that is then truncated is undefined behavior
//! waiting to happen, so the buffer drops its mapping before every save.
//! Nothing else in the crate writes to a mapped file.
//!
//! Safety: `mmap`, `madvise`, and `munmap` have no safe std equivalent.
//! The mapping is never written, never shared outside `Mapping`, and
//! unmapped exactly once in `Drop`.
#![allow(unsafe_code)]

use std::fs::File;
use std::io;
use std::path::Path;

/// An immutable view of a file's bytes at open time.
pub struct Mapping {
    inner: Inner,
}

#[cfg(unix)]
struct Inner {
    ptr: *mut libc::c_void,
    len: usize,
}

#[cfg(not(unix))]
struct Inner {
    bytes: Vec<u8>,
}

impl Mapping {
    /// Map `path` read-only.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from opening, stat-ing, or mapping the file.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = usize::try_from(file.metadata()?.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "file too large to map"))?;
        Ok(Self {
            inner: Inner::map(&file, len)?,
        })
    }

    /// The whole mapped file.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Mapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapping").field("len", &self.len()).finish()
    }
}

// ---------------------------------------------------------------------------
// Platform backends
// ---------------------------------------------------------------------------

#[cfg(unix)]
impl Inner {
    fn map(file: &File, len: usize) -> io::Result<Self> {
        use std::os::unix::io::AsRawFd;

        // mmap rejects zero-length mappings.
        if len == 0 {
            return Ok(Self {
                ptr: std::ptr::null_mut(),
                len: 0,
            });
        }

        // SAFETY: a fresh private read-only mapping of an open descriptor.
        // The descriptor may be closed afterwards; the mapping stays valid.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ,
                libc::MAP_PRIVATE,
                file.as_raw_fd(),
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        // Lines are decoded in viewport order, not file order. Advisory only.
        // SAFETY: ptr/len describe the mapping created above.
        unsafe {
            libc::madvise(ptr, len, libc::MADV_RANDOM);
        }

        Ok(Self { ptr, len })
    }

    fn as_bytes(&self) -> &[u8] {
        if self.len == 0 {
            return &[];
        }
        // SAFETY: ptr is a live PROT_READ mapping of exactly len bytes,
        // unmapped only in Drop, which cannot run while &self is borrowed.
        unsafe { std::slice::from_raw_parts(self.ptr.cast::<u8>(), self.len) }
    }
}

#[cfg(unix)]
impl Drop for Inner {
    fn drop(&mut self) {
        if self.len > 0 {
            // SAFETY: ptr/len came from a successful mmap and are unmapped once.
            unsafe {
                libc::munmap(self.ptr, self.len);
            }
        }
    }
}

#[cfg(not(unix))]
impl Inner {
    fn map(file: &File, len: usize) -> io::Result<Self> {
        use std::io::Read;

        let mut bytes = Vec::with_capacity(len);
        let mut reader = file;
        reader.read_to_end(&mut bytes)?;
        Ok(Self { bytes })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn file_with(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn maps_file_contents() {
        let file = file_with(b"hello\nworld\n");
        let map = Mapping::open(file.path()).unwrap();
        assert_eq!(map.as_bytes(), b"hello\nworld\n");
        assert_eq!(map.len(), 12);
    }

    #[test]
    fn empty_file_maps_to_nothing() {
        let file = file_with(b"");
        let map = Mapping::open(file.path()).unwrap();
        assert!(map.is_empty());
        assert_eq!(map.as_bytes(), b"");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Mapping::open(&dir.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
