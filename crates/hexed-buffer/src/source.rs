use hexed_config::OpenMode;
use memmap2::{Mmap, MmapOptions};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Bytes behind a [`Source`].
#[derive(Debug)]
enum SourceData {
    Mapped(Mmap),
    Bytes(Vec<u8>),
}

/// Immutable backing store shared by every source chunk of a buffer.
///
/// Files are memory-mapped read-only even when the file handle itself was
/// opened read-write; the handle is kept so the mapping's file stays open for
/// the buffer's lifetime.
#[derive(Debug)]
pub struct Source {
    path: Option<PathBuf>,
    data: SourceData,
    read_only: bool,
    _file: Option<File>,
}

impl Source {
    /// Wraps an in-memory array.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            path: None,
            data: SourceData::Bytes(bytes.into()),
            read_only: false,
            _file: None,
        }
    }

    /// Opens and maps a file.
    ///
    /// A read-write request that fails with `PermissionDenied` is retried
    /// read-only instead of failing; [`Source::is_read_only`] reports it.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> io::Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let (file, read_only) = match mode {
            OpenMode::ReadWrite => match OpenOptions::new().read(true).write(true).open(&path_buf) {
                Ok(file) => (file, false),
                Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                    tracing::warn!(
                        path = %path_buf.display(),
                        "read-write open denied, falling back to read-only"
                    );
                    (File::open(&path_buf)?, true)
                }
                Err(err) => return Err(err),
            },
            OpenMode::ReadOnly => (File::open(&path_buf)?, true),
        };

        let file_size = file.metadata()?.len();
        let data = if file_size == 0 {
            SourceData::Bytes(Vec::new())
        } else {
            SourceData::Mapped(unsafe { MmapOptions::new().map(&file)? })
        };

        tracing::debug!(path = %path_buf.display(), file_size, read_only, "opened source");

        Ok(Self {
            path: Some(path_buf),
            data,
            read_only,
            _file: Some(file),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the backing file could only be opened read-only.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// The mapped view, when the source is a non-empty file.
    pub fn mapped(&self) -> Option<&Mmap> {
        match &self.data {
            SourceData::Mapped(map) => Some(map),
            SourceData::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.data {
            SourceData::Mapped(map) => &map[..],
            SourceData::Bytes(bytes) => &bytes[..],
        }
    }

    /// Copies bytes starting at `offset` into `dest`, returning how many were copied.
    pub fn read(&self, offset: usize, dest: &mut [u8]) -> usize {
        let bytes = self.as_bytes();
        if offset >= bytes.len() {
            return 0;
        }
        let count = dest.len().min(bytes.len() - offset);
        dest[..count].copy_from_slice(&bytes[offset..offset + count]);
        count
    }
}
