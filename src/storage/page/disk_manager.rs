//! Disk manager for page-level file I/O.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::storage::page::{FileId, PageId, PageStore, PAGE_SIZE};

/// An open page file.
struct OpenFile {
    name: String,
    file: File,
    /// Number of pages allocated in the file.
    num_pages: u32,
}

/// Manages page files inside one directory.
///
/// The disk manager handles:
/// - Creating, opening and closing page files
/// - Allocating new pages at the end of a file
/// - Reading and writing whole pages
pub struct DiskManager {
    /// Directory holding the page files.
    dir: PathBuf,
    /// Size of every page in bytes.
    page_size: usize,
    /// Currently open files.
    files: HashMap<FileId, OpenFile>,
    /// Next file id to hand out.
    next_file_id: u32,
}

impl DiskManager {
    /// Creates a disk manager rooted at `dir` using the default page size.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(dir: &Path) -> Result<Self, StorageError> {
        Self::with_page_size(dir, PAGE_SIZE)
    }

    /// Creates a disk manager rooted at `dir` with a custom page size.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn with_page_size(dir: &Path, page_size: usize) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| StorageError::io(format!("creating {}", dir.display()), e))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            page_size,
            files: HashMap::new(),
            next_file_id: 0,
        })
    }

    /// Returns the directory holding the page files.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Creates a new empty page file and opens it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file already exists or cannot be created.
    pub fn create_file(&mut self, name: &str) -> Result<FileId, StorageError> {
        let path = self.dir.join(name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => StorageError::FileExists(name.to_string()),
                _ => StorageError::io(format!("creating {name}"), e),
            })?;
        Ok(self.register(name, file, 0))
    }

    /// Opens an existing page file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be opened.
    pub fn open_file(&mut self, name: &str) -> Result<FileId, StorageError> {
        let path = self.dir.join(name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => StorageError::FileNotFound(name.to_string()),
                _ => StorageError::io(format!("opening {name}"), e),
            })?;

        let file_len = file
            .metadata()
            .map_err(|e| StorageError::io(format!("reading metadata of {name}"), e))?
            .len();
        let num_pages = file_len.div_ceil(self.page_size as u64) as u32;

        Ok(self.register(name, file, num_pages))
    }

    /// Closes an open file. Its id becomes invalid.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is not open or the final sync fails.
    pub fn close_file(&mut self, file_id: FileId) -> Result<(), StorageError> {
        let open = self
            .files
            .remove(&file_id)
            .ok_or(StorageError::FileNotOpen(file_id))?;
        open.file
            .sync_all()
            .map_err(|e| StorageError::io(format!("syncing {}", open.name), e))
    }

    /// Allocates a new page at the end of the file and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is not open or cannot be extended.
    pub fn allocate_page(&mut self, file_id: FileId) -> Result<PageId, StorageError> {
        let page_size = self.page_size as u64;
        let open = self.open(file_id)?;
        let page_id = PageId::new(file_id, open.num_pages);

        let new_size = (u64::from(page_id.page_num) + 1) * page_size;
        open.file
            .set_len(new_size)
            .map_err(|e| StorageError::io(format!("extending {}", open.name), e))?;
        open.num_pages += 1;

        Ok(page_id)
    }

    /// Returns the number of pages allocated in a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is not open.
    pub fn num_pages(&self, file_id: FileId) -> Result<u32, StorageError> {
        self.files
            .get(&file_id)
            .map(|open| open.num_pages)
            .ok_or(StorageError::FileNotOpen(file_id))
    }

    /// Flushes buffered writes of a file to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is not open or the sync fails.
    pub fn sync(&mut self, file_id: FileId) -> Result<(), StorageError> {
        let open = self.open(file_id)?;
        open.file
            .sync_all()
            .map_err(|e| StorageError::io(format!("syncing {}", open.name), e))
    }

    fn register(&mut self, name: &str, file: File, num_pages: u32) -> FileId {
        let file_id = FileId(self.next_file_id);
        self.next_file_id += 1;
        self.files.insert(
            file_id,
            OpenFile {
                name: name.to_string(),
                file,
                num_pages,
            },
        );
        file_id
    }

    fn open(&mut self, file_id: FileId) -> Result<&mut OpenFile, StorageError> {
        self.files
            .get_mut(&file_id)
            .ok_or(StorageError::FileNotOpen(file_id))
    }

    fn check_len(&self, len: usize) -> Result<(), StorageError> {
        if len == self.page_size {
            Ok(())
        } else {
            Err(StorageError::BufferSize {
                expected: self.page_size,
                actual: len,
            })
        }
    }
}

impl PageStore for DiskManager {
    fn page_size(&self) -> usize {
        self.page_size
    }

    /// Reads a page from disk.
    ///
    /// A page beyond the current end of file reads back zeroed.
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<(), StorageError> {
        self.check_len(buf.len())?;
        let offset = page_id.offset(self.page_size);
        let open = self.open(page_id.file_id)?;

        open.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| StorageError::io(format!("seeking to {page_id}"), e))?;

        match open.file.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                buf.fill(0);
                Ok(())
            }
            Err(e) => Err(StorageError::io(format!("reading {page_id}"), e)),
        }
    }

    fn write_page(&mut self, page_id: PageId, data: &[u8]) -> Result<(), StorageError> {
        self.check_len(data.len())?;
        let offset = page_id.offset(self.page_size);
        let open = self.open(page_id.file_id)?;

        open.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| StorageError::io(format!("seeking to {page_id}"), e))?;
        open.file
            .write_all(data)
            .map_err(|e| StorageError::io(format!("writing {page_id}"), e))?;

        open.num_pages = open.num_pages.max(page_id.page_num + 1);
        Ok(())
    }
}
