use std::collections::HashMap;
use std::io::{Read, Seek};

use log::warn;
use zip::ZipArchive;
use zip::result::ZipResult;

/// Decompression chunk size for entry streaming.
const CHUNK_SIZE: usize = 4096;

/// Snapshot of one archive member. Indices are stable for the life of the
/// reader that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    index: usize,
    name: Vec<u8>,
    size: u64,
}

impl EntryInfo {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Raw stored name. Not guaranteed to be UTF-8.
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Uncompressed length.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Directory entries carry a trailing slash and no content.
    pub fn is_dir(&self) -> bool {
        self.name.last() == Some(&b'/') && self.size == 0
    }
}

/// Random-access view of an update archive.
pub trait ArchiveRead {
    fn entry_count(&self) -> usize;

    fn entry_at(&self, index: usize) -> Option<EntryInfo>;

    /// Look up an entry by raw name. The first entry wins when an archive
    /// stores the same name twice.
    fn find_entry(&self, name: &[u8]) -> Option<EntryInfo>;

    /// Decompress an entry, handing chunks to `sink`. Returns false on any
    /// read, decompression, or checksum failure.
    fn stream_entry(&mut self, index: usize, sink: &mut dyn FnMut(&[u8])) -> bool;

    /// CRC check over the stored contents.
    fn is_intact(&mut self, index: usize) -> bool {
        self.stream_entry(index, &mut |_| {})
    }
}

/// `ArchiveRead` over a seekable zip stream.
pub struct ZipArchiveReader<R: Read + Seek> {
    archive: ZipArchive<R>,
    entries: Vec<EntryInfo>,
    by_name: HashMap<Vec<u8>, usize>,
}

impl<R: Read + Seek> ZipArchiveReader<R> {
    pub fn new(reader: R) -> ZipResult<Self> {
        let mut archive = ZipArchive::new(reader)?;

        let mut entries = Vec::with_capacity(archive.len());
        let mut by_name = HashMap::with_capacity(archive.len());
        for index in 0..archive.len() {
            // Raw access reads metadata without decompressing.
            let file = archive.by_index_raw(index)?;
            let info = EntryInfo {
                index,
                name: file.name_raw().to_vec(),
                size: file.size(),
            };
            by_name.entry(info.name.clone()).or_insert(index);
            entries.push(info);
        }

        Ok(Self {
            archive,
            entries,
            by_name,
        })
    }
}

impl<R: Read + Seek> ArchiveRead for ZipArchiveReader<R> {
    fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn entry_at(&self, index: usize) -> Option<EntryInfo> {
        self.entries.get(index).cloned()
    }

    fn find_entry(&self, name: &[u8]) -> Option<EntryInfo> {
        self.by_name.get(name).map(|index| self.entries[*index].clone())
    }

    fn stream_entry(&mut self, index: usize, sink: &mut dyn FnMut(&[u8])) -> bool {
        let mut file = match self.archive.by_index(index) {
            Ok(file) => file,
            Err(err) => {
                warn!("failed to open entry {index}: {err}");
                return false;
            }
        };

        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            match file.read(&mut buf) {
                Ok(0) => return true,
                Ok(n) => sink(&buf[..n]),
                Err(err) => {
                    // The zip reader reports a CRC mismatch on the final
                    // read, so corrupt entries land here as well.
                    warn!("failed to read entry {index}: {err}");
                    return false;
                }
            }
        }
    }
}
