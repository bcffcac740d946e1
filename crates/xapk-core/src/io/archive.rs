//! Store-mode ZIP framing for the combined container.
//!
//! Payloads arrive fully loaded, so the CRC and sizes of an entry are known
//! before its local header is produced. The output is strictly forward-only:
//! no data descriptors and no header patching, which lets every chunk go
//! straight to a sink that cannot seek.
//!
//! ```text
//! [local header | payload]*  central directory  [zip64 record + locator]  end record
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use flate2::Crc;
use thiserror::Error;

const LOCAL_FILE_HEADER_SIG: u32 = 0x0403_4b50;
const CENTRAL_DIR_HEADER_SIG: u32 = 0x0201_4b50;
const END_OF_CENTRAL_DIR_SIG: u32 = 0x0605_4b50;
const ZIP64_END_OF_CENTRAL_DIR_SIG: u32 = 0x0606_4b50;
const ZIP64_LOCATOR_SIG: u32 = 0x0706_4b50;
const ZIP64_EXTRA_ID: u16 = 0x0001;

const VERSION_STORED: u16 = 10;
const VERSION_ZIP64: u16 = 45;
const FLAG_UTF8_NAME: u16 = 1 << 11;
const METHOD_STORED: u16 = 0;

// 1980-01-01 00:00:00, the MS-DOS epoch. Identical inputs give identical bytes.
const DOS_TIME: u16 = 0;
const DOS_DATE: u16 = (1 << 5) | 1;

const LOCAL_HEADER_LEN: usize = 30;
const CENTRAL_HEADER_LEN: usize = 46;
const END_RECORD_LEN: usize = 22;
const ZIP64_END_RECORD_LEN: usize = 56;
const ZIP64_LOCATOR_LEN: usize = 20;

const U16_LIMIT: u64 = 0xFFFF;
const U32_LIMIT: u64 = 0xFFFF_FFFF;

/// Default size of the payload slices handed to the sink.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Framing failures. None of them change the writer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    /// Entry name was empty.
    #[error("archive entry name is empty")]
    EmptyName,

    /// Entry name does not fit the 16-bit length field.
    #[error("archive entry name `{name}` is {len} bytes long (limit 65535)")]
    NameTooLong {
        /// First 64 characters of the name.
        name: String,
        /// Full length in bytes.
        len: usize,
    },

    /// An entry was offered after [`ArchiveWriter::finish`].
    #[error("cannot add `{0}`: archive already finished")]
    AddAfterFinish(String),

    /// [`ArchiveWriter::finish`] was called twice.
    #[error("archive already finished")]
    Finished,
}

impl ArchiveError {
    /// Name of the entry the failure belongs to, if any.
    pub fn entry(&self) -> Option<&str> {
        match self {
            Self::NameTooLong { name, .. } | Self::AddAfterFinish(name) => Some(name),
            Self::EmptyName | Self::Finished => None,
        }
    }
}

/// What a finished archive contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Entry names in framing order.
    pub entries: Vec<String>,
    /// Total bytes of the container, trailer included.
    pub bytes_written: u64,
}

/// Trailing metadata plus the final summary, returned by [`ArchiveWriter::finish`].
#[derive(Debug, Clone)]
pub struct ArchiveTrailer {
    /// Central directory and end records.
    pub bytes: Bytes,
    /// Entries and total size, trailer included.
    pub summary: ArchiveSummary,
}

#[derive(Debug, Clone)]
struct CentralRecord {
    name: String,
    crc: u32,
    size: u64,
    offset: u64,
}

impl CentralRecord {
    fn needs_zip64(&self) -> bool {
        self.size >= U32_LIMIT || self.offset >= U32_LIMIT
    }
}

/// Output chunks of one entry: the local header, then the payload in slices.
///
/// Slices share the payload buffer, nothing is copied. The writer has already
/// accounted for every byte, so all chunks must reach the output for the
/// archive to be valid.
#[derive(Debug)]
pub struct EntryFrames {
    header: Option<Bytes>,
    payload: Bytes,
    position: usize,
    chunk_size: usize,
}

impl Iterator for EntryFrames {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        if let Some(header) = self.header.take() {
            return Some(header);
        }
        if self.position >= self.payload.len() {
            return None;
        }
        let end = (self.position + self.chunk_size).min(self.payload.len());
        let chunk = self.payload.slice(self.position..end);
        self.position = end;
        Some(chunk)
    }
}

/// Incremental writer for a stored (uncompressed) ZIP container.
#[derive(Debug)]
pub struct ArchiveWriter {
    chunk_size: usize,
    offset: u64,
    records: Vec<CentralRecord>,
    finished: bool,
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::open(DEFAULT_CHUNK_SIZE)
    }
}

impl ArchiveWriter {
    /// Start a new, empty container.
    pub fn open(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            offset: 0,
            records: Vec::new(),
            finished: false,
        }
    }

    /// Frame one entry. Entries appear in the container in call order.
    ///
    /// # Errors
    ///
    /// Fails without changing the writer if the name is empty or longer than
    /// 65535 bytes, or if [`finish`](Self::finish) was already called.
    pub fn add_entry(&mut self, name: &str, payload: Bytes) -> Result<EntryFrames, ArchiveError> {
        if self.finished {
            return Err(ArchiveError::AddAfterFinish(name.to_string()));
        }
        if name.is_empty() {
            return Err(ArchiveError::EmptyName);
        }
        if name.len() as u64 > U16_LIMIT {
            return Err(ArchiveError::NameTooLong {
                name: name.chars().take(64).collect(),
                len: name.len(),
            });
        }

        let mut crc = Crc::new();
        crc.update(&payload);
        let record = CentralRecord {
            name: name.to_string(),
            crc: crc.sum(),
            size: payload.len() as u64,
            offset: self.offset,
        };

        let header = local_header(&record);
        self.offset += header.len() as u64 + record.size;
        tracing::debug!(
            "Framed {} ({} bytes, crc {:08x}) at offset {}",
            record.name,
            record.size,
            record.crc,
            record.offset
        );
        self.records.push(record);

        Ok(EntryFrames {
            header: Some(header),
            payload,
            position: 0,
            chunk_size: self.chunk_size,
        })
    }

    /// Emit the central directory and end records. No entry can follow.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Finished`] if called twice.
    pub fn finish(&mut self) -> Result<ArchiveTrailer, ArchiveError> {
        if self.finished {
            return Err(ArchiveError::Finished);
        }
        self.finished = true;

        let cd_offset = self.offset;
        let mut buf = BytesMut::with_capacity(
            self.records
                .iter()
                .map(|r| CENTRAL_HEADER_LEN + r.name.len() + 28)
                .sum::<usize>()
                + ZIP64_END_RECORD_LEN
                + ZIP64_LOCATOR_LEN
                + END_RECORD_LEN,
        );
        for record in &self.records {
            put_central_header(&mut buf, record);
        }
        let cd_size = buf.len() as u64;
        put_end_records(&mut buf, self.records.len() as u64, cd_size, cd_offset);

        self.offset += buf.len() as u64;
        let summary = ArchiveSummary {
            entries: self.records.iter().map(|r| r.name.clone()).collect(),
            bytes_written: self.offset,
        };
        tracing::debug!(
            "Archive trailer: {} entries, {} bytes total",
            summary.entries.len(),
            summary.bytes_written
        );

        Ok(ArchiveTrailer {
            bytes: buf.freeze(),
            summary,
        })
    }
}

fn local_header(record: &CentralRecord) -> Bytes {
    let zip64 = record.size >= U32_LIMIT;
    let name = record.name.as_bytes();
    let extra_len: u16 = if zip64 { 20 } else { 0 };
    let small_size = if zip64 {
        u32::MAX
    } else {
        record.size as u32
    };

    let mut buf = BytesMut::with_capacity(LOCAL_HEADER_LEN + name.len() + usize::from(extra_len));
    buf.put_u32_le(LOCAL_FILE_HEADER_SIG);
    buf.put_u16_le(if zip64 { VERSION_ZIP64 } else { VERSION_STORED });
    buf.put_u16_le(FLAG_UTF8_NAME);
    buf.put_u16_le(METHOD_STORED);
    buf.put_u16_le(DOS_TIME);
    buf.put_u16_le(DOS_DATE);
    buf.put_u32_le(record.crc);
    buf.put_u32_le(small_size); // compressed
    buf.put_u32_le(small_size); // uncompressed
    buf.put_u16_le(name.len() as u16);
    buf.put_u16_le(extra_len);
    buf.put_slice(name);
    if zip64 {
        buf.put_u16_le(ZIP64_EXTRA_ID);
        buf.put_u16_le(16);
        buf.put_u64_le(record.size);
        buf.put_u64_le(record.size);
    }
    buf.freeze()
}

fn put_central_header(buf: &mut BytesMut, record: &CentralRecord) {
    let zip64 = record.needs_zip64();
    let name = record.name.as_bytes();
    let version = if zip64 { VERSION_ZIP64 } else { VERSION_STORED };
    let (small_size, small_offset) = if zip64 {
        (u32::MAX, u32::MAX)
    } else {
        (record.size as u32, record.offset as u32)
    };

    buf.put_u32_le(CENTRAL_DIR_HEADER_SIG);
    buf.put_u16_le(version); // made by
    buf.put_u16_le(version); // needed to extract
    buf.put_u16_le(FLAG_UTF8_NAME);
    buf.put_u16_le(METHOD_STORED);
    buf.put_u16_le(DOS_TIME);
    buf.put_u16_le(DOS_DATE);
    buf.put_u32_le(record.crc);
    buf.put_u32_le(small_size);
    buf.put_u32_le(small_size);
    buf.put_u16_le(name.len() as u16);
    buf.put_u16_le(if zip64 { 28 } else { 0 });
    buf.put_u16_le(0); // comment
    buf.put_u16_le(0); // disk number start
    buf.put_u16_le(0); // internal attributes
    buf.put_u32_le(0); // external attributes
    buf.put_u32_le(small_offset);
    buf.put_slice(name);
    if zip64 {
        buf.put_u16_le(ZIP64_EXTRA_ID);
        buf.put_u16_le(24);
        buf.put_u64_le(record.size);
        buf.put_u64_le(record.size);
        buf.put_u64_le(record.offset);
    }
}

fn put_end_records(buf: &mut BytesMut, entries: u64, cd_size: u64, cd_offset: u64) {
    if entries >= U16_LIMIT || cd_size >= U32_LIMIT || cd_offset >= U32_LIMIT {
        let record_offset = cd_offset + cd_size;

        buf.put_u32_le(ZIP64_END_OF_CENTRAL_DIR_SIG);
        buf.put_u64_le((ZIP64_END_RECORD_LEN - 12) as u64);
        buf.put_u16_le(VERSION_ZIP64);
        buf.put_u16_le(VERSION_ZIP64);
        buf.put_u32_le(0); // this disk
        buf.put_u32_le(0); // disk with central directory
        buf.put_u64_le(entries);
        buf.put_u64_le(entries);
        buf.put_u64_le(cd_size);
        buf.put_u64_le(cd_offset);

        buf.put_u32_le(ZIP64_LOCATOR_SIG);
        buf.put_u32_le(0);
        buf.put_u64_le(record_offset);
        buf.put_u32_le(1); // total disks
    }

    buf.put_u32_le(END_OF_CENTRAL_DIR_SIG);
    buf.put_u16_le(0);
    buf.put_u16_le(0);
    buf.put_u16_le(entries.min(U16_LIMIT) as u16);
    buf.put_u16_le(entries.min(U16_LIMIT) as u16);
    buf.put_u32_le(cd_size.min(U32_LIMIT) as u32);
    buf.put_u32_le(cd_offset.min(U32_LIMIT) as u32);
    buf.put_u16_le(0); // comment
}
