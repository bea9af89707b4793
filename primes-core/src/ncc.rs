//! Numerical chain compression (NCC) decoding.
//!
//! An NCC stream stores an ascending sequence of `u64` as gaps. The first record is an
//! 8 byte anchor holding an absolute value, followed by 2 byte deltas from the previous
//! value. A zero delta is a sentinel announcing that the next record is a fresh anchor,
//! used whenever a gap doesn't fit in 16 bits.
//!
//! ```text
//! [anchor:8] ([delta:2])* ( [0x0000] [anchor:8] ([delta:2])* )*
//! ```
//!
//! All integers are little-endian. There is no header, length or checksum, so a decode
//! must start on a record boundary; [`AnchorIndex`] lists the boundaries that are safe.

use log::*;
use std::{
    fs::File,
    io::{self, BufReader, ErrorKind, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

/// Size of an anchor record in bytes.
pub const ANCHOR_LEN: usize = 8;

/// Size of a delta record in bytes.
pub const DELTA_LEN: usize = 2;

/// Errors while decoding an NCC stream.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The file could not be opened.
    #[error("failed to open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The stream ended inside, or right before, an 8 byte anchor.
    #[error("short read of anchor record at byte {offset}")]
    ShortReadAnchor { offset: u64 },
    /// The stream ended inside, or right before, a 2 byte delta.
    #[error("short read of delta record at byte {offset}")]
    ShortReadDelta { offset: u64 },
    /// More values were requested than the output buffer holds.
    #[error("requested {length} values but the buffer holds {capacity}")]
    BufferOverflow { length: usize, capacity: usize },
    /// An anchor after a sentinel does not exceed the value before it.
    #[error("anchor {value} at byte {offset} does not exceed the previous value {previous}")]
    NotAscending {
        offset: u64,
        value: u64,
        previous: u64,
    },
    /// A delta pushed the running value past `u64::MAX`.
    #[error("delta at byte {offset} overflows the running value")]
    DeltaOverflow { offset: u64 },
    /// Any other I/O failure while seeking or reading.
    #[error("I/O error at byte {offset}")]
    Io {
        offset: u64,
        #[source]
        source: io::Error,
    },
}

/// A single on-disk record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GapRecord {
    /// Absolute value, resets the delta baseline.
    Anchor(u64),
    /// Offset from the previous value, `0` is the resync sentinel.
    Delta(u16),
}

impl GapRecord {
    /// The zero delta announcing a fresh anchor.
    pub const SENTINEL: GapRecord = GapRecord::Delta(0);

    /// Encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            GapRecord::Anchor(_) => ANCHOR_LEN,
            GapRecord::Delta(_) => DELTA_LEN,
        }
    }
}

/// Which record kind the decoder expects next.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Mode {
    Anchor,
    Delta,
}

/// How much of a fixed size record could be read.
enum Fill {
    Full,
    /// Nothing left, the stream ended on a record boundary.
    Empty,
    Partial,
}

/// Streaming NCC decoder.
///
/// Iterating yields every value in the stream and stops cleanly when the stream ends on
/// a record boundary. A truncated record is yielded as an error, after which the
/// iterator is exhausted.
pub struct Decoder<R> {
    reader: R,
    /// Absolute byte offset of the next record, used for error reporting.
    offset: u64,
    /// Running baseline, `None` until the first anchor.
    last: Option<u64>,
    mode: Mode,
    done: bool,
}

impl<R: Read> Decoder<R> {
    /// Create a decoder for a stream positioned at an anchor.
    pub fn new(reader: R) -> Self {
        Self::at_offset(reader, 0)
    }

    /// Create a decoder for a stream already positioned at byte `offset`, which must be an
    /// anchor record. The offset is only used for error reporting.
    pub fn at_offset(reader: R, offset: u64) -> Self {
        Self {
            reader,
            offset,
            last: None,
            mode: Mode::Anchor,
            done: false,
        }
    }

    /// Byte offset of the next record.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read the next raw record together with its byte offset.
    ///
    /// Returns `Ok(None)` when the stream ends exactly where a record would start.
    pub fn next_record(&mut self) -> Result<Option<(u64, GapRecord)>, DecodeError> {
        let offset = self.offset;

        let record = match self.mode {
            Mode::Anchor => {
                let mut buf = [0; ANCHOR_LEN];
                match self.fill(&mut buf)? {
                    Fill::Full => {}
                    Fill::Empty => return Ok(None),
                    Fill::Partial => return Err(DecodeError::ShortReadAnchor { offset }),
                }
                GapRecord::Anchor(u64::from_le_bytes(buf))
            }
            Mode::Delta => {
                let mut buf = [0; DELTA_LEN];
                match self.fill(&mut buf)? {
                    Fill::Full => {}
                    Fill::Empty => return Ok(None),
                    Fill::Partial => return Err(DecodeError::ShortReadDelta { offset }),
                }
                GapRecord::Delta(u16::from_le_bytes(buf))
            }
        };

        self.offset += record.encoded_len() as u64;
        self.mode = match record {
            GapRecord::Delta(0) => Mode::Anchor,
            _ => Mode::Delta,
        };

        Ok(Some((offset, record)))
    }

    /// Decode the next value, treating the end of the stream as a short read.
    pub fn next_value(&mut self) -> Result<u64, DecodeError> {
        match self.step()? {
            Some(value) => Ok(value),
            None => Err(self.short_read()),
        }
    }

    fn step(&mut self) -> Result<Option<u64>, DecodeError> {
        loop {
            let Some((offset, record)) = self.next_record()? else {
                return Ok(None);
            };

            match record {
                GapRecord::Anchor(value) => {
                    trace!("anchor {value} at byte {offset}");
                    if let Some(previous) = self.last.filter(|&p| value <= p) {
                        return Err(DecodeError::NotAscending {
                            offset,
                            value,
                            previous,
                        });
                    }
                    self.last = Some(value);
                    return Ok(Some(value));
                }
                GapRecord::Delta(0) => continue,
                GapRecord::Delta(delta) => {
                    // A delta always follows an anchor, so `last` is set here.
                    let value = self
                        .last
                        .unwrap_or_default()
                        .checked_add(delta as u64)
                        .ok_or(DecodeError::DeltaOverflow { offset })?;
                    self.last = Some(value);
                    return Ok(Some(value));
                }
            }
        }
    }

    fn short_read(&self) -> DecodeError {
        let offset = self.offset;
        match self.mode {
            Mode::Anchor => DecodeError::ShortReadAnchor { offset },
            Mode::Delta => DecodeError::ShortReadDelta { offset },
        }
    }

    // Like `read_exact`, but tells an empty stream apart from a truncated record.
    fn fill(&mut self, buf: &mut [u8]) -> Result<Fill, DecodeError> {
        let mut filled = 0;

        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(source) => {
                    return Err(DecodeError::Io {
                        offset: self.offset + filled as u64,
                        source,
                    })
                }
            }
        }

        Ok(match filled {
            0 => Fill::Empty,
            n if n == buf.len() => Fill::Full,
            _ => Fill::Partial,
        })
    }
}

impl<R: Read> Iterator for Decoder<R> {
    type Item = Result<u64, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let item = self.step().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }

        item
    }
}

/// Decode exactly `length` values from `reader` into the front of `out`.
///
/// The reader must be positioned on an anchor record.
pub fn decode_into<R: Read>(reader: R, out: &mut [u64], length: usize) -> Result<(), DecodeError> {
    if length > out.len() {
        return Err(DecodeError::BufferOverflow {
            length,
            capacity: out.len(),
        });
    }

    let mut decoder = Decoder::new(reader);
    for slot in &mut out[..length] {
        *slot = decoder.next_value()?;
    }

    Ok(())
}

/// Most values `stream_len` bytes can hold, bounding the up-front reservation so a huge
/// `length` fails with a short read instead of a failed allocation.
fn capacity_hint(length: usize, stream_len: u64) -> usize {
    let most = (stream_len / DELTA_LEN as u64).saturating_add(1);
    length.min(usize::try_from(most).unwrap_or(usize::MAX))
}

/// Pull exactly `length` values out of `decoder`.
fn collect_values<R: Read>(
    decoder: &mut Decoder<R>,
    length: usize,
    stream_len: u64,
) -> Result<Vec<u64>, DecodeError> {
    let mut out = Vec::with_capacity(capacity_hint(length, stream_len));
    for _ in 0..length {
        out.push(decoder.next_value()?);
    }

    Ok(out)
}

/// Decode exactly `length` values from an in-memory stream.
pub fn decode_bytes(bytes: &[u8], length: usize) -> Result<Vec<u64>, DecodeError> {
    collect_values(&mut Decoder::new(bytes), length, bytes.len() as u64)
}

/// Decode exactly `length` values from the file at `path`, starting at byte `start`.
///
/// `start` must be the offset of an anchor record, such as `0` or an offset taken from
/// an [`AnchorIndex`]. The file is only read.
pub fn decode_gaps(
    path: impl AsRef<Path>,
    length: usize,
    start: u64,
) -> Result<Vec<u64>, DecodeError> {
    let path = path.as_ref();
    debug!(
        "Decoding {length} values from {} at byte {start}",
        path.display()
    );

    let reader = open_at(path, start)?;
    let file_len = reader
        .get_ref()
        .metadata()
        .map_err(|source| DecodeError::Io {
            offset: start,
            source,
        })?
        .len();

    let mut decoder = Decoder::at_offset(reader, start);
    collect_values(&mut decoder, length, file_len.saturating_sub(start))
}

fn open_at(path: &Path, start: u64) -> Result<BufReader<File>, DecodeError> {
    let file = File::open(path).map_err(|source| DecodeError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = BufReader::new(file);
    reader
        .seek(SeekFrom::Start(start))
        .map_err(|source| DecodeError::Io {
            offset: start,
            source,
        })?;

    Ok(reader)
}

/// Location of one anchor record in a stream.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AnchorEntry {
    /// Byte offset of the anchor record.
    pub offset: u64,
    /// Index of the value the anchor decodes to.
    pub position: u64,
    /// The anchor value itself.
    pub value: u64,
}

/// Record-aligned entry points into an NCC stream.
///
/// Built with one sequential pass, it lets a caller decode from the middle of a stream
/// without guessing where records start.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnchorIndex {
    entries: Vec<AnchorEntry>,
    /// Total number of values in the stream.
    len: u64,
}

impl AnchorIndex {
    /// Scan a whole stream, which must start at byte 0 with an anchor.
    pub fn scan<R: Read>(reader: R) -> Result<Self, DecodeError> {
        let mut decoder = Decoder::new(reader);
        let mut index = Self::default();

        while let Some((offset, record)) = decoder.next_record()? {
            match record {
                GapRecord::Anchor(value) => {
                    index.entries.push(AnchorEntry {
                        offset,
                        position: index.len,
                        value,
                    });
                    index.len += 1;
                }
                GapRecord::Delta(0) => {}
                GapRecord::Delta(_) => index.len += 1,
            }
        }

        debug!(
            "Indexed {} anchors over {} values",
            index.entries.len(),
            index.len
        );

        Ok(index)
    }

    /// Scan the file at `path`.
    pub fn scan_file(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        Self::scan(open_at(path.as_ref(), 0)?)
    }

    pub fn entries(&self) -> &[AnchorEntry] {
        &self.entries
    }

    /// Number of values in the indexed stream.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Last anchor at or before value `position`.
    pub fn seek_before(&self, position: u64) -> Option<&AnchorEntry> {
        let after = self.entries.partition_point(|e| e.position <= position);
        after.checked_sub(1).map(|i| &self.entries[i])
    }

    /// Decode `length` values starting at value `position`, resuming from the closest
    /// preceding anchor.
    pub fn decode_range<R: Read + Seek>(
        &self,
        mut reader: R,
        position: u64,
        length: usize,
    ) -> Result<Vec<u64>, DecodeError> {
        let Some(entry) = self.seek_before(position) else {
            return Err(DecodeError::ShortReadAnchor { offset: 0 });
        };

        let io_error = |source| DecodeError::Io {
            offset: entry.offset,
            source,
        };
        let stream_len = reader.seek(SeekFrom::End(0)).map_err(io_error)?;
        reader
            .seek(SeekFrom::Start(entry.offset))
            .map_err(io_error)?;

        let mut decoder = Decoder::at_offset(reader, entry.offset);
        for _ in entry.position..position {
            decoder.next_value()?;
        }

        collect_values(
            &mut decoder,
            length,
            stream_len.saturating_sub(entry.offset),
        )
    }
}
