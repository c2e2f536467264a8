//! Append/prepend record accumulator
//!
//! Every BIFF substream (the workbook globals and each worksheet) is
//! collected in a [`ByteStream`]. A record whose total length exceeds the
//! version's record limit is split into a head record and CONTINUE
//! records before it is stored, so no physical record ever carries more
//! than `limit` bytes of data.

use bytes::{BufMut, BytesMut};
use log::trace;

use super::super::XlsResult;
use super::biff::{BiffVersion, RECORD_CONTINUE};

/// Growable BIFF record buffer
#[derive(Debug, Clone)]
pub struct ByteStream {
    data: BytesMut,
    limit: usize,
}

impl ByteStream {
    /// Create an empty stream using the record limit of `version`
    pub fn new(version: BiffVersion) -> Self {
        Self::with_limit(version.record_limit())
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            data: BytesMut::new(),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of bytes stored, after continuation splitting
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data.to_vec()
    }

    /// Append one complete record (header included)
    pub fn append(&mut self, record: &[u8]) {
        if record.len() > self.limit {
            let split = add_continue(record, self.limit);
            self.data.put_slice(&split);
        } else {
            self.data.put_slice(record);
        }
    }

    /// Append a run of records that are already split within the limit,
    /// such as the shared string table with its own CONTINUE records.
    pub fn append_framed(&mut self, records: &[u8]) {
        self.data.put_slice(records);
    }

    /// Insert one complete record (header included) in front of the stream
    pub fn prepend(&mut self, record: &[u8]) {
        let mut data = BytesMut::with_capacity(self.data.len() + record.len());
        if record.len() > self.limit {
            data.put_slice(&add_continue(record, self.limit));
        } else {
            data.put_slice(record);
        }
        data.put_slice(&self.data);
        self.data = data;
    }

    /// Build a record with one of the `write_*` record functions and append it.
    pub fn record<F>(&mut self, build: F) -> XlsResult<()>
    where
        F: FnOnce(&mut Vec<u8>) -> XlsResult<()>,
    {
        let mut buf = Vec::new();
        build(&mut buf)?;
        self.append(&buf);
        Ok(())
    }

    /// Build a record and insert it in front of the stream.
    pub fn prepend_record<F>(&mut self, build: F) -> XlsResult<()>
    where
        F: FnOnce(&mut Vec<u8>) -> XlsResult<()>,
    {
        let mut buf = Vec::new();
        build(&mut buf)?;
        self.prepend(&buf);
        Ok(())
    }
}

/// Split an oversized record into a head record and CONTINUE records.
///
/// The head keeps the original record type with its length field rewritten
/// to `limit - 4`; every following chunk gets a CONTINUE header. Records of
/// at most `limit` bytes are returned unchanged.
pub fn add_continue(record: &[u8], limit: usize) -> Vec<u8> {
    let len = record.len();
    if len <= limit || limit <= 4 {
        return record.to_vec();
    }

    let mut out = Vec::with_capacity(len + (len / limit + 1) * 4);
    out.extend_from_slice(&record[0..2]);
    out.extend_from_slice(&((limit - 4) as u16).to_le_bytes());
    out.extend_from_slice(&record[4..limit]);

    let mut pos = limit;
    let mut chunks = 0usize;
    while pos < len - limit {
        out.extend_from_slice(&RECORD_CONTINUE.to_le_bytes());
        out.extend_from_slice(&(limit as u16).to_le_bytes());
        out.extend_from_slice(&record[pos..pos + limit]);
        pos += limit;
        chunks += 1;
    }

    out.extend_from_slice(&RECORD_CONTINUE.to_le_bytes());
    out.extend_from_slice(&((len - pos) as u16).to_le_bytes());
    out.extend_from_slice(&record[pos..]);

    trace!(
        "split record 0x{:04X} of {} bytes into head + {} CONTINUE records",
        u16::from_le_bytes([record[0], record[1]]),
        len,
        chunks + 1
    );
    out
}
