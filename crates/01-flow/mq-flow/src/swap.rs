//! Disk-backed overflow ring used once a queue passes its high watermark.
//!
//! Layout:
//!
//! ```text
//! +---------------------------------------------------------------+
//! | data region (capacity bytes, mapped from an unlinked tempfile) |
//! +---------------------------------------------------------------+
//!   Record:
//!   [u32 payload_len][u8 type][3 pad][u32 source][payload ...]
//!   Records wrap byte-wise at the end of the region.
//! ```
//!
//! The ring is single-owner: the flow controller holding it is always behind
//! its queue's lock, so head/tail are plain offsets.

use std::fs::File;
use std::io;
use std::path::Path;

use bytes::Bytes;
use memmap2::{MmapMut, MmapOptions};

use crate::controller::Delivery;
use crate::message::{Message, MessageType};
use crate::{FlowError, FlowResult};

/// Bytes of bookkeeping stored ahead of every swapped payload.
pub const SWAP_RECORD_HEADER: usize = 12;

pub struct SwapArea {
    map: MmapMut,
    _file: File,
    capacity: usize,
    head: usize,
    tail: usize,
    used: usize,
    records: usize,
}

impl SwapArea {
    /// Creates a swap area of `capacity` bytes backed by a temporary file in `dir`
    /// (or the OS temp directory).
    pub fn new(capacity: usize, dir: Option<&Path>) -> FlowResult<Self> {
        if capacity < SWAP_RECORD_HEADER {
            return Err(FlowError::RecordTooLarge {
                len: SWAP_RECORD_HEADER,
                capacity,
            });
        }
        let file = match dir {
            Some(dir) => tempfile::tempfile_in(dir)?,
            None => tempfile::tempfile()?,
        };
        file.set_len(capacity as u64)?;
        // SAFETY: the file is unlinked and owned by this area; nothing else maps or resizes it.
        let map = unsafe { MmapOptions::new().len(capacity).map_mut(&file)? };
        Ok(Self {
            map,
            _file: file,
            capacity,
            head: 0,
            tail: 0,
            used: 0,
            records: 0,
        })
    }

    /// Bytes a payload of `payload_len` occupies once swapped.
    pub const fn record_len(payload_len: usize) -> usize {
        SWAP_RECORD_HEADER + payload_len
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used_bytes(&self) -> usize {
        self.used
    }

    pub fn len(&self) -> usize {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// True when a payload of `payload_len` bytes can be appended right now.
    pub fn fits(&self, payload_len: usize) -> bool {
        self.capacity - self.used >= Self::record_len(payload_len)
    }

    /// Appends a delivery. Returns `Ok(false)` when the ring lacks room.
    pub fn push(&mut self, delivery: &Delivery) -> FlowResult<bool> {
        let payload = delivery.message.payload();
        let record_len = Self::record_len(payload.len());
        if record_len > self.capacity {
            return Err(FlowError::RecordTooLarge {
                len: record_len,
                capacity: self.capacity,
            });
        }
        if !self.fits(payload.len()) {
            return Ok(false);
        }

        let mut header = [0u8; SWAP_RECORD_HEADER];
        header[..4].copy_from_slice(&(payload.len() as u32).to_le_bytes());
        header[4] = delivery.message.kind().to_byte();
        header[8..].copy_from_slice(&delivery.source.to_le_bytes());

        let head = self.head;
        self.write_at(head, &header);
        self.write_at(head + SWAP_RECORD_HEADER, payload);
        self.head = (head + record_len) % self.capacity;
        self.used += record_len;
        self.records += 1;
        Ok(true)
    }

    /// Removes the oldest delivery.
    pub fn pop(&mut self) -> FlowResult<Option<Delivery>> {
        if self.records == 0 {
            return Ok(None);
        }

        let mut header = [0u8; SWAP_RECORD_HEADER];
        let tail = self.tail;
        self.read_at(tail, &mut header);

        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&header[..4]);
        let len = u32::from_le_bytes(len_bytes) as usize;
        let kind = MessageType::from_byte(header[4]).ok_or_else(|| {
            FlowError::Swap(io::Error::new(
                io::ErrorKind::InvalidData,
                "corrupt swap record type",
            ))
        })?;
        let mut source_bytes = [0u8; 4];
        source_bytes.copy_from_slice(&header[8..]);
        let source = u32::from_le_bytes(source_bytes);

        let mut payload = vec![0u8; len];
        self.read_at(tail + SWAP_RECORD_HEADER, &mut payload);

        let record_len = Self::record_len(len);
        self.used -= record_len;
        self.records -= 1;
        if self.records == 0 {
            self.head = 0;
            self.tail = 0;
        } else {
            self.tail = (tail + record_len) % self.capacity;
        }

        Ok(Some(Delivery {
            source,
            message: Message::from_parts(kind, Bytes::from(payload)),
        }))
    }

    fn write_at(&mut self, offset: usize, bytes: &[u8]) {
        let start = offset % self.capacity;
        let first = bytes.len().min(self.capacity - start);
        self.map[start..start + first].copy_from_slice(&bytes[..first]);
        let rest = bytes.len() - first;
        if rest > 0 {
            self.map[..rest].copy_from_slice(&bytes[first..]);
        }
    }

    fn read_at(&self, offset: usize, out: &mut [u8]) {
        let start = offset % self.capacity;
        let first = out.len().min(self.capacity - start);
        out[..first].copy_from_slice(&self.map[start..start + first]);
        let rest = out.len() - first;
        if rest > 0 {
            out[first..].copy_from_slice(&self.map[..rest]);
        }
    }
}
