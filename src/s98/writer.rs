//! S98 file writer

use super::header::{DeviceRecord, S98Header};
use super::sync;
use super::tag;
use crate::error::Result;
use crate::song::Device;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Tolerance for floating-point sync accumulation
const SYNC_EPSILON: f64 = 1e-9;

/// Buffered S98 writer
///
/// Register writes and waits go to an in-memory dump; the header is
/// computed when the file is finalized.
pub struct S98Writer {
    header: S98Header,
    dump: Vec<u8>,
    /// Seconds per sync unit
    base_tick: f64,
    /// Wait time not yet emitted as sync units
    sync_buffer: f64,
    /// Dump offset of the loop point
    loop_point: Option<usize>,
    title: Option<String>,
}

impl S98Writer {
    pub fn new() -> Self {
        let header = S98Header::new();
        let base_tick = header.sync_seconds();
        Self {
            header,
            dump: Vec::new(),
            base_tick,
            sync_buffer: 0.0,
            loop_point: None,
            title: None,
        }
    }

    /// Append a device record
    pub fn add_device(&mut self, device: &Device) {
        self.header.devices.push(DeviceRecord::from(device));
    }

    /// Set the title written to the tag block
    pub fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    /// Write a register; addresses >= 0x100 select the extended bank
    pub fn write(&mut self, device: usize, address: u16, value: u8) {
        let port = u8::from(address >= 0x100);
        self.dump.push((device * 2) as u8 + port);
        self.dump.push((address & 0xFF) as u8);
        self.dump.push(value);
    }

    /// Advance time; whole sync units are emitted, the remainder is carried
    pub fn wait(&mut self, seconds: f64) {
        self.sync_buffer += seconds;
        if self.sync_buffer + SYNC_EPSILON < self.base_tick {
            return;
        }
        let count = ((self.sync_buffer + SYNC_EPSILON) / self.base_tick).floor();
        self.sync_buffer -= self.base_tick * count;
        self.dump.extend(sync::generate_sync(count as u64));
    }

    /// Mark the current dump position as the loop point
    pub fn mark_loop(&mut self) {
        self.loop_point = Some(self.dump.len());
    }

    /// Write end of data marker
    pub fn write_end(&mut self) {
        self.dump.push(sync::cmd::END);
    }

    /// Raw dump data written so far
    pub fn dump(&self) -> &[u8] {
        &self.dump
    }

    /// Assemble header, dump and tag
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut header = self.header.clone();
        let dump_offset = header.size();
        let dump_end = dump_offset + self.dump.len();

        header.dump_offset = dump_offset as u32;
        header.loop_offset = self
            .loop_point
            .map(|p| (dump_offset + p) as u32)
            .unwrap_or(0);
        header.tag_offset = if self.title.is_some() {
            dump_end as u32
        } else {
            0
        };

        let mut data = header.to_bytes();
        data.extend_from_slice(&self.dump);
        if let Some(title) = &self.title {
            data.extend(tag::generate_tag(title));
        }
        data
    }

    /// Write the finished file
    pub fn finalize(&self, path: &Path) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(&self.to_bytes())?;
        file.flush()?;
        Ok(())
    }
}

impl Default for S98Writer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s98::header::offset;
    use crate::song::DeviceType;

    fn u32_at(data: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
    }

    #[test]
    fn test_write_triples() {
        let mut w = S98Writer::new();
        w.write(0, 0x29, 0x80);
        w.write(1, 0x1A4, 0x22);
        assert_eq!(w.dump(), &[0x00, 0x29, 0x80, 0x03, 0xA4, 0x22]);
    }

    #[test]
    fn test_wait_carries_remainder() {
        let mut w = S98Writer::new();
        w.wait(0.004);
        assert!(w.dump().is_empty());
        w.wait(0.004);
        assert!(w.dump().is_empty());
        w.wait(0.004);
        assert_eq!(w.dump(), &[0xFF]);
        // 0.002 carried over
        w.wait(0.5);
        assert_eq!(w.dump(), &[0xFF, 0xFE, 48]);
    }

    #[test]
    fn test_offsets() {
        let mut w = S98Writer::new();
        w.add_device(&Device::new(DeviceType::Opna));
        w.write(0, 0x29, 0x80);
        w.mark_loop();
        w.wait(0.01);
        w.write_end();
        w.set_title("Song");

        let data = w.to_bytes();
        assert_eq!(u32_at(&data, offset::DUMP_OFFSET), 0x30);
        assert_eq!(u32_at(&data, offset::LOOP_OFFSET), 0x33);
        assert_eq!(u32_at(&data, offset::TAG_OFFSET), 0x30 + 5);
        assert_eq!(&data[0x35..0x3A], b"[S98]");
    }

    #[test]
    fn test_no_loop_no_tag() {
        let mut w = S98Writer::new();
        w.add_device(&Device::new(DeviceType::Opna));
        w.write_end();
        let data = w.to_bytes();
        assert_eq!(u32_at(&data, offset::LOOP_OFFSET), 0);
        assert_eq!(u32_at(&data, offset::TAG_OFFSET), 0);
        assert_eq!(data.len(), 0x31);
    }
}
