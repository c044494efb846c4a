//! S98 file reader and parser

use super::commands::S98Command;
use super::header::{offset, DeviceRecord, S98Header, S98_HEADER_SIZE, S98_MAGIC};
use super::sync::{cmd, decode_varint};
use super::tag;
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// S98 file reader
pub struct S98Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> S98Reader<'a> {
    /// Create a new reader from raw S98 data
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| Error::S98Parse("Unexpected end of data".into()))?;
        self.pos += 1;
        Ok(b)
    }

    /// Read a u32 at a specific offset without advancing position
    fn peek_u32_at(&self, at: usize) -> Result<u32> {
        let bytes = self
            .data
            .get(at..at + 4)
            .ok_or_else(|| Error::S98Parse("Offset out of bounds".into()))?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Validate magic and parse header and device table
    pub fn parse_header(&mut self) -> Result<S98Header> {
        if self.data.len() < S98_HEADER_SIZE {
            return Err(Error::S98Parse("File too small for S98 header".into()));
        }
        if &self.data[offset::IDENT..offset::IDENT + 3] != S98_MAGIC {
            return Err(Error::S98Parse("Invalid S98 magic".into()));
        }

        let device_count = self.peek_u32_at(offset::DEVICE_COUNT)? as usize;
        let mut devices = Vec::with_capacity(device_count.min(64));
        for i in 0..device_count {
            let at = offset::DEVICES + i * super::header::DEVICE_RECORD_SIZE;
            devices.push(DeviceRecord {
                device_type: self.peek_u32_at(at)?,
                clock: self.peek_u32_at(at + 4)?,
                pan: self.peek_u32_at(at + 8)?,
            });
        }

        Ok(S98Header {
            version: self.data[offset::VERSION],
            numerator: self.peek_u32_at(offset::TIMER_NUMERATOR)?,
            denominator: self.peek_u32_at(offset::TIMER_DENOMINATOR)?,
            tag_offset: self.peek_u32_at(offset::TAG_OFFSET)?,
            dump_offset: self.peek_u32_at(offset::DUMP_OFFSET)?,
            loop_offset: self.peek_u32_at(offset::LOOP_OFFSET)?,
            devices,
        })
    }

    /// Parse the tag block, if any
    pub fn parse_tag(&mut self, header: &S98Header) -> Result<Option<BTreeMap<String, String>>> {
        if header.tag_offset == 0 {
            return Ok(None);
        }
        let start = header.tag_offset as usize;
        let data = self
            .data
            .get(start..)
            .ok_or_else(|| Error::S98Parse("Tag offset out of bounds".into()))?;
        Ok(tag::parse_tag(data))
    }

    /// Parse all dump commands up to and including the end marker
    pub fn parse_commands(&mut self, header: &S98Header) -> Result<Vec<S98Command>> {
        self.seek(header.dump_offset as usize);

        let mut commands = Vec::new();
        while !self.is_eof() {
            let command = self.parse_command()?;
            commands.push(command);
            if command == S98Command::End {
                break;
            }
        }
        Ok(commands)
    }

    /// Parse a single dump command
    fn parse_command(&mut self) -> Result<S98Command> {
        let op = self.read_u8()?;
        let command = match op {
            cmd::SYNC => S98Command::Sync,
            cmd::SYNC_N => {
                let rest = self.data.get(self.pos..).unwrap_or(&[]);
                let (value, used) = decode_varint(rest)
                    .ok_or_else(|| Error::S98Parse("Truncated sync count".into()))?;
                self.pos += used;
                S98Command::SyncN { count: value + 2 }
            }
            cmd::END => S98Command::End,
            _ => {
                let reg = self.read_u8()?;
                let data = self.read_u8()?;
                S98Command::Write {
                    device: op / 2,
                    port: op % 2,
                    reg,
                    data,
                }
            }
        };
        Ok(command)
    }

    /// Index of the first command at or after the loop offset
    pub fn loop_command_index(&mut self, header: &S98Header) -> Result<Option<usize>> {
        if header.loop_offset == 0 {
            return Ok(None);
        }
        self.seek(header.dump_offset as usize);
        let mut index = 0;
        while !self.is_eof() && self.pos < header.loop_offset as usize {
            if self.parse_command()? == S98Command::End {
                break;
            }
            index += 1;
        }
        Ok(Some(index))
    }
}
