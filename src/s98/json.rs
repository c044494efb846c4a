//! JSON serialization types for S98 data

use super::commands::S98Command;
use super::header::{DeviceRecord, S98Header};
use crate::song::DeviceType;
use serde::Serialize;
use std::collections::BTreeMap;

/// Top-level JSON structure for an S98 file
#[derive(Debug, Clone, Serialize)]
pub struct S98Json {
    /// Format version digit (e.g., "3")
    pub version: String,
    pub header: S98HeaderJson,
    /// Tag fields (if present)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<BTreeMap<String, String>>,
    /// Dump commands
    pub commands: Vec<S98Command>,
}

/// JSON representation of the S98 header
#[derive(Debug, Clone, Serialize)]
pub struct S98HeaderJson {
    pub timer_numerator: u32,
    pub timer_denominator: u32,
    pub dump_offset: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_offset: Option<u32>,
    pub devices: Vec<DeviceJson>,
}

/// JSON representation of a device record
#[derive(Debug, Clone, Serialize)]
pub struct DeviceJson {
    /// Device type name, or its numeric code if unknown
    #[serde(rename = "type")]
    pub device_type: String,
    pub clock: u32,
    pub pan: u32,
}

impl S98Json {
    /// Create an S98Json from parsed S98 data
    pub fn new(
        header: &S98Header,
        tag: Option<BTreeMap<String, String>>,
        commands: Vec<S98Command>,
    ) -> Self {
        Self {
            version: (header.version as char).to_string(),
            header: S98HeaderJson::from(header),
            tag,
            commands,
        }
    }

    /// Total sync units in the dump
    pub fn total_sync(&self) -> u64 {
        self.commands.iter().map(|c| c.sync_count()).sum()
    }
}

impl From<&S98Header> for S98HeaderJson {
    fn from(header: &S98Header) -> Self {
        Self {
            timer_numerator: header.numerator,
            timer_denominator: header.denominator,
            dump_offset: header.dump_offset,
            tag_offset: non_zero(header.tag_offset),
            loop_offset: non_zero(header.loop_offset),
            devices: header.devices.iter().map(DeviceJson::from).collect(),
        }
    }
}

impl From<&DeviceRecord> for DeviceJson {
    fn from(record: &DeviceRecord) -> Self {
        let device_type = DeviceType::from_code(record.device_type)
            .map(|t| t.name().to_string())
            .unwrap_or_else(|| record.device_type.to_string());
        Self {
            device_type,
            clock: record.clock,
            pan: record.pan,
        }
    }
}

fn non_zero(value: u32) -> Option<u32> {
    if value == 0 {
        None
    } else {
        Some(value)
    }
}
