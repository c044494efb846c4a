//! S98 header layout

use crate::song::Device;

/// File identifier
pub const S98_MAGIC: &[u8; 3] = b"S98";

/// Format version digit
pub const S98_VERSION: u8 = b'3';

/// Fixed header size in bytes
pub const S98_HEADER_SIZE: usize = 0x20;

/// Size of one device record
pub const DEVICE_RECORD_SIZE: usize = 0x10;

/// Default sync timer: 10 / 1000 seconds
pub const DEFAULT_NUMERATOR: u32 = 10;
pub const DEFAULT_DENOMINATOR: u32 = 1000;

/// S98 header offsets (in bytes)
pub mod offset {
    /// "S98" identifier
    pub const IDENT: usize = 0x00;
    /// Version digit
    pub const VERSION: usize = 0x03;
    /// Sync timer numerator
    pub const TIMER_NUMERATOR: usize = 0x04;
    /// Sync timer denominator
    pub const TIMER_DENOMINATOR: usize = 0x08;
    /// Compressing flag (unused, always 0)
    pub const COMPRESSING: usize = 0x0C;
    /// Tag offset (absolute, 0 if none)
    pub const TAG_OFFSET: usize = 0x10;
    /// Dump data offset (absolute)
    pub const DUMP_OFFSET: usize = 0x14;
    /// Loop point offset (absolute, 0 if none)
    pub const LOOP_OFFSET: usize = 0x18;
    /// Number of device records
    pub const DEVICE_COUNT: usize = 0x1C;
    /// First device record
    pub const DEVICES: usize = 0x20;
}

/// One device record: {type, clock, pan, reserved}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceRecord {
    pub device_type: u32,
    pub clock: u32,
    pub pan: u32,
}

impl From<&Device> for DeviceRecord {
    fn from(device: &Device) -> Self {
        Self {
            device_type: device.device_type.code(),
            clock: device.clock,
            pan: device.pan,
        }
    }
}

/// Parsed or to-be-written S98 header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S98Header {
    pub version: u8,
    pub numerator: u32,
    pub denominator: u32,
    pub tag_offset: u32,
    pub dump_offset: u32,
    pub loop_offset: u32,
    pub devices: Vec<DeviceRecord>,
}

impl S98Header {
    pub fn new() -> Self {
        Self {
            version: S98_VERSION,
            numerator: DEFAULT_NUMERATOR,
            denominator: DEFAULT_DENOMINATOR,
            tag_offset: 0,
            dump_offset: S98_HEADER_SIZE as u32,
            loop_offset: 0,
            devices: Vec::new(),
        }
    }

    /// Header size including the device table
    pub fn size(&self) -> usize {
        S98_HEADER_SIZE + self.devices.len() * DEVICE_RECORD_SIZE
    }

    /// Seconds per sync unit; zero fields fall back to 10/1000
    pub fn sync_seconds(&self) -> f64 {
        let numerator = if self.numerator == 0 {
            DEFAULT_NUMERATOR
        } else {
            self.numerator
        };
        let denominator = if self.denominator == 0 {
            DEFAULT_DENOMINATOR
        } else {
            self.denominator
        };
        numerator as f64 / denominator as f64
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.size());
        data.extend_from_slice(S98_MAGIC);
        data.push(self.version);
        for value in [
            self.numerator,
            self.denominator,
            0,
            self.tag_offset,
            self.dump_offset,
            self.loop_offset,
            self.devices.len() as u32,
        ] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        for device in &self.devices {
            for value in [device.device_type, device.clock, device.pan, 0] {
                data.extend_from_slice(&value.to_le_bytes());
            }
        }
        data
    }
}

impl Default for S98Header {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::DeviceType;

    #[test]
    fn test_header_bytes() {
        let mut header = S98Header::new();
        header.devices.push(DeviceRecord::from(&Device::new(DeviceType::Opna)));
        header.dump_offset = header.size() as u32;
        let bytes = header.to_bytes();

        assert_eq!(bytes.len(), 0x30);
        assert_eq!(&bytes[0..4], b"S983");
        assert_eq!(&bytes[offset::TIMER_NUMERATOR..][..4], &10u32.to_le_bytes());
        assert_eq!(&bytes[offset::TIMER_DENOMINATOR..][..4], &1000u32.to_le_bytes());
        assert_eq!(&bytes[offset::DUMP_OFFSET..][..4], &0x30u32.to_le_bytes());
        assert_eq!(&bytes[offset::DEVICE_COUNT..][..4], &1u32.to_le_bytes());
        assert_eq!(&bytes[offset::DEVICES..][..4], &4u32.to_le_bytes());
        assert_eq!(&bytes[offset::DEVICES + 4..][..4], &7_987_200u32.to_le_bytes());
    }
}
