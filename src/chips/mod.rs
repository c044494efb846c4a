//! Sound chip register encoders

pub mod opna;

use crate::s98::S98Writer;
use crate::song::{DeviceType, FmTone};

/// Static channel layout of a supported device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipSpec {
    pub name: &'static str,
    pub device_type: DeviceType,
    pub channels: usize,
    pub max_volume: i32,
}

/// Devices that can be declared with `#DEVICE`
const SUPPORTED_CHIPS: &[ChipSpec] = &[opna::SPEC];

/// Chip driver turning musical events into register writes
pub trait LogChip {
    /// Get chip name (e.g., "OPNA")
    fn name(&self) -> &'static str;

    /// Called once before any timing is written
    fn init(&mut self, writer: &mut S98Writer);

    /// Load an FM tone into a channel
    fn set_tone(&mut self, channel: usize, tone: &FmTone, writer: &mut S98Writer);

    /// Retune a channel to an absolute note number
    fn set_note(&mut self, channel: usize, note: i32, writer: &mut S98Writer);

    /// Set channel volume (0..=max_volume)
    fn set_volume(&mut self, channel: usize, volume: i32, writer: &mut S98Writer);

    fn key_on(&mut self, channel: usize, writer: &mut S98Writer);

    fn key_off(&mut self, channel: usize, writer: &mut S98Writer);

    /// Whether a channel is currently sounding
    fn is_key_on(&self, channel: usize) -> bool;
}

/// Look up the layout of a device type
pub fn chip_spec(device_type: DeviceType) -> Option<&'static ChipSpec> {
    SUPPORTED_CHIPS.iter().find(|s| s.device_type == device_type)
}

/// Create a chip driver for device slot `device`
pub fn create_chip(device_type: DeviceType, device: usize) -> Option<Box<dyn LogChip>> {
    match device_type {
        DeviceType::Opna => Some(Box::new(opna::Opna::new(device))),
        _ => None,
    }
}

/// List all supported chip names
pub fn list_chips() -> Vec<&'static str> {
    SUPPORTED_CHIPS.iter().map(|s| s.name).collect()
}

/// Keep the low `bits` of `value` and shift them into place
pub(crate) fn masked(value: i32, bits: u32, shift: u32) -> u8 {
    ((value & ((1 << bits) - 1)) << shift) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked() {
        assert_eq!(masked(0xFF, 3, 4), 0x70);
        assert_eq!(masked(0x1F, 5, 0), 0x1F);
        assert_eq!(masked(0x21, 5, 0), 0x01);
        assert_eq!(masked(3, 2, 6), 0xC0);
    }

    #[test]
    fn test_supported_chips() {
        assert_eq!(list_chips(), vec!["OPNA"]);
        assert!(chip_spec(DeviceType::Opna).is_some());
        assert!(chip_spec(DeviceType::Opm).is_none());
        assert!(create_chip(DeviceType::None, 0).is_none());
    }
}
