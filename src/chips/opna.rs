//! YM2608 (OPNA) register encoder
//!
//! Channel map: 0-5 FM (3-5 on the extended bank), 6-8 SSG, 9 ADPCM,
//! 10 rhythm. ADPCM and rhythm accept events but write nothing.

use super::{masked, ChipSpec, LogChip};
use crate::s98::S98Writer;
use crate::song::{DeviceType, FmTone};

pub const CHANNELS: usize = 11;
pub const MAX_VOLUME: i32 = 15;

pub const SPEC: ChipSpec = ChipSpec {
    name: "OPNA",
    device_type: DeviceType::Opna,
    channels: CHANNELS,
    max_volume: MAX_VOLUME,
};

/// Extended register bank offset
const EXT: u16 = 0x100;

/// Register addresses
pub mod reg {
    pub const SSG_TONE: u16 = 0x00;
    pub const SSG_MIXER: u16 = 0x07;
    pub const SSG_LEVEL: u16 = 0x08;
    pub const KEY_ON: u16 = 0x28;
    pub const MODE: u16 = 0x29;
    pub const DT_MUL: u16 = 0x30;
    pub const TL: u16 = 0x40;
    pub const KS_AR: u16 = 0x50;
    pub const DR: u16 = 0x60;
    pub const SR: u16 = 0x70;
    pub const SL_RR: u16 = 0x80;
    pub const FNUM_LO: u16 = 0xA0;
    pub const FNUM_HI: u16 = 0xA4;
    pub const FB_ALG: u16 = 0xB0;
}

/// FM F-number per semitone, C4 to C5
const FNUM_TABLE: [i32; 13] = [
    618, 655, 694, 735, 779, 825, 874, 926, 981, 1040, 1102, 1167, 1236,
];

/// SSG tone period per semitone, C1 to C2
const SSG_TP_TABLE: [i32; 13] = [
    3816, 3602, 3400, 3209, 3029, 2859, 2698, 2547, 2404, 2269, 2142, 2022, 1908,
];

/// Role of an OPNA channel number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// FM slot (0..6)
    Fm(usize),
    /// SSG voice (0..3)
    Ssg(usize),
    Adpcm,
    Rhythm,
}

impl ChannelKind {
    pub fn of(channel: usize) -> Self {
        match channel {
            0..=5 => ChannelKind::Fm(channel),
            6..=8 => ChannelKind::Ssg(channel - 6),
            9 => ChannelKind::Adpcm,
            _ => ChannelKind::Rhythm,
        }
    }
}

/// Block and F-number for a note number
pub fn fm_pitch(note: i32) -> (i32, i32) {
    let octave = note.div_euclid(12);
    let fine = note.rem_euclid(12) as usize;
    (octave, FNUM_TABLE[fine])
}

/// SSG tone period for a note number (shifted from octave 1)
pub fn ssg_period(note: i32) -> i32 {
    let octave = note.div_euclid(12);
    let tp = SSG_TP_TABLE[note.rem_euclid(12) as usize];
    let shift = octave - 1;
    if shift >= 0 {
        tp.checked_shr(shift as u32).unwrap_or(0)
    } else {
        tp.checked_shl((-shift) as u32).unwrap_or(0)
    }
}

/// Output level for `volume` on a tone whose level is `level`
pub fn scaled_level(level: i32, volume: i32) -> i32 {
    127 - ((127 - level.clamp(0, 127)) * volume / MAX_VOLUME)
}

/// Bank offset and in-bank slot of an FM channel
fn fm_slot(ch: usize) -> (u16, u16) {
    let bank = if ch >= 3 { EXT } else { 0 };
    (bank, (ch % 3) as u16)
}

/// OPNA chip state for one device slot
pub struct Opna {
    device: usize,
    key_on: [bool; CHANNELS],
    tones: [Option<FmTone>; CHANNELS],
    ssg_mixer: u8,
}

impl Opna {
    pub fn new(device: usize) -> Self {
        Self {
            device,
            key_on: [false; CHANNELS],
            tones: [None; CHANNELS],
            ssg_mixer: 0,
        }
    }

    fn write(&self, writer: &mut S98Writer, address: u16, value: u8) {
        writer.write(self.device, address, value);
    }

    fn write_tone(&self, ch: usize, tone: &FmTone, writer: &mut S98Writer) {
        let (bank, slot) = fm_slot(ch);
        for (i, op) in tone.operators.iter().enumerate() {
            let base = bank + 4 * i as u16 + slot;
            let writes = [
                (
                    reg::DT_MUL,
                    masked(op.detune, 3, 4) | masked(op.multiple, 4, 0),
                ),
                (reg::TL, masked(op.output_level, 7, 0)),
                (
                    reg::KS_AR,
                    masked(op.key_scale, 2, 6) | masked(op.attack_rate, 5, 0),
                ),
                (reg::DR, masked(op.decay_rate, 5, 0)),
                (reg::SR, masked(op.sustain_rate, 5, 0)),
                (
                    reg::SL_RR,
                    masked(op.sustain_level, 4, 4) | masked(op.release_rate, 4, 0),
                ),
            ];
            for (register, value) in writes {
                self.write(writer, base + register, value);
            }
        }
        self.write(
            writer,
            bank + reg::FB_ALG + slot,
            masked(tone.feedback, 3, 3) | masked(tone.algorithm, 3, 0),
        );
    }

    fn set_slot(&mut self, channel: usize, on: bool, writer: &mut S98Writer) {
        match ChannelKind::of(channel) {
            ChannelKind::Fm(ch) => {
                let slots = if on { 0x0F } else { 0x00 };
                let ext = if ch >= 3 { 0x04 } else { 0x00 };
                let value = masked(slots, 4, 4) | ext | masked((ch % 3) as i32, 2, 0);
                self.write(writer, reg::KEY_ON, value);
            }
            ChannelKind::Ssg(ch) => {
                let bit = 1u8 << ch;
                self.ssg_mixer |= 0x38;
                self.ssg_mixer &= !bit;
                // Tone output is enabled by a 0 bit
                if !on {
                    self.ssg_mixer |= bit;
                }
                self.write(writer, reg::SSG_MIXER, self.ssg_mixer);
            }
            ChannelKind::Adpcm | ChannelKind::Rhythm => {}
        }
    }
}

impl LogChip for Opna {
    fn name(&self) -> &'static str {
        SPEC.name
    }

    fn init(&mut self, writer: &mut S98Writer) {
        // OPNA mode, IRQ off
        self.write(writer, reg::MODE, 0x80);
    }

    fn set_tone(&mut self, channel: usize, tone: &FmTone, writer: &mut S98Writer) {
        if let ChannelKind::Fm(ch) = ChannelKind::of(channel) {
            self.tones[channel] = Some(*tone);
            self.write_tone(ch, tone, writer);
        }
    }

    fn set_note(&mut self, channel: usize, note: i32, writer: &mut S98Writer) {
        match ChannelKind::of(channel) {
            ChannelKind::Fm(ch) => {
                let (block, fnum) = fm_pitch(note);
                let (bank, slot) = fm_slot(ch);
                self.write(
                    writer,
                    bank + reg::FNUM_HI + slot,
                    masked(block, 3, 3) | masked(fnum >> 8, 3, 0),
                );
                self.write(writer, bank + reg::FNUM_LO + slot, masked(fnum, 8, 0));
            }
            ChannelKind::Ssg(ch) => {
                let tp = ssg_period(note);
                let address = reg::SSG_TONE + 2 * ch as u16;
                self.write(writer, address + 1, masked(tp >> 8, 4, 0));
                self.write(writer, address, masked(tp, 8, 0));
            }
            ChannelKind::Adpcm | ChannelKind::Rhythm => {}
        }
    }

    fn set_volume(&mut self, channel: usize, volume: i32, writer: &mut S98Writer) {
        match ChannelKind::of(channel) {
            ChannelKind::Fm(ch) => {
                let tone = match self.tones[channel] {
                    Some(tone) => tone,
                    None => return,
                };
                let (bank, slot) = fm_slot(ch);
                for (i, op) in tone.operators.iter().enumerate() {
                    let level = scaled_level(op.output_level, volume);
                    self.write(
                        writer,
                        bank + reg::TL + 4 * i as u16 + slot,
                        masked(level, 7, 0),
                    );
                }
            }
            ChannelKind::Ssg(ch) => {
                self.write(writer, reg::SSG_LEVEL + ch as u16, masked(volume, 4, 0));
            }
            ChannelKind::Adpcm | ChannelKind::Rhythm => {}
        }
    }

    fn key_on(&mut self, channel: usize, writer: &mut S98Writer) {
        if channel < CHANNELS {
            self.key_on[channel] = true;
        }
        self.set_slot(channel, true, writer);
    }

    fn key_off(&mut self, channel: usize, writer: &mut S98Writer) {
        if channel < CHANNELS {
            self.key_on[channel] = false;
        }
        self.set_slot(channel, false, writer);
    }

    fn is_key_on(&self, channel: usize) -> bool {
        self.key_on.get(channel).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::FmOperator;

    fn writes(writer: &S98Writer) -> Vec<(u8, u8, u8)> {
        writer
            .dump()
            .chunks(3)
            .map(|c| (c[0], c[1], c[2]))
            .collect()
    }

    #[test]
    fn test_fm_pitch() {
        // o4a
        assert_eq!(fm_pitch(4 * 12 + 9), (4, 1040));
        assert_eq!(fm_pitch(0), (0, 618));
        assert_eq!(fm_pitch(-1), (-1, 1167));
    }

    #[test]
    fn test_ssg_period_shift() {
        assert_eq!(ssg_period(12), 3816);
        assert_eq!(ssg_period(4 * 12 + 9), 2269 >> 3);
        assert_eq!(ssg_period(0), 3816 << 1);
    }

    #[test]
    fn test_scaled_level() {
        assert_eq!(scaled_level(20, 15), 20);
        assert_eq!(scaled_level(20, 0), 127);
        assert_eq!(scaled_level(0, 8), 127 - 127 * 8 / 15);
        assert_eq!(scaled_level(i32::MAX, 15), 127);
    }

    #[test]
    fn test_fm_note_on_ext_bank() {
        let mut w = S98Writer::new();
        let mut chip = Opna::new(0);
        chip.set_note(4, 4 * 12, &mut w);
        chip.key_on(4, &mut w);
        assert_eq!(
            writes(&w),
            vec![
                (1, 0xA5, (4 << 3) | (618 >> 8) as u8),
                (1, 0xA1, (618 & 0xFF) as u8),
                (0, 0x28, 0xF0 | 0x04 | 1),
            ]
        );
        assert!(chip.is_key_on(4));
    }

    #[test]
    fn test_ssg_mixer() {
        let mut w = S98Writer::new();
        let mut chip = Opna::new(1);
        chip.key_on(7, &mut w);
        chip.key_off(7, &mut w);
        assert_eq!(writes(&w), vec![(2, 0x07, 0x38), (2, 0x07, 0x3A)]);
        assert!(!chip.is_key_on(7));
    }

    #[test]
    fn test_tone_registers() {
        let op = FmOperator {
            attack_rate: 31,
            decay_rate: 5,
            sustain_rate: 2,
            release_rate: 7,
            sustain_level: 3,
            output_level: 40,
            key_scale: 1,
            multiple: 2,
            detune: 3,
            amplitude_modulation: 0,
        };
        let tone = FmTone {
            algorithm: 4,
            feedback: 5,
            operators: [op; 4],
        };
        let mut w = S98Writer::new();
        let mut chip = Opna::new(0);
        chip.set_tone(1, &tone, &mut w);
        let out = writes(&w);
        assert_eq!(out.len(), 4 * 6 + 1);
        assert_eq!(out[0], (0, 0x31, 0x32));
        assert_eq!(out[1], (0, 0x41, 40));
        assert_eq!(out[2], (0, 0x51, 0x40 | 31));
        assert_eq!(out[5], (0, 0x81, 0x37));
        assert_eq!(out[6], (0, 0x35, 0x32));
        assert_eq!(out[24], (0, 0xB1, (5 << 3) | 4));
    }

    #[test]
    fn test_volume_without_tone_writes_nothing_on_fm() {
        let mut w = S98Writer::new();
        let mut chip = Opna::new(0);
        chip.set_volume(0, 10, &mut w);
        chip.set_volume(9, 10, &mut w);
        assert!(w.dump().is_empty());
        chip.set_volume(8, 12, &mut w);
        assert_eq!(writes(&w), vec![(0, 0x0A, 12)]);
    }
}
