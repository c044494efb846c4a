//! Song model shared by the compiler and the sequencer
//!
//! The compiler fills a [`Song`] while parsing. The first track lookup
//! "builds" the song: default devices and tracks are added, track bindings are
//! validated, and from then on no device or track may be registered.

pub mod command;
pub mod tone;
pub mod track;

pub use command::{Command, CommandType};
pub use tone::{FmOperator, FmTone, TONE_PARAMETER_COUNT};
pub use track::{RepeatFrame, Track};

use crate::chips;
use crate::compiler::cursor::Position;
use crate::compiler::diagnostic::{ErrorKind, ErrorLog};
use std::collections::HashMap;
use tracing::debug;

/// Default ticks per whole note
pub const DEFAULT_MASTER_TICK: i32 = 128;

/// Default tempo in quarter notes per minute
pub const DEFAULT_TEMPO: i32 = 120;

/// Highest device index accepted by `#DEVICE`
pub const MAX_DEVICE_INDEX: i32 = 63;

/// Raw tone parameters by tone name
pub type ToneBank = HashMap<String, Vec<i32>>;

/// S98 device type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    None = 0,
    Psg = 1,
    Opn = 2,
    Opn2 = 3,
    Opna = 4,
    Opm = 5,
    Opll = 6,
    Opl = 7,
    Opl2 = 8,
    Opl3 = 9,
    Psg8910 = 15,
    Dcsg = 16,
}

impl DeviceType {
    const ALL: [DeviceType; 12] = [
        DeviceType::None,
        DeviceType::Psg,
        DeviceType::Opn,
        DeviceType::Opn2,
        DeviceType::Opna,
        DeviceType::Opm,
        DeviceType::Opll,
        DeviceType::Opl,
        DeviceType::Opl2,
        DeviceType::Opl3,
        DeviceType::Psg8910,
        DeviceType::Dcsg,
    ];

    /// Numeric code stored in the S98 device record
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            DeviceType::None => "NONE",
            DeviceType::Psg => "PSG",
            DeviceType::Opn => "OPN",
            DeviceType::Opn2 => "OPN2",
            DeviceType::Opna => "OPNA",
            DeviceType::Opm => "OPM",
            DeviceType::Opll => "OPLL",
            DeviceType::Opl => "OPL",
            DeviceType::Opl2 => "OPL2",
            DeviceType::Opl3 => "OPL3",
            DeviceType::Psg8910 => "PSG8910",
            DeviceType::Dcsg => "DCSG",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Default clock in Hz (0 when unknown)
    pub fn default_clock(self) -> u32 {
        match self {
            DeviceType::Opll => 3_579_545,
            DeviceType::Opm => 4_000_000,
            DeviceType::Opna => 7_987_200,
            DeviceType::Opl3 => 14_318_180,
            _ => 0,
        }
    }
}

/// A sound device entry of the output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Device {
    pub device_type: DeviceType,
    pub clock: u32,
    pub pan: u32,
}

impl Device {
    pub fn new(device_type: DeviceType) -> Self {
        Self {
            device_type,
            clock: device_type.default_clock(),
            pan: 0,
        }
    }

    /// Placeholder for an index skipped by `#DEVICE`
    pub fn none() -> Self {
        Self::new(DeviceType::None)
    }
}

/// Per-track result reported after a compile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSummary {
    pub name: String,
    pub device: usize,
    pub channel: usize,
    pub total_tick: i32,
    pub loop_tick: i32,
}

/// Which command list a compiler writes into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackRef {
    Track(usize),
    Macro(usize),
}

/// Whole-song state
#[derive(Debug, Clone)]
pub struct Song {
    master_tick: i32,
    tempo: i32,
    seconds_per_tick: f64,
    pub octave_reverse: bool,
    title: Option<String>,
    devices: Vec<Device>,
    tracks: Vec<Track>,
    macros: Vec<Track>,
    effects: Vec<(String, String)>,
    tones: ToneBank,
    tone_cache: HashMap<String, FmTone>,
    built: bool,
    loop_tick: Option<i32>,
}

impl Song {
    pub fn new() -> Self {
        Self {
            master_tick: DEFAULT_MASTER_TICK,
            tempo: DEFAULT_TEMPO,
            seconds_per_tick: seconds_per_tick(DEFAULT_TEMPO, DEFAULT_MASTER_TICK),
            octave_reverse: false,
            title: None,
            devices: Vec::new(),
            tracks: Vec::new(),
            macros: Vec::new(),
            effects: Vec::new(),
            tones: HashMap::new(),
            tone_cache: HashMap::new(),
            built: false,
            loop_tick: None,
        }
    }

    pub fn master_tick(&self) -> i32 {
        self.master_tick
    }

    pub fn set_master_tick(&mut self, tick: i32) {
        self.master_tick = tick;
        self.seconds_per_tick = seconds_per_tick(self.tempo, self.master_tick);
    }

    pub fn tempo(&self) -> i32 {
        self.tempo
    }

    pub fn set_tempo(&mut self, tempo: i32) {
        self.tempo = tempo;
        self.seconds_per_tick = seconds_per_tick(self.tempo, self.master_tick);
    }

    pub fn seconds_per_tick(&self) -> f64 {
        self.seconds_per_tick
    }

    /// Title given by `#TITLE`, if any
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn tracks_mut(&mut self) -> &mut [Track] {
        &mut self.tracks
    }

    pub fn track(&self, name: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.name == name)
    }

    pub fn macros(&self) -> &[Track] {
        &self.macros
    }

    pub fn macro_track(&self, name: &str) -> Option<&Track> {
        self.macros.iter().find(|t| t.name == name)
    }

    /// Register a device at `index`, padding skipped indices with placeholders
    pub fn add_device(
        &mut self,
        index: i32,
        name: &str,
        errors: &mut ErrorLog,
        position: Position,
    ) {
        if self.built {
            errors.add(ErrorKind::AlreadyBuiltTrack, position);
            return;
        }
        if !(0..=MAX_DEVICE_INDEX).contains(&index) {
            errors.add(ErrorKind::DeviceIndexOutOfRange, position);
            return;
        }

        let device_type = match DeviceType::from_name(name) {
            Some(t) if chips::chip_spec(t).is_some() => t,
            _ => {
                errors.add(ErrorKind::UnsupportedDevice, position);
                return;
            }
        };

        let index = index as usize;
        while self.devices.len() <= index {
            self.devices.push(Device::none());
        }
        self.devices[index] = Device::new(device_type);
        debug!("device {} = {}", index, device_type.name());
    }

    /// Register a named track bound to a device channel
    pub fn add_track(
        &mut self,
        name: &str,
        device: usize,
        channel: usize,
        errors: &mut ErrorLog,
        position: Position,
    ) {
        if self.built {
            errors.add(ErrorKind::AlreadyBuiltTrack, position);
            return;
        }
        debug!("track {} = device {} channel {}", name, device, channel);
        self.tracks.push(Track::new(name, device, channel));
    }

    /// Freeze the device and track layout
    pub fn build(&mut self, errors: &mut ErrorLog, position: Position) {
        if self.built {
            return;
        }
        self.built = true;

        if self.devices.is_empty() {
            self.devices.push(Device::new(DeviceType::Opna));
        }
        if self.tracks.is_empty() {
            for (name, channel) in [
                ("A", 0),
                ("B", 1),
                ("C", 2),
                ("D", 6),
                ("E", 7),
                ("F", 8),
                ("G", 8),
                ("H", 3),
                ("I", 4),
                ("J", 5),
                ("K", 10),
            ] {
                self.tracks.push(Track::new(name, 0, channel));
            }
        }

        let default_tick = self.master_tick / 4;
        for track in &mut self.tracks {
            track.default_tick = default_tick;
            let device = match self.devices.get(track.device) {
                Some(device) => device,
                None => {
                    errors.add(ErrorKind::DeviceIndexOutOfRange, position);
                    continue;
                }
            };
            match chips::chip_spec(device.device_type) {
                Some(spec) if track.channel < spec.channels => {
                    track.max_volume = spec.max_volume;
                }
                Some(_) => errors.add(ErrorKind::ChannelOutOfRange, position),
                None => errors.add(ErrorKind::UnsupportedDevice, position),
            }
        }
        debug!(
            "song built: {} devices, {} tracks",
            self.devices.len(),
            self.tracks.len()
        );
    }

    /// Look up a track by name, building the song on first use
    pub fn track_index(
        &mut self,
        name: &str,
        errors: &mut ErrorLog,
        position: Position,
    ) -> Option<usize> {
        self.build(errors, position);
        let index = self.tracks.iter().position(|t| t.name == name);
        if index.is_none() {
            errors.add(ErrorKind::UnknownTrackName, position);
        }
        index
    }

    /// Look up or create a macro track
    pub fn macro_index(&mut self, name: &str) -> usize {
        if let Some(index) = self.macros.iter().position(|t| t.name == name) {
            return index;
        }
        let mut track = Track::new(name, 0, 0);
        track.default_tick = self.master_tick / 4;
        track.max_volume = chips::opna::MAX_VOLUME;
        self.macros.push(track);
        self.macros.len() - 1
    }

    /// Borrow a command list together with the tone bank
    pub fn target_mut(&mut self, target: &TrackRef) -> Option<(&mut Track, &ToneBank)> {
        let track = match *target {
            TrackRef::Track(index) => self.tracks.get_mut(index)?,
            TrackRef::Macro(index) => self.macros.get_mut(index)?,
        };
        Some((track, &self.tones))
    }

    pub fn set_tone_parameter(&mut self, name: &str, values: Vec<i32>) {
        self.tone_cache.remove(name);
        self.tones.insert(name.to_string(), values);
    }

    pub fn tone_parameter(&self, name: &str) -> Option<&[i32]> {
        self.tones.get(name).map(|v| v.as_slice())
    }

    /// Resolve a tone by name, caching the result
    pub fn tone(&mut self, name: &str) -> Option<FmTone> {
        if let Some(tone) = self.tone_cache.get(name) {
            return Some(*tone);
        }
        let tone = FmTone::from_parameters(self.tones.get(name)?)?;
        self.tone_cache.insert(name.to_string(), tone);
        Some(tone)
    }

    pub fn set_effect(&mut self, name: &str, text: &str) {
        match self.effects.iter_mut().find(|(n, _)| n == name) {
            Some((_, body)) => *body = text.to_string(),
            None => self.effects.push((name.to_string(), text.to_string())),
        }
    }

    pub fn effect(&self, name: &str) -> Option<&str> {
        self.effects
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, body)| body.as_str())
    }

    pub fn effects(&self) -> &[(String, String)] {
        &self.effects
    }

    /// Song tick at which playback restarts
    pub fn loop_tick(&self) -> Option<i32> {
        self.loop_tick
    }

    pub fn set_loop_tick(&mut self, tick: i32) {
        self.loop_tick = Some(tick);
    }

    pub fn summary(&self) -> Vec<TrackSummary> {
        self.tracks
            .iter()
            .map(|t| TrackSummary {
                name: t.name.clone(),
                device: t.device,
                channel: t.channel,
                total_tick: t.total_tick,
                loop_tick: t.loop_tick,
            })
            .collect()
    }
}

impl Default for Song {
    fn default() -> Self {
        Self::new()
    }
}

/// `240 / (tempo * master_tick)`: one whole note lasts four beats
pub fn seconds_per_tick(tempo: i32, master_tick: i32) -> f64 {
    if tempo <= 0 || master_tick <= 0 {
        return 0.0;
    }
    240.0 / (tempo as f64 * master_tick as f64)
}
