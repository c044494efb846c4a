//! Lock-step sequencer
//!
//! Every round each unfinished track runs its zero-length commands until it
//! has a note, rest or staccato timer pending. The shortest pending time is
//! written as a wait and subtracted from every track, and the round repeats
//! until no track has anything left to play.

use crate::chips::{self, LogChip};
use crate::s98::S98Writer;
use crate::song::{Command, CommandType, Song};
use tracing::debug;

/// Drives one chip driver per device slot from a built song
pub struct Sequencer {
    chips: Vec<Option<Box<dyn LogChip>>>,
}

/// Sequence a built song into `writer`, ending the dump
pub fn sequence(song: &mut Song, writer: &mut S98Writer) {
    let mut sequencer = Sequencer::new(song);
    sequencer.run(song, writer);
}

impl Sequencer {
    /// Create drivers for every declared device; placeholders get none
    pub fn new(song: &Song) -> Self {
        let chips = song
            .devices()
            .iter()
            .enumerate()
            .map(|(index, device)| chips::create_chip(device.device_type, index))
            .collect();
        Self { chips }
    }

    fn chip(&mut self, device: usize) -> Option<&mut (dyn LogChip + 'static)> {
        self.chips.get_mut(device)?.as_deref_mut()
    }

    pub fn run(&mut self, song: &mut Song, writer: &mut S98Writer) {
        for device in song.devices() {
            writer.add_device(device);
        }
        if let Some(title) = song.title() {
            writer.set_title(title);
        }
        for chip in self.chips.iter_mut().flatten() {
            debug!("init {}", chip.name());
            chip.init(writer);
        }

        loop {
            let mut tick = 0;
            for index in 0..song.tracks().len() {
                let track_tick = self.advance_track(song, index, writer);
                if track_tick > 0 && (tick == 0 || track_tick < tick) {
                    tick = track_tick;
                }
            }
            if tick == 0 {
                break;
            }

            writer.wait(song.seconds_per_tick() * tick as f64);
            for track in song.tracks_mut().iter_mut().filter(|t| !t.is_finished()) {
                track.sub_tick(tick);
            }
        }

        writer.write_end();
        debug!("sequenced, loop tick {:?}", song.loop_tick());
    }

    /// Run a track up to its next pending duration and return it
    fn advance_track(&mut self, song: &mut Song, index: usize, writer: &mut S98Writer) -> i32 {
        let track = &mut song.tracks_mut()[index];
        if track.is_finished() {
            return 0;
        }
        let pending = track.pending_tick();
        if pending > 0 {
            return pending;
        }

        let (device, channel) = (track.device, track.channel);
        if track.take_staccato_expiry() {
            self.release(device, channel, writer);
        }

        loop {
            let track = &mut song.tracks_mut()[index];
            if track.note_tick != 0 {
                break;
            }
            match track.next_command() {
                Some(cmd) => self.apply(song, index, &cmd, writer),
                None => {
                    track.finish();
                    self.release(device, channel, writer);
                    break;
                }
            }
        }

        // A staccato timer can round down to zero on very short notes
        let track = &mut song.tracks_mut()[index];
        if track.take_staccato_expiry() {
            self.release(device, channel, writer);
        }
        track.pending_tick()
    }

    /// Key off a channel if it is sounding
    fn release(&mut self, device: usize, channel: usize, writer: &mut S98Writer) {
        if let Some(chip) = self.chip(device) {
            if chip.is_key_on(channel) {
                chip.key_off(channel, writer);
            }
        }
    }

    fn apply(&mut self, song: &mut Song, index: usize, cmd: &Command, writer: &mut S98Writer) {
        let octave_reverse = song.octave_reverse;
        let track = &mut song.tracks_mut()[index];
        track.add_wait_tick(cmd.tick);
        if cmd.is_note() {
            track.add_staccato(cmd.tick);
        }
        let (device, channel) = (track.device, track.channel);

        match cmd.kind {
            CommandType::Note => {
                let note = cmd.value.saturating_add(track.octave.saturating_mul(12));
                let slur = track.slur;
                track.slur = false;
                if let Some(chip) = self.chip(device) {
                    chip.set_note(channel, note, writer);
                    if !slur {
                        if chip.is_key_on(channel) {
                            chip.key_off(channel, writer);
                        }
                        chip.key_on(channel, writer);
                    }
                }
            }
            CommandType::Rest => self.release(device, channel, writer),
            CommandType::Slur => track.slur = cmd.value != 0,
            CommandType::Octave => track.octave = cmd.value,
            CommandType::OctaveUp => {
                track.octave = track.octave.saturating_add(if octave_reverse { -1 } else { 1 })
            }
            CommandType::OctaveDown => {
                track.octave = track.octave.saturating_add(if octave_reverse { 1 } else { -1 })
            }
            CommandType::Tempo => song.set_tempo(cmd.value),
            CommandType::Tone => {
                let tone = cmd.text.as_deref().and_then(|name| song.tone(name));
                if let (Some(tone), Some(chip)) = (tone, self.chip(device)) {
                    chip.set_tone(channel, &tone, writer);
                }
            }
            CommandType::Volume => {
                if let Some(chip) = self.chip(device) {
                    chip.set_volume(channel, cmd.value, writer);
                }
            }
            CommandType::RepeatStart => track.repeat_start(),
            CommandType::RepeatEnd => track.repeat_end(cmd.value),
            CommandType::RepeatEscape => track.repeat_escape(),
            CommandType::Staccato => {
                track.staccato = if cmd.value >= 8 { 0 } else { cmd.value };
            }
            CommandType::Loop => {
                track.set_loop_tick();
                let tick = track.total_tick;
                song.set_loop_tick(tick);
                writer.mark_loop();
            }
            CommandType::Effect | CommandType::Macro => {
                debug!("{}: not played {}", track.name, cmd);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;
    use crate::s98::{S98Command, S98Reader};

    fn run(src: &str) -> (Song, Vec<S98Command>) {
        let mut song = Compiler::new().parse_str(src).unwrap();
        let mut writer = S98Writer::new();
        sequence(&mut song, &mut writer);
        let data = writer.to_bytes();
        let mut reader = S98Reader::new(&data);
        let header = reader.parse_header().unwrap();
        let commands = reader.parse_commands(&header).unwrap();
        (song, commands)
    }

    fn total_sync(commands: &[S98Command]) -> u64 {
        commands.iter().map(|c| c.sync_count()).sum()
    }

    fn is_write(cmd: &S98Command, reg: u8, data: u8) -> bool {
        matches!(*cmd, S98Command::Write { reg: r, data: d, .. } if r == reg && d == data)
    }

    fn key_ons(commands: &[S98Command]) -> usize {
        commands.iter().filter(|c| is_write(c, 0x28, 0xF0)).count()
    }

    #[test]
    fn test_init_comes_first() {
        let (_, commands) = run("A c\n");
        assert!(is_write(&commands[0], 0x29, 0x80));
    }

    #[test]
    fn test_longest_track_wins() {
        // 32 ticks at t120 with 128 base ticks is half a second, 50 syncs
        let (song, commands) = run("A c4\nB c2\n");
        assert_eq!(total_sync(&commands), 100);
        let ends = commands.iter().filter(|c| **c == S98Command::End).count();
        assert_eq!(ends, 1);
        assert_eq!(commands.last(), Some(&S98Command::End));
        assert_eq!(song.track("B").map(|t| t.total_tick), Some(64));
    }

    #[test]
    fn test_nested_repeat() {
        let (song, commands) = run("A [c[de]2]3\n");
        assert_eq!(key_ons(&commands), 15);
        assert_eq!(song.track("A").map(|t| t.total_tick), Some(15 * 32));
        assert_eq!(total_sync(&commands), 750);
    }

    #[test]
    fn test_repeat_escape() {
        let (_, commands) = run("A [c/d]3\n");
        // c d c d c
        assert_eq!(key_ons(&commands), 5);
    }

    #[test]
    fn test_tempo_change() {
        let (song, commands) = run("A c4 t240 c4\n");
        // 0.5s then 0.25s
        assert_eq!(total_sync(&commands), 75);
        assert_eq!(song.tempo(), 240);
    }

    #[test]
    fn test_long_repeat_saturates() {
        let (song, commands) = run("A [c%2000000000]2\n");
        assert_eq!(song.track("A").map(|t| t.total_tick), Some(i32::MAX));
        assert_eq!(key_ons(&commands), 2);
        assert_eq!(commands.last(), Some(&S98Command::End));
    }

    #[test]
    fn test_octave_steps_past_range() {
        let (song, _) = run("A o8 >>>>>>>>>>>> c\n");
        assert_eq!(song.track("A").map(|t| t.octave), Some(20));
    }

    #[test]
    fn test_slur_keeps_voice() {
        let (_, commands) = run("A c&d e\n");
        assert_eq!(key_ons(&commands), 2);
    }

    #[test]
    fn test_rest_keys_off() {
        let (_, commands) = run("A c r\n");
        let off = commands
            .iter()
            .position(|c| is_write(c, 0x28, 0x00))
            .unwrap();
        let first_wait = commands.iter().position(|c| c.sync_count() > 0).unwrap();
        assert!(first_wait < off);
    }

    #[test]
    fn test_staccato() {
        let (_, commands) = run("A q4 c4\n");
        // key off lands halfway through the note
        let waits: Vec<u64> = commands
            .iter()
            .map(|c| c.sync_count())
            .filter(|n| *n > 0)
            .collect();
        assert_eq!(waits, vec![25, 25]);
        let off = commands.iter().position(|c| is_write(c, 0x28, 0x00));
        let second_wait = commands.iter().rposition(|c| c.sync_count() > 0);
        assert!(off < second_wait);
    }

    #[test]
    fn test_octave_reverse() {
        let (song, _) = run("#OCTREV\nA o4 > c\n");
        assert_eq!(song.track("A").map(|t| t.octave), Some(3));
        let (song, _) = run("A o4 > c\n");
        assert_eq!(song.track("A").map(|t| t.octave), Some(5));
    }

    #[test]
    fn test_loop_point() {
        let (song, _) = run("A c L d\n");
        assert_eq!(song.loop_tick(), Some(32));
        assert_eq!(song.track("A").map(|t| t.loop_tick), Some(32));
    }

    #[test]
    fn test_empty_song() {
        let (_, commands) = run("");
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[1], S98Command::End);
    }
}
