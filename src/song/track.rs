//! Track command lists and playback counters

use super::command::{Command, CommandType};
use crate::compiler::cursor::Position;

/// Repeat count used when `]` carries no count
pub const DEFAULT_REPEAT_COUNT: i32 = 2;

/// Octave a track starts at
pub const DEFAULT_OCTAVE: i32 = 4;

/// One open `[ ... ]` block during playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RepeatFrame {
    /// Command index just after `[`
    pub start: usize,
    /// Command index just after `]`, 0 until the first visit of `]`
    pub end: usize,
    /// Passes left including the one being played
    pub remaining: i32,
}

/// A named command stream bound to a device channel
#[derive(Debug, Clone)]
pub struct Track {
    pub name: String,
    pub device: usize,
    pub channel: usize,

    commands: Vec<Command>,
    repeat_stack: Vec<RepeatFrame>,
    cursor: usize,

    // Compile-time state
    /// Length used by notes without an explicit length
    pub default_tick: i32,
    /// Upper bound accepted by `v`
    pub max_volume: i32,
    last_note: Option<usize>,
    open_repeats: usize,

    // Playback state
    pub octave: i32,
    /// Staccato amount in eighths, 0 for full length
    pub staccato: i32,
    pub slur: bool,
    pub note_tick: i32,
    pub staccato_tick: i32,
    pub staccato_on: bool,
    pub total_tick: i32,
    pub loop_tick: i32,
    finished: bool,
}

impl Track {
    pub fn new(name: &str, device: usize, channel: usize) -> Self {
        Self {
            name: name.to_string(),
            device,
            channel,
            commands: Vec::new(),
            repeat_stack: Vec::new(),
            cursor: 0,
            default_tick: 0,
            max_volume: 0,
            last_note: None,
            open_repeats: 0,
            octave: DEFAULT_OCTAVE,
            staccato: 0,
            slur: false,
            note_tick: 0,
            staccato_tick: 0,
            staccato_on: false,
            total_tick: 0,
            loop_tick: 0,
            finished: false,
        }
    }

    /// Append a command and return it for filling in
    pub fn add_command(&mut self, kind: CommandType, position: Position) -> &mut Command {
        self.commands.push(Command::new(kind, position));
        let last = self.commands.len() - 1;
        &mut self.commands[last]
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Remember the most recent command as the target of `^`
    pub fn set_last_note(&mut self) {
        self.last_note = self.commands.len().checked_sub(1);
    }

    pub fn last_note_mut(&mut self) -> Option<&mut Command> {
        let index = self.last_note?;
        self.commands.get_mut(index)
    }

    pub fn open_repeat(&mut self) {
        self.open_repeats += 1;
    }

    /// Close the innermost `[`; false if none is open
    pub fn close_repeat(&mut self) -> bool {
        if self.open_repeats == 0 {
            return false;
        }
        self.open_repeats -= 1;
        true
    }

    /// Number of `[` not yet closed at compile time
    pub fn open_repeats(&self) -> usize {
        self.open_repeats
    }

    /// Take the command under the cursor and advance
    pub fn next_command(&mut self) -> Option<Command> {
        let command = self.commands.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(command)
    }

    pub fn is_end(&self) -> bool {
        self.cursor >= self.commands.len()
    }

    pub fn repeat_depth(&self) -> usize {
        self.repeat_stack.len()
    }

    pub fn repeat_start(&mut self) {
        self.repeat_stack.push(RepeatFrame {
            start: self.cursor,
            end: 0,
            remaining: 0,
        });
    }

    /// `]` handling.
    ///
    /// The first visit records the end, rewinds, and sets the passes left.
    /// Later visits rewind again until the last pass, which pops the frame.
    pub fn repeat_end(&mut self, count: i32) {
        let cursor = self.cursor;
        let frame = match self.repeat_stack.last_mut() {
            Some(frame) => frame,
            None => return,
        };

        if frame.end == 0 {
            let count = if count <= 0 { DEFAULT_REPEAT_COUNT } else { count };
            frame.end = cursor;
            frame.remaining = count - 1;
            self.cursor = frame.start;
            return;
        }

        if frame.remaining <= 1 {
            self.repeat_stack.pop();
            return;
        }
        frame.remaining -= 1;
        self.cursor = frame.start;
    }

    /// `/` handling: leave the block on its last pass
    pub fn repeat_escape(&mut self) {
        let frame = match self.repeat_stack.last() {
            Some(frame) => *frame,
            None => return,
        };
        if frame.end == 0 {
            return;
        }
        if frame.remaining <= 1 {
            self.cursor = frame.end;
            self.repeat_stack.pop();
        }
    }

    /// Account for a command's duration
    pub fn add_wait_tick(&mut self, tick: i32) {
        self.total_tick = self.total_tick.saturating_add(tick);
        self.note_tick = self.note_tick.saturating_add(tick);
    }

    /// Arm the staccato timer for a note of `tick` length
    pub fn add_staccato(&mut self, tick: i32) {
        if self.staccato == 0 {
            return;
        }
        self.staccato_on = true;
        let gate = (i64::from(tick) * i64::from(self.staccato) / 8) as i32;
        self.staccato_tick = self.staccato_tick.saturating_add(gate);
    }

    /// Ticks until the next event on this track
    pub fn pending_tick(&self) -> i32 {
        if self.staccato_on && self.staccato_tick < self.note_tick {
            self.staccato_tick
        } else {
            self.note_tick
        }
    }

    pub fn sub_tick(&mut self, tick: i32) {
        self.note_tick -= tick;
        if self.staccato_on {
            self.staccato_tick -= tick;
        }
    }

    /// True once the staccato timer has run out; disarms it
    pub fn take_staccato_expiry(&mut self) -> bool {
        if self.staccato_on && self.staccato_tick <= 0 {
            self.staccato_on = false;
            self.staccato_tick = 0;
            return true;
        }
        false
    }

    pub fn set_loop_tick(&mut self) {
        self.loop_tick = self.total_tick;
    }

    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
