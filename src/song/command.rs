//! Compiled track commands

use crate::compiler::cursor::Position;
use std::fmt;

/// Command type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    Note,
    Rest,
    /// `@name` tone select
    Tone,
    /// `@ename` effect reference
    Effect,
    /// `$name` macro reference
    Macro,
    Volume,
    Tempo,
    Octave,
    /// `>`
    OctaveUp,
    /// `<`
    OctaveDown,
    Slur,
    Loop,
    RepeatStart,
    RepeatEnd,
    RepeatEscape,
    Staccato,
}

/// A single compiled command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandType,
    pub value: i32,
    /// Duration in ticks (0 for instantaneous commands)
    pub tick: i32,
    pub text: Option<String>,
    /// Source location of the command
    pub position: Position,
}

impl Command {
    pub fn new(kind: CommandType, position: Position) -> Self {
        Self {
            kind,
            value: 0,
            tick: 0,
            text: None,
            position,
        }
    }

    /// Whether this command sounds a note
    pub fn is_note(&self) -> bool {
        self.kind == CommandType::Note
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} value:{} tick:{}", self.kind, self.value, self.tick)?;
        if let Some(text) = &self.text {
            write!(f, " text:{}", text)?;
        }
        Ok(())
    }
}
