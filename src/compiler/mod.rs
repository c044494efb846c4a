//! MML Compiler - parses MML text into a [`Song`] and logs it to S98
//!
//! Top-level lines are dispatched on their first character:
//! `#` directives, `@` tone blocks, `%` effect blocks, `$` macro tracks,
//! anything else is a (possibly comma-joined) track line.

pub mod command;
pub mod cursor;
pub mod diagnostic;
pub mod header;

use crate::error::{Error, Result};
use crate::s98::S98Writer;
use crate::sequencer;
use crate::song::{Song, TrackRef, TrackSummary, TONE_PARAMETER_COUNT};
use command::{CommandCompiler, CommandContext};
use cursor::{CharClass, Position, SourceCursor};
use diagnostic::{ErrorKind, ErrorLog};
use header::HeaderCompiler;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, info};

/// MML to S98 compiler
pub struct Compiler {
    header: HeaderCompiler,
    commands: CommandCompiler,
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            header: HeaderCompiler::new(),
            commands: CommandCompiler::new(),
        }
    }

    /// Parse MML text into a built song.
    ///
    /// Any recorded error fails the whole parse with [`Error::Compile`].
    pub fn parse_str(&self, text: &str) -> Result<Song> {
        let parser = SongParser::new(text, &self.header, &self.commands);
        let (song, errors) = parser.run();
        if errors.has_error() {
            return Err(Error::Compile(errors));
        }
        Ok(song)
    }

    /// Parse and sequence MML text into an in-memory S98 log
    pub fn compile_str(&self, text: &str) -> Result<(S98Writer, Vec<TrackSummary>)> {
        let mut song = self.parse_str(text)?;
        let mut writer = S98Writer::new();
        sequencer::sequence(&mut song, &mut writer);
        Ok((writer, song.summary()))
    }

    /// Compile MML input to an S98 file
    pub fn compile<R: Read>(&self, mut input: R, output: &Path) -> Result<Vec<TrackSummary>> {
        let mut text = String::new();
        input.read_to_string(&mut text)?;

        let (writer, summary) = self.compile_str(&text)?;
        writer.finalize(output)?;
        info!("wrote {}", output.display());
        Ok(summary)
    }

    /// Compile an MML file to an S98 file.
    ///
    /// A missing input is reported like any other parse error.
    pub fn compile_file(&self, input: &Path, output: &Path) -> Result<Vec<TrackSummary>> {
        info!("input {}", input.display());
        let file = match fs::File::open(input) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let mut errors = ErrorLog::new();
                errors.add(ErrorKind::FileNotFound, Position::default());
                return Err(Error::Compile(errors));
            }
            Err(e) => return Err(e.into()),
        };
        self.compile(file, output)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// One parse run over a source text
struct SongParser<'c> {
    m: SourceCursor,
    song: Song,
    errors: ErrorLog,
    header: &'c HeaderCompiler,
    commands: &'c CommandCompiler,
}

impl<'c> SongParser<'c> {
    fn new(text: &str, header: &'c HeaderCompiler, commands: &'c CommandCompiler) -> Self {
        Self {
            m: SourceCursor::new(text),
            song: Song::new(),
            errors: ErrorLog::new(),
            header,
            commands,
        }
    }

    fn run(mut self) -> (Song, ErrorLog) {
        while !self.m.is_eof() {
            self.read_line();
        }

        let position = self.m.position();
        self.song.build(&mut self.errors, position);
        let open = self
            .song
            .tracks()
            .iter()
            .chain(self.song.macros())
            .filter(|t| t.open_repeats() > 0)
            .count();
        for _ in 0..open {
            self.errors.add(ErrorKind::RepeatUnbalanced, position);
        }
        (self.song, self.errors)
    }

    /// Consume one unit at the start of a line
    fn read_line(&mut self) {
        match self.m.classify() {
            CharClass::Eof => {}
            // The rest of the line closing a comment block is ignored
            CharClass::CommentEnd => self.m.next_line(),
            CharClass::NextLine
            | CharClass::Space
            | CharClass::CommentLine
            | CharClass::CommentStart => self.m.advance(),
            CharClass::General => self.read_item(),
            CharClass::Separator | CharClass::BlockStart | CharClass::BlockEnd => {
                self.errors
                    .add(ErrorKind::MalformedLineHeader, self.m.position());
                self.m.next_line();
            }
        }
    }

    fn read_item(&mut self) {
        match self.m.peek() {
            Some('#') => {
                self.header
                    .compile_line(&mut self.m, &mut self.song, &mut self.errors);
                self.m.next_line();
            }
            Some('%') => self.read_effect(),
            Some('@') => self.read_tone(),
            Some('$') => self.read_macro(),
            _ => self.read_track_line(),
        }
    }

    /// `name[,name...] body`: the same body is compiled once per name
    fn read_track_line(&mut self) {
        let position = self.m.position();
        let mut names = Vec::new();
        loop {
            names.push(self.m.read_name());
            self.m.skip_if_space();
            if self.m.classify() != CharClass::Separator {
                break;
            }
            self.m.advance();
            self.m.skip_if_space();
        }

        let body = self.m.save();
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                self.m.restore(body);
            }
            debug!("track {} at {}", name, position);
            let target = self
                .song
                .track_index(name, &mut self.errors, position)
                .map(TrackRef::Track);
            self.read_track_body(target, position);
        }
    }

    /// `$name body`: compiled into a detached macro track
    fn read_macro(&mut self) {
        let position = self.m.position();
        self.m.step();
        let name = self.m.read_name();
        debug!("macro {} at {}", name, position);
        let target = TrackRef::Macro(self.song.macro_index(&name));
        self.read_track_body(Some(target), position);
    }

    /// Bare form runs to the end of the line, block form to the matching `}`
    fn read_track_body(&mut self, target: Option<TrackRef>, position: Position) {
        self.m.skip_if_space();
        let block = match self.m.classify() {
            CharClass::BlockStart => {
                self.m.step();
                true
            }
            CharClass::General => false,
            CharClass::NextLine | CharClass::CommentLine | CharClass::Eof => {
                self.m.next_line();
                return;
            }
            _ => {
                self.errors
                    .add(ErrorKind::UnexpectedCharacter, self.m.position());
                self.m.next_line();
                return;
            }
        };

        let target = match target {
            Some(target) => target,
            None => {
                if block {
                    self.read_block_text(position);
                } else {
                    self.m.next_line();
                }
                return;
            }
        };

        loop {
            match self.m.classify() {
                CharClass::Eof => {
                    if block {
                        self.errors.add(ErrorKind::BlockEndNotFound, position);
                    }
                    return;
                }
                CharClass::NextLine | CharClass::CommentLine => {
                    self.m.next_line();
                    if !block {
                        return;
                    }
                }
                CharClass::Space | CharClass::CommentStart | CharClass::CommentEnd => {
                    self.m.advance()
                }
                CharClass::BlockEnd => {
                    if !block {
                        self.errors
                            .add(ErrorKind::UnexpectedCharacter, self.m.position());
                    }
                    self.m.next_line();
                    return;
                }
                CharClass::General => self.compile_command(&target),
                CharClass::Separator | CharClass::BlockStart => {
                    self.errors
                        .add(ErrorKind::UnexpectedCharacter, self.m.position());
                    self.m.step();
                }
            }
        }
    }

    fn compile_command(&mut self, target: &TrackRef) {
        let master_tick = self.song.master_tick();
        let (track, tones) = match self.song.target_mut(target) {
            Some(found) => found,
            None => {
                self.m.next_line();
                return;
            }
        };
        let mut ctx = CommandContext {
            m: &mut self.m,
            track,
            tones,
            master_tick,
            errors: &mut self.errors,
        };
        self.commands.compile(&mut ctx);
    }

    /// Skip to the next `{`, recording `BlockStartNotFound` otherwise
    fn expect_block_start(&mut self) -> bool {
        self.m.skip_skippable();
        if self.m.classify() != CharClass::BlockStart {
            self.errors
                .add(ErrorKind::BlockStartNotFound, self.m.position());
            self.m.next_line();
            return false;
        }
        self.m.step();
        true
    }

    /// `@name{ v,v,... }`
    fn read_tone(&mut self) {
        let position = self.m.position();
        self.m.step();
        let name = self.m.read_name();
        debug!("tone {} at {}", name, position);
        if !self.expect_block_start() {
            return;
        }

        let values = match self.read_tone_values(position) {
            Some(values) => values,
            None => return,
        };
        if values.len() < TONE_PARAMETER_COUNT {
            self.errors.add(ErrorKind::TooFewParameters, position);
            return;
        }
        self.song.set_tone_parameter(&name, values);
    }

    fn read_tone_values(&mut self, position: Position) -> Option<Vec<i32>> {
        let mut values = Vec::new();
        let mut after_value = false;

        loop {
            self.m.skip_skippable();
            match self.m.classify() {
                CharClass::Eof => {
                    self.errors.add(ErrorKind::BlockEndNotFound, position);
                    return None;
                }
                CharClass::Separator => {
                    // An empty field counts as 0
                    if !after_value {
                        values.push(0);
                    }
                    after_value = false;
                    self.m.step();
                }
                CharClass::General => {
                    let at = self.m.position();
                    let text = self.m.read_number();
                    if text.is_empty() {
                        self.m.step();
                    }
                    match text.parse::<i32>() {
                        Ok(value) => values.push(value),
                        Err(_) => self.errors.add(ErrorKind::InvalidNumber, at),
                    }
                    after_value = true;
                }
                CharClass::BlockEnd => {
                    self.m.next_line();
                    return Some(values);
                }
                _ => {
                    self.errors
                        .add(ErrorKind::UnexpectedCharacter, self.m.position());
                    self.m.next_line();
                    return None;
                }
            }
        }
    }

    /// `%name{ ... }`: the body is kept as text
    fn read_effect(&mut self) {
        let position = self.m.position();
        self.m.step();
        let name = self.m.read_name();
        debug!("effect {} at {}", name, position);
        if !self.expect_block_start() {
            return;
        }
        if let Some(text) = self.read_block_text(position) {
            self.song.set_effect(&name, &text);
        }
    }

    /// Collect raw text up to the closing `}`, dropping comments
    fn read_block_text(&mut self, position: Position) -> Option<String> {
        let mut text = String::new();
        loop {
            match self.m.classify() {
                CharClass::Eof => {
                    self.errors.add(ErrorKind::BlockEndNotFound, position);
                    return None;
                }
                CharClass::BlockEnd => {
                    self.m.next_line();
                    return Some(text.trim().to_string());
                }
                CharClass::NextLine => {
                    text.push('\n');
                    self.m.advance();
                }
                CharClass::Space => {
                    text.push(' ');
                    self.m.skip_space();
                }
                CharClass::CommentLine | CharClass::CommentStart | CharClass::CommentEnd => {
                    self.m.advance()
                }
                CharClass::BlockStart => {
                    self.errors
                        .add(ErrorKind::UnexpectedCharacter, self.m.position());
                    self.m.next_line();
                    return None;
                }
                CharClass::Separator | CharClass::General => {
                    if let Some(c) = self.m.peek() {
                        text.push(c);
                    }
                    self.m.step();
                }
            }
        }
    }
}
