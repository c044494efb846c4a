//! Per-track MML commands
//!
//! Commands are matched by prefix against a sorted table. Entries are grouped
//! by their first character and longer names come first inside a group, so
//! `@e` is tried before `@`. The first match wins.

use super::cursor::{Position, SourceCursor};
use super::diagnostic::{ErrorKind, ErrorLog};
use crate::song::{CommandType, ToneBank, Track};
use std::cmp::Ordering;
use tracing::debug;

/// Everything a command handler may touch
pub struct CommandContext<'a> {
    pub m: &'a mut SourceCursor,
    pub track: &'a mut Track,
    pub tones: &'a ToneBank,
    pub master_tick: i32,
    pub errors: &'a mut ErrorLog,
}

/// Highest octave accepted by `o`
pub const MAX_OCTAVE: i32 = 8;

type CommandHandler = fn(&mut CommandContext<'_>, &'static str, Position);

struct CommandEntry {
    name: &'static str,
    handler: CommandHandler,
}

/// Table-driven interpreter for track commands
pub struct CommandCompiler {
    table: Vec<CommandEntry>,
}

impl CommandCompiler {
    pub fn new() -> Self {
        let mut table = vec![
            entry("c", note),
            entry("d", note),
            entry("e", note),
            entry("f", note),
            entry("g", note),
            entry("a", note),
            entry("b", note),
            entry("r", rest),
            entry("@e", effect),
            entry("@", tone),
            entry("$", macro_ref),
            entry("v", volume),
            entry("t", tempo),
            entry("l", length),
            entry("o", octave),
            entry(">", octave_up),
            entry("<", octave_down),
            entry("&", slur),
            entry("^", tie),
            entry("L", loop_point),
            entry("[", repeat_start),
            entry("]", repeat_end),
            entry("/", repeat_escape),
            entry("q", staccato),
        ];

        table.sort_by(|a, b| compare_names(a.name, b.name));
        Self { table }
    }

    /// Command names in match order
    pub fn command_names(&self) -> Vec<&'static str> {
        self.table.iter().map(|e| e.name).collect()
    }

    /// Compile the command under the cursor into `ctx.track`
    pub fn compile(&self, ctx: &mut CommandContext<'_>) {
        let position = ctx.m.position();
        let entry = match self.table.iter().find(|e| ctx.m.starts_with(e.name)) {
            Some(entry) => entry,
            None => {
                ctx.errors.add(ErrorKind::UnknownCommandName, position);
                ctx.m.step();
                return;
            }
        };

        let before = ctx.track.commands().len();
        ctx.m.step_by(entry.name.chars().count());
        (entry.handler)(ctx, entry.name, position);

        if ctx.track.commands().len() > before {
            if let Some(cmd) = ctx.track.commands().last() {
                debug!("{} {}", ctx.track.name, cmd);
            }
        }
    }
}

fn entry(name: &'static str, handler: CommandHandler) -> CommandEntry {
    CommandEntry { name, handler }
}

impl Default for CommandCompiler {
    fn default() -> Self {
        Self::new()
    }
}

/// First character, then longer names first, then by name
fn compare_names(a: &str, b: &str) -> Ordering {
    a.chars()
        .next()
        .cmp(&b.chars().next())
        .then_with(|| b.len().cmp(&a.len()))
        .then_with(|| a.cmp(b))
}

/// Semitone of a note letter
fn note_number(name: &str) -> i32 {
    match name {
        "c" => 0,
        "d" => 2,
        "e" => 4,
        "f" => 5,
        "g" => 7,
        "a" => 9,
        "b" => 11,
        _ => 0,
    }
}

/// Read a required number, recording `InvalidNumber` when absent
fn read_required(ctx: &mut CommandContext<'_>, position: Position) -> i32 {
    match ctx.m.read_int() {
        Some(value) => value,
        None => {
            ctx.errors.add(ErrorKind::InvalidNumber, position);
            0
        }
    }
}

/// Note length: `%ticks`, a denominator with dots, or the default with dots
fn read_length(ctx: &mut CommandContext<'_>, position: Position) -> i32 {
    let default_tick = ctx.track.default_tick;

    let mut tick = match ctx.m.peek() {
        Some('%') => {
            ctx.m.step();
            return match ctx.m.read_int() {
                Some(tick) => tick,
                None => {
                    ctx.errors.add(ErrorKind::InvalidNumber, position);
                    default_tick
                }
            };
        }
        Some(c) if c.is_ascii_digit() => match ctx.m.read_int() {
            Some(n) if n > 0 => ctx.master_tick / n,
            _ => {
                ctx.errors.add(ErrorKind::NoteLength, position);
                default_tick
            }
        },
        _ => default_tick,
    };

    let mut add = tick;
    while ctx.m.peek() == Some('.') {
        add /= 2;
        tick = tick.saturating_add(add);
        ctx.m.step();
    }
    tick
}

fn note(ctx: &mut CommandContext<'_>, name: &'static str, position: Position) {
    let mut value = note_number(name);
    // Both accidentals raise by a semitone
    if matches!(ctx.m.peek(), Some('-') | Some('+')) {
        value += 1;
        ctx.m.step();
    }
    let tick = read_length(ctx, position);

    let cmd = ctx.track.add_command(CommandType::Note, position);
    cmd.value = value;
    cmd.tick = tick;
    ctx.track.set_last_note();
}

fn rest(ctx: &mut CommandContext<'_>, _name: &'static str, position: Position) {
    let tick = read_length(ctx, position);
    ctx.track.add_command(CommandType::Rest, position).tick = tick;
    ctx.track.set_last_note();
}

fn tie(ctx: &mut CommandContext<'_>, _name: &'static str, position: Position) {
    let tick = read_length(ctx, position);
    match ctx.track.last_note_mut() {
        Some(cmd) => cmd.tick = cmd.tick.saturating_add(tick),
        None => ctx.errors.add(ErrorKind::LastNoteNotFound, position),
    }
}

fn length(ctx: &mut CommandContext<'_>, _name: &'static str, position: Position) {
    ctx.track.default_tick = read_length(ctx, position);
}

fn tone(ctx: &mut CommandContext<'_>, _name: &'static str, position: Position) {
    let name = ctx.m.read_name();
    let known = ctx.tones.contains_key(&name);
    let cmd = ctx.track.add_command(CommandType::Tone, position);
    if known {
        cmd.text = Some(name);
    } else {
        ctx.errors.add(ErrorKind::UnknownToneName, position);
    }
}

fn effect(ctx: &mut CommandContext<'_>, _name: &'static str, position: Position) {
    let name = ctx.m.read_name();
    ctx.track.add_command(CommandType::Effect, position).text = Some(name);
}

fn macro_ref(ctx: &mut CommandContext<'_>, _name: &'static str, position: Position) {
    let name = ctx.m.read_name();
    ctx.track.add_command(CommandType::Macro, position).text = Some(name);
}

fn volume(ctx: &mut CommandContext<'_>, _name: &'static str, position: Position) {
    let value = read_required(ctx, position);
    if value > ctx.track.max_volume {
        ctx.errors.add(ErrorKind::VolumeOutOfRange, position);
    }
    ctx.track.add_command(CommandType::Volume, position).value = value;
}

fn tempo(ctx: &mut CommandContext<'_>, _name: &'static str, position: Position) {
    let value = match ctx.m.read_int() {
        Some(value) if value > 0 => value,
        _ => {
            ctx.errors.add(ErrorKind::InvalidNumber, position);
            return;
        }
    };
    ctx.track.add_command(CommandType::Tempo, position).value = value;
}

fn octave(ctx: &mut CommandContext<'_>, _name: &'static str, position: Position) {
    let value = read_required(ctx, position);
    if !(0..=MAX_OCTAVE).contains(&value) {
        ctx.errors.add(ErrorKind::InvalidNumber, position);
        return;
    }
    ctx.track.add_command(CommandType::Octave, position).value = value;
}

fn octave_up(ctx: &mut CommandContext<'_>, _name: &'static str, position: Position) {
    ctx.track.add_command(CommandType::OctaveUp, position);
}

fn octave_down(ctx: &mut CommandContext<'_>, _name: &'static str, position: Position) {
    ctx.track.add_command(CommandType::OctaveDown, position);
}

fn slur(ctx: &mut CommandContext<'_>, _name: &'static str, position: Position) {
    ctx.track.add_command(CommandType::Slur, position).value = 1;
}

fn loop_point(ctx: &mut CommandContext<'_>, _name: &'static str, position: Position) {
    ctx.track.add_command(CommandType::Loop, position);
}

fn repeat_start(ctx: &mut CommandContext<'_>, _name: &'static str, position: Position) {
    ctx.track.open_repeat();
    ctx.track.add_command(CommandType::RepeatStart, position);
}

fn repeat_end(ctx: &mut CommandContext<'_>, _name: &'static str, position: Position) {
    let count = match ctx.m.peek() {
        Some(c) if c.is_ascii_digit() => read_required(ctx, position),
        _ => 0,
    };
    if count == 1 {
        ctx.errors.add(ErrorKind::RepeatCount, position);
    }
    if !ctx.track.close_repeat() {
        ctx.errors.add(ErrorKind::RepeatUnbalanced, position);
        return;
    }
    ctx.track.add_command(CommandType::RepeatEnd, position).value = count;
}

fn repeat_escape(ctx: &mut CommandContext<'_>, _name: &'static str, position: Position) {
    if ctx.track.open_repeats() == 0 {
        ctx.errors.add(ErrorKind::RepeatUnbalanced, position);
        return;
    }
    ctx.track.add_command(CommandType::RepeatEscape, position);
}

fn staccato(ctx: &mut CommandContext<'_>, _name: &'static str, position: Position) {
    let value = read_required(ctx, position);
    ctx.track.add_command(CommandType::Staccato, position).value = value;
}
