//! `#NAME p1,p2,...` directive lines

use super::cursor::{CharClass, Position, SourceCursor};
use super::diagnostic::{ErrorKind, ErrorLog};
use crate::chips::opna;
use crate::song::Song;
use tracing::debug;

type DirectiveHandler = fn(&mut Song, &[String], &mut ErrorLog, Position);

/// One entry of the directive table
struct Directive {
    name: &'static str,
    min_params: usize,
    handler: DirectiveHandler,
}

const DIRECTIVES: &[Directive] = &[
    Directive {
        name: "OCTREV",
        min_params: 0,
        handler: octave_reverse,
    },
    Directive {
        name: "BASETICK",
        min_params: 1,
        handler: base_tick,
    },
    Directive {
        name: "TITLE",
        min_params: 1,
        handler: title,
    },
    Directive {
        name: "DEVICE",
        min_params: 2,
        handler: device,
    },
    Directive {
        name: "TRACK",
        min_params: 3,
        handler: track,
    },
];

/// Table-driven interpreter for directive lines
#[derive(Debug, Default)]
pub struct HeaderCompiler;

impl HeaderCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Compile one directive line; the cursor sits on `#`
    pub fn compile_line(&self, m: &mut SourceCursor, song: &mut Song, errors: &mut ErrorLog) {
        let position = m.position();
        m.step();
        let name = m.read_name();

        let params = match read_params(m, errors) {
            Some(params) => params,
            None => return,
        };
        debug!("header {} {:?} at {}", name, params, position);
        self.apply(song, &name, &params, errors, position);
    }

    /// Run a directive by name
    pub fn apply(
        &self,
        song: &mut Song,
        name: &str,
        params: &[String],
        errors: &mut ErrorLog,
        position: Position,
    ) {
        let directive = match DIRECTIVES.iter().find(|d| d.name == name) {
            Some(d) => d,
            None => {
                errors.add(ErrorKind::UnknownHeaderName, position);
                return;
            }
        };
        if params.len() < directive.min_params {
            errors.add(ErrorKind::TooFewParameters, position);
            return;
        }
        (directive.handler)(song, params, errors, position);
    }
}

/// Read comma/space separated parameters up to the end of the line.
///
/// Quoted parameters may contain separators and `\"`.
fn read_params(m: &mut SourceCursor, errors: &mut ErrorLog) -> Option<Vec<String>> {
    let mut params = Vec::new();
    let mut after_param = false;

    loop {
        m.skip_if_space();
        let mut class = m.classify();
        if after_param && class == CharClass::Separator {
            m.advance();
            m.skip_if_space();
            class = m.classify();
        }
        if class.is_line_end() || class == CharClass::CommentLine {
            break;
        }
        if class != CharClass::General {
            errors.add(ErrorKind::UnexpectedCharacter, m.position());
            return None;
        }

        let param = if m.peek() == Some('"') {
            match m.read_quoted() {
                Some(text) => text,
                None => {
                    errors.add(ErrorKind::QuoteEndNotFound, m.position());
                    return None;
                }
            }
        } else {
            let token = m.read_token();
            if token.is_empty() {
                errors.add(ErrorKind::UnexpectedCharacter, m.position());
                return None;
            }
            token
        };
        params.push(param);
        after_param = true;
    }

    Some(params)
}

fn parse_number(text: &str, errors: &mut ErrorLog, position: Position) -> Option<i32> {
    match text.parse::<i32>() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.add(ErrorKind::InvalidNumber, position);
            None
        }
    }
}

fn octave_reverse(song: &mut Song, _params: &[String], _errors: &mut ErrorLog, _pos: Position) {
    song.octave_reverse = true;
}

fn base_tick(song: &mut Song, params: &[String], errors: &mut ErrorLog, position: Position) {
    let tick = match parse_number(&params[0], errors, position) {
        Some(tick) => tick,
        None => return,
    };
    if tick <= 0 {
        errors.add(ErrorKind::InvalidNumber, position);
        return;
    }
    song.set_master_tick(tick);
}

fn title(song: &mut Song, params: &[String], _errors: &mut ErrorLog, _pos: Position) {
    song.set_title(&params[0]);
}

fn device(song: &mut Song, params: &[String], errors: &mut ErrorLog, position: Position) {
    if let Some(index) = parse_number(&params[0], errors, position) {
        song.add_device(index, &params[1], errors, position);
    }
}

fn track(song: &mut Song, params: &[String], errors: &mut ErrorLog, position: Position) {
    let device = match parse_number(&params[1], errors, position) {
        Some(device) => device,
        None => return,
    };
    let channel = match parse_number(&params[2], errors, position) {
        Some(channel) => channel,
        None => return,
    };
    if device < 0 {
        errors.add(ErrorKind::DeviceIndexOutOfRange, position);
        return;
    }
    if !(0..opna::CHANNELS as i32).contains(&channel) {
        errors.add(ErrorKind::ChannelOutOfRange, position);
        return;
    }
    song.add_track(&params[0], device as usize, channel as usize, errors, position);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> (Song, ErrorLog) {
        let mut song = Song::new();
        let mut errors = ErrorLog::new();
        let mut m = SourceCursor::new(src);
        HeaderCompiler::new().compile_line(&mut m, &mut song, &mut errors);
        (song, errors)
    }

    #[test]
    fn test_title_quoted() {
        let (song, errors) = run(r#"#TITLE "X Y""#);
        assert!(errors.is_empty());
        assert_eq!(song.title(), Some("X Y"));
    }

    #[test]
    fn test_title_escaped_quote() {
        let (song, errors) = run(r#"#TITLE "say \"hi\"", extra"#);
        assert!(errors.is_empty());
        assert_eq!(song.title(), Some(r#"say "hi""#));
    }

    #[test]
    fn test_title_bare_token() {
        let (song, _) = run("#TITLE Song1 // comment");
        assert_eq!(song.title(), Some("Song1"));
    }

    #[test]
    fn test_unterminated_quote() {
        let (song, errors) = run(r#"#TITLE "open"#);
        assert!(errors.contains(ErrorKind::QuoteEndNotFound));
        assert_eq!(song.title(), None);
    }

    #[test]
    fn test_basetick() {
        let (song, errors) = run("#BASETICK 192");
        assert!(errors.is_empty());
        assert_eq!(song.master_tick(), 192);

        let (song, errors) = run("#BASETICK 0");
        assert!(errors.contains(ErrorKind::InvalidNumber));
        assert_eq!(song.master_tick(), 128);

        let (_, errors) = run("#BASETICK x");
        assert!(errors.contains(ErrorKind::InvalidNumber));
    }

    #[test]
    fn test_wide_space_between_params() {
        let (song, errors) = run("#TITLE \"x\"\u{3000}");
        assert!(errors.is_empty(), "{}", errors);
        assert_eq!(song.title(), Some("x"));

        let (song, errors) = run("#BASETICK\u{3000}96");
        assert!(errors.is_empty(), "{}", errors);
        assert_eq!(song.master_tick(), 96);
    }

    #[test]
    fn test_octrev() {
        let (song, errors) = run("#OCTREV");
        assert!(errors.is_empty());
        assert!(song.octave_reverse);
    }

    #[test]
    fn test_device_and_track() {
        let mut song = Song::new();
        let mut errors = ErrorLog::new();
        let compiler = HeaderCompiler::new();
        for line in ["#DEVICE 0,OPNA", "#TRACK Lead, 0, 3", "#TRACK Bass 0 6"] {
            let mut m = SourceCursor::new(line);
            compiler.compile_line(&mut m, &mut song, &mut errors);
        }
        assert!(errors.is_empty(), "{}", errors);
        let tracks: Vec<(&str, usize, usize)> = song
            .tracks()
            .iter()
            .map(|t| (t.name.as_str(), t.device, t.channel))
            .collect();
        assert_eq!(tracks, vec![("Lead", 0, 3), ("Bass", 0, 6)]);
    }

    #[test]
    fn test_errors() {
        let (_, errors) = run("#NOPE 1");
        assert!(errors.contains(ErrorKind::UnknownHeaderName));
        let (_, errors) = run("#TRACK A,0");
        assert!(errors.contains(ErrorKind::TooFewParameters));
        let (_, errors) = run("#TRACK A,0,11");
        assert!(errors.contains(ErrorKind::ChannelOutOfRange));
        let (_, errors) = run("#DEVICE 0,OPM");
        assert!(errors.contains(ErrorKind::UnsupportedDevice));
        let (_, errors) = run("#DEVICE 0 {");
        assert!(errors.contains(ErrorKind::UnexpectedCharacter));
    }

    #[test]
    fn test_error_position() {
        let (_, errors) = run("#NOPE");
        assert_eq!(errors.to_string(), "1:1 : Error unknown header name");
    }
}
