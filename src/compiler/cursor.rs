//! Source scanner with line/column tracking

use std::fmt;

/// Line and column inside the source text (both 0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// Classification of the unit under the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Eof,
    NextLine,
    /// `,`
    Separator,
    /// `{`
    BlockStart,
    /// `}`
    BlockEnd,
    Space,
    /// `//`
    CommentLine,
    /// `/*`
    CommentStart,
    /// `*/`
    CommentEnd,
    General,
}

impl CharClass {
    pub fn is_comment(self) -> bool {
        matches!(
            self,
            CharClass::CommentLine | CharClass::CommentStart | CharClass::CommentEnd
        )
    }

    pub fn is_line_end(self) -> bool {
        matches!(self, CharClass::NextLine | CharClass::Eof)
    }

    /// Units skipped between tone values and block contents
    pub fn is_skippable(self) -> bool {
        self == CharClass::NextLine || self == CharClass::Space || self.is_comment()
    }
}

/// Line-oriented scanner over MML source
#[derive(Debug, Clone)]
pub struct SourceCursor {
    lines: Vec<Vec<char>>,
    pos: Position,
}

impl SourceCursor {
    pub fn new(text: &str) -> Self {
        let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
        Self {
            lines: text.lines().map(|l| l.chars().collect()).collect(),
            pos: Position::default(),
        }
    }

    pub fn position(&self) -> Position {
        self.pos
    }

    /// Snapshot the cursor
    pub fn save(&self) -> Position {
        self.pos
    }

    /// Rewind to a snapshot taken with [`save`](Self::save)
    pub fn restore(&mut self, pos: Position) {
        self.pos = pos;
    }

    pub fn is_eof(&self) -> bool {
        self.pos.line >= self.lines.len()
    }

    /// Unconsumed text of the current line
    fn rest(&self) -> &[char] {
        match self.lines.get(self.pos.line) {
            Some(line) if self.pos.column < line.len() => &line[self.pos.column..],
            _ => &[],
        }
    }

    /// True at the end of the current line (or at EOF)
    pub fn is_line_end(&self) -> bool {
        self.rest().is_empty()
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().first().copied()
    }

    /// Whether the unconsumed part of the line starts with `pattern`
    pub fn starts_with(&self, pattern: &str) -> bool {
        let rest = self.rest();
        let mut count = 0;
        for (i, c) in pattern.chars().enumerate() {
            if rest.get(i) != Some(&c) {
                return false;
            }
            count += 1;
        }
        count <= rest.len()
    }

    /// Classify the next unit without consuming it
    pub fn classify(&self) -> CharClass {
        if self.is_eof() {
            return CharClass::Eof;
        }
        let c = match self.peek() {
            Some(c) => c,
            None => return CharClass::NextLine,
        };
        match c {
            ',' => CharClass::Separator,
            '{' => CharClass::BlockStart,
            '}' => CharClass::BlockEnd,
            _ if c.is_whitespace() => CharClass::Space,
            _ if self.starts_with("//") => CharClass::CommentLine,
            _ if self.starts_with("/*") => CharClass::CommentStart,
            _ if self.starts_with("*/") => CharClass::CommentEnd,
            _ => CharClass::General,
        }
    }

    pub fn step(&mut self) {
        self.step_by(1);
    }

    pub fn step_by(&mut self, count: usize) {
        if !self.is_eof() {
            self.pos.column += count;
        }
    }

    pub fn next_line(&mut self) {
        if !self.is_eof() {
            self.pos.line += 1;
            self.pos.column = 0;
        }
    }

    /// Consume exactly one classified unit
    pub fn advance(&mut self) {
        match self.classify() {
            CharClass::Eof => {}
            CharClass::NextLine | CharClass::CommentLine => self.next_line(),
            CharClass::Separator
            | CharClass::BlockStart
            | CharClass::BlockEnd
            | CharClass::General => self.step(),
            CharClass::Space => self.skip_space(),
            CharClass::CommentStart => self.skip_comment_block(),
            CharClass::CommentEnd => self.step_by(2),
        }
    }

    /// Stops on the closing `*/` so it classifies as `CommentEnd` next.
    /// Running into EOF is not an error.
    fn skip_comment_block(&mut self) {
        self.step_by(2);
        while !self.is_eof() {
            let rest = self.rest();
            match rest.windows(2).position(|w| w == ['*', '/']) {
                Some(index) => {
                    self.step_by(index);
                    break;
                }
                None => self.next_line(),
            }
        }
    }

    pub fn skip_space(&mut self) {
        let count = self.rest().iter().take_while(|c| c.is_whitespace()).count();
        self.step_by(count);
    }

    pub fn skip_if_space(&mut self) {
        if self.classify() == CharClass::Space {
            self.skip_space();
        }
    }

    /// Skip spaces, line ends and comments
    pub fn skip_skippable(&mut self) {
        while self.classify().is_skippable() {
            self.advance();
        }
    }

    fn take_while<F>(&mut self, predicate: F) -> String
    where
        F: Fn(char) -> bool,
    {
        let text: String = self.rest().iter().copied().take_while(|&c| predicate(c)).collect();
        self.step_by(text.chars().count());
        text
    }

    /// Read a `[A-Za-z0-9_]+` run (empty if none)
    pub fn read_name(&mut self) -> String {
        self.take_while(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    /// Read a digit run (empty if none)
    pub fn read_number(&mut self) -> String {
        self.take_while(|c| c.is_ascii_digit())
    }

    /// Read a digit run and parse it
    pub fn read_int(&mut self) -> Option<i32> {
        self.read_number().parse().ok()
    }

    /// Read a non-space token, stopping at separators
    pub fn read_token(&mut self) -> String {
        self.take_while(|c| !c.is_whitespace() && c != ',')
    }

    /// Read a `"..."` string honoring `\"` escapes.
    ///
    /// Returns `None` without moving when the closing quote is missing.
    pub fn read_quoted(&mut self) -> Option<String> {
        let rest = self.rest();
        if rest.first() != Some(&'"') {
            return None;
        }
        let mut text = String::new();
        let mut i = 1;
        while i < rest.len() {
            match rest[i] {
                '\\' if rest.get(i + 1) == Some(&'"') => {
                    text.push('"');
                    i += 2;
                }
                '"' => {
                    self.step_by(i + 1);
                    return Some(text);
                }
                c => {
                    text.push(c);
                    i += 1;
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_units() {
        let mut m = SourceCursor::new(", {}\t//x\n/* a */b");
        assert_eq!(m.classify(), CharClass::Separator);
        m.advance();
        assert_eq!(m.classify(), CharClass::Space);
        m.advance();
        assert_eq!(m.classify(), CharClass::BlockStart);
        m.advance();
        assert_eq!(m.classify(), CharClass::BlockEnd);
        m.advance();
        assert_eq!(m.classify(), CharClass::Space);
        m.advance();
        assert_eq!(m.classify(), CharClass::CommentLine);
        m.advance();
        assert_eq!(m.position(), Position::new(1, 0));
        assert_eq!(m.classify(), CharClass::CommentStart);
        m.advance();
        assert_eq!(m.classify(), CharClass::CommentEnd);
        m.advance();
        assert_eq!(m.classify(), CharClass::General);
        m.advance();
        assert_eq!(m.classify(), CharClass::NextLine);
        m.advance();
        assert_eq!(m.classify(), CharClass::Eof);
    }

    #[test]
    fn test_unicode_space() {
        let mut m = SourceCursor::new("\u{3000}\u{00A0}x");
        assert_eq!(m.classify(), CharClass::Space);
        m.advance();
        assert_eq!(m.classify(), CharClass::Space);
        m.skip_if_space();
        assert_eq!(m.peek(), Some('x'));
    }

    #[test]
    fn test_comment_block_spans_lines() {
        let mut m = SourceCursor::new("/* one\ntwo\nthree */x");
        m.advance();
        assert_eq!(m.position(), Position::new(2, 6));
        assert_eq!(m.classify(), CharClass::CommentEnd);
    }

    #[test]
    fn test_unterminated_comment_reaches_eof() {
        let mut m = SourceCursor::new("/* never\nclosed");
        m.advance();
        assert!(m.is_eof());
        assert_eq!(m.classify(), CharClass::Eof);
        // Everything stays safe at EOF
        m.advance();
        assert_eq!(m.read_name(), "");
        assert_eq!(m.read_number(), "");
        assert_eq!(m.peek(), None);
    }

    #[test]
    fn test_read_name_and_number() {
        let mut m = SourceCursor::new("Track_1 128c");
        assert_eq!(m.read_name(), "Track_1");
        m.skip_if_space();
        assert_eq!(m.read_number(), "128");
        assert_eq!(m.peek(), Some('c'));
        assert_eq!(m.read_number(), "");
    }

    #[test]
    fn test_read_quoted_with_escape() {
        let mut m = SourceCursor::new(r#""X \"Y\" Z" rest"#);
        assert_eq!(m.read_quoted().as_deref(), Some(r#"X "Y" Z"#));
        assert_eq!(m.classify(), CharClass::Space);
    }

    #[test]
    fn test_read_quoted_unterminated() {
        let mut m = SourceCursor::new(r#""open"#);
        assert_eq!(m.read_quoted(), None);
        assert_eq!(m.position(), Position::new(0, 0));
    }

    #[test]
    fn test_read_token_stops_at_separator() {
        let mut m = SourceCursor::new("0,OPNA x");
        assert_eq!(m.read_token(), "0");
        assert_eq!(m.classify(), CharClass::Separator);
        m.advance();
        assert_eq!(m.read_token(), "OPNA");
    }

    #[test]
    fn test_save_restore() {
        let mut m = SourceCursor::new("A,B cde");
        m.step_by(4);
        let saved = m.save();
        m.step_by(2);
        assert_eq!(m.peek(), Some('e'));
        m.restore(saved);
        assert_eq!(m.peek(), Some('c'));
    }

    #[test]
    fn test_starts_with() {
        let m = SourceCursor::new("@e1");
        assert!(m.starts_with("@e"));
        assert!(m.starts_with("@"));
        assert!(!m.starts_with("@e12"));
    }
}
