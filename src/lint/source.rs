// src/lint/source.rs

//! Source masking shared by the checkers.
//!
//! Every character is classified as code, comment or literal (string
//! contents, unquoted `url(...)` bodies). Quote characters themselves stay
//! code. The `bare` view blanks comments and literals to spaces while
//! keeping newlines, so offsets and columns line up with the raw text.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Scss,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Code,
    Comment,
    Literal,
}

/// A quoted string found in code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
    /// Offset of the opening quote.
    pub start: usize,
    pub quote: char,
    pub contents: String,
}

/// A comment found in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub start: usize,
    pub end: usize,
    /// `//` comment rather than `/* */`.
    pub inline: bool,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Document {
    pub raw: Vec<char>,
    pub regions: Vec<Region>,
    pub bare: Vec<char>,
    pub strings: Vec<StringLiteral>,
    pub comments: Vec<Comment>,
    line_starts: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    LineComment,
    BlockComment,
    Str(char),
    Url,
}

impl Document {
    pub fn mask(source: &str, syntax: Syntax) -> Self {
        let raw: Vec<char> = source.chars().collect();
        let n = raw.len();
        let mut regions = vec![Region::Code; n];
        let mut strings = Vec::new();
        let mut comments = Vec::new();

        let mut state = State::Code;
        let mut token_start = 0;
        let mut buf = String::new();
        let mut i = 0;

        while i < n {
            let c = raw[i];
            let next = raw.get(i + 1).copied();

            match state {
                State::Code => {
                    if c == '/' && next == Some('*') {
                        state = State::BlockComment;
                        token_start = i;
                        regions[i] = Region::Comment;
                        regions[i + 1] = Region::Comment;
                        i += 2;
                        continue;
                    }
                    if c == '/' && next == Some('/') {
                        state = State::LineComment;
                        token_start = i;
                        regions[i] = Region::Comment;
                        i += 1;
                        continue;
                    }
                    let quotes: &[char] = match syntax {
                        Syntax::Scss => &['"', '\''],
                        Syntax::Script => &['"', '\'', '`'],
                    };
                    if quotes.contains(&c) {
                        state = State::Str(c);
                        token_start = i;
                        buf.clear();
                    } else if syntax == Syntax::Scss && opens_unquoted_url(&raw, i) {
                        // `url(` stays code; the body becomes literal.
                        regions[i..i + 4].fill(Region::Code);
                        state = State::Url;
                        i += 4;
                        continue;
                    }
                }
                State::LineComment => {
                    if c == '\n' {
                        comments.push(Comment {
                            start: token_start,
                            end: i,
                            inline: true,
                            text: raw[token_start..i].iter().collect(),
                        });
                        state = State::Code;
                    } else {
                        regions[i] = Region::Comment;
                    }
                }
                State::BlockComment => {
                    regions[i] = Region::Comment;
                    if c == '*' && next == Some('/') {
                        regions[i + 1] = Region::Comment;
                        comments.push(Comment {
                            start: token_start,
                            end: i + 2,
                            inline: false,
                            text: raw[token_start..i + 2].iter().collect(),
                        });
                        state = State::Code;
                        i += 2;
                        continue;
                    }
                }
                State::Str(quote) => {
                    if c == '\\' && next.is_some() {
                        regions[i] = Region::Literal;
                        regions[i + 1] = Region::Literal;
                        buf.push(c);
                        if let Some(escaped) = next {
                            buf.push(escaped);
                        }
                        i += 2;
                        continue;
                    }
                    if c == quote || (c == '\n' && quote != '`') {
                        strings.push(StringLiteral {
                            start: token_start,
                            quote,
                            contents: std::mem::take(&mut buf),
                        });
                        state = State::Code;
                    } else {
                        regions[i] = Region::Literal;
                        buf.push(c);
                    }
                }
                State::Url => {
                    if c == ')' || c == '\n' {
                        state = State::Code;
                    } else {
                        regions[i] = Region::Literal;
                    }
                }
            }
            i += 1;
        }

        match state {
            State::LineComment | State::BlockComment => comments.push(Comment {
                start: token_start,
                end: n,
                inline: state == State::LineComment,
                text: raw[token_start..n].iter().collect(),
            }),
            State::Str(quote) => strings.push(StringLiteral {
                start: token_start,
                quote,
                contents: buf,
            }),
            _ => {}
        }

        let bare = raw
            .iter()
            .zip(&regions)
            .map(|(&c, region)| match (c, region) {
                ('\n', _) => '\n',
                (_, Region::Code) => c,
                _ => ' ',
            })
            .collect();

        let mut line_starts = vec![0];
        line_starts.extend(
            raw.iter()
                .enumerate()
                .filter(|(_, c)| **c == '\n')
                .map(|(i, _)| i + 1),
        );

        Self {
            raw,
            regions,
            bare,
            strings,
            comments,
            line_starts,
        }
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Number of lines, counting a trailing partial line.
    pub fn line_count(&self) -> usize {
        if self.raw.last() == Some(&'\n') {
            self.line_starts.len() - 1
        } else {
            self.line_starts.len()
        }
    }

    /// 1-based line and column of `offset`.
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        (line_idx + 1, offset - self.line_starts[line_idx] + 1)
    }

    /// Offsets `[start, end)` of 1-based `line`, without the newline.
    pub fn line_span(&self, line: usize) -> (usize, usize) {
        let start = self.line_starts[line - 1];
        let end = self
            .line_starts
            .get(line)
            .map(|next| next - 1)
            .unwrap_or(self.raw.len());
        (start, end)
    }

    pub fn raw_line(&self, line: usize) -> String {
        let (start, end) = self.line_span(line);
        self.raw[start..end].iter().collect()
    }

    pub fn bare_line(&self, line: usize) -> String {
        let (start, end) = self.line_span(line);
        self.bare[start..end].iter().collect()
    }

    pub fn line_has_comment(&self, line: usize) -> bool {
        let (start, end) = self.line_span(line);
        self.regions[start..end].contains(&Region::Comment)
    }

    /// Previous offset before `offset` whose bare character is not
    /// whitespace.
    pub fn prev_code(&self, offset: usize) -> Option<usize> {
        (0..offset).rev().find(|&i| !self.bare[i].is_whitespace())
    }

    /// Previous raw non-whitespace offset (comments count).
    pub fn prev_raw(&self, offset: usize) -> Option<usize> {
        (0..offset).rev().find(|&i| !self.raw[i].is_whitespace())
    }

    /// Whether only whitespace separates `offset` from the previous
    /// non-whitespace raw character and that gap holds an empty line.
    pub fn empty_line_before(&self, offset: usize) -> bool {
        let from = self.prev_raw(offset).map(|i| i + 1).unwrap_or(0);
        self.raw[from..offset].iter().filter(|c| **c == '\n').count() >= 2
    }

    /// Whether the raw text before `offset` on its line is whitespace only.
    pub fn starts_line(&self, offset: usize) -> bool {
        let (line, _) = self.position(offset);
        let start = self.line_starts[line - 1];
        self.raw[start..offset].iter().all(|c| c.is_whitespace())
    }

    /// Whether the bare text after `offset` up to the end of its line is
    /// whitespace only.
    pub fn rest_of_line_blank(&self, offset: usize) -> bool {
        self.bare[offset..]
            .iter()
            .take_while(|c| **c != '\n')
            .all(|c| c.is_whitespace())
    }
}

fn opens_unquoted_url(raw: &[char], i: usize) -> bool {
    if i + 4 > raw.len() {
        return false;
    }
    let word: String = raw[i..i + 4].iter().collect();
    if !word.eq_ignore_ascii_case("url(") {
        return false;
    }
    if i > 0 && (raw[i - 1].is_alphanumeric() || raw[i - 1] == '-') {
        return false;
    }
    let first = raw[i + 4..].iter().find(|c| !c.is_whitespace());
    !matches!(first, Some('"') | Some('\'') | None)
}
