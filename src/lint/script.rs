// src/lint/script.rs

//! Built-in script checker.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::lint::rules::{Expect, Ruleset};
use crate::lint::source::{Document, Region, Syntax};
use crate::lint::{Linter, Violation};

pub const IMPLEMENTED: &[&str] = &[
    "no-debugger",
    "no-mixed-spaces-and-tabs",
    "no-irregular-whitespace",
    "no-trailing-spaces",
    "eol-last",
    "no-empty",
];

/// Keywords whose block may not be empty, directly or after a `(...)` head.
const BLOCK_KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "do", "try", "catch", "finally", "switch",
];

static DEBUGGER: LazyLock<Regex> = LazyLock::new(|| match Regex::new(r"\bdebugger\b") {
    Ok(re) => re,
    Err(e) => panic!("debugger pattern failed to compile: {e}"),
});

const IRREGULAR_WHITESPACE: &[char] = &[
    '\u{000B}', '\u{000C}', '\u{00A0}', '\u{0085}', '\u{1680}', '\u{180E}', '\u{2000}',
    '\u{2001}', '\u{2002}', '\u{2003}', '\u{2004}', '\u{2005}', '\u{2006}', '\u{2007}',
    '\u{2008}', '\u{2009}', '\u{200A}', '\u{200B}', '\u{2028}', '\u{2029}', '\u{202F}',
    '\u{205F}', '\u{3000}', '\u{FEFF}',
];

/// Script linter for plain JavaScript sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptLinter;

impl Linter for ScriptLinter {
    fn lint(&self, path: &Path, source: &str, rules: &Ruleset) -> Vec<Violation> {
        let doc = Document::mask(source, Syntax::Script);
        let mut out = Vec::new();
        let mut add = |offset: usize, rule: &str, message: &str| {
            let (line, column) = doc.position(offset.min(doc.len()));
            out.push(Violation {
                file: path.to_path_buf(),
                line,
                column,
                rule: rule.to_string(),
                message: message.to_string(),
            });
        };

        for line in 1..=doc.line_count() {
            let (start, end) = doc.line_span(line);
            // Lines that begin inside a multi-line template literal are text.
            let in_literal = start > 0 && doc.regions[start - 1] == Region::Literal;

            if rules.contains("no-debugger") {
                let bare = doc.bare_line(line);
                for m in DEBUGGER.find_iter(&bare) {
                    let column = bare[..m.start()].chars().count();
                    add(start + column, "no-debugger", "Unexpected 'debugger' statement.");
                }
            }

            if rules.contains("no-mixed-spaces-and-tabs") && !in_literal {
                let leading: Vec<char> = doc.raw[start..end]
                    .iter()
                    .copied()
                    .take_while(|c| *c == ' ' || *c == '\t')
                    .collect();
                if let Some(pos) = leading.windows(2).position(|w| w[0] != w[1]) {
                    add(start + pos + 1, "no-mixed-spaces-and-tabs", "Mixed spaces and tabs.");
                }
            }

            if rules.contains("no-trailing-spaces") && end > start {
                let last = end - 1;
                let trailing = doc.raw[last].is_whitespace();
                if trailing && doc.regions[last] != Region::Literal {
                    let mut first = last;
                    while first > start && doc.raw[first - 1].is_whitespace() {
                        first -= 1;
                    }
                    add(first, "no-trailing-spaces", "Trailing spaces not allowed.");
                }
            }
        }

        if rules.contains("no-irregular-whitespace") {
            for (offset, c) in doc.raw.iter().enumerate() {
                if offset == 0 && *c == '\u{FEFF}' {
                    continue;
                }
                if IRREGULAR_WHITESPACE.contains(c) && doc.regions[offset] != Region::Literal {
                    add(offset, "no-irregular-whitespace", "Irregular whitespace not allowed.");
                }
            }
        }

        if rules.contains("no-empty") {
            for offset in empty_blocks(&doc) {
                add(offset, "no-empty", "Empty block statement.");
            }
        }

        let wants_newline = rules
            .get("eol-last")
            .is_some_and(|s| s.expect() == Some(Expect::Always));
        if wants_newline && !doc.is_empty() && doc.raw.last() != Some(&'\n') {
            add(
                doc.len(),
                "eol-last",
                "Newline required at end of file but not found.",
            );
        }

        out.sort_by(|a, b| (a.line, a.column).cmp(&(b.line, b.column)));
        out
    }

    fn advisory_rules(&self, rules: &Ruleset) -> BTreeSet<&'static str> {
        rules
            .iter()
            .map(|e| e.name)
            .filter(|name| !IMPLEMENTED.contains(name))
            .collect()
    }
}

/// Offsets of `{` opening a statement block with nothing inside, not even a
/// comment. Function bodies and object literals are not statement blocks.
fn empty_blocks(doc: &Document) -> Vec<usize> {
    let code = |i: usize| doc.regions[i] == Region::Code;
    let mut found = Vec::new();

    for open in 0..doc.len() {
        if doc.raw[open] != '{' || !code(open) {
            continue;
        }
        let close = (open + 1..doc.len()).find(|&i| !doc.raw[i].is_whitespace());
        let Some(close) = close else { continue };
        if doc.raw[close] != '}' || !code(close) {
            continue;
        }

        let block = match doc.prev_code(open) {
            None => true,
            Some(prev) => match doc.bare[prev] {
                ';' | '{' | '}' => true,
                ')' => matching_open_paren(doc, prev)
                    .and_then(|paren| word_before(doc, paren))
                    .is_some_and(|word| BLOCK_KEYWORDS.contains(&word.as_str())),
                c if is_ident(c) => word_before(doc, prev + 1)
                    .is_some_and(|word| BLOCK_KEYWORDS.contains(&word.as_str())),
                _ => false,
            },
        };
        if block {
            found.push(open);
        }
    }
    found
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn matching_open_paren(doc: &Document, close: usize) -> Option<usize> {
    let mut depth = 0usize;
    for i in (0..=close).rev() {
        match doc.bare[i] {
            ')' => depth += 1,
            '(' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Identifier ending just before `end`, skipping whitespace.
fn word_before(doc: &Document, end: usize) -> Option<String> {
    let last = doc.prev_code(end)?;
    if !is_ident(doc.bare[last]) {
        return None;
    }
    let mut first = last;
    while first > 0 && is_ident(doc.bare[first - 1]) {
        first -= 1;
    }
    Some(doc.bare[first..=last].iter().collect())
}
