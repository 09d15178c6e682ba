// src/lint/scss.rs

//! Built-in style-sheet checker.
//!
//! The masked source is split into statements (rules, at-rules,
//! declarations) by a brace/semicolon scanner; each rule family then walks
//! the statements or the raw lines. Whitespace checks look at the raw text,
//! structural checks at the masked text.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use regex::Regex;
use tracing::debug;

use crate::lint::rules::{compile_pattern, ColonNotation, Expect, HexLength, Ruleset, RuleSetting};
use crate::lint::source::{Document, Region, Syntax};
use crate::lint::{Linter, Violation};

/// Rule names this checker evaluates.
pub const IMPLEMENTED: &[&str] = &[
    "at-rule-empty-line-before",
    "at-rule-name-case",
    "at-rule-name-space-after",
    "at-rule-no-unknown",
    "at-rule-semicolon-newline-after",
    "block-closing-brace-newline-after",
    "block-closing-brace-newline-before",
    "block-opening-brace-newline-after",
    "block-opening-brace-space-before",
    "color-hex-case",
    "color-hex-length",
    "color-named",
    "comment-empty-line-before",
    "declaration-bang-space-after",
    "declaration-bang-space-before",
    "declaration-block-no-duplicate-properties",
    "declaration-block-semicolon-newline-after",
    "declaration-block-semicolon-space-before",
    "declaration-block-trailing-semicolon",
    "declaration-colon-newline-after",
    "declaration-colon-space-after",
    "declaration-colon-space-before",
    "declaration-property-unit-whitelist",
    "font-family-name-quotes",
    "font-weight-notation",
    "function-comma-space-after",
    "function-comma-space-before",
    "function-max-empty-lines",
    "function-name-case",
    "function-parentheses-space-inside",
    "function-url-quotes",
    "function-whitespace-after",
    "indentation",
    "length-zero-no-unit",
    "max-empty-lines",
    "max-line-length",
    "media-feature-colon-space-after",
    "media-feature-colon-space-before",
    "media-feature-range-operator-space-after",
    "media-feature-range-operator-space-before",
    "media-query-list-comma-newline-after",
    "media-query-list-comma-space-after",
    "media-query-list-comma-space-before",
    "no-eol-whitespace",
    "no-missing-end-of-source-newline",
    "number-leading-zero",
    "number-no-trailing-zeros",
    "property-case",
    "rule-empty-line-before",
    "selector-attribute-brackets-space-inside",
    "selector-attribute-operator-space-after",
    "selector-attribute-operator-space-before",
    "selector-attribute-quotes",
    "selector-class-pattern",
    "selector-combinator-space-after",
    "selector-combinator-space-before",
    "selector-id-pattern",
    "selector-list-comma-newline-after",
    "selector-list-comma-space-before",
    "selector-max-empty-lines",
    "selector-pseudo-class-case",
    "selector-pseudo-class-parentheses-space-inside",
    "selector-pseudo-element-case",
    "selector-pseudo-element-colon-notation",
    "selector-type-case",
    "string-quotes",
    "unit-case",
    "value-keyword-case",
    "value-list-comma-newline-after",
    "value-list-comma-space-after",
    "value-list-comma-space-before",
];

const NAMED_COLORS: &[&str] = &[
    "aliceblue", "antiquewhite", "aqua", "aquamarine", "azure", "beige", "bisque", "black",
    "blanchedalmond", "blue", "blueviolet", "brown", "burlywood", "cadetblue", "chartreuse",
    "chocolate", "coral", "cornflowerblue", "cornsilk", "crimson", "cyan", "darkblue",
    "darkcyan", "darkgoldenrod", "darkgray", "darkgreen", "darkgrey", "darkkhaki",
    "darkmagenta", "darkolivegreen", "darkorange", "darkorchid", "darkred", "darksalmon",
    "darkseagreen", "darkslateblue", "darkslategray", "darkslategrey", "darkturquoise",
    "darkviolet", "deeppink", "deepskyblue", "dimgray", "dimgrey", "dodgerblue", "firebrick",
    "floralwhite", "forestgreen", "fuchsia", "gainsboro", "ghostwhite", "gold", "goldenrod",
    "gray", "green", "greenyellow", "grey", "honeydew", "hotpink", "indianred", "indigo",
    "ivory", "khaki", "lavender", "lavenderblush", "lawngreen", "lemonchiffon", "lightblue",
    "lightcoral", "lightcyan", "lightgoldenrodyellow", "lightgray", "lightgreen", "lightgrey",
    "lightpink", "lightsalmon", "lightseagreen", "lightskyblue", "lightslategray",
    "lightslategrey", "lightsteelblue", "lightyellow", "lime", "limegreen", "linen", "magenta",
    "maroon", "mediumaquamarine", "mediumblue", "mediumorchid", "mediumpurple",
    "mediumseagreen", "mediumslateblue", "mediumspringgreen", "mediumturquoise",
    "mediumvioletred", "midnightblue", "mintcream", "mistyrose", "moccasin", "navajowhite",
    "navy", "oldlace", "olive", "olivedrab", "orange", "orangered", "orchid", "palegoldenrod",
    "palegreen", "paleturquoise", "palevioletred", "papayawhip", "peachpuff", "peru", "pink",
    "plum", "powderblue", "purple", "rebeccapurple", "red", "rosybrown", "royalblue",
    "saddlebrown", "salmon", "sandybrown", "seagreen", "seashell", "sienna", "silver",
    "skyblue", "slateblue", "slategray", "slategrey", "snow", "springgreen", "steelblue", "tan",
    "teal", "thistle", "tomato", "turquoise", "violet", "wheat", "white", "whitesmoke",
    "yellow", "yellowgreen",
];

const LENGTH_UNITS: &[&str] = &[
    "em", "ex", "ch", "rem", "vh", "vw", "vmin", "vmax", "cm", "mm", "q", "in", "pt", "pc",
    "px",
];

const OTHER_UNITS: &[&str] = &[
    "deg", "grad", "rad", "turn", "s", "ms", "hz", "khz", "dpi", "dpcm", "dppx", "fr", "x",
];

const KNOWN_AT_RULES: &[&str] = &[
    "annotation", "character-variant", "charset", "container", "counter-style",
    "custom-media", "custom-selector", "document", "font-face", "font-feature-values",
    "font-palette-values", "import", "keyframes", "layer", "media", "namespace", "nest",
    "ornaments", "page", "property", "scope", "starting-style", "styleset", "stylistic",
    "supports", "swash", "viewport", "top-left-corner", "top-left", "top-center",
    "top-right", "top-right-corner", "bottom-left-corner", "bottom-left", "bottom-center",
    "bottom-right", "bottom-right-corner", "left-top", "left-middle", "left-bottom",
    "right-top", "right-middle", "right-bottom",
];

const GENERIC_FONT_FAMILIES: &[&str] = &[
    "serif", "sans-serif", "monospace", "cursive", "fantasy", "system-ui", "inherit",
    "initial", "unset",
];

/// Properties whose keyword values keep their own casing.
const CASE_PRESERVING_PROPERTIES: &[&str] = &[
    "font", "font-family", "content", "grid-template-areas", "grid-area", "animation-name",
    "counter-reset", "counter-increment",
];

const PSEUDO_ELEMENTS_LEGACY: &[&str] = &["before", "after", "first-line", "first-letter"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Rule,
    AtRule { block: bool },
    Decl,
}

/// A statement of the style sheet.
#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    /// First non-whitespace offset.
    start: usize,
    /// Offset of the terminator (`{`, `;` or `}`), or the end of input.
    end: usize,
    terminator: Option<char>,
    parent: Option<usize>,
    prev_sibling: Option<usize>,
    /// Closing brace of block statements.
    close: Option<usize>,
}

impl Node {
    fn is_block(&self) -> bool {
        matches!(self.kind, NodeKind::Rule | NodeKind::AtRule { block: true })
    }
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn has_upper(s: &str) -> bool {
    s.chars().any(|c| c.is_uppercase())
}

/// Split the masked text into statements.
fn parse(doc: &Document) -> Vec<Node> {
    let bare = &doc.bare;
    let n = bare.len();
    let mut nodes: Vec<Node> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    // Last statement seen at each open level; index 0 is the root.
    let mut last_child: Vec<Option<usize>> = vec![None];
    let mut seg_start: Option<usize> = None;
    let mut paren = 0usize;
    let mut i = 0;

    let push = |nodes: &mut Vec<Node>,
                    stack: &[usize],
                    last_child: &mut Vec<Option<usize>>,
                    kind: NodeKind,
                    start: usize,
                    end: usize,
                    terminator: Option<char>| {
        let idx = nodes.len();
        let slot = last_child.len() - 1;
        nodes.push(Node {
            kind,
            start,
            end,
            terminator,
            parent: stack.last().copied(),
            prev_sibling: last_child[slot],
            close: None,
        });
        last_child[slot] = Some(idx);
        idx
    };

    let kind_of = |start: usize| {
        if bare[start] == '@' {
            NodeKind::AtRule { block: false }
        } else {
            NodeKind::Decl
        }
    };

    while i < n {
        let c = bare[i];

        if c == '#' && bare.get(i + 1) == Some(&'{') {
            seg_start.get_or_insert(i);
            let mut depth = 0usize;
            while i < n {
                match bare[i] {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                i += 1;
            }
            i += 1;
            continue;
        }

        match c {
            '(' => {
                paren += 1;
                seg_start.get_or_insert(i);
            }
            ')' => {
                paren = paren.saturating_sub(1);
                seg_start.get_or_insert(i);
            }
            '{' if paren == 0 => {
                let start = seg_start.take().unwrap_or(i);
                let kind = if bare[start] == '@' {
                    NodeKind::AtRule { block: true }
                } else {
                    NodeKind::Rule
                };
                let idx = push(&mut nodes, &stack, &mut last_child, kind, start, i, Some('{'));
                stack.push(idx);
                last_child.push(None);
            }
            ';' if paren == 0 => {
                if let Some(start) = seg_start.take() {
                    push(
                        &mut nodes,
                        &stack,
                        &mut last_child,
                        kind_of(start),
                        start,
                        i,
                        Some(';'),
                    );
                }
            }
            '}' => {
                paren = 0;
                if let Some(start) = seg_start.take() {
                    push(
                        &mut nodes,
                        &stack,
                        &mut last_child,
                        kind_of(start),
                        start,
                        i,
                        Some('}'),
                    );
                }
                if let Some(open) = stack.pop() {
                    nodes[open].close = Some(i);
                    last_child.pop();
                }
            }
            c if c.is_whitespace() => {}
            _ => {
                seg_start.get_or_insert(i);
            }
        }
        i += 1;
    }

    if let Some(start) = seg_start {
        push(&mut nodes, &stack, &mut last_child, kind_of(start), start, n, None);
    }

    nodes
}

/// Immutable inputs shared by every rule family.
struct Ctx<'a> {
    doc: &'a Document,
    rules: &'a Ruleset,
    nodes: Vec<Node>,
}

/// Collected violations for one file.
struct Report<'a> {
    file: &'a Path,
    doc: &'a Document,
    items: Vec<Violation>,
}

impl Report<'_> {
    fn add(&mut self, rule: &str, offset: usize, message: impl Into<String>) {
        let (line, column) = self.doc.position(offset.min(self.doc.len()));
        self.items.push(Violation {
            file: self.file.to_path_buf(),
            line,
            column,
            rule: rule.to_string(),
            message: message.into(),
        });
    }
}

impl<'a> Ctx<'a> {
    fn setting(&self, rule: &str) -> Option<&'a RuleSetting> {
        self.rules.get(rule)
    }

    /// The rule is enabled with exactly this expectation.
    fn expects(&self, rule: &str, want: Expect) -> bool {
        match self.setting(rule).and_then(|s| s.expect()) {
            Some(e) if e == want => true,
            Some(other) => {
                debug!(rule, expectation = ?other, "expectation not evaluated by the built-in checker");
                false
            }
            None => false,
        }
    }

    fn enabled(&self, rule: &str) -> bool {
        self.setting(rule).is_some()
    }

    fn lower_case(&self, rule: &str) -> bool {
        matches!(
            self.setting(rule).and_then(|s| s.case()),
            Some(crate::lint::rules::Case::Lower)
        )
    }

    fn raw(&self, offset: usize) -> Option<char> {
        self.doc.raw.get(offset).copied()
    }

    fn raw_ws(&self, offset: usize) -> bool {
        self.raw(offset).is_some_and(|c| c.is_whitespace())
    }

    fn raw_ws_before(&self, offset: usize) -> bool {
        offset > 0 && self.raw_ws(offset - 1)
    }

    fn text(&self, start: usize, end: usize) -> String {
        self.doc.bare[start..end].iter().collect()
    }

    fn parent_is_keyframes(&self, node: &Node) -> bool {
        node.parent
            .map(|p| {
                let parent = &self.nodes[p];
                matches!(parent.kind, NodeKind::AtRule { .. })
                    && at_rule_name(self.doc, parent.start)
                        .to_lowercase()
                        .ends_with("keyframes")
            })
            .unwrap_or(false)
    }

    /// Trimmed end of a statement's prelude or declaration text.
    fn trimmed_end(&self, node: &Node) -> usize {
        let mut end = node.end;
        while end > node.start && self.doc.bare[end - 1].is_whitespace() {
            end -= 1;
        }
        end
    }
}

fn at_rule_name(doc: &Document, start: usize) -> String {
    doc.bare[start + 1..]
        .iter()
        .take_while(|c| is_ident(**c))
        .collect()
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokKind {
    Word,
    Number,
    Hash,
    Var,
    Punct,
    Space,
}

#[derive(Debug, Clone)]
struct Tok {
    kind: TokKind,
    start: usize,
    end: usize,
    text: String,
    /// For numbers: offset where the unit starts.
    unit_at: usize,
}

fn tokenize(bare: &[char], from: usize, to: usize) -> Vec<Tok> {
    let mut toks = Vec::new();
    let mut i = from;

    let make = |kind, start: usize, end: usize, unit_at: usize| Tok {
        kind,
        start,
        end,
        text: bare[start..end].iter().collect(),
        unit_at,
    };

    while i < to {
        let c = bare[i];
        let next = if i + 1 < to { Some(bare[i + 1]) } else { None };
        let start = i;

        if c.is_whitespace() {
            while i < to && bare[i].is_whitespace() {
                i += 1;
            }
            toks.push(make(TokKind::Space, start, i, i));
        } else if c == '#' && next == Some('{') {
            let mut depth = 0usize;
            while i < to {
                match bare[i] {
                    '{' => depth += 1,
                    '}' => {
                        depth = depth.saturating_sub(1);
                        if depth == 0 {
                            i += 1;
                            break;
                        }
                    }
                    _ => {}
                }
                i += 1;
            }
            toks.push(make(TokKind::Space, start, i, i));
        } else if c == '#' {
            i += 1;
            while i < to && is_ident(bare[i]) {
                i += 1;
            }
            toks.push(make(TokKind::Hash, start, i, i));
        } else if c == '$' {
            i += 1;
            while i < to && is_ident(bare[i]) {
                i += 1;
            }
            toks.push(make(TokKind::Var, start, i, i));
        } else if c.is_ascii_digit() || (c == '.' && next.is_some_and(|d| d.is_ascii_digit())) {
            while i < to && bare[i].is_ascii_digit() {
                i += 1;
            }
            if i < to && bare[i] == '.' && i + 1 < to && bare[i + 1].is_ascii_digit() {
                i += 1;
                while i < to && bare[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let unit_at = i;
            while i < to && (bare[i].is_alphabetic() || bare[i] == '%') {
                i += 1;
            }
            toks.push(make(TokKind::Number, start, i, unit_at));
        } else if c.is_alphabetic()
            || c == '_'
            || (c == '-' && next.is_some_and(|d| d.is_alphabetic() || d == '-' || d == '_'))
        {
            while i < to && is_ident(bare[i]) {
                i += 1;
            }
            toks.push(make(TokKind::Word, start, i, i));
        } else {
            i += 1;
            toks.push(make(TokKind::Punct, start, i, i));
        }
    }

    toks
}

/// A function call inside a value: name span and parentheses.
#[derive(Debug, Clone)]
struct Call {
    name: String,
    name_start: usize,
    open: usize,
    close: Option<usize>,
}

fn find_calls(bare: &[char], from: usize, to: usize) -> Vec<Call> {
    let mut calls = Vec::new();
    let mut open_stack: Vec<Option<usize>> = Vec::new();

    for i in from..to {
        match bare[i] {
            '(' => {
                let mut s = i;
                while s > from && (is_ident(bare[s - 1]) || bare[s - 1] == '.') {
                    s -= 1;
                }
                if s < i {
                    let name: String = bare[s..i].iter().collect();
                    calls.push(Call {
                        name,
                        name_start: s,
                        open: i,
                        close: None,
                    });
                    open_stack.push(Some(calls.len() - 1));
                } else {
                    open_stack.push(None);
                }
            }
            ')' => {
                if let Some(Some(idx)) = open_stack.pop() {
                    calls[idx].close = Some(i);
                }
            }
            _ => {}
        }
    }

    calls
}

/// Whether `offset` sits directly inside a function call (not a bare
/// parenthesised list).
fn innermost_is_call(calls: &[Call], bare: &[char], from: usize, offset: usize) -> Option<bool> {
    let mut stack: Vec<bool> = Vec::new();
    for i in from..offset {
        match bare[i] {
            '(' => stack.push(calls.iter().any(|c| c.open == i)),
            ')' => {
                stack.pop();
            }
            _ => {}
        }
    }
    stack.last().copied()
}

struct Declaration {
    node_start: usize,
    colon: usize,
    property: String,
    value_start: usize,
    value_end: usize,
}

fn split_declaration(ctx: &Ctx<'_>, node: &Node) -> Option<Declaration> {
    let bare = &ctx.doc.bare;
    let end = ctx.trimmed_end(node);
    let mut interp = 0usize;
    let mut colon = None;
    for i in node.start..end {
        match bare[i] {
            '#' if bare.get(i + 1) == Some(&'{') => interp += 1,
            '}' if interp > 0 => interp -= 1,
            ':' if interp == 0 => {
                colon = Some(i);
                break;
            }
            _ => {}
        }
    }
    let colon = colon?;
    let property = ctx.text(node.start, colon).trim_end().to_string();
    let mut value_start = colon + 1;
    while value_start < end && bare[value_start].is_whitespace() {
        value_start += 1;
    }
    Some(Declaration {
        node_start: node.start,
        colon,
        property,
        value_start,
        value_end: end,
    })
}

fn check_declarations(ctx: &Ctx<'_>, out: &mut Report<'_>) {
    let mut seen_by_parent: BTreeMap<Option<usize>, (Vec<String>, Option<String>)> =
        BTreeMap::new();

    for node in ctx.nodes.iter().filter(|n| n.kind == NodeKind::Decl) {
        let Some(decl) = split_declaration(ctx, node) else {
            continue;
        };
        let prop_lower = decl.property.to_lowercase();
        let is_variable = decl.property.starts_with('$');
        let is_custom = decl.property.starts_with("--") || decl.property.contains("#{");

        if ctx.lower_case("property-case") && !is_variable && !is_custom && has_upper(&decl.property)
        {
            out.add(
                "property-case",
                decl.node_start,
                format!("Expected \"{}\" to be \"{}\"", decl.property, prop_lower),
            );
        }

        if ctx.expects("declaration-colon-space-before", Expect::Never) && ctx.raw_ws_before(decl.colon)
        {
            out.add(
                "declaration-colon-space-before",
                decl.colon,
                "Unexpected whitespace before \":\"",
            );
        }

        let value_multi_line = ctx.doc.bare[decl.colon..decl.value_end].contains(&'\n');
        if ctx.expects("declaration-colon-space-after", Expect::AlwaysSingleLine)
            && !value_multi_line
            && !ctx.raw_ws(decl.colon + 1)
        {
            out.add(
                "declaration-colon-space-after",
                decl.colon,
                "Expected single space after \":\" with a single-line declaration",
            );
        }
        if ctx.expects("declaration-colon-newline-after", Expect::AlwaysMultiLine)
            && value_multi_line
            && !ctx.doc.rest_of_line_blank(decl.colon + 1)
        {
            out.add(
                "declaration-colon-newline-after",
                decl.colon,
                "Expected newline after \":\" with a multi-line declaration",
            );
        }

        check_bangs(ctx, out, &decl);
        check_value(ctx, out, &decl, &prop_lower);

        // Duplicates are tracked among plain properties of the same block.
        if node.parent.is_some()
            && !is_variable
            && ctx.enabled("declaration-block-no-duplicate-properties")
        {
            let setting = ctx.setting("declaration-block-no-duplicate-properties");
            let allow_consecutive = setting.is_some_and(|s| s.ignores("consecutive-duplicates"));
            let (seen, last) = seen_by_parent.entry(node.parent).or_default();
            let consecutive = last.as_deref() == Some(prop_lower.as_str());
            if seen.contains(&prop_lower) && !(allow_consecutive && consecutive) {
                out.add(
                    "declaration-block-no-duplicate-properties",
                    decl.node_start,
                    format!("Unexpected duplicate \"{}\"", prop_lower),
                );
            }
            seen.push(prop_lower.clone());
            *last = Some(prop_lower);
        }
    }
}

fn check_bangs(ctx: &Ctx<'_>, out: &mut Report<'_>, decl: &Declaration) {
    let bare = &ctx.doc.bare;
    for i in decl.value_start..decl.value_end {
        if bare[i] != '!' {
            continue;
        }
        if ctx.expects("declaration-bang-space-before", Expect::Always) && !ctx.raw_ws_before(i) {
            out.add(
                "declaration-bang-space-before",
                i,
                "Expected single space before \"!\"",
            );
        }
        if ctx.expects("declaration-bang-space-after", Expect::Never) && ctx.raw_ws(i + 1) {
            out.add(
                "declaration-bang-space-after",
                i,
                "Unexpected whitespace after \"!\"",
            );
        }
    }
}

fn check_value(ctx: &Ctx<'_>, out: &mut Report<'_>, decl: &Declaration, prop: &str) {
    let bare = &ctx.doc.bare;
    let (from, to) = (decl.value_start, decl.value_end);
    if from >= to {
        return;
    }
    let value_text = ctx.text(from, to);
    if value_text.to_lowercase().contains("progid:") {
        return;
    }

    let toks = tokenize(bare, from, to);
    let calls = find_calls(bare, from, to);
    let unprefixed = prop.trim_start_matches(|c| c == '-').to_string();
    let unprefixed = strip_vendor(&unprefixed);
    let multi_line = value_text.contains('\n');

    for (idx, tok) in toks.iter().enumerate() {
        let next = toks.get(idx + 1);
        let prev = idx.checked_sub(1).and_then(|p| toks.get(p));
        let followed_by_paren = next.is_some_and(|t| t.kind == TokKind::Punct && t.text == "(");
        let after_bang = prev.is_some_and(|t| t.kind == TokKind::Punct && t.text == "!");
        let after_dot = prev.is_some_and(|t| t.kind == TokKind::Punct && t.text == ".");

        match tok.kind {
            TokKind::Word => {
                let lower = tok.text.to_lowercase();
                if followed_by_paren || after_bang || after_dot {
                    continue;
                }
                if ctx.expects("color-named", Expect::Never)
                    && !matches!(unprefixed, "font-family" | "font")
                    && NAMED_COLORS.contains(&lower.as_str())
                {
                    out.add(
                        "color-named",
                        tok.start,
                        format!("Unexpected named color \"{}\"", tok.text),
                    );
                }
                if ctx.lower_case("value-keyword-case")
                    && !CASE_PRESERVING_PROPERTIES.contains(&unprefixed)
                    && !decl.property.starts_with("--")
                    && has_upper(&tok.text)
                {
                    out.add(
                        "value-keyword-case",
                        tok.start,
                        format!("Expected \"{}\" to be \"{}\"", tok.text, lower),
                    );
                }
                if (unprefixed == "font-weight" && matches!(lower.as_str(), "normal" | "bold"))
                    || (unprefixed == "font" && lower == "bold")
                {
                    check_font_weight(ctx, out, tok);
                }
            }
            TokKind::Hash => check_hex(ctx, out, tok),
            TokKind::Number => check_number(ctx, out, tok, unprefixed),
            _ => {}
        }
    }

    if unprefixed == "font-family" {
        check_font_family(ctx, out, from, to);
    }

    check_calls(ctx, out, &calls, to);
    check_value_commas(ctx, out, &calls, from, to, multi_line);
}

fn strip_vendor(prop: &str) -> &str {
    for prefix in ["webkit-", "moz-", "ms-", "o-"] {
        if let Some(rest) = prop.strip_prefix(prefix) {
            return rest;
        }
    }
    prop
}

fn check_font_weight(ctx: &Ctx<'_>, out: &mut Report<'_>, tok: &Tok) {
    let Some(RuleSetting::FontWeight(crate::lint::rules::Notation::Numeric, _)) =
        ctx.setting("font-weight-notation")
    else {
        return;
    };
    out.add(
        "font-weight-notation",
        tok.start,
        "Expected numeric font-weight notation",
    );
}

fn check_hex(ctx: &Ctx<'_>, out: &mut Report<'_>, tok: &Tok) {
    let digits = &tok.text[1..];
    if !matches!(digits.len(), 3 | 4 | 6 | 8) || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return;
    }

    if ctx.lower_case("color-hex-case") && has_upper(digits) {
        out.add(
            "color-hex-case",
            tok.start,
            format!("Expected \"{}\" to be \"{}\"", tok.text, tok.text.to_lowercase()),
        );
    }

    if let Some(RuleSetting::HexLength(HexLength::Short)) = ctx.setting("color-hex-length") {
        if matches!(digits.len(), 6 | 8) {
            let bytes: Vec<char> = digits.to_lowercase().chars().collect();
            if bytes.chunks(2).all(|pair| pair[0] == pair[1]) {
                let short: String = bytes.iter().step_by(2).collect();
                out.add(
                    "color-hex-length",
                    tok.start,
                    format!("Expected \"{}\" to be \"#{}\"", tok.text, short),
                );
            }
        }
    }
}

fn check_number(ctx: &Ctx<'_>, out: &mut Report<'_>, tok: &Tok, prop: &str) {
    let numeric: String = ctx.doc.bare[tok.start..tok.unit_at].iter().collect();
    let unit: String = ctx.doc.bare[tok.unit_at..tok.end].iter().collect();
    let unit_lower = unit.to_lowercase();

    if ctx.expects("number-leading-zero", Expect::Always) && numeric.starts_with('.') {
        out.add(
            "number-leading-zero",
            tok.start,
            "Expected a leading zero",
        );
    }

    if ctx.enabled("number-no-trailing-zeros") && numeric.contains('.') && numeric.ends_with('0') {
        out.add(
            "number-no-trailing-zeros",
            tok.start,
            "Unexpected trailing zero(s)",
        );
    }

    let is_zero = numeric.parse::<f64>().map(|v| v == 0.0).unwrap_or(false);
    if ctx.enabled("length-zero-no-unit") && is_zero && LENGTH_UNITS.contains(&unit_lower.as_str())
    {
        out.add("length-zero-no-unit", tok.start, "Unexpected unit");
    }

    let known_unit = LENGTH_UNITS.contains(&unit_lower.as_str())
        || OTHER_UNITS.contains(&unit_lower.as_str());
    if ctx.lower_case("unit-case") && known_unit && has_upper(&unit) {
        out.add(
            "unit-case",
            tok.unit_at,
            format!("Expected \"{}\" to be \"{}\"", unit, unit_lower),
        );
    }

    if let Some(RuleSetting::UnitWhitelist(table)) = ctx.setting("declaration-property-unit-whitelist")
    {
        if let Some((_, allowed)) = table.iter().find(|(p, _)| *p == prop) {
            if !unit.is_empty() && !allowed.contains(&unit_lower.as_str()) {
                out.add(
                    "declaration-property-unit-whitelist",
                    tok.unit_at,
                    format!("Unexpected unit \"{}\" for property \"{}\"", unit, prop),
                );
            }
        }
    }
}

fn check_font_family(ctx: &Ctx<'_>, out: &mut Report<'_>, from: usize, to: usize) {
    if !ctx.expects("font-family-name-quotes", Expect::AlwaysWhereRecommended) {
        return;
    }
    let bare = &ctx.doc.bare;
    let mut part_start = from;
    let mut bounds = Vec::new();
    for i in from..=to {
        if i == to || bare[i] == ',' {
            bounds.push((part_start, i));
            part_start = i + 1;
        }
    }

    for (s, e) in bounds {
        let mut s = s;
        while s < e && bare[s].is_whitespace() {
            s += 1;
        }
        if s >= e {
            continue;
        }
        let first = bare[s];
        if first == '$' || first == '#' {
            continue;
        }
        if first == '"' || first == '\'' {
            let Some(lit) = ctx.doc.strings.iter().find(|lit| lit.start == s) else {
                continue;
            };
            let name = lit.contents.as_str();
            let plain = !name.is_empty()
                && !name.starts_with(|c: char| c.is_ascii_digit())
                && name.chars().all(|c| c.is_alphabetic() || c == '-');
            if GENERIC_FONT_FAMILIES.contains(&name.to_lowercase().as_str()) || plain {
                out.add(
                    "font-family-name-quotes",
                    s,
                    format!("Unexpected quotes around \"{}\"", name),
                );
            }
        } else {
            let name = ctx.text(s, e).trim_end().to_string();
            let needs_quotes = name.contains(char::is_whitespace)
                || name.starts_with(|c: char| c.is_ascii_digit())
                || name
                    .chars()
                    .any(|c| !(c.is_alphanumeric() || c == '-' || c.is_whitespace()));
            if needs_quotes && !name.contains('!') {
                out.add(
                    "font-family-name-quotes",
                    s,
                    format!("Expected quotes around \"{}\"", name),
                );
            }
        }
    }
}

fn check_calls(ctx: &Ctx<'_>, out: &mut Report<'_>, calls: &[Call], to: usize) {
    let bare = &ctx.doc.bare;
    let name_ignores: Vec<Regex> = ctx
        .setting("function-name-case")
        .map(|s| s.ignore_regexes())
        .unwrap_or_default();

    for call in calls {
        let lower = call.name.to_lowercase();
        let is_url = lower == "url";

        if ctx.lower_case("function-name-case")
            && has_upper(&call.name)
            && !name_ignores.iter().any(|re| re.is_match(&call.name))
        {
            out.add(
                "function-name-case",
                call.name_start,
                format!("Expected \"{}\" to be \"{}\"", call.name, lower),
            );
        }

        if is_url && ctx.expects("function-url-quotes", Expect::Never) {
            let first = bare[call.open + 1..to]
                .iter()
                .position(|c| !c.is_whitespace())
                .map(|p| call.open + 1 + p);
            if let Some(q) = first.filter(|&q| bare[q] == '"' || bare[q] == '\'') {
                out.add("function-url-quotes", q, "Unexpected quotes");
            }
        }

        let Some(close) = call.close else {
            continue;
        };

        if ctx.expects("function-parentheses-space-inside", Expect::Never) && !is_url {
            if close > call.open + 1 && ctx.raw_ws(call.open + 1) {
                out.add(
                    "function-parentheses-space-inside",
                    call.open + 1,
                    "Unexpected whitespace after \"(\"",
                );
            }
            if close > call.open + 1 && ctx.raw_ws_before(close) {
                out.add(
                    "function-parentheses-space-inside",
                    close - 1,
                    "Unexpected whitespace before \")\"",
                );
            }
        }

        if ctx.expects("function-whitespace-after", Expect::Always) && close + 1 < to {
            let after = ctx.raw(close + 1);
            let ok = after.is_none_or(|c| {
                c.is_whitespace() || matches!(c, ',' | ')' | '/' | '%' | ';' | '}')
            });
            if !ok {
                out.add(
                    "function-whitespace-after",
                    close + 1,
                    "Expected whitespace after \")\"",
                );
            }
        }

        if let Some(limit) = ctx.setting("function-max-empty-lines").and_then(|s| s.limit()) {
            let mut empty_run = 0u32;
            let mut line_blank = true;
            for i in call.open + 1..close {
                let c = ctx.doc.raw[i];
                if c == '\n' {
                    if line_blank {
                        empty_run += 1;
                        if empty_run > limit {
                            out.add(
                                "function-max-empty-lines",
                                i,
                                format!("Expected no more than {limit} empty line(s)"),
                            );
                            break;
                        }
                    } else {
                        empty_run = 0;
                    }
                    line_blank = true;
                } else if !c.is_whitespace() {
                    line_blank = false;
                    empty_run = 0;
                }
            }
        }
    }
}

fn check_value_commas(
    ctx: &Ctx<'_>,
    out: &mut Report<'_>,
    calls: &[Call],
    from: usize,
    to: usize,
    multi_line: bool,
) {
    let bare = &ctx.doc.bare;
    for i in from..to {
        if bare[i] != ',' {
            continue;
        }
        match innermost_is_call(calls, bare, from, i) {
            Some(true) => {
                if ctx.expects("function-comma-space-after", Expect::Always) && !ctx.raw_ws(i + 1) {
                    out.add(
                        "function-comma-space-after",
                        i,
                        "Expected single space after \",\"",
                    );
                }
                if ctx.expects("function-comma-space-before", Expect::Never) && ctx.raw_ws_before(i)
                {
                    out.add(
                        "function-comma-space-before",
                        i,
                        "Unexpected whitespace before \",\"",
                    );
                }
            }
            Some(false) => {}
            None => {
                if ctx.expects("value-list-comma-space-after", Expect::AlwaysSingleLine)
                    && !multi_line
                    && !ctx.raw_ws(i + 1)
                {
                    out.add(
                        "value-list-comma-space-after",
                        i,
                        "Expected single space after \",\" in a single-line list",
                    );
                }
                if ctx.expects("value-list-comma-space-before", Expect::Never)
                    && ctx.raw(i.wrapping_sub(1)).is_some_and(|c| c == ' ' || c == '\t')
                {
                    out.add(
                        "value-list-comma-space-before",
                        i,
                        "Unexpected whitespace before \",\"",
                    );
                }
                if ctx.expects("value-list-comma-newline-after", Expect::AlwaysMultiLine)
                    && multi_line
                    && !ctx.doc.rest_of_line_blank(i + 1)
                {
                    out.add(
                        "value-list-comma-newline-after",
                        i,
                        "Expected newline after \",\" in a multi-line list",
                    );
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Selectors
// ---------------------------------------------------------------------------

fn check_selectors(ctx: &Ctx<'_>, out: &mut Report<'_>) {
    let class_pattern = pattern_rule(ctx, "selector-class-pattern");
    let id_pattern = pattern_rule(ctx, "selector-id-pattern");

    for node in ctx.nodes.iter().filter(|n| n.kind == NodeKind::Rule) {
        if ctx.parent_is_keyframes(node) {
            continue;
        }
        let from = node.start;
        let to = ctx.trimmed_end(node);
        check_selector(ctx, out, from, to, class_pattern.as_ref(), id_pattern.as_ref());
    }
}

struct PatternRule {
    regex: Regex,
    message: Option<&'static str>,
    source: &'static str,
}

fn pattern_rule(ctx: &Ctx<'_>, rule: &str) -> Option<PatternRule> {
    let setting = ctx.setting(rule)?;
    let RuleSetting::Pattern(source, _) = *setting else {
        return None;
    };
    let regex = compile_pattern(source).ok()?;
    Some(PatternRule {
        regex,
        message: setting.message(),
        source,
    })
}

fn check_selector(
    ctx: &Ctx<'_>,
    out: &mut Report<'_>,
    from: usize,
    to: usize,
    class_pattern: Option<&PatternRule>,
    id_pattern: Option<&PatternRule>,
) {
    let bare = &ctx.doc.bare;
    let selector = ctx.text(from, to);

    if let Some(limit) = ctx.setting("selector-max-empty-lines").and_then(|s| s.limit()) {
        let lines: Vec<&str> = selector.split('\n').collect();
        let mut run = 0u32;
        for (i, line) in lines.iter().enumerate() {
            if i > 0 && i + 1 < lines.len() && line.trim().is_empty() {
                run += 1;
                if run > limit {
                    out.add(
                        "selector-max-empty-lines",
                        from,
                        format!("Expected no more than {limit} empty line(s)"),
                    );
                    break;
                }
            } else {
                run = 0;
            }
        }
    }

    let mut paren = 0usize;
    let mut bracket = false;
    let mut bracket_open = 0usize;
    let mut compound_has_content = false;
    let mut i = from;

    while i < to {
        let c = bare[i];

        if c == '#' && bare.get(i + 1) == Some(&'{') {
            // Interpolation: skip to its closing brace.
            while i < to && bare[i] != '}' {
                i += 1;
            }
            compound_has_content = true;
            i += 1;
            continue;
        }

        if bracket {
            if c == ']' {
                check_attribute(ctx, out, bracket_open, i);
                bracket = false;
            }
            i += 1;
            continue;
        }

        match c {
            '[' => {
                bracket = true;
                bracket_open = i;
                compound_has_content = true;
            }
            '(' => paren += 1,
            ')' => paren = paren.saturating_sub(1),
            ',' if paren == 0 => {
                if ctx.expects("selector-list-comma-newline-after", Expect::Always)
                    && !ctx.doc.rest_of_line_blank(i + 1)
                {
                    out.add(
                        "selector-list-comma-newline-after",
                        i,
                        "Expected newline after \",\"",
                    );
                }
                if ctx.expects("selector-list-comma-space-before", Expect::Never)
                    && ctx.raw(i.wrapping_sub(1)).is_some_and(|c| c == ' ' || c == '\t')
                {
                    out.add(
                        "selector-list-comma-space-before",
                        i,
                        "Unexpected whitespace before \",\"",
                    );
                }
                compound_has_content = false;
            }
            '>' | '+' | '~' if paren == 0 => {
                if ctx.expects("selector-combinator-space-before", Expect::Always)
                    && compound_has_content
                    && !ctx.raw_ws_before(i)
                {
                    out.add(
                        "selector-combinator-space-before",
                        i,
                        format!("Expected single space before \"{c}\""),
                    );
                }
                if ctx.expects("selector-combinator-space-after", Expect::Always)
                    && !ctx.raw_ws(i + 1)
                {
                    out.add(
                        "selector-combinator-space-after",
                        i,
                        format!("Expected single space after \"{c}\""),
                    );
                }
            }
            '.' if i + 1 < to && (bare[i + 1].is_alphabetic() || bare[i + 1] == '_' || bare[i + 1] == '-') => {
                let name = ident_at(bare, i + 1, to);
                if let Some(p) = class_pattern {
                    if !p.regex.is_match(&name) {
                        out.add(
                            "selector-class-pattern",
                            i,
                            p.message.map(str::to_string).unwrap_or_else(|| {
                                format!("Expected class selector \".{name}\" to match pattern \"{}\"", p.source)
                            }),
                        );
                    }
                }
                compound_has_content = true;
            }
            '#' if i + 1 < to && (bare[i + 1].is_alphabetic() || bare[i + 1] == '_' || bare[i + 1] == '-') => {
                let name = ident_at(bare, i + 1, to);
                if let Some(p) = id_pattern {
                    if !p.regex.is_match(&name) {
                        out.add(
                            "selector-id-pattern",
                            i,
                            p.message.map(str::to_string).unwrap_or_else(|| {
                                format!("Expected ID selector \"#{name}\" to match pattern \"{}\"", p.source)
                            }),
                        );
                    }
                }
                compound_has_content = true;
            }
            ':' => {
                let double = bare.get(i + 1) == Some(&':');
                let name_start = if double { i + 2 } else { i + 1 };
                let name = ident_at(bare, name_start, to);
                if !name.is_empty() {
                    check_pseudo(ctx, out, i, double, &name, name_start, to);
                }
                compound_has_content = true;
                i = name_start + name.chars().count();
                continue;
            }
            c if c.is_whitespace() => {}
            c if (c.is_alphabetic() || c == '*') && paren == 0 => {
                let name = ident_at(bare, i, to);
                let starts_compound = i == from
                    || bare[i - 1].is_whitespace()
                    || matches!(bare[i - 1], ',' | '>' | '+' | '~');
                if starts_compound
                    && ctx.lower_case("selector-type-case")
                    && has_upper(&name)
                {
                    out.add(
                        "selector-type-case",
                        i,
                        format!("Expected \"{}\" to be \"{}\"", name, name.to_lowercase()),
                    );
                }
                compound_has_content = true;
                i += name.chars().count().max(1);
                continue;
            }
            _ => compound_has_content = true,
        }
        i += 1;
    }
}

fn ident_at(bare: &[char], from: usize, to: usize) -> String {
    bare[from..to].iter().take_while(|c| is_ident(**c)).collect()
}

fn check_pseudo(
    ctx: &Ctx<'_>,
    out: &mut Report<'_>,
    colon: usize,
    double: bool,
    name: &str,
    name_start: usize,
    to: usize,
) {
    let bare = &ctx.doc.bare;
    let lower = name.to_lowercase();

    if double {
        if ctx.lower_case("selector-pseudo-element-case") && has_upper(name) {
            out.add(
                "selector-pseudo-element-case",
                colon,
                format!("Expected \"::{}\" to be \"::{}\"", name, lower),
            );
        }
        return;
    }

    if PSEUDO_ELEMENTS_LEGACY.contains(&lower.as_str()) {
        if let Some(RuleSetting::PseudoElementColons(ColonNotation::Double)) =
            ctx.setting("selector-pseudo-element-colon-notation")
        {
            out.add(
                "selector-pseudo-element-colon-notation",
                colon,
                "Expected double colon pseudo-element notation",
            );
        }
        return;
    }

    if ctx.lower_case("selector-pseudo-class-case") && has_upper(name) {
        out.add(
            "selector-pseudo-class-case",
            colon,
            format!("Expected \":{}\" to be \":{}\"", name, lower),
        );
    }

    let open = name_start + name.chars().count();
    if open < to
        && bare[open] == '('
        && ctx.expects("selector-pseudo-class-parentheses-space-inside", Expect::Never)
    {
        let mut depth = 0usize;
        let mut close = None;
        for j in open..to {
            match bare[j] {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(j);
                        break;
                    }
                }
                _ => {}
            }
        }
        if ctx.raw_ws(open + 1) {
            out.add(
                "selector-pseudo-class-parentheses-space-inside",
                open + 1,
                "Unexpected whitespace after \"(\"",
            );
        }
        if let Some(close) = close.filter(|&c| c > open + 1) {
            if ctx.raw_ws_before(close) {
                out.add(
                    "selector-pseudo-class-parentheses-space-inside",
                    close - 1,
                    "Unexpected whitespace before \")\"",
                );
            }
        }
    }
}

fn check_attribute(ctx: &Ctx<'_>, out: &mut Report<'_>, open: usize, close: usize) {
    let bare = &ctx.doc.bare;

    if ctx.expects("selector-attribute-brackets-space-inside", Expect::Never) {
        if ctx.raw_ws(open + 1) {
            out.add(
                "selector-attribute-brackets-space-inside",
                open + 1,
                "Unexpected whitespace after \"[\"",
            );
        }
        if close > open + 1 && ctx.raw_ws_before(close) {
            out.add(
                "selector-attribute-brackets-space-inside",
                close - 1,
                "Unexpected whitespace before \"]\"",
            );
        }
    }

    let Some(eq) = (open + 1..close).find(|&j| bare[j] == '=') else {
        return;
    };
    let op_start = if eq > open + 1 && matches!(bare[eq - 1], '~' | '|' | '^' | '$' | '*') {
        eq - 1
    } else {
        eq
    };
    let op_end = eq + 1;

    if ctx.expects("selector-attribute-operator-space-before", Expect::Never)
        && ctx.raw_ws_before(op_start)
    {
        out.add(
            "selector-attribute-operator-space-before",
            op_start,
            "Unexpected whitespace before operator",
        );
    }
    if ctx.expects("selector-attribute-operator-space-after", Expect::Never) && ctx.raw_ws(op_end) {
        out.add(
            "selector-attribute-operator-space-after",
            op_start,
            "Unexpected whitespace after operator",
        );
    }
    if ctx.expects("selector-attribute-quotes", Expect::Always) {
        let value = (op_end..close).find(|&j| !bare[j].is_whitespace());
        if let Some(v) = value.filter(|&v| bare[v] != '"' && bare[v] != '\'') {
            out.add("selector-attribute-quotes", v, "Expected quotes");
        }
    }
}

// ---------------------------------------------------------------------------
// At-rules
// ---------------------------------------------------------------------------

fn check_at_rules(ctx: &Ctx<'_>, out: &mut Report<'_>) {
    let ignored: Vec<&str> = ctx
        .setting("at-rule-no-unknown")
        .map(|s| s.ignore_at_rules().to_vec())
        .unwrap_or_default();

    for node in ctx
        .nodes
        .iter()
        .filter(|n| matches!(n.kind, NodeKind::AtRule { .. }))
    {
        let name = at_rule_name(ctx.doc, node.start);
        if name.is_empty() {
            continue;
        }
        let lower = name.to_lowercase();
        let name_end = node.start + 1 + name.chars().count();
        let prelude_end = ctx.trimmed_end(node);
        let prelude = ctx.text(name_end, prelude_end);

        if ctx.lower_case("at-rule-name-case") && has_upper(&name) {
            out.add(
                "at-rule-name-case",
                node.start,
                format!("Expected \"@{}\" to be \"@{}\"", name, lower),
            );
        }

        if ctx.expects("at-rule-name-space-after", Expect::AlwaysSingleLine)
            && !prelude.trim().is_empty()
            && !prelude.contains('\n')
            && !ctx.raw_ws(name_end)
        {
            out.add(
                "at-rule-name-space-after",
                node.start,
                format!("Expected single space after \"@{}\"", name),
            );
        }

        if ctx.enabled("at-rule-no-unknown") {
            let bare_name = strip_vendor(lower.trim_start_matches('-'));
            if !KNOWN_AT_RULES.contains(&bare_name) && !ignored.contains(&lower.as_str()) {
                out.add(
                    "at-rule-no-unknown",
                    node.start,
                    format!("Unexpected unknown at-rule \"@{}\"", name),
                );
            }
        }

        if lower == "media" {
            check_media_params(ctx, out, name_end, prelude_end);
        }
    }
}

fn check_media_params(ctx: &Ctx<'_>, out: &mut Report<'_>, from: usize, to: usize) {
    let bare = &ctx.doc.bare;
    let multi_line = bare[from..to].contains(&'\n');
    let mut depth = 0usize;
    let mut i = from;

    while i < to {
        let c = bare[i];
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ':' if depth > 0 => {
                if ctx.expects("media-feature-colon-space-before", Expect::Never)
                    && ctx.raw_ws_before(i)
                {
                    out.add(
                        "media-feature-colon-space-before",
                        i,
                        "Unexpected whitespace before \":\"",
                    );
                }
                if ctx.expects("media-feature-colon-space-after", Expect::Always) && !ctx.raw_ws(i + 1)
                {
                    out.add(
                        "media-feature-colon-space-after",
                        i,
                        "Expected single space after \":\"",
                    );
                }
            }
            '<' | '>' | '=' if depth > 0 => {
                let op_end = if bare.get(i + 1) == Some(&'=') { i + 2 } else { i + 1 };
                if ctx.expects("media-feature-range-operator-space-before", Expect::Always)
                    && !ctx.raw_ws_before(i)
                {
                    out.add(
                        "media-feature-range-operator-space-before",
                        i,
                        "Expected single space before range operator",
                    );
                }
                if ctx.expects("media-feature-range-operator-space-after", Expect::Always)
                    && !ctx.raw_ws(op_end)
                {
                    out.add(
                        "media-feature-range-operator-space-after",
                        i,
                        "Expected single space after range operator",
                    );
                }
                i = op_end;
                continue;
            }
            ',' if depth == 0 => {
                if ctx.expects("media-query-list-comma-space-before", Expect::Never)
                    && ctx.raw(i.wrapping_sub(1)).is_some_and(|c| c == ' ' || c == '\t')
                {
                    out.add(
                        "media-query-list-comma-space-before",
                        i,
                        "Unexpected whitespace before \",\"",
                    );
                }
                if ctx.expects("media-query-list-comma-space-after", Expect::AlwaysSingleLine)
                    && !multi_line
                    && !ctx.raw_ws(i + 1)
                {
                    out.add(
                        "media-query-list-comma-space-after",
                        i,
                        "Expected single space after \",\" in a single-line list",
                    );
                }
                if ctx.expects("media-query-list-comma-newline-after", Expect::AlwaysMultiLine)
                    && multi_line
                    && !ctx.doc.rest_of_line_blank(i + 1)
                {
                    out.add(
                        "media-query-list-comma-newline-after",
                        i,
                        "Expected newline after \",\" in a multi-line list",
                    );
                }
            }
            _ => {}
        }
        i += 1;
    }
}

// ---------------------------------------------------------------------------
// Blocks, semicolons and empty lines
// ---------------------------------------------------------------------------

fn check_blocks(ctx: &Ctx<'_>, out: &mut Report<'_>) {
    let doc = ctx.doc;

    for node in &ctx.nodes {
        if node.is_block() {
            let open = node.end;
            let empty = node
                .close
                .is_some_and(|close| doc.bare[open + 1..close].iter().all(|c| c.is_whitespace()));

            if ctx.expects("block-opening-brace-space-before", Expect::Always) {
                let single_space = open >= 1
                    && doc.raw[open - 1] == ' '
                    && (open < 2 || !doc.raw[open - 2].is_whitespace());
                if !single_space {
                    out.add(
                        "block-opening-brace-space-before",
                        open,
                        "Expected single space before \"{\"",
                    );
                }
            }

            if !empty
                && ctx.expects("block-opening-brace-newline-after", Expect::Always)
                && !doc.rest_of_line_blank(open + 1)
            {
                out.add(
                    "block-opening-brace-newline-after",
                    open,
                    "Expected newline after \"{\"",
                );
            }

            if let Some(close) = node.close {
                if !empty
                    && ctx.expects("block-closing-brace-newline-before", Expect::Always)
                    && !closes_own_line(doc, close)
                {
                    out.add(
                        "block-closing-brace-newline-before",
                        close,
                        "Expected newline before \"}\"",
                    );
                }

                if ctx.expects("block-closing-brace-newline-after", Expect::Always)
                    && !doc.rest_of_line_blank(close + 1)
                    && !followed_by_else(doc, close + 1)
                {
                    out.add(
                        "block-closing-brace-newline-after",
                        close,
                        "Expected newline after \"}\"",
                    );
                }
            }
        }

        match (node.kind, node.terminator) {
            (NodeKind::Decl, Some('}')) => {
                if ctx.expects("declaration-block-trailing-semicolon", Expect::Always) {
                    out.add(
                        "declaration-block-trailing-semicolon",
                        ctx.trimmed_end(node).saturating_sub(1),
                        "Expected a trailing semicolon",
                    );
                }
            }
            (NodeKind::Decl, Some(';')) => {
                if ctx.expects("declaration-block-semicolon-space-before", Expect::Never)
                    && ctx.raw_ws_before(node.end)
                {
                    out.add(
                        "declaration-block-semicolon-space-before",
                        node.end,
                        "Unexpected whitespace before \";\"",
                    );
                }
                if node.parent.is_some()
                    && ctx.expects("declaration-block-semicolon-newline-after", Expect::Always)
                    && !doc.rest_of_line_blank(node.end + 1)
                {
                    out.add(
                        "declaration-block-semicolon-newline-after",
                        node.end,
                        "Expected newline after \";\"",
                    );
                }
            }
            (NodeKind::AtRule { block: false }, Some(';')) => {
                if ctx.expects("at-rule-semicolon-newline-after", Expect::Always)
                    && !doc.rest_of_line_blank(node.end + 1)
                {
                    out.add(
                        "at-rule-semicolon-newline-after",
                        node.end,
                        "Expected newline after \";\"",
                    );
                }
            }
            _ => {}
        }
    }
}

fn closes_own_line(doc: &Document, close: usize) -> bool {
    doc.bare[..close]
        .iter()
        .rev()
        .take_while(|c| **c != '\n')
        .all(|c| c.is_whitespace())
}

fn followed_by_else(doc: &Document, from: usize) -> bool {
    let rest: String = doc.bare[from..]
        .iter()
        .skip_while(|c| c.is_whitespace() && **c != '\n')
        .take(5)
        .collect();
    rest.starts_with("@else") || rest.starts_with("else")
}

fn preceded_by_comment(doc: &Document, offset: usize) -> bool {
    doc.prev_raw(offset)
        .is_some_and(|p| doc.regions[p] == Region::Comment)
}

fn check_empty_lines_before(ctx: &Ctx<'_>, out: &mut Report<'_>) {
    let doc = ctx.doc;

    for node in &ctx.nodes {
        let first_in_source = doc.prev_raw(node.start).is_none();
        if first_in_source || !doc.starts_line(node.start) {
            continue;
        }

        match node.kind {
            NodeKind::Rule => {
                let Some(setting) = ctx.setting("rule-empty-line-before") else {
                    continue;
                };
                if setting.expect() != Some(Expect::Always) || ctx.parent_is_keyframes(node) {
                    continue;
                }
                if setting.ignores("after-comment") && preceded_by_comment(doc, node.start) {
                    continue;
                }
                if !doc.empty_line_before(node.start) {
                    out.add(
                        "rule-empty-line-before",
                        node.start,
                        "Expected empty line before rule",
                    );
                }
            }
            NodeKind::AtRule { block } => {
                let Some(setting) = ctx.setting("at-rule-empty-line-before") else {
                    continue;
                };
                if setting.expect() != Some(Expect::Always) {
                    continue;
                }
                if setting.ignores("after-comment") && preceded_by_comment(doc, node.start) {
                    continue;
                }
                let mut expect_empty = true;
                if !block && setting.excepts("blockless-after-blockless") {
                    let prev_blockless = node
                        .prev_sibling
                        .map(|p| ctx.nodes[p].kind == NodeKind::AtRule { block: false })
                        .unwrap_or(false);
                    if prev_blockless {
                        expect_empty = false;
                    }
                }
                let has_empty = doc.empty_line_before(node.start);
                if expect_empty && !has_empty {
                    out.add(
                        "at-rule-empty-line-before",
                        node.start,
                        "Expected empty line before at-rule",
                    );
                } else if !expect_empty && has_empty {
                    out.add(
                        "at-rule-empty-line-before",
                        node.start,
                        "Unexpected empty line before at-rule",
                    );
                }
            }
            NodeKind::Decl => {}
        }
    }

    if let Some(setting) = ctx.setting("comment-empty-line-before") {
        if setting.expect() == Some(Expect::Always) {
            for comment in doc.comments.iter().filter(|c| !c.inline) {
                if doc.prev_raw(comment.start).is_none() || !doc.starts_line(comment.start) {
                    continue;
                }
                let body = comment.text.trim_start_matches("/*").trim_start();
                if setting.ignores("stylelint-commands") && body.starts_with("stylelint-") {
                    continue;
                }
                if !doc.empty_line_before(comment.start) {
                    out.add(
                        "comment-empty-line-before",
                        comment.start,
                        "Expected empty line before comment",
                    );
                }
            }
        }
    }
}

fn check_strings(ctx: &Ctx<'_>, out: &mut Report<'_>) {
    let Some(RuleSetting::Quotes(quote)) = ctx.setting("string-quotes") else {
        return;
    };
    let (wanted, unwanted, label) = match quote {
        crate::lint::rules::Quote::Double => ('"', '\'', "double"),
        crate::lint::rules::Quote::Single => ('\'', '"', "single"),
    };
    for lit in &ctx.doc.strings {
        if lit.quote == unwanted && !lit.contents.contains(wanted) {
            out.add("string-quotes", lit.start, format!("Expected {label} quotes"));
        }
    }
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

fn check_lines(ctx: &Ctx<'_>, out: &mut Report<'_>) {
    let doc = ctx.doc;
    let line_count = doc.line_count();

    let max_empty = ctx.setting("max-empty-lines").and_then(|s| s.limit());
    let max_len = ctx.setting("max-line-length");
    let max_len_limit = max_len.and_then(|s| s.limit());
    let max_len_ignores: Vec<Regex> = max_len.map(|s| s.ignore_regexes()).unwrap_or_default();
    let comments_only = max_len.is_some_and(|s| s.ignores("non-comments"));
    let indent = ctx.setting("indentation").and_then(|s| s.limit());

    let depths = line_depths(doc, line_count);
    let mut empty_run = 0u32;

    for line in 1..=line_count {
        let raw = doc.raw_line(line);
        let (line_start, _) = doc.line_span(line);

        if ctx.enabled("no-eol-whitespace") && raw.ends_with([' ', '\t']) {
            let trimmed = raw.trim_end_matches([' ', '\t']).chars().count();
            out.add(
                "no-eol-whitespace",
                line_start + trimmed,
                "Unexpected whitespace at end of line",
            );
        }

        if raw.trim().is_empty() {
            empty_run += 1;
            if let Some(limit) = max_empty {
                if empty_run == limit + 1 {
                    out.add(
                        "max-empty-lines",
                        line_start,
                        format!("Expected no more than {limit} empty line(s)"),
                    );
                }
            }
            continue;
        }
        empty_run = 0;

        if let Some(limit) = max_len_limit {
            let len = raw.chars().count();
            let is_comment_line = doc.line_has_comment(line) && doc.bare_line(line).trim().is_empty();
            let ignored = max_len_ignores
                .iter()
                .any(|re| re.is_match(raw.trim_start()));
            if len > limit as usize && (is_comment_line || !comments_only) && !ignored {
                out.add(
                    "max-line-length",
                    line_start + limit as usize,
                    format!("Expected line length to be no more than {limit} characters"),
                );
            }
        }

        if let Some(width) = indent {
            check_indentation(ctx, out, line, line_start, &raw, depths[line - 1], width);
        }
    }

    if ctx.enabled("no-missing-end-of-source-newline")
        && !doc.is_empty()
        && doc.raw.last() != Some(&'\n')
    {
        out.add(
            "no-missing-end-of-source-newline",
            doc.len(),
            "Unexpected missing end-of-source newline",
        );
    }
}

/// Brace depth at the start of every line.
fn line_depths(doc: &Document, line_count: usize) -> Vec<usize> {
    let mut depths = Vec::with_capacity(line_count);
    let mut depth = 0usize;
    let mut interp = 0usize;
    depths.push(0);

    let bare = &doc.bare;
    for i in 0..bare.len() {
        match bare[i] {
            '#' if bare.get(i + 1) == Some(&'{') => interp += 1,
            '{' if interp > 0 && bare.get(i.wrapping_sub(1)) == Some(&'#') => {}
            '{' => depth += 1,
            '}' if interp > 0 => interp -= 1,
            '}' => depth = depth.saturating_sub(1),
            '\n' => depths.push(depth),
            _ => {}
        }
    }

    depths.truncate(line_count.max(1));
    depths
}

fn check_indentation(
    ctx: &Ctx<'_>,
    out: &mut Report<'_>,
    line: usize,
    line_start: usize,
    raw: &str,
    depth: usize,
    width: u32,
) {
    let doc = ctx.doc;
    let bare_line = doc.bare_line(line);
    let Some(first_code) = bare_line.chars().position(|c| !c.is_whitespace()) else {
        return;
    };
    let statement_start = match doc.prev_code(line_start) {
        None => true,
        Some(p) => matches!(doc.bare[p], ';' | '{' | '}'),
    };
    if !statement_start {
        return;
    }

    let leading: String = raw.chars().take_while(|c| c.is_whitespace()).collect();
    let level = if bare_line.chars().nth(first_code) == Some('}') {
        depth.saturating_sub(1)
    } else {
        depth
    };
    let expected = level * width as usize;

    if leading.contains('\t') || leading.chars().count() != expected {
        out.add(
            "indentation",
            line_start,
            format!("Expected indentation of {expected} spaces"),
        );
    }
}

/// Style-sheet linter for SCSS sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleLinter;

impl Linter for StyleLinter {
    fn lint(&self, path: &Path, source: &str, rules: &Ruleset) -> Vec<Violation> {
        let doc = Document::mask(source, Syntax::Scss);
        let ctx = Ctx {
            doc: &doc,
            rules,
            nodes: parse(&doc),
        };
        let mut report = Report {
            file: path,
            doc: &doc,
            items: Vec::new(),
        };

        check_lines(&ctx, &mut report);
        check_strings(&ctx, &mut report);
        check_empty_lines_before(&ctx, &mut report);
        check_blocks(&ctx, &mut report);
        check_selectors(&ctx, &mut report);
        check_at_rules(&ctx, &mut report);
        check_declarations(&ctx, &mut report);

        let mut items = report.items;
        items.sort_by(|a, b| (a.line, a.column, &a.rule).cmp(&(b.line, b.column, &b.rule)));
        items.dedup();
        items
    }

    fn advisory_rules(&self, rules: &Ruleset) -> BTreeSet<&'static str> {
        rules
            .iter()
            .map(|e| e.name)
            .filter(|name| !IMPLEMENTED.contains(name))
            .collect()
    }
}
