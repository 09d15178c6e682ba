// src/lint/rules.rs

//! Versioned lint rule tables.
//!
//! The tables are plain `const` data. [`Ruleset`] wraps one of them, checks
//! it against the rule schema once at start-up and lets configuration
//! switch individual rules off.

use std::collections::BTreeSet;
use std::fmt;

use regex::Regex;

use crate::errors::{BuildError, Result};

/// Expectation keyword of whitespace and quoting rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Always,
    Never,
    AlwaysSingleLine,
    AlwaysMultiLine,
    AlwaysWhereRecommended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    Lower,
    Upper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Single,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HexLength {
    Short,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notation {
    Numeric,
    NamedWherePossible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColonNotation {
    Single,
    Double,
}

/// Secondary options attached to a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOption {
    Except(&'static [&'static str]),
    Ignore(&'static [&'static str]),
    IgnoreAtRules(&'static [&'static str]),
    /// Regular expressions in `/pattern/flags` or bare form.
    IgnoreFunctions(&'static [&'static str]),
    IgnorePattern(&'static [&'static str]),
    /// Replaces the default diagnostic text.
    Message(&'static str),
}

/// Typed setting of one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSetting {
    Enabled(bool, &'static [RuleOption]),
    Expect(Expect, &'static [RuleOption]),
    Case(Case, &'static [RuleOption]),
    Quotes(Quote),
    HexLength(HexLength),
    FontWeight(Notation, &'static [RuleOption]),
    PseudoElementColons(ColonNotation),
    Limit(u32, &'static [RuleOption]),
    Pattern(&'static str, &'static [RuleOption]),
    /// Property name to allowed units.
    UnitWhitelist(&'static [(&'static str, &'static [&'static str])]),
}

/// Setting families used by the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Enabled,
    Expect,
    Case,
    Quotes,
    HexLength,
    FontWeight,
    PseudoElementColons,
    Limit,
    Pattern,
    UnitWhitelist,
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl RuleSetting {
    pub fn kind(&self) -> SettingKind {
        match self {
            RuleSetting::Enabled(..) => SettingKind::Enabled,
            RuleSetting::Expect(..) => SettingKind::Expect,
            RuleSetting::Case(..) => SettingKind::Case,
            RuleSetting::Quotes(_) => SettingKind::Quotes,
            RuleSetting::HexLength(_) => SettingKind::HexLength,
            RuleSetting::FontWeight(..) => SettingKind::FontWeight,
            RuleSetting::PseudoElementColons(_) => SettingKind::PseudoElementColons,
            RuleSetting::Limit(..) => SettingKind::Limit,
            RuleSetting::Pattern(..) => SettingKind::Pattern,
            RuleSetting::UnitWhitelist(_) => SettingKind::UnitWhitelist,
        }
    }

    pub fn options(&self) -> &'static [RuleOption] {
        match *self {
            RuleSetting::Enabled(_, o)
            | RuleSetting::Expect(_, o)
            | RuleSetting::Case(_, o)
            | RuleSetting::FontWeight(_, o)
            | RuleSetting::Limit(_, o)
            | RuleSetting::Pattern(_, o) => o,
            _ => &[],
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, RuleSetting::Enabled(false, _))
    }

    pub fn expect(&self) -> Option<Expect> {
        match *self {
            RuleSetting::Expect(e, _) => Some(e),
            _ => None,
        }
    }

    pub fn limit(&self) -> Option<u32> {
        match *self {
            RuleSetting::Limit(n, _) => Some(n),
            _ => None,
        }
    }

    pub fn case(&self) -> Option<Case> {
        match *self {
            RuleSetting::Case(c, _) => Some(c),
            _ => None,
        }
    }

    /// Whether `keyword` is listed under `ignore`.
    pub fn ignores(&self, keyword: &str) -> bool {
        self.options().iter().any(|o| match o {
            RuleOption::Ignore(list) => list.contains(&keyword),
            _ => false,
        })
    }

    /// Whether `keyword` is listed under `except`.
    pub fn excepts(&self, keyword: &str) -> bool {
        self.options().iter().any(|o| match o {
            RuleOption::Except(list) => list.contains(&keyword),
            _ => false,
        })
    }

    pub fn message(&self) -> Option<&'static str> {
        self.options().iter().find_map(|o| match o {
            RuleOption::Message(m) => Some(*m),
            _ => None,
        })
    }

    pub fn ignore_at_rules(&self) -> &'static [&'static str] {
        self.options()
            .iter()
            .find_map(|o| match o {
                RuleOption::IgnoreAtRules(list) => Some(*list),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Every regular expression carried by this setting.
    pub fn patterns(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if let RuleSetting::Pattern(p, _) = self {
            out.push(*p);
        }
        for option in self.options() {
            match option {
                RuleOption::IgnoreFunctions(list) | RuleOption::IgnorePattern(list) => {
                    out.extend(list.iter().copied())
                }
                _ => {}
            }
        }
        out
    }

    /// Compiled `ignoreFunctions` / `ignorePattern` expressions.
    pub fn ignore_regexes(&self) -> Vec<Regex> {
        let mut regexes = Vec::new();
        for option in self.options() {
            if let RuleOption::IgnoreFunctions(list) | RuleOption::IgnorePattern(list) = option {
                regexes.extend(list.iter().filter_map(|p| compile_pattern(p).ok()));
            }
        }
        regexes
    }
}

/// Compile a rule pattern. `/body/flags` is accepted with the `i` flag.
pub fn compile_pattern(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    if let Some(rest) = pattern.strip_prefix('/') {
        if let Some(close) = rest.rfind('/') {
            let (body, flags) = (&rest[..close], &rest[close + 1..]);
            if flags.chars().all(|c| c.is_ascii_alphabetic()) {
                let prefix = if flags.contains('i') { "(?i)" } else { "" };
                return Regex::new(&format!("{prefix}{body}"));
            }
        }
    }
    Regex::new(pattern)
}

/// One row of a rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleEntry {
    pub name: &'static str,
    pub setting: RuleSetting,
}

const fn rule(name: &'static str, setting: RuleSetting) -> RuleEntry {
    RuleEntry { name, setting }
}

use Expect::{Always, AlwaysMultiLine, AlwaysSingleLine, AlwaysWhereRecommended, Never};
use RuleSetting as S;

/// WordPress style-sheet rules, in their published order.
pub const STYLE_RULES: &[RuleEntry] = &[
    rule(
        "at-rule-empty-line-before",
        S::Expect(
            Always,
            &[
                RuleOption::Except(&["blockless-after-blockless"]),
                RuleOption::Ignore(&["after-comment"]),
            ],
        ),
    ),
    rule("at-rule-name-case", S::Case(Case::Lower, &[])),
    rule("at-rule-name-space-after", S::Expect(AlwaysSingleLine, &[])),
    rule(
        "at-rule-no-unknown",
        S::Enabled(
            true,
            &[RuleOption::IgnoreAtRules(&[
                "function", "if", "else", "each", "include", "mixin",
            ])],
        ),
    ),
    rule("at-rule-semicolon-newline-after", S::Expect(Always, &[])),
    rule("block-closing-brace-newline-after", S::Expect(Always, &[])),
    rule("block-closing-brace-newline-before", S::Expect(Always, &[])),
    rule("block-opening-brace-newline-after", S::Expect(Always, &[])),
    rule("block-opening-brace-space-before", S::Expect(Always, &[])),
    rule("color-hex-case", S::Case(Case::Lower, &[])),
    rule("color-hex-length", S::HexLength(HexLength::Short)),
    rule("color-named", S::Expect(Never, &[])),
    rule(
        "comment-empty-line-before",
        S::Expect(Always, &[RuleOption::Ignore(&["stylelint-commands"])]),
    ),
    rule("declaration-bang-space-after", S::Expect(Never, &[])),
    rule("declaration-bang-space-before", S::Expect(Always, &[])),
    rule(
        "declaration-block-no-duplicate-properties",
        S::Enabled(true, &[RuleOption::Ignore(&["consecutive-duplicates"])]),
    ),
    rule("declaration-block-semicolon-newline-after", S::Expect(Always, &[])),
    rule("declaration-block-semicolon-space-before", S::Expect(Never, &[])),
    rule("declaration-block-trailing-semicolon", S::Expect(Always, &[])),
    rule("declaration-colon-newline-after", S::Expect(AlwaysMultiLine, &[])),
    rule("declaration-colon-space-after", S::Expect(AlwaysSingleLine, &[])),
    rule("declaration-colon-space-before", S::Expect(Never, &[])),
    rule(
        "declaration-property-unit-whitelist",
        S::UnitWhitelist(&[("line-height", &["px"])]),
    ),
    rule("font-family-name-quotes", S::Expect(AlwaysWhereRecommended, &[])),
    rule(
        "font-weight-notation",
        S::FontWeight(Notation::Numeric, &[RuleOption::Ignore(&["relative"])]),
    ),
    rule("function-comma-space-after", S::Expect(Always, &[])),
    rule("function-comma-space-before", S::Expect(Never, &[])),
    rule("function-max-empty-lines", S::Limit(1, &[])),
    rule(
        "function-name-case",
        S::Case(
            Case::Lower,
            &[RuleOption::IgnoreFunctions(&["/^DXImageTransform.Microsoft.*$/"])],
        ),
    ),
    rule("function-parentheses-space-inside", S::Expect(Never, &[])),
    rule("function-url-quotes", S::Expect(Never, &[])),
    rule("function-whitespace-after", S::Expect(Always, &[])),
    rule("indentation", S::Limit(2, &[])),
    rule("length-zero-no-unit", S::Enabled(true, &[])),
    rule("max-empty-lines", S::Limit(2, &[])),
    rule(
        "max-line-length",
        S::Limit(
            80,
            &[
                RuleOption::Ignore(&["non-comments"]),
                RuleOption::IgnorePattern(&[
                    "/(https?://[0-9,a-z]*.*)|(^description:.+)|(^tags:.+)/i",
                ]),
            ],
        ),
    ),
    rule("media-feature-colon-space-after", S::Expect(Always, &[])),
    rule("media-feature-colon-space-before", S::Expect(Never, &[])),
    rule("media-feature-range-operator-space-after", S::Expect(Always, &[])),
    rule("media-feature-range-operator-space-before", S::Expect(Always, &[])),
    rule("media-query-list-comma-newline-after", S::Expect(AlwaysMultiLine, &[])),
    rule("media-query-list-comma-space-after", S::Expect(AlwaysSingleLine, &[])),
    rule("media-query-list-comma-space-before", S::Expect(Never, &[])),
    rule("no-eol-whitespace", S::Enabled(true, &[])),
    rule("no-missing-end-of-source-newline", S::Enabled(true, &[])),
    rule("number-leading-zero", S::Expect(Always, &[])),
    rule("number-no-trailing-zeros", S::Enabled(true, &[])),
    rule("property-case", S::Case(Case::Lower, &[])),
    rule(
        "rule-empty-line-before",
        S::Expect(Always, &[RuleOption::Ignore(&["after-comment"])]),
    ),
    rule("selector-attribute-brackets-space-inside", S::Expect(Never, &[])),
    rule("selector-attribute-operator-space-after", S::Expect(Never, &[])),
    rule("selector-attribute-operator-space-before", S::Expect(Never, &[])),
    rule("selector-attribute-quotes", S::Expect(Always, &[])),
    rule(
        "selector-class-pattern",
        S::Pattern(
            "^[a-z]+(-[a-z]+)*",
            &[RuleOption::Message(
                "Selector should use lowercase and separate words with hyphens",
            )],
        ),
    ),
    rule(
        "selector-id-pattern",
        S::Pattern(
            "^[a-z]+(-[a-z]+)*",
            &[RuleOption::Message(
                "Selector should use lowercase and separate words with hyphens",
            )],
        ),
    ),
    rule("selector-combinator-space-after", S::Expect(Always, &[])),
    rule("selector-combinator-space-before", S::Expect(Always, &[])),
    rule("selector-list-comma-newline-after", S::Expect(Always, &[])),
    rule("selector-list-comma-space-before", S::Expect(Never, &[])),
    rule("selector-max-empty-lines", S::Limit(0, &[])),
    rule("selector-pseudo-class-case", S::Case(Case::Lower, &[])),
    rule("selector-pseudo-class-parentheses-space-inside", S::Expect(Never, &[])),
    rule("selector-pseudo-element-case", S::Case(Case::Lower, &[])),
    rule(
        "selector-pseudo-element-colon-notation",
        S::PseudoElementColons(ColonNotation::Double),
    ),
    rule("selector-type-case", S::Case(Case::Lower, &[])),
    rule("string-quotes", S::Quotes(Quote::Double)),
    rule("unit-case", S::Case(Case::Lower, &[])),
    rule("value-keyword-case", S::Case(Case::Lower, &[])),
    rule("value-list-comma-newline-after", S::Expect(AlwaysMultiLine, &[])),
    rule("value-list-comma-space-after", S::Expect(AlwaysSingleLine, &[])),
    rule("value-list-comma-space-before", S::Expect(Never, &[])),
];

/// Script rules applied by `js-lint`.
///
/// A subset of `eslint:recommended` that can be checked on masked source.
/// Rules needing a parser (`no-dupe-keys`, `no-undef`, `no-unused-vars`) are
/// not covered.
pub const SCRIPT_RULES: &[RuleEntry] = &[
    rule("no-debugger", S::Enabled(true, &[])),
    rule("no-empty", S::Enabled(true, &[])),
    rule("no-mixed-spaces-and-tabs", S::Enabled(true, &[])),
    rule("no-irregular-whitespace", S::Enabled(true, &[])),
    rule("no-trailing-spaces", S::Enabled(true, &[])),
    rule("eol-last", S::Expect(Always, &[])),
];

/// Which schema a ruleset is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFamily {
    Style,
    Script,
}

/// Setting kind each known rule must carry.
fn schema_kind(family: RuleFamily, name: &str) -> Option<SettingKind> {
    use SettingKind as K;

    let kind = match family {
        RuleFamily::Style => match name {
            "at-rule-name-case"
            | "color-hex-case"
            | "function-name-case"
            | "property-case"
            | "selector-pseudo-class-case"
            | "selector-pseudo-element-case"
            | "selector-type-case"
            | "unit-case"
            | "value-keyword-case" => K::Case,
            "at-rule-no-unknown"
            | "declaration-block-no-duplicate-properties"
            | "length-zero-no-unit"
            | "no-eol-whitespace"
            | "no-missing-end-of-source-newline"
            | "number-no-trailing-zeros" => K::Enabled,
            "color-hex-length" => K::HexLength,
            "string-quotes" => K::Quotes,
            "font-weight-notation" => K::FontWeight,
            "selector-pseudo-element-colon-notation" => K::PseudoElementColons,
            "function-max-empty-lines"
            | "indentation"
            | "max-empty-lines"
            | "max-line-length"
            | "selector-max-empty-lines" => K::Limit,
            "selector-class-pattern" | "selector-id-pattern" => K::Pattern,
            "declaration-property-unit-whitelist" => K::UnitWhitelist,
            "at-rule-empty-line-before"
            | "at-rule-name-space-after"
            | "at-rule-semicolon-newline-after"
            | "block-closing-brace-newline-after"
            | "block-closing-brace-newline-before"
            | "block-opening-brace-newline-after"
            | "block-opening-brace-space-before"
            | "color-named"
            | "comment-empty-line-before"
            | "declaration-bang-space-after"
            | "declaration-bang-space-before"
            | "declaration-block-semicolon-newline-after"
            | "declaration-block-semicolon-space-before"
            | "declaration-block-trailing-semicolon"
            | "declaration-colon-newline-after"
            | "declaration-colon-space-after"
            | "declaration-colon-space-before"
            | "font-family-name-quotes"
            | "function-comma-space-after"
            | "function-comma-space-before"
            | "function-parentheses-space-inside"
            | "function-url-quotes"
            | "function-whitespace-after"
            | "media-feature-colon-space-after"
            | "media-feature-colon-space-before"
            | "media-feature-range-operator-space-after"
            | "media-feature-range-operator-space-before"
            | "media-query-list-comma-newline-after"
            | "media-query-list-comma-space-after"
            | "media-query-list-comma-space-before"
            | "number-leading-zero"
            | "rule-empty-line-before"
            | "selector-attribute-brackets-space-inside"
            | "selector-attribute-operator-space-after"
            | "selector-attribute-operator-space-before"
            | "selector-attribute-quotes"
            | "selector-combinator-space-after"
            | "selector-combinator-space-before"
            | "selector-list-comma-newline-after"
            | "selector-list-comma-space-before"
            | "selector-pseudo-class-parentheses-space-inside"
            | "value-list-comma-newline-after"
            | "value-list-comma-space-after"
            | "value-list-comma-space-before" => K::Expect,
            _ => return None,
        },
        RuleFamily::Script => match name {
            "no-debugger"
            | "no-empty"
            | "no-mixed-spaces-and-tabs"
            | "no-irregular-whitespace"
            | "no-trailing-spaces" => K::Enabled,
            "eol-last" => K::Expect,
            _ => return None,
        },
    };
    Some(kind)
}

/// An ordered, validated set of rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ruleset {
    family: RuleFamily,
    entries: Vec<RuleEntry>,
}

impl Ruleset {
    /// The stock style-sheet rules.
    pub fn style() -> Self {
        Self {
            family: RuleFamily::Style,
            entries: STYLE_RULES.to_vec(),
        }
    }

    /// The stock script rules.
    pub fn script() -> Self {
        Self {
            family: RuleFamily::Script,
            entries: SCRIPT_RULES.to_vec(),
        }
    }

    /// Build and validate a custom table.
    pub fn from_entries(family: RuleFamily, entries: &[RuleEntry]) -> Result<Self> {
        let set = Self {
            family,
            entries: entries.to_vec(),
        };
        set.validate()?;
        Ok(set)
    }

    pub fn family(&self) -> RuleFamily {
        self.family
    }

    /// Check names, uniqueness, setting shapes and patterns.
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.name) {
                return Err(rule_error(format!("rule '{}' is listed twice", entry.name)));
            }

            let Some(expected) = schema_kind(self.family, entry.name) else {
                return Err(rule_error(format!("unknown lint rule '{}'", entry.name)));
            };
            let actual = entry.setting.kind();
            if expected != actual {
                return Err(rule_error(format!(
                    "rule '{}' expects a {expected} setting, got {actual}",
                    entry.name
                )));
            }

            for pattern in entry.setting.patterns() {
                compile_pattern(pattern).map_err(|e| {
                    rule_error(format!("rule '{}' has an invalid pattern: {e}", entry.name))
                })?;
            }
        }
        Ok(())
    }

    /// A copy without the named rules. Unknown names are an error.
    pub fn without(&self, names: &[String]) -> Result<Self> {
        for name in names {
            if schema_kind(self.family, name).is_none() {
                return Err(rule_error(format!("cannot disable unknown lint rule '{name}'")));
            }
        }
        let entries = self
            .entries
            .iter()
            .filter(|e| !names.iter().any(|n| n == e.name))
            .copied()
            .collect();
        Ok(Self {
            family: self.family,
            entries,
        })
    }

    pub fn get(&self, name: &str) -> Option<&RuleSetting> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.setting)
            .filter(|s| s.is_enabled())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuleEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn rule_error(msg: String) -> BuildError {
    BuildError::Config(msg)
}
