use std::path::{Path, PathBuf};
use std::sync::Arc;

use sitepipe::errors::BuildError;
use sitepipe::lint::{
    format_report, Expect, Linter, LintTask, RuleEntry, RuleFamily, RuleSetting, Ruleset,
    ScriptLinter, StyleLinter, Violation, STYLE_RULES,
};
use sitepipe::pipeline::Selection;
use sitepipe_test_utils::builders::ProjectDir;
use sitepipe_test_utils::init_tracing;

fn scss_selection() -> Selection {
    Selection::new(&[
        "src/scss/**/*.scss".to_string(),
        "!src/scss/vendor/**/*.scss".to_string(),
    ])
    .unwrap()
}

fn style_gate() -> LintTask {
    LintTask::new("scss-lint", scss_selection(), Ruleset::style(), Arc::new(StyleLinter))
}

#[test]
fn named_color_is_the_only_violation() {
    let violations = StyleLinter.lint(
        Path::new("src/scss/main.scss"),
        ".button {\n  color: red;\n}\n",
        &Ruleset::style(),
    );

    assert_eq!(
        violations,
        vec![Violation {
            file: PathBuf::from("src/scss/main.scss"),
            line: 2,
            column: 10,
            rule: "color-named".to_string(),
            message: "Unexpected named color \"red\"".to_string(),
        }]
    );
}

#[test]
fn hex_color_is_clean() {
    let violations = StyleLinter.lint(
        Path::new("main.scss"),
        ".button {\n  color: #f00;\n}\n",
        &Ruleset::style(),
    );
    assert!(violations.is_empty(), "{violations:?}");
}

#[test]
fn disabled_rule_is_not_reported() {
    let rules = Ruleset::style().without(&["color-named".to_string()]).unwrap();
    let violations = StyleLinter.lint(Path::new("main.scss"), ".button {\n  color: red;\n}\n", &rules);
    assert!(violations.is_empty(), "{violations:?}");
}

#[tokio::test]
async fn vendor_directory_is_excluded() {
    init_tracing();
    let project = ProjectDir::site();
    project.write("src/scss/vendor/third-party.scss", ".x {\n  color: red;\n}\n");

    let violations = style_gate().check(project.root()).await.unwrap();
    assert!(violations.is_empty(), "{violations:?}");
}

#[tokio::test]
async fn gate_fails_with_the_violation_count() {
    init_tracing();
    let project = ProjectDir::site();
    project.write("src/scss/_bad.scss", ".x {\n  color: red;\n}\n");

    let gate = style_gate();
    let violations = gate.check(project.root()).await.unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].file, PathBuf::from("src/scss/_bad.scss"));

    let err = gate.run(project.root()).await.unwrap_err();
    match err {
        BuildError::Lint { task, count } => {
            assert_eq!(task, "scss-lint");
            assert_eq!(count, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn script_linter_reports_debugger_and_trailing_space() {
    let violations = ScriptLinter.lint(
        Path::new("app.js"),
        "debugger;\nlet a = 1; \n",
        &Ruleset::script(),
    );

    let found: Vec<(usize, usize, &str)> = violations
        .iter()
        .map(|v| (v.line, v.column, v.rule.as_str()))
        .collect();
    assert_eq!(
        found,
        vec![(1, 1, "no-debugger"), (2, 11, "no-trailing-spaces")]
    );
}

#[test]
fn script_linter_ignores_debugger_inside_strings() {
    let violations = ScriptLinter.lint(
        Path::new("app.js"),
        "const s = \"debugger\";\n",
        &Ruleset::script(),
    );
    assert!(violations.is_empty(), "{violations:?}");
}

#[test]
fn script_linter_wants_final_newline() {
    let violations = ScriptLinter.lint(Path::new("app.js"), "go();", &Ruleset::script());
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].rule, "eol-last");
}

#[test]
fn script_linter_flags_empty_statement_blocks() {
    let source = "\
if (ready) {}
try {
  go();
} catch (err) {
}
function noop() {}
const options = {};
while (busy()) { /* spin */ }
";
    let violations = ScriptLinter.lint(Path::new("app.js"), source, &Ruleset::script());

    let found: Vec<(usize, usize, &str)> = violations
        .iter()
        .map(|v| (v.line, v.column, v.rule.as_str()))
        .collect();
    assert_eq!(found, vec![(1, 12, "no-empty"), (4, 15, "no-empty")]);
}

#[test]
fn script_linter_flags_mixed_indentation() {
    let violations = ScriptLinter.lint(Path::new("app.js"), "\t  go();\n", &Ruleset::script());
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].rule, "no-mixed-spaces-and-tabs");
}

#[test]
fn stock_tables_validate() {
    Ruleset::style().validate().unwrap();
    Ruleset::script().validate().unwrap();
    assert!(Ruleset::style().contains("selector-class-pattern"));
    assert_eq!(Ruleset::style().len(), STYLE_RULES.len());
}

#[test]
fn duplicate_rule_entries_are_rejected() {
    const DUPLICATED: &[RuleEntry] = &[
        RuleEntry {
            name: "color-named",
            setting: RuleSetting::Expect(Expect::Never, &[]),
        },
        RuleEntry {
            name: "color-named",
            setting: RuleSetting::Expect(Expect::Never, &[]),
        },
    ];

    let err = Ruleset::from_entries(RuleFamily::Style, DUPLICATED).unwrap_err();
    assert!(err.to_string().contains("listed twice"), "{err}");
}

#[test]
fn report_lists_one_violation_per_line() {
    let report = format_report(&[
        Violation {
            file: PathBuf::from("src/a.scss"),
            line: 3,
            column: 5,
            rule: "color-named".to_string(),
            message: "Unexpected named color \"red\"".to_string(),
        },
        Violation {
            file: PathBuf::from("src/b.js"),
            line: 1,
            column: 1,
            rule: "no-debugger".to_string(),
            message: "Unexpected 'debugger' statement.".to_string(),
        },
    ]);

    assert_eq!(
        report,
        "src/a.scss:3:5  color-named  Unexpected named color \"red\"\n\
         src/b.js:1:1  no-debugger  Unexpected 'debugger' statement.\n"
    );
}
