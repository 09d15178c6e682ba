use std::path::PathBuf;
use std::sync::Arc;

use sitepipe::errors::BuildError;
use sitepipe::pipeline::{
    AssetStream, MinifyStage, Selection, StyleOptions, StyleStage, TranspileOptions,
    TranspileStage,
};
use sitepipe::types::OutputStyle;
use sitepipe_test_utils::builders::ProjectDir;
use sitepipe_test_utils::fakes::{
    FailingMinifier, FailingStyleCompiler, FakeMinifier, FakeStyleCompiler, FakeTranspiler,
};
use sitepipe_test_utils::init_tracing;

fn patterns(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn selection_applies_exclusions() {
    let selection = Selection::new(&patterns(&[
        "src/scss/**/*.scss",
        "!src/scss/vendor/**/*.scss",
    ]))
    .unwrap();

    assert!(selection.is_match("src/scss/main.scss"));
    assert!(selection.is_match("src/scss/parts/_nav.scss"));
    assert!(!selection.is_match("src/scss/vendor/bootstrap.scss"));
    assert!(!selection.is_match("src/main.scss"));
}

#[test]
fn resolve_keeps_paths_relative_to_glob_base() {
    let project = ProjectDir::site();
    let selection = Selection::new(&patterns(&["src/**/*.html"])).unwrap();

    let entries = selection.resolve(project.root()).unwrap();
    let relative: Vec<PathBuf> = entries.iter().map(|e| e.relative.clone()).collect();
    assert_eq!(
        relative,
        vec![PathBuf::from("about/index.html"), PathBuf::from("index.html")]
    );
}

#[test]
fn missing_literal_source_is_an_error() {
    let project = ProjectDir::new();
    let selection = Selection::new(&patterns(&["favicon.ico"])).unwrap();

    let err = selection.resolve(project.root()).unwrap_err();
    assert!(matches!(err, BuildError::MissingSource(_)), "{err:?}");
}

#[test]
fn glob_matching_nothing_is_empty() {
    init_tracing();
    let project = ProjectDir::new();
    let selection = Selection::new(&patterns(&["assets/**/*.png"])).unwrap();
    assert!(selection.resolve(project.root()).unwrap().is_empty());
}

#[tokio::test]
async fn copy_stream_mirrors_tree_under_dest() {
    let project = ProjectDir::site();
    let stream = AssetStream::new(
        "html",
        Selection::new(&patterns(&["src/**/*.html"])).unwrap(),
        "build",
    );

    let written = stream.run(project.root()).await.unwrap();
    assert_eq!(written.len(), 2);
    assert_eq!(
        project.read("build/about/index.html"),
        "<html><body>About</body></html>\n"
    );
    assert!(project.exists("build/index.html"));
}

#[tokio::test]
async fn styles_output_is_identical_across_runs() {
    let project = ProjectDir::site();
    let stream = AssetStream::new(
        "styles",
        Selection::new(&patterns(&["src/scss/main.scss"])).unwrap(),
        "build/css",
    )
    .stage(Arc::new(StyleStage::new(
        Arc::new(FakeStyleCompiler::default()),
        StyleOptions {
            include_paths: vec![],
            output_style: OutputStyle::Compressed,
        },
    )));

    stream.run(project.root()).await.unwrap();
    let first = std::fs::read(project.path("build/css/main.css")).unwrap();
    stream.run(project.root()).await.unwrap();
    let second = std::fs::read(project.path("build/css/main.css")).unwrap();

    assert_eq!(first, second);
    assert!(String::from_utf8(first).unwrap().starts_with("/* compressed */"));
}

#[tokio::test]
async fn compile_failure_writes_nothing() {
    let project = ProjectDir::site();
    let stream = AssetStream::new(
        "styles",
        Selection::new(&patterns(&["src/scss/main.scss"])).unwrap(),
        "build/css",
    )
    .stage(Arc::new(StyleStage::new(
        Arc::new(FailingStyleCompiler),
        StyleOptions::default(),
    )));

    let err = stream.run(project.root()).await.unwrap_err();
    assert!(matches!(err, BuildError::Compile { .. }), "{err:?}");
    assert!(!project.exists("build/css"));
}

#[tokio::test]
async fn script_failure_in_one_file_leaves_no_output() {
    let project = ProjectDir::site();
    project.write("src/js/broken.js", "let = ;\n");

    let stream = AssetStream::new(
        "js",
        Selection::new(&patterns(&["src/**/*.js"])).unwrap(),
        "build",
    )
    .stage(Arc::new(TranspileStage::new(
        Arc::new(FakeTranspiler),
        TranspileOptions::default(),
    )))
    .stage(Arc::new(MinifyStage::new(Arc::new(FailingMinifier {
        needle: "broken".to_string(),
    }))));

    let err = stream.run(project.root()).await.unwrap_err();
    assert!(matches!(err, BuildError::Minify { .. }), "{err:?}");
    assert!(!project.exists("build/js/app.js"));
}

#[tokio::test]
async fn scripts_are_transpiled_then_minified() {
    let project = ProjectDir::site();
    project.write("src/js/multi.js", "const a = 1;\n  const b = 2;\n");

    let stream = AssetStream::new(
        "js",
        Selection::new(&patterns(&["src/**/*.js"])).unwrap(),
        "build",
    )
    .stage(Arc::new(TranspileStage::new(
        Arc::new(FakeTranspiler),
        TranspileOptions::default(),
    )))
    .stage(Arc::new(MinifyStage::new(Arc::new(FakeMinifier))));

    stream.run(project.root()).await.unwrap();
    assert_eq!(
        project.read("build/js/multi.js"),
        "/* @babel/preset-env */const a = 1;const b = 2;"
    );
}

#[test]
fn preset_names_expand_to_babel_packages() {
    let short = TranspileOptions {
        target_preset: "env".to_string(),
    };
    let scoped = TranspileOptions {
        target_preset: "@acme/preset-site".to_string(),
    };
    assert_eq!(short.preset_package(), "@babel/preset-env");
    assert_eq!(scoped.preset_package(), "@acme/preset-site");
}

#[cfg(unix)]
#[tokio::test]
async fn filter_process_round_trips_stdin() {
    use sitepipe::exec::run_filter;

    let project = ProjectDir::new();
    let output = run_filter(
        &["cat".to_string()],
        &[],
        Some(b"a { }".to_vec()),
        project.root(),
    )
    .await
    .unwrap();
    assert!(output.success);
    assert_eq!(output.stdout, b"a { }");
}

#[cfg(unix)]
#[tokio::test]
async fn failing_tool_maps_to_a_task_error() {
    use sitepipe::pipeline::{SassCommand, StyleCompiler};

    let project = ProjectDir::site();
    let compiler = SassCommand::new(
        vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo 'bad input' >&2; exit 3".to_string(),
        ],
        project.root(),
    );

    let err = compiler
        .compile(&project.path("src/scss/main.scss"), &StyleOptions::default())
        .await
        .unwrap_err();
    match err {
        BuildError::Compile { message, .. } => assert_eq!(message, "bad input"),
        other => panic!("unexpected error: {other:?}"),
    }
}
