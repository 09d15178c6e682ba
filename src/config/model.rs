// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::OutputStyle;

/// Top-level configuration as read from `Sitepipe.toml`.
///
/// Every section is optional; the defaults reproduce the stock front-end
/// layout (`src/`, `assets/`, `node_modules/`, output in `build/`). Task
/// destinations are relative to `[build].output`:
///
/// ```toml
/// [build]
/// output = "build"
///
/// [styles]
/// entry = "src/scss/main.scss"
/// dest = "css"
///
/// [copy.assets]
/// sources = ["assets/**/*.png"]
/// dest = "assets"
///
/// [[watch.binding]]
/// pattern = "src/**/*.html"
/// task = "html"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub styles: StylesSection,

    #[serde(default)]
    pub scripts: ScriptsSection,

    /// Pure copy tasks from `[copy.<name>]`, merged over the defaults by name.
    #[serde(default)]
    pub copy: BTreeMap<String, CopyTaskConfig>,

    #[serde(default)]
    pub lint: LintSection,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub server: ServerSection,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// the rest of the crate can rely on the checked invariants.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub build: BuildSection,
    pub styles: StylesSection,
    pub scripts: ScriptsSection,
    /// Effective copy tasks: defaults merged with user entries, disabled
    /// entries removed.
    pub copy: BTreeMap<String, CopyTaskConfig>,
    pub lint: LintSection,
    pub watch: WatchConfig,
    pub server: ServerSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        raw: RawConfigFile,
        copy: BTreeMap<String, CopyTaskConfig>,
        watch: WatchConfig,
    ) -> Self {
        Self {
            build: raw.build,
            styles: raw.styles,
            scripts: raw.scripts,
            copy,
            lint: raw.lint,
            watch,
            server: raw.server,
        }
    }

    /// Directory the dev server serves, relative to the project root.
    pub fn server_root(&self) -> &str {
        self.server.root.as_deref().unwrap_or(&self.build.output)
    }

    /// Project-relative path of a task destination.
    pub fn output_path(&self, dest: &str) -> PathBuf {
        Path::new(&self.build.output).join(dest)
    }
}

/// `[build]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    /// Output directory every task writes below.
    #[serde(default = "default_output")]
    pub output: String,
}

fn default_output() -> String {
    "build".to_string()
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

/// `[styles]` section: the single Sass entry point.
#[derive(Debug, Clone, Deserialize)]
pub struct StylesSection {
    #[serde(default = "default_style_entry")]
    pub entry: String,

    /// Below `[build].output`.
    #[serde(default = "default_style_dest")]
    pub dest: String,

    /// Extra search paths for `@import`, relative to the project root.
    #[serde(default = "default_include_paths")]
    pub include_paths: Vec<String>,

    #[serde(default)]
    pub output_style: OutputStyle,

    /// Compiler command line (program followed by fixed arguments).
    #[serde(default = "default_style_compiler")]
    pub compiler: Vec<String>,
}

fn default_style_entry() -> String {
    "src/scss/main.scss".to_string()
}

fn default_style_dest() -> String {
    "css".to_string()
}

fn default_include_paths() -> Vec<String> {
    vec![
        "node_modules/bootstrap/scss/".to_string(),
        "node_modules/font-awesome/fonts/".to_string(),
        "src/scss".to_string(),
    ]
}

fn default_style_compiler() -> Vec<String> {
    vec!["sass".to_string()]
}

impl Default for StylesSection {
    fn default() -> Self {
        Self {
            entry: default_style_entry(),
            dest: default_style_dest(),
            include_paths: default_include_paths(),
            output_style: OutputStyle::default(),
            compiler: default_style_compiler(),
        }
    }
}

/// `[scripts]` section: transpile then minify every script.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptsSection {
    #[serde(default = "default_script_sources")]
    pub sources: Vec<String>,

    /// Below `[build].output`; empty writes into the output directory itself.
    #[serde(default = "default_script_dest")]
    pub dest: String,

    /// Transpiler preset name (`env` means `@babel/preset-env`).
    #[serde(default = "default_target_preset")]
    pub target_preset: String,

    #[serde(default = "default_transpiler")]
    pub transpiler: Vec<String>,

    #[serde(default = "default_minifier")]
    pub minifier: Vec<String>,
}

fn default_script_sources() -> Vec<String> {
    vec!["src/**/*.js".to_string()]
}

fn default_script_dest() -> String {
    String::new()
}

fn default_target_preset() -> String {
    "env".to_string()
}

fn default_transpiler() -> Vec<String> {
    vec!["npx".to_string(), "babel".to_string()]
}

fn default_minifier() -> Vec<String> {
    vec!["npx".to_string(), "terser".to_string()]
}

impl Default for ScriptsSection {
    fn default() -> Self {
        Self {
            sources: default_script_sources(),
            dest: default_script_dest(),
            target_preset: default_target_preset(),
            transpiler: default_transpiler(),
            minifier: default_minifier(),
        }
    }
}

/// `[copy.<name>]`: stream a selection unchanged into `dest`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CopyTaskConfig {
    /// Glob patterns; a leading `!` excludes.
    pub sources: Vec<String>,

    /// Below `[build].output`.
    #[serde(default)]
    pub dest: String,

    /// Set to `false` to drop one of the default copy tasks.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub description: Option<String>,
}

impl CopyTaskConfig {
    fn stock(sources: &[&str], dest: &str, description: &str) -> Self {
        Self {
            sources: sources.iter().map(|s| s.to_string()).collect(),
            dest: dest.to_string(),
            enabled: true,
            description: Some(description.to_string()),
        }
    }
}

/// The copy tasks every project gets unless overridden or disabled.
pub fn default_copy_tasks() -> BTreeMap<String, CopyTaskConfig> {
    let mut tasks = BTreeMap::new();
    tasks.insert(
        "html".to_string(),
        CopyTaskConfig::stock(&["src/**/*.html"], "", "Copy HTML pages"),
    );
    tasks.insert(
        "bootstrap-js".to_string(),
        CopyTaskConfig::stock(
            &["node_modules/bootstrap/dist/js/bootstrap.bundle.min.js"],
            "js",
            "Copy the Bootstrap bundle",
        ),
    );
    tasks.insert(
        "jquery".to_string(),
        CopyTaskConfig::stock(
            &["node_modules/jquery/dist/jquery.min.js"],
            "js",
            "Copy minified jQuery",
        ),
    );
    tasks.insert(
        "assets".to_string(),
        CopyTaskConfig::stock(&["assets/**/*.png"], "assets", "Copy image assets"),
    );
    tasks.insert(
        "font-awesome".to_string(),
        CopyTaskConfig::stock(
            &["node_modules/font-awesome/fonts/*"],
            "fonts",
            "Copy Font Awesome fonts",
        ),
    );
    tasks.insert(
        "favicon".to_string(),
        CopyTaskConfig::stock(&["favicon.ico"], "", "Copy the favicon"),
    );
    tasks
}

fn default_true() -> bool {
    true
}

/// `[lint]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LintSection {
    #[serde(default)]
    pub scss: ScssLintConfig,

    #[serde(default)]
    pub js: JsLintConfig,
}

/// `[lint.scss]`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScssLintConfig {
    #[serde(default = "default_scss_lint_sources")]
    pub sources: Vec<String>,

    /// Rule names from the style table to switch off.
    #[serde(default)]
    pub disable: Vec<String>,
}

fn default_scss_lint_sources() -> Vec<String> {
    vec![
        "src/scss/**/*.scss".to_string(),
        "!src/scss/vendor/**/*.scss".to_string(),
    ]
}

impl Default for ScssLintConfig {
    fn default() -> Self {
        Self {
            sources: default_scss_lint_sources(),
            disable: Vec::new(),
        }
    }
}

/// `[lint.js]`.
#[derive(Debug, Clone, Deserialize)]
pub struct JsLintConfig {
    #[serde(default = "default_script_sources")]
    pub sources: Vec<String>,

    #[serde(default)]
    pub disable: Vec<String>,
}

impl Default for JsLintConfig {
    fn default() -> Self {
        Self {
            sources: default_script_sources(),
            disable: Vec::new(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Window over which bursts of filesystem events are batched.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// `[[watch.binding]]` entries: changes matching `pattern` re-run `task`.
    /// When absent, the stock bindings apply to whichever of their tasks exist.
    #[serde(default)]
    pub binding: Option<Vec<WatchBindingConfig>>,
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            binding: None,
        }
    }
}

/// Validated `[watch]` section with the bindings in effect.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub debounce_ms: u64,
    pub binding: Vec<WatchBindingConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WatchBindingConfig {
    pub pattern: String,
    pub task: String,
}

pub(crate) fn default_bindings() -> Vec<WatchBindingConfig> {
    [
        ("src/scss/**/*.scss", "styles"),
        ("src/**/*.html", "html"),
        ("src/**/*.js", "js"),
        ("assets/**/*.png", "assets"),
    ]
    .into_iter()
    .map(|(pattern, task)| WatchBindingConfig {
        pattern: pattern.to_string(),
        task: task.to_string(),
    })
    .collect()
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    /// Directory to serve; defaults to `[build].output`.
    #[serde(default)]
    pub root: Option<String>,

    #[serde(default = "default_host")]
    pub host: String,

    /// `0` picks an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub live_reload: bool,

    /// Open the default browser once the server listens.
    #[serde(default = "default_true")]
    pub open: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            root: None,
            host: default_host(),
            port: default_port(),
            live_reload: true,
            open: true,
        }
    }
}
