#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use sitepipe::config::{parse_and_validate, ConfigFile};
use sitepipe::pipeline::Toolchain;
use sitepipe::tasks::Project;

use crate::fakes::fake_toolchain;

/// Config used by most tests: defaults, but the server binds an ephemeral
/// port and never opens a browser.
pub const TEST_CONFIG: &str = r#"
[server]
port = 0
open = false
"#;

/// A throwaway project directory.
pub struct ProjectDir {
    dir: TempDir,
}

impl ProjectDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    /// A small site whose sources pass both lint gates and cover every
    /// default copy task.
    pub fn site() -> Self {
        let project = Self::new();
        project.write("src/index.html", "<html><body><h1>Hello</h1></body></html>\n");
        project.write("src/about/index.html", "<html><body>About</body></html>\n");
        project.write("src/scss/main.scss", ".button {\n  color: #f00;\n}\n");
        project.write("src/js/app.js", "const greeting = 1;\n");
        project.write("assets/logo.png", "png-bytes");
        project.write("favicon.ico", "ico-bytes");
        project.write(
            "node_modules/bootstrap/dist/js/bootstrap.bundle.min.js",
            "/* bootstrap */",
        );
        project.write("node_modules/jquery/dist/jquery.min.js", "/* jquery */");
        project.write("node_modules/font-awesome/fonts/fa.woff2", "font");
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, contents).expect("write fixture file");
        path
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path(rel)).expect("read output file")
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    /// Validated config from TOML text.
    pub fn config(&self, toml: &str) -> ConfigFile {
        parse_and_validate(toml).expect("valid test config")
    }

    /// Project using [`TEST_CONFIG`] and the fake toolchain.
    pub fn project(&self) -> Project {
        self.project_with(TEST_CONFIG, fake_toolchain())
    }

    pub fn project_with(&self, toml: &str, toolchain: Toolchain) -> Project {
        Project::new(self.root(), self.config(toml)).with_toolchain(toolchain)
    }
}

impl Default for ProjectDir {
    fn default() -> Self {
        Self::new()
    }
}
