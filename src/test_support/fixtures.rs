//! Test fixtures for common test scenarios.
//!
//! Builders for on-disk projects: a description file plus source files.

use std::path::{Path, PathBuf};

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: impl AsRef<Path>, contents: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create fixture directory");
    }
    std::fs::write(&path, contents).expect("write fixture file");
    path
}

/// Fixture for a project directory.
#[derive(Debug, Clone, Default)]
pub struct ProjectFixture {
    /// Description file content.
    pub build_file: String,
    /// Other files (path relative to project root -> content).
    pub files: Vec<(PathBuf, String)>,
}

impl ProjectFixture {
    /// A project with the given description.
    pub fn new(build_file: impl Into<String>) -> Self {
        ProjectFixture {
            build_file: build_file.into(),
            files: Vec::new(),
        }
    }

    /// A single C program built from `src/main.c`.
    pub fn c_program(name: &str) -> Self {
        ProjectFixture::new(descriptions::c_program(name))
            .with_file("src/main.c", sources::HELLO_C)
    }

    /// Add a file.
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.push((path.into(), content.into()));
        self
    }

    /// Write the fixture below `root` and return the description path.
    pub fn write_to(&self, root: &Path) -> PathBuf {
        for (rel, content) in &self.files {
            write_file(root, rel, content);
        }
        write_file(root, "build.xml", &self.build_file)
    }
}

/// Common description templates.
pub mod descriptions {
    /// A description with one target per `(name, text)` echo pair.
    pub fn echo_targets(default: &str, targets: &[(&str, &str)]) -> String {
        let body: String = targets
            .iter()
            .map(|(name, text)| format!("  <target name=\"{name}\"><echo>{text}</echo></target>\n"))
            .collect();

        format!("<buildcc name=\"echo\" default=\"{default}\">\n{body}</buildcc>\n")
    }

    /// A C program with `debug` and `release` presets.
    pub fn c_program(name: &str) -> String {
        format!(
            r#"<buildcc name="{name}" default="release">
  <property name="out" value="build"/>

  <preset name="base">
    <include dir="include"/>
    <opt value="-Wall"/>
  </preset>
  <preset name="debug" parent="base" debug-symbols="true">
    <define key="DEBUG"/>
  </preset>
  <preset name="release" parent="base">
    <opt value="-O2"/>
  </preset>

  <fileset name="sources">
    <wildcard pattern="src/*.c"/>
  </fileset>

  <target name="release">
    <executable output="${{out}}/{name}" lang="c" preset="release">
      <object src-set="sources"/>
    </executable>
  </target>
  <target name="debug">
    <executable output="${{out}}/{name}-debug" lang="c" preset="debug">
      <object src-set="sources"/>
    </executable>
  </target>
</buildcc>
"#
        )
    }
}

/// Common source file templates.
pub mod sources {
    /// A hello world program.
    pub const HELLO_C: &str = r#"#include <stdio.h>

int main(void) {
    printf("Hello, World!\n");
    return 0;
}
"#;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_c_program_fixture_writes_files() {
        let tmp = TempDir::new().unwrap();
        let build = ProjectFixture::c_program("hello").write_to(tmp.path());

        assert_eq!(build, tmp.path().join("build.xml"));
        assert!(tmp.path().join("src/main.c").exists());
        let text = std::fs::read_to_string(build).unwrap();
        assert!(text.contains("output=\"${out}/hello\""));
    }

    #[test]
    fn test_echo_targets() {
        let xml = descriptions::echo_targets("a", &[("a", "one"), ("b", "two")]);
        assert!(xml.contains("default=\"a\""));
        assert!(xml.contains("<target name=\"b\"><echo>two</echo></target>"));
    }
}
