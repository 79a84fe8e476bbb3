//! HTML harness pages for unit tests
//!
//! A harness loads the site stylesheets and scripts staged at the top of the
//! test root, then the support scripts, then the single test file. A small
//! inline reporter collects `ok`/`equal` assertions and flags completion once
//! the page has loaded.

use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::browser::file_url;
use crate::error::{SuiteError, SuiteResult};

const REPORTER: &str = r#"window.__gauntlet = { assertions: [], finished: false };
window.ok = function (value, message) {
  window.__gauntlet.assertions.push({ message: message || 'ok', passed: !!value });
};
window.equal = function (actual, expected, message) {
  var passed = actual == expected;
  var text = message || 'equal';
  if (!passed) { text += ' (expected ' + expected + ', got ' + actual + ')'; }
  window.__gauntlet.assertions.push({ message: text, passed: passed });
};
window.addEventListener('load', function () { window.__gauntlet.finished = true; });"#;

/// Writes harness pages pointing into a staged test root
pub struct HarnessBuilder {
    test_root: PathBuf,
    harness_dir: PathBuf,
    script_ext: String,
}

impl HarnessBuilder {
    pub fn new(
        test_root: impl Into<PathBuf>,
        harness_dir: impl Into<PathBuf>,
        script_ext: impl Into<String>,
    ) -> Self {
        Self {
            test_root: test_root.into(),
            harness_dir: harness_dir.into(),
            script_ext: script_ext.into(),
        }
    }

    /// Render and write the harness for `staged_test` (relative to the test root)
    pub fn write(&self, staged_test: &Path) -> SuiteResult<PathBuf> {
        let test_path = self.test_root.join(staged_test);
        if !test_path.is_file() {
            return Err(SuiteError::Harness(format!(
                "{} was not staged into {}",
                staged_test.display(),
                self.test_root.display()
            )));
        }

        let html = self.render(staged_test)?;

        std::fs::create_dir_all(&self.harness_dir)?;
        let path = self.harness_dir.join(harness_name(staged_test));
        std::fs::write(&path, html)?;

        debug!("Wrote harness {}", path.display());
        Ok(path)
    }

    pub fn render(&self, staged_test: &Path) -> SuiteResult<String> {
        let stylesheets = self.top_level("css")?;
        let mut scripts = self.top_level(&self.script_ext)?;
        scripts.extend(
            self.support_scripts()?
                .into_iter()
                .filter(|p| p.as_path() != staged_test),
        );
        scripts.push(staged_test.to_path_buf());

        let stylesheets: Vec<String> = stylesheets
            .iter()
            .map(|sheet| file_url(&self.test_root.join(sheet)))
            .collect();
        let scripts: Vec<String> = scripts
            .iter()
            .map(|script| file_url(&self.test_root.join(script)))
            .collect();

        let mut html = String::new();
        write_page(&mut html, staged_test, &stylesheets, &scripts)
            .map_err(|e| SuiteError::Harness(format!("rendering harness: {}", e)))?;
        Ok(html)
    }

    /// Files directly under the test root with `ext`, sorted
    fn top_level(&self, ext: &str) -> SuiteResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.test_root)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|e| e == ext) {
                if let Some(name) = path.file_name() {
                    files.push(PathBuf::from(name));
                }
            }
        }
        files.sort();
        Ok(files)
    }

    fn support_scripts(&self) -> SuiteResult<Vec<PathBuf>> {
        let support = self.test_root.join("test").join("support");
        if !support.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&support).sort_by_file_name() {
            let entry = entry.map_err(|e| SuiteError::Harness(e.to_string()))?;
            let path = entry.path();
            let is_script = path
                .extension()
                .is_some_and(|e| e == self.script_ext.as_str());
            if entry.file_type().is_file() && is_script {
                if let Ok(rel) = path.strip_prefix(&self.test_root) {
                    files.push(rel.to_path_buf());
                }
            }
        }
        Ok(files)
    }
}

fn write_page(
    html: &mut String,
    staged_test: &Path,
    stylesheets: &[String],
    scripts: &[String],
) -> fmt::Result {
    writeln!(html, "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">")?;
    writeln!(html, "<title>{}</title>", escape(&staged_test.to_string_lossy()))?;
    for href in stylesheets {
        writeln!(html, "<link rel=\"stylesheet\" href=\"{}\">", escape(href))?;
    }
    writeln!(html, "<script>\n{}\n</script>", REPORTER)?;
    writeln!(html, "</head>\n<body>\n<div id=\"fixture\"></div>")?;
    for src in scripts {
        writeln!(html, "<script src=\"{}\"></script>", escape(src))?;
    }
    writeln!(html, "</body>\n</html>")
}

/// `test/unit/cart_test.js` -> `test__unit__cart_test.html`
pub fn harness_name(staged_test: &Path) -> String {
    let stem = staged_test
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("__");
    format!("{}.html", stem)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
