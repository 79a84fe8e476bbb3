//! End-to-end behavior of the suite controller with in-process collaborators

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::FutureExt;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use walkdir::WalkDir;

use gauntlet_suite::compiler::ScriptCompiler;
use gauntlet_suite::config::PipelineConfig;
use gauntlet_suite::result::PlannedRun;
use gauntlet_suite::{
    Application, Pipeline, Runner, RunnerFactory, SuiteConfig, SuiteError, SuitePhase, SuiteResult,
    TestCategory, TestResult, TestSuite,
};

struct FakeApp {
    root: PathBuf,
    site: PathBuf,
    fail_compile: bool,
    compiles: AtomicUsize,
}

#[async_trait]
impl Application for FakeApp {
    fn root(&self) -> &Path {
        &self.root
    }

    fn site_path(&self) -> &Path {
        &self.site
    }

    async fn compile(&self) -> SuiteResult<()> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        if self.fail_compile {
            return Err(SuiteError::Compile("syntax error in app/main.coffee".to_string()));
        }
        Ok(())
    }
}

struct BannerCompiler;

impl ScriptCompiler for BannerCompiler {
    fn compile(&self, source: &Path) -> SuiteResult<String> {
        Ok(format!("// compiled\n{}", std::fs::read_to_string(source)?))
    }
}

#[derive(Default)]
struct Recorder {
    built: AtomicUsize,
    invoked: Mutex<Vec<PlannedRun>>,
}

/// How a fake runner behaves for a given file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Pass,
    Fail,
    Crash,
    Panic,
}

struct FakeRunner {
    category: TestCategory,
    files: Vec<PathBuf>,
    outcome: Outcome,
    recorder: Arc<Recorder>,
}

#[async_trait]
impl Runner for FakeRunner {
    fn category(&self) -> TestCategory {
        self.category
    }

    fn files(&self) -> &[PathBuf] {
        &self.files
    }

    async fn run(&mut self) -> SuiteResult<TestResult> {
        self.recorder.invoked.lock().unwrap().push(self.planned());
        let mut result = TestResult::passed(&self.files[0], self.category);
        match self.outcome {
            Outcome::Pass => {}
            Outcome::Fail => {
                result.success = false;
                result.failures.push("expected 2, got 3".to_string());
            }
            Outcome::Crash => {
                return Err(SuiteError::Browser("chromium crashed".to_string()));
            }
            Outcome::Panic => panic!("runner bug"),
        }
        Ok(result)
    }
}

struct FakeFactory {
    recorder: Arc<Recorder>,
    outcomes: BTreeMap<PathBuf, Outcome>,
}

impl FakeFactory {
    fn runner(&self, category: TestCategory, file: PathBuf) -> Box<dyn Runner> {
        self.recorder.built.fetch_add(1, Ordering::SeqCst);
        Box::new(FakeRunner {
            category,
            outcome: self.outcomes.get(&file).copied().unwrap_or(Outcome::Pass),
            files: vec![file],
            recorder: Arc::clone(&self.recorder),
        })
    }
}

impl RunnerFactory for FakeFactory {
    fn unit(&self, _app: Arc<dyn Application>, file: PathBuf) -> Box<dyn Runner> {
        self.runner(TestCategory::Unit, file)
    }

    fn integration(&self, _app: Arc<dyn Application>, file: PathBuf) -> Box<dyn Runner> {
        self.runner(TestCategory::Integration, file)
    }
}

struct Fixture {
    tmp: TempDir,
    app: Arc<FakeApp>,
    recorder: Arc<Recorder>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_compile(false)
    }

    fn with_compile(fail_compile: bool) -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        for (rel, contents) in [
            ("test/unit/foo_test.js", "ok(true, 'foo');"),
            ("test/unit/bar_test.js", "ok(true, 'bar');"),
            ("test/unit/a_test.coffee", "ok yes, 'a'"),
            ("test/integration/b_test.js", "visit('/');"),
            ("test/integration/login_test.js", "visit('/login');"),
            ("test/support/helpers.js", "window.helpers = {};"),
            ("site/application.js", "App = {};"),
        ] {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, contents).unwrap();
        }

        let app = Arc::new(FakeApp {
            site: root.join("site"),
            root,
            fail_compile,
            compiles: AtomicUsize::new(0),
        });
        Self {
            tmp,
            app,
            recorder: Arc::new(Recorder::default()),
        }
    }

    fn test_root(&self) -> PathBuf {
        self.tmp.path().join("tmp/test_root")
    }

    fn suite(&self, files: &[&str], config: SuiteConfig) -> TestSuite {
        self.suite_with(files, config, &[])
    }

    fn suite_with(
        &self,
        files: &[&str],
        config: SuiteConfig,
        outcomes: &[(&str, Outcome)],
    ) -> TestSuite {
        let pipeline =
            Pipeline::standard(&PipelineConfig::default(), "site", Arc::new(BannerCompiler))
                .unwrap();
        let factory = FakeFactory {
            recorder: Arc::clone(&self.recorder),
            outcomes: outcomes
                .iter()
                .map(|(file, outcome)| (PathBuf::from(file), *outcome))
                .collect(),
        };
        TestSuite::new(
            self.app.clone(),
            files.iter().map(PathBuf::from).collect(),
            Arc::new(config),
            pipeline,
            Box::new(factory),
        )
    }

    fn invoked(&self) -> Vec<PlannedRun> {
        self.recorder.invoked.lock().unwrap().clone()
    }
}

fn dry_run() -> SuiteConfig {
    SuiteConfig {
        dry_run: true,
        ..Default::default()
    }
}

fn tree_digest(root: &Path) -> BTreeMap<PathBuf, String> {
    WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let bytes = std::fs::read(e.path()).unwrap();
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            (rel, hex::encode(Sha256::digest(&bytes)))
        })
        .collect()
}

#[tokio::test]
async fn unit_file_is_staged_verbatim_and_run_once() {
    let fx = Fixture::new();
    let mut suite = fx.suite(&["test/unit/foo_test.js"], SuiteConfig::default());

    let report = suite.run().await.unwrap();

    assert_eq!(
        std::fs::read_to_string(fx.test_root().join("test/unit/foo_test.js")).unwrap(),
        "ok(true, 'foo');"
    );
    assert_eq!(fx.recorder.built.load(Ordering::SeqCst), 1);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].file, PathBuf::from("test/unit/foo_test.js"));
    assert_eq!(report.results[0].category, TestCategory::Unit);
    assert!(report.success());
}

#[tokio::test]
async fn integration_only_skips_staging() {
    let fx = Fixture::new();
    let mut suite = fx.suite(&["test/integration/login_test.js"], SuiteConfig::default());

    let report = suite.run().await.unwrap();

    assert!(!fx.test_root().exists());
    assert!(suite.stage_report().is_none());
    assert_eq!(fx.app.compiles.load(Ordering::SeqCst), 1);
    assert_eq!(
        fx.invoked(),
        vec![PlannedRun {
            file: "test/integration/login_test.js".into(),
            category: TestCategory::Integration,
        }]
    );
    assert_eq!(report.results.len(), 1);
}

#[tokio::test]
async fn mixed_files_run_unit_first_and_stage_only_unit() {
    let fx = Fixture::new();
    let mut suite = fx.suite(
        &["test/integration/b_test.js", "test/unit/a_test.coffee"],
        SuiteConfig::default(),
    );

    let report = suite.run().await.unwrap();

    let order: Vec<PathBuf> = fx.invoked().into_iter().map(|p| p.file).collect();
    assert_eq!(
        order,
        vec![PathBuf::from("test/unit/a_test.coffee"), PathBuf::from("test/integration/b_test.js")]
    );
    assert!(fx.test_root().join("test/unit/a_test.js").exists());
    assert!(!fx.test_root().join("test/integration/b_test.js").exists());
    assert!(fx.test_root().join("application.js").exists());
    assert_eq!(report.planned.len(), 2);
}

#[tokio::test]
async fn compile_failure_is_fatal_and_builds_nothing() {
    let fx = Fixture::with_compile(true);
    let mut suite = fx.suite(
        &["test/unit/foo_test.js", "test/integration/b_test.js"],
        SuiteConfig::default(),
    );

    let err = suite.run().await.unwrap_err();

    assert!(matches!(err, SuiteError::Compile(_)));
    assert_eq!(fx.recorder.built.load(Ordering::SeqCst), 0);
    assert!(fx.invoked().is_empty());
    assert!(!fx.test_root().exists());
    assert_eq!(suite.phase(), SuitePhase::Done);
    assert!(!suite.history().contains(&SuitePhase::Running));
}

#[tokio::test]
async fn failing_runner_does_not_stop_the_next() {
    let fx = Fixture::new();
    let mut suite = fx.suite_with(
        &["test/unit/foo_test.js", "test/unit/bar_test.js"],
        SuiteConfig::default(),
        &[("test/unit/foo_test.js", Outcome::Fail)],
    );

    let report = suite.run().await.unwrap();

    assert_eq!(report.results.len(), 2);
    assert!(!report.results[0].success);
    assert!(report.results[1].success);
    assert_eq!(report.failed, 1);
    assert!(!report.success());
}

#[tokio::test]
async fn crashed_runner_is_recorded_as_failure() {
    let fx = Fixture::new();
    let mut suite = fx.suite_with(
        &["test/unit/foo_test.js", "test/integration/b_test.js"],
        SuiteConfig::default(),
        &[("test/unit/foo_test.js", Outcome::Crash)],
    );

    let report = suite.run().await.unwrap();

    assert_eq!(report.results[0].file, PathBuf::from("test/unit/foo_test.js"));
    assert_eq!(
        report.results[0].error.as_deref(),
        Some("Browser error: chromium crashed")
    );
    assert!(report.results[1].success);
}

#[tokio::test]
async fn panicking_runner_still_tears_down() {
    let fx = Fixture::new();
    let mut suite = fx.suite_with(
        &["test/unit/foo_test.js", "test/unit/bar_test.js"],
        SuiteConfig::default(),
        &[("test/unit/foo_test.js", Outcome::Panic)],
    );

    let outcome = AssertUnwindSafe(suite.run()).catch_unwind().await;

    let payload = outcome.err().expect("panic should propagate out of run");
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"runner bug"));
    assert_eq!(
        fx.invoked(),
        vec![PlannedRun {
            file: "test/unit/foo_test.js".into(),
            category: TestCategory::Unit,
        }]
    );
    assert_eq!(
        suite.history(),
        &[
            SuitePhase::Idle,
            SuitePhase::Setup,
            SuitePhase::Running,
            SuitePhase::Teardown,
            SuitePhase::Done,
        ]
    );
    assert_eq!(suite.phase(), SuitePhase::Done);
}

#[tokio::test]
async fn dry_run_sets_up_but_invokes_nothing() {
    let fx = Fixture::new();
    let mut suite = fx.suite(&["test/unit/foo_test.js", "test/integration/b_test.js"], dry_run());

    let report = suite.run().await.unwrap();

    assert_eq!(fx.app.compiles.load(Ordering::SeqCst), 1);
    assert!(fx.test_root().join("test/unit/foo_test.js").exists());
    assert_eq!(fx.recorder.built.load(Ordering::SeqCst), 2);
    assert!(fx.invoked().is_empty());
    assert!(report.results.is_empty());
    assert!(report.dry_run);
    assert_eq!(report.planned.len(), 2);
    assert_eq!(
        suite.history(),
        &[
            SuitePhase::Idle,
            SuitePhase::Setup,
            SuitePhase::SkippedRun,
            SuitePhase::Teardown,
            SuitePhase::Done,
        ]
    );
}

#[tokio::test]
async fn empty_file_set_runs_trivially() {
    let fx = Fixture::new();
    let mut suite = fx.suite(&[], SuiteConfig::default());

    let report = suite.run().await.unwrap();

    assert!(report.results.is_empty());
    assert!(report.success());
    assert!(!fx.test_root().exists());
    assert_eq!(fx.recorder.built.load(Ordering::SeqCst), 0);
    assert_eq!(
        suite.history(),
        &[
            SuitePhase::Idle,
            SuitePhase::Setup,
            SuitePhase::Running,
            SuitePhase::Teardown,
            SuitePhase::Done,
        ]
    );
}

#[tokio::test]
async fn results_follow_factory_order() {
    let fx = Fixture::new();
    let files = [
        "test/integration/login_test.js",
        "test/unit/foo_test.js",
        "test/integration/b_test.js",
        "test/unit/bar_test.js",
    ];
    let mut suite = fx.suite(&files, SuiteConfig::default());

    let report = suite.run().await.unwrap();

    let planned: Vec<PathBuf> = report.planned.iter().map(|p| p.file.clone()).collect();
    let results: Vec<PathBuf> = report.results.iter().map(|r| r.file.clone()).collect();
    assert_eq!(
        planned,
        vec![
            PathBuf::from("test/unit/foo_test.js"),
            PathBuf::from("test/unit/bar_test.js"),
            PathBuf::from("test/integration/login_test.js"),
            PathBuf::from("test/integration/b_test.js"),
        ]
    );
    assert_eq!(planned, results);
}

#[tokio::test]
async fn staging_twice_is_byte_identical() {
    let fx = Fixture::new();
    let mut suite = fx.suite(&["test/unit/a_test.coffee"], dry_run());

    suite.run().await.unwrap();
    let first = tree_digest(&fx.test_root());
    suite.run().await.unwrap();
    let second = tree_digest(&fx.test_root());

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn staging_failure_is_fatal() {
    let fx = Fixture::new();
    std::fs::remove_dir_all(fx.tmp.path().join("site")).unwrap();
    let mut suite = fx.suite(&["test/unit/foo_test.js"], SuiteConfig::default());

    let err = suite.run().await.unwrap_err();

    assert!(matches!(err, SuiteError::Staging(_)));
    assert!(err.is_fatal());
    assert_eq!(fx.recorder.built.load(Ordering::SeqCst), 0);
}
