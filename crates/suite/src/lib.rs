//! Gauntlet test suite engine
//!
//! Routes a web application's test files to the right kind of runner and
//! collects the results:
//! - Classifies files into unit and integration tests by path
//! - Stages a self-contained unit test root through a rule pipeline
//! - Runs unit tests in a generated harness page in a headless browser
//! - Runs integration tests against a live application server
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  TestSuite::run                                             │
//! │    ├── classify(files) -> Classification                    │
//! │    ├── Setup                                                │
//! │    │     ├── Application::compile()                         │
//! │    │     └── Pipeline::stage() -> tmp/test_root (unit only) │
//! │    ├── build_runners() -> [unit..., integration...]         │
//! │    ├── Running | SkippedRun (dry run)                       │
//! │    │     └── Runner::run() -> TestResult, one at a time     │
//! │    └── Teardown                                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  UnitRunner         harness page + Playwright               │
//! │  IntegrationRunner  ServerHandle + node test file           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod application;
pub mod browser;
pub mod classify;
pub mod compiler;
pub mod config;
pub mod error;
pub mod harness;
pub mod integration;
pub mod pipeline;
pub mod result;
pub mod runner;
pub mod server;
pub mod suite;
pub mod unit;

pub use application::{Application, CommandApplication};
pub use classify::{classify, Classification};
pub use config::{ConfigOverlay, SuiteConfig};
pub use error::{StagingError, SuiteError, SuiteResult};
pub use pipeline::{Pipeline, StageReport};
pub use result::{SuiteReport, TestCategory, TestResult};
pub use runner::{build_runners, Runner, RunnerFactory};
pub use suite::{SuitePhase, TestSuite};
