//! Build the unit test root without running anything

use std::sync::Arc;

use gauntlet_suite::{Application, CommandApplication, TestSuite};

use super::Context;
use crate::output::{self, print_list};

pub async fn execute(ctx: Context) -> anyhow::Result<()> {
    let config = Arc::new(ctx.config);
    let app: Arc<dyn Application> = Arc::new(CommandApplication::new(&ctx.root, &config.app));
    let mut suite = TestSuite::from_config(app, Vec::new(), Arc::clone(&config))?;

    match suite.stage().await {
        Ok(report) => {
            print_list(&report.artifacts, ctx.format);
            output::print_success(&format!(
                "Staged {} artifact(s) into {}",
                report.artifacts.len(),
                report.test_root.display()
            ));
            Ok(())
        }
        Err(e) => {
            output::print_error(&e.to_string());
            std::process::exit(super::EXIT_SETUP_FAILED);
        }
    }
}
