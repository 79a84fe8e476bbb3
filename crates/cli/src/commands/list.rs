//! Show the classification of the selected files

use clap::Args;
use gauntlet_suite::classify;
use gauntlet_suite::result::{PlannedRun, TestCategory};

use super::Context;
use crate::output::print_list;

#[derive(Args)]
pub struct ListArgs {
    /// Globs selecting test files, relative to the root
    pub files: Vec<String>,
}

pub fn execute(args: ListArgs, ctx: Context) -> anyhow::Result<()> {
    let files = ctx.select_files(&args.files)?;
    let classification = classify(&files);

    // same order the runners would be invoked in
    let planned: Vec<PlannedRun> = classification
        .unit
        .into_iter()
        .map(|file| PlannedRun { file, category: TestCategory::Unit })
        .chain(
            classification
                .integration
                .into_iter()
                .map(|file| PlannedRun { file, category: TestCategory::Integration }),
        )
        .collect();

    print_list(&planned, ctx.format);
    Ok(())
}
