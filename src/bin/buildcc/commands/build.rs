//! `buildcc build` command

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::BuildArgs;
use buildcc::ops::{self, BuildOptions, BuildOutcome};
use buildcc::util::process::PlannedStep;
use buildcc::util::GlobalContext;

pub fn execute(ctx: &mut GlobalContext, build_file: &Path, args: BuildArgs) -> Result<()> {
    if let Some(jobs) = args.jobs {
        ctx.set_jobs(jobs);
    }

    let project = ops::load_project(ctx, build_file)?;

    let opts = BuildOptions {
        target: args.target,
        dry_run: args.dry_run || args.plan,
        jobs: None,
    };

    match ops::build(ctx, &project, &opts)? {
        BuildOutcome::Ran { target } => {
            tracing::info!("target `{}` finished", target);
        }
        BuildOutcome::Planned { steps, .. } if args.plan => {
            let json =
                serde_json::to_string_pretty(&steps).context("failed to serialize build plan")?;
            println!("{}", json);
        }
        BuildOutcome::Planned { steps, .. } => {
            for step in &steps {
                match step {
                    PlannedStep::Run(cmd) => println!("{}", cmd.display()),
                    PlannedStep::Move { from, to } => {
                        println!("move {} -> {}", from.display(), to.display())
                    }
                }
            }
        }
    }

    Ok(())
}
