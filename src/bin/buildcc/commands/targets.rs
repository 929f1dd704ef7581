//! `buildcc targets` command

use std::path::Path;

use anyhow::Result;

use buildcc::ops;
use buildcc::util::GlobalContext;

pub fn execute(ctx: &GlobalContext, build_file: &Path) -> Result<()> {
    let project = ops::load_project(ctx, build_file)?;
    let targets = ops::list_targets(&project);

    if targets.is_empty() {
        println!("no targets");
        return Ok(());
    }

    let width = targets.iter().map(|t| t.name.len()).max().unwrap_or(0);
    for target in &targets {
        let marker = if target.is_default { " (default)" } else { "" };
        println!(
            "{:width$}  {} task{}{}",
            target.name,
            target.tasks,
            if target.tasks == 1 { "" } else { "s" },
            marker,
            width = width
        );
    }

    Ok(())
}
