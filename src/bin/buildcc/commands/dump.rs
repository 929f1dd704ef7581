//! `buildcc dump` command

use std::path::Path;

use anyhow::Result;

use buildcc::ops;
use buildcc::util::GlobalContext;

pub fn execute(ctx: &GlobalContext, build_file: &Path) -> Result<()> {
    let project = ops::load_project(ctx, build_file)?;

    print!("{}", project);

    println!("compilers:");
    for (name, found) in project.backends().availability() {
        match found {
            Some(path) => println!("\t{}\t= {}", name, path.display()),
            None => println!("\t{}\t= not found", name),
        }
    }

    Ok(())
}
