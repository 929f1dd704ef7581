//! `buildcc objtags` command

use anyhow::Result;

use crate::cli::ObjtagsArgs;
use buildcc::ops;
use buildcc::util::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: ObjtagsArgs) -> Result<()> {
    let dir = ctx.resolve_path(&args.dir);
    for tag in ops::object_tags(&dir)? {
        println!("{}", tag);
    }
    Ok(())
}
