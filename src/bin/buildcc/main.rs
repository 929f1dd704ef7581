//! buildcc CLI - declarative C/C++ builds

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use buildcc::core::errors::BuildError;
use buildcc::util::diagnostic;
use buildcc::util::GlobalContext;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        match e.downcast_ref::<BuildError>() {
            Some(err) => diagnostic::emit(&err.to_diagnostic(), std::io::stderr().is_terminal()),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut ctx = GlobalContext::new()?;
    let build_file = ctx.resolve_path(&cli.file);
    if let Some(dir) = build_file.parent() {
        ctx.load_config(dir);
    }

    if cli.quiet {
        ctx.set_verbosity(0);
    } else if cli.verbose > 0 {
        ctx.increase_verbosity(cli.verbose);
    }
    ctx.set_discover_configs(!cli.no_config);
    for (name, value) in &cli.properties {
        ctx.add_override(name.as_str(), value.as_str());
    }

    init_logging(ctx.verbosity());

    match cli.command {
        Commands::Build(args) => commands::build::execute(&mut ctx, &build_file, args),
        Commands::Targets => commands::targets::execute(&ctx, &build_file),
        Commands::Dump => commands::dump::execute(&ctx, &build_file),
        Commands::Objtags(args) => commands::objtags::execute(&ctx, args),
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("buildcc={}", level)))
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}
