//! CLI definitions using clap.

use std::path::PathBuf;

use buildcc::util::context::parse_property_arg;
use clap::{ArgAction, Args, Parser, Subcommand};

/// buildcc - declarative C/C++ builds with preset inheritance
#[derive(Parser)]
#[command(name = "buildcc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Build description to read
    #[arg(short, long, global = true, default_value = "build.xml")]
    pub file: PathBuf,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only report warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Set a property, overriding the description (NAME[=VALUE])
    #[arg(
        short = 'p',
        long = "property",
        global = true,
        value_name = "NAME[=VALUE]",
        value_parser = parse_property_arg
    )]
    pub properties: Vec<(String, String)>,

    /// Do not import config.xml files from parent directories
    #[arg(long, global = true)]
    pub no_config: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a target (the default target when none is given)
    Build(BuildArgs),

    /// List the targets of the description
    Targets,

    /// Print the resolved project
    Dump,

    /// Print an <object> tag for every C and C++ file in a directory
    Objtags(ObjtagsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Target to run
    pub target: Option<String>,

    /// Print the commands instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// Print the commands as a JSON plan instead of running them
    #[arg(long, conflicts_with = "dry_run")]
    pub plan: bool,

    /// Number of objects of one binary compiled at once
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct ObjtagsArgs {
    /// Directory to scan
    pub dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_globals_after_subcommand() {
        let cli = Cli::try_parse_from([
            "buildcc", "build", "release", "-vv", "-p", "out=dist", "-p", "flag", "-j", "4",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(
            cli.properties,
            vec![
                ("out".to_string(), "dist".to_string()),
                ("flag".to_string(), String::new())
            ]
        );
        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.target.as_deref(), Some("release"));
                assert_eq!(args.jobs, Some(4));
            }
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn test_invalid_property_rejected() {
        assert!(Cli::try_parse_from(["buildcc", "-p", "=x", "targets"]).is_err());
    }
}
