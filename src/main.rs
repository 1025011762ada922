// src/main.rs

mod cli;
mod commands;

use std::path::PathBuf;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let root_dir = cli
        .root
        .clone()
        .unwrap_or_else(|| std::env::current_dir().expect("current directory"));

    let result = dispatch(&root_dir, &cli.command);
    if let Err(err) = result {
        eprintln!("dub: {err}");
        std::process::exit(exit_code_for(&err));
    }
}

fn dispatch(root_dir: &PathBuf, command: &Commands) -> dub::error::Result<()> {
    match command {
        Commands::Build(args) => commands::build(root_dir, args),
        Commands::Run { build, args } => commands::run(root_dir, build, args),
        Commands::Test(args) => commands::test(root_dir, args),
        Commands::Describe { build } => commands::describe(root_dir, build),
        Commands::Upgrade { prerelease } => commands::upgrade(root_dir, *prerelease),
        Commands::Fetch { name, version } => commands::fetch(root_dir, name, version),
        Commands::AddLocal { name, path } => commands::add_local(root_dir, name, path),
        Commands::Remove { name, version } => commands::remove(name, version),
        Commands::Clean => commands::clean(root_dir),
    }
}

/// Map an error onto the exit-code vocabulary `spec.md` §6 defines: `1`
/// for CLI/usage errors, `2` for a package-not-found/load error, and the
/// tool's own exit code for anything that actually ran a compiler/linker.
fn exit_code_for(err: &dub::error::Error) -> i32 {
    use dub::error::Error;
    match err {
        Error::PackageNotFound { .. } | Error::RecipeParse { .. } => 2,
        Error::Compile { exit_code, .. } | Error::Link { exit_code, .. } => exit_code.unwrap_or(1),
        Error::Timeout { possibly_oom: true, .. } => -9,
        _ => 1,
    }
}
