// src/cli.rs

//! The command-line surface: `run`/`build`/`test`/`describe`/`upgrade`/
//! `fetch`/`add-local`/`remove`/`clean`. Explicitly outside `spec.md`'s
//! core (§1: "command-line parsing and help text" is out of scope for the
//! resolver/build engine), but required for the crate to be a usable tool;
//! `clap`'s derive API is used throughout, matching the teacher's CLI
//! layer.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dub")]
#[command(author, version, about = "Package manager and build driver", long_about = None)]
pub struct Cli {
    /// Root directory containing dub.json/dub.sdl (defaults to the
    /// current directory).
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// The configuration to build (defaults to the platform's first match).
    #[arg(long)]
    pub config: Option<String>,

    /// Build-type preset: debug, release, unittest, ... (`spec.md` §6).
    #[arg(long, default_value = "debug")]
    pub build_type: String,

    /// Compiler binary name to locate on PATH.
    #[arg(long, default_value = "dmd")]
    pub compiler: String,

    /// Target architecture override, when the compiler probe cannot
    /// determine it on its own.
    #[arg(long)]
    pub arch: Option<String>,

    /// Build parallelism (default: available parallelism).
    #[arg(long)]
    pub parallel: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve dependencies and compile the root package.
    Build(BuildArgs),

    /// Build and then execute the resulting executable.
    Run {
        #[command(flatten)]
        build: BuildArgs,

        /// Arguments forwarded to the built executable.
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Build the `unittest` configuration and run it.
    Test(BuildArgs),

    /// Print the resolved project graph as JSON.
    Describe {
        #[command(flatten)]
        build: BuildArgs,
    },

    /// Re-resolve dependencies, preferring the newest admissible version
    /// over the prior selection.
    Upgrade {
        /// Also admit prerelease versions as upgrade candidates.
        #[arg(long)]
        prerelease: bool,
    },

    /// Fetch one package version into the user-local cache.
    Fetch { name: String, version: String },

    /// Register a local directory as an override for `name`.
    AddLocal { name: String, path: PathBuf },

    /// Remove a fetched package version from the cache.
    Remove { name: String, version: String },

    /// Run build-cache garbage collection for the root package.
    Clean,
}
