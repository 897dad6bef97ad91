use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Checks which dependencies of a Maven multi-module project exist in a remote repository.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct CliArgs {
    #[clap(subcommand)]
    pub cmd: Command,
    /// Root module descriptor of the project
    #[clap(short = 'f', long = "file", default_value = "pom.xml")]
    pub root_descriptor: PathBuf,
    /// Local artifact repository, defaults to $HOME/.m2/repository
    #[clap(long)]
    pub local_repository: Option<PathBuf>,
    /// Also collect build plugins
    #[clap(long)]
    pub plugins: bool,
    #[clap(flatten)]
    pub repository: RepositoryArgs,
}

#[derive(Debug, Args)]
pub struct RepositoryArgs {
    /// Base url of the remote repository
    #[clap(long, env = "POMCHECK_REPOSITORY_URL")]
    pub url: Option<String>,
    #[clap(long, env = "POMCHECK_REPOSITORY_USERNAME")]
    pub username: Option<String>,
    #[clap(long, env = "POMCHECK_REPOSITORY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// Repository name, used as `<url>/repository/<id>/`
    #[clap(long, env = "POMCHECK_REPOSITORY_ID")]
    pub repository_id: Option<String>,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Maximum number of concurrent remote checks
    #[clap(long)]
    pub concurrency: Option<usize>,
    /// Time limit of a single remote check
    #[clap(long)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lists the module descriptors reachable from the root descriptor
    Modules,
    /// Lists the distinct dependency coordinates and their local presence
    List,
    /// Checks which dependencies exist in the remote repository
    Check {
        #[clap(flatten)]
        check: CheckArgs,
        /// Writes a toml status report to this file
        #[clap(long)]
        report: Option<PathBuf>,
    },
    /// Uploads the dependencies missing remotely from the local repository
    Upload {
        #[clap(flatten)]
        check: CheckArgs,
        /// Only logs what would be uploaded
        #[clap(long)]
        dry_run: bool,
    },
}

impl Command {
    pub fn check_args(&self) -> Option<&CheckArgs> {
        match self {
            Command::Check { check, .. } | Command::Upload { check, .. } => Some(check),
            Command::Modules | Command::List => None,
        }
    }
}
