use std::{path::Path, time::Duration};

use clap::Parser;

use pomcheck::{
    cli::{
        args::{CliArgs, Command},
        command_handlers::{do_check, do_list, do_modules, do_upload},
    },
    config::PomcheckConfig,
    Pomcheck,
};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli_args: CliArgs = CliArgs::parse();

    let root_dir = if cli_args.root_descriptor.is_dir() {
        cli_args.root_descriptor.as_path()
    } else {
        cli_args
            .root_descriptor
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
    };
    let config = PomcheckConfig::load(root_dir)?;

    let mut repository = config.repository;
    let flags = cli_args.repository;
    if let Some(url) = flags.url {
        repository.url = url;
    }
    if let Some(username) = flags.username {
        repository.username = username;
    }
    if let Some(password) = flags.password {
        repository.password = password;
    }
    if flags.repository_id.is_some() {
        repository.repository_id = flags.repository_id;
    }

    let mut builder = Pomcheck::builder()
        .root_descriptor(&cli_args.root_descriptor)
        .repository(repository)
        .process_plugins(cli_args.plugins);
    if let Some(local) = cli_args.local_repository.or(config.local_repository) {
        builder = builder.local_repository(local);
    }
    let check_args = cli_args.cmd.check_args();
    if let Some(concurrency) = check_args
        .and_then(|args| args.concurrency)
        .or(config.concurrency)
    {
        builder = builder.concurrency(concurrency);
    }
    if let Some(timeout) = check_args
        .and_then(|args| args.timeout_secs)
        .map(Duration::from_secs)
        .or(config.timeout)
    {
        builder = builder.timeout(timeout);
    }
    let pomcheck = builder.try_build()?;

    match cli_args.cmd {
        Command::Modules => do_modules(&pomcheck),
        Command::List => do_list(&pomcheck),
        Command::Check { report, .. } => do_check(&pomcheck, report.as_deref()).await,
        Command::Upload { dry_run, .. } => do_upload(&pomcheck, dry_run).await,
    }
}
