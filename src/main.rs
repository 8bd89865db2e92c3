use anyhow::{Context, Result};
use clap::Parser;
use secrecy::SecretString;
use std::path::PathBuf;
use std::process::ExitCode;

use romwatch::config::Config;
use romwatch::pipeline::{self, PublishTarget, RunOptions, RunReport};
use romwatch::publish::{CommitAuthor, GithubPublisher};
use romwatch::reconcile::Reconciler;
use romwatch::transport::Transport;

#[derive(Parser, Debug)]
#[command(
    name = "romwatch",
    about = "Firmware update checker: syncs a deploy script with the official and community ROM channels"
)]
struct Args {
    /// GitHub API token used to read, commit and tag the deploy script
    #[arg(env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Patch the script even when the two channels disagree
    #[arg(long)]
    force: bool,

    /// Check for updates without committing anything
    #[arg(long)]
    dry_run: bool,

    /// Optional TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let error = format!("{e:#}");
            tracing::error!(error = %error, "Run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let Some(token) = args.token else {
        eprintln!("Usage: romwatch <GITHUB_TOKEN>");
        eprintln!();
        eprintln!("The token may also be supplied through the GITHUB_TOKEN environment variable.");
        return Ok(());
    };
    let token = SecretString::from(token);

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => Config::default(),
    };

    tracing::info!(device = %config.device_model, "Firmware update checker - device: {}", config.device_model);

    let transport = Transport::new(&config.user_agent, config.request_timeout())
        .context("Failed to set up release channel transport")?;
    let reconciler = Reconciler::from_config(&config, transport);
    let publisher = GithubPublisher::new(&config.github, token, config.request_timeout())
        .context("Failed to set up GitHub client")?;

    let target = PublishTarget {
        path: config.github.path.clone(),
        branch: config.github.branch.clone(),
        author: CommitAuthor {
            name: config.github.author_name.clone(),
            email: config.github.author_email.clone(),
        },
    };
    let options = RunOptions {
        force: args.force,
        dry_run: args.dry_run,
    };

    let report = pipeline::run(&publisher, &reconciler, &target, options)
        .await
        .context("Failed to update remote artifact")?;

    match report {
        RunReport::NoUpdate(_) => {}
        RunReport::DryRun { version } => {
            tracing::info!(version = %version, "Update available (dry run)");
        }
        RunReport::Published { version, .. } => {
            tracing::info!(version = %version, "Deploy script updated to {version}");
        }
    }

    Ok(())
}
