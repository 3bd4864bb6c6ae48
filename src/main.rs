//! diffscribe - CLI entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use diffscribe::config::{Overrides, Provider, Settings};
use diffscribe::git;
use diffscribe::present;
use diffscribe::{Outcome, Pipeline, PipelineError, SuggestRequest, SuggestionKind, Template};

/// Suggest branch names, commit messages and PR summaries from git diffs.
#[derive(Parser, Debug)]
#[command(name = "diffscribe")]
#[command(about = "Suggest branch names, commit messages and PR summaries from git diffs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Completion backend (openai or claude)
    #[arg(long, global = true)]
    provider: Option<Provider>,

    /// Model name for the OpenAI backend
    #[arg(long, global = true)]
    model: Option<String>,

    /// Candidates requested in each response
    #[arg(long, global = true)]
    candidates: Option<usize>,

    /// Independent completions requested per invocation
    #[arg(long, global = true)]
    completions: Option<usize>,

    /// Upper bound on prompt size, in characters
    #[arg(long, global = true)]
    max_prompt_chars: Option<usize>,

    /// Log pipeline progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Suggest branch names for the current changes
    Branch {
        /// Compare against this ref instead of the default branch
        #[arg(long)]
        base: Option<String>,
    },

    /// Suggest commit messages for staged changes
    Commit,

    /// Generate a PR summary for the current branch
    Pr {
        /// Markdown template whose headers the summary must follow
        #[arg(long)]
        template: Option<PathBuf>,

        /// Compare against this ref instead of the default branch
        #[arg(long)]
        base: Option<String>,
    },

    /// Show what the pipeline sees in this repository
    Debug,
}

fn init_tracing(verbose: bool) {
    let filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("diffscribe=debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let repo = git::open_repository(".")
        .context("Not a git repository. Run diffscribe from within a git repository.")?;

    let request = match cli.command {
        Command::Debug => {
            let report = git::inspect(&repo).context("Failed to inspect repository")?;
            print!("{}", present::render_repo_report(&report));
            return Ok(());
        }
        Command::Branch { base } => SuggestRequest::new(SuggestionKind::Branch).with_base(base),
        Command::Commit => SuggestRequest::new(SuggestionKind::Commit),
        Command::Pr { template, base } => {
            let template = template
                .map(|path| Template::from_file(&path))
                .transpose()
                .context("Failed to load PR template")?;
            SuggestRequest::new(SuggestionKind::PullRequest)
                .with_base(base)
                .with_template(template)
        }
    };

    let settings = Settings::from_env().with_overrides(Overrides {
        provider: cli.provider,
        model: cli.model,
        candidate_count: cli.candidates,
        completions: cli.completions,
        max_prompt_chars: cli.max_prompt_chars,
    });
    tracing::debug!(?settings, "resolved settings");

    let pipeline = Pipeline::from_settings(&settings)
        .context("Failed to configure the completion backend")?;

    match pipeline.run_cancellable(&repo, &request, interrupted()).await {
        Ok(Outcome::NothingToDo { scope }) => {
            print!("{}", present::render_nothing_to_do(scope));
            Ok(())
        }
        Ok(Outcome::Suggestions(report)) => {
            print!("{}", present::render_report(request.kind, &report));
            Ok(())
        }
        Err(PipelineError::Parse(err)) => {
            print!("{}", present::render_parse_failure(&err));
            Err(err).context("Failed during response parsing")
        }
        Err(err) => {
            let stage = err.stage();
            Err(err).with_context(|| format!("Failed during {stage}"))
        }
    }
}
