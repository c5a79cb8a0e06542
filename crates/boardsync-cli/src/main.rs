//! Command-line driver for the boardsync library.
//!
//! Usage:
//! ```bash
//! gh-boardsync project octo-org 3                       # Show a board
//! gh-boardsync fields octo-org 3                        # List board fields
//! gh-boardsync items octo-org 3 --repo octo-org/app     # List board items
//! gh-boardsync set-field octo-org 3 PVTI_1 Status Done  # Set one field
//! gh-boardsync batch octo-org 3 -u PVTI_1:Status=Done   # Set many fields at once
//! gh-boardsync issue octo-org/app 12                    # Show an issue
//! gh-boardsync link octo-org/app 12 14                  # Make #14 a sub-issue of #12
//! gh-boardsync sub-issues octo-org/app 12               # List sub-issues
//! ```
//!
//! Results are printed to stdout as JSON; logs go to stderr and are filtered
//! with `RUST_LOG` (default `warn`).

use anyhow::{Context, Result, bail};
use boardsync::{Client, ClientConfig, FieldUpdate, IssueStateFilter, ItemFilter};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "gh-boardsync", author, version, about)]
struct Cli {
    /// Retries granted to a rate-limited request
    #[arg(long, global = true, value_name = "N")]
    max_retries: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

/// A board, addressed by owner login and number.
#[derive(Debug, clap::Args)]
struct BoardArgs {
    /// User or organization that owns the board
    owner: String,

    /// Board number
    number: u32,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show a board
    Project(BoardArgs),

    /// List the fields of a board
    Fields(BoardArgs),

    /// List the issue items of a board
    Items {
        #[command(flatten)]
        board: BoardArgs,

        /// Only items whose issue lives in this `owner/name` repository
        #[arg(long)]
        repo: Option<String>,

        /// Stop after this many items (0 for all)
        #[arg(long, default_value_t = 0)]
        limit: usize,
    },

    /// Set one field of one item
    SetField {
        #[command(flatten)]
        board: BoardArgs,

        item_id: String,

        field: String,

        /// New value; empty clears a date field
        value: String,
    },

    /// Set many fields in a single request
    Batch {
        #[command(flatten)]
        board: BoardArgs,

        /// Update as `ITEM_ID:FIELD=VALUE`; repeatable
        #[arg(short, long = "update", value_name = "ITEM_ID:FIELD=VALUE", required = true)]
        updates: Vec<String>,
    },

    /// Show an issue
    Issue {
        /// Repository as `owner/name`
        repo: String,

        number: u64,
    },

    /// Search a repository's issues by label
    Search {
        /// Repository as `owner/name`
        repo: String,

        /// Required label; repeatable
        #[arg(short, long = "label", required = true)]
        labels: Vec<String>,

        #[arg(long, value_enum, default_value_t = StateArg::Open)]
        state: StateArg,

        #[arg(long, default_value_t = 0)]
        limit: usize,
    },

    /// Make `child` a sub-issue of `parent`
    Link {
        /// Repository as `owner/name`
        repo: String,

        parent: u64,

        child: u64,
    },

    /// Remove the sub-issue link between `parent` and `child`
    Unlink {
        /// Repository as `owner/name`
        repo: String,

        parent: u64,

        child: u64,
    },

    /// List the sub-issues of an issue
    SubIssues {
        /// Repository as `owner/name`
        repo: String,

        number: u64,

        #[arg(long, default_value_t = 0)]
        limit: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StateArg {
    Open,
    Closed,
    All,
}

impl From<StateArg> for IssueStateFilter {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Open => Self::Open,
            StateArg::Closed => Self::Closed,
            StateArg::All => Self::All,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = configure(
        ClientConfig::from_env().context("failed to load client configuration")?,
        cli.max_retries,
    );
    debug!(endpoint = config.endpoint(), "Loaded configuration");
    let client = Client::new(&config);

    run(&client, cli.command).await
}

async fn run(client: &Client, command: Command) -> Result<()> {
    match command {
        Command::Project(board) => {
            let project = client.get_project(&board.owner, board.number).await?;
            print_json(&project)
        }
        Command::Fields(board) => {
            let project = client.get_project(&board.owner, board.number).await?;
            print_json(&client.get_project_fields(&project.id).await?)
        }
        Command::Items { board, repo, limit } => {
            let project = client.get_project(&board.owner, board.number).await?;
            let filter = repo.map(ItemFilter::repository).unwrap_or_default();
            print_json(&client.get_project_items(&project.id, &filter, limit).await?)
        }
        Command::SetField {
            board,
            item_id,
            field,
            value,
        } => {
            let project = client.get_project(&board.owner, board.number).await?;
            client
                .set_project_item_field(&project.id, &item_id, &field, &value)
                .await?;
            eprintln!("Updated {field:?} on {item_id}");
            Ok(())
        }
        Command::Batch { board, updates } => {
            let updates = updates
                .iter()
                .map(String::as_str)
                .map(parse_update)
                .collect::<Result<Vec<_>>>()?;
            let project = client.get_project(&board.owner, board.number).await?;
            let fields = client.get_project_fields(&project.id).await?;
            let results = client
                .batch_update_project_item_fields(&project.id, &updates, &fields)
                .await?;
            let failed = results.iter().filter(|result| !result.success).count();
            print_json(&results)?;
            if failed > 0 {
                bail!("{failed} of {} updates failed", results.len());
            }
            Ok(())
        }
        Command::Issue { repo, number } => {
            let (owner, name) = split_repo(&repo)?;
            print_json(&client.get_issue(owner, name, number).await?)
        }
        Command::Search {
            repo,
            labels,
            state,
            limit,
        } => {
            let (owner, name) = split_repo(&repo)?;
            let issues = client
                .search_issues_by_labels(owner, name, &labels, state.into(), limit)
                .await?;
            print_json(&issues)
        }
        Command::Link { repo, parent, child } => {
            let (owner, name) = split_repo(&repo)?;
            let parent = client.get_issue(owner, name, parent).await?;
            let child = client.get_issue(owner, name, child).await?;
            client.add_sub_issue(&parent.id, &child.id).await?;
            eprintln!("Linked #{} under #{}", child.number, parent.number);
            Ok(())
        }
        Command::Unlink { repo, parent, child } => {
            let (owner, name) = split_repo(&repo)?;
            let parent = client.get_issue(owner, name, parent).await?;
            let child = client.get_issue(owner, name, child).await?;
            client.remove_sub_issue(&parent.id, &child.id).await?;
            eprintln!("Unlinked #{} from #{}", child.number, parent.number);
            Ok(())
        }
        Command::SubIssues { repo, number, limit } => {
            let (owner, name) = split_repo(&repo)?;
            print_json(&client.get_sub_issues(owner, name, number, limit).await?)
        }
    }
}

fn configure(config: ClientConfig, max_retries: Option<usize>) -> ClientConfig {
    let config = config.with_user_agent(concat!("gh-boardsync/", env!("CARGO_PKG_VERSION")));
    match max_retries {
        Some(max_retries) => {
            let retry = config.retry().clone().with_max_retries(max_retries);
            config.with_retry(retry)
        }
        None => config,
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}

/// Splits `owner/name`.
fn split_repo(repo: &str) -> Result<(&str, &str)> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => bail!("invalid repository {repo:?} (expected OWNER/NAME)"),
    }
}

/// Parses `ITEM_ID:FIELD=VALUE`. The value may be empty or contain `=`.
fn parse_update(raw: &str) -> Result<FieldUpdate> {
    let (item_id, rest) = raw
        .split_once(':')
        .with_context(|| format!("invalid update {raw:?} (expected ITEM_ID:FIELD=VALUE)"))?;
    let (field, value) = rest
        .split_once('=')
        .with_context(|| format!("invalid update {raw:?} (expected ITEM_ID:FIELD=VALUE)"))?;
    if item_id.is_empty() || field.is_empty() {
        bail!("invalid update {raw:?} (item id and field name are required)");
    }
    Ok(FieldUpdate::new(item_id, field, value))
}
