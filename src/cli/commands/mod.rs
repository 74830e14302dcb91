//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod config_cmd;
mod groups;
mod profile;
mod publish;
mod search;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use hypothesis_client::{ClientConfig, HypothesisClient};

#[derive(Parser)]
#[command(name = "hyp")]
#[command(about = "Search, publish and manage annotations on a Hypothes.is server")]
#[command(version)]
pub struct Cli {
    /// Config file path (TOML)
    #[arg(short, long, global = true, env = "HYPOTHESIS_CONFIG")]
    config: Option<PathBuf>,

    /// API token (developer token from the account settings page)
    #[arg(long, global = true, env = "HYPOTHESIS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// API root, e.g. https://hypothes.is/api (overrides config and environment)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Search annotations
    Search {
        /// Restrict to a group id
        #[arg(short, long)]
        group: Option<String>,
        /// Restrict to a document URI
        #[arg(short, long)]
        uri: Option<String>,
        /// Restrict to a user (acct:name@authority)
        #[arg(long)]
        user: Option<String>,
        /// Restrict to a tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Maximum number of annotations to return
        #[arg(short, long)]
        limit: Option<usize>,
        /// Walk results one page at a time in strict order
        #[arg(long)]
        sequential: bool,
        /// Sort field: created or updated
        #[arg(long, default_value = "updated")]
        sort: String,
        /// Sort order: asc or desc
        #[arg(long, default_value = "desc")]
        order: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Copy annotations from a private group into the public group
    Publish {
        /// Private group to copy from
        #[arg(short, long)]
        group: String,
        /// Only publish annotations on this document URI
        #[arg(short, long)]
        uri: Option<String>,
    },

    /// Leave every group except the public one
    LeaveGroups {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the profile the token belongs to
    Profile,

    /// Print the effective configuration as TOML
    Config,
}

/// Load the config file (if any) and apply environment overrides.
fn load_config(path: Option<&PathBuf>, api_url: Option<&str>) -> anyhow::Result<ClientConfig> {
    let config = match path {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ClientConfig::default(),
    };
    let mut config = config.with_env_overrides();
    if let Some(url) = api_url {
        config.api.base_uri = url.to_string();
    }
    config.validate()?;
    Ok(config)
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref(), cli.api_url.as_deref())?;

    let token = cli.token;
    let connect = || {
        HypothesisClient::with_config(token.clone(), config.clone())
            .context("Failed to create API client")
    };

    match cli.command {
        Commands::Search {
            group,
            uri,
            user,
            tags,
            limit,
            sequential,
            sort,
            order,
            json,
        } => {
            let args = search::SearchArgs {
                group,
                uri,
                user,
                tags,
                limit,
                sequential,
                sort,
                order,
                json,
            };
            search::cmd_search(&connect()?, args).await
        }
        Commands::Publish { group, uri } => {
            publish::cmd_publish(&connect()?, &group, uri.as_deref()).await
        }
        Commands::LeaveGroups { yes } => groups::cmd_leave_groups(&connect()?, yes).await,
        Commands::Profile => profile::cmd_profile(&connect()?).await,
        Commands::Config => config_cmd::cmd_config_show(&config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search_flags() {
        let cli = Cli::try_parse_from([
            "hyp", "search", "--group", "g1", "--tag", "a", "--tag", "b", "--limit", "500",
            "--sequential",
        ])
        .unwrap();

        match cli.command {
            Commands::Search {
                group,
                tags,
                limit,
                sequential,
                ..
            } => {
                assert_eq!(group.as_deref(), Some("g1"));
                assert_eq!(tags, vec!["a", "b"]);
                assert_eq!(limit, Some(500));
                assert!(sequential);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_load_config_applies_api_url() {
        let config = load_config(None, Some("https://h.example.org/api")).unwrap();
        assert_eq!(config.api.base_uri, "https://h.example.org/api");
        assert!(load_config(None, Some("not a url")).is_err());
    }
}
