//! Lifedash CLI
//!
//! Command-line interface for the Lifedash personal-data dashboard.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use lifedash_core::{Config, Dashboard, Domain, EntityId, ListFilters, SortOrder, Theme};

mod commands;
mod logging;
mod output;
mod prompt;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "lifedash")]
#[command(about = "Lifedash - personal data dashboard client")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,
        /// Password (read from stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show session and storage status
    Status {
        /// Fetch every collection and show counts
        #[arg(long)]
        refresh: bool,
    },
    /// List a collection (notes, bookmarks, passwords, cards, voice-memos, ...)
    #[command(alias = "ls")]
    List {
        domain: Domain,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Manage bookmarks
    Bookmark {
        #[command(subcommand)]
        command: BookmarkCommands,
    },
    /// Manage notes
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },
    /// Delete a record
    #[command(alias = "rm")]
    Delete {
        domain: Domain,
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Request a password reset link
    ResetPassword { email: String },
    /// Show or change UI preferences
    Prefs {
        #[command(subcommand)]
        command: Option<PrefsCommands>,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Args, Default)]
struct FilterArgs {
    /// Full-text search
    #[arg(short = 's', long)]
    search: Option<String>,
    /// Only records with a matching tag
    #[arg(short, long)]
    tag: Option<String>,
    #[arg(long)]
    pinned: bool,
    #[arg(long)]
    trashed: bool,
    #[arg(long)]
    favorite: bool,
    /// Only files in this folder
    #[arg(long, value_name = "ID")]
    folder: Option<String>,
    /// Only photos in this album
    #[arg(long, value_name = "ID")]
    album: Option<String>,
    /// Sort by field
    #[arg(long, value_name = "FIELD")]
    sort: Option<String>,
    /// Sort descending
    #[arg(long, requires = "sort")]
    desc: bool,
}

impl FilterArgs {
    fn into_filters(self) -> ListFilters {
        let mut filters = ListFilters::new();
        filters.q = self.search;
        filters.tags_like = self.tag;
        filters.is_pinned = self.pinned.then_some(true);
        filters.is_trashed = self.trashed.then_some(true);
        filters.is_favorite = self.favorite.then_some(true);
        filters.folder_id = self.folder.as_deref().map(EntityId::parse);
        filters.album_id = self.album.as_deref().map(EntityId::parse);
        if let Some(field) = self.sort {
            let order = if self.desc {
                SortOrder::Desc
            } else {
                SortOrder::Asc
            };
            filters = filters.sort_by(field, order);
        }
        filters
    }
}

#[derive(Subcommand)]
enum BookmarkCommands {
    /// Save a bookmark
    #[command(alias = "create")]
    Add {
        url: String,
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// Tags to add
        #[arg(short, long)]
        tag: Vec<String>,
    },
}

#[derive(Subcommand)]
enum NoteCommands {
    /// Create a note
    #[command(alias = "create")]
    Add {
        title: String,
        #[arg(short, long)]
        body: Option<String>,
        /// Tags to add
        #[arg(short, long)]
        tag: Vec<String>,
        #[arg(long)]
        pin: bool,
    },
}

#[derive(Subcommand)]
enum PrefsCommands {
    /// Show preferences
    Show,
    /// Set the color theme (light, dark, system)
    Theme { theme: Theme },
    /// Collapse or expand the sidebar
    Sidebar {
        #[arg(action = clap::ArgAction::Set)]
        collapsed: bool,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, api_url, platform, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands don't need the dashboard
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    logging::init(&config);

    let dashboard = Dashboard::open_with_config(config).await?;

    match cli.command {
        Commands::Config { .. } => unreachable!(), // Handled above
        Commands::Login { email, password } => {
            commands::auth::login(&dashboard, email, password, &output).await
        }
        Commands::Logout => commands::auth::logout(&dashboard, &output).await,
        Commands::ResetPassword { email } => {
            commands::auth::reset_password(&dashboard, email, &output).await
        }
        Commands::Status { refresh } => commands::status::show(&dashboard, refresh, &output).await,
        Commands::Prefs { command } => handle_prefs_command(command, &dashboard, &output).await,
        Commands::List { domain, filters } => {
            require_session(&dashboard)?;
            commands::records::list(&dashboard, domain, filters.into_filters(), &output).await
        }
        Commands::Delete { domain, id, yes } => {
            require_session(&dashboard)?;
            commands::records::delete(&dashboard, domain, id, yes, &output).await
        }
        Commands::Bookmark { command } => {
            require_session(&dashboard)?;
            match command {
                BookmarkCommands::Add { url, title, tag } => {
                    commands::records::add_bookmark(&dashboard, url, title, tag, &output).await
                }
            }
        }
        Commands::Note { command } => {
            require_session(&dashboard)?;
            match command {
                NoteCommands::Add {
                    title,
                    body,
                    tag,
                    pin,
                } => commands::records::add_note(&dashboard, title, body, tag, pin, &output).await,
            }
        }
    }
}

fn require_session(dashboard: &Dashboard) -> Result<()> {
    if !dashboard.session().is_authenticated() {
        bail!("Not signed in. Run `lifedash login --email <EMAIL>` first.");
    }
    Ok(())
}

async fn handle_prefs_command(
    command: Option<PrefsCommands>,
    dashboard: &Dashboard,
    output: &Output,
) -> Result<()> {
    match command {
        Some(PrefsCommands::Show) | None => commands::prefs::show(dashboard, output),
        Some(PrefsCommands::Theme { theme }) => {
            commands::prefs::set_theme(dashboard, theme, output).await
        }
        Some(PrefsCommands::Sidebar { collapsed }) => {
            commands::prefs::set_sidebar(dashboard, collapsed, output).await
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
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
    fn test_list_filters_from_args() {
        let cli = Cli::parse_from([
            "lifedash", "list", "notes", "--tag", "work", "--pinned", "--sort", "updatedAt",
            "--desc",
        ]);
        let Commands::List { domain, filters } = cli.command else {
            panic!("expected list command");
        };
        assert_eq!(domain, Domain::Notes);

        let query = filters.into_filters().to_query();
        assert!(query.contains(&("tags_like".to_string(), "work".to_string())));
        assert!(query.contains(&("isPinned".to_string(), "true".to_string())));
        assert!(query.contains(&("_order".to_string(), "desc".to_string())));
    }

    #[test]
    fn test_domain_argument_accepts_aliases() {
        let cli = Cli::parse_from(["lifedash", "delete", "voice-memos", "7", "--yes"]);
        let Commands::Delete { domain, id, yes } = cli.command else {
            panic!("expected delete command");
        };
        assert_eq!(domain, Domain::VoiceMemos);
        assert_eq!(id, "7");
        assert!(yes);
    }

    #[test]
    fn test_prefs_sidebar_takes_bool() {
        let cli = Cli::parse_from(["lifedash", "prefs", "sidebar", "true"]);
        assert!(matches!(
            cli.command,
            Commands::Prefs {
                command: Some(PrefsCommands::Sidebar { collapsed: true })
            }
        ));
    }
}
