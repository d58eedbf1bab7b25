//! TeloView - Local Video Course Browser
//!
//! Indexes a message channel into modules and lessons and serves it to the
//! browser with range-capable streaming.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use teloview::{
    config::{SourceConfig, TeloViewConfig},
    library::{CourseEntry, CourseLibrary},
    server::{ctrl_c, ServerBuilder},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "teloview")]
#[command(version)]
#[command(about = "Browse and stream a channel-hosted video course locally")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "TELOVIEW_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Serve a local course directory (messages.json + media files)
    #[arg(long, conflicts_with = "mirror")]
    dir: Option<PathBuf>,

    /// Base URL of an HTTP message gateway
    #[arg(long, requires = "channel")]
    mirror: Option<String>,

    /// Channel link, username or numeric id
    #[arg(long)]
    channel: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a channel and serve it
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// First port to try
        #[arg(long)]
        port: Option<u16>,

        #[command(flatten)]
        source: SourceArgs,

        /// Do not open a browser window
        #[arg(long)]
        no_browser: bool,
    },

    /// Serve a course from the library
    Open {
        /// Keyword matched against course id, title and author
        keyword: String,

        /// Which match to open when several courses match (1-based)
        #[arg(long)]
        pick: Option<usize>,

        /// Do not open a browser window
        #[arg(long)]
        no_browser: bool,
    },

    /// Register a course in the library
    Add {
        /// Short course id
        id: String,

        /// Course title
        #[arg(long)]
        title: String,

        /// Course author
        #[arg(long, default_value = "")]
        author: String,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Remove a course from the library
    Remove {
        /// Course id
        id: String,
    },

    /// List courses in the library
    List,

    /// Save a gateway token for later sessions
    Login {
        /// Bearer token
        #[arg(long, env = "TELOVIEW_TOKEN", hide_env_values = true)]
        token: String,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("teloview={},tower_http={}", log_level, log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        TeloViewConfig::from_file(config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?
    } else {
        TeloViewConfig::default()
    };

    match cli.command {
        Commands::Serve {
            host,
            port,
            source,
            no_browser,
        } => {
            let mut config = config;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(source) = source_from_args(source)? {
                config.source = source;
            }
            if no_browser {
                config.server.open_browser = false;
            }
            run_server(config).await?;
        }
        Commands::Open {
            keyword,
            pick,
            no_browser,
        } => {
            let mut config = config;
            config.source = pick_course(&config, &keyword, pick)?;
            if no_browser {
                config.server.open_browser = false;
            }
            run_server(config).await?;
        }
        Commands::Add {
            id,
            title,
            author,
            source,
        } => {
            let Some(source) = source_from_args(source)? else {
                bail!("Give the course source with --dir or --mirror/--channel");
            };
            let mut library = CourseLibrary::load(&config.storage.courses_file)?;
            library.add(
                &id,
                CourseEntry {
                    title,
                    author,
                    source,
                    added_at: chrono::Utc::now(),
                },
            )?;
            library.save()?;
            println!("Added '{}' to {}", id.trim(), library.path().display());
        }
        Commands::Remove { id } => {
            let mut library = CourseLibrary::load(&config.storage.courses_file)?;
            if library.remove(&id).is_none() {
                bail!("No course '{}' in the library", id);
            }
            library.save()?;
            println!("Removed '{}'", id);
        }
        Commands::List => {
            let library = CourseLibrary::load(&config.storage.courses_file)?;
            if library.is_empty() {
                println!("Library is empty. Add a course with `teloview add`.");
            }
            for (id, entry) in library.list() {
                print_entry(id, entry);
            }
        }
        Commands::Login { token } => {
            save_session(&config, &token)?;
            println!("Token saved to {}", config.storage.session_file.display());
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

async fn run_server(config: TeloViewConfig) -> Result<()> {
    let server = ServerBuilder::new().config(config).build()?;
    server.run(ctrl_c()).await?;
    Ok(())
}

fn source_from_args(args: SourceArgs) -> Result<Option<SourceConfig>> {
    match (args.dir, args.mirror, args.channel) {
        (Some(dir), None, _) => Ok(Some(SourceConfig::Local { dir })),
        (None, Some(base_url), Some(channel)) => Ok(Some(SourceConfig::Http {
            base_url,
            channel,
            token_env: "TELOVIEW_TOKEN".to_string(),
        })),
        (None, None, Some(_)) => bail!("--channel needs --mirror"),
        (None, None, None) => Ok(None),
        _ => bail!("Use either --dir or --mirror/--channel"),
    }
}

fn pick_course(
    config: &TeloViewConfig,
    keyword: &str,
    pick: Option<usize>,
) -> Result<SourceConfig> {
    let library = CourseLibrary::load(&config.storage.courses_file)?;
    let matches = library.search(keyword);

    let (id, entry) = match (matches.len(), pick) {
        (0, _) => bail!("No course matches '{}'", keyword),
        (1, _) => matches[0],
        (_, Some(n)) if (1..=matches.len()).contains(&n) => matches[n - 1],
        (count, _) => {
            println!("{} courses match '{}':", count, keyword);
            for (i, (id, entry)) in matches.iter().enumerate() {
                print!("  {}. ", i + 1);
                print_entry(id, entry);
            }
            bail!("Several courses match; rerun with --pick N");
        }
    };

    tracing::info!("Opening '{}' ({})", entry.title, id);
    Ok(entry.source.clone())
}

fn print_entry(id: &str, entry: &CourseEntry) {
    if entry.author.is_empty() {
        println!("{:<12} {}", id, entry.title);
    } else {
        println!("{:<12} {} by {}", id, entry.title, entry.author);
    }
}

fn save_session(config: &TeloViewConfig, token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        bail!("Token is empty");
    }
    let path = &config.storage.session_file;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, token).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn show_config(config: Option<&TeloViewConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
