use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use feedreader::app::Reader;
use feedreader::config::Config;
use feedreader::feed::{FeedSource, HttpSource, StubSource};
use feedreader::util::{display_width, truncate_to_width};

/// Get the config directory path (~/.config/feedreader/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("feedreader"))
}

#[derive(Parser, Debug)]
#[command(name = "feedreader", about = "Load and print entries from configured RSS/Atom feeds")]
struct Args {
    /// Config file (default: ~/.config/feedreader/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// List configured feeds and exit
    #[arg(long)]
    list: bool,

    /// Index of the feed to load (see --list)
    #[arg(long, default_value_t = 0)]
    feed: usize,

    /// Use generated entries instead of fetching over the network
    #[arg(long)]
    offline: bool,

    /// Print the displayed feed as JSON
    #[arg(long)]
    json: bool,

    /// Maximum output line width in columns
    #[arg(long, default_value_t = 100)]
    width: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => get_config_dir()?.join("config.toml"),
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let registry = config
        .build_registry()
        .await
        .context("Failed to build feed list")?;

    if args.list {
        for (index, feed) in registry.iter() {
            println!("{:>3}  {}", index, feed);
        }
        return Ok(());
    }

    if args.offline {
        let source = StubSource::new(config.entries_per_stub_feed);
        show(Reader::new(registry, source), &args).await
    } else {
        let source = HttpSource::from_config(&config).context("Failed to create HTTP client")?;
        show(Reader::new(registry, source), &args).await
    }
}

async fn show<S: FeedSource>(mut reader: Reader<S>, args: &Args) -> Result<()> {
    let summary = reader
        .select_feed(args.feed)?
        .await
        .with_context(|| format!("Failed to load feed {}", args.feed))?;
    tracing::info!(
        feed = %summary.feed_name,
        entries = summary.entries,
        "Feed loaded"
    );

    let displayed = reader.loader().displayed();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&*displayed)?);
        return Ok(());
    }

    let width = args.width.max(8);
    println!("{}", truncate_to_width(&displayed.title, width));
    println!("{}", "=".repeat(display_width(&displayed.title).min(width)));
    for entry in &displayed.entries {
        println!("- {}", truncate_to_width(&entry.title, width - 2));
        if let Some(link) = &entry.link {
            println!("  {}", truncate_to_width(link, width - 2));
        }
        if let Some(published) = entry.published {
            println!("  {}", published.format("%Y-%m-%d %H:%M UTC"));
        }
        if let Some(snippet) = &entry.snippet {
            println!("  {}", truncate_to_width(snippet, width - 2));
        }
    }

    Ok(())
}
