//! Command-line interface.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_PER_PAGE: u64 = 300;

/// Crawl small personal websites and archive every unique badge they embed.
#[derive(Parser, Debug)]
#[command(name = "hoard", version, about)]
pub struct Cli {
    /// Config file (TOML, YAML or JSON). Defaults to the platform config dir.
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
    /// More logging (-v debug, -vv trace). Overrides RUST_LOG.
    #[arg(long, short, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Crawl random sites, forever unless a number of rounds is given.
    Crawl {
        #[arg(long)]
        rounds: Option<u64>,
    },
    /// Count archived badges and crawled sites.
    Stats,
    /// Print one archived badge.
    Show { id: u64 },
    /// Case-insensitive search of badge and link URLs.
    Search { text: String },
    /// List archived badges page by page, or a random selection.
    List {
        #[arg(long, default_value_t = 0)]
        page: u64,
        #[arg(long, default_value_t = DEFAULT_PER_PAGE, value_parser = clap::value_parser!(u64).range(1..=1000))]
        per_page: u64,
        /// Random sample instead of a page.
        #[arg(long, num_args = 0..=1, default_missing_value = "300", conflicts_with_all = ["page", "per_page"])]
        random: Option<u64>,
    },
    /// Copy a badge's image file out of the archive.
    Export { id: u64, dest: PathBuf },
    /// Image files that no archived badge refers to.
    Orphans,
}

impl Command {
    /// Whether the command needs to write to the image store.
    pub fn writes(&self) -> bool {
        matches!(self, Self::Crawl { .. })
    }
}
