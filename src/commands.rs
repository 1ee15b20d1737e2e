//! What each subcommand does, once configuration is loaded.

use crate::cli::Command;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use hoard_archive::{Artifact, ArtifactStore, Database, OriginLedger};
use hoard_config::Config;
use hoard_crawl::Crawler;
use hoard_scan::{BadgeUrlShape, HttpDiscovery, HttpScanner};
use hoard_storage::BackendHandle;
use hoard_storage::backend::{LocalBackend, ReadOnlyBackend};
use std::path::Path;
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub async fn run(config: &Config, command: Command) -> Result<()> {
    let db = open_archive(config, command.writes()).await?;
    let result = dispatch(config, &db, command).await;
    db.close().await;
    result
}

/// Only writing commands may create the data directory and database.
async fn open_archive(config: &Config, writable: bool) -> Result<Database> {
    let database = config.database_path();
    if !writable {
        if !tokio::fs::try_exists(&database).await.or_raise(|| ErrorKind::Io)? {
            exn::bail!(ErrorKind::MissingArchive(database));
        }
        return Database::connect_read_only(&database).await.or_raise(|| ErrorKind::Archive);
    }
    tokio::fs::create_dir_all(&config.data_dir).await.or_raise(|| ErrorKind::Io)?;
    if let Some(parent) = database.parent() {
        tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Io)?;
    }
    Database::connect(&database).await.or_raise(|| ErrorKind::Archive)
}

async fn dispatch(config: &Config, db: &Database, command: Command) -> Result<()> {
    let backend = image_store(config, command.writes())?;
    let store = ArtifactStore::open(db, backend).await.or_raise(|| ErrorKind::Archive)?;
    let ledger = OriginLedger::from(db);
    match command {
        Command::Crawl { rounds } => crawl(config, store, ledger, rounds).await,
        Command::Stats => {
            let artifacts = store.count().await.or_raise(|| ErrorKind::Archive)?;
            let origins = ledger.count().await.or_raise(|| ErrorKind::Archive)?;
            println!("{artifacts} badges from {origins} sites");
            Ok(())
        },
        Command::Show { id } => {
            let artifact = store.get(id).await.or_raise(|| ErrorKind::Archive)?.ok_or_raise(|| ErrorKind::NotFound(id))?;
            print_artifact(&artifact);
            Ok(())
        },
        Command::Search { text } => {
            store.search(&text).await.or_raise(|| ErrorKind::Archive)?.iter().for_each(print_artifact);
            Ok(())
        },
        Command::List { random: Some(n), .. } => {
            store.sample(n).await.or_raise(|| ErrorKind::Archive)?.iter().for_each(print_artifact);
            Ok(())
        },
        Command::List { page, per_page, random: None } => {
            let offset = page.saturating_mul(per_page);
            store.page(per_page, offset).await.or_raise(|| ErrorKind::Archive)?.iter().for_each(print_artifact);
            Ok(())
        },
        Command::Export { id, dest } => export(&store, id, &dest).await,
        Command::Orphans => {
            for file in store.orphans().await.or_raise(|| ErrorKind::Archive)? {
                println!("{}\t{}", file.path.display(), file.size);
            }
            Ok(())
        },
    }
}

/// The image directory; wrapped read-only unless the command stores images.
fn image_store(config: &Config, writable: bool) -> Result<BackendHandle> {
    let local: BackendHandle =
        Arc::new(LocalBackend::new("images", config.images_path()).or_raise(|| ErrorKind::Storage)?);
    Ok(if writable { local } else { Arc::new(ReadOnlyBackend::new(local)) })
}

async fn crawl(config: &Config, store: ArtifactStore, ledger: OriginLedger, rounds: Option<u64>) -> Result<()> {
    let client = hoard_scan::http::client(&config.http).or_raise(|| ErrorKind::Scan)?;
    let discovery = HttpDiscovery::new(client.clone(), &config.discovery).or_raise(|| ErrorKind::Scan)?;
    let scanner = HttpScanner::new(client, &config.scan);
    let crawler = Crawler::new(store, ledger, Arc::new(discovery), Arc::new(scanner), Arc::new(BadgeUrlShape))
        .with_backoff(config.crawl.backoff());
    match rounds {
        Some(rounds) => {
            let total = crawler.rounds(rounds).await;
            println!("{total}");
            Ok(())
        },
        None => match crawler.run().await {},
    }
}

async fn export(store: &ArtifactStore, id: u64, dest: &Path) -> Result<()> {
    let artifact = store.get(id).await.or_raise(|| ErrorKind::Archive)?.ok_or_raise(|| ErrorKind::NotFound(id))?;
    let bytes = store.read(&artifact).await.or_raise(|| ErrorKind::Storage)?;
    tokio::fs::write(dest, &bytes).await.or_raise(|| ErrorKind::Io)?;
    tracing::info!(id, dest = %dest.display(), bytes = bytes.len(), "Exported badge");
    Ok(())
}

fn print_artifact(artifact: &Artifact) {
    let discovered = OffsetDateTime::from(artifact.discovered_at)
        .format(&Rfc3339)
        .unwrap_or_else(|_| artifact.discovered_at.unix_timestamp().to_string());
    println!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        artifact.id, discovered, artifact.filename, artifact.source_url, artifact.link_target, artifact.content_hash
    );
}
