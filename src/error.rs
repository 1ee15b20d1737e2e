//! Binary Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("archive error")]
    Archive,
    #[display("image store error")]
    Storage,
    #[display("could not set up crawling")]
    Scan,
    #[display("no archive at {}; run `hoard crawl` first", _0.display())]
    MissingArchive(#[error(not(source))] PathBuf),
    #[display("no badge with id {_0}")]
    NotFound(#[error(not(source))] u64),
    #[display("filesystem error")]
    Io,
}
