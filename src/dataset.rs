//! Directory-backed episode source.
//!
//! A dataset lives under `<root>/<name>/<version>/` (or directly under
//! `<root>/<name>/`) as one or more `.jsonl` shards, one episode per line.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{PreprocessError, Result};
use crate::step::Episode;

const SHARD_EXTENSION: &str = "jsonl";

/// Resolves a dataset name to its on-disk directory.
///
/// If `root/name` contains version directories (`0.1.0`, `1.0.0`, ...) the
/// highest one is returned.
pub fn dataset_to_path(name: &str, root: impl AsRef<Path>) -> Result<PathBuf> {
    let base = root.as_ref().join(name);
    if !base.is_dir() {
        return Err(PreprocessError::DatasetNotFound(base));
    }

    let entries =
        std::fs::read_dir(&base).map_err(|err| PreprocessError::Io(err, base.clone()))?;
    let latest = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let version = parse_version(entry.file_name().to_str()?)?;
            Some((version, entry.path()))
        })
        .max_by(|(a, _), (b, _)| a.cmp(b));

    Ok(match latest {
        Some((_, path)) => path,
        None => base,
    })
}

fn parse_version(name: &str) -> Option<Vec<u64>> {
    name.split('.').map(|part| part.parse().ok()).collect()
}

/// Handle on a resolved dataset directory.
#[derive(Debug, Clone)]
pub struct DatasetReader {
    path: PathBuf,
    shards: Vec<PathBuf>,
}

impl DatasetReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(PreprocessError::DatasetNotFound(path.to_owned()));
        }

        let entries =
            std::fs::read_dir(path).map_err(|err| PreprocessError::Io(err, path.to_owned()))?;
        let mut shards: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == SHARD_EXTENSION))
            .collect();
        shards.sort();

        if shards.is_empty() {
            return Err(PreprocessError::EmptyDataset(path.to_owned()));
        }
        debug!(path = %path.display(), shards = shards.len(), "opened dataset");

        Ok(Self {
            path: path.to_owned(),
            shards,
        })
    }

    /// Resolves `name` under `root` and opens it.
    pub fn from_name(name: &str, root: impl AsRef<Path>) -> Result<Self> {
        Self::open(dataset_to_path(name, root)?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn shards(&self) -> &[PathBuf] {
        &self.shards
    }

    /// Streams every episode across all shards, in shard order.
    pub fn episodes(&self) -> EpisodeIter {
        EpisodeIter {
            shards: self.shards.clone().into_iter(),
            current: None,
        }
    }
}

struct OpenShard {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line: usize,
}

/// Lazy iterator over a dataset's episodes.
///
/// Yields an error for an unreadable shard or a malformed line and then
/// carries on with the next line.
pub struct EpisodeIter {
    shards: std::vec::IntoIter<PathBuf>,
    current: Option<OpenShard>,
}

impl Iterator for EpisodeIter {
    type Item = Result<Episode>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                let path = self.shards.next()?;
                match File::open(&path) {
                    Ok(file) => {
                        debug!(shard = %path.display(), "reading shard");
                        self.current = Some(OpenShard {
                            path,
                            lines: BufReader::new(file).lines(),
                            line: 0,
                        });
                    }
                    Err(err) => return Some(Err(PreprocessError::Io(err, path))),
                }
            }
            let Some(shard) = self.current.as_mut() else {
                continue;
            };

            let Some(line) = shard.lines.next() else {
                self.current = None;
                continue;
            };
            shard.line += 1;

            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    let path = shard.path.clone();
                    self.current = None;
                    return Some(Err(PreprocessError::Io(err, path)));
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            return Some(serde_json::from_str(&line).map_err(|source| {
                PreprocessError::MalformedEpisode {
                    path: shard.path.clone(),
                    line: shard.line,
                    source,
                }
            }));
        }
    }
}
