use std::{fmt, path::PathBuf};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, BufReader};

/// Where detection frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Stdin,
    File(PathBuf),
}

impl FeedSource {
    /// `-` means stdin, anything else is a path.
    pub fn parse(value: &str) -> Self {
        if value == "-" {
            FeedSource::Stdin
        } else {
            FeedSource::File(PathBuf::from(value))
        }
    }

    pub async fn open(&self) -> Result<Box<dyn AsyncBufRead + Send + Unpin>> {
        match self {
            FeedSource::Stdin => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
            FeedSource::File(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .with_context(|| format!("failed to open detection feed {}", path.display()))?;
                Ok(Box::new(BufReader::new(file)))
            }
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedSource::Stdin => f.write_str("stdin"),
            FeedSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}
