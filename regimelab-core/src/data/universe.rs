//! Ticker universe file: one symbol per line.
//!
//! Blank lines and `#` comments are ignored, symbols are upper-cased and
//! duplicates dropped, keeping first-seen order.

use std::collections::HashSet;
use std::path::Path;

use super::provider::DataError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    tickers: Vec<String>,
}

impl Universe {
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DataError::Io(format!("read universe file {}: {e}", path.display())))?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let mut seen = HashSet::new();
        let tickers = content
            .lines()
            .map(|line| line.split('#').next().unwrap_or("").trim())
            .filter(|t| !t.is_empty())
            .map(str::to_ascii_uppercase)
            .filter(|t| seen.insert(t.clone()))
            .collect();
        Self { tickers }
    }

    pub fn from_tickers<I, S>(tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined: Vec<String> = tickers
            .into_iter()
            .map(|t| t.as_ref().to_string())
            .collect();
        Self::parse(&joined.join("\n"))
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}
