//! Pool of previously recorded entry identifiers for the verify workflow.

use std::path::Path;

use anyhow::Context;
use rand::Rng;
use tas_protocol::{TasError, TasResult};

/// Prefix of the lines printed for each entry collected in data-generation mode.
pub const ENTRY_LINE_PREFIX: &str = "REKOR_ENTRY_UUID:";

/// A non-empty, read-only list of entry identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierPool(Vec<String>);

impl IdentifierPool {
    /// Trim and drop blank identifiers; fail if none remain.
    pub fn new(identifiers: impl IntoIterator<Item = String>) -> TasResult<Self> {
        let identifiers: Vec<String> = identifiers
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        if identifiers.is_empty() {
            return Err(TasError::setup(
                "No UUIDs provided. Set REKOR_UUIDS or pass --uuids-file",
            ));
        }
        Ok(Self(identifiers))
    }

    /// Parse a comma-separated list.
    pub fn parse_list(list: &str) -> TasResult<Self> {
        Self::new(list.split(',').map(str::to_string))
    }

    /// Parse one identifier per line, accepting data-generation output lines.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn parse_lines(text: &str) -> TasResult<Self> {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#'))
                .map(|line| line.strip_prefix(ENTRY_LINE_PREFIX).unwrap_or(line))
                .map(str::to_string),
        )
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read identifier file {}", path.display()))?;
        Ok(Self::parse_lines(&text)?)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        // Non-empty by construction.
        &self.0[rng.gen_range(0..self.0.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_list_drops_blanks() {
        let pool = IdentifierPool::parse_list("abc-123, def-456,,").unwrap();
        assert_eq!(pool.0, ["abc-123", "def-456"]);
    }

    #[test]
    fn test_empty_pool_is_setup_error() {
        assert!(matches!(
            IdentifierPool::parse_list(""),
            Err(TasError::Setup(_))
        ));
        assert!(IdentifierPool::parse_list(" , ,").is_err());
    }

    #[test]
    fn test_parse_lines_accepts_generation_output() {
        let text = "# collected\nREKOR_ENTRY_UUID:abc-123\n\nREKOR_ENTRY_UUID:def-456\nghi-789\n";
        let pool = IdentifierPool::parse_lines(text).unwrap();
        assert_eq!(pool.0, ["abc-123", "def-456", "ghi-789"]);
    }

    #[test]
    fn test_single_element_pool_always_chosen() {
        let pool = IdentifierPool::parse_list("abc-123").unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10 {
            assert_eq!(pool.choose(&mut rng), "abc-123");
        }
    }

    #[test]
    fn test_choice_is_deterministic_for_seed() {
        let pool = IdentifierPool::parse_list("a,b,c,d,e,f").unwrap();
        let picks = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..20).map(|_| pool.choose(&mut rng).to_string()).collect::<Vec<_>>()
        };
        assert_eq!(picks(42), picks(42));
    }

    #[test]
    fn test_choice_covers_pool() {
        let pool = IdentifierPool::parse_list("a,b,c").unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(pool.choose(&mut rng).to_string());
        }
        assert_eq!(seen.len(), 3);
    }
}
