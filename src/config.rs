use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Rs3Error, Rs3Result};

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Settings for one run, independent of how they were supplied.
///
/// Loaded from an optional JSON file, then overridden by command line flags.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory searched recursively for `.rs3` files.
    pub base_dir: PathBuf,

    /// Where tables are written and read back; `None` means `base_dir`.
    pub output_dir: Option<PathBuf>,

    /// Separator between site and specimen in sample names.
    pub site_delimiter: char,

    /// Fail a table whose sites are not contiguous instead of emitting
    /// the split groups.
    pub strict_sites: bool,

    /// Number of log-spaced bin edges for the intensity histogram.
    pub histogram_bins: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            output_dir: None,
            site_delimiter: '-',
            strict_sites: false,
            histogram_bins: 50,
        }
    }
}

impl Config {
    /// Read a JSON config file. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Rs3Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Rs3Error::io(path, e))?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| Rs3Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn output_dir(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(&self.base_dir)
    }

    pub fn validate(&self) -> Rs3Result<()> {
        if self.site_delimiter.is_whitespace() || self.site_delimiter == ',' {
            return Err(Rs3Error::Config(format!(
                "site delimiter {:?} clashes with the table format",
                self.site_delimiter
            )));
        }
        if self.histogram_bins < 2 {
            return Err(Rs3Error::Config(format!(
                "histogram needs at least 2 bin edges, got {}",
                self.histogram_bins
            )));
        }
        Ok(())
    }
}

/// Parse a site delimiter given on the command line; exactly one character.
pub fn parse_delimiter(s: &str) -> Result<char, String> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("expected a single character, got {s:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.site_delimiter, '-');
        assert_eq!(config.output_dir(), Path::new("."));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json_overrides_some_keys() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"site_delimiter": "_", "output_dir": "out"}}"#).unwrap();
        let config = Config::from_json_file(file.path()).unwrap();
        assert_eq!(config.site_delimiter, '_');
        assert_eq!(config.output_dir(), Path::new("out"));
        assert_eq!(config.histogram_bins, 50);
    }

    #[test]
    fn json_rejects_bad_values() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"site_delimiter": "--"}}"#).unwrap();
        assert!(matches!(
            Config::from_json_file(file.path()),
            Err(Rs3Error::Config(_))
        ));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"site_delimiter": ","}}"#).unwrap();
        assert!(Config::from_json_file(file.path()).is_err());
    }

    #[test]
    fn delimiter_must_be_one_char() {
        assert_eq!(parse_delimiter("-"), Ok('-'));
        assert_eq!(parse_delimiter("é"), Ok('é'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
    }
}
