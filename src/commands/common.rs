//! Common CLI options shared across commands.
//!
//! This module provides shared argument structures that can be composed into
//! command structs using `#[command(flatten)]`.

use clap::{Args, ValueEnum};

use xsort_lib::sort::{ComparisonMode, SortAlgorithm, TextEncoding};

/// Text comparison mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ComparisonArg {
    /// Code point order
    Ordinal,
    /// Code point order, ignoring case
    OrdinalIgnoreCase,
    /// Linguistic order for the process locale
    Culture,
    /// Linguistic order for the process locale, ignoring case
    CultureIgnoreCase,
    /// Locale-independent linguistic order
    Invariant,
    /// Locale-independent linguistic order, ignoring case
    InvariantIgnoreCase,
}

impl From<ComparisonArg> for ComparisonMode {
    fn from(arg: ComparisonArg) -> Self {
        match arg {
            ComparisonArg::Ordinal => ComparisonMode::Ordinal,
            ComparisonArg::OrdinalIgnoreCase => ComparisonMode::OrdinalIgnoreCase,
            ComparisonArg::Culture => ComparisonMode::Culture,
            ComparisonArg::CultureIgnoreCase => ComparisonMode::CultureIgnoreCase,
            ComparisonArg::Invariant => ComparisonMode::Invariant,
            ComparisonArg::InvariantIgnoreCase => ComparisonMode::InvariantIgnoreCase,
        }
    }
}

/// In-memory chunk sort algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlgorithmArg {
    /// Pattern-defeating quicksort on whole keys
    Comparison,
    /// Three-way radix quicksort
    RadixQuick,
    /// MSD counting radix sort
    CountingRadix,
}

impl From<AlgorithmArg> for SortAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Comparison => SortAlgorithm::Comparison,
            AlgorithmArg::RadixQuick => SortAlgorithm::RadixQuick,
            AlgorithmArg::CountingRadix => SortAlgorithm::CountingRadix,
        }
    }
}

/// How record text is decoded and compared.
#[derive(Debug, Clone, Args)]
pub struct TextOptions {
    /// Text comparison mode.
    #[arg(short = 'c', long = "comparison", value_enum, default_value = "ordinal")]
    pub comparison: ComparisonArg,

    /// Text encoding of the input and output (any WHATWG label, e.g. utf-16le).
    #[arg(short = 'e', long = "encoding", default_value = "utf-8")]
    pub encoding: String,
}

impl TextOptions {
    /// The selected comparison mode.
    pub fn mode(&self) -> ComparisonMode {
        self.comparison.into()
    }

    /// Resolve the encoding label.
    ///
    /// # Errors
    ///
    /// Returns an error for labels `encoding_rs` does not know.
    pub fn text_encoding(&self) -> anyhow::Result<TextEncoding> {
        Ok(TextEncoding::for_label(&self.encoding)?)
    }
}

/// Parse memory size string (e.g., "512M", "1G", "2G").
pub fn parse_memory(s: &str) -> Result<usize, String> {
    let s = s.trim().to_uppercase();

    if s.is_empty() {
        return Err("Empty memory specification".to_string());
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('G') {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix('M') {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix('K') {
        (n, 1024)
    } else {
        // Assume bytes
        (s.as_str(), 1)
    };

    let num: f64 = num_str.parse().map_err(|_| format!("Invalid number: {num_str}"))?;

    if num < 0.0 {
        return Err("Memory size must be positive".to_string());
    }

    Ok((num * f64::from(multiplier)) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memory_megabytes() {
        assert_eq!(parse_memory("512M").unwrap(), 512 * 1024 * 1024);
        assert_eq!(parse_memory("100M").unwrap(), 100 * 1024 * 1024);
    }

    #[test]
    fn test_parse_memory_gigabytes() {
        assert_eq!(parse_memory("1G").unwrap(), 1024 * 1024 * 1024);
    }

    #[test]
    fn test_parse_memory_kilobytes_and_bytes() {
        assert_eq!(parse_memory("64K").unwrap(), 64 * 1024);
        assert_eq!(parse_memory("100000").unwrap(), 100_000);
    }

    #[test]
    fn test_parse_memory_lowercase_and_decimal() {
        assert_eq!(parse_memory("512m").unwrap(), 512 * 1024 * 1024);
        assert_eq!(parse_memory("1.5G").unwrap(), (1.5 * 1024.0 * 1024.0 * 1024.0) as usize);
    }

    #[test]
    fn test_parse_memory_invalid() {
        assert!(parse_memory("").is_err());
        assert!(parse_memory("abc").is_err());
        assert!(parse_memory("-1G").is_err());
    }

    #[test]
    fn test_comparison_conversion() {
        assert_eq!(ComparisonMode::from(ComparisonArg::Ordinal), ComparisonMode::Ordinal);
        assert_eq!(
            ComparisonMode::from(ComparisonArg::InvariantIgnoreCase),
            ComparisonMode::InvariantIgnoreCase
        );
        assert_eq!(SortAlgorithm::from(AlgorithmArg::CountingRadix), SortAlgorithm::CountingRadix);
    }

    #[test]
    fn test_value_enum_names_match_display() {
        for arg in ComparisonArg::value_variants() {
            let name = arg.to_possible_value().unwrap().get_name().to_string();
            assert_eq!(ComparisonMode::from(*arg).to_string(), name);
        }
    }
}
