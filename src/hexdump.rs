// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Recover bytes from human-formatted hex dumps.
// Author: Lukas Bower

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Hex dump could not be scanned.
#[derive(Debug, Clone, Error)]
pub enum HexdumpError {
    /// Built-in pattern failed to compile.
    #[error("hex pattern: {0}")]
    Pattern(#[from] regex::Error),
    /// Collected digits were not valid hex.
    #[error("hex digits: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Compile `source` once into `cell` and hand out the shared regex.
pub(crate) fn pattern(
    cell: &'static OnceLock<Result<Regex, regex::Error>>,
    source: &str,
) -> Result<&'static Regex, HexdumpError> {
    cell.get_or_init(|| Regex::new(source))
        .as_ref()
        .map_err(|err| HexdumpError::Pattern(err.clone()))
}

/// Collect every pair of adjacent hex digits in `text`, in order.
///
/// Separators and lone digits contribute nothing, so
/// `"vendor response: 0a 1B\n"` yields `[0x0a, 0x1b]`. Words with two
/// adjacent hex letters (`"de"` in `"decode"`) do pair up.
pub(crate) fn scan(text: &str) -> Result<Vec<u8>, HexdumpError> {
    static HEX_PAIR: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    let digits: String = pattern(&HEX_PAIR, "[0-9a-fA-F]{2}")?
        .find_iter(text)
        .map(|m| m.as_str())
        .collect();
    Ok(hex::decode(digits)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_digits_across_spacing() {
        assert_eq!(scan(" 05 00 01 00\n 07 00 00 00").expect("scan"), vec![5, 0, 1, 0, 7, 0, 0, 0]);
        assert_eq!(scan("0500010007000000").expect("scan"), vec![5, 0, 1, 0, 7, 0, 0, 0]);
        assert!(scan("").expect("scan").is_empty());
    }

    #[test]
    fn labels_and_lone_digits_are_ignored() {
        assert_eq!(scan("vendor response: 0a 1B").expect("scan"), vec![0x0a, 0x1b]);
        assert_eq!(scan("a 1f : 2").expect("scan"), vec![0x1f]);
    }
}
