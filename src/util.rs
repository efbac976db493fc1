use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use sha2::{Digest, Sha256};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn sha256_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub fn non_whitespace_char_count(text: &str) -> usize {
    text.chars()
        .filter(|character| !character.is_whitespace())
        .count()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Byte index of the char boundary closest to `fraction` of the text.
pub fn char_boundary_at_fraction(text: &str, fraction: f64) -> usize {
    let target = ((text.len() as f64) * fraction.clamp(0.0, 1.0)) as usize;
    let mut index = target.min(text.len());
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_bytes_matches_known_digest() {
        assert_eq!(
            sha256_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn char_boundary_at_fraction_never_splits_multibyte_chars() {
        let text = "فهرس المحتويات";
        for step in 0..=10 {
            let index = char_boundary_at_fraction(text, step as f64 / 10.0);
            assert!(text.is_char_boundary(index));
        }
    }

    #[test]
    fn collapse_whitespace_joins_runs_of_blank_space() {
        assert_eq!(collapse_whitespace("  a\n\n b\tc  "), "a b c");
    }
}
