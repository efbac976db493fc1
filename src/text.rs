use anyhow::{Context, Result};
use regex::Regex;

use crate::util::non_whitespace_char_count;

/// Maps Arabic-Indic (U+0660..) and Eastern Arabic-Indic (U+06F0..) digits to ASCII.
pub fn normalize_digit(character: char) -> char {
    match character {
        '\u{0660}'..='\u{0669}' => {
            char::from(b'0' + (character as u32 - 0x0660) as u8)
        }
        '\u{06F0}'..='\u{06F9}' => {
            char::from(b'0' + (character as u32 - 0x06F0) as u8)
        }
        other => other,
    }
}

pub fn normalize_digits(input: &str) -> String {
    input.chars().map(normalize_digit).collect()
}

/// Parses a page number written in any supported digit script.
pub fn parse_page_number(input: &str) -> Option<u32> {
    let normalized = normalize_digits(input.trim());
    if normalized.is_empty() || !normalized.chars().all(|character| character.is_ascii_digit()) {
        return None;
    }
    normalized.parse::<u32>().ok()
}

pub fn is_digit_only(input: &str) -> bool {
    let trimmed = input.trim();
    !trimmed.is_empty() && trimmed.chars().all(|character| normalize_digit(character).is_ascii_digit())
}

pub fn is_arabic_char(character: char) -> bool {
    matches!(character as u32, 0x0600..=0x06FF)
}

/// Share of non-whitespace characters that fall in the core Arabic block.
pub fn arabic_ratio(text: &str) -> f64 {
    let total = non_whitespace_char_count(text);
    if total == 0 {
        return 0.0;
    }
    let arabic = text.chars().filter(|character| is_arabic_char(*character)).count();
    arabic as f64 / total as f64
}

/// Strips harakat and tatweel, maps Arabic punctuation and digits to ASCII,
/// and collapses whitespace.
pub fn normalize_arabic(input: &str) -> String {
    let mapped = input
        .chars()
        .filter(|character| {
            !matches!(
                *character,
                '\u{064B}'..='\u{0655}' | '\u{0670}' | '\u{0640}'
            )
        })
        .map(|character| match character {
            '\u{060C}' => ',',
            '\u{061B}' => ';',
            '\u{061F}' => '?',
            '\u{06D4}' => '.',
            other => normalize_digit(other),
        })
        .collect::<String>();

    mapped.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Running headers, footers and print-shop noise. Inside a table of
/// contents only the print-shop patterns apply, since bare numbers there are
/// page references.
pub struct HeaderFooterFilter {
    toc_context: Vec<Regex>,
    body_context: Vec<Regex>,
}

impl HeaderFooterFilter {
    pub fn new() -> Result<Self> {
        let timestamp = r"^\d{1,2}/\d{1,2}/\d{2,4}\s+\d{1,2}:\d{2}";
        let indesign = r"^[\w\s]+\.indd\s+\d+$";
        let copyright = r"^©";

        Ok(Self {
            toc_context: compile_line_patterns(&[timestamp, indesign, copyright])?,
            body_context: compile_line_patterns(&[
                timestamp,
                indesign,
                r"^صفحة\s*\d+$",
                r"^ص\s*\d+$",
                r"^\d+\s*$",
                r"^page\s+\d+$",
                r"^الطبعة",
                copyright,
                r"^\d{4}\s*هـ",
                r"^\d{4}\s*م",
                r"^ISBN",
                r"^ردمك",
            ])?,
        })
    }

    pub fn is_header_footer(&self, line: &str, in_toc_context: bool) -> bool {
        let line = line.trim();
        let patterns = if in_toc_context {
            &self.toc_context
        } else {
            &self.body_context
        };

        let normalized = normalize_digits(line);
        if patterns.iter().any(|pattern| pattern.is_match(&normalized)) {
            return true;
        }

        if line.chars().count() < 2 {
            return !(in_toc_context && is_digit_only(line));
        }

        line.chars().all(|character| !character.is_alphanumeric())
    }
}

fn compile_line_patterns(patterns: &[&str]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(&format!("(?i){pattern}"))
                .with_context(|| format!("failed to compile header/footer pattern {pattern}"))
        })
        .collect()
}
