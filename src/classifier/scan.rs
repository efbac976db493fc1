use super::*;

/// Samples the leading pages and decides whether the text layer can be
/// trusted. Pages whose text looks like decoding garbage count as textless.
pub fn detect_scanned(sample: &[PageText], config: &ScanConfig) -> ScanClassification {
    let mut evidence = ScanEvidence {
        pages_sampled: sample.len(),
        ..ScanEvidence::default()
    };

    for page in sample {
        evidence.total_images += page.image_count as usize;

        let text = page.text.trim();
        if is_garbage_text(text, config) {
            evidence.garbage_pages += 1;
            continue;
        }

        let chars = text.chars().count();
        evidence.total_chars += chars;
        evidence.total_words += word_count(text);
        if chars > config.min_page_chars {
            evidence.pages_with_text += 1;
        }
    }

    evidence.text_page_ratio = if evidence.pages_sampled == 0 {
        0.0
    } else {
        evidence.pages_with_text as f64 / evidence.pages_sampled as f64
    };

    let is_scanned = evidence.total_chars < config.min_chars
        || evidence.total_words < config.min_words
        || evidence.text_page_ratio < config.min_text_page_ratio;

    ScanClassification {
        is_scanned,
        evidence,
    }
}

/// Broken font encodings yield long runs of symbols or unspaced glyph soup.
/// Text shorter than `garbage_min_len` is never judged.
pub fn is_garbage_text(text: &str, config: &ScanConfig) -> bool {
    let text = text.trim();
    let total = text.chars().count();
    if total < config.garbage_min_len {
        return false;
    }

    let alphabetic = text.chars().filter(|character| character.is_alphabetic()).count();
    let alpha_ratio = alphabetic as f64 / total as f64;

    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return true;
    }
    let average_token_len = tokens
        .iter()
        .map(|token| token.chars().count())
        .sum::<usize>() as f64
        / tokens.len() as f64;

    alpha_ratio < config.garbage_alpha_ratio
        || average_token_len < config.garbage_min_token_len
        || average_token_len > config.garbage_max_token_len
}
