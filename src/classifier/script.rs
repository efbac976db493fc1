use super::*;

/// Maps a classifier language code to a script. Only the two languages the
/// pipeline has heuristics for are recognised.
pub fn script_for_code(code: &str) -> Option<Script> {
    match code {
        "ara" | "ar" => Some(Script::ArabicLike),
        "eng" | "en" => Some(Script::LatinLike),
        _ => None,
    }
}

/// Builds the classifier sample: pages past the front matter, whitespace
/// collapsed, cut to `sample_chars` characters.
pub fn quick_sample(sample: &[PageText], config: &ScriptConfig) -> String {
    let skip = config.skip_front_pages as usize;
    let body = if sample.len() > skip {
        &sample[skip..]
    } else {
        sample
    };

    let joined = body
        .iter()
        .map(|page| page.text.as_str())
        .collect::<Vec<&str>>()
        .join(" ");
    collapse_whitespace(&joined)
        .chars()
        .take(config.sample_chars)
        .collect()
}

/// Raw quick-detection verdict, before the confidence bar is applied. An
/// unrecognised language code comes back with zero confidence.
pub fn quick_detect(
    sample: &[PageText],
    classifier: &dyn QuickClassifier,
    config: &ScriptConfig,
) -> Option<ScriptClassification> {
    let text = quick_sample(sample, config);
    if text.is_empty() {
        return None;
    }

    let guess = classifier.detect(&text)?;
    let classification = match script_for_code(&guess.code) {
        Some(script) => ScriptClassification {
            script,
            confidence: guess.confidence.clamp(0.0, 1.0),
            source: ScriptSource::QuickClassifier,
        },
        None => {
            warn!(code = %guess.code, "unexpected language code; treating as low confidence");
            ScriptClassification {
                script: Script::LatinLike,
                confidence: 0.0,
                source: ScriptSource::QuickClassifier,
            }
        }
    };

    debug!(
        code = %guess.code,
        script = classification.script.as_str(),
        confidence = classification.confidence,
        "quick script detection"
    );
    Some(classification)
}

/// Ratio of Arabic code points to non-whitespace characters.
pub fn legacy_detect(text: &str, source: ScriptSource, threshold: f64) -> ScriptClassification {
    let ratio = arabic_ratio(text);
    if ratio > threshold {
        ScriptClassification {
            script: Script::ArabicLike,
            confidence: ratio,
            source,
        }
    } else {
        ScriptClassification {
            script: Script::LatinLike,
            confidence: 1.0 - ratio,
            source,
        }
    }
}
