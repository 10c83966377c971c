//! Script-counting language fallback.
//!
//! Used only when the provider reported no language and the caller
//! asked for auto detection. Counts Latin letters against CJK unified
//! ideographs; everything else defaults to English.

/// Detect the dominant language of a transcript text.
pub fn detect_language(text: &str) -> &'static str {
    let mut latin: usize = 0;
    let mut cjk: usize = 0;
    let mut total: usize = 0;

    for c in text.chars() {
        if c.is_whitespace() {
            continue;
        }
        total += 1;
        if c.is_ascii_alphabetic() {
            latin += 1;
        } else if ('\u{4E00}'..='\u{9FFF}').contains(&c) {
            cjk += 1;
        }
    }

    if total == 0 {
        return "en";
    }

    let latin_ratio = latin as f64 / total as f64;
    let cjk_ratio = cjk as f64 / total as f64;

    if latin_ratio > 0.5 || (latin > 2 * cjk && latin > 100) {
        "en"
    } else if cjk_ratio > 0.3 || cjk > 50 {
        "zh"
    } else {
        "en"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mostly_latin_is_english() {
        let latin: String = "a".repeat(200);
        let text = format!("{}你好吗今天", latin);
        assert_eq!(detect_language(&text), "en");
    }

    #[test]
    fn test_mostly_cjk_is_chinese() {
        let text = "今天我们来聊一聊播客转写的问题".repeat(5);
        assert_eq!(detect_language(&text), "zh");
    }

    #[test]
    fn test_cjk_count_threshold() {
        // Over 50 ideographs wins even when diluted with digits.
        let text = format!("{}{}", "汉".repeat(60), "1234567890".repeat(20));
        assert_eq!(detect_language(&text), "zh");
    }

    #[test]
    fn test_empty_defaults_english() {
        assert_eq!(detect_language(""), "en");
        assert_eq!(detect_language("   \n"), "en");
    }

    #[test]
    fn test_punctuation_only_defaults_english() {
        assert_eq!(detect_language("... --- !!!"), "en");
    }
}
