// src/utils.rs

/// Length in characters, which is what every acceptance threshold counts.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Collapse all whitespace runs (including newlines) into single spaces.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trim every line, collapse inner whitespace and drop blank lines,
/// keeping the line structure (list markers stay on their own lines).
pub fn normalize_lines(text: &str) -> String {
    text.lines()
        .map(clean_text)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut `text` to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// True when `host` is `domain` itself or one of its subdomains.
pub fn host_matches(host: &str, domain: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let domain = domain.trim_start_matches('.').to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{}", domain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Senior\n\n  Rust   engineer "), "Senior Rust engineer");
        assert_eq!(clean_text("\t\n"), "");
    }

    #[test]
    fn test_normalize_lines() {
        let raw = "  About us \n\n\n- Build   things\n   \n- Ship them  ";
        assert_eq!(normalize_lines(raw), "About us\n- Build things\n- Ship them");
    }

    #[test]
    fn test_truncate_chars_respects_code_points() {
        assert_eq!(truncate_chars("expérience", 4), "expé");
        assert_eq!(truncate_chars("short", 50), "short");
        assert_eq!(char_len("expérience"), 10);
    }

    #[test]
    fn test_host_matches() {
        assert!(host_matches("www.linkedin.com", "linkedin.com"));
        assert!(host_matches("linkedin.com", "linkedin.com"));
        assert!(host_matches("FR.Indeed.com", "indeed.com"));
        assert!(!host_matches("notlinkedin.com", "linkedin.com"));
        assert!(!host_matches("linkedin.com.evil.io", "linkedin.com"));
    }
}
