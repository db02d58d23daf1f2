


use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_ALNUM: Regex = Regex::new(r"[^\p{L}\p{N}]+").expect("static regex");
}


#[inline]
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}


#[inline]
pub fn safe_truncate_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Lowercases a title and collapses every run of non-alphanumeric characters
/// into a single space.
pub fn normalize_title(title: &str) -> String {
    NON_ALNUM
        .replace_all(&title.to_lowercase(), " ")
        .trim()
        .to_string()
}

/// Sørensen-Dice similarity of the two titles' character bigrams, after
/// normalisation. Titles with nothing left to compare score 0.0.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (normalize_title(a), normalize_title(b));
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::sorensen_dice(&a, &b)
}
