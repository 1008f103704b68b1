//! Activity label derivation.
//!
//! Labels normally come from the labeling collaborator (a short Title-Case
//! phrase generated by the model); when that collaborator is absent or
//! fails, [`heuristic_label`] derives one locally from the cluster text.
//! Both paths end in [`sanitize_label`], so stored labels are always plain
//! alphanumeric Title-Case, defaulting to `"Activity"`.

use crate::feature::token_list;

/// Strip everything but alphanumerics and spaces, then Title-Case each word.
/// Returns `"Activity"` when nothing survives.
pub fn sanitize_label(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect();

    let label = cleaned
        .split_whitespace()
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ");

    if label.is_empty() {
        "Activity".to_string()
    } else {
        label
    }
}

/// Deterministic local label: the first three non-stopword tokens of the
/// text in order of appearance, Title-Cased.
pub fn heuristic_label(text: &str) -> String {
    let words: Vec<String> = token_list(text)
        .into_iter()
        .take(3)
        .map(|t| title_case_word(&t))
        .collect();
    sanitize_label(&words.join(" "))
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_takes_first_three_tokens_title_cased() {
        assert_eq!(
            heuristic_label("Quarterly Revenue Report Draft"),
            "Quarterly Revenue Report"
        );
    }

    #[test]
    fn heuristic_is_deterministic() {
        let text = "Quarterly Revenue Report Draft";
        let first = heuristic_label(text);
        for _ in 0..10 {
            assert_eq!(heuristic_label(text), first);
        }
    }

    #[test]
    fn heuristic_skips_stopwords() {
        assert_eq!(heuristic_label("the plan for your budget"), "Plan Budget");
    }

    #[test]
    fn heuristic_defaults_when_no_tokens_remain() {
        assert_eq!(heuristic_label(""), "Activity");
        assert_eq!(heuristic_label("a an the"), "Activity");
        assert_eq!(heuristic_label("!!! ???"), "Activity");
    }

    #[test]
    fn sanitize_strips_punctuation_and_recases() {
        assert_eq!(sanitize_label("  q3: budget *review*  "), "Q3 Budget Review");
        assert_eq!(sanitize_label("ALL CAPS LABEL"), "All Caps Label");
    }

    #[test]
    fn sanitize_empty_defaults_to_activity() {
        assert_eq!(sanitize_label(""), "Activity");
        assert_eq!(sanitize_label("@#$%"), "Activity");
    }
}
