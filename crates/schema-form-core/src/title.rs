//! Title casing for labels derived from property names.
//!
//! Words are capitalized except small words (articles, short prepositions and
//! conjunctions), which stay lowercase unless they open or close the title,
//! follow a colon, or are glued to a neighbour. Mixed-case input keeps words
//! that already carry internal capitals (`iPhone`, `firstName`) untouched.

use std::sync::LazyLock;

use regex::Regex;

const SMALL_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "en", "for", "if", "in", "nor", "of", "on", "or",
    "per", "the", "to", "v", "v.", "vs", "vs.", "via",
];

static WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9\x{00C0}-\x{00FF}]+[^\s-]*").expect("word pattern is a valid regex")
});

/// Title-case `input` with the default small-word list.
///
/// # Example
/// ```
/// use schema_form_core::title::to_title_case;
/// assert_eq!(to_title_case("the lord of the rings"), "The Lord of the Rings");
/// ```
pub fn to_title_case(input: &str) -> String {
    to_title_case_with(input, &[])
}

/// Title-case `input`, forcing `force_words` to the given spelling
/// (e.g. `"API"`) in addition to the small-word list.
pub fn to_title_case_with(input: &str, force_words: &[&str]) -> String {
    let word_re = &*WORD;
    let no_initial_case = input == input.to_uppercase() || input == input.to_lowercase();
    let input = input.trim();

    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    let mut prev_last_char = None;
    for m in word_re.find_iter(input) {
        out.push_str(&input[last..m.start()]);
        last = m.end();
        let word = m.as_str();
        let rest = tail(word);

        if !no_initial_case && (rest.chars().any(|c| c.is_ascii_uppercase()) || has_inner_dot(rest)) {
            out.push_str(word);
            continue;
        }

        let forced = SMALL_WORDS
            .iter()
            .chain(force_words.iter())
            .find(|w| w.to_lowercase() == word.to_lowercase());
        let new_word = match forced {
            None if no_initial_case && has_inner_dot(rest) => word.to_lowercase(),
            None if no_initial_case => capitalize(&word.to_lowercase()),
            None => capitalize(word),
            Some(force) if *force == force.to_lowercase() => {
                let before = input[..m.start()].chars().next_back();
                let after = input[m.end()..].chars().next();
                let promote = m.start() == 0
                    || m.end() == input.len()
                    || prev_last_char == Some(':')
                    || before.is_some_and(|c| !c.is_whitespace() && c != '-')
                    || (before != Some('-') && after == Some('-'));
                if promote {
                    capitalize(force)
                } else {
                    force.to_string()
                }
            }
            Some(force) => force.to_string(),
        };
        prev_last_char = word.chars().next_back();
        out.push_str(&new_word);
    }
    out.push_str(&input[last..]);
    out
}

fn tail(word: &str) -> &str {
    word.char_indices().nth(1).map_or("", |(i, _)| &word[i..])
}

/// A `.` followed by another character, as in `e.g.` or `example.com`.
fn has_inner_dot(s: &str) -> bool {
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '.' && chars.peek().is_some_and(|n| *n != '\n') {
            return true;
        }
    }
    false
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_small_words_stay_lowercase_inside() {
        assert_eq!(to_title_case("the lord of the rings"), "The Lord of the Rings");
        assert_eq!(to_title_case("terms of use"), "Terms of Use");
        assert_eq!(to_title_case("in"), "In");
    }

    #[test]
    fn test_uniform_case_input_is_normalized() {
        assert_eq!(to_title_case("FIRST NAME"), "First Name");
        assert_eq!(to_title_case("street address"), "Street Address");
        assert_eq!(to_title_case("  padded  "), "Padded");
    }

    #[test]
    fn test_mixed_case_words_with_capitals_are_kept() {
        assert_eq!(to_title_case("firstName"), "firstName");
        assert_eq!(to_title_case("my iPhone case"), "My iPhone Case");
    }

    #[test]
    fn test_colon_promotes_small_word() {
        assert_eq!(to_title_case("Star Wars: the empire"), "Star Wars: The Empire");
    }

    #[test]
    fn test_force_words() {
        assert_eq!(to_title_case_with("api key", &["API"]), "API Key");
    }
}
