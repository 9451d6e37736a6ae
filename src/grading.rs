//! Keyword-overlap grading of free-text recall responses.
//!
//! A deliberately simple rule-based grader: normalize both texts, split into
//! word sets and score by the share of the reference answer's words that
//! appear in the response. The surrounding interface maps the score onto the
//! discrete grade the engine consumes.

use crate::fsrs::Grade;

fn normalize_words(text: &str) -> std::collections::HashSet<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(|w| w.to_string())
        .collect()
}

/// Fraction of the reference answer's keywords present in the response, in
/// `[0, 1]`. An empty reference answer scores 1.0 only against an empty
/// response.
pub fn overlap_score(user_response: &str, correct_answer: &str) -> f64 {
    let response_words = normalize_words(user_response);
    let answer_words = normalize_words(correct_answer);

    if answer_words.is_empty() {
        return if response_words.is_empty() { 1.0 } else { 0.0 };
    }

    let matching = answer_words.intersection(&response_words).count();
    (matching as f64 / answer_words.len() as f64).min(1.0)
}

/// Maps an overlap score onto a recall grade.
pub fn score_to_grade(score: f64) -> Grade {
    if score >= 0.9 {
        Grade::Easy
    } else if score >= 0.6 {
        Grade::Good
    } else if score >= 0.3 {
        Grade::Hard
    } else {
        Grade::Again
    }
}
