use quiz_core::model::percentage;

/// Message offered to the OS share sheet after a quiz.
#[must_use]
pub fn share_text(theme_title: &str, score: u32, total: u32) -> String {
    format!(
        "I completed the \"{theme_title}\" quiz with a score of {score}/{total} ({}%)! Try to beat me in PerúQuiz!",
        percentage(score, total)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_text_includes_score_and_rounded_percentage() {
        assert_eq!(
            share_text("Historia del Perú", 2, 3),
            "I completed the \"Historia del Perú\" quiz with a score of 2/3 (67%)! Try to beat me in PerúQuiz!"
        );
    }

    #[test]
    fn share_text_handles_perfect_and_empty_scores() {
        assert!(share_text("Fauna", 5, 5).contains("5/5 (100%)"));
        assert!(share_text("Fauna", 0, 4).contains("0/4 (0%)"));
    }
}
