//! Fixed prompt text and fallback strings sent to / returned from the model.

/// Disclaimer the model is told to append to every analysis.
pub const DISCLAIMER: &str = "Consult with a doctor before making any decisions.";

/// Instruction sent ahead of the image on every analysis request.
pub const ANALYSIS_PROMPT: &str = "
You are a medical practitioner and an expert in analyzing medical-related images for a reputed hospital.
You will be provided with images and must identify anomalies, diseases, or health issues.
Provide detailed findings, next steps, and recommendations.
Include a disclaimer: 'Consult with a doctor before making any decisions.'
If the image is unclear, state 'Unable to determine based on the provided image.'
";

pub const ELI5_PREFIX: &str = "Explain the following information to a five-year-old:\n";

pub const ANALYSIS_FAILED: &str = "Analysis failed.";
pub const EXPLANATION_FAILED: &str = "Explanation failed.";

/// Full ELI5 prompt for `text`.
pub fn eli5_prompt(text: &str) -> String {
    format!("{ELI5_PREFIX}{text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eli5_prompt_exact() {
        assert_eq!(
            eli5_prompt("X"),
            "Explain the following information to a five-year-old:\nX"
        );
    }

    #[test]
    fn test_analysis_prompt_carries_disclaimer() {
        assert!(ANALYSIS_PROMPT.contains(DISCLAIMER));
        assert!(ANALYSIS_PROMPT.contains("Unable to determine based on the provided image."));
    }
}
