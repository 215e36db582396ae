use crate::model::{ContextMode, Grade};
use crate::student::{PlanSet, TranscriptRecord};

/// Formatting instructions shared by every mode. Kept byte-for-byte stable so
/// scores remain comparable across runs.
pub const FORMAT_SUFFIX: &str = "\n\nPlease list 5-8 courses strictly in the following format, with the full name on each line, for example:\nCPS 2232: Data Structure\nMATH 2110: Discrete Structure\n";

const PLAN_ONLY_INSTRUCTION: &str = "\n\nOnly recommend courses that appear in the four-year plan shown above.";

const UNGRADED_LABEL: &str = "Not assigned";

pub fn build_prompt(
    mode: ContextMode,
    question: &str,
    transcript: &TranscriptRecord,
    plan: &PlanSet,
    low_grade_threshold: Grade,
) -> String {
    match mode {
        ContextMode::Full => format!(
            "Student question: \"{question}\"\nMy course history:\n{history}\nMy 4-year plan:\n{plan}\nBased on ALL information, recommend courses.{suffix}",
            history = format_history(transcript),
            plan = format_plan(plan),
            suffix = full_suffix(low_grade_threshold),
        ),
        ContextMode::NoTranscript => format!(
            "\"{question}\"\nMy 4-year plan:\n{plan}\nBased on plan only, recommend courses.{suffix}",
            plan = format_plan(plan),
            suffix = no_transcript_suffix(),
        ),
        ContextMode::NoPlan => format!(
            "\"{question}\"\nMy course history:\n{history}\nBased on history only, recommend courses.{FORMAT_SUFFIX}",
            history = format_history(transcript),
        ),
        ContextMode::Question => format!("{question}{FORMAT_SUFFIX}"),
    }
}

fn full_suffix(low_grade_threshold: Grade) -> String {
    format!(
        "{PLAN_ONLY_INSTRUCTION} Do NOT include any course you have already taken. Prioritize courses where you scored below {low_grade_threshold}.{FORMAT_SUFFIX}"
    )
}

fn no_transcript_suffix() -> String {
    format!(
        "{PLAN_ONLY_INSTRUCTION} You do NOT have access to the student's transcript; it\u{2019}s OK to suggest courses the student may have already taken.{FORMAT_SUFFIX}"
    )
}

fn format_history(transcript: &TranscriptRecord) -> String {
    transcript
        .entries()
        .iter()
        .map(|entry| {
            format!(
                "{} - {}",
                entry.course,
                entry.grade.as_deref().unwrap_or(UNGRADED_LABEL)
            )
        })
        .collect::<Vec<String>>()
        .join("\n")
}

fn format_plan(plan: &PlanSet) -> String {
    plan.courses().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> (TranscriptRecord, PlanSet) {
        let mut transcript = TranscriptRecord::new();
        transcript.record("CPS 1231: Fundamentals of CS", Some("A"));
        transcript.record("CPS 2231: Computer Programming", None);
        let plan = PlanSet::from_lines(["CPS 2232: Data Structure", "MATH 2110: Discrete Structure"]);
        (transcript, plan)
    }

    #[test]
    fn full_prompt_matches_reference_text() {
        let (transcript, plan) = fixtures();
        let prompt = build_prompt(
            ContextMode::Full,
            "What should I take next?",
            &transcript,
            &plan,
            Grade::BMinus,
        );

        let expected = "Student question: \"What should I take next?\"\n\
My course history:\n\
CPS 1231: Fundamentals of CS - A\n\
CPS 2231: Computer Programming - Not assigned\n\
My 4-year plan:\n\
CPS 2232: Data Structure\n\
MATH 2110: Discrete Structure\n\
Based on ALL information, recommend courses.\n\n\
Only recommend courses that appear in the four-year plan shown above. \
Do NOT include any course you have already taken. \
Prioritize courses where you scored below B-.\n\n\
Please list 5-8 courses strictly in the following format, with the full name on each line, for example:\n\
CPS 2232: Data Structure\n\
MATH 2110: Discrete Structure\n";
        assert_eq!(prompt, expected);
    }

    #[test]
    fn no_transcript_prompt_omits_history_and_allows_retakes() {
        let (transcript, plan) = fixtures();
        let prompt = build_prompt(ContextMode::NoTranscript, "Q?", &transcript, &plan, Grade::BMinus);

        assert!(prompt.starts_with("\"Q?\"\nMy 4-year plan:\nCPS 2232: Data Structure\n"));
        assert!(!prompt.contains("My course history"));
        assert!(prompt.contains("it\u{2019}s OK to suggest courses the student may have already taken."));
        assert!(prompt.ends_with(FORMAT_SUFFIX));
    }

    #[test]
    fn no_plan_prompt_omits_plan_constraint() {
        let (transcript, plan) = fixtures();
        let prompt = build_prompt(ContextMode::NoPlan, "Q?", &transcript, &plan, Grade::BMinus);

        assert_eq!(
            prompt,
            format!(
                "\"Q?\"\nMy course history:\nCPS 1231: Fundamentals of CS - A\nCPS 2231: Computer Programming - Not assigned\nBased on history only, recommend courses.{FORMAT_SUFFIX}"
            )
        );
    }

    #[test]
    fn question_prompt_is_bare_question_plus_format() {
        let (transcript, plan) = fixtures();
        let prompt = build_prompt(ContextMode::Question, "Q?", &transcript, &plan, Grade::BMinus);
        assert_eq!(prompt, format!("Q?{FORMAT_SUFFIX}"));
    }

    #[test]
    fn full_prompt_names_configured_threshold() {
        let (transcript, plan) = fixtures();
        let prompt = build_prompt(ContextMode::Full, "Q?", &transcript, &plan, Grade::C);
        assert!(prompt.contains("Prioritize courses where you scored below C."));
    }
}
