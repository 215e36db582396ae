use std::collections::BTreeSet;

use crate::model::{Grade, ScoreCard};
use crate::student::{PlanSet, TranscriptRecord};

pub const DEFAULT_LOW_GRADE_THRESHOLD: Grade = Grade::BMinus;

/// A graded course at or below `threshold` on the scale. Ungraded or
/// unrecognised grades never count as low.
pub fn is_low_grade(transcript: &TranscriptRecord, course: &str, threshold: Grade) -> bool {
    transcript
        .grade(course)
        .map(|grade| grade.rank() >= threshold.rank())
        .unwrap_or(false)
}

pub fn score(
    recommendations: &BTreeSet<String>,
    plan: &PlanSet,
    transcript: &TranscriptRecord,
    low_grade_threshold: Grade,
) -> ScoreCard {
    let taken = transcript.taken_courses();

    let mut good_plan = 0usize;
    let mut good_personal = 0usize;
    for course in recommendations {
        if !plan.contains(course) {
            continue;
        }
        let already_taken = taken.contains(course.as_str());
        if !already_taken {
            good_plan += 1;
        }
        if !already_taken || is_low_grade(transcript, course, low_grade_threshold) {
            good_personal += 1;
        }
    }

    let (plan_score, personal_score) = if recommendations.is_empty() {
        (0.0, 0.0)
    } else {
        let total = recommendations.len() as f64;
        (good_plan as f64 / total, good_personal as f64 / total)
    };

    let remaining = plan
        .courses()
        .iter()
        .filter(|course| !taken.contains(course.as_str()))
        .count();
    let recall = if remaining == 0 {
        0.0
    } else {
        good_plan as f64 / remaining as f64
    };

    ScoreCard {
        plan_score,
        personal_score,
        lift: personal_score - plan_score,
        recall,
    }
}
