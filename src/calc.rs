use serde::{Deserialize, Serialize};

use crate::model::{CourseUnit, Transcript, NOT_GRADED, PASS_BANDS};

/// How the school total is assembled for pass-level banding, and which
/// bound applies to EXAM cells on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoringScheme {
    /// CAT (0-30) + EXAM (0-70) = TOTAL (0-100); school total sums unit totals.
    #[default]
    CatPlusExam,
    /// EXAM alone (0-100); school total sums exam scores.
    ExamOnly,
}

/// What to do with an out-of-range numeric cell on import. Manual edits are
/// range-limited by the host UI; the import path only enforces this policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RangePolicy {
    /// Take the value as supplied.
    #[default]
    Accept,
    /// Pin to the field's bounds.
    Clamp,
    /// Treat the cell as absent and log it.
    Reject,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalcConfig {
    pub scoring_scheme: ScoringScheme,
    pub range_policy: RangePolicy,
}

impl CalcConfig {
    pub fn cat_max(&self) -> f64 {
        30.0
    }

    pub fn exam_max(&self) -> f64 {
        match self.scoring_scheme {
            ScoringScheme::CatPlusExam => 70.0,
            ScoringScheme::ExamOnly => 100.0,
        }
    }

    pub fn total_max(&self) -> f64 {
        100.0
    }
}

/// Letter grade for a unit total: closed bands, first match wins.
pub fn letter_grade(total: f64) -> &'static str {
    if total >= 70.0 {
        "A"
    } else if total >= 60.0 {
        "B"
    } else if total >= 50.0 {
        "C"
    } else if total >= 40.0 {
        "D"
    } else {
        "E"
    }
}

/// Scores a row supplied for one subject. `None` means the cell was absent
/// (or rejected), never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SuppliedScores {
    pub cat: Option<f64>,
    pub exam: Option<f64>,
    pub total: Option<f64>,
}

impl SuppliedScores {
    pub fn is_empty(&self) -> bool {
        self.cat.is_none() && self.exam.is_none() && self.total.is_none()
    }
}

fn admit(value: f64, max: f64, policy: RangePolicy) -> Option<f64> {
    if (0.0..=max).contains(&value) {
        return Some(value);
    }
    match policy {
        RangePolicy::Accept => Some(value),
        RangePolicy::Clamp => Some(value.clamp(0.0, max)),
        RangePolicy::Reject => None,
    }
}

/// Merges supplied scores into a unit and recomputes the derived fields.
///
/// Absent cells preserve the stored value. An explicitly supplied total is
/// authoritative and is never overwritten by cat+exam; otherwise the total
/// derives from cat+exam when both are known. A null total leaves the grade
/// untouched.
pub fn merge_unit_scores(unit: &mut CourseUnit, supplied: &SuppliedScores, cfg: &CalcConfig) {
    let mut total_supplied = false;
    let mut component_admitted = false;

    if let Some(v) = supplied.cat {
        if let Some(v) = admit(v, cfg.cat_max(), cfg.range_policy) {
            unit.cat = Some(v);
            component_admitted = true;
        } else {
            log::warn!("rejected out-of-range CAT {} for {}", v, unit.name);
        }
    }
    if let Some(v) = supplied.exam {
        if let Some(v) = admit(v, cfg.exam_max(), cfg.range_policy) {
            unit.exam = Some(v);
            component_admitted = true;
        } else {
            log::warn!("rejected out-of-range EXAM {} for {}", v, unit.name);
        }
    }
    if let Some(v) = supplied.total {
        if let Some(v) = admit(v, cfg.total_max(), cfg.range_policy) {
            unit.total = Some(v);
            total_supplied = true;
        } else {
            log::warn!("rejected out-of-range TOTAL {} for {}", v, unit.name);
        }
    }

    if !total_supplied {
        // An admitted component refreshes the derived total; a rejected or
        // absent one leaves a stored total alone.
        if component_admitted || unit.total.is_none() {
            if let (Some(cat), Some(exam)) = (unit.cat, unit.exam) {
                unit.total = Some(cat + exam);
            }
        }
    }

    if let Some(total) = unit.total {
        unit.grade = Some(letter_grade(total).to_string());
    }
}

/// Manual single-field edit, as driven by the transcript editor. Editing
/// `cat` or `exam` recomputes total+grade; editing `total` recomputes only
/// the grade.
pub fn edit_unit_field(unit: &mut CourseUnit, field: &str, value: Option<f64>) -> bool {
    match field {
        "cat" | "exam" => {
            if field == "cat" {
                unit.cat = value;
            } else {
                unit.exam = value;
            }
            // The derived pair always tracks the components here; clearing
            // one clears both.
            match (unit.cat, unit.exam) {
                (Some(cat), Some(exam)) => {
                    unit.total = Some(cat + exam);
                    unit.grade = Some(letter_grade(cat + exam).to_string());
                }
                _ => {
                    unit.total = None;
                    unit.grade = None;
                }
            }
            true
        }
        "total" => {
            unit.total = value;
            unit.grade = value.map(|t| letter_grade(t).to_string());
            true
        }
        _ => false,
    }
}

/// School total for pass-level banding: sum of unit totals, or of exam
/// scores under the exam-only scheme. Null scores are skipped.
pub fn school_total(transcript: &Transcript, cfg: &CalcConfig) -> f64 {
    transcript
        .course_units
        .iter()
        .filter_map(|u| match cfg.scoring_scheme {
            ScoringScheme::CatPlusExam => u.total,
            ScoringScheme::ExamOnly => u.exam,
        })
        .sum()
}

pub fn pass_level(total: f64) -> &'static str {
    for band in PASS_BANDS.iter() {
        if total >= band.min && total <= band.max {
            return band.level;
        }
    }
    NOT_GRADED
}
