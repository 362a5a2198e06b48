use std::collections::HashMap;
use std::fmt;

use crate::calc::{merge_unit_scores, CalcConfig, SuppliedScores};
use crate::model::{Student, Transcript, REGISTERED_SUBJECTS};
use crate::registry::Registry;

/// One decoded spreadsheet cell. The decoder is the only producer; the
/// normalizer is the only consumer, so the untyped boundary stays here.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    /// Text content, with an empty string counting as absent rather than a
    /// valid value. Numeric cells stringify so identity fields survive a
    /// numeric-typed column.
    fn as_text(&self) -> Option<String> {
        match self {
            Cell::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    None
                } else {
                    Some(t.to_string())
                }
            }
            Cell::Number(n) => Some(format_number(*n)),
            Cell::Empty => None,
        }
    }

    /// Numeric content; stringified numbers are accepted, anything else is
    /// absent.
    fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            Cell::Empty => None,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A raw row as handed over by the spreadsheet decoder: header text to cell,
/// headers exactly as they appear in the file.
pub type RawRow = HashMap<String, Cell>;

const NAME_ALIASES: [&str; 3] = ["name", "Name", "NAME"];
const ADMISSION_ALIASES: [&str; 3] = ["admissionNumber", "Admission Number", "ADMISSION_NUMBER"];
const COURSE_ALIASES: [&str; 3] = ["course", "Course", "COURSE"];
const SCHOOL_YEAR_ALIASES: [&str; 3] = ["schoolYear", "School Year", "SCHOOL_YEAR"];
const CLOSING_DAY_ALIASES: [&str; 3] = ["closingDay", "Closing Day", "CLOSING_DAY"];
const OPENING_DAY_ALIASES: [&str; 3] = ["openingDay", "Opening Day", "OPENING_DAY"];
const FEE_BALANCE_ALIASES: [&str; 3] = ["feeBalance", "Fee Balance", "FEE_BALANCE"];
const MANAGER_COMMENTS_ALIASES: [&str; 3] =
    ["managerComments", "Manager Comments", "MANAGER_COMMENTS"];
const HOD_COMMENTS_ALIASES: [&str; 3] = ["hodComments", "HOD Comments", "HOD_COMMENTS"];
const HOD_NAME_ALIASES: [&str; 3] = ["hodName", "HOD Name", "HOD_NAME"];

/// Scaffold markers left behind when a user imports the template itself.
/// Case-sensitive substring match against the required fields.
pub const NOISE_MARKERS: [&str; 3] = ["REQUIRED", "Full student name", "John Doe"];

/// A row rewritten into canonical field names. Absent text fields are empty
/// strings; absent scores are None.
#[derive(Debug, Clone, Default)]
pub struct NormalizedRow {
    pub name: String,
    pub admission_number: String,
    pub course: String,
    pub school_year: String,
    pub closing_day: String,
    pub opening_day: String,
    pub fee_balance: String,
    pub manager_comments: String,
    pub hod_comments: String,
    pub hod_name: String,
    pub scores: HashMap<String, SuppliedScores>,
}

fn probe_text(row: &RawRow, aliases: &[&str]) -> String {
    aliases
        .iter()
        .find_map(|key| row.get(*key).and_then(Cell::as_text))
        .unwrap_or_default()
}

/// Rewrites a raw row into the canonical field set. Subject columns are
/// exact-match keys built from the registered subject list; no fuzzy
/// subject matching. Pure function.
pub fn normalize_row(row: &RawRow, subjects: &[&str]) -> NormalizedRow {
    let mut normalized = NormalizedRow {
        name: probe_text(row, &NAME_ALIASES),
        admission_number: probe_text(row, &ADMISSION_ALIASES),
        course: probe_text(row, &COURSE_ALIASES),
        school_year: probe_text(row, &SCHOOL_YEAR_ALIASES),
        closing_day: probe_text(row, &CLOSING_DAY_ALIASES),
        opening_day: probe_text(row, &OPENING_DAY_ALIASES),
        fee_balance: probe_text(row, &FEE_BALANCE_ALIASES),
        manager_comments: probe_text(row, &MANAGER_COMMENTS_ALIASES),
        hod_comments: probe_text(row, &HOD_COMMENTS_ALIASES),
        hod_name: probe_text(row, &HOD_NAME_ALIASES),
        scores: HashMap::new(),
    };

    for subject in subjects {
        let supplied = SuppliedScores {
            cat: row
                .get(&format!("{}_CAT", subject))
                .and_then(Cell::as_number),
            exam: row
                .get(&format!("{}_EXAM", subject))
                .and_then(Cell::as_number),
            total: row
                .get(&format!("{}_TOTAL", subject))
                .and_then(Cell::as_number),
        };
        if !supplied.is_empty() {
            normalized.scores.insert((*subject).to_string(), supplied);
        }
    }

    normalized
}

/// A row is data iff the three required fields are present, none of them
/// carries a template scaffold marker, and none restates its own column
/// header (a duplicated header row reads as its canonical field names).
pub fn is_data_row(row: &NormalizedRow) -> bool {
    let required = [
        (&row.name, "name"),
        (&row.admission_number, "admissionNumber"),
        (&row.course, "course"),
    ];
    if required.iter().any(|(v, _)| v.is_empty()) {
        return false;
    }
    if required.iter().any(|(v, header)| v.as_str() == *header) {
        return false;
    }
    !required
        .iter()
        .any(|(v, _)| NOISE_MARKERS.iter().any(|m| v.contains(m)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Added,
    Updated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub students_added: usize,
    pub students_updated: usize,
    pub rows_skipped: usize,
}

/// Fatal import outcomes. A file that fails to decode never reaches this
/// module; these distinguish an empty sheet from one holding only scaffold
/// or malformed rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportError {
    EmptySheet,
    NoValidRows,
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::EmptySheet => write!(f, "the sheet contains no rows"),
            ImportError::NoValidRows => write!(
                f,
                "no valid data rows found; check the file against the template"
            ),
        }
    }
}

impl std::error::Error for ImportError {}

fn apply_row(mut transcript: Transcript, row: &NormalizedRow, cfg: &CalcConfig) -> Transcript {
    for unit in &mut transcript.course_units {
        if let Some(supplied) = row.scores.get(&unit.name) {
            merge_unit_scores(unit, supplied, cfg);
        }
    }

    // Preserve-on-absence for the free-text fields.
    if !row.closing_day.is_empty() {
        transcript.closing_day = row.closing_day.clone();
    }
    if !row.opening_day.is_empty() {
        transcript.opening_day = row.opening_day.clone();
    }
    if !row.fee_balance.is_empty() {
        transcript.fee_balance = row.fee_balance.clone();
    }
    if !row.manager_comments.is_empty() {
        transcript.manager_comments = row.manager_comments.clone();
    }
    if !row.hod_comments.is_empty() {
        transcript.hod_comments = row.hod_comments.clone();
    }
    if !row.hod_name.is_empty() {
        transcript.hod_name = row.hod_name.clone();
    }

    transcript
}

fn refreshed_identity(existing: &Student, row: &NormalizedRow) -> Student {
    let mut student = existing.clone();
    if !row.name.is_empty() {
        student.name = row.name.clone();
    }
    if !row.course.is_empty() {
        student.course = row.course.clone();
    }
    if !row.school_year.is_empty() {
        student.school_year = row.school_year.clone();
    }
    student
}

/// Reconciles one validated row against the registry: match-or-create on
/// the admission number, partial-field merge, derived-field recompute,
/// persist.
pub fn merge_row(
    registry: &mut Registry,
    row: &NormalizedRow,
    cfg: &CalcConfig,
) -> anyhow::Result<MergeOutcome> {
    match registry.find_by_admission_number(&row.admission_number) {
        None => {
            let student = registry.add_student(
                &row.name,
                &row.admission_number,
                &row.course,
                &row.school_year,
            )?;
            let transcript = registry
                .transcript(&student.transcript_id)
                .ok_or_else(|| {
                    anyhow::anyhow!("transcript missing for new student {}", student.id)
                })?
                .clone();
            registry.update_transcript(apply_row(transcript, row, cfg))?;
            Ok(MergeOutcome::Added)
        }
        Some(existing) => {
            let student = refreshed_identity(existing, row);
            let transcript = registry
                .transcript(&student.transcript_id)
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "transcript missing for student {} ({})",
                        student.id,
                        student.admission_number
                    )
                })?
                .clone();
            let mut updated = apply_row(transcript, row, cfg);
            updated.student = student.clone();
            registry.update_transcript(updated)?;
            registry.update_student(student)?;
            Ok(MergeOutcome::Updated)
        }
    }
}

/// Drives the per-row pipeline over a decoded table. Row-level failures are
/// logged and skipped; only an empty or all-noise table fails the import as
/// a whole, and in that case the registries are untouched.
pub fn run_import(
    registry: &mut Registry,
    rows: &[RawRow],
    cfg: &CalcConfig,
) -> Result<ImportSummary, ImportError> {
    if rows.is_empty() {
        return Err(ImportError::EmptySheet);
    }

    let subjects: Vec<&str> = REGISTERED_SUBJECTS.to_vec();
    let data_rows: Vec<NormalizedRow> = rows
        .iter()
        .map(|row| normalize_row(row, &subjects))
        .filter(is_data_row)
        .collect();

    log::info!(
        "import: {} rows decoded, {} data rows after filtering",
        rows.len(),
        data_rows.len()
    );

    if data_rows.is_empty() {
        return Err(ImportError::NoValidRows);
    }

    let mut summary = ImportSummary::default();
    for (idx, row) in data_rows.iter().enumerate() {
        match merge_row(registry, row, cfg) {
            Ok(MergeOutcome::Added) => summary.students_added += 1,
            Ok(MergeOutcome::Updated) => summary.students_updated += 1,
            Err(e) => {
                // One bad row never aborts the batch.
                log::warn!(
                    "import: skipping row {} ({}): {:?}",
                    idx + 1,
                    row.admission_number,
                    e
                );
                summary.rows_skipped += 1;
            }
        }
    }

    Ok(summary)
}
