use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format, Workbook};

use crate::calc::{pass_level, school_total, CalcConfig};
use crate::import::{Cell, RawRow};
use crate::model::{Transcript, GRADE_SCALES, REGISTERED_SUBJECTS};

/// Canonical header set for the import template: identity and narrative
/// columns first, then CAT/EXAM/TOTAL triplets per registered subject.
pub fn template_headers() -> Vec<String> {
    let mut headers: Vec<String> = [
        "name",
        "admissionNumber",
        "course",
        "schoolYear",
        "closingDay",
        "openingDay",
        "feeBalance",
        "managerComments",
        "hodComments",
        "hodName",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for subject in REGISTERED_SUBJECTS {
        headers.push(format!("{}_CAT", subject));
        headers.push(format!("{}_EXAM", subject));
        headers.push(format!("{}_TOTAL", subject));
    }
    headers
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Empty,
    }
}

fn header_text(data: &Data) -> Option<String> {
    match data {
        Data::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        }
        Data::Float(n) => Some(n.to_string()),
        Data::Int(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Decodes the first worksheet into raw rows. Row 1 is the header row; each
/// data row maps header text to its cell. Decode failures are fatal here;
/// content-level problems are the import engine's business.
pub fn decode_rows(path: &Path) -> anyhow::Result<Vec<RawRow>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("failed to open workbook {}", path.display()))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .context("workbook has no sheets")?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("failed to read sheet '{}'", sheet_name))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<Option<String>> = header_row.iter().map(header_text).collect();

    let mut out = Vec::new();
    for row in rows {
        let mut raw: RawRow = HashMap::new();
        for (idx, data) in row.iter().enumerate() {
            if let Some(Some(header)) = headers.get(idx) {
                raw.insert(header.clone(), data_to_cell(data));
            }
        }
        if raw.values().any(|c| *c != Cell::Empty) {
            out.push(raw);
        }
    }
    log::debug!("decoded {} rows from {}", out.len(), path.display());
    Ok(out)
}

/// Writes the import template: headers, an instructional row, a filled
/// example row and one blank scaffold row. The instructional and example
/// rows carry the markers the import filter strips back out.
pub fn write_template(path: &Path) -> anyhow::Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    let bold = Format::new().set_bold();
    let headers = template_headers();
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_with_format(0, col as u16, header, &bold)?;
        worksheet.set_column_width(col as u16, header.len().max(14) as f64)?;
    }

    let mut instructions: HashMap<&str, &str> = HashMap::new();
    instructions.insert("name", "REQUIRED: Full student name");
    instructions.insert("admissionNumber", "REQUIRED: Unique admission number");
    instructions.insert("course", "REQUIRED: Course name");
    instructions.insert("schoolYear", "e.g. 2024/2025");
    instructions.insert("feeBalance", "e.g. 0");
    for (col, header) in headers.iter().enumerate() {
        if let Some(text) = instructions.get(header.as_str()) {
            worksheet.write(1, col as u16, *text)?;
        } else if header.ends_with("_CAT") {
            worksheet.write(1, col as u16, "0-30")?;
        } else if header.ends_with("_EXAM") {
            worksheet.write(1, col as u16, "0-70")?;
        } else if header.ends_with("_TOTAL") {
            worksheet.write(1, col as u16, "0-100")?;
        }
    }

    let mut example: HashMap<&str, &str> = HashMap::new();
    example.insert("name", "John Doe");
    example.insert("admissionNumber", "ADM/2024/001");
    example.insert("course", "Electrical Installation");
    example.insert("schoolYear", "2024/2025");
    example.insert("feeBalance", "0");
    for (col, header) in headers.iter().enumerate() {
        if let Some(text) = example.get(header.as_str()) {
            worksheet.write(2, col as u16, *text)?;
        } else if header.ends_with("_CAT") {
            worksheet.write(2, col as u16, 24.0)?;
        } else if header.ends_with("_EXAM") {
            worksheet.write(2, col as u16, 52.0)?;
        }
    }

    // Row 4 is left blank so the user starts typing under the example.
    workbook
        .save(path)
        .with_context(|| format!("failed to save template {}", path.display()))?;
    Ok(())
}

/// Writes a single transcript as a printable sheet: identity block, the
/// unit table, the summary row and the comment block.
pub fn write_transcript(
    path: &Path,
    transcript: &Transcript,
    cfg: &CalcConfig,
) -> anyhow::Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    let bold = Format::new().set_bold();

    let identity = [
        ("Student Name", transcript.student.name.as_str()),
        ("Admission Number", transcript.student.admission_number.as_str()),
        ("Course", transcript.student.course.as_str()),
        ("School Year", transcript.student.school_year.as_str()),
    ];
    let mut row: u32 = 0;
    for (label, value) in identity {
        worksheet.write_with_format(row, 0, label, &bold)?;
        worksheet.write(row, 1, value)?;
        row += 1;
    }
    row += 1;

    for (col, header) in ["SUBJECT", "CAT", "EXAM", "TOTAL", "GRADE"]
        .iter()
        .enumerate()
    {
        worksheet.write_with_format(row, col as u16, *header, &bold)?;
    }
    row += 1;

    for unit in &transcript.course_units {
        worksheet.write(row, 0, unit.name.as_str())?;
        if let Some(v) = unit.cat {
            worksheet.write(row, 1, v)?;
        }
        if let Some(v) = unit.exam {
            worksheet.write(row, 2, v)?;
        }
        if let Some(v) = unit.total {
            worksheet.write(row, 3, v)?;
        }
        if let Some(g) = &unit.grade {
            worksheet.write(row, 4, g.as_str())?;
        }
        row += 1;
    }

    let total = school_total(transcript, cfg);
    worksheet.write_with_format(row, 0, "TOTAL", &bold)?;
    worksheet.write_with_format(row, 3, total, &bold)?;
    worksheet.write_with_format(row, 4, pass_level(total), &bold)?;
    row += 2;

    worksheet.write_with_format(row, 0, "Grading Scale", &bold)?;
    row += 1;
    for scale in GRADE_SCALES {
        worksheet.write(row, 0, scale.grade)?;
        worksheet.write(row, 1, scale.range)?;
        row += 1;
    }
    row += 1;

    let comments = [
        ("Remarks", transcript.remarks.as_str()),
        ("Manager Comments", transcript.manager_comments.as_str()),
        ("HOD Comments", transcript.hod_comments.as_str()),
        ("HOD Name", transcript.hod_name.as_str()),
        ("Closing Day", transcript.closing_day.as_str()),
        ("Opening Day", transcript.opening_day.as_str()),
        ("Fee Balance", transcript.fee_balance.as_str()),
    ];
    for (label, value) in comments {
        worksheet.write_with_format(row, 0, label, &bold)?;
        worksheet.write(row, 1, value)?;
        row += 1;
    }

    worksheet.set_column_width(0, 24)?;
    worksheet.set_column_width(1, 32)?;

    workbook
        .save(path)
        .with_context(|| format!("failed to save transcript {}", path.display()))?;
    Ok(())
}

/// File name for an exported transcript, with anything outside
/// [A-Za-z0-9 _-] stripped.
pub fn transcript_filename(student_name: &str) -> String {
    let safe: String = student_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '_' || *c == '-')
        .collect();
    let safe = safe.trim().replace(' ', "_");
    if safe.is_empty() {
        "transcript.xlsx".to_string()
    } else {
        format!("{}_transcript.xlsx", safe)
    }
}
