use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub admission_number: String,
    pub course: String,
    #[serde(default)]
    pub school_year: String,
    pub transcript_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseUnit {
    pub id: String,
    pub name: String,
    pub cat: Option<f64>,
    pub exam: Option<f64>,
    pub total: Option<f64>,
    pub grade: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub id: String,
    pub student: Student,
    pub course_units: Vec<CourseUnit>,
    #[serde(default)]
    pub remarks: String,
    #[serde(default)]
    pub manager_comments: String,
    #[serde(default)]
    pub hod_comments: String,
    #[serde(default)]
    pub hod_name: String,
    #[serde(default)]
    pub closing_day: String,
    #[serde(default)]
    pub opening_day: String,
    #[serde(default)]
    pub fee_balance: String,
}

/// The registered subject list. Imports match subject columns against these
/// names exactly; every new transcript is seeded with the full set.
pub const REGISTERED_SUBJECTS: [&str; 7] = [
    "TRADE THEORY",
    "TRADE PRACTICE",
    "COMMUNICATION SKILLS",
    "ENTREPRENEURSHIP",
    "MATHEMATICS",
    "GENERAL SCIENCE",
    "DIGITAL LITERACY",
];

pub fn default_course_units() -> Vec<CourseUnit> {
    REGISTERED_SUBJECTS
        .iter()
        .enumerate()
        .map(|(i, name)| CourseUnit {
            id: (i + 1).to_string(),
            name: (*name).to_string(),
            cat: None,
            exam: None,
            total: None,
            grade: None,
        })
        .collect()
}

pub fn new_student_with_transcript(
    name: &str,
    admission_number: &str,
    course: &str,
    school_year: &str,
) -> (Student, Transcript) {
    let student_id = Uuid::new_v4().to_string();
    let transcript_id = Uuid::new_v4().to_string();

    let student = Student {
        id: student_id,
        name: name.to_string(),
        admission_number: admission_number.to_string(),
        course: course.to_string(),
        school_year: school_year.to_string(),
        transcript_id: transcript_id.clone(),
    };

    let transcript = Transcript {
        id: transcript_id,
        student: student.clone(),
        course_units: default_course_units(),
        remarks: String::new(),
        manager_comments: String::new(),
        hod_comments: String::new(),
        hod_name: String::new(),
        closing_day: String::new(),
        opening_day: String::new(),
        fee_balance: String::new(),
    };

    (student, transcript)
}

#[derive(Debug, Clone, Copy)]
pub struct GradeScale {
    pub grade: &'static str,
    pub range: &'static str,
}

pub const GRADE_SCALES: [GradeScale; 5] = [
    GradeScale { grade: "A", range: "70-100" },
    GradeScale { grade: "B", range: "60-69" },
    GradeScale { grade: "C", range: "50-59" },
    GradeScale { grade: "D", range: "40-49" },
    GradeScale { grade: "E", range: "0-39" },
];

#[derive(Debug, Clone, Copy)]
pub struct PassBand {
    pub level: &'static str,
    pub min: f64,
    pub max: f64,
}

/// Pass-level bands over the summed school total, checked top-down with
/// inclusive bounds. A total outside every band reads as NOT GRADED.
pub const PASS_BANDS: [PassBand; 4] = [
    PassBand { level: "DISTINCTION", min: 451.0, max: 600.0 },
    PassBand { level: "CREDIT", min: 301.0, max: 450.0 },
    PassBand { level: "PASS", min: 200.0, max: 300.0 },
    PassBand { level: "FAIL", min: 0.0, max: 199.0 },
];

pub const NOT_GRADED: &str = "NOT GRADED";
