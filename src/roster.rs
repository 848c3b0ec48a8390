use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub roll_no: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrCredential {
    pub username: String,
    pub password: String,
}

/// Roster entry as exposed over the API: no password.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicStudent {
    pub roll_no: String,
    pub name: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("duplicate roll number in roster: {0}")]
    DuplicateRollNo(String),
    #[error("duplicate subject in roster: {0}")]
    DuplicateSubject(String),
    #[error("roster must list at least one subject")]
    NoSubjects,
    #[error("roster entry has an empty roll number")]
    EmptyRollNo,
}

#[derive(Debug, Deserialize)]
struct RosterFile {
    cr: CrCredential,
    students: Vec<Student>,
    #[serde(default)]
    subjects: Option<Vec<String>>,
}

pub const DEFAULT_SUBJECTS: [&str; 5] = [
    "Mathematics",
    "Physics",
    "Chemistry",
    "English",
    "Computer Science",
];

/// The fixed class: CR credential, students in display order, and the subject list.
/// Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Roster {
    cr: CrCredential,
    students: Vec<Student>,
    subjects: Vec<String>,
}

impl Roster {
    pub fn new(
        cr: CrCredential,
        students: Vec<Student>,
        subjects: Vec<String>,
    ) -> Result<Self, RosterError> {
        let mut seen = HashSet::new();
        for s in &students {
            if s.roll_no.trim().is_empty() {
                return Err(RosterError::EmptyRollNo);
            }
            if !seen.insert(s.roll_no.as_str()) {
                return Err(RosterError::DuplicateRollNo(s.roll_no.clone()));
            }
        }
        if subjects.is_empty() {
            return Err(RosterError::NoSubjects);
        }
        let mut seen_subjects = HashSet::new();
        for subject in &subjects {
            if !seen_subjects.insert(subject.as_str()) {
                return Err(RosterError::DuplicateSubject(subject.clone()));
            }
        }
        Ok(Self {
            cr,
            students,
            subjects,
        })
    }

    pub fn builtin() -> Self {
        let student = |roll_no: &str, name: &str, password: &str| Student {
            roll_no: roll_no.to_string(),
            name: name.to_string(),
            password: password.to_string(),
        };
        Self {
            cr: CrCredential {
                username: "cruser".to_string(),
                password: "1234".to_string(),
            },
            students: vec![
                student("101", "Aman", "aman123"),
                student("102", "Sita", "sita123"),
                student("103", "Ramesh", "ramesh123"),
                student("104", "Priya", "priya123"),
                student("105", "Vikram", "vikram123"),
            ],
            subjects: DEFAULT_SUBJECTS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        let file: RosterFile = serde_json::from_str(text).context("roster file is invalid JSON")?;
        let subjects = file
            .subjects
            .unwrap_or_else(|| DEFAULT_SUBJECTS.iter().map(|s| s.to_string()).collect());
        Ok(Self::new(file.cr, file.students, subjects)?)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read roster {}", path.to_string_lossy()))?;
        Self::from_json_str(&text)
    }

    pub fn cr(&self) -> &CrCredential {
        &self.cr
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn student(&self, roll_no: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.roll_no == roll_no)
    }

    pub fn has_student(&self, roll_no: &str) -> bool {
        self.student(roll_no).is_some()
    }

    pub fn has_subject(&self, subject: &str) -> bool {
        self.subjects.iter().any(|s| s == subject)
    }

    pub fn public_students(&self) -> Vec<PublicStudent> {
        self.students
            .iter()
            .map(|s| PublicStudent {
                roll_no: s.roll_no.clone(),
                name: s.name.clone(),
            })
            .collect()
    }
}
