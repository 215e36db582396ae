use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::warn;

use crate::model::Grade;
use crate::util::read_nonempty_lines;

pub const ACCOUNT_FILE: &str = "account.txt";
pub const ENROLLMENT_FILE: &str = "enrolled_courses.txt";
pub const CATALOG_FILE: &str = "course_list.txt";

/// Course labels of a major's four-year plan, in file order.
#[derive(Debug, Clone, Default)]
pub struct PlanSet {
    courses: Vec<String>,
    lookup: HashSet<String>,
}

impl PlanSet {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut plan = Self::default();
        for line in lines {
            let course = line.as_ref().trim();
            if course.is_empty() || plan.lookup.contains(course) {
                continue;
            }
            plan.lookup.insert(course.to_string());
            plan.courses.push(course.to_string());
        }
        plan
    }

    pub fn load(path: &Path) -> Result<Self> {
        let plan = Self::from_lines(read_nonempty_lines(path)?);
        if plan.is_empty() {
            bail!("four-year plan is empty: {}", path.display());
        }
        Ok(plan)
    }

    pub fn contains(&self, course: &str) -> bool {
        self.lookup.contains(course)
    }

    pub fn courses(&self) -> &[String] {
        &self.courses
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub course: String,
    /// Raw grade symbol as stored; `None` until the course is graded.
    pub grade: Option<String>,
}

/// A student's enrolled courses in enrollment order.
#[derive(Debug, Clone, Default)]
pub struct TranscriptRecord {
    entries: Vec<TranscriptEntry>,
}

impl TranscriptRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the course if absent and sets the grade when one is given.
    pub fn record(&mut self, course: &str, grade: Option<&str>) {
        let course = course.trim();
        if course.is_empty() {
            return;
        }
        let grade = grade.map(str::trim).filter(|value| !value.is_empty());

        let index = match self.entries.iter().position(|entry| entry.course == course) {
            Some(index) => index,
            None => {
                self.entries.push(TranscriptEntry {
                    course: course.to_string(),
                    grade: None,
                });
                self.entries.len() - 1
            }
        };
        if let Some(grade) = grade {
            self.entries[index].grade = Some(grade.to_string());
        }
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn grade_symbol(&self, course: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.course == course)
            .and_then(|entry| entry.grade.as_deref())
    }

    /// Malformed symbols parse to `None`, same as an unassigned grade.
    pub fn grade(&self, course: &str) -> Option<Grade> {
        self.grade_symbol(course).and_then(Grade::parse)
    }

    pub fn taken_courses(&self) -> HashSet<&str> {
        self.entries
            .iter()
            .map(|entry| entry.course.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentAccount {
    pub username: String,
    pub major: Option<String>,
}

/// Everything the evaluator needs to know about one student.
#[derive(Debug, Clone)]
pub struct StudentProfile {
    pub username: String,
    pub major: String,
    pub transcript: TranscriptRecord,
}

pub fn parse_student_accounts(raw: &str) -> Vec<StudentAccount> {
    let mut students = Vec::new();
    for line in raw.lines() {
        let parts = line.trim().split(',').collect::<Vec<&str>>();
        if parts.len() < 3 || parts[2] != "student" {
            continue;
        }
        let major = parts
            .get(3)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned);
        students.push(StudentAccount {
            username: parts[0].to_string(),
            major,
        });
    }
    students
}

pub fn parse_transcript(raw: &str, username: &str) -> TranscriptRecord {
    let mut transcript = TranscriptRecord::new();
    for line in raw.lines() {
        let parts = line.trim().split(',').collect::<Vec<&str>>();
        if parts.len() < 2 || parts[0] != username {
            continue;
        }
        let grade = if parts.len() == 3 { Some(parts[2]) } else { None };
        transcript.record(parts[1], grade);
    }
    transcript
}

pub fn plan_path(data_dir: &Path, major: &str) -> PathBuf {
    data_dir.join(format!("{major}_plan.txt"))
}

/// Reads the account and enrollment files under `data_dir`.
pub fn load_student_profile(data_dir: &Path, username: &str) -> Result<StudentProfile> {
    let accounts_path = data_dir.join(ACCOUNT_FILE);
    let raw_accounts = fs::read_to_string(&accounts_path)
        .with_context(|| format!("failed to read {}", accounts_path.display()))?;

    let Some(account) = parse_student_accounts(&raw_accounts)
        .into_iter()
        .find(|account| account.username == username)
    else {
        bail!("student {username} not found in {}", accounts_path.display());
    };
    let Some(major) = account.major else {
        bail!("student {username} has no major assigned; cannot resolve a four-year plan");
    };

    let enrollment_path = data_dir.join(ENROLLMENT_FILE);
    let transcript = match fs::read_to_string(&enrollment_path) {
        Ok(raw) => parse_transcript(&raw, username),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!(path = %enrollment_path.display(), "enrollment file missing; using empty transcript");
            TranscriptRecord::new()
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read {}", enrollment_path.display()));
        }
    };

    Ok(StudentProfile {
        username: account.username,
        major,
        transcript,
    })
}
