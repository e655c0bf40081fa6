use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
    pub user_id: i64,
    #[serde(default)]
    pub user: Option<Student>,
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub late: bool,
    #[serde(default)]
    pub workflow_state: Option<String>,
}

impl Submission {
    /// A real submission has a timestamp and is not in the "unsubmitted" state.
    /// Canvas returns placeholder rows for students who never submitted.
    pub fn is_real(&self) -> bool {
        self.submitted_at.is_some() && self.workflow_state.as_deref() != Some("unsubmitted")
    }

    pub fn is_graded(&self) -> bool {
        self.workflow_state.as_deref() == Some("graded")
    }

    pub fn student_name(&self) -> String {
        match &self.user {
            Some(user) => user.name.clone(),
            None => format!("User {}", self.user_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecentSubmissionRecord {
    pub student_name: String,
    pub course_name: String,
    pub assignment_name: String,
    pub submitted_at: DateTime<Utc>,
    pub late: bool,
    pub graded: bool,
    pub deep_link: String,
}

#[derive(Debug, Clone)]
pub struct MissingEntry {
    pub student_name: String,
    pub assignment_name: String,
    pub course_name: String,
    pub assignment_created_at: Option<DateTime<Utc>>,
    pub deep_link: String,
}

#[derive(Debug, Clone)]
pub struct AssignmentMissingGroup {
    pub assignment_name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub entries: Vec<MissingEntry>,
}

#[derive(Debug, Clone)]
pub struct CourseMissingReport {
    pub course_id: String,
    pub course_name: String,
    pub groups: Vec<AssignmentMissingGroup>,
}

/// Everything needed to turn one upstream submission row into a report row.
#[derive(Debug, Clone)]
pub struct RowContext<'a> {
    pub base_host: &'a str,
    pub course_id: &'a str,
    pub course_name: &'a str,
    pub assignment_id: i64,
    pub assignment_name: &'a str,
}

pub fn speed_grader_link(
    base_host: &str,
    course_id: &str,
    assignment_id: i64,
    user_id: i64,
) -> String {
    format!(
        "https://{base_host}/courses/{course_id}/gradebook/speed_grader?assignment_id={assignment_id}&student_id={user_id}"
    )
}
