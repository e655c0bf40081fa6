use std::cmp::Reverse;
use std::collections::HashSet;
use std::time::{Duration, Instant};

use log::warn;

use crate::canvas::{ApiError, CanvasApi};
use crate::config::Config;
use crate::models::{
    speed_grader_link, Assignment, AssignmentMissingGroup, CourseMissingReport, MissingEntry,
    RowContext, Student, Submission,
};

pub const DEFAULT_BUDGET: Duration = Duration::from_secs(240);

#[derive(Debug, Clone)]
pub enum CourseSelection {
    All,
    One(String),
}

#[derive(Debug, Clone, Copy)]
pub enum AssignmentLimit {
    All,
    Top(usize),
}

/// Resolves missing submissions course by course. Between courses, once the
/// elapsed wall time passes `budget`, the `checkpoint` callback decides
/// whether to keep going; a `false` answer stops cleanly and the courses
/// already resolved are returned as-is.
pub async fn resolve(
    config: &Config,
    client: &dyn CanvasApi,
    selection: &CourseSelection,
    limit: AssignmentLimit,
    budget: Duration,
    checkpoint: &mut dyn FnMut(Duration, usize) -> bool,
) -> Vec<CourseMissingReport> {
    let selected: Vec<String> = match selection {
        CourseSelection::All => config.course_ids.clone(),
        CourseSelection::One(course_id) => vec![course_id.clone()],
    };

    let started = Instant::now();
    let mut reports = Vec::new();

    for (index, course_id) in selected.iter().enumerate() {
        if index > 0 && started.elapsed() > budget {
            let remaining = selected.len() - index;
            if !checkpoint(started.elapsed(), remaining) {
                warn!("stopped at the checkpoint; {remaining} course(s) left unresolved");
                break;
            }
        }

        match resolve_course(config, client, course_id, limit).await {
            Ok(report) => reports.push(report),
            Err(err) => warn!("skipping course {course_id}: {err}"),
        }
    }

    reports
}

async fn resolve_course(
    config: &Config,
    client: &dyn CanvasApi,
    course_id: &str,
    limit: AssignmentLimit,
) -> Result<CourseMissingReport, ApiError> {
    client.pace().await;
    let course_name = match client.course_name(course_id).await {
        Ok(name) => name,
        Err(err) => {
            warn!("using placeholder name for course {course_id}: {err}");
            format!("Course {course_id}")
        }
    };
    client.pace().await;

    let roster = client.roster(course_id).await?;
    client.pace().await;

    let mut assignments = client.assignments(course_id).await?;
    order_assignments(&mut assignments);
    truncate_assignments(&mut assignments, limit);

    let mut groups = Vec::new();
    for assignment in &assignments {
        client.pace().await;
        let submissions = match client.raw_submissions(course_id, assignment.id).await {
            Ok(submissions) => submissions,
            Err(err) => {
                warn!(
                    "skipping assignment {} in course {course_id}: {err}",
                    assignment.id
                );
                continue;
            }
        };

        let context = RowContext {
            base_host: &config.base_host,
            course_id,
            course_name: &course_name,
            assignment_id: assignment.id,
            assignment_name: &assignment.name,
        };
        groups.push(AssignmentMissingGroup {
            assignment_name: assignment.name.clone(),
            created_at: assignment.created_at,
            entries: missing_entries(&roster, &submissions, &context, assignment.created_at),
        });
    }

    Ok(CourseMissingReport {
        course_id: course_id.to_string(),
        course_name,
        groups,
    })
}

/// Newest first by creation time; assignments without a timestamp go last.
pub fn order_assignments(assignments: &mut [Assignment]) {
    assignments.sort_by_key(|assignment| Reverse(assignment.created_at));
}

pub fn truncate_assignments(assignments: &mut Vec<Assignment>, limit: AssignmentLimit) {
    if let AssignmentLimit::Top(count) = limit {
        assignments.truncate(count);
    }
}

/// Roster minus the students with a real submission for this assignment.
pub fn missing_entries(
    roster: &[Student],
    submissions: &[Submission],
    context: &RowContext<'_>,
    created_at: Option<chrono::DateTime<chrono::Utc>>,
) -> Vec<MissingEntry> {
    let submitted: HashSet<i64> = submissions
        .iter()
        .filter(|submission| submission.is_real())
        .map(|submission| submission.user_id)
        .collect();

    roster
        .iter()
        .filter(|student| !submitted.contains(&student.id))
        .map(|student| MissingEntry {
            student_name: student.name.clone(),
            assignment_name: context.assignment_name.to_string(),
            course_name: context.course_name.to_string(),
            assignment_created_at: created_at,
            deep_link: speed_grader_link(
                context.base_host,
                context.course_id,
                context.assignment_id,
                student.id,
            ),
        })
        .collect()
}
