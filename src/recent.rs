use chrono::{DateTime, Duration, Utc};
use log::warn;

use crate::canvas::CanvasApi;
use crate::config::Config;
use crate::models::{speed_grader_link, RecentSubmissionRecord, RowContext, Submission};

/// Collects every real submission across the configured courses that falls
/// inside the lookback window, sorted newest first. A failure on one course
/// or one assignment is logged and skipped; it never aborts the run.
pub async fn aggregate(
    config: &Config,
    client: &dyn CanvasApi,
    now: DateTime<Utc>,
) -> Vec<RecentSubmissionRecord> {
    let cutoff = now - Duration::hours(config.lookback_hours);
    let mut records = Vec::new();

    for course_id in &config.course_ids {
        client.pace().await;
        let course_name = match client.course_name(course_id).await {
            Ok(name) => name,
            Err(err) => {
                warn!("using placeholder name for course {course_id}: {err}");
                format!("Course {course_id}")
            }
        };
        client.pace().await;

        let assignments = match client.assignments(course_id).await {
            Ok(assignments) => assignments,
            Err(err) => {
                warn!("skipping assignments for course {course_id}: {err}");
                Vec::new()
            }
        };

        for assignment in &assignments {
            client.pace().await;
            let submissions = match client
                .submissions_with_users(course_id, assignment.id)
                .await
            {
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
            for submission in &submissions {
                if let Some(record) =
                    screen_submission(submission, &context, cutoff, config.ungraded_only)
                {
                    records.push(record);
                }
            }
        }
    }

    order_records(&mut records);
    records
}

/// Applies the recency filters to one submission. Returns `None` for
/// placeholder rows, submissions older than the cutoff, and (when
/// `ungraded_only` is set) submissions that already carry a grade.
pub fn screen_submission(
    submission: &Submission,
    context: &RowContext<'_>,
    cutoff: DateTime<Utc>,
    ungraded_only: bool,
) -> Option<RecentSubmissionRecord> {
    if !submission.is_real() {
        return None;
    }
    let submitted_at = submission.submitted_at?;
    if submitted_at < cutoff {
        return None;
    }
    let graded = submission.is_graded();
    if ungraded_only && graded {
        return None;
    }

    Some(RecentSubmissionRecord {
        student_name: submission.student_name(),
        course_name: context.course_name.to_string(),
        assignment_name: context.assignment_name.to_string(),
        submitted_at,
        late: submission.late,
        graded,
        deep_link: speed_grader_link(
            context.base_host,
            context.course_id,
            context.assignment_id,
            submission.user_id,
        ),
    })
}

/// Newest first across the whole merged set, whatever course it came from.
pub fn order_records(records: &mut [RecentSubmissionRecord]) {
    records.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
}
