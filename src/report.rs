use std::fmt::Write as _;
use std::io;

use chrono::{DateTime, Utc};

use crate::models::{CourseMissingReport, RecentSubmissionRecord};

/// Writes the recency report as CSV: one row per submission, newest first
/// (the records arrive already ordered).
pub fn write_recent_csv<W: io::Write>(
    records: &[RecentSubmissionRecord],
    highlight_late: bool,
    writer: W,
) -> csv::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["student", "course", "assignment", "submitted_at", "status", "link"])?;

    for record in records {
        let submitted_at = record.submitted_at.to_rfc3339();
        let status = status_label(record, highlight_late);
        csv_writer.write_record([
            record.student_name.as_str(),
            record.course_name.as_str(),
            record.assignment_name.as_str(),
            submitted_at.as_str(),
            status.as_str(),
            record.deep_link.as_str(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

fn status_label(record: &RecentSubmissionRecord, highlight_late: bool) -> String {
    let mut label = if record.graded { "graded" } else { "submitted" }.to_string();
    if highlight_late && record.late {
        label.push_str(", late");
    }
    label
}

/// Flat CSV view of the missing report: one row per missing student, in
/// group order (course as configured, then assignment newest first).
pub fn write_missing_csv<W: io::Write>(
    reports: &[CourseMissingReport],
    writer: W,
) -> csv::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["student", "assignment", "course", "assignment_created_at", "link"])?;

    for report in reports {
        for group in &report.groups {
            for entry in &group.entries {
                let created = entry
                    .assignment_created_at
                    .map(|timestamp| timestamp.to_rfc3339())
                    .unwrap_or_default();
                csv_writer.write_record([
                    entry.student_name.as_str(),
                    entry.assignment_name.as_str(),
                    entry.course_name.as_str(),
                    created.as_str(),
                    entry.deep_link.as_str(),
                ])?;
            }
        }
    }

    csv_writer.flush()?;
    Ok(())
}

/// Renders the missing-submission report as Markdown, grouped by course in
/// configured order, then by assignment newest first.
pub fn build_missing_report(
    reports: &[CourseMissingReport],
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Missing Submissions");
    let _ = writeln!(
        output,
        "Generated {}",
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );

    if reports.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "No courses were resolved.");
    }

    for report in reports {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {} ({})", report.course_name, report.course_id);

        if report.groups.is_empty() {
            let _ = writeln!(output);
            let _ = writeln!(output, "No assignments found for this course.");
        }

        for group in &report.groups {
            let created = group
                .created_at
                .map(|timestamp| timestamp.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "date unknown".to_string());
            let _ = writeln!(output);
            let _ = writeln!(output, "### {} (created {})", group.assignment_name, created);

            if group.entries.is_empty() {
                let _ = writeln!(output, "Everyone on the roster has submitted.");
            }
            for entry in &group.entries {
                let _ = writeln!(output, "- [{}]({})", entry.student_name, entry.deep_link);
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssignmentMissingGroup, MissingEntry};
    use chrono::TimeZone;

    fn record(late: bool, graded: bool) -> RecentSubmissionRecord {
        RecentSubmissionRecord {
            student_name: "Avery Lee".to_string(),
            course_name: "Intro to Chemistry".to_string(),
            assignment_name: "Lab 1".to_string(),
            submitted_at: Utc.with_ymd_and_hms(2026, 2, 3, 11, 0, 0).unwrap(),
            late,
            graded,
            deep_link: "https://school.instructure.com/courses/120/gradebook/speed_grader?assignment_id=301&student_id=42".to_string(),
        }
    }

    #[test]
    fn csv_has_header_and_one_row_per_record() {
        let mut buffer = Vec::new();
        write_recent_csv(&[record(false, false), record(false, true)], false, &mut buffer)
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "student,course,assignment,submitted_at,status,link");
        assert!(lines[1].contains("submitted"));
        assert!(lines[2].contains("graded"));
    }

    #[test]
    fn late_marker_only_appears_when_highlighting() {
        let mut with_flag = Vec::new();
        write_recent_csv(&[record(true, false)], true, &mut with_flag).unwrap();
        assert!(String::from_utf8(with_flag).unwrap().contains("late"));

        let mut without_flag = Vec::new();
        write_recent_csv(&[record(true, false)], false, &mut without_flag).unwrap();
        assert!(!String::from_utf8(without_flag).unwrap().contains("late"));
    }

    #[test]
    fn missing_report_groups_by_course_then_assignment() {
        let entry = MissingEntry {
            student_name: "Jules Moreno".to_string(),
            assignment_name: "Lab 2".to_string(),
            course_name: "Intro to Chemistry".to_string(),
            assignment_created_at: Some(Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap()),
            deep_link: "https://school.instructure.com/courses/120/gradebook/speed_grader?assignment_id=302&student_id=7".to_string(),
        };
        let reports = vec![CourseMissingReport {
            course_id: "120".to_string(),
            course_name: "Intro to Chemistry".to_string(),
            groups: vec![
                AssignmentMissingGroup {
                    assignment_name: "Lab 2".to_string(),
                    created_at: entry.assignment_created_at,
                    entries: vec![entry],
                },
                AssignmentMissingGroup {
                    assignment_name: "Lab 1".to_string(),
                    created_at: None,
                    entries: Vec::new(),
                },
            ],
        }];

        let text = build_missing_report(
            &reports,
            Utc.with_ymd_and_hms(2026, 2, 3, 12, 0, 0).unwrap(),
        );
        let lab2 = text.find("### Lab 2 (created 2026-02-01)").unwrap();
        let lab1 = text.find("### Lab 1 (created date unknown)").unwrap();
        assert!(lab2 < lab1);
        assert!(text.contains("## Intro to Chemistry (120)"));
        assert!(text.contains("- [Jules Moreno]("));
        assert!(text.contains("Everyone on the roster has submitted."));
    }

    #[test]
    fn missing_csv_is_one_row_per_entry_in_group_order() {
        let entry = |student: &str, assignment: &str| MissingEntry {
            student_name: student.to_string(),
            assignment_name: assignment.to_string(),
            course_name: "Intro to Chemistry".to_string(),
            assignment_created_at: Some(Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap()),
            deep_link: "https://school.instructure.com/courses/120/gradebook/speed_grader?assignment_id=302&student_id=7".to_string(),
        };
        let reports = vec![CourseMissingReport {
            course_id: "120".to_string(),
            course_name: "Intro to Chemistry".to_string(),
            groups: vec![
                AssignmentMissingGroup {
                    assignment_name: "Lab 2".to_string(),
                    created_at: None,
                    entries: vec![entry("Jules Moreno", "Lab 2"), entry("Kiara Patel", "Lab 2")],
                },
                AssignmentMissingGroup {
                    assignment_name: "Lab 1".to_string(),
                    created_at: None,
                    entries: vec![entry("Jules Moreno", "Lab 1")],
                },
            ],
        }];

        let mut buffer = Vec::new();
        write_missing_csv(&reports, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "student,assignment,course,assignment_created_at,link"
        );
        assert!(lines[1].starts_with("Jules Moreno,Lab 2,Intro to Chemistry,2026-02-01"));
        assert!(lines[3].starts_with("Jules Moreno,Lab 1"));
    }

    #[test]
    fn empty_run_still_produces_a_report() {
        let text = build_missing_report(&[], Utc.with_ymd_and_hms(2026, 2, 3, 12, 0, 0).unwrap());
        assert!(text.contains("No courses were resolved."));
    }
}
