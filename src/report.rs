use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::NaiveDate;

use crate::completion::{self, CompletionEvaluation, CompletionStatus, EvaluationBatch};

type StatusCounts = [usize; 4];

pub fn advisor_label(evaluation: &CompletionEvaluation) -> String {
    match &evaluation.internship.advisor {
        Some(advisor) => format!("{} ({})", advisor.name, advisor.email),
        None => "Unassigned".to_string(),
    }
}

/// Per advisor, how many internships hold each label, indexed in rule order.
pub fn summarize_by_advisor(
    evaluations: &[CompletionEvaluation],
) -> BTreeMap<String, StatusCounts> {
    let mut map: BTreeMap<String, StatusCounts> = BTreeMap::new();

    for evaluation in evaluations {
        let counts = map.entry(advisor_label(evaluation)).or_default();
        if let Some(index) = CompletionStatus::ALL.iter().position(|s| *s == evaluation.status) {
            counts[index] += 1;
        }
    }

    map
}

pub fn build_report(scope: Option<&str>, today: NaiveDate, batch: &EvaluationBatch) -> String {
    let summaries = completion::summarize_completion(&batch.evaluations);
    let by_advisor = summarize_by_advisor(&batch.evaluations);

    let mut output = String::new();
    let scope_label = scope.unwrap_or("all accepted internships");

    let _ = writeln!(output, "# Internship Completion Report");
    let _ = writeln!(output, "Generated for {} (evaluated on {})", scope_label, today);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Completion Mix");

    if batch.evaluations.is_empty() {
        let _ = writeln!(output, "No internships evaluated.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(output, "- {}: {}", summary.status, summary.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## By Advisor");

    if by_advisor.is_empty() {
        let _ = writeln!(output, "No internships evaluated.");
    } else {
        for (advisor, counts) in by_advisor.iter() {
            let breakdown: Vec<String> = CompletionStatus::ALL
                .iter()
                .zip(counts.iter())
                .filter(|(_, count)| **count > 0)
                .map(|(status, count)| format!("{status} {count}"))
                .collect();
            let _ = writeln!(output, "- {}: {}", advisor, breakdown.join(", "));
        }
    }

    let mut attention: Vec<&CompletionEvaluation> = batch
        .evaluations
        .iter()
        .filter(|e| {
            matches!(
                e.status,
                CompletionStatus::AwaitingReportApproval | CompletionStatus::LogbookIncomplete
            )
        })
        .collect();
    attention.sort_by(|a, b| a.internship.end_date.cmp(&b.internship.end_date));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Needs Attention");

    if attention.is_empty() {
        let _ = writeln!(output, "Every finished internship is complete.");
    } else {
        for evaluation in attention {
            let internship = &evaluation.internship;
            let _ = write!(
                output,
                "- {} ({}) at {}: {}",
                internship.student_name,
                internship.student_email,
                internship.company_name,
                evaluation.status
            );
            if evaluation.status == CompletionStatus::LogbookIncomplete {
                let _ = write!(
                    output,
                    " ({} of {} days logged, {} missing)",
                    evaluation.logged_days,
                    evaluation.required_days,
                    evaluation.missing_days()
                );
            }
            let _ = writeln!(output);
        }
    }

    if !batch.invalid.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Invalid Records");
        for record in batch.invalid.iter() {
            let _ = writeln!(
                output,
                "- {} ({}): {}",
                record.internship.student_name, record.internship.student_email, record.error
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::tests::{date, sample_internship};
    use crate::completion::{evaluate_snapshots, CompletionSnapshot};
    use crate::models::Advisor;

    fn snapshot(logbook_count: u64, approved: bool, advisor: Option<&str>) -> CompletionSnapshot {
        let mut internship = sample_internship(Some(date(2024, 1, 1)), Some(date(2024, 1, 5)));
        internship.advisor = advisor.map(|name| Advisor {
            name: name.to_string(),
            email: format!("{}@unpad.ac.id", name.to_lowercase()),
        });
        CompletionSnapshot {
            internship,
            logbook_count,
            has_approved_report: approved,
        }
    }

    #[test]
    fn groups_counts_by_advisor() {
        let batch = evaluate_snapshots(
            &[
                snapshot(5, true, Some("Hendra")),
                snapshot(2, true, Some("Hendra")),
                snapshot(5, true, None),
            ],
            date(2024, 2, 1),
        );
        let grouped = summarize_by_advisor(&batch.evaluations);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["Hendra (hendra@unpad.ac.id)"], [0, 0, 1, 1]);
        assert_eq!(grouped["Unassigned"], [0, 0, 0, 1]);
    }

    #[test]
    fn report_lists_incomplete_logbooks_and_invalid_records() {
        let mut snapshots = vec![snapshot(3, true, Some("Hendra")), snapshot(5, false, None)];
        let mut broken = snapshot(0, false, None);
        broken.internship.end_date = None;
        snapshots.push(broken);

        let batch = evaluate_snapshots(&snapshots, date(2024, 2, 1));
        let report = build_report(Some("hendra@unpad.ac.id"), date(2024, 2, 1), &batch);

        assert!(report.contains("Generated for hendra@unpad.ac.id (evaluated on 2024-02-01)"));
        assert!(report.contains("- Logbook Incomplete: 1"));
        assert!(report.contains("- Awaiting Report Approval: 1"));
        assert!(report.contains("(3 of 5 days logged, 2 missing)"));
        assert!(report.contains("## Invalid Records"));
        assert!(report.contains("missing end date"));
    }

    #[test]
    fn empty_batch_renders_placeholders() {
        let report = build_report(None, date(2024, 2, 1), &EvaluationBatch::default());
        assert!(report.contains("all accepted internships"));
        assert!(report.contains("No internships evaluated."));
        assert!(!report.contains("## Invalid Records"));
    }
}
