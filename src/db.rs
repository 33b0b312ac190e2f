use anyhow::Context;
use chrono::{Duration, NaiveDate};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::completion::{CompletionSnapshot, InternshipRecords};
use crate::models::{
    Advisor, Decision, Internship, InternshipStatus, LogbookEntry, Report, ReportStatus,
};
use crate::review;

const INTERNSHIP_COLUMNS: &str = "i.id, i.student_name, i.student_email, i.advisor_name, \
     i.advisor_email, i.internship_type, i.company_name, i.company_address, i.start_date, \
     i.end_date, i.status, i.progress_note, i.deleted_at";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

struct SeedInternship {
    id: &'static str,
    student_name: &'static str,
    student_email: &'static str,
    internship_type: &'static str,
    company_name: &'static str,
    company_address: &'static str,
    dates: Option<(NaiveDate, NaiveDate)>,
    status: &'static str,
    logged_days: i64,
    report_status: Option<&'static str>,
}

fn seed_date(y: i32, m: u32, d: u32) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d).context("invalid date")
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let internships = vec![
        SeedInternship {
            id: "6a1c3a52-8f3e-4d0b-9a57-2f1d6c0e9b11",
            student_name: "Rina Wulandari",
            student_email: "rina.wulandari@student.unpad.ac.id",
            internship_type: "kkl",
            company_name: "PT Nusantara Data",
            company_address: "Jl. Merdeka 10, Bandung",
            dates: Some((seed_date(2024, 1, 1)?, seed_date(2024, 1, 5)?)),
            status: "accepted",
            logged_days: 5,
            report_status: Some("approved"),
        },
        SeedInternship {
            id: "b3f0e6d4-71c2-4b8e-a0d9-5c7e2a9f4d22",
            student_name: "Dimas Pratama",
            student_email: "dimas.pratama@student.unpad.ac.id",
            internship_type: "kkl",
            company_name: "CV Sinar Teknik",
            company_address: "Jl. Asia Afrika 45, Bandung",
            dates: Some((seed_date(2024, 1, 1)?, seed_date(2024, 1, 5)?)),
            status: "accepted",
            logged_days: 3,
            report_status: Some("approved"),
        },
        SeedInternship {
            id: "e9d2a7c1-3b54-4f6a-8e0c-1d9b6f3a7e33",
            student_name: "Siti Rahmawati",
            student_email: "siti.rahmawati@student.unpad.ac.id",
            internship_type: "kkn",
            company_name: "Desa Sukamaju",
            company_address: "Kec. Jatinangor, Sumedang",
            dates: Some((seed_date(2024, 1, 1)?, seed_date(2024, 1, 5)?)),
            status: "accepted",
            logged_days: 5,
            report_status: Some("pending"),
        },
        SeedInternship {
            id: "4c8b1e2f-9a6d-4e3c-b7f0-8a2d5c1e9f44",
            student_name: "Bagus Santoso",
            student_email: "bagus.santoso@student.unpad.ac.id",
            internship_type: "kkn",
            company_name: "Desa Cibeusi",
            company_address: "Kec. Jatinangor, Sumedang",
            dates: Some((seed_date(2026, 7, 1)?, seed_date(2099, 1, 1)?)),
            status: "accepted",
            logged_days: 2,
            report_status: None,
        },
        SeedInternship {
            id: "0f7e3d9c-2a1b-4c5d-8e6f-7a9b0c1d2e55",
            student_name: "Ayu Lestari",
            student_email: "ayu.lestari@student.unpad.ac.id",
            internship_type: "kkl",
            company_name: "PT Kereta Digital",
            company_address: "Jl. Braga 12, Bandung",
            dates: None,
            status: "waiting",
            logged_days: 0,
            report_status: None,
        },
    ];

    for seed in internships {
        let id = Uuid::parse_str(seed.id)?;
        let (start_date, end_date) = match seed.dates {
            Some((start, end)) => (Some(start), Some(end)),
            None => (None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO kkl.internships
            (id, student_name, student_email, advisor_name, advisor_email, internship_type,
             company_name, company_address, start_date, end_date, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE
            SET start_date = EXCLUDED.start_date, end_date = EXCLUDED.end_date,
                status = EXCLUDED.status
            "#,
        )
        .bind(id)
        .bind(seed.student_name)
        .bind(seed.student_email)
        .bind("Dr. Hendra Gunawan")
        .bind("hendra.gunawan@unpad.ac.id")
        .bind(seed.internship_type)
        .bind(seed.company_name)
        .bind(seed.company_address)
        .bind(start_date)
        .bind(end_date)
        .bind(seed.status)
        .execute(pool)
        .await?;

        if let Some(start) = start_date {
            for offset in 0..seed.logged_days {
                insert_logbook(
                    pool,
                    id,
                    start + Duration::days(offset),
                    "Daily field activity",
                    None,
                )
                .await?;
            }
        }

        if let Some(report_status) = seed.report_status {
            sqlx::query(
                r#"
                INSERT INTO kkl.reports (id, internship_id, file_path, status)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v5(&id, b"final-report"))
            .bind(id)
            .bind(format!("reports/{id}/final.pdf"))
            .bind(report_status)
            .execute(pool)
            .await?;
        }
    }

    Ok(())
}

async fn insert_logbook<'e, E>(
    executor: E,
    internship_id: Uuid,
    date: NaiveDate,
    activity: &str,
    supervisor_note: Option<&str>,
) -> anyhow::Result<bool>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO kkl.logbooks (id, internship_id, date, activity, supervisor_note)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (internship_id, date) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(internship_id)
    .bind(date)
    .bind(activity)
    .bind(supervisor_note)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[derive(Debug, serde::Deserialize)]
struct LogbookRow {
    internship_id: Uuid,
    date: NaiveDate,
    activity: String,
    supervisor_note: Option<String>,
}

fn parse_logbook_rows<R: std::io::Read>(source: R) -> anyhow::Result<Vec<LogbookRow>> {
    let mut reader = csv::Reader::from_reader(source);
    let mut rows = Vec::new();

    for (line, result) in reader.deserialize::<LogbookRow>().enumerate() {
        rows.push(result.with_context(|| format!("invalid logbook row {}", line + 1))?);
    }

    Ok(rows)
}

/// Imports every row or none of them.
pub async fn import_logbooks(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("cannot open {}", csv_path.display()))?;
    let rows = parse_logbook_rows(file)?;

    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;

    for row in rows {
        let inserted_row = insert_logbook(
            &mut *tx,
            row.internship_id,
            row.date,
            &row.activity,
            row.supervisor_note.as_deref().filter(|note| !note.is_empty()),
        )
        .await
        .with_context(|| format!("cannot import logbook for internship {}", row.internship_id))?;

        if inserted_row {
            inserted += 1;
        } else {
            debug!(internship = %row.internship_id, date = %row.date, "logbook day already recorded");
        }
    }

    tx.commit().await?;
    Ok(inserted)
}

fn internship_from_row(row: &PgRow) -> anyhow::Result<Internship> {
    let advisor_name: Option<String> = row.get("advisor_name");
    let advisor_email: Option<String> = row.get("advisor_email");
    let internship_type: String = row.get("internship_type");
    let status: String = row.get("status");

    Ok(Internship {
        id: row.get("id"),
        student_name: row.get("student_name"),
        student_email: row.get("student_email"),
        advisor: advisor_name
            .zip(advisor_email)
            .map(|(name, email)| Advisor { name, email }),
        internship_type: internship_type.parse()?,
        company_name: row.get("company_name"),
        company_address: row.get("company_address"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        status: status.parse()?,
        progress_note: row.get("progress_note"),
        deleted_at: row.get("deleted_at"),
    })
}

pub async fn fetch_internship(pool: &PgPool, id: Uuid) -> anyhow::Result<Internship> {
    let row = sqlx::query(&format!(
        "SELECT {INTERNSHIP_COLUMNS} FROM kkl.internships i WHERE i.id = $1 AND i.deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("internship {id} not found"))?;

    internship_from_row(&row)
}

// Reports of soft-deleted internships are hidden from review.
const REPORT_STATUS_QUERY: &str = "SELECT r.status FROM kkl.reports r \
     JOIN kkl.internships i ON i.id = r.internship_id \
     WHERE r.id = $1 AND i.deleted_at IS NULL";

const REPORT_REVIEW_UPDATE: &str = "UPDATE kkl.reports r \
     SET status = $2, reviewer_note = COALESCE($3, r.reviewer_note) \
     FROM kkl.internships i \
     WHERE r.id = $1 AND r.status = $4 AND i.id = r.internship_id AND i.deleted_at IS NULL";

/// A guarded UPDATE that matched nothing lost a race with another reviewer.
fn ensure_reviewed(kind: &str, id: Uuid, rows_affected: u64) -> anyhow::Result<()> {
    anyhow::ensure!(
        rows_affected > 0,
        "{kind} {id} was reviewed concurrently, reload and try again"
    );
    Ok(())
}

pub async fn set_internship_status(
    pool: &PgPool,
    id: Uuid,
    decision: Decision,
) -> anyhow::Result<InternshipStatus> {
    let internship = fetch_internship(pool, id).await?;
    let next = review::review_internship(internship.status, decision)?;

    let result = sqlx::query(
        "UPDATE kkl.internships SET status = $2 \
         WHERE id = $1 AND status = $3 AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(next.as_str())
    .bind(internship.status.as_str())
    .execute(pool)
    .await?;
    ensure_reviewed("internship", id, result.rows_affected())?;

    info!(internship = %id, from = %internship.status, to = %next, "internship reviewed");
    Ok(next)
}

pub async fn assign_advisor(pool: &PgPool, id: Uuid, advisor: &Advisor) -> anyhow::Result<()> {
    let result = sqlx::query(
        "UPDATE kkl.internships SET advisor_name = $2, advisor_email = $3 \
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(&advisor.name)
    .bind(&advisor.email)
    .execute(pool)
    .await?;

    anyhow::ensure!(result.rows_affected() > 0, "internship {id} not found");
    info!(internship = %id, advisor = %advisor.email, "advisor assigned");
    Ok(())
}

pub async fn set_report_status(
    pool: &PgPool,
    id: Uuid,
    decision: Decision,
    note: Option<&str>,
) -> anyhow::Result<ReportStatus> {
    let current: String = sqlx::query(REPORT_STATUS_QUERY)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("report {id} not found"))?
        .get("status");
    let current: ReportStatus = current.parse()?;
    let next = review::review_report(current, decision)?;

    let result = sqlx::query(REPORT_REVIEW_UPDATE)
        .bind(id)
        .bind(next.as_str())
        .bind(note)
        .bind(current.as_str())
        .execute(pool)
        .await?;
    ensure_reviewed("report", id, result.rows_affected())?;

    info!(report = %id, from = %current, to = %next, "report reviewed");
    Ok(next)
}

pub async fn soft_delete_internship(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE kkl.internships SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn restore_internship(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE kkl.internships SET deleted_at = NULL WHERE id = $1 AND deleted_at IS NOT NULL",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn fetch_completion_snapshots(
    pool: &PgPool,
    advisor_email: Option<&str>,
    student_email: Option<&str>,
) -> anyhow::Result<Vec<CompletionSnapshot>> {
    let mut query = format!(
        "SELECT {INTERNSHIP_COLUMNS}, \
         (SELECT COUNT(*) FROM kkl.logbooks l \
          WHERE l.internship_id = i.id AND l.date BETWEEN i.start_date AND i.end_date) \
          AS logbook_count, \
         EXISTS (SELECT 1 FROM kkl.reports r \
          WHERE r.internship_id = i.id AND r.status = 'approved') AS has_approved_report \
         FROM kkl.internships i \
         WHERE i.status = 'accepted' AND i.deleted_at IS NULL"
    );

    if advisor_email.is_some() {
        query.push_str(" AND i.advisor_email = $1");
    } else if student_email.is_some() {
        query.push_str(" AND i.student_email = $1");
    }
    query.push_str(" ORDER BY i.end_date NULLS LAST, i.student_name");

    let mut rows = sqlx::query(&query);

    if let Some(value) = advisor_email {
        rows = rows.bind(value);
    } else if let Some(value) = student_email {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut snapshots = Vec::with_capacity(records.len());

    for row in records {
        let logbook_count: i64 = row.get("logbook_count");
        snapshots.push(CompletionSnapshot {
            internship: internship_from_row(&row)?,
            logbook_count: u64::try_from(logbook_count).context("negative logbook count")?,
            has_approved_report: row.get("has_approved_report"),
        });
    }

    Ok(snapshots)
}

pub async fn fetch_internship_records(pool: &PgPool, id: Uuid) -> anyhow::Result<InternshipRecords> {
    let internship = fetch_internship(pool, id).await?;

    let logbooks = sqlx::query(
        "SELECT id, internship_id, date, activity, supervisor_note FROM kkl.logbooks \
         WHERE internship_id = $1 ORDER BY date",
    )
    .bind(id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| LogbookEntry {
        id: row.get("id"),
        internship_id: row.get("internship_id"),
        date: row.get("date"),
        activity: row.get("activity"),
        supervisor_note: row.get("supervisor_note"),
    })
    .collect();

    let mut reports = Vec::new();
    for row in sqlx::query(
        "SELECT id, internship_id, file_path, status, reviewer_note, submitted_at \
         FROM kkl.reports WHERE internship_id = $1 ORDER BY submitted_at",
    )
    .bind(id)
    .fetch_all(pool)
    .await?
    {
        let status: String = row.get("status");
        reports.push(Report {
            id: row.get("id"),
            internship_id: row.get("internship_id"),
            file_path: row.get("file_path"),
            status: status.parse()?,
            reviewer_note: row.get("reviewer_note"),
            submitted_at: row.get("submitted_at"),
        });
    }

    Ok(InternshipRecords {
        internship,
        logbooks,
        reports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_review_is_an_error() {
        let id = Uuid::new_v4();
        assert!(ensure_reviewed("internship", id, 1).is_ok());

        let error = ensure_reviewed("internship", id, 0).unwrap_err();
        assert_eq!(
            error.to_string(),
            format!("internship {id} was reviewed concurrently, reload and try again")
        );
    }

    #[test]
    fn report_review_skips_deleted_internships() {
        for query in [REPORT_STATUS_QUERY, REPORT_REVIEW_UPDATE] {
            assert!(query.contains("i.id = r.internship_id"));
            assert!(query.contains("i.deleted_at IS NULL"));
        }
        assert!(REPORT_REVIEW_UPDATE.contains("r.status = $4"));
    }

    #[test]
    fn logbook_rows_parse_before_any_write() {
        let csv = "internship_id,date,activity,supervisor_note\n\
            b3f0e6d4-71c2-4b8e-a0d9-5c7e2a9f4d22,2024-01-04,Tested PLC wiring,Good progress\n\
            b3f0e6d4-71c2-4b8e-a0d9-5c7e2a9f4d22,2024-01-05,Wrote checklist,\n";
        let rows = parse_logbook_rows(csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
        assert_eq!(rows[0].supervisor_note.as_deref(), Some("Good progress"));
        assert!(rows[1].supervisor_note.as_deref().unwrap_or("").is_empty());
    }

    #[test]
    fn one_bad_logbook_row_rejects_the_file() {
        let csv = "internship_id,date,activity,supervisor_note\n\
            b3f0e6d4-71c2-4b8e-a0d9-5c7e2a9f4d22,2024-01-04,Tested PLC wiring,\n\
            b3f0e6d4-71c2-4b8e-a0d9-5c7e2a9f4d22,2024-13-40,Impossible day,\n";
        let error = parse_logbook_rows(csv.as_bytes()).unwrap_err();
        assert_eq!(error.to_string(), "invalid logbook row 2");
    }
}
