//! Mentorship repository — the mentorship document store.
//!
//! A mentorship row carries its whole conversation as JSON columns. Writes go
//! through [`save`], a compare-and-swap on the `version` column: a caller that
//! loaded version N can only write if nobody else wrote in between, so
//! concurrent senders never overwrite each other's messages.

use alumni_common::models::mentorship::{Mentorship, MentorshipStatus};
use sqlx::{AnyPool, Row, any::AnyRow};
use uuid::Uuid;

use super::users;
use crate::any_compat::*;

fn mentorship_from_row(row: &AnyRow) -> Result<Mentorship, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(Mentorship {
        id: get_uuid(row, "id")?,
        student_id: get_uuid(row, "student_id")?,
        alumni_id: get_uuid(row, "alumni_id")?,
        status: status
            .parse::<MentorshipStatus>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        message: row.try_get("message")?,
        topic: row.try_get("topic")?,
        resume_url: row.try_get("resume_url")?,
        response: row.try_get("response")?,
        messages: get_json(row, "messages")?,
        mentor_notes: get_json(row, "mentor_notes")?,
        muted_by: get_json(row, "muted_by")?,
        archived_by: get_json(row, "archived_by")?,
        last_message_at: get_opt_datetime(row, "last_message_at")?,
        version: row.try_get("version")?,
        created_at: get_datetime(row, "created_at")?,
        updated_at: get_datetime(row, "updated_at")?,
    })
}

/// Insert a freshly created (pending) mentorship.
pub async fn insert(pool: &AnyPool, m: &Mentorship) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO mentorships (
            id, student_id, alumni_id, status, message, topic, resume_url, response,
            messages, mentor_notes, muted_by, archived_by, last_message_at,
            version, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        "#,
    )
    .bind(m.id.to_string())
    .bind(m.student_id.to_string())
    .bind(m.alumni_id.to_string())
    .bind(m.status.as_str())
    .bind(&m.message)
    .bind(&m.topic)
    .bind(m.resume_url.as_deref())
    .bind(m.response.as_deref())
    .bind(to_json(&m.messages)?)
    .bind(to_json(&m.mentor_notes)?)
    .bind(to_json(&m.muted_by)?)
    .bind(to_json(&m.archived_by)?)
    .bind(m.last_message_at.map(format_datetime))
    .bind(m.version)
    .bind(format_datetime(m.created_at))
    .bind(format_datetime(m.updated_at))
    .execute(pool)
    .await?;
    Ok(())
}

/// Find a mentorship by ID.
pub async fn find_by_id(pool: &AnyPool, id: Uuid) -> Result<Option<Mentorship>, sqlx::Error> {
    sqlx::query("SELECT * FROM mentorships WHERE id = $1")
        .bind(id.to_string())
        .try_map(|row: AnyRow| mentorship_from_row(&row))
        .fetch_optional(pool)
        .await
}

/// Whose mentorships to list.
#[derive(Debug, Clone, Copy)]
pub enum ListScope {
    Student(Uuid),
    Alumni(Uuid),
    All,
}

/// List mentorships, most recent activity first.
pub async fn list(pool: &AnyPool, scope: ListScope) -> Result<Vec<Mentorship>, sqlx::Error> {
    const ORDER: &str = "ORDER BY COALESCE(last_message_at, created_at) DESC, id DESC";

    let (sql, owner) = match scope {
        ListScope::Student(id) => (
            format!("SELECT * FROM mentorships WHERE student_id = $1 {ORDER}"),
            Some(id),
        ),
        ListScope::Alumni(id) => (
            format!("SELECT * FROM mentorships WHERE alumni_id = $1 {ORDER}"),
            Some(id),
        ),
        ListScope::All => (format!("SELECT * FROM mentorships {ORDER}"), None),
    };

    let mut q = sqlx::query(&sql);
    if let Some(id) = owner {
        q = q.bind(id.to_string());
    }
    q.try_map(|row: AnyRow| mentorship_from_row(&row))
        .fetch_all(pool)
        .await
}

/// Number of `accepted` mentorships an alumni currently carries.
pub async fn count_accepted_for_alumni(pool: &AnyPool, alumni_id: Uuid) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS n FROM mentorships WHERE alumni_id = $1 AND status = 'accepted'",
    )
    .bind(alumni_id.to_string())
    .fetch_one(pool)
    .await?;
    row.try_get("n")
}

/// Number of `accepted` mentorships a student has (0 or 1).
pub async fn count_accepted_for_student(pool: &AnyPool, student_id: Uuid) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS n FROM mentorships WHERE student_id = $1 AND status = 'accepted'",
    )
    .bind(student_id.to_string())
    .fetch_one(pool)
    .await?;
    row.try_get("n")
}

/// Whether `student_id` already has an open request to `alumni_id`.
pub async fn has_pending_request(
    pool: &AnyPool,
    student_id: Uuid,
    alumni_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS n FROM mentorships
        WHERE student_id = $1 AND alumni_id = $2 AND status = 'pending'
        "#,
    )
    .bind(student_id.to_string())
    .bind(alumni_id.to_string())
    .fetch_one(pool)
    .await?;
    let n: i64 = row.try_get("n")?;
    Ok(n > 0)
}

/// Extra conditions checked atomically when a write activates a mentorship.
#[derive(Debug, Clone, Copy)]
pub struct AcceptGuard {
    /// The alumni's capacity; the write only lands while they carry fewer
    /// accepted mentorships than this.
    pub capacity: i64,
}

/// Persist `m` if the stored row is still at `m.version`.
///
/// Returns `false` when another writer got there first (or, with a guard,
/// when accepting would break a capacity rule); the caller reloads and
/// retries. On success the stored version is `m.version + 1`.
///
/// A guarded write first takes the alumni's row lock
/// ([`users::lock_row`]) in the same transaction, so accepts for one alumni
/// are serialized even when they touch different mentorship rows.
pub async fn save(
    pool: &AnyPool,
    m: &Mentorship,
    guard: Option<AcceptGuard>,
) -> Result<bool, sqlx::Error> {
    let mut sql = String::from(
        r#"
        UPDATE mentorships SET
            status = $1,
            response = $2,
            messages = $3,
            mentor_notes = $4,
            muted_by = $5,
            archived_by = $6,
            last_message_at = $7,
            updated_at = $8,
            version = version + 1
        WHERE id = $9 AND version = $10
        "#,
    );
    if guard.is_some() {
        sql.push_str(
            r#"
          AND (SELECT COUNT(*) FROM mentorships a
               WHERE a.alumni_id = $11 AND a.status = 'accepted') < $12
          AND NOT EXISTS (SELECT 1 FROM mentorships s
               WHERE s.student_id = $13 AND s.status = 'accepted')
            "#,
        );
    }

    let mut query = sqlx::query(&sql)
        .bind(m.status.as_str())
        .bind(m.response.as_deref())
        .bind(to_json(&m.messages)?)
        .bind(to_json(&m.mentor_notes)?)
        .bind(to_json(&m.muted_by)?)
        .bind(to_json(&m.archived_by)?)
        .bind(m.last_message_at.map(format_datetime))
        .bind(format_datetime(m.updated_at))
        .bind(m.id.to_string())
        .bind(m.version);

    if let Some(guard) = guard {
        query = query
            .bind(m.alumni_id.to_string())
            .bind(guard.capacity)
            .bind(m.student_id.to_string());
    }

    let result = match guard {
        None => query.execute(pool).await?,
        Some(_) => {
            let mut tx = pool.begin().await?;
            users::lock_row(&mut *tx, m.alumni_id).await?;
            let result = query.execute(&mut *tx).await?;
            tx.commit().await?;
            result
        }
    };
    Ok(result.rows_affected() == 1)
}
