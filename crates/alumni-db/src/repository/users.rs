//! User repository — profiles, mentoring settings, and the mentor directory.

use alumni_common::models::user::{MentorListing, Role, User};
use chrono::Utc;
use sqlx::{AnyConnection, AnyPool, Row, any::AnyRow};
use uuid::Uuid;

use crate::any_compat::*;

fn user_from_row(row: &AnyRow) -> Result<User, sqlx::Error> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: get_uuid(row, "id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        role: role
            .parse::<Role>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        headline: row.try_get("headline")?,
        resume_url: row.try_get("resume_url")?,
        mentoring_enabled: get_flag(row, "mentoring_enabled")?,
        mentorship_capacity: row.try_get("mentorship_capacity")?,
        created_at: get_datetime(row, "created_at")?,
        updated_at: get_datetime(row, "updated_at")?,
    })
}

/// Profile fields for a new user, mirrored from the identity provider.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub role: Role,
    pub headline: Option<&'a str>,
    pub resume_url: Option<&'a str>,
    pub mentoring_enabled: bool,
    pub mentorship_capacity: i64,
}

/// Create a user profile.
pub async fn create_user(pool: &AnyPool, new: &NewUser<'_>) -> Result<User, sqlx::Error> {
    let now = format_datetime(Utc::now());
    sqlx::query(
        r#"
        INSERT INTO users (
            id, name, email, role, headline, resume_url,
            mentoring_enabled, mentorship_capacity, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(new.id.to_string())
    .bind(new.name)
    .bind(new.email)
    .bind(new.role.as_str())
    .bind(new.headline)
    .bind(new.resume_url)
    .bind(i64::from(new.mentoring_enabled))
    .bind(new.mentorship_capacity)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    find_by_id(pool, new.id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Find a user by their unique ID.
pub async fn find_by_id(pool: &AnyPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query("SELECT * FROM users WHERE id = $1")
        .bind(id.to_string())
        .try_map(|row: AnyRow| user_from_row(&row))
        .fetch_optional(pool)
        .await
}

/// Hold the user's row for the rest of the transaction on `conn`.
///
/// Every write that depends on an alumni's accepted count takes this first,
/// so those writes run one at a time per alumni and each sees the others'
/// committed result.
pub async fn lock_row(conn: &mut AnyConnection, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET updated_at = updated_at WHERE id = $1")
        .bind(id.to_string())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Turn mentoring on/off and optionally change capacity.
///
/// Returns `false` without writing when the user does not exist or the new
/// capacity is below the number of mentorships they have already accepted.
pub async fn update_mentoring(
    pool: &AnyPool,
    id: Uuid,
    enabled: bool,
    capacity: Option<i64>,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    if !lock_row(&mut *tx, id).await? {
        return Ok(false);
    }

    let result = sqlx::query(
        r#"
        UPDATE users SET
            mentoring_enabled = $1,
            mentorship_capacity = COALESCE($2, mentorship_capacity),
            updated_at = $3
        WHERE id = $4
          AND COALESCE($2, mentorship_capacity) >= (
              SELECT COUNT(*) FROM mentorships
              WHERE alumni_id = $4 AND status = 'accepted'
          )
        "#,
    )
    .bind(i64::from(enabled))
    .bind(capacity)
    .bind(format_datetime(Utc::now()))
    .bind(id.to_string())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(result.rows_affected() == 1)
}

/// Point the profile at a newly uploaded resume. Existing mentorships keep
/// the reference they were created with.
pub async fn update_resume(
    pool: &AnyPool,
    id: Uuid,
    resume_url: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query("UPDATE users SET resume_url = $1, updated_at = $2 WHERE id = $3")
        .bind(resume_url)
        .bind(format_datetime(Utc::now()))
        .bind(id.to_string())
        .execute(pool)
        .await?;

    find_by_id(pool, id).await
}

/// Alumni currently accepting mentees, with their remaining slots.
pub async fn list_mentors(pool: &AnyPool) -> Result<Vec<MentorListing>, sqlx::Error> {
    sqlx::query(
        r#"
        SELECT
            u.id, u.name, u.headline, u.mentorship_capacity,
            (SELECT COUNT(*) FROM mentorships m
             WHERE m.alumni_id = u.id AND m.status = 'accepted') AS accepted_count
        FROM users u
        WHERE u.role = 'alumni' AND u.mentoring_enabled = 1
        ORDER BY u.name
        "#,
    )
    .try_map(|row: AnyRow| {
        let capacity: i64 = row.try_get("mentorship_capacity")?;
        let accepted: i64 = row.try_get("accepted_count")?;
        Ok(MentorListing {
            id: get_uuid(&row, "id")?,
            name: row.try_get("name")?,
            headline: row.try_get("headline")?,
            mentorship_capacity: capacity,
            available_slots: (capacity - accepted).max(0),
        })
    })
    .fetch_all(pool)
    .await
}
