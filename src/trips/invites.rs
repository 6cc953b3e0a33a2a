use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::db::DbPool;
use crate::error::AppError;
use crate::models::invite::InviteStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteAnswer {
    Accept,
    Decline,
}

struct PendingInvite {
    trip_id: String,
    role: String,
    invited_by: String,
}

/// Answer a pending invite as the invited user. Accepting grants the
/// invite's preset role in the same transaction that records the answer;
/// declining only records it. Either way `answered_at` is stamped and the
/// invitee is linked to their account.
pub async fn answer_invite(
    db: &DbPool,
    user: &AuthenticatedUser,
    invite_id: &str,
    answer: InviteAnswer,
) -> Result<InviteStatus, AppError> {
    let invite = load_pending_invite(db, invite_id, &user.email).await?;
    let status = match answer {
        InviteAnswer::Accept => InviteStatus::Accepted,
        InviteAnswer::Decline => InviteStatus::Declined,
    };

    let mut tx = db.begin().await?;
    sqlx::query(
        r#"UPDATE trip_invites
           SET status = ?1, invited_user_id = ?2, answered_at = ?3
           WHERE id = ?4"#,
    )
    .bind(status.as_str())
    .bind(&user.id)
    .bind(Utc::now())
    .bind(invite_id)
    .execute(&mut *tx)
    .await?;

    if answer == InviteAnswer::Accept {
        sqlx::query(
            r#"INSERT INTO trip_users (id, trip_id, user_id, role, added_by)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&invite.trip_id)
        .bind(&user.id)
        .bind(&invite.role)
        .bind(&invite.invited_by)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(status)
}

async fn load_pending_invite(
    db: &DbPool,
    invite_id: &str,
    user_email: &str,
) -> Result<PendingInvite, AppError> {
    let row = sqlx::query(
        "SELECT trip_id, email, role, invited_by, status FROM trip_invites WHERE id = ?1",
    )
    .bind(invite_id)
    .fetch_optional(db)
    .await?
    .ok_or(AppError::NotFound)?;

    let status: String = row.get("status");
    if status != InviteStatus::Pending.as_str() {
        return Err(AppError::BadRequest("invite has already been answered".into()));
    }
    let email: String = row.get("email");
    if !email.eq_ignore_ascii_case(user_email) {
        return Err(AppError::Forbidden);
    }

    Ok(PendingInvite {
        trip_id: row.get("trip_id"),
        role: row.get("role"),
        invited_by: row.get("invited_by"),
    })
}
