use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use chrono::Utc;
use sqlx::PgPool;
use tracing::info;

use crate::{
    utils,
    web::{
        types::{
            DataParsingError, RequestMeta, SavedResponse, ValidSignup, WaitlistEntry,
            WaitlistSubmission,
        },
        Error, WebResult,
    },
    AppState,
};

// ###################################
// ->   ERROR
// ###################################
#[derive(thiserror::Error)]
pub enum WaitlistError {
    #[error("data parsing error: {0}")]
    DataParsing(#[from] DataParsingError),

    #[error("failed to upsert the waitlist entry")]
    Storage(#[from] sqlx::Error),
}

impl std::fmt::Debug for WaitlistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        utils::error_chain_fmt(self, f)
    }
}

// ###################################
// ->   API
// ###################################
#[tracing::instrument(
    name = "Adding a signup to the waitlist",
    skip_all,
    fields(email = tracing::field::Empty, audience = tracing::field::Empty)
)]
pub async fn waitlist_join(
    State(app_state): State<AppState>,
    meta: RequestMeta,
    body: Bytes,
) -> WebResult<Json<SavedResponse>> {
    let submission = WaitlistSubmission::from_json_slice(&body).map_err(WaitlistError::from)?;
    let signup = ValidSignup::try_from(submission).map_err(WaitlistError::from)?;

    let span = tracing::Span::current();
    span.record("email", signup.email.as_ref());
    span.record("audience", signup.audience.as_ref());

    let entry = WaitlistEntry::new(signup, meta, Utc::now());
    upsert_entry(app_state.database_mgr.db(), &entry)
        .await
        .map_err(WaitlistError::from)?;
    info!("SUCCESS");

    // Echo only the normalized fields, never the request metadata.
    Ok(Json(SavedResponse::from(entry.signup)))
}

/// CORS preflight, the headers are added by the response middleware.
pub async fn waitlist_preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn method_not_allowed() -> WebResult<()> {
    Err(Error::MethodNotAllowed)
}

// ###################################
// ->   HELPERS
// ###################################

/// Inserts the entry or replaces every field of the existing row with the same email.
/// A single statement, so concurrent submissions for one email never interleave.
async fn upsert_entry(db: &PgPool, entry: &WaitlistEntry) -> Result<(), sqlx::Error> {
    let WaitlistEntry { signup, ts, meta } = entry;

    sqlx::query(
        r#"
        INSERT INTO waitlist (email, audience, org, ts, ua, ip)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (email) DO UPDATE
        SET audience = EXCLUDED.audience,
            org = EXCLUDED.org,
            ts = EXCLUDED.ts,
            ua = EXCLUDED.ua,
            ip = EXCLUDED.ip
    "#,
    )
    .bind(signup.email.as_ref())
    .bind(signup.audience.as_ref())
    .bind(signup.org.as_deref())
    .bind(*ts)
    .bind(meta.user_agent.as_deref())
    .bind(meta.ip.as_deref())
    .execute(db)
    .await?;

    Ok(())
}
