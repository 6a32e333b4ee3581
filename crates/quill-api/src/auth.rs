use axum::{Json, extract::State, response::IntoResponse};
use axum_extra::extract::WithRejection;
use tracing::{info, warn};

use quill_cache::PendingSignup;
use quill_db::models::NewUser;
use quill_mail::OutgoingMail;
use quill_types::api::{
    LoginRequest, LoginResponse, SignUpRequest, Success, VerifyEmailRequest, VerifyEmailResponse,
};
use quill_types::models::Role;

use crate::error::ApiError;
use crate::password::generate_code;
use crate::state::{AppState, run_hasher, run_store};
use crate::views::user_info;

/// Trim and lowercase, then require `local@domain.tld`.
pub(crate) fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(ApiError::Validation("email is not valid".into()));
    }
    Ok(email)
}

/// Default display name: the local part of the address.
fn display_name(email: &str) -> String {
    email
        .split_once('@')
        .map(|(local, _)| local)
        .unwrap_or(email)
        .to_string()
}

pub async fn signup(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<SignUpRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email)?;
    let role: Role = req
        .role
        .parse()
        .map_err(|e: quill_types::models::UnknownRole| ApiError::Validation(e.to_string()))?;
    if req.password.is_empty() {
        return Err(ApiError::Validation("password is required".into()));
    }

    let lookup = email.clone();
    if run_store(&state, move |s| s.get_user_by_email(&lookup))
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(
            "email already taken, please log in".into(),
        ));
    }

    let code = generate_code();
    let password = req.password;
    let plain_code = code.clone();
    let (password_hash, code_hash) = run_hasher(&state, move |h| {
        Ok((h.hash(&password)?, h.hash(&plain_code)?))
    })
    .await?;

    state
        .signups
        .put(&PendingSignup {
            password: password_hash,
            code: code_hash,
            email: email.clone(),
            role,
        })
        .await?;

    if !state.mail.enqueue(OutgoingMail::verification(&email, &code)) {
        warn!(email = %email, "verification mail was not queued");
    }

    info!(email = %email, role = %role, "signup pending verification");
    Ok(Json(Success::ok(
        "Successfully sent code, please check your inbox!",
    )))
}

pub async fn verify_email(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<VerifyEmailRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email)?;

    let pending = state.signups.get(&email).await?.ok_or_else(|| {
        ApiError::NotFound("no pending signup for this email, it may have expired".into())
    })?;

    let code = req.code;
    let code_hash = pending.code.clone();
    if !run_hasher(&state, move |h| h.verify(&code, &code_hash)).await? {
        return Err(ApiError::InvalidCredentials("code is not valid".into()));
    }

    // The pending entry stays until its TTL; a repeat verify lands on the
    // unique email and reports a conflict.
    let new_user = NewUser {
        name: display_name(&pending.email),
        email: pending.email,
        password_hash: pending.password,
        role: pending.role,
    };
    let user = run_store(&state, move |s| s.create_user(&new_user))
        .await
        .map_err(|e| match e {
            ApiError::Conflict(_) => {
                ApiError::Conflict("account already verified, please log in".into())
            }
            other => other,
        })?;

    let (access_token, _) = state.tokens.issue(&user, false)?;

    info!(user_id = user.id, email = %user.email, "account verified");
    Ok(Json(VerifyEmailResponse {
        user_info: user_info(&user),
        access_token,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email)?;

    let lookup = email.clone();
    let user = run_store(&state, move |s| s.get_user_by_email(&lookup))
        .await?
        .ok_or_else(|| ApiError::NotFound("no account with this email".into()))?;

    let password = req.password;
    let stored = user.password.clone();
    if !run_hasher(&state, move |h| h.verify(&password, &stored)).await? {
        return Err(ApiError::InvalidCredentials("password is not correct".into()));
    }

    let (access_token, _) = state.tokens.issue(&user, req.remember_me)?;

    info!(user_id = user.id, remember_me = req.remember_me, "login");
    Ok(Json(LoginResponse {
        user_info: user_info(&user),
        access_token,
        remember_me: req.remember_me,
    }))
}
