use actix_web::cookie::{Cookie, SameSite};
use actix_web::cookie::time::Duration;
use actix_web::http::header;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use chrono::Utc;

use crate::auth::AuthError;
use crate::data_structs::requests::login_request::LoginRequest;
use crate::data_structs::responses::login_response::LoginResponse;
use crate::encrypted_signing::SESSION_TTL_SECONDS;
use crate::SharedResources;

pub const TOKEN_COOKIE: &str = "token";

fn session_cookie(token: String, max_age_seconds: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE, token)
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(secure)
        .max_age(Duration::seconds(max_age_seconds))
        .finish()
}

/// The session token from the `token` cookie, or a `Bearer` header.
fn presented_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(TOKEN_COOKIE) {
        return Some(cookie.value().to_string());
    }
    req.headers().get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

#[post("/login")]
pub async fn login(data: web::Data<SharedResources>, payload: web::Json<LoginRequest>) -> Result<HttpResponse, AuthError> {
    let request = payload.into_inner();

    let session = match data.auth.authenticate(&request).await {
        Ok(session) => session,
        Err(err) => {
            match &err {
                AuthError::InvalidCredentials(reason) => log::info!("login refused: {reason:?}"),
                AuthError::Internal(message) => log::error!("login failed: {message}"),
                _ => {}
            }
            return Err(err);
        }
    };

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(session.token, SESSION_TTL_SECONDS, data.secure_cookie))
        .json(LoginResponse { user: session.user }))
}

#[get("/me")]
pub async fn me(data: web::Data<SharedResources>, req: HttpRequest) -> Result<HttpResponse, AuthError> {
    let token = presented_token(&req).ok_or(AuthError::NotAuthenticated)?;
    let user = data.auth.profile(&token, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(LoginResponse { user }))
}

/// Always answers with an expired cookie; a failed status write is only logged.
#[post("/logout")]
pub async fn logout(data: web::Data<SharedResources>, req: HttpRequest) -> HttpResponse {
    if let Some(token) = presented_token(&req) {
        if let Err(err) = data.auth.logout(&token, Utc::now()).await {
            log::error!("logout could not update the user: {err}");
        }
    }

    HttpResponse::Ok()
        .cookie(session_cookie(String::new(), 0, data.secure_cookie))
        .finish()
}
