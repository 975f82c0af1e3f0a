pub mod auth_api;

use actix_web::{error, get, web, HttpRequest, HttpResponse, Responder, ResponseError};
use actix_web::http::StatusCode;

use crate::auth::AuthError;
use crate::data_structs::responses::error_response::ErrorResponse;

#[get("/ping")]
async fn debug_ping() -> impl Responder {
    // just to test that the server is running
    "Pong!"
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::BadRequest => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials(_) | AuthError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.to_string()))
    }
}

/// Malformed login bodies get the same answer as missing fields.
fn json_error_handler(err: error::JsonPayloadError, _req: &HttpRequest) -> error::Error {
    log::debug!("rejected request body: {err}");
    AuthError::BadRequest.into()
}

/// Mounts every route under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api")
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(debug_ping)
        .service(web::scope("/auth")
            .service(auth_api::login)
            .service(auth_api::logout)
            .service(auth_api::me)
        )
    );
}
