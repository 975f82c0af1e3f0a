pub mod api;
pub mod auth;
pub mod catalog;
pub mod credential_store;
pub mod database;
pub mod encrypted_signing;

pub mod data_structs {
    pub mod app_config;
    pub mod content_item;
    pub mod user;

    pub mod requests {
        pub mod login_request;
    }

    pub mod responses {
        pub mod error_response;
        pub mod login_response;
    }
}

use crate::auth::AuthService;

/// Everything the request handlers share, handed to actix as `web::Data`.
#[derive(Clone)]
pub struct SharedResources {
    pub auth: AuthService,
    pub secure_cookie: bool,
}

impl SharedResources {
    pub fn new(auth: AuthService, secure_cookie: bool) -> Self {
        SharedResources { auth, secure_cookie }
    }
}
