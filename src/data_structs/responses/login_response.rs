use serde::{Deserialize, Serialize};

use crate::data_structs::user::PublicProfile;

#[derive(Debug, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct LoginResponse {
    pub user: PublicProfile,
}
