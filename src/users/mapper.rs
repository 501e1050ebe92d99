use crate::{
    auth::password::hash_password,
    error::AppResult,
    users::{
        dto::{UserRequest, UserResponse},
        repo_types::{NewUser, User},
    },
};

pub fn to_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
    }
}

/// Hashes the password, so call it off the async executor.
pub fn to_record(request: UserRequest) -> AppResult<NewUser> {
    let password_hash = hash_password(&request.password)?;
    Ok(NewUser {
        name: request.name,
        email: request.email,
        password_hash,
    })
}
