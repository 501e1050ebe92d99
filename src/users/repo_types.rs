use sqlx::FromRow;
use uuid::Uuid;

/// User record as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: Uuid,                // assigned by the store, never changes
    pub name: String,            // display name
    pub email: String,           // unique login identifier
    pub password_hash: String,   // Argon2 PHC string, never exposed
}

/// A record that has passed validation but has no id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}
