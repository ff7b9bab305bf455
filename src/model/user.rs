use super::role::Role;

/// Login account. `password` holds the argon2 PHC string, never the plain text.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserAccount {
    pub id: u64,
    pub username: String,
    pub password: String,
    pub role_id: u8,
    pub employee_id: Option<u64>,
    pub is_active: bool,
}

/// Account to create; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub employee_id: Option<u64>,
}
