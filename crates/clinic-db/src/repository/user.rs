//! # User Repository
//!
//! Staff accounts and PIN login.
//!
//! PINs are never stored in clear text; `pin_hash` holds an argon2 PHC
//! string and nothing outside this module ever sees it.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use clinic_core::{Role, StaffMember};

/// Input for a new staff account.
#[derive(Debug, Clone)]
pub struct NewStaff {
    pub username: String,
    pub pin: String,
    pub display_name: String,
    pub role: Role,
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    id: i64,
    username: String,
    display_name: String,
    role: Role,
    pin_hash: String,
}

impl From<CredentialRow> for StaffMember {
    fn from(row: CredentialRow) -> Self {
        StaffMember {
            id: row.id,
            username: row.username,
            display_name: row.display_name,
            role: row.role,
        }
    }
}

/// Repository for staff accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Checks a username/PIN pair.
    ///
    /// ## Returns
    /// * `Ok(Some(staff))` - credentials match
    /// * `Ok(None)` - unknown username or wrong PIN (indistinguishable)
    pub async fn authenticate(&self, username: &str, pin: &str) -> DbResult<Option<StaffMember>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT id, username, display_name, role, pin_hash
            FROM users
            WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) if verify_pin(pin, &row.pin_hash) => Ok(Some(row.into())),
            Some(_) => {
                warn!(username = %username, "PIN mismatch");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Gets a staff member by ID.
    pub async fn get(&self, id: i64) -> DbResult<Option<StaffMember>> {
        let staff = sqlx::query_as::<_, StaffMember>(
            "SELECT id, username, display_name, role FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(staff)
    }

    /// Staff picker list, ordered by role then display name.
    pub async fn list_staff(&self) -> DbResult<Vec<StaffMember>> {
        let staff = sqlx::query_as::<_, StaffMember>(
            r#"
            SELECT id, username, display_name, role
            FROM users
            ORDER BY role, display_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(staff)
    }

    /// Every account in creation order (staff management screen).
    pub async fn list_all(&self) -> DbResult<Vec<StaffMember>> {
        let users = sqlx::query_as::<_, StaffMember>(
            "SELECT id, username, display_name, role FROM users ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Creates a staff account.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - username already taken
    pub async fn create(&self, staff: &NewStaff) -> DbResult<StaffMember> {
        debug!(username = %staff.username, role = %staff.role, "Creating staff account");

        let pin_hash = hash_pin(&staff.pin)?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, pin_hash, display_name, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id
            "#,
        )
        .bind(&staff.username)
        .bind(&pin_hash)
        .bind(&staff.display_name)
        .bind(staff.role)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: staff.username.clone(),
            },
            other => other,
        })?;

        Ok(StaffMember {
            id,
            username: staff.username.clone(),
            display_name: staff.display_name.clone(),
            role: staff.role,
        })
    }

    /// Replaces a staff member's PIN.
    pub async fn reset_pin(&self, id: i64, pin: &str) -> DbResult<()> {
        debug!(id, "Resetting PIN");

        let pin_hash = hash_pin(pin)?;
        let result = sqlx::query("UPDATE users SET pin_hash = ?2 WHERE id = ?1")
            .bind(id)
            .bind(&pin_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    /// Deletes a staff account.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no such account
    /// * `DbError::ForeignKeyViolation` - the account still owns orders,
    ///   payments or appointments
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting staff account");

        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    /// Number of accounts.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// PIN Hashing
// =============================================================================

/// Hashes a PIN for storage (argon2id, random salt).
pub fn hash_pin(pin: &str) -> DbResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map_err(|e| DbError::Internal(format!("Failed to hash PIN: {}", e)))?;

    Ok(hash.to_string())
}

/// Verifies a PIN against a stored hash. Malformed hashes never verify.
pub fn verify_pin(pin: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(pin.as_bytes(), &parsed_hash)
        .is_ok()
}

// =============================================================================
// Unit Tests
// =============================================================================
