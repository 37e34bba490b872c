use super::{OptionalExt, text_enum};
use crate::Database;
use crate::models::{InfluencerProfileRow, UserRow, VerificationTokenRow};
use anyhow::Result;
use chrono::{DateTime, Utc};
use pepperpot_types::models::UserRole;
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str = "id, email, name, image, password, role, email_verified_at, created_at";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        name: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, name, password, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, email, name, password_hash, UserRole::User.as_str(), Utc::now()],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_role(&self, id: &str) -> Result<Option<UserRole>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT role FROM users WHERE id = ?1", [id], |row| text_enum(row, 0))
                .optional()
        })
    }

    pub fn set_user_role(&self, id: &str, role: UserRole) -> Result<bool> {
        self.with_conn(|conn| {
            let changed =
                conn.execute("UPDATE users SET role = ?1 WHERE id = ?2", (role.as_str(), id))?;
            Ok(changed > 0)
        })
    }

    pub fn mark_email_verified(&self, email: &str, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET email_verified_at = ?1 WHERE email = ?2",
                rusqlite::params![at, email],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn update_password(&self, email: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?1 WHERE email = ?2",
                (password_hash, email),
            )?;
            Ok(changed > 0)
        })
    }

    // -- Verification tokens --

    pub fn create_verification_token(
        &self,
        identifier: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO verification_tokens (identifier, token, expires_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![identifier, token, expires_at],
            )?;
            Ok(())
        })
    }

    /// Drops every outstanding token for `identifier` and stores a fresh one.
    pub fn replace_verification_tokens(
        &self,
        identifier: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM verification_tokens WHERE identifier = ?1", [identifier])?;
            tx.execute(
                "INSERT INTO verification_tokens (identifier, token, expires_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![identifier, token, expires_at],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_verification_token(&self, token: &str) -> Result<Option<VerificationTokenRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT identifier, token, expires_at FROM verification_tokens WHERE token = ?1",
                [token],
                |row| {
                    Ok(VerificationTokenRow {
                        identifier: row.get(0)?,
                        token: row.get(1)?,
                        expires_at: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn delete_verification_token(&self, token: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM verification_tokens WHERE token = ?1", [token])?;
            Ok(())
        })
    }

    // -- Influencer profiles --

    pub fn upsert_influencer_profile(
        &self,
        user_id: &str,
        display_name: &str,
        bio: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO influencer_profiles (user_id, display_name, bio) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET display_name = excluded.display_name, bio = excluded.bio",
                (user_id, display_name, bio),
            )?;
            Ok(())
        })
    }

    pub fn get_influencer_profile(&self, user_id: &str) -> Result<Option<InfluencerProfileRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT user_id, display_name, bio FROM influencer_profiles WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(InfluencerProfileRow {
                        user_id: row.get(0)?,
                        display_name: row.get(1)?,
                        bio: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    conn.query_row(&sql, [value], user_from_row).optional()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        image: row.get(3)?,
        password: row.get(4)?,
        role: text_enum(row, 5)?,
        email_verified_at: row.get(6)?,
        created_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{db, user};
    use crate::is_unique_violation;
    use chrono::{Duration, Utc};
    use pepperpot_types::models::UserRole;

    #[test]
    fn duplicate_email_is_a_unique_violation() {
        let db = db();
        user(&db, "cook@example.com");
        let err = db.create_user("other", "cook@example.com", None, None).unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn role_round_trips_through_text_column() {
        let db = db();
        let id = user(&db, "admin@example.com");
        assert_eq!(db.get_user_role(&id).unwrap(), Some(UserRole::User));
        db.set_user_role(&id, UserRole::Admin).unwrap();
        assert_eq!(db.get_user_by_id(&id).unwrap().unwrap().role, UserRole::Admin);
    }

    #[test]
    fn replacing_tokens_drops_previous_ones() {
        let db = db();
        let expires = Utc::now() + Duration::hours(1);
        db.create_verification_token("a@example.com", "first", expires).unwrap();
        db.replace_verification_tokens("a@example.com", "second", expires).unwrap();
        assert!(db.get_verification_token("first").unwrap().is_none());
        let row = db.get_verification_token("second").unwrap().unwrap();
        assert_eq!(row.identifier, "a@example.com");
    }

    #[test]
    fn influencer_profile_upserts() {
        let db = db();
        let id = user(&db, "chef@example.com");
        db.upsert_influencer_profile(&id, "Chef", None).unwrap();
        db.upsert_influencer_profile(&id, "Chef Ana", Some("Pastry")).unwrap();
        let profile = db.get_influencer_profile(&id).unwrap().unwrap();
        assert_eq!(profile.display_name, "Chef Ana");
        assert_eq!(profile.bio.as_deref(), Some("Pastry"));
    }
}
