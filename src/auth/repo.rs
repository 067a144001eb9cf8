use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::User;

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, is_verified, verification_token, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user by id.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, is_verified, verification_token, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Insert a new unverified user. Uniqueness rides on the database
    /// constraint: concurrent registrations with the same email cannot both
    /// succeed. `None` means the email is already taken.
    pub async fn create(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        verification_token: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, verification_token)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, password_hash, is_verified, verification_token, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(verification_token)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Flip a pending user to verified, keyed on the exact stored token. The
    /// flag flip and the token clear happen in one statement, so a given
    /// token value can succeed at most once. `None` means no matching
    /// pending user.
    pub async fn mark_verified(
        db: &PgPool,
        email: &str,
        token: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_verified = TRUE, verification_token = NULL
            WHERE email = $1 AND verification_token = $2 AND NOT is_verified
            RETURNING id, email, password_hash, is_verified, verification_token, created_at
            "#,
        )
        .bind(email)
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}

// These run against a per-test database managed by sqlx; they need a
// reachable Postgres via DATABASE_URL, like the migration tooling.
#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test]
    async fn create_inserts_an_unverified_user(pool: PgPool) {
        let user = User::create(&pool, "a@x.com", "hash", "token")
            .await
            .expect("query should succeed")
            .expect("first insert should win");
        assert_eq!(user.email, "a@x.com");
        assert!(!user.is_verified);
        assert_eq!(user.verification_token.as_deref(), Some("token"));
    }

    #[sqlx::test]
    async fn duplicate_email_is_rejected_leaving_one_row(pool: PgPool) {
        User::create(&pool, "a@x.com", "hash-1", "token-1")
            .await
            .expect("query should succeed")
            .expect("first insert should win");

        let second = User::create(&pool, "a@x.com", "hash-2", "token-2")
            .await
            .expect("query should succeed");
        assert!(second.is_none());

        // The losing insert must not have touched the stored row.
        let stored = User::find_by_email(&pool, "a@x.com")
            .await
            .expect("query should succeed")
            .expect("row should exist");
        assert_eq!(stored.password_hash, "hash-1");
        assert_eq!(stored.verification_token.as_deref(), Some("token-1"));
    }

    #[sqlx::test]
    async fn mark_verified_succeeds_once_then_rejects_replay(pool: PgPool) {
        User::create(&pool, "a@x.com", "hash", "token")
            .await
            .expect("query should succeed")
            .expect("insert should win");

        let verified = User::mark_verified(&pool, "a@x.com", "token")
            .await
            .expect("query should succeed")
            .expect("first presentation should match");
        assert!(verified.is_verified);
        assert!(verified.verification_token.is_none());

        let replay = User::mark_verified(&pool, "a@x.com", "token")
            .await
            .expect("query should succeed");
        assert!(replay.is_none());
    }

    #[sqlx::test]
    async fn mark_verified_requires_the_stored_token(pool: PgPool) {
        User::create(&pool, "a@x.com", "hash", "token")
            .await
            .expect("query should succeed")
            .expect("insert should win");

        let wrong = User::mark_verified(&pool, "a@x.com", "other-token")
            .await
            .expect("query should succeed");
        assert!(wrong.is_none());

        let stored = User::find_by_email(&pool, "a@x.com")
            .await
            .expect("query should succeed")
            .expect("row should exist");
        assert!(!stored.is_verified);
        assert_eq!(stored.verification_token.as_deref(), Some("token"));
    }

    #[sqlx::test]
    async fn find_by_id_returns_the_created_row(pool: PgPool) {
        let user = User::create(&pool, "a@x.com", "hash", "token")
            .await
            .expect("query should succeed")
            .expect("insert should win");

        let found = User::find_by_id(&pool, user.id)
            .await
            .expect("query should succeed")
            .expect("row should exist");
        assert_eq!(found.email, "a@x.com");

        let missing = User::find_by_id(&pool, Uuid::new_v4())
            .await
            .expect("query should succeed");
        assert!(missing.is_none());
    }
}
