use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                  TEXT PRIMARY KEY,
                email               TEXT NOT NULL UNIQUE,
                name                TEXT,
                image               TEXT,
                password            TEXT,
                role                TEXT NOT NULL DEFAULT 'USER',
                email_verified_at   TEXT,
                created_at          TEXT NOT NULL
            );

            CREATE TABLE influencer_profiles (
                user_id         TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                display_name    TEXT NOT NULL,
                bio             TEXT
            );

            CREATE TABLE verification_tokens (
                identifier  TEXT NOT NULL,
                token       TEXT NOT NULL UNIQUE,
                expires_at  TEXT NOT NULL
            );

            CREATE INDEX idx_verification_tokens_identifier
                ON verification_tokens(identifier);

            CREATE TABLE groups (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                slug        TEXT NOT NULL UNIQUE,
                description TEXT,
                type        TEXT NOT NULL DEFAULT 'PUBLIC',
                rules       TEXT,
                creator_id  TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL
            );

            CREATE TABLE group_memberships (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                group_id    TEXT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
                role        TEXT NOT NULL DEFAULT 'MEMBER',
                status      TEXT NOT NULL DEFAULT 'ACTIVE',
                joined_at   TEXT NOT NULL,
                UNIQUE(user_id, group_id)
            );

            CREATE INDEX idx_memberships_group ON group_memberships(group_id, status);

            CREATE TABLE group_posts (
                id          TEXT PRIMARY KEY,
                group_id    TEXT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
                author_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_group_posts_group ON group_posts(group_id, created_at);

            CREATE TABLE group_messages (
                id          TEXT PRIMARY KEY,
                group_id    TEXT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
                author_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content     TEXT NOT NULL,
                image_url   TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_group_messages_group ON group_messages(group_id, created_at);

            CREATE TABLE posts (
                id          TEXT PRIMARY KEY,
                author_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content     TEXT NOT NULL,
                image_url   TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE comments (
                id          TEXT PRIMARY KEY,
                post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                author_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_comments_post ON comments(post_id, created_at);

            CREATE TABLE likes (
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (user_id, post_id)
            );

            CREATE TABLE reactions (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                emoji       TEXT NOT NULL,
                post_id     TEXT REFERENCES posts(id) ON DELETE CASCADE,
                message_id  TEXT REFERENCES group_messages(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                CHECK ((post_id IS NULL) <> (message_id IS NULL))
            );

            CREATE UNIQUE INDEX idx_reactions_post
                ON reactions(user_id, emoji, post_id) WHERE post_id IS NOT NULL;
            CREATE UNIQUE INDEX idx_reactions_message
                ON reactions(user_id, emoji, message_id) WHERE message_id IS NOT NULL;

            CREATE TABLE live_sessions (
                id              TEXT PRIMARY KEY,
                host_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title           TEXT NOT NULL,
                description     TEXT,
                room_name       TEXT NOT NULL UNIQUE,
                room_sid        TEXT,
                status          TEXT NOT NULL DEFAULT 'live',
                started_at      TEXT NOT NULL,
                ended_at        TEXT,
                viewer_count    INTEGER NOT NULL DEFAULT 0,
                max_viewers     INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE live_cohosts (
                session_id  TEXT NOT NULL REFERENCES live_sessions(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                added_at    TEXT NOT NULL,
                PRIMARY KEY (session_id, user_id)
            );

            CREATE TABLE live_comments (
                id          TEXT PRIMARY KEY,
                session_id  TEXT NOT NULL REFERENCES live_sessions(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE live_likes (
                session_id  TEXT NOT NULL REFERENCES live_sessions(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                is_like     INTEGER NOT NULL,
                PRIMARY KEY (session_id, user_id)
            );

            CREATE TABLE kitchen_tips (
                id              TEXT PRIMARY KEY,
                title           TEXT NOT NULL,
                slug            TEXT NOT NULL UNIQUE,
                category        TEXT NOT NULL,
                content         TEXT NOT NULL,
                featured        INTEGER NOT NULL DEFAULT 0,
                published_at    TEXT NOT NULL
            );

            CREATE TABLE cooking_hacks (
                id              TEXT PRIMARY KEY,
                title           TEXT NOT NULL,
                slug            TEXT NOT NULL UNIQUE,
                difficulty      TEXT NOT NULL,
                content         TEXT NOT NULL,
                time_to_read    INTEGER NOT NULL,
                featured        INTEGER NOT NULL DEFAULT 0,
                published_at    TEXT NOT NULL
            );

            CREATE TABLE trend_posts (
                id              TEXT PRIMARY KEY,
                title           TEXT NOT NULL,
                slug            TEXT NOT NULL UNIQUE,
                summary         TEXT NOT NULL,
                content         TEXT NOT NULL,
                featured        INTEGER NOT NULL DEFAULT 0,
                published_at    TEXT NOT NULL
            );

            CREATE TABLE recipes (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                slug        TEXT NOT NULL UNIQUE,
                category    TEXT,
                cuisine     TEXT,
                occasion    TEXT,
                summary     TEXT,
                image_url   TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE purchases (
                id                  TEXT PRIMARY KEY,
                user_id             TEXT NOT NULL,
                document_id         TEXT NOT NULL,
                amount              INTEGER NOT NULL,
                payment_intent_id   TEXT UNIQUE,
                status              TEXT NOT NULL,
                updated_at          TEXT NOT NULL,
                UNIQUE(user_id, document_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }
}
