//! The lazy cleanup pass run before every `read_messages` call.
//!
//! Retention prunes three classes of row, in one transaction, before the
//! message service lists anything: short test-debris messages, duplicate
//! `(content, sender)` pairs (keeping the newest), and messages older than
//! a rolling window. All three thresholds are explicit configuration
//! (see [`crate::config::BoardConfig`]) rather than hard-coded constants,
//! per the design note against aggressive, undocumented pruning.

use std::time::Duration;

use mockable::Clock;
use rusqlite::Connection;

/// Thresholds governing one retention pass.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    /// Minimum content length a message must have to survive the length
    /// floor, once it is older than `grace`.
    pub min_length: usize,
    /// Maximum age a message may reach before it is pruned outright.
    pub max_age: Duration,
    /// Messages younger than this are exempt from the length floor, so a
    /// reply sent moments ago is never destroyed mid-conversation.
    pub grace: Duration,
    /// Reproduces the original tool's unconditional behaviour: the length
    /// floor and duplicate pruning apply regardless of age. Off by default;
    /// kept for bug-compatibility only.
    pub legacy_lossy: bool,
}

impl RetentionPolicy {
    /// Runs one retention pass against `conn` inside its own transaction.
    ///
    /// # Errors
    ///
    /// Propagates any `rusqlite` error from the pruning statements.
    pub fn sweep(&self, conn: &mut Connection, clock: &impl Clock) -> rusqlite::Result<()> {
        let now = clock.utc().timestamp();
        #[expect(
            clippy::cast_possible_wrap,
            reason = "durations used here are small configuration values, well under i64::MAX"
        )]
        let max_age_secs = self.max_age.as_secs() as i64;
        #[expect(
            clippy::cast_possible_wrap,
            reason = "durations used here are small configuration values, well under i64::MAX"
        )]
        let grace_secs = self.grace.as_secs() as i64;
        #[expect(
            clippy::cast_possible_wrap,
            reason = "content length floors are small configuration values"
        )]
        let min_length = self.min_length as i64;

        let tx = conn.transaction()?;

        if self.legacy_lossy {
            tx.execute("DELETE FROM messages WHERE LENGTH(content) < ?1", [min_length])?;
        } else {
            tx.execute(
                "DELETE FROM messages WHERE LENGTH(content) < ?1 AND ?2 - timestamp > ?3",
                rusqlite::params![min_length, now, grace_secs],
            )?;
        }

        tx.execute(
            "DELETE FROM messages
             WHERE rowid NOT IN (
                 SELECT MAX(rowid) FROM messages GROUP BY content, sender
             )",
            [],
        )?;

        tx.execute("DELETE FROM messages WHERE ?1 - timestamp > ?2", rusqlite::params![now, max_age_secs])?;

        tx.commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockable::DefaultClock;

    fn seeded_connection() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory connection");
        crate::store::run_migrations(&conn).expect("run migrations");
        conn
    }

    fn insert(conn: &Connection, id: &str, sender: &str, content: &str, timestamp: i64) {
        conn.execute(
            "INSERT INTO messages (id, sender, content, timestamp, read, priority) VALUES (?1, ?2, ?3, ?4, 0, 'normal')",
            rusqlite::params![id, sender, content, timestamp],
        )
        .expect("insert message");
    }

    #[test]
    fn prunes_short_messages_past_the_grace_window() {
        let mut conn = seeded_connection();
        let clock = DefaultClock;
        let now = clock.utc().timestamp();
        insert(&conn, "m1", "alice", "hi", now - 3_600);

        let policy = RetentionPolicy {
            min_length: 20,
            max_age: Duration::from_secs(3_600 * 24),
            grace: Duration::from_secs(30),
            legacy_lossy: false,
        };
        policy.sweep(&mut conn, &clock).expect("sweep succeeds");

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .expect("count rows");
        assert_eq!(count, 0);
    }

    #[test]
    fn recent_short_messages_survive_the_grace_window() {
        let mut conn = seeded_connection();
        let clock = DefaultClock;
        let now = clock.utc().timestamp();
        insert(&conn, "m1", "alice", "hi", now);

        let policy = RetentionPolicy {
            min_length: 20,
            max_age: Duration::from_secs(3_600 * 24),
            grace: Duration::from_secs(30),
            legacy_lossy: false,
        };
        policy.sweep(&mut conn, &clock).expect("sweep succeeds");

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .expect("count rows");
        assert_eq!(count, 1);
    }

    #[test]
    fn legacy_lossy_mode_prunes_short_messages_unconditionally() {
        let mut conn = seeded_connection();
        let clock = DefaultClock;
        let now = clock.utc().timestamp();
        insert(&conn, "m1", "alice", "hi", now);

        let policy = RetentionPolicy {
            min_length: 20,
            max_age: Duration::from_secs(3_600 * 24),
            grace: Duration::from_secs(30),
            legacy_lossy: true,
        };
        policy.sweep(&mut conn, &clock).expect("sweep succeeds");

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .expect("count rows");
        assert_eq!(count, 0);
    }

    #[test]
    fn keeps_only_the_newest_of_duplicate_content_sender_pairs() {
        let mut conn = seeded_connection();
        let clock = DefaultClock;
        let now = clock.utc().timestamp();
        insert(&conn, "m1", "alice", "this message is long enough to survive", now - 10);
        insert(&conn, "m2", "alice", "this message is long enough to survive", now);

        let policy = RetentionPolicy {
            min_length: 20,
            max_age: Duration::from_secs(3_600 * 24),
            grace: Duration::from_secs(30),
            legacy_lossy: false,
        };
        policy.sweep(&mut conn, &clock).expect("sweep succeeds");

        let remaining: String = conn
            .query_row("SELECT id FROM messages", [], |row| row.get(0))
            .expect("one row remains");
        assert_eq!(remaining, "m2");
    }

    #[test]
    fn prunes_messages_older_than_the_rolling_window() {
        let mut conn = seeded_connection();
        let clock = DefaultClock;
        let now = clock.utc().timestamp();
        insert(&conn, "m1", "alice", "this message is long enough to survive length floor", now - 7_200);

        let policy = RetentionPolicy {
            min_length: 20,
            max_age: Duration::from_secs(3_600),
            grace: Duration::from_secs(30),
            legacy_lossy: false,
        };
        policy.sweep(&mut conn, &clock).expect("sweep succeeds");

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .expect("count rows");
        assert_eq!(count, 0);
    }
}
