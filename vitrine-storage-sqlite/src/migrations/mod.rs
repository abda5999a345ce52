use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Database, Sqlite, SqlitePool};
use vitrine_migration::{
    Direction, Migration, MigrationError, MigrationManager, MigrationRecord, plan,
};

/// One schema version as plain SQL, run in order inside its own transaction.
#[derive(Debug, Clone, Copy)]
pub struct SchemaStep {
    pub version: i64,
    pub name: &'static str,
    pub up: &'static [&'static str],
    pub down: &'static [&'static str],
}

// No unique index on (language, position): shifting rows one at a time
// passes through transient duplicates.
pub const SCHEMA: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "CreateUsersTable",
        up: &[r#"
            CREATE TABLE IF NOT EXISTS users (
                id BLOB PRIMARY KEY,
                email TEXT NOT NULL,
                full_name TEXT,
                created_at INTEGER NOT NULL DEFAULT (unixepoch()),
                UNIQUE(email)
            )"#],
        down: &["DROP TABLE IF EXISTS users"],
    },
    SchemaStep {
        version: 2,
        name: "CreateLoginAttemptsTable",
        up: &[r#"
            CREATE TABLE IF NOT EXISTS login_attempts (
                id BLOB PRIMARY KEY,
                email TEXT NOT NULL,
                ip TEXT NOT NULL,
                attempts INTEGER NOT NULL DEFAULT 0,
                last_attempt_at INTEGER NOT NULL,
                banned_until INTEGER,
                created_at INTEGER NOT NULL DEFAULT (unixepoch()),
                updated_at INTEGER NOT NULL DEFAULT (unixepoch()),
                UNIQUE(email, ip)
            )"#],
        down: &["DROP TABLE IF EXISTS login_attempts"],
    },
    SchemaStep {
        version: 3,
        name: "CreateBlogsTable",
        up: &[r#"
            CREATE TABLE IF NOT EXISTS blogs (
                id BLOB PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                position INTEGER NOT NULL,
                language TEXT NOT NULL,
                status INTEGER NOT NULL DEFAULT 0,
                owner_id BLOB NOT NULL,
                created_at INTEGER NOT NULL DEFAULT (unixepoch()),
                updated_at INTEGER NOT NULL DEFAULT (unixepoch()),
                FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE
            )"#],
        down: &["DROP TABLE IF EXISTS blogs"],
    },
    SchemaStep {
        version: 4,
        name: "CreateItemsTable",
        up: &[r#"
            CREATE TABLE IF NOT EXISTS items (
                id BLOB PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                price REAL NOT NULL DEFAULT 0,
                quantity INTEGER NOT NULL DEFAULT 0,
                position INTEGER NOT NULL,
                language TEXT NOT NULL,
                item_url TEXT,
                category TEXT,
                status INTEGER NOT NULL DEFAULT 0,
                owner_id BLOB NOT NULL,
                created_at INTEGER NOT NULL DEFAULT (unixepoch()),
                updated_at INTEGER NOT NULL DEFAULT (unixepoch()),
                FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE
            )"#],
        down: &["DROP TABLE IF EXISTS items"],
    },
    SchemaStep {
        version: 5,
        name: "CreateCalendarEventsTable",
        up: &[r#"
            CREATE TABLE IF NOT EXISTS calendar_events (
                id BLOB PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                start_date INTEGER NOT NULL,
                end_date INTEGER NOT NULL,
                reminder_offset INTEGER NOT NULL DEFAULT 0,
                all_day INTEGER NOT NULL DEFAULT 0,
                color TEXT,
                working_day INTEGER NOT NULL DEFAULT 0,
                sick_day INTEGER NOT NULL DEFAULT 0,
                vacation INTEGER NOT NULL DEFAULT 0,
                weekend INTEGER NOT NULL DEFAULT 0,
                send_email INTEGER NOT NULL DEFAULT 0,
                reminder_sent INTEGER NOT NULL DEFAULT 0,
                user_id BLOB NOT NULL,
                created_at INTEGER NOT NULL DEFAULT (unixepoch()),
                updated_at INTEGER NOT NULL DEFAULT (unixepoch()),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )"#],
        down: &["DROP TABLE IF EXISTS calendar_events"],
    },
    SchemaStep {
        version: 6,
        name: "CreateIndexes",
        up: &[
            "CREATE INDEX IF NOT EXISTS idx_blogs_language_position ON blogs(language, position)",
            "CREATE INDEX IF NOT EXISTS idx_items_language_position ON items(language, position)",
            "CREATE INDEX IF NOT EXISTS idx_calendar_events_user_start ON calendar_events(user_id, start_date)",
            "CREATE INDEX IF NOT EXISTS idx_calendar_events_pending ON calendar_events(reminder_sent, send_email, start_date)",
        ],
        down: &[
            "DROP INDEX IF EXISTS idx_blogs_language_position",
            "DROP INDEX IF EXISTS idx_items_language_position",
            "DROP INDEX IF EXISTS idx_calendar_events_user_start",
            "DROP INDEX IF EXISTS idx_calendar_events_pending",
        ],
    },
];

/// Every schema migration of this backend, in version order.
pub fn all() -> Vec<Box<dyn Migration<Sqlite>>> {
    SCHEMA
        .iter()
        .map(|step| Box::new(*step) as Box<dyn Migration<Sqlite>>)
        .collect()
}

#[async_trait]
impl Migration<Sqlite> for SchemaStep {
    async fn up<'a>(
        &'a self,
        conn: &'a mut <Sqlite as Database>::Connection,
    ) -> Result<(), MigrationError> {
        execute_all(conn, self.up).await
    }

    async fn down<'a>(
        &'a self,
        conn: &'a mut <Sqlite as Database>::Connection,
    ) -> Result<(), MigrationError> {
        execute_all(conn, self.down).await
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn name(&self) -> &str {
        self.name
    }
}

async fn execute_all(
    conn: &mut <Sqlite as Database>::Connection,
    statements: &[&str],
) -> Result<(), MigrationError> {
    for statement in statements {
        sqlx::query(*statement).execute(&mut *conn).await?;
    }
    Ok(())
}

pub struct SqliteMigrationManager {
    pool: SqlitePool,
}

impl SqliteMigrationManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn applied_versions(&self) -> Result<Vec<i64>, MigrationError> {
        let table = self.get_migration_table_name();
        let versions = sqlx::query_scalar(&format!("SELECT version FROM {table}"))
            .fetch_all(&self.pool)
            .await?;
        Ok(versions)
    }

    /// Run one migration and update the tracking table in the same transaction.
    async fn run(
        &self,
        migration: &dyn Migration<Sqlite>,
        direction: Direction,
    ) -> Result<(), MigrationError> {
        let table = self.get_migration_table_name();
        let mut tx = self.pool.begin().await?;

        tracing::info!(
            version = migration.version(),
            name = migration.name(),
            direction = ?direction,
            "Running migration"
        );

        match direction {
            Direction::Up => {
                migration.up(&mut *tx).await?;
                sqlx::query(&format!(
                    "INSERT INTO {table} (version, name, applied_at) VALUES (?, ?, ?)"
                ))
                .bind(migration.version())
                .bind(migration.name())
                .bind(Utc::now().timestamp())
                .execute(&mut *tx)
                .await?;
            }
            Direction::Down => {
                migration.down(&mut *tx).await?;
                sqlx::query(&format!("DELETE FROM {table} WHERE version = ?"))
                    .bind(migration.version())
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn run_all(
        &self,
        migrations: &[Box<dyn Migration<Sqlite>>],
        direction: Direction,
    ) -> Result<(), MigrationError> {
        let applied = self.applied_versions().await?;
        for migration in plan(migrations, &applied, direction)? {
            self.run(migration, direction).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl MigrationManager<Sqlite> for SqliteMigrationManager {
    async fn initialize(&self) -> Result<(), MigrationError> {
        let table = self.get_migration_table_name();
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at INTEGER NOT NULL DEFAULT (unixepoch())
            )"
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn up(&self, migrations: &[Box<dyn Migration<Sqlite>>]) -> Result<(), MigrationError> {
        self.run_all(migrations, Direction::Up).await
    }

    async fn down(&self, migrations: &[Box<dyn Migration<Sqlite>>]) -> Result<(), MigrationError> {
        self.run_all(migrations, Direction::Down).await
    }

    async fn get_applied_migrations(&self) -> Result<Vec<MigrationRecord>, MigrationError> {
        let table = self.get_migration_table_name();
        let records = sqlx::query_as::<_, MigrationRecord>(&format!(
            "SELECT version, name, applied_at FROM {table} ORDER BY version"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn is_applied(&self, version: i64) -> Result<bool, MigrationError> {
        Ok(self.applied_versions().await?.contains(&version))
    }
}
