//! Schema migration traits shared by the storage backends.
//!
//! Each backend lists its schema as [`Migration`] values and a manager
//! implementing [`MigrationManager`] that records applied versions in a
//! tracking table. [`plan`] decides what a manager runs and in which order.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::Database;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, MigrationError>;

#[async_trait]
pub trait Migration<DB: Database>: Send + Sync {
    async fn up<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    async fn down<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Unique version number, migrations run in ascending order
    fn version(&self) -> i64;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    /// Unix seconds
    pub applied_at: i64,
}

#[async_trait]
pub trait MigrationManager<DB: Database>: Send + Sync {
    fn get_migration_table_name(&self) -> &str {
        "_vitrine_migrations"
    }

    /// Create the tracking table if it does not exist
    async fn initialize(&self) -> Result<()>;

    /// Apply every migration not yet recorded, lowest version first
    async fn up(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    /// Roll back recorded migrations, highest version first
    async fn down(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    async fn get_applied_migrations(&self) -> Result<Vec<MigrationRecord>>;

    async fn is_applied(&self, version: i64) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Migrations to run in `direction` given the versions already applied.
///
/// `Up` yields the unapplied ones lowest version first, `Down` the applied
/// ones highest version first.
pub fn plan<'m, DB: Database>(
    migrations: &'m [Box<dyn Migration<DB>>],
    applied: &[i64],
    direction: Direction,
) -> Result<Vec<&'m dyn Migration<DB>>> {
    check_versions(migrations)?;

    let wanted = direction == Direction::Down;
    let mut planned: Vec<&'m dyn Migration<DB>> = migrations
        .iter()
        .map(|m| &**m)
        .filter(|m| applied.contains(&m.version()) == wanted)
        .collect();

    planned.sort_by_key(|m| m.version());
    if direction == Direction::Down {
        planned.reverse();
    }
    Ok(planned)
}

/// Reject migration lists with duplicate versions.
pub fn check_versions<DB: Database>(migrations: &[Box<dyn Migration<DB>>]) -> Result<()> {
    let mut seen = HashSet::new();
    for migration in migrations {
        if !seen.insert(migration.version()) {
            return Err(MigrationError::Migration(format!(
                "duplicate migration version {} ({})",
                migration.version(),
                migration.name()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Sqlite;

    struct Noop(i64);

    #[async_trait]
    impl Migration<Sqlite> for Noop {
        async fn up<'a>(&'a self, _conn: &'a mut sqlx::SqliteConnection) -> Result<()> {
            Ok(())
        }

        async fn down<'a>(&'a self, _conn: &'a mut sqlx::SqliteConnection) -> Result<()> {
            Ok(())
        }

        fn version(&self) -> i64 {
            self.0
        }

        fn name(&self) -> &str {
            "noop"
        }
    }

    fn versions(planned: &[&dyn Migration<Sqlite>]) -> Vec<i64> {
        planned.iter().map(|m| m.version()).collect()
    }

    #[test]
    fn test_plan_orders_by_direction() {
        let migrations: Vec<Box<dyn Migration<Sqlite>>> =
            vec![Box::new(Noop(3)), Box::new(Noop(1)), Box::new(Noop(2))];

        let up = plan(&migrations, &[], Direction::Up).unwrap();
        assert_eq!(versions(&up), vec![1, 2, 3]);

        let down = plan(&migrations, &[1, 2, 3], Direction::Down).unwrap();
        assert_eq!(versions(&down), vec![3, 2, 1]);
    }

    #[test]
    fn test_plan_skips_by_applied_state() {
        let migrations: Vec<Box<dyn Migration<Sqlite>>> =
            vec![Box::new(Noop(1)), Box::new(Noop(2)), Box::new(Noop(3))];

        let up = plan(&migrations, &[1, 3], Direction::Up).unwrap();
        assert_eq!(versions(&up), vec![2]);

        let down = plan(&migrations, &[1, 3], Direction::Down).unwrap();
        assert_eq!(versions(&down), vec![3, 1]);

        let duplicated: Vec<Box<dyn Migration<Sqlite>>> =
            vec![Box::new(Noop(1)), Box::new(Noop(1))];
        assert!(plan(&duplicated, &[], Direction::Up).is_err());
    }

    #[test]
    fn test_duplicate_versions_rejected() {
        let unique: Vec<Box<dyn Migration<Sqlite>>> = vec![Box::new(Noop(1)), Box::new(Noop(2))];
        assert!(check_versions(&unique).is_ok());

        let duplicated: Vec<Box<dyn Migration<Sqlite>>> =
            vec![Box::new(Noop(1)), Box::new(Noop(1))];
        assert!(check_versions(&duplicated).is_err());
    }
}
