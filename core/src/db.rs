use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use rusqlite::types::ValueRef;

use crate::error::StorageError;
use crate::storage::{Execution, Row, Storage, Value};

/// SQLite-backed storage for habits and their completions.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        // Needed for ON DELETE CASCADE; must be set per connection.
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS habits (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    icon TEXT NOT NULL DEFAULT '',
                    category TEXT NOT NULL DEFAULT 'General',
                    target_count INTEGER,
                    reminder_enabled INTEGER NOT NULL DEFAULT 0,
                    reminder_time TEXT,
                    is_active INTEGER NOT NULL DEFAULT 1,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS habit_completions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    habit_id INTEGER NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
                    date TEXT NOT NULL,
                    count INTEGER,
                    notes TEXT,
                    completed_at TEXT NOT NULL,
                    UNIQUE (habit_id, date)
                );

                CREATE INDEX IF NOT EXISTS idx_habit_completions_date ON habit_completions(date);
                CREATE INDEX IF NOT EXISTS idx_habits_active ON habits(is_active);

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            // Goal types arrived after count targets; existing habits with a
            // target were count habits, everything else binary.
            self.conn.execute_batch(
                "ALTER TABLE habits ADD COLUMN goal_type TEXT NOT NULL DEFAULT 'binary';
                 ALTER TABLE habits ADD COLUMN target_time_minutes INTEGER;
                 ALTER TABLE habits ADD COLUMN custom_emoji TEXT;
                 ALTER TABLE habit_completions ADD COLUMN time_minutes INTEGER;

                 UPDATE habits SET goal_type = 'count' WHERE target_count IS NOT NULL;

                 PRAGMA user_version = 2;",
            )?;
        }

        Ok(())
    }

    fn value_from_ref(value: ValueRef<'_>) -> Value {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Text(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

impl Storage for Database {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<Execution, StorageError> {
        let changes = self
            .conn
            .execute(sql, rusqlite::params_from_iter(params.iter()))?;
        Ok(Execution {
            last_insert_id: self.conn.last_insert_rowid(),
            changes,
        })
    }

    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|c| (*c).to_string())
            .collect();
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                let mut values = Vec::with_capacity(columns.len());
                for i in 0..columns.len() {
                    values.push(Self::value_from_ref(row.get_ref(i)?));
                }
                Ok(Row::new(columns.clone(), values))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_habit(db: &Database, name: &str) -> i64 {
        db.execute(
            "INSERT INTO habits (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
            &[name.into(), "2024-01-01T00:00:00+00:00".into()],
        )
        .unwrap()
        .last_insert_id
    }

    #[test]
    fn test_migration_sets_user_version() {
        let db = Database::open_in_memory().unwrap();
        let version: i64 = db
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, 2);
    }

    #[test]
    fn test_migration_creates_tables() {
        let db = Database::open_in_memory().unwrap();
        let habits = db.query_all("SELECT * FROM habits", &[]).unwrap();
        let completions = db.query_all("SELECT * FROM habit_completions", &[]).unwrap();
        assert!(habits.is_empty());
        assert!(completions.is_empty());
    }

    #[test]
    fn test_migration_v2_classifies_existing_count_habits() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE habits (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                icon TEXT NOT NULL DEFAULT '',
                category TEXT NOT NULL DEFAULT 'General',
                target_count INTEGER,
                reminder_enabled INTEGER NOT NULL DEFAULT 0,
                reminder_time TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE habit_completions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                habit_id INTEGER NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
                date TEXT NOT NULL,
                count INTEGER,
                notes TEXT,
                completed_at TEXT NOT NULL,
                UNIQUE (habit_id, date)
            );
            INSERT INTO habits (name, target_count, created_at, updated_at)
                VALUES ('Water', 8, 'x', 'x');
            INSERT INTO habits (name, created_at, updated_at)
                VALUES ('Stretch', 'x', 'x');
            PRAGMA user_version = 1;",
        )
        .unwrap();
        let db = Database { conn };
        db.migrate().unwrap();

        let rows = db
            .query_all("SELECT name, goal_type FROM habits ORDER BY id", &[])
            .unwrap();
        assert_eq!(rows[0].text("goal_type").unwrap(), "count");
        assert_eq!(rows[1].text("goal_type").unwrap(), "binary");
    }

    #[test]
    fn test_execute_reports_insert_id_and_changes() {
        let db = Database::open_in_memory().unwrap();
        let first = insert_habit(&db, "Read");
        let second = insert_habit(&db, "Run");
        assert_eq!(second, first + 1);

        let exec = db
            .execute("UPDATE habits SET is_active = 0", &[])
            .unwrap();
        assert_eq!(exec.changes, 2);
    }

    #[test]
    fn test_query_one() {
        let db = Database::open_in_memory().unwrap();
        let id = insert_habit(&db, "Read");
        let row = db
            .query_one("SELECT name FROM habits WHERE id = ?1", &[id.into()])
            .unwrap()
            .unwrap();
        assert_eq!(row.text("name").unwrap(), "Read");
        assert!(
            db.query_one("SELECT name FROM habits WHERE id = ?1", &[999_i64.into()])
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_unique_habit_date_constraint() {
        let db = Database::open_in_memory().unwrap();
        let id = insert_habit(&db, "Read");
        let sql = "INSERT INTO habit_completions (habit_id, date, completed_at)
                   VALUES (?1, ?2, ?3)";
        db.execute(sql, &[id.into(), "2024-01-05".into(), "t".into()])
            .unwrap();
        let dup = db.execute(sql, &[id.into(), "2024-01-05".into(), "t".into()]);
        assert!(dup.is_err());
    }

    #[test]
    fn test_cascade_delete_removes_completions() {
        let db = Database::open_in_memory().unwrap();
        let id = insert_habit(&db, "Read");
        db.execute(
            "INSERT INTO habit_completions (habit_id, date, completed_at) VALUES (?1, ?2, ?3)",
            &[id.into(), "2024-01-05".into(), "t".into()],
        )
        .unwrap();
        db.execute("DELETE FROM habits WHERE id = ?1", &[id.into()])
            .unwrap();
        let left = db
            .query_all("SELECT id FROM habit_completions", &[])
            .unwrap();
        assert!(left.is_empty());
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streak.db");
        {
            let db = Database::open(&path).unwrap();
            insert_habit(&db, "Read");
        }
        let reopened = Database::open(&path).unwrap();
        let rows = reopened.query_all("SELECT name FROM habits", &[]).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
