//! Petit magasin clé/valeur persistant (style "préférences")
//!
//! Utilisé par le [`ContentValidatedCache`](crate::ContentValidatedCache)
//! pour ses métadonnées (empreinte du contenu source, nom du fichier
//! dérivé). Adossé à une table SQLite.
//!
//! ## Schéma
//!
//! ```sql
//! CREATE TABLE preferences (
//!     key TEXT PRIMARY KEY,
//!     value TEXT NOT NULL,
//!     updated_at TEXT               -- RFC3339
//! );
//! ```

use crate::error::Result;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Magasin clé/valeur SQLite
#[derive(Debug)]
pub struct Preferences {
    conn: Mutex<Connection>,
}

impl Preferences {
    /// Ouvre (ou crée) la base de préférences
    ///
    /// # Exemple
    ///
    /// ```rust,no_run
    /// use pmoassets::Preferences;
    /// use std::path::Path;
    ///
    /// let prefs = Preferences::open(Path::new("preferences.db")).unwrap();
    /// prefs.set("theme", "dark").unwrap();
    /// ```
    pub fn open(path: &Path) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Base volatile, pour les tests
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Valeur associée à `key`
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Ajoute ou remplace une valeur
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_many(&[(key, value)])
    }

    /// Ajoute ou remplace plusieurs valeurs dans une seule transaction
    pub fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        for (key, value) in entries {
            tx.execute(
                "INSERT INTO preferences (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![key, value, now],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Supprime des clés. Retourne le nombre d'entrées supprimées.
    pub fn remove(&self, keys: &[&str]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut removed = 0;
        for key in keys {
            removed += tx.execute("DELETE FROM preferences WHERE key = ?1", [key])?;
        }
        tx.commit()?;
        Ok(removed)
    }

    /// Entrées dont la clé commence par `prefix`, triées par clé
    pub fn entries_with_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT key, value FROM preferences
             WHERE substr(key, 1, length(?1)) = ?1
             ORDER BY key",
        )?;
        let entries = stmt
            .query_map([prefix], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Nombre total d'entrées
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM preferences", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
