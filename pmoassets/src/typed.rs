//! Cache d'un objet typé unique, persisté en JSON
//!
//! Un [`TypedObjectCache`] contient une seule valeur, stockée dans un
//! fichier JSON nommé et gardée en mémoire après la première lecture.
//! Plusieurs valeurs logiques demandent plusieurs instances, chacune avec
//! son propre nom de fichier.
//!
//! Le schéma de sérialisation est celui de `T` (`#[derive(Serialize,
//! Deserialize)]`).
//!
//! # Exemple
//!
//! ```rust,no_run
//! use pmoassets::TypedObjectCache;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! struct DisplayState {
//!     shown: Vec<String>,
//! }
//!
//! let cache = TypedObjectCache::<DisplayState>::new("./cache/objects", "display_state.json")?;
//! cache.update(|state| {
//!     let mut state = state.unwrap_or(DisplayState { shown: vec![] });
//!     state.shown.push("campaign-42".into());
//!     state
//! });
//! # Ok::<(), pmoassets::CacheError>(())
//! ```

use crate::error::{CacheError, Result};
use crate::store::{remove_quietly, write_atomic, ResourceStore};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Cache mono-valeur adossé à un fichier JSON
///
/// Le mutex de l'instance couvre la copie mémoire et le fichier : les
/// séquences lecture-modification-écriture de [`update`](Self::update) ne
/// perdent pas de mise à jour entre appelants concurrents.
#[derive(Debug)]
pub struct TypedObjectCache<T> {
    dir: PathBuf,
    file_name: String,
    hot: Mutex<Option<T>>,
}

impl<T> TypedObjectCache<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Lie un cache au fichier `dir/file_name`
    pub fn new(dir: impl Into<PathBuf>, file_name: &str) -> Result<Self> {
        if !is_plain_file_name(file_name) {
            return Err(CacheError::InvalidKey(file_name.to_string()));
        }
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            file_name: file_name.to_string(),
            hot: Mutex::new(None),
        })
    }

    /// Lie un cache à un fichier du répertoire d'un store
    pub fn in_store(store: &ResourceStore, file_name: &str) -> Result<Self> {
        Self::new(store.dir(), file_name)
    }

    /// Chemin du fichier de persistance
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Remplace la valeur (disque puis mémoire)
    ///
    /// Retourne `false` si la valeur n'a pas pu être persistée ; la copie
    /// mémoire est alors inchangée.
    pub fn set(&self, value: T) -> bool {
        let mut hot = self.hot.lock();
        match self.persist(&value) {
            Ok(()) => {
                *hot = Some(value);
                true
            }
            Err(e) => {
                tracing::warn!("Cannot persist {}: {}", self.path().display(), e);
                false
            }
        }
    }

    /// Valeur courante, lue sur disque au premier accès
    ///
    /// Un fichier absent ou corrompu donne `None`.
    pub fn get(&self) -> Option<T> {
        let mut hot = self.hot.lock();
        self.load_into(&mut hot)
    }

    /// Lecture-modification-écriture atomique vis-à-vis des autres appels
    ///
    /// Retourne la nouvelle valeur, ou `None` si elle n'a pas pu être
    /// persistée.
    pub fn update<F>(&self, f: F) -> Option<T>
    where
        F: FnOnce(Option<T>) -> T,
    {
        let mut hot = self.hot.lock();
        let current = self.load_into(&mut hot);
        let next = f(current);
        match self.persist(&next) {
            Ok(()) => {
                *hot = Some(next.clone());
                Some(next)
            }
            Err(e) => {
                tracing::warn!("Cannot persist {}: {}", self.path().display(), e);
                None
            }
        }
    }

    /// Vide la mémoire et supprime le fichier
    ///
    /// Retourne `true` si un fichier a été supprimé.
    pub fn clear(&self) -> bool {
        let mut hot = self.hot.lock();
        *hot = None;
        remove_quietly(&self.path())
    }

    /// Date de dernière écriture du fichier
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        let modified = fs::metadata(self.path()).and_then(|m| m.modified()).ok()?;
        Some(DateTime::<Utc>::from(modified))
    }

    fn load_into(&self, hot: &mut Option<T>) -> Option<T> {
        if let Some(value) = hot.as_ref() {
            return Some(value.clone());
        }
        match self.load() {
            Ok(Some(value)) => {
                *hot = Some(value.clone());
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Ignoring unreadable {}: {}", self.path().display(), e);
                None
            }
        }
    }

    fn load(&self) -> Result<Option<T>> {
        let data = match fs::read(self.path()) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&data)?))
    }

    fn persist(&self, value: &T) -> Result<()> {
        let data = serde_json::to_vec(value)?;
        write_atomic(&self.dir, &self.file_name, &data)
    }
}

/// Nom de fichier sans séparateur ni composant spécial
pub(crate) fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(|c: char| c == '/' || c == '\\')
        && Path::new(name).file_name().is_some_and(|n| n == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        value: u32,
        label: String,
    }

    fn create_test_cache() -> (tempfile::TempDir, TypedObjectCache<Counter>) {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = TypedObjectCache::new(temp_dir.path(), "counter.json").unwrap();
        (temp_dir, cache)
    }

    #[test]
    fn test_plain_file_names() {
        assert!(is_plain_file_name("state.json"));
        assert!(!is_plain_file_name(""));
        assert!(!is_plain_file_name(".."));
        assert!(!is_plain_file_name("a/b.json"));
        assert!(!is_plain_file_name("a\\b.json"));
    }

    #[test]
    fn test_get_on_empty_cache() {
        let (_temp_dir, cache) = create_test_cache();
        assert_eq!(cache.get(), None);
        assert!(cache.last_modified().is_none());
    }

    #[test]
    fn test_set_then_get_from_another_instance() {
        let (temp_dir, cache) = create_test_cache();
        let value = Counter {
            value: 3,
            label: "three".into(),
        };

        assert!(cache.set(value.clone()));
        assert_eq!(cache.get(), Some(value.clone()));
        assert!(cache.last_modified().is_some());

        let other = TypedObjectCache::<Counter>::new(temp_dir.path(), "counter.json").unwrap();
        assert_eq!(other.get(), Some(value));
    }

    #[test]
    fn test_clear() {
        let (_temp_dir, cache) = create_test_cache();
        cache.set(Counter {
            value: 1,
            label: "one".into(),
        });

        assert!(cache.clear());
        assert_eq!(cache.get(), None);
        assert!(!cache.path().exists());
        assert!(!cache.clear());
    }

    #[test]
    fn test_corrupt_file_reads_as_none() {
        let (_temp_dir, cache) = create_test_cache();
        std::fs::write(cache.path(), b"{ not json").unwrap();

        assert_eq!(cache.get(), None);

        // Les opérations suivantes fonctionnent toujours
        let value = Counter {
            value: 7,
            label: "seven".into(),
        };
        assert!(cache.set(value.clone()));
        assert_eq!(cache.get(), Some(value));
    }

    #[test]
    fn test_update_sees_previous_value() {
        let (_temp_dir, cache) = create_test_cache();

        let first = cache.update(|current| {
            assert!(current.is_none());
            Counter {
                value: 1,
                label: "n".into(),
            }
        });
        assert_eq!(first.unwrap().value, 1);

        let second = cache.update(|current| {
            let mut counter = current.unwrap();
            counter.value += 1;
            counter
        });
        assert_eq!(second.unwrap().value, 2);
    }
}
