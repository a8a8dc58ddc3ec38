//! Stockage adressé par clé des ressources téléchargées
//!
//! Chaque ressource est un fichier du répertoire du store dont le nom est
//! `hash_key(clé)`. L'existence du fichier est la seule source de vérité :
//! il n'y a pas d'index séparé.
//!
//! Les écritures passent toujours par un fichier temporaire (`.partial-*`)
//! du même répertoire, renommé ensuite sur la cible : un lecteur observe
//! l'ancien contenu ou le nouveau, jamais un fichier à moitié écrit.
//!
//! ```text
//! images/
//! ├── 3a7bd3e2...c9f1          # ressource (SHA-512 de l'URL)
//! ├── 9e1f0c44...02ab          # ressource
//! └── .partial-Xk2p9a          # écriture en cours
//! ```

use crate::error::{CacheError, Result};
use crate::hash::{hash_key, is_hashed_name};
use std::collections::HashSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::{NamedTempFile, TempPath};
use tokio::io::AsyncWriteExt;

/// Préfixe des fichiers temporaires d'écriture
pub const PARTIAL_PREFIX: &str = ".partial-";

/// Âge à partir duquel un fichier temporaire est considéré abandonné
///
/// Très au-delà du timeout d'un téléchargement : une écriture encore en
/// cours (autre handle sur le même répertoire) n'est jamais balayée.
pub const STALE_PARTIAL_AGE: Duration = Duration::from_secs(60 * 60);

/// Répertoire de ressources adressé par clé
///
/// Le handle est léger à cloner et doit être injecté dans chaque composant
/// qui lit ou écrit le répertoire.
#[derive(Debug, Clone)]
pub struct ResourceStore {
    dir: Arc<PathBuf>,
}

impl ResourceStore {
    /// Ouvre (et crée si besoin) un store
    ///
    /// Les fichiers temporaires laissés par une écriture interrompue (crash)
    /// et plus vieux que [`STALE_PARTIAL_AGE`] sont supprimés à l'ouverture.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let store = Self { dir: Arc::new(dir) };
        let swept = store.sweep_partials();
        if swept > 0 {
            tracing::info!(
                "Removed {} interrupted write(s) from {}",
                swept,
                store.dir.display()
            );
        }
        Ok(store)
    }

    /// Répertoire du store
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Chemin où la ressource `key` est (ou serait) stockée
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(hash_key(key))
    }

    /// Vrai si la ressource est présente
    pub fn has(&self, key: &str) -> bool {
        !key.is_empty() && self.path_for(key).is_file()
    }

    /// Contenu de la ressource, `None` si absente ou illisible
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        match self.try_get(key) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Cannot read cached resource {}: {}", key, e);
                None
            }
        }
    }

    /// Variante de [`get`](Self::get) qui distingue absence (`Ok(None)`)
    /// et erreur d'I/O
    pub fn try_get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if key.is_empty() {
            return Ok(None);
        }
        match fs::read(self.path_for(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Chemin du fichier de la ressource si elle est présente
    pub fn get_file(&self, key: &str) -> Option<PathBuf> {
        if !self.has(key) {
            return None;
        }
        Some(self.path_for(key))
    }

    /// Écrit une ressource de manière atomique
    pub fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        check_key(key)?;
        write_atomic(&self.dir, &hash_key(key), data)
    }

    /// Démarre une écriture en flux (utilisée par le téléchargement)
    ///
    /// Rien n'est visible sous le nom de la ressource tant que
    /// [`PendingWrite::commit`] n'a pas réussi.
    pub fn begin_write(&self, key: &str) -> Result<PendingWrite> {
        check_key(key)?;
        let (file, temp_path) = partial_file(&self.dir)?.into_parts();
        Ok(PendingWrite {
            file: tokio::fs::File::from_std(file),
            temp_path,
            target: self.path_for(key),
            written: 0,
        })
    }

    /// Supprime une ressource. Retourne `true` si un fichier a été supprimé.
    pub fn delete(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        remove_quietly(&self.path_for(key))
    }

    /// Noms (hachés) des ressources présentes
    pub fn list(&self) -> Vec<String> {
        let entries = match fs::read_dir(self.dir.as_path()) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Cannot list {}: {}", self.dir.display(), e);
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| !name.starts_with(PARTIAL_PREFIX))
            .collect()
    }

    /// Supprime toutes les ressources dont la clé n'est pas dans `keys`
    ///
    /// Éviction indicative : les erreurs de listage ou de suppression sont
    /// journalisées puis ignorées. Seuls les fichiers nommés par
    /// [`hash_key`] sont concernés : écritures en cours et fichiers nommés
    /// (objets typés, artefacts dérivés) ne sont pas touchés. Retourne le
    /// nombre de fichiers supprimés.
    pub fn clear_except<I, K>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keep: HashSet<String> = keys.into_iter().map(|k| hash_key(k.as_ref())).collect();

        let mut removed = 0;
        for name in self.list() {
            if !is_hashed_name(&name) || keep.contains(&name) {
                continue;
            }
            if remove_quietly(&self.dir.join(&name)) {
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(
                "Evicted {} resource(s) from {} ({} kept)",
                removed,
                self.dir.display(),
                keep.len()
            );
        }
        removed
    }

    /// Vide complètement le répertoire du store
    pub fn clear(&self) -> usize {
        let entries = match fs::read_dir(self.dir.as_path()) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Cannot list {}: {}", self.dir.display(), e);
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.filter_map(|entry| entry.ok()) {
            let path = entry.path();
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Cannot remove {}: {}", path.display(), e),
            }
        }
        removed
    }

    fn sweep_partials(&self) -> usize {
        let Ok(entries) = fs::read_dir(self.dir.as_path()) else {
            return 0;
        };
        let now = SystemTime::now();
        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.starts_with(PARTIAL_PREFIX))
            })
            .filter(|entry| is_stale(entry, now))
            .filter(|entry| remove_quietly(&entry.path()))
            .count()
    }
}

/// Écriture en flux vers une ressource, publiée par renommage
///
/// Abandonner la valeur sans appeler [`commit`](Self::commit) supprime le
/// fichier temporaire : la ressource précédente (s'il y en a une) reste
/// intacte.
#[derive(Debug)]
pub struct PendingWrite {
    file: tokio::fs::File,
    temp_path: TempPath,
    target: PathBuf,
    written: u64,
}

impl PendingWrite {
    /// Ajoute un bloc de données
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Nombre d'octets écrits jusqu'ici
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Synchronise le fichier et le renomme sur la cible
    pub async fn commit(mut self) -> Result<u64> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        drop(self.file);
        self.temp_path.persist(&self.target)?;
        Ok(self.written)
    }
}

/// Mtime illisible ou dans le futur : le fichier est conservé
fn is_stale(entry: &fs::DirEntry, now: SystemTime) -> bool {
    entry
        .metadata()
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| now.duration_since(modified).ok())
        .is_some_and(|age| age >= STALE_PARTIAL_AGE)
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn partial_file(dir: &Path) -> Result<NamedTempFile> {
    Ok(tempfile::Builder::new()
        .prefix(PARTIAL_PREFIX)
        .tempfile_in(dir)?)
}

/// Écrit `data` dans `dir/file_name` via un fichier temporaire renommé
pub(crate) fn write_atomic(dir: &Path, file_name: &str, data: &[u8]) -> Result<()> {
    let mut partial = partial_file(dir)?;
    partial.write_all(data)?;
    partial.as_file().sync_all()?;
    partial.into_temp_path().persist(dir.join(file_name))?;
    Ok(())
}

/// Supprime un fichier ; l'absence n'est pas une erreur, les autres échecs
/// sont journalisés. Retourne `true` si un fichier a été supprimé.
pub(crate) fn remove_quietly(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!("Cannot remove {}: {}", path.display(), e);
            false
        }
    }
}
