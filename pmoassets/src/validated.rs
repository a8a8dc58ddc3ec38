//! Cache d'artefacts dérivés, validés par l'empreinte de leur source
//!
//! Un artefact dérivé (ex: HTML normalisé calculé à partir d'un gabarit
//! servi par le serveur) n'est valide que tant que le contenu source est
//! inchangé. Pour chaque identifiant logique, deux préférences sont
//! enregistrées :
//!
//! ```text
//! <cache>:<id>:origin_hash   -> SHA-512 du contenu source
//! <cache>:<id>:derived_file  -> nom du fichier JSON de l'artefact
//! ```
//!
//! L'artefact est écrit dans un fichier neuf avant la mise à jour des
//! métadonnées : un crash entre les deux laisse au pire un fichier orphelin
//! (supprimé par [`purge_orphans`](ContentValidatedCache::purge_orphans)),
//! jamais une référence vers un fichier absent.

use crate::error::{CacheError, Result};
use crate::hash::content_fingerprint;
use crate::prefs::Preferences;
use crate::store::{remove_quietly, write_atomic, ResourceStore};
use crate::typed::is_plain_file_name;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

const ORIGIN_HASH: &str = "origin_hash";
const DERIVED_FILE: &str = "derived_file";

/// Cache d'artefacts `T` invalidés par changement du contenu source
pub struct ContentValidatedCache<T> {
    name: String,
    store: ResourceStore,
    prefs: Arc<Preferences>,
    lock: Mutex<()>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> ContentValidatedCache<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Crée un cache nommé
    ///
    /// `name` (lettres, chiffres, `-`, `_`) préfixe à la fois les clés de
    /// préférences et les fichiers dérivés : plusieurs caches peuvent
    /// partager le même store et la même base de préférences.
    pub fn new(name: &str, store: ResourceStore, prefs: Arc<Preferences>) -> Result<Self> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(CacheError::InvalidKey(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            store,
            prefs,
            lock: Mutex::new(()),
            _phantom: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Artefact de `id` s'il a été calculé à partir de `origin`
    ///
    /// - aucune métadonnée : `None` ;
    /// - empreinte différente (source modifiée) : `None`, l'entrée est
    ///   conservée ;
    /// - fichier dérivé absent ou illisible : l'entrée est supprimée, `None`.
    pub fn get(&self, id: &str, origin: impl AsRef<[u8]>) -> Option<T> {
        let _guard = self.lock.lock();
        let fingerprint = content_fingerprint(origin.as_ref());

        let stored = match self.prefs.get(&self.meta_key(id, ORIGIN_HASH)) {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                tracing::debug!("{}: no entry for {}", self.name, id);
                return None;
            }
            Err(e) => {
                tracing::warn!("{}: cannot read metadata of {}: {}", self.name, id, e);
                return None;
            }
        };

        if stored != fingerprint {
            tracing::debug!("{}: origin of {} changed, ignoring cached artifact", self.name, id);
            return None;
        }

        match self.read_artifact(id) {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                tracing::warn!("{}: dropping entry {}: {}", self.name, id, e);
                self.remove_locked(id);
                None
            }
        }
    }

    /// Enregistre l'artefact calculé à partir de `origin`
    ///
    /// Retourne `false` si l'artefact n'a pas pu être enregistré ; l'entrée
    /// précédente reste alors valide.
    pub fn set(&self, id: &str, origin: impl AsRef<[u8]>, artifact: &T) -> bool {
        let _guard = self.lock.lock();
        match self.set_locked(id, origin.as_ref(), artifact) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("{}: cannot store artifact for {}: {}", self.name, id, e);
                false
            }
        }
    }

    /// Supprime l'entrée `id` (fichier dérivé et métadonnées)
    ///
    /// Retourne `true` si des métadonnées ont été supprimées.
    pub fn remove(&self, id: &str) -> bool {
        let _guard = self.lock.lock();
        self.remove_locked(id)
    }

    /// Supprime les fichiers dérivés de ce cache qu'aucune entrée ne
    /// référence. Retourne le nombre de fichiers supprimés.
    pub fn purge_orphans(&self) -> usize {
        let _guard = self.lock.lock();

        let entries = match self.prefs.entries_with_prefix(&format!("{}:", self.name)) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("{}: cannot list metadata: {}", self.name, e);
                return 0;
            }
        };
        let suffix = format!(":{DERIVED_FILE}");
        let referenced: HashSet<String> = entries
            .into_iter()
            .filter(|(key, _)| key.ends_with(&suffix))
            .map(|(_, file)| file)
            .collect();

        let prefix = self.file_prefix();
        let removed = self
            .store
            .list()
            .into_iter()
            .filter(|file| file.starts_with(&prefix) && !referenced.contains(file))
            .filter(|file| remove_quietly(&self.store.dir().join(file)))
            .count();

        if removed > 0 {
            tracing::info!("{}: removed {} orphan artifact(s)", self.name, removed);
        }
        removed
    }

    fn set_locked(&self, id: &str, origin: &[u8], artifact: &T) -> Result<()> {
        let data = serde_json::to_vec(artifact)?;
        let file_name = format!("{}{}.json", self.file_prefix(), Uuid::new_v4().simple());
        write_atomic(self.store.dir(), &file_name, &data)?;

        let file_key = self.meta_key(id, DERIVED_FILE);
        let previous = self.prefs.get(&file_key).ok().flatten();

        let fingerprint = content_fingerprint(origin);
        let hash_key = self.meta_key(id, ORIGIN_HASH);
        if let Err(e) = self
            .prefs
            .set_many(&[
                (hash_key.as_str(), fingerprint.as_str()),
                (file_key.as_str(), file_name.as_str()),
            ])
        {
            remove_quietly(&self.store.dir().join(&file_name));
            return Err(e);
        }

        if let Some(previous) = previous.filter(|p| *p != file_name && is_plain_file_name(p)) {
            remove_quietly(&self.store.dir().join(previous));
        }
        Ok(())
    }

    fn read_artifact(&self, id: &str) -> Result<T> {
        let file_name = self
            .prefs
            .get(&self.meta_key(id, DERIVED_FILE))?
            .filter(|name| is_plain_file_name(name))
            .ok_or_else(|| CacheError::InvalidKey(format!("no derived file for {id}")))?;
        let data = fs::read(self.store.dir().join(file_name))?;
        Ok(serde_json::from_slice(&data)?)
    }

    fn remove_locked(&self, id: &str) -> bool {
        let file_key = self.meta_key(id, DERIVED_FILE);
        if let Ok(Some(file_name)) = self.prefs.get(&file_key) {
            if is_plain_file_name(&file_name) {
                remove_quietly(&self.store.dir().join(file_name));
            }
        }

        let hash_key = self.meta_key(id, ORIGIN_HASH);
        match self.prefs.remove(&[hash_key.as_str(), file_key.as_str()]) {
            Ok(removed) => removed > 0,
            Err(e) => {
                tracing::warn!("{}: cannot remove metadata of {}: {}", self.name, id, e);
                false
            }
        }
    }

    fn meta_key(&self, id: &str, field: &str) -> String {
        format!("{}:{}:{}", self.name, id, field)
    }

    /// `.` ne peut pas apparaître dans un nom : le préfixe d'un cache n'est
    /// jamais le début de celui d'un autre (`html.` / `html-email.`)
    fn file_prefix(&self) -> String {
        format!("{}.", self.name)
    }
}
