//! Accès aux polices du namespace `fonts`

use crate::format::{FontFace, FontFormat};
use crossbeam_channel::{bounded, RecvTimeoutError};
use pmoassets::{AssetCaches, BatchPreloader, ResourceStore};
use std::time::Duration;
use tokio::runtime::Handle;

/// Décodeur de polices
///
/// Le [`Handle`] du runtime tokio sert à lancer les téléchargements depuis
/// [`get_blocking`](Self::get_blocking), appelé hors de tout contexte async.
#[derive(Debug, Clone)]
pub struct FontDecoder {
    runtime: Handle,
    preloader: BatchPreloader,
    timeout: Duration,
}

impl FontDecoder {
    /// Décodeur dont le repli bloquant attend au plus le timeout de
    /// téléchargement du préchargeur
    pub fn new(runtime: Handle, preloader: BatchPreloader) -> Self {
        let timeout = preloader.coordinator().timeout();
        Self {
            runtime,
            preloader,
            timeout,
        }
    }

    /// Décodeur du namespace `fonts` d'un ensemble de caches
    pub fn from_caches(runtime: Handle, caches: &AssetCaches) -> Self {
        Self::new(runtime, caches.fonts().clone())
    }

    /// Modifie l'attente maximale de [`get_blocking`](Self::get_blocking)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &ResourceStore {
        self.preloader.store()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Police `key` si elle est déjà en cache
    ///
    /// `None` si la ressource est absente, illisible ou n'est pas une
    /// police reconnue.
    pub fn get(&self, key: &str) -> Option<FontFace> {
        let data = self.store().get(key)?;
        match FontFormat::detect(&data) {
            Some(format) => Some(FontFace {
                path: self.store().path_for(key),
                data,
                format,
            }),
            None => {
                tracing::warn!("Cached resource {} is not a known font format", key);
                None
            }
        }
    }

    /// Télécharge la police si besoin puis la matérialise
    pub async fn load(&self, key: &str) -> Option<FontFace> {
        if !self.preloader.preload([key]).await.is_success() {
            return None;
        }
        self.get(key)
    }

    /// Repli synchrone : télécharge la police si besoin en **bloquant le
    /// thread appelant** jusqu'au timeout
    ///
    /// Ne doit jamais être appelé depuis une tâche async : le téléchargement
    /// tourne sur le runtime et le bloquer peut empêcher sa progression.
    /// Réservé au code qui ne peut pas attendre une complétion asynchrone ;
    /// utiliser [`load`](Self::load) partout ailleurs.
    ///
    /// Si le timeout expire, le téléchargement est annulé et `None` est
    /// retourné.
    pub fn get_blocking(&self, key: &str) -> Option<FontFace> {
        if self.store().has(key) {
            return self.get(key);
        }

        let (tx, rx) = bounded(1);
        let canceller = {
            let _guard = self.runtime.enter();
            self.preloader.coordinator().fetch_with(key, move |ok| {
                let _ = tx.send(ok);
            })
        };

        match rx.recv_timeout(self.timeout) {
            Ok(true) => self.get(key),
            Ok(false) => None,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    "Font {} not available after {:?}, giving up",
                    key,
                    self.timeout
                );
                canceller.cancel();
                None
            }
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!("Download of font {} ended without outcome", key);
                None
            }
        }
    }
}
