//! Préchargement d'un lot de ressources
//!
//! [`BatchPreloader::preload`] garantit que toutes les clés d'un lot sont
//! présentes localement et agrège le résultat en une seule issue : succès
//! si toutes les ressources sont présentes, échec dès qu'un téléchargement
//! échoue (les autres sont alors annulés).
//!
//! Pas de déduplication entre appels concurrents : deux lots lancés en même
//! temps pour une même clé absente la téléchargent tous les deux (le dernier
//! renommage l'emporte, le contenu étant identique). Un appel lancé après la
//! fin du premier trouve le fichier et ne télécharge rien.

use crate::download::DownloadCoordinator;
use crate::store::ResourceStore;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;

/// Issue agrégée d'un lot
///
/// Une seule valeur par lot : la clé fautive n'est pas identifiée.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Toutes les ressources du lot sont présentes
    AllSucceeded,
    /// Au moins un téléchargement a échoué
    Failed,
}

impl BatchOutcome {
    pub fn is_success(self) -> bool {
        self == BatchOutcome::AllSucceeded
    }
}

impl From<bool> for BatchOutcome {
    fn from(success: bool) -> Self {
        if success {
            BatchOutcome::AllSucceeded
        } else {
            BatchOutcome::Failed
        }
    }
}

/// Précharge des lots de ressources dans un store
#[derive(Debug, Clone)]
pub struct BatchPreloader {
    coordinator: DownloadCoordinator,
}

impl BatchPreloader {
    pub fn new(coordinator: DownloadCoordinator) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &DownloadCoordinator {
        &self.coordinator
    }

    pub fn store(&self) -> &ResourceStore {
        self.coordinator.store()
    }

    /// Rend présentes toutes les ressources de `keys`
    ///
    /// - lot vide : succès immédiat ;
    /// - clé déjà présente : succès sans accès réseau ;
    /// - clés absentes : téléchargées en parallèle ; le premier échec annule
    ///   les autres téléchargements et le lot échoue.
    ///
    /// Une clé répétée dans le lot n'est téléchargée qu'une fois.
    pub async fn preload<I, K>(&self, keys: I) -> BatchOutcome
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys = dedup(keys);
        self.preload_keys(keys).await
    }

    /// Variante à callback de [`preload`](Self::preload)
    ///
    /// `on_done(all_succeeded)` est appelé exactement une fois : sur le
    /// thread appelant si aucune ressource n'est à télécharger, sinon depuis
    /// une tâche tokio.
    pub fn preload_with<I, K, F>(&self, keys: I, on_done: F)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
        F: FnOnce(bool) + Send + 'static,
    {
        let keys = dedup(keys);
        if keys.iter().all(|key| self.store().has(key)) {
            on_done(true);
            return;
        }

        let preloader = self.clone();
        tokio::spawn(async move {
            let outcome = preloader.preload_keys(keys).await;
            on_done(outcome.is_success());
        });
    }

    async fn preload_keys(&self, keys: Vec<String>) -> BatchOutcome {
        if keys.is_empty() {
            return BatchOutcome::AllSucceeded;
        }

        let mut cancellers = Vec::new();
        let mut pending = FuturesUnordered::new();
        let mut cached = 0usize;

        for key in &keys {
            if self.store().has(key) {
                cached += 1;
                continue;
            }
            let handle = self.coordinator.fetch(key);
            cancellers.push(handle.canceller());
            pending.push(handle.wait());
        }

        tracing::debug!(
            "Preloading {} resource(s): {} cached, {} to download",
            keys.len(),
            cached,
            pending.len()
        );

        while let Some(success) = pending.next().await {
            if !success {
                for canceller in &cancellers {
                    canceller.cancel();
                }
                tracing::warn!(
                    "Preload of {} resource(s) failed, remaining downloads cancelled",
                    keys.len()
                );
                return BatchOutcome::Failed;
            }
        }

        BatchOutcome::AllSucceeded
    }
}

fn dedup<I, K>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    let mut seen = HashSet::new();
    keys.into_iter()
        .map(|key| key.as_ref().to_string())
        .filter(|key| seen.insert(key.clone()))
        .collect()
}
