//! Téléchargement des ressources distantes vers un [`ResourceStore`]
//!
//! Chaque appel à [`DownloadCoordinator::fetch`] lance une tâche tokio qui
//! télécharge l'URL avec un timeout borné et écrit le corps en flux dans un
//! fichier temporaire du store. La ressource n'est publiée (renommage) que
//! si tout le corps a été reçu avec un statut 2xx : un échec ne laisse
//! aucun fichier, ou laisse intact le fichier existant.
//!
//! Le [`FetchHandle`] retourné permet d'annuler le transfert et d'en
//! attendre l'issue, produite une seule fois.

use crate::error::{CacheError, Result};
use crate::store::ResourceStore;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Timeout appliqué par défaut à chaque téléchargement
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Vérifie qu'une clé est une URL http(s) téléchargeable
pub fn parse_fetchable(key: &str) -> Result<Url> {
    let url = Url::parse(key).map_err(|e| CacheError::InvalidUrl(format!("{key}: {e}")))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(CacheError::InvalidUrl(key.to_string())),
    }
}

/// Télécharge des ressources dans un store
#[derive(Debug, Clone)]
pub struct DownloadCoordinator {
    store: ResourceStore,
    client: reqwest::Client,
    timeout: Duration,
}

impl DownloadCoordinator {
    /// Crée un coordinateur avec le timeout par défaut (10 s)
    pub fn new(store: ResourceStore) -> Result<Self> {
        Self::with_timeout(store, DEFAULT_DOWNLOAD_TIMEOUT)
    }

    /// Crée un coordinateur avec un timeout explicite
    pub fn with_timeout(store: ResourceStore, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            store,
            client,
            timeout,
        })
    }

    /// Store dans lequel les ressources sont écrites
    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    /// Timeout appliqué à chaque téléchargement
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Lance le téléchargement de `key`
    ///
    /// Doit être appelé depuis un runtime tokio. Une clé qui n'est pas une
    /// URL http(s) produit un handle déjà en échec, sans aucune I/O réseau.
    pub fn fetch(&self, key: &str) -> FetchHandle {
        let url = match parse_fetchable(key) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Rejecting download: {}", e);
                return FetchHandle::rejected(key);
            }
        };

        let token = CancellationToken::new();
        let task = tokio::spawn({
            let token = token.clone();
            let client = self.client.clone();
            let store = self.store.clone();
            let key = key.to_string();
            async move {
                let outcome = tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(CacheError::Cancelled),
                    result = transfer(&client, &store, &key, url) => result,
                };
                match outcome {
                    Ok(size) => {
                        tracing::debug!("Downloaded {} ({} bytes)", key, size);
                        true
                    }
                    Err(CacheError::Cancelled) => {
                        tracing::debug!("Download of {} cancelled", key);
                        false
                    }
                    Err(e) => {
                        tracing::warn!("Download of {} failed: {}", key, e);
                        false
                    }
                }
            }
        });

        FetchHandle {
            key: key.to_string(),
            token,
            task: Some(task),
        }
    }

    /// Variante à callback de [`fetch`](Self::fetch)
    ///
    /// `on_done` est appelé exactement une fois : immédiatement (sur le
    /// thread appelant) si la clé est invalide, sinon depuis une tâche tokio
    /// à la fin du transfert ou de son annulation.
    pub fn fetch_with<F>(&self, key: &str, on_done: F) -> FetchCanceller
    where
        F: FnOnce(bool) + Send + 'static,
    {
        let handle = self.fetch(key);
        let canceller = handle.canceller();
        if handle.task.is_none() {
            on_done(false);
        } else {
            tokio::spawn(async move { on_done(handle.wait().await) });
        }
        canceller
    }
}

async fn transfer(
    client: &reqwest::Client,
    store: &ResourceStore,
    key: &str,
    url: Url,
) -> Result<u64> {
    let response = client.get(url).send().await.map_err(http_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(CacheError::HttpStatus(status.as_u16()));
    }

    let mut pending = store.begin_write(key)?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        pending.write_chunk(&chunk.map_err(http_error)?).await?;
    }
    pending.commit().await
}

fn http_error(e: reqwest::Error) -> CacheError {
    if e.is_timeout() {
        CacheError::Timeout
    } else {
        CacheError::Http(e)
    }
}

/// Téléchargement en cours
///
/// L'issue s'obtient avec [`wait`](Self::wait), qui consomme le handle :
/// elle ne peut être observée qu'une fois. Abandonner le handle sans
/// l'attendre laisse le transfert se terminer en arrière-plan.
#[derive(Debug)]
pub struct FetchHandle {
    key: String,
    token: CancellationToken,
    task: Option<JoinHandle<bool>>,
}

impl FetchHandle {
    fn rejected(key: &str) -> Self {
        Self {
            key: key.to_string(),
            token: CancellationToken::new(),
            task: None,
        }
    }

    /// Clé téléchargée
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Demande l'annulation du transfert
    ///
    /// Sans effet si le transfert est déjà terminé : l'issue déjà produite
    /// est conservée.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Handle d'annulation détachable
    pub fn canceller(&self) -> FetchCanceller {
        FetchCanceller(self.token.clone())
    }

    /// Vrai si le transfert est terminé (ou n'a jamais démarré)
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Attend l'issue du téléchargement
    pub async fn wait(self) -> bool {
        match self.task {
            None => false,
            Some(task) => match task.await {
                Ok(success) => success,
                Err(e) => {
                    tracing::warn!("Download task for {} aborted: {}", self.key, e);
                    false
                }
            },
        }
    }
}

/// Permet d'annuler un téléchargement sans posséder son [`FetchHandle`]
#[derive(Debug, Clone)]
pub struct FetchCanceller(CancellationToken);

impl FetchCanceller {
    pub fn cancel(&self) {
        self.0.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fetchable() {
        assert!(parse_fetchable("https://example.com/a.png").is_ok());
        assert!(parse_fetchable("http://127.0.0.1:8080/font.ttf").is_ok());
        assert!(parse_fetchable("").is_err());
        assert!(parse_fetchable("not a url").is_err());
        assert!(parse_fetchable("file:///etc/passwd").is_err());
        assert!(parse_fetchable("ftp://example.com/a").is_err());
        assert!(parse_fetchable("data:text/plain,hello").is_err());
    }

    #[tokio::test]
    async fn test_invalid_url_fails_without_io() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ResourceStore::open(temp_dir.path()).unwrap();
        let coordinator = DownloadCoordinator::new(store.clone()).unwrap();

        let handle = coordinator.fetch("::not-a-url::");
        assert!(handle.is_finished());
        assert!(!handle.wait().await);
        assert!(store.list().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_with_invalid_url_calls_back_synchronously() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ResourceStore::open(temp_dir.path()).unwrap();
        let coordinator = DownloadCoordinator::new(store).unwrap();

        let (tx, rx) = std::sync::mpsc::channel();
        coordinator.fetch_with("relative/path.png", move |ok| tx.send(ok).unwrap());

        assert_eq!(rx.try_recv(), Ok(false));
        assert!(rx.try_recv().is_err());
    }
}
