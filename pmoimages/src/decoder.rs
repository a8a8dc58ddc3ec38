//! Décodeur d'images adossé au namespace `images`

use crate::sampling::{downsample, probe_dimensions, sample_factor, DisplayBounds};
use anyhow::{anyhow, Result};
use image::DynamicImage;
use pmoassets::{AssetCaches, BatchOutcome, BatchPreloader, ResourceStore};
use std::path::Path;

/// Décode les images présentes dans le cache à la taille d'affichage
#[derive(Debug, Clone)]
pub struct ImageDecoder {
    preloader: BatchPreloader,
}

impl ImageDecoder {
    pub fn new(preloader: BatchPreloader) -> Self {
        Self { preloader }
    }

    /// Décodeur du namespace `images` d'un ensemble de caches
    pub fn from_caches(caches: &AssetCaches) -> Self {
        Self::new(caches.images().clone())
    }

    pub fn store(&self) -> &ResourceStore {
        self.preloader.store()
    }

    /// Précharge des images (voir [`BatchPreloader::preload`])
    pub async fn preload<I, K>(&self, urls: I) -> BatchOutcome
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.preloader.preload(urls).await
    }

    /// Dimensions de l'image en cache, sans la décoder
    pub fn dimensions(&self, key: &str) -> Option<(u32, u32)> {
        let path = self.store().get_file(key)?;
        match probe_dimensions(&path) {
            Ok(size) => Some(size),
            Err(e) => {
                tracing::warn!("Cannot read image header of {}: {}", key, e);
                None
            }
        }
    }

    /// Décode l'image `key` réduite pour `display`
    ///
    /// `None` si l'image n'est pas en cache ou ne peut pas être décodée.
    /// Le décodage est coûteux en CPU : depuis une tâche async, préférer
    /// [`decode_async`](Self::decode_async).
    pub fn decode(&self, key: &str, display: DisplayBounds) -> Option<DynamicImage> {
        let path = self.store().get_file(key)?;
        match decode_file(&path, display) {
            Ok(img) => Some(img),
            Err(e) => {
                tracing::warn!("Cannot decode cached image {}: {}", key, e);
                None
            }
        }
    }

    /// Variante de [`decode`](Self::decode) exécutée sur le pool bloquant
    /// de tokio
    pub async fn decode_async(&self, key: &str, display: DisplayBounds) -> Option<DynamicImage> {
        let decoder = self.clone();
        let key = key.to_string();
        match tokio::task::spawn_blocking(move || decoder.decode(&key, display)).await {
            Ok(img) => img,
            Err(e) => {
                tracing::warn!("Image decoding task failed: {}", e);
                None
            }
        }
    }
}

fn decode_file(path: &Path, display: DisplayBounds) -> Result<DynamicImage> {
    let size = probe_dimensions(path)?;
    if size.0 == 0 || size.1 == 0 {
        return Err(anyhow!("empty image ({}x{})", size.0, size.1));
    }
    let factor = sample_factor(size, display);

    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;

    tracing::debug!(
        "Decoded {} ({}x{}) with sample factor {}",
        path.display(),
        size.0,
        size.1,
        factor
    );
    Ok(downsample(img, factor))
}
