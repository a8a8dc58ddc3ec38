//! Espaces de noms des caches et handle regroupant leurs stores
//!
//! Chaque classe de ressources possède son propre sous-répertoire, ce qui
//! évite les collisions de clés entre classes :
//!
//! ```text
//! cache_assets/
//! ├── images/          # ResourceStore des images
//! ├── fonts/           # ResourceStore des polices
//! ├── html/            # artefacts HTML normalisés (ContentValidatedCache)
//! ├── objects/         # objets typés (TypedObjectCache)
//! └── preferences.db   # métadonnées des caches validés
//! ```

use crate::download::{DownloadCoordinator, DEFAULT_DOWNLOAD_TIMEOUT};
use crate::error::Result;
use crate::prefs::Preferences;
use crate::preload::BatchPreloader;
use crate::store::ResourceStore;
use crate::typed::TypedObjectCache;
use crate::validated::ContentValidatedCache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Classe de ressources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetNamespace {
    Images,
    Fonts,
    Html,
    Objects,
}

impl AssetNamespace {
    pub const ALL: [AssetNamespace; 4] = [
        AssetNamespace::Images,
        AssetNamespace::Fonts,
        AssetNamespace::Html,
        AssetNamespace::Objects,
    ];

    /// Clé de configuration et nom de répertoire par défaut
    pub fn key(self) -> &'static str {
        match self {
            AssetNamespace::Images => "images",
            AssetNamespace::Fonts => "fonts",
            AssetNamespace::Html => "html",
            AssetNamespace::Objects => "objects",
        }
    }
}

/// Ensemble des caches d'une application
///
/// Handle explicite à injecter dans les collaborateurs (décodeurs, rendu,
/// ...) : aucun état global n'est utilisé.
#[derive(Debug, Clone)]
pub struct AssetCaches {
    root: PathBuf,
    images: BatchPreloader,
    fonts: BatchPreloader,
    html: ResourceStore,
    objects: ResourceStore,
    preferences: Arc<Preferences>,
}

impl AssetCaches {
    /// Ouvre les caches sous `root` avec les répertoires par défaut
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with(root, DEFAULT_DOWNLOAD_TIMEOUT, |ns| ns.key().to_string(), "preferences.db")
    }

    /// Ouvre les caches sous `root`
    ///
    /// # Arguments
    ///
    /// * `timeout` - Timeout de chaque téléchargement
    /// * `dir_for` - Nom du sous-répertoire de chaque espace de noms
    /// * `preferences_file` - Nom de la base de préférences
    pub fn open_with<F>(
        root: impl Into<PathBuf>,
        timeout: Duration,
        dir_for: F,
        preferences_file: &str,
    ) -> Result<Self>
    where
        F: Fn(AssetNamespace) -> String,
    {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let open = |ns: AssetNamespace| ResourceStore::open(root.join(dir_for(ns)));
        let preloader = |store: ResourceStore| -> Result<BatchPreloader> {
            Ok(BatchPreloader::new(DownloadCoordinator::with_timeout(
                store, timeout,
            )?))
        };

        let caches = Self {
            images: preloader(open(AssetNamespace::Images)?)?,
            fonts: preloader(open(AssetNamespace::Fonts)?)?,
            html: open(AssetNamespace::Html)?,
            objects: open(AssetNamespace::Objects)?,
            preferences: Arc::new(Preferences::open(&root.join(preferences_file))?),
            root,
        };
        tracing::info!("Asset caches opened in {}", caches.root.display());
        Ok(caches)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store d'un espace de noms
    pub fn store(&self, namespace: AssetNamespace) -> &ResourceStore {
        match namespace {
            AssetNamespace::Images => self.images.store(),
            AssetNamespace::Fonts => self.fonts.store(),
            AssetNamespace::Html => &self.html,
            AssetNamespace::Objects => &self.objects,
        }
    }

    /// Préchargeur des images
    pub fn images(&self) -> &BatchPreloader {
        &self.images
    }

    /// Préchargeur des polices
    pub fn fonts(&self) -> &BatchPreloader {
        &self.fonts
    }

    pub fn preferences(&self) -> Arc<Preferences> {
        self.preferences.clone()
    }

    /// Cache typé persistant dans `objects/<file_name>`
    pub fn typed_cache<T>(&self, file_name: &str) -> Result<TypedObjectCache<T>>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        TypedObjectCache::in_store(&self.objects, file_name)
    }

    /// Cache validé par contenu dont les artefacts vivent dans `html/`
    pub fn validated_cache<T>(&self, name: &str) -> Result<ContentValidatedCache<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        ContentValidatedCache::new(name, self.html.clone(), self.preferences.clone())
    }
}
