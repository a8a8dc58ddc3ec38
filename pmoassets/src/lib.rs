//! # pmoassets - Cache de ressources côté client
//!
//! Cette crate fournit le moteur de cache utilisé pour éviter de
//! re-télécharger et de re-décoder les ressources distantes (images,
//! polices, HTML normalisé, objets JSON) nécessaires au rendu de contenus
//! servis dynamiquement. Elle sert de base aux caches spécialisés
//! `pmoimages` et `pmofonts`.
//!
//! ## Architecture
//!
//! ```text
//! pmoassets (générique)
//!     ├── hash.rs       - Clé de cache -> nom de fichier (SHA-512 hex)
//!     ├── store.rs      - Répertoire adressé par clé, écritures atomiques
//!     ├── download.rs   - Téléchargement HTTP borné et annulable
//!     ├── preload.rs    - Préchargement d'un lot, issue agrégée
//!     ├── typed.rs      - Objet typé unique persisté en JSON
//!     ├── prefs.rs      - Magasin clé/valeur SQLite
//!     ├── validated.rs  - Artefacts dérivés validés par empreinte
//!     └── namespace.rs  - Un répertoire par classe de ressources
//!
//! pmoimages (images)
//!     └── Sous-échantillonnage selon la taille d'affichage
//!
//! pmofonts (polices)
//!     └── Matérialisation, repli synchrone bloquant
//! ```
//!
//! ## Flux de données
//!
//! ```text
//! appelant -> BatchPreloader::preload(clés)
//!               pour chaque clé : ResourceStore::has ?
//!                 non -> DownloadCoordinator::fetch -> ResourceStore (renommage)
//!             <- BatchOutcome (une seule issue par lot)
//! appelant -> ResourceStore::get_file / TypedObjectCache::get
//! ```
//!
//! ## Gestion des erreurs
//!
//! Les opérations publiques ne propagent pas d'erreur : réseau indisponible,
//! disque plein, fichier corrompu ou URL invalide se traduisent par `None`
//! ou `false`, avec une trace `tracing`. Aucune nouvelle tentative n'est
//! faite en interne.
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use pmoassets::AssetCaches;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), pmoassets::CacheError> {
//!     let caches = AssetCaches::open("./cache_assets")?;
//!
//!     let urls = ["https://example.com/banner.png", "https://example.com/logo.png"];
//!     if caches.images().preload(urls).await.is_success() {
//!         let path = caches.images().store().get_file(urls[0]);
//!         println!("Bannière disponible : {:?}", path);
//!     }
//!
//!     // Éviction des images qui ne sont plus référencées
//!     caches.images().store().clear_except(urls);
//!     Ok(())
//! }
//! ```

pub mod download;
pub mod error;
pub mod hash;
pub mod namespace;
pub mod prefs;
pub mod preload;
pub mod store;
pub mod typed;
pub mod validated;

#[cfg(feature = "pmoassetconfig")]
pub mod config_ext;

pub use download::{DownloadCoordinator, FetchCanceller, FetchHandle, DEFAULT_DOWNLOAD_TIMEOUT};
pub use error::{CacheError, Result};
pub use hash::{content_fingerprint, hash_key};
pub use namespace::{AssetCaches, AssetNamespace};
pub use prefs::Preferences;
pub use preload::{BatchOutcome, BatchPreloader};
pub use store::{PendingWrite, ResourceStore};
pub use typed::TypedObjectCache;
pub use validated::ContentValidatedCache;

#[cfg(feature = "pmoassetconfig")]
pub use config_ext::AssetCachesConfigExt;
