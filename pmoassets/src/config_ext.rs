//! Extension pour ouvrir les caches à partir de `pmoassetconfig`
//!
//! ```rust,ignore
//! use pmoassetconfig::Config;
//! use pmoassets::AssetCachesConfigExt;
//!
//! let config = Config::load("")?;
//! let caches = config.open_asset_caches()?;
//! ```

use crate::namespace::{AssetCaches, AssetNamespace};
use anyhow::Result;
use pmoassetconfig::Config;

/// Trait d'extension de `pmoassetconfig::Config`
pub trait AssetCachesConfigExt {
    /// Répertoire d'un espace de noms (absolu)
    fn get_namespace_path(&self, namespace: AssetNamespace) -> Result<std::path::PathBuf>;

    /// Ouvre tous les caches avec les répertoires et le timeout configurés
    fn open_asset_caches(&self) -> Result<AssetCaches>;
}

impl AssetCachesConfigExt for Config {
    fn get_namespace_path(&self, namespace: AssetNamespace) -> Result<std::path::PathBuf> {
        Ok(self
            .get_cache_root()?
            .join(self.get_namespace_dir(namespace.key())))
    }

    fn open_asset_caches(&self) -> Result<AssetCaches> {
        let root = self.get_cache_root()?;
        let caches = AssetCaches::open_with(
            root,
            self.get_download_timeout(),
            |ns| self.get_namespace_dir(ns.key()),
            &self.get_preferences_file(),
        )?;
        Ok(caches)
    }
}
