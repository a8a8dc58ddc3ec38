//! # pmoimages - Décodage des images du cache de ressources
//!
//! Cette crate s'appuie sur le namespace `images` de `pmoassets` et ajoute
//! le décodage adapté à la taille d'affichage :
//!
//! 1. lecture des seules dimensions (en-tête du fichier, sans décodage) ;
//! 2. calcul d'un facteur de sous-échantillonnage à partir des bornes
//!    d'affichage, dans les deux orientations ;
//! 3. décodage complet puis réduction par ce facteur (jamais
//!    d'agrandissement).
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use pmoassets::AssetCaches;
//! use pmoimages::{DisplayBounds, ImageDecoder};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let caches = AssetCaches::open("./cache_assets")?;
//!     let decoder = ImageDecoder::from_caches(&caches);
//!
//!     let url = "https://example.com/banner.jpg";
//!     if decoder.preload([url]).await.is_success() {
//!         let display = DisplayBounds::new(1080, 1920);
//!         if let Some(img) = decoder.decode_async(url, display).await {
//!             println!("Bannière décodée en {}x{}", img.width(), img.height());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod decoder;
pub mod sampling;

pub use decoder::ImageDecoder;
pub use sampling::{downsample, probe_dimensions, sample_factor, DisplayBounds};
