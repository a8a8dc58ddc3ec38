//! # pmofonts - Polices du cache de ressources
//!
//! Matérialise les polices présentes dans le namespace `fonts` de
//! `pmoassets` en [`FontFace`] (chemin, octets, format détecté par le
//! nombre magique).
//!
//! Deux modes d'accès :
//!
//! - [`FontDecoder::get`] / [`FontDecoder::load`] : lecture du cache, avec
//!   téléchargement asynchrone pour `load` ;
//! - [`FontDecoder::get_blocking`] : repli synchrone pour le code qui ne
//!   peut pas attendre une complétion asynchrone. **Bloque le thread
//!   appelant** jusqu'au timeout de téléchargement.

pub mod decoder;
pub mod format;

pub use decoder::FontDecoder;
pub use format::{FontFace, FontFormat};
