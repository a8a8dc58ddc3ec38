//! Formats de police reconnus

use std::path::PathBuf;

/// Format d'une police, déduit de ses quatre premiers octets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFormat {
    TrueType,
    OpenType,
    Woff,
    Woff2,
    TrueTypeCollection,
}

impl FontFormat {
    /// Détecte le format à partir du nombre magique
    ///
    /// ```
    /// use pmofonts::FontFormat;
    ///
    /// assert_eq!(FontFormat::detect(b"wOF2\x00\x01"), Some(FontFormat::Woff2));
    /// assert_eq!(FontFormat::detect(b"<html>"), None);
    /// ```
    pub fn detect(data: &[u8]) -> Option<Self> {
        let magic: [u8; 4] = data.get(..4)?.try_into().ok()?;
        match &magic {
            &[0x00, 0x01, 0x00, 0x00] | b"true" => Some(FontFormat::TrueType),
            b"OTTO" => Some(FontFormat::OpenType),
            b"wOFF" => Some(FontFormat::Woff),
            b"wOF2" => Some(FontFormat::Woff2),
            b"ttcf" => Some(FontFormat::TrueTypeCollection),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            FontFormat::TrueType => "font/ttf",
            FontFormat::OpenType => "font/otf",
            FontFormat::Woff => "font/woff",
            FontFormat::Woff2 => "font/woff2",
            FontFormat::TrueTypeCollection => "font/collection",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FontFormat::TrueType => "ttf",
            FontFormat::OpenType => "otf",
            FontFormat::Woff => "woff",
            FontFormat::Woff2 => "woff2",
            FontFormat::TrueTypeCollection => "ttc",
        }
    }
}

/// Police matérialisée depuis le cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFace {
    /// Fichier de la ressource dans le store
    pub path: PathBuf,
    pub data: Vec<u8>,
    pub format: FontFormat,
}
