//! Sondage des dimensions et calcul du facteur de sous-échantillonnage

use anyhow::Result;
use image::{imageops::FilterType, DynamicImage, ImageReader};
use std::path::Path;

/// Bornes de la surface d'affichage, en pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayBounds {
    pub width: u32,
    pub height: u32,
}

impl DisplayBounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Bornes en orientation portrait puis paysage
    pub fn orientations(self) -> [(u32, u32); 2] {
        let short = self.width.min(self.height);
        let long = self.width.max(self.height);
        [(short, long), (long, short)]
    }
}

/// Dimensions d'une image, lues dans l'en-tête uniquement
pub fn probe_dimensions(path: &Path) -> Result<(u32, u32)> {
    let dimensions = ImageReader::open(path)?
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(dimensions)
}

/// Facteur de réduction d'une image de taille `(width, height)`
///
/// Pour chaque orientation de l'affichage, le ratio retenu est le plus
/// petit des ratios largeur et hauteur (division entière) ; le facteur est
/// le plus petit des deux, borné à 1. Une borne nulle (affichage pas
/// encore mesuré) n'impose aucune contrainte : le facteur vaut 1.
///
/// ```
/// use pmoimages::{sample_factor, DisplayBounds};
///
/// assert_eq!(sample_factor((8000, 6000), DisplayBounds::new(1000, 2000)), 3);
/// assert_eq!(sample_factor((320, 200), DisplayBounds::new(1080, 1920)), 1);
/// ```
pub fn sample_factor(size: (u32, u32), display: DisplayBounds) -> u32 {
    let (width, height) = size;
    if display.width == 0 || display.height == 0 {
        return 1;
    }
    display
        .orientations()
        .iter()
        .map(|&(bw, bh)| (width / bw).min(height / bh))
        .min()
        .unwrap_or(1)
        .max(1)
}

/// Réduit une image décodée par `factor`
pub fn downsample(img: DynamicImage, factor: u32) -> DynamicImage {
    if factor <= 1 {
        return img;
    }
    let width = (img.width() / factor).max(1);
    let height = (img.height() / factor).max(1);
    img.resize_exact(width, height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_never_below_one() {
        let display = DisplayBounds::new(1080, 1920);
        assert_eq!(sample_factor((1, 1), display), 1);
        assert_eq!(sample_factor((0, 0), display), 1);
        assert_eq!(sample_factor((1080, 1920), display), 1);
    }

    #[test]
    fn test_factor_uses_both_orientations() {
        // portrait : min(8000/1000, 6000/2000) = 3
        // paysage  : min(8000/2000, 6000/1000) = 4
        let display = DisplayBounds::new(2000, 1000);
        assert_eq!(sample_factor((8000, 6000), display), 3);
        assert_eq!(
            sample_factor((8000, 6000), display),
            sample_factor((8000, 6000), DisplayBounds::new(1000, 2000))
        );
    }

    #[test]
    fn test_factor_with_degenerate_display() {
        assert_eq!(sample_factor((400, 400), DisplayBounds::new(0, 0)), 1);
        assert_eq!(sample_factor((4000, 3000), DisplayBounds::new(0, 1920)), 1);
    }

    #[test]
    fn test_downsample() {
        let img = DynamicImage::new_rgba8(400, 300);

        let reduced = downsample(img.clone(), 4);
        assert_eq!((reduced.width(), reduced.height()), (100, 75));

        let same = downsample(img, 1);
        assert_eq!((same.width(), same.height()), (400, 300));
    }
}
