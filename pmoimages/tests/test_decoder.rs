use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
use pmoassets::AssetCaches;
use pmoimages::{DisplayBounds, ImageDecoder};
use std::io::Cursor;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Crée une image PNG de test (damier)
fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::from_fn(width, height, |x, y| {
        if (x + y) % 2 == 0 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 255, 255])
        }
    });
    let mut data = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
        .unwrap();
    data
}

fn create_test_decoder() -> (TempDir, AssetCaches, ImageDecoder) {
    let temp_dir = tempfile::tempdir().unwrap();
    let caches = AssetCaches::open(temp_dir.path()).unwrap();
    let decoder = ImageDecoder::from_caches(&caches);
    (temp_dir, caches, decoder)
}

#[test]
fn test_missing_image_is_none() {
    let (_temp_dir, _caches, decoder) = create_test_decoder();

    assert!(decoder
        .decode("https://example.com/absent.png", DisplayBounds::new(100, 100))
        .is_none());
    assert!(decoder.dimensions("https://example.com/absent.png").is_none());
}

#[test]
fn test_large_image_is_downsampled() {
    let (_temp_dir, _caches, decoder) = create_test_decoder();
    let key = "https://example.com/large.png";
    decoder.store().write(key, &create_test_png(800, 600)).unwrap();

    assert_eq!(decoder.dimensions(key), Some((800, 600)));

    // portrait (100, 200) : min(8, 3) = 3 ; paysage (200, 100) : min(4, 6) = 4
    let img = decoder.decode(key, DisplayBounds::new(100, 200)).unwrap();
    assert_eq!((img.width(), img.height()), (266, 200));
}

#[test]
fn test_small_image_is_not_upscaled() {
    let (_temp_dir, _caches, decoder) = create_test_decoder();
    let key = "https://example.com/icon.png";
    decoder.store().write(key, &create_test_png(32, 16)).unwrap();

    let img = decoder.decode(key, DisplayBounds::new(1080, 1920)).unwrap();

    assert_eq!((img.width(), img.height()), (32, 16));
}

#[test]
fn test_corrupt_image_is_none() {
    let (_temp_dir, _caches, decoder) = create_test_decoder();
    let key = "https://example.com/broken.png";
    decoder.store().write(key, b"definitely not an image").unwrap();

    assert!(decoder.decode(key, DisplayBounds::new(100, 100)).is_none());
    // Le fichier reste lisible pour les autres opérations du store
    assert!(decoder.store().has(key));
}

#[tokio::test]
async fn test_preload_then_decode_async() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/banner.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(create_test_png(400, 400))
                .insert_header("content-type", "image/png"),
        )
        .expect(1)
        .mount(&server)
        .await;
    let (_temp_dir, _caches, decoder) = create_test_decoder();
    let url = format!("{}/banner.png", server.uri());

    assert!(decoder.preload([&url]).await.is_success());

    let img = decoder
        .decode_async(&url, DisplayBounds::new(100, 100))
        .await
        .unwrap();
    assert_eq!((img.width(), img.height()), (100, 100));
}
