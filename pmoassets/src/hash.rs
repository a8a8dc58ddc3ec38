//! Dérivation des noms de fichiers à partir des clés de cache
//!
//! Toute clé (URL ou identifiant logique), quelle que soit sa longueur, est
//! transformée en un nom de fichier fixe de 128 caractères hexadécimaux
//! (SHA-512), valide sur tous les systèmes de fichiers supportés.

use sha2::{Digest, Sha512};

/// Longueur (en caractères) d'un nom produit par [`hash_key`]
pub const HASHED_NAME_LEN: usize = 128;

/// Retourne le nom de fichier associé à une clé de cache
///
/// # Exemple
///
/// ```
/// use pmoassets::hash::hash_key;
///
/// let name = hash_key("https://example.com/logo.png");
/// assert_eq!(name.len(), 128);
/// assert_eq!(name, hash_key("https://example.com/logo.png"));
/// ```
pub fn hash_key(key: &str) -> String {
    content_fingerprint(key.as_bytes())
}

/// Empreinte d'un contenu source (ex: HTML brut), utilisée pour détecter
/// qu'un artefact dérivé est périmé
pub fn content_fingerprint(content: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Indique si un nom de fichier a la forme d'une clé hachée
pub fn is_hashed_name(name: &str) -> bool {
    name.len() == HASHED_NAME_LEN && name.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable() {
        // SHA-512("abc"), vecteur de test FIPS 180-2
        assert_eq!(
            hash_key("abc"),
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
             2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
        );
    }

    #[test]
    fn test_hash_is_filesystem_safe_for_long_keys() {
        for len in [1usize, 2, 255, 256, 1024, 2000, 10_000] {
            let key = format!("https://example.com/{}", "a".repeat(len));
            let name = hash_key(&key);
            assert_eq!(name.len(), HASHED_NAME_LEN);
            assert!(is_hashed_name(&name));
            assert!(name.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
        }
    }

    #[test]
    fn test_distinct_keys_give_distinct_names() {
        assert_ne!(hash_key("https://a.example/1"), hash_key("https://a.example/2"));
    }

    #[test]
    fn test_is_hashed_name() {
        assert!(!is_hashed_name(".partial-abc"));
        assert!(!is_hashed_name(&"g".repeat(HASHED_NAME_LEN)));
    }
}
