//! Gestion des erreurs internes du cache
//!
//! Ces erreurs ne traversent pas l'API publique des caches : chaque opération
//! publique les convertit en `None`/`false` après les avoir journalisées.
//! Elles restent exposées pour les fonctions de bas niveau (`write`,
//! `begin_write`, ouverture des stores).

use thiserror::Error;

/// Type Result personnalisé pour pmoassets
pub type Result<T> = std::result::Result<T, CacheError>;

/// Erreurs possibles du moteur de cache
#[derive(Error, Debug)]
pub enum CacheError {
    /// Clé vide ou inutilisable, rejetée avant toute I/O
    #[error("Invalid cache key: {0:?}")]
    InvalidKey(String),

    /// La clé n'est pas une URL téléchargeable (http/https)
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Erreur d'entrée/sortie disque
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Erreur de transport HTTP (connexion, timeout, lecture du corps)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Réponse HTTP hors de la plage 2xx
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Erreur de (dé)sérialisation JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Erreur de la base de préférences
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Échec du renommage atomique d'un fichier temporaire
    #[error("Failed to persist file: {0}")]
    Persist(#[from] tempfile::PathPersistError),

    /// Téléchargement annulé
    #[error("Download cancelled")]
    Cancelled,

    /// Attente bornée expirée
    #[error("Timed out")]
    Timeout,
}
