//! # Configuration Management
//!
//! Configuration types for the keyplane trust core. The embedding service
//! owns loading (files, environment, flags); this module owns the shape and
//! the validation rules.

pub mod settings;

pub use settings::{
    ContentConfig, CookieConfig, CryptoConfig, RotationConfig, SessionConfig, XsrfConfig,
};
