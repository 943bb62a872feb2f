//! # Secrets
//!
//! Secret handling building blocks: the redacting [`SecretString`] wrapper
//! that carries key material through configuration, and the
//! [`SecretTemplateCompiler`] that fills generator placeholders with fresh
//! randomness when a secret is created without caller-supplied content.

pub mod template;
pub mod types;

pub use template::SecretTemplateCompiler;
pub use types::SecretString;
