//! Secret content templates.
//!
//! When a secret is created without caller-supplied content, its content
//! comes from a template: literal text plus generator sections of the form
//! `{{#alphanumeric}}20{{/alphanumeric}}`. Each section is replaced with
//! freshly drawn randomness of the requested length; everything else passes
//! through verbatim.
//!
//! A template that would produce output containing no randomness at all is
//! rejected, because such a "secret" would be a constant.

use once_cell::sync::Lazy;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use regex::Regex;

use crate::errors::{Error, Result};

/// Minimum generated secret length
pub const MIN_SECRET_LENGTH: i64 = 10;
/// Maximum generated secret length
pub const MAX_SECRET_LENGTH: i64 = 4096;

static GENERATOR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{#([a-z0-9]+)\}\}([^{}]*)\{\{/([a-z0-9]+)\}\}")
        .expect("GENERATOR_PATTERN should be a valid regex pattern")
});

/// Expands generator sections in secret templates.
///
/// Stateless and freely shareable: every call draws from the operating
/// system RNG and tracks nothing across calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretTemplateCompiler {
    rng: OsRng,
}

impl SecretTemplateCompiler {
    pub fn new() -> Self {
        Self { rng: OsRng }
    }

    /// Compile a template into secret content.
    ///
    /// Fails on mismatched or unknown sections, section lengths outside
    /// [`MIN_SECRET_LENGTH`]..=[`MAX_SECRET_LENGTH`], stray `{{`/`}}`
    /// delimiters outside a recognized section, and templates in which no
    /// generator fired.
    pub fn compile(&self, template: &str) -> Result<String> {
        let mut rng = self.rng;
        let mut generated = false;
        let mut output = String::with_capacity(template.len());
        let mut cursor = 0usize;

        for captures in GENERATOR_PATTERN.captures_iter(template) {
            let section = match captures.get(0) {
                Some(section) => section,
                None => continue,
            };
            let literal = &template[cursor..section.start()];
            check_literal(literal)?;
            output.push_str(literal);

            let open = &captures[1];
            let close = &captures[3];
            if open != close {
                return Err(Error::invalid_argument(format!(
                    "mismatched template section: '{}' closed by '{}'",
                    open, close
                )));
            }
            let length = section_length(&captures[2])?;

            match open {
                "alphanumeric" => {
                    for _ in 0..length {
                        output.push(char::from(rng.sample(Alphanumeric)));
                    }
                }
                "hexadecimal" => {
                    // Draw whole bytes, then truncate odd lengths.
                    let mut bytes = vec![0u8; (length + 1) / 2];
                    rng.fill_bytes(&mut bytes);
                    let mut encoded = hex::encode(bytes);
                    encoded.truncate(length);
                    output.push_str(&encoded);
                }
                "numeric" => {
                    for _ in 0..length {
                        output.push(char::from(b'0' + rng.gen_range(0..10u8)));
                    }
                }
                other => {
                    return Err(Error::invalid_argument(format!(
                        "unknown secret generator '{}'",
                        other
                    )));
                }
            }
            generated = true;
            cursor = section.end();
        }

        let tail = &template[cursor..];
        check_literal(tail)?;
        output.push_str(tail);

        if !generated {
            return Err(Error::invalid_argument(
                "template must contain at least one secret generator",
            ));
        }
        Ok(output)
    }
}

/// Literal chunks may contain single braces (JSON templates do) but never
/// the `{{`/`}}` delimiters, which always mean a broken section.
fn check_literal(chunk: &str) -> Result<()> {
    if chunk.contains("{{") || chunk.contains("}}") {
        return Err(Error::invalid_argument("template contains malformed section delimiters"));
    }
    Ok(())
}

fn section_length(body: &str) -> Result<usize> {
    let length: i64 = body
        .parse()
        .map_err(|_| Error::invalid_argument(format!("secret length is not a number: '{}'", body)))?;
    if !(MIN_SECRET_LENGTH..=MAX_SECRET_LENGTH).contains(&length) {
        return Err(Error::invalid_argument(format!(
            "secret length must be between {} and {}, got {}",
            MIN_SECRET_LENGTH, MAX_SECRET_LENGTH, length
        )));
    }
    Ok(length as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn compiler() -> SecretTemplateCompiler {
        SecretTemplateCompiler::new()
    }

    #[test]
    fn test_alphanumeric_section() {
        let out = compiler().compile("{{#alphanumeric}}20{{/alphanumeric}}").unwrap();
        assert_eq!(out.len(), 20);
        assert!(out.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_numeric_section() {
        let out = compiler().compile("{{#numeric}}12{{/numeric}}").unwrap();
        assert_eq!(out.len(), 12);
        assert!(out.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_hexadecimal_section_even_and_odd() {
        let even = compiler().compile("{{#hexadecimal}}16{{/hexadecimal}}").unwrap();
        assert_eq!(even.len(), 16);
        assert!(even.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let odd = compiler().compile("{{#hexadecimal}}11{{/hexadecimal}}").unwrap();
        assert_eq!(odd.len(), 11);
    }

    #[test]
    fn test_literals_pass_through() {
        let out = compiler()
            .compile("user=app;password={{#alphanumeric}}10{{/alphanumeric}};ssl=true")
            .unwrap();
        assert!(out.starts_with("user=app;password="));
        assert!(out.ends_with(";ssl=true"));
        assert_eq!(out.len(), "user=app;password=".len() + 10 + ";ssl=true".len());
    }

    #[test]
    fn test_single_braces_are_legal_literals() {
        let out = compiler()
            .compile("{\"password\": \"{{#alphanumeric}}16{{/alphanumeric}}\"}")
            .unwrap();
        assert!(out.starts_with("{\"password\": \""));
        assert!(out.ends_with("\"}"));
    }

    #[test]
    fn test_multiple_sections_draw_independently() {
        let out = compiler()
            .compile("{{#hexadecimal}}32{{/hexadecimal}}:{{#hexadecimal}}32{{/hexadecimal}}")
            .unwrap();
        let (left, right) = out.split_once(':').unwrap();
        assert_eq!(left.len(), 32);
        assert_eq!(right.len(), 32);
        assert_ne!(left, right);
    }

    #[test]
    fn test_output_is_fresh_per_call() {
        let compiler = compiler();
        let a = compiler.compile("{{#alphanumeric}}32{{/alphanumeric}}").unwrap();
        let b = compiler.compile("{{#alphanumeric}}32{{/alphanumeric}}").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_length_bounds() {
        assert!(compiler().compile("{{#numeric}}10{{/numeric}}").is_ok());
        assert!(compiler().compile("{{#numeric}}4096{{/numeric}}").is_ok());

        let err = compiler().compile("{{#numeric}}9{{/numeric}}").unwrap_err();
        assert!(err.to_string().contains("between 10 and 4096, got 9"));

        let err = compiler().compile("{{#numeric}}4097{{/numeric}}").unwrap_err();
        assert!(err.to_string().contains("got 4097"));

        let err = compiler().compile("{{#numeric}}-5{{/numeric}}").unwrap_err();
        assert!(err.to_string().contains("got -5"));
    }

    #[test]
    fn test_non_numeric_length() {
        let err = compiler().compile("{{#numeric}}plenty{{/numeric}}").unwrap_err();
        assert!(err.to_string().contains("not a number: 'plenty'"));

        let err = compiler().compile("{{#numeric}}{{/numeric}}").unwrap_err();
        assert!(err.to_string().contains("not a number"));
    }

    #[test]
    fn test_mismatched_sections() {
        let err = compiler().compile("{{#alphanumeric}}20{{/numeric}}").unwrap_err();
        assert!(err.to_string().contains("mismatched"));
    }

    #[test]
    fn test_unknown_generator() {
        let err = compiler().compile("{{#base64}}20{{/base64}}").unwrap_err();
        assert!(err.to_string().contains("unknown secret generator 'base64'"));
    }

    #[test]
    fn test_stray_delimiters() {
        for template in [
            "password: {{#alphanumeric}}",
            "{{#alphanumeric}}20{{/alphanumeric}} }} trailing",
            "leading {{ {{#numeric}}10{{/numeric}}",
            "{{}}",
        ] {
            let err = compiler().compile(template).unwrap_err();
            assert!(err.to_string().contains("malformed"), "template {:?}: {}", template, err);
        }
    }

    #[test]
    fn test_template_without_generator_is_rejected() {
        let err = compiler().compile("hunter2").unwrap_err();
        assert!(err.to_string().contains("at least one secret generator"));

        let err = compiler().compile("").unwrap_err();
        assert!(err.to_string().contains("at least one secret generator"));
    }

    proptest! {
        #[test]
        fn prop_generated_length_is_exact(len in 10i64..=128) {
            for generator in ["alphanumeric", "hexadecimal", "numeric"] {
                let template = format!("{{{{#{gen}}}}}{len}{{{{/{gen}}}}}", gen = generator, len = len);
                let out = compiler().compile(&template).unwrap();
                prop_assert_eq!(out.len() as i64, len);
            }
        }
    }
}
