//! Optional translation of feature names.
//!
//! A [`Translator`] never fails: when the service is unreachable or answers
//! with garbage it hands back the original text.

use std::future::Future;

/// Translate text into a target language, falling back to the input.
pub trait Translator: Send + Sync {
    fn translate(&self, text: &str, target_language: &str) -> impl Future<Output = String> + Send;
}

/// Translator that returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTranslation;

impl Translator for NoTranslation {
    async fn translate(&self, text: &str, _target_language: &str) -> String {
        text.to_string()
    }
}

/// `"<name> (<translation>)"` when the translation adds something, otherwise
/// the name untouched.
pub fn decorate_name(name: &str, translated: &str) -> String {
    let translated = translated.trim();
    if translated.is_empty() || translated == name {
        name.to_string()
    } else {
        format!("{} ({})", name, translated)
    }
}
