//! Fluent localization: the process-wide language loader and the `fl!` macro.

use anyhow::Context;
use i18n_embed::{
    fluent::{fluent_language_loader, FluentLanguageLoader},
    unic_langid::LanguageIdentifier,
    DefaultLocalizer, LanguageLoader, Localizer,
};
use once_cell::sync::Lazy;
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "i18n/"]
struct Localizations;

pub static LANGUAGE_LOADER: Lazy<FluentLanguageLoader> = Lazy::new(|| {
    let loader: FluentLanguageLoader = fluent_language_loader!();

    loader
        .load_fallback_language(&Localizations)
        .expect("Error while loading fallback language");

    loader
});

#[macro_export]
macro_rules! fl {
    ($message_id:literal) => {{
        i18n_embed_fl::fl!($crate::core::i18n::LANGUAGE_LOADER, $message_id)
    }};

    ($message_id:literal, $($args:expr),*) => {{
        i18n_embed_fl::fl!($crate::core::i18n::LANGUAGE_LOADER, $message_id, $($args), *)
    }};
}

pub fn localizer() -> Box<dyn Localizer> {
    Box::from(DefaultLocalizer::new(&*LANGUAGE_LOADER, &Localizations))
}

/// Select the desktop environment's requested languages. Called once at startup.
pub fn localize() {
    let localizer = localizer();
    let requested_languages = i18n_embed::DesktopLanguageRequester::requested_languages();

    if let Err(error) = localizer.select(&requested_languages) {
        log::error!("error while loading fluent localizations: {error}");
    }
}

/// Switch the active language. The change applies to the global loader
/// synchronously, so every `fl!` lookup after this call resolves in the new
/// language. Returns the language that was actually selected, which may be the
/// fallback when `code` has no translation.
pub fn apply_language(code: &str) -> anyhow::Result<String> {
    let requested: LanguageIdentifier = code
        .parse()
        .with_context(|| format!("invalid language identifier {code:?}"))?;

    let applied = i18n_embed::select(&*LANGUAGE_LOADER, &Localizations, &[requested])?;

    Ok(applied
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| LANGUAGE_LOADER.fallback_language().to_string()))
}

pub fn current_language() -> String {
    LANGUAGE_LOADER.current_language().to_string()
}

/// Languages shipped with the application, fallback first.
pub fn available_languages() -> Vec<String> {
    let mut languages: Vec<String> = LANGUAGE_LOADER
        .available_languages(&Localizations)
        .unwrap_or_default()
        .iter()
        .map(ToString::to_string)
        .collect();
    languages.sort();

    let fallback = LANGUAGE_LOADER.fallback_language().to_string();
    if let Some(position) = languages.iter().position(|lang| *lang == fallback) {
        languages.remove(position);
    }
    languages.insert(0, fallback);
    languages
}

/// Human readable label for a locale code, used by the settings dropdown.
pub fn language_label(code: &str) -> String {
    match code {
        "en" => "English".to_string(),
        "ja" => "日本語".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_language_rejects_garbage() {
        assert!(apply_language("not a locale !!").is_err());
    }

    #[test]
    fn fallback_language_listed_first() {
        let languages = available_languages();
        assert_eq!(languages.first().map(String::as_str), Some("en"));
        assert!(languages.iter().any(|lang| lang == "ja"));
    }

    #[test]
    fn applying_known_language_reports_it() {
        let applied = apply_language("ja").unwrap();
        assert_eq!(applied, "ja");
        assert_eq!(current_language(), "ja");

        let applied = apply_language("en").unwrap();
        assert_eq!(applied, "en");
    }
}
