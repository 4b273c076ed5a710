//! Localization support for PawPal messages.

use i18n_embed::{
    fluent::{fluent_language_loader, FluentLanguageLoader},
    DefaultLocalizer, LanguageLoader, Localizer,
};
use rust_embed::RustEmbed;
use std::sync::LazyLock;

/// Embedded localization files.
#[derive(RustEmbed)]
#[folder = "i18n/"]
struct Localizations;

/// Static language loader for the messaging screens.
pub static LANGUAGE_LOADER: LazyLock<FluentLanguageLoader> = LazyLock::new(|| {
    let loader: FluentLanguageLoader = fluent_language_loader!();

    loader
        .load_fallback_language(&Localizations)
        .expect("Error while loading fallback language");

    loader
});

/// Initialize localization with the requested languages.
pub fn init(requested_languages: &[i18n_embed::unic_langid::LanguageIdentifier]) {
    if let Err(why) = localizer().select(requested_languages) {
        tracing::error!("Error while loading fluent localizations: {why}");
    }
}

#[must_use]
pub fn localizer() -> Box<dyn Localizer> {
    Box::from(DefaultLocalizer::new(&*LANGUAGE_LOADER, &Localizations))
}

/// Request a localized string by ID from the i18n/ directory.
#[macro_export]
macro_rules! fl {
    ($message_id:literal) => {{
        i18n_embed_fl::fl!($crate::i18n::LANGUAGE_LOADER, $message_id)
    }};

    ($message_id:literal, $($args:expr),*) => {{
        i18n_embed_fl::fl!($crate::i18n::LANGUAGE_LOADER, $message_id, $($args), *)
    }};
}

#[cfg(test)]
mod tests {
    use crate::fl;

    #[test]
    fn test_fallback_language_is_loaded() {
        assert_eq!(fl!("retry-hint"), "Press Enter to retry.");
        assert!(fl!("error-server", status = 503).contains("503"));
    }
}
