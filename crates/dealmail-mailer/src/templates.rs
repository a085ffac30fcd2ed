// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Locale to provider template resolution.

use std::collections::BTreeMap;

use dealmail_config::model::MailConfig;
use dealmail_core::DealmailError;

/// Provider template ids per template key and language.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    default_language: String,
    languages: Vec<String>,
    templates: BTreeMap<String, BTreeMap<String, String>>,
}

impl TemplateCatalog {
    pub fn new(
        default_language: impl Into<String>,
        languages: Vec<String>,
        templates: BTreeMap<String, BTreeMap<String, String>>,
    ) -> Self {
        Self {
            default_language: default_language.into(),
            languages: languages.into_iter().map(|l| l.to_lowercase()).collect(),
            templates,
        }
    }

    pub fn from_config(config: &MailConfig) -> Self {
        Self::new(
            config.default_language.clone(),
            config.languages.clone(),
            config.templates.clone(),
        )
    }

    /// Map a free-form locale to one of the configured languages.
    ///
    /// `sv` and `sv-FI` both resolve to `sv`; anything unrecognized, and a
    /// missing locale, resolves to the default language.
    pub fn language_for<'a>(&'a self, locale: Option<&str>) -> &'a str {
        let Some(locale) = locale.map(|l| l.trim().to_lowercase()) else {
            return &self.default_language;
        };

        self.languages
            .iter()
            .find(|lang| **lang == locale)
            .or_else(|| {
                self.languages.iter().find(|lang| {
                    locale
                        .strip_prefix(lang.as_str())
                        .is_some_and(|rest| rest.starts_with('-'))
                })
            })
            .map(String::as_str)
            .unwrap_or(&self.default_language)
    }

    /// Provider template id for `template_key` in the language of `locale`.
    pub fn resolve(&self, template_key: &str, locale: Option<&str>) -> Result<&str, DealmailError> {
        let language = self.language_for(locale);
        self.templates
            .get(template_key)
            .and_then(|by_language| by_language.get(language))
            .map(String::as_str)
            .ok_or_else(|| DealmailError::Template {
                template_key: template_key.to_string(),
                locale: locale.unwrap_or_default().to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> TemplateCatalog {
        let mut templates = BTreeMap::new();
        templates.insert(
            "yearlyDeal".to_string(),
            BTreeMap::from([
                ("fi".to_string(), "d-fi".to_string()),
                ("en".to_string(), "d-en".to_string()),
                ("sv".to_string(), "d-sv".to_string()),
            ]),
        );
        templates.insert(
            "finnishOnly".to_string(),
            BTreeMap::from([("fi".to_string(), "d-fi-only".to_string())]),
        );
        TemplateCatalog::new(
            "en",
            vec!["fi".into(), "en".into(), "sv".into()],
            templates,
        )
    }

    #[test]
    fn exact_language_matches() {
        assert_eq!(catalog().resolve("yearlyDeal", Some("sv")).unwrap(), "d-sv");
    }

    #[test]
    fn regional_locale_matches_base_language() {
        let catalog = catalog();
        assert_eq!(catalog.resolve("yearlyDeal", Some("fi-FI")).unwrap(), "d-fi");
        assert_eq!(catalog.resolve("yearlyDeal", Some(" SV-fi ")).unwrap(), "d-sv");
    }

    #[test]
    fn unknown_or_missing_locale_uses_default() {
        let catalog = catalog();
        assert_eq!(catalog.resolve("yearlyDeal", Some("de-DE")).unwrap(), "d-en");
        assert_eq!(catalog.resolve("yearlyDeal", None).unwrap(), "d-en");
        assert_eq!(catalog.language_for(Some("fil")), "en");
    }

    #[test]
    fn missing_template_id_is_an_error() {
        let err = catalog().resolve("finnishOnly", Some("en-GB")).unwrap_err();
        assert!(matches!(err, DealmailError::Template { .. }));
        assert!(catalog().resolve("unknownKey", Some("fi")).is_err());
    }
}
