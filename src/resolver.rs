//! Turns a sparse, entry-keyed payload into one complete string map per locale.
//!
//! For every entry and every supported locale (the [`BASE_LOCALE`] placeholder excluded),
//! the first rule that yields text wins:
//!
//! 1. exact locale match in the entry's values
//! 2. a short-form locale (`en`) borrows a long form with the same primary subtag
//!    (`en-US`); both partitions then receive the text and `en` is recorded as an
//!    alias of `en-US`
//! 3. the locale is the fallback locale's own short/long form: use the fallback text
//! 4. the entry has no value for any supported locale: use the fallback text
//!
//! Anything else is left as a gap. Lookups fall through the selector chain for gaps.
//!
//! [`BASE_LOCALE`]: crate::types::BASE_LOCALE

use std::collections::{
    BTreeMap,
    BTreeSet,
    HashMap,
};

use crate::input::{
    Entry,
    TranslationPayload,
};
use crate::types::LocaleId;

/// Resolved strings of one payload, partitioned by locale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTable {
    partitions: BTreeMap<LocaleId, HashMap<String, String>>,
    /// short form -> long form it borrowed text from
    aliases: BTreeMap<LocaleId, LocaleId>,
}

impl ResolvedTable {
    /// Locales that have a partition, in sorted order.
    pub fn locales(&self) -> impl Iterator<Item = &LocaleId> {
        self.partitions.keys()
    }

    /// Every partition with its string map.
    pub fn partitions(&self) -> impl Iterator<Item = (&LocaleId, &HashMap<String, String>)> {
        self.partitions.iter()
    }

    /// String map of one locale.
    #[must_use]
    pub fn strings(&self, locale: &str) -> Option<&HashMap<String, String>> {
        self.partitions.get(locale)
    }

    /// Text of `id` in `locale`.
    #[must_use]
    pub fn get(&self, locale: &str, id: &str) -> Option<&str> {
        self.strings(locale).and_then(|strings| strings.get(id)).map(String::as_str)
    }

    #[must_use]
    pub const fn aliases(&self) -> &BTreeMap<LocaleId, LocaleId> {
        &self.aliases
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.partitions.values().all(HashMap::is_empty)
    }

    fn insert(&mut self, locale: &LocaleId, id: &str, text: &str) {
        self.partitions
            .entry(locale.clone())
            .or_default()
            .insert(id.to_string(), text.to_string());
    }
}

/// Which rule produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source<'a> {
    Exact(&'a str),
    LongForm { locale: &'a str, text: &'a str },
    Fallback(&'a str),
}

/// Resolves `payload` using its own declared fallback locale.
#[must_use]
pub fn resolve(payload: &TranslationPayload, supported_locales: &[LocaleId]) -> ResolvedTable {
    let fallback = LocaleId::parse(&payload.fallback_locale).ok();
    resolve_with_fallback(payload, fallback.as_ref(), supported_locales)
}

/// Resolves `payload` against `supported_locales` with an explicit fallback locale.
///
/// Every supported locale receives a partition, even if it stays empty.
/// Duplicate entry ids are resolved last-write-wins.
#[must_use]
pub fn resolve_with_fallback(
    payload: &TranslationPayload,
    fallback: Option<&LocaleId>,
    supported_locales: &[LocaleId],
) -> ResolvedTable {
    let locales: BTreeSet<&LocaleId> =
        supported_locales.iter().filter(|locale| !locale.is_base()).collect();

    let mut table = ResolvedTable::default();
    for locale in &locales {
        table.partitions.entry((*locale).clone()).or_default();
    }

    for entry in &payload.entries {
        let covered = locales.iter().any(|locale| entry.values_by_locale.contains_key(locale.as_str()));

        for locale in &locales {
            match pick(entry, locale, fallback, covered) {
                Some(Source::Exact(text) | Source::Fallback(text)) => {
                    table.insert(locale, &entry.id, text);
                }
                Some(Source::LongForm { locale: long, text }) => {
                    // Parsed during validation; unparsable codes never match the short form.
                    let Ok(long) = LocaleId::parse(long) else {
                        continue;
                    };
                    table.insert(locale, &entry.id, text);
                    table.insert(&long, &entry.id, text);
                    table.aliases.insert((*locale).clone(), long);
                }
                None => {
                    tracing::debug!(id = %entry.id, locale = %locale, "No text resolvable");
                }
            }
        }
    }

    tracing::debug!(
        locales = table.partitions.len(),
        aliases = table.aliases.len(),
        "Resolved translation payload"
    );
    table
}

fn pick<'a>(
    entry: &'a Entry,
    locale: &LocaleId,
    fallback: Option<&LocaleId>,
    covered: bool,
) -> Option<Source<'a>> {
    let values = &entry.values_by_locale;

    if let Some(text) = values.get(locale.as_str()) {
        return Some(Source::Exact(text));
    }

    if locale.is_short_form() {
        if let Some((code, text)) = long_form_match(entry, locale) {
            return Some(Source::LongForm { locale: code, text });
        }
    }

    let fallback = fallback?;
    let fallback_text = values.get(fallback.as_str())?;

    let is_fallback_form = locale == fallback
        || (locale.same_language(fallback) && (locale.is_short_form() || fallback.is_short_form()));
    if is_fallback_form || !covered {
        return Some(Source::Fallback(fallback_text));
    }

    None
}

/// Long-form value sharing `locale`'s primary subtag; the smallest code wins for determinism.
fn long_form_match<'a>(entry: &'a Entry, locale: &LocaleId) -> Option<(&'a str, &'a str)> {
    entry
        .values_by_locale
        .iter()
        .filter(|(code, _)| {
            LocaleId::parse(code)
                .is_ok_and(|candidate| !candidate.is_short_form() && candidate.same_language(locale))
        })
        .min_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(code, text)| (code.as_str(), text.as_str()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn locales(codes: &[&str]) -> Vec<LocaleId> {
        codes.iter().map(|code| LocaleId::parse(code).unwrap()).collect()
    }

    fn entry(id: &str, values: &[(&str, &str)]) -> Entry {
        Entry::new(id, values.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())))
    }

    fn payload(fallback: &str, entries: Vec<Entry>) -> TranslationPayload {
        TranslationPayload { version: "1".to_string(), fallback_locale: fallback.to_string(), entries }
    }

    #[googletest::test]
    fn fallback_fills_foreign_entry() {
        let payload = payload("de-DE", vec![entry("Greeting", &[("de-DE", "Hallo")])]);

        let table = resolve(&payload, &locales(&["de", "en"]));

        expect_that!(table.get("de", "Greeting"), some(eq("Hallo")));
        expect_that!(table.get("en", "Greeting"), some(eq("Hallo")));
    }

    #[googletest::test]
    fn short_form_borrows_long_form_and_registers_alias() {
        let payload = payload("de-DE", vec![entry("Title", &[("en-US", "Tour"), ("de-DE", "Rundgang")])]);

        let table = resolve(&payload, &locales(&["en", "de"]));

        expect_that!(table.get("en", "Title"), some(eq("Tour")));
        expect_that!(table.get("en-US", "Title"), some(eq("Tour")));
        expect_that!(table.get("de", "Title"), some(eq("Rundgang")));
        expect_that!(table.get("de-DE", "Title"), some(eq("Rundgang")));
        expect_that!(
            table.aliases().get(&LocaleId::parse("en").unwrap()).map(LocaleId::as_str),
            some(eq("en-US"))
        );
    }

    #[googletest::test]
    fn exact_match_wins_over_long_form() {
        let payload = payload("de", vec![entry("Title", &[("en", "Short"), ("en-US", "Long")])]);

        let table = resolve(&payload, &locales(&["en"]));

        expect_that!(table.get("en", "Title"), some(eq("Short")));
        expect_that!(table.strings("en-US"), none());
        expect_that!(table.aliases().is_empty(), eq(true));
    }

    #[googletest::test]
    fn covered_entry_leaves_gap_for_other_locales() {
        let payload = payload("de", vec![entry("Only", &[("de", "Nur"), ("fr", "Seulement")])]);

        let table = resolve(&payload, &locales(&["de", "fr", "it"]));

        expect_that!(table.get("de", "Only"), some(eq("Nur")));
        expect_that!(table.get("fr", "Only"), some(eq("Seulement")));
        expect_that!(table.get("it", "Only"), none());
        expect_that!(table.strings("it"), some(anything()));
    }

    #[rstest]
    #[case::short_of_long_fallback("de", "de-DE")]
    #[case::long_of_short_fallback("de-DE", "de")]
    #[case::same("de-DE", "de-DE")]
    fn fallback_locale_forms_use_fallback_text(#[case] supported: &str, #[case] fallback: &str) {
        let payload = payload(
            fallback,
            vec![entry("Id", &[(fallback, "Fallback"), ("en", "English")])],
        );

        let table = resolve(&payload, &locales(&[supported, "en"]));

        assert_that!(table.get(supported, "Id"), some(eq("Fallback")));
    }

    #[googletest::test]
    fn missing_fallback_text_leaves_gap() {
        let payload = payload("fr", vec![entry("Id", &[("ja", "Hai")])]);

        let table = resolve(&payload, &locales(&["de", "en"]));

        expect_that!(table.get("de", "Id"), none());
        expect_that!(table.get("en", "Id"), none());
        expect_that!(table.locales().count(), eq(2));
        expect_that!(table.is_empty(), eq(true));
    }

    #[googletest::test]
    fn base_locale_is_excluded() {
        let payload = payload("de", vec![entry("Id", &[("de", "Text")])]);

        let table = resolve(&payload, &locales(&["Base", "de"]));

        expect_that!(table.strings("Base"), none());
        expect_that!(table.locales().map(LocaleId::as_str).collect::<Vec<_>>(), elements_are![eq(&"de")]);
    }

    #[googletest::test]
    fn duplicate_ids_last_write_wins() {
        let payload = payload(
            "de",
            vec![entry("Id", &[("de", "First")]), entry("Id", &[("de", "Second")])],
        );

        let table = resolve(&payload, &locales(&["de"]));

        expect_that!(table.get("de", "Id"), some(eq("Second")));
    }

    #[googletest::test]
    fn later_long_form_alias_overwrites_short_partition() {
        let payload = payload(
            "de",
            vec![entry("Id", &[("en", "Short")]), entry("Id", &[("en-GB", "Long")])],
        );

        let table = resolve(&payload, &locales(&["en"]));

        expect_that!(table.get("en", "Id"), some(eq("Long")));
        expect_that!(table.get("en-GB", "Id"), some(eq("Long")));
    }

    #[googletest::test]
    fn several_long_forms_pick_smallest_code() {
        let payload = payload("de", vec![entry("Id", &[("en-US", "Color"), ("en-GB", "Colour")])]);

        let table = resolve(&payload, &locales(&["en"]));

        expect_that!(table.get("en", "Id"), some(eq("Colour")));
        expect_that!(table.strings("en-US"), none());
    }

    #[googletest::test]
    fn explicit_fallback_overrides_payload() {
        let payload = payload("", vec![entry("Id", &[("de", "Text")])]);
        let fallback = LocaleId::parse("de").unwrap();

        let without = resolve(&payload, &locales(&["en"]));
        let with = resolve_with_fallback(&payload, Some(&fallback), &locales(&["en"]));

        expect_that!(without.get("en", "Id"), none());
        expect_that!(with.get("en", "Id"), some(eq("Text")));
    }

    #[googletest::test]
    fn empty_supported_set_yields_empty_table() {
        let payload = payload("de", vec![entry("Id", &[("de", "Text")])]);

        let table = resolve(&payload, &[]);

        expect_that!(table.locales().count(), eq(0));
    }
}
