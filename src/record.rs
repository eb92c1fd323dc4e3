use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

use crate::section::Section;

/// One parsed content item. Field sets are free-form on the CMS side, so
/// records stay as JSON objects with typed accessors on top.
pub type Record = Map<String, Value>;

/// The loaded value of one section.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SectionData {
    Singleton(Option<Record>),
    Collection(Vec<Record>),
}

impl SectionData {
    pub fn is_empty(&self) -> bool {
        match self {
            SectionData::Singleton(record) => record.is_none(),
            SectionData::Collection(records) => records.is_empty(),
        }
    }
}

pub fn str_field<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}

/// Visibility flag for a collection record. Defaults to true when absent.
pub fn is_visible(record: &Record, section: Section) -> bool {
    record
        .get(section.published_field())
        .and_then(Value::as_bool)
        .unwrap_or(true)
}

pub fn order_of(record: &Record, default: i64) -> i64 {
    record.get("order").and_then(Value::as_i64).unwrap_or(default)
}

pub fn date_of(record: &Record) -> Option<NaiveDate> {
    str_field(record, "date").and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

fn display_name(record: &Record) -> &str {
    str_field(record, "title")
        .or_else(|| str_field(record, "name"))
        .unwrap_or("")
}

/// Derives a stable id from a display name: transliterated to ASCII,
/// lowercased, non-alphanumerics collapsed to single hyphens, trimmed.
pub fn slug_from_name(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.to_lowercase().chars() {
        let Some(ascii) = deunicode::deunicode_char(c) else {
            pending_hyphen = true;
            continue;
        };

        // One character can transliterate to several ("œ" becomes "oe").
        for a in ascii.chars() {
            if a.is_ascii_alphanumeric() {
                if pending_hyphen && !slug.is_empty() {
                    slug.push('-');
                }
                pending_hyphen = false;
                slug.push(a.to_ascii_lowercase());
            } else {
                pending_hyphen = true;
            }
        }
    }

    slug
}

/// Normalizes one gallery record in place: ensures an id and flattens the
/// photo list to plain strings.
pub fn normalize_gallery_item(record: &mut Record) {
    ensure_gallery_id(record);
    let photos = normalized_photos(record);
    record.insert("fotos".to_string(), Value::Array(photos.into_iter().map(Value::String).collect()));
}

fn ensure_gallery_id(record: &mut Record) {
    if str_field(record, "id").map(str::trim).is_some_and(|id| !id.is_empty()) {
        return;
    }

    let name = str_field(record, "title")
        .or_else(|| str_field(record, "name"))
        .or_else(|| str_field(record, "slug"))
        .unwrap_or("");

    let slug = slug_from_name(name);
    let id = match slug.is_empty() {
        // Synthetic id when there is nothing to derive from.
        true => format!("galeria-{}", order_of(record, Section::Gallery.default_order())),
        false => slug,
    };

    record.insert("id".to_string(), Value::String(id));
}

/// Photo entries arrive either as plain strings or as wrapper objects with a
/// `foto`/`image` member. Without an explicit list, the primary image becomes
/// a one-element list.
pub fn normalized_photos(record: &Record) -> Vec<String> {
    let list = record.get("fotos").or_else(|| record.get("photos"));

    if let Some(Value::Array(entries)) = list {
        let photos: Vec<String> = entries
            .iter()
            .filter_map(|entry| match entry {
                Value::String(url) => Some(url.clone()),
                Value::Object(wrapper) => wrapper
                    .get("foto")
                    .or_else(|| wrapper.get("image"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            })
            .collect();

        if !photos.is_empty() {
            return photos;
        }
    }

    match str_field(record, "image") {
        Some(image) => vec![image.to_string()],
        None => vec![],
    }
}

/// Gallery ordering: newest date first (missing dates sort as oldest), then
/// ascending `order`, then case-insensitive name.
pub fn gallery_cmp(a: &Record, b: &Record) -> Ordering {
    let date_a = date_of(a).unwrap_or(NaiveDate::MIN);
    let date_b = date_of(b).unwrap_or(NaiveDate::MIN);

    date_b
        .cmp(&date_a)
        .then_with(|| {
            let default = Section::Gallery.default_order();
            order_of(a, default).cmp(&order_of(b, default))
        })
        .then_with(|| {
            display_name(a)
                .to_lowercase()
                .cmp(&display_name(b).to_lowercase())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().expect("test record must be an object").clone()
    }

    #[test]
    fn test_slug_strips_accents_and_collapses_punctuation() {
        assert_eq!(slug_from_name("Évora – Março"), "evora-marco");
        assert_eq!(slug_from_name("  Clássicos & Café!  "), "classicos-cafe");
    }

    #[test]
    fn test_slug_transliterates_beyond_latin() {
        assert_eq!(slug_from_name("Œuvre d'été"), "oeuvre-d-ete");
        assert_eq!(slug_from_name("Страда"), "strada");
    }

    #[test]
    fn test_slug_is_idempotent() {
        let once = slug_from_name("Sintra Clássicos Festival");
        let twice = slug_from_name(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_gallery_id_derived_from_title() {
        let mut item = record(json!({ "title": "Passeio à Serra" }));
        normalize_gallery_item(&mut item);
        assert_eq!(str_field(&item, "id"), Some("passeio-a-serra"));
    }

    #[test]
    fn test_gallery_id_synthetic_fallback() {
        let mut item = record(json!({ "order": 3 }));
        normalize_gallery_item(&mut item);
        assert_eq!(str_field(&item, "id"), Some("galeria-3"));
    }

    #[test]
    fn test_photos_flattened_from_wrapper_objects() {
        let item = record(json!({
            "fotos": ["a.jpg", { "foto": "b.jpg" }, { "image": "c.jpg" }, 42]
        }));
        assert_eq!(normalized_photos(&item), vec!["a.jpg", "b.jpg", "c.jpg"]);
    }

    #[test]
    fn test_photos_fall_back_to_primary_image() {
        let item = record(json!({ "image": "capa.jpg" }));
        assert_eq!(normalized_photos(&item), vec!["capa.jpg"]);
    }

    #[test]
    fn test_gallery_sort_date_then_order_then_name() {
        let mut items = vec![
            record(json!({ "title": "b", "date": "2024-03-01", "order": 2 })),
            record(json!({ "title": "a", "date": "2024-03-01", "order": 1 })),
            record(json!({ "title": "c", "date": "2024-01-01", "order": 5 })),
        ];
        items.sort_by(gallery_cmp);

        let orders: Vec<i64> = items.iter().map(|i| order_of(i, 999)).collect();
        assert_eq!(orders, vec![1, 2, 5]);
    }

    #[test]
    fn test_gallery_sort_missing_date_is_oldest() {
        let mut items = vec![
            record(json!({ "title": "sem data" })),
            record(json!({ "title": "com data", "date": "2023-06-01" })),
        ];
        items.sort_by(gallery_cmp);
        assert_eq!(str_field(&items[0], "title"), Some("com data"));
    }

    #[test]
    fn test_visibility_defaults_to_true() {
        let item = record(json!({ "title": "X" }));
        assert!(is_visible(&item, Section::Events));

        let hidden = record(json!({ "title": "X", "published": false }));
        assert!(!is_visible(&hidden, Section::Events));

        let sold_out = record(json!({ "title": "X", "available": false }));
        assert!(!is_visible(&sold_out, Section::Shop));
    }
}
