pub mod gallery;

use std::fs;
use std::path::PathBuf;
use tracing::{debug, error, instrument};

use crate::record::{str_field, Record, SectionData};
use crate::section::Section;

pub const EVENT_IMAGE_PLACEHOLDER: &str = "img/MESFEVEREIROW123.jpeg";
pub const PRODUCT_IMAGE_PLACEHOLDER: &str = "img/stickers.png";
pub const GALLERY_IMAGE_PLACEHOLDER: &str = "img/preview.png";

/// All record fields are untrusted text and get escaped at render time.
/// Fields land in both text and quoted-attribute positions, so the full
/// safe set is encoded.
pub fn escape_html(input: &str) -> String {
    html_escape::encode_safe(input).into_owned()
}

fn field_or<'a>(record: &'a Record, field: &str, fallback: &'a str) -> String {
    escape_html(str_field(record, field).unwrap_or(fallback))
}

/// Projects loaded section values onto HTML fragments, one file per section
/// under the output directory. Idempotent: each render fully replaces the
/// previous fragment.
#[derive(Debug)]
pub struct SectionRenderer {
    out_dir: PathBuf,
}

impl SectionRenderer {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Renders and writes one section. Empty data is a no-op, and a failed
    /// write is logged rather than propagated so other sections continue.
    #[instrument(skip(self, data), fields(section = section.key()))]
    pub fn render(&self, section: Section, data: &SectionData) {
        let Some(html) = render_fragment(section, data) else {
            debug!("no content, skipping render");
            return;
        };

        if let Err(error) = fs::create_dir_all(&self.out_dir) {
            error!(%error, "could not create the output directory");
            return;
        }

        let path = self.out_dir.join(format!("{}.html", section.key()));
        if let Err(error) = fs::write(&path, html) {
            error!(%error, path = %path.display(), "could not write section fragment");
        }
    }
}

/// Pure fragment rendering. Returns `None` for empty data and for the
/// site-config section, which only feeds the message-template side channel.
pub fn render_fragment(section: Section, data: &SectionData) -> Option<String> {
    if data.is_empty() {
        return None;
    }

    match (section, data) {
        (Section::SiteConfig, _) => None,
        (Section::Hero, SectionData::Singleton(Some(record))) => Some(hero(record)),
        (Section::Community, SectionData::Singleton(Some(record))) => Some(community(record)),
        (Section::Contacts, SectionData::Singleton(Some(record))) => Some(contacts(record)),
        (Section::Rules, SectionData::Singleton(Some(record))) => Some(rules(record)),
        (Section::Events, SectionData::Collection(records)) => {
            Some(records.iter().map(event_card).collect())
        }
        (Section::Agenda, SectionData::Collection(records)) => {
            Some(records.iter().map(agenda_row).collect())
        }
        (Section::Shop, SectionData::Collection(records)) => {
            Some(records.iter().map(product_card).collect())
        }
        (Section::Gallery, SectionData::Collection(records)) => {
            Some(records.iter().map(gallery::gallery_item).collect())
        }
        _ => None,
    }
}

// Singleton slots keep a placeholder default per slot: an absent field falls
// back instead of blanking existing content.

fn hero(record: &Record) -> String {
    let subtitle = field_or(record, "subtitle", "A comunidade de clássicos de Sintra");
    let button1_text = field_or(record, "button1Text", "Próximos eventos");
    let button1_link = field_or(record, "button1Link", "#proximos-eventos");
    let button2_text = field_or(record, "button2Text", "Comunidade");
    let button2_link = field_or(record, "button2Link", "#comunidade");

    format!(
        r#"<p class="hero-subtitle">{subtitle}</p>
<a class="btn btn-gradient" href="{button1_link}">{button1_text}</a>
<a class="btn btn-ghost" href="{button2_link}">{button2_text}</a>
"#
    )
}

fn community(record: &Record) -> String {
    let title = field_or(record, "title", "Comunidade");
    let description = field_or(record, "description", "");
    let owners_title = field_or(record, "forOwnersTitle", "Para proprietários");
    let owners_text = field_or(record, "forOwnersText", "");
    let enthusiasts_title = field_or(record, "forEnthusiastsTitle", "Para entusiastas");
    let enthusiasts_text = field_or(record, "forEnthusiastsText", "");
    let suggestion_title = field_or(record, "suggestionTitle", "Tens uma sugestão?");
    let suggestion_text = field_or(record, "suggestionText", "");

    format!(
        r#"<h2 class="section-heading">{title}</h2>
<p class="text-secondary">{description}</p>
<div class="community-pill"><h3>{owners_title}</h3><p>{owners_text}</p></div>
<div class="community-pill"><h3>{enthusiasts_title}</h3><p>{enthusiasts_text}</p></div>
<div class="glass-card"><h3>{suggestion_title}</h3><p class="text-secondary small">{suggestion_text}</p></div>
"#
    )
}

fn contacts(record: &Record) -> String {
    let title = field_or(record, "title", "Contactos");
    let description = field_or(record, "description", "");
    let email = field_or(record, "email", "sintraclassicos14@gmail.com");
    let instagram = field_or(record, "instagramUrl", "#");
    let facebook = field_or(record, "facebookUrl", "#");

    // Benefits arrive either as plain strings or as { benefit } wrappers.
    let benefits: String = record
        .get("benefits")
        .and_then(|v| v.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    entry
                        .as_str()
                        .or_else(|| entry.get("benefit").and_then(|b| b.as_str()))
                })
                .map(|benefit| format!("<li>{}</li>\n", escape_html(benefit)))
                .collect()
        })
        .unwrap_or_default();

    format!(
        r#"<h2 class="section-heading">{title}</h2>
<p class="text-secondary">{description}</p>
<ul>
{benefits}</ul>
<p class="text-muted-75">{email}</p>
<a href="{instagram}">Instagram</a>
<a href="{facebook}">Facebook</a>
"#
    )
}

fn rules(record: &Record) -> String {
    let title = field_or(record, "title", "Regras da comunidade");
    let description = field_or(record, "description", "");

    let items: String = record
        .get("rules")
        .and_then(|v| v.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    entry
                        .as_str()
                        .or_else(|| entry.get("rule").and_then(|r| r.as_str()))
                })
                .map(|rule| format!("<li>{}</li>\n", escape_html(rule)))
                .collect()
        })
        .unwrap_or_default();

    format!(
        r#"<h2 class="section-heading">{title}</h2>
<p class="text-secondary">{description}</p>
<ol>
{items}</ol>
"#
    )
}

fn event_card(record: &Record) -> String {
    let title = field_or(record, "title", "");
    let image = field_or(record, "image", EVENT_IMAGE_PLACEHOLDER);
    let location = field_or(record, "location", "Data e localização");
    let price = field_or(record, "price", "Gratuito");
    let description = field_or(record, "description", "");

    let details: String = ["startTime", "endTime", "limit"]
        .iter()
        .filter_map(|field| str_field(record, field))
        .map(|value| format!("<li>{}</li>", escape_html(value)))
        .collect();

    format!(
        r#"<div class="col-md-6 col-lg-4">
  <article class="event-card h-100 d-flex flex-column">
    <img src="{image}" class="w-100" alt="{title}" />
    <div class="p-3 p-md-4 d-flex flex-column flex-grow-1">
      <div class="d-flex justify-content-between align-items-center mb-2 small text-secondary">
        <span>{location}</span>
        <span class="badge-soft text-success">{price}</span>
      </div>
      <h3 class="h5 mb-2">{title}</h3>
      <p class="text-secondary small mb-3 flex-grow-1">{description}</p>
      <ul class="small text-secondary mb-3 ps-3">{details}</ul>
      <button class="btn btn-outline-info btn-sm mt-auto w-100" data-event="{title}">Quero participar</button>
    </div>
  </article>
</div>
"#
    )
}

fn agenda_row(record: &Record) -> String {
    let month = str_field(record, "month")
        .map(|m| format!(r#"<div class="badge-soft text-secondary mb-1">{}</div>"#, escape_html(m)))
        .unwrap_or_default();
    let title = str_field(record, "title")
        .map(|t| format!(r#"<h3 class="h6 text-light mb-1">{}</h3>"#, escape_html(t)))
        .unwrap_or_default();
    let kind = str_field(record, "type")
        .map(|t| format!(r#"<span class="small text-info">{}</span>"#, escape_html(t)))
        .unwrap_or_default();
    let description = field_or(record, "description", "");

    format!(
        r#"<div class="d-flex gap-3">
  <div class="d-none d-md-flex flex-column align-items-center pt-1"><div class="timeline-dot"></div></div>
  <div class="flex-grow-1">
    {month}
    {title}
    <p class="text-secondary small mb-1">{description}</p>
    {kind}
  </div>
</div>
"#
    )
}

fn product_card(record: &Record) -> String {
    let title = field_or(record, "title", "");
    let image = field_or(record, "image", PRODUCT_IMAGE_PLACEHOLDER);
    let description = field_or(record, "description", "");
    let price = field_or(record, "price", "");

    format!(
        r#"<div class="col-md-6 col-lg-4">
  <article class="product-card h-100 d-flex flex-column">
    <div class="product-media position-relative">
      <img src="{image}" class="w-100 product-img" alt="{title}">
      <div class="product-badge">Loja Oficial</div>
    </div>
    <div class="p-3 p-md-4 d-flex flex-column flex-grow-1">
      <h3 class="h5 mb-1">{title}</h3>
      <div class="small text-secondary mb-2">Disponível nos nossos eventos</div>
      <p class="text-secondary small mb-3 flex-grow-1">{description}</p>
      <div class="d-flex justify-content-between align-items-center mt-auto">
        <div class="price fw-bold">{price}</div>
        <button class="btn btn-outline-info btn-sm mt-auto" data-product="{title}">Requisitar no evento</button>
      </div>
    </div>
  </article>
</div>
"#
    )
}
