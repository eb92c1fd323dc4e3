use serde::{Deserialize, Serialize};

/// A named content area of the page, backed by its own CMS resources.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Hero,
    Events,
    Agenda,
    Gallery,
    Shop,
    Community,
    Contacts,
    Rules,
    SiteConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// One record at a fixed well-known path.
    Singleton,
    /// Many records, listed by a manifest or a hardcoded fallback list.
    Collection,
}

impl Section {
    pub const ALL: [Section; 9] = [
        Section::Hero,
        Section::Events,
        Section::Agenda,
        Section::Gallery,
        Section::Shop,
        Section::Community,
        Section::Contacts,
        Section::Rules,
        Section::SiteConfig,
    ];

    /// Stable key, also the content directory name on the CMS side.
    pub fn key(&self) -> &'static str {
        match self {
            Section::Hero => "hero",
            Section::Events => "eventos",
            Section::Agenda => "agenda",
            Section::Gallery => "galeria",
            Section::Shop => "loja",
            Section::Community => "comunidade",
            Section::Contacts => "contactos",
            Section::Rules => "regras",
            Section::SiteConfig => "config",
        }
    }

    pub fn kind(&self) -> SectionKind {
        match self {
            Section::Events | Section::Agenda | Section::Gallery | Section::Shop => {
                SectionKind::Collection
            }
            _ => SectionKind::Singleton,
        }
    }

    /// Well-known path of the single record for singleton sections.
    pub fn singleton_path(&self) -> Option<String> {
        match self.kind() {
            SectionKind::Singleton => {
                let key = self.key();
                Some(format!("content/{key}/{key}.json"))
            }
            SectionKind::Collection => None,
        }
    }

    /// Path of the index manifest listing this collection's files.
    pub fn manifest_path(&self) -> String {
        format!("content/{}/.index.json", self.key())
    }

    /// The agenda may ship as one aggregate resource with embedded sub-records.
    pub fn aggregate_path(&self) -> Option<&'static str> {
        match self {
            Section::Agenda => Some("content/agenda/agenda.json"),
            _ => None,
        }
    }

    /// Hardcoded source list used when the manifest is unavailable.
    /// The manifest, when present, fully replaces this list.
    pub fn fallback_sources(&self) -> Vec<String> {
        let files: &[&str] = match self {
            Section::Events => &["evento-1.json", "evento-2.json", "evento-3.json"],
            Section::Agenda => &[
                "agenda-fevereiro.json",
                "agenda-marco.json",
                "agenda-abril.json",
                "agenda-ano.json",
            ],
            Section::Gallery => &[
                "galeria-1.json",
                "galeria-2.json",
                "galeria-3.json",
                "galeria-4.json",
            ],
            Section::Shop => &[
                "produto-1.json",
                "produto-2.json",
                "produto-3.json",
                "produto-4.json",
                "produto-5.json",
                "produto-6.json",
            ],
            _ => &[],
        };
        files
            .iter()
            .map(|f| format!("content/{}/{f}", self.key()))
            .collect()
    }

    /// Default `order` value when a record carries none.
    pub fn default_order(&self) -> i64 {
        match self {
            Section::Gallery => 999,
            _ => 0,
        }
    }

    /// Field gating a record's visibility in this collection.
    pub fn published_field(&self) -> &'static str {
        match self {
            Section::Shop => "available",
            _ => "published",
        }
    }
}
