//! Meme template catalog and template reference resolution.

use std::path::{Path, PathBuf};

use roastbot_core::ContentType;
use serde::{Deserialize, Serialize};

use crate::render::MemeError;

/// Which content types a template suits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Roast,
    Compliment,
    Both,
}

impl TemplateKind {
    pub fn suits(self, content_type: ContentType) -> bool {
        matches!(
            (self, content_type),
            (Self::Both, _)
                | (Self::Roast, ContentType::Roast)
                | (Self::Compliment, ContentType::Compliment)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStyle {
    Funny,
    Serious,
    Classic,
    Modern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateTheme {
    Reaction,
    Classic,
    Modern,
    Custom,
}

/// A catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct MemeTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub filename: &'static str,
    #[serde(rename = "type")]
    pub kind: TemplateKind,
    pub style: TemplateStyle,
    pub theme: TemplateTheme,
    pub tags: &'static [&'static str],
    pub description: &'static str,
}

/// Built-in templates.
pub static CATALOG: &[MemeTemplate] = &[
    MemeTemplate {
        id: "skeptical",
        name: "Skeptical Kid",
        filename: "skeptical-kid.png",
        kind: TemplateKind::Roast,
        style: TemplateStyle::Funny,
        theme: TemplateTheme::Reaction,
        tags: &["doubt", "disbelief", "side-eye"],
        description: "Perfect for sarcastic responses",
    },
    MemeTemplate {
        id: "success-kid",
        name: "Success Kid",
        filename: "success-kid.png",
        kind: TemplateKind::Compliment,
        style: TemplateStyle::Classic,
        theme: TemplateTheme::Classic,
        tags: &["victory", "achievement", "proud"],
        description: "Celebrate those wins!",
    },
    MemeTemplate {
        id: "drake",
        name: "Drake Hotline Bling",
        filename: "drake.png",
        kind: TemplateKind::Both,
        style: TemplateStyle::Modern,
        theme: TemplateTheme::Reaction,
        tags: &["comparison", "preference", "choice"],
        description: "Compare and contrast with style",
    },
    MemeTemplate {
        id: "doge",
        name: "Doge",
        filename: "doge.png",
        kind: TemplateKind::Compliment,
        style: TemplateStyle::Funny,
        theme: TemplateTheme::Classic,
        tags: &["wholesome", "cute", "animal"],
        description: "The iconic Shiba Inu for wholesome content",
    },
    MemeTemplate {
        id: "distracted",
        name: "Distracted Boyfriend",
        filename: "distracted-boyfriend.png",
        kind: TemplateKind::Roast,
        style: TemplateStyle::Funny,
        theme: TemplateTheme::Reaction,
        tags: &["classic", "relationships", "choices"],
        description: "Perfect for pointing out flaws or distractions",
    },
    MemeTemplate {
        id: "disaster-girl",
        name: "Disaster Girl",
        filename: "disaster-girl.png",
        kind: TemplateKind::Roast,
        style: TemplateStyle::Serious,
        theme: TemplateTheme::Reaction,
        tags: &["chaos", "sarcastic", "classic"],
        description: "For when things are going terribly wrong",
    },
    MemeTemplate {
        id: "wholesome",
        name: "Wholesome Seal",
        filename: "wholesome-seal.png",
        kind: TemplateKind::Compliment,
        style: TemplateStyle::Funny,
        theme: TemplateTheme::Classic,
        tags: &["wholesome", "cute", "animal"],
        description: "For extra wholesome compliments",
    },
];

/// Catalog query. Every field is optional; unset fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateQuery {
    #[serde(rename = "type")]
    pub content_type: Option<ContentType>,
    pub search: Option<String>,
    pub style: Option<TemplateStyle>,
    pub theme: Option<TemplateTheme>,
}

impl TemplateQuery {
    fn matches(&self, template: &MemeTemplate) -> bool {
        if self
            .content_type
            .is_some_and(|content_type| !template.kind.suits(content_type))
            || self.style.is_some_and(|style| style != template.style)
            || self.theme.is_some_and(|theme| theme != template.theme)
        {
            return false;
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(search) => {
                let needle = search.to_lowercase();
                template.name.to_lowercase().contains(&needle)
                    || template.tags.iter().any(|t| t.to_lowercase().contains(&needle))
                    || template.description.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

/// Catalog entries matching `query`, in catalog order.
pub fn filter(query: &TemplateQuery) -> Vec<&'static MemeTemplate> {
    CATALOG.iter().filter(|t| query.matches(t)).collect()
}

/// Templates usable for a content type, including `both` entries.
pub fn for_type(content_type: ContentType) -> Vec<&'static MemeTemplate> {
    filter(&TemplateQuery {
        content_type: Some(content_type),
        ..TemplateQuery::default()
    })
}

pub fn find(id: &str) -> Option<&'static MemeTemplate> {
    CATALOG.iter().find(|t| t.id == id)
}

/// Where a template reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateLocation {
    File(PathBuf),
    Remote(String),
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Template images on disk, plus the policy for remote references.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
    allow_remote: bool,
}

impl TemplateStore {
    pub fn new(dir: impl Into<PathBuf>, allow_remote: bool) -> Self {
        Self {
            dir: dir.into(),
            allow_remote,
        }
    }

    /// Write an uploaded template into the template directory.
    pub async fn save(&self, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        if !is_safe_filename(filename) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("unsafe template file name {filename:?}"),
            ));
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(filename);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Fallback template for a content type.
    pub fn default_path(&self, content_type: ContentType) -> PathBuf {
        self.dir.join(default_filename(content_type))
    }

    /// Resolve a template reference.
    ///
    /// Accepts a catalog id, a bare image file name inside the template
    /// directory, or (when enabled) an `http(s)` URL.
    pub fn resolve(&self, reference: &str) -> Result<TemplateLocation, MemeError> {
        let reference = reference.trim();

        if let Some(template) = find(reference) {
            return Ok(TemplateLocation::File(self.dir.join(template.filename)));
        }

        if is_safe_filename(reference) {
            return Ok(TemplateLocation::File(self.dir.join(reference)));
        }

        if reference.starts_with("https://") || reference.starts_with("http://") {
            if self.allow_remote {
                return Ok(TemplateLocation::Remote(reference.to_string()));
            }
            return Err(MemeError::ImageLoad {
                source_kind: "template",
                reason: "remote templates are disabled".to_string(),
            });
        }

        Err(MemeError::ImageLoad {
            source_kind: "template",
            reason: format!("unknown template {reference:?}"),
        })
    }
}

pub fn default_filename(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Roast => "roast-template.png",
        ContentType::Compliment => "compliment-template.png",
    }
}

/// A single path component made of `[A-Za-z0-9._-]` with an image extension.
fn is_safe_filename(name: &str) -> bool {
    let charset_ok = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !charset_ok || name.contains("..") {
        return false;
    }
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(templates: &[&MemeTemplate]) -> Vec<&'static str> {
        templates.iter().map(|t| t.id).collect()
    }

    #[test]
    fn for_type_includes_both() {
        assert_eq!(
            ids(&for_type(ContentType::Roast)),
            vec!["skeptical", "drake", "distracted", "disaster-girl"]
        );
        assert_eq!(
            ids(&for_type(ContentType::Compliment)),
            vec!["success-kid", "drake", "doge", "wholesome"]
        );
    }

    #[test]
    fn search_covers_name_tags_and_description() {
        let by_name = filter(&TemplateQuery {
            search: Some("DOGE".into()),
            ..Default::default()
        });
        assert_eq!(ids(&by_name), vec!["doge"]);

        let by_tag = filter(&TemplateQuery {
            search: Some("animal".into()),
            ..Default::default()
        });
        assert_eq!(ids(&by_tag), vec!["doge", "wholesome"]);

        let by_description = filter(&TemplateQuery {
            search: Some("terribly".into()),
            ..Default::default()
        });
        assert_eq!(ids(&by_description), vec!["disaster-girl"]);
    }

    #[test]
    fn style_and_theme_filters_combine() {
        let query = TemplateQuery {
            content_type: Some(ContentType::Roast),
            style: Some(TemplateStyle::Funny),
            theme: Some(TemplateTheme::Reaction),
            ..Default::default()
        };
        assert_eq!(ids(&filter(&query)), vec!["skeptical", "distracted"]);
    }

    #[test]
    fn empty_query_returns_everything() {
        assert_eq!(filter(&TemplateQuery::default()).len(), CATALOG.len());
        let blank = TemplateQuery {
            search: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(filter(&blank).len(), CATALOG.len());
    }

    #[test]
    fn catalog_ids_are_unique() {
        let mut seen = std::collections::HashSet::new();
        assert!(CATALOG.iter().all(|t| seen.insert(t.id)));
    }

    #[test]
    fn resolves_catalog_ids_and_filenames() {
        let store = TemplateStore::new("/srv/templates", false);
        assert_eq!(
            store.resolve("drake").unwrap(),
            TemplateLocation::File(PathBuf::from("/srv/templates/drake.png"))
        );
        assert_eq!(
            store.resolve("my-upload_2.PNG").unwrap(),
            TemplateLocation::File(PathBuf::from("/srv/templates/my-upload_2.PNG"))
        );
    }

    #[test]
    fn rejects_traversal_and_odd_names() {
        let store = TemplateStore::new("/srv/templates", true);
        for reference in [
            "../secret.png",
            "..png",
            "/etc/passwd",
            "dir/file.png",
            ".hidden.png",
            "notes.txt",
            "",
        ] {
            assert!(
                matches!(store.resolve(reference), Err(MemeError::ImageLoad { .. })),
                "{reference:?} should not resolve"
            );
        }
    }

    #[test]
    fn remote_templates_require_opt_in() {
        let url = "https://example.com/meme.png";
        let closed = TemplateStore::new("/srv/templates", false);
        assert!(closed.resolve(url).is_err());

        let open = TemplateStore::new("/srv/templates", true);
        assert_eq!(
            open.resolve(url).unwrap(),
            TemplateLocation::Remote(url.to_string())
        );
    }

    #[tokio::test]
    async fn saved_uploads_resolve_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::new(dir.path().join("uploads"), false);
        let path = store.save("1700000000000-my-meme.jpg", b"jpeg").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"jpeg");
        assert_eq!(
            store.resolve("1700000000000-my-meme.jpg").unwrap(),
            TemplateLocation::File(path)
        );

        let err = store.save("../escape.jpg", b"jpeg").await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }

    #[test]
    fn default_paths_follow_content_type() {
        let store = TemplateStore::new("/srv/templates", false);
        assert_eq!(
            store.default_path(ContentType::Roast),
            PathBuf::from("/srv/templates/roast-template.png")
        );
        assert_eq!(
            store.default_path(ContentType::Compliment),
            PathBuf::from("/srv/templates/compliment-template.png")
        );
    }

    #[test]
    fn every_catalog_entry_ships_with_the_crate() {
        let store = TemplateStore::new(crate::config::DEFAULT_TEMPLATES_DIR, false);
        for template in CATALOG {
            let TemplateLocation::File(path) = store.resolve(template.id).unwrap() else {
                panic!("{} should resolve to a file", template.id);
            };
            let (width, height) = image::image_dimensions(&path)
                .unwrap_or_else(|e| panic!("{}: {e}", path.display()));
            crate::render::loader::validate_dimensions(width, height).unwrap();
        }
        for content_type in ContentType::ALL {
            assert!(store.default_path(content_type).is_file());
        }
    }

    #[test]
    fn serializes_kind_as_type() {
        let json = serde_json::to_value(find("drake").unwrap()).unwrap();
        assert_eq!(json["type"], "both");
        assert_eq!(json["style"], "modern");
        assert_eq!(json["tags"][0], "comparison");
    }
}
