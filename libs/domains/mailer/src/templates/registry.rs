//! Name → template source mapping.
//!
//! The mapping is built once at startup by scanning the templates root (or
//! assembled by hand in tests). Request input is only ever used as a key, so
//! a template name can never reach the filesystem as a path.

use handlebars::Template;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::shape::{PropsBlockExtractor, ShapeExtractor, split_declaration};
use crate::error::{MailerError, MailerResult};
use crate::models::TemplateDescriptor;

/// File extensions recognized as templates.
pub const TEMPLATE_EXTENSIONS: &[&str] = &["hbs", "html"];

/// Where a template's source text comes from.
#[derive(Debug, Clone)]
pub enum TemplateSource {
    File(PathBuf),
    Inline(String),
}

impl TemplateSource {
    async fn read(&self) -> io::Result<String> {
        match self {
            TemplateSource::File(path) => tokio::fs::read_to_string(path).await,
            TemplateSource::Inline(source) => Ok(source.clone()),
        }
    }
}

/// A template that has been read, compiled, and checked for a body.
#[derive(Debug, Clone)]
pub struct LoadedTemplate {
    pub name: String,
    /// Handlebars markup following the declaration header.
    pub body: String,
    /// Declared defaults, applied before the payload.
    pub defaults: Map<String, Value>,
}

/// Resolves template names and lists the templates root.
pub struct TemplateRegistry {
    root: PathBuf,
    sources: HashMap<String, TemplateSource>,
    shape: Arc<dyn ShapeExtractor>,
}

impl TemplateRegistry {
    /// An empty registry rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sources: HashMap::new(),
            shape: Arc::new(PropsBlockExtractor),
        }
    }

    /// Builds the name → source map from the files currently in `root`.
    pub async fn scan(root: impl Into<PathBuf>) -> MailerResult<Self> {
        let mut registry = Self::new(root);
        for path in template_files(&registry.root).await? {
            if let Some(name) = template_name(&path) {
                debug!(template = %name, path = %path.display(), "Registered email template");
                registry.sources.insert(name, TemplateSource::File(path));
            }
        }
        info!(
            root = %registry.root.display(),
            count = registry.sources.len(),
            "Email templates registered"
        );
        Ok(registry)
    }

    /// Registers (or replaces) a template under `name`.
    pub fn with_source(mut self, name: impl Into<String>, source: TemplateSource) -> Self {
        self.sources.insert(name.into(), source);
        self
    }

    /// Swaps the shape extractor used for defaults and listing.
    pub fn with_shape_extractor(mut self, shape: Arc<dyn ShapeExtractor>) -> Self {
        self.shape = shape;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Resolves `name` to a loaded, renderable template.
    ///
    /// - [`MailerError::TemplateNotFound`]: no source registered under `name`
    /// - [`MailerError::TemplateLoad`]: source unreadable or fails to compile
    /// - [`MailerError::InvalidTemplate`]: compiled, but nothing to render
    pub async fn resolve(&self, name: &str) -> MailerResult<LoadedTemplate> {
        let source = self
            .sources
            .get(name)
            .ok_or_else(|| MailerError::TemplateNotFound(name.to_string()))?;

        let text = source.read().await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => MailerError::TemplateNotFound(name.to_string()),
            _ => MailerError::TemplateLoad {
                name: name.to_string(),
                reason: e.to_string(),
            },
        })?;

        let (_, body) = split_declaration(&text);

        Template::compile(body).map_err(|e| MailerError::TemplateLoad {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        if body.trim().is_empty() {
            return Err(MailerError::InvalidTemplate {
                name: name.to_string(),
                reason: "template has no body to render".to_string(),
            });
        }

        let defaults = self
            .shape
            .extract(&text)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|field| field.default.map(|value| (field.name, value)))
            .collect();

        debug!(template = %name, "Loaded email template");

        Ok(LoadedTemplate {
            name: name.to_string(),
            body: body.to_string(),
            defaults,
        })
    }

    /// Describes every template file currently in the root, in directory order.
    ///
    /// Rescans on every call. Unreadable files are skipped; an unreadable
    /// directory fails the whole listing.
    pub async fn list(&self) -> MailerResult<Vec<TemplateDescriptor>> {
        let mut descriptors = Vec::new();

        for path in template_files(&self.root).await? {
            let Some(name) = template_name(&path) else {
                continue;
            };
            let text = match tokio::fs::read_to_string(&path).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable template");
                    continue;
                }
            };
            let props = self
                .shape
                .extract(&text)
                .map(|fields| fields.iter().map(|f| f.to_prop_info()).collect());

            descriptors.push(TemplateDescriptor { name, props });
        }

        Ok(descriptors)
    }
}

async fn template_files(root: &Path) -> MailerResult<Vec<PathBuf>> {
    let listing_error = |e: io::Error| MailerError::TemplateListing(format!("{}: {}", root.display(), e));

    let mut entries = tokio::fs::read_dir(root).await.map_err(listing_error)?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(listing_error)? {
        let path = entry.path();
        let is_file = entry
            .file_type()
            .await
            .map(|ft| ft.is_file())
            .unwrap_or(false);
        if is_file && has_template_extension(&path) {
            files.push(path);
        }
    }

    Ok(files)
}

fn has_template_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext))
}

fn template_name(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    const WELCOME: &str = r#"{{!--
props WelcomeProps = {
  name: string = "there";
  ctaUrl?: string;
}
--}}
<h1>Welcome, {{name}}!</h1>"#;

    fn templates_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (file, content) in files {
            fs::write(dir.path().join(file), content).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_scan_registers_recognized_files_only() {
        let dir = templates_dir(&[
            ("WelcomeEmail.hbs", WELCOME),
            ("Receipt.html", "<p>{{total}}</p>"),
            ("notes.txt", "not a template"),
        ]);

        let registry = TemplateRegistry::scan(dir.path()).await.unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("WelcomeEmail"));
        assert!(registry.contains("Receipt"));
        assert!(!registry.contains("notes"));
    }

    #[tokio::test]
    async fn test_resolve_loads_body_and_defaults() {
        let dir = templates_dir(&[("WelcomeEmail.hbs", WELCOME)]);
        let registry = TemplateRegistry::scan(dir.path()).await.unwrap();

        let template = registry.resolve("WelcomeEmail").await.unwrap();

        assert_eq!(template.name, "WelcomeEmail");
        assert!(template.body.contains("<h1>Welcome, {{name}}!</h1>"));
        assert!(!template.body.contains("props"));
        assert_eq!(template.defaults.get("name"), Some(&json!("there")));
        assert!(!template.defaults.contains_key("ctaUrl"));
    }

    #[tokio::test]
    async fn test_resolve_unknown_name_is_not_found() {
        let registry = TemplateRegistry::new("unused");
        let err = registry.resolve("Missing").await.unwrap_err();
        assert!(matches!(err, MailerError::TemplateNotFound(name) if name == "Missing"));
    }

    #[tokio::test]
    async fn test_resolve_never_builds_paths_from_names() {
        let dir = templates_dir(&[("WelcomeEmail.hbs", WELCOME)]);
        let registry = TemplateRegistry::scan(dir.path()).await.unwrap();

        let err = registry.resolve("../WelcomeEmail").await.unwrap_err();
        assert!(matches!(err, MailerError::TemplateNotFound(_)));
    }

    #[tokio::test]
    async fn test_resolve_deleted_file_is_not_found() {
        let dir = templates_dir(&[("Gone.hbs", "<p>x</p>")]);
        let registry = TemplateRegistry::scan(dir.path()).await.unwrap();
        fs::remove_file(dir.path().join("Gone.hbs")).unwrap();

        let err = registry.resolve("Gone").await.unwrap_err();
        assert!(matches!(err, MailerError::TemplateNotFound(_)));
    }

    #[tokio::test]
    async fn test_resolve_uncompilable_template_is_load_error() {
        let registry = TemplateRegistry::new("unused").with_source(
            "Broken",
            TemplateSource::Inline("<p>{{#if ready}}never closed</p>".into()),
        );

        let err = registry.resolve("Broken").await.unwrap_err();
        assert!(matches!(err, MailerError::TemplateLoad { name, .. } if name == "Broken"));
    }

    #[tokio::test]
    async fn test_resolve_header_only_template_is_invalid() {
        let registry = TemplateRegistry::new("unused").with_source(
            "HeaderOnly",
            TemplateSource::Inline("{{!-- props P = { a: string; } --}}\n   \n".into()),
        );

        let err = registry.resolve("HeaderOnly").await.unwrap_err();
        assert!(matches!(err, MailerError::InvalidTemplate { name, .. } if name == "HeaderOnly"));
    }

    #[tokio::test]
    async fn test_list_yields_one_descriptor_per_file() {
        let dir = templates_dir(&[
            ("WelcomeEmail.hbs", WELCOME),
            ("Plain.html", "<p>no declaration</p>"),
            ("OtpEmail.hbs", "{{!-- type Otp = { otpCode: string } --}}<p>{{otpCode}}</p>"),
            ("README.md", "# ignored"),
        ]);
        let registry = TemplateRegistry::new(dir.path());

        let mut descriptors = registry.list().await.unwrap();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));

        let names: Vec<_> = descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["OtpEmail", "Plain", "WelcomeEmail"]);

        assert!(descriptors[1].props.is_none());
        let welcome_props = descriptors[2].props.as_ref().unwrap();
        assert_eq!(welcome_props.len(), 2);
        assert_eq!(welcome_props[0].name, "name");
        assert_eq!(welcome_props[0].type_hint.as_deref(), Some("string"));
        assert_eq!(welcome_props[1].name, "ctaUrl");
    }

    #[tokio::test]
    async fn test_list_picks_up_files_added_after_startup() {
        let dir = templates_dir(&[("First.hbs", "<p>1</p>")]);
        let registry = TemplateRegistry::scan(dir.path()).await.unwrap();
        fs::write(dir.path().join("Second.hbs"), "<p>2</p>").unwrap();

        assert_eq!(registry.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_skips_unreadable_files() {
        let dir = templates_dir(&[("WelcomeEmail.hbs", WELCOME)]);
        fs::write(dir.path().join("Bad.hbs"), [0xff, 0xfe, 0x00, 0xc3]).unwrap();
        let registry = TemplateRegistry::new(dir.path());

        let descriptors = registry.list().await.unwrap();

        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].name, "WelcomeEmail");
    }

    #[tokio::test]
    async fn test_list_missing_directory_is_listing_error() {
        let registry = TemplateRegistry::new("/definitely/not/a/templates/dir");
        let err = registry.list().await.unwrap_err();
        assert!(matches!(err, MailerError::TemplateListing(_)));
    }
}
