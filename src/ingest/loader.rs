//! Document loading from local files, directories, and URLs.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::LoadError;
use crate::models::{Document, IngestionConfig, Source, SourceKind};
use crate::utils::{has_meaningful_content, is_text_file, read_file_content};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Resolves a source into one or more documents.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, source: &Source) -> Result<Vec<Document>, LoadError>;
}

/// Default loader: local text files, directory walks, and HTTP(S) URLs.
pub struct DocumentLoader {
    client: reqwest::Client,
    exclude_patterns: Vec<String>,
    max_file_size: u64,
}

impl DocumentLoader {
    pub fn new(config: &IngestionConfig) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| LoadError::FetchError {
                url: String::new(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            exclude_patterns: config.exclude_patterns.clone(),
            max_file_size: config.max_file_size,
        })
    }

    /// Collect indexable file paths, expanding directories.
    fn collect_files(&self, root: &Path) -> Result<Vec<PathBuf>, LoadError> {
        if root.is_file() {
            return Ok(vec![root.to_path_buf()]);
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry.map_err(|e| LoadError::WalkError(e.to_string()))?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            let path_str = path.to_string_lossy();
            let excluded = self.exclude_patterns.iter().any(|pattern| {
                glob::Pattern::new(pattern)
                    .map(|p| p.matches(&path_str))
                    .unwrap_or(false)
            });

            if !excluded && is_text_file(path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    fn read_document(&self, path: &Path) -> Result<Document, LoadError> {
        let content = read_file_content(path, self.max_file_size)
            .map_err(|e| LoadError::FileReadError(format!("{}: {}", path.display(), e)))?;

        if !has_meaningful_content(&content) {
            return Err(LoadError::EmptyDocument(path.display().to_string()));
        }

        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string());

        Ok(Document::new(
            Source::file(path.to_string_lossy()),
            content,
            title,
        ))
    }

    async fn load_url(&self, url: &str) -> Result<Document, LoadError> {
        tracing::debug!(url, "fetching url");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| LoadError::FetchError {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let body = response.text().await.map_err(|e| LoadError::FetchError {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let (content, title) = extract_text(&body);

        if !has_meaningful_content(&content) {
            return Err(LoadError::EmptyDocument(url.to_string()));
        }

        Ok(Document::new(Source::url(url), content, title))
    }
}

#[async_trait]
impl Loader for DocumentLoader {
    async fn load(&self, source: &Source) -> Result<Vec<Document>, LoadError> {
        match source.kind {
            SourceKind::File => {
                let root = Path::new(&source.location);
                if !root.exists() {
                    return Err(LoadError::UnsupportedSource(format!(
                        "path does not exist: {}",
                        source.location
                    )));
                }

                let files = self.collect_files(root)?;
                tracing::debug!(path = %source.location, count = files.len(), "collected files");

                let mut documents = Vec::with_capacity(files.len());
                for path in files {
                    match self.read_document(&path) {
                        Ok(doc) => documents.push(doc),
                        Err(LoadError::EmptyDocument(_)) => {
                            tracing::debug!(path = %path.display(), "skipping empty file");
                        }
                        Err(e) => return Err(e),
                    }
                }

                if documents.is_empty() {
                    return Err(LoadError::EmptyDocument(source.location.clone()));
                }
                Ok(documents)
            }
            SourceKind::Url => Ok(vec![self.load_url(&source.location).await?]),
        }
    }
}

/// Extract readable text and a title from an HTML page.
///
/// Prefers `<article>` then `<main>` over `<body>` to skip site chrome, and
/// drops script/style/nav/header/footer/aside subtrees outright.
fn extract_text(html: &str) -> (String, Option<String>) {
    let document = Html::parse_document(html);

    let title = select_first_text(&document, "title")
        .or_else(|| select_first_text(&document, "h1"))
        .filter(|t| !t.is_empty());

    let root_selectors = ["article", "main", "body"];
    for css in root_selectors {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        if let Some(root) = document.select(&selector).next() {
            let text = collect_text(root);
            if !text.trim().is_empty() {
                return (text, title);
            }
        }
    }

    (String::new(), title)
}

fn select_first_text(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

const BOILERPLATE_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "noscript", "form",
];

fn collect_text(root: scraper::ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text_into(root, &mut out);

    // Collapse runs of blank lines left behind by dropped elements
    let mut lines: Vec<&str> = Vec::new();
    let mut blank = false;
    for line in out.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !blank && !lines.is_empty() {
                lines.push("");
            }
            blank = true;
        } else {
            lines.push(trimmed);
            blank = false;
        }
    }
    lines.join("\n")
}

fn collect_text_into(element: scraper::ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if BOILERPLATE_TAGS.contains(&name) {
        return;
    }

    let block = matches!(
        name,
        "p" | "div"
            | "section"
            | "article"
            | "main"
            | "body"
            | "li"
            | "br"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "pre"
            | "blockquote"
            | "tr"
    );
    if block {
        out.push('\n');
    }
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_element) = scraper::ElementRef::wrap(child) {
            collect_text_into(child_element, out);
        }
    }
    if block {
        out.push('\n');
    }
}
