//! Issue template catalog.
//!
//! Reads `.github/ISSUE_TEMPLATE` and parses both YAML issue forms and
//! legacy Markdown templates with a front-matter header. Single bad files
//! are skipped, never fatal. Results are cached per repository coordinate
//! for the life of the process.

use super::GithubClient;
use crate::data::Template;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::Mutex;

const TEMPLATE_DIR: &str = ".github/ISSUE_TEMPLATE";

/// Session cache keyed by `owner/repo`. Injected by the composition root
/// instead of living in ambient global state; invalidated only by restart.
#[derive(Debug, Default)]
pub struct TemplateCache {
    inner: Mutex<HashMap<String, Vec<Template>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached catalog for `coordinate`, or run `load` and cache
    /// its result. A cache hit makes no network call; load errors are not
    /// cached.
    pub async fn get_or_load<F, Fut>(&self, coordinate: &str, load: F) -> Result<Vec<Template>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Template>>>,
    {
        let mut guard = self.inner.lock().await;
        if let Some(hit) = guard.get(coordinate) {
            return Ok(hit.clone());
        }
        let templates = load().await?;
        guard.insert(coordinate.to_string(), templates.clone());
        Ok(templates)
    }
}

/// Fetch and parse the template directory, sorted by display name.
/// A missing directory is an empty catalog, not an error.
pub async fn load_templates(client: &GithubClient) -> Result<Vec<Template>> {
    let Some(entries) = client.list_directory(TEMPLATE_DIR).await? else {
        tracing::info!(
            "Template directory {} not found in {}",
            TEMPLATE_DIR,
            client.coordinate()
        );
        return Ok(Vec::new());
    };

    let mut templates = Vec::new();
    for entry in entries.iter().filter(|e| e.is_file()) {
        let lower = entry.name.to_lowercase();
        if !(lower.ends_with(".yml") || lower.ends_with(".yaml") || lower.ends_with(".md")) {
            continue;
        }
        let text = match client
            .file_content(&format!("{}/{}", TEMPLATE_DIR, entry.name))
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("Skipping template {}: {}", entry.name, e);
                continue;
            }
        };
        match parse_template(&entry.name, &text) {
            Ok(template) => templates.push(template),
            Err(e) => tracing::debug!("Skipping template {}: {}", entry.name, e),
        }
    }

    if templates.is_empty() {
        tracing::info!("No usable template files in {}", client.coordinate());
    }

    sort_templates(&mut templates);
    Ok(templates)
}

/// Case-insensitive ordering by display name.
pub fn sort_templates(templates: &mut [Template]) {
    templates.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
}

/// Front-matter / issue-form metadata. YAML forms use `name`/`description`,
/// legacy Markdown headers variously use `name`/`title` and
/// `about`/`description`; unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct TemplateMeta {
    name: Option<String>,
    title: Option<String>,
    about: Option<String>,
    description: Option<String>,
}

/// Parse a single template file by extension.
pub fn parse_template(filename: &str, text: &str) -> Result<Template> {
    let lower = filename.to_lowercase();
    if lower.ends_with(".yml") || lower.ends_with(".yaml") {
        let meta: TemplateMeta =
            serde_yaml::from_str(text).context("invalid YAML issue form")?;
        Ok(Template {
            name: meta
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| filename.to_string()),
            about: meta.description.or(meta.about),
            body: None,
            filename: filename.to_string(),
        })
    } else if lower.ends_with(".md") {
        parse_markdown_template(filename, text)
    } else {
        anyhow::bail!("unsupported template extension: {}", filename)
    }
}

fn parse_markdown_template(filename: &str, text: &str) -> Result<Template> {
    let stem = &filename[..filename.len() - ".md".len()];

    let Some((block, body)) = split_front_matter(text) else {
        // No header at all: the whole file is the body, named after the stem.
        return Ok(Template {
            name: stem.to_string(),
            about: None,
            body: Some(text.to_string()),
            filename: filename.to_string(),
        });
    };

    let meta: TemplateMeta = serde_yaml::from_str(block).context("invalid front-matter")?;
    Ok(Template {
        name: meta
            .name
            .or(meta.title)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| stem.to_string()),
        about: meta.about.or(meta.description),
        body: Some(body.to_string()),
        filename: filename.to_string(),
    })
}

/// Split `---` delimited front-matter off the top of a Markdown document.
fn split_front_matter(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix("---\n")?;
    let end = rest.find("\n---\n")?;
    Some((&rest[..end], &rest[end + "\n---\n".len()..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn yaml_form_with_name_and_description() {
        let t = parse_template(
            "bug.yml",
            "name: Bug Report\ndescription: File a bug\nbody:\n  - type: markdown\n",
        )
        .unwrap();
        assert_eq!(t.name, "Bug Report");
        assert_eq!(t.about.as_deref(), Some("File a bug"));
        assert_eq!(t.body, None);
    }

    #[test]
    fn yaml_form_falls_back_to_filename() {
        let t = parse_template("demo.yaml", "description: A demo\n").unwrap();
        assert_eq!(t.name, "demo.yaml");
    }

    #[test]
    fn yaml_form_empty_name_falls_back_to_filename() {
        let t = parse_template("demo.yml", "name: \"\"\ndescription: A demo\n").unwrap();
        assert_eq!(t.name, "demo.yml");
    }

    #[test]
    fn markdown_with_front_matter() {
        let text = "---\nname: Feature\nabout: Ask for things\n---\n## Details\n";
        let t = parse_template("feature.md", text).unwrap();
        assert_eq!(t.name, "Feature");
        assert_eq!(t.about.as_deref(), Some("Ask for things"));
        assert_eq!(t.body.as_deref(), Some("## Details\n"));
    }

    #[test]
    fn markdown_title_key_works_too() {
        let text = "---\ntitle: Spike\ndescription: Investigate\n---\nbody\n";
        let t = parse_template("spike.md", text).unwrap();
        assert_eq!(t.name, "Spike");
        assert_eq!(t.about.as_deref(), Some("Investigate"));
    }

    #[test]
    fn markdown_without_front_matter_uses_stem() {
        let t = parse_template("plain.md", "just a body\n").unwrap();
        assert_eq!(t.name, "plain");
        assert_eq!(t.body.as_deref(), Some("just a body\n"));
    }

    #[test]
    fn malformed_front_matter_is_an_error() {
        let text = "---\nname: [unterminated\n---\nbody\n";
        assert!(parse_template("broken.md", text).is_err());
    }

    #[test]
    fn malformed_yaml_form_is_an_error() {
        assert!(parse_template("broken.yml", "name: [unterminated\n").is_err());
    }

    #[test]
    fn sorts_case_insensitively() {
        let mut templates = vec![
            Template {
                name: "zeta".into(),
                about: None,
                body: None,
                filename: "z.yml".into(),
            },
            Template {
                name: "Alpha".into(),
                about: None,
                body: None,
                filename: "a.yml".into(),
            },
        ];
        sort_templates(&mut templates);
        assert_eq!(templates[0].name, "Alpha");
    }
}
