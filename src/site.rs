//! The loaded site: every post compiled, every template registered.
//!
//! A [`Site`] is built once per build (or per reload in `serve`) and then
//! only read. It is the single context object page loaders receive.

use crate::assets;
use crate::config::Config;
use crate::highlight::{HighlightError, Highlighter};
use crate::i18n::Translations;
use crate::models::Language;
use crate::parser;
use crate::posts::{self, LoadError, Post, PostIndex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tera::Tera;
use thiserror::Error;

const POST_TEMPLATE_PREFIX: &str = "__posts/";

#[derive(Error, Debug)]
pub enum SiteError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("Highlighter error: {0}")]
    Highlight(#[from] HighlightError),
    #[error("Tera Error: {0}")]
    Template(#[from] tera::Error),
    #[error("Tera Error ({path}): {source}")]
    PostTemplate {
        path: PathBuf,
        #[source]
        source: tera::Error,
    },
}

pub struct Site {
    pub config: Config,
    pub posts: Vec<Post>,
    pub index: PostIndex,
    pub translations: Arc<Translations>,
    pub tera: Tera,
    post_templates: Vec<String>,
}

/// Project templates layered over the built-in ones, plus the `t()` function.
pub fn init_tera(templates_dir: &Path, translations: Arc<Translations>) -> Result<Tera, SiteError> {
    let mut tera = Tera::default();
    tera.add_raw_templates(assets::default_templates())?;

    // same-named project files replace the built-in templates
    if templates_dir.is_dir() {
        let files: Vec<(PathBuf, Option<String>)> = walkdir::WalkDir::new(templates_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().map(|s| s == "html").unwrap_or(false))
            .filter_map(|e| {
                let name = e.path().strip_prefix(templates_dir).ok()?;
                let name = name.to_string_lossy().replace('\\', "/");
                Some((e.path().to_path_buf(), Some(name)))
            })
            .collect();
        tera.add_template_files(files)?;
    }

    tera.register_function(
        "t",
        move |args: &HashMap<String, tera::Value>| -> tera::Result<tera::Value> {
            let key = args
                .get("key")
                .and_then(|v| v.as_str())
                .ok_or_else(|| tera::Error::msg("t() requires a `key` argument"))?;
            let lang = args
                .get("lang")
                .and_then(|v| v.as_str())
                .and_then(|l| l.parse::<Language>().ok())
                .unwrap_or(Language::DEFAULT);
            Ok(tera::Value::String(translations.resolve(key, lang)))
        },
    );
    Ok(tera)
}

impl Site {
    /// Loads posts, compiles their bodies (highlighting code on the way), and
    /// registers everything with Tera.
    pub async fn load(config: Config, highlighter: &Highlighter) -> Result<Site, SiteError> {
        let posts = posts::load_all(&config.posts_dir)?;
        let translations =
            Arc::new(Translations::builtin().with_overrides(&config.i18n_dir));
        let mut tera = init_tera(&config.templates_dir, Arc::clone(&translations))?;

        let highlighter = config.build.use_syntect.then_some(highlighter);
        let mut post_templates = Vec::with_capacity(posts.len());
        for post in &posts {
            let source = parser::compile_post(&post.body, highlighter).await?;
            let name = format!("{}{}.html", POST_TEMPLATE_PREFIX, post_stem(post));
            tera.add_raw_template(&name, &source)
                .map_err(|source| SiteError::PostTemplate {
                    path: post.source.clone(),
                    source,
                })?;
            post_templates.push(name);
        }

        let index = PostIndex::build(&posts);
        Ok(Site {
            config,
            posts,
            index,
            translations,
            tera,
            post_templates,
        })
    }

    /// Name of the compiled body template for the post at `i`.
    pub fn post_template(&self, i: usize) -> &str {
        &self.post_templates[i]
    }

    /// Post variant for a `lang` reader, with the language it is shown in.
    pub fn find_post(&self, slug: &str, lang: Language) -> Option<(&Post, &str, Language)> {
        let (i, resolved) = self.index.lookup(slug, lang)?;
        Some((&self.posts[i], self.post_template(i), resolved))
    }
}

fn post_stem(post: &Post) -> String {
    match post.variant {
        Some(lang) => format!("{}.{}", post.slug, lang),
        None => post.slug.clone(),
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::highlight::HighlightSettings;

    #[tokio::test]
    async fn loads_and_compiles_every_post() {
        let tmp = tempfile::tempdir().unwrap();
        let config = project(tmp.path());
        let highlighter = Highlighter::new(HighlightSettings::from(&config.build));
        let site = Site::load(config, &highlighter).await.unwrap();

        assert_eq!(site.posts.len(), 4);
        assert_eq!(site.posts[0].slug, "borshch");
        assert_eq!(highlighter.constructions(), 1);

        let (post, template, lang) = site.find_post("hello", Language::Ua).unwrap();
        assert_eq!(post.title, "Привіт");
        assert_eq!(template, "__posts/hello.ua.html");
        assert_eq!(lang, Language::Ua);

        let (legacy, _, lang) = site.find_post("legacy", Language::Ua).unwrap();
        assert_eq!(legacy.title, "Legacy");
        assert_eq!(lang, Language::En);
        assert!(site.find_post("nope", Language::En).is_none());
    }

    #[tokio::test]
    async fn duplicate_post_metadata_and_body_agree() {
        let tmp = tempfile::tempdir().unwrap();
        let config = project(tmp.path());
        write_post(&config.posts_dir, "dup.en.md", "First", "2024-01-01", &[], "BODY-FIRST");
        write_post(&config.posts_dir, "dup.EN.md", "Second", "2024-02-01", &[], "BODY-SECOND");
        let highlighter = Highlighter::new(HighlightSettings::from(&config.build));
        let site = Site::load(config, &highlighter).await.unwrap();

        let (post, template, _) = site.find_post("dup", Language::En).unwrap();
        let body = site.tera.render(template, &tera::Context::new()).unwrap();
        // "dup.EN.md" sorts before "dup.en.md"
        assert_eq!(post.title, "Second");
        assert!(body.contains("BODY-SECOND"));
        assert_eq!(site.posts.iter().filter(|p| p.slug == "dup").count(), 1);
    }

    #[tokio::test]
    async fn project_templates_override_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = project(tmp.path());
        std::fs::create_dir_all(&config.templates_dir).unwrap();
        std::fs::write(config.templates_dir.join("404.html"), "custom {{ message }}").unwrap();

        let tera = init_tera(&config.templates_dir, Arc::new(Translations::builtin())).unwrap();
        let mut ctx = tera::Context::new();
        ctx.insert("message", "gone");
        assert_eq!(tera.render("404.html", &ctx).unwrap(), "custom gone");
        assert!(tera.get_template_names().any(|t| t == "post.html"));
    }

    #[test]
    fn t_function_resolves_with_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        let mut tera = init_tera(&tmp.path().join("none"), Arc::new(Translations::builtin())).unwrap();
        tera.add_raw_template(
            "t.html",
            r#"{{ t(key="nav.home", lang="ua") }}|{{ t(key="made.up.key", lang="ua") }}|{{ t(key="nav.home") }}"#,
        )
        .unwrap();
        let out = tera.render("t.html", &tera::Context::new()).unwrap();
        assert_eq!(out, "Головна|made.up.key|Home");
    }

    #[tokio::test]
    async fn malformed_post_fails_the_whole_site() {
        let tmp = tempfile::tempdir().unwrap();
        let config = project(tmp.path());
        std::fs::write(
            config.posts_dir.join("broken.en.md"),
            "---\ntitle: Broken\ndate: 2024-01-01\ntags: []\nreading-time: 1 min\n---\nbody",
        )
        .unwrap();
        let highlighter = Highlighter::new(HighlightSettings::from(&config.build));
        let err = Site::load(config, &highlighter).await.err().unwrap();
        assert!(matches!(err, SiteError::Load(_)));
    }
}
