//! Page loaders: the data each page template receives, and its rendering.
//!
//! URLs are language-scoped: `/<lang>/`, `/<lang>/posts/<slug>.html`,
//! `/<lang>/tags/<tag>.html`. Both the static build and the preview server
//! render through these functions.

use crate::models::{Language, Theme};
use crate::posts::{self, Post};
use crate::site::Site;
use serde::Serialize;
use tera::Context;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("Could not find {0}")]
    NotFound(String),
    #[error("Tera Error: {0}")]
    Render(#[from] tera::Error),
}

/// Home page: the language-filtered listing plus every post variant.
#[derive(Debug, Serialize)]
pub struct HomePage<'a> {
    pub language: Language,
    pub posts: Vec<Post>,
    pub all_posts: &'a [Post],
    pub tags: Vec<String>,
}

/// Post detail: metadata, rendered content, and the language it ended up in.
#[derive(Debug, Serialize)]
pub struct PostPage<'a> {
    pub language: Language,
    pub requested: Language,
    pub meta: &'a Post,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct TagPage {
    pub language: Language,
    pub tag: String,
    pub posts: Vec<Post>,
}

/// Tags come from the selected posts only, so each one has a page in `lang`.
pub fn home(site: &Site, lang: Language) -> HomePage<'_> {
    let selected = posts::select_by_language(&site.posts, lang);
    let tags = posts::collect_tags(&selected);
    HomePage {
        language: lang,
        posts: selected,
        all_posts: &site.posts,
        tags,
    }
}

pub fn post<'a>(
    site: &'a Site,
    slug: &str,
    lang: Language,
    theme: Theme,
) -> Result<PostPage<'a>, PageError> {
    let (meta, template, resolved) = site
        .find_post(slug, lang)
        .ok_or_else(|| PageError::NotFound(slug.to_string()))?;

    let mut ctx = base_context(site, resolved, theme);
    ctx.insert("post", meta);
    let content = site.tera.render(template, &ctx)?;

    Ok(PostPage {
        language: resolved,
        requested: lang,
        meta,
        content,
    })
}

/// Posts carrying `tag`, one variant per slug for a `lang` reader.
pub fn tag(site: &Site, tag: &str, lang: Language) -> Result<TagPage, PageError> {
    let selected = posts::select_by_language(&site.posts, lang);
    let tagged: Vec<Post> = posts::by_tag(&selected, tag).into_iter().cloned().collect();
    if tagged.is_empty() {
        return Err(PageError::NotFound(tag.to_string()));
    }
    Ok(TagPage {
        language: lang,
        tag: tag.to_string(),
        posts: tagged,
    })
}

/// Variables shared by every page.
pub fn base_context(site: &Site, lang: Language, theme: Theme) -> Context {
    let mut ctx = Context::new();
    ctx.insert("config", &site.config);
    ctx.insert("site", &site.config.site);
    ctx.insert("base", &site.config.base);
    ctx.insert("lang", &lang);
    ctx.insert("other_lang", &lang.toggled());
    ctx.insert("languages", &Language::ALL);
    ctx.insert("theme", &theme);
    ctx.insert("theme_class", theme.html_class());
    ctx.insert("i18n", site.translations.tree(lang));
    ctx
}

pub fn render_home(site: &Site, lang: Language, theme: Theme) -> Result<String, PageError> {
    let page = home(site, lang);
    let mut ctx = base_context(site, lang, theme);
    ctx.insert("page", &page);
    ctx.insert("posts", &page.posts);
    ctx.insert("tags", &page.tags);
    ctx.insert("alternate_url", &format!("{}/{}/", site.config.base, lang.toggled()));
    Ok(site.tera.render("index.html", &ctx)?)
}

pub fn render_post(site: &Site, slug: &str, lang: Language, theme: Theme) -> Result<String, PageError> {
    let page = post(site, slug, lang, theme)?;
    // the page chrome follows the reader's language even when the body fell back
    let mut ctx = base_context(site, lang, theme);
    ctx.insert("page", &page);
    ctx.insert("post", page.meta);
    ctx.insert("content", &page.content);
    ctx.insert(
        "alternate_url",
        &format!("{}/{}/posts/{}.html", site.config.base, lang.toggled(), slug),
    );
    Ok(site.tera.render("post.html", &ctx)?)
}

pub fn render_tag(site: &Site, tag_name: &str, lang: Language, theme: Theme) -> Result<String, PageError> {
    let page = tag(site, tag_name, lang)?;
    let mut ctx = base_context(site, lang, theme);
    ctx.insert("tag", &page.tag);
    ctx.insert("posts", &page.posts);
    ctx.insert(
        "alternate_url",
        &format!("{}/{}/tags/{}.html", site.config.base, lang.toggled(), tag_name),
    );

    let template = if site.tera.get_template_names().any(|t| t == "tag.html") {
        "tag.html"
    } else {
        "index.html"
    };
    Ok(site.tera.render(template, &ctx)?)
}

pub fn render_not_found(site: &Site, message: &str, lang: Language, theme: Theme) -> Result<String, PageError> {
    let mut ctx = base_context(site, lang, theme);
    ctx.insert("message", message);
    ctx.insert("alternate_url", &format!("{}/{}/", site.config.base, lang.toggled()));
    Ok(site.tera.render("404.html", &ctx)?)
}
