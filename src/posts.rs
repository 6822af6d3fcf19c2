//! Post discovery, language-aware selection, and the `(slug, language)`
//! lookup table.
//!
//! Posts live directly inside the posts directory and are named
//! `<slug>.<lang>.md` (`hello.en.md`, `hello.ua.md`). A file without a
//! recognized language suffix (`hello.md`) is a legacy post in the default
//! language. The slug is the language-neutral identity shared by every
//! translation of a post.

use crate::frontmatter::{self, FrontmatterError};
use crate::models::Language;
use chrono::NaiveDateTime;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<slug>.+)\.(?P<lang>[A-Za-z]{2})\.md$").expect("filename pattern is valid")
});

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("File at {path} is missing metadata")]
    MissingMetadata { path: PathBuf },
    #[error("File at {path} has tag '{tag}', which cannot be a file name")]
    InvalidTag { path: PathBuf, tag: String },
    #[error("File at {path} has {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: FrontmatterError,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub title: String,
    pub date: String,
    pub tags: Vec<String>,
    pub slug: String,
    pub description: String,
    pub reading_time: String,
    pub language: Language,
    /// Language suffix from the filename; `None` for legacy `<slug>.md` files.
    #[serde(skip)]
    pub variant: Option<Language>,
    #[serde(skip)]
    pub published: NaiveDateTime,
    #[serde(skip)]
    pub source: PathBuf,
    #[serde(skip)]
    pub body: String,
}

/// Derives `(slug, language suffix)` from a post filename.
pub fn parse_filename(name: &str) -> (String, Option<Language>) {
    if let Some(caps) = FILENAME_RE.captures(name) {
        if let Ok(lang) = caps["lang"].parse::<Language>() {
            return (caps["slug"].to_string(), Some(lang));
        }
    }
    let slug = name.strip_suffix(".md").unwrap_or(name);
    (slug.to_string(), None)
}

/// [`parse_filename`] over a path; names that are not UTF-8 are decoded lossily.
fn parse_path(path: &Path) -> (String, Option<Language>) {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    parse_filename(&name)
}

/// Tags name their page file, so they must stay a single path component.
pub fn is_safe_tag(tag: &str) -> bool {
    !tag.trim().is_empty()
        && tag != "."
        && tag != ".."
        && !tag.contains(['/', '\\'])
}

fn discover(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }
    walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().map(|s| s == "md").unwrap_or(false))
        .collect()
}

fn load_one(path: &Path) -> Result<Post, LoadError> {
    let raw = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let metadata_err = |source: FrontmatterError| match source {
        FrontmatterError::Missing => LoadError::MissingMetadata {
            path: path.to_path_buf(),
        },
        source => LoadError::Metadata {
            path: path.to_path_buf(),
            source,
        },
    };
    let (meta, body) = frontmatter::parse_frontmatter(&raw).map_err(metadata_err)?;
    let published = meta.published().map_err(metadata_err)?;

    if let Some(tag) = meta.tags.iter().find(|t| !is_safe_tag(t)) {
        return Err(LoadError::InvalidTag {
            path: path.to_path_buf(),
            tag: tag.clone(),
        });
    }
    let (slug, variant) = parse_path(path);

    Ok(Post {
        title: meta.title,
        date: meta.date,
        tags: meta.tags,
        slug,
        description: meta.description,
        reading_time: meta.reading_time,
        language: variant.unwrap_or(Language::DEFAULT),
        variant,
        published,
        source: path.to_path_buf(),
        body,
    })
}

/// Newest first. `sort_by` is stable, so equal dates keep their input order.
pub fn sort_by_date_desc(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.published.cmp(&a.published));
}

/// Loads every post in `dir`, newest first.
///
/// A single malformed file fails the whole batch. Of several files sharing a
/// `(slug, language)` key (`a.en.md`, `a.EN.md`) only the first by file name
/// is kept.
pub fn load_all(dir: &Path) -> Result<Vec<Post>, LoadError> {
    let mut posts = discover(dir)
        .par_iter()
        .map(|p| load_one(p))
        .collect::<Result<Vec<_>, _>>()?;
    drop_duplicates(&mut posts);
    sort_by_date_desc(&mut posts);
    Ok(posts)
}

/// Keeps the first post per `(slug, variant)` in the current order.
fn drop_duplicates(posts: &mut Vec<Post>) {
    let mut seen = HashSet::new();
    posts.retain(|post| {
        let fresh = seen.insert((post.slug.clone(), post.variant));
        if !fresh {
            eprintln!(
                "{} {} duplicates an earlier post, skipping",
                console::style("warning").yellow(),
                post.source.display()
            );
        }
        fresh
    });
}

/// One post per slug, preferring `target`, then the default language, then
/// whichever variant came first.
pub fn select_by_language(posts: &[Post], target: Language) -> Vec<Post> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&Post>> = HashMap::new();
    for post in posts {
        let group = groups.entry(post.slug.as_str()).or_insert_with(|| {
            order.push(post.slug.as_str());
            Vec::new()
        });
        group.push(post);
    }

    let mut selected: Vec<Post> = order
        .into_iter()
        .filter_map(|slug| {
            let group = groups.get(slug)?;
            group
                .iter()
                .find(|p| p.language == target)
                .or_else(|| group.iter().find(|p| p.language == Language::DEFAULT))
                .or_else(|| group.first())
                .map(|p| (*p).clone())
        })
        .collect();
    sort_by_date_desc(&mut selected);
    selected
}

/// Every tag used by `posts`, deduplicated and sorted.
pub fn collect_tags(posts: &[Post]) -> Vec<String> {
    posts
        .iter()
        .flat_map(|p| p.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn by_tag<'a>(posts: &'a [Post], tag: &str) -> Vec<&'a Post> {
    posts.iter().filter(|p| p.tags.iter().any(|t| t == tag)).collect()
}

/// Lookup table from `(slug, filename language)` to a position in the post list.
#[derive(Debug, Default)]
pub struct PostIndex {
    entries: HashMap<(String, Option<Language>), usize>,
}

impl PostIndex {
    pub fn build(posts: &[Post]) -> PostIndex {
        let mut entries = HashMap::new();
        for (i, post) in posts.iter().enumerate() {
            entries.entry((post.slug.clone(), post.variant)).or_insert(i);
        }
        PostIndex { entries }
    }

    /// Finds the variant of `slug` a `lang` reader should see, returning its
    /// position and the language it is presented in.
    pub fn lookup(&self, slug: &str, lang: Language) -> Option<(usize, Language)> {
        for candidate in lang.fallback_chain() {
            if let Some(&i) = self.entries.get(&(slug.to_string(), Some(candidate))) {
                return Some((i, candidate));
            }
        }
        self.entries
            .get(&(slug.to_string(), None))
            .map(|&i| (i, Language::DEFAULT))
    }

    pub fn slugs(&self) -> BTreeSet<&str> {
        self.entries.keys().map(|(slug, _)| slug.as_str()).collect()
    }
}
