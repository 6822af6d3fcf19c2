//! Configuration logic for the lystok engine.
//!
//! This module handles the deserialization of `lystok.toml` and provides
//! sane defaults for any missing fields. It is split into the site identity
//! (`[site]`) and engine tuning (`[build]`) so the file stays organized.

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const CONFIG_FILE: &str = "lystok.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("lystok.toml not found. Run 'lystok init' to begin.")]
    NotFound,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// The root configuration schema for a lystok project.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    // --- Directory Settings ---

    /// Directory containing post Markdown files named `<slug>.<lang>.md`.
    /// Defaults to `./posts`.
    #[serde(default = "default_posts")]
    pub posts_dir: PathBuf,

    /// Target directory for the generated static site.
    /// Defaults to `./.build`.
    #[serde(default = "default_output")]
    pub output_dir: PathBuf,

    /// Directory of Tera templates. Templates missing here fall back to the
    /// built-in defaults. Defaults to `./templates`.
    #[serde(default = "default_templates")]
    pub templates_dir: PathBuf,

    /// Directory for raw assets like images, fonts, and scripts.
    /// Everything in here is copied directly to the output.
    #[serde(default = "default_static")]
    pub static_dir: PathBuf,

    /// Directory of `.scss`/`.sass` entry points compiled into `css/`.
    #[serde(default = "default_sass")]
    pub sass_dir: PathBuf,

    /// Directory holding `en.toml` / `ua.toml` translation overrides.
    #[serde(default = "default_i18n")]
    pub i18n_dir: PathBuf,

    /// File backing the language and theme preferences.
    #[serde(default = "default_preferences")]
    pub preferences_path: PathBuf,

    // --- Core Metadata ---

    /// The base domain for absolute link generation (e.g., "https://example.com").
    #[serde(default = "default_url")]
    pub base_url: String,

    /// The base sub-path if the site is not hosted at the root (e.g., "/blog").
    #[serde(default = "default_base")]
    pub base: String,

    #[serde(default)]
    pub site: SiteMetadata,

    #[serde(default)]
    pub build: BuildSettings,
}

/// Metadata describing the website for SEO and RSS purposes.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SiteMetadata {
    /// The name of the website, used in `<title>` tags and RSS headers.
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub author: String,

    /// Whether to generate a per-language `rss.xml`.
    #[serde(default = "default_bool_true")]
    pub generate_rss: bool,

    /// Whether to generate a per-language `search.json` index.
    #[serde(default = "default_bool_true")]
    pub generate_search: bool,
}

/// Flags and options that tune the build process.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BuildSettings {
    /// If true, the output directory is wiped before every build.
    #[serde(default = "default_bool_true")]
    pub clean_output: bool,

    /// Options: "expanded" (readable) or "compressed" (optimized).
    #[serde(default = "default_sass_style")]
    pub sass_style: String,

    #[serde(default = "default_bool_false")]
    pub minify_html: bool,

    /// Toggle for syntax highlighting in code blocks via Syntect.
    #[serde(default = "default_bool_true")]
    pub use_syntect: bool,

    /// Syntect theme used for the light color variant.
    #[serde(default = "default_light_theme")]
    pub light_theme: String,

    /// Syntect theme used for the dark color variant.
    #[serde(default = "default_dark_theme")]
    pub dark_theme: String,

    /// Optional directory containing custom `.sublime-syntax` files.
    pub custom_syntax_dir: Option<PathBuf>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound,
            _ => ConfigError::Io(e),
        })?;
        Ok(toml::from_str(&raw)?)
    }

    /// Rebases every relative directory onto `root`.
    pub fn rooted_at(mut self, root: &Path) -> Config {
        for dir in [
            &mut self.posts_dir,
            &mut self.output_dir,
            &mut self.templates_dir,
            &mut self.static_dir,
            &mut self.sass_dir,
            &mut self.i18n_dir,
            &mut self.preferences_path,
        ] {
            if dir.is_relative() {
                *dir = root.join(&*dir);
            }
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            posts_dir: default_posts(),
            output_dir: default_output(),
            templates_dir: default_templates(),
            static_dir: default_static(),
            sass_dir: default_sass(),
            i18n_dir: default_i18n(),
            preferences_path: default_preferences(),
            base_url: default_url(),
            base: default_base(),
            site: SiteMetadata::default(),
            build: BuildSettings::default(),
        }
    }
}

impl Default for SiteMetadata {
    fn default() -> Self {
        SiteMetadata {
            title: default_title(),
            description: String::new(),
            author: String::new(),
            generate_rss: true,
            generate_search: true,
        }
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        BuildSettings {
            clean_output: true,
            sass_style: default_sass_style(),
            minify_html: false,
            use_syntect: true,
            light_theme: default_light_theme(),
            dark_theme: default_dark_theme(),
            custom_syntax_dir: None,
        }
    }
}

// --- Default value providers ---

fn default_posts() -> PathBuf { PathBuf::from("./posts") }
fn default_output() -> PathBuf { PathBuf::from("./.build") }
fn default_templates() -> PathBuf { PathBuf::from("./templates") }
fn default_static() -> PathBuf { PathBuf::from("./static") }
fn default_sass() -> PathBuf { PathBuf::from("./sass") }
fn default_i18n() -> PathBuf { PathBuf::from("./i18n") }
fn default_preferences() -> PathBuf { PathBuf::from("./.lystok/preferences.json") }
fn default_url() -> String { "https://example.com".to_string() }
fn default_base() -> String { "".to_string() }
fn default_title() -> String { "a lystok blog".to_string() }
fn default_sass_style() -> String { "expanded".to_string() }
fn default_light_theme() -> String { "InspiredGitHub".to_string() }
fn default_dark_theme() -> String { "base16-ocean.dark".to_string() }
fn default_bool_true() -> bool { true }
fn default_bool_false() -> bool { false }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.posts_dir, PathBuf::from("./posts"));
        assert_eq!(config.site.title, "a lystok blog");
        assert!(config.build.use_syntect);
        assert_eq!(config.build.dark_theme, "base16-ocean.dark");
    }

    #[test]
    fn partial_sections_keep_field_defaults() {
        let config: Config = toml::from_str(
            r#"
            base_url = "https://blog.example"
            [site]
            title = "Notes"
            [build]
            minify_html = true
            "#,
        )
        .unwrap();
        assert_eq!(config.site.title, "Notes");
        assert!(config.site.generate_rss);
        assert!(config.build.minify_html);
        assert_eq!(config.build.light_theme, "InspiredGitHub");
    }

    #[test]
    fn missing_file_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Config::load(&tmp.path().join(CONFIG_FILE)).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound));
    }

    #[test]
    fn rooted_at_keeps_absolute_paths() {
        let mut config = Config::default();
        config.output_dir = PathBuf::from("/srv/site");
        let config = config.rooted_at(Path::new("/project"));
        assert_eq!(config.output_dir, PathBuf::from("/srv/site"));
        assert_eq!(config.posts_dir, Path::new("/project").join("./posts"));
    }
}
