//! Dual-theme syntax highlighting for fenced code blocks.
//!
//! The syntect engine (grammars plus a light and a dark theme) is expensive
//! to load, so it is built lazily the first time a block is highlighted and
//! shared afterwards. Concurrent first callers wait on the same construction.
//!
//! Each token carries both colors as CSS custom properties:
//!
//! ```html
//! <span style="--hl-light:#a71d5d;--hl-dark:#b48ead">fn</span>
//! ```
//!
//! Stylesheets pick `--hl-light` by default and `--hl-dark` under `.dark`,
//! so switching themes needs no re-render.

use crate::config::BuildSettings;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use syntect::easy::ScopeRangeIterator;
use syntect::highlighting::{Color, Highlighter as StyleResolver, Theme, ThemeSet};
use syntect::parsing::{ParseState, ScopeStack, SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use thiserror::Error;
use tokio::sync::OnceCell;

const FALLBACK_LIGHT: &str = "InspiredGitHub";
const FALLBACK_DARK: &str = "base16-ocean.dark";

#[derive(Error, Debug)]
pub enum HighlightError {
    #[error("could not load syntaxes from {path}: {source}")]
    Syntaxes {
        path: PathBuf,
        #[source]
        source: syntect::LoadingError,
    },
    #[error("highlighter construction was interrupted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct HighlightSettings {
    pub light_theme: String,
    pub dark_theme: String,
    pub custom_syntax_dir: Option<PathBuf>,
}

impl From<&BuildSettings> for HighlightSettings {
    fn from(build: &BuildSettings) -> Self {
        HighlightSettings {
            light_theme: build.light_theme.clone(),
            dark_theme: build.dark_theme.clone(),
            custom_syntax_dir: build.custom_syntax_dir.clone(),
        }
    }
}

struct Engine {
    syntaxes: SyntaxSet,
    light: Theme,
    dark: Theme,
}

impl Engine {
    fn build(settings: &HighlightSettings) -> Result<Engine, HighlightError> {
        let syntaxes = match &settings.custom_syntax_dir {
            Some(dir) => {
                let mut builder = SyntaxSet::load_defaults_newlines().into_builder();
                builder
                    .add_from_folder(dir, true)
                    .map_err(|source| HighlightError::Syntaxes {
                        path: dir.clone(),
                        source,
                    })?;
                builder.build()
            }
            None => SyntaxSet::load_defaults_newlines(),
        };

        let themes = ThemeSet::load_defaults();
        Ok(Engine {
            syntaxes,
            light: resolve_theme(&themes, &settings.light_theme, FALLBACK_LIGHT),
            dark: resolve_theme(&themes, &settings.dark_theme, FALLBACK_DARK),
        })
    }

    fn syntax_for(&self, lang: Option<&str>) -> &SyntaxReference {
        lang.map(str::trim)
            .filter(|l| !l.is_empty())
            .and_then(|l| self.syntaxes.find_syntax_by_token(l))
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
    }
}

/// A built-in theme name, a path to a `.tmTheme` file, or the fallback.
fn resolve_theme(themes: &ThemeSet, name: &str, fallback: &str) -> Theme {
    if let Some(theme) = themes.themes.get(name) {
        return theme.clone();
    }
    let path = Path::new(name);
    if path.exists() {
        match ThemeSet::get_theme(path) {
            Ok(theme) => return theme,
            Err(e) => eprintln!(
                "{} could not load theme {}: {}",
                console::style("warning").yellow(),
                name,
                e
            ),
        }
    } else {
        eprintln!(
            "{} unknown syntax theme '{}', using {}",
            console::style("warning").yellow(),
            name,
            fallback
        );
    }
    themes.themes.get(fallback).cloned().unwrap_or_default()
}

pub struct Highlighter {
    settings: HighlightSettings,
    engine: OnceCell<Engine>,
    constructions: AtomicUsize,
}

impl Highlighter {
    pub fn new(settings: HighlightSettings) -> Highlighter {
        Highlighter {
            settings,
            engine: OnceCell::new(),
            constructions: AtomicUsize::new(0),
        }
    }

    /// How many times the engine has been built.
    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    async fn engine(&self) -> Result<&Engine, HighlightError> {
        self.engine
            .get_or_try_init(|| async {
                self.constructions.fetch_add(1, Ordering::SeqCst);
                let settings = self.settings.clone();
                tokio::task::spawn_blocking(move || Engine::build(&settings)).await?
            })
            .await
    }

    /// Renders `code` as a `<pre>` block carrying light and dark colors.
    ///
    /// A missing or unknown `lang` is rendered as plain text.
    pub async fn highlight(&self, code: &str, lang: Option<&str>) -> Result<String, HighlightError> {
        let engine = self.engine().await?;
        let syntax = engine.syntax_for(lang);
        Ok(render(engine, syntax, code).unwrap_or_else(|| plain_block(code)))
    }
}

fn hex(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

fn render(engine: &Engine, syntax: &SyntaxReference, code: &str) -> Option<String> {
    let light = StyleResolver::new(&engine.light);
    let dark = StyleResolver::new(&engine.dark);

    let mut pre_style = String::new();
    for (var, color) in [
        ("--hl-light-bg", engine.light.settings.background),
        ("--hl-dark-bg", engine.dark.settings.background),
        ("--hl-light", engine.light.settings.foreground),
        ("--hl-dark", engine.dark.settings.foreground),
    ] {
        if let Some(color) = color {
            let _ = write!(pre_style, "{}:{};", var, hex(color));
        }
    }

    let mut html = format!(
        "<pre class=\"hl\" data-lang=\"{}\" style=\"{}\"><code>",
        tera::escape_html(&syntax.name),
        pre_style
    );

    let mut state = ParseState::new(syntax);
    let mut stack = ScopeStack::new();
    let mut pending: Option<(Color, Color)> = None;
    let mut buffer = String::new();

    for line in LinesWithEndings::from(code) {
        let ops = state.parse_line(line, &engine.syntaxes).ok()?;
        for (range, op) in ScopeRangeIterator::new(&ops, line) {
            stack.apply(op).ok()?;
            if range.is_empty() {
                continue;
            }
            let colors = (
                light.style_for_stack(stack.as_slice()).foreground,
                dark.style_for_stack(stack.as_slice()).foreground,
            );
            if pending != Some(colors) {
                flush_span(&mut html, pending, &buffer);
                buffer.clear();
                pending = Some(colors);
            }
            buffer.push_str(&line[range]);
        }
    }
    flush_span(&mut html, pending, &buffer);
    html.push_str("</code></pre>");
    Some(html)
}

fn flush_span(html: &mut String, colors: Option<(Color, Color)>, text: &str) {
    if text.is_empty() {
        return;
    }
    match colors {
        Some((light, dark)) => {
            let _ = write!(
                html,
                "<span style=\"--hl-light:{};--hl-dark:{}\">{}</span>",
                hex(light),
                hex(dark),
                tera::escape_html(text)
            );
        }
        None => html.push_str(&tera::escape_html(text)),
    }
}

/// Unhighlighted fallback used when a grammar fails on the input.
pub fn plain_block(code: &str) -> String {
    format!("<pre class=\"hl\"><code>{}</code></pre>", tera::escape_html(code))
}

/// Prepares highlighted markup for inclusion in template source.
///
/// Every `{` becomes `&#123;` so the markup can never open a template
/// expression, and the block is wrapped in a raw section.
pub fn embed(markup: &str) -> String {
    format!("{{% raw %}}{}{{% endraw %}}", markup.replace('{', "&#123;"))
}
