//! The core build engine for `lystok`.
//!
//! This module orchestrates the static output: assets and stylesheets first,
//! then the site context, then one tree of pages per language. Posts are
//! parsed in parallel by the loader; rendering walks the loaded site.

use crate::{
    config::Config,
    highlight::Highlighter,
    models::{Language, Theme},
    pages, parser, rss,
    site::Site,
};
use console::style;
use minify_html::{minify, Cfg};
use serde_json::json;
use std::{
    fs, io,
    path::Path,
    time::Instant,
};

/// Injected script for the `lystok serve` command.
/// Provides a lightweight WebSocket client to trigger browser refreshes.
pub const LIVE_RELOAD_SCRIPT: &str = r#"
<script id="lystok-live-reload">
    (function() {
        const socket = new WebSocket('ws://' + window.location.host + '/__lystok/live');
        socket.onmessage = (event) => {
            if (event.data === 'reload') {
                window.location.reload();
            }
        };
        socket.onclose = () => console.log('lystok: live reload disconnected.');
    })();
</script>
"#;

/// Reader preferences the build renders for when nothing else decides.
#[derive(Debug, Clone, Copy)]
pub struct Defaults {
    pub language: Language,
    pub theme: Theme,
}

fn step(n: u8, total: u8, msg: &str) {
    println!("{} {}", style(format!("[{}/{}]", n, total)).dim(), msg);
}

/// Minifies HTML and optionally injects the live-reload WebSocket script.
pub fn process_html(mut html: String, should_minify: bool, is_dev: bool) -> String {
    if is_dev {
        if let Some(pos) = html.find("</body>") {
            html.insert_str(pos, LIVE_RELOAD_SCRIPT);
        } else {
            html.push_str(LIVE_RELOAD_SCRIPT);
        }
    }

    if !should_minify {
        return html;
    }

    let mut cfg = Cfg::new();
    cfg.minify_js = true;
    cfg.minify_css = true;
    cfg.keep_comments = false;

    let minified = minify(html.as_bytes(), &cfg);
    String::from_utf8(minified).unwrap_or(html)
}

/// Standard recursive directory copy.
fn copy_dir_all(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> io::Result<()> {
    fs::create_dir_all(&dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        if ty.is_dir() {
            copy_dir_all(entry.path(), dst.as_ref().join(entry.file_name()))?;
        } else {
            fs::copy(entry.path(), dst.as_ref().join(entry.file_name()))?;
        }
    }
    Ok(())
}

fn write_file(dest: &Path, contents: impl AsRef<[u8]>) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, contents)
}

/// Compiles SCSS/SASS to CSS using the pure-Rust `grass` compiler.
pub fn compile_sass(config: &Config, verbose: bool) -> io::Result<()> {
    let sass_dir = &config.sass_dir;
    if !sass_dir.exists() {
        return Ok(());
    }

    let css_dir = config.output_dir.join("css");
    fs::create_dir_all(&css_dir)?;

    let output_style = match config.build.sass_style.as_str() {
        "compressed" => grass::OutputStyle::Compressed,
        _ => grass::OutputStyle::Expanded,
    };
    let options = grass::Options::default().style(output_style).load_path(sass_dir);

    for entry in fs::read_dir(sass_dir)? {
        let path = entry?.path();
        if !path.extension().map_or(false, |ext| ext == "scss" || ext == "sass") {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };

        // Skip partials (files starting with underscore)
        if file_name.starts_with('_') {
            continue;
        }

        if verbose {
            println!("{} {}", style("  compiling").dim(), file_name);
        }

        let css = grass::from_path(&path, &options)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Sass Error: {}", e)))?;
        let mut out_path = css_dir.join(file_name);
        out_path.set_extension("css");
        fs::write(out_path, css)?;
    }
    Ok(())
}

/// Writes every page of one language under `<output>/<lang>/`.
fn render_language(site: &Site, lang: Language, defaults: Defaults, is_dev: bool) -> anyhow::Result<usize> {
    let config = &site.config;
    let out = config.output_dir.join(lang.code());
    let minify = config.build.minify_html;
    let mut written = 0;

    let html = pages::render_home(site, lang, defaults.theme)?;
    write_file(&out.join("index.html"), process_html(html, minify, is_dev))?;
    written += 1;

    for slug in site.index.slugs() {
        let html = pages::render_post(site, slug, lang, defaults.theme)?;
        write_file(
            &out.join("posts").join(format!("{}.html", slug)),
            process_html(html, minify, is_dev),
        )?;
        written += 1;
    }

    let listing = pages::home(site, lang);
    for tag in &listing.tags {
        let html = pages::render_tag(site, tag, lang, defaults.theme)?;
        write_file(
            &out.join("tags").join(format!("{}.html", tag)),
            process_html(html, minify, is_dev),
        )?;
        written += 1;
    }

    if config.site.generate_rss {
        let rss_xml = rss::generate_rss(&listing.posts, config, lang);
        write_file(&out.join("rss.xml"), rss_xml)?;
    }

    if config.site.generate_search {
        let search_index: Vec<serde_json::Value> = listing
            .posts
            .iter()
            .map(|p| {
                let clean_text = parser::strip_markdown(&p.body);
                let snippet: String = clean_text.chars().take(140).collect();
                json!({
                    "title": p.title,
                    "slug": p.slug,
                    "date": p.date,
                    "tags": p.tags,
                    "language": p.language,
                    "description": p.description,
                    "snippet": snippet,
                })
            })
            .collect();
        write_file(&out.join("search.json"), serde_json::to_string(&search_index)?)?;
    }

    Ok(written)
}

/// The orchestrator of the `lystok` build. Returns the loaded site so the
/// preview server can keep rendering from it.
pub async fn perform_build(
    config: &Config,
    highlighter: &Highlighter,
    defaults: Defaults,
    verbose: bool,
    is_dev: bool,
) -> anyhow::Result<Site> {
    let start = Instant::now();

    // --- STEP 1: ASSET PIPELINE ---
    if config.build.clean_output && config.output_dir.exists() {
        if verbose { step(1, 5, "Cleaning output directory..."); }
        fs::remove_dir_all(&config.output_dir)?;
    }
    fs::create_dir_all(&config.output_dir)?;
    if config.static_dir.exists() {
        copy_dir_all(&config.static_dir, &config.output_dir)?;
    }

    // --- STEP 2: STYLESHEETS ---
    if verbose { step(2, 5, "Compiling stylesheets..."); }
    compile_sass(config, verbose)?;

    // --- STEP 3: CONTENT INGESTION ---
    if verbose { step(3, 5, "Processing content..."); }
    let site = Site::load(config.clone(), highlighter).await?;
    for lang in Language::ALL {
        let missing = site.translations.missing_keys(lang);
        if !missing.is_empty() {
            eprintln!(
                "{} {} translation lacks {}",
                style("warning").yellow(),
                lang,
                missing.join(", ")
            );
        }
    }

    // --- STEP 4: RENDERING ---
    if verbose { step(4, 5, "Rendering pages..."); }
    let mut written = 0;
    for lang in Language::ALL {
        let count = render_language(&site, lang, defaults, is_dev)?;
        if verbose {
            println!("{} {} pages for {}", style("  rendered").dim(), count, lang);
        }
        written += count;
    }

    // --- STEP 5: ENTRY POINTS ---
    if verbose { step(5, 5, "Finalizing entry points..."); }
    let minify = config.build.minify_html;
    let home = pages::render_home(&site, defaults.language, defaults.theme)?;
    write_file(&config.output_dir.join("index.html"), process_html(home, minify, is_dev))?;
    let not_found = pages::render_not_found(
        &site,
        &site.translations.resolve("error.page-not-found", defaults.language),
        defaults.language,
        defaults.theme,
    )?;
    write_file(&config.output_dir.join("404.html"), process_html(not_found, minify, is_dev))?;
    written += 2;

    if verbose {
        println!(
            "{} build complete: {} posts, {} pages in {:.2}s.",
            style("success").cyan(),
            site.posts.len(),
            written,
            start.elapsed().as_secs_f32()
        );
    }
    Ok(site)
}
