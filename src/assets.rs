use rust_embed::RustEmbed;
use std::fs;
use std::path::Path;

/// Starter project written by `lystok init`. Its templates also back any
/// template a project does not provide.
#[derive(RustEmbed)]
#[folder = "assets/default_site/"]
pub struct DefaultSite;

const TEMPLATE_PREFIX: &str = "templates/";

/// Built-in templates as `(name, source)` pairs, names relative to `templates/`.
pub fn default_templates() -> Vec<(String, String)> {
    DefaultSite::iter()
        .filter_map(|file| {
            let name = file.strip_prefix(TEMPLATE_PREFIX)?.to_string();
            let asset = DefaultSite::get(file.as_ref())?;
            let source = String::from_utf8(asset.data.into_owned()).ok()?;
            Some((name, source))
        })
        .collect()
}

/// Writes the starter project under `root`, keeping files that already exist.
pub fn extract(root: &Path, verbose: bool) -> anyhow::Result<usize> {
    let mut written = 0;
    for file in DefaultSite::iter() {
        let path = root.join(file.as_ref());
        if path.exists() {
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = DefaultSite::get(file.as_ref())
            .ok_or_else(|| anyhow::anyhow!("failed to read embedded asset {}", file))?;
        fs::write(&path, content.data)?;
        if verbose {
            println!("{} {}", console::style("  created").dim(), file);
        }
        written += 1;
    }
    Ok(written)
}
