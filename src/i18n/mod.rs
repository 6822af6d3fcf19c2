//! Translation dictionary and dotted-key resolver.
//!
//! Lookups never fail: a key missing from the reader's language falls back
//! to the default language, and a key missing there too resolves to itself
//! so the gap shows up in the rendered page.

mod en;
mod ua;

use crate::models::Language;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

static EMPTY: Value = Value::Null;

pub struct Translations {
    trees: HashMap<Language, Value>,
}

impl Translations {
    pub fn builtin() -> Translations {
        let mut trees = HashMap::new();
        trees.insert(Language::En, en::dictionary());
        trees.insert(Language::Ua, ua::dictionary());
        Translations { trees }
    }

    /// Deep-merges `<dir>/<lang>.toml` over the built-in dictionaries.
    ///
    /// Unreadable or malformed override files are skipped with a warning.
    pub fn with_overrides(mut self, dir: &Path) -> Translations {
        for lang in Language::ALL {
            let path = dir.join(format!("{}.toml", lang.code()));
            if !path.exists() {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|raw| toml::from_str::<Value>(&raw).map_err(|e| e.to_string()));
            match parsed {
                Ok(overrides) => {
                    let tree = self.trees.entry(lang).or_insert(Value::Null);
                    merge(tree, overrides);
                }
                Err(e) => eprintln!(
                    "{} skipping {}: {}",
                    console::style("warning").yellow(),
                    path.display(),
                    e
                ),
            }
        }
        self
    }

    /// Resolves a dotted key such as `nav.home` for `lang`.
    pub fn resolve(&self, key: &str, lang: Language) -> String {
        self.lookup(key, lang)
            .or_else(|| self.lookup(key, Language::DEFAULT))
            .map(str::to_string)
            .unwrap_or_else(|| key.to_string())
    }

    /// The whole dictionary for `lang`.
    pub fn tree(&self, lang: Language) -> &Value {
        self.trees.get(&lang).unwrap_or(&EMPTY)
    }

    /// Key paths present in the default language but absent for `lang`.
    pub fn missing_keys(&self, lang: Language) -> Vec<String> {
        let mut paths = Vec::new();
        leaf_paths(self.tree(Language::DEFAULT), "", &mut paths);
        paths.retain(|p| self.lookup(p, lang).is_none());
        paths
    }

    fn lookup(&self, key: &str, lang: Language) -> Option<&str> {
        let mut node = self.trees.get(&lang)?;
        for segment in key.split('.') {
            node = node.as_object()?.get(segment)?;
        }
        node.as_str()
    }
}

fn merge(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (k, v) in overrides {
                merge(base.entry(k).or_insert(Value::Null), v);
            }
        }
        (base, overrides) => *base = overrides,
    }
}

fn leaf_paths(node: &Value, prefix: &str, out: &mut Vec<String>) {
    match node {
        Value::Object(map) => {
            for (k, v) in map {
                let path = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                leaf_paths(v, &path, out);
            }
        }
        Value::String(_) => out.push(prefix.to_string()),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_in_requested_language() {
        let t = Translations::builtin();
        assert_eq!(t.resolve("nav.home", Language::Ua), "Головна");
        assert_eq!(t.resolve("nav.home", Language::En), "Home");
        assert_eq!(t.resolve("blog.read-more", Language::Ua), "Читати далі");
    }

    #[test]
    fn unknown_key_resolves_to_itself() {
        let t = Translations::builtin();
        assert_eq!(t.resolve("made.up.key", Language::Ua), "made.up.key");
    }

    #[test]
    fn non_leaf_key_resolves_to_itself() {
        let t = Translations::builtin();
        assert_eq!(t.resolve("nav", Language::En), "nav");
        assert_eq!(t.resolve("nav.home.extra", Language::En), "nav.home.extra");
    }

    #[test]
    fn missing_translation_falls_back_to_default() {
        let mut trees = HashMap::new();
        trees.insert(Language::En, json!({ "nav": { "home": "Home", "about": "About" } }));
        trees.insert(Language::Ua, json!({ "nav": { "home": "Головна" } }));
        let t = Translations { trees };

        assert_eq!(t.resolve("nav.about", Language::Ua), "About");
        assert_eq!(t.missing_keys(Language::Ua), vec!["nav.about"]);
    }

    #[test]
    fn builtin_dictionaries_are_complete() {
        let t = Translations::builtin();
        assert!(t.missing_keys(Language::Ua).is_empty());
    }

    #[test]
    fn overrides_merge_into_builtin() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("ua.toml"),
            "[nav]\nabout = \"Хто я\"\n[extra]\nhello = \"Привіт\"\n",
        )
        .unwrap();
        let t = Translations::builtin().with_overrides(tmp.path());

        assert_eq!(t.resolve("nav.about", Language::Ua), "Хто я");
        assert_eq!(t.resolve("nav.home", Language::Ua), "Головна");
        assert_eq!(t.resolve("extra.hello", Language::Ua), "Привіт");
        assert_eq!(t.resolve("extra.hello", Language::En), "extra.hello");
    }
}
