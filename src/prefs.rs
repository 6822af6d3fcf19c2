//! Persisted reader preferences (language and color theme).
//!
//! A store keeps the current value in memory and writes every change through
//! to a [`Storage`] backend. Stored values that do not parse are ignored and
//! replaced by the default; nothing here surfaces an error to the caller.

use crate::models::{Language, Theme};
use serde_json::{Map, Value};
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Key/value persistence for preferences.
pub trait Storage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> io::Result<()>;
}

/// JSON object on disk, rewritten on every `set`.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    values: Map<String, Value>,
}

impl FileStorage {
    /// Opens (or prepares) the backing file, creating its directory.
    ///
    /// A corrupt file is treated as empty.
    pub fn open(path: &Path) -> io::Result<FileStorage> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let values = match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e),
        };
        Ok(FileStorage {
            path: path.to_path_buf(),
            values,
        })
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key)?.as_str().map(str::to_string)
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        // pick up keys written by other stores sharing the file
        if let Ok(raw) = fs::read_to_string(&self.path) {
            if let Ok(values) = serde_json::from_str(&raw) {
                self.values = values;
            }
        }
        self.values
            .insert(key.to_string(), Value::String(value.to_string()));
        let raw = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, raw)
    }
}

/// Backend for environments without persistent storage.
#[derive(Debug, Default)]
pub struct NullStorage;

impl Storage for NullStorage {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&mut self, _key: &str, _value: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Picks the storage backend once: the preferences file when it is usable,
/// otherwise a no-op backend.
pub fn open_storage(path: &Path) -> Box<dyn Storage> {
    match FileStorage::open(path) {
        Ok(storage) => Box::new(storage),
        Err(e) => {
            eprintln!(
                "{} preferences at {} are not persisted: {}",
                console::style("warning").yellow(),
                path.display(),
                e
            );
            Box::new(NullStorage)
        }
    }
}

/// Both reader preferences, each over its own handle to the same file.
pub struct Preferences {
    pub language: LanguageStore,
    pub theme: ThemeStore,
}

impl Preferences {
    pub fn open(path: &Path) -> Preferences {
        Preferences {
            language: LanguageStore::open(open_storage(path)),
            theme: ThemeStore::open(open_storage(path)),
        }
    }
}

/// A two-valued setting with a storage key.
pub trait Preference: Copy + PartialEq + Display + FromStr {
    const STORAGE_KEY: &'static str;

    fn toggled(self) -> Self;

    /// Value used when nothing valid is stored.
    fn environment_default() -> Self;
}

impl Preference for Language {
    const STORAGE_KEY: &'static str = "blog-language";

    fn toggled(self) -> Self {
        Language::toggled(self)
    }

    fn environment_default() -> Self {
        Language::DEFAULT
    }
}

impl Preference for Theme {
    const STORAGE_KEY: &'static str = "theme";

    fn toggled(self) -> Self {
        Theme::toggled(self)
    }

    fn environment_default() -> Self {
        Theme::detect()
    }
}

pub struct PreferenceStore<P: Preference> {
    current: P,
    storage: Box<dyn Storage>,
}

pub type LanguageStore = PreferenceStore<Language>;
pub type ThemeStore = PreferenceStore<Theme>;

impl<P: Preference> PreferenceStore<P> {
    pub fn open(storage: Box<dyn Storage>) -> Self {
        Self::with_default_from(storage, P::environment_default)
    }

    /// Stored value if present and valid, else `default`.
    pub fn with_default(storage: Box<dyn Storage>, default: P) -> Self {
        Self::with_default_from(storage, || default)
    }

    /// Like [`with_default`](Self::with_default), but `default` only runs
    /// when nothing valid is stored.
    pub fn with_default_from(storage: Box<dyn Storage>, default: impl FnOnce() -> P) -> Self {
        let current = storage
            .get(P::STORAGE_KEY)
            .and_then(|raw| raw.parse::<P>().ok())
            .unwrap_or_else(default);
        PreferenceStore { current, storage }
    }

    pub fn current(&self) -> P {
        self.current
    }

    pub fn set(&mut self, value: P) {
        self.current = value;
        self.persist();
    }

    pub fn toggle(&mut self) -> P {
        self.set(self.current.toggled());
        self.current
    }

    fn persist(&mut self) {
        if let Err(e) = self.storage.set(P::STORAGE_KEY, &self.current.to_string()) {
            eprintln!(
                "{} could not save {}: {}",
                console::style("warning").yellow(),
                P::STORAGE_KEY,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_storage(dir: &Path) -> Box<dyn Storage> {
        Box::new(FileStorage::open(&dir.join("prefs/preferences.json")).unwrap())
    }

    #[test]
    fn language_survives_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = LanguageStore::open(file_storage(tmp.path()));
        assert_eq!(store.current(), Language::En);
        store.set(Language::Ua);

        let reloaded = LanguageStore::open(file_storage(tmp.path()));
        assert_eq!(reloaded.current(), Language::Ua);
    }

    #[test]
    fn stored_language_is_read_case_insensitively() {
        let tmp = tempfile::tempdir().unwrap();
        let mut storage = file_storage(tmp.path());
        storage.set("blog-language", "UA").unwrap();
        assert_eq!(LanguageStore::open(storage).current(), Language::Ua);
    }

    #[test]
    fn invalid_stored_value_uses_default() {
        let tmp = tempfile::tempdir().unwrap();
        let mut storage = file_storage(tmp.path());
        storage.set("theme", "sepia").unwrap();
        let store = ThemeStore::with_default(storage, Theme::Dark);
        assert_eq!(store.current(), Theme::Dark);
    }

    #[test]
    fn stored_theme_wins_over_default() {
        let tmp = tempfile::tempdir().unwrap();
        let mut storage = file_storage(tmp.path());
        storage.set("theme", "light").unwrap();
        let store = ThemeStore::with_default(storage, Theme::Dark);
        assert_eq!(store.current(), Theme::Light);
    }

    #[test]
    fn default_is_not_consulted_when_a_value_is_stored() {
        let tmp = tempfile::tempdir().unwrap();
        let mut storage = file_storage(tmp.path());
        storage.set("theme", "dark").unwrap();
        let calls = std::cell::Cell::new(0);
        let store = ThemeStore::with_default_from(storage, || {
            calls.set(calls.get() + 1);
            Theme::Light
        });
        assert_eq!(store.current(), Theme::Dark);
        assert_eq!(calls.get(), 0);

        let store = ThemeStore::with_default_from(Box::new(NullStorage), || {
            calls.set(calls.get() + 1);
            Theme::Light
        });
        assert_eq!(store.current(), Theme::Light);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn toggle_flips_and_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ThemeStore::with_default(file_storage(tmp.path()), Theme::Light);
        assert_eq!(store.toggle(), Theme::Dark);

        let reloaded = ThemeStore::with_default(file_storage(tmp.path()), Theme::Light);
        assert_eq!(reloaded.current(), Theme::Dark);
        assert_eq!(file_storage(tmp.path()).get("theme").as_deref(), Some("dark"));
    }

    #[test]
    fn both_stores_share_one_file() {
        let tmp = tempfile::tempdir().unwrap();
        LanguageStore::open(file_storage(tmp.path())).set(Language::Ua);
        ThemeStore::with_default(file_storage(tmp.path()), Theme::Light).set(Theme::Dark);

        let storage = file_storage(tmp.path());
        assert_eq!(storage.get("blog-language").as_deref(), Some("ua"));
        assert_eq!(storage.get("theme").as_deref(), Some("dark"));
    }

    #[test]
    fn stale_handle_does_not_drop_other_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let mut language = LanguageStore::open(file_storage(tmp.path()));
        let mut theme = ThemeStore::with_default(file_storage(tmp.path()), Theme::Light);
        theme.set(Theme::Dark);
        language.set(Language::Ua);

        let prefs = Preferences::open(&tmp.path().join("prefs/preferences.json"));
        assert_eq!(prefs.language.current(), Language::Ua);
        assert_eq!(prefs.theme.current(), Theme::Dark);
    }

    #[test]
    fn corrupt_file_is_treated_as_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("preferences.json");
        fs::write(&path, "{not json").unwrap();
        let store = LanguageStore::open(Box::new(FileStorage::open(&path).unwrap()));
        assert_eq!(store.current(), Language::En);
    }

    #[test]
    fn null_storage_keeps_value_in_memory_only() {
        let mut store = LanguageStore::open(Box::new(NullStorage));
        store.toggle();
        assert_eq!(store.current(), Language::Ua);
        assert_eq!(LanguageStore::open(Box::new(NullStorage)).current(), Language::En);
    }
}
