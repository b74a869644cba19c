//! Locale dictionary store.
//!
//! Built once at startup from a `<root>/<locale>/<context>.json` tree and
//! never mutated afterwards. Handlers reach it through [`Scoped`] handles.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::{I18nError, LocaleCode, DEFAULT_LOCALE, SUPPORTED_LOCALES};

/// Context name -> key -> localized string.
type StringTable = HashMap<String, HashMap<String, String>>;

/// The fully merged, read-only locale dictionaries.
#[derive(Debug, Default)]
pub struct LocaleStore {
    tables: HashMap<&'static str, StringTable>,
}

impl LocaleStore {
    /// Load and merge every dictionary under `root`.
    ///
    /// Each supported locale's subdirectory is scanned for `*.json` files
    /// (file name = context, contents = flat string map). Directories not
    /// named after a supported locale are never looked at, and a missing
    /// locale directory is skipped. An unreadable or malformed file aborts
    /// startup: a partial store is not an acceptable steady state.
    ///
    /// When several files feed the same (locale, context) pair, entries
    /// accumulated earlier win per key; later files only fill gaps.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, I18nError> {
        let root = root.as_ref();
        let mut tables = HashMap::new();

        for locale in SUPPORTED_LOCALES {
            let dir = root.join(locale);
            let mut table = StringTable::new();

            if dir.is_dir() {
                for path in locale_files(&dir)? {
                    let context = path
                        .file_stem()
                        .map(|stem| stem.to_string_lossy().into_owned())
                        .unwrap_or_default();

                    let raw = fs::read_to_string(&path).map_err(|source| I18nError::Read {
                        path: path.clone(),
                        source,
                    })?;
                    let fresh: HashMap<String, String> = serde_json::from_str(&raw)
                        .map_err(|source| I18nError::Parse {
                            path: path.clone(),
                            source,
                        })?;

                    debug!(locale, context = %context, entries = fresh.len(), "loaded dictionary");
                    merge_context(&mut table, context, fresh);
                }
            }

            tables.insert(locale, table);
        }

        let store = Self { tables };
        info!(
            locales = store.locale_count(),
            "locale store built from {}",
            root.display()
        );
        Ok(store)
    }

    /// Number of locales that ended up with at least one dictionary.
    pub fn locale_count(&self) -> usize {
        self.tables.values().filter(|table| !table.is_empty()).count()
    }

    /// Look up `key` in the given locale and context, falling back to the
    /// default locale's table and finally to the key itself.
    pub fn get<'a>(&'a self, locale: LocaleCode, context: &str, key: &'a str) -> &'a str {
        self.get_with(locale, context, key, None)
    }

    /// Like [`LocaleStore::get`], but an override context (when given)
    /// replaces `context` for the whole lookup, and its table is taken from
    /// the requested locale or, when absent there, from the default locale.
    pub fn get_with<'a>(
        &'a self,
        locale: LocaleCode,
        context: &str,
        key: &'a str,
        override_context: Option<&str>,
    ) -> &'a str {
        let context = override_context.unwrap_or(context);

        let primary = match self.table(locale.as_str(), context) {
            Some(table) => Some(table),
            None if override_context.is_some() => self.table(DEFAULT_LOCALE, context),
            None => None,
        };

        if let Some(text) = primary.and_then(|table| table.get(key)) {
            return text;
        }
        if let Some(text) = self
            .table(DEFAULT_LOCALE, context)
            .and_then(|table| table.get(key))
        {
            return text;
        }
        key
    }

    /// Context-bound handle for one command module. The locale stays a
    /// per-call argument.
    pub fn scoped(self: &Arc<Self>, context: &'static str) -> Scoped {
        Scoped {
            store: Arc::clone(self),
            context,
        }
    }

    fn table(&self, locale: &str, context: &str) -> Option<&HashMap<String, String>> {
        self.tables.get(locale)?.get(context)
    }
}

/// Fold a freshly parsed dictionary into the accumulated table for its
/// context. Entries already accumulated win per key; the fresh file only
/// fills gaps. Deliberate, observable behavior: partial override files
/// loaded earlier take priority over later full dictionaries.
fn merge_context(table: &mut StringTable, context: String, mut fresh: HashMap<String, String>) {
    if let Some(existing) = table.remove(&context) {
        fresh.extend(existing);
    }
    table.insert(context, fresh);
}

/// JSON files under one locale directory, sorted for deterministic merging.
fn locale_files(dir: &Path) -> Result<Vec<PathBuf>, I18nError> {
    let entries = fs::read_dir(dir).map_err(|source| I18nError::Read {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| I18nError::Read {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Context-bound, locale-agnostic lookup handed out at registration time.
#[derive(Clone)]
pub struct Scoped {
    store: Arc<LocaleStore>,
    context: &'static str,
}

impl Scoped {
    pub fn get<'a>(&'a self, locale: LocaleCode, key: &'a str) -> &'a str {
        self.store.get(locale, self.context, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;
    use std::path::PathBuf;

    /// Unique fixture directory under the system temp dir.
    struct Fixture {
        root: PathBuf,
    }

    impl Fixture {
        fn new(tag: &str) -> Self {
            let root = std::env::temp_dir().join(format!(
                "polybot-locales-{tag}-{}-{}",
                std::process::id(),
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap()
                    .as_nanos()
            ));
            fs::create_dir_all(&root).unwrap();
            Self { root }
        }

        fn write(&self, locale: &str, context: &str, body: &str) {
            let dir = self.root.join(locale);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(format!("{context}.json")), body).unwrap();
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.root);
        }
    }

    #[test]
    fn loads_dictionaries_per_locale_and_context() {
        let fx = Fixture::new("basic");
        fx.write("en-GB", "sudo", r#"{"restarting": "Restarting..."}"#);
        fx.write("pt-BR", "sudo", r#"{"restarting": "Reiniciando..."}"#);

        let store = LocaleStore::load(&fx.root).unwrap();
        assert_eq!(store.locale_count(), 2);

        let pt = LocaleCode::lookup("pt-BR").unwrap();
        assert_eq!(store.get(pt, "sudo", "restarting"), "Reiniciando...");
    }

    #[test]
    fn first_file_wins_later_files_fill_gaps() {
        let first: HashMap<String, String> =
            serde_json::from_str(r#"{"a": "1"}"#).unwrap();
        let second: HashMap<String, String> =
            serde_json::from_str(r#"{"a": "2", "b": "3"}"#).unwrap();

        let mut table = StringTable::new();
        merge_context(&mut table, "sudo".to_string(), first);
        merge_context(&mut table, "sudo".to_string(), second);

        let merged = &table["sudo"];
        assert_eq!(merged["a"], "1");
        assert_eq!(merged["b"], "3");
    }

    #[test]
    fn malformed_json_is_a_startup_error() {
        let fx = Fixture::new("malformed");
        fx.write("en-GB", "sudo", "{not json");

        let err = LocaleStore::load(&fx.root).unwrap_err();
        assert!(matches!(err, I18nError::Parse { .. }));
    }

    #[test]
    fn non_string_values_are_a_startup_error() {
        let fx = Fixture::new("nonstring");
        fx.write("en-GB", "sudo", r#"{"count": 3}"#);

        let err = LocaleStore::load(&fx.root).unwrap_err();
        assert!(matches!(err, I18nError::Parse { .. }));
    }

    #[test]
    fn unknown_locale_directories_are_ignored() {
        let fx = Fixture::new("unknown");
        fx.write("xx-XX", "sudo", r#"{"a": "1"}"#);
        fx.write("en-GB", "sudo", r#"{"a": "2"}"#);

        let store = LocaleStore::load(&fx.root).unwrap();
        assert_eq!(store.locale_count(), 1);
        assert_eq!(store.get(LocaleCode::default(), "sudo", "a"), "2");
    }

    #[test]
    fn missing_key_falls_back_to_default_locale_then_raw_key() {
        let fx = Fixture::new("fallback");
        fx.write("en-GB", "sudo", r#"{"only-default": "from default"}"#);
        fx.write("pt-BR", "sudo", r#"{"translated": "traduzido"}"#);

        let store = LocaleStore::load(&fx.root).unwrap();
        let pt = LocaleCode::lookup("pt-BR").unwrap();

        assert_eq!(store.get(pt, "sudo", "translated"), "traduzido");
        assert_eq!(store.get(pt, "sudo", "only-default"), "from default");
        assert_eq!(store.get(pt, "sudo", "nowhere"), "nowhere");
    }

    #[test]
    fn override_context_falls_back_to_default_locale_table() {
        let fx = Fixture::new("override");
        fx.write("en-GB", "language", r#"{"pick": "Pick a language"}"#);
        fx.write("pt-BR", "sudo", r#"{"restarting": "Reiniciando..."}"#);

        let store = LocaleStore::load(&fx.root).unwrap();
        let pt = LocaleCode::lookup("pt-BR").unwrap();

        // pt-BR has no "language" context; the override lookup borrows the
        // default locale's table for it.
        assert_eq!(
            store.get_with(pt, "sudo", "pick", Some("language")),
            "Pick a language"
        );
    }

    #[test]
    fn scoped_handle_is_context_bound() {
        let fx = Fixture::new("scoped");
        fx.write("en-GB", "sudo", r#"{"restarting": "Restarting..."}"#);

        let store = Arc::new(LocaleStore::load(&fx.root).unwrap());
        let strings = store.scoped("sudo");

        assert_eq!(strings.get(LocaleCode::default(), "restarting"), "Restarting...");
        assert_eq!(strings.get(LocaleCode::default(), "missing"), "missing");
    }
}
