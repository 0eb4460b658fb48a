//! MIME type → file extension registry

use std::collections::BTreeMap;

/// Maps MIME types to the extensions registered for them.
///
/// A configured registration replaces the `mime_guess` entry for its type,
/// and its first extension is the preferred one. Types without one use the
/// `mime_guess` table, sorted. Every extension carries its leading dot.
#[derive(Clone, Debug, Default)]
pub struct ExtensionRegistry {
    extra: BTreeMap<String, Vec<String>>,
}

impl ExtensionRegistry {
    pub fn new(extra: &BTreeMap<String, Vec<String>>) -> Self {
        let extra = extra
            .iter()
            .map(|(mime, exts)| {
                let exts = exts.iter().filter_map(|e| normalize(e)).collect();
                (mime.to_ascii_lowercase(), exts)
            })
            .collect();
        ExtensionRegistry { extra }
    }

    /// All extensions registered for `mime`, preferred first
    pub fn extensions_for(&self, mime: &str) -> Vec<String> {
        let mime = mime.to_ascii_lowercase();
        if let Some(exts) = self.extra.get(&mime) {
            return exts.clone();
        }

        let mut exts: Vec<String> = mime_guess::get_mime_extensions_str(&mime)
            .unwrap_or_default()
            .iter()
            .filter_map(|e| normalize(e))
            .collect();
        exts.sort();
        exts.dedup();
        exts
    }

    /// Extension an upload of `mime` is stored under.
    ///
    /// The extension of `suggested_name` wins if it is registered for the
    /// type; otherwise the preferred registered extension, or none.
    pub fn choose_extension(&self, mime: &str, suggested_name: &str) -> String {
        pick_extension(&self.extensions_for(mime), suggested_name)
    }
}

/// [`ExtensionRegistry::choose_extension`] over an already looked-up list
pub fn pick_extension(registered: &[String], suggested_name: &str) -> String {
    let suggested = crate::model::extension_of(suggested_name);
    if !suggested.is_empty() && registered.iter().any(|e| e == suggested) {
        return suggested.to_string();
    }
    registered.first().cloned().unwrap_or_default()
}

/// Lowercase with a leading dot; `None` for anything unusable in a file name
fn normalize(ext: &str) -> Option<String> {
    let ext = ext.trim_start_matches('.');
    if ext.is_empty() || ext.contains(['/', '\\', '.']) {
        return None;
    }
    Some(format!(".{}", ext.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ExtensionRegistry {
        let mut extra = BTreeMap::new();
        extra.insert("text/plain".to_string(), vec![".txt".to_string()]);
        extra.insert(
            "application/x-dosexec".to_string(),
            vec!["exe".to_string(), ".dll".to_string()],
        );
        ExtensionRegistry::new(&extra)
    }

    #[test]
    fn test_extra_types_replace_builtin() {
        assert_eq!(registry().extensions_for("text/plain"), vec![".txt".to_string()]);

        // the builtin text/plain list carries Windows leftovers such as .scr
        let builtin = ExtensionRegistry::default().extensions_for("text/plain");
        assert!(builtin.contains(&".scr".to_string()));
        assert!(!registry().extensions_for("TEXT/PLAIN").contains(&".scr".to_string()));
    }

    #[test]
    fn test_default_text_extensions() {
        let config = crate::config::StorageConfig::default();
        let exts = ExtensionRegistry::new(&config.extra_types).extensions_for("text/plain");
        assert_eq!(exts[0], ".txt");
        assert!(exts.contains(&".log".to_string()));
        assert!(!exts.contains(&".scr".to_string()));
    }

    #[test]
    fn test_extra_types_are_normalized() {
        let exts = registry().extensions_for("Application/X-DOSEXEC");
        assert_eq!(exts, vec![".exe".to_string(), ".dll".to_string()]);
    }

    #[test]
    fn test_builtin_table() {
        let exts = ExtensionRegistry::default().extensions_for("image/png");
        assert!(exts.contains(&".png".to_string()));
        assert!(ExtensionRegistry::default()
            .extensions_for("application/x-nothing-registered")
            .is_empty());
    }

    #[test]
    fn test_choose_keeps_valid_suggestion() {
        let registry = registry();
        assert_eq!(registry.choose_extension("image/jpeg", "cat.jpeg"), ".jpeg");
        assert_eq!(registry.choose_extension("image/jpeg", "cat.jpg"), ".jpg");
    }

    #[test]
    fn test_choose_replaces_invalid_suggestion() {
        let registry = registry();
        assert_eq!(registry.choose_extension("text/plain", "notes.bin"), ".txt");
        assert_eq!(registry.choose_extension("text/plain", "notes"), ".txt");
        assert_eq!(registry.choose_extension("image/png", "fake.exe"), ".png");
        assert_eq!(registry.choose_extension("inode/x-empty", "empty.txt"), "");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("exe"), Some(".exe".to_string()));
        assert_eq!(normalize(".PNG"), Some(".png".to_string()));
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("a/b"), None);
        assert_eq!(normalize("tar.gz"), None);
    }
}
