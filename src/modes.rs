//! Per-channel mode state and the translation language table.
//!
//! A mode registry maps a channel ID to whatever mode value a feature needs
//! (a target language, or a plain on/off toggle). Last write wins. State is
//! in-process only and cleared on shutdown.

use std::collections::HashMap;
use std::sync::Mutex;

/// Process-scoped channel → mode mapping.
///
/// Mutations happen inside a single lock acquisition, never across an await,
/// so the plain `Mutex` is enough under cooperative scheduling.
#[derive(Debug, Default)]
pub struct ChannelModes<M> {
    entries: Mutex<HashMap<u64, M>>,
}

impl<M: Clone> ChannelModes<M> {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    /// Set (or overwrite) the mode for a channel.
    pub fn set(&self, channel_id: u64, mode: M) {
        self.entries.lock().unwrap().insert(channel_id, mode);
    }

    /// Remove the mode for a channel. Returns whether one was set.
    pub fn clear(&self, channel_id: u64) -> bool {
        self.entries.lock().unwrap().remove(&channel_id).is_some()
    }

    pub fn get(&self, channel_id: u64) -> Option<M> {
        self.entries.lock().unwrap().get(&channel_id).cloned()
    }

    /// Drop all entries. Called on shutdown.
    pub fn clear_all(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// One language a channel can "become": its LibreTranslate code and the
/// marker suffix stamped onto rewritten content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub name: &'static str,
    pub target: &'static str,
    pub marker: &'static str,
}

/// Every language the translation backend supports, sorted by name.
pub const LANGUAGES: &[Language] = &[
    Language { name: "albanian", target: "sq", marker: " 🇦🇱" },
    Language { name: "arabic", target: "ar", marker: " 🇸🇦" },
    Language { name: "azerbaijani", target: "az", marker: " 🇦🇿" },
    Language { name: "basque", target: "eu", marker: " 🏴" },
    Language { name: "bengali", target: "bn", marker: " 🇧🇩" },
    Language { name: "bulgarian", target: "bg", marker: " 🇧🇬" },
    Language { name: "catalan", target: "ca", marker: " 🏴" },
    Language { name: "chinese", target: "zh", marker: " 🇨🇳" },
    Language { name: "chinese (traditional)", target: "zt", marker: " 🇹🇼" },
    Language { name: "czech", target: "cs", marker: " 🇨🇿" },
    Language { name: "danish", target: "da", marker: " 🇩🇰" },
    Language { name: "dutch", target: "nl", marker: " 🇳🇱" },
    Language { name: "esperanto", target: "eo", marker: " 🟢" },
    Language { name: "estonian", target: "et", marker: " 🇪🇪" },
    Language { name: "finnish", target: "fi", marker: " 🇫🇮" },
    Language { name: "french", target: "fr", marker: " 🇫🇷" },
    Language { name: "galician", target: "gl", marker: " 🏴" },
    Language { name: "german", target: "de", marker: " 🇩🇪" },
    Language { name: "greek", target: "el", marker: " 🇬🇷" },
    Language { name: "hebrew", target: "he", marker: " 🇮🇱" },
    Language { name: "hindi", target: "hi", marker: " 🇮🇳" },
    Language { name: "hungarian", target: "hu", marker: " 🇭🇺" },
    Language { name: "indonesian", target: "id", marker: " 🇮🇩" },
    Language { name: "irish", target: "ga", marker: " 🇮🇪" },
    Language { name: "italian", target: "it", marker: " 🇮🇹" },
    Language { name: "japanese", target: "ja", marker: " 🇯🇵" },
    Language { name: "korean", target: "ko", marker: " 🇰🇷" },
    Language { name: "kyrgyz", target: "ky", marker: " 🇰🇬" },
    Language { name: "latvian", target: "lv", marker: " 🇱🇻" },
    Language { name: "lithuanian", target: "lt", marker: " 🇱🇹" },
    Language { name: "malay", target: "ms", marker: " 🇲🇾" },
    Language { name: "norwegian", target: "nb", marker: " 🇳🇴" },
    Language { name: "persian", target: "fa", marker: " 🇮🇷" },
    Language { name: "polish", target: "pl", marker: " 🇵🇱" },
    Language { name: "portuguese", target: "pt", marker: " 🇵🇹" },
    Language { name: "portuguese-brazil", target: "pb", marker: " 🇧🇷" },
    Language { name: "romanian", target: "ro", marker: " 🇷🇴" },
    Language { name: "russian", target: "ru", marker: " 🇷🇺" },
    Language { name: "slovak", target: "sk", marker: " 🇸🇰" },
    Language { name: "slovenian", target: "sl", marker: " 🇸🇮" },
    Language { name: "spanish", target: "es", marker: " 🇪🇸" },
    Language { name: "swedish", target: "sv", marker: " 🇸🇪" },
    Language { name: "tagalog", target: "tl", marker: " 🇵🇭" },
    Language { name: "thai", target: "th", marker: " 🇹🇭" },
    Language { name: "turkish", target: "tr", marker: " 🇹🇷" },
    Language { name: "ukrainian", target: "uk", marker: " 🇺🇦" },
    Language { name: "urdu", target: "ur", marker: " 🇵🇰" },
    Language { name: "vietnamese", target: "vi", marker: " 🇻🇳" },
];

/// Look up a language by (case-insensitive) name.
pub fn find_language(name: &str) -> Option<&'static Language> {
    let lower = name.to_lowercase();
    LANGUAGES.iter().find(|l| l.name == lower)
}

#[cfg(test)]
mod tests {
    use super::{ChannelModes, LANGUAGES, find_language};

    #[test]
    fn set_get_clear_roundtrip() {
        let modes: ChannelModes<&'static str> = ChannelModes::new();
        assert_eq!(modes.get(1), None);

        modes.set(1, "fr");
        assert_eq!(modes.get(1), Some("fr"));

        // Last write wins.
        modes.set(1, "de");
        assert_eq!(modes.get(1), Some("de"));

        assert!(modes.clear(1));
        assert!(!modes.clear(1));
        assert_eq!(modes.get(1), None);
    }

    #[test]
    fn clear_all_drops_every_entry() {
        let modes: ChannelModes<()> = ChannelModes::new();
        modes.set(1, ());
        modes.set(2, ());
        modes.clear_all();
        assert_eq!(modes.get(1), None);
        assert_eq!(modes.get(2), None);
    }

    #[test]
    fn language_lookup_is_case_insensitive() {
        let lang = find_language("Japanese").expect("japanese should exist");
        assert_eq!(lang.target, "ja");
        assert!(find_language("klingon").is_none());
    }

    #[test]
    fn table_is_sorted_and_markers_are_suffixes() {
        let mut names: Vec<&str> = LANGUAGES.iter().map(|l| l.name).collect();
        let sorted = names.clone();
        names.sort_unstable();
        assert_eq!(names, sorted);
        assert!(LANGUAGES.iter().all(|l| l.marker.starts_with(' ')));
    }
}
