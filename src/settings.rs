//! Settings persistence using TOML
//!
//! Three documents live behind a key/value `Store`: the gameplay config,
//! the key bindings and the high-score table. With a `FileStore` they are
//! files in ~/.config/briks/ (or the platform equivalent).

use crate::engine::Action;
use crate::input::Command;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

const CONFIG_KEY: &str = "config.toml";
const KEYS_KEY: &str = "keys.toml";
const HIGH_SCORES_KEY: &str = "highscores.toml";

pub const MAX_HIGH_SCORES: usize = 10;

/// Opaque save/load interface for settings documents
pub trait Store {
    /// Contents stored under `key`, None if nothing was saved yet
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&mut self, key: &str, contents: &str) -> Result<()>;
}

/// One file per key in a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store in the platform config directory
    pub fn new() -> Result<Self> {
        let Some(dirs) = ProjectDirs::from("com", "briks", "briks") else {
            bail!("could not determine config directory");
        };
        Ok(Self::at(dirs.config_dir()))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Store for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.dir.join(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    fn write(&mut self, key: &str, contents: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let path = self.dir.join(key);
        fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))
    }
}

/// Keeps documents in memory; nothing outlives the process
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl Store for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, contents: &str) -> Result<()> {
        self.entries.insert(key.to_string(), contents.to_string());
        Ok(())
    }
}

/// All persisted state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub config: Config,
    pub keys: KeyBindings,
    pub high_scores: HighScores,
}

impl Settings {
    /// Load every document, falling back to defaults for missing or broken ones
    pub fn load(store: &impl Store) -> Self {
        let mut config: Config = load_document(store, CONFIG_KEY);
        config.validate();
        let mut high_scores: HighScores = load_document(store, HIGH_SCORES_KEY);
        high_scores.normalize();
        Self {
            config,
            keys: load_document(store, KEYS_KEY),
            high_scores,
        }
    }

    pub fn save(&self, store: &mut impl Store) -> Result<()> {
        save_document(store, CONFIG_KEY, &self.config)?;
        save_document(store, KEYS_KEY, &self.keys)?;
        save_document(store, HIGH_SCORES_KEY, &self.high_scores)
    }
}

fn load_document<T: DeserializeOwned + Default>(store: &impl Store, key: &str) -> T {
    match store.read(key) {
        Ok(Some(contents)) => toml::from_str(&contents).unwrap_or_else(|e| {
            warn!("ignoring malformed {}: {}", key, e);
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            warn!("could not load {}: {:#}", key, e);
            T::default()
        }
    }
}

fn save_document<T: Serialize>(store: &mut impl Store, key: &str, value: &T) -> Result<()> {
    let contents =
        toml::to_string_pretty(value).with_context(|| format!("failed to serialize {}", key))?;
    store.write(key, &contents)
}

/// Gameplay and display preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Color theme name, interpreted by the renderer
    pub theme: String,
    pub start_level: u32,
    /// Ghost piece visibility
    pub ghost_piece: bool,
    pub show_grid: bool,
    /// Upcoming pieces shown
    pub preview_count: usize,
    /// Delayed Auto Shift in milliseconds
    pub das_ms: u64,
    /// Auto Repeat Rate in milliseconds
    pub arr_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: "default".to_string(),
            start_level: 1,
            ghost_piece: true,
            show_grid: false,
            preview_count: 5,
            das_ms: 170,
            arr_ms: 50,
        }
    }
}

impl Config {
    /// Clamp every field into its supported range
    pub fn validate(&mut self) {
        self.start_level = self.start_level.clamp(1, 20);
        self.preview_count = self.preview_count.clamp(1, 5);
        self.das_ms = self.das_ms.clamp(50, 500);
        self.arr_ms = self.arr_ms.min(200);
    }
}

/// Key bindings (stored as strings for easy editing)
/// Each action can have one or more keys bound to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub move_left: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub move_right: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub soft_drop: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub hard_drop: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub rotate_cw: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub rotate_ccw: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub hold: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub pause: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub quit: Vec<String>,
}

/// Deserialize keys as either a single string or array of strings
fn deserialize_keys<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct KeysVisitor;

    impl<'de> Visitor<'de> for KeysVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or array of strings")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: de::SeqAccess<'de>,
        {
            let mut keys = Vec::new();
            while let Some(key) = seq.next_element::<String>()? {
                keys.push(key);
            }
            Ok(keys)
        }
    }

    deserializer.deserialize_any(KeysVisitor)
}

/// Serialize keys: single key as string, multiple as array
fn serialize_keys<S>(keys: &[String], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match keys {
        [key] => serializer.serialize_str(key),
        _ => serializer.collect_seq(keys),
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        let keys = |names: &[&str]| names.iter().map(|s| s.to_string()).collect();
        Self {
            move_left: keys(&["left", "a"]),
            move_right: keys(&["right", "d"]),
            soft_drop: keys(&["down", "s"]),
            hard_drop: keys(&["up", "space"]),
            rotate_cw: keys(&["w", "e"]),
            rotate_ccw: keys(&["q", "z"]),
            hold: keys(&["c", "shift+c"]),
            pause: keys(&["p", "esc"]),
            quit: keys(&["ctrl+c"]),
        }
    }
}

impl KeyBindings {
    /// Every command with its bound keys, in menu order
    pub fn entries(&self) -> [(Command, &[String]); 9] {
        [
            (Command::Play(Action::MoveLeft), self.move_left.as_slice()),
            (Command::Play(Action::MoveRight), self.move_right.as_slice()),
            (Command::Play(Action::SoftDrop), self.soft_drop.as_slice()),
            (Command::Play(Action::HardDrop), self.hard_drop.as_slice()),
            (Command::Play(Action::RotateCW), self.rotate_cw.as_slice()),
            (Command::Play(Action::RotateCCW), self.rotate_ccw.as_slice()),
            (Command::Play(Action::Hold), self.hold.as_slice()),
            (Command::Play(Action::Pause), self.pause.as_slice()),
            (Command::Quit, self.quit.as_slice()),
        ]
    }

    /// The command bound to a trigger string
    pub fn match_action(&self, trigger: &str) -> Option<Command> {
        self.entries()
            .into_iter()
            .find(|(_, keys)| keys.iter().any(|k| k.eq_ignore_ascii_case(trigger)))
            .map(|(command, _)| command)
    }

    pub fn keys_for(&self, command: Command) -> &[String] {
        match command {
            Command::Play(Action::MoveLeft) => &self.move_left,
            Command::Play(Action::MoveRight) => &self.move_right,
            Command::Play(Action::SoftDrop) => &self.soft_drop,
            Command::Play(Action::HardDrop) => &self.hard_drop,
            Command::Play(Action::RotateCW) => &self.rotate_cw,
            Command::Play(Action::RotateCCW) => &self.rotate_ccw,
            Command::Play(Action::Hold) => &self.hold,
            Command::Play(Action::Pause) => &self.pause,
            Command::Quit => &self.quit,
        }
    }

    pub fn set_binding(&mut self, command: Command, keys: Vec<String>) {
        let slot = match command {
            Command::Play(Action::MoveLeft) => &mut self.move_left,
            Command::Play(Action::MoveRight) => &mut self.move_right,
            Command::Play(Action::SoftDrop) => &mut self.soft_drop,
            Command::Play(Action::HardDrop) => &mut self.hard_drop,
            Command::Play(Action::RotateCW) => &mut self.rotate_cw,
            Command::Play(Action::RotateCCW) => &mut self.rotate_ccw,
            Command::Play(Action::Hold) => &mut self.hold,
            Command::Play(Action::Pause) => &mut self.pause,
            Command::Quit => &mut self.quit,
        };
        *slot = keys;
    }
}

/// High score table, best first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighScores {
    pub scores: Vec<HighScore>,
}

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScore {
    pub score: u64,
    pub level: u32,
    pub lines: u32,
    pub pieces: u32,
    /// Seconds since the Unix epoch
    pub timestamp: u64,
}

impl HighScore {
    /// An entry stamped with the current time
    pub fn now(score: u64, level: u32, lines: u32, pieces: u32) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self {
            score,
            level,
            lines,
            pieces,
            timestamp,
        }
    }
}

impl HighScores {
    /// Insert an entry and return its 1-based rank, or None if it did not
    /// make the table. Equal scores rank in insertion order.
    pub fn add(&mut self, entry: HighScore) -> Option<usize> {
        let index = self
            .scores
            .iter()
            .take_while(|existing| existing.score >= entry.score)
            .count();
        if index >= MAX_HIGH_SCORES {
            return None;
        }
        self.scores.insert(index, entry);
        self.scores.truncate(MAX_HIGH_SCORES);
        Some(index + 1)
    }

    /// Whether a score would make the table
    pub fn is_high_score(&self, score: u64) -> bool {
        match self.scores.get(MAX_HIGH_SCORES - 1) {
            Some(last) => score > last.score,
            None => true,
        }
    }

    pub fn best(&self) -> Option<u64> {
        self.scores.first().map(|e| e.score)
    }

    /// Restore ordering and the cap on a table read from disk
    fn normalize(&mut self) {
        // stable, so ties keep file order
        self.scores.sort_by(|a, b| b.score.cmp(&a.score));
        self.scores.truncate(MAX_HIGH_SCORES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(score: u64, timestamp: u64) -> HighScore {
        HighScore {
            score,
            level: 1,
            lines: 0,
            pieces: 0,
            timestamp,
        }
    }

    #[test]
    fn test_missing_documents_load_defaults() {
        let store = MemoryStore::default();
        assert_eq!(Settings::load(&store), Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let mut store = MemoryStore::default();
        let mut settings = Settings::default();
        settings.config.start_level = 7;
        settings.config.theme = "mono".to_string();
        settings.keys.set_binding(Command::Play(Action::Hold), vec!["tab".to_string()]);
        settings.high_scores.add(entry(1200, 1));

        settings.save(&mut store).unwrap();
        assert_eq!(Settings::load(&store), settings);
    }

    #[test]
    fn test_single_binding_written_as_string() {
        let mut store = MemoryStore::default();
        let mut settings = Settings::default();
        settings.keys.set_binding(Command::Quit, vec!["ctrl+q".to_string()]);
        settings.save(&mut store).unwrap();
        let text = store.read(KEYS_KEY).unwrap().unwrap();
        assert!(text.contains("quit = \"ctrl+q\""));
        let doc: toml::Table = toml::from_str(&text).unwrap();
        assert!(doc["quit"].is_str());
        assert_eq!(doc["move_left"].as_array().map(|a| a.len()), Some(2));
    }

    #[test]
    fn test_keys_accept_string_or_array() {
        let keys: KeyBindings = toml::from_str(
            r#"
            hold = "v"
            move_left = ["h", "left"]
            "#,
        )
        .unwrap();
        assert_eq!(keys.hold, vec!["v"]);
        assert_eq!(keys.move_left, vec!["h", "left"]);
        // unspecified actions keep defaults
        assert_eq!(keys.quit, vec!["ctrl+c"]);
    }

    #[test]
    fn test_malformed_document_falls_back() {
        let mut store = MemoryStore::default();
        store.write(CONFIG_KEY, "start_level = \"fast\"").unwrap();
        store.write(KEYS_KEY, "hold = 3").unwrap();
        let settings = Settings::load(&store);
        assert_eq!(settings.config, Config::default());
        assert_eq!(settings.keys, KeyBindings::default());
    }

    #[test]
    fn test_config_is_clamped_on_load() {
        let mut store = MemoryStore::default();
        store
            .write(
                CONFIG_KEY,
                "start_level = 99\npreview_count = 0\ndas_ms = 10\narr_ms = 900\n",
            )
            .unwrap();
        let config = Settings::load(&store).config;
        assert_eq!(config.start_level, 20);
        assert_eq!(config.preview_count, 1);
        assert_eq!(config.das_ms, 50);
        assert_eq!(config.arr_ms, 200);
        assert!(config.ghost_piece);
    }

    #[test]
    fn test_match_action() {
        let keys = KeyBindings::default();
        assert_eq!(keys.match_action("left"), Some(Command::Play(Action::MoveLeft)));
        assert_eq!(keys.match_action("space"), Some(Command::Play(Action::HardDrop)));
        assert_eq!(keys.match_action("shift+c"), Some(Command::Play(Action::Hold)));
        assert_eq!(keys.match_action("ctrl+c"), Some(Command::Quit));
        assert_eq!(keys.match_action("f"), None);
        for (command, bound) in keys.entries() {
            assert_eq!(keys.keys_for(command), bound);
        }
    }

    #[test]
    fn test_high_scores_sorted_with_stable_ties() {
        let mut table = HighScores::default();
        assert_eq!(table.add(entry(500, 1)), Some(1));
        assert_eq!(table.add(entry(900, 2)), Some(1));
        assert_eq!(table.add(entry(500, 3)), Some(3));
        let order: Vec<_> = table.scores.iter().map(|e| e.timestamp).collect();
        assert_eq!(order, vec![2, 1, 3]);
        assert_eq!(table.best(), Some(900));
    }

    #[test]
    fn test_high_scores_capped() {
        let mut table = HighScores::default();
        for i in 0..MAX_HIGH_SCORES as u64 {
            table.add(entry(100 * (i + 1), i));
        }
        assert!(!table.is_high_score(100));
        assert!(table.is_high_score(101));
        assert_eq!(table.add(entry(100, 99)), None);
        assert_eq!(table.add(entry(150, 100)), Some(MAX_HIGH_SCORES));
        assert_eq!(table.scores.len(), MAX_HIGH_SCORES);
        assert_eq!(table.scores.last().map(|e| e.score), Some(150));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("briks-store-{}", std::process::id()));
        let mut store = FileStore::at(&dir);
        assert_eq!(store.read("missing.toml").unwrap(), None);
        store.write("a.toml", "x = 1").unwrap();
        assert_eq!(store.read("a.toml").unwrap().as_deref(), Some("x = 1"));
        let _ = fs::remove_dir_all(&dir);
    }
}
