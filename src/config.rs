use serde::{Deserialize, Serialize};

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

// ── Final (merged) config types ──

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub commands: Commands,
    #[serde(default)]
    pub files: Files,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Settings {
    /// Recognize `[regex]`/`[glob]`/`[native]` pattern prefixes.
    #[serde(default = "default_true")]
    pub extended_syntax: bool,
    /// Append decisions to the decision log.
    #[serde(default = "default_true")]
    pub log_decisions: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            extended_syntax: true,
            log_decisions: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Pattern lists applied to shell commands (the Bash tool).
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Commands {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
}

/// Glob pattern lists applied to file-path tools (Read/Write/Edit).
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Files {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    settings: SettingsOverlay,
    #[serde(default)]
    commands: ListOverlay,
    #[serde(default)]
    files: ListOverlay,
}

#[derive(Debug, Deserialize, Default)]
struct SettingsOverlay {
    extended_syntax: Option<bool>,
    log_decisions: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct ListOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    allow: Vec<String>,
    #[serde(default)]
    deny: Vec<String>,
    #[serde(default)]
    remove_allow: Vec<String>,
    #[serde(default)]
    remove_deny: Vec<String>,
}

// ── Merge logic ──

/// Merge a user list into a default list.
/// In replace mode: user list replaces default entirely.
/// In merge mode: remove items first, then extend with additions (deduped).
fn merge_list(base: &mut Vec<String>, add: Vec<String>, remove: &[String], replace: bool) {
    if replace {
        *base = add;
    } else {
        base.retain(|item| !remove.contains(item));
        for item in add {
            if !base.contains(&item) {
                base.push(item);
            }
        }
    }
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge user overlay from `SHELLGUARD_CONFIG` if set, otherwise
    ///    `~/.config/shellguard/config.toml` (if it exists)
    ///
    /// User config merges with defaults: lists extend, scalars override.
    /// Set `replace = true` in a section to replace its defaults entirely.
    /// Use `remove_allow` / `remove_deny` to subtract specific items.
    pub fn load() -> Self {
        let mut config = Self::default_config();
        if let Some(overlay) = Self::load_overlay() {
            config.apply_overlay(overlay);
        }
        config
    }

    fn overlay_path() -> Option<std::path::PathBuf> {
        if let Some(path) = std::env::var_os("SHELLGUARD_CONFIG") {
            if path.is_empty() {
                return None;
            }
            return Some(std::path::PathBuf::from(path));
        }
        let home = std::env::var_os("HOME")?;
        Some(std::path::Path::new(&home).join(".config/shellguard/config.toml"))
    }

    fn load_overlay() -> Option<ConfigOverlay> {
        let path = Self::overlay_path()?;
        let content = std::fs::read_to_string(&path).ok()?;
        match toml::from_str(&content) {
            Ok(overlay) => Some(overlay),
            Err(e) => {
                log::warn!("config parse error in {}: {e}", path.display());
                eprintln!("shellguard: config parse error: {e}");
                None
            }
        }
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        if let Some(v) = overlay.settings.extended_syntax {
            self.settings.extended_syntax = v;
        }
        if let Some(v) = overlay.settings.log_decisions {
            self.settings.log_decisions = v;
        }

        let c = overlay.commands;
        merge_list(&mut self.commands.allow, c.allow, &c.remove_allow, c.replace);
        merge_list(&mut self.commands.deny, c.deny, &c.remove_deny, c.replace);

        let f = overlay.files;
        merge_list(&mut self.files.allow, f.allow, &f.remove_allow, f.replace);
        merge_list(&mut self.files.deny, f.deny, &f.remove_deny, f.replace);
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}
