//! Connection profiles: load/save simple JSON mapping of profile name -> { url, token, interval_ms }
//! Stored under XDG config dir: $XDG_CONFIG_HOME/dockwatch/profiles.json (fallback: platform config dir)

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProfileEntry {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfilesFile {
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileEntry>,
    #[serde(default)]
    pub version: u32,
}

pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("dockwatch")
    } else {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dockwatch")
    }
}

pub fn profiles_path() -> PathBuf {
    config_dir().join("profiles.json")
}

/// Missing or unreadable files give an empty set.
pub fn load_profiles() -> ProfilesFile {
    let path = profiles_path();
    match fs::read_to_string(&path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed profiles file");
            ProfilesFile::default()
        }),
        Err(_) => ProfilesFile::default(),
    }
}

pub fn save_profiles(p: &ProfilesFile) -> Result<()> {
    let path = profiles_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec_pretty(p)?;
    fs::write(path, data)?;
    Ok(())
}

#[derive(Debug, PartialEq)]
pub enum ResolveProfile {
    /// Use the provided runtime inputs (maybe persisted by the caller)
    Direct(ProfileEntry),
    /// Loaded from an existing profile entry
    Loaded(ProfileEntry),
    /// Should prompt user to select among profile names
    PromptSelect(Vec<String>),
    /// Should prompt user to create a new profile (name)
    PromptCreate(String),
    /// No profile could be resolved (e.g., missing arguments)
    None,
}

pub struct ProfileRequest {
    pub profile_name: Option<String>,
    pub url: Option<String>,
    pub token: Option<String>,
    pub interval_ms: Option<u64>,
}

impl ProfileRequest {
    pub fn resolve(self, pf: &ProfilesFile) -> ResolveProfile {
        match (self.url, self.profile_name) {
            // URL given -> direct (maybe later saved by caller)
            (Some(url), _) => ResolveProfile::Direct(ProfileEntry {
                url,
                token: self.token,
                interval_ms: self.interval_ms,
            }),
            // only profile name given -> try load
            (None, Some(name)) => match pf.profiles.get(&name) {
                Some(entry) => {
                    let mut entry = entry.clone();
                    // command line overrides stored values for this run
                    if self.token.is_some() {
                        entry.token = self.token;
                    }
                    if self.interval_ms.is_some() {
                        entry.interval_ms = self.interval_ms;
                    }
                    ResolveProfile::Loaded(entry)
                }
                None => ResolveProfile::PromptCreate(name),
            },
            (None, None) if pf.profiles.is_empty() => ResolveProfile::None,
            (None, None) => ResolveProfile::PromptSelect(pf.profiles.keys().cloned().collect()),
        }
    }
}

/// What to do with a directly given URL for a named profile.
#[derive(Debug, PartialEq, Eq)]
pub enum SaveDecision {
    /// New profile: write it
    Create,
    /// Existing profile differs: write only if confirmed (or `--save`)
    Overwrite,
    /// Existing profile is identical
    Unchanged,
}

pub fn save_decision(pf: &ProfilesFile, name: &str, entry: &ProfileEntry) -> SaveDecision {
    match pf.profiles.get(name) {
        None => SaveDecision::Create,
        Some(existing) if existing == entry => SaveDecision::Unchanged,
        Some(_) => SaveDecision::Overwrite,
    }
}

pub fn validate_interval(ms: u64) -> Result<u64> {
    if ms < 250 {
        return Err(Error::Config(format!(
            "refresh interval {ms}ms is too short (minimum 250ms)"
        )));
    }
    Ok(ms)
}
