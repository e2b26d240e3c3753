use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::{CompanionError, Result};
use crate::models::{AudioFolderStatus, AudioMapping, BundleInfo, Fm26Installation, TeamMapping};
use crate::services::session::ResourceStore;

const TEAM_MAPPINGS_FILE: &str = "team_mappings.txt";
const AUDIO_MAPPINGS_FILE: &str = "audio_mappings.txt";

const AUDIO_EXTENSIONS: [&str; 3] = ["wav", "mp3", "ogg"];

fn team_mappings_path(install: &Fm26Installation) -> PathBuf {
    Path::new(&install.custom_stadium_path).join(TEAM_MAPPINGS_FILE)
}

fn audio_mappings_path(install: &Fm26Installation) -> PathBuf {
    Path::new(&install.audio_inject_path).join(AUDIO_MAPPINGS_FILE)
}

/// Read the ordered team -> stadium bundle mapping list. A missing file is
/// an empty list, like a missing config is its defaults.
pub fn read_team_mappings(install: &Fm26Installation) -> Result<Vec<TeamMapping>> {
    let path = team_mappings_path(install);
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&path)?;
    let mut mappings = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        let Some((id, bundle)) = line.split_once('=') else {
            return Err(CompanionError::Parse(format!(
                "{TEAM_MAPPINGS_FILE}: expected 'team_id=bundle', got '{line}'"
            )));
        };
        let team_id = id.trim().parse::<i32>().map_err(|_| {
            CompanionError::Parse(format!(
                "{TEAM_MAPPINGS_FILE}: invalid team id '{}'",
                id.trim()
            ))
        })?;
        mappings.push(TeamMapping {
            team_id,
            bundle_file: bundle.trim().to_string(),
        });
    }
    Ok(mappings)
}

pub fn write_team_mappings(install: &Fm26Installation, mappings: &[TeamMapping]) -> Result<()> {
    let dir = Path::new(&install.custom_stadium_path);
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    let mut content = String::from("## Team to stadium bundle mappings, one per line: team_id=bundle_file\n");
    for mapping in mappings {
        content.push_str(&format!("{}={}\n", mapping.team_id, mapping.bundle_file));
    }
    fs::write(team_mappings_path(install), content)?;
    Ok(())
}

/// Read the ordered team key -> audio folder mapping list. Keys are team
/// ids like "680" or "*" for the default entry.
pub fn read_audio_mappings(install: &Fm26Installation) -> Result<Vec<AudioMapping>> {
    let path = audio_mappings_path(install);
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&path)?;
    let mut mappings = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        let Some((key, folder)) = line.split_once('=') else {
            return Err(CompanionError::Parse(format!(
                "{AUDIO_MAPPINGS_FILE}: expected 'team_key=folder', got '{line}'"
            )));
        };
        mappings.push(AudioMapping {
            team_key: key.trim().to_string(),
            folder_name: folder.trim().to_string(),
        });
    }
    Ok(mappings)
}

pub fn write_audio_mappings(install: &Fm26Installation, mappings: &[AudioMapping]) -> Result<()> {
    let dir = Path::new(&install.audio_inject_path);
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    let mut content =
        String::from("## Team audio mappings, one per line: team_key=folder_name ('*' = default)\n");
    for mapping in mappings {
        content.push_str(&format!("{}={}\n", mapping.team_key, mapping.folder_name));
    }
    fs::write(audio_mappings_path(install), content)?;
    Ok(())
}

/// Stadium bundle files currently on disk, sorted by name.
pub fn list_bundles(install: &Fm26Installation) -> Result<Vec<BundleInfo>> {
    let dir = Path::new(&install.custom_stadium_path);
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut bundles = Vec::new();
    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if !path.is_file() || path.extension().map_or(true, |ext| ext != "bundle") {
            continue;
        }
        let modified = fs::metadata(&path).ok().and_then(|meta| {
            meta.modified().ok().map(|time| {
                let datetime: DateTime<Utc> = time.into();
                datetime.to_rfc3339()
            })
        });
        bundles.push(BundleInfo {
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default(),
            full_path: path.to_string_lossy().to_string(),
            exists: true,
            modified,
        });
    }
    bundles.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(bundles)
}

/// Audio folders available to the AudioInject plugin, sorted by name.
pub fn list_audio_folders(install: &Fm26Installation) -> Result<Vec<String>> {
    let dir = Path::new(&install.audio_inject_path);
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut folders = Vec::new();
    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if let Some(name) = path.file_name() {
                folders.push(name.to_string_lossy().to_string());
            }
        }
    }
    folders.sort();
    Ok(folders)
}

/// Check one audio folder for the files the plugin looks up by stem
/// (anthem, goal_home, goal_away) in any supported audio format.
pub fn inspect_audio_folder(
    install: &Fm26Installation,
    folder_name: &str,
) -> Result<AudioFolderStatus> {
    let path = Path::new(&install.audio_inject_path).join(folder_name);
    if !path.is_dir() {
        return Err(CompanionError::NotFound(format!(
            "Audio folder does not exist: {folder_name}"
        )));
    }

    let mut anthem_exists = false;
    let mut goal_home_exists = false;
    let mut goal_away_exists = false;
    let mut other_files = Vec::new();

    for entry in fs::read_dir(&path)?.flatten() {
        let file = entry.path();
        if !file.is_file() {
            continue;
        }
        let stem = file
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let is_audio = file
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy().to_lowercase();
                AUDIO_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false);

        match (is_audio, stem.as_str()) {
            (true, "anthem") => anthem_exists = true,
            (true, "goal_home") => goal_home_exists = true,
            (true, "goal_away") => goal_away_exists = true,
            _ => {
                if let Some(name) = file.file_name() {
                    other_files.push(name.to_string_lossy().to_string());
                }
            }
        }
    }
    other_files.sort();

    Ok(AudioFolderStatus {
        folder_name: folder_name.to_string(),
        path: path.to_string_lossy().to_string(),
        anthem_exists,
        goal_home_exists,
        goal_away_exists,
        other_files,
    })
}

/// Advisory validation for the team mapping table: duplicate ids and
/// bundles missing from the latest listing. Warnings are data, never an
/// error, and never block a save at this level.
pub fn validate_team_mappings(mappings: &[TeamMapping], known_bundles: &[String]) -> Vec<String> {
    let bundle_set: HashSet<&str> = known_bundles.iter().map(String::as_str).collect();
    let mut seen_ids = HashSet::new();
    let mut warnings = Vec::new();

    for mapping in mappings {
        if !seen_ids.insert(mapping.team_id) {
            warnings.push(format!("Duplicate team ID: {}", mapping.team_id));
        }
        if !bundle_set.contains(mapping.bundle_file.as_str()) {
            warnings.push(format!(
                "Bundle not found: {} (team {})",
                mapping.bundle_file, mapping.team_id
            ));
        }
    }
    warnings
}

/// Advisory validation for the audio mapping table.
pub fn validate_audio_mappings(mappings: &[AudioMapping], known_folders: &[String]) -> Vec<String> {
    let folder_set: HashSet<&str> = known_folders.iter().map(String::as_str).collect();
    let mut seen_keys = HashSet::new();
    let mut warnings = Vec::new();

    for mapping in mappings {
        if !seen_keys.insert(mapping.team_key.as_str()) {
            warnings.push(format!("Duplicate team key: {}", mapping.team_key));
        }
        if !folder_set.contains(mapping.folder_name.as_str()) {
            warnings.push(format!(
                "Audio folder not found: {} (team {})",
                mapping.folder_name, mapping.team_key
            ));
        }
    }
    warnings
}

pub struct TeamMappingStore {
    install: Fm26Installation,
}

impl TeamMappingStore {
    pub fn new(install: Fm26Installation) -> Self {
        Self { install }
    }
}

#[async_trait]
impl ResourceStore<Vec<TeamMapping>> for TeamMappingStore {
    async fn read(&self) -> Result<Vec<TeamMapping>> {
        read_team_mappings(&self.install)
    }

    async fn write(&self, value: &Vec<TeamMapping>) -> Result<()> {
        write_team_mappings(&self.install, value)
    }
}

pub struct AudioMappingStore {
    install: Fm26Installation,
}

impl AudioMappingStore {
    pub fn new(install: Fm26Installation) -> Self {
        Self { install }
    }
}

#[async_trait]
impl ResourceStore<Vec<AudioMapping>> for AudioMappingStore {
    async fn read(&self) -> Result<Vec<AudioMapping>> {
        read_audio_mappings(&self.install)
    }

    async fn write(&self, value: &Vec<AudioMapping>) -> Result<()> {
        write_audio_mappings(&self.install, value)
    }
}
