use serde::{Deserialize, Serialize};

/// A validated FM26 installation with all paths the companion touches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fm26Installation {
    pub root_path: String,
    pub bep_in_ex_path: String,
    pub plugins_path: String,
    pub custom_stadium_path: String,
    pub audio_inject_path: String,
    pub config_path: String,
    pub log_path: String,
}

/// Status of a single BepInEx plugin DLL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginStatus {
    pub name: String,
    pub path: String,
    pub installed: bool,
}

/// Whether BepInEx is already present, for the overwrite warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BepInExStatus {
    pub installed: bool,
    pub path: String,
    pub has_plugins: bool,
    pub plugin_count: u32,
}

/// A stadium bundle file under the CustomStadium plugin directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleInfo {
    pub file_name: String,
    pub full_path: String,
    pub exists: bool,
    /// ISO 8601 timestamp of the last modification, when available.
    pub modified: Option<String>,
}

/// Team to stadium bundle mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMapping {
    pub team_id: i32,
    pub bundle_file: String,
}

/// Team to audio folder mapping. `team_key` is a team id like "680" or
/// "*" for the default entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioMapping {
    pub team_key: String,
    pub folder_name: String,
}

/// Contents of one audio folder, checked against the files the plugin
/// expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFolderStatus {
    pub folder_name: String,
    pub path: String,
    pub anthem_exists: bool,
    pub goal_home_exists: bool,
    pub goal_away_exists: bool,
    pub other_files: Vec<String>,
}

/// Configuration for the StadiumInjection plugin.
///
/// Config records derive `PartialEq` so dirty state is a structural
/// comparison on the domain type, not a comparison of serialized
/// snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StadiumInjectionConfig {
    pub enable_custom_stadiums: bool,
    pub replace_all_stadiums: bool,
    pub default_bundle: String,
    pub use_custom_pitch_dimensions: bool,
    pub pitch_length: i32,
    pub pitch_width: i32,
}

impl Default for StadiumInjectionConfig {
    fn default() -> Self {
        Self {
            enable_custom_stadiums: true,
            replace_all_stadiums: false,
            default_bundle: String::new(),
            use_custom_pitch_dimensions: false,
            pitch_length: 105,
            pitch_width: 68,
        }
    }
}

/// Configuration for the AudioInject plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioInjectConfig {
    pub enable_audio_injection: bool,
    pub master_volume: f32,
    pub debug_mode: bool,
    pub music_volume: f32,
    pub event_volume: f32,
    pub loop_music: bool,
}

impl Default for AudioInjectConfig {
    fn default() -> Self {
        Self {
            enable_audio_injection: true,
            master_volume: 1.0,
            debug_mode: false,
            music_volume: 1.0,
            event_volume: 1.0,
            loop_music: true,
        }
    }
}

/// Configuration for the CrowdInject plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrowdInjectConfig {
    pub enable_crowd_injection: bool,
    pub crowd_density: i32,
    pub always_full_capacity: bool,
    pub debug_mode: bool,
    pub crowd_skip_rate: i32,
    pub use_billboards: bool,
    pub use_fm_crowd_render: bool,
    pub use_gpu_instancing: bool,
    pub use_team_colors: bool,
}

impl Default for CrowdInjectConfig {
    fn default() -> Self {
        Self {
            enable_crowd_injection: true,
            crowd_density: 100,
            always_full_capacity: false,
            debug_mode: false,
            crowd_skip_rate: 4,
            use_billboards: false,
            use_fm_crowd_render: false,
            use_gpu_instancing: false,
            use_team_colors: true,
        }
    }
}

/// Adboards settings stored inside the StadiumInjection config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdboardsConfig {
    pub disable_adboards: bool,
}

/// Metadata about the BepInEx log file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogInfo {
    pub exists: bool,
    pub size_bytes: u64,
    pub modified: Option<String>,
    pub path: String,
}
