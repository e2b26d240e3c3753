use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::errors::Result;
use crate::models::{
    AdboardsConfig, AudioInjectConfig, CrowdInjectConfig, Fm26Installation,
    StadiumInjectionConfig,
};
use crate::services::session::ResourceStore;
use crate::utils::cfg_text::{format_bool, key_values, parse_bool, parse_float, parse_int};

const STADIUM_INJECTION_CONFIG: &str = "com.bassy.fm26.stadiuminjection.cfg";
const AUDIO_INJECT_CONFIG: &str = "com.bassy.fm26.audioinject.cfg";
const CROWD_INJECT_CONFIG: &str = "com.bassy.fm26.crowdinject.cfg";

fn config_file(install: &Fm26Installation, file_name: &str) -> PathBuf {
    Path::new(&install.config_path).join(file_name)
}

fn ensure_config_dir(install: &Fm26Installation) -> Result<()> {
    let dir = Path::new(&install.config_path);
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Read the StadiumInjection plugin configuration. A missing file yields
/// the plugin's defaults, matching what BepInEx would create on first run.
pub fn read_stadium_injection_config(install: &Fm26Installation) -> Result<StadiumInjectionConfig> {
    let path = config_file(install, STADIUM_INJECTION_CONFIG);
    if !path.exists() {
        return Ok(StadiumInjectionConfig::default());
    }
    let content = fs::read_to_string(&path)?;
    Ok(parse_stadium_injection_config(&content))
}

pub fn write_stadium_injection_config(
    install: &Fm26Installation,
    config: &StadiumInjectionConfig,
) -> Result<()> {
    ensure_config_dir(install)?;
    let content = format_stadium_injection_config(config);
    fs::write(config_file(install, STADIUM_INJECTION_CONFIG), content)?;
    Ok(())
}

pub fn read_audio_inject_config(install: &Fm26Installation) -> Result<AudioInjectConfig> {
    let path = config_file(install, AUDIO_INJECT_CONFIG);
    if !path.exists() {
        return Ok(AudioInjectConfig::default());
    }
    let content = fs::read_to_string(&path)?;
    Ok(parse_audio_inject_config(&content))
}

pub fn write_audio_inject_config(
    install: &Fm26Installation,
    config: &AudioInjectConfig,
) -> Result<()> {
    ensure_config_dir(install)?;
    let content = format_audio_inject_config(config);
    fs::write(config_file(install, AUDIO_INJECT_CONFIG), content)?;
    Ok(())
}

pub fn read_crowd_inject_config(install: &Fm26Installation) -> Result<CrowdInjectConfig> {
    let path = config_file(install, CROWD_INJECT_CONFIG);
    if !path.exists() {
        return Ok(CrowdInjectConfig::default());
    }
    let content = fs::read_to_string(&path)?;
    Ok(parse_crowd_inject_config(&content))
}

pub fn write_crowd_inject_config(
    install: &Fm26Installation,
    config: &CrowdInjectConfig,
) -> Result<()> {
    ensure_config_dir(install)?;
    let content = format_crowd_inject_config(config);
    fs::write(config_file(install, CROWD_INJECT_CONFIG), content)?;
    Ok(())
}

/// Adboards settings live inside the StadiumInjection file.
pub fn read_adboards_config(install: &Fm26Installation) -> Result<AdboardsConfig> {
    let path = config_file(install, STADIUM_INJECTION_CONFIG);
    if !path.exists() {
        return Ok(AdboardsConfig::default());
    }
    let content = fs::read_to_string(&path)?;
    Ok(parse_adboards_config(&content))
}

/// Rewrites only the `[Adboards]` section of the StadiumInjection file,
/// preserving every other line.
pub fn write_adboards_config(install: &Fm26Installation, config: &AdboardsConfig) -> Result<()> {
    let path = config_file(install, STADIUM_INJECTION_CONFIG);
    let existing = if path.exists() {
        fs::read_to_string(&path).unwrap_or_default()
    } else {
        String::new()
    };

    let content = update_adboards_in_config(&existing, config);
    ensure_config_dir(install)?;
    fs::write(&path, content)?;
    Ok(())
}

/// Sorted names of all `.cfg` files in the BepInEx config directory.
pub fn list_config_files(install: &Fm26Installation) -> Result<Vec<String>> {
    let dir = Path::new(&install.config_path);
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == "cfg") {
            if let Some(name) = path.file_name() {
                names.push(name.to_string_lossy().to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

fn parse_stadium_injection_config(content: &str) -> StadiumInjectionConfig {
    let mut config = StadiumInjectionConfig::default();
    for (key, value) in key_values(content) {
        match key {
            "EnableCustomStadiums" => config.enable_custom_stadiums = parse_bool(value),
            "ReplaceAllStadiums" => config.replace_all_stadiums = parse_bool(value),
            "DefaultBundle" => config.default_bundle = value.to_string(),
            "UseCustomPitchDimensions" => config.use_custom_pitch_dimensions = parse_bool(value),
            "PitchLength" => config.pitch_length = parse_float(value) as i32,
            "PitchWidth" => config.pitch_width = parse_float(value) as i32,
            _ => {}
        }
    }
    config
}

fn format_stadium_injection_config(config: &StadiumInjectionConfig) -> String {
    let mut content = String::new();

    content.push_str("## Settings file was created by plugin Stadium Injection\n");
    content.push_str("## Plugin GUID: com.bassy.fm26.stadiuminjection\n\n");

    content.push_str("[General]\n\n");

    content.push_str("## Enable or disable custom stadium injection entirely\n");
    content.push_str(&format!(
        "EnableCustomStadiums = {}\n\n",
        format_bool(config.enable_custom_stadiums)
    ));

    content.push_str("## If true, replace ALL stadiums. If false, only replace stadiums listed in StadiumMappings\n");
    content.push_str(&format!(
        "ReplaceAllStadiums = {}\n\n",
        format_bool(config.replace_all_stadiums)
    ));

    content.push_str("## Default stadium bundle to use when ReplaceAllStadiums is true\n");
    content.push_str(&format!("DefaultBundle = {}\n\n", config.default_bundle));

    content.push_str("[PitchDimensions]\n\n");

    content.push_str("## If true, use the custom pitch dimensions below for goal/corner flag placement\n");
    content.push_str(&format!(
        "UseCustomPitchDimensions = {}\n\n",
        format_bool(config.use_custom_pitch_dimensions)
    ));

    content.push_str("## Pitch length in meters (goal-to-goal distance). Standard FIFA: 105m\n");
    content.push_str(&format!("PitchLength = {}\n\n", config.pitch_length));

    content.push_str("## Pitch width in meters (sideline-to-sideline distance). Standard FIFA: 68m\n");
    content.push_str(&format!("PitchWidth = {}\n", config.pitch_width));

    content
}

fn parse_audio_inject_config(content: &str) -> AudioInjectConfig {
    let mut config = AudioInjectConfig::default();
    for (key, value) in key_values(content) {
        match key {
            "EnableAudioInjection" => config.enable_audio_injection = parse_bool(value),
            "MasterVolume" => config.master_volume = parse_float(value),
            "DebugMode" => config.debug_mode = parse_bool(value),
            "MusicVolume" => config.music_volume = parse_float(value),
            "EventVolume" => config.event_volume = parse_float(value),
            "LoopMusic" => config.loop_music = parse_bool(value),
            _ => {}
        }
    }
    config
}

fn format_audio_inject_config(config: &AudioInjectConfig) -> String {
    let mut content = String::new();

    content.push_str("## Settings file was created by plugin Audio Injection\n");
    content.push_str("## Plugin GUID: com.bassy.fm26.audioinject\n\n");

    content.push_str("[General]\n\n");

    content.push_str("## Master toggle for audio injection\n");
    content.push_str(&format!(
        "EnableAudioInjection = {}\n\n",
        format_bool(config.enable_audio_injection)
    ));

    content.push_str("## Master volume (0.0 to 1.0)\n");
    content.push_str(&format!("MasterVolume = {}\n\n", config.master_volume));

    content.push_str("## Enable verbose logging\n");
    content.push_str(&format!(
        "DebugMode = {}\n\n",
        format_bool(config.debug_mode)
    ));

    content.push_str("[Audio]\n\n");

    content.push_str("## Music channel volume (anthems, halftime)\n");
    content.push_str(&format!("MusicVolume = {}\n\n", config.music_volume));

    content.push_str("## Event channel volume (goals, reactions)\n");
    content.push_str(&format!("EventVolume = {}\n\n", config.event_volume));

    content.push_str("## Loop music tracks\n");
    content.push_str(&format!("LoopMusic = {}\n", format_bool(config.loop_music)));

    content
}

fn parse_crowd_inject_config(content: &str) -> CrowdInjectConfig {
    let mut config = CrowdInjectConfig::default();
    for (key, value) in key_values(content) {
        match key {
            "EnableCrowdInjection" => config.enable_crowd_injection = parse_bool(value),
            "CrowdDensity" => config.crowd_density = parse_int(value, 100),
            "AlwaysFullCapacity" => config.always_full_capacity = parse_bool(value),
            "DebugMode" => config.debug_mode = parse_bool(value),
            "CrowdSkipRate" => config.crowd_skip_rate = parse_int(value, 4),
            "UseBillboards" => config.use_billboards = parse_bool(value),
            "UseFMCrowdRender" => config.use_fm_crowd_render = parse_bool(value),
            "UseGPUInstancing" => config.use_gpu_instancing = parse_bool(value),
            "UseTeamColors" => config.use_team_colors = parse_bool(value),
            _ => {}
        }
    }
    config
}

fn format_crowd_inject_config(config: &CrowdInjectConfig) -> String {
    let mut content = String::new();

    content.push_str("## Settings file was created by plugin Dynamic Crowd Injection\n");
    content.push_str("## Plugin GUID: com.bassy.fm26.crowdinject\n\n");

    content.push_str("[General]\n\n");

    content.push_str("## Enable or disable crowd injection for custom stadiums\n");
    content.push_str(&format!(
        "EnableCrowdInjection = {}\n\n",
        format_bool(config.enable_crowd_injection)
    ));

    content.push_str("## Crowd density percentage (10-100). Lower values = fewer people in stands.\n");
    content.push_str(&format!("CrowdDensity = {}\n\n", config.crowd_density));

    content.push_str("## When true, always fill stadium to 100% capacity regardless of real match attendance.\n");
    content.push_str(&format!(
        "AlwaysFullCapacity = {}\n\n",
        format_bool(config.always_full_capacity)
    ));

    content.push_str("## Enable verbose logging for debugging crowd placement\n");
    content.push_str(&format!(
        "DebugMode = {}\n\n",
        format_bool(config.debug_mode)
    ));

    content.push_str("[Performance]\n\n");

    content.push_str("## Only render every Nth seat (1=all, 2=50%, 4=25%, 8=12.5%). Higher = better performance.\n");
    content.push_str(&format!("CrowdSkipRate = {}\n\n", config.crowd_skip_rate));

    content.push_str("[Rendering]\n\n");

    content.push_str("## Use 2D billboard sprites instead of 3D crowd models. Better performance but lower quality.\n");
    content.push_str(&format!(
        "UseBillboards = {}\n\n",
        format_bool(config.use_billboards)
    ));

    content.push_str("## EXPERIMENTAL: Use FM26's native CrowdRender system (GPU instanced, high performance).\n");
    content.push_str(&format!(
        "UseFMCrowdRender = {}\n\n",
        format_bool(config.use_fm_crowd_render)
    ));

    content.push_str("## EXPERIMENTAL: Skip AUDIAREA crowd creation for GPU instancing tests.\n");
    content.push_str(&format!(
        "UseGPUInstancing = {}\n\n",
        format_bool(config.use_gpu_instancing)
    ));

    content.push_str("## Apply team colors from FM26 match data to crowd clothing.\n");
    content.push_str(&format!(
        "UseTeamColors = {}\n",
        format_bool(config.use_team_colors)
    ));

    content
}

fn parse_adboards_config(content: &str) -> AdboardsConfig {
    let mut config = AdboardsConfig::default();
    for (key, value) in key_values(content) {
        if key == "DisableAdboards" {
            config.disable_adboards = parse_bool(value);
        }
    }
    config
}

/// Updates the `[Adboards]` section in place, appending the section when
/// the file never had one.
fn update_adboards_in_config(existing_content: &str, config: &AdboardsConfig) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut found_adboards_section = false;
    let mut found_disable_adboards = false;
    let mut in_adboards_section = false;

    for line in existing_content.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            // Leaving the Adboards section without having seen the key.
            if in_adboards_section && !found_disable_adboards {
                lines.push(format!(
                    "DisableAdboards = {}",
                    format_bool(config.disable_adboards)
                ));
                lines.push(String::new());
                found_disable_adboards = true;
            }

            in_adboards_section = trimmed == "[Adboards]";
            if in_adboards_section {
                found_adboards_section = true;
            }
        }

        if in_adboards_section && trimmed.starts_with("DisableAdboards") {
            lines.push(format!(
                "DisableAdboards = {}",
                format_bool(config.disable_adboards)
            ));
            found_disable_adboards = true;
            continue;
        }

        lines.push(line.to_string());
    }

    if in_adboards_section && !found_disable_adboards {
        lines.push(format!(
            "DisableAdboards = {}",
            format_bool(config.disable_adboards)
        ));
    }

    if !found_adboards_section {
        lines.push(String::new());
        lines.push("[Adboards]".to_string());
        lines.push(String::new());
        lines.push("## If true, hide all adboards in the stadium.".to_string());
        lines.push(format!(
            "DisableAdboards = {}",
            format_bool(config.disable_adboards)
        ));
    }

    lines.join("\n")
}

/// `ResourceStore` adapters so each config record edits through an
/// `EditableResource` session.
pub struct StadiumConfigStore {
    install: Fm26Installation,
}

impl StadiumConfigStore {
    pub fn new(install: Fm26Installation) -> Self {
        Self { install }
    }
}

#[async_trait]
impl ResourceStore<StadiumInjectionConfig> for StadiumConfigStore {
    async fn read(&self) -> Result<StadiumInjectionConfig> {
        read_stadium_injection_config(&self.install)
    }

    async fn write(&self, value: &StadiumInjectionConfig) -> Result<()> {
        write_stadium_injection_config(&self.install, value)
    }
}

pub struct AudioConfigStore {
    install: Fm26Installation,
}

impl AudioConfigStore {
    pub fn new(install: Fm26Installation) -> Self {
        Self { install }
    }
}

#[async_trait]
impl ResourceStore<AudioInjectConfig> for AudioConfigStore {
    async fn read(&self) -> Result<AudioInjectConfig> {
        read_audio_inject_config(&self.install)
    }

    async fn write(&self, value: &AudioInjectConfig) -> Result<()> {
        write_audio_inject_config(&self.install, value)
    }
}

pub struct CrowdConfigStore {
    install: Fm26Installation,
}

impl CrowdConfigStore {
    pub fn new(install: Fm26Installation) -> Self {
        Self { install }
    }
}

#[async_trait]
impl ResourceStore<CrowdInjectConfig> for CrowdConfigStore {
    async fn read(&self) -> Result<CrowdInjectConfig> {
        read_crowd_inject_config(&self.install)
    }

    async fn write(&self, value: &CrowdInjectConfig) -> Result<()> {
        write_crowd_inject_config(&self.install, value)
    }
}

pub struct AdboardsConfigStore {
    install: Fm26Installation,
}

impl AdboardsConfigStore {
    pub fn new(install: Fm26Installation) -> Self {
        Self { install }
    }
}

#[async_trait]
impl ResourceStore<AdboardsConfig> for AdboardsConfigStore {
    async fn read(&self) -> Result<AdboardsConfig> {
        read_adboards_config(&self.install)
    }

    async fn write(&self, value: &AdboardsConfig) -> Result<()> {
        write_adboards_config(&self.install, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::install::inspect_install;

    fn temp_install() -> Fm26Installation {
        let root = std::env::temp_dir().join(format!("companion-configs-test-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(root.join("data")).expect("create fake install");
        inspect_install(root.to_string_lossy().as_ref()).expect("inspect fake install")
    }

    #[test]
    fn stadium_config_round_trips() {
        let install = temp_install();
        let config = StadiumInjectionConfig {
            enable_custom_stadiums: false,
            replace_all_stadiums: true,
            default_bundle: "anfield.bundle".to_string(),
            use_custom_pitch_dimensions: true,
            pitch_length: 100,
            pitch_width: 64,
        };
        write_stadium_injection_config(&install, &config).unwrap();
        let loaded = read_stadium_injection_config(&install).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_files_read_as_defaults() {
        let install = temp_install();
        assert_eq!(
            read_stadium_injection_config(&install).unwrap(),
            StadiumInjectionConfig::default()
        );
        assert_eq!(
            read_audio_inject_config(&install).unwrap(),
            AudioInjectConfig::default()
        );
        assert_eq!(
            read_crowd_inject_config(&install).unwrap(),
            CrowdInjectConfig::default()
        );
        assert_eq!(
            read_adboards_config(&install).unwrap(),
            AdboardsConfig::default()
        );
    }

    #[test]
    fn audio_config_round_trips() {
        let install = temp_install();
        let config = AudioInjectConfig {
            enable_audio_injection: false,
            master_volume: 0.75,
            debug_mode: true,
            music_volume: 0.5,
            event_volume: 0.25,
            loop_music: false,
        };
        write_audio_inject_config(&install, &config).unwrap();
        assert_eq!(read_audio_inject_config(&install).unwrap(), config);
    }

    #[test]
    fn crowd_config_round_trips() {
        let install = temp_install();
        let config = CrowdInjectConfig {
            enable_crowd_injection: true,
            crowd_density: 40,
            always_full_capacity: true,
            debug_mode: true,
            crowd_skip_rate: 8,
            use_billboards: true,
            use_fm_crowd_render: true,
            use_gpu_instancing: false,
            use_team_colors: false,
        };
        write_crowd_inject_config(&install, &config).unwrap();
        assert_eq!(read_crowd_inject_config(&install).unwrap(), config);
    }

    #[test]
    fn unknown_keys_and_comments_are_ignored() {
        let content = "## banner\n[General]\nEnableAudioInjection = off\nFutureKnob = 3\nMasterVolume = 0.5\n";
        let config = parse_audio_inject_config(content);
        assert!(!config.enable_audio_injection);
        assert_eq!(config.master_volume, 0.5);
    }

    #[test]
    fn adboards_write_preserves_other_sections() {
        let install = temp_install();
        let stadium = StadiumInjectionConfig {
            default_bundle: "wembley.bundle".to_string(),
            ..StadiumInjectionConfig::default()
        };
        write_stadium_injection_config(&install, &stadium).unwrap();

        write_adboards_config(&install, &AdboardsConfig { disable_adboards: true }).unwrap();

        // The stadium settings survive the adboards update.
        let reloaded = read_stadium_injection_config(&install).unwrap();
        assert_eq!(reloaded, stadium);
        assert!(read_adboards_config(&install).unwrap().disable_adboards);

        // Flipping the flag updates the existing section instead of
        // appending a second one.
        write_adboards_config(&install, &AdboardsConfig { disable_adboards: false }).unwrap();
        let content = fs::read_to_string(
            Path::new(&install.config_path).join(STADIUM_INJECTION_CONFIG),
        )
        .unwrap();
        assert_eq!(content.matches("[Adboards]").count(), 1);
        assert_eq!(content.matches("DisableAdboards").count(), 1);
        assert!(!read_adboards_config(&install).unwrap().disable_adboards);
    }

    #[test]
    fn list_config_files_sorts_cfg_names() {
        let install = temp_install();
        write_crowd_inject_config(&install, &CrowdInjectConfig::default()).unwrap();
        write_audio_inject_config(&install, &AudioInjectConfig::default()).unwrap();
        fs::write(Path::new(&install.config_path).join("notes.txt"), "x").unwrap();

        let names = list_config_files(&install).unwrap();
        assert_eq!(names, vec![AUDIO_INJECT_CONFIG, CROWD_INJECT_CONFIG]);
    }
}
