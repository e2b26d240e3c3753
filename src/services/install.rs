use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use zip::ZipArchive;

use crate::errors::{CompanionError, Result};
use crate::models::{BepInExStatus, Fm26Installation, PluginStatus};
use crate::services::transfer::TransferManager;

/// Well-known endpoint for the BepInEx loader pack.
pub const PACK_URL: &str = "https://pub-PLACEHOLDER.r2.dev/bepinex_pack.zip";

const PACK_DOWNLOAD_FILE: &str = "bepinex_pack_download.zip";
const LOADER_PACK_PREFIX: &str = "BepInExStadiums/";
const STADIUM_PACK_PREFIX: &str = "CustomStadium/";

const KNOWN_PLUGINS: [(&str, &str); 3] = [
    ("StadiumInjection", "StadiumInjection/StadiumInjection.dll"),
    ("AudioInject", "AudioInject/AudioInject.dll"),
    ("CrowdInject", "CrowdInject/CrowdInject.dll"),
];

/// Probe well-known Steam/Epic locations for an FM26 install.
pub fn detect_install_paths() -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();

    #[cfg(target_os = "windows")]
    {
        let steam_paths = [
            r"C:\Program Files (x86)\Steam\steamapps\common\Football Manager 2026",
            r"C:\Program Files\Steam\steamapps\common\Football Manager 2026",
            r"D:\Steam\steamapps\common\Football Manager 2026",
            r"D:\SteamLibrary\steamapps\common\Football Manager 2026",
            r"E:\Steam\steamapps\common\Football Manager 2026",
            r"E:\SteamLibrary\steamapps\common\Football Manager 2026",
            r"F:\Steam\steamapps\common\Football Manager 2026",
            r"F:\SteamLibrary\steamapps\common\Football Manager 2026",
        ];
        let epic_paths = [
            r"C:\Program Files\Epic Games\FootballManager2026",
            r"C:\Program Files (x86)\Epic Games\FootballManager2026",
            r"D:\Epic Games\FootballManager2026",
            r"E:\Epic Games\FootballManager2026",
        ];

        for path_str in steam_paths.iter().chain(epic_paths.iter()) {
            let path = Path::new(path_str);
            if path.exists() && is_valid_install_dir(path) {
                paths.push((*path_str).to_string());
            }
        }

        // Extra Steam libraries registered in libraryfolders.vdf.
        if let Some(steam_libs) = find_steam_library_folders() {
            for lib in steam_libs {
                let fm_path = lib
                    .join("steamapps")
                    .join("common")
                    .join("Football Manager 2026");
                if fm_path.exists() && is_valid_install_dir(&fm_path) {
                    let path_str = fm_path.to_string_lossy().to_string();
                    if !paths.contains(&path_str) {
                        paths.push(path_str);
                    }
                }
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let steam_path = PathBuf::from(home)
                .join("Library/Application Support/Steam/steamapps/common/Football Manager 2026");
            if steam_path.exists() && is_valid_install_dir(&steam_path) {
                paths.push(steam_path.to_string_lossy().to_string());
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home = PathBuf::from(home);
            let steam_paths = [
                home.join(".steam/steam/steamapps/common/Football Manager 2026"),
                home.join(".local/share/Steam/steamapps/common/Football Manager 2026"),
            ];
            for steam_path in steam_paths {
                if steam_path.exists() && is_valid_install_dir(&steam_path) {
                    paths.push(steam_path.to_string_lossy().to_string());
                }
            }
        }
    }

    paths
}

fn is_valid_install_dir(path: &Path) -> bool {
    let exe_path = path.join("fm.exe");
    let exe_path_alt = path.join("Football Manager 2026.exe");
    let data_path = path.join("data");

    exe_path.exists() || exe_path_alt.exists() || data_path.exists()
}

#[cfg(target_os = "windows")]
fn find_steam_library_folders() -> Option<Vec<PathBuf>> {
    let vdf_paths = [
        PathBuf::from(r"C:\Program Files (x86)\Steam\steamapps\libraryfolders.vdf"),
        PathBuf::from(r"C:\Program Files\Steam\steamapps\libraryfolders.vdf"),
    ];

    for vdf_path in vdf_paths {
        let Ok(content) = fs::read_to_string(&vdf_path) else {
            continue;
        };
        let folders = parse_library_folders(&content);
        if !folders.is_empty() {
            return Some(folders);
        }
    }
    None
}

/// Pull `"path"` values out of Steam's libraryfolders.vdf.
#[allow(dead_code)]
fn parse_library_folders(content: &str) -> Vec<PathBuf> {
    let mut folders = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if !line.starts_with("\"path\"") {
            continue;
        }
        let rest = &line["\"path\"".len()..];
        let Some(start) = rest.find('"') else {
            continue;
        };
        let rest = &rest[start + 1..];
        let Some(end) = rest.find('"') else { continue };
        folders.push(PathBuf::from(rest[..end].replace("\\\\", "\\")));
    }
    folders
}

/// Derive the directory layout the plugins expect from an install root.
pub fn inspect_install(root_path: &str) -> Result<Fm26Installation> {
    let root = Path::new(root_path);

    if !root.exists() {
        return Err(CompanionError::NotFound(format!(
            "Directory does not exist: {root_path}"
        )));
    }
    if !root.is_dir() {
        return Err(CompanionError::Config(format!(
            "Path is not a directory: {root_path}"
        )));
    }

    let bep_in_ex_path = root.join("BepInEx");
    let plugins_path = bep_in_ex_path.join("plugins");
    let custom_stadium_path = plugins_path.join("CustomStadium");
    let audio_inject_path = plugins_path.join("AudioInject");
    let config_path = bep_in_ex_path.join("config");
    let log_path = bep_in_ex_path.join("LogOutput.log");

    Ok(Fm26Installation {
        root_path: root_path.to_string(),
        bep_in_ex_path: bep_in_ex_path.to_string_lossy().to_string(),
        plugins_path: plugins_path.to_string_lossy().to_string(),
        custom_stadium_path: custom_stadium_path.to_string_lossy().to_string(),
        audio_inject_path: audio_inject_path.to_string_lossy().to_string(),
        config_path: config_path.to_string_lossy().to_string(),
        log_path: log_path.to_string_lossy().to_string(),
    })
}

/// Installed state of the three plugin DLLs.
pub fn plugin_status(install: &Fm26Installation) -> Vec<PluginStatus> {
    let plugins_path = Path::new(&install.plugins_path);

    KNOWN_PLUGINS
        .iter()
        .map(|(name, rel_path)| {
            let full_path = plugins_path.join(rel_path);
            PluginStatus {
                name: (*name).to_string(),
                path: full_path.to_string_lossy().to_string(),
                installed: full_path.exists(),
            }
        })
        .collect()
}

/// Whether BepInEx is already present, so a reinstall can warn before it
/// backs up and overwrites.
pub fn bepinex_status(install: &Fm26Installation) -> BepInExStatus {
    let bepinex_path = Path::new(&install.bep_in_ex_path);
    let plugins_path = Path::new(&install.plugins_path);

    let installed = bepinex_path.exists();
    let mut plugin_count: u32 = 0;

    if installed && plugins_path.exists() {
        for (_, rel_path) in KNOWN_PLUGINS {
            if plugins_path.join(rel_path).exists() {
                plugin_count += 1;
            }
        }
    }

    BepInExStatus {
        installed,
        path: install.bep_in_ex_path.clone(),
        has_plugins: plugin_count > 0,
        plugin_count,
    }
}

/// Quick sanity check on a downloaded pack before it is offered for
/// install.
pub fn validate_zip_file(path: &Path) -> Result<()> {
    let file = fs::File::open(path)?;
    let archive = ZipArchive::new(file)
        .map_err(|err| CompanionError::Parse(format!("Invalid zip file: {err}")))?;

    if archive.is_empty() {
        return Err(CompanionError::Parse("Zip file is empty".to_string()));
    }
    Ok(())
}

/// Install the loader pack into the game root. An existing BepInEx folder
/// is renamed to a timestamped backup first (only the most recent backup
/// is kept).
pub fn install_loader_pack(zip_path: &Path, install: &Fm26Installation) -> Result<()> {
    if !zip_path.exists() {
        return Err(CompanionError::NotFound(format!(
            "Zip file not found: {}",
            zip_path.display()
        )));
    }

    let root = Path::new(&install.root_path);
    let bepinex_path = root.join("BepInEx");

    if bepinex_path.exists() {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let backup_name = format!("BepInEx_backup_{timestamp}");
        let backup_path = root.join(&backup_name);

        for entry in fs::read_dir(root)?.flatten() {
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if name_str.starts_with("BepInEx_backup_")
                && entry.path() != backup_path
                && entry.path().is_dir()
            {
                let _ = fs::remove_dir_all(entry.path());
            }
        }

        fs::rename(&bepinex_path, &backup_path)?;
        tracing::info!(backup = %backup_path.display(), "existing BepInEx folder backed up");
    }

    let extracted = extract_stripping_prefix(zip_path, root, LOADER_PACK_PREFIX)?;
    tracing::info!(files = extracted, root = %root.display(), "loader pack installed");
    Ok(())
}

/// Install a user-selected stadium pack into the CustomStadium plugin
/// directory. Returns the number of files extracted.
pub fn install_stadium_pack(zip_path: &Path, install: &Fm26Installation) -> Result<u32> {
    if !zip_path.exists() {
        return Err(CompanionError::NotFound(format!(
            "Zip file not found: {}",
            zip_path.display()
        )));
    }

    let dest = Path::new(&install.custom_stadium_path);
    if !dest.exists() {
        fs::create_dir_all(dest)?;
    }

    let extracted = extract_stripping_prefix(zip_path, dest, STADIUM_PACK_PREFIX)?;
    tracing::info!(files = extracted, dest = %dest.display(), "stadium pack installed");
    Ok(extracted)
}

/// Extract an archive into `dest_root`, stripping the packer's root folder
/// when present. Returns the number of files written.
fn extract_stripping_prefix(zip_path: &Path, dest_root: &Path, strip_prefix: &str) -> Result<u32> {
    let file = fs::File::open(zip_path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|err| CompanionError::Parse(format!("Failed to read archive: {err}")))?;

    let mut files_extracted: u32 = 0;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| CompanionError::Parse(format!("Failed to read archive entry: {err}")))?;

        let Some(entry_path) = entry.enclosed_name().map(Path::to_path_buf) else {
            continue;
        };

        let relative_path = entry_path
            .to_string_lossy()
            .strip_prefix(strip_prefix)
            .map(PathBuf::from)
            .unwrap_or(entry_path);

        if relative_path.as_os_str().is_empty() {
            continue;
        }

        let outpath = dest_root.join(&relative_path);

        if entry.name().ends_with('/') {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                if !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
            }
            let mut outfile = fs::File::create(&outpath)?;
            io::copy(&mut entry, &mut outfile)?;
            files_extracted += 1;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&outpath, fs::Permissions::from_mode(mode)).ok();
            }
        }
    }

    Ok(files_extracted)
}

/// Download the loader pack from the well-known endpoint into the system
/// temp dir, validating the archive before handing the path back.
pub async fn download_pack(transfers: &TransferManager) -> Result<PathBuf> {
    let dest = std::env::temp_dir().join(PACK_DOWNLOAD_FILE);
    let path = transfers.start(PACK_URL, &dest).await?;
    validate_zip_file(&path)?;
    Ok(path)
}

/// Download the loader pack from a caller-supplied URL. Only the scheme is
/// checked up front; anything else wrong with the URL fails at request
/// time.
pub async fn download_pack_from_url(transfers: &TransferManager, url: &str) -> Result<PathBuf> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(CompanionError::Config(
            "Invalid URL: must start with http:// or https://".to_string(),
        ));
    }

    let dest = std::env::temp_dir().join(PACK_DOWNLOAD_FILE);
    let path = transfers.start(url, &dest).await?;
    validate_zip_file(&path)?;
    Ok(path)
}
