use directories::ProjectDirs;
use std::path::PathBuf;

/// Default location of the local attempt/challenge database.
pub fn db_path() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        let state_dir = PathBuf::from(home)
            .join(".local")
            .join("state")
            .join("codesist");
        Some(state_dir.join("codesist.db"))
    } else {
        ProjectDirs::from("", "", "codesist")
            .map(|proj_dirs| proj_dirs.data_local_dir().join("codesist.db"))
    }
}

/// Default location of the config file.
pub fn config_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "codesist") {
        proj_dirs.config_dir().join("config.json")
    } else {
        PathBuf::from("codesist_config.json")
    }
}
