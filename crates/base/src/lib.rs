use std::path::{Path, PathBuf};

use directories::ProjectDirs;

pub const PROJECT_NAME: &str = "kubessh";
pub const PROJECT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const CLI_CONFIG_NAME: &str = "config.yaml";

pub fn project_config_dir() -> PathBuf {
    ProjectDirs::from("", PROJECT_NAME, PROJECT_NAME)
        .expect("creating `ProjectDirs` should always succeed")
        .config_dir()
        .to_path_buf()
}

#[must_use]
pub fn fallback_project_config_directories() -> Vec<PathBuf> {
    let Some(user_dirs) = directories::UserDirs::new() else {
        return Vec::new();
    };
    vec![
        [user_dirs.home_dir(), Path::new(".config"), Path::new(PROJECT_NAME)].iter().collect(),
        [user_dirs.home_dir(), Path::new(&format!(".{PROJECT_NAME}"))].iter().collect(),
    ]
}
