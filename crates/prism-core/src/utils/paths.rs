use std::path::PathBuf;

/// Standardized application directories for Prism.
///
/// - Project-level: ./.prism
/// - User-level config: uses OS-specific dirs
/// - User-level data: uses OS-specific dirs
pub struct AppPaths;

impl AppPaths {
    /// Return the project-level .prism directory (relative to current working dir)
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".prism")
    }

    /// Return the project-level artifact config path: ./.prism/artifacts.toml
    pub fn project_artifact_config() -> PathBuf {
        Self::project_dir().join("artifacts.toml")
    }

    /// Return the user-level config directory (platform-specific)
    pub fn user_config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "prism").map(|d| d.config_dir().to_path_buf())
    }

    /// Return the user-level data directory (platform-specific)
    pub fn user_data_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "prism").map(|d| d.data_dir().to_path_buf())
    }

    pub fn user_artifact_config() -> Option<PathBuf> {
        Self::user_config_dir().map(|d| d.join("artifacts.toml"))
    }

    pub fn log_dir() -> Option<PathBuf> {
        Self::user_data_dir().map(|d| d.join("logs"))
    }

    /// Default SQLite database for persisted artifacts
    pub fn default_artifact_db() -> Option<PathBuf> {
        Self::user_data_dir().map(|d| d.join("artifacts.db"))
    }

    /// Existing artifact config files, project first, then user.
    pub fn discover_artifact_configs() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        let project = Self::project_artifact_config();
        if project.exists() {
            paths.push(project);
        }
        if let Some(user) = Self::user_artifact_config() {
            if user.exists() {
                paths.push(user);
            }
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_paths_are_static() {
        assert_eq!(AppPaths::project_dir(), PathBuf::from(".prism"));
        assert_eq!(
            AppPaths::project_artifact_config(),
            PathBuf::from(".prism/artifacts.toml")
        );
    }

    #[test]
    fn discover_artifact_configs_order_is_deterministic() {
        let configs = AppPaths::discover_artifact_configs();
        assert!(configs.len() <= 2);
        if configs.len() == 2 {
            assert_eq!(configs[0], PathBuf::from(".prism/artifacts.toml"));
            assert_eq!(Some(configs[1].clone()), AppPaths::user_artifact_config());
        }
    }

    #[test]
    fn data_paths_share_the_user_data_dir() {
        if let Some(data) = AppPaths::user_data_dir() {
            assert_eq!(AppPaths::log_dir(), Some(data.join("logs")));
            assert_eq!(AppPaths::default_artifact_db(), Some(data.join("artifacts.db")));
        }
    }
}
