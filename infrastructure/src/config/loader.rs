//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "turnstile";
const PROJECT_FILES: [&str; 2] = ["turnstile.toml", ".turnstile.toml"];
const ENV_PREFIX: &str = "TURNSTILE_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `TURNSTILE_` environment variables (`__` separates sections)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./turnstile.toml` or `./.turnstile.toml`
    /// 4. XDG config: `$XDG_CONFIG_HOME/turnstile/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        Self::figment(config_path).extract().map_err(Box::new)
    }

    fn figment(config_path: Option<&PathBuf>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        if let Some(project_path) = Self::project_config_path() {
            figment = figment.merge(Toml::file(project_path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Get the global config file path
    ///
    /// Returns XDG_CONFIG_HOME/turnstile/config.toml if set,
    /// otherwise falls back to ~/.config/turnstile/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Print the config file locations being used (for debugging)
    pub fn print_config_sources(explicit: Option<&Path>) {
        println!("Configuration sources (in priority order):");
        println!("  [     ] Env:     {ENV_PREFIX}<SECTION>__<KEY>");

        if let Some(path) = explicit {
            let mark = if path.exists() { "FOUND" } else { "MISS " };
            println!("  [{mark}] Explicit: {}", path.display());
        }

        match Self::project_config_path() {
            Some(path) => println!("  [FOUND] Project: {}", path.display()),
            None => println!("  [     ] Project: ./turnstile.toml or ./.turnstile.toml"),
        }

        if let Some(path) = Self::global_config_path() {
            let mark = if path.exists() { "FOUND" } else { "     " };
            println!("  [{mark}] Global:  {}", path.display());
        }

        println!("  [     ] Default: built-in defaults");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_global_config_path_returns_some() {
        let path = ConfigLoader::global_config_path();
        assert!(path.is_some());
        assert!(path.unwrap().to_string_lossy().contains(APP_DIR));
    }

    #[test]
    fn test_project_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("XDG_CONFIG_HOME", jail.directory().join("xdg").display());
            jail.create_file(
                "turnstile.toml",
                r#"
[stream]
min_delta = 25

[chat_modes.coder]
name = "Coder"
prompt = "You write code."
"#,
            )?;

            let config = ConfigLoader::load(None).unwrap();
            assert_eq!(config.stream.min_delta, 25);
            assert_eq!(config.stream.max_message_len, 4096);
            assert_eq!(config.chat_modes["coder"].name, "Coder");
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file_and_env_take_priority() {
        Jail::expect_with(|jail| {
            jail.set_env("XDG_CONFIG_HOME", jail.directory().join("xdg").display());
            jail.create_file(".turnstile.toml", "[stream]\nmin_delta = 25\n")?;
            jail.create_file(
                "custom.toml",
                "[stream]\nmin_delta = 50\n\n[session]\nnew_dialog_timeout_secs = 7\n",
            )?;
            jail.set_env("TURNSTILE_SESSION__NEW_DIALOG_TIMEOUT_SECS", "9");

            let explicit = PathBuf::from("custom.toml");
            let config = ConfigLoader::load(Some(&explicit)).unwrap();
            assert_eq!(config.stream.min_delta, 50);
            assert_eq!(config.session.new_dialog_timeout_secs, 9);
            Ok(())
        });
    }

    #[test]
    fn test_global_file_is_lowest_file_priority() {
        Jail::expect_with(|jail| {
            let xdg = jail.directory().join("xdg");
            std::fs::create_dir_all(xdg.join(APP_DIR)).unwrap();
            std::fs::write(
                xdg.join(APP_DIR).join("config.toml"),
                "[generation]\nmodel = \"global-model\"\n\n[stream]\nmin_delta = 10\n",
            )
            .unwrap();
            jail.set_env("XDG_CONFIG_HOME", xdg.display());
            jail.create_file("turnstile.toml", "[stream]\nmin_delta = 20\n")?;

            let config = ConfigLoader::load(None).unwrap();
            assert_eq!(config.generation.model, "global-model");
            assert_eq!(config.stream.min_delta, 20);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        Jail::expect_with(|jail| {
            jail.set_env("XDG_CONFIG_HOME", jail.directory().join("xdg").display());
            jail.create_file("turnstile.toml", "[stream]\nmin_delta = \"many\"\n")?;
            assert!(ConfigLoader::load(None).is_err());
            Ok(())
        });
    }
}
