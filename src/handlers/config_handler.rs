use crate::{Result, ScreenshotError, config::Config, output};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
pub struct ConfigInfo {
    pub path: PathBuf,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ConfigShowResult {
    pub config: Config,
}

impl output::OutputFormatter for ConfigInfo {
    fn format_text(&self) -> String {
        use crate::output::text;
        let mut lines = vec![
            text::key_value("Config Path", &self.path.display().to_string()),
            text::key_value("Exists", &self.exists.to_string()),
        ];
        if let Some(ref project) = self.project_path {
            lines.push(text::key_value("Project Config", &project.display().to_string()));
        }
        lines.join("\n")
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

impl output::OutputFormatter for ConfigShowResult {
    fn format_text(&self) -> String {
        self.config.display_text()
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(&self.config, pretty)
    }
}

pub fn handle_config_init() -> Result<ConfigInfo> {
    let config_path = crate::config::default_config_path()?;
    let config_dir = config_path
        .parent()
        .ok_or_else(|| ScreenshotError::ConfigError("Invalid config path".into()))?;

    if config_path.exists() {
        return Err(ScreenshotError::ConfigError(format!(
            "Config file already exists at {}",
            config_path.display()
        )));
    }

    std::fs::create_dir_all(config_dir)?;
    std::fs::write(&config_path, toml::to_string_pretty(&Config::default())?)?;

    Ok(ConfigInfo {
        path: config_path,
        exists: true,
        project_path: None,
    })
}

pub fn handle_config_show(config: &Config) -> ConfigShowResult {
    ConfigShowResult {
        config: config.clone(),
    }
}

pub fn handle_config_path() -> Result<ConfigInfo> {
    let path = crate::config::default_config_path()?;
    let project = PathBuf::from(crate::config::PROJECT_CONFIG_FILE);

    Ok(ConfigInfo {
        exists: path.exists(),
        path,
        project_path: project.exists().then_some(project),
    })
}
