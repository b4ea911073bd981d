use crate::config::Config;
use crate::output::{self, TableBuilder, text};
use crate::sites::SitesFile;
use crate::task::{ScreenshotTask, TaskFilter, build_tasks, order_by_device};
use crate::{Result, ScreenshotError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TaskList {
    pub tasks: Vec<ScreenshotTask>,
    pub auto_targets: usize,
    pub device_switches: usize,
}

impl TaskList {
    pub fn new(tasks: Vec<ScreenshotTask>) -> Self {
        let auto_targets = tasks.iter().filter(|t| t.target.is_auto()).count();
        let device_switches = tasks
            .windows(2)
            .filter(|w| w[0].device != w[1].device)
            .count();

        Self {
            tasks,
            auto_targets,
            device_switches,
        }
    }
}

impl output::OutputFormatter for TaskList {
    fn format_text(&self) -> String {
        let mut table = TableBuilder::new().headers(vec![
            "#".into(),
            "Site".into(),
            "Language".into(),
            "Device".into(),
            "Page".into(),
            "Target".into(),
        ]);

        for (i, task) in self.tasks.iter().enumerate() {
            table = table.row(vec![
                (i + 1).to_string(),
                text::truncate(&task.site_name, 24),
                task.language.clone(),
                task.device.clone(),
                task.page_type.to_string(),
                text::truncate(&task.target.to_string(), 40),
            ]);
        }

        format!(
            "{}\n{}\n{}\n{}",
            text::section(&format!("{} task(s)", self.tasks.len())),
            table.build(),
            text::key_value("Discovery targets", &self.auto_targets.to_string()),
            text::key_value("Device switches", &self.device_switches.to_string()),
        )
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

/// Loads the sites file named by `config` and expands the filtered task list.
pub fn load_tasks(config: &Config, filter: &TaskFilter) -> Result<Vec<ScreenshotTask>> {
    let sites = SitesFile::load(&config.run.sites_file)?;

    for name in &filter.sites {
        sites.site(name)?;
    }

    let tasks = build_tasks(&sites.sites, &sites.defaults, filter)?;
    if tasks.is_empty() {
        return Err(ScreenshotError::ConfigError(
            "No tasks match the given filters".into(),
        ));
    }

    Ok(if config.run.group_by_device {
        order_by_device(tasks)
    } else {
        tasks
    })
}

pub fn handle_tasks(config: &Config, filter: &TaskFilter) -> Result<TaskList> {
    Ok(TaskList::new(load_tasks(config, filter)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_tasks_rejects_unknown_site() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sites.json");
        std::fs::write(
            &path,
            r#"{ "sites": [ { "name": "acme", "baseUrl": "https://acme.test" } ] }"#,
        )
        .unwrap();

        let mut config = Config::default();
        config.run.sites_file = path;

        assert_eq!(load_tasks(&config, &TaskFilter::new()).unwrap().len(), 12);
        assert!(load_tasks(&config, &TaskFilter::new().sites(["nope"])).is_err());
        assert!(load_tasks(&config, &TaskFilter::new().devices(["tablet"])).is_err());
    }

    #[test]
    fn test_task_list_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sites.json");
        std::fs::write(
            &path,
            r#"{ "sites": [ { "name": "acme", "baseUrl": "https://acme.test", "languages": ["default"] } ] }"#,
        )
        .unwrap();

        let mut config = Config::default();
        config.run.sites_file = path;

        let list = handle_tasks(&config, &TaskFilter::new()).unwrap();
        assert_eq!(list.tasks.len(), 6);
        assert_eq!(list.auto_targets, 4);
        assert_eq!(list.device_switches, 1);
    }
}
