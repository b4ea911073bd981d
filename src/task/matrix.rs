use super::url::apply_language;
use super::{PageType, ScreenshotTask, Target};
use crate::Result;
use crate::devices;
use crate::sites::{Defaults, SiteConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Post-generation narrowing of the task matrix. An empty list means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilter {
    #[serde(default)]
    pub sites: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub devices: Vec<String>,
    #[serde(default)]
    pub page_types: Vec<PageType>,
}

impl TaskFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sites<I, S>(mut self, sites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sites = sites.into_iter().map(Into::into).collect();
        self
    }

    pub fn languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn devices<I, S>(mut self, devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.devices = devices.into_iter().map(Into::into).collect();
        self
    }

    pub fn page_types(mut self, page_types: impl IntoIterator<Item = PageType>) -> Self {
        self.page_types = page_types.into_iter().collect();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
            && self.languages.is_empty()
            && self.devices.is_empty()
            && self.page_types.is_empty()
    }

    pub fn matches(&self, task: &ScreenshotTask) -> bool {
        allows(&self.sites, &task.site_name)
            && allows(&self.languages, &task.language)
            && allows(&self.devices, &task.device)
            && (self.page_types.is_empty() || self.page_types.contains(&task.page_type))
    }

    pub fn apply(&self, tasks: Vec<ScreenshotTask>) -> Vec<ScreenshotTask> {
        if self.is_empty() {
            return tasks;
        }
        tasks.into_iter().filter(|t| self.matches(t)).collect()
    }
}

fn allows(allowed: &[String], value: &str) -> bool {
    allowed.is_empty() || allowed.iter().any(|a| a == value)
}

/// Expands every site into languages × devices × page types, in that nesting order.
///
/// The order is the scheduling order, so it also decides where device
/// boundaries (and therefore browser relaunches) fall.
pub fn generate_matrix(sites: &[SiteConfig], defaults: &Defaults) -> Result<Vec<ScreenshotTask>> {
    let mut tasks = Vec::new();

    for site in sites {
        let viewports = site.viewport_table(defaults);

        for language in site.effective_languages(defaults) {
            for device in site.effective_devices(defaults) {
                let profile = devices::resolve_profile(device, &viewports)?;

                for page_type in PageType::ALL {
                    let target = match site.path_for(page_type) {
                        Some(path) => Target::Path(apply_language(path, language)),
                        None => Target::Auto,
                    };

                    tasks.push(ScreenshotTask {
                        site_name: site.name.clone(),
                        base_url: site.base_url.clone(),
                        language: language.clone(),
                        device: device.clone(),
                        page_type,
                        target,
                        viewport: profile.viewport,
                        user_agent: profile.user_agent.clone(),
                    });
                }
            }
        }
    }

    Ok(tasks)
}

pub fn build_tasks(
    sites: &[SiteConfig],
    defaults: &Defaults,
    filter: &TaskFilter,
) -> Result<Vec<ScreenshotTask>> {
    let tasks = generate_matrix(sites, defaults)?;
    let total = tasks.len();
    let tasks = filter.apply(tasks);

    tracing::debug!("Task matrix: {} generated, {} after filtering", total, tasks.len());
    Ok(tasks)
}

/// Stable reordering that keeps sites in place but groups each site's tasks
/// by device, in order of first appearance.
pub fn order_by_device(tasks: Vec<ScreenshotTask>) -> Vec<ScreenshotTask> {
    let mut site_rank: HashMap<String, usize> = HashMap::new();
    let mut device_rank: HashMap<(String, String), usize> = HashMap::new();

    for task in &tasks {
        let next_site = site_rank.len();
        site_rank.entry(task.site_name.clone()).or_insert(next_site);

        let next_device = device_rank
            .keys()
            .filter(|(site, _)| site == &task.site_name)
            .count();
        device_rank
            .entry((task.site_name.clone(), task.device.clone()))
            .or_insert(next_device);
    }

    let mut keyed: Vec<((usize, usize), ScreenshotTask)> = tasks
        .into_iter()
        .map(|task| {
            let site = site_rank.get(&task.site_name).copied().unwrap_or(usize::MAX);
            let device = device_rank
                .get(&(task.site_name.clone(), task.device.clone()))
                .copied()
                .unwrap_or(usize::MAX);
            ((site, device), task)
        })
        .collect();

    keyed.sort_by_key(|(key, _)| *key);
    keyed.into_iter().map(|(_, task)| task).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sites::PagePaths;

    fn two_by_two() -> (Vec<SiteConfig>, Defaults) {
        let mut site = SiteConfig::new("shop", "https://shop.test");
        site.pages = PagePaths {
            home: Some("/".into()),
            category: Some("/catalog".into()),
            product: Some("/p/1".into()),
        };
        (vec![site], Defaults::default())
    }

    fn device_switches(tasks: &[ScreenshotTask]) -> usize {
        tasks
            .windows(2)
            .filter(|w| w[0].device != w[1].device)
            .count()
    }

    #[test]
    fn test_full_matrix_size() {
        let (sites, defaults) = two_by_two();
        let tasks = generate_matrix(&sites, &defaults).unwrap();
        assert_eq!(tasks.len(), 12);
    }

    #[test]
    fn test_matrix_nesting_order() {
        let (sites, defaults) = two_by_two();
        let tasks = generate_matrix(&sites, &defaults).unwrap();

        assert_eq!(tasks[0].language, "default");
        assert_eq!(tasks[0].device, "desktop");
        assert_eq!(tasks[0].page_type, PageType::Home);
        assert_eq!(tasks[2].page_type, PageType::Product);
        assert_eq!(tasks[3].device, "mobile");
        assert_eq!(tasks[6].language, "en");
        assert_eq!(tasks[7].target, Target::Path("/en/catalog".into()));
    }

    #[test]
    fn test_single_device_filter() {
        let (sites, defaults) = two_by_two();
        let filter = TaskFilter::new().devices(["mobile"]);
        let tasks = build_tasks(&sites, &defaults, &filter).unwrap();
        assert_eq!(tasks.len(), 6);
        assert!(tasks.iter().all(|t| t.device == "mobile"));
        assert_eq!(tasks[0].viewport.width, 375);
    }

    #[test]
    fn test_filter_order_independent() {
        let (sites, defaults) = two_by_two();
        let all = generate_matrix(&sites, &defaults).unwrap();

        let by_device = TaskFilter::new().devices(["desktop"]);
        let by_page = TaskFilter::new().page_types([PageType::Home, PageType::Product]);

        let a = by_page.apply(by_device.apply(all.clone()));
        let b = by_device.apply(by_page.apply(all.clone()));
        let combined = TaskFilter::new()
            .devices(["desktop"])
            .page_types([PageType::Home, PageType::Product])
            .apply(all);

        assert_eq!(a, b);
        assert_eq!(a, combined);
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn test_missing_paths_become_auto() {
        let sites = vec![SiteConfig::new("shop", "https://shop.test")];
        let defaults = Defaults::default();
        let tasks = generate_matrix(&sites, &defaults).unwrap();

        let home_en = tasks
            .iter()
            .find(|t| t.language == "en" && t.page_type == PageType::Home)
            .unwrap();
        assert_eq!(home_en.target, Target::Path("/en/".into()));

        let autos = tasks.iter().filter(|t| t.target.is_auto()).count();
        assert_eq!(autos, 8);
    }

    #[test]
    fn test_acme_home_only() {
        let mut site = SiteConfig::new("acme", "https://acme.test");
        site.pages.home = Some("/".into());
        site.languages = Some(vec!["default".into(), "en".into()]);
        site.devices = Some(vec!["desktop".into()]);

        let filter = TaskFilter::new().page_types([PageType::Home]);
        let tasks = build_tasks(&[site], &Defaults::default(), &filter).unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(
            (tasks[0].language.as_str(), tasks[0].device.as_str()),
            ("default", "desktop")
        );
        assert_eq!(tasks[0].target, Target::Path("/".into()));
        assert_eq!(tasks[1].language, "en");
        assert_eq!(tasks[1].target, Target::Path("/en/".into()));
    }

    #[test]
    fn test_site_filter() {
        let (mut sites, defaults) = two_by_two();
        sites.push(SiteConfig::new("other", "https://other.test"));

        let filter = TaskFilter::new().sites(["other"]);
        let tasks = build_tasks(&sites, &defaults, &filter).unwrap();
        assert_eq!(tasks.len(), 12);
        assert!(tasks.iter().all(|t| t.site_name == "other"));
    }

    #[test]
    fn test_unknown_device_is_error() {
        let mut site = SiteConfig::new("shop", "https://shop.test");
        site.devices = Some(vec!["watch".into()]);
        assert!(generate_matrix(&[site], &Defaults::default()).is_err());
    }

    #[test]
    fn test_order_by_device_minimises_switches() {
        let (mut sites, defaults) = two_by_two();
        sites.push(SiteConfig::new("other", "https://other.test"));
        let tasks = generate_matrix(&sites, &defaults).unwrap();
        assert_eq!(device_switches(&tasks), 7);

        let ordered = order_by_device(tasks.clone());
        assert_eq!(ordered.len(), tasks.len());
        assert_eq!(device_switches(&ordered), 3);
        assert!(ordered[..12].iter().all(|t| t.site_name == "shop"));
        assert_eq!(ordered[0].language, "default");
        assert_eq!(ordered[3].language, "en");
        assert_eq!(ordered[3].device, "desktop");
    }
}
