//! Pure address and file-name transforms.
//!
//! Nothing here touches the browser or the file system, so every rule can be
//! checked in isolation.

use super::ScreenshotTask;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

static NON_NAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").unwrap());
static REPEATED_UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());
static NON_COMPONENT_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").unwrap());

/// Directory layout for captured images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputLayout {
    /// `<root>/<site>/<language>/<device>/<page type>.png`
    #[default]
    SiteFirst,
    /// `<root>/<device>/<language>/<name derived from the URL>.png`
    DeviceFirst,
}

impl std::fmt::Display for OutputLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::SiteFirst => "site-first",
            Self::DeviceFirst => "device-first",
        })
    }
}

impl std::str::FromStr for OutputLayout {
    type Err = crate::ScreenshotError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "site-first" => Ok(Self::SiteFirst),
            "device-first" => Ok(Self::DeviceFirst),
            other => Err(crate::ScreenshotError::ConfigError(format!(
                "Unknown output layout: {}. Use site-first or device-first",
                other
            ))),
        }
    }
}

/// The only language served under its own path segment. Every other
/// language, the default included, lives at the unprefixed address.
pub const PREFIXED_LANGUAGE: &str = "en";

fn is_prefixed(language: &str) -> bool {
    language == PREFIXED_LANGUAGE
}

/// Inserts the `/en` segment in front of `path` for the English language.
///
/// Any other language leaves the path untouched. The root path maps to
/// `/en/` with its trailing slash, and a path that already starts with the
/// segment is returned as is, so applying the transform twice changes nothing.
pub fn apply_language(path: &str, language: &str) -> String {
    if !is_prefixed(language) {
        return path.to_string();
    }

    let prefix = format!("/{}", language);

    if path.is_empty() || path == "/" {
        return format!("{}/", prefix);
    }

    if path == prefix || path.starts_with(&format!("{}/", prefix)) {
        return path.to_string();
    }

    if path.starts_with('/') {
        format!("{}{}", prefix, path)
    } else {
        format!("{}/{}", prefix, path)
    }
}

/// Same as [`apply_language`] but for an absolute URL; the path component is
/// rewritten and everything else kept. Unparseable input is returned unchanged.
pub fn apply_language_to_url(url: &str, language: &str) -> String {
    if !is_prefixed(language) {
        return url.to_string();
    }

    match Url::parse(url) {
        Ok(mut parsed) => {
            let path = apply_language(parsed.path(), language);
            parsed.set_path(&path);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

pub fn device_marker(device: &str) -> String {
    device
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

/// Appends the per-device cache-busting parameter `v=<device>`.
pub fn add_device_query(url: &str, device: &str) -> String {
    let (head, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };

    let separator = if head.ends_with('?') || head.ends_with('&') {
        ""
    } else if head.contains('?') {
        "&"
    } else {
        "?"
    };

    let mut result = format!("{}{}v={}", head, separator, device_marker(device));
    if let Some(fragment) = fragment {
        result.push('#');
        result.push_str(fragment);
    }
    result
}

/// Joins a site base URL and a site-relative path without doubling slashes.
pub fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.is_empty() {
        format!("{}/", base)
    } else if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Builds a file-system friendly name (without extension) from a page URL.
///
/// Never fails and never returns an empty string: an empty path becomes
/// `<device>_<language>_home`, an unparseable URL `<device>_<language>_page`.
pub fn derive_file_name(url: &str, device: &str, language: &str) -> String {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return format!("{}_{}_page", device, language),
    };

    let path = parsed.path().trim_matches('/');
    let flattened = path.replace('/', "_");
    let cleaned = NON_NAME_CHARS.replace_all(&flattened, "_");
    let collapsed = REPEATED_UNDERSCORES.replace_all(&cleaned, "_");
    let name = collapsed.trim_matches('_');

    if name.is_empty() {
        format!("{}_{}_home", device, language)
    } else {
        format!("{}_{}_{}", device, language, name)
    }
}

fn path_component(value: &str) -> String {
    let cleaned = NON_COMPONENT_CHARS.replace_all(value, "_");
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "_".to_string()
    } else {
        cleaned.into_owned()
    }
}

/// Final image location for `task` once it resolved to `url`.
pub fn output_path(layout: OutputLayout, root: &Path, task: &ScreenshotTask, url: &str) -> PathBuf {
    match layout {
        OutputLayout::SiteFirst => root
            .join(path_component(&task.site_name))
            .join(path_component(&task.language))
            .join(path_component(&task.device))
            .join(format!("{}.png", task.page_type)),
        OutputLayout::DeviceFirst => root
            .join(path_component(&task.device))
            .join(path_component(&task.language))
            .join(format!(
                "{}.png",
                derive_file_name(url, &task.device, &task.language)
            )),
    }
}
