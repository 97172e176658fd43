use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::microsite_api;

pub const DEFAULT_SALES_REP: &str = "Jane Doe";
pub const DEFAULT_SITE_BASE: &str = "https://microsite.example.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Microsite generation endpoint; defaults to the hosted service.
    pub api_url: Option<String>,
    /// Owner name stamped on new demos.
    pub sales_rep: Option<String>,
    /// Base URL used by the simulated regenerate/upload completions.
    pub site_base: Option<String>,
}

impl Settings {
    pub fn effective_api_url(&self) -> &str {
        self.api_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(microsite_api::DEFAULT_API_URL)
    }

    pub fn effective_sales_rep(&self) -> &str {
        self.sales_rep
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_SALES_REP)
    }

    pub fn effective_site_base(&self) -> &str {
        self.site_base
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_SITE_BASE)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SettingsPatch {
    pub api_url: Option<String>,
    pub sales_rep: Option<String>,
    pub site_base: Option<String>,
}

pub fn apply_patch(mut cur: Settings, patch: SettingsPatch) -> Settings {
    if let Some(v) = patch.api_url {
        cur.api_url = Some(v);
    }
    if let Some(v) = patch.sales_rep {
        cur.sales_rep = Some(v);
    }
    if let Some(v) = patch.site_base {
        cur.site_base = Some(v);
    }
    cur
}

pub fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join("settings.json")
}

pub fn load_settings(data_dir: &Path) -> Result<Settings> {
    let p = settings_path(data_dir);
    if !p.exists() {
        return Ok(Settings::default());
    }
    let s = fs::read_to_string(&p).context("read settings.json failed")?;
    let v: Settings = serde_json::from_str(&s).context("parse settings.json failed")?;
    Ok(v)
}

/// Settings are never load-bearing enough to fail an operation over; a broken
/// file falls back to defaults.
pub fn load_settings_or_default(data_dir: &Path) -> Settings {
    match load_settings(data_dir) {
        Ok(s) => s,
        Err(e) => {
            crate::safe_eprintln!("settings: falling back to defaults: {e:#}");
            Settings::default()
        }
    }
}

pub fn save_settings(data_dir: &Path, settings: &Settings) -> Result<()> {
    std::fs::create_dir_all(data_dir).ok();
    let p = settings_path(data_dir);
    let s = serde_json::to_string_pretty(settings).context("serialize settings failed")?;
    fs::write(&p, s).context("write settings.json failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let td = tempfile::tempdir().expect("tempdir");
        let s = load_settings(td.path()).expect("load");
        assert_eq!(s, Settings::default());
        assert_eq!(s.effective_sales_rep(), DEFAULT_SALES_REP);
        assert_eq!(s.effective_api_url(), microsite_api::DEFAULT_API_URL);
    }

    #[test]
    fn save_then_load_round_trips() {
        let td = tempfile::tempdir().expect("tempdir");
        let s = Settings {
            api_url: Some("https://example.test/transcribe".to_string()),
            sales_rep: Some("John Smith".to_string()),
            site_base: None,
        };
        save_settings(td.path(), &s).expect("save");
        let loaded = load_settings(td.path()).expect("load");
        assert_eq!(loaded, s);
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let td = tempfile::tempdir().expect("tempdir");
        std::fs::write(settings_path(td.path()), "{not json").expect("write");
        let s = load_settings_or_default(td.path());
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn patch_merges_only_present_fields() {
        let cur = Settings {
            api_url: Some("https://a".to_string()),
            sales_rep: Some("Jane Doe".to_string()),
            site_base: None,
        };
        let next = apply_patch(
            cur,
            SettingsPatch {
                sales_rep: Some("John Smith".to_string()),
                ..SettingsPatch::default()
            },
        );
        assert_eq!(next.api_url.as_deref(), Some("https://a"));
        assert_eq!(next.sales_rep.as_deref(), Some("John Smith"));
    }

    #[test]
    fn blank_overrides_fall_back_to_defaults() {
        let s = Settings {
            api_url: Some("  ".to_string()),
            sales_rep: Some(String::new()),
            site_base: Some(String::new()),
        };
        assert_eq!(s.effective_api_url(), microsite_api::DEFAULT_API_URL);
        assert_eq!(s.effective_sales_rep(), DEFAULT_SALES_REP);
        assert_eq!(s.effective_site_base(), DEFAULT_SITE_BASE);
    }
}
