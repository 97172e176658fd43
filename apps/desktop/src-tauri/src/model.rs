use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a demo record. Every record starts as `Processing` and
/// settles into `Ready` or `Failed`; regenerate moves it back to
/// `Processing` before it settles again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemoStatus {
    Processing,
    Ready,
    Failed,
}

impl DemoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemoStatus::Processing => "Processing",
            DemoStatus::Ready => "Ready",
            DemoStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for DemoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One processed sales-call artifact tracked by the dashboard.
///
/// `microsite_url` is present exactly when `status` is `Ready`; the store
/// normalizes it on every status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demo {
    pub id: String,
    pub title: String,
    pub date: String,
    pub sales_rep: String,
    pub status: DemoStatus,
    pub microsite_url: Option<String>,
}

impl Demo {
    pub fn new_processing(title: impl Into<String>, sales_rep: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            date: today_iso(),
            sales_rep: sales_rep.into(),
            status: DemoStatus::Processing,
            microsite_url: None,
        }
    }
}

pub fn today_iso() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

pub fn time_label() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_processing_has_no_url_and_fresh_id() {
        let a = Demo::new_processing("call1.mp3", "Jane Doe");
        let b = Demo::new_processing("call1.mp3", "Jane Doe");
        assert_eq!(a.status, DemoStatus::Processing);
        assert!(a.microsite_url.is_none());
        assert_ne!(a.id, b.id);
        assert_eq!(a.date.len(), 10); // YYYY-MM-DD
    }

    #[test]
    fn status_serializes_as_display_name() {
        let s = serde_json::to_string(&DemoStatus::Ready).expect("serialize");
        assert_eq!(s, "\"Ready\"");
    }
}
