use std::sync::{Arc, Mutex};

use crate::model::{Demo, DemoStatus};

/// Partial update for a demo record.
///
/// Built through the constructors so that `microsite_url` always agrees with
/// the target status: only a `Ready` patch carries a url.
#[derive(Debug, Clone, Default)]
pub struct DemoPatch {
    pub title: Option<String>,
    pub status: Option<DemoStatus>,
    pub microsite_url: Option<String>,
}

impl DemoPatch {
    pub fn ready(microsite_url: String, title: Option<String>) -> Self {
        Self {
            title,
            status: Some(DemoStatus::Ready),
            microsite_url: Some(microsite_url),
        }
    }

    pub fn failed() -> Self {
        Self {
            status: Some(DemoStatus::Failed),
            ..Self::default()
        }
    }

    pub fn processing() -> Self {
        Self {
            status: Some(DemoStatus::Processing),
            ..Self::default()
        }
    }
}

/// In-memory ordered collection of demo records, newest first.
///
/// All mutation goes through `insert_at_head` / `update_by_id` /
/// `remove_by_id`. Updates and removals for unknown ids are silent no-ops:
/// completion callbacks run detached and may race a delete.
#[derive(Clone)]
pub struct DemoStore {
    inner: Arc<Mutex<Vec<Demo>>>,
}

impl DemoStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Store pre-populated with the sample records shown on first launch.
    pub fn with_seed() -> Self {
        Self {
            inner: Arc::new(Mutex::new(seed_demos())),
        }
    }

    pub fn insert_at_head(&self, demo: Demo) {
        let mut g = self.inner.lock().unwrap();
        g.insert(0, demo);
    }

    /// Applies `patch` to the record matching `id`. Returns whether a record
    /// was updated. A status change normalizes `microsite_url`: only `Ready`
    /// keeps one.
    pub fn update_by_id(&self, id: &str, patch: DemoPatch) -> bool {
        let mut g = self.inner.lock().unwrap();
        let Some(demo) = g.iter_mut().find(|d| d.id == id) else {
            return false;
        };
        if let Some(title) = patch.title {
            demo.title = title;
        }
        if let Some(status) = patch.status {
            demo.status = status;
            demo.microsite_url = match status {
                DemoStatus::Ready => patch.microsite_url,
                DemoStatus::Processing | DemoStatus::Failed => None,
            };
        }
        true
    }

    pub fn remove_by_id(&self, id: &str) -> bool {
        let mut g = self.inner.lock().unwrap();
        let before = g.len();
        g.retain(|d| d.id != id);
        g.len() != before
    }

    pub fn get(&self, id: &str) -> Option<Demo> {
        let g = self.inner.lock().unwrap();
        g.iter().find(|d| d.id == id).cloned()
    }

    pub fn snapshot(&self) -> Vec<Demo> {
        self.inner.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

impl Default for DemoStore {
    fn default() -> Self {
        Self::new()
    }
}

fn seed_demos() -> Vec<Demo> {
    fn seed(
        title: &str,
        date: &str,
        sales_rep: &str,
        status: DemoStatus,
        microsite_url: Option<&str>,
    ) -> Demo {
        Demo {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            date: date.to_string(),
            sales_rep: sales_rep.to_string(),
            status,
            microsite_url: microsite_url.map(|s| s.to_string()),
        }
    }

    vec![
        seed(
            "Product Overview for Acme Corp",
            "2023-06-15",
            "Jane Doe",
            DemoStatus::Ready,
            Some("https://microsite.example.com/acme-corp"),
        ),
        seed(
            "Feature Demo for TechStart Inc",
            "2023-06-12",
            "John Smith",
            DemoStatus::Ready,
            Some("https://microsite.example.com/techstart"),
        ),
        seed(
            "Solution Walkthrough for Global Enterprises",
            "2023-06-10",
            "Emily Johnson",
            DemoStatus::Processing,
            None,
        ),
        seed(
            "Integration Demo for DataFlow Systems",
            "2023-06-08",
            "Michael Brown",
            DemoStatus::Failed,
            None,
        ),
        seed(
            "Platform Overview for Innovate LLC",
            "2023-06-05",
            "Sarah Williams",
            DemoStatus::Ready,
            Some("https://microsite.example.com/innovate"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Demo;

    fn demo(title: &str) -> Demo {
        Demo::new_processing(title, "Jane Doe")
    }

    #[test]
    fn insert_at_head_keeps_newest_first() {
        let store = DemoStore::new();
        let a = demo("a");
        let b = demo("b");
        let c = demo("c");
        let (ida, idb, idc) = (a.id.clone(), b.id.clone(), c.id.clone());
        store.insert_at_head(a);
        store.insert_at_head(b);
        store.insert_at_head(c);
        let ids: Vec<String> = store.snapshot().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![idc, idb, ida]);
    }

    #[test]
    fn update_missing_id_is_a_noop() {
        let store = DemoStore::new();
        store.insert_at_head(demo("a"));
        let before = store.snapshot();
        let applied = store.update_by_id("no-such-id", DemoPatch::failed());
        assert!(!applied);
        let after = store.snapshot();
        assert_eq!(before.len(), after.len());
        assert_eq!(before[0].id, after[0].id);
        assert_eq!(before[0].status, after[0].status);
    }

    #[test]
    fn remove_missing_id_is_a_noop() {
        let store = DemoStore::new();
        store.insert_at_head(demo("a"));
        assert!(!store.remove_by_id("no-such-id"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn ready_patch_sets_url_and_optional_title() {
        let store = DemoStore::new();
        let d = demo("call1.mp3");
        let id = d.id.clone();
        store.insert_at_head(d);
        let applied = store.update_by_id(
            &id,
            DemoPatch::ready("https://x/y".to_string(), Some("Call One".to_string())),
        );
        assert!(applied);
        let d = store.get(&id).expect("demo");
        assert_eq!(d.status, DemoStatus::Ready);
        assert_eq!(d.microsite_url.as_deref(), Some("https://x/y"));
        assert_eq!(d.title, "Call One");
    }

    #[test]
    fn failed_and_processing_patches_clear_the_url() {
        let store = DemoStore::new();
        let d = demo("call1.mp3");
        let id = d.id.clone();
        store.insert_at_head(d);
        store.update_by_id(&id, DemoPatch::ready("https://x/y".to_string(), None));

        store.update_by_id(&id, DemoPatch::processing());
        let d = store.get(&id).expect("demo");
        assert_eq!(d.status, DemoStatus::Processing);
        assert!(d.microsite_url.is_none());

        store.update_by_id(&id, DemoPatch::failed());
        let d = store.get(&id).expect("demo");
        assert_eq!(d.status, DemoStatus::Failed);
        assert!(d.microsite_url.is_none());
    }

    #[test]
    fn seeded_store_upholds_the_url_invariant() {
        for d in DemoStore::with_seed().snapshot() {
            assert_eq!(
                d.status == DemoStatus::Ready,
                d.microsite_url.is_some(),
                "{}: url presence must track Ready",
                d.title
            );
        }
    }
}
