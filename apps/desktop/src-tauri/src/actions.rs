use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tauri::AppHandle;
use tauri_plugin_opener::OpenerExt;

use crate::{
    demo_store::DemoStore,
    ingest::{self, IngestManager, TauriNotifier},
};

/// Row-level dashboard actions, one variant per action tag, each carrying
/// exactly the data it needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DemoAction {
    View { id: String },
    Share { id: String },
    Regenerate { id: String },
    Delete { id: String, confirmed: bool },
    Upload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionOutcome {
    Opened { url: String },
    Copied { url: String },
    RegenerateStarted { id: String },
    Deleted { id: String },
    DeleteAborted { id: String },
    UploadStarted { id: String },
    Skipped { reason: String },
}

/// Single exhaustive handler for every dashboard action. Missing targets and
/// url-less demos degrade to a skipped outcome rather than an error; genuine
/// failures (opener, clipboard) propagate and surface as a transient alert.
pub fn dispatch(
    app: &AppHandle,
    store: &DemoStore,
    ingest: &IngestManager,
    action: DemoAction,
) -> Result<ActionOutcome> {
    match action {
        DemoAction::View { id } => match store.get(&id).and_then(|d| d.microsite_url) {
            Some(url) => {
                app.opener()
                    .open_url(url.clone(), None::<&str>)
                    .with_context(|| format!("open microsite failed: {url}"))?;
                Ok(ActionOutcome::Opened { url })
            }
            None => {
                crate::safe_eprintln!("view: no microsite url for demo {id}");
                Ok(ActionOutcome::Skipped {
                    reason: "no microsite url".to_string(),
                })
            }
        },
        DemoAction::Share { id } => match store.get(&id).and_then(|d| d.microsite_url) {
            Some(url) => {
                let mut clipboard =
                    arboard::Clipboard::new().context("open system clipboard failed")?;
                clipboard
                    .set_text(url.clone())
                    .context("copy microsite url failed")?;
                Ok(ActionOutcome::Copied { url })
            }
            None => Ok(ActionOutcome::Skipped {
                reason: "no microsite url".to_string(),
            }),
        },
        DemoAction::Regenerate { id } => {
            ingest.regenerate(app.clone(), &id)?;
            Ok(ActionOutcome::RegenerateStarted { id })
        }
        DemoAction::Delete { id, confirmed } => {
            let outcome = delete_demo(store, ingest, &id, confirmed);
            if matches!(outcome, ActionOutcome::Deleted { .. }) {
                ingest::emit_event(&TauriNotifier::new(app.clone()), ingest::deleted_event(&id));
            }
            Ok(outcome)
        }
        DemoAction::Upload => {
            let id = ingest.upload_placeholder(app.clone())?;
            Ok(ActionOutcome::UploadStarted { id })
        }
    }
}

/// Delete requires an explicit confirmation from the user; without it the
/// store is untouched. A confirmed delete first voids any pending simulated
/// completion so the timer cannot resurrect the record.
fn delete_demo(
    store: &DemoStore,
    ingest: &IngestManager,
    id: &str,
    confirmed: bool,
) -> ActionOutcome {
    if !confirmed {
        return ActionOutcome::DeleteAborted { id: id.to_string() };
    }
    ingest.cancel_pending(id);
    if store.remove_by_id(id) {
        ActionOutcome::Deleted { id: id.to_string() }
    } else {
        ActionOutcome::Skipped {
            reason: "demo not found".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Demo;

    fn store_with_one(title: &str) -> (DemoStore, String) {
        let store = DemoStore::new();
        let demo = Demo::new_processing(title, "Jane Doe");
        let id = demo.id.clone();
        store.insert_at_head(demo);
        (store, id)
    }

    #[test]
    fn unconfirmed_delete_leaves_the_store_unchanged() {
        let (store, id) = store_with_one("Acme Demo");
        let ingest = IngestManager::new(store.clone());
        let outcome = delete_demo(&store, &ingest, &id, false);
        assert_eq!(outcome, ActionOutcome::DeleteAborted { id: id.clone() });
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn confirmed_delete_removes_the_demo() {
        let (store, id) = store_with_one("Acme Demo");
        let ingest = IngestManager::new(store.clone());
        let outcome = delete_demo(&store, &ingest, &id, true);
        assert_eq!(outcome, ActionOutcome::Deleted { id });
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn confirmed_delete_of_a_missing_demo_is_skipped() {
        let store = DemoStore::new();
        let ingest = IngestManager::new(store.clone());
        let outcome = delete_demo(&store, &ingest, "no-such-id", true);
        assert!(matches!(outcome, ActionOutcome::Skipped { .. }));
    }

    #[test]
    fn action_tags_deserialize_from_the_webview_shape() {
        let action: DemoAction =
            serde_json::from_str(r#"{"type":"delete","id":"d1","confirmed":true}"#)
                .expect("deserialize");
        assert!(matches!(
            action,
            DemoAction::Delete { ref id, confirmed: true } if id == "d1"
        ));

        let action: DemoAction =
            serde_json::from_str(r#"{"type":"upload"}"#).expect("deserialize");
        assert!(matches!(action, DemoAction::Upload));
    }
}
