use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use serde::Serialize;
use serde_json::json;
use tauri::{AppHandle, Emitter};
use tokio_util::sync::CancellationToken;

use crate::{
    data_dir,
    demo_store::{DemoPatch, DemoStore},
    metrics,
    microsite_api::{self, MicrositeApiConfig, MicrositeApiError, SiteOutcome},
    model::{self, Demo},
    settings,
};

/// Fixed delays for the locally simulated completions. Regeneration is a
/// quick re-render; a placeholder upload pretends to do the full pipeline.
pub const REGENERATE_DELAY: Duration = Duration::from_secs(3);
pub const UPLOAD_DELAY: Duration = Duration::from_secs(5);

pub trait SiteGenerator: Send + Sync {
    fn generate(
        &self,
        demo_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<SiteOutcome, MicrositeApiError>;
}

/// Real client: one multipart POST to the endpoint configured in settings.
pub struct HttpSiteGenerator;

impl SiteGenerator for HttpSiteGenerator {
    fn generate(
        &self,
        demo_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<SiteOutcome, MicrositeApiError> {
        fn internal(msg: String) -> MicrositeApiError {
            MicrositeApiError {
                code: "E_MICROSITE_INTERNAL".to_string(),
                message: msg,
            }
        }

        let data_dir = data_dir::data_dir().map_err(|e| internal(format!("data dir: {e}")))?;
        let cfg = MicrositeApiConfig {
            url: settings::load_settings_or_default(&data_dir)
                .effective_api_url()
                .to_string(),
        };
        // Workers are plain OS threads, so each request drives its own
        // single-threaded runtime for the async client.
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| internal(format!("tokio runtime create failed: {e}")))?;
        let client = reqwest::Client::new();
        rt.block_on(microsite_api::generate_site(
            &data_dir, demo_id, &client, &cfg, file_name, bytes,
        ))
    }
}

pub trait UiNotifier: Send + Sync {
    fn demo_event(&self, ev: &DemoEvent);
    fn alert(&self, message: &str);
}

/// Forwards lifecycle events to the webview.
pub struct TauriNotifier {
    app: AppHandle,
}

impl TauriNotifier {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl UiNotifier for TauriNotifier {
    fn demo_event(&self, ev: &DemoEvent) {
        let _ = self.app.emit("demo_event", ev.clone());
    }

    fn alert(&self, message: &str) {
        let _ = self.app.emit("demo_alert", json!({ "message": message }));
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DemoEvent {
    pub demo_id: String,
    pub status: String, // processing|ready|failed|deleted
    pub title: Option<String>,
    pub microsite_url: Option<String>,
    pub message: String,
    pub error_code: Option<String>,
}

pub fn emit_event(notifier: &dyn UiNotifier, ev: DemoEvent) {
    notifier.demo_event(&ev);
    if let Ok(dir) = data_dir::data_dir() {
        if let Err(e) = metrics::append_jsonl(
            &dir,
            &json!({
                "type": "demo_event",
                "demo_id": ev.demo_id,
                "status": ev.status,
                "error_code": ev.error_code,
                "message": ev.message,
            }),
        ) {
            crate::safe_eprintln!("metrics append failed (demo_event): {e:#}");
        }
    }
}

fn processing_event(demo_id: &str, message: &str) -> DemoEvent {
    DemoEvent {
        demo_id: demo_id.to_string(),
        status: "processing".to_string(),
        title: None,
        microsite_url: None,
        message: message.to_string(),
        error_code: None,
    }
}

fn ready_event(demo_id: &str, url: &str, title: Option<&str>) -> DemoEvent {
    DemoEvent {
        demo_id: demo_id.to_string(),
        status: "ready".to_string(),
        title: title.map(|s| s.to_string()),
        microsite_url: Some(url.to_string()),
        message: "microsite ready".to_string(),
        error_code: None,
    }
}

fn failed_event(demo_id: &str, code: &str, message: &str) -> DemoEvent {
    DemoEvent {
        demo_id: demo_id.to_string(),
        status: "failed".to_string(),
        title: None,
        microsite_url: None,
        message: message.to_string(),
        error_code: Some(code.to_string()),
    }
}

pub fn deleted_event(demo_id: &str) -> DemoEvent {
    DemoEvent {
        demo_id: demo_id.to_string(),
        status: "deleted".to_string(),
        title: None,
        microsite_url: None,
        message: "demo deleted".to_string(),
        error_code: None,
    }
}

/// Orchestrates upload lifecycles: each submission gets its own detached
/// worker that closes over the new demo id, so any number may be in flight
/// and completions land by id in whatever order they finish. Simulated
/// completions (regenerate, placeholder upload) register a cancellation
/// token keyed by demo id so a delete can void them.
#[derive(Clone)]
pub struct IngestManager {
    store: DemoStore,
    generator: Arc<dyn SiteGenerator>,
    pending: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl IngestManager {
    pub fn new(store: DemoStore) -> Self {
        Self::with_components(store, Arc::new(HttpSiteGenerator))
    }

    fn with_components(store: DemoStore, generator: Arc<dyn SiteGenerator>) -> Self {
        Self {
            store,
            generator,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn submit_file(&self, app: AppHandle, path: PathBuf) -> Result<String> {
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("recording path has no file name"))?;
        let bytes = std::fs::read(&path)
            .with_context(|| format!("read recording failed: {}", path.display()))?;
        let (demo_id, _join) =
            self.spawn_ingest(Arc::new(TauriNotifier::new(app)), file_name, bytes);
        Ok(demo_id)
    }

    pub fn submit_base64(&self, app: AppHandle, file_name: String, b64: &str) -> Result<String> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .context("decode recording payload failed")?;
        let (demo_id, _join) =
            self.spawn_ingest(Arc::new(TauriNotifier::new(app)), file_name, bytes);
        Ok(demo_id)
    }

    fn spawn_ingest(
        &self,
        notifier: Arc<dyn UiNotifier>,
        file_name: String,
        bytes: Vec<u8>,
    ) -> (String, thread::JoinHandle<()>) {
        let sales_rep = data_dir::data_dir()
            .map(|dir| {
                settings::load_settings_or_default(&dir)
                    .effective_sales_rep()
                    .to_string()
            })
            .unwrap_or_else(|_| settings::DEFAULT_SALES_REP.to_string());
        let demo = Demo::new_processing(file_name.clone(), sales_rep);
        let demo_id = demo.id.clone();
        self.store.insert_at_head(demo);
        emit_event(notifier.as_ref(), processing_event(&demo_id, "upload received"));

        let store = self.store.clone();
        let generator = self.generator.clone();
        let id2 = demo_id.clone();
        let join = thread::spawn(move || {
            run_ingest(
                &store,
                generator.as_ref(),
                notifier.as_ref(),
                &id2,
                &file_name,
                bytes,
            );
        });
        (demo_id, join)
    }

    /// Resets the demo to `Processing` and schedules a simulated completion.
    /// This path is local only; it never talks to the API.
    pub fn regenerate(&self, app: AppHandle, demo_id: &str) -> Result<()> {
        if self.store.get(demo_id).is_none() {
            return Err(anyhow!("demo not found: {demo_id}"));
        }
        let _join = self.spawn_simulated(
            Arc::new(TauriNotifier::new(app)),
            demo_id.to_string(),
            REGENERATE_DELAY,
            "regeneration started",
        );
        Ok(())
    }

    /// Inserts a placeholder demo that rides the same simulated
    /// Processing -> Ready transition, without a real recording behind it.
    pub fn upload_placeholder(&self, app: AppHandle) -> Result<String> {
        let sales_rep = data_dir::data_dir()
            .map(|dir| {
                settings::load_settings_or_default(&dir)
                    .effective_sales_rep()
                    .to_string()
            })
            .unwrap_or_else(|_| settings::DEFAULT_SALES_REP.to_string());
        let demo = Demo::new_processing(format!("New Demo {}", model::time_label()), sales_rep);
        let demo_id = demo.id.clone();
        self.store.insert_at_head(demo);
        let _join = self.spawn_simulated(
            Arc::new(TauriNotifier::new(app)),
            demo_id.clone(),
            UPLOAD_DELAY,
            "upload received",
        );
        Ok(demo_id)
    }

    fn spawn_simulated(
        &self,
        notifier: Arc<dyn UiNotifier>,
        demo_id: String,
        delay: Duration,
        message: &str,
    ) -> thread::JoinHandle<()> {
        self.store.update_by_id(&demo_id, DemoPatch::processing());
        emit_event(notifier.as_ref(), processing_event(&demo_id, message));

        let token = CancellationToken::new();
        {
            let mut g = self.pending.lock().unwrap();
            // A newer simulation for the same demo supersedes the old one.
            if let Some(prev) = g.insert(demo_id.clone(), token.clone()) {
                prev.cancel();
            }
        }

        let store = self.store.clone();
        let pending = self.pending.clone();
        thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    crate::safe_eprintln!(
                        "simulated completion for {demo_id}: tokio runtime create failed: {e}"
                    );
                    pending.lock().unwrap().remove(&demo_id);
                    return;
                }
            };
            let cancelled = rt.block_on(async {
                tokio::select! {
                    _ = token.cancelled() => true,
                    _ = tokio::time::sleep(delay) => false,
                }
            });
            if cancelled {
                // The canceller (delete, or a superseding simulation) owns
                // the pending entry; nothing to apply here.
                return;
            }
            if let Some(demo) = store.get(&demo_id) {
                let base = data_dir::data_dir()
                    .map(|dir| {
                        settings::load_settings_or_default(&dir)
                            .effective_site_base()
                            .to_string()
                    })
                    .unwrap_or_else(|_| settings::DEFAULT_SITE_BASE.to_string());
                let url = simulated_site_url(&demo.title, &base);
                if store.update_by_id(&demo_id, DemoPatch::ready(url.clone(), None)) {
                    emit_event(notifier.as_ref(), ready_event(&demo_id, &url, None));
                }
            }
            pending.lock().unwrap().remove(&demo_id);
        })
    }

    /// Voids a scheduled simulated completion, if one exists. Called before
    /// removing a demo so the timer cannot resurrect it.
    pub fn cancel_pending(&self, demo_id: &str) -> bool {
        match self.pending.lock().unwrap().remove(demo_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

fn run_ingest(
    store: &DemoStore,
    generator: &dyn SiteGenerator,
    notifier: &dyn UiNotifier,
    demo_id: &str,
    file_name: &str,
    bytes: Vec<u8>,
) {
    match generator.generate(demo_id, file_name, bytes) {
        Ok(site) => {
            let applied = store.update_by_id(
                demo_id,
                DemoPatch::ready(site.url.clone(), site.name.clone()),
            );
            // Not applied means the demo was deleted while the request was
            // in flight; completion is best-effort.
            if applied {
                emit_event(
                    notifier,
                    ready_event(demo_id, &site.url, site.name.as_deref()),
                );
            }
        }
        Err(e) => {
            let applied = store.update_by_id(demo_id, DemoPatch::failed());
            if applied {
                emit_event(notifier, failed_event(demo_id, &e.code, &e.message));
                let notice = match e.code.as_str() {
                    "E_MICROSITE_NO_URL" | "E_MICROSITE_REJECTED" => {
                        "Processing completed, but the microsite URL is not available.".to_string()
                    }
                    _ => format!("Error processing {file_name}."),
                };
                notifier.alert(&notice);
            }
        }
    }
}

pub fn simulated_site_url(title: &str, base: &str) -> String {
    let slug = title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    format!("{}/{}", base.trim_end_matches('/'), slug)
}
