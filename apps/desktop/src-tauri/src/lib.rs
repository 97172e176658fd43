mod actions;
mod data_dir;
mod debug_log;
mod demo_store;
mod filter;
mod ingest;
mod metrics;
mod microsite_api;
mod model;
mod panic_log;
mod safe_print;
mod session;
mod settings;
mod startup_trace;
mod trace;

use actions::{ActionOutcome, DemoAction};
use demo_store::DemoStore;
use ingest::IngestManager;
use model::Demo;
use session::{SessionGate, UserProfile};
use settings::{Settings, SettingsPatch};
use tauri::Manager;
use trace::Span;

fn cmd_span(
    data_dir: &std::path::Path,
    demo_id: Option<&str>,
    step_id: &str,
    ctx: Option<serde_json::Value>,
) -> Span {
    Span::start(data_dir, demo_id, "Cmd", step_id, ctx)
}

#[tauri::command]
fn session_login(
    state: tauri::State<SessionGate>,
    id_token: &str,
) -> Result<UserProfile, String> {
    let dir = data_dir::data_dir().map_err(|e| e.to_string())?;
    let span = cmd_span(
        &dir,
        None,
        "CMD.session_login",
        Some(serde_json::json!({"token_chars": id_token.len()})),
    );
    match state.complete_login(&dir, id_token) {
        Ok(profile) => {
            span.ok(Some(serde_json::json!({"name_chars": profile.name.len()})));
            Ok(profile)
        }
        Err(e) => {
            span.err_anyhow("auth", "E_CMD_SESSION_LOGIN", &e, None);
            Err(e.to_string())
        }
    }
}

#[tauri::command]
fn session_current(state: tauri::State<SessionGate>) -> Result<Option<UserProfile>, String> {
    let dir = data_dir::data_dir().map_err(|e| e.to_string())?;
    let span = cmd_span(&dir, None, "CMD.session_current", None);
    let user = state.current();
    span.ok(Some(serde_json::json!({"authenticated": user.is_some()})));
    Ok(user)
}

#[tauri::command]
fn list_demos(
    store: tauri::State<DemoStore>,
    status_filter: Option<String>,
    search: Option<String>,
) -> Result<Vec<Demo>, String> {
    let dir = data_dir::data_dir().map_err(|e| e.to_string())?;
    let status_filter = status_filter.unwrap_or_default();
    let search = search.unwrap_or_default();
    let span = cmd_span(
        &dir,
        None,
        "CMD.list_demos",
        Some(serde_json::json!({"status_filter": status_filter, "search_chars": search.len()})),
    );
    let demos = filter::project(&store.snapshot(), &status_filter, &search);
    span.ok(Some(serde_json::json!({"count": demos.len()})));
    Ok(demos)
}

#[tauri::command]
fn submit_recording_file(
    app: tauri::AppHandle,
    state: tauri::State<IngestManager>,
    path: &str,
) -> Result<String, String> {
    let dir = data_dir::data_dir().map_err(|e| e.to_string())?;
    let span = cmd_span(
        &dir,
        None,
        "CMD.submit_recording_file",
        Some(serde_json::json!({"path": path})),
    );
    match state.submit_file(app, std::path::PathBuf::from(path)) {
        Ok(demo_id) => {
            span.ok(Some(serde_json::json!({"demo_id": demo_id})));
            Ok(demo_id)
        }
        Err(e) => {
            span.err_anyhow("ingest", "E_CMD_SUBMIT_FILE", &e, None);
            Err(e.to_string())
        }
    }
}

#[tauri::command]
fn submit_recording_base64(
    app: tauri::AppHandle,
    state: tauri::State<IngestManager>,
    file_name: &str,
    b64: &str,
) -> Result<String, String> {
    let dir = data_dir::data_dir().map_err(|e| e.to_string())?;
    let span = cmd_span(
        &dir,
        None,
        "CMD.submit_recording_base64",
        Some(serde_json::json!({"file_name": file_name, "b64_chars": b64.len()})),
    );
    match state.submit_base64(app, file_name.to_string(), b64) {
        Ok(demo_id) => {
            span.ok(Some(serde_json::json!({"demo_id": demo_id})));
            Ok(demo_id)
        }
        Err(e) => {
            span.err_anyhow("ingest", "E_CMD_SUBMIT_B64", &e, None);
            Err(e.to_string())
        }
    }
}

fn action_ctx(action: &DemoAction) -> serde_json::Value {
    match action {
        DemoAction::View { id } => serde_json::json!({"action": "view", "id": id}),
        DemoAction::Share { id } => serde_json::json!({"action": "share", "id": id}),
        DemoAction::Regenerate { id } => serde_json::json!({"action": "regenerate", "id": id}),
        DemoAction::Delete { id, confirmed } => {
            serde_json::json!({"action": "delete", "id": id, "confirmed": confirmed})
        }
        DemoAction::Upload => serde_json::json!({"action": "upload"}),
    }
}

#[tauri::command]
fn demo_action(
    app: tauri::AppHandle,
    store: tauri::State<DemoStore>,
    ingest: tauri::State<IngestManager>,
    action: DemoAction,
) -> Result<ActionOutcome, String> {
    let dir = data_dir::data_dir().map_err(|e| e.to_string())?;
    let span = cmd_span(&dir, None, "CMD.demo_action", Some(action_ctx(&action)));
    match actions::dispatch(&app, &store, &ingest, action) {
        Ok(outcome) => {
            span.ok(None);
            Ok(outcome)
        }
        Err(e) => {
            span.err_anyhow("action", "E_CMD_DEMO_ACTION", &e, None);
            Err(e.to_string())
        }
    }
}

#[tauri::command]
fn get_settings() -> Result<Settings, String> {
    let dir = data_dir::data_dir().map_err(|e| e.to_string())?;
    let span = cmd_span(&dir, None, "CMD.get_settings", None);
    let s = settings::load_settings_or_default(&dir);
    span.ok(None);
    Ok(s)
}

#[tauri::command]
fn update_settings(patch: SettingsPatch) -> Result<Settings, String> {
    let dir = data_dir::data_dir().map_err(|e| e.to_string())?;
    let patch_summary = serde_json::json!({
        "api_url": patch.api_url.is_some(),
        "sales_rep": patch.sales_rep.is_some(),
        "site_base": patch.site_base.is_some(),
    });
    let span = cmd_span(&dir, None, "CMD.update_settings", Some(patch_summary));
    let cur = settings::load_settings_or_default(&dir);
    let next = settings::apply_patch(cur, patch);
    if let Err(e) = settings::save_settings(&dir, &next) {
        span.err_anyhow("settings", "E_CMD_UPDATE_SETTINGS", &e, None);
        return Err(e.to_string());
    }
    span.ok(None);
    Ok(next)
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    startup_trace::mark_best_effort("run_enter");
    panic_log::install_best_effort();
    startup_trace::mark_best_effort("panic_hook_installed");
    let ctx = tauri::generate_context!();
    startup_trace::mark_best_effort("context_generated");
    let store = DemoStore::with_seed();
    tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|_app, _argv, _cwd| {}))
        .plugin(tauri_plugin_opener::init())
        .manage(store.clone())
        .manage(IngestManager::new(store))
        .manage(SessionGate::new())
        .setup(|app| {
            startup_trace::mark_best_effort("setup_enter");

            // Reopen a persisted session so a reload lands straight on the
            // dashboard without re-authenticating.
            if let Ok(dir) = data_dir::data_dir() {
                let gate = app.state::<SessionGate>();
                gate.restore_best_effort(&dir);
            }

            startup_trace::mark_best_effort("setup_exit");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            session_login,
            session_current,
            list_demos,
            submit_recording_file,
            submit_recording_base64,
            demo_action,
            get_settings,
            update_settings
        ])
        .run(ctx)
        .expect("error while running tauri application");
}
