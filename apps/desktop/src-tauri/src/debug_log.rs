use std::{
    fs,
    path::{Path, PathBuf},
};

use sha2::{Digest, Sha256};

use crate::metrics;

const DEFAULT_MAX_PAYLOAD_BYTES: usize = 2_000_000; // 2MB
const DEFAULT_MAX_DEMOS: usize = 50;

fn env_bool(key: &str) -> bool {
    match std::env::var(key) {
        Ok(v) => {
            let t = v.trim().to_ascii_lowercase();
            t == "1" || t == "true" || t == "yes" || t == "on"
        }
        Err(_) => false,
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(v) => v.trim().parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

pub fn verbose_enabled() -> bool {
    env_bool("MICROPILOT_DEBUG_VERBOSE")
}

pub fn max_payload_bytes() -> usize {
    env_usize(
        "MICROPILOT_DEBUG_MAX_PAYLOAD_BYTES",
        DEFAULT_MAX_PAYLOAD_BYTES,
    )
}

pub fn max_demos() -> usize {
    env_usize("MICROPILOT_DEBUG_MAX_DEMOS", DEFAULT_MAX_DEMOS)
}

pub fn debug_root(data_dir: &Path) -> PathBuf {
    data_dir.join("debug")
}

pub fn debug_demo_dir(data_dir: &Path, demo_id: &str) -> PathBuf {
    debug_root(data_dir).join(demo_id)
}

#[derive(Debug, Clone)]
pub struct PayloadInfo {
    pub path: PathBuf,
    pub bytes_written: usize,
    pub truncated: bool,
    pub sha256: String,
}

fn sha256_hex(b: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(b);
    hex::encode(h.finalize())
}

fn truncate_with_suffix(mut b: Vec<u8>, max_bytes: usize, suffix: &[u8]) -> (Vec<u8>, bool) {
    if b.len() <= max_bytes {
        return (b, false);
    }
    let keep = max_bytes.saturating_sub(suffix.len());
    b.truncate(keep);
    b.extend_from_slice(suffix);
    (b, true)
}

/// Persists a raw payload (e.g. a failed API response body) for one demo.
/// Only active when MICROPILOT_DEBUG_VERBOSE is set; all failures are
/// swallowed so debug capture never changes application behavior.
pub fn write_payload_best_effort(
    data_dir: &Path,
    demo_id: &str,
    filename: &str,
    bytes: Vec<u8>,
) -> Option<PayloadInfo> {
    if !verbose_enabled() {
        return None;
    }

    let sha = sha256_hex(&bytes);
    let (bytes, truncated) =
        truncate_with_suffix(bytes, max_payload_bytes(), b"\n...(truncated)\n");

    let dir = debug_demo_dir(data_dir, demo_id);
    if fs::create_dir_all(&dir).is_err() {
        return None;
    }
    let path = dir.join(filename);
    if fs::write(&path, &bytes).is_err() {
        return None;
    }

    prune_old_demo_dirs_best_effort(data_dir);

    let info = PayloadInfo {
        path: path.clone(),
        bytes_written: bytes.len(),
        truncated,
        sha256: sha,
    };
    let _ = metrics::append_jsonl(
        data_dir,
        &serde_json::json!({
            "type": "debug_payload",
            "demo_id": demo_id,
            "path": path.display().to_string(),
            "bytes_written": info.bytes_written,
            "truncated": info.truncated,
            "sha256": info.sha256,
        }),
    );
    Some(info)
}

fn prune_old_demo_dirs_best_effort(data_dir: &Path) {
    let root = debug_root(data_dir);
    let Ok(entries) = fs::read_dir(&root) else {
        return;
    };
    let mut dirs: Vec<(std::time::SystemTime, PathBuf)> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(std::time::UNIX_EPOCH);
        dirs.push((modified, path));
    }
    let keep = max_demos();
    if dirs.len() <= keep {
        return;
    }
    dirs.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, path) in dirs.into_iter().skip(keep) {
        let _ = fs::remove_dir_all(path);
    }
}
