use std::{
    fs::OpenOptions,
    io::Write,
    time::{SystemTime, UNIX_EPOCH},
};

// Non-sensitive startup breadcrumbs for diagnosing crashes that happen
// before the trace layer is usable. Always on, best-effort.
pub fn mark_best_effort(stage: &str) {
    let ts_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);

    let Ok(dir) = crate::data_dir::data_dir() else {
        return;
    };
    let _ = std::fs::create_dir_all(&dir);
    let Ok(mut f) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("startup_trace.log"))
    else {
        return;
    };
    let _ = writeln!(f, "ts_ms={ts_ms} stage={stage}");
}
