use std::{
    fs::OpenOptions,
    io::Write,
    time::{SystemTime, UNIX_EPOCH},
};

// Panic hook that writes to the app data dir instead of stderr.
//
// With `windows_subsystem = "windows"` there is no console, and the default
// hook's stderr print can itself fail and re-panic, which surfaces as a
// silent stack-overflow abort (0xc00000fd) with no message at all. This hook
// only appends to panic.log, and never panics itself.
pub fn install_best_effort() {
    std::panic::set_hook(Box::new(|info| {
        let ts_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        let bt = std::backtrace::Backtrace::force_capture();
        let entry = format!("ts_ms={ts_ms}\npanic={info}\nbacktrace={bt}\n---\n");

        let Ok(dir) = crate::data_dir::data_dir() else {
            return;
        };
        let _ = std::fs::create_dir_all(&dir);
        if let Ok(mut f) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("panic.log"))
        {
            let _ = f.write_all(entry.as_bytes());
        }
    }));
}
