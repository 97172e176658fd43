// Stderr logging that must never panic.
//
// Release builds run under the Windows GUI subsystem with no console
// attached, where `eprintln!` can panic on write errors; a panicking log
// line inside an error path would take the whole process down. Write
// failures are ignored instead.

#[macro_export]
macro_rules! safe_eprintln {
    ($($arg:tt)*) => {{
        use std::io::Write;
        let _ = writeln!(std::io::stderr(), $($arg)*);
    }};
}
