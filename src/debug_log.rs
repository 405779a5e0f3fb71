//! Debug logging for sculpting sessions.
//!
//! Lines go to a single process-wide file opened by `init_debug_log()`.
//! Until then, and after `close_debug_log()`, logging is a no-op.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

lazy_static::lazy_static! {
    static ref DEBUG_LOG: Mutex<Option<File>> = Mutex::new(None);
}

/// Log a debug message to the sculpt debug log file
pub fn debug_log(msg: &str) {
    if let Ok(mut guard) = DEBUG_LOG.lock() {
        if let Some(ref mut file) = *guard {
            let _ = writeln!(file, "{}", msg);
            let _ = file.flush();
        }
    }
}

/// Open the debug log file at `path` (overwrites any existing log)
pub fn init_debug_log(path: impl AsRef<Path>) {
    if let Ok(mut guard) = DEBUG_LOG.lock() {
        *guard = File::create(path).ok();
        if let Some(ref mut file) = *guard {
            let _ = writeln!(file, "=== TERRAIN SCULPT DEBUG LOG ===");
            let _ = writeln!(file, "Timestamp: {:?}", std::time::SystemTime::now());
            let _ = writeln!(file);
        }
    }
}

pub fn close_debug_log() {
    if let Ok(mut guard) = DEBUG_LOG.lock() {
        *guard = None;
    }
}

pub fn is_debug_log_open() -> bool {
    DEBUG_LOG.lock().map(|g| g.is_some()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_writes_after_init_and_stops_after_close() {
        let path = std::env::temp_dir().join(format!("terrain_sculpt_log_{}.log", std::process::id()));
        init_debug_log(&path);
        assert!(is_debug_log_open());
        debug_log("[stroke] hello");
        close_debug_log();
        debug_log("[stroke] after close");

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("=== TERRAIN SCULPT DEBUG LOG ==="));
        assert!(text.contains("[stroke] hello"));
        assert!(!text.contains("after close"));
        let _ = std::fs::remove_file(&path);
    }
}
