//! Stockview Web - 3D warehouse stock viewer in the browser
//!
//! Mounts into the `#stockview-canvas` element, loads the layout for the
//! current company and location over JSON-RPC, and exposes `unmount()` so
//! the host page can tear the viewer down.

mod app;
mod network;
mod session;

use std::sync::atomic::{AtomicBool, Ordering};

use wasm_bindgen::prelude::*;

/// Set by the host page; consumed by the network plugin on the next frame
static UNMOUNT_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Entry point for WASM module
#[wasm_bindgen(start)]
pub fn main() {
    // Set panic hook for better error messages
    console_error_panic_hook::set_once();

    let level = session::query_param("log")
        .and_then(|value| parse_log_level(&value))
        .unwrap_or(tracing::Level::WARN);
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(level)
            .build(),
    );

    app::run();
}

/// Tear the viewer down. Safe to call more than once.
#[wasm_bindgen]
pub fn unmount() {
    UNMOUNT_REQUESTED.store(true, Ordering::SeqCst);
}

pub(crate) fn take_unmount_request() -> bool {
    UNMOUNT_REQUESTED.swap(false, Ordering::SeqCst)
}

fn parse_log_level(value: &str) -> Option<tracing::Level> {
    match value.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(tracing::Level::TRACE),
        "debug" => Some(tracing::Level::DEBUG),
        "info" => Some(tracing::Level::INFO),
        "warn" => Some(tracing::Level::WARN),
        "error" => Some(tracing::Level::ERROR),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("DEBUG"), Some(tracing::Level::DEBUG));
        assert_eq!(parse_log_level(" warn "), Some(tracing::Level::WARN));
        assert_eq!(parse_log_level("verbose"), None);
    }

    #[test]
    fn test_unmount_request_is_consumed_once() {
        unmount();
        assert!(take_unmount_request());
        assert!(!take_unmount_request());
    }
}
