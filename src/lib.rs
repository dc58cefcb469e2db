//! Score Engine WASM Module
//!
//! Incremental validation and line layout for measured music scores. The
//! engine repairs a document measure by measure, breaks it into lines and
//! returns justified, overlap-free geometry for a renderer to draw.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod postprocess;

// Re-export commonly used types
pub use config::{EngineConfig, LayoutOptions};
pub use engine::layout::{Layout, MeasureLayout};
pub use engine::{Engine, EngineContext};
pub use error::{EngineError, Result};
pub use models::Document;

use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(feature = "console_log")]
    if console_log::init_with_level(log::Level::Debug).is_err() {
        web_sys::console::warn_1(&JsValue::from_str("logger already initialized"));
    }

    log::info!("Score engine WASM module initialized");
}
