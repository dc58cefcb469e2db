//! Score engine WASM API
//!
//! The engine keeps one document and its layout cache per session. JavaScript
//! loads a document, applies edits as patch operations and asks for layouts;
//! unchanged measures are served from the cache between calls.
//!
//! # Module Structure
//!
//! - `helpers`: serialization and error conversion shared by every call

pub mod helpers;

use crate::config::{EngineConfig, LayoutOptions};
use crate::engine::patch::Operation;
use crate::engine::{Engine, EngineContext};
use crate::models::Document;
use helpers::{deserialize, engine_error, serialize, validation_error};
use std::cell::RefCell;
use wasm_bindgen::prelude::*;

struct Session {
    document: Option<Document>,
    context: EngineContext,
}

thread_local! {
    static SESSION: RefCell<Session> = RefCell::new(Session {
        document: None,
        context: EngineContext::default(),
    });
}

fn with_document<T>(f: impl FnOnce(&mut EngineContext, &mut Document) -> Result<T, JsValue>) -> Result<T, JsValue> {
    SESSION.with(|session| {
        let mut session = session.borrow_mut();
        let Session { document, context } = &mut *session;
        let document = document
            .as_mut()
            .ok_or_else(|| validation_error("no document loaded"))?;
        f(context, document)
    })
}

/// Replace the session document and drop everything cached for the old one.
///
/// Documents cross the boundary as JSON text; staff and voice tables are
/// keyed by number.
#[wasm_bindgen(js_name = loadDocument)]
pub fn load_document(json: &str) -> Result<(), JsValue> {
    let document: Document = serde_json::from_str(json)
        .map_err(|e| validation_error(format!("Failed to parse document: {}", e)))?;
    log::info!("loaded document with {} measures", document.measures.len());
    SESSION.with(|session| {
        let mut session = session.borrow_mut();
        session.context.cache.clear();
        session.document = Some(document);
    });
    Ok(())
}

/// Current session document as JSON, including every repair made so far
#[wasm_bindgen(js_name = getDocument)]
pub fn get_document() -> Result<String, JsValue> {
    with_document(|_, doc| {
        serde_json::to_string(doc).map_err(|e| validation_error(format!("Failed to serialize document: {}", e)))
    })
}

#[wasm_bindgen(js_name = setEngineConfig)]
pub fn set_engine_config(config: JsValue) -> Result<(), JsValue> {
    let config: EngineConfig = deserialize(config, "Failed to deserialize engine config")?;
    SESSION.with(|session| {
        let mut session = session.borrow_mut();
        session.context.config = config;
        session.context.cache.clear();
    });
    Ok(())
}

/// Apply edit operations to the session document
#[wasm_bindgen(js_name = applyOperations)]
pub fn apply_operations(operations: JsValue) -> Result<(), JsValue> {
    let operations: Vec<Operation> = deserialize(operations, "Failed to deserialize operations")?;
    with_document(|ctx, doc| {
        ctx.fixup
            .fixup(doc, None, &operations, true)
            .map_err(engine_error)
    })
}

/// Validate the session document; returns the validation report
#[wasm_bindgen(js_name = validateDocument)]
pub fn validate_document() -> Result<JsValue, JsValue> {
    with_document(|ctx, doc| {
        let report = Engine::validate(ctx, doc).map_err(engine_error)?;
        serialize(&report, "Failed to serialize validation report")
    })
}

/// Lay out the session document; returns one array of measure layouts per line
#[wasm_bindgen(js_name = layoutDocument)]
pub fn layout_document(options: JsValue) -> Result<js_sys::Array, JsValue> {
    let options: LayoutOptions = if options.is_undefined() || options.is_null() {
        LayoutOptions::default()
    } else {
        deserialize(options, "Failed to deserialize layout options")?
    };
    with_document(|ctx, doc| {
        let lines = Engine::layout_song(ctx, doc, &options).map_err(engine_error)?;
        let out = js_sys::Array::new();
        for line in &lines {
            out.push(&serialize(line, "Failed to serialize line layout")?);
        }
        Ok(out)
    })
}
