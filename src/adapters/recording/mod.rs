//! Recording adapters that capture interactions to cassettes.

pub mod job_service;

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::cassette::recorder::CassetteRecorder;

/// Record a `Result<T, E>` interaction using the Ok/Err JSON convention.
///
/// Both sides are stored structurally so replay can rebuild typed errors.
pub(crate) fn record_result<T, E, I>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, E>,
) where
    T: Serialize,
    E: Serialize,
    I: Serialize,
{
    let to_json = |value: serde_json::Result<serde_json::Value>| {
        value.unwrap_or_else(|e| serde_json::Value::String(format!("<unserializable: {e}>")))
    };

    let input_json = to_json(serde_json::to_value(input));
    let output_json = match result {
        Ok(v) => serde_json::json!({ "Ok": to_json(serde_json::to_value(v)) }),
        Err(e) => serde_json::json!({ "Err": to_json(serde_json::to_value(e)) }),
    };

    match recorder.lock() {
        Ok(mut guard) => guard.record(port, method, input_json, output_json),
        Err(e) => log::warn!("recorder lock poisoned, dropping {port}::{method}: {e}"),
    }
}
