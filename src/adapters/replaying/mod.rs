//! Replaying adapters that serve recorded interactions from cassettes.

pub mod job_service;

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;

use crate::cassette::replayer::CassetteReplayer;
use crate::error::ServiceError;

/// Retrieve the next recorded output for a given port and method.
///
/// # Panics
///
/// Panics if the cassette has no more interactions for the pair.
pub(crate) fn next_output(
    replayer: &Arc<Mutex<CassetteReplayer>>,
    port: &str,
    method: &str,
) -> serde_json::Value {
    let mut guard = replayer.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    guard.next_interaction(port, method).output
}

/// Rebuild a recorded `Result<T, ServiceError>`.
///
/// Errors recorded as plain strings come back as [`ServiceError::Transport`];
/// outputs that fit neither side come back as [`ServiceError::Decode`].
pub(crate) fn replay_result<T: DeserializeOwned>(
    output: serde_json::Value,
) -> Result<T, ServiceError> {
    let decode = |e: serde_json::Error| ServiceError::Decode(format!("bad cassette entry: {e}"));

    if let Some(err_val) = output.get("Err").or_else(|| output.get("err")) {
        return Err(match err_val {
            serde_json::Value::String(msg) => ServiceError::Transport(msg.clone()),
            other => serde_json::from_value(other.clone()).map_err(decode)?,
        });
    }
    if let Some(ok_val) = output.get("Ok").or_else(|| output.get("ok")) {
        return serde_json::from_value(ok_val.clone()).map_err(decode);
    }
    serde_json::from_value(output).map_err(decode)
}
