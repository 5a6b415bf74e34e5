//! Tracer payload decoding.

use nixdeps_core::error::{NixDepsError, NixDepsResult};
use nixdeps_core::AccessRecord;
use std::path::Path;

/// Decodes the tracer's JSON array of process records.
///
/// A blank payload (tracer recorded nothing) is an empty trace.
pub fn decode_trace(entry: &Path, payload: &str) -> NixDepsResult<Vec<AccessRecord>> {
    if payload.trim().is_empty() {
        return Ok(Vec::new());
    }

    let records: Vec<AccessRecord> =
        serde_json::from_str(payload).map_err(|e| NixDepsError::MalformedTrace {
            entry: entry.to_path_buf(),
            reason: e.to_string(),
        })?;

    tracing::trace!(
        entry = %entry.display(),
        records = records.len(),
        inputs = records.iter().map(|r| r.inputs.len()).sum::<usize>(),
        "decoded trace"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTRY: &str = "/ws/a/default.nix";

    #[test]
    fn decodes_multiple_processes() {
        let payload = r#"[
            {"Cmd": {"ID": 1, "Parent": 0, "Path": "/bin/nix-instantiate", "Args": [], "Dir": "/ws"},
             "Inputs": ["/ws/a/default.nix", "/nix/store/abc-lib.nix"], "Outputs": []},
            {"Cmd": {"ID": 2, "Parent": 1, "Path": "/bin/sh", "Args": ["sh"], "Dir": "/ws/a"},
             "Inputs": ["/ws/a/x.txt"], "Outputs": ["/tmp/out"], "FDs": {"Num0": "", "Num1": "", "Num2": ""}}
        ]"#;
        let records = decode_trace(Path::new(ENTRY), payload).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].parent_id(), 1);
        assert_eq!(records[1].inputs, vec!["/ws/a/x.txt".to_string()]);
        assert_eq!(records[1].outputs, vec!["/tmp/out".to_string()]);
    }

    #[test]
    fn blank_payload_is_empty_trace() {
        assert!(decode_trace(Path::new(ENTRY), "").unwrap().is_empty());
        assert!(decode_trace(Path::new(ENTRY), " \n").unwrap().is_empty());
        assert!(decode_trace(Path::new(ENTRY), "[]").unwrap().is_empty());
    }

    #[test]
    fn malformed_payload_is_recoverable() {
        let err = decode_trace(Path::new(ENTRY), "{not json").unwrap_err();
        assert!(matches!(err, NixDepsError::MalformedTrace { .. }));
        assert!(!err.is_fatal());

        // An object instead of an array.
        let err = decode_trace(Path::new(ENTRY), r#"{"Inputs": []}"#).unwrap_err();
        assert!(matches!(err, NixDepsError::MalformedTrace { .. }));
    }
}
