//! Worker lease summaries: the `Signals`/`RunResult` wire shape and
//! its normalization rules (field precedence, wrapped shapes).

use serde::{Deserialize, Serialize};

use crate::error::SchedulerWarning;
use crate::seed::digest_coverage_bitmap;

/// Execution status tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Bug,
    Crash,
    Timeout,
}

impl Default for Status {
    fn default() -> Self {
        Status::Ok
    }
}

/// A bug fingerprint: exception kind, message digest, source file, line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugSignature {
    pub kind: Option<String>,
    pub message_digest: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
}

/// The worker's lease summary, as accepted by `update()`.
///
/// Optional fields default on missing/malformed input per the
/// `SignalParseWarning` recovery policy in the error design — no
/// variant of this type is ever rejected outright.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signals {
    #[serde(default)]
    pub new_coverage: bool,
    #[serde(default)]
    pub new_bug: bool,
    #[serde(default)]
    pub crash: bool,
    #[serde(default)]
    pub timeout: bool,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub coverage_key: Option<String>,
    #[serde(default)]
    pub coverage_signature: Option<String>,
    #[serde(default)]
    pub coverage_bitmap: Option<Vec<u32>>,
    #[serde(default)]
    pub bug_signature: Option<BugSignature>,
    #[serde(default)]
    pub bug_key: Option<String>,
}

/// The `{closed_result, open_result}` wrapped shape some workers emit.
/// Normalized by ORing the booleans and preferring the closed result's
/// keys for bucketing.
#[derive(Debug, Clone, Deserialize)]
pub struct WrappedSignals {
    pub closed_result: Signals,
    pub open_result: Signals,
}

impl WrappedSignals {
    pub fn normalize(self) -> Signals {
        let WrappedSignals {
            mut closed_result,
            open_result,
        } = self;
        closed_result.new_coverage |= open_result.new_coverage;
        closed_result.new_bug |= open_result.new_bug;
        closed_result.crash |= open_result.crash;
        closed_result.timeout |= open_result.timeout;
        // Prefer the closed result's keys; fall back to the open result's.
        closed_result.coverage_key = closed_result.coverage_key.or(open_result.coverage_key);
        closed_result.coverage_signature = closed_result
            .coverage_signature
            .or(open_result.coverage_signature);
        closed_result.coverage_bitmap = closed_result
            .coverage_bitmap
            .or(open_result.coverage_bitmap);
        closed_result.bug_signature = closed_result.bug_signature.or(open_result.bug_signature);
        closed_result.bug_key = closed_result.bug_key.or(open_result.bug_key);
        closed_result
    }
}

/// The literal fallback key when no coverage/bug information is present.
pub const NONE_KEY: &str = "none";

/// Resolve the `coverage_key` for bucketing, per the precedence in §6:
/// explicit key, then signature, then a digest of the bitmap, then `"none"`.
pub fn resolve_coverage_key(signals: &Signals) -> String {
    if let Some(key) = &signals.coverage_key {
        return key.clone();
    }
    if let Some(sig) = &signals.coverage_signature {
        return sig.clone();
    }
    if let Some(bitmap) = &signals.coverage_bitmap {
        return digest_coverage_bitmap(bitmap);
    }
    SchedulerWarning::SignalParseFallback {
        field: "coverage_key",
    }
    .log();
    NONE_KEY.to_string()
}

/// Resolve the `bug_key` for bucketing: explicit signature, explicit
/// key, then a digest derived from status, then `"none"`.
///
/// A failing run (`Bug`/`Crash`/`Timeout`) always gets a status-derived
/// key distinct from a clean run's, even with no signature attached, so
/// it never buckets alongside `ok` executions.
pub fn resolve_bug_key(signals: &Signals) -> String {
    if let Some(sig) = &signals.bug_signature {
        return crate::seed::digest_text(&format!(
            "{:?}:{:?}:{:?}:{:?}",
            sig.kind, sig.message_digest, sig.file, sig.line
        ));
    }
    if let Some(key) = &signals.bug_key {
        return key.clone();
    }
    let unspecified = match signals.status {
        Status::Bug => Some("bug:unspecified"),
        Status::Crash => Some("crash:unspecified"),
        Status::Timeout => Some("timeout:unspecified"),
        Status::Ok => None,
    };
    match unspecified {
        Some(digest_input) => {
            SchedulerWarning::SignalParseFallback { field: "bug_key" }.log();
            crate::seed::digest_text(digest_input)
        }
        None => NONE_KEY.to_string(),
    }
}
