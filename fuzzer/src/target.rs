//! A toy in-process "target": maps each payload byte to a coverage
//! edge, panics on a fixed magic sequence (caught as a crash), and
//! flags long inputs as a timeout stand-in. Exists only so the owner
//! loop in `main.rs` has something to execute.

use std::panic::{self, AssertUnwindSafe};

use hivefuzz_core::signals::{BugSignature, Signals, Status};

pub const COVERAGE_MAP_SIZE: usize = 256;
const CRASH_MAGIC: &[u8] = &[0xDE, 0xAD, 0xBE, 0xEF];
const TIMEOUT_LEN: usize = 4096;

/// Execute the toy target against `payload`, folding newly hit edges
/// into `global_coverage` and reporting the result as `Signals`.
pub fn run_target(payload: &[u8], global_coverage: &mut [u32]) -> Signals {
    let mut local_hits = vec![false; COVERAGE_MAP_SIZE];
    for &byte in payload {
        local_hits[byte as usize] = true;
    }

    let new_coverage = local_hits
        .iter()
        .enumerate()
        .any(|(edge, &hit)| hit && global_coverage[edge] == 0);

    for (edge, &hit) in local_hits.iter().enumerate() {
        if hit {
            global_coverage[edge] += 1;
        }
    }

    let timeout = payload.len() >= TIMEOUT_LEN;
    let will_crash = payload.windows(CRASH_MAGIC.len()).any(|w| w == CRASH_MAGIC);

    let crashed = if will_crash {
        panic::catch_unwind(AssertUnwindSafe(|| {
            panic!("toy target hit its crash magic");
        }))
        .is_err()
    } else {
        false
    };

    let coverage_bitmap = Some(local_hits.iter().map(|&hit| hit as u32).collect());

    if crashed {
        return Signals {
            new_coverage,
            crash: true,
            timeout,
            status: Status::Crash,
            coverage_bitmap,
            bug_signature: Some(BugSignature {
                kind: Some("panic".to_string()),
                message_digest: Some(hivefuzz_core::seed::digest_text(
                    "toy target hit its crash magic",
                )),
                file: Some("fuzzer/src/target.rs".to_string()),
                line: None,
            }),
            ..Default::default()
        };
    }

    Signals {
        new_coverage,
        new_bug: false,
        crash: false,
        timeout,
        status: Status::Ok,
        coverage_bitmap,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_hit_of_any_byte_is_new_coverage() {
        let mut global = vec![0u32; COVERAGE_MAP_SIZE];
        let signals = run_target(&[1, 2, 3], &mut global);
        assert!(signals.new_coverage);
    }

    #[test]
    fn repeated_payload_is_not_new_coverage() {
        let mut global = vec![0u32; COVERAGE_MAP_SIZE];
        run_target(&[1, 2, 3], &mut global);
        let signals = run_target(&[1, 2, 3], &mut global);
        assert!(!signals.new_coverage);
    }

    #[test]
    fn crash_magic_is_reported_as_crash() {
        let mut global = vec![0u32; COVERAGE_MAP_SIZE];
        let signals = run_target(&[0xDE, 0xAD, 0xBE, 0xEF], &mut global);
        assert!(signals.crash);
        assert_eq!(signals.status, Status::Crash);
    }

    #[test]
    fn long_payload_is_flagged_as_timeout() {
        let mut global = vec![0u32; COVERAGE_MAP_SIZE];
        let payload = vec![0u8; TIMEOUT_LEN];
        let signals = run_target(&payload, &mut global);
        assert!(signals.timeout);
    }
}
