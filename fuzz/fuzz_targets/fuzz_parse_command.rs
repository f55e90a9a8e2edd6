#![no_main]

//! Command parser fuzzer.
//!
//! Arbitrary payloads must either parse or be rejected as malformed, and a
//! parsed update never carries more waypoints than allowed.

use huntercore::game::{parse_command, GameCommand};
use huntercore::EngineError;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(payload) = std::str::from_utf8(data) else {
        return;
    };
    match parse_command("fuzzer", payload, 100) {
        Ok(GameCommand::Update { orders, .. }) => {
            for order in orders.values() {
                if let Some(wp) = &order.waypoints {
                    assert!(wp.len() <= 100);
                    assert!(wp.windows(2).all(|w| w[0] != w[1]));
                }
            }
        }
        Ok(GameCommand::Spawn { color, .. }) => assert!(color < 4),
        Err(e) => assert!(matches!(e, EngineError::MalformedCommand { .. })),
    }
});
