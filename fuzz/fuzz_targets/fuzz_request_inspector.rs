//! Fuzz target for request inspection.
//!
//! The inspector sits on the request path, so arbitrary client bytes must
//! never make it panic.

#![no_main]

use concerto_git::{Action, RequestInspector, Service};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for service in Service::ALL {
        let mut inspector = RequestInspector::new(service, Action::Rpc);
        for chunk in data.chunks(13) {
            inspector.observe(chunk);
        }
        let _ = inspector.finish();
    }
});
