//! Fuzz target for `Authorization: Basic` parsing.

#![no_main]

use concerto_auth::BasicCredentials;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(header) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(creds) = BasicCredentials::from_header(header) {
        assert!(!creds.username.contains(':'));

        assert_eq!(format!("{:?}", creds.password), "[REDACTED]");

        let reparsed = BasicCredentials::from_header(&creds.to_header())
            .expect("re-encoded credentials parse");
        assert_eq!(reparsed, creds);
    }
});
