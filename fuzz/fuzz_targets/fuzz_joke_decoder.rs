#![no_main]

use libfuzzer_sys::fuzz_target;
use punchline::joke::decode_joke;

fuzz_target!(|data: &[u8]| {
    // Any accepted joke must have visible setup and punchline text.
    if let Ok(joke) = decode_joke(data) {
        assert!(!joke.setup.trim().is_empty());
        assert!(!joke.punchline.trim().is_empty());
    }
});
