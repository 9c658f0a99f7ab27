//! Process-wide logging setup shared by every orgguard binary and test
//! harness.

pub mod subscriber;

/// Install the JSON subscriber, filtered by `RUST_LOG` (default `info`).
///
/// Safe to call multiple times; only the first call installs anything.
pub fn init() {
    subscriber::init(subscriber::DEFAULT_DIRECTIVES);
}
