//! Cross-subsystem integration tests.

pub mod flows;
pub mod persistence;

use std::time::Duration;

/// Poll `condition` every 10ms for up to two seconds.
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
