// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0

//! Platform shims for frame timing.

pub mod time {
    //! `std::time` on native targets, `web_time` on wasm, where `std::time::Instant` panics.

    #[cfg(not(target_arch = "wasm32"))]
    pub use std::time::{Duration, Instant};

    #[cfg(target_arch = "wasm32")]
    pub use web_time::{Duration, Instant};

    /// Blocks the frame loop for `duration`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn sleep(duration: Duration) {
        std::thread::sleep(duration);
    }

    /**
    wasm has no thread sleep, so this spins on the clock and holds the only thread for the whole
    delay.  The browser can't run anything else meanwhile; wasm builds default to
    [`FramePacing::Vsync`](crate::images::host::FramePacing::Vsync) for that reason.
    */
    #[cfg(target_arch = "wasm32")]
    pub fn sleep(duration: Duration) {
        let until = Instant::now() + duration;
        while Instant::now() < until {
            std::hint::spin_loop();
        }
    }
}
