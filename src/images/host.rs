// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The host collaborator.

Window creation and the platform message pump belong to the host.  The loop only needs to
know, once per iteration, whether to keep going; that answer is an explicit [`RunState`]
returned from [`Host::pump_events`] rather than a global flag.
*/

use crate::sys::time::Duration;

/// What the host wants the loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Exit,
}

/// Supplies the message pump.
pub trait Host {
    /// Processes pending platform messages and reports whether to continue.
    fn pump_events(&mut self) -> RunState;
}

impl<F: FnMut() -> RunState> Host for F {
    fn pump_events(&mut self) -> RunState {
        self()
    }
}

/// A host that runs for a fixed number of frames, then exits.
///
/// Useful for headless rendering and tests.
#[derive(Debug, Clone)]
pub struct FrameBudget {
    remaining: u64,
}

impl FrameBudget {
    pub fn new(frames: u64) -> Self {
        Self { remaining: frames }
    }
}

impl Host for FrameBudget {
    fn pump_events(&mut self) -> RunState {
        if self.remaining == 0 {
            RunState::Exit
        } else {
            self.remaining -= 1;
            RunState::Running
        }
    }
}

/// How the loop waits between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePacing {
    /// Rely on the backend's present to block on the display.
    Vsync,
    /// Sleep on the host thread after each frame.
    FixedDelay(Duration),
}

/// A 100 ms delay on native targets.  On wasm a delay would busy-wait the only thread, so the
/// default there is [`FramePacing::Vsync`].
impl Default for FramePacing {
    #[cfg(not(target_arch = "wasm32"))]
    fn default() -> Self {
        FramePacing::FixedDelay(Duration::from_millis(100))
    }

    #[cfg(target_arch = "wasm32")]
    fn default() -> Self {
        FramePacing::Vsync
    }
}

impl FramePacing {
    pub(crate) fn pace(&self) {
        match self {
            FramePacing::Vsync => {}
            FramePacing::FixedDelay(d) => {
                if !d.is_zero() {
                    crate::sys::time::sleep(*d);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_exits_after_n() {
        let mut host = FrameBudget::new(2);
        assert_eq!(host.pump_events(), RunState::Running);
        assert_eq!(host.pump_events(), RunState::Running);
        assert_eq!(host.pump_events(), RunState::Exit);
        assert_eq!(host.pump_events(), RunState::Exit);
    }

    #[test]
    fn closures_are_hosts() {
        let mut calls = 0;
        let mut host = || {
            calls += 1;
            RunState::Exit
        };
        assert_eq!(host.pump_events(), RunState::Exit);
        drop(host);
        assert_eq!(calls, 1);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn default_pacing_is_100ms() {
        assert_eq!(
            FramePacing::default(),
            FramePacing::FixedDelay(Duration::from_millis(100))
        );
    }

    #[cfg(target_arch = "wasm32")]
    #[test]
    fn wasm_default_pacing_does_not_spin() {
        assert_eq!(FramePacing::default(), FramePacing::Vsync);
    }
}
