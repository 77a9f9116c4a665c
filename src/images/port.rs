// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Implements the Running state: the frame submission loop for a single target.
//!
//! Every frame is clear, exactly one indirect multidraw, present.  The draw reads one
//! descriptor no matter how many instances it covers; the per-instance fan-out happens on the
//! GPU through the instance index.  Nothing bound at configure time is touched again until
//! [`Port::shutdown`].

use crate::bindings::texture_allocator;
use crate::images::engine::{BoundScene, EngineConfig, SceneResources};
use crate::images::frame::FrameCapture;
use crate::images::host::{Host, RunState};
use crate::images::indirect::DrawIndexedIndirect;
use crate::imp::{self, Backend};
use crate::sys::time::{Duration, Instant};

/// Number of descriptors each frame's multidraw reads.
const DRAW_COUNT: u32 = 1;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FrameError {
    #[error("Frame {frame} failed {source}")]
    Backend {
        frame: u64,
        #[source]
        source: imp::Error,
    },
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ShutdownError {
    #[error("Can't release textures {0}")]
    Release(#[from] texture_allocator::Error),
}

/// Summary of a [`Port::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunReport {
    pub frames: u64,
    pub elapsed: Duration,
    /// Slowest single `render_frame`, excluding pacing.
    pub slowest_frame: Duration,
}

/// A running scene.
#[derive(Debug)]
pub struct Port<B: Backend> {
    backend: B,
    config: EngineConfig,
    resources: SceneResources,
    bound: BoundScene,
    frame: u64,
}

impl<B: Backend> Port<B> {
    pub(crate) fn new(
        backend: B,
        config: EngineConfig,
        resources: SceneResources,
        bound: BoundScene,
    ) -> Self {
        logwise::debuginternal_sync!(
            "port bound to {bound}",
            bound = logwise::privacy::LogIt(&bound)
        );
        Self {
            backend,
            config,
            resources,
            bound,
            frame: 0,
        }
    }

    /// Clears, issues the single multidraw, and presents.
    pub fn render_frame(&mut self) -> Result<(), FrameError> {
        let interval = logwise::perfwarn_begin!("Port::render_frame");
        let frame = self.frame;
        let wrap = |source| FrameError::Backend { frame, source };
        self.backend.clear(self.config.clear_color).map_err(wrap)?;
        self.backend
            .multi_draw_indexed_indirect(DRAW_COUNT, DrawIndexedIndirect::STRIDE)
            .map_err(wrap)?;
        self.backend.present().map_err(wrap)?;
        drop(interval);
        logwise::trace_sync!("presented frame {frame}", frame = frame);
        self.frame += 1;
        Ok(())
    }

    /**
    Drives the loop until the host returns [`RunState::Exit`].

    Each iteration pumps host events, renders one frame while the host reports
    [`RunState::Running`], then paces.  A failing frame ends the loop with that error; there
    is no retry.
    */
    pub fn run<H: Host>(&mut self, host: &mut H) -> Result<RunReport, FrameError> {
        let start = Instant::now();
        let mut report = RunReport::default();
        while host.pump_events() == RunState::Running {
            let frame_start = Instant::now();
            self.render_frame()?;
            let took = frame_start.elapsed();
            if took > report.slowest_frame {
                report.slowest_frame = took;
            }
            report.frames += 1;
            self.config.pacing.pace();
        }
        report.elapsed = start.elapsed();
        logwise::info_sync!(
            "host exited after {frames} frames",
            frames = report.frames
        );
        Ok(report)
    }

    /// Reads back the last presented frame.
    pub fn capture(&mut self) -> Result<FrameCapture, FrameError> {
        let frame = self.frame;
        self.backend
            .capture_frame()
            .map_err(|source| FrameError::Backend { frame, source })
    }

    /// Frames presented so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frame
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn resources(&self) -> &SceneResources {
        &self.resources
    }

    /// The buffers and program bound at configure time; every frame draws from these.
    pub fn bound(&self) -> &BoundScene {
        &self.bound
    }

    /**
    Ends the run: releases residency, destroys every texture, and hands the backend back.

    Buffers and the program stay with the backend and are reclaimed when it drops.
    */
    pub fn shutdown(mut self) -> Result<B, ShutdownError> {
        logwise::info_sync!(
            "shutting down after {frames} frames, releasing {textures} textures",
            frames = self.frame,
            textures = self.resources.textures.len()
        );
        self.resources.textures.release_all(&mut self.backend)?;
        Ok(self.backend)
    }
}

#[cfg(test)]
mod tests {
    use crate::images::engine::{Engine, EngineConfig};
    use crate::images::grid::GridScene;
    use crate::images::host::{FrameBudget, FramePacing};
    use crate::imp::software::SoftwareBackend;

    fn port(columns: u32, rows: u32) -> super::Port<SoftwareBackend> {
        let mut backend = SoftwareBackend::with_target(32, 32);
        let scene = GridScene::new(columns, rows).build(&mut backend).unwrap();
        let config = EngineConfig {
            pacing: FramePacing::Vsync,
            ..Default::default()
        };
        Engine::configure(backend, config, scene).unwrap().start()
    }

    #[test]
    fn one_draw_per_frame() {
        let mut port = port(2, 2);
        port.render_frame().unwrap();
        port.render_frame().unwrap();
        let draws = port.backend().draws();
        assert_eq!(draws.len(), 2);
        assert!(draws.iter().all(|d| d.draw_count == 1 && d.stride == 20));
        assert_eq!(draws[1].frame, 1);
    }

    #[test]
    fn run_stops_on_exit() {
        let mut port = port(1, 1);
        let report = port.run(&mut FrameBudget::new(3)).unwrap();
        assert_eq!(report.frames, 3);
        assert_eq!(port.frames_rendered(), 3);
    }

    #[test]
    fn bound_buffers_hold_the_tables() {
        let port = port(4, 2);
        let bound = *port.bound();
        let backend = port.backend();
        assert_eq!(backend.buffer_len(bound.parameters), Some(8 * 8));
        assert_eq!(backend.buffer_len(bound.handles), Some(8 * 8));
        assert_eq!(backend.buffer_len(bound.indirect), Some(20));
        assert_eq!(backend.buffer_len(bound.mesh.indices), Some(3 * 4));
        assert_ne!(bound.parameters, bound.handles);
    }

    #[test]
    fn shutdown_releases_residency() {
        let mut port = port(2, 1);
        port.render_frame().unwrap();
        let handles: Vec<_> = port.resources().handles.iter().collect();
        let backend = port.shutdown().unwrap();
        assert_eq!(backend.texture_count(), 0);
        assert!(handles.iter().all(|h| !backend.is_resident(*h)));
    }
}
