// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The Configured state.

[`Engine::configure`] validates the scene, uploads every buffer, links the program and binds
everything exactly once.  Any failure aborts startup; there is no partial or degraded mode.
[`Engine::start`] then consumes the engine and produces the running [`Port`].
*/

use crate::bindings::bind_style::BindStyle;
use crate::bindings::handle_table::{self, BindlessHandleTable};
use crate::bindings::parameter_table::{self, InstanceParameterTable};
use crate::bindings::texture_allocator::TextureAllocator;
use crate::bindings::visible_to::GPUBufferUsage;
use crate::images::host::FramePacing;
use crate::images::indirect::{self, DrawIndexedIndirect};
use crate::images::port::Port;
use crate::images::shader::{InterfaceMismatch, ProgramDescriptor};
use crate::images::vertex_layout::{Mesh, MeshBuffers};
use crate::imp::{self, Backend, BufferId, ProgramId};
use crate::pixel_formats::{Float4, as_bytes};

/// Runtime configuration of the frame loop.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub clear_color: Float4,
    pub pacing: FramePacing,
    pub debug_name: &'static str,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            clear_color: Float4 {
                r: 0.1,
                g: 0.1,
                b: 0.1,
                a: 1.0,
            },
            pacing: FramePacing::default(),
            debug_name: "bindless multidraw",
        }
    }
}

/// Everything the setup phase produced, before it is uploaded.
#[derive(Debug)]
pub struct SceneResources {
    pub textures: TextureAllocator,
    pub parameters: InstanceParameterTable,
    pub handles: BindlessHandleTable,
    pub mesh: Mesh,
    pub draw: DrawIndexedIndirect,
    pub program: ProgramDescriptor,
}

/// GPU-side identities established at configure time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundScene {
    pub parameters: BufferId,
    pub handles: BufferId,
    pub mesh: MeshBuffers,
    pub indirect: BufferId,
    pub program: ProgramId,
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SetupError {
    #[error("Handle table has {handles} entries but parameter table has {parameters}")]
    TableLength { handles: usize, parameters: usize },
    #[error("Invalid draw descriptor {0}")]
    Descriptor(#[from] indirect::Error),
    #[error("Handle table entry {index} is not the texture of instance {index}")]
    MisplacedHandle { index: usize },
    #[error("Program interface mismatch {0}")]
    InterfaceMismatch(#[from] InterfaceMismatch),
    #[error("Can't upload parameters {0}")]
    Parameters(#[from] parameter_table::Error),
    #[error("Can't upload handles {0}")]
    Handles(#[from] handle_table::Error),
    #[error("Backend error {0}")]
    Backend(#[from] imp::Error),
}

/// A fully bound scene on a backend, not yet running.
#[derive(Debug)]
pub struct Engine<B: Backend> {
    backend: B,
    config: EngineConfig,
    resources: SceneResources,
    bound: BoundScene,
}

impl<B: Backend> Engine<B> {
    pub fn configure(
        mut backend: B,
        config: EngineConfig,
        resources: SceneResources,
    ) -> Result<Self, SetupError> {
        let backend_name = backend.name();
        logwise::info_sync!(
            "configuring {name} on {backend}",
            name = logwise::privacy::LogIt(&config.debug_name),
            backend = logwise::privacy::LogIt(&backend_name)
        );
        validate(&resources)?;

        let mesh = resources.mesh.upload(&mut backend)?;
        let parameters = resources.parameters.upload(&mut backend)?;
        let handles = resources.handles.upload(&mut backend)?;
        let indirect = backend.create_buffer(
            GPUBufferUsage::Indirect,
            as_bytes(&[resources.draw]),
            "indirect draw descriptor",
        )?;

        let program = match backend.link_program(&resources.program) {
            Ok(program) => program,
            Err(imp::Error::Link { label, diagnostics }) => {
                logwise::error_sync!(
                    "program {label} failed to link: {diagnostics}",
                    label = logwise::privacy::LogIt(&label),
                    diagnostics = logwise::privacy::LogIt(&diagnostics)
                );
                return Err(imp::Error::Link { label, diagnostics }.into());
            }
            Err(e) => return Err(e.into()),
        };

        let interface = &resources.program.interface;
        let mut bind_style = BindStyle::new();
        bind_style.bind_storage_buffer(interface.parameter_slot, interface.parameter_stage, parameters);
        bind_style.bind_storage_buffer(interface.handle_slot, interface.handle_stage, handles);
        bind_style.bind_vertex_buffer(mesh.vertices);
        bind_style.bind_index_buffer(mesh.indices);
        bind_style.bind_indirect_buffer(indirect);
        backend.bind(program, &bind_style)?;

        logwise::info_sync!(
            "configured {instances} instances",
            instances = resources.handles.len()
        );
        Ok(Engine {
            backend,
            config,
            resources,
            bound: BoundScene {
                parameters,
                handles,
                mesh,
                indirect,
                program,
            },
        })
    }

    /// Configured -> Running.  There is no way back.
    pub fn start(self) -> Port<B> {
        logwise::info_sync!(
            "starting {name}",
            name = logwise::privacy::LogIt(&self.config.debug_name)
        );
        Port::new(self.backend, self.config, self.resources, self.bound)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resources(&self) -> &SceneResources {
        &self.resources
    }
}

fn validate(resources: &SceneResources) -> Result<(), SetupError> {
    let handles = resources.handles.len();
    let parameters = resources.parameters.len();
    if handles != parameters {
        return Err(SetupError::TableLength {
            handles,
            parameters,
        });
    }
    resources.draw.validate(handles, resources.mesh.index_count())?;
    if resources.draw.is_noop() {
        logwise::warn_sync!("draw descriptor is a no-op; frames will only clear");
    }

    //the allocator records textures in instance order
    let mut owned = resources.textures.handles();
    for (index, handle) in resources.handles.iter().enumerate() {
        if owned.next() != Some(handle) {
            return Err(SetupError::MisplacedHandle { index });
        }
    }

    resources.program.interface.check_host_layout()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::handle_table::BindlessHandle;
    use crate::images::grid::GridScene;
    use crate::imp::software::SoftwareBackend;

    #[test]
    fn mismatched_tables_are_rejected() {
        let mut backend = SoftwareBackend::new();
        let mut scene = GridScene::new(2, 2).build(&mut backend).unwrap();
        scene.parameters = InstanceParameterTable::from_records(&[Default::default(); 3]);
        let err = Engine::configure(backend, EngineConfig::default(), scene).unwrap_err();
        assert!(matches!(
            err,
            SetupError::TableLength {
                handles: 4,
                parameters: 3
            }
        ));
    }

    #[test]
    fn foreign_handles_are_rejected() {
        let mut backend = SoftwareBackend::new();
        let mut scene = GridScene::new(2, 1).build(&mut backend).unwrap();
        let first = scene.handles.get(0).unwrap();
        scene.handles = BindlessHandleTable::from_handles(&[first, BindlessHandle::from_raw(42)]);
        let err = Engine::configure(backend, EngineConfig::default(), scene).unwrap_err();
        assert!(matches!(err, SetupError::MisplacedHandle { index: 1 }));
    }

    #[test]
    fn permuted_handles_are_rejected() {
        let mut backend = SoftwareBackend::new();
        let mut scene = GridScene::new(2, 1).build(&mut backend).unwrap();
        let h0 = scene.handles.get(0).unwrap();
        let h1 = scene.handles.get(1).unwrap();
        scene.handles = BindlessHandleTable::from_handles(&[h1, h0]);
        let err = Engine::configure(backend, EngineConfig::default(), scene).unwrap_err();
        assert!(matches!(err, SetupError::MisplacedHandle { index: 0 }));
    }

    #[test]
    fn duplicated_handles_are_rejected() {
        let mut backend = SoftwareBackend::new();
        let mut scene = GridScene::new(2, 1).build(&mut backend).unwrap();
        let h0 = scene.handles.get(0).unwrap();
        scene.handles = BindlessHandleTable::from_handles(&[h0, h0]);
        let err = Engine::configure(backend, EngineConfig::default(), scene).unwrap_err();
        assert!(matches!(err, SetupError::MisplacedHandle { index: 1 }));
    }

    #[test]
    fn interface_is_checked_before_upload() {
        let mut backend = SoftwareBackend::new();
        let mut scene = GridScene::new(1, 1).build(&mut backend).unwrap();
        scene.program.interface.handle_record_size = 4;
        let err = Engine::configure(backend, EngineConfig::default(), scene).unwrap_err();
        assert!(matches!(err, SetupError::InterfaceMismatch(_)));
    }

    #[test]
    fn configure_binds_once() {
        let mut backend = SoftwareBackend::new();
        let scene = GridScene::new(2, 2).build(&mut backend).unwrap();
        let engine = Engine::configure(backend, EngineConfig::default(), scene).unwrap();
        assert_eq!(engine.backend().bind_count(), 1);
        assert_eq!(engine.resources().handles.len(), 4);
    }
}
