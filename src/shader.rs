//! Shader program compilation and uniform binding.
//!
//! A [`ShaderProgram`] starts empty, is resolved exactly once by
//! [`ShaderProgram::setup_from_source`] or [`ShaderProgram::setup_from_file`],
//! and then stays either loaded or failed for the rest of its life. Uniform
//! writes are only possible through the [`ActiveProgram`] guard returned by
//! [`ShaderProgram::begin`], which keeps the program bound until it is
//! dropped or explicitly ended. Beginning a program borrows the context's
//! [`ProgramBinder`] mutably, so no second guard can rebind or unbind the
//! context while the first one is alive.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use glam::{Mat4, Vec3};
use log::{error, info, warn};
use thiserror::Error;

use crate::gl::{GlBackend, ShaderStageKind};
use crate::texture::TextureBinding;

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("unable to read shader source {}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to compile {} shader: {log}", stage.label())]
    Compile { stage: ShaderStageKind, log: String },
    #[error("failed to link program: {log}")]
    Link { log: String },
    #[error("graphics backend refused to create an object: {0}")]
    Backend(String),
    #[error("shader program has already been set up")]
    AlreadyResolved,
    #[error("shader program is not loaded")]
    NotLoaded,
    #[error("program binder belongs to a different context")]
    ForeignBinder,
}

/// Observable lifecycle of a [`ShaderProgram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramStatus {
    Empty,
    Compiling,
    Loaded,
    Failed,
}

enum ProgramState<B: GlBackend> {
    Empty,
    Compiling,
    Loaded(LinkedProgram<B>),
    Failed(String),
}

/// Shader object that is deleted when dropped.
struct ShaderStage<B: GlBackend> {
    backend: Rc<B>,
    raw: B::Shader,
    kind: ShaderStageKind,
}

impl<B: GlBackend> ShaderStage<B> {
    fn create(backend: &Rc<B>, kind: ShaderStageKind, source: &str) -> Result<Self, ShaderError> {
        let raw = backend
            .create_shader(kind)
            .map_err(ShaderError::Backend)?;
        backend.shader_source(raw, source);
        Ok(Self {
            backend: Rc::clone(backend),
            raw,
            kind,
        })
    }

    fn compile(&self) -> Result<(), ShaderError> {
        self.backend.compile_shader(self.raw);
        if self.backend.shader_compile_status(self.raw) {
            Ok(())
        } else {
            Err(ShaderError::Compile {
                stage: self.kind,
                log: self.backend.shader_info_log(self.raw),
            })
        }
    }
}

impl<B: GlBackend> Drop for ShaderStage<B> {
    fn drop(&mut self) {
        self.backend.delete_shader(self.raw);
    }
}

/// Program object that is deleted when dropped.
struct LinkedProgram<B: GlBackend> {
    backend: Rc<B>,
    raw: B::Program,
}

impl<B: GlBackend> Drop for LinkedProgram<B> {
    fn drop(&mut self) {
        self.backend.delete_program(self.raw);
    }
}

/// Exclusive right to make programs current on one context.
///
/// Create one binder per context and pass it to every [`ShaderProgram::begin`].
pub struct ProgramBinder<B: GlBackend> {
    backend: Rc<B>,
}

impl<B: GlBackend> ProgramBinder<B> {
    pub fn new(backend: Rc<B>) -> Self {
        Self { backend }
    }
}

pub struct ShaderProgram<B: GlBackend> {
    backend: Rc<B>,
    state: ProgramState<B>,
    locations: RefCell<HashMap<String, Option<B::UniformLocation>>>,
}

impl<B: GlBackend> ShaderProgram<B> {
    pub fn new(backend: Rc<B>) -> Self {
        Self {
            backend,
            state: ProgramState::Empty,
            locations: RefCell::new(HashMap::new()),
        }
    }

    /// Builds a program from two files, keeping it in the failed state when
    /// setup fails. `begin` refuses a failed program, so callers skip its
    /// draw pass.
    pub fn from_files(
        backend: Rc<B>,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Self {
        let (vertex_path, fragment_path) = (vertex_path.as_ref(), fragment_path.as_ref());
        let mut program = Self::new(backend);
        if let Err(err) = program.setup_from_file(vertex_path, fragment_path) {
            warn!(
                "program {} + {} will be skipped: {err}",
                vertex_path.display(),
                fragment_path.display()
            );
        }
        program
    }

    /// Reads both stages from disk, then compiles and links them.
    ///
    /// An unreadable path fails the program without attempting compilation.
    pub fn setup_from_file(
        &mut self,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Result<(), ShaderError> {
        self.ensure_empty()?;
        let sources = read_source(vertex_path.as_ref())
            .and_then(|vertex| Ok((vertex, read_source(fragment_path.as_ref())?)));
        match sources {
            Ok((vertex, fragment)) => self.setup_from_source(&vertex, &fragment),
            Err(err) => {
                error!("{err}");
                self.state = ProgramState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    pub fn setup_from_source(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<(), ShaderError> {
        self.ensure_empty()?;
        self.state = ProgramState::Compiling;
        match compile_and_link(&self.backend, vertex_src, fragment_src) {
            Ok(program) => {
                info!("Successfully loaded shader sources");
                self.state = ProgramState::Loaded(program);
                Ok(())
            }
            Err(err) => {
                error!("{err}");
                self.state = ProgramState::Failed(diagnostic_of(&err));
                Err(err)
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, ProgramState::Loaded(_))
    }

    pub fn status(&self) -> ProgramStatus {
        match self.state {
            ProgramState::Empty => ProgramStatus::Empty,
            ProgramState::Compiling => ProgramStatus::Compiling,
            ProgramState::Loaded(_) => ProgramStatus::Loaded,
            ProgramState::Failed(_) => ProgramStatus::Failed,
        }
    }

    /// Backend diagnostic captured when setup failed.
    pub fn diagnostic(&self) -> Option<&str> {
        match &self.state {
            ProgramState::Failed(log) => Some(log),
            _ => None,
        }
    }

    /// Makes this program the target of uniform writes and draw calls until
    /// the returned guard is ended or dropped. `binder` stays borrowed for
    /// that whole bracket.
    pub fn begin<'a>(
        &'a self,
        binder: &'a mut ProgramBinder<B>,
    ) -> Result<ActiveProgram<'a, B>, ShaderError> {
        if !Rc::ptr_eq(&self.backend, &binder.backend) {
            return Err(ShaderError::ForeignBinder);
        }
        let ProgramState::Loaded(program) = &self.state else {
            return Err(ShaderError::NotLoaded);
        };
        self.backend.use_program(Some(program.raw));
        Ok(ActiveProgram {
            program: self,
            raw: program.raw,
            _binder: binder,
        })
    }

    fn ensure_empty(&self) -> Result<(), ShaderError> {
        match self.state {
            ProgramState::Empty => Ok(()),
            _ => Err(ShaderError::AlreadyResolved),
        }
    }

    fn location(&self, raw: B::Program, name: &str) -> Option<B::UniformLocation> {
        if let Some(cached) = self.locations.borrow().get(name) {
            return cached.clone();
        }
        let location = self.backend.uniform_location(raw, name);
        self.locations
            .borrow_mut()
            .insert(name.to_string(), location.clone());
        location
    }
}

/// A bound [`ShaderProgram`].
///
/// Every setter resolves the uniform by name and silently does nothing when
/// the program has no such uniform, so shaders may omit optional inputs.
pub struct ActiveProgram<'a, B: GlBackend> {
    program: &'a ShaderProgram<B>,
    raw: B::Program,
    _binder: &'a mut ProgramBinder<B>,
}

impl<'a, B: GlBackend> ActiveProgram<'a, B> {
    pub fn backend(&self) -> &B {
        &self.program.backend
    }

    pub fn set_uniform_1f(&self, name: &str, v1: f32) {
        if let Some(location) = self.location(name) {
            self.backend().uniform_1_f32(&location, v1);
        }
    }

    pub fn set_uniform_2f(&self, name: &str, v1: f32, v2: f32) {
        if let Some(location) = self.location(name) {
            self.backend().uniform_2_f32(&location, v1, v2);
        }
    }

    pub fn set_uniform_3f(&self, name: &str, v1: f32, v2: f32, v3: f32) {
        if let Some(location) = self.location(name) {
            self.backend().uniform_3_f32(&location, v1, v2, v3);
        }
    }

    pub fn set_uniform_4f(&self, name: &str, v1: f32, v2: f32, v3: f32, v4: f32) {
        if let Some(location) = self.location(name) {
            self.backend().uniform_4_f32(&location, v1, v2, v3, v4);
        }
    }

    pub fn set_uniform_vec3(&self, name: &str, value: Vec3) {
        self.set_uniform_3f(name, value.x, value.y, value.z);
    }

    pub fn set_uniform_mat4(&self, name: &str, matrix: &Mat4) {
        if let Some(location) = self.location(name) {
            self.backend()
                .uniform_matrix_4_f32(&location, &matrix.to_cols_array());
        }
    }

    /// Activates texture unit `unit` and points the sampler at it.
    pub fn set_uniform_sampler_2d(&self, name: &str, unit: u32) {
        self.backend().active_texture(unit);
        if let Some(location) = self.location(name) {
            self.backend().uniform_1_i32(&location, unit as i32);
        }
    }

    /// Binds `texture` to unit `unit` and points the sampler at it.
    pub fn set_uniform_sampler_2d_with<T>(&self, name: &str, texture: &T, unit: u32)
    where
        T: TextureBinding + ?Sized,
    {
        self.backend().active_texture(unit);
        texture.bind();
        if let Some(location) = self.location(name) {
            self.backend().uniform_1_i32(&location, unit as i32);
        }
    }

    /// Unbinds the program.
    pub fn end(self) {}

    fn location(&self, name: &str) -> Option<B::UniformLocation> {
        self.program.location(self.raw, name)
    }
}

impl<B: GlBackend> Drop for ActiveProgram<'_, B> {
    fn drop(&mut self) {
        self.program.backend.use_program(None);
    }
}

fn read_source(path: &Path) -> Result<String, ShaderError> {
    fs::read_to_string(path).map_err(|source| ShaderError::FileOpen {
        path: path.to_path_buf(),
        source,
    })
}

fn diagnostic_of(err: &ShaderError) -> String {
    match err {
        ShaderError::Compile { log, .. } | ShaderError::Link { log } => log.clone(),
        other => other.to_string(),
    }
}

// Both stages are created up front; any early return drops them, which
// releases every shader object created so far.
fn compile_and_link<B: GlBackend>(
    backend: &Rc<B>,
    vertex_src: &str,
    fragment_src: &str,
) -> Result<LinkedProgram<B>, ShaderError> {
    let vertex = ShaderStage::create(backend, ShaderStageKind::Vertex, vertex_src)?;
    let fragment = ShaderStage::create(backend, ShaderStageKind::Fragment, fragment_src)?;
    vertex.compile()?;
    fragment.compile()?;

    let raw = backend.create_program().map_err(ShaderError::Backend)?;
    let program = LinkedProgram {
        backend: Rc::clone(backend),
        raw,
    };
    backend.attach_shader(raw, vertex.raw);
    backend.attach_shader(raw, fragment.raw);
    backend.link_program(raw);

    let linked = backend.program_link_status(raw);
    let log = if linked {
        String::new()
    } else {
        backend.program_info_log(raw)
    };
    backend.detach_shader(raw, vertex.raw);
    backend.detach_shader(raw, fragment.raw);

    if linked {
        Ok(program)
    } else {
        Err(ShaderError::Link { log })
    }
}
