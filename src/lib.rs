//! Building blocks for a small OpenGL lighting viewer.
//!
//! Everything that talks to the GPU goes through [`gl::GlBackend`], so the
//! shader lifecycle, texture and mesh ownership, and per-frame uniform
//! traffic can be exercised without a window. The `lightbox` binary wires
//! these modules to winit, glutin and glow.

pub mod app;
pub mod camera;
pub mod color;
pub mod gl;
pub mod input;
pub mod lighting;
pub mod mesh;
pub mod renderer;
pub mod scene;
pub mod shader;
pub mod texture;

pub use app::{scene_summary, AppContext, FrameClock, Viewport};
pub use camera::{Camera, Direction};
pub use color::Color;
pub use gl::GlBackend;
pub use input::{InputEvent, InputQueue, InputState, KeyCode};
pub use mesh::{Mesh, MeshError, VertexLayout};
pub use renderer::Renderer;
pub use scene::{DirectionalLight, PointLight, Scene, SpotLight};
pub use shader::{ActiveProgram, ProgramBinder, ProgramStatus, ShaderError, ShaderProgram};
pub use texture::{Texture2D, TextureBinding, TextureError};
