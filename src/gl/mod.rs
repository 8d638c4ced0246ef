//! The slice of OpenGL the crate talks to.
//!
//! Everything above this module is written against [`GlBackend`] so that the
//! program, texture and mesh lifecycles can be exercised without a context.

use std::fmt::Debug;

mod glow_backend;
#[cfg(test)]
pub(crate) mod testing;

pub const COLOR_BUFFER_BIT: u32 = glow::COLOR_BUFFER_BIT;
pub const DEPTH_BUFFER_BIT: u32 = glow::DEPTH_BUFFER_BIT;

/// Programmable pipeline stage a shader object belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStageKind {
    Vertex,
    Fragment,
}

impl ShaderStageKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        }
    }
}

/// Sampling state applied to a freshly created 2D texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureParams {
    pub repeat: bool,
    pub linear: bool,
    pub mipmaps: bool,
}

impl Default for TextureParams {
    fn default() -> Self {
        Self {
            repeat: true,
            linear: true,
            mipmaps: true,
        }
    }
}

/// Graphics entry points used by the crate.
///
/// Methods mirror their GL counterparts one to one. Object creation reports
/// backend failures as strings, matching what the driver hands back.
pub trait GlBackend {
    type Shader: Copy + Debug + PartialEq;
    type Program: Copy + Debug + PartialEq;
    type Texture: Copy + Debug + PartialEq;
    type Buffer: Copy + Debug + PartialEq;
    type VertexArray: Copy + Debug + PartialEq;
    type UniformLocation: Clone + Debug;

    fn create_shader(&self, stage: ShaderStageKind) -> Result<Self::Shader, String>;
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn delete_program(&self, program: Self::Program);
    fn use_program(&self, program: Option<Self::Program>);

    fn uniform_location(&self, program: Self::Program, name: &str)
        -> Option<Self::UniformLocation>;
    fn uniform_1_f32(&self, location: &Self::UniformLocation, x: f32);
    fn uniform_2_f32(&self, location: &Self::UniformLocation, x: f32, y: f32);
    fn uniform_3_f32(&self, location: &Self::UniformLocation, x: f32, y: f32, z: f32);
    fn uniform_4_f32(&self, location: &Self::UniformLocation, x: f32, y: f32, z: f32, w: f32);
    fn uniform_1_i32(&self, location: &Self::UniformLocation, x: i32);
    /// Uploads one column-major matrix, never transposed.
    fn uniform_matrix_4_f32(&self, location: &Self::UniformLocation, matrix: &[f32; 16]);

    fn active_texture(&self, unit: u32);
    fn create_texture(&self) -> Result<Self::Texture, String>;
    fn bind_texture_2d(&self, texture: Option<Self::Texture>);
    /// Uploads tightly packed RGB8 pixels into the bound 2D texture.
    fn tex_image_2d_rgb8(&self, width: u32, height: u32, pixels: &[u8], params: TextureParams);
    fn delete_texture(&self, texture: Self::Texture);

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String>;
    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>);
    fn delete_vertex_array(&self, vertex_array: Self::VertexArray);
    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    fn bind_array_buffer(&self, buffer: Option<Self::Buffer>);
    fn array_buffer_data(&self, data: &[u8]);
    fn delete_buffer(&self, buffer: Self::Buffer);
    /// Describes a float attribute; `stride` and `offset` are in bytes.
    fn vertex_attrib_f32(&self, location: u32, components: i32, stride: i32, offset: i32);
    fn draw_triangles(&self, first: i32, count: i32);

    fn viewport(&self, width: i32, height: i32);
    fn enable_depth_test(&self);
    fn clear_color(&self, rgba: [f32; 4]);
    fn clear(&self, mask: u32);
}
