use std::rc::Rc;

use crate::color::Color;
use crate::gl::{GlBackend, COLOR_BUFFER_BIT, DEPTH_BUFFER_BIT};
use crate::shader::{ShaderError, ShaderProgram};

pub(crate) const DEFAULT_VERTEX_SHADER: &str = r#"#version 330 core
layout (location = 0) in vec3 position;
void main()
{
    gl_Position = vec4(position, 1.0);
}
"#;

pub(crate) const DEFAULT_FRAGMENT_SHADER: &str = r#"#version 330 core
out vec4 outputColor;
void main()
{
    outputColor = vec4(1.0);
}
"#;

/// Frame clearing plus an optional pass-through program for untextured,
/// solid white geometry.
pub struct Renderer<B: GlBackend> {
    backend: Rc<B>,
    current_draw_color: Color,
    default_shader: ShaderProgram<B>,
    using_default_shader: bool,
}

impl<B: GlBackend> Renderer<B> {
    pub fn new(backend: Rc<B>) -> Self {
        Self {
            default_shader: ShaderProgram::new(Rc::clone(&backend)),
            backend,
            current_draw_color: Color::default(),
            using_default_shader: false,
        }
    }

    /// Compiles the built-in program and marks it as in use.
    pub fn setup_default_graphics(&mut self) -> Result<(), ShaderError> {
        self.using_default_shader = true;
        self.default_shader
            .setup_from_source(DEFAULT_VERTEX_SHADER, DEFAULT_FRAGMENT_SHADER)
    }

    pub fn uses_default_shader(&self) -> bool {
        self.using_default_shader
    }

    pub fn default_program(&self) -> &ShaderProgram<B> {
        &self.default_shader
    }

    pub fn color(&self) -> Color {
        self.current_draw_color
    }

    pub fn set_color(&mut self, color: Color) {
        self.current_draw_color = color;
    }

    pub fn set_color_rgba(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.current_draw_color.set(r, g, b, a);
    }

    /// Clears color and depth to `color`, given in the 0-255 convention.
    pub fn clear(&self, color: Color) {
        self.backend.clear_color(color.to_normalized());
        self.backend.clear(COLOR_BUFFER_BIT | DEPTH_BUFFER_BIT);
    }

    pub fn clear_rgba(&self, r: f32, g: f32, b: f32, a: f32) {
        self.clear(Color::rgba(r, g, b, a));
    }
}
