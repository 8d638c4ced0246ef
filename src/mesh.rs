use std::mem::size_of;
use std::rc::Rc;

use thiserror::Error;

use crate::gl::GlBackend;
use crate::shader::ActiveProgram;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("vertex data has {len} floats, not a multiple of the {stride}-float stride")]
    Misaligned { len: usize, stride: usize },
    #[error("graphics backend refused to create a vertex object: {0}")]
    Backend(String),
}

/// One float attribute inside an interleaved vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: usize,
    /// Offset from the start of the vertex, in floats.
    pub offset: usize,
}

/// Interleaved vertex layout; `stride` is in floats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: usize,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// Position, normal and texture coordinates.
    pub fn lit() -> Self {
        Self {
            stride: 8,
            attributes: vec![
                VertexAttribute {
                    location: 0,
                    components: 3,
                    offset: 0,
                },
                VertexAttribute {
                    location: 1,
                    components: 3,
                    offset: 3,
                },
                VertexAttribute {
                    location: 2,
                    components: 2,
                    offset: 6,
                },
            ],
        }
    }

    /// Only the position out of the lit layout, used for the light lamps.
    pub fn position_only() -> Self {
        Self {
            stride: 8,
            attributes: vec![VertexAttribute {
                location: 0,
                components: 3,
                offset: 0,
            }],
        }
    }
}

/// Vertex array plus its backing buffer, drawn as a triangle list.
pub struct Mesh<B: GlBackend> {
    backend: Rc<B>,
    vertex_array: B::VertexArray,
    buffer: B::Buffer,
    vertex_count: usize,
}

impl<B: GlBackend> Mesh<B> {
    pub fn new(backend: Rc<B>, vertices: &[f32], layout: &VertexLayout) -> Result<Self, MeshError> {
        if layout.stride == 0 || vertices.len() % layout.stride != 0 {
            return Err(MeshError::Misaligned {
                len: vertices.len(),
                stride: layout.stride,
            });
        }
        let vertex_array = backend.create_vertex_array().map_err(MeshError::Backend)?;
        let buffer = match backend.create_buffer() {
            Ok(buffer) => buffer,
            Err(err) => {
                backend.delete_vertex_array(vertex_array);
                return Err(MeshError::Backend(err));
            }
        };

        backend.bind_vertex_array(Some(vertex_array));
        backend.bind_array_buffer(Some(buffer));
        backend.array_buffer_data(bytemuck::cast_slice(vertices));
        let stride = (layout.stride * size_of::<f32>()) as i32;
        for attribute in &layout.attributes {
            backend.vertex_attrib_f32(
                attribute.location,
                attribute.components as i32,
                stride,
                (attribute.offset * size_of::<f32>()) as i32,
            );
        }
        backend.bind_array_buffer(None);
        backend.bind_vertex_array(None);

        Ok(Self {
            backend,
            vertex_array,
            buffer,
            vertex_count: vertices.len() / layout.stride,
        })
    }

    pub fn cube(backend: Rc<B>, layout: &VertexLayout) -> Result<Self, MeshError> {
        Self::new(backend, CUBE_VERTICES, layout)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Draws with whatever uniforms `_program` currently holds.
    pub fn draw(&self, _program: &ActiveProgram<'_, B>) {
        self.backend.bind_vertex_array(Some(self.vertex_array));
        self.backend.draw_triangles(0, self.vertex_count as i32);
        self.backend.bind_vertex_array(None);
    }
}

impl<B: GlBackend> Drop for Mesh<B> {
    fn drop(&mut self) {
        self.backend.delete_buffer(self.buffer);
        self.backend.delete_vertex_array(self.vertex_array);
    }
}

#[rustfmt::skip]
pub const CUBE_VERTICES: &[f32] = &[
    // positions          // normals           // uv
    -0.5, -0.5, -0.5,  0.0,  0.0, -1.0,  0.0, 0.0,
     0.5, -0.5, -0.5,  0.0,  0.0, -1.0,  1.0, 0.0,
     0.5,  0.5, -0.5,  0.0,  0.0, -1.0,  1.0, 1.0,
     0.5,  0.5, -0.5,  0.0,  0.0, -1.0,  1.0, 1.0,
    -0.5,  0.5, -0.5,  0.0,  0.0, -1.0,  0.0, 1.0,
    -0.5, -0.5, -0.5,  0.0,  0.0, -1.0,  0.0, 0.0,

    -0.5, -0.5,  0.5,  0.0,  0.0,  1.0,  0.0, 0.0,
     0.5, -0.5,  0.5,  0.0,  0.0,  1.0,  1.0, 0.0,
     0.5,  0.5,  0.5,  0.0,  0.0,  1.0,  1.0, 1.0,
     0.5,  0.5,  0.5,  0.0,  0.0,  1.0,  1.0, 1.0,
    -0.5,  0.5,  0.5,  0.0,  0.0,  1.0,  0.0, 1.0,
    -0.5, -0.5,  0.5,  0.0,  0.0,  1.0,  0.0, 0.0,

    -0.5,  0.5,  0.5, -1.0,  0.0,  0.0,  1.0, 0.0,
    -0.5,  0.5, -0.5, -1.0,  0.0,  0.0,  1.0, 1.0,
    -0.5, -0.5, -0.5, -1.0,  0.0,  0.0,  0.0, 1.0,
    -0.5, -0.5, -0.5, -1.0,  0.0,  0.0,  0.0, 1.0,
    -0.5, -0.5,  0.5, -1.0,  0.0,  0.0,  0.0, 0.0,
    -0.5,  0.5,  0.5, -1.0,  0.0,  0.0,  1.0, 0.0,

     0.5,  0.5,  0.5,  1.0,  0.0,  0.0,  1.0, 0.0,
     0.5,  0.5, -0.5,  1.0,  0.0,  0.0,  1.0, 1.0,
     0.5, -0.5, -0.5,  1.0,  0.0,  0.0,  0.0, 1.0,
     0.5, -0.5, -0.5,  1.0,  0.0,  0.0,  0.0, 1.0,
     0.5, -0.5,  0.5,  1.0,  0.0,  0.0,  0.0, 0.0,
     0.5,  0.5,  0.5,  1.0,  0.0,  0.0,  1.0, 0.0,

    -0.5, -0.5, -0.5,  0.0, -1.0,  0.0,  0.0, 1.0,
     0.5, -0.5, -0.5,  0.0, -1.0,  0.0,  1.0, 1.0,
     0.5, -0.5,  0.5,  0.0, -1.0,  0.0,  1.0, 0.0,
     0.5, -0.5,  0.5,  0.0, -1.0,  0.0,  1.0, 0.0,
    -0.5, -0.5,  0.5,  0.0, -1.0,  0.0,  0.0, 0.0,
    -0.5, -0.5, -0.5,  0.0, -1.0,  0.0,  0.0, 1.0,

    -0.5,  0.5, -0.5,  0.0,  1.0,  0.0,  0.0, 1.0,
     0.5,  0.5, -0.5,  0.0,  1.0,  0.0,  1.0, 1.0,
     0.5,  0.5,  0.5,  0.0,  1.0,  0.0,  1.0, 0.0,
     0.5,  0.5,  0.5,  0.0,  1.0,  0.0,  1.0, 0.0,
    -0.5,  0.5,  0.5,  0.0,  1.0,  0.0,  0.0, 0.0,
    -0.5,  0.5, -0.5,  0.0,  1.0,  0.0,  0.0, 1.0,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::testing::RecordingBackend;
    use crate::shader::{ProgramBinder, ShaderProgram};

    const VERTEX: &str = "layout (location = 0) in vec3 position;\nvoid main() {}";
    const FRAGMENT: &str = "out vec4 color;\nvoid main() {}";

    #[test]
    fn cube_has_thirty_six_vertices() {
        let backend = Rc::new(RecordingBackend::new());
        let mesh = Mesh::cube(Rc::clone(&backend), &VertexLayout::lit()).unwrap();
        assert_eq!(mesh.vertex_count(), 36);
        assert!(backend.called(&format!("array_buffer_data {}", 36 * 8 * 4)));
        assert_eq!(
            backend.attributes(),
            vec![(0, 3, 32, 0), (1, 3, 32, 12), (2, 2, 32, 24)]
        );
    }

    #[test]
    fn lamp_layout_only_describes_positions() {
        let backend = Rc::new(RecordingBackend::new());
        Mesh::cube(Rc::clone(&backend), &VertexLayout::position_only()).unwrap();
        assert_eq!(backend.attributes(), vec![(0, 3, 32, 0)]);
    }

    #[test]
    fn rejects_partial_vertices() {
        let backend = Rc::new(RecordingBackend::new());
        let err = Mesh::new(Rc::clone(&backend), &[0.0; 10], &VertexLayout::lit())
            .err()
            .unwrap();
        assert!(matches!(err, MeshError::Misaligned { len: 10, stride: 8 }));
        assert_eq!(backend.live_buffers(), 0);
    }

    #[test]
    fn draws_with_the_bound_program() {
        let backend = Rc::new(RecordingBackend::new());
        let mut program = ShaderProgram::new(Rc::clone(&backend));
        program.setup_from_source(VERTEX, FRAGMENT).unwrap();
        let mesh = Mesh::cube(Rc::clone(&backend), &VertexLayout::lit()).unwrap();

        let mut binder = ProgramBinder::new(Rc::clone(&backend));
        let active = program.begin(&mut binder).unwrap();
        mesh.draw(&active);
        let bound = backend.current_program();
        active.end();

        let draws = backend.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].0, bound);
        assert!(draws[0].1.is_some());
        assert_eq!(draws[0].2, 36);
    }

    #[test]
    fn drop_releases_buffers() {
        let backend = Rc::new(RecordingBackend::new());
        let mesh = Mesh::cube(Rc::clone(&backend), &VertexLayout::lit()).unwrap();
        assert_eq!(backend.live_buffers(), 2);
        drop(mesh);
        assert_eq!(backend.live_buffers(), 0);
    }
}
