//! In-memory backend that mimics the GL object model closely enough to
//! observe lifecycles and uniform traffic in unit tests.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

use super::{GlBackend, ShaderStageKind, TextureParams};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum UniformValue {
    Float(Vec<f32>),
    Int(i32),
    Mat4([f32; 16]),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StubLocation {
    pub program: u32,
    pub name: String,
}

#[derive(Debug, Default)]
struct StubShader {
    source: String,
    compiled: bool,
}

#[derive(Debug, Default)]
struct StubProgram {
    attached: Vec<u32>,
    linked: bool,
    declared: BTreeSet<String>,
    values: HashMap<String, UniformValue>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u32,
    shaders: HashMap<u32, StubShader>,
    programs: HashMap<u32, StubProgram>,
    textures: BTreeSet<u32>,
    buffers: BTreeSet<u32>,
    vertex_arrays: BTreeSet<u32>,
    current_program: Option<u32>,
    active_unit: u32,
    unit_bindings: HashMap<u32, Option<u32>>,
    bound_vertex_array: Option<u32>,
    link_failure: Option<String>,
    calls: Vec<String>,
    errors: Vec<String>,
    lookups: usize,
    clear_color: [f32; 4],
    clears: Vec<u32>,
    draws: Vec<(Option<u32>, Option<u32>, i32)>,
    uploads: Vec<(u32, u32, usize)>,
    attributes: Vec<(u32, i32, i32, i32)>,
    shaders_deleted: usize,
    programs_deleted: usize,
    textures_deleted: usize,
}

impl State {
    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Recording backend.
///
/// A shader compiles when its source contains `void main`. Uniforms are
/// declared by `uniform <type> <name>...;` lines; a lookup succeeds when the
/// identifier before any `.` or `[` was declared by one of the attached
/// stages. Uniform writes land on the program currently in use, like GL.
#[derive(Debug, Default)]
pub(crate) struct RecordingBackend {
    state: RefCell<State>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_link(&self, log: &str) {
        self.state.borrow_mut().link_failure = Some(log.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn called(&self, call: &str) -> bool {
        self.state.borrow().calls.iter().any(|c| c == call)
    }

    pub fn errors(&self) -> Vec<String> {
        self.state.borrow().errors.clone()
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }

    pub fn live_buffers(&self) -> usize {
        let state = self.state.borrow();
        state.buffers.len() + state.vertex_arrays.len()
    }

    pub fn shaders_deleted(&self) -> usize {
        self.state.borrow().shaders_deleted
    }

    pub fn programs_deleted(&self) -> usize {
        self.state.borrow().programs_deleted
    }

    pub fn textures_deleted(&self) -> usize {
        self.state.borrow().textures_deleted
    }

    pub fn lookups(&self) -> usize {
        self.state.borrow().lookups
    }

    pub fn current_program(&self) -> Option<u32> {
        self.state.borrow().current_program
    }

    pub fn active_unit(&self) -> u32 {
        self.state.borrow().active_unit
    }

    pub fn texture_on_unit(&self, unit: u32) -> Option<u32> {
        self.state
            .borrow()
            .unit_bindings
            .get(&unit)
            .copied()
            .flatten()
    }

    pub fn uniform(&self, program: u32, name: &str) -> Option<UniformValue> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|p| p.values.get(name).cloned())
    }

    pub fn uniform_count(&self, program: u32) -> usize {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map_or(0, |p| p.values.len())
    }

    pub fn clear_color_value(&self) -> [f32; 4] {
        self.state.borrow().clear_color
    }

    pub fn clears(&self) -> Vec<u32> {
        self.state.borrow().clears.clone()
    }

    /// (program in use, bound vertex array, vertex count) per draw call.
    pub fn draws(&self) -> Vec<(Option<u32>, Option<u32>, i32)> {
        self.state.borrow().draws.clone()
    }

    /// (width, height, byte length) per texture upload.
    pub fn uploads(&self) -> Vec<(u32, u32, usize)> {
        self.state.borrow().uploads.clone()
    }

    /// (location, components, stride, offset) per attribute, in bytes.
    pub fn attributes(&self) -> Vec<(u32, i32, i32, i32)> {
        self.state.borrow().attributes.clone()
    }

    fn log(&self, call: String) {
        self.state.borrow_mut().calls.push(call);
    }

    fn write_uniform(&self, location: &StubLocation, value: UniformValue) {
        let mut state = self.state.borrow_mut();
        match state.current_program {
            Some(current) if current == location.program => {
                if let Some(program) = state.programs.get_mut(&current) {
                    program.values.insert(location.name.clone(), value);
                }
            }
            Some(current) => state.errors.push(format!(
                "uniform {} written while program {current} is in use",
                location.name
            )),
            None => state
                .errors
                .push(format!("uniform {} written with no program in use", location.name)),
        }
    }
}

fn declared_uniforms(source: &str) -> impl Iterator<Item = String> + '_ {
    source.lines().filter_map(|line| {
        let rest = line.trim().strip_prefix("uniform ")?;
        let name = rest.split_whitespace().nth(1)?;
        let base = name
            .split(|c| c == '[' || c == ';')
            .next()
            .unwrap_or_default();
        Some(base.to_string())
    })
}

fn base_name(name: &str) -> &str {
    name.split(|c| c == '.' || c == '[')
        .next()
        .unwrap_or_default()
}

impl GlBackend for RecordingBackend {
    type Shader = u32;
    type Program = u32;
    type Texture = u32;
    type Buffer = u32;
    type VertexArray = u32;
    type UniformLocation = StubLocation;

    fn create_shader(&self, stage: ShaderStageKind) -> Result<u32, String> {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.allocate();
            state.shaders.insert(id, StubShader::default());
            id
        };
        self.log(format!("create_shader {} {id}", stage.label()));
        Ok(id)
    }

    fn shader_source(&self, shader: u32, source: &str) {
        if let Some(stub) = self.state.borrow_mut().shaders.get_mut(&shader) {
            stub.source = source.to_string();
        }
    }

    fn compile_shader(&self, shader: u32) {
        if let Some(stub) = self.state.borrow_mut().shaders.get_mut(&shader) {
            stub.compiled = stub.source.contains("void main");
        }
        self.log(format!("compile_shader {shader}"));
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .is_some_and(|s| s.compiled)
    }

    fn shader_info_log(&self, shader: u32) -> String {
        if self.shader_compile_status(shader) {
            String::new()
        } else {
            "ERROR: 0:1: 'main' : function not found".to_string()
        }
    }

    fn delete_shader(&self, shader: u32) {
        let mut state = self.state.borrow_mut();
        if state.shaders.remove(&shader).is_some() {
            state.shaders_deleted += 1;
        } else {
            state.errors.push(format!("shader {shader} deleted twice"));
        }
    }

    fn create_program(&self) -> Result<u32, String> {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.allocate();
            state.programs.insert(id, StubProgram::default());
            id
        };
        self.log(format!("create_program {id}"));
        Ok(id)
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        if let Some(stub) = self.state.borrow_mut().programs.get_mut(&program) {
            stub.attached.push(shader);
        }
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        if let Some(stub) = self.state.borrow_mut().programs.get_mut(&program) {
            stub.attached.retain(|s| *s != shader);
        }
    }

    fn link_program(&self, program: u32) {
        self.log(format!("link_program {program}"));
        let mut state = self.state.borrow_mut();
        let failure = state.link_failure.take();
        let declared: BTreeSet<String> = match state.programs.get(&program) {
            Some(stub) => stub
                .attached
                .iter()
                .filter_map(|id| state.shaders.get(id))
                .flat_map(|shader| declared_uniforms(&shader.source).collect::<Vec<_>>())
                .collect(),
            None => return,
        };
        if let Some(stub) = state.programs.get_mut(&program) {
            stub.linked = failure.is_none();
            stub.declared = declared;
        }
        state.link_failure = failure;
    }

    fn program_link_status(&self, program: u32) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .is_some_and(|p| p.linked)
    }

    fn program_info_log(&self, program: u32) -> String {
        let mut state = self.state.borrow_mut();
        if state.programs.get(&program).is_some_and(|p| p.linked) {
            String::new()
        } else {
            state.link_failure.take().unwrap_or_default()
        }
    }

    fn delete_program(&self, program: u32) {
        let mut state = self.state.borrow_mut();
        if state.programs.remove(&program).is_some() {
            state.programs_deleted += 1;
        } else {
            state.errors.push(format!("program {program} deleted twice"));
        }
    }

    fn use_program(&self, program: Option<u32>) {
        self.state.borrow_mut().current_program = program;
        self.log(format!("use_program {program:?}"));
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<StubLocation> {
        let mut state = self.state.borrow_mut();
        state.lookups += 1;
        let stub = state.programs.get(&program)?;
        if stub.linked && stub.declared.contains(base_name(name)) {
            Some(StubLocation {
                program,
                name: name.to_string(),
            })
        } else {
            None
        }
    }

    fn uniform_1_f32(&self, location: &StubLocation, x: f32) {
        self.write_uniform(location, UniformValue::Float(vec![x]));
    }

    fn uniform_2_f32(&self, location: &StubLocation, x: f32, y: f32) {
        self.write_uniform(location, UniformValue::Float(vec![x, y]));
    }

    fn uniform_3_f32(&self, location: &StubLocation, x: f32, y: f32, z: f32) {
        self.write_uniform(location, UniformValue::Float(vec![x, y, z]));
    }

    fn uniform_4_f32(&self, location: &StubLocation, x: f32, y: f32, z: f32, w: f32) {
        self.write_uniform(location, UniformValue::Float(vec![x, y, z, w]));
    }

    fn uniform_1_i32(&self, location: &StubLocation, x: i32) {
        self.write_uniform(location, UniformValue::Int(x));
    }

    fn uniform_matrix_4_f32(&self, location: &StubLocation, matrix: &[f32; 16]) {
        self.write_uniform(location, UniformValue::Mat4(*matrix));
    }

    fn active_texture(&self, unit: u32) {
        self.state.borrow_mut().active_unit = unit;
        self.log(format!("active_texture {unit}"));
    }

    fn create_texture(&self) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        let id = state.allocate();
        state.textures.insert(id);
        Ok(id)
    }

    fn bind_texture_2d(&self, texture: Option<u32>) {
        let mut state = self.state.borrow_mut();
        let unit = state.active_unit;
        state.unit_bindings.insert(unit, texture);
    }

    fn tex_image_2d_rgb8(&self, width: u32, height: u32, pixels: &[u8], _params: TextureParams) {
        self.state
            .borrow_mut()
            .uploads
            .push((width, height, pixels.len()));
    }

    fn delete_texture(&self, texture: u32) {
        let mut state = self.state.borrow_mut();
        if state.textures.remove(&texture) {
            state.textures_deleted += 1;
        } else {
            state.errors.push(format!("texture {texture} deleted twice"));
        }
    }

    fn create_vertex_array(&self) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        let id = state.allocate();
        state.vertex_arrays.insert(id);
        Ok(id)
    }

    fn bind_vertex_array(&self, vertex_array: Option<u32>) {
        self.state.borrow_mut().bound_vertex_array = vertex_array;
    }

    fn delete_vertex_array(&self, vertex_array: u32) {
        self.state.borrow_mut().vertex_arrays.remove(&vertex_array);
    }

    fn create_buffer(&self) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        let id = state.allocate();
        state.buffers.insert(id);
        Ok(id)
    }

    fn bind_array_buffer(&self, _buffer: Option<u32>) {}

    fn array_buffer_data(&self, data: &[u8]) {
        self.log(format!("array_buffer_data {}", data.len()));
    }

    fn delete_buffer(&self, buffer: u32) {
        self.state.borrow_mut().buffers.remove(&buffer);
    }

    fn vertex_attrib_f32(&self, location: u32, components: i32, stride: i32, offset: i32) {
        self.state
            .borrow_mut()
            .attributes
            .push((location, components, stride, offset));
    }

    fn draw_triangles(&self, _first: i32, count: i32) {
        let mut state = self.state.borrow_mut();
        let entry = (state.current_program, state.bound_vertex_array, count);
        state.draws.push(entry);
    }

    fn viewport(&self, width: i32, height: i32) {
        self.log(format!("viewport {width}x{height}"));
    }

    fn enable_depth_test(&self) {
        self.log("enable_depth_test".to_string());
    }

    fn clear_color(&self, rgba: [f32; 4]) {
        self.state.borrow_mut().clear_color = rgba;
    }

    fn clear(&self, mask: u32) {
        self.state.borrow_mut().clears.push(mask);
    }
}
