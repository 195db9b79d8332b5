//! Software stand-in for a GL context used by the unit tests.
//!
//! Tracks object lifetimes and binding state closely enough to raise the same
//! error flags a driver would for the calls the render units make, and keeps
//! an ordered call log for sequencing assertions.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use super::{Gpu, PrimitiveKind, ShaderStage};

const MAX_VERTEX_ATTRIBS: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttribPointer {
    pub index: u32,
    pub size: i32,
    pub stride: i32,
    pub offset: i32,
    pub buffer: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub mode: u32,
    pub first: i32,
    pub count: i32,
    pub program: u32,
    pub vertex_array: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateShader(u32),
    CompileShader(u32),
    DeleteShader(u32),
    CreateProgram(u32),
    AttachShader { program: u32, shader: u32 },
    DetachShader { program: u32, shader: u32 },
    LinkProgram(u32),
    UseProgram(Option<u32>),
    DeleteProgram(u32),
    CreateVertexArray(u32),
    BindVertexArray(Option<u32>),
    DeleteVertexArray(u32),
    CreateBuffer(u32),
    BindArrayBuffer(Option<u32>),
    UploadStatic(usize),
    DeleteBuffer(u32),
    AttribPointer(AttribPointer),
    EnableAttrib(u32),
    DisableAttrib(u32),
    DrawArrays { mode: u32, first: i32, count: i32 },
    Viewport([i32; 4]),
    Enable(u32),
    ClearColor([f32; 4]),
    Clear(u32),
}

struct ShaderObject {
    stage: ShaderStage,
    source: String,
    compiled: bool,
    info_log: String,
    delete_pending: bool,
}

#[derive(Default)]
struct ProgramObject {
    attached: Vec<u32>,
    linked: bool,
    info_log: String,
    attribs: HashMap<String, u32>,
    delete_pending: bool,
}

#[derive(Default)]
struct VertexArrayObject {
    enabled: BTreeSet<u32>,
    pointers: BTreeMap<u32, AttribPointer>,
}

#[derive(Default)]
struct State {
    next_id: u32,
    shaders: HashMap<u32, ShaderObject>,
    programs: HashMap<u32, ProgramObject>,
    vertex_arrays: HashMap<u32, VertexArrayObject>,
    buffers: HashMap<u32, Vec<u8>>,
    current_program: Option<u32>,
    bound_vertex_array: Option<u32>,
    bound_buffer: Option<u32>,
    viewport: [i32; 4],
    clear_color: [f32; 4],
    capabilities: BTreeSet<u32>,
    draws: Vec<DrawCall>,
    errors: VecDeque<u32>,
    calls: Vec<Call>,
    refuse_buffers: bool,
}

impl State {
    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn raise(&mut self, code: u32) {
        if !self.errors.contains(&code) {
            self.errors.push_back(code);
        }
    }

    fn release_shader_if_orphaned(&mut self, shader: u32) {
        let attached = self
            .programs
            .values()
            .any(|program| program.attached.contains(&shader));
        let pending = self
            .shaders
            .get(&shader)
            .map(|s| s.delete_pending)
            .unwrap_or(false);
        if pending && !attached {
            self.shaders.remove(&shader);
        }
    }

    fn release_program(&mut self, program: u32) {
        if let Some(object) = self.programs.remove(&program) {
            for shader in object.attached {
                self.release_shader_if_orphaned(shader);
            }
        }
    }
}

pub struct RecordingGpu {
    state: RefCell<State>,
}

impl RecordingGpu {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State::default()),
        }
    }

    /// Queues an error flag as if a previous call had failed.
    pub fn raise(&self, code: u32) {
        self.state.borrow_mut().raise(code);
    }

    /// Makes every later `create_buffer` call fail.
    pub fn refuse_buffers(&self) {
        self.state.borrow_mut().refuse_buffers = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn draws(&self) -> Vec<DrawCall> {
        self.state.borrow().draws.clone()
    }

    pub fn viewport_rect(&self) -> [i32; 4] {
        self.state.borrow().viewport
    }

    pub fn clear_color_value(&self) -> [f32; 4] {
        self.state.borrow().clear_color
    }

    pub fn is_enabled(&self, capability: u32) -> bool {
        self.state.borrow().capabilities.contains(&capability)
    }

    pub fn current_program(&self) -> Option<u32> {
        self.state.borrow().current_program
    }

    pub fn bound_vertex_array(&self) -> Option<u32> {
        self.state.borrow().bound_vertex_array
    }

    pub fn bound_array_buffer(&self) -> Option<u32> {
        self.state.borrow().bound_buffer
    }

    pub fn attrib_pointers(&self, vertex_array: u32) -> Vec<AttribPointer> {
        self.state
            .borrow()
            .vertex_arrays
            .get(&vertex_array)
            .map(|vao| vao.pointers.values().copied().collect())
            .unwrap_or_default()
    }

    pub fn enabled_attribs(&self, vertex_array: u32) -> Vec<u32> {
        self.state
            .borrow()
            .vertex_arrays
            .get(&vertex_array)
            .map(|vao| vao.enabled.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn buffer_data(&self, buffer: u32) -> Option<Vec<u8>> {
        self.state.borrow().buffers.get(&buffer).cloned()
    }

    /// Shaders, programs, vertex arrays and buffers still alive.
    pub fn live_objects(&self) -> usize {
        let state = self.state.borrow();
        state.shaders.len() + state.programs.len() + state.vertex_arrays.len() + state.buffers.len()
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl Default for RecordingGpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Pulls `layout(location = N) in <type> <name>;` declarations out of GLSL.
fn parse_attribute_locations(source: &str) -> HashMap<String, u32> {
    let mut locations = HashMap::new();
    for line in source.lines() {
        let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
        let Some(rest) = compact.strip_prefix("layout(location=") else {
            continue;
        };
        let Some((index, _)) = rest.split_once(')') else {
            continue;
        };
        let Ok(index) = index.parse::<u32>() else {
            continue;
        };
        let Some((_, declaration)) = line.split_once(')') else {
            continue;
        };
        let tokens: Vec<&str> = declaration.split_whitespace().collect();
        if let [qualifier, _ty, name, ..] = tokens.as_slice() {
            if *qualifier == "in" {
                locations.insert(name.trim_end_matches(';').to_string(), index);
            }
        }
    }
    locations
}

/// Names declared with a plain `in`/`out` storage qualifier.
fn interface_names(source: &str, qualifier: &str) -> BTreeSet<String> {
    source
        .lines()
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.as_slice() {
                [q, _ty, name] if *q == qualifier => Some(name.trim_end_matches(';').to_string()),
                _ => None,
            }
        })
        .collect()
}

impl Gpu for RecordingGpu {
    type Shader = u32;
    type Program = u32;
    type VertexArray = u32;
    type Buffer = u32;

    fn version_string(&self) -> String {
        "4.0.0 Recording".to_string()
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        let id = state.allocate();
        state.shaders.insert(
            id,
            ShaderObject {
                stage,
                source: String::new(),
                compiled: false,
                info_log: String::new(),
                delete_pending: false,
            },
        );
        state.calls.push(Call::CreateShader(id));
        Ok(id)
    }

    fn shader_source(&self, shader: u32, source: &str) {
        let mut state = self.state.borrow_mut();
        match state.shaders.get_mut(&shader) {
            Some(object) => object.source = source.to_string(),
            None => state.raise(glow::INVALID_VALUE),
        }
    }

    fn compile_shader(&self, shader: u32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::CompileShader(shader));
        let Some(object) = state.shaders.get_mut(&shader) else {
            state.raise(glow::INVALID_VALUE);
            return;
        };
        let source = object.source.trim_start();
        object.info_log = if !source.starts_with("#version") {
            "0:1(1): error: missing #version directive".to_string()
        } else if let Some(line) = source.lines().find(|l| l.trim_start().starts_with("#error")) {
            format!("0:1(1): error: {}", line.trim_start().trim_start_matches("#error").trim())
        } else if !source.contains("void main") {
            "error: entry point main not found".to_string()
        } else {
            String::new()
        };
        object.compiled = object.info_log.is_empty();
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        let mut state = self.state.borrow_mut();
        match state.shaders.get(&shader) {
            Some(object) => object.compiled,
            None => {
                state.raise(glow::INVALID_VALUE);
                false
            }
        }
    }

    fn shader_info_log(&self, shader: u32) -> String {
        let state = self.state.borrow();
        state
            .shaders
            .get(&shader)
            .map(|object| object.info_log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: u32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::DeleteShader(shader));
        match state.shaders.get_mut(&shader) {
            Some(object) => object.delete_pending = true,
            None => {
                state.raise(glow::INVALID_VALUE);
                return;
            }
        }
        state.release_shader_if_orphaned(shader);
    }

    fn create_program(&self) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        let id = state.allocate();
        state.programs.insert(id, ProgramObject::default());
        state.calls.push(Call::CreateProgram(id));
        Ok(id)
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::AttachShader { program, shader });
        if !state.shaders.contains_key(&shader) {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        let already_attached = match state.programs.get(&program) {
            Some(object) => object.attached.contains(&shader),
            None => {
                state.raise(glow::INVALID_VALUE);
                return;
            }
        };
        if already_attached {
            state.raise(glow::INVALID_OPERATION);
        } else if let Some(object) = state.programs.get_mut(&program) {
            object.attached.push(shader);
        }
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::DetachShader { program, shader });
        let position = match state.programs.get(&program) {
            Some(object) => object.attached.iter().position(|&s| s == shader),
            None => {
                state.raise(glow::INVALID_VALUE);
                return;
            }
        };
        match (position, state.programs.get_mut(&program)) {
            (Some(position), Some(object)) => {
                object.attached.remove(position);
            }
            _ => {
                state.raise(glow::INVALID_OPERATION);
                return;
            }
        }
        state.release_shader_if_orphaned(shader);
    }

    fn link_program(&self, program: u32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::LinkProgram(program));
        let Some(object) = state.programs.get(&program) else {
            state.raise(glow::INVALID_VALUE);
            return;
        };

        let mut vertex = None;
        let mut fragment = None;
        for shader in object.attached.iter().filter_map(|id| state.shaders.get(id)) {
            if !shader.compiled {
                continue;
            }
            match shader.stage {
                ShaderStage::Vertex => vertex = Some(shader.source.as_str()),
                ShaderStage::Fragment => fragment = Some(shader.source.as_str()),
            }
        }

        let (info_log, attribs) = match (vertex, fragment) {
            (Some(vertex), Some(fragment)) => {
                let outputs = interface_names(vertex, "out");
                let missing = interface_names(fragment, "in")
                    .into_iter()
                    .find(|name| !outputs.contains(name));
                match missing {
                    Some(name) => (
                        format!("error: fragment shader input `{}` has no matching vertex output", name),
                        HashMap::new(),
                    ),
                    None => (String::new(), parse_attribute_locations(vertex)),
                }
            }
            _ => (
                "error: program needs a compiled vertex and fragment shader".to_string(),
                HashMap::new(),
            ),
        };

        if let Some(object) = state.programs.get_mut(&program) {
            object.linked = info_log.is_empty();
            object.info_log = info_log;
            object.attribs = attribs;
        }
    }

    fn program_link_status(&self, program: u32) -> bool {
        let mut state = self.state.borrow_mut();
        match state.programs.get(&program) {
            Some(object) => object.linked,
            None => {
                state.raise(glow::INVALID_VALUE);
                false
            }
        }
    }

    fn program_info_log(&self, program: u32) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|object| object.info_log.clone())
            .unwrap_or_default()
    }

    fn attrib_location(&self, program: u32, name: &str) -> Option<u32> {
        let mut state = self.state.borrow_mut();
        let linked = state.programs.get(&program).map(|object| object.linked);
        match linked {
            Some(true) => state
                .programs
                .get(&program)
                .and_then(|object| object.attribs.get(name).copied()),
            Some(false) => {
                state.raise(glow::INVALID_OPERATION);
                None
            }
            None => {
                state.raise(glow::INVALID_VALUE);
                None
            }
        }
    }

    fn use_program(&self, program: Option<u32>) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::UseProgram(program));
        if let Some(id) = program {
            match state.programs.get(&id).map(|object| object.linked) {
                Some(true) => {}
                Some(false) => {
                    state.raise(glow::INVALID_OPERATION);
                    return;
                }
                None => {
                    state.raise(glow::INVALID_VALUE);
                    return;
                }
            }
        }
        let previous = std::mem::replace(&mut state.current_program, program);
        if let Some(previous) = previous.filter(|p| Some(*p) != program) {
            let pending = state
                .programs
                .get(&previous)
                .map(|object| object.delete_pending)
                .unwrap_or(false);
            if pending {
                state.release_program(previous);
            }
        }
    }

    fn delete_program(&self, program: u32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::DeleteProgram(program));
        if !state.programs.contains_key(&program) {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        if state.current_program == Some(program) {
            if let Some(object) = state.programs.get_mut(&program) {
                object.delete_pending = true;
            }
        } else {
            state.release_program(program);
        }
    }

    fn create_vertex_array(&self) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        let id = state.allocate();
        state.vertex_arrays.insert(id, VertexArrayObject::default());
        state.calls.push(Call::CreateVertexArray(id));
        Ok(id)
    }

    fn bind_vertex_array(&self, vertex_array: Option<u32>) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::BindVertexArray(vertex_array));
        if let Some(id) = vertex_array {
            if !state.vertex_arrays.contains_key(&id) {
                state.raise(glow::INVALID_OPERATION);
                return;
            }
        }
        state.bound_vertex_array = vertex_array;
    }

    fn delete_vertex_array(&self, vertex_array: u32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::DeleteVertexArray(vertex_array));
        if state.vertex_arrays.remove(&vertex_array).is_some()
            && state.bound_vertex_array == Some(vertex_array)
        {
            state.bound_vertex_array = None;
        }
    }

    fn create_buffer(&self) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        if state.refuse_buffers {
            return Err("buffer allocation refused".to_string());
        }
        let id = state.allocate();
        state.buffers.insert(id, Vec::new());
        state.calls.push(Call::CreateBuffer(id));
        Ok(id)
    }

    fn bind_array_buffer(&self, buffer: Option<u32>) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::BindArrayBuffer(buffer));
        if let Some(id) = buffer {
            if !state.buffers.contains_key(&id) {
                state.raise(glow::INVALID_OPERATION);
                return;
            }
        }
        state.bound_buffer = buffer;
    }

    fn upload_static(&self, data: &[u8]) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::UploadStatic(data.len()));
        let Some(id) = state.bound_buffer else {
            state.raise(glow::INVALID_OPERATION);
            return;
        };
        if let Some(storage) = state.buffers.get_mut(&id) {
            *storage = data.to_vec();
        }
    }

    fn delete_buffer(&self, buffer: u32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::DeleteBuffer(buffer));
        if state.buffers.remove(&buffer).is_some() && state.bound_buffer == Some(buffer) {
            state.bound_buffer = None;
        }
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32) {
        let mut state = self.state.borrow_mut();
        if index >= MAX_VERTEX_ATTRIBS || !(1..=4).contains(&size) || stride < 0 {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        let (Some(vao), Some(buffer)) = (state.bound_vertex_array, state.bound_buffer) else {
            state.raise(glow::INVALID_OPERATION);
            return;
        };
        let pointer = AttribPointer {
            index,
            size,
            stride,
            offset,
            buffer,
        };
        state.calls.push(Call::AttribPointer(pointer));
        if let Some(object) = state.vertex_arrays.get_mut(&vao) {
            object.pointers.insert(index, pointer);
        }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::EnableAttrib(index));
        if index >= MAX_VERTEX_ATTRIBS {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        match state.bound_vertex_array {
            Some(vao) => {
                if let Some(object) = state.vertex_arrays.get_mut(&vao) {
                    object.enabled.insert(index);
                }
            }
            None => state.raise(glow::INVALID_OPERATION),
        }
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::DisableAttrib(index));
        if index >= MAX_VERTEX_ATTRIBS {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        match state.bound_vertex_array {
            Some(vao) => {
                if let Some(object) = state.vertex_arrays.get_mut(&vao) {
                    object.enabled.remove(&index);
                }
            }
            None => state.raise(glow::INVALID_OPERATION),
        }
    }

    fn draw_arrays(&self, mode: PrimitiveKind, first: i32, count: i32) {
        let mut state = self.state.borrow_mut();
        let mode = mode.gl_enum();
        state.calls.push(Call::DrawArrays { mode, first, count });
        if first < 0 || count < 0 {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        let (Some(program), Some(vertex_array)) =
            (state.current_program, state.bound_vertex_array)
        else {
            state.raise(glow::INVALID_OPERATION);
            return;
        };
        state.draws.push(DrawCall {
            mode,
            first,
            count,
            program,
            vertex_array,
        });
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Viewport([x, y, width, height]));
        if width < 0 || height < 0 {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        state.viewport = [x, y, width, height];
    }

    fn enable(&self, capability: u32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Enable(capability));
        state.capabilities.insert(capability);
    }

    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::ClearColor([red, green, blue, alpha]));
        state.clear_color = [red, green, blue, alpha];
    }

    fn clear(&self, mask: u32) {
        self.record(Call::Clear(mask));
    }

    fn get_error(&self) -> u32 {
        self.state
            .borrow_mut()
            .errors
            .pop_front()
            .unwrap_or(glow::NO_ERROR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_layout_locations() {
        let source = "#version 400\nlayout(location=0) in vec4 in_Position;\nlayout (location = 1) in vec4 in_Color;\nout vec4 ex_Color;\n";
        let locations = parse_attribute_locations(source);
        assert_eq!(locations.get("in_Position"), Some(&0));
        assert_eq!(locations.get("in_Color"), Some(&1));
        assert_eq!(locations.len(), 2);
    }

    #[test]
    fn test_deleted_shader_lives_until_detached() {
        let gpu = RecordingGpu::new();
        let program = gpu.create_program().unwrap();
        let shader = gpu.create_shader(ShaderStage::Vertex).unwrap();
        gpu.attach_shader(program, shader);
        gpu.delete_shader(shader);
        assert_eq!(gpu.live_objects(), 2);

        gpu.detach_shader(program, shader);
        assert_eq!(gpu.live_objects(), 1);
        assert_eq!(gpu.get_error(), glow::NO_ERROR);
    }

    #[test]
    fn test_draw_without_program_is_invalid_operation() {
        let gpu = RecordingGpu::new();
        let vao = gpu.create_vertex_array().unwrap();
        gpu.bind_vertex_array(Some(vao));
        gpu.draw_arrays(PrimitiveKind::Triangles, 0, 3);

        assert_eq!(gpu.get_error(), glow::INVALID_OPERATION);
        assert!(gpu.draws().is_empty());
    }
}
