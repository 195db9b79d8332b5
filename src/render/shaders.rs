// shaders.rs - Shader program compile, link and teardown

use std::fmt;

use log::{error, warn};

use crate::gpu::{self, Gpu, ShaderStage};
use crate::render::geometry::VertexLayout;
use crate::utils::ShaderError;

/// Pass-through shader sources for the colored triangle.
pub mod triangle_shaders {
    pub const POSITION_ATTRIBUTE: &str = "in_Position";
    pub const COLOR_ATTRIBUTE: &str = "in_Color";

    pub const VERTEX_SRC: &str = r#"#version 400
layout(location=0) in vec4 in_Position;
layout(location=1) in vec4 in_Color;
out vec4 ex_Color;

void main(void)
{
    gl_Position = in_Position;
    ex_Color = in_Color;
}
"#;

    pub const FRAGMENT_SRC: &str = r#"#version 400
in vec4 ex_Color;
out vec4 out_Color;

void main(void)
{
    out_Color = ex_Color;
}
"#;
}

/// One linked vertex + fragment program and the shader objects attached to it.
///
/// Only [`ShaderProgram::link`] produces a value, so a program that failed to
/// link can never be activated.
pub struct ShaderProgram<G: Gpu> {
    program: G::Program,
    vertex_shader: G::Shader,
    fragment_shader: G::Shader,
}

impl<G: Gpu> fmt::Debug for ShaderProgram<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("program", &self.program)
            .field("vertex_shader", &self.vertex_shader)
            .field("fragment_shader", &self.fragment_shader)
            .finish()
    }
}

impl<G: Gpu> ShaderProgram<G> {
    /// Compiles and links `vertex_source` and `fragment_source`.
    pub fn new(gpu: &G, vertex_source: &str, fragment_source: &str) -> Result<Self, ShaderError> {
        // Stale flags from earlier calls must not be blamed on this program.
        if let Some(stale) = gpu::drain_errors(gpu) {
            warn!("Discarding pending GL error before shader setup: {}", stale);
        }

        let vertex_shader = Self::compile(gpu, vertex_source, ShaderStage::Vertex)?;
        let fragment_shader = match Self::compile(gpu, fragment_source, ShaderStage::Fragment) {
            Ok(shader) => shader,
            Err(err) => {
                gpu.delete_shader(vertex_shader);
                return Err(err);
            }
        };

        let program = Self::link(gpu, vertex_shader, fragment_shader)?;

        if let Err(source) = gpu::check_error(gpu, "creating shader program") {
            program.destroy(gpu);
            return Err(ShaderError::Gpu {
                operation: "creating shader program",
                source,
            });
        }

        Ok(program)
    }

    /// Compiles one stage, returning the driver's info log on failure.
    ///
    /// The shader object is deleted before a compile error is returned.
    pub fn compile(gpu: &G, source: &str, stage: ShaderStage) -> Result<G::Shader, ShaderError> {
        let shader = gpu.create_shader(stage).map_err(ShaderError::Create)?;
        gpu.shader_source(shader, source);
        gpu.compile_shader(shader);

        if !gpu.shader_compile_status(shader) {
            let log = gpu.shader_info_log(shader);
            gpu.delete_shader(shader);
            error!("Failed to compile {} shader: {}", stage, log);
            return Err(ShaderError::Compile { stage, log });
        }

        Ok(shader)
    }

    /// Links two compiled shaders into a program.
    ///
    /// On failure the program and both shaders are released.
    pub fn link(
        gpu: &G,
        vertex_shader: G::Shader,
        fragment_shader: G::Shader,
    ) -> Result<Self, ShaderError> {
        let program = match gpu.create_program() {
            Ok(program) => program,
            Err(message) => {
                gpu.delete_shader(vertex_shader);
                gpu.delete_shader(fragment_shader);
                return Err(ShaderError::Create(message));
            }
        };

        gpu.attach_shader(program, vertex_shader);
        gpu.attach_shader(program, fragment_shader);
        gpu.link_program(program);

        let linked = Self {
            program,
            vertex_shader,
            fragment_shader,
        };

        if !gpu.program_link_status(program) {
            let log = gpu.program_info_log(program);
            error!("Failed to link shader program: {}", log);
            linked.destroy(gpu);
            return Err(ShaderError::Link { log });
        }

        Ok(linked)
    }

    pub fn activate(&self, gpu: &G) {
        gpu.use_program(Some(self.program));
    }

    pub fn deactivate(&self, gpu: &G) {
        gpu.use_program(None);
    }

    pub fn handle(&self) -> G::Program {
        self.program
    }

    pub fn shader_handles(&self) -> [G::Shader; 2] {
        [self.vertex_shader, self.fragment_shader]
    }

    /// Location the linker assigned to input attribute `name`.
    pub fn attribute_location(&self, gpu: &G, name: &str) -> Option<u32> {
        gpu.attrib_location(self.program, name)
    }

    /// Compares the linked attribute locations against `layout`.
    ///
    /// Returns the names whose location differs. A mismatch draws garbage
    /// rather than failing, so callers only warn about it.
    pub fn layout_mismatches(&self, gpu: &G, layout: &VertexLayout) -> Vec<&'static str> {
        let expected = [
            (triangle_shaders::POSITION_ATTRIBUTE, layout.position.location),
            (triangle_shaders::COLOR_ATTRIBUTE, layout.color.location),
        ];

        expected
            .into_iter()
            .filter(|(name, location)| self.attribute_location(gpu, name) != Some(*location))
            .map(|(name, _)| name)
            .collect()
    }

    /// Unbinds the program, detaches and deletes both shaders, then deletes
    /// the program.
    pub fn destroy(self, gpu: &G) {
        self.deactivate(gpu);

        gpu.detach_shader(self.program, self.vertex_shader);
        gpu.detach_shader(self.program, self.fragment_shader);

        gpu.delete_shader(self.vertex_shader);
        gpu.delete_shader(self.fragment_shader);
        gpu.delete_program(self.program);

        if gpu::check_error(gpu, "destroying shader program").is_err() {
            error!("Could not destroy shaders cleanly");
        }
    }
}
