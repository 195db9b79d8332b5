use std::fmt;
use std::mem;

use bytemuck::{Pod, Zeroable};
use log::{error, warn};

use crate::gpu::{self, Gpu, PrimitiveKind};
use crate::utils::GeometryError;

/// Interleaved per-vertex data as it sits in the GPU buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ColoredVertex {
    pub position: [f32; 4],
    pub color: [f32; 4],
}

/// Where one attribute lives inside a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSlot {
    pub location: u32,
    pub components: i32,
    pub offset: i32,
}

/// Byte layout of [`ColoredVertex`] and the shader locations it feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: i32,
    pub position: AttributeSlot,
    pub color: AttributeSlot,
}

impl VertexLayout {
    pub const INTERLEAVED: VertexLayout = VertexLayout {
        stride: mem::size_of::<ColoredVertex>() as i32,
        position: AttributeSlot {
            location: 0,
            components: 4,
            offset: 0,
        },
        color: AttributeSlot {
            location: 1,
            components: 4,
            offset: mem::size_of::<[f32; 4]>() as i32,
        },
    };

    pub fn slots(&self) -> [AttributeSlot; 2] {
        [self.position, self.color]
    }
}

/// The hard-coded demo triangle.
pub mod triangle_geometry {
    pub const VERTEX_COUNT: usize = 3;

    pub const POSITIONS: [[f32; 4]; VERTEX_COUNT] = [
        [-0.8, -0.8, 0.0, 1.0],
        [0.0, 0.8, 0.0, 1.0],
        [0.8, -0.8, 0.0, 1.0],
    ];

    pub const COLORS: [[f32; 4]; VERTEX_COUNT] = [
        [1.0, 0.0, 0.0, 1.0],
        [0.0, 1.0, 0.0, 1.0],
        [0.0, 0.0, 1.0, 1.0],
    ];
}

/// A vertex array plus the one data buffer backing it.
///
/// Contents are uploaded once at creation and never change.
pub struct GeometryBuffer<G: Gpu> {
    vertex_array: G::VertexArray,
    buffer: G::Buffer,
    vertex_count: usize,
    layout: VertexLayout,
}

impl<G: Gpu> fmt::Debug for GeometryBuffer<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeometryBuffer")
            .field("vertex_array", &self.vertex_array)
            .field("buffer", &self.buffer)
            .field("vertex_count", &self.vertex_count)
            .field("layout", &self.layout)
            .finish()
    }
}

impl<G: Gpu> GeometryBuffer<G> {
    /// Interleaves `positions` and `colors` and uploads them as static data.
    pub fn create(
        gpu: &G,
        positions: &[[f32; 4]],
        colors: &[[f32; 4]],
        vertex_count: usize,
    ) -> Result<Self, GeometryError> {
        if vertex_count == 0 {
            return Err(GeometryError::Empty);
        }
        for (attribute, actual) in [("position", positions.len()), ("color", colors.len())] {
            if actual != vertex_count {
                return Err(GeometryError::AttributeCount {
                    attribute,
                    expected: vertex_count,
                    actual,
                });
            }
        }

        let vertices: Vec<ColoredVertex> = positions
            .iter()
            .zip(colors)
            .map(|(&position, &color)| ColoredVertex { position, color })
            .collect();

        Self::upload(gpu, &vertices)
    }

    fn upload(gpu: &G, vertices: &[ColoredVertex]) -> Result<Self, GeometryError> {
        if let Some(stale) = gpu::drain_errors(gpu) {
            warn!("Discarding pending GL error before geometry upload: {}", stale);
        }

        let layout = VertexLayout::INTERLEAVED;
        let vertex_array = gpu.create_vertex_array().map_err(GeometryError::Create)?;
        gpu.bind_vertex_array(Some(vertex_array));

        let buffer = match gpu.create_buffer() {
            Ok(buffer) => buffer,
            Err(message) => {
                gpu.bind_vertex_array(None);
                gpu.delete_vertex_array(vertex_array);
                return Err(GeometryError::Create(message));
            }
        };
        gpu.bind_array_buffer(Some(buffer));
        gpu.upload_static(bytemuck::cast_slice(vertices));

        for slot in layout.slots() {
            gpu.vertex_attrib_pointer_f32(slot.location, slot.components, layout.stride, slot.offset);
            gpu.enable_vertex_attrib_array(slot.location);
        }

        gpu.bind_vertex_array(None);
        gpu.bind_array_buffer(None);

        let geometry = Self {
            vertex_array,
            buffer,
            vertex_count: vertices.len(),
            layout,
        };

        if let Err(source) = gpu::check_error(gpu, "creating vertex buffer") {
            error!("Could not create a VBO");
            geometry.destroy(gpu);
            return Err(GeometryError::Gpu {
                operation: "creating vertex buffer",
                source,
            });
        }

        Ok(geometry)
    }

    pub fn bind(&self, gpu: &G) {
        gpu.bind_vertex_array(Some(self.vertex_array));
    }

    /// Draws `[0, vertex_count)` with whatever program and geometry are bound.
    pub fn draw(
        &self,
        gpu: &G,
        kind: PrimitiveKind,
        vertex_count: usize,
    ) -> Result<(), GeometryError> {
        let out_of_range = GeometryError::DrawRange {
            requested: vertex_count,
            available: self.vertex_count,
        };
        if vertex_count > self.vertex_count {
            return Err(out_of_range);
        }
        let count = i32::try_from(vertex_count).map_err(|_| out_of_range)?;
        gpu.draw_arrays(kind, 0, count);
        Ok(())
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn handles(&self) -> (G::VertexArray, G::Buffer) {
        (self.vertex_array, self.buffer)
    }

    /// Disables the attribute arrays, unbinds and deletes the buffer, then
    /// deletes the vertex array.
    pub fn destroy(self, gpu: &G) {
        gpu.bind_vertex_array(Some(self.vertex_array));
        for slot in self.layout.slots().iter().rev() {
            gpu.disable_vertex_attrib_array(slot.location);
        }
        gpu.bind_array_buffer(None);
        gpu.delete_buffer(self.buffer);

        gpu.bind_vertex_array(None);
        gpu.delete_vertex_array(self.vertex_array);

        if gpu::check_error(gpu, "destroying vertex buffer").is_err() {
            error!("Could not destroy the VBO");
        }
    }
}
