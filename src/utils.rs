use wgpu::util::DeviceExt;
use bytemuck::{NoUninit};
use glam::{Mat4, Vec3};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, NoUninit)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.indices.is_empty()
    }

    /// Bake a node transform into positions and normals.
    pub fn transform(&mut self, m: Mat4) {
        let normal_m = m.inverse().transpose();
        for v in self.vertices.iter_mut() {
            v.pos = m.transform_point3(Vec3::from(v.pos)).into();
            v.normal = normal_m
                .transform_vector3(Vec3::from(v.normal))
                .normalize_or_zero()
                .into();
        }
    }

    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {

        let vertices = bytemuck::cast_slice(&self.vertices);
        let indices = bytemuck::cast_slice(&self.indices);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: indices,
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

/// Color ramp for terrain by normalized height: sand, grass, rock, snow.
fn terrain_color(h: f32) -> [f32; 4] {
    match h {
        h if h < 0.08 => [0.76, 0.70, 0.50, 1.0],
        h if h < 0.45 => [0.30, 0.55, 0.25, 1.0],
        h if h < 0.75 => [0.45, 0.42, 0.40, 1.0],
        _ => [0.95, 0.95, 0.97, 1.0],
    }
}

/// Build a grid mesh from row-major heights in [0, 1].
///
/// The grid spans `size` x `size` world units centred on the origin and
/// rises to `max_height` at full intensity.
pub fn create_terrain_mesh(heights: &[f32], cols: usize, rows: usize, size: f32, max_height: f32) -> Mesh {
    debug_assert_eq!(heights.len(), cols * rows);
    let step_x = size / (cols - 1) as f32;
    let step_z = size / (rows - 1) as f32;
    let half = size / 2.0;
    let at = |x: usize, z: usize| heights[z * cols + x] * max_height;

    let mut vertices = Vec::with_capacity(cols * rows);
    for z in 0..rows {
        for x in 0..cols {
            // Central differences, clamped at the border.
            let hl = at(x.saturating_sub(1), z);
            let hr = at((x + 1).min(cols - 1), z);
            let hd = at(x, z.saturating_sub(1));
            let hu = at(x, (z + 1).min(rows - 1));
            let normal = Vec3::new(hl - hr, 2.0 * step_x.min(step_z), hd - hu).normalize_or_zero();

            let h = heights[z * cols + x];
            vertices.push(Vertex {
                pos: [x as f32 * step_x - half, h * max_height, z as f32 * step_z - half],
                normal: normal.into(),
                color: terrain_color(h),
                uv: [x as f32 / (cols - 1) as f32, z as f32 / (rows - 1) as f32],
            });
        }
    }

    let mut indices = Vec::with_capacity((cols - 1) * (rows - 1) * 6);
    for z in 0..rows - 1 {
        for x in 0..cols - 1 {
            let i0 = (z * cols + x) as u32;
            let i1 = i0 + 1;
            let i2 = i0 + cols as u32;
            let i3 = i2 + 1;
            // Counter-clockwise seen from above.
            indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
        }
    }

    Mesh { vertices, indices }
}

/// Flat square at height `level`, facing up.
pub fn create_water_mesh(size: f32, level: f32, color: [f32; 4]) -> Mesh {
    let h = size / 2.0;
    let corners = [[-h, -h], [h, -h], [h, h], [-h, h]];
    let vertices = corners
        .iter()
        .map(|[x, z]| Vertex {
            pos: [*x, level, *z],
            normal: [0.0, 1.0, 0.0],
            color,
            uv: [(x + h) / size, (z + h) / size],
        })
        .collect();
    Mesh {
        vertices,
        indices: vec![0, 3, 1, 1, 3, 2],
    }
}
