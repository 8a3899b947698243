//! Hand-assembled GLB files for importer tests.
//!
//! The fixture is a single skinned triangle:
//! - nodes: `root` (translated +Y) with child `arm` (translated +X), plus a
//!   `body` node holding the mesh and the skin
//! - skin joints `[root, arm]`, JOINTS_0 as u16, WEIGHTS_0 as f32
//! - one LINEAR animation `swing` rotating `arm` over one second

use serde_json::json;

/// Little-endian buffer builder with 4-byte aligned sections
struct BinaryBuffer {
    bytes: Vec<u8>,
}

impl BinaryBuffer {
    fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Append a section and return its (offset, length)
    fn push(&mut self, data: &[u8]) -> (usize, usize) {
        while !self.bytes.len().is_multiple_of(4) {
            self.bytes.push(0);
        }
        let offset = self.bytes.len();
        self.bytes.extend_from_slice(data);
        (offset, data.len())
    }
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn u16_bytes(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub const POSITIONS: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
pub const JOINTS: [[u16; 4]; 3] = [[1, 0, 0, 0], [0, 1, 0, 0], [0, 0, 0, 0]];
pub const WEIGHTS: [[f32; 4]; 3] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.5, 0.5, 0.0, 0.0],
    [1.0, 0.0, 0.0, 0.0],
];

/// Skinned triangle with one animation
pub fn skinned_triangle_glb() -> Vec<u8> {
    let mut buffer = BinaryBuffer::new();

    let positions = buffer.push(&f32_bytes(POSITIONS.as_flattened()));
    let normals = buffer.push(&f32_bytes(&[0.0f32, 0.0, 1.0].repeat(3)));
    let joints = buffer.push(&u16_bytes(JOINTS.as_flattened()));
    let weights = buffer.push(&f32_bytes(WEIGHTS.as_flattened()));
    let indices = buffer.push(&u16_bytes(&[0, 1, 2]));
    let times = buffer.push(&f32_bytes(&[0.0, 1.0]));
    let rotations = buffer.push(&f32_bytes(&[0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0]));

    let views: Vec<_> = [positions, normals, joints, weights, indices, times, rotations]
        .iter()
        .map(|&(offset, length)| {
            json!({ "buffer": 0, "byteOffset": offset, "byteLength": length })
        })
        .collect();

    const FLOAT: u32 = 5126;
    const UNSIGNED_SHORT: u32 = 5123;

    let root = json!({
        "asset": { "version": "2.0", "generator": "ill-export tests" },
        "scene": 0,
        "scenes": [{ "nodes": [0, 2] }],
        "nodes": [
            { "name": "root", "translation": [0.0, 1.0, 0.0], "children": [1] },
            { "name": "arm", "translation": [1.0, 0.0, 0.0] },
            { "name": "body", "mesh": 0, "skin": 0 }
        ],
        "skins": [{ "name": "rig", "joints": [0, 1] }],
        "meshes": [{
            "name": "body",
            "primitives": [{
                "attributes": {
                    "POSITION": 0,
                    "NORMAL": 1,
                    "JOINTS_0": 2,
                    "WEIGHTS_0": 3
                },
                "indices": 4,
                "mode": 4
            }]
        }],
        "animations": [{
            "name": "swing",
            "channels": [{ "sampler": 0, "target": { "node": 1, "path": "rotation" } }],
            "samplers": [{ "input": 5, "output": 6, "interpolation": "LINEAR" }]
        }],
        "accessors": [
            {
                "bufferView": 0, "componentType": FLOAT, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            },
            { "bufferView": 1, "componentType": FLOAT, "count": 3, "type": "VEC3" },
            { "bufferView": 2, "componentType": UNSIGNED_SHORT, "count": 3, "type": "VEC4" },
            { "bufferView": 3, "componentType": FLOAT, "count": 3, "type": "VEC4" },
            { "bufferView": 4, "componentType": UNSIGNED_SHORT, "count": 3, "type": "SCALAR" },
            {
                "bufferView": 5, "componentType": FLOAT, "count": 2, "type": "SCALAR",
                "min": [0.0], "max": [1.0]
            },
            { "bufferView": 6, "componentType": FLOAT, "count": 2, "type": "VEC4" }
        ],
        "bufferViews": views,
        "buffers": [{ "byteLength": buffer.bytes.len() }]
    });

    assemble_glb(&root, &buffer.bytes)
}

/// Assemble the final GLB binary
pub fn assemble_glb(root: &serde_json::Value, buffer_data: &[u8]) -> Vec<u8> {
    let json_string = serde_json::to_string(root).expect("Failed to serialize JSON");
    let json_bytes = json_string.as_bytes();

    // Pad both chunks to 4-byte alignment
    let json_padding = (4 - (json_bytes.len() % 4)) % 4;
    let json_chunk_length = json_bytes.len() + json_padding;
    let buffer_padding = (4 - (buffer_data.len() % 4)) % 4;
    let buffer_chunk_length = buffer_data.len() + buffer_padding;

    let total_length = 12 + 8 + json_chunk_length + 8 + buffer_chunk_length;
    let mut glb = Vec::with_capacity(total_length);

    // Header
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total_length as u32).to_le_bytes());

    // JSON chunk, padded with spaces
    glb.extend_from_slice(&(json_chunk_length as u32).to_le_bytes());
    glb.extend_from_slice(&0x4E4F534Au32.to_le_bytes());
    glb.extend_from_slice(json_bytes);
    glb.extend(std::iter::repeat_n(0x20u8, json_padding));

    // BIN chunk, padded with zeros
    glb.extend_from_slice(&(buffer_chunk_length as u32).to_le_bytes());
    glb.extend_from_slice(&0x004E4942u32.to_le_bytes());
    glb.extend_from_slice(buffer_data);
    glb.extend(std::iter::repeat_n(0u8, buffer_padding));

    glb
}
