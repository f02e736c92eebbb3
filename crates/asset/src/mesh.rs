//! CPU-side geometry representation produced by the OBJ parser.

/// Flat, non-indexed attribute arrays of one drawable unit.
/// Every three consecutive vertices form a triangle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometryData {
    /// `x y z` per vertex.
    pub position: Option<Vec<f32>>,
    /// `u v` per vertex.
    pub texcoord: Option<Vec<f32>>,
    /// `x y z` per vertex.
    pub normal: Option<Vec<f32>>,
}

impl GeometryData {
    /// Build from accumulated arrays, dropping the ones nothing was written to.
    pub fn from_arrays(position: Vec<f32>, texcoord: Vec<f32>, normal: Vec<f32>) -> Self {
        fn non_empty(values: Vec<f32>) -> Option<Vec<f32>> {
            (!values.is_empty()).then_some(values)
        }
        Self {
            position: non_empty(position),
            texcoord: non_empty(texcoord),
            normal: non_empty(normal),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.position.as_ref().map_or(0, |p| p.len() / 3)
    }

    pub fn triangle_count(&self) -> usize {
        self.vertex_count() / 3
    }
}

/// One geometry group of an OBJ document, tagged with the context
/// (`o`, `g`, `usemtl`) that was active when its first face was read.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    pub object: String,
    pub groups: Vec<String>,
    pub material: String,
    pub data: GeometryData,
}

impl Geometry {
    /// Present attributes as upload-ready views, in position/normal/texcoord order.
    pub fn attribute_buffers(&self) -> Vec<AttributeBuffer<'_>> {
        let d = &self.data;
        [
            (VertexAttribute::Position, d.position.as_deref()),
            (VertexAttribute::Normal, d.normal.as_deref()),
            (VertexAttribute::TexCoord, d.texcoord.as_deref()),
        ]
        .into_iter()
        .filter_map(|(attribute, data)| data.map(|data| AttributeBuffer::new(attribute, data)))
        .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    Position,
    Normal,
    TexCoord,
}

impl VertexAttribute {
    /// Scalars per vertex.
    pub fn components(self) -> u32 {
        match self {
            Self::Position | Self::Normal => 3,
            Self::TexCoord => 2,
        }
    }
}

/// Scalar type of an attribute buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarType {
    Float32,
}

impl ScalarType {
    pub fn size_in_bytes(self) -> u32 {
        match self {
            ScalarType::Float32 => 4,
        }
    }
}

/// Flat scalar array plus the layout a GPU backend needs to bind it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttributeBuffer<'a> {
    pub attribute: VertexAttribute,
    pub components: u32,
    pub scalar: ScalarType,
    pub data: &'a [f32],
}

impl<'a> AttributeBuffer<'a> {
    pub fn new(attribute: VertexAttribute, data: &'a [f32]) -> Self {
        Self {
            attribute,
            components: attribute.components(),
            scalar: ScalarType::Float32,
            data,
        }
    }

    /// Raw bytes for buffer upload.
    pub fn as_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(self.data)
    }

    pub fn stride(&self) -> u32 {
        self.components * self.scalar.size_in_bytes()
    }

    pub fn vertex_count(&self) -> usize {
        self.data.len() / self.components as usize
    }
}
