//! Flat per-triangle normals for geometry that ships without `vn` data.

use corelib::{ParseError, ParseResult};
use glam::Vec3;

/// Compute one normal per triangle of a flat position array
/// (9 scalars per triangle) and replicate it for the triangle's three
/// vertices. Winding is counter-clockwise / right-handed.
pub fn compute_flat_normals(positions: &[f32]) -> ParseResult<Vec<f32>> {
    if positions.len() % 9 != 0 {
        return Err(ParseError::TruncatedPositions {
            len: positions.len(),
        });
    }

    let mut normals = Vec::with_capacity(positions.len());
    for (triangle, tri) in positions.chunks_exact(9).enumerate() {
        let p0 = Vec3::from_slice(&tri[0..3]);
        let p1 = Vec3::from_slice(&tri[3..6]);
        let p2 = Vec3::from_slice(&tri[6..9]);

        let n = (p1 - p0).cross(p2 - p0);
        let length = n.length();
        if length == 0.0 || !length.is_finite() {
            return Err(ParseError::DegenerateTriangle { triangle });
        }

        let n = (n / length).to_array();
        for _ in 0..3 {
            normals.extend_from_slice(&n);
        }
    }
    Ok(normals)
}
