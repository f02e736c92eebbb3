//! OBJ parser producing flat, per-material geometry groups.

use std::{fs, io::Read, path::Path};

use anyhow::{Context, Result};
use corelib::{ParseError, ParseResult};

use crate::mesh::{Geometry, GeometryData};

const DEFAULT_NAME: &str = "default";

/// Everything `parse_geometry` extracts from an OBJ document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjDocument {
    /// Geometry groups in the order their first face appeared.
    pub geometries: Vec<Geometry>,
    /// `mtllib` references, in file order.
    pub material_libs: Vec<String>,
    /// One entry per `usemtl` directive, duplicates kept.
    pub materials: Vec<String>,
}

/// Load an OBJ document from a file path.
pub fn load_obj_from_path(path: impl AsRef<Path>) -> Result<ObjDocument> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to open OBJ file: {}", path.display()))?;
    parse_geometry(&text).with_context(|| format!("Failed to parse OBJ file: {}", path.display()))
}

/// Convenience helper to parse an OBJ string literal.
pub fn load_obj_from_str(contents: &str) -> Result<ObjDocument> {
    Ok(parse_geometry(contents)?)
}

/// Load an OBJ document from any [`Read`] implementation.
pub fn load_obj_from_reader<R: Read>(mut reader: R) -> Result<ObjDocument> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .context("Failed to read OBJ source")?;
    Ok(parse_geometry(&text)?)
}

/// Parse OBJ text in a single pass.
///
/// Faces are fan-triangulated and their vertices resolved against the
/// attribute tables as they stand at that line, so relative (negative)
/// indices see only the entries declared above them. A new geometry is
/// started by the first face after an `o`, `g` or `usemtl` change.
pub fn parse_geometry(text: &str) -> ParseResult<ObjDocument> {
    let mut parser = ObjParser::default();
    for (line_no, line) in text_lines(text).enumerate() {
        parser.parse_line(line, line_no + 1)?;
    }
    Ok(parser.finish())
}

/// Raw attribute tables. Index 0 holds a sentinel so OBJ's 1-based
/// indices address entries directly.
struct AttributeTables {
    positions: Vec<[f32; 3]>,
    texcoords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
}

impl Default for AttributeTables {
    fn default() -> Self {
        Self {
            positions: vec![[0.0; 3]],
            texcoords: vec![[0.0; 2]],
            normals: vec![[0.0; 3]],
        }
    }
}

/// Absolute table indices of one face vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct VertexRef {
    position: Option<usize>,
    texcoord: Option<usize>,
    normal: Option<usize>,
}

impl AttributeTables {
    fn resolve_vertex(&self, token: &str, line: usize) -> ParseResult<VertexRef> {
        let mut fields = token.split('/');
        Ok(VertexRef {
            position: resolve_field(fields.next(), self.positions.len(), line)?,
            texcoord: resolve_field(fields.next(), self.texcoords.len(), line)?,
            normal: resolve_field(fields.next(), self.normals.len(), line)?,
        })
    }
}

/// Geometry currently receiving faces.
struct PendingGeometry {
    object: String,
    groups: Vec<String>,
    material: String,
    position: Vec<f32>,
    texcoord: Vec<f32>,
    normal: Vec<f32>,
}

impl PendingGeometry {
    fn new(object: &str, groups: &[String], material: &str) -> Self {
        Self {
            object: object.to_owned(),
            groups: groups.to_vec(),
            material: material.to_owned(),
            position: Vec::new(),
            texcoord: Vec::new(),
            normal: Vec::new(),
        }
    }

    fn has_data(&self) -> bool {
        !(self.position.is_empty() && self.texcoord.is_empty() && self.normal.is_empty())
    }

    fn push_vertex(&mut self, tables: &AttributeTables, vertex: VertexRef) {
        // Indices were bounds-checked by `resolve_vertex`.
        if let Some(i) = vertex.position {
            self.position.extend_from_slice(&tables.positions[i]);
        }
        if let Some(i) = vertex.texcoord {
            self.texcoord.extend_from_slice(&tables.texcoords[i]);
        }
        if let Some(i) = vertex.normal {
            self.normal.extend_from_slice(&tables.normals[i]);
        }
    }

    fn finish(self) -> Geometry {
        Geometry {
            object: self.object,
            groups: self.groups,
            material: self.material,
            data: GeometryData::from_arrays(self.position, self.texcoord, self.normal),
        }
    }
}

struct ObjParser {
    tables: AttributeTables,
    object: String,
    groups: Vec<String>,
    material: String,
    pending: Option<PendingGeometry>,
    document: ObjDocument,
}

impl Default for ObjParser {
    fn default() -> Self {
        Self {
            tables: AttributeTables::default(),
            object: DEFAULT_NAME.to_owned(),
            groups: vec![DEFAULT_NAME.to_owned()],
            material: DEFAULT_NAME.to_owned(),
            pending: None,
            document: ObjDocument::default(),
        }
    }
}

impl ObjParser {
    fn parse_line(&mut self, line: &str, line_no: usize) -> ParseResult<()> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(());
        }

        let (keyword, args) = split_keyword(trimmed);
        match keyword {
            "v" => {
                let v = parse_floats::<3>(args, keyword, line_no)?;
                self.tables.positions.push(v);
            }
            "vt" => {
                let vt = parse_floats::<2>(args, keyword, line_no)?;
                self.tables.texcoords.push(vt);
            }
            "vn" => {
                let vn = parse_floats::<3>(args, keyword, line_no)?;
                self.tables.normals.push(vn);
            }
            "f" => self.face(args, line_no)?,
            "usemtl" => {
                self.material = args.to_owned();
                self.document.materials.push(args.to_owned());
                self.close_geometry();
            }
            "g" => {
                self.groups = if args.is_empty() {
                    vec![DEFAULT_NAME.to_owned()]
                } else {
                    args.split_whitespace().map(str::to_owned).collect()
                };
                self.close_geometry();
            }
            "o" => {
                self.object = args.to_owned();
                self.close_geometry();
            }
            // Filenames may contain spaces, so the whole remainder is kept.
            "mtllib" => self.document.material_libs.push(args.to_owned()),
            // Smoothing groups are not modelled.
            "s" => {}
            other => {
                log::warn!("Unhandled OBJ keyword '{}' on line {}", other, line_no);
            }
        }
        Ok(())
    }

    fn face(&mut self, args: &str, line_no: usize) -> ParseResult<()> {
        let tokens: Vec<&str> = args.split_whitespace().collect();
        if tokens.len() < 3 {
            return Err(ParseError::MalformedFace {
                line: line_no,
                count: tokens.len(),
            });
        }

        let vertices = tokens
            .iter()
            .map(|token| self.tables.resolve_vertex(token, line_no))
            .collect::<ParseResult<Vec<_>>>()?;

        let geometry = self.pending.get_or_insert_with(|| {
            PendingGeometry::new(&self.object, &self.groups, &self.material)
        });
        // Triangulate fan
        for tri in 1..(vertices.len() - 1) {
            for vertex in [vertices[0], vertices[tri], vertices[tri + 1]] {
                geometry.push_vertex(&self.tables, vertex);
            }
        }
        Ok(())
    }

    /// Seal the pending geometry so the next face starts a fresh one.
    /// A geometry without vertex data is dropped instead of emitted.
    fn close_geometry(&mut self) {
        if let Some(pending) = self.pending.take() {
            if pending.has_data() {
                self.document.geometries.push(pending.finish());
            }
        }
    }

    fn finish(mut self) -> ObjDocument {
        self.close_geometry();
        self.document
    }
}

/// Lines of a document ending in `\n`, `\r\n` or a lone `\r`.
pub(crate) fn text_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().flat_map(|line| line.split('\r'))
}

/// Split a trimmed line into its keyword and the trimmed remainder.
pub(crate) fn split_keyword(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (line, ""),
    }
}

fn parse_floats<const N: usize>(
    args: &str,
    keyword: &str,
    line_no: usize,
) -> ParseResult<[f32; N]> {
    let mut parts = args.split_whitespace();
    let mut out = [0.0; N];
    for slot in out.iter_mut() {
        let token = parts.next().ok_or_else(|| ParseError::MissingValue {
            line: line_no,
            keyword: keyword.to_owned(),
        })?;
        *slot = parse_f32(token, line_no)?;
    }
    Ok(out)
}

/// Parse a float, rejecting `nan`/`inf` spellings along with non-numeric text.
fn parse_f32(token: &str, line_no: usize) -> ParseResult<f32> {
    match token.parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ParseError::MalformedNumber {
            line: line_no,
            token: token.to_owned(),
        }),
    }
}

fn resolve_field(field: Option<&str>, len: usize, line_no: usize) -> ParseResult<Option<usize>> {
    match field {
        None | Some("") => Ok(None),
        Some(token) => resolve_index(token, len, line_no).map(Some),
    }
}

/// Resolve a 1-based or negative (relative-from-end) index against a
/// table of `len` entries, sentinel included.
fn resolve_index(token: &str, len: usize, line_no: usize) -> ParseResult<usize> {
    let malformed = || ParseError::MalformedIndex {
        line: line_no,
        token: token.to_owned(),
        len: len.saturating_sub(1),
    };

    let raw = token.parse::<i64>().map_err(|_| malformed())?;
    let idx = if raw < 0 { len as i64 + raw } else { raw };
    if idx <= 0 || idx >= len as i64 {
        return Err(malformed());
    }
    Ok(idx as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = r#"
        v 0.0 0.0 0.0
        v 1.0 0.0 0.0
        v 1.0 1.0 0.0
        v 0.0 1.0 0.0
        f 1 2 3 4
    "#;

    fn positions(doc: &ObjDocument, geometry: usize) -> &[f32] {
        doc.geometries[geometry]
            .data
            .position
            .as_deref()
            .expect("positions present")
    }

    #[test]
    fn positions_only_yields_single_geometry() {
        let doc = parse_geometry(QUAD).expect("parse quad");
        assert_eq!(doc.geometries.len(), 1);

        let geometry = &doc.geometries[0];
        assert_eq!(geometry.object, "default");
        assert_eq!(geometry.groups, vec!["default".to_string()]);
        assert_eq!(geometry.material, "default");
        assert_eq!(positions(&doc, 0).len(), 3 * 3 * 2);
        assert!(geometry.data.texcoord.is_none());
        assert!(geometry.data.normal.is_none());
    }

    #[test]
    fn quad_fans_around_first_vertex() {
        let doc = parse_geometry(QUAD).expect("parse quad");
        #[rustfmt::skip]
        let expected = [
            0.0, 0.0, 0.0,  1.0, 0.0, 0.0,  1.0, 1.0, 0.0,
            0.0, 0.0, 0.0,  1.0, 1.0, 0.0,  0.0, 1.0, 0.0,
        ];
        assert_eq!(positions(&doc, 0), &expected);
    }

    #[test]
    fn polygon_with_k_vertices_yields_k_minus_two_triangles() {
        let src = "v 0 0 0\nv 1 0 0\nv 2 1 0\nv 1 2 0\nv 0 1 0\nf 1 2 3 4 5\n";
        let doc = parse_geometry(src).expect("parse pentagon");
        assert_eq!(doc.geometries[0].data.triangle_count(), 3);
    }

    #[test]
    fn negative_index_matches_positive_equivalent() {
        let relative = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 -1\n";
        let absolute = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let a = parse_geometry(relative).expect("relative");
        let b = parse_geometry(absolute).expect("absolute");
        assert_eq!(a.geometries, b.geometries);
    }

    #[test]
    fn negative_index_sees_only_preceding_entries() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\nv 5 5 5\nf -4 -3 -1\n";
        let doc = parse_geometry(src).expect("parse");
        let p = positions(&doc, 0);
        assert_eq!(&p[6..9], &[0.0, 1.0, 0.0]);
        assert_eq!(&p[15..18], &[5.0, 5.0, 5.0]);
    }

    #[test]
    fn full_face_references_fill_every_array() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            vt 0.0 0.0
            vt 1.0 0.0
            vt 0.0 1.0 0.5
            vn 0.0 0.0 1.0
            f 1/1/1 2/2/1 3/3/1
        "#;
        let doc = parse_geometry(src).expect("parse triangle");
        let data = &doc.geometries[0].data;
        assert_eq!(data.texcoord.as_deref(), Some(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0][..]));
        assert_eq!(data.normal.as_ref().map(Vec::len), Some(9));
    }

    #[test]
    fn missing_texcoord_slot_leaves_array_absent() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\n";
        let doc = parse_geometry(src).expect("parse");
        let data = &doc.geometries[0].data;
        assert!(data.texcoord.is_none());
        assert_eq!(data.normal.as_ref().map(Vec::len), Some(9));
    }

    #[test]
    fn context_changes_split_geometries() {
        let src = r#"
            mtllib scene.mtl
            mtllib extra materials.mtl
            v 0 0 0
            v 1 0 0
            v 0 1 0
            o Body
            g left arm
            usemtl Skin
            f 1 2 3
            usemtl Cloth
            f 1 2 3
            f 3 2 1
        "#;
        let doc = parse_geometry(src).expect("parse");
        assert_eq!(doc.material_libs, vec!["scene.mtl", "extra materials.mtl"]);
        assert_eq!(doc.materials, vec!["Skin", "Cloth"]);
        assert_eq!(doc.geometries.len(), 2);

        let first = &doc.geometries[0];
        assert_eq!(first.object, "Body");
        assert_eq!(first.groups, vec!["left".to_string(), "arm".to_string()]);
        assert_eq!(first.material, "Skin");
        assert_eq!(first.data.triangle_count(), 1);

        assert_eq!(doc.geometries[1].material, "Cloth");
        assert_eq!(doc.geometries[1].data.triangle_count(), 2);
    }

    #[test]
    fn switching_material_without_faces_emits_no_empty_geometry() {
        let src = r#"
            v 0 0 0
            v 1 0 0
            v 0 1 0
            usemtl A
            usemtl B
            usemtl C
            f 1 2 3
            usemtl D
        "#;
        let doc = parse_geometry(src).expect("parse");
        assert_eq!(doc.geometries.len(), 1);
        assert_eq!(doc.geometries[0].material, "C");
        assert_eq!(doc.materials, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn comments_blank_lines_and_unknown_keywords_are_skipped() {
        let src = "# header\r\n\r\nv 0 0 0\r\nv 1 0 0\r\nv 0 1 0\r\ns off\r\nl 1 2\r\nf 1 2 3\r\n";
        let doc = parse_geometry(src).expect("parse");
        assert_eq!(doc.geometries.len(), 1);
        assert_eq!(doc.geometries[0].data.vertex_count(), 3);
    }

    #[test]
    fn carriage_return_only_line_endings_are_split() {
        let doc = parse_geometry("v 0 0 0\rv 1 0 0\rv 0 1 0\rusemtl A\rf 1 2 3\r").expect("parse");
        assert_eq!(doc.geometries.len(), 1);
        assert_eq!(doc.geometries[0].material, "A");
        assert_eq!(doc.geometries[0].data.vertex_count(), 3);

        let err = parse_geometry("v 0 0 0\rv 1 0 0\rf 1 2\r").unwrap_err();
        assert_eq!(err, ParseError::MalformedFace { line: 3, count: 2 });
    }

    #[test]
    fn group_and_object_changes_after_faces_split_geometries() {
        let src = r#"
            v 0 0 0
            v 1 0 0
            v 0 1 0
            f 1 2 3
            g a
            f 1 2 3
            o b
            f 1 2 3
        "#;
        let doc = parse_geometry(src).expect("parse");
        assert_eq!(doc.geometries.len(), 3);

        let tags: Vec<(&str, Vec<String>)> = doc
            .geometries
            .iter()
            .map(|g| (g.object.as_str(), g.groups.clone()))
            .collect();
        assert_eq!(tags[0], ("default", vec!["default".to_string()]));
        assert_eq!(tags[1], ("default", vec!["a".to_string()]));
        assert_eq!(tags[2], ("b", vec!["a".to_string()]));
        assert!(doc.geometries.iter().all(|g| g.data.triangle_count() == 1));
    }

    #[test]
    fn two_vertex_face_is_malformed() {
        let err = parse_geometry("v 0 0 0\nv 1 0 0\nf 1 2\n").unwrap_err();
        assert_eq!(err, ParseError::MalformedFace { line: 3, count: 2 });
    }

    #[test]
    fn zero_index_is_malformed() {
        let err = parse_geometry("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedIndex { line: 4, ref token, .. } if token == "0"));
    }

    #[test]
    fn out_of_range_indices_are_malformed() {
        let base = "v 0 0 0\nv 1 0 0\nv 0 1 0\n";
        for face in ["f 1 2 4", "f 1 2 -4", "f 1/1 2 3", "f 1 2 x"] {
            let err = parse_geometry(&format!("{base}{face}\n")).unwrap_err();
            assert!(matches!(err, ParseError::MalformedIndex { line: 4, .. }), "{face}: {err}");
        }
    }

    #[test]
    fn non_numeric_coordinates_fail() {
        let err = parse_geometry("v 0 abc 0\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::MalformedNumber {
                line: 1,
                token: "abc".into()
            }
        );
        let err = parse_geometry("vn 0 NaN 1\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedNumber { .. }));
    }

    #[test]
    fn short_vertex_fails_with_missing_value() {
        let err = parse_geometry("v 1 2\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingValue {
                line: 1,
                keyword: "v".into()
            }
        );
    }

    #[test]
    fn str_loader_wraps_parse_errors() {
        assert_eq!(load_obj_from_str(QUAD).expect("str").geometries.len(), 1);
        let err = load_obj_from_str("f 1 2\n").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ParseError>(),
            Some(ParseError::MalformedFace { .. })
        ));
    }

    #[test]
    fn reader_loader_parses_stream() {
        let doc = load_obj_from_reader(std::io::Cursor::new(QUAD)).expect("reader");
        assert_eq!(doc.geometries.len(), 1);
    }

    #[test]
    fn path_loader_reports_missing_file() {
        let path = std::env::temp_dir().join("objkit-does-not-exist.obj");
        let err = load_obj_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to open OBJ file"));
    }

    #[test]
    fn path_loader_parses_file() {
        let path = std::env::temp_dir().join(format!("objkit-quad-{}.obj", std::process::id()));
        std::fs::write(&path, QUAD).expect("write obj");
        let doc = load_obj_from_path(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(doc.expect("load").geometries[0].data.triangle_count(), 2);
    }

    #[test]
    fn split_keyword_separates_remainder() {
        assert_eq!(split_keyword("usemtl  Red Metal"), ("usemtl", "Red Metal"));
        assert_eq!(split_keyword("g"), ("g", ""));
        assert_eq!(split_keyword("f\t1 2 3"), ("f", "1 2 3"));
    }
}
