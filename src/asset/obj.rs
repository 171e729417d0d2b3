//! Loader for the OBJ subset the engine's meshes use.
//!
//! Accepted directives: `v x y z`, `vt u v`, `vn x y z`, and
//! triangulated faces `f i/j/k i/j/k i/j/k` (all three indices
//! required). Every other line is skipped. The V texture coordinate is
//! negated at load time; the pipeline's texture orientation contract
//! depends on it.

use std::fs;
use std::path::Path;

use glam::{Vec2, Vec3};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ObjError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("face at line {line} is not a triangle with v/vt/vn indices")]
    UnsupportedFace { line: usize },
    #[error("index out of bounds at line {line}")]
    IndexOutOfBounds { line: usize },
    #[error("no faces found")]
    Empty,
}

/// Expanded triangle list: one entry per corner, three corners per
/// face. All three streams have the same length.
pub struct ObjMesh {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub normals: Vec<Vec3>,
}

impl ObjMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

pub fn load_obj(path: impl AsRef<Path>) -> Result<ObjMesh, ObjError> {
    let path = path.as_ref();
    log::info!("Loading mesh: {:?}", path);
    let source = fs::read_to_string(path)?;
    parse_obj(&source)
}

pub fn parse_obj(source: &str) -> Result<ObjMesh, ObjError> {
    let mut positions = Vec::new();
    let mut uvs = Vec::new();
    let mut normals = Vec::new();
    let mut mesh = ObjMesh {
        positions: Vec::new(),
        uvs: Vec::new(),
        normals: Vec::new(),
    };

    for (number, raw) in source.lines().enumerate() {
        let line = number + 1;
        let mut parts = raw.split_whitespace();
        match parts.next() {
            Some("v") => {
                let (x, y, z) = parse_vec3(&mut parts, line)?;
                positions.push(Vec3::new(x, y, z));
            }
            Some("vt") => {
                let u = parse_float(parts.next(), line)?;
                let v = parse_float(parts.next(), line)?;
                // Inverted V: BMP rows and GL texture space disagree.
                uvs.push(Vec2::new(u, -v));
            }
            Some("vn") => {
                let (x, y, z) = parse_vec3(&mut parts, line)?;
                normals.push(Vec3::new(x, y, z));
            }
            Some("f") => {
                let corners: Vec<&str> = parts.collect();
                if corners.len() != 3 {
                    return Err(ObjError::UnsupportedFace { line });
                }
                for corner in corners {
                    let (vi, ti, ni) = parse_corner(corner, line)?;
                    mesh.positions.push(
                        *positions
                            .get(vi)
                            .ok_or(ObjError::IndexOutOfBounds { line })?,
                    );
                    mesh.uvs
                        .push(*uvs.get(ti).ok_or(ObjError::IndexOutOfBounds { line })?);
                    mesh.normals.push(
                        *normals
                            .get(ni)
                            .ok_or(ObjError::IndexOutOfBounds { line })?,
                    );
                }
            }
            // Comments, object names, materials: skipped.
            _ => {}
        }
    }

    if mesh.positions.is_empty() {
        return Err(ObjError::Empty);
    }
    Ok(mesh)
}

fn parse_float(field: Option<&str>, line: usize) -> Result<f32, ObjError> {
    field
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ObjError::Parse {
            line,
            message: "expected a float".into(),
        })
}

fn parse_vec3<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    line: usize,
) -> Result<(f32, f32, f32), ObjError> {
    Ok((
        parse_float(parts.next(), line)?,
        parse_float(parts.next(), line)?,
        parse_float(parts.next(), line)?,
    ))
}

/// Parse one `vi/ti/ni` corner into 0-based indices.
fn parse_corner(corner: &str, line: usize) -> Result<(usize, usize, usize), ObjError> {
    let mut fields = corner.split('/');
    let mut index = |name: &str| -> Result<usize, ObjError> {
        let raw: usize = fields
            .next()
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse().ok())
            .ok_or(ObjError::UnsupportedFace { line })?;
        if raw == 0 {
            return Err(ObjError::Parse {
                line,
                message: format!("{name} index is 1-based"),
            });
        }
        Ok(raw - 1)
    };
    let v = index("position")?;
    let t = index("uv")?;
    let n = index("normal")?;
    Ok((v, t, n))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "\
# comment
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vn 0 0 1
s off
f 1/1/1 2/2/1 3/3/1
";

    #[test]
    fn triangle_expands_to_three_vertices() {
        let mesh = parse_obj(TRIANGLE).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.positions[1], Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(mesh.normals[2], Vec3::Z);
    }

    #[test]
    fn v_coordinate_is_inverted() {
        let mesh = parse_obj(TRIANGLE).unwrap();
        assert_eq!(mesh.uvs[2], Vec2::new(0.0, -1.0));
    }

    #[test]
    fn quad_faces_are_rejected() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvt 0 0\nvn 0 0 1\nf 1/1/1 2/1/1 3/1/1 4/1/1\n";
        assert!(matches!(
            parse_obj(src),
            Err(ObjError::UnsupportedFace { line: 7 })
        ));
    }

    #[test]
    fn faces_without_full_triplets_are_rejected() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        assert!(matches!(parse_obj(src), Err(ObjError::UnsupportedFace { .. })));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(parse_obj("# nothing\n"), Err(ObjError::Empty)));
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let src = "v 0 0 0\nvt 0 0\nvn 0 0 1\nf 1/1/1 2/1/1 1/1/1\n";
        assert!(matches!(
            parse_obj(src),
            Err(ObjError::IndexOutOfBounds { line: 4 })
        ));
    }
}
