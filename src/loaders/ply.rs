//! Minimal PLY reader for gaussian splat files.
//!
//! Only the `x`, `y`, `z` properties of the `vertex` element are extracted.
//! Elements before `vertex` are skipped, which requires them to have
//! fixed-size rows in binary files.

use glam::Vec3;

use super::LoadError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Format {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Scalar {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl Scalar {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "char" | "int8" => Scalar::I8,
            "uchar" | "uint8" => Scalar::U8,
            "short" | "int16" => Scalar::I16,
            "ushort" | "uint16" => Scalar::U16,
            "int" | "int32" => Scalar::I32,
            "uint" | "uint32" => Scalar::U32,
            "float" | "float32" => Scalar::F32,
            "double" | "float64" => Scalar::F64,
            _ => return None,
        })
    }

    fn size(self) -> usize {
        match self {
            Scalar::I8 | Scalar::U8 => 1,
            Scalar::I16 | Scalar::U16 => 2,
            Scalar::I32 | Scalar::U32 | Scalar::F32 => 4,
            Scalar::F64 => 8,
        }
    }

    fn read(self, bytes: &[u8], little_endian: bool) -> f64 {
        macro_rules! num {
            ($t:ty, $n:expr) => {{
                let mut buf = [0u8; $n];
                buf.copy_from_slice(&bytes[..$n]);
                if little_endian {
                    <$t>::from_le_bytes(buf) as f64
                } else {
                    <$t>::from_be_bytes(buf) as f64
                }
            }};
        }
        match self {
            Scalar::I8 => num!(i8, 1),
            Scalar::U8 => num!(u8, 1),
            Scalar::I16 => num!(i16, 2),
            Scalar::U16 => num!(u16, 2),
            Scalar::I32 => num!(i32, 4),
            Scalar::U32 => num!(u32, 4),
            Scalar::F32 => num!(f32, 4),
            Scalar::F64 => num!(f64, 8),
        }
    }
}

#[derive(Debug)]
enum Property {
    Scalar { name: String, ty: Scalar },
    List,
}

#[derive(Debug)]
struct ElementDecl {
    name: String,
    count: usize,
    properties: Vec<Property>,
}

impl ElementDecl {
    /// Binary row size, `None` when the element has list properties
    fn row_size(&self) -> Option<usize> {
        self.properties
            .iter()
            .map(|p| match p {
                Property::Scalar { ty, .. } => Some(ty.size()),
                Property::List => None,
            })
            .sum()
    }

    /// Binary size of all rows, `None` on overflow
    fn byte_len(&self, row: usize) -> Option<usize> {
        row.checked_mul(self.count)
    }

    fn offset_of(&self, wanted: &str) -> Option<(usize, usize, Scalar)> {
        let mut offset = 0;
        for (index, p) in self.properties.iter().enumerate() {
            if let Property::Scalar { name, ty } = p {
                if name == wanted {
                    return Some((index, offset, *ty));
                }
                offset += ty.size();
            }
        }
        None
    }
}

struct Header {
    format: Format,
    elements: Vec<ElementDecl>,
    body_offset: usize,
}

fn malformed(msg: impl Into<String>) -> LoadError {
    LoadError::Ply(msg.into())
}

fn parse_header(bytes: &[u8]) -> Result<Header, LoadError> {
    const END: &[u8] = b"end_header";
    let end = bytes
        .windows(END.len())
        .position(|w| w == END)
        .ok_or_else(|| malformed("missing end_header"))?;
    // body starts after the newline following end_header
    let body_offset = bytes[end..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|p| end + p + 1)
        .ok_or_else(|| malformed("truncated header"))?;

    let text = std::str::from_utf8(&bytes[..end]).map_err(|_| malformed("header is not UTF-8"))?;
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    if lines.next() != Some("ply") {
        return Err(malformed("missing ply magic"));
    }

    let mut format = None;
    let mut elements: Vec<ElementDecl> = Vec::new();
    for line in lines {
        let mut words = line.split_whitespace();
        match words.next() {
            Some("format") => {
                format = Some(match words.next() {
                    Some("ascii") => Format::Ascii,
                    Some("binary_little_endian") => Format::BinaryLittleEndian,
                    Some("binary_big_endian") => Format::BinaryBigEndian,
                    other => return Err(malformed(format!("unknown format {other:?}"))),
                });
            }
            Some("element") => {
                let name = words.next().ok_or_else(|| malformed("element without name"))?;
                let count = words
                    .next()
                    .and_then(|c| c.parse().ok())
                    .ok_or_else(|| malformed(format!("bad count for element {name}")))?;
                elements.push(ElementDecl {
                    name: name.to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            Some("property") => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| malformed("property before any element"))?;
                let property = match words.next() {
                    Some("list") => Property::List,
                    Some(ty) => {
                        let ty = Scalar::parse(ty).ok_or_else(|| malformed(format!("unknown type {ty}")))?;
                        let name = words.next().ok_or_else(|| malformed("property without name"))?;
                        Property::Scalar { name: name.to_string(), ty }
                    }
                    None => return Err(malformed("empty property line")),
                };
                element.properties.push(property);
            }
            Some("comment") | Some("obj_info") => {}
            Some(other) => return Err(malformed(format!("unexpected header keyword {other}"))),
            None => {}
        }
    }

    Ok(Header {
        format: format.ok_or_else(|| malformed("missing format line"))?,
        elements,
        body_offset,
    })
}

/// Read vertex positions from a PLY file
pub fn read_ply_positions(bytes: &[u8]) -> Result<Vec<Vec3>, LoadError> {
    let header = parse_header(bytes)?;
    let vertex_index = header
        .elements
        .iter()
        .position(|e| e.name == "vertex")
        .ok_or_else(|| malformed("no vertex element"))?;
    let body = &bytes[header.body_offset..];

    match header.format {
        Format::Ascii => read_ascii(&header, vertex_index, body),
        Format::BinaryLittleEndian => read_binary(&header, vertex_index, body, true),
        Format::BinaryBigEndian => read_binary(&header, vertex_index, body, false),
    }
}

fn read_ascii(header: &Header, vertex_index: usize, body: &[u8]) -> Result<Vec<Vec3>, LoadError> {
    let vertex = &header.elements[vertex_index];
    let text = std::str::from_utf8(body).map_err(|_| malformed("ascii body is not UTF-8"))?;
    let skip = header.elements[..vertex_index]
        .iter()
        .try_fold(0usize, |acc, e| acc.checked_add(e.count))
        .ok_or_else(|| malformed("element counts overflow"))?;
    let axes = ["x", "y", "z"].map(|axis| vertex.offset_of(axis).map(|(index, _, _)| index));
    let [Some(xi), Some(yi), Some(zi)] = axes else {
        return Err(malformed("vertex element lacks x/y/z"));
    };

    let rows = text.lines().filter(|l| !l.trim().is_empty()).skip(skip).take(vertex.count);
    // each row takes at least two bytes, so the body caps the real count
    let mut positions = Vec::with_capacity(vertex.count.min(body.len() / 2));
    for row in rows {
        let values: Vec<f32> = row
            .split_whitespace()
            .map(|v| v.parse::<f32>())
            .collect::<Result<_, _>>()
            .map_err(|e| malformed(format!("bad vertex value: {e}")))?;
        let get = |i: usize| values.get(i).copied().ok_or_else(|| malformed("short vertex row"));
        positions.push(Vec3::new(get(xi)?, get(yi)?, get(zi)?));
    }

    if positions.len() != vertex.count {
        return Err(malformed(format!(
            "expected {} vertices, found {}",
            vertex.count,
            positions.len()
        )));
    }
    Ok(positions)
}

fn read_binary(
    header: &Header,
    vertex_index: usize,
    body: &[u8],
    little_endian: bool,
) -> Result<Vec<Vec3>, LoadError> {
    let mut start = 0usize;
    for element in &header.elements[..vertex_index] {
        let row = element
            .row_size()
            .ok_or_else(|| malformed(format!("cannot skip list element {}", element.name)))?;
        start = element
            .byte_len(row)
            .and_then(|len| start.checked_add(len))
            .ok_or_else(|| malformed(format!("element {} is too large", element.name)))?;
    }

    let vertex = &header.elements[vertex_index];
    let stride = vertex
        .row_size()
        .ok_or_else(|| malformed("vertex element has list properties"))?;
    let axes = ["x", "y", "z"].map(|axis| vertex.offset_of(axis));
    let [Some((_, ox, tx)), Some((_, oy, ty)), Some((_, oz, tz))] = axes else {
        return Err(malformed("vertex element lacks x/y/z"));
    };

    let end = vertex
        .byte_len(stride)
        .and_then(|len| start.checked_add(len))
        .ok_or_else(|| malformed(format!("vertex count {} is too large", vertex.count)))?;
    let data = body
        .get(start..end)
        .ok_or_else(|| malformed(format!("body too short: need {end} bytes, have {}", body.len())))?;

    Ok(data
        .chunks_exact(stride)
        .map(|row| {
            Vec3::new(
                tx.read(&row[ox..], little_endian) as f32,
                ty.read(&row[oy..], little_endian) as f32,
                tz.read(&row[oz..], little_endian) as f32,
            )
        })
        .collect())
}
