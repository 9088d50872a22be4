use std::path::Path;

use glam::{Mat4, Vec3};

use super::LoadError;
use crate::math::AABB;

/// Extent and size of the meshes in a glTF document
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshGeometry {
    /// Bound of every vertex in model space, `None` when there is no geometry
    pub bound: Option<AABB>,
    pub triangles: usize,
}

/// Loads a glTF file (and its external buffers) from disk
pub fn load_gltf_file(path: impl AsRef<Path>) -> Result<MeshGeometry, LoadError> {
    let path = path.as_ref();
    log::debug!("importing glTF file {}", path.display());
    let (document, buffers, _images) = gltf::import(path)?;
    Ok(collect_geometry(&document, &buffers))
}

/// Loads a self-contained glTF or GLB payload
pub fn load_gltf_slice(bytes: &[u8]) -> Result<MeshGeometry, LoadError> {
    let (document, buffers, _images) = gltf::import_slice(bytes)?;
    Ok(collect_geometry(&document, &buffers))
}

fn collect_geometry(document: &gltf::Document, buffers: &[gltf::buffer::Data]) -> MeshGeometry {
    let mut geometry = MeshGeometry {
        bound: None,
        triangles: 0,
    };

    for scene in document.scenes() {
        log::trace!("processing glTF scene {:?}", scene.name());
        for node in scene.nodes() {
            process_node(&node, buffers, &Mat4::IDENTITY, &mut geometry);
        }
    }

    log::debug!(
        "glTF: {} meshes, {} triangles",
        document.meshes().count(),
        geometry.triangles
    );
    geometry
}

/// Recursively processes glTF nodes
fn process_node(
    node: &gltf::Node,
    buffers: &[gltf::buffer::Data],
    parent_transform: &Mat4,
    geometry: &mut MeshGeometry,
) {
    let local_transform = Mat4::from_cols_array_2d(&node.transform().matrix());
    let global_transform = *parent_transform * local_transform;

    if let Some(mesh) = node.mesh() {
        process_mesh(&mesh, buffers, &global_transform, geometry);
    }

    for child in node.children() {
        process_node(&child, buffers, &global_transform, geometry);
    }
}

fn process_mesh(
    mesh: &gltf::Mesh,
    buffers: &[gltf::buffer::Data],
    transform: &Mat4,
    geometry: &mut MeshGeometry,
) {
    for primitive in mesh.primitives() {
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));

        let Some(positions) = reader.read_positions() else {
            log::warn!("mesh {:?} has a primitive without positions", mesh.name());
            continue;
        };

        let mut count = 0usize;
        let points = positions.map(|p| {
            count += 1;
            transform.transform_point3(Vec3::from_array(p))
        });
        if let Some(bound) = AABB::from_points(points) {
            geometry.bound = Some(match geometry.bound {
                Some(current) => current.union(&bound),
                None => bound,
            });
        }

        geometry.triangles += match reader.read_indices() {
            Some(indices) => indices.into_u32().len() / 3,
            None => count / 3,
        };
    }
}
