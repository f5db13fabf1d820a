use crate::rendering::batch_renderer::{MaterialId, MeshId};

/// Instances sharing a draw key can share GPU batches and draw commands.
/// Ordering compares material first, then mesh, then submesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawKey {
    pub material: MaterialId,
    pub mesh: MeshId,
    pub submesh: u32,
}

impl DrawKey {
    pub fn new(mesh: MeshId, submesh: u32, material: MaterialId) -> Self {
        Self {
            material,
            mesh,
            submesh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_material_first() {
        let a = DrawKey::new(MeshId(5), 0, MaterialId(0));
        let b = DrawKey::new(MeshId(0), 0, MaterialId(1));
        let c = DrawKey::new(MeshId(0), 1, MaterialId(1));

        assert!(a < b);
        assert!(b < c);
    }
}
