//! Voxel cell type

use super::block::BlockId;

/// Index of a renderable instance inside a chunk's per-type batch
pub type InstanceId = u32;

/// One unit-cube cell of a chunk.
///
/// `instance` is `Some` only while the voxel owns a slot in its block type's
/// instance batch. Empty voxels never own one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Voxel {
    pub id: BlockId,
    pub instance: Option<InstanceId>,
}

impl Voxel {
    /// Empty/air voxel
    pub const EMPTY: Voxel = Voxel {
        id: BlockId::EMPTY,
        instance: None,
    };

    /// Non-rendered voxel of the given type
    pub fn new(id: BlockId) -> Self {
        Self { id, instance: None }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }

    pub fn is_rendered(&self) -> bool {
        self.instance.is_some()
    }
}
