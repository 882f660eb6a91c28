//! Packed per-block-type instance batches and other renderables handed to the renderer

use bytemuck::{Pod, Zeroable};
use glam::{IVec3, Vec3};

use super::block::BlockId;
use super::voxel::InstanceId;

/// Height of the water plane above the configured water level
pub const WATER_SURFACE_OFFSET: f32 = 0.4;

/// Position-only instance transform, chunk-local.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct InstanceTransform {
    pub position: [f32; 3],
}

impl InstanceTransform {
    pub fn at(local: IVec3) -> Self {
        Self {
            position: local.as_vec3().to_array(),
        }
    }
}

/// Packed instance array for one block type within one chunk.
///
/// Slots `[0, count)` are always live. Releasing a slot moves the last
/// instance into the hole, so ids stay contiguous and removal is O(1).
#[derive(Clone, Debug)]
pub struct InstanceBatch {
    block: BlockId,
    transforms: Vec<InstanceTransform>,
    /// Local coordinate of the voxel owning each slot
    owners: Vec<IVec3>,
    capacity: usize,
    dirty: bool,
    disposed: bool,
}

impl InstanceBatch {
    /// Empty batch able to hold `capacity` instances (the chunk volume)
    pub fn new(block: BlockId, capacity: usize) -> Self {
        Self {
            block,
            transforms: Vec::new(),
            owners: Vec::new(),
            capacity,
            dirty: false,
            disposed: false,
        }
    }

    pub fn block(&self) -> BlockId {
        self.block
    }

    /// Live instance count
    pub fn count(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Live transforms, ready for upload
    pub fn transforms(&self) -> &[InstanceTransform] {
        &self.transforms
    }

    /// Live transforms as raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.transforms)
    }

    /// Local coordinate of the voxel owning slot `id`
    pub fn owner(&self, id: InstanceId) -> Option<IVec3> {
        self.owners.get(id as usize).copied()
    }

    /// Append an instance for the voxel at `local`. Returns its id, or
    /// `None` when the batch is full or disposed.
    pub fn push(&mut self, local: IVec3) -> Option<InstanceId> {
        if self.disposed || self.transforms.len() >= self.capacity {
            return None;
        }
        let id = self.transforms.len() as InstanceId;
        self.transforms.push(InstanceTransform::at(local));
        self.owners.push(local);
        self.dirty = true;
        Some(id)
    }

    /// Release slot `id`.
    ///
    /// The last instance is copied into slot `id` and the count shrinks by one.
    /// Returns the local coordinate of the voxel that now owns slot `id`, which
    /// the caller must repoint; `None` when `id` was the last slot (or invalid).
    pub fn swap_remove(&mut self, id: InstanceId) -> Option<IVec3> {
        let k = id as usize;
        if k >= self.transforms.len() {
            return None;
        }
        let last = self.transforms.len() - 1;
        self.transforms.swap_remove(k);
        self.owners.swap_remove(k);
        self.dirty = true;
        log::trace!("batch {:?}: released slot {} (count {})", self.block, k, last);

        if k == last {
            None
        } else {
            Some(self.owners[k])
        }
    }

    /// Whether the batch changed since the last [`Self::take_dirty`]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear and return the dirty flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Drop all instances and their storage. The batch refuses further pushes.
    pub fn dispose(&mut self) {
        self.transforms = Vec::new();
        self.owners = Vec::new();
        self.disposed = true;
        self.dirty = true;
    }
}

/// Translucent water surface spanning a chunk footprint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaterPlane {
    /// Chunk-local center of the plane
    pub center: Vec3,
    /// Side length in blocks
    pub size: f32,
    disposed: bool,
}

impl WaterPlane {
    /// Plane for a chunk of `width` at `water_height`
    pub fn new(width: u32, water_height: i32) -> Self {
        let half = width as f32 / 2.0;
        Self {
            center: Vec3::new(half, water_height as f32 + WATER_SURFACE_OFFSET, half),
            size: width as f32,
            disposed: false,
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn dispose(&mut self) {
        self.disposed = true;
    }
}

/// Something a chunk hands to the renderer and must release on unload.
pub enum Renderable<'a> {
    Instanced(&'a mut InstanceBatch),
    WaterPlane(&'a mut WaterPlane),
}

impl Renderable<'_> {
    pub fn dispose(self) {
        match self {
            Renderable::Instanced(batch) => batch.dispose(),
            Renderable::WaterPlane(plane) => plane.dispose(),
        }
    }

    pub fn is_disposed(&self) -> bool {
        match self {
            Renderable::Instanced(batch) => batch.is_disposed(),
            Renderable::WaterPlane(plane) => plane.is_disposed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_assigns_contiguous_ids() {
        let mut batch = InstanceBatch::new(BlockId::STONE, 8);
        assert_eq!(batch.push(IVec3::new(0, 0, 0)), Some(0));
        assert_eq!(batch.push(IVec3::new(1, 0, 0)), Some(1));
        assert_eq!(batch.push(IVec3::new(2, 0, 0)), Some(2));
        assert_eq!(batch.count(), 3);
        assert_eq!(batch.owner(1), Some(IVec3::new(1, 0, 0)));
        assert_eq!(batch.transforms()[2].position, [2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_swap_remove_moves_last_into_hole() {
        let mut batch = InstanceBatch::new(BlockId::STONE, 8);
        batch.push(IVec3::new(0, 0, 0));
        batch.push(IVec3::new(1, 0, 0));
        batch.push(IVec3::new(2, 0, 0));

        let moved = batch.swap_remove(0);
        assert_eq!(moved, Some(IVec3::new(2, 0, 0)));
        assert_eq!(batch.count(), 2);
        assert_eq!(batch.owner(0), Some(IVec3::new(2, 0, 0)));
        assert_eq!(batch.transforms()[0].position, [2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_swap_remove_last_moves_nothing() {
        let mut batch = InstanceBatch::new(BlockId::STONE, 8);
        batch.push(IVec3::new(0, 0, 0));
        batch.push(IVec3::new(1, 0, 0));

        assert_eq!(batch.swap_remove(1), None);
        assert_eq!(batch.count(), 1);
        assert_eq!(batch.swap_remove(5), None);
        assert_eq!(batch.count(), 1);
    }

    #[test]
    fn test_capacity_limit() {
        let mut batch = InstanceBatch::new(BlockId::DIRT, 1);
        assert!(batch.push(IVec3::ZERO).is_some());
        assert!(batch.push(IVec3::ONE).is_none());
    }

    #[test]
    fn test_dirty_flag() {
        let mut batch = InstanceBatch::new(BlockId::DIRT, 4);
        assert!(!batch.is_dirty());
        batch.push(IVec3::ZERO);
        assert!(batch.take_dirty());
        assert!(!batch.is_dirty());
    }

    #[test]
    fn test_as_bytes() {
        let mut batch = InstanceBatch::new(BlockId::DIRT, 4);
        batch.push(IVec3::ZERO);
        batch.push(IVec3::ONE);
        assert_eq!(batch.as_bytes().len(), 2 * 12);
    }

    #[test]
    fn test_dispose() {
        let mut batch = InstanceBatch::new(BlockId::GRASS, 4);
        let mut water = WaterPlane::new(32, 5);
        batch.push(IVec3::ZERO);

        for r in [Renderable::Instanced(&mut batch), Renderable::WaterPlane(&mut water)] {
            r.dispose();
        }

        assert!(batch.is_disposed());
        assert_eq!(batch.count(), 0);
        assert!(batch.push(IVec3::ZERO).is_none());
        assert!(water.is_disposed());
    }

    #[test]
    fn test_water_plane_placement() {
        let water = WaterPlane::new(32, 5);
        assert!((water.center - Vec3::new(16.0, 5.4, 16.0)).length() < 1e-5);
        assert_eq!(water.size, 32.0);
    }
}
