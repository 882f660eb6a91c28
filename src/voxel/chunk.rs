//! Chunk system: fixed-size voxel columns with packed instance bookkeeping

use std::collections::HashMap;
use std::sync::Arc;

use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

use super::block::{BlockId, BlockRegistry};
use super::instancing::{InstanceBatch, Renderable, WaterPlane};
use super::voxel::Voxel;

/// Default chunk footprint in blocks
pub const DEFAULT_CHUNK_WIDTH: u32 = 32;
/// Default chunk height in blocks
pub const DEFAULT_CHUNK_HEIGHT: u32 = 32;

/// The six axis-aligned neighbor offsets
pub const NEIGHBOR_OFFSETS: [IVec3; 6] = [
    IVec3::new(1, 0, 0),
    IVec3::new(-1, 0, 0),
    IVec3::new(0, 1, 0),
    IVec3::new(0, -1, 0),
    IVec3::new(0, 0, 1),
    IVec3::new(0, 0, -1),
];

/// Read access to block ids by world coordinate.
///
/// `None` means no data: the owning chunk is missing or not loaded yet, or the
/// coordinate is outside the vertical range. Callers treat it as non-solid.
pub trait BlockSource {
    fn block_at(&self, pos: IVec3) -> Option<BlockId>;

    /// Whether the cell holds a non-empty block
    fn is_solid(&self, pos: IVec3) -> bool {
        self.block_at(pos).is_some_and(|id| !id.is_empty())
    }
}

impl BlockSource for HashMap<IVec3, BlockId> {
    fn block_at(&self, pos: IVec3) -> Option<BlockId> {
        self.get(&pos).copied()
    }
}

/// Source with no data anywhere
pub struct NoBlocks;

impl BlockSource for NoBlocks {
    fn block_at(&self, _pos: IVec3) -> Option<BlockId> {
        None
    }
}

/// Chunk dimensions: `width`×`height`×`width` blocks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSize {
    pub width: u32,
    pub height: u32,
}

impl ChunkSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn volume(&self) -> usize {
        self.width as usize * self.width as usize * self.height as usize
    }

    pub fn contains(&self, local: IVec3) -> bool {
        let (w, h) = (self.width as i32, self.height as i32);
        local.x >= 0 && local.x < w && local.y >= 0 && local.y < h && local.z >= 0 && local.z < w
    }

    /// Dense index of a local coordinate (x-major, then y, then z)
    pub fn index(&self, local: IVec3) -> Option<usize> {
        if !self.contains(local) {
            return None;
        }
        let (w, h) = (self.width as usize, self.height as usize);
        Some((local.x as usize * h + local.y as usize) * w + local.z as usize)
    }

    /// Local coordinate of a dense index
    pub fn local_of(&self, index: usize) -> IVec3 {
        let (w, h) = (self.width as usize, self.height as usize);
        IVec3::new(
            (index / (w * h)) as i32,
            ((index / w) % h) as i32,
            (index % w) as i32,
        )
    }

    /// Split a world block coordinate into owning chunk and local offset
    pub fn split(&self, world: IVec3) -> (ChunkCoord, IVec3) {
        let w = self.width as i32;
        let coord = ChunkCoord::new(world.x.div_euclid(w), world.z.div_euclid(w));
        let local = IVec3::new(world.x.rem_euclid(w), world.y, world.z.rem_euclid(w));
        (coord, local)
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_WIDTH, DEFAULT_CHUNK_HEIGHT)
    }
}

/// Integer coordinate identifying a chunk column in the world grid
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk containing a continuous world position
    pub fn from_world_pos(pos: Vec3, width: u32) -> Self {
        Self {
            x: (pos.x / width as f32).floor() as i32,
            z: (pos.z / width as f32).floor() as i32,
        }
    }

    /// World-space block coordinate of this chunk's minimum corner (y = 0)
    pub fn origin(&self, width: u32) -> IVec3 {
        IVec3::new(self.x * width as i32, 0, self.z * width as i32)
    }

    /// Chebyshev distance between two chunk coordinates
    pub fn chebyshev(&self, other: ChunkCoord) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }

    /// The four horizontally adjacent coordinates
    pub fn neighbors(&self) -> [ChunkCoord; 4] {
        [
            ChunkCoord::new(self.x + 1, self.z),
            ChunkCoord::new(self.x - 1, self.z),
            ChunkCoord::new(self.x, self.z + 1),
            ChunkCoord::new(self.x, self.z - 1),
        ]
    }
}

/// Generation progress of a chunk slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    /// Created, pipeline not finished; holds no voxel data
    Generating,
    /// Voxel data and instances are available
    Loaded,
}

/// One chunk column: a dense voxel grid plus a packed instance batch per block type.
pub struct Chunk {
    pub coord: ChunkCoord,
    size: ChunkSize,
    registry: Arc<BlockRegistry>,
    voxels: Vec<Voxel>,
    /// Indexed by block id; slot 0 (empty) holds an unused batch
    batches: Vec<InstanceBatch>,
    water: Option<WaterPlane>,
    state: LoadState,
    /// Identifies the generation request this slot is waiting for
    ticket: u64,
}

impl Chunk {
    /// New chunk in the `Generating` state with no voxel data
    pub fn new(coord: ChunkCoord, size: ChunkSize, registry: Arc<BlockRegistry>) -> Self {
        Self {
            coord,
            size,
            registry,
            voxels: Vec::new(),
            batches: Vec::new(),
            water: None,
            state: LoadState::Generating,
            ticket: 0,
        }
    }

    pub fn size(&self) -> ChunkSize {
        self.size
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == LoadState::Loaded
    }

    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub(crate) fn set_ticket(&mut self, ticket: u64) {
        self.ticket = ticket;
    }

    /// World block coordinate of local (0, 0, 0)
    pub fn origin(&self) -> IVec3 {
        self.coord.origin(self.size.width)
    }

    pub fn to_world(&self, local: IVec3) -> IVec3 {
        self.origin() + local
    }

    /// Voxel at a local coordinate; `None` out of bounds or before loading
    pub fn voxel(&self, local: IVec3) -> Option<&Voxel> {
        if !self.is_loaded() {
            return None;
        }
        self.size.index(local).and_then(|i| self.voxels.get(i))
    }

    pub fn block_id(&self, local: IVec3) -> Option<BlockId> {
        self.voxel(local).map(|v| v.id)
    }

    /// Overwrite a block id without touching instance bookkeeping.
    ///
    /// Callers are responsible for releasing the old instance first.
    pub(crate) fn set_block_id(&mut self, local: IVec3, id: BlockId) -> bool {
        let Some(i) = self.size.index(local) else {
            return false;
        };
        match self.voxels.get_mut(i) {
            Some(voxel) => {
                voxel.id = id;
                true
            }
            None => false,
        }
    }

    /// Install generated block ids and transition to `Loaded`.
    ///
    /// Creates one empty batch per block type and the water plane. Instances
    /// are allocated afterwards by [`Self::build_instances`].
    pub fn install(&mut self, ids: Vec<BlockId>, water_height: i32) {
        debug_assert_eq!(ids.len(), self.size.volume());
        self.voxels = ids.into_iter().map(Voxel::new).collect();
        let capacity = self.size.volume();
        self.batches = self
            .registry
            .iter()
            .map(|ty| InstanceBatch::new(ty.id, capacity))
            .collect();
        self.water = Some(WaterPlane::new(self.size.width, water_height));
        self.state = LoadState::Loaded;
    }

    /// Whether every axis neighbor of `local` is non-empty.
    ///
    /// Neighbors outside this chunk are resolved through `outside`; no data
    /// there (unloaded chunk, above or below the world) counts as empty.
    pub fn is_obscured(&self, local: IVec3, outside: &impl BlockSource) -> bool {
        NEIGHBOR_OFFSETS.iter().all(|offset| {
            let n = local + *offset;
            if n.y < 0 || n.y >= self.size.height as i32 {
                return false;
            }
            let id = if self.size.contains(n) {
                self.block_id(n)
            } else {
                outside.block_at(self.to_world(n))
            };
            id.is_some_and(|id| !id.is_empty())
        })
    }

    /// Allocate instances for every exposed non-empty voxel.
    pub fn build_instances(&mut self, outside: &impl BlockSource) {
        if !self.is_loaded() {
            return;
        }
        for i in 0..self.voxels.len() {
            let local = self.size.local_of(i);
            if !self.voxels[i].is_empty() && !self.is_obscured(local, outside) {
                self.allocate_instance(local);
            }
        }
    }

    /// Give the voxel at `local` an instance slot if it is solid and has none.
    pub fn allocate_instance(&mut self, local: IVec3) -> bool {
        let Some(i) = self.size.index(local) else {
            return false;
        };
        let Some(voxel) = self.voxels.get(i).copied() else {
            return false;
        };
        if voxel.is_empty() || voxel.instance.is_some() {
            return false;
        }
        let Some(batch) = self.batches.get_mut(voxel.id.index()) else {
            return false;
        };
        match batch.push(local) {
            Some(id) => {
                self.voxels[i].instance = Some(id);
                true
            }
            None => false,
        }
    }

    /// Release the instance owned by the voxel at `local`, swap-removing it
    /// from its batch and repointing the voxel that moved into the freed slot.
    pub fn release_instance(&mut self, local: IVec3) -> bool {
        let Some(i) = self.size.index(local) else {
            return false;
        };
        let Some(voxel) = self.voxels.get(i).copied() else {
            return false;
        };
        let Some(k) = voxel.instance else {
            return false;
        };
        let Some(batch) = self.batches.get_mut(voxel.id.index()) else {
            return false;
        };

        let moved = batch.swap_remove(k);
        self.voxels[i].instance = None;
        if let Some(owner) = moved {
            if let Some(j) = self.size.index(owner) {
                self.voxels[j].instance = Some(k);
            }
        }
        true
    }

    /// Make the instance state of `local` match its exposure.
    ///
    /// Returns true if an instance was allocated or released.
    pub fn sync_instance(&mut self, local: IVec3, outside: &impl BlockSource) -> bool {
        let Some(voxel) = self.voxel(local).copied() else {
            return false;
        };
        if voxel.is_empty() {
            return false;
        }
        let obscured = self.is_obscured(local, outside);
        match (voxel.instance, obscured) {
            (Some(_), true) => self.release_instance(local),
            (None, false) => self.allocate_instance(local),
            _ => false,
        }
    }

    /// Batch for one block type
    pub fn batch(&self, id: BlockId) -> Option<&InstanceBatch> {
        if id.is_empty() {
            return None;
        }
        self.batches.get(id.index())
    }

    /// All non-empty-type batches
    pub fn batches(&self) -> impl Iterator<Item = &InstanceBatch> {
        self.batches.iter().filter(|b| !b.block().is_empty())
    }

    pub fn water(&self) -> Option<&WaterPlane> {
        self.water.as_ref()
    }

    /// Total live instances across all batches
    pub fn instance_count(&self) -> usize {
        self.batches().map(|b| b.count()).sum()
    }

    /// Everything this chunk hands to the renderer
    pub fn renderables_mut(&mut self) -> Vec<Renderable<'_>> {
        let mut out: Vec<Renderable<'_>> = self
            .batches
            .iter_mut()
            .filter(|b| !b.block().is_empty())
            .map(Renderable::Instanced)
            .collect();
        if let Some(water) = self.water.as_mut() {
            out.push(Renderable::WaterPlane(water));
        }
        out
    }

    /// Release every renderable resource. Voxels keep their ids but lose instances.
    pub fn dispose_instances(&mut self) {
        for renderable in self.renderables_mut() {
            renderable.dispose();
        }
        for voxel in &mut self.voxels {
            voxel.instance = None;
        }
    }

    /// Clear dirty flags, returning whether any batch changed
    pub fn take_dirty(&mut self) -> bool {
        self.batches
            .iter_mut()
            .fold(false, |dirty, b| b.take_dirty() | dirty)
    }

    /// Iterate `(local, voxel)` over the whole grid
    pub fn iter_voxels(&self) -> impl Iterator<Item = (IVec3, &Voxel)> {
        self.voxels
            .iter()
            .enumerate()
            .map(|(i, v)| (self.size.local_of(i), v))
    }

    /// Raw block ids in dense order
    pub fn block_ids(&self) -> Vec<BlockId> {
        self.voxels.iter().map(|v| v.id).collect()
    }

    /// Check the packing invariants of every batch.
    ///
    /// For each block type, the voxels of that type with an instance are
    /// exactly the batch owners, and their ids cover `[0, count)` once each.
    pub fn packing_is_consistent(&self) -> bool {
        if !self.is_loaded() {
            return true;
        }
        let mut seen: Vec<Vec<bool>> = self.batches.iter().map(|b| vec![false; b.count()]).collect();

        for (i, voxel) in self.voxels.iter().enumerate() {
            let Some(k) = voxel.instance else { continue };
            if voxel.is_empty() {
                return false;
            }
            let Some(batch) = self.batches.get(voxel.id.index()) else {
                return false;
            };
            if batch.owner(k) != Some(self.size.local_of(i)) {
                return false;
            }
            let slot = &mut seen[voxel.id.index()][k as usize];
            if *slot {
                return false;
            }
            *slot = true;
        }

        seen.iter().all(|slots| slots.iter().all(|s| *s))
    }
}
