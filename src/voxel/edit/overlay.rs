//! Edit overlay - persistent record of player block edits.

use std::collections::HashMap;

use glam::IVec3;

use crate::voxel::block::BlockId;
use crate::voxel::chunk::ChunkCoord;

/// Player edits indexed by chunk, then by chunk-local coordinate.
///
/// The overlay outlives the chunks it describes: unloading a chunk keeps its
/// edits, and regenerating the chunk applies them over the generated data.
/// Entries are never pruned, even when an edit restores the generated block.
#[derive(Clone, Debug, Default)]
pub struct EditOverlay {
    chunks: HashMap<ChunkCoord, HashMap<IVec3, BlockId>>,
}

impl EditOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` at `local` in chunk `coord`, replacing any earlier edit there.
    pub fn set(&mut self, coord: ChunkCoord, local: IVec3, id: BlockId) {
        self.chunks.entry(coord).or_default().insert(local, id);
    }

    pub fn get(&self, coord: ChunkCoord, local: IVec3) -> Option<BlockId> {
        self.chunks.get(&coord).and_then(|edits| edits.get(&local)).copied()
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.get(&coord).is_some_and(|edits| !edits.is_empty())
    }

    /// Snapshot of every edit in one chunk, for handing to a generation job
    pub fn entries_for(&self, coord: ChunkCoord) -> Vec<(IVec3, BlockId)> {
        self.chunks
            .get(&coord)
            .map(|edits| edits.iter().map(|(local, id)| (*local, *id)).collect())
            .unwrap_or_default()
    }

    /// Number of edited cells across all chunks
    pub fn len(&self) -> usize {
        self.chunks.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every edit.
    pub fn clear(&mut self) {
        self.chunks.clear();
    }
}
