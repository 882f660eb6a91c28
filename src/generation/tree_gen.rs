//! Tree placement - trunks on grass with spherical leaf canopies.

use glam::IVec3;

use super::ChunkBuffer;
use super::config::TreeParams;
use crate::terrain::noise::SeededRng;
use crate::voxel::block::BlockId;

/// Vegetation stage.
///
/// Every chunk restarts the same random stream from the seed, so the layout
/// depends on the terrain underneath rather than on generation order.
#[derive(Clone, Debug)]
pub struct TreeGenerator {
    params: TreeParams,
    seed: u32,
}

impl TreeGenerator {
    pub fn new(params: TreeParams, seed: u32) -> Self {
        Self { params, seed }
    }

    pub fn params(&self) -> &TreeParams {
        &self.params
    }

    /// Grow trees into `buffer`. Returns the number of trunks placed.
    pub fn place(&self, buffer: &mut ChunkBuffer) -> usize {
        let mut rng = SeededRng::new(self.seed);
        let size = buffer.size();
        let border = self.params.canopy.size.max;
        let mut trunks = 0;

        for x in border..size.width as i32 - border {
            for z in border..size.width as i32 - border {
                if rng.next_f32() < self.params.frequency && self.grow_trunk(buffer, x, z, &mut rng) {
                    trunks += 1;
                }
            }
        }
        trunks
    }

    /// Trunk on the lowest grass cell of column (x, z), then its canopy.
    fn grow_trunk(&self, buffer: &mut ChunkBuffer, x: i32, z: i32, rng: &mut SeededRng) -> bool {
        let h = self.params.trunk_height.lerp_round(rng.next_f32());
        let height = buffer.size().height as i32;

        let Some(ground) = (0..height).find(|y| buffer.get(IVec3::new(x, *y, z)) == Some(BlockId::GRASS)) else {
            return false;
        };

        for y in ground + 1..=ground + h {
            buffer.set(IVec3::new(x, y, z), BlockId::TREE);
        }
        self.grow_canopy(buffer, IVec3::new(x, ground + h, z), rng);
        true
    }

    fn grow_canopy(&self, buffer: &mut ChunkBuffer, center: IVec3, rng: &mut SeededRng) {
        let canopy = &self.params.canopy;
        let r = canopy.size.lerp_round(rng.next_f32());

        for dx in -r..=r {
            for dy in -r..=r {
                for dz in -r..=r {
                    // One draw per cube cell, taken before the sphere test
                    let n = rng.next_f32();
                    if dx * dx + dy * dy + dz * dz >= r * r {
                        continue;
                    }
                    let cell = center + IVec3::new(dx, dy, dz);
                    if buffer.get(cell) != Some(BlockId::EMPTY) {
                        continue;
                    }
                    if n < canopy.density {
                        buffer.set(cell, BlockId::LEAVES);
                    }
                }
            }
        }
    }
}
