//! Cloud layer along the top of each chunk

use glam::IVec3;

use super::ChunkBuffer;
use super::config::CloudParams;
use crate::terrain::noise::CoherentNoise;
use crate::voxel::block::BlockId;

#[derive(Clone, Debug)]
pub struct CloudGenerator {
    params: CloudParams,
    noise: CoherentNoise,
}

impl CloudGenerator {
    pub fn new(params: CloudParams, noise: CoherentNoise) -> Self {
        Self { params, noise }
    }

    pub fn enabled(&self) -> bool {
        self.params.draw
    }

    /// Cloud coverage at world column (x, z): noise remapped to [0, 1]
    pub fn coverage_at(&self, x: i32, z: i32) -> f64 {
        let scale = self.params.scale as f64;
        (self.noise.sample_2d(x as f64 / scale, z as f64 / scale) + 1.0) * 0.5
    }

    /// Mark top-layer cells whose coverage falls below the density threshold.
    pub fn place(&self, buffer: &mut ChunkBuffer, origin: IVec3) -> usize {
        let size = buffer.size();
        let top = size.height as i32 - 1;
        let mut placed = 0;
        for x in 0..size.width as i32 {
            for z in 0..size.width as i32 {
                if self.coverage_at(origin.x + x, origin.z + z) < self.params.density as f64 {
                    buffer.set(IVec3::new(x, top, z), BlockId::CLOUD);
                    placed += 1;
                }
            }
        }
        placed
    }
}
