//! Noise-based resource placement and heightmap terrain

use glam::IVec3;

use super::noise::{CoherentNoise, NoiseSource};
use crate::generation::ChunkBuffer;
use crate::generation::config::TerrainParams;
use crate::voxel::block::{BlockId, BlockRegistry};

/// Resource and terrain stages of chunk generation
#[derive(Clone, Debug)]
pub struct TerrainGenerator {
    params: TerrainParams,
    resource_noise: CoherentNoise,
    height_noise: CoherentNoise,
}

impl TerrainGenerator {
    pub fn new(params: TerrainParams, noise: &NoiseSource) -> Self {
        Self {
            params,
            resource_noise: noise.resources.clone(),
            height_noise: noise.terrain.clone(),
        }
    }

    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// Surface height of the column at world (x, z), clamped to `[0, chunk_height - 1]`
    pub fn height_at(&self, x: i32, z: i32, chunk_height: u32) -> i32 {
        let scale = self.params.scale as f64;
        let value = self.height_noise.sample_2d(x as f64 / scale, z as f64 / scale);
        let height = (self.params.offset as f64 + self.params.magnitude as f64 * value).floor() as i32;
        height.clamp(0, chunk_height as i32 - 1)
    }

    /// Fill cells whose resource noise exceeds each type's scarcity.
    ///
    /// Types are applied in registry order, so later resources overwrite
    /// earlier ones where both pass.
    pub fn place_resources(&self, buffer: &mut ChunkBuffer, registry: &BlockRegistry, origin: IVec3) {
        let size = buffer.size();
        for (id, res) in registry.resources() {
            let scale = res.scale.as_dvec3();
            let threshold = res.scarcity as f64;
            for x in 0..size.width as i32 {
                for y in 0..size.height as i32 {
                    for z in 0..size.width as i32 {
                        let world = origin + IVec3::new(x, y, z);
                        let value = self.resource_noise.sample_3d(
                            world.x as f64 / scale.x,
                            world.y as f64 / scale.y,
                            world.z as f64 / scale.z,
                        );
                        if value > threshold {
                            buffer.set(IVec3::new(x, y, z), id);
                        }
                    }
                }
            }
        }
    }

    /// Carve the heightmap over placed resources.
    ///
    /// Sand fills everything up to the surface in columns at or below water
    /// level (and the cells up to water level elsewhere), the surface becomes
    /// grass, dirt fills empty cells beneath it and everything above is cleared.
    pub fn carve(&self, buffer: &mut ChunkBuffer, origin: IVec3) {
        let size = buffer.size();
        let water = self.params.water_height;
        for x in 0..size.width as i32 {
            for z in 0..size.width as i32 {
                let height = self.height_at(origin.x + x, origin.z + z, size.height);
                for y in 0..size.height as i32 {
                    let local = IVec3::new(x, y, z);
                    if y <= water && y <= height {
                        buffer.set(local, BlockId::SAND);
                    } else if y == height {
                        buffer.set(local, BlockId::GRASS);
                    } else if y < height {
                        if buffer.get(local) == Some(BlockId::EMPTY) {
                            buffer.set(local, BlockId::DIRT);
                        }
                    } else {
                        buffer.set(local, BlockId::EMPTY);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::chunk::ChunkSize;

    fn generator(params: TerrainParams) -> TerrainGenerator {
        TerrainGenerator::new(params, &NoiseSource::new(0))
    }

    #[test]
    fn test_height_clamped() {
        let terrain = generator(TerrainParams {
            offset: 100.0,
            ..Default::default()
        });
        assert_eq!(terrain.height_at(0, 0, 32), 31);

        let terrain = generator(TerrainParams {
            offset: -100.0,
            ..Default::default()
        });
        assert_eq!(terrain.height_at(5, 5, 32), 0);
    }

    #[test]
    fn test_height_deterministic() {
        let a = generator(TerrainParams::default());
        let b = generator(TerrainParams::default());
        for i in -20..20 {
            assert_eq!(a.height_at(i * 7, i * 3, 32), b.height_at(i * 7, i * 3, 32));
        }
    }

    #[test]
    fn test_carve_column_layers() {
        let size = ChunkSize::new(4, 32);
        let terrain = generator(TerrainParams {
            magnitude: 0.0,
            offset: 10.0,
            water_height: 3,
            ..Default::default()
        });
        let mut buffer = ChunkBuffer::new(size);
        terrain.carve(&mut buffer, IVec3::ZERO);

        let col = |y| buffer.get(IVec3::new(1, y, 2));
        assert_eq!(col(0), Some(BlockId::SAND));
        assert_eq!(col(3), Some(BlockId::SAND));
        assert_eq!(col(4), Some(BlockId::DIRT));
        assert_eq!(col(9), Some(BlockId::DIRT));
        assert_eq!(col(10), Some(BlockId::GRASS));
        assert_eq!(col(11), Some(BlockId::EMPTY));
        assert_eq!(col(31), Some(BlockId::EMPTY));
    }

    #[test]
    fn test_carve_underwater_column_is_sand() {
        let size = ChunkSize::new(2, 16);
        let terrain = generator(TerrainParams {
            magnitude: 0.0,
            offset: 4.0,
            water_height: 5,
            ..Default::default()
        });
        let mut buffer = ChunkBuffer::new(size);
        terrain.carve(&mut buffer, IVec3::ZERO);

        for y in 0..=4 {
            assert_eq!(buffer.get(IVec3::new(0, y, 0)), Some(BlockId::SAND));
        }
        assert_eq!(buffer.get(IVec3::new(0, 5, 0)), Some(BlockId::EMPTY));
    }

    #[test]
    fn test_resources_survive_below_surface_only() {
        let size = ChunkSize::new(4, 32);
        let terrain = generator(TerrainParams {
            magnitude: 0.0,
            offset: 20.0,
            water_height: 2,
            ..Default::default()
        });
        let mut buffer = ChunkBuffer::new(size);
        for y in 0..size.height as i32 {
            buffer.set(IVec3::new(0, y, 0), BlockId::COAL);
        }
        terrain.carve(&mut buffer, IVec3::ZERO);

        assert_eq!(buffer.get(IVec3::new(0, 2, 0)), Some(BlockId::SAND));
        assert_eq!(buffer.get(IVec3::new(0, 3, 0)), Some(BlockId::COAL));
        assert_eq!(buffer.get(IVec3::new(0, 19, 0)), Some(BlockId::COAL));
        assert_eq!(buffer.get(IVec3::new(0, 20, 0)), Some(BlockId::GRASS));
        assert_eq!(buffer.get(IVec3::new(0, 21, 0)), Some(BlockId::EMPTY));
        // Neighboring column had no resources and got dirt
        assert_eq!(buffer.get(IVec3::new(1, 3, 0)), Some(BlockId::DIRT));
    }

    #[test]
    fn test_place_resources_uses_registry() {
        let size = ChunkSize::new(8, 16);
        let terrain = generator(TerrainParams::default());
        let registry = BlockRegistry::standard();
        let mut buffer = ChunkBuffer::new(size);
        terrain.place_resources(&mut buffer, &registry, IVec3::ZERO);

        let ids = buffer.ids();
        assert!(ids.iter().all(|id| id.is_empty() || registry.get(*id).is_some_and(|t| t.resource.is_some())));
    }

    #[test]
    fn test_place_resources_threshold() {
        // Scarcity just above zero: roughly half the cells pass
        let registry = BlockRegistry::new(vec![
            crate::voxel::block::BlockType::new(BlockId::EMPTY, "empty"),
            crate::voxel::block::BlockType::resource(BlockId(1), "ore", glam::Vec3::splat(3.0), 0.001),
        ])
        .unwrap();
        let terrain = generator(TerrainParams::default());
        let mut buffer = ChunkBuffer::new(ChunkSize::new(16, 16));
        terrain.place_resources(&mut buffer, &registry, IVec3::new(160, 0, -48));

        let placed = buffer.ids().iter().filter(|id| !id.is_empty()).count();
        assert!(placed > 0);
        assert!(placed < 16 * 16 * 16);
    }
}
