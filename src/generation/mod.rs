//! World generation pipeline - builds chunk block data in fixed stage order.
//!
//! The pipeline runs:
//! 1. Resource placement (3D noise per resource type)
//! 2. Terrain carving (2D heightmap: sand, grass, dirt, air)
//! 3. Vegetation (trunks and canopies)
//! 4. Clouds (optional top layer)
//! 5. Player edits (unconditional overrides)
//!
//! Output is a pure function of parameters, registry, chunk coordinate and
//! edits, so it can run on any thread.

pub mod config;
pub mod tree_gen;
pub mod cloud_gen;

pub use config::GenerationParams;
pub use tree_gen::TreeGenerator;
pub use cloud_gen::CloudGenerator;

use std::sync::Arc;
use std::time::Instant;

use glam::IVec3;

use crate::terrain::generator::TerrainGenerator;
use crate::terrain::noise::NoiseSource;
use crate::voxel::block::{BlockId, BlockRegistry};
use crate::voxel::chunk::{ChunkCoord, ChunkSize};

/// Dense block-id grid under construction, laid out like a chunk's voxels.
///
/// Writes outside the grid are ignored. Reads outside return `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkBuffer {
    size: ChunkSize,
    ids: Vec<BlockId>,
}

impl ChunkBuffer {
    /// All-empty buffer
    pub fn new(size: ChunkSize) -> Self {
        Self {
            size,
            ids: vec![BlockId::EMPTY; size.volume()],
        }
    }

    pub fn size(&self) -> ChunkSize {
        self.size
    }

    pub fn get(&self, local: IVec3) -> Option<BlockId> {
        self.size.index(local).map(|i| self.ids[i])
    }

    pub fn set(&mut self, local: IVec3, id: BlockId) {
        if let Some(i) = self.size.index(local) {
            self.ids[i] = id;
        }
    }

    pub fn ids(&self) -> &[BlockId] {
        &self.ids
    }

    pub fn into_ids(self) -> Vec<BlockId> {
        self.ids
    }
}

/// Chunk generation pipeline shared by every chunk of one world.
///
/// Cheap to share as `Arc<GenerationPipeline>` with background jobs.
#[derive(Debug)]
pub struct GenerationPipeline {
    params: GenerationParams,
    registry: Arc<BlockRegistry>,
    terrain: TerrainGenerator,
    trees: TreeGenerator,
    clouds: CloudGenerator,
}

impl GenerationPipeline {
    pub fn new(params: GenerationParams, registry: Arc<BlockRegistry>) -> Self {
        let noise = NoiseSource::new(params.seed);
        let terrain = TerrainGenerator::new(params.terrain.clone(), &noise);
        let trees = TreeGenerator::new(params.trees.clone(), noise.seed());
        let clouds = CloudGenerator::new(params.clouds.clone(), noise.clouds.clone());

        Self {
            params,
            registry,
            terrain,
            trees,
            clouds,
        }
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    pub fn terrain(&self) -> &TerrainGenerator {
        &self.terrain
    }

    /// Generate block data for one chunk, applying `edits` last.
    ///
    /// Edits naming an id outside the registry are skipped.
    pub fn generate(&self, coord: ChunkCoord, size: ChunkSize, edits: &[(IVec3, BlockId)]) -> ChunkBuffer {
        let start = Instant::now();
        let origin = coord.origin(size.width);
        let mut buffer = ChunkBuffer::new(size);

        self.terrain.place_resources(&mut buffer, &self.registry, origin);
        self.terrain.carve(&mut buffer, origin);

        let tree_start = Instant::now();
        let trunks = self.trees.place(&mut buffer);
        let tree_time = tree_start.elapsed();

        if self.clouds.enabled() {
            self.clouds.place(&mut buffer, origin);
        }

        for (local, id) in edits {
            if self.registry.contains(*id) {
                buffer.set(*local, *id);
            }
        }

        log::debug!(
            "Generated chunk ({}, {}) in {:.2}ms ({} trees in {:.2}ms, {} edits)",
            coord.x,
            coord.z,
            start.elapsed().as_secs_f64() * 1000.0,
            trunks,
            tree_time.as_secs_f64() * 1000.0,
            edits.len()
        );

        buffer
    }

    /// Generated (pre-edit) surface height of world column (x, z)
    pub fn height_at(&self, x: i32, z: i32, chunk_height: u32) -> i32 {
        self.terrain.height_at(x, z, chunk_height)
    }
}
