//! World streamer - keeps a square window of chunks loaded around the agent
//! and routes block queries and edits to the owning chunk.
//!
//! Chunks move `absent -> generating -> loaded -> absent`. Generation is
//! delegated to a [`GenerationScheduler`]; each request carries a per-slot
//! ticket so results for slots that were dropped or re-requested are ignored.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::{IVec3, Vec3};

use super::chunk_loader::{
    BackgroundScheduler, GenerationJob, GenerationOutput, GenerationScheduler, ImmediateScheduler,
};
use crate::core::config::{SchedulingMode, WorldConfig};
use crate::core::types::Result;
use crate::generation::{GenerationParams, GenerationPipeline};
use crate::math::ray::{Ray, RayHit};
use crate::voxel::block::{BlockId, BlockRegistry};
use crate::voxel::chunk::{BlockSource, Chunk, ChunkCoord, ChunkSize, NEIGHBOR_OFFSETS};
use crate::voxel::edit::EditOverlay;

/// Reach used for block picking
pub const DEFAULT_REACH: f32 = 4.0;

/// Something the renderer may want to react to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// Chunk finished generating and has instances
    Loaded(ChunkCoord),
    /// Chunk left the map; its renderables are disposed
    Unloaded(ChunkCoord),
    /// An edit changed the chunk's blocks or instances
    Modified(ChunkCoord),
}

pub struct WorldStreamer {
    size: ChunkSize,
    draw_distance: i32,
    registry: Arc<BlockRegistry>,
    pipeline: Arc<GenerationPipeline>,
    chunks: HashMap<ChunkCoord, Chunk>,
    overlay: EditOverlay,
    scheduler: Box<dyn GenerationScheduler>,
    next_ticket: u64,
    /// Chunk containing the agent at the last update
    center: Option<ChunkCoord>,
    events: Vec<StreamEvent>,
}

impl WorldStreamer {
    /// Streamer with the scheduler selected by `config.scheduling`
    pub fn new(config: &WorldConfig, registry: Arc<BlockRegistry>) -> Result<Self> {
        let scheduler: Box<dyn GenerationScheduler> = match config.scheduling {
            SchedulingMode::Immediate => Box::new(ImmediateScheduler::new()),
            SchedulingMode::Deferred => Box::new(BackgroundScheduler::new(config.worker_threads)?),
        };
        Ok(Self::with_scheduler(config, registry, scheduler))
    }

    pub fn with_scheduler(
        config: &WorldConfig,
        registry: Arc<BlockRegistry>,
        scheduler: Box<dyn GenerationScheduler>,
    ) -> Self {
        let mut size = config.chunk_size;
        if size.width == 0 {
            log::warn!("chunk width 0 is unusable; using width 1");
            size.width = 1;
        }
        if size.height == 0 {
            log::warn!("chunk height 0 leaves every chunk empty");
        }

        let water = config.generation.terrain.water_height;
        if water >= config.chunk_size.height as i32 {
            log::warn!(
                "water height {} is at or above chunk height {}; every column will be sand",
                water,
                config.chunk_size.height
            );
        }

        Self {
            size,
            draw_distance: config.draw_distance,
            pipeline: Arc::new(GenerationPipeline::new(config.generation.clone(), registry.clone())),
            registry,
            chunks: HashMap::new(),
            overlay: EditOverlay::new(),
            scheduler,
            next_ticket: 1,
            center: None,
            events: Vec::new(),
        }
    }

    pub fn chunk_size(&self) -> ChunkSize {
        self.size
    }

    pub fn draw_distance(&self) -> i32 {
        self.draw_distance
    }

    pub fn set_draw_distance(&mut self, draw_distance: i32) {
        self.draw_distance = draw_distance;
    }

    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    pub fn params(&self) -> &GenerationParams {
        self.pipeline.params()
    }

    /// Swap generation parameters. Existing chunks keep their data until
    /// [`Self::regenerate`] or [`Self::reset`].
    pub fn set_params(&mut self, params: GenerationParams) {
        self.pipeline = Arc::new(GenerationPipeline::new(params, self.registry.clone()));
    }

    pub fn overlay(&self) -> &EditOverlay {
        &self.overlay
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    pub fn chunk_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        self.chunks.get_mut(&coord)
    }

    /// Every chunk slot, loaded or generating
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn chunks_mut(&mut self) -> impl Iterator<Item = &mut Chunk> {
        self.chunks.values_mut()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn loaded_coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.chunks.values().filter(|c| c.is_loaded()).map(|c| c.coord)
    }

    pub fn center(&self) -> Option<ChunkCoord> {
        self.center
    }

    /// Take events accumulated since the last call
    pub fn drain_events(&mut self) -> Vec<StreamEvent> {
        std::mem::take(&mut self.events)
    }

    /// True when no generation is in flight and every slot is loaded
    pub fn is_idle(&self) -> bool {
        self.scheduler.pending_count() == 0 && self.chunks.values().all(Chunk::is_loaded)
    }

    /// Recompute the window around `position`, drop chunks that left it,
    /// request chunks that entered it and install finished results.
    pub fn update(&mut self, position: Vec3) {
        let center = ChunkCoord::from_world_pos(position, self.size.width);
        if self.center != Some(center) {
            log::debug!("Streaming window moved to ({}, {})", center.x, center.z);
            self.center = Some(center);
        }

        let stale: Vec<ChunkCoord> = self
            .chunks
            .keys()
            .filter(|coord| coord.chebyshev(center) > self.draw_distance)
            .copied()
            .collect();
        for coord in stale {
            self.unload(coord);
        }

        let d = self.draw_distance;
        for dx in -d..=d {
            for dz in -d..=d {
                let coord = ChunkCoord::new(center.x + dx, center.z + dz);
                if !self.chunks.contains_key(&coord) {
                    self.request(coord);
                }
            }
        }

        self.poll();
    }

    /// Install any finished generation results. Returns how many were installed.
    pub fn poll(&mut self) -> usize {
        let mut installed = 0;
        for output in self.scheduler.poll() {
            if self.install(output) {
                installed += 1;
            }
        }
        installed
    }

    /// Poll until idle or until `timeout` elapses. Returns whether it became idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.poll();
            if self.is_idle() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Block id at a world coordinate; `None` when the owning chunk is absent
    /// or still generating, or `y` is outside the chunk height.
    pub fn block_at(&self, pos: IVec3) -> Option<BlockId> {
        let (coord, local) = self.size.split(pos);
        self.chunks.get(&coord).and_then(|chunk| chunk.block_id(local))
    }

    /// Destroy the block at `pos`. Returns false when there is nothing to remove
    /// or the owning chunk is not loaded.
    pub fn remove_block(&mut self, pos: IVec3) -> bool {
        let (coord, local) = self.size.split(pos);
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return false;
        };
        match chunk.block_id(local) {
            Some(id) if !id.is_empty() => {}
            _ => return false,
        }

        chunk.release_instance(local);
        chunk.set_block_id(local, BlockId::EMPTY);
        self.overlay.set(coord, local, BlockId::EMPTY);
        self.events.push(StreamEvent::Modified(coord));

        self.sync_neighbors(pos, coord);
        true
    }

    /// Place block `id` at `pos`. Returns false when the cell is occupied, the
    /// owning chunk is not loaded, or `id` is empty or unknown.
    pub fn add_block(&mut self, pos: IVec3, id: BlockId) -> bool {
        if id.is_empty() || !self.registry.contains(id) {
            return false;
        }
        let (coord, local) = self.size.split(pos);
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return false;
        };
        if chunk.block_id(local) != Some(BlockId::EMPTY) {
            return false;
        }

        chunk.set_block_id(local, id);
        self.overlay.set(coord, local, id);
        self.sync_instance(pos);
        self.events.push(StreamEvent::Modified(coord));

        self.sync_neighbors(pos, coord);
        true
    }

    /// First solid block along a ray within `max_distance`
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        Ray::new(origin, direction).cast_voxels(max_distance, |cell| self.is_solid(cell))
    }

    /// Highest non-empty cell of a loaded column
    pub fn surface_height(&self, x: i32, z: i32) -> Option<i32> {
        (0..self.size.height as i32)
            .rev()
            .find(|y| self.is_solid(IVec3::new(x, *y, z)))
    }

    /// Rebuild every chunk slot from parameters and the overlay
    pub fn regenerate(&mut self) {
        let coords: Vec<ChunkCoord> = self.chunks.keys().copied().collect();
        log::info!("Regenerating {} chunks", coords.len());
        for coord in coords {
            self.unload(coord);
            self.request(coord);
        }
        self.poll();
    }

    /// Rebuild one chunk. Returns false when it has no slot.
    pub fn regenerate_chunk(&mut self, coord: ChunkCoord) -> bool {
        if !self.chunks.contains_key(&coord) {
            return false;
        }
        self.unload(coord);
        self.request(coord);
        self.poll();
        true
    }

    /// Forget all edits and drop every chunk. The next update streams a fresh world.
    pub fn reset(&mut self) {
        log::info!("Resetting world ({} edits discarded)", self.overlay.len());
        self.overlay.clear();
        let coords: Vec<ChunkCoord> = self.chunks.keys().copied().collect();
        for coord in coords {
            self.unload(coord);
        }
        self.center = None;
    }

    fn request(&mut self, coord: ChunkCoord) {
        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let mut chunk = Chunk::new(coord, self.size, self.registry.clone());
        chunk.set_ticket(ticket);
        self.chunks.insert(coord, chunk);

        self.scheduler.submit(GenerationJob {
            coord,
            ticket,
            size: self.size,
            edits: self.overlay.entries_for(coord),
            pipeline: self.pipeline.clone(),
        });
    }

    fn unload(&mut self, coord: ChunkCoord) {
        let Some(mut chunk) = self.chunks.remove(&coord) else {
            return;
        };
        let was_loaded = chunk.is_loaded();
        chunk.dispose_instances();
        self.events.push(StreamEvent::Unloaded(coord));
        if was_loaded {
            self.refresh_seams(coord);
        }
    }

    fn install(&mut self, output: GenerationOutput) -> bool {
        let accepted = self
            .chunks
            .get(&output.coord)
            .is_some_and(|c| !c.is_loaded() && c.ticket() == output.ticket);
        if !accepted {
            log::debug!(
                "Discarding stale result for chunk ({}, {}) ticket {}",
                output.coord.x,
                output.coord.z,
                output.ticket
            );
            return false;
        }
        if output.blocks.len() != self.size.volume() {
            log::warn!("Discarding malformed result for chunk ({}, {})", output.coord.x, output.coord.z);
            return false;
        }

        let coord = output.coord;
        let Some(mut chunk) = self.chunks.remove(&coord) else {
            return false;
        };
        chunk.install(output.blocks, self.pipeline.params().terrain.water_height);
        chunk.build_instances(&*self);
        self.chunks.insert(coord, chunk);

        self.refresh_seams(coord);
        self.events.push(StreamEvent::Loaded(coord));
        true
    }

    /// Re-sync the border cells of loaded neighbors facing `coord`
    fn refresh_seams(&mut self, coord: ChunkCoord) {
        let w = self.size.width as i32;
        let h = self.size.height as i32;
        for neighbor in coord.neighbors() {
            let Some(mut chunk) = self.chunks.remove(&neighbor) else {
                continue;
            };
            if chunk.is_loaded() {
                let dx = coord.x - neighbor.x;
                let dz = coord.z - neighbor.z;
                for y in 0..h {
                    for i in 0..w {
                        let local = match (dx, dz) {
                            (1, _) => IVec3::new(w - 1, y, i),
                            (-1, _) => IVec3::new(0, y, i),
                            (_, 1) => IVec3::new(i, y, w - 1),
                            _ => IVec3::new(i, y, 0),
                        };
                        chunk.sync_instance(local, &*self);
                    }
                }
            }
            self.chunks.insert(neighbor, chunk);
        }
    }

    /// Make the instance state at `pos` match its exposure. Skips unloaded chunks.
    fn sync_instance(&mut self, pos: IVec3) -> bool {
        if pos.y < 0 || pos.y >= self.size.height as i32 {
            return false;
        }
        let (coord, local) = self.size.split(pos);
        let Some(mut chunk) = self.chunks.remove(&coord) else {
            return false;
        };
        let changed = chunk.is_loaded() && chunk.sync_instance(local, &*self);
        self.chunks.insert(coord, chunk);
        changed
    }

    fn sync_neighbors(&mut self, pos: IVec3, edited: ChunkCoord) {
        for offset in NEIGHBOR_OFFSETS {
            let n = pos + offset;
            if self.sync_instance(n) {
                let (coord, _) = self.size.split(n);
                if coord != edited {
                    self.events.push(StreamEvent::Modified(coord));
                }
            }
        }
    }
}

impl BlockSource for WorldStreamer {
    fn block_at(&self, pos: IVec3) -> Option<BlockId> {
        WorldStreamer::block_at(self, pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::chunk_loader::TaskHandle;
    use std::sync::Mutex;

    fn config(mode: SchedulingMode, draw_distance: i32) -> WorldConfig {
        WorldConfig {
            chunk_size: ChunkSize::new(16, 32),
            draw_distance,
            scheduling: mode,
            worker_threads: 2,
            generation: GenerationParams::with_seed(4),
        }
    }

    fn immediate(draw_distance: i32) -> WorldStreamer {
        WorldStreamer::new(&config(SchedulingMode::Immediate, draw_distance), Arc::new(BlockRegistry::standard())).unwrap()
    }

    /// Scheduler whose jobs complete only when the test says so
    #[derive(Clone, Default)]
    struct ManualScheduler {
        queued: Arc<Mutex<Vec<GenerationJob>>>,
        ready: Arc<Mutex<Vec<GenerationOutput>>>,
    }

    impl ManualScheduler {
        fn complete_all(&self) {
            let jobs: Vec<_> = self.queued.lock().unwrap().drain(..).collect();
            let mut ready = self.ready.lock().unwrap();
            ready.extend(jobs.into_iter().map(GenerationJob::run));
        }
    }

    impl GenerationScheduler for ManualScheduler {
        fn submit(&mut self, job: GenerationJob) -> TaskHandle {
            let handle = job.handle();
            self.queued.lock().unwrap().push(job);
            handle
        }

        fn poll(&mut self) -> Vec<GenerationOutput> {
            std::mem::take(&mut *self.ready.lock().unwrap())
        }

        fn pending_count(&self) -> usize {
            self.queued.lock().unwrap().len() + self.ready.lock().unwrap().len()
        }
    }

    fn manual(draw_distance: i32) -> (WorldStreamer, ManualScheduler) {
        let scheduler = ManualScheduler::default();
        let streamer = WorldStreamer::with_scheduler(
            &config(SchedulingMode::Deferred, draw_distance),
            Arc::new(BlockRegistry::standard()),
            Box::new(scheduler.clone()),
        );
        (streamer, scheduler)
    }

    fn window(center: ChunkCoord, d: i32) -> Vec<ChunkCoord> {
        let mut coords = Vec::new();
        for dx in -d..=d {
            for dz in -d..=d {
                coords.push(ChunkCoord::new(center.x + dx, center.z + dz));
            }
        }
        coords.sort();
        coords
    }

    fn loaded_sorted(streamer: &WorldStreamer) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = streamer.loaded_coords().collect();
        coords.sort();
        coords
    }

    /// Exposed iff has an instance, for every loaded voxel
    fn assert_face_visibility(streamer: &WorldStreamer) {
        for chunk in streamer.chunks().filter(|c| c.is_loaded()) {
            assert!(chunk.packing_is_consistent(), "packing broken in {:?}", chunk.coord);
            for (local, voxel) in chunk.iter_voxels() {
                if voxel.is_empty() {
                    assert!(voxel.instance.is_none());
                    continue;
                }
                let world = chunk.to_world(local);
                let exposed = NEIGHBOR_OFFSETS.iter().any(|o| !streamer.is_solid(world + *o));
                assert_eq!(
                    voxel.instance.is_some(),
                    exposed,
                    "voxel {:?} in chunk {:?}",
                    world,
                    chunk.coord
                );
            }
        }
    }

    /// Top of a tree-free terrain column inside chunk (0, 0)
    fn spawn_point(streamer: &WorldStreamer) -> IVec3 {
        for x in 2..14 {
            for z in 2..14 {
                let Some(y) = streamer.surface_height(x, z) else { continue };
                let top = IVec3::new(x, y, z);
                let terrain = matches!(streamer.block_at(top), Some(BlockId::GRASS | BlockId::SAND));
                if terrain && y >= 2 {
                    return top;
                }
            }
        }
        panic!("no terrain column found");
    }

    #[test]
    fn test_window_is_chebyshev_square() {
        let mut streamer = immediate(1);
        streamer.update(Vec3::new(8.0, 10.0, 8.0));
        assert_eq!(loaded_sorted(&streamer), window(ChunkCoord::new(0, 0), 1));

        // Cross into chunk (2, -1): old far column drops, new one loads
        streamer.update(Vec3::new(40.0, 10.0, -3.0));
        assert_eq!(loaded_sorted(&streamer), window(ChunkCoord::new(2, -1), 1));
        assert_eq!(streamer.chunk_count(), 9);
    }

    #[test]
    fn test_events_report_loads_and_unloads() {
        let mut streamer = immediate(0);
        streamer.update(Vec3::ZERO);
        assert_eq!(streamer.drain_events(), vec![StreamEvent::Loaded(ChunkCoord::new(0, 0))]);

        streamer.update(Vec3::new(20.0, 0.0, 0.0));
        let events = streamer.drain_events();
        assert!(events.contains(&StreamEvent::Unloaded(ChunkCoord::new(0, 0))));
        assert!(events.contains(&StreamEvent::Loaded(ChunkCoord::new(1, 0))));
    }

    #[test]
    fn test_zero_width_falls_back_to_one() {
        let mut config = config(SchedulingMode::Immediate, 0);
        config.chunk_size = ChunkSize::new(0, 8);
        let mut streamer = WorldStreamer::new(&config, Arc::new(BlockRegistry::standard())).unwrap();
        assert_eq!(streamer.chunk_size().width, 1);

        streamer.update(Vec3::new(-3.5, 4.0, 2.5));
        assert_eq!(streamer.center(), Some(ChunkCoord::new(-4, 2)));
        assert!(streamer.block_at(IVec3::new(-4, 0, 2)).is_some());
        assert_eq!(streamer.block_at(IVec3::new(0, 0, 0)), None);
    }

    #[test]
    fn test_shrinking_draw_distance_unloads_outer_ring() {
        let mut streamer = immediate(2);
        streamer.update(Vec3::ZERO);
        assert_eq!(streamer.chunk_count(), 25);

        streamer.set_draw_distance(1);
        streamer.update(Vec3::ZERO);
        assert_eq!(streamer.draw_distance(), 1);
        assert_eq!(loaded_sorted(&streamer), window(ChunkCoord::new(0, 0), 1));
    }

    #[test]
    fn test_new_params_apply_after_reset() {
        let mut streamer = immediate(0);
        streamer.update(Vec3::ZERO);
        let before = streamer.chunk(ChunkCoord::new(0, 0)).unwrap().block_ids();

        streamer.set_params(GenerationParams::with_seed(4));
        streamer.update(Vec3::ZERO);
        assert_eq!(streamer.chunk(ChunkCoord::new(0, 0)).unwrap().block_ids(), before);

        let mut params = GenerationParams::with_seed(4);
        params.terrain.offset = -100.0;
        streamer.set_params(params);
        streamer.reset();
        streamer.update(Vec3::ZERO);
        let after = streamer.chunk(ChunkCoord::new(0, 0)).unwrap().block_ids();
        assert!(after.iter().all(|id| *id == BlockId::SAND || id.is_empty()));
        assert_ne!(after, before);
    }

    #[test]
    fn test_block_at_missing_chunk_is_none() {
        let mut streamer = immediate(0);
        assert_eq!(streamer.block_at(IVec3::new(1, 1, 1)), None);
        streamer.update(Vec3::ZERO);
        assert!(streamer.block_at(IVec3::new(1, 1, 1)).is_some());
        assert_eq!(streamer.block_at(IVec3::new(17, 1, 1)), None);
        assert_eq!(streamer.block_at(IVec3::new(1, 32, 1)), None);
        assert_eq!(streamer.block_at(IVec3::new(1, -1, 1)), None);
    }

    #[test]
    fn test_generating_chunk_has_no_data() {
        let (mut streamer, scheduler) = manual(0);
        streamer.update(Vec3::ZERO);
        assert_eq!(streamer.chunk_count(), 1);
        assert_eq!(streamer.block_at(IVec3::new(1, 1, 1)), None);
        assert!(!streamer.remove_block(IVec3::new(1, 1, 1)));

        scheduler.complete_all();
        assert_eq!(streamer.poll(), 1);
        assert!(streamer.block_at(IVec3::new(1, 1, 1)).is_some());
        assert!(streamer.is_idle());
    }

    #[test]
    fn test_late_result_for_dropped_chunk_is_discarded() {
        let (mut streamer, scheduler) = manual(0);
        streamer.update(Vec3::ZERO);
        streamer.update(Vec3::new(100.0, 0.0, 0.0));
        assert!(streamer.chunk(ChunkCoord::new(0, 0)).is_none());

        scheduler.complete_all();
        assert_eq!(streamer.poll(), 1);
        assert!(streamer.chunk(ChunkCoord::new(0, 0)).is_none());
        assert_eq!(loaded_sorted(&streamer), vec![ChunkCoord::new(6, 0)]);
    }

    #[test]
    fn test_stale_ticket_rejected_after_rerequest() {
        let (mut streamer, scheduler) = manual(0);
        streamer.update(Vec3::ZERO);
        // Leave and come back before the first job finishes
        streamer.update(Vec3::new(100.0, 0.0, 0.0));
        streamer.update(Vec3::ZERO);
        let ticket = streamer.chunk(ChunkCoord::new(0, 0)).unwrap().ticket();

        scheduler.complete_all();
        streamer.poll();
        let chunk = streamer.chunk(ChunkCoord::new(0, 0)).unwrap();
        assert!(chunk.is_loaded());
        assert_eq!(chunk.ticket(), ticket);
    }

    #[test]
    fn test_deferred_matches_immediate() {
        let mut sync = immediate(1);
        let mut deferred = WorldStreamer::new(
            &config(SchedulingMode::Deferred, 1),
            Arc::new(BlockRegistry::standard()),
        )
        .unwrap();

        sync.update(Vec3::new(3.0, 0.0, 3.0));
        deferred.update(Vec3::new(3.0, 0.0, 3.0));
        assert!(deferred.wait_idle(Duration::from_secs(20)));

        assert_eq!(loaded_sorted(&sync), loaded_sorted(&deferred));
        for coord in loaded_sorted(&sync) {
            let a = sync.chunk(coord).unwrap();
            let b = deferred.chunk(coord).unwrap();
            assert_eq!(a.block_ids(), b.block_ids(), "chunk {coord:?}");
            assert_eq!(a.instance_count(), b.instance_count(), "chunk {coord:?}");
        }
        assert_face_visibility(&deferred);
    }

    #[test]
    fn test_face_visibility_across_seams() {
        let mut streamer = immediate(1);
        streamer.update(Vec3::new(8.0, 0.0, 8.0));
        assert_face_visibility(&streamer);

        // Unload a column: its former neighbors' border cells become exposed
        streamer.update(Vec3::new(24.0, 0.0, 8.0));
        assert_face_visibility(&streamer);
    }

    #[test]
    fn test_remove_block_exposes_neighbors() {
        let mut streamer = immediate(1);
        streamer.update(Vec3::new(8.0, 0.0, 8.0));
        streamer.drain_events();

        let top = spawn_point(&streamer);
        let below = top - IVec3::Y;
        assert!(streamer.remove_block(top));
        assert_eq!(streamer.block_at(top), Some(BlockId::EMPTY));
        assert_eq!(streamer.overlay().get(ChunkCoord::new(0, 0), top), Some(BlockId::EMPTY));
        assert!(streamer.remove_block(below));
        assert!(!streamer.remove_block(below));

        assert!(streamer.drain_events().contains(&StreamEvent::Modified(ChunkCoord::new(0, 0))));
        assert_face_visibility(&streamer);
    }

    #[test]
    fn test_add_block_encloses_neighbors() {
        let mut streamer = immediate(1);
        streamer.update(Vec3::new(8.0, 0.0, 8.0));

        let ground = spawn_point(&streamer);
        let above = ground + IVec3::Y;
        assert!(!streamer.add_block(ground, BlockId::STONE));
        assert!(!streamer.add_block(above, BlockId::EMPTY));
        assert!(!streamer.add_block(above, BlockId(99)));

        assert!(streamer.add_block(above, BlockId::STONE));
        assert_eq!(streamer.block_at(above), Some(BlockId::STONE));
        assert_face_visibility(&streamer);

        // A ring around the new block plus a lid enclose it completely
        for offset in [IVec3::X, IVec3::NEG_X, IVec3::Z, IVec3::NEG_Z, IVec3::Y] {
            let cell = above + offset;
            if streamer.block_at(cell) == Some(BlockId::EMPTY) {
                assert!(streamer.add_block(cell, BlockId::DIRT));
            }
        }
        let (coord, local) = streamer.chunk_size().split(above);
        let voxel = *streamer.chunk(coord).unwrap().voxel(local).unwrap();
        assert!(voxel.instance.is_none());
        assert_face_visibility(&streamer);
    }

    #[test]
    fn test_edit_across_chunk_border() {
        let mut streamer = immediate(1);
        streamer.update(Vec3::new(8.0, 0.0, 8.0));

        // Dig the column at x = 0 of chunk (0, 0): cells at x = -1 in chunk (-1, 0) get exposed
        let z = 4;
        let top = streamer.surface_height(0, z).unwrap();
        for y in (top - 3..=top).rev() {
            streamer.remove_block(IVec3::new(0, y, z));
        }
        assert_face_visibility(&streamer);
    }

    #[test]
    fn test_edits_survive_regeneration() {
        let mut streamer = immediate(0);
        streamer.update(Vec3::new(8.0, 0.0, 8.0));
        let ground = spawn_point(&streamer);

        let floating = IVec3::new(ground.x, 30, ground.z);

        assert!(streamer.remove_block(ground));
        assert!(streamer.add_block(floating, BlockId::GOLD));

        streamer.regenerate();
        assert_eq!(streamer.block_at(ground), Some(BlockId::EMPTY));
        assert_eq!(streamer.block_at(floating), Some(BlockId::GOLD));
        assert_face_visibility(&streamer);

        // Out of range and back again
        streamer.update(Vec3::new(200.0, 0.0, 8.0));
        streamer.update(Vec3::new(8.0, 0.0, 8.0));
        assert_eq!(streamer.block_at(ground), Some(BlockId::EMPTY));
        assert_eq!(streamer.block_at(floating), Some(BlockId::GOLD));
    }

    #[test]
    fn test_regenerate_is_deterministic() {
        let mut streamer = immediate(1);
        streamer.update(Vec3::new(8.0, 0.0, 8.0));
        let before: Vec<_> = loaded_sorted(&streamer)
            .into_iter()
            .map(|c| streamer.chunk(c).unwrap().block_ids())
            .collect();

        streamer.regenerate();
        let after: Vec<_> = loaded_sorted(&streamer)
            .into_iter()
            .map(|c| streamer.chunk(c).unwrap().block_ids())
            .collect();
        assert_eq!(before, after);
        assert_face_visibility(&streamer);
    }

    #[test]
    fn test_regenerate_single_chunk() {
        let mut streamer = immediate(1);
        streamer.update(Vec3::new(8.0, 0.0, 8.0));
        assert!(streamer.regenerate_chunk(ChunkCoord::new(1, 0)));
        assert!(!streamer.regenerate_chunk(ChunkCoord::new(9, 9)));
        assert!(streamer.chunk(ChunkCoord::new(1, 0)).unwrap().is_loaded());
        assert_face_visibility(&streamer);
    }

    #[test]
    fn test_reset_discards_edits() {
        let mut streamer = immediate(0);
        streamer.update(Vec3::new(8.0, 0.0, 8.0));
        let ground = spawn_point(&streamer);
        let original = streamer.block_at(ground);
        streamer.remove_block(ground);

        streamer.reset();
        assert_eq!(streamer.chunk_count(), 0);
        assert!(streamer.overlay().is_empty());

        streamer.update(Vec3::new(8.0, 0.0, 8.0));
        assert_eq!(streamer.block_at(ground), original);
    }

    #[test]
    fn test_raycast_picks_surface() {
        let mut streamer = immediate(0);
        streamer.update(Vec3::new(8.0, 0.0, 8.0));
        let ground = spawn_point(&streamer);

        let eye = ground.as_vec3() + Vec3::new(0.5, 2.5, 0.5);
        let hit = streamer.raycast(eye, -Vec3::Y, DEFAULT_REACH).unwrap();
        assert_eq!(hit.block, ground);
        assert_eq!(hit.place_position(), ground + IVec3::Y);

        assert!(streamer.raycast(eye, Vec3::Y, DEFAULT_REACH).is_none());
    }

    #[test]
    fn test_unloaded_chunk_edits_rejected() {
        let mut streamer = immediate(0);
        streamer.update(Vec3::new(8.0, 0.0, 8.0));
        assert!(!streamer.add_block(IVec3::new(40, 20, 40), BlockId::STONE));
        assert!(!streamer.remove_block(IVec3::new(-5, 1, 0)));
        assert!(streamer.overlay().is_empty());
    }
}
