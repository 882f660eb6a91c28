//! Block types and the read-only block registry

use glam::Vec3;

use crate::core::error::Error;
use crate::core::types::Result;

/// Identifier of a block type. Id 0 is reserved for empty space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u8);

impl BlockId {
    pub const EMPTY: BlockId = BlockId(0);
    pub const GRASS: BlockId = BlockId(1);
    pub const DIRT: BlockId = BlockId(2);
    pub const STONE: BlockId = BlockId(3);
    pub const COAL: BlockId = BlockId(4);
    pub const IRON: BlockId = BlockId(5);
    pub const TREE: BlockId = BlockId(6);
    pub const LEAVES: BlockId = BlockId(7);
    pub const SAND: BlockId = BlockId(8);
    pub const DIAMOND: BlockId = BlockId(9);
    pub const GOLD: BlockId = BlockId(10);
    pub const CLOUD: BlockId = BlockId(11);
    pub const SNOW: BlockId = BlockId(12);
    pub const JUNGLE_TREE: BlockId = BlockId(13);
    pub const JUNGLE_LEAVES: BlockId = BlockId(14);

    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Opaque handle the renderer resolves to a material. The core never looks inside.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u32);

/// Noise parameters that make a block type a generated resource.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResourceParams {
    /// Per-axis divisor applied to world coordinates before sampling 3D noise
    pub scale: Vec3,
    /// Noise value above which the resource is placed, in (0, 1)
    pub scarcity: f32,
}

/// One entry of the block catalog.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockType {
    pub id: BlockId,
    pub name: &'static str,
    pub resource: Option<ResourceParams>,
    pub material: MaterialHandle,
}

impl BlockType {
    /// Plain block with no resource placement
    pub fn new(id: BlockId, name: &'static str) -> Self {
        Self {
            id,
            name,
            resource: None,
            material: MaterialHandle(id.0 as u32),
        }
    }

    /// Block placed by the resource stage
    pub fn resource(id: BlockId, name: &'static str, scale: Vec3, scarcity: f32) -> Self {
        Self {
            resource: Some(ResourceParams { scale, scarcity }),
            ..Self::new(id, name)
        }
    }
}

/// Immutable catalog of block types, indexed densely by id.
///
/// Built once and shared by handle (`Arc<BlockRegistry>`) between the
/// streamer, every chunk, and generation jobs.
#[derive(Clone, Debug)]
pub struct BlockRegistry {
    types: Vec<BlockType>,
    /// Ids of resource types in placement order
    resources: Vec<BlockId>,
}

impl BlockRegistry {
    /// Build a registry from a table.
    ///
    /// Ids must be dense and start at 0, and id 0 must be the empty type.
    /// Resource scarcity must lie in (0, 1) and scales must be non-zero.
    pub fn new(mut types: Vec<BlockType>) -> Result<Self> {
        types.sort_by_key(|t| t.id);
        Self::validate(&types)?;
        Ok(Self::from_table(types))
    }

    /// The standard block table.
    ///
    /// Resource order matters: later resources overwrite earlier ones.
    pub fn standard() -> Self {
        let types = Self::standard_types();
        debug_assert!(Self::validate(&types).is_ok());
        Self::from_table(types)
    }

    /// Entries of [`Self::standard`], in id order
    pub fn standard_types() -> Vec<BlockType> {
        vec![
            BlockType::new(BlockId::EMPTY, "empty"),
            BlockType::new(BlockId::GRASS, "grass"),
            BlockType::new(BlockId::DIRT, "dirt"),
            BlockType::resource(BlockId::STONE, "stone", Vec3::new(30.0, 30.0, 30.0), 0.5),
            BlockType::resource(BlockId::COAL, "coal", Vec3::new(20.0, 20.0, 20.0), 0.75),
            BlockType::resource(BlockId::IRON, "iron", Vec3::new(60.0, 60.0, 60.0), 0.8),
            BlockType::new(BlockId::TREE, "tree"),
            BlockType::new(BlockId::LEAVES, "leaves"),
            BlockType::new(BlockId::SAND, "sand"),
            BlockType::resource(BlockId::DIAMOND, "diamond", Vec3::new(80.0, 25.0, 29.0), 0.92),
            BlockType::resource(BlockId::GOLD, "gold", Vec3::new(46.0, 18.0, 42.0), 0.88),
            BlockType::new(BlockId::CLOUD, "cloud"),
            BlockType::new(BlockId::SNOW, "snow"),
            BlockType::new(BlockId::JUNGLE_TREE, "jungleTree"),
            BlockType::new(BlockId::JUNGLE_LEAVES, "jungleLeaves"),
        ]
    }

    /// Check a table already sorted by id
    fn validate(types: &[BlockType]) -> Result<()> {
        for (i, ty) in types.iter().enumerate() {
            if ty.id.index() != i {
                return Err(Error::Registry(format!(
                    "block ids must be dense from 0, found id {} at position {}",
                    ty.id.0, i
                )));
            }
            if let Some(res) = &ty.resource {
                if ty.id.is_empty() {
                    return Err(Error::Registry("empty block cannot be a resource".into()));
                }
                if !(res.scarcity > 0.0 && res.scarcity < 1.0) {
                    return Err(Error::Registry(format!(
                        "scarcity of '{}' must be in (0, 1), got {}",
                        ty.name, res.scarcity
                    )));
                }
                if res.scale.cmpeq(Vec3::ZERO).any() {
                    return Err(Error::Registry(format!("noise scale of '{}' has a zero axis", ty.name)));
                }
            }
        }

        if types.first().map(|t| t.id) != Some(BlockId::EMPTY) {
            return Err(Error::Registry("registry needs an empty block with id 0".into()));
        }
        Ok(())
    }

    fn from_table(types: Vec<BlockType>) -> Self {
        let resources = types
            .iter()
            .filter(|t| t.resource.is_some())
            .map(|t| t.id)
            .collect();
        Self { types, resources }
    }

    pub fn get(&self, id: BlockId) -> Option<&BlockType> {
        self.types.get(id.index())
    }

    pub fn contains(&self, id: BlockId) -> bool {
        id.index() < self.types.len()
    }

    /// Number of block types including empty
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All block types in id order
    pub fn iter(&self) -> impl Iterator<Item = &BlockType> {
        self.types.iter()
    }

    /// Every type except empty, in id order
    pub fn solid_types(&self) -> impl Iterator<Item = &BlockType> {
        self.types.iter().filter(|t| !t.id.is_empty())
    }

    /// Resource types with their noise parameters, in placement order
    pub fn resources(&self) -> impl Iterator<Item = (BlockId, ResourceParams)> + '_ {
        self.resources
            .iter()
            .filter_map(|id| self.get(*id).and_then(|t| t.resource.map(|r| (*id, r))))
    }

    pub fn by_name(&self, name: &str) -> Option<&BlockType> {
        self.types.iter().find(|t| t.name == name)
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
