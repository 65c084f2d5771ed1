//! Four-wide bounding volume hierarchy: tagged node references, inner
//! nodes with four child AABBs in SoA form, and the leaf encoding the
//! packet traversal consumes.

mod node;
pub mod traversal;

pub use node::Node;

use std::sync::Arc;

use index_vec::{define_index_type, IndexVec};
use nalgebra::Vector3;
use thiserror::Error;

use crate::scene::Scene;

/// Children per inner node.
pub const N: usize = 4;

/// Deepest tree the traversal stack can absorb.
pub const MAX_DEPTH: usize = 128;

define_index_type! {
    /// Index into the inner-node arena of a [`Bvh4`].
    pub struct NodeIdx = u32;
    IMPL_RAW_CONVERSIONS = true;
}

define_index_type! {
    /// Index into the primitive-block arena of a [`Bvh4`].
    pub struct BlockIdx = u32;
    IMPL_RAW_CONVERSIONS = true;
}

/// Tagged reference to either an inner node or a run of leaf blocks.
///
/// The low four bits carry the type tag: zero for inner nodes, and
/// `LEAF_BASE + block count` for leaves, so one leaf addresses up to
/// seven contiguous primitive blocks. The remaining bits hold the arena
/// index. The highest bit is a barrier flag reserved for build-time tree
/// rotations; traversal never follows a reference with it set.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct NodeRef(u32);

impl NodeRef {
    /// Width of the tag field in bits.
    pub const ALIGNMENT: u32 = 4;
    pub const ALIGN_MASK: u32 = (1 << Self::ALIGNMENT) - 1;
    pub const ITEMS_MASK: u32 = (1 << Self::ALIGNMENT) - 1;
    /// Tag of a leaf holding zero blocks; leaf tags are `LEAF_BASE + count`.
    pub const LEAF_BASE: u32 = 8;
    /// Largest number of primitive blocks one leaf can address.
    pub const MAX_LEAF_BLOCKS: u32 = Self::ITEMS_MASK - Self::LEAF_BASE;
    pub const BARRIER_MASK: u32 = 1 << 31;

    /// A leaf with no blocks; terminates the child list of a node.
    pub const EMPTY: NodeRef = NodeRef(Self::LEAF_BASE);
    /// Bottom-of-stack marker; never stored inside a valid tree.
    pub const INVALID: NodeRef = NodeRef((!0u32 & !Self::ITEMS_MASK) | Self::LEAF_BASE);

    pub fn node(index: NodeIdx) -> NodeRef {
        let raw = index.raw();
        assert2::debug_assert!(raw << Self::ALIGNMENT >> Self::ALIGNMENT == raw);
        NodeRef(raw << Self::ALIGNMENT)
    }

    pub fn leaf(base: BlockIdx, blocks: u32) -> NodeRef {
        assert2::debug_assert!(blocks <= Self::MAX_LEAF_BLOCKS);
        let raw = base.raw();
        assert2::debug_assert!(raw << Self::ALIGNMENT >> Self::ALIGNMENT == raw);
        NodeRef(raw << Self::ALIGNMENT | (Self::LEAF_BASE + blocks))
    }

    pub fn is_leaf(self) -> bool {
        self.0 & Self::LEAF_BASE != 0
    }

    pub fn is_node(self) -> bool {
        self.0 & Self::ALIGN_MASK == 0
    }

    /// Arena index of an inner node.
    pub fn node_index(self) -> NodeIdx {
        assert2::debug_assert!(self.is_node());
        NodeIdx::from_raw((self.0 & !Self::BARRIER_MASK) >> Self::ALIGNMENT)
    }

    /// Decodes a leaf into its first block and the number of blocks.
    pub fn decode_leaf(self) -> (BlockIdx, usize) {
        assert2::debug_assert!(self.is_leaf());
        let base = BlockIdx::from_raw((self.0 & !Self::ALIGN_MASK & !Self::BARRIER_MASK) >> Self::ALIGNMENT);
        let blocks = (self.0 & Self::ITEMS_MASK) - Self::LEAF_BASE;
        (base, blocks as usize)
    }

    pub fn set_barrier(&mut self) {
        self.0 |= Self::BARRIER_MASK;
    }

    pub fn clear_barrier(&mut self) {
        self.0 &= !Self::BARRIER_MASK;
    }

    pub fn is_barrier(self) -> bool {
        self.0 & Self::BARRIER_MASK != 0
    }
}

impl Default for NodeRef {
    fn default() -> Self {
        NodeRef::EMPTY
    }
}

impl std::fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self == NodeRef::INVALID {
            write!(f, "NodeRef::INVALID")
        } else if *self == NodeRef::EMPTY {
            write!(f, "NodeRef::EMPTY")
        } else if self.is_node() {
            write!(f, "NodeRef::node({})", self.node_index().raw())
        } else {
            let (base, blocks) = self.decode_leaf();
            write!(f, "NodeRef::leaf({}, {})", base.raw(), blocks)
        }
    }
}

/// Axis-aligned box with scalar bounds, used on the build/inspection
/// side of the node API.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Aabb {
        Aabb { min, max }
    }
}

/// Malformed-tree reports from [`Bvh4::verify`].
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("node {node:?}: children after the first empty slot (slot {slot}) are not empty")]
    ChildrenNotPacked { node: NodeIdx, slot: usize },
    #[error("node {node:?}, slot {slot}: child node index outside the arena")]
    NodeOutOfRange { node: NodeIdx, slot: usize },
    #[error("node {node:?}, slot {slot}: leaf blocks overrun the primitive arena")]
    LeafOutOfRange { node: NodeIdx, slot: usize },
    #[error("node {node:?}, slot {slot}: barrier flag set on a reachable reference")]
    BarrierSet { node: NodeIdx, slot: usize },
    #[error("barrier flag set on the root reference")]
    RootBarrier,
    #[error("root node index outside the arena")]
    RootOutOfRange,
    #[error("tree deeper than the traversal limit of {MAX_DEPTH}")]
    TooDeep,
}

/// A four-wide BVH over primitive blocks of type `P`.
///
/// The tree owns its nodes and blocks through two arenas and shares the
/// scene handle with the caller. Traversal borrows it immutably; nothing
/// here is touched while rays are in flight.
pub struct Bvh4<P> {
    root: NodeRef,
    nodes: IndexVec<NodeIdx, Node>,
    blocks: IndexVec<BlockIdx, P>,
    scene: Arc<Scene>,
    list_mode: bool,
    pub num_primitives: usize,
    pub num_vertices: usize,
}

impl<P> Bvh4<P> {
    pub fn new(scene: Arc<Scene>, list_mode: bool) -> Bvh4<P> {
        Bvh4 {
            root: NodeRef::INVALID,
            nodes: IndexVec::new(),
            blocks: IndexVec::new(),
            scene,
            list_mode,
            num_primitives: 0,
            num_vertices: 0,
        }
    }

    pub fn root(&self) -> NodeRef {
        self.root
    }

    pub fn set_root(&mut self, root: NodeRef) {
        self.root = root;
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn list_mode(&self) -> bool {
        self.list_mode
    }

    pub fn push_node(&mut self, node: Node) -> NodeIdx {
        self.nodes.push(node)
    }

    pub fn node(&self, index: NodeIdx) -> &Node {
        &self.nodes[index]
    }

    pub fn node_mut(&mut self, index: NodeIdx) -> &mut Node {
        &mut self.nodes[index]
    }

    /// Appends a contiguous run of primitive blocks and returns the leaf
    /// reference addressing it.
    pub fn push_leaf(&mut self, blocks: impl IntoIterator<Item = P>) -> NodeRef {
        let base = self.blocks.len_idx();
        let mut count = 0u32;
        for block in blocks {
            self.blocks.push(block);
            count += 1;
        }
        assert2::assert!(count <= NodeRef::MAX_LEAF_BLOCKS);
        if count == 0 {
            NodeRef::EMPTY
        } else {
            NodeRef::leaf(base, count)
        }
    }

    /// The primitive blocks addressed by a decoded leaf.
    pub fn leaf_blocks(&self, base: BlockIdx, blocks: usize) -> &[P] {
        &self.blocks.raw[base.raw() as usize..base.raw() as usize + blocks]
    }

    /// Checks the structural invariants traversal relies on: left-packed
    /// children, in-range arena references, no barrier flags, bounded
    /// depth.
    pub fn verify(&self) -> Result<(), VerifyError> {
        if self.root == NodeRef::INVALID {
            return Ok(());
        }
        if self.root.is_barrier() {
            return Err(VerifyError::RootBarrier);
        }
        if self.root.is_node() && self.root.node_index() >= self.nodes.len_idx() {
            return Err(VerifyError::RootOutOfRange);
        }
        self.verify_ref(self.root, 0)
    }

    fn verify_ref(&self, cur: NodeRef, depth: usize) -> Result<(), VerifyError> {
        if depth > MAX_DEPTH {
            return Err(VerifyError::TooDeep);
        }
        if cur.is_leaf() {
            return Ok(());
        }

        let index = cur.node_index();
        let node = &self.nodes[index];
        let mut seen_empty = false;
        for (slot, &child) in node.children.iter().enumerate() {
            if child == NodeRef::EMPTY {
                seen_empty = true;
                continue;
            }
            if seen_empty {
                return Err(VerifyError::ChildrenNotPacked { node: index, slot });
            }
            if child.is_barrier() {
                return Err(VerifyError::BarrierSet { node: index, slot });
            }
            if child.is_node() {
                if child.node_index() >= self.nodes.len_idx() {
                    return Err(VerifyError::NodeOutOfRange { node: index, slot });
                }
            } else {
                let (base, blocks) = child.decode_leaf();
                if base.raw() as usize + blocks > self.blocks.len() {
                    return Err(VerifyError::LeafOutOfRange { node: index, slot });
                }
            }
            self.verify_ref(child, depth + 1)?;
        }
        Ok(())
    }
}
