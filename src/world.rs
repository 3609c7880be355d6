use crate::{bound::Bounds, config::Config, error::Error, field::level_for_bounds, rule::Rule};
use rustc_hash::FxHashMap;
use slab::Slab;
use std::ops::{Index, IndexMut};
use tracing::{debug, trace, warn};

/// The id of a node, i.e., its key in the world's node arena.
///
/// Ids are only stable between two garbage collections.
#[derive(Hash, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug)]
pub(crate) struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The dead leaf. Always the first node of the arena.
pub(crate) const DEAD: NodeId = NodeId(0);
/// The living leaf. Always the second node of the arena.
pub(crate) const ALIVE: NodeId = NodeId(1);

/// The highest level the root may reach, so that every coordinate fits in an `i64`.
pub const MAX_LEVEL: u8 = 62;
/// The largest accepted step exponent.
pub const MAX_STEP: u8 = 60;
/// The level of the root of an empty world.
pub(crate) const MIN_ROOT_LEVEL: u8 = 3;

/// Four children of a node. Also the key of the canonical node table.
#[derive(Hash, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug)]
pub(crate) struct QuadChildren {
    pub(crate) nw: NodeId,
    pub(crate) ne: NodeId,
    pub(crate) sw: NodeId,
    pub(crate) se: NodeId,
}

/// Children, cached results, and other data.
#[derive(Clone, Debug)]
pub(crate) struct NodeData {
    /// A node with level `n` represents a square grid with size `2.pow(n)`.
    pub(crate) level: u8,
    pub(crate) population: u64,
    /// `None` for the two leaves.
    pub(crate) children: Option<QuadChildren>,
    /// The result of evolving `2.pow(step)` steps.
    pub(crate) cache_step: Option<NodeId>,
    /// The result of evolving `2.pow(level - 2)` steps.
    pub(crate) cache_quick: Option<NodeId>,
}

impl NodeData {
    fn leaf(population: u64) -> Self {
        NodeData {
            level: 0,
            population,
            children: None,
            cache_step: None,
            cache_quick: None,
        }
    }

    pub(crate) fn quad(&self) -> QuadChildren {
        match self.children {
            Some(children) => children,
            None => unreachable!("A leaf has no children."),
        }
    }

    pub(crate) fn nw(&self) -> NodeId {
        self.quad().nw
    }

    pub(crate) fn ne(&self) -> NodeId {
        self.quad().ne
    }

    pub(crate) fn sw(&self) -> NodeId {
        self.quad().sw
    }

    pub(crate) fn se(&self) -> NodeId {
        self.quad().se
    }
}

#[derive(Clone, Debug)]
pub struct World {
    pub(crate) rule: Rule,
    pub(crate) generation: u64,
    /// The actual step is `2.pow(step)`.
    pub(crate) step: u8,
    config: Config,
    hash_table: FxHashMap<QuadChildren, NodeId>,
    node_data: Slab<NodeData>,
    /// Logical size of the node table; doubles on every collection up to the limit.
    capacity: usize,
    max_load: usize,
    /// Cached empty nodes, indexed by level.
    empty_nodes: Vec<NodeId>,
    /// Level 2 nodes, indexed by their occupancy mask.
    pub(crate) leaf_blocks: Box<[Option<NodeId>]>,
    /// Level 1 results of evolving level 2 nodes, indexed by occupancy mask.
    pub(crate) block_results: Box<[Option<NodeId>]>,
    pub(crate) root: NodeId,
    snapshot: Option<NodeId>,
    precision_exceeded: bool,
}

impl Index<NodeId> for World {
    type Output = NodeData;

    fn index(&self, id: NodeId) -> &Self::Output {
        &self.node_data[id.index()]
    }
}

impl IndexMut<NodeId> for World {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        &mut self.node_data[id.index()]
    }
}

impl Default for World {
    fn default() -> Self {
        World::new(Rule::life())
    }
}

/// A fresh arena holding nothing but the two leaves.
fn leaf_arena(capacity: usize) -> Slab<NodeData> {
    let mut node_data = Slab::with_capacity(capacity);
    let dead = node_data.insert(NodeData::leaf(0));
    let alive = node_data.insert(NodeData::leaf(1));
    debug_assert_eq!((dead, alive), (DEAD.index(), ALIVE.index()));
    node_data
}

fn empty_block_cache() -> Box<[Option<NodeId>]> {
    vec![None; 1 << 16].into_boxed_slice()
}

impl World {
    pub fn new(rule: Rule) -> Self {
        Self::with_config(rule, Config::default())
    }

    pub fn new_with_step(rule: Rule, step: u8) -> Result<Self, Error> {
        let mut world = Self::new(rule);
        world.set_step(step)?;
        Ok(world)
    }

    pub fn with_config(rule: Rule, config: Config) -> Self {
        let capacity = config.initial_capacity();
        let mut world = World {
            rule,
            generation: 0,
            step: 0,
            config,
            hash_table: FxHashMap::default(),
            node_data: leaf_arena(0),
            capacity,
            max_load: config.max_load(capacity),
            empty_nodes: vec![DEAD],
            leaf_blocks: empty_block_cache(),
            block_results: empty_block_cache(),
            root: DEAD,
            snapshot: None,
            precision_exceeded: false,
        };
        world.root = world.empty_node(MIN_ROOT_LEVEL);
        world
    }

    pub fn population(&self) -> u64 {
        self[self.root].population
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Changes the rule. Every cached result depends on the rule, so all of them are dropped.
    pub fn set_rule(&mut self, rule: Rule) -> &mut Self {
        if rule != self.rule {
            debug!(from = %self.rule, to = %rule, "changing rule");
            self.rule = rule;
            self.clear_cache(true);
            self.block_results.iter_mut().for_each(|result| *result = None);
        }
        self
    }

    pub fn get_step(&self) -> u8 {
        self.step
    }

    pub fn set_step(&mut self, step: u8) -> Result<&mut Self, Error> {
        if step > MAX_STEP {
            return Err(Error::InvalidConfiguration(format!(
                "Step exponent {} is larger than {}",
                step, MAX_STEP
            )));
        }
        if step != self.step {
            debug!(from = self.step, to = step, "changing step");
            self.step = step;
            self.clear_cache(false);
        }
        Ok(self)
    }

    pub fn get_generation(&self) -> u64 {
        self.generation
    }

    pub fn set_generation(&mut self, generation: u64) -> &mut Self {
        self.generation = generation;
        self
    }

    /// Whether some population or generation count has saturated.
    pub fn precision_exceeded(&self) -> bool {
        self.precision_exceeded
    }

    /// The number of canonical nodes currently stored, leaves included.
    pub fn node_count(&self) -> usize {
        self.node_data.len()
    }

    /// Removes every cell and every stored node, and forgets the snapshot.
    ///
    /// The rule and the step are kept.
    pub fn clear(&mut self) {
        self.capacity = self.config.initial_capacity();
        self.max_load = self.config.max_load(self.capacity);
        self.hash_table = FxHashMap::default();
        self.node_data = leaf_arena(0);
        self.empty_nodes = vec![DEAD];
        self.leaf_blocks = empty_block_cache();
        self.block_results = empty_block_cache();
        self.snapshot = None;
        self.generation = 0;
        self.precision_exceeded = false;
        self.root = self.empty_node(MIN_ROOT_LEVEL);
    }

    pub fn get_cell(&self, x: i64, y: i64) -> bool {
        self.root_contains(x, y) && self.get_cell_rec(self.root, x, y)
    }

    /// Whether the cell lies in the square covered by the root.
    fn root_contains(&self, x: i64, y: i64) -> bool {
        let half = 1i64 << (self[self.root].level - 1);
        (-half..half).contains(&x) && (-half..half).contains(&y)
    }

    /// Sets the state of a cell.
    ///
    /// A living cell outside of the root first grows the universe until the
    /// cell lies in the central half of the root.
    pub fn set_cell(&mut self, x: i64, y: i64, state: bool) -> Result<&mut Self, Error> {
        let level = level_for_bounds(&Bounds::point(x, y));
        if state {
            if level + 1 > MAX_LEVEL as u32 {
                return Err(Error::PrecisionBoundaryExceeded(format!(
                    "Cell ({}, {}) is too far from the origin",
                    x, y
                )));
            }
            while level + 1 > self[self.root].level as u32 {
                self.expand()?;
            }
        } else if !self.root_contains(x, y) {
            return Ok(self);
        }
        self.root = self.set_cell_rec(self.root, x, y, state);
        self.check_gc();
        Ok(self)
    }

    /// Remembers the current root, to be restored by [`World::restore_snapshot`].
    pub fn save_snapshot(&mut self) -> &mut Self {
        self.snapshot = Some(self.root);
        self
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Goes back to the saved root and resets the generation counter.
    ///
    /// Returns `false` if there is no snapshot.
    pub fn restore_snapshot(&mut self) -> bool {
        match self.snapshot {
            Some(snapshot) => {
                self.root = snapshot;
                self.generation = 0;
                self.garbage_collect();
                true
            }
            None => false,
        }
    }

    /// Rebuilds the node table from the nodes reachable from the root and the snapshot.
    ///
    /// Every surviving node gets a new, compact id. The logical capacity of the
    /// table doubles until it reaches the configured limit.
    ///
    /// Collection only happens between public operations, so the node count
    /// may exceed the load threshold during one large advance.
    pub fn garbage_collect(&mut self) {
        let before = self.node_data.len();
        if self.capacity < self.config.max_capacity() {
            self.capacity <<= 1;
        }
        self.max_load = self.config.max_load(self.capacity);

        let old = std::mem::replace(&mut self.node_data, Slab::new());
        let mut relocation = Relocation::new(&old);
        self.root = relocation.relocate(self.root);
        self.snapshot = self.snapshot.map(|snapshot| relocation.relocate(snapshot));
        for cache in self
            .leaf_blocks
            .iter_mut()
            .chain(self.block_results.iter_mut())
        {
            *cache = cache.and_then(|id| relocation.moved(id));
        }
        let Relocation {
            node_data,
            hash_table,
            ..
        } = relocation;
        self.node_data = node_data;
        self.hash_table = hash_table;
        self.empty_nodes = vec![DEAD];
        debug!(
            before,
            after = self.node_data.len(),
            capacity = self.capacity,
            "garbage collected"
        );
    }

    /// Collects garbage if the table is overloaded.
    ///
    /// Node ids held by a running recursion would be invalidated by a
    /// collection, so this is only called once a public operation is done.
    pub(crate) fn check_gc(&mut self) {
        if self.node_data.len() > self.max_load {
            self.garbage_collect();
        }
    }

    pub(crate) fn note_precision_loss(&mut self, what: &str) {
        if !self.precision_exceeded {
            warn!(
                "{}",
                Error::PrecisionBoundaryExceeded(format!("{} saturated", what))
            );
            self.precision_exceeded = true;
        }
    }

    /// The canonical node with the given children.
    pub(crate) fn find_node(&mut self, nw: NodeId, ne: NodeId, sw: NodeId, se: NodeId) -> NodeId {
        let children = QuadChildren { nw, ne, sw, se };
        if let Some(&id) = self.hash_table.get(&children) {
            return id;
        }
        let level = self[nw].level + 1;
        debug_assert!(
            [ne, sw, se].iter().all(|&id| self[id].level + 1 == level),
            "All children must have the same level."
        );
        let population = [nw, ne, sw, se]
            .iter()
            .try_fold(0u64, |sum, &id| sum.checked_add(self[id].population));
        let population = match population {
            Some(population) => population,
            None => {
                self.note_precision_loss("Population");
                u64::MAX
            }
        };
        let id = NodeId(self.node_data.insert(NodeData {
            level,
            population,
            children: Some(children),
            cache_step: None,
            cache_quick: None,
        }) as u32);
        self.hash_table.insert(children, id);
        id
    }

    pub(crate) fn empty_node(&mut self, level: u8) -> NodeId {
        while self.empty_nodes.len() <= level as usize {
            let last = self.empty_nodes[self.empty_nodes.len() - 1];
            let new = self.find_node(last, last, last, last);
            self.empty_nodes.push(new);
        }
        self.empty_nodes[level as usize]
    }

    /// Wraps the root in a new level with empty borders.
    pub(crate) fn expand(&mut self) -> Result<(), Error> {
        let level = self[self.root].level;
        if level >= MAX_LEVEL {
            return Err(Error::PrecisionBoundaryExceeded(format!(
                "The universe cannot grow beyond level {}",
                MAX_LEVEL
            )));
        }
        let QuadChildren { nw, ne, sw, se } = self[self.root].quad();
        let empty = self.empty_node(level - 1);
        let nw = self.find_node(empty, empty, empty, nw);
        let ne = self.find_node(empty, empty, ne, empty);
        let sw = self.find_node(empty, sw, empty, empty);
        let se = self.find_node(se, empty, empty, empty);
        self.root = self.find_node(nw, ne, sw, se);
        trace!(level = level + 1, "expanded universe");
        Ok(())
    }

    /// Whether some living cell of the root is outside of its central quarter,
    /// i.e., whether some quadrant holds more cells than its innermost corner.
    pub(crate) fn should_expand(&self) -> bool {
        let QuadChildren { nw, ne, sw, se } = self[self.root].quad();
        self[nw].population != self[self[self[nw].se()].se()].population
            || self[ne].population != self[self[self[ne].sw()].sw()].population
            || self[sw].population != self[self[self[sw].ne()].ne()].population
            || self[se].population != self[self[self[se].nw()].nw()].population
    }

    /// Drops the cached results of the stepped evolution, and also of the
    /// quick evolution if `quick` is set.
    fn clear_cache(&mut self, quick: bool) {
        self.node_data.iter_mut().for_each(|(_, node)| {
            node.cache_step = None;
            if quick {
                node.cache_quick = None;
            }
        })
    }

    fn get_cell_rec(&self, node: NodeId, x: i64, y: i64) -> bool {
        let data = &self[node];
        if data.population == 0 {
            return false;
        }
        if data.level == 0 {
            return true;
        }
        let offset = if data.level == 1 { 0 } else { 1 << (data.level - 2) };
        match (x < 0, y < 0) {
            (true, true) => self.get_cell_rec(data.nw(), x + offset, y + offset),
            (false, true) => self.get_cell_rec(data.ne(), x - offset, y + offset),
            (true, false) => self.get_cell_rec(data.sw(), x + offset, y - offset),
            (false, false) => self.get_cell_rec(data.se(), x - offset, y - offset),
        }
    }

    fn set_cell_rec(&mut self, node: NodeId, x: i64, y: i64, state: bool) -> NodeId {
        let data = &self[node];
        if data.level == 0 {
            return if state { ALIVE } else { DEAD };
        }
        let offset = if data.level == 1 { 0 } else { 1 << (data.level - 2) };
        let QuadChildren {
            mut nw,
            mut ne,
            mut sw,
            mut se,
        } = data.quad();
        match (x < 0, y < 0) {
            (true, true) => nw = self.set_cell_rec(nw, x + offset, y + offset, state),
            (false, true) => ne = self.set_cell_rec(ne, x - offset, y + offset, state),
            (true, false) => sw = self.set_cell_rec(sw, x + offset, y - offset, state),
            (false, false) => se = self.set_cell_rec(se, x - offset, y - offset, state),
        }
        self.find_node(nw, ne, sw, se)
    }
}

/// Copies the nodes reachable from some roots into a fresh arena.
struct Relocation<'a> {
    old: &'a Slab<NodeData>,
    node_data: Slab<NodeData>,
    hash_table: FxHashMap<QuadChildren, NodeId>,
    /// The new id of every node copied so far, indexed by the old id.
    moved: Vec<Option<NodeId>>,
}

impl<'a> Relocation<'a> {
    fn new(old: &'a Slab<NodeData>) -> Self {
        let mut moved = vec![None; old.capacity().max(2)];
        moved[DEAD.index()] = Some(DEAD);
        moved[ALIVE.index()] = Some(ALIVE);
        let mut hash_table = FxHashMap::default();
        hash_table.reserve(old.len());
        Relocation {
            old,
            node_data: leaf_arena(old.len()),
            hash_table,
            moved,
        }
    }

    fn moved(&self, id: NodeId) -> Option<NodeId> {
        self.moved[id.index()]
    }

    fn relocate(&mut self, id: NodeId) -> NodeId {
        if let Some(new_id) = self.moved(id) {
            return new_id;
        }
        let data = &self.old[id.index()];
        let children = data.quad();
        let (cache_step, cache_quick) = (data.cache_step, data.cache_quick);
        let children = QuadChildren {
            nw: self.relocate(children.nw),
            ne: self.relocate(children.ne),
            sw: self.relocate(children.sw),
            se: self.relocate(children.se),
        };
        let cache_step = cache_step.map(|node| self.relocate(node));
        let cache_quick = cache_quick.map(|node| self.relocate(node));
        let data = &self.old[id.index()];
        let new_id = NodeId(self.node_data.insert(NodeData {
            level: data.level,
            population: data.population,
            children: Some(children),
            cache_step,
            cache_quick,
        }) as u32);
        self.hash_table.insert(children, new_id);
        self.moved[id.index()] = Some(new_id);
        new_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r_pentomino(world: &mut World) {
        let cells = [(0, -1), (1, -1), (-1, 0), (0, 0), (0, 1)];
        for &(x, y) in cells.iter() {
            world.set_cell(x, y, true).unwrap();
        }
    }

    #[test]
    fn test_canonical() {
        let mut world = World::default();
        let a = world.find_node(DEAD, ALIVE, ALIVE, DEAD);
        let b = world.find_node(DEAD, ALIVE, ALIVE, DEAD);
        assert_eq!(a, b);
        assert_eq!(world[a].population, 2);
        assert_eq!(world[a].level, 1);
        let c = world.find_node(ALIVE, DEAD, DEAD, ALIVE);
        assert_ne!(a, c);
        let count = world.node_count();
        world.find_node(a, c, a, c);
        world.find_node(a, c, a, c);
        assert_eq!(world.node_count(), count + 1);
    }

    #[test]
    fn test_canonical_after_gc() {
        let mut world = World::default();
        r_pentomino(&mut world);
        world.save_snapshot();
        world.advance(false).unwrap();
        world.garbage_collect();
        for root in [world.root, world.snapshot.unwrap()].iter() {
            let QuadChildren { nw, ne, sw, se } = world[*root].quad();
            assert_eq!(world.find_node(nw, ne, sw, se), *root);
        }
    }

    #[test]
    fn test_empty_node() {
        let mut world = World::default();
        for level in 0..10 {
            let empty = world.empty_node(level);
            assert_eq!(world[empty].level, level);
            assert_eq!(world[empty].population, 0);
        }
        let empty = world.empty_node(2);
        assert_eq!(world.find_node(empty, empty, empty, empty), world.empty_node(3));
    }

    #[test]
    fn test_get_cell() {
        let mut world = World::default();
        world.set_step(8).unwrap();
        r_pentomino(&mut world);
        assert_eq!(world.get_cell(-10, -10), false);
        assert_eq!(world.get_cell(-2, -2), false);
        assert_eq!(world.get_cell(-1, 0), true);
        assert_eq!(world.get_cell(0, 1), true);
        assert_eq!(world.get_cell(i64::MIN, i64::MAX), false);
        world.advance(true).unwrap();
        assert_eq!(world.get_cell(0, 0), false);
        assert_eq!(world.get_cell(-29, -17), true);
        assert_eq!(world.get_cell(21, -6), true);
    }

    #[test]
    fn test_set_cell() {
        let mut world = World::default();
        world.set_step(8).unwrap();
        r_pentomino(&mut world);
        assert_eq!(world.population(), 5);
        world.advance(true).unwrap();
        assert_eq!(world.population(), 141);
        world.set_cell(18, 8, false).unwrap();
        assert_eq!(world.population(), 140);
        world.advance(true).unwrap();
        assert_eq!(world.population(), 97);
    }

    #[test]
    fn test_set_cell_far_away() {
        let mut world = World::default();
        world.set_cell(1000, -1000, true).unwrap();
        assert_eq!(world.get_cell(1000, -1000), true);
        assert_eq!(world.population(), 1);
        assert_eq!(world[world.root].level, 12);
        world.set_cell(5000, 5000, false).unwrap();
        assert_eq!(world.population(), 1);
        assert!(matches!(
            world.set_cell(i64::MAX, 0, true),
            Err(Error::PrecisionBoundaryExceeded(_))
        ));
    }

    #[test]
    fn test_small_root() {
        let mut world = World::default();
        let block = [(-1, -1), (0, -1), (-1, 0), (0, 0)];
        world.load(&block, None).unwrap();
        world.advance(true).unwrap();
        assert_eq!(world[world.root].level, 2);
        for &(x, y) in block.iter() {
            assert_eq!(world.get_cell(x, y), true);
        }
        assert_eq!(world.get_cell(-3, 0), false);
        assert_eq!(world.get_cell(2, 0), false);
        world.set_cell(0, 0, false).unwrap();
        assert_eq!(world.get_cell(0, 0), false);
        assert_eq!(world.population(), 3);
        world.set_cell(5, 5, false).unwrap();
        assert_eq!(world.population(), 3);
        world.set_cell(5, 5, true).unwrap();
        assert_eq!(world.get_cell(5, 5), true);
        assert_eq!(world.population(), 4);
    }

    #[test]
    fn test_generation_saturates() {
        let mut world = World::default();
        world.set_generation(u64::MAX - 1);
        world.advance(true).unwrap();
        assert_eq!(world.get_generation(), u64::MAX);
        assert!(!world.precision_exceeded());
        world.advance(true).unwrap();
        assert_eq!(world.get_generation(), u64::MAX);
        assert!(world.precision_exceeded());
        world.clear();
        assert!(!world.precision_exceeded());
    }

    #[test]
    fn test_population_saturates() {
        let mut world = World::default();
        let mut full = ALIVE;
        for _ in 0..31 {
            full = world.find_node(full, full, full, full);
        }
        assert_eq!(world[full].population, 1 << 62);
        assert!(!world.precision_exceeded());
        let full = world.find_node(full, full, full, full);
        assert_eq!(world[full].population, u64::MAX);
        assert!(world.precision_exceeded());
    }

    #[test]
    fn test_population_additivity() {
        let mut world = World::default();
        world.set_step(4).unwrap();
        r_pentomino(&mut world);
        for _ in 0..4 {
            world.advance(true).unwrap();
        }
        for (_, data) in world.node_data.iter() {
            if let Some(QuadChildren { nw, ne, sw, se }) = data.children {
                let sum = world[nw].population
                    + world[ne].population
                    + world[sw].population
                    + world[se].population;
                assert_eq!(data.population, sum);
            } else {
                assert!(data.population <= 1);
            }
        }
    }

    #[test]
    fn test_set_step() {
        let mut world = World::default();
        assert!(matches!(
            world.set_step(MAX_STEP + 1),
            Err(Error::InvalidConfiguration(_))
        ));
        assert_eq!(world.get_step(), 0);
        world.set_step(MAX_STEP).unwrap();
        assert_eq!(world.get_step(), MAX_STEP);
    }

    #[test]
    fn test_gc() {
        let mut world = World::default();
        world.set_step(8).unwrap();
        r_pentomino(&mut world);
        assert_eq!(world.population(), 5);
        let populations = [141, 188, 204, 162, 116, 116, 116, 116];
        for &n in populations.iter() {
            world.advance(true).unwrap();
            world.garbage_collect();
            assert_eq!(world.population(), n);
        }
    }

    #[test]
    fn test_gc_drops_garbage() {
        let mut world = World::default();
        r_pentomino(&mut world);
        for _ in 0..64 {
            world.advance(true).unwrap();
        }
        let (before, population) = (world.node_count(), world.population());
        world.clear_cache(true);
        world.garbage_collect();
        assert!(world.node_count() < before);
        assert_eq!(world.population(), population);
    }

    #[test]
    fn test_snapshot() {
        let mut world = World::default();
        assert_eq!(world.restore_snapshot(), false);
        r_pentomino(&mut world);
        world.save_snapshot();
        world.set_step(6).unwrap();
        world.advance(true).unwrap();
        assert_eq!(world.get_generation(), 64);
        assert_ne!(world.population(), 5);
        assert!(world.restore_snapshot());
        assert_eq!(world.get_generation(), 0);
        assert_eq!(world.population(), 5);
        assert_eq!(world.get_cell(1, -1), true);
        world.clear();
        assert!(!world.has_snapshot());
        assert_eq!(world.population(), 0);
    }

    #[test]
    fn test_set_rule() {
        let mut world = World::default();
        r_pentomino(&mut world);
        world.advance(true).unwrap();
        let cached = world.node_data.iter().any(|(_, data)| data.cache_quick.is_some());
        assert!(cached);
        world.set_rule("B36/S23".parse().unwrap());
        assert!(world
            .node_data
            .iter()
            .all(|(_, data)| data.cache_quick.is_none() && data.cache_step.is_none()));
        assert!(world.block_results.iter().all(Option::is_none));
    }
}
