use crate::{
    error::Error,
    rule::block_bit,
    world::{NodeId, QuadChildren, World, ALIVE, DEAD, MIN_ROOT_LEVEL},
};
use tracing::trace;

impl World {
    /// Advances the world.
    ///
    /// If `is_single` is set, the world moves `2.pow(step)` generations.
    /// Otherwise it moves `2.pow(level - 2)` generations at once, where `level`
    /// is the level of the root after expansion.
    pub fn advance(&mut self, is_single: bool) -> Result<&mut Self, Error> {
        while self[self.root].level < MIN_ROOT_LEVEL
            || (is_single && self[self.root].level <= self.step + 2)
            || self.should_expand()
        {
            self.expand()?;
        }
        let (root, generations) = if is_single {
            (self.step_node(self.root), 1 << self.step)
        } else {
            let level = self[self.root].level;
            (self.quick_node(self.root), 1 << (level - 2))
        };
        self.root = root;
        self.generation = match self.generation.checked_add(generations) {
            Some(generation) => generation,
            None => {
                self.note_precision_loss("Generation");
                u64::MAX
            }
        };
        trace!(generation = self.generation, "advanced");
        self.check_gc();
        Ok(self)
    }

    /// The central half of the node, advanced `2.pow(step)` generations.
    fn step_node(&mut self, id: NodeId) -> NodeId {
        let data = &self[id];
        if let Some(node) = data.cache_step {
            return node;
        }
        if data.level == self.step + 2 {
            return self.quick_node(id);
        }
        let [t00, t01, t02, t10, t11, t12, t20, t21, t22] = self.nine_windows(id);
        let t00 = self.central_node(t00);
        let t01 = self.central_node(t01);
        let t02 = self.central_node(t02);
        let t10 = self.central_node(t10);
        let t11 = self.central_node(t11);
        let t12 = self.central_node(t12);
        let t20 = self.central_node(t20);
        let t21 = self.central_node(t21);
        let t22 = self.central_node(t22);
        let pre_new_nw = self.find_node(t00, t01, t10, t11);
        let pre_new_ne = self.find_node(t01, t02, t11, t12);
        let pre_new_sw = self.find_node(t10, t11, t20, t21);
        let pre_new_se = self.find_node(t11, t12, t21, t22);
        let new_nw = self.step_node(pre_new_nw);
        let new_ne = self.step_node(pre_new_ne);
        let new_sw = self.step_node(pre_new_sw);
        let new_se = self.step_node(pre_new_se);
        let node = self.find_node(new_nw, new_ne, new_sw, new_se);
        self[id].cache_step = Some(node);
        node
    }

    /// The central half of the node, advanced `2.pow(level - 2)` generations.
    fn quick_node(&mut self, id: NodeId) -> NodeId {
        let data = &self[id];
        if let Some(node) = data.cache_quick {
            return node;
        }
        if data.level == 2 {
            let node = self.step_block(self.block_mask(id));
            self[id].cache_quick = Some(node);
            return node;
        }
        let [t00, t01, t02, t10, t11, t12, t20, t21, t22] = self.nine_windows(id);
        let t00 = self.quick_node(t00);
        let t01 = self.quick_node(t01);
        let t02 = self.quick_node(t02);
        let t10 = self.quick_node(t10);
        let t11 = self.quick_node(t11);
        let t12 = self.quick_node(t12);
        let t20 = self.quick_node(t20);
        let t21 = self.quick_node(t21);
        let t22 = self.quick_node(t22);
        let pre_new_nw = self.find_node(t00, t01, t10, t11);
        let pre_new_ne = self.find_node(t01, t02, t11, t12);
        let pre_new_sw = self.find_node(t10, t11, t20, t21);
        let pre_new_se = self.find_node(t11, t12, t21, t22);
        let new_nw = self.quick_node(pre_new_nw);
        let new_ne = self.quick_node(pre_new_ne);
        let new_sw = self.quick_node(pre_new_sw);
        let new_se = self.quick_node(pre_new_se);
        let node = self.find_node(new_nw, new_ne, new_sw, new_se);
        self[id].cache_quick = Some(node);
        node
    }

    /// The nine overlapping sub-nodes of a node, each one level lower,
    /// in row-major order.
    fn nine_windows(&mut self, id: NodeId) -> [NodeId; 9] {
        let QuadChildren { nw, ne, sw, se } = self[id].quad();
        let n01 = self.find_node(self[nw].ne(), self[ne].nw(), self[nw].se(), self[ne].sw());
        let n10 = self.find_node(self[nw].sw(), self[nw].se(), self[sw].nw(), self[sw].ne());
        let n11 = self.find_node(self[nw].se(), self[ne].sw(), self[sw].ne(), self[se].nw());
        let n12 = self.find_node(self[ne].sw(), self[ne].se(), self[se].nw(), self[se].ne());
        let n21 = self.find_node(self[sw].ne(), self[se].nw(), self[sw].se(), self[se].sw());
        [nw, n01, ne, n10, n11, n12, sw, n21, se]
    }

    fn central_node(&mut self, id: NodeId) -> NodeId {
        let QuadChildren { nw, ne, sw, se } = self[id].quad();
        let new_nw = self[nw].se();
        let new_ne = self[ne].sw();
        let new_sw = self[sw].ne();
        let new_se = self[se].nw();
        self.find_node(new_nw, new_ne, new_sw, new_se)
    }

    /// The occupancy mask of a level 2 node.
    pub(crate) fn block_mask(&self, id: NodeId) -> u16 {
        let QuadChildren { nw, ne, sw, se } = self[id].quad();
        [(nw, 0, 0), (ne, 2, 0), (sw, 0, 2), (se, 2, 2)]
            .iter()
            .fold(0, |mask, &(quadrant, x, y)| {
                let QuadChildren { nw, ne, sw, se } = self[quadrant].quad();
                [(nw, 0, 0), (ne, 1, 0), (sw, 0, 1), (se, 1, 1)]
                    .iter()
                    .filter(|&&(leaf, _, _)| leaf == ALIVE)
                    .fold(mask, |mask, &(_, dx, dy)| mask | block_bit(x + dx, y + dy))
            })
    }

    /// The level 1 node of the four centre cells of a 4x4 block, one generation later.
    fn step_block(&mut self, mask: u16) -> NodeId {
        if let Some(node) = self.block_results[mask as usize] {
            return node;
        }
        let result = self.rule.step_block(mask);
        let leaf = |bit: u8| if result & bit != 0 { ALIVE } else { DEAD };
        let node = self.find_node(leaf(1), leaf(2), leaf(4), leaf(8));
        self.block_results[mask as usize] = Some(node);
        node
    }
}
