use crate::world::{NodeId, QuadChildren, World};

/// An inclusive bounding box of cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bounds {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl Bounds {
    pub fn point(x: i64, y: i64) -> Self {
        Bounds {
            left: x,
            top: y,
            right: x,
            bottom: y,
        }
    }

    pub fn width(&self) -> u64 {
        self.right.abs_diff(self.left) + 1
    }

    pub fn height(&self) -> u64 {
        self.bottom.abs_diff(self.top) + 1
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        (self.left..=self.right).contains(&x) && (self.top..=self.bottom).contains(&y)
    }
}

/// Which edges of the bounding box a subtree may still extend.
const FIND_LEFT: u8 = 1;
const FIND_TOP: u8 = 2;
const FIND_RIGHT: u8 = 4;
const FIND_BOTTOM: u8 = 8;

impl World {
    /// The smallest box containing every living cell.
    ///
    /// An empty world gives a box with all four coordinates zero.
    pub fn get_root_bounds(&self) -> Bounds {
        if self.population() == 0 {
            return Bounds::default();
        }
        let mut bounds = Bounds {
            left: i64::MAX,
            top: i64::MAX,
            right: i64::MIN,
            bottom: i64::MIN,
        };
        let offset = 1 << (self[self.root].level - 1);
        self.node_bounds(
            self.root,
            -offset,
            -offset,
            FIND_LEFT | FIND_TOP | FIND_RIGHT | FIND_BOTTOM,
            &mut bounds,
        );
        bounds
    }

    /// Extends `bounds` by the living cells of a node whose top-left corner is
    /// `(left, top)`. Only the edges in `find` can still be pushed by this node.
    fn node_bounds(&self, node: NodeId, left: i64, top: i64, find: u8, bounds: &mut Bounds) {
        let data = &self[node];
        if data.population == 0 || find == 0 {
            return;
        }
        if data.level == 0 {
            bounds.left = bounds.left.min(left);
            bounds.right = bounds.right.max(left);
            bounds.top = bounds.top.min(top);
            bounds.bottom = bounds.bottom.max(top);
            return;
        }
        let offset = 1 << (data.level - 1);
        if left >= bounds.left
            && left + 2 * offset <= bounds.right
            && top >= bounds.top
            && top + 2 * offset <= bounds.bottom
        {
            return;
        }
        let QuadChildren { nw, ne, sw, se } = data.quad();
        let (mut find_nw, mut find_ne, mut find_sw, mut find_se) = (find, find, find, find);
        if self[nw].population != 0 {
            find_sw &= !FIND_TOP;
            find_ne &= !FIND_LEFT;
            find_se &= !(FIND_TOP | FIND_LEFT);
        }
        if self[sw].population != 0 {
            find_se &= !FIND_LEFT;
            find_nw &= !FIND_BOTTOM;
            find_ne &= !(FIND_BOTTOM | FIND_LEFT);
        }
        if self[ne].population != 0 {
            find_nw &= !FIND_RIGHT;
            find_se &= !FIND_TOP;
            find_sw &= !(FIND_TOP | FIND_RIGHT);
        }
        if self[se].population != 0 {
            find_sw &= !FIND_RIGHT;
            find_ne &= !FIND_BOTTOM;
            find_nw &= !(FIND_BOTTOM | FIND_RIGHT);
        }
        self.node_bounds(nw, left, top, find_nw, bounds);
        self.node_bounds(sw, left, top + offset, find_sw, bounds);
        self.node_bounds(ne, left + offset, top, find_ne, bounds);
        self.node_bounds(se, left + offset, top + offset, find_se, bounds);
    }
}
