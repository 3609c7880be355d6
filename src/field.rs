use crate::{
    bound::Bounds,
    error::Error,
    rule::block_bit,
    world::{NodeId, World, ALIVE, DEAD, MAX_LEVEL},
};
use tracing::debug;

/// The level of the smallest root centred at the origin that contains the bounds.
///
/// Never less than 3.
pub(crate) fn level_for_bounds(bounds: &Bounds) -> u32 {
    let mut max: i128 = 4;
    for &c in [bounds.left, bounds.top, bounds.right, bounds.bottom].iter() {
        let c = c as i128;
        if c + 1 > max {
            max = c + 1;
        } else if -c > max {
            max = -c;
        }
    }
    // ceil(log2(max)) + 1
    128 - (max - 1).leading_zeros() + 1
}

/// The smallest box containing all the cells, or all zeros if there are none.
pub fn field_bounds(cells: &[(i64, i64)]) -> Bounds {
    let mut iter = cells.iter();
    let bounds = match iter.next() {
        Some(&(x, y)) => Bounds::point(x, y),
        None => return Bounds::default(),
    };
    iter.fold(bounds, |bounds, &(x, y)| Bounds {
        left: bounds.left.min(x),
        top: bounds.top.min(y),
        right: bounds.right.max(x),
        bottom: bounds.bottom.max(y),
    })
}

/// Moves the cells so that their bounding box is centred at the origin,
/// and returns the moved box.
///
/// Halves are rounded towards positive infinity.
pub fn make_center(cells: &mut [(i64, i64)], bounds: Bounds) -> Bounds {
    let dx = (bounds.left - bounds.right + 1).div_euclid(2) - bounds.left;
    let dy = (bounds.top - bounds.bottom + 1).div_euclid(2) - bounds.top;
    for cell in cells.iter_mut() {
        cell.0 += dx;
        cell.1 += dy;
    }
    Bounds {
        left: bounds.left + dx,
        top: bounds.top + dy,
        right: bounds.right + dx,
        bottom: bounds.bottom + dy,
    }
}

/// Moves the elements satisfying `pred` to the front, and returns their number.
fn partition<T>(slice: &mut [T], pred: impl Fn(&T) -> bool) -> usize {
    let mut i = 0;
    let mut j = slice.len();
    loop {
        while i < j && pred(&slice[i]) {
            i += 1;
        }
        while i < j && !pred(&slice[j - 1]) {
            j -= 1;
        }
        if i + 1 >= j {
            return i;
        }
        slice.swap(i, j - 1);
        i += 1;
        j -= 1;
    }
}

impl World {
    /// Replaces the whole world with the given living cells.
    ///
    /// Every stored node and cached result is dropped, the rule and the step
    /// are kept. If `bounds` is `None`, it is computed from the cells.
    /// Duplicated cells are allowed.
    pub fn load(&mut self, cells: &[(i64, i64)], bounds: Option<Bounds>) -> Result<&mut Self, Error> {
        let bounds = match bounds {
            Some(bounds) => {
                if let Some(&(x, y)) = cells.iter().find(|&&(x, y)| !bounds.contains(x, y)) {
                    return Err(Error::InvalidConfiguration(format!(
                        "Cell ({}, {}) lies outside of the given bounds {:?}",
                        x, y, bounds
                    )));
                }
                bounds
            }
            None => field_bounds(cells),
        };
        let level = level_for_bounds(&bounds);
        if level > MAX_LEVEL as u32 {
            return Err(Error::PrecisionBoundaryExceeded(format!(
                "Bounds {:?} do not fit in a universe of level {}",
                bounds, MAX_LEVEL
            )));
        }
        let level = level as u8;
        let offset = 1 << (level - 1);
        let mut field: Vec<(u64, u64)> = cells
            .iter()
            .map(|&(x, y)| ((x + offset) as u64, (y + offset) as u64))
            .collect();
        self.clear();
        self.root = self.build_field(&mut field, level);
        debug!(cells = cells.len(), level, "loaded cells");
        self.check_gc();
        Ok(self)
    }

    /// Builds a node from cells whose coordinates are relative to its top-left corner.
    fn build_field(&mut self, field: &mut [(u64, u64)], level: u8) -> NodeId {
        if field.is_empty() {
            return self.empty_node(level);
        }
        if level == 2 {
            let mask = field
                .iter()
                .fold(0, |mask, &(x, y)| mask | block_bit((x & 3) as u8, (y & 3) as u8));
            return self.block_node(mask);
        }
        let bit = 1 << (level - 1);
        let bottom = partition(field, |&(_, y)| y & bit == 0);
        let (north, south) = field.split_at_mut(bottom);
        let east = partition(north, |&(x, _)| x & bit == 0);
        let (nw, ne) = north.split_at_mut(east);
        let east = partition(south, |&(x, _)| x & bit == 0);
        let (sw, se) = south.split_at_mut(east);
        let nw = self.build_field(nw, level - 1);
        let ne = self.build_field(ne, level - 1);
        let sw = self.build_field(sw, level - 1);
        let se = self.build_field(se, level - 1);
        self.find_node(nw, ne, sw, se)
    }

    /// The level 2 node with the given occupancy mask.
    pub(crate) fn block_node(&mut self, mask: u16) -> NodeId {
        if let Some(node) = self.leaf_blocks[mask as usize] {
            return node;
        }
        let leaf = |x, y| {
            if mask & block_bit(x, y) != 0 {
                ALIVE
            } else {
                DEAD
            }
        };
        let nw = self.find_node(leaf(0, 0), leaf(1, 0), leaf(0, 1), leaf(1, 1));
        let ne = self.find_node(leaf(2, 0), leaf(3, 0), leaf(2, 1), leaf(3, 1));
        let sw = self.find_node(leaf(0, 2), leaf(1, 2), leaf(0, 3), leaf(1, 3));
        let se = self.find_node(leaf(2, 2), leaf(3, 2), leaf(2, 3), leaf(3, 3));
        let node = self.find_node(nw, ne, sw, se);
        self.leaf_blocks[mask as usize] = Some(node);
        node
    }
}
