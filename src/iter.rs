use crate::{
    bound::Bounds,
    world::{NodeId, QuadChildren, World},
};

impl World {
    /// Calls `f` on every living cell inside the window.
    ///
    /// The order of the cells is unspecified.
    pub fn for_living_cells<F>(&self, window: Bounds, f: F)
    where
        F: FnMut(i64, i64),
    {
        let mut f = f;
        let offset = 1 << (self[self.root].level - 1);
        self.for_cells_rec(self.root, -offset, -offset, &window, &mut f)
    }

    /// Calls `f` on every living cell.
    pub fn for_each_cell<F>(&self, f: F)
    where
        F: FnMut(i64, i64),
    {
        self.for_living_cells(self.get_root_bounds(), f)
    }

    /// All living cells, sorted by row and then by column.
    pub fn cells(&self) -> Vec<(i64, i64)> {
        let mut cells = Vec::with_capacity(self.population().min(1 << 20) as usize);
        self.for_each_cell(|x, y| cells.push((x, y)));
        cells.sort_unstable_by_key(|&(x, y)| (y, x));
        cells
    }

    fn for_cells_rec<F>(&self, node: NodeId, left: i64, top: i64, window: &Bounds, f: &mut F)
    where
        F: FnMut(i64, i64),
    {
        let data = &self[node];
        if data.population == 0 {
            return;
        }
        if data.level == 0 {
            if window.contains(left, top) {
                f(left, top);
            }
            return;
        }
        let size = 1 << data.level;
        if left > window.right
            || top > window.bottom
            || left + size <= window.left
            || top + size <= window.top
        {
            return;
        }
        let half = size / 2;
        let QuadChildren { nw, ne, sw, se } = data.quad();
        self.for_cells_rec(nw, left, top, window, f);
        self.for_cells_rec(ne, left + half, top, window, f);
        self.for_cells_rec(sw, left, top + half, window, f);
        self.for_cells_rec(se, left + half, top + half, window, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_living_cells() {
        let mut world = World::default();
        let cells = [(0, -1), (1, -1), (-1, 0), (0, 0), (0, 1)];
        for &(x, y) in cells.iter() {
            world.set_cell(x, y, true).unwrap();
        }
        world.advance(true).unwrap();
        assert_eq!(
            world.cells(),
            vec![(-1, -1), (0, -1), (1, -1), (-1, 0), (-1, 1), (0, 1)]
        );
        let mut window = Vec::new();
        let bounds = Bounds {
            left: -1,
            top: -1,
            right: 0,
            bottom: 0,
        };
        world.for_living_cells(bounds, |x, y| window.push((x, y)));
        window.sort_unstable_by_key(|&(x, y)| (y, x));
        assert_eq!(window, vec![(-1, -1), (0, -1), (-1, 0)]);
    }

    #[test]
    fn test_empty() {
        let world = World::default();
        assert!(world.cells().is_empty());
    }
}
