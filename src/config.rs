/// Sizing of the canonical node table.
///
/// The table starts with `2.pow(initial_capacity_log2)` slots and doubles on every
/// garbage collection until it reaches `2.pow(max_capacity_log2)` slots. A
/// collection is due once the number of nodes exceeds `load_factor` times the
/// capacity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    pub initial_capacity_log2: u8,
    pub max_capacity_log2: u8,
    pub load_factor: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            initial_capacity_log2: 16,
            max_capacity_log2: 24,
            load_factor: 0.9,
        }
    }
}

impl Config {
    pub fn initial_capacity_log2(mut self, log2: u8) -> Self {
        self.initial_capacity_log2 = log2;
        self
    }

    pub fn max_capacity_log2(mut self, log2: u8) -> Self {
        self.max_capacity_log2 = log2;
        self
    }

    pub fn load_factor(mut self, load_factor: f64) -> Self {
        self.load_factor = load_factor;
        self
    }

    pub(crate) fn initial_capacity(&self) -> usize {
        1 << self.initial_capacity_log2.min(self.max_capacity_log2)
    }

    pub(crate) fn max_capacity(&self) -> usize {
        1 << self.max_capacity_log2
    }

    /// The number of nodes that triggers a collection for a table of the given capacity.
    pub(crate) fn max_load(&self, capacity: usize) -> usize {
        // Float to integer casts saturate, so a huge load factor disables collection.
        (capacity as f64 * self.load_factor) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_load() {
        let config = Config::default();
        assert_eq!(config.initial_capacity(), 1 << 16);
        assert_eq!(config.max_load(1 << 16), 58982);
        let config = config.initial_capacity_log2(30).max_capacity_log2(8);
        assert_eq!(config.initial_capacity(), 1 << 8);
        assert_eq!(config.load_factor(f64::INFINITY).max_load(16), usize::MAX);
    }
}
