use crate::error::Error;
use ca_rules::ParseLife;
use std::{
    fmt::{self, Debug, Display, Formatter},
    str::FromStr,
};

/// Birth and survival conditions as bit-sets; bit `k` means "`k` live neighbours".
struct RuleMasks {
    birth: u16,
    survival: u16,
}

impl ParseLife for RuleMasks {
    fn from_bs(b: Vec<u8>, s: Vec<u8>) -> Self {
        RuleMasks {
            birth: b.into_iter().fold(0, |mask, n| mask | 1 << n),
            survival: s.into_iter().fold(0, |mask, n| mask | 1 << n),
        }
    }
}

/// Index of the cell `(x, y)` in the occupancy mask of a 4x4 block.
///
/// The top-left cell is the highest bit, rows are stored top to bottom.
pub(crate) const fn block_bit(x: u8, y: u8) -> u16 {
    1 << (15 - (4 * y + x))
}

/// A totalistic two-state rule on the Moore neighbourhood.
#[derive(Clone)]
pub struct Rule {
    birth: u16,
    survival: u16,
    /// For every 4x4 occupancy mask, the next state of its four centre cells:
    /// bit 0 is the north-west one, then north-east, south-west and south-east.
    block_table: Box<[u8]>,
}

impl Rule {
    /// Creates a rule from the birth and survival bit-sets.
    ///
    /// Only bits `0..=8` may be set, and `B0` rules are rejected: they would
    /// turn the empty universe into a non-empty one.
    pub fn new(birth: u16, survival: u16) -> Result<Self, Error> {
        if birth > 0x1ff || survival > 0x1ff {
            return Err(Error::InvalidConfiguration(format!(
                "Neighbour counts must be at most 8, got birth mask {:#x} and survival mask {:#x}",
                birth, survival
            )));
        }
        if birth & 1 != 0 {
            return Err(Error::InvalidConfiguration(
                "B0 rules are not supported".to_string(),
            ));
        }
        let mut rule = Rule {
            birth,
            survival,
            block_table: vec![0; 1 << 16].into_boxed_slice(),
        };
        for mask in 0..=u16::MAX {
            rule.block_table[mask as usize] = rule.eval_block(mask);
        }
        Ok(rule)
    }

    /// Conway's Game of Life, `B3/S23`.
    pub fn life() -> Self {
        match Rule::new(1 << 3, 1 << 2 | 1 << 3) {
            Ok(rule) => rule,
            Err(_) => unreachable!("B3/S23 is a valid rule"),
        }
    }

    pub fn birth(&self) -> u16 {
        self.birth
    }

    pub fn survival(&self) -> u16 {
        self.survival
    }

    /// The next state of the four centre cells of a 4x4 block.
    pub(crate) fn step_block(&self, mask: u16) -> u8 {
        self.block_table[mask as usize]
    }

    fn eval_block(&self, mask: u16) -> u8 {
        let mut result = 0;
        for (i, &(x, y)) in [(1, 1), (2, 1), (1, 2), (2, 2)].iter().enumerate() {
            let mut count = 0;
            for ny in y - 1..=y + 1 {
                for nx in x - 1..=x + 1 {
                    if (nx, ny) != (x, y) && mask & block_bit(nx, ny) != 0 {
                        count += 1;
                    }
                }
            }
            let conditions = if mask & block_bit(x, y) != 0 {
                self.survival
            } else {
                self.birth
            };
            if conditions >> count & 1 != 0 {
                result |= 1 << i;
            }
        }
        result
    }
}

impl Default for Rule {
    fn default() -> Self {
        Rule::life()
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.birth == other.birth && self.survival == other.survival
    }
}

impl Eq for Rule {}

impl Debug for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("rulestring", &self.to_string())
            .finish()
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("B")?;
        for n in (0..=8).filter(|n| self.birth >> n & 1 != 0) {
            write!(f, "{}", n)?;
        }
        f.write_str("/S")?;
        for n in (0..=8).filter(|n| self.survival >> n & 1 != 0) {
            write!(f, "{}", n)?;
        }
        Ok(())
    }
}

impl FromStr for Rule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let masks = RuleMasks::parse_rule(s)
            .map_err(|e| Error::InvalidConfiguration(format!("Rule {:?}: {}", s, e)))?;
        Rule::new(masks.birth, masks.survival)
    }
}
