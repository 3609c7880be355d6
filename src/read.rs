use crate::{
    error::Error,
    field::{field_bounds, make_center},
    rule::{block_bit, Rule},
    world::{NodeId, World, MAX_LEVEL},
};
use ca_formats::{
    macrocell::{Macrocell, NodeData},
    rle::Rle,
};
use std::str::FromStr;
use tracing::{debug, warn};

/// The text formats a pattern can be read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    /// `.` and `O` cells, `!` comment lines.
    Plaintext,
    /// Run length encoded, with an `x = .., y = ..` header.
    Rle,
    /// A `#Life 1.06` header followed by one coordinate pair per line.
    Life106,
    /// Golly's `[M2]` macrocell format, a serialized quadtree.
    Macrocell,
}

impl Format {
    /// Guesses the format of a pattern from its first lines.
    pub fn detect(text: &str) -> Result<Self, Error> {
        if text.starts_with("[M2]") {
            Ok(Format::Macrocell)
        } else if text.starts_with("#Life 1.06") {
            Ok(Format::Life106)
        } else if text.starts_with(&['!', '.', 'O'][..]) {
            Ok(Format::Plaintext)
        } else if has_rle_header(text) {
            Ok(Format::Rle)
        } else {
            Err(Error::MalformedPattern(
                "Format detection failed".to_string(),
            ))
        }
    }
}

/// Whether the first line after the comments is an RLE header.
fn has_rle_header(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map_or(false, |line| {
            let key_end = line
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(line.len());
            let key = line[..key_end].to_ascii_lowercase();
            ["x", "y", "rule", "color", "alpha"].contains(&key.as_str())
                && line[key_end..].trim_start().starts_with('=')
        })
}

/// Information about a pattern that does not affect its cells.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub comments: Vec<String>,
    pub urls: Vec<String>,
}

impl Metadata {
    /// Reads a `#N`, `#O`, `#C` or `#D` line. Returns the rulestring of a `#R` line.
    fn read_comment(&mut self, line: &str) -> Option<String> {
        let mut chars = line.chars();
        let kind = chars.next();
        let content = chars.as_str().trim();
        match kind {
            Some('N') => replace(&mut self.title, content, "title"),
            Some('O') => replace(&mut self.author, content, "author"),
            Some('R') => return Some(content.to_string()),
            Some('C') | Some('c') | Some('D') => {
                if is_url(content) {
                    if content.starts_with("http") {
                        self.urls.push(content.to_string());
                    } else {
                        self.urls.push(format!("http://{}", content));
                    }
                } else {
                    self.comments.push(content.to_string());
                }
            }
            _ => (),
        }
        None
    }
}

fn replace(field: &mut Option<String>, content: &str, name: &str) {
    if let Some(old) = field.replace(content.to_string()) {
        warn!(old = %old, new = %content, "duplicate pattern {}", name);
    }
}

fn is_url(comment: &str) -> bool {
    let lower = comment.to_ascii_lowercase();
    ["http://", "https://", "www."]
        .iter()
        .filter_map(|prefix| lower.strip_prefix(prefix))
        .any(|rest| rest.starts_with(|c: char| c.is_ascii_alphanumeric()))
}

/// One line of a macrocell file, with child references checked.
#[derive(Clone, Debug, PartialEq, Eq)]
enum TreeNode {
    /// An 8x8 block, row by row, the top-left cell being the highest bit.
    Block(u64),
    /// Children are 1-based indices of earlier nodes, 0 being an empty node.
    Node { level: u8, children: [usize; 4] },
}

impl TreeNode {
    fn level(&self) -> u8 {
        match *self {
            TreeNode::Block(_) => 3,
            TreeNode::Node { level, .. } => level,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum PatternData {
    Cells(Vec<(i64, i64)>),
    Tree(Vec<TreeNode>),
}

/// A parsed pattern, ready to be loaded into a [`World`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    format: Format,
    rule: Option<Rule>,
    metadata: Metadata,
    data: PatternData,
}

impl Pattern {
    /// Detects the format and parses the whole text.
    ///
    /// Nothing is returned unless the whole text is valid.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let text = text.replace('\r', "");
        match Format::detect(&text)? {
            Format::Plaintext => parse_plaintext(&text),
            Format::Rle => parse_rle(&text),
            Format::Life106 => parse_life106(&text),
            Format::Macrocell => parse_macrocell(&text),
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// The rule given in the pattern, if any.
    pub fn rule(&self) -> Option<&Rule> {
        self.rule.as_ref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The living cells, unless the pattern is a macrocell tree.
    pub fn cells(&self) -> Option<&[(i64, i64)]> {
        match &self.data {
            PatternData::Cells(cells) => Some(cells),
            PatternData::Tree(_) => None,
        }
    }
}

impl FromStr for Pattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::parse(s)
    }
}

fn parse_rule(rulestring: Option<String>) -> Result<Option<Rule>, Error> {
    rulestring.map(|rulestring| rulestring.parse()).transpose()
}

fn parse_plaintext(text: &str) -> Result<Pattern, Error> {
    let mut metadata = Metadata::default();
    let mut cells = Vec::new();
    let mut y = 0;
    for line in text.lines() {
        if let Some(comment) = line.strip_prefix('!') {
            let comment = comment.trim();
            match comment.strip_prefix("Name:") {
                Some(title) => replace(&mut metadata.title, title.trim(), "title"),
                None if comment.is_empty() => (),
                None => metadata.comments.push(comment.to_string()),
            }
            continue;
        }
        let mut x = 0;
        for c in line.chars() {
            match c {
                '.' => x += 1,
                'O' => {
                    cells.push((x, y));
                    x += 1;
                }
                ' ' => (),
                c => {
                    return Err(Error::MalformedPattern(format!(
                        "Plaintext: unexpected character {:?} in row {}",
                        c, y
                    )))
                }
            }
        }
        y += 1;
    }
    Ok(Pattern {
        format: Format::Plaintext,
        rule: None,
        metadata,
        data: PatternData::Cells(cells),
    })
}

fn parse_rle(text: &str) -> Result<Pattern, Error> {
    let mut metadata = Metadata::default();
    let mut comment_rule = None;
    for line in text.lines().take_while(|line| line.starts_with('#')) {
        if let Some(rule) = metadata.read_comment(&line[1..]) {
            comment_rule = Some(rule);
        }
    }
    let normalized = normalize_tags(text);
    let rle = Rle::new(normalized.as_str())?;
    let header_rule = rle
        .header_data()
        .and_then(|header| header.rule.as_deref())
        .map(str::to_string);
    let rule = parse_rule(header_rule.or(comment_rule))?;
    let mut cells = Vec::new();
    for cell in rle {
        cells.push(cell?.position);
    }
    Ok(Pattern {
        format: Format::Rle,
        rule,
        metadata,
        data: PatternData::Cells(cells),
    })
}

/// Rewrites every letter of the RLE body other than `b` as `o`,
/// since any such tag stands for living cells.
fn normalize_tags(text: &str) -> String {
    let mut in_body = false;
    let mut normalized = String::with_capacity(text.len());
    for line in text.lines() {
        if in_body {
            normalized.extend(line.chars().map(|c| match c {
                'b' => 'b',
                c if c.is_ascii_alphabetic() => 'o',
                c => c,
            }));
        } else {
            let trimmed = line.trim();
            in_body = !trimmed.is_empty() && !trimmed.starts_with('#');
            normalized.push_str(line);
        }
        normalized.push('\n');
    }
    normalized
}

fn parse_life106(text: &str) -> Result<Pattern, Error> {
    let mut metadata = Metadata::default();
    let mut cells = Vec::new();
    for (i, line) in text.lines().enumerate().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix('#') {
            metadata.read_comment(comment);
            continue;
        }
        let mut numbers = line.split_whitespace().map(str::parse::<i64>);
        match (numbers.next(), numbers.next(), numbers.next()) {
            (Some(Ok(x)), Some(Ok(y)), None) => cells.push((x, y)),
            _ => {
                return Err(Error::MalformedPattern(format!(
                    "Life 1.06: expected two integers on line {}, got {:?}",
                    i + 1,
                    line
                )))
            }
        }
    }
    Ok(Pattern {
        format: Format::Life106,
        rule: None,
        metadata,
        data: PatternData::Cells(cells),
    })
}

fn parse_macrocell(text: &str) -> Result<Pattern, Error> {
    let mut metadata = Metadata::default();
    for line in text
        .lines()
        .skip(1)
        .take_while(|line| line.starts_with('#'))
    {
        // The rule is read by the macrocell parser.
        metadata.read_comment(&line[1..]);
    }
    let macrocell = Macrocell::new(text)?;
    let rule = parse_rule(macrocell.rule().map(|rule| rule.to_string()))?;
    let mut nodes: Vec<TreeNode> = Vec::new();
    for node in macrocell {
        let node = node?;
        if node.id != nodes.len() + 1 {
            return Err(Error::MalformedPattern(format!(
                "Macrocell: node {} is numbered {}",
                nodes.len() + 1,
                node.id
            )));
        }
        let node = match node.data {
            NodeData::Level1 { .. } => {
                return Err(Error::MalformedPattern(
                    "Macrocell: rules with more than 2 states are not supported".to_string(),
                ))
            }
            NodeData::Level3(block) => TreeNode::Block(block),
            NodeData::Node {
                level,
                nw,
                ne,
                sw,
                se,
            } => {
                if level <= 3 || level > MAX_LEVEL {
                    return Err(Error::MalformedPattern(format!(
                        "Macrocell: node {} has invalid level {}",
                        node.id, level
                    )));
                }
                let children = [nw, ne, sw, se];
                for &child in children.iter() {
                    let child_level = match child {
                        0 => level - 1,
                        k => match nodes.get(k - 1) {
                            Some(child) => child.level(),
                            None => {
                                return Err(Error::MalformedPattern(format!(
                                    "Macrocell: node {} refers to undefined node {}",
                                    node.id, k
                                )))
                            }
                        },
                    };
                    if child_level + 1 != level {
                        return Err(Error::MalformedPattern(format!(
                            "Macrocell: node {} of level {} has a child of level {}",
                            node.id, level, child_level
                        )));
                    }
                }
                TreeNode::Node { level, children }
            }
        };
        nodes.push(node);
    }
    if nodes.is_empty() {
        return Err(Error::MalformedPattern(
            "Macrocell: no nodes".to_string(),
        ));
    }
    Ok(Pattern {
        format: Format::Macrocell,
        rule,
        metadata,
        data: PatternData::Tree(nodes),
    })
}

/// The occupancy mask of one 4x4 quadrant of an 8x8 block.
fn block_quadrant(block: u64, qx: u8, qy: u8) -> u16 {
    let mut mask = 0;
    for y in 0..4 {
        for x in 0..4 {
            let bit = 63 - (8 * (4 * qy + y) + 4 * qx + x);
            if block >> bit & 1 != 0 {
                mask |= block_bit(x, y);
            }
        }
    }
    mask
}

impl World {
    /// Replaces the world with a pattern and saves it as the rewind snapshot.
    ///
    /// Cell lists are centred at the origin. The rule of the pattern, or
    /// `B3/S23` if it has none, replaces the current rule.
    pub fn load_pattern(&mut self, pattern: &Pattern) -> Result<&mut Self, Error> {
        match &pattern.data {
            PatternData::Cells(cells) => {
                let mut cells = cells.clone();
                let bounds = field_bounds(&cells);
                let bounds = make_center(&mut cells, bounds);
                self.load(&cells, Some(bounds))?;
            }
            PatternData::Tree(nodes) => {
                self.clear();
                self.root = self.build_tree(nodes);
                self.check_gc();
            }
        }
        self.set_rule(pattern.rule.clone().unwrap_or_default());
        self.save_snapshot();
        debug!(
            format = ?pattern.format,
            population = self.population(),
            "loaded pattern"
        );
        Ok(self)
    }

    /// Builds checked macrocell nodes; the last one is the root.
    fn build_tree(&mut self, nodes: &[TreeNode]) -> NodeId {
        let mut ids: Vec<NodeId> = Vec::with_capacity(nodes.len());
        for node in nodes {
            let id = match *node {
                TreeNode::Block(block) => {
                    let nw = self.block_node(block_quadrant(block, 0, 0));
                    let ne = self.block_node(block_quadrant(block, 1, 0));
                    let sw = self.block_node(block_quadrant(block, 0, 1));
                    let se = self.block_node(block_quadrant(block, 1, 1));
                    self.find_node(nw, ne, sw, se)
                }
                TreeNode::Node { level, children } => {
                    let [nw, ne, sw, se] =
                        children.map(|child| self.tree_child(&ids, child, level - 1));
                    self.find_node(nw, ne, sw, se)
                }
            };
            ids.push(id);
        }
        match ids.last() {
            Some(&root) => root,
            None => self.empty_node(3),
        }
    }

    fn tree_child(&mut self, ids: &[NodeId], child: usize, level: u8) -> NodeId {
        match child {
            0 => self.empty_node(level),
            k => ids[k - 1],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GLIDER_RLE: &str = "#N Glider\n#O Richard K. Guy\n#C The smallest spaceship.\n\
                              #C www.conwaylife.com/wiki/Glider\nx = 3, y = 3, rule = B3/S23\nbo$2bo$3o!\n";

    #[test]
    fn test_detect() {
        assert_eq!(Format::detect("[M2] (golly 2.0)\n").unwrap(), Format::Macrocell);
        assert_eq!(Format::detect("#Life 1.06\n0 0\n").unwrap(), Format::Life106);
        assert_eq!(Format::detect("!Name: Blinker\nOOO\n").unwrap(), Format::Plaintext);
        assert_eq!(Format::detect(".O\nO.\n").unwrap(), Format::Plaintext);
        assert_eq!(Format::detect(GLIDER_RLE).unwrap(), Format::Rle);
        assert_eq!(Format::detect("\n\nx=3,y=1\n3o!").unwrap(), Format::Rle);
        assert!(matches!(
            Format::detect("hello world"),
            Err(Error::MalformedPattern(_))
        ));
        assert!(matches!(Format::detect(""), Err(Error::MalformedPattern(_))));
    }

    #[test]
    fn test_metadata() {
        let pattern = Pattern::parse(GLIDER_RLE).unwrap();
        let metadata = pattern.metadata();
        assert_eq!(metadata.title.as_deref(), Some("Glider"));
        assert_eq!(metadata.author.as_deref(), Some("Richard K. Guy"));
        assert_eq!(metadata.comments, vec!["The smallest spaceship."]);
        assert_eq!(metadata.urls, vec!["http://www.conwaylife.com/wiki/Glider"]);
        assert!(is_url("https://example.org"));
        assert!(!is_url("www."));
        assert!(!is_url("see http://example.org"));
    }

    #[test]
    fn test_parse_rle() {
        let pattern = Pattern::parse(GLIDER_RLE).unwrap();
        assert_eq!(pattern.format(), Format::Rle);
        assert_eq!(pattern.rule(), Some(&Rule::life()));
        assert_eq!(
            pattern.cells(),
            Some(&[(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)][..])
        );
        let highlife = Pattern::parse("#R B36/S23\nx = 3, y = 1\n3o!\n").unwrap();
        assert_eq!(highlife.rule().map(Rule::to_string).as_deref(), Some("B36/S23"));
        assert!(matches!(
            Pattern::parse("x = 3, y = 1, rule = B0/S\n3o!\n"),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_rle_tags() {
        for body in ["3o!", "3x!", "3a!", "3z!", "3A!"].iter() {
            let pattern = Pattern::parse(&format!("x = 3, y = 1, rule = B3/S23\n{}\n", body)).unwrap();
            assert_eq!(pattern.cells(), Some(&[(0, 0), (1, 0), (2, 0)][..]));
        }
        let pattern = Pattern::parse("x = 4, y = 2\nbq$2bk!\n").unwrap();
        assert_eq!(pattern.cells(), Some(&[(1, 0), (2, 1)][..]));
    }

    #[test]
    fn test_parse_plaintext() {
        let pattern = Pattern::parse("!Name: Glider\r\n!\r\n.O.\r\n..O\r\nOOO\r\n").unwrap();
        assert_eq!(pattern.format(), Format::Plaintext);
        assert_eq!(pattern.metadata().title.as_deref(), Some("Glider"));
        assert_eq!(pattern.rule(), None);
        assert_eq!(
            pattern.cells(),
            Some(&[(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)][..])
        );
        assert!(matches!(
            Pattern::parse("!\n.O*\n"),
            Err(Error::MalformedPattern(_))
        ));
    }

    #[test]
    fn test_parse_life106() {
        let pattern = Pattern::parse("#Life 1.06\n0 -1\n1 0\n -1 1 \n0 1\n1 1\n").unwrap();
        assert_eq!(pattern.format(), Format::Life106);
        assert_eq!(
            pattern.cells(),
            Some(&[(0, -1), (1, 0), (-1, 1), (0, 1), (1, 1)][..])
        );
        assert!(matches!(
            Pattern::parse("#Life 1.06\n0 1 2\n"),
            Err(Error::MalformedPattern(_))
        ));
        assert!(matches!(
            Pattern::parse("#Life 1.06\n0 x\n"),
            Err(Error::MalformedPattern(_))
        ));
    }

    #[test]
    fn test_block_quadrant() {
        let block = 0x_8000_0000_0000_0001;
        assert_eq!(block_quadrant(block, 0, 0), block_bit(0, 0));
        assert_eq!(block_quadrant(block, 1, 1), block_bit(3, 3));
        assert_eq!(block_quadrant(block, 1, 0), 0);
        // Second row, fifth column.
        assert_eq!(block_quadrant(0x_0008_0000_0000_0000, 1, 0), block_bit(0, 1));
    }

    #[test]
    fn test_parse_macrocell() {
        let pattern = Pattern::parse("[M2] (golly 2.0)\n#R B3/S23\n.*$..*$***$\n4 1 0 0 0\n").unwrap();
        assert_eq!(pattern.format(), Format::Macrocell);
        assert_eq!(pattern.rule(), Some(&Rule::life()));
        assert_eq!(pattern.cells(), None);
        let mut world = World::default();
        world.load_pattern(&pattern).unwrap();
        assert_eq!(world.population(), 5);
        assert_eq!(world[world.root].level, 4);
        assert_eq!(
            world.cells(),
            vec![(-7, -8), (-6, -7), (-8, -6), (-7, -6), (-6, -6)]
        );
    }

    #[test]
    fn test_bad_macrocell() {
        let undefined = "[M2] (golly 2.0)\n.*$..*$***$\n4 2 0 0 0\n";
        assert!(matches!(
            Pattern::parse(undefined),
            Err(Error::MalformedPattern(_))
        ));
        let wrong_level = "[M2] (golly 2.0)\n.*$..*$***$\n5 1 0 0 0\n";
        assert!(matches!(
            Pattern::parse(wrong_level),
            Err(Error::MalformedPattern(_))
        ));
        let multistate = "[M2] (golly 2.0)\n#R Generations\n1 0 1 2 0\n";
        assert!(Pattern::parse(multistate).is_err());
    }

    #[test]
    fn test_load_pattern() {
        let mut world = World::default();
        world.set_rule("B36/S23".parse().unwrap());
        world.load_pattern(&Pattern::parse(GLIDER_RLE).unwrap()).unwrap();
        assert_eq!(world.rule(), &Rule::life());
        assert_eq!(world.population(), 5);
        assert!(world.has_snapshot());
        assert_eq!(
            world.get_root_bounds(),
            crate::bound::Bounds {
                left: -1,
                top: -1,
                right: 1,
                bottom: 1
            }
        );
        for _ in 0..4 {
            world.advance(true).unwrap();
        }
        assert_eq!(world.cells(), vec![(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)]);
        assert!(world.restore_snapshot());
        assert_eq!(world.cells(), vec![(0, -1), (1, 0), (-1, 1), (0, 1), (1, 1)]);
    }
}
