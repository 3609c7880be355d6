use crate::world::World;

const MAX_LINE_LENGTH: usize = 70;

/// Collects RLE tokens into lines of bounded length.
struct RleLines {
    lines: Vec<String>,
    current: String,
}

impl RleLines {
    fn push(&mut self, token: &str) {
        if self.current.len() + token.len() > MAX_LINE_LENGTH {
            self.lines.push(std::mem::take(&mut self.current));
        }
        self.current.push_str(token);
    }

    fn push_run(&mut self, count: u64, tag: char) {
        match count {
            0 => (),
            1 => self.push(tag.encode_utf8(&mut [0; 4])),
            n => self.push(&format!("{}{}", n, tag)),
        }
    }

    fn finish(mut self) -> String {
        self.lines.push(self.current);
        self.lines.join("\n")
    }
}

impl World {
    /// Writes the living cells as an RLE pattern.
    ///
    /// The top-left corner of the bounding box becomes the origin of the pattern.
    pub fn to_rle(&self, name: &str, comments: &[&str]) -> String {
        let mut lines = Vec::new();
        if !name.is_empty() {
            lines.push(format!("#N {}", name));
        }
        lines.extend(comments.iter().map(|comment| format!("#C {}", comment)));
        let bounds = self.get_root_bounds();
        lines.push(format!(
            "x = {}, y = {}, rule = {}",
            bounds.width(),
            bounds.height(),
            self.rule
        ));
        let mut rle = RleLines {
            lines,
            current: String::new(),
        };
        let mut y = bounds.top;
        // The pending run of living cells.
        let mut start = bounds.left;
        let mut run = 0;
        for (cx, cy) in self.cells() {
            if cy != y {
                rle.push_run(run, 'o');
                rle.push_run(cy.abs_diff(y), '$');
                y = cy;
                start = bounds.left;
                run = 0;
            }
            if cx == start + run as i64 {
                run += 1;
            } else {
                rle.push_run(run, 'o');
                rle.push_run(cx.abs_diff(start + run as i64), 'b');
                start = cx;
                run = 1;
            }
        }
        rle.push_run(run, 'o');
        rle.push("!");
        rle.finish()
    }
}
