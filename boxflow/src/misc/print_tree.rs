//! Indented tree dumps for debugging and test expectations.

use std::io::Write;

pub struct PrintTree<'a> {
    level: usize,
    dest: &'a mut dyn Write,
}

impl<'a> PrintTree<'a> {
    pub fn new(title: &str, dest: &'a mut dyn Write) -> Self {
        writeln!(dest, "{}", title).unwrap();
        Self { level: 0, dest }
    }

    pub fn new_level(&mut self, description: String) {
        let indent = "  ".repeat(self.level + 1);
        writeln!(self.dest, "{}{}", indent, description).unwrap();
        self.level += 1;
    }

    pub fn end_level(&mut self) {
        assert!(self.level > 0);
        self.level -= 1;
    }
}
