use smallvec::SmallVec;

/// Open tag names for one write target, innermost last.
#[derive(Debug, Default)]
pub struct TagStack {
    open: SmallVec<[String; 8]>,
}

impl TagStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str) {
        self.open.push(name.to_string());
    }

    /// Panics when `name` is not the innermost open tag.
    pub fn pop(&mut self, name: &str) {
        match self.open.pop() {
            Some(open) => assert_eq!(
                open, name,
                "closing tag </{name}> does not match innermost open tag <{open}>"
            ),
            None => panic!("closing tag </{name}> with no open tag"),
        }
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn innermost(&self) -> Option<&str> {
        self.open.last().map(String::as_str)
    }
}
