use crate::error::RenderError;

use super::tag_stack::TagStack;
use super::types::{BufferedWrite, RegionId, RegionState};

#[derive(Debug)]
pub struct Region {
    pub id: RegionId,
    pub state: RegionState,
    pub gated: bool,
    buffer: Vec<BufferedWrite>,
    tags: TagStack,
}

impl Region {
    fn new(id: RegionId) -> Self {
        Self {
            id,
            state: RegionState::Pending,
            gated: false,
            buffer: Vec::new(),
            tags: TagStack::new(),
        }
    }

    pub fn open_tag(&mut self, name: &str, markup: String) {
        self.tags.push(name);
        self.buffer.push(BufferedWrite::Open(markup));
    }

    pub fn write(&mut self, text: &str) {
        self.buffer.push(BufferedWrite::Text(text.to_string()));
    }

    pub fn close_tag(&mut self, name: &str) {
        self.tags.pop(name);
        self.buffer.push(BufferedWrite::Close { name: name.to_string() });
    }

    pub fn buffered_writes(&self) -> &[BufferedWrite] {
        &self.buffer
    }

    /// Drains the buffer into one fragment and marks the region flushed.
    pub fn take_content(&mut self) -> String {
        assert!(
            self.tags.is_empty(),
            "suspense region {} flushed with {} unclosed tags (innermost <{}>)",
            self.id,
            self.tags.depth(),
            self.tags.innermost().unwrap_or_default()
        );

        let content = self.buffer.drain(..).map(BufferedWrite::into_markup).collect::<String>();
        self.state = RegionState::Flushed;
        content
    }
}

/// Arena of regions; a region's index is its id minus one.
#[derive(Debug, Default)]
pub struct RegionTable {
    regions: Vec<Region>,
}

impl RegionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> RegionId {
        let id = RegionId::new(self.regions.len() as u32 + 1);
        self.regions.push(Region::new(id));
        id
    }

    pub fn get(&self, id: RegionId) -> Result<&Region, RenderError> {
        (id.get() as usize)
            .checked_sub(1)
            .and_then(|index| self.regions.get(index))
            .ok_or(RenderError::UnknownRegion(id))
    }

    pub fn get_mut(&mut self, id: RegionId) -> Result<&mut Region, RenderError> {
        (id.get() as usize)
            .checked_sub(1)
            .and_then(|index| self.regions.get_mut(index))
            .ok_or(RenderError::UnknownRegion(id))
    }

    /// A region that still accepts writes.
    pub fn pending_mut(&mut self, id: RegionId) -> Result<&mut Region, RenderError> {
        let region = self.get_mut(id)?;
        match region.state {
            RegionState::Pending => Ok(region),
            RegionState::Flushed | RegionState::Failed => Err(RenderError::RegionFlushed(id)),
        }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.regions.iter().filter(|r| r.state == RegionState::Pending).count()
    }
}
