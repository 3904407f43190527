//! Bounded, de-duplicated tag lists.
//!
//! Keywords, locations, and queries are entered as tag lists with per-form
//! capacity limits (keywords 20, update locations 10, update queries 15).

/// An ordered tag list with a capacity cap.
#[derive(Debug, Clone)]
pub struct TagList {
    tags: Vec<String>,
    max_tags: usize,
}

/// Why a tag was not added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagRejection {
    Empty,
    Duplicate,
    /// The list already holds `max_tags` entries.
    Full,
}

impl TagList {
    /// Create an empty list holding at most `max_tags` entries.
    pub fn new(max_tags: usize) -> Self {
        Self {
            tags: Vec::new(),
            max_tags,
        }
    }

    /// Trim and add a tag, preserving insertion order.
    pub fn add(&mut self, tag: &str) -> Result<(), TagRejection> {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return Err(TagRejection::Empty);
        }
        if self
            .tags
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(trimmed))
        {
            return Err(TagRejection::Duplicate);
        }
        if self.tags.len() >= self.max_tags {
            return Err(TagRejection::Full);
        }
        self.tags.push(trimmed.to_string());
        Ok(())
    }

    /// Remove a tag by exact value.
    pub fn remove(&mut self, tag: &str) {
        self.tags.retain(|existing| existing != tag);
    }

    /// The tags in insertion order.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Whether the list is at capacity.
    pub fn is_full(&self) -> bool {
        self.tags.len() >= self.max_tags
    }

    /// Consume into the underlying vector.
    pub fn into_vec(self) -> Vec<String> {
        self.tags
    }
}

/// Collect raw inputs into a tag list, silently dropping rejects.
pub fn collect_tags(inputs: &[String], max_tags: usize) -> TagList {
    let mut list = TagList::new(max_tags);
    for input in inputs {
        let _ = list.add(input);
    }
    list
}
