use std::time::Instant;

/// Text received since the last flush.
///
/// Owned by the trigger engine and mutated only from the ingestion worker.
#[derive(Debug, Default)]
pub struct TranscriptBuffer {
    text: String,
    last_update: Option<Instant>,
    dirty_since: Option<Instant>,
}

impl TranscriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    /// Set when text arrives after the last partial flush; cleared by
    /// [`TranscriptBuffer::mark_clean`].
    pub fn dirty_since(&self) -> Option<Instant> {
        self.dirty_since
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_since.is_some()
    }

    pub fn append(&mut self, segment: &str, now: Instant) {
        let segment = segment.trim();
        if segment.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(segment);
        self.last_update = Some(now);
        self.dirty_since.get_or_insert(now);
    }

    pub fn mark_clean(&mut self) {
        self.dirty_since = None;
    }

    /// Remove everything up to byte offset `end` and return the text before
    /// `start`. The remainder stays buffered.
    pub fn take_through(&mut self, start: usize, end: usize) -> String {
        let preceding = self.text[..start].trim().to_string();
        let rest = self.text[end..].trim().to_string();
        self.text = rest;
        if self.text.is_empty() {
            self.dirty_since = None;
        }
        preceding
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.dirty_since = None;
    }
}
