use image::GrayImage;

use crate::traits::DiagnosticsSink;

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiagnostics;

impl DiagnosticsSink for NoDiagnostics {
    fn wants_masks(&self) -> bool {
        false
    }

    fn record_mask(&mut self, _name: &str, _mask: &GrayImage) {}
}

/// Keeps every recorded mask in insertion order
#[derive(Debug, Clone, Default)]
pub struct MaskCollector {
    entries: Vec<(String, GrayImage)>,
}

impl MaskCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&GrayImage> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, mask)| mask)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GrayImage)> {
        self.entries.iter().map(|(name, mask)| (name.as_str(), mask))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DiagnosticsSink for MaskCollector {
    fn wants_masks(&self) -> bool {
        true
    }

    /// Re-recording a name replaces the earlier mask but keeps its position
    fn record_mask(&mut self, name: &str, mask: &GrayImage) {
        match self.entries.iter_mut().find(|(entry, _)| entry == name) {
            Some((_, existing)) => *existing = mask.clone(),
            None => self.entries.push((name.to_string(), mask.clone())),
        }
    }
}
