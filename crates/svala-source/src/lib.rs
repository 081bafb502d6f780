use std::cmp::Ordering;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

pub use text_size::{TextRange, TextSize};

/// Opaque handle to a source buffer registered with a [`SourceManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// A span within a single buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub file: FileId,
    pub range: TextRange,
}

impl Span {
    pub fn new(file: FileId, range: TextRange) -> Self {
        Self { file, range }
    }

    /// A span covering `len` bytes starting at `start` in `file`.
    pub fn at(file: FileId, start: u32, len: u32) -> Self {
        let start = TextSize::new(start);
        Self {
            file,
            range: TextRange::at(start, TextSize::new(len)),
        }
    }
}

/// An in-memory buffer handed back by [`SourceManager::assign_text`].
#[derive(Debug, Clone)]
pub struct SourceBuffer {
    pub file: FileId,
    pub text: Arc<str>,
}

/// Registry of in-memory source buffers.
///
/// Identity is handle identity: two [`SourceManagerHandle`]s refer to the
/// same manager iff they were cloned from the same `Arc`. Buffer ids are
/// assigned in registration order, which also defines the location order
/// used for diagnostic sorting.
#[derive(Debug)]
pub struct SourceManager {
    buffers: Mutex<Vec<Arc<str>>>,
    id: u32,
}

/// Shared handle to a [`SourceManager`].
pub type SourceManagerHandle = Arc<SourceManager>;

static NEXT_MANAGER_ID: AtomicU32 = AtomicU32::new(0);

impl SourceManager {
    pub fn new() -> SourceManagerHandle {
        Arc::new(Self {
            buffers: Mutex::new(Vec::new()),
            id: NEXT_MANAGER_ID.fetch_add(1, AtomicOrdering::Relaxed),
        })
    }

    /// Register `text` as a new buffer and return it with its id.
    pub fn assign_text(&self, text: &str) -> SourceBuffer {
        let mut buffers = self.buffers.lock().expect("source manager poisoned");
        let file = FileId(buffers.len() as u32);
        let text: Arc<str> = Arc::from(text);
        buffers.push(text.clone());
        SourceBuffer { file, text }
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.lock().expect("source manager poisoned").len()
    }

    /// Whether two handles name the same manager.
    pub fn same(a: &SourceManagerHandle, b: &SourceManagerHandle) -> bool {
        Arc::ptr_eq(a, b) || a.id == b.id
    }

    /// Total order on locations: buffer registration order, then offset.
    pub fn cmp_loc(&self, a: Span, b: Span) -> Ordering {
        (a.file, a.range.start(), a.range.end()).cmp(&(b.file, b.range.start(), b.range.end()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_text_hands_out_sequential_ids() {
        let sm = SourceManager::new();
        let a = sm.assign_text("module a; endmodule");
        let b = sm.assign_text("module b; endmodule");
        assert_eq!(a.file, FileId(0));
        assert_eq!(b.file, FileId(1));
        assert_eq!(&*a.text, "module a; endmodule");
    }

    #[test]
    fn handle_identity() {
        let sm1 = SourceManager::new();
        let sm2 = SourceManager::new();
        let sm1_clone = sm1.clone();
        assert!(SourceManager::same(&sm1, &sm1_clone));
        assert!(!SourceManager::same(&sm1, &sm2));
    }

    #[test]
    fn location_order_is_file_then_offset() {
        let sm = SourceManager::new();
        let early = Span::at(FileId(0), 4, 2);
        let late = Span::at(FileId(0), 9, 2);
        let other_file = Span::at(FileId(1), 0, 1);
        assert_eq!(sm.cmp_loc(early, late), Ordering::Less);
        assert_eq!(sm.cmp_loc(late, other_file), Ordering::Less);
        assert_eq!(sm.cmp_loc(early, early), Ordering::Equal);
    }
}
