/// Position in the requested page range.
///
/// `current` runs from `start` up to `end`; once it passes `end` the cursor
/// is finished. An open `end` keeps going until the run stops it or the page
/// numbers run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    current: u32,
    start: u32,
    end: Option<u32>,
    exhausted: bool,
}

impl PageCursor {
    /// Returns `None` for page 0 or an end before the start.
    pub fn new(start: u32, end: Option<u32>) -> Option<Self> {
        if start == 0 || end.is_some_and(|end| end < start) {
            return None;
        }
        Some(Self {
            current: start,
            start,
            end,
            exhausted: false,
        })
    }

    /// Page to process next, or `None` once the range is exhausted.
    pub fn current(&self) -> Option<u32> {
        if self.is_finished() {
            None
        } else {
            Some(self.current)
        }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> Option<u32> {
        self.end
    }

    pub fn is_finished(&self) -> bool {
        self.exhausted || self.end.is_some_and(|end| self.current > end)
    }

    /// Moves to the next page; a finished cursor stays put.
    pub fn advance(&mut self) {
        if self.is_finished() {
            return;
        }
        match self.current.checked_add(1) {
            Some(next) => self.current = next,
            None => self.exhausted = true,
        }
    }
}
