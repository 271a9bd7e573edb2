/// Half-open byte range `[start, end)` into a source text.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "inverted span {start}..{end}");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The text covered by the span, delimiters included.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    /// The text strictly inside the span, dropping one byte at each end.
    pub fn inner<'a>(&self, text: &'a str) -> &'a str {
        if self.len() < 2 {
            return "";
        }
        &text[self.start + 1..self.end - 1]
    }
}
