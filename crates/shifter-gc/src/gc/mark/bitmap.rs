//! Dense bitmaps used by the mark and sweep phases.
//!
//! The same type backs three maps: the per-byte occupancy map over the arena,
//! the per-object mark bits indexed by object-table position, and the
//! per-step record of already-adjusted arena slots.

const BITS: usize = u64::BITS as usize;

/// A fixed-length bitmap with range marking and directional scans.
///
/// # Example
///
/// ```
/// use shifter_gc::gc::mark::Bitmap;
///
/// let mut bitmap = Bitmap::new(128);
/// assert_eq!(bitmap.len(), 128);
/// assert!(!bitmap.test(0));
///
/// bitmap.set_range(10, 20);
/// assert!(bitmap.test(10));
/// assert_eq!(bitmap.next_set(0), Some(10));
/// assert_eq!(bitmap.next_clear(10), Some(20));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Bitmap {
    /// Bit storage, 64 bits per word.
    words: Vec<u64>,
    /// Number of addressable bits.
    len: usize,
    /// Number of set bits.
    set_count: usize,
}

impl Bitmap {
    /// Create a bitmap of `len` clear bits.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(BITS)],
            len,
            set_count: 0,
        }
    }

    /// Number of addressable bits.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the bitmap has no addressable bits.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of set bits.
    #[must_use]
    pub const fn set_count(&self) -> usize {
        self.set_count
    }

    /// Set bit `index`. Returns `true` if it was previously clear.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn set(&mut self, index: usize) -> bool {
        assert!(index < self.len, "bit {index} out of range {}", self.len);
        let mask = 1u64 << (index % BITS);
        let word = &mut self.words[index / BITS];
        let was_clear = *word & mask == 0;
        *word |= mask;
        if was_clear {
            self.set_count += 1;
        }
        was_clear
    }

    /// Whether bit `index` is set. Out-of-range bits read as clear.
    #[must_use]
    pub fn test(&self, index: usize) -> bool {
        index < self.len && (self.words[index / BITS] >> (index % BITS)) & 1 != 0
    }

    /// Set every bit in `start..end` and return how many were already set.
    ///
    /// # Panics
    ///
    /// Panics if `end > len` or `start > end`.
    pub fn set_range(&mut self, start: usize, end: usize) -> usize {
        assert!(start <= end && end <= self.len, "range {start}..{end} out of {}", self.len);
        let mut already = 0;
        let mut index = start;
        while index < end {
            let bit = index % BITS;
            let span = (BITS - bit).min(end - index);
            let mask = if span == BITS {
                u64::MAX
            } else {
                ((1u64 << span) - 1) << bit
            };
            let word = &mut self.words[index / BITS];
            let prev = (*word & mask).count_ones() as usize;
            *word |= mask;
            already += prev;
            self.set_count += span - prev;
            index += span;
        }
        already
    }

    /// Whether every bit in `start..end` is set.
    #[must_use]
    pub fn all_set(&self, start: usize, end: usize) -> bool {
        start >= end || self.next_clear(start).is_none_or(|clear| clear >= end)
    }

    /// Whether no bit in `start..end` is set.
    #[must_use]
    pub fn none_set(&self, start: usize, end: usize) -> bool {
        start >= end || self.next_set(start).is_none_or(|set| set >= end)
    }

    /// Clear all bits for reuse.
    pub fn clear(&mut self) {
        self.words.fill(0);
        self.set_count = 0;
    }

    /// Clear the word holding bit `index`, along with its neighbours in that
    /// word. Used to reset sparse bitmaps without touching every word.
    pub(crate) fn clear_word_of(&mut self, index: usize) {
        if let Some(word) = self.words.get_mut(index / BITS) {
            self.set_count -= word.count_ones() as usize;
            *word = 0;
        }
    }

    /// Lowest set bit at or above `from`.
    #[must_use]
    pub fn next_set(&self, from: usize) -> Option<usize> {
        self.scan_up(from, false)
    }

    /// Lowest clear bit at or above `from`.
    #[must_use]
    pub fn next_clear(&self, from: usize) -> Option<usize> {
        self.scan_up(from, true)
    }

    /// Highest set bit strictly below `before`.
    #[must_use]
    pub fn prev_set(&self, before: usize) -> Option<usize> {
        self.scan_down(before, false)
    }

    /// Highest clear bit strictly below `before`.
    #[must_use]
    pub fn prev_clear(&self, before: usize) -> Option<usize> {
        self.scan_down(before, true)
    }

    fn scan_up(&self, from: usize, invert: bool) -> Option<usize> {
        if from >= self.len {
            return None;
        }
        let load = |w: usize| if invert { !self.words[w] } else { self.words[w] };
        let mut word = from / BITS;
        let mut bits = load(word) & (u64::MAX << (from % BITS));
        loop {
            if bits != 0 {
                let index = word * BITS + bits.trailing_zeros() as usize;
                return (index < self.len).then_some(index);
            }
            word += 1;
            if word >= self.words.len() {
                return None;
            }
            bits = load(word);
        }
    }

    fn scan_down(&self, before: usize, invert: bool) -> Option<usize> {
        let last = before.min(self.len).checked_sub(1)?;
        let load = |w: usize| if invert { !self.words[w] } else { self.words[w] };
        let mut word = last / BITS;
        let bit = last % BITS;
        let keep = if bit == BITS - 1 {
            u64::MAX
        } else {
            (1u64 << (bit + 1)) - 1
        };
        let mut bits = load(word) & keep;
        loop {
            if bits != 0 {
                return Some(word * BITS + (BITS - 1 - bits.leading_zeros() as usize));
            }
            if word == 0 {
                return None;
            }
            word -= 1;
            bits = load(word);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Bitmap;

    #[test]
    fn test_set_and_test() {
        let mut bitmap = Bitmap::new(100);
        assert!(bitmap.set(3));
        assert!(!bitmap.set(3));
        assert!(bitmap.test(3));
        assert!(!bitmap.test(4));
        assert!(!bitmap.test(1000));
        assert_eq!(bitmap.set_count(), 1);
    }

    #[test]
    fn test_set_range_counts_overlap() {
        let mut bitmap = Bitmap::new(300);
        assert_eq!(bitmap.set_range(60, 130), 0);
        assert_eq!(bitmap.set_count(), 70);
        assert_eq!(bitmap.set_range(120, 140), 10);
        assert_eq!(bitmap.set_count(), 80);
        assert!(bitmap.all_set(60, 140));
        assert!(!bitmap.all_set(59, 140));
        assert!(bitmap.none_set(140, 300));
    }

    #[test]
    fn test_set_range_full_words() {
        let mut bitmap = Bitmap::new(256);
        bitmap.set_range(0, 256);
        assert_eq!(bitmap.set_count(), 256);
        assert_eq!(bitmap.next_clear(0), None);
        assert_eq!(bitmap.prev_clear(256), None);
    }

    #[test]
    fn test_scans_up() {
        let mut bitmap = Bitmap::new(200);
        bitmap.set_range(5, 10);
        bitmap.set_range(130, 131);
        assert_eq!(bitmap.next_set(0), Some(5));
        assert_eq!(bitmap.next_set(10), Some(130));
        assert_eq!(bitmap.next_set(131), None);
        assert_eq!(bitmap.next_clear(5), Some(10));
        assert_eq!(bitmap.next_clear(199), Some(199));
        assert_eq!(bitmap.next_clear(200), None);
    }

    #[test]
    fn test_scans_down() {
        let mut bitmap = Bitmap::new(200);
        bitmap.set_range(5, 10);
        bitmap.set_range(130, 131);
        assert_eq!(bitmap.prev_set(200), Some(130));
        assert_eq!(bitmap.prev_set(130), Some(9));
        assert_eq!(bitmap.prev_set(5), None);
        assert_eq!(bitmap.prev_clear(10), Some(4));
        assert_eq!(bitmap.prev_clear(131), Some(129));
        assert_eq!(bitmap.prev_clear(0), None);
    }

    #[test]
    fn test_clear() {
        let mut bitmap = Bitmap::new(64);
        bitmap.set_range(0, 64);
        bitmap.clear();
        assert_eq!(bitmap.set_count(), 0);
        assert_eq!(bitmap.next_set(0), None);
    }

    #[test]
    fn test_clear_word_of() {
        let mut bitmap = Bitmap::new(256);
        bitmap.set(70);
        bitmap.set(71);
        bitmap.set(200);
        bitmap.clear_word_of(70);
        assert!(!bitmap.test(70));
        assert!(!bitmap.test(71));
        assert!(bitmap.test(200));
        assert_eq!(bitmap.set_count(), 1);
    }
}
