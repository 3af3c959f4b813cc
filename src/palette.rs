//! Sorted fixed-capacity color set with set algebra and bit-width queries.

use crate::{Color, LpvcError, Result};

const ZERO: Color = Color { r: 0, g: 0, b: 0 };

/// A sorted set of up to 256 distinct colors.
///
/// Colors are kept strictly increasing in the canonical `(r, g, b)`
/// lexicographic order. Storage is a fixed array plus a length, so palette
/// operations never allocate.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: [Color; Self::MAX_COLORS],
    len: usize,
}

impl Palette {
    pub const MAX_COLORS: usize = 256;

    /// An empty palette.
    pub fn new() -> Self {
        Self {
            colors: [ZERO; Self::MAX_COLORS],
            len: 0,
        }
    }

    /// Build a palette from arbitrary colors. Duplicates collapse; more than
    /// 256 distinct colors is an error.
    pub fn from_colors(colors: &[Color]) -> Result<Self> {
        let mut palette = Self::new();
        for &color in colors {
            if !palette.insert(color) {
                return Err(LpvcError::TooManyColors);
            }
        }
        Ok(palette)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// The colors in canonical order.
    pub fn as_slice(&self) -> &[Color] {
        &self.colors[..self.len]
    }

    /// Color at `index` in the backing array. Indices are not checked
    /// against [`Self::len`]; any index below 256 is accepted, mirroring how
    /// indexed-bitmap decoding addresses the palette.
    pub fn color(&self, index: usize) -> Color {
        self.colors[index]
    }

    /// Insert a color, keeping the set sorted. Returns `false` when the
    /// palette is full and the color is not already present.
    pub(crate) fn insert(&mut self, color: Color) -> bool {
        match self.as_slice().binary_search(&color) {
            Ok(_) => true,
            Err(position) => {
                if self.len == Self::MAX_COLORS {
                    return false;
                }
                self.colors.copy_within(position..self.len, position + 1);
                self.colors[position] = color;
                self.len += 1;
                true
            }
        }
    }

    /// Smallest index bit width `b` in `{0, 1, 2, 4, 8}` with `2^b >= len`.
    pub fn bits(&self) -> u32 {
        match self.len {
            0..=1 => 0,
            2 => 1,
            3..=4 => 2,
            5..=16 => 4,
            _ => 8,
        }
    }

    /// Colors of `other` that are not in `self`, sorted.
    ///
    /// Note the argument order: this computes `other \ self`, the colors a
    /// new frame adds relative to the current palette.
    pub fn difference(&self, other: &Palette) -> Palette {
        let mut result = Palette::new();
        let mut current = self.as_slice().iter().peekable();

        for &color in other.as_slice() {
            while current.next_if(|&&c| c < color).is_some() {}
            if current.peek().copied() != Some(&color) {
                result.colors[result.len] = color;
                result.len += 1;
            }
        }
        result
    }

    /// Sorted union of the two sets. Errors if the union would exceed 256
    /// colors.
    pub fn merge(&self, other: &Palette) -> Result<Palette> {
        let mut result = Palette::new();
        let mut a = self.as_slice().iter().peekable();
        let mut b = other.as_slice().iter().peekable();

        loop {
            let color = match (a.peek().copied(), b.peek().copied()) {
                (Some(&x), Some(&y)) => {
                    if x <= y {
                        if x == y {
                            b.next();
                        }
                        a.next();
                        x
                    } else {
                        b.next();
                        y
                    }
                }
                (Some(&x), None) => {
                    a.next();
                    x
                }
                (None, Some(&y)) => {
                    b.next();
                    y
                }
                (None, None) => break,
            };

            if result.len == Self::MAX_COLORS {
                return Err(LpvcError::TooManyColors);
            }
            result.colors[result.len] = color;
            result.len += 1;
        }
        Ok(result)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Palette {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for Palette {}
