//! Dense grid storage shared by every solver stage
//!
//! All spatial state of the cell cross-section lives in square `N×N` grids
//! stored row-major as flat `Vec`s. The same container holds real-valued
//! concentrations, binary organelle masks and integer channel counts.

/// Square field addressed by `(row, col)`, stored row-major
///
/// Index of `(row, col)` is `row * size + col`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldData<T> {
    /// Field values in row-major order
    pub data: Vec<T>,
    /// Edge length in cells
    pub size: usize,
}

/// Real-valued concentration field (µM-equivalent units)
pub type ConcentrationField = FieldData<f64>;

/// Binary organelle mask, 0 or 1 per site
pub type StructureMask = FieldData<u8>;

/// Per-site channel counts (cluster sizes or open channels)
pub type ChannelField = FieldData<u32>;

impl<T: Copy + Default> FieldData<T> {
    /// Create a new `size×size` field filled with `T::default()`
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self::with_value(size, T::default())
    }

    /// Create a new `size×size` field filled with `value`
    #[must_use]
    pub fn with_value(size: usize, value: T) -> Self {
        Self {
            data: vec![value; size * size],
            size,
        }
    }

    /// Get reference to field data
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Get mutable reference to field data
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Number of sites (`size²`)
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for a zero-sized grid
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat index of `(row, col)`
    #[inline]
    #[must_use]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.size + col
    }

    /// Get value at `(row, col)`
    ///
    /// # Panics
    ///
    /// Panics if coordinates are out of bounds
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> T {
        assert!(
            row < self.size && col < self.size,
            "Coordinates out of bounds"
        );
        self.data[row * self.size + col]
    }

    /// Set value at `(row, col)`
    ///
    /// # Panics
    ///
    /// Panics if coordinates are out of bounds
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        assert!(
            row < self.size && col < self.size,
            "Coordinates out of bounds"
        );
        self.data[row * self.size + col] = value;
    }

    /// Fill entire field with a value
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}

impl FieldData<f64> {
    /// Smallest and largest value, `(0.0, 0.0)` for an empty field
    #[must_use]
    pub fn min_max(&self) -> (f64, f64) {
        if self.data.is_empty() {
            return (0.0, 0.0);
        }
        self.data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    /// Arithmetic mean over all sites
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }

    /// Mean over the sites where `mask` is set, `0.0` if the mask is empty
    #[must_use]
    pub fn masked_mean(&self, mask: &StructureMask) -> f64 {
        let (sum, count) = self
            .data
            .iter()
            .zip(&mask.data)
            .filter(|(_, &m)| m != 0)
            .fold((0.0, 0_usize), |(s, n), (&v, _)| (s + v, n + 1));
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }
}

impl FieldData<u8> {
    /// Number of set sites
    #[must_use]
    pub fn count_set(&self) -> usize {
        self.data.iter().filter(|&&m| m != 0).count()
    }

    /// True when the site is inside the mask
    #[inline]
    #[must_use]
    pub fn is_set(&self, row: usize, col: usize) -> bool {
        self.get(row, col) != 0
    }
}

impl FieldData<u32> {
    /// Sum of all counts
    #[must_use]
    pub fn total(&self) -> u64 {
        self.data.iter().map(|&c| u64::from(c)).sum()
    }
}
