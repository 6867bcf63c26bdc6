//! Minibatch iteration over an instance matrix

use ndarray::{Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::{Error, Result};

/// A training minibatch, one instance per row.
#[derive(Clone)]
pub struct Batch {
    /// Input features
    pub inputs: Array2<f32>,
}

impl Batch {
    pub fn new(inputs: Array2<f32>) -> Self {
        Self { inputs }
    }

    /// Number of instances in the batch.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inputs.nrows()
    }
}

/// Iterator yielding ceil(n / batch_size) minibatches per pass.
///
/// With `shuffle`, row order is permuted before slicing; the final batch may
/// be smaller than `batch_size`.
pub struct BatchIterator<'a> {
    data: ArrayView2<'a, f32>,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl<'a> BatchIterator<'a> {
    pub fn new(
        data: ArrayView2<'a, f32>,
        batch_size: usize,
        shuffle: bool,
        rng: &mut StdRng,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidParameter("batch_size must be at least 1".to_string()));
        }
        let mut order: Vec<usize> = (0..data.nrows()).collect();
        if shuffle {
            order.shuffle(rng);
        }
        Ok(Self { data, order, batch_size, cursor: 0 })
    }

    /// Number of batches this iterator will yield.
    #[must_use]
    pub fn num_batches(&self) -> usize {
        self.data.nrows().div_ceil(self.batch_size)
    }
}

impl Iterator for BatchIterator<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let idx = &self.order[self.cursor..end];
        self.cursor = end;
        Some(Batch::new(self.data.select(Axis(0), idx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::SeedableRng;

    fn data(n: usize) -> Array2<f32> {
        Array2::from_shape_fn((n, 2), |(i, j)| (i * 2 + j) as f32)
    }

    #[test]
    fn test_batch_size_zero_rejected() {
        let x = data(4);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(BatchIterator::new(x.view(), 0, false, &mut rng).is_err());
    }

    #[test]
    fn test_ceil_batch_count_with_partial_tail() {
        let x = data(10);
        let mut rng = StdRng::seed_from_u64(0);
        let it = BatchIterator::new(x.view(), 4, false, &mut rng).unwrap();
        assert_eq!(it.num_batches(), 3);
        let sizes: Vec<usize> = it.map(|b| b.size()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn test_unshuffled_preserves_order() {
        let x = data(5);
        let mut rng = StdRng::seed_from_u64(0);
        let first = BatchIterator::new(x.view(), 2, false, &mut rng).unwrap().next().unwrap();
        assert_eq!(first.inputs, data(2));
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let x = data(16);
        let mut rng = StdRng::seed_from_u64(9);
        let it = BatchIterator::new(x.view(), 4, true, &mut rng).unwrap();
        let mut seen: Vec<f32> = it.flat_map(|b| b.inputs.column(0).to_vec()).collect();
        seen.sort_by(f32::total_cmp);
        let expected: Vec<f32> = (0..16).map(|i| (i * 2) as f32).collect();
        assert_eq!(seen, expected);
    }
}
