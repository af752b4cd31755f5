//! Seeded train/test split.

use ndarray::ArrayView1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rew_common::{Error, Result};

/// Row indices of each side of a split, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle rows with a ChaCha8 stream seeded by `seed` and hold out
/// `ceil(test_size · n)` of them. With `stratify`, each class is split
/// separately so both sides keep the class balance.
pub fn train_test_split(y: ArrayView1<u8>, test_size: f64, stratify: bool, seed: u64) -> Result<Split> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(Error::InvalidConfig(format!(
            "training.test_size must be in (0, 1), got {test_size}"
        )));
    }
    let n = y.len();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let (mut train, mut test) = if stratify {
        let mut train = Vec::new();
        let mut test = Vec::new();
        for class in [0u8, 1u8] {
            let mut idx: Vec<usize> = (0..n).filter(|&i| y[i] == class).collect();
            if idx.is_empty() {
                continue;
            }
            if idx.len() < 2 {
                return Err(Error::Training(format!(
                    "stratified split needs at least 2 rows of class {class}, found {}",
                    idx.len()
                )));
            }
            idx.shuffle(&mut rng);
            let n_test = ((idx.len() as f64 * test_size).round() as usize).clamp(1, idx.len() - 1);
            test.extend_from_slice(&idx[..n_test]);
            train.extend_from_slice(&idx[n_test..]);
        }
        (train, test)
    } else {
        let mut idx: Vec<usize> = (0..n).collect();
        idx.shuffle(&mut rng);
        let n_test = (n as f64 * test_size).ceil() as usize;
        let train = idx.split_off(n_test.min(n));
        (train, idx)
    };

    if train.is_empty() || test.is_empty() {
        return Err(Error::Training(format!(
            "cannot split {n} rows into non-empty train and test sets"
        )));
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok(Split { train, test })
}
