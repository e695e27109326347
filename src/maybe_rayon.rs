//! Rayon or sequential iteration for the rank precomputation.
//!
//! `ranker` imports `into_par_iter` from here. The `parallel` feature maps it
//! to rayon; without it the same call is a plain `into_iter`, so single-threaded
//! hosts rank identically.
#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    /// `into_par_iter` on anything iterable, returning its ordinary iterator.
    pub trait IntoParallelIterator {
        type Iter;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;
