pub mod skew;

pub use skew::{NodeHandle, SkewHeap};

use std::fmt;



/// Errors reported by heap construction and [`SkewHeap::decrease_key`].
/// Lookups on an empty heap are not errors; they return `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Error {
    /// A flip probability outside [0, 1] was passed at construction
    BadProbability(f64),
    /// The replacement key handed to decrease_key compares greater than the current key
    KeyNotDecreased,
    /// The handle does not refer to an element rooted in this heap
    ForeignNode
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadProbability(p) => write!(f, "flip probability {} is not in [0, 1]", p),
            Error::KeyNotDecreased => write!(f, "new key is greater than the current key"),
            Error::ForeignNode => write!(f, "handle does not belong to this heap")
        }
    }
}

impl std::error::Error for Error {}



/// State descriptions delivered to an attached tracer immediately after each
/// phase of a heap operation.  Purely observational: the heap behaves
/// identically whether or not a tracer is attached.
#[derive(Debug)]
pub enum TraceEvent<'a, T> {
    /// An element was inserted (fires after the enclosing meld)
    Inserted(&'a T),
    /// The right spines of two trees were merged into one
    Melded,
    /// The post-meld flip pass finished; carries the running flip total
    Rebalanced { flips: u64 },
    /// The minimum element was extracted
    Extracted(&'a T),
    /// An element's key was lowered in place
    KeyDecreased(&'a T)
}

/// Observation callback attached via [`SkewHeap::set_tracer`]
pub type Tracer<T> = Box<dyn FnMut(TraceEvent<T>)>;
