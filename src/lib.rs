//! Biased reference counting for shared heap objects.
//!
//! An atomically counted pointer pays for cross-thread safety on every copy,
//! even though most copies and drops happen inside a single thread. This
//! crate splits the count in two: each thread keeps a private, non-atomic
//! count of its own handles, and the object's control block carries a single
//! atomic count of *threads* holding at least one handle. The atomic is
//! touched only when ownership first appears in a thread or fully drains
//! from one; everything in between is plain integer arithmetic.
//!
//! [`Shared`] is the biased handle. [`Plain`] is the unbiased single-count
//! baseline it is measured against. [`stats`] exposes live-allocation
//! counters for leak diagnosis.
//!
//! ```
//! use biasptr::Shared;
//!
//! let a = Shared::new(41);
//! let b = a.clone();
//!
//! assert_eq!(*b, 41);
//! assert_eq!(a.use_count(), 1); // one thread, however many handles
//! assert_eq!(a.local_count(), 2);
//! ```
//!
//! Handles are `!Send`; a thread takes ownership by cloning through a
//! `&Shared`, never by receiving a handle value. See [`Shared`] for the
//! cross-thread pattern.

pub(crate) mod block;
pub(crate) mod slots;

pub mod plain;
pub mod shared;
pub mod stats;

pub use plain::Plain;
pub use shared::Shared;
