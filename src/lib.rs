//!
//! Hierarchical sparse grids: point storage, up/down operator sweeps,
//! hierarchization and adaptive refinement/coarsening.
//!
//! ```
//! use sgcore::grids::sparse_grid::SparseGrid;
//!
//! let mut grid = SparseGrid::new(2, false);
//! grid.sparse_grid(&[4, 4]).unwrap();
//! let mut alpha = grid.sample(|x| x[0] * x[1]);
//! grid.hierarchize(&mut alpha).unwrap();
//! let value = grid.eval(&alpha, &[0.25, 0.5]).unwrap();
//! assert!((value - 0.125).abs() < 1e-12);
//! ```
//!
pub mod algorithms;
pub mod basis;
pub mod errors;
pub mod generators;
pub mod grids;
pub mod iterators;
pub mod refinement;
pub mod storage;
