//! # Twine GP
//!
//! Composable geometric and signomial programs for
//! [Twine](https://github.com/isentropic-dev/twine).
//!
//! Sub-models are written independently, each declaring its own named
//! physical quantities and constraints, and composed into one tree. The tree
//! flattens into a single program over shared quantities, which is solved by
//! successive convex approximation against any geometric-program backend.
//!
//! ```
//! use twine_gp::{
//!     model::ModelBuilder,
//!     quantity::{Declaration, Registry},
//!     substitution::Substitutions,
//! };
//!
//! let mut registry = Registry::new();
//! let mut mission = ModelBuilder::new(&mut registry, "Mission");
//! let w_total = mission.declare(Declaration::new("W_total", "lbf")).unwrap();
//! let segments = mission
//!     .vectorize(3, "Segment", |segment, _| {
//!         segment.declare(Declaration::new("W_fuel", "lbf"))?;
//!         Ok(())
//!     })
//!     .unwrap();
//! let w_fuel = segments.vector("W_fuel").unwrap().clone();
//! mission.constrain(w_total.ge(w_fuel.sum())).unwrap();
//!
//! let mut subs = Substitutions::new();
//! subs.fix_vector(&w_fuel, &[10.0, 20.0, 30.0]).unwrap();
//!
//! let flat = mission.finish().flatten();
//! assert_eq!(flat.constraints.len(), 1);
//! assert_eq!(flat.quantities.len(), 4);
//! ```
//!
//! ## Crate layout
//!
//! - [`quantity`]: Scoped registry of named quantities and vectors of them.
//! - [`expr`]: Unit-checked expressions and their signomial expansion.
//! - [`constraint`]: Constraints, their classification, and convexification.
//! - [`model`]: Model trees, vectorized instancing, and flattening.
//! - [`substitution`]: Fixed values, sweeps, and derived values.
//! - [`solve`]: The successive approximation loop, sweeps, and the
//!   [`twine_core::Model`] adapter for single points.
//! - [`support`]: Units and numeric constraints used throughout.

pub mod constraint;
pub mod expr;
pub mod model;
pub mod quantity;
pub mod solve;
pub mod substitution;
pub mod support;
