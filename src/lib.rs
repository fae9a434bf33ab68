//! Seating guests at tables by simulated annealing.
//!
//! Guests carry pairwise preferences ([`Preferences`]). A table scores its
//! seating from those preferences, weighted by how close each pair sits,
//! plus penalties for badly filled tables and same-gender neighbours. The
//! [`Annealer`] keeps proposing swaps of small runs of guests, within a
//! table or between two tables, and accepts them by the Metropolis rule
//! while the temperature slowly cools.
//!
//! Two table layouts are provided: the two-sided [`Table`] and the ring
//! shaped [`RoundTable`].

pub mod action;
pub mod anneal;
pub mod cache;
pub mod input;
pub mod model;
pub mod report;
pub mod round;

pub use action::SwapError;
pub use anneal::{accept, Annealer, Outcome, Params, State, Stop};
pub use cache::{Seating, Table};
pub use model::condition::{Condition, Preferences, Score, Weights};
pub use model::entity::{Gender, Guest, Seat};
pub use model::group::{Arrangement, Layout, PackError};
pub use report::{Render, Report};
pub use round::RoundTable;
