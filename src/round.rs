//! Round tables: seats on a circle, with pair weights decaying over the
//! squared chord distance between the two seats.

use std::f64::consts::TAU;

use itertools::Itertools;
use rand::Rng;

use crate::action::{Index, SwapError, Window};
use crate::model::condition::{Condition, Score};
use crate::model::entity::{Guest, Seat};
use crate::model::group::Layout;

/// A scored round table.
///
/// `score` counts every pair once. `scores` holds each guest's share, so a
/// pair's preference shows up in both of its seats.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTable {
    seats: Vec<Seat>,
    scores: Vec<Score>,
    score: Score,
}

/// Pair weight between seats `i` and `j` of a ring of `n` seats.
///
/// Seats sit on the unit circle, so the squared distance is at most 4
/// (one diameter squared).
pub fn chord_weight(i: Index, j: Index, n: usize, floor: Score) -> Score {
    let segment = TAU / n as f64;
    let (a, b) = (segment * i as f64, segment * j as f64);
    let d = (a.sin() - b.sin()).powi(2) + (a.cos() - b.cos()).powi(2);
    ((4.0 - d) / 4.0).max(floor)
}

impl RoundTable {
    pub fn new(seats: Vec<Seat>, condition: &Condition) -> RoundTable {
        let n = seats.len();
        let weights = &condition.weights;
        let mut scores = vec![0.0; n];
        let mut score = 0.0;

        for (i, j) in (0..n).tuple_combinations() {
            let (Some(a), Some(b)) = (&seats[i], &seats[j]) else {
                continue;
            };
            let s = condition.preferences.get(&a.name, &b.name) * chord_weight(i, j, n, weights.ring_floor);
            scores[i] += s;
            scores[j] += s;
            score += s;

            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            if adjacent && a.clashes_with(b) {
                scores[i] += weights.gender_clash;
                scores[j] += weights.gender_clash;
                score += weights.gender_clash;
            }
        }
        RoundTable { seats, scores, score }
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn scores(&self) -> &[Score] {
        &self.scores
    }
}

impl Layout for RoundTable {
    fn seat(capacity: usize, guests: Vec<Guest>, condition: &Condition) -> RoundTable {
        let mut guests = guests.into_iter();
        let seats = (0..capacity).map(|_| guests.next()).collect();
        RoundTable::new(seats, condition)
    }

    fn capacity(&self) -> usize {
        self.seats.len()
    }

    fn score(&self) -> Score {
        self.score
    }

    fn guests(&self) -> Vec<&Guest> {
        self.seats.iter().flatten().collect()
    }

    /// Swaps a run of guests between the two halves of the ring.
    fn swap_within<R: Rng>(
        &self,
        max_swap: Option<usize>,
        condition: &Condition,
        rng: &mut R,
    ) -> Result<RoundTable, SwapError> {
        let mut seats = self.seats.clone();
        let (first, second) = seats.split_at_mut(self.seats.len() / 2);
        let window = Window::plan(first.len(), second.len(), max_swap, rng)?;
        window.exchange(first, second);
        Ok(RoundTable::new(seats, condition))
    }

    fn swap_between<R: Rng>(
        &self,
        other: &RoundTable,
        max_swap: Option<usize>,
        condition: &Condition,
        rng: &mut R,
    ) -> Result<(RoundTable, RoundTable), SwapError> {
        let mut first = self.seats.clone();
        let mut second = other.seats.clone();
        let window = Window::plan(first.len(), second.len(), max_swap, rng)?;
        window.exchange(&mut first, &mut second);
        Ok((RoundTable::new(first, condition), RoundTable::new(second, condition)))
    }
}
