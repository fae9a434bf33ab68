use rand::Rng;

use crate::action::{close_gaps, Index, Side, SwapError, Window};
use crate::model::condition::{Condition, Score, Weights};
use crate::model::entity::{Guest, Seat};
use crate::model::group::Layout;

/// The raw seats of a two-sided table, before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct Seating {
    pub left: Vec<Seat>,
    pub right: Vec<Seat>,
}

impl Seating {
    /// Empty seating with `capacity / 2` seats on each side.
    pub fn new(capacity: usize) -> Seating {
        Seating { left: vec![None; capacity / 2], right: vec![None; capacity / 2] }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut Vec<Seat> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

/// A scored two-sided table.
///
/// The per-seat scores, the structural `table_score` and the total `score`
/// are cached alongside the seats. The only way to build a `Table` is to
/// score a [`Seating`], so the cache always matches the seats.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    seating: Seating,
    left_scores: Vec<Score>,
    right_scores: Vec<Score>,
    table_score: Score,
    score: Score,
}

impl Table {
    pub fn new(seating: Seating, condition: &Condition) -> Table {
        let left_scores = side_scores(&seating.left, &seating.right, condition);
        let right_scores = side_scores(&seating.right, &seating.left, condition);
        let table_score = structure_score(&seating, &condition.weights);
        // Zero seats are left out of the total.
        let score = table_score
            + left_scores.iter().chain(&right_scores).filter(|s| **s != 0.0).sum::<Score>();
        Table { seating, left_scores, right_scores, table_score, score }
    }

    pub fn seating(&self) -> &Seating {
        &self.seating
    }

    pub fn left(&self) -> &[Seat] {
        &self.seating.left
    }

    pub fn right(&self) -> &[Seat] {
        &self.seating.right
    }

    pub fn left_scores(&self) -> &[Score] {
        &self.left_scores
    }

    pub fn right_scores(&self) -> &[Score] {
        &self.right_scores
    }

    /// Capacity and balance penalty only.
    pub fn table_score(&self) -> Score {
        self.table_score
    }
}

fn occupied(side: &[Seat]) -> usize {
    side.iter().filter(|seat| seat.is_some()).count()
}

/// Zero when the table is two seats short of full and both sides hold the
/// same number of guests, growing exponentially with either deviation.
fn structure_score(seating: &Seating, weights: &Weights) -> Score {
    let left = occupied(&seating.left) as f64;
    let right = occupied(&seating.right) as f64;
    let capacity = (seating.left.len() + seating.right.len()) as f64;
    let shortfall = (capacity - 2.0 - (left + right)).abs();
    let imbalance = (left - right).abs();
    weights.capacity * shortfall.exp_m1() + weights.imbalance * imbalance.exp_m1()
}

fn side_scores(side: &[Seat], opposite: &[Seat], condition: &Condition) -> Vec<Score> {
    (0..side.len()).map(|index| seat_score(side, opposite, index, condition)).collect()
}

fn seat_score(side: &[Seat], opposite: &[Seat], index: Index, condition: &Condition) -> Score {
    let seat = &side[index];
    let Some(guest) = seat else {
        return 0.0;
    };
    let weights = &condition.weights;
    let pref = |other: Option<&Seat>| other.map_or(0.0, |other| condition.preferences.between(seat, other));

    let mut score = 0.0;
    let neighbours = [index.checked_sub(1), index.checked_add(1)];
    for j in neighbours.into_iter().flatten().filter(|&j| j < side.len()) {
        score += pref(side.get(j)) * weights.adjacent;
        score += pref(opposite.get(j)) * weights.diagonal;
        if matches!(&side[j], Some(other) if guest.clashes_with(other)) {
            score += weights.gender_clash;
        }
    }
    score += pref(opposite.get(index)) * weights.opposite;
    for j in (0..side.len()).filter(|j| j.abs_diff(index) > 1) {
        score += pref(side.get(j)) * weights.same_table;
        score += pref(opposite.get(j)) * weights.same_table;
    }
    score
}

impl Layout for Table {
    /// Fills the left side first, then the right.
    fn seat(capacity: usize, guests: Vec<Guest>, condition: &Condition) -> Table {
        let mut seating = Seating::new(capacity);
        let mut guests = guests.into_iter();
        for seat in seating.left.iter_mut().chain(seating.right.iter_mut()) {
            *seat = guests.next();
        }
        Table::new(seating, condition)
    }

    fn capacity(&self) -> usize {
        self.seating.left.len() + self.seating.right.len()
    }

    fn score(&self) -> Score {
        self.score
    }

    fn guests(&self) -> Vec<&Guest> {
        self.seating.left.iter().chain(&self.seating.right).flatten().collect()
    }

    /// Swaps a run of guests between the left and right sides.
    fn swap_within<R: Rng>(
        &self,
        max_swap: Option<usize>,
        condition: &Condition,
        rng: &mut R,
    ) -> Result<Table, SwapError> {
        let Seating { mut left, mut right } = self.seating.clone();
        let window = Window::plan(left.len(), right.len(), max_swap, rng)?;
        window.exchange(&mut left, &mut right);
        close_gaps(&mut left);
        close_gaps(&mut right);
        Ok(Table::new(Seating { left, right }, condition))
    }

    /// Swaps a run of guests between a random side of each table.
    fn swap_between<R: Rng>(
        &self,
        other: &Table,
        max_swap: Option<usize>,
        condition: &Condition,
        rng: &mut R,
    ) -> Result<(Table, Table), SwapError> {
        let (first_side, second_side) = (Side::random(rng), Side::random(rng));
        let mut first = self.seating.clone();
        let mut second = other.seating.clone();
        {
            let a = first.side_mut(first_side);
            let b = second.side_mut(second_side);
            let window = Window::plan(a.len(), b.len(), max_swap, rng)?;
            window.exchange(a, b);
            close_gaps(a);
            close_gaps(b);
        }
        Ok((Table::new(first, condition), Table::new(second, condition)))
    }
}
