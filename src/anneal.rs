use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::action::SwapError;
use crate::model::condition::{Condition, Score};
use crate::model::group::{Arrangement, Layout};

#[derive(Debug, Clone)]
pub struct Params {
    pub initial_temperature: f64,
    /// Factor applied to the temperature every `cooling_interval` iterations.
    pub cooling_rate: f64,
    pub cooling_interval: u64,
    /// Chance of an iteration trying a swap inside one table rather than
    /// between two tables.
    pub within_probability: f64,
    pub within_max_swap: Option<usize>,
    pub between_max_swap: Option<usize>,
    /// Minimum wall time between progress reports.
    pub report_interval: Duration,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            initial_temperature: 250.0,
            cooling_rate: 0.99,
            cooling_interval: 1_000_000,
            within_probability: 0.9,
            within_max_swap: Some(2),
            between_max_swap: None,
            report_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParamsError {
    #[error("initial temperature must be positive, got {0}")]
    Temperature(f64),
    #[error("cooling rate must be in (0, 1], got {0}")]
    CoolingRate(f64),
    #[error("cooling interval must be positive")]
    CoolingInterval,
    #[error("within-table probability must be in [0, 1], got {0}")]
    Probability(f64),
    #[error("max swap must be at least 1")]
    MaxSwap,
    #[error("arrangement has no tables")]
    NoTables,
    #[error("a single table needs a within-table probability above 0")]
    NoMoves,
}

impl Params {
    pub fn with_initial_temperature(mut self, t: f64) -> Self {
        self.initial_temperature = t;
        self
    }

    pub fn with_cooling(mut self, rate: f64, interval: u64) -> Self {
        self.cooling_rate = rate;
        self.cooling_interval = interval;
        self
    }

    pub fn with_within_probability(mut self, p: f64) -> Self {
        self.within_probability = p;
        self
    }

    pub fn with_max_swaps(mut self, within: Option<usize>, between: Option<usize>) -> Self {
        self.within_max_swap = within;
        self.between_max_swap = between;
        self
    }

    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(self.initial_temperature > 0.0) {
            return Err(ParamsError::Temperature(self.initial_temperature));
        }
        if !(self.cooling_rate > 0.0 && self.cooling_rate <= 1.0) {
            return Err(ParamsError::CoolingRate(self.cooling_rate));
        }
        if self.cooling_interval == 0 {
            return Err(ParamsError::CoolingInterval);
        }
        if !(0.0..=1.0).contains(&self.within_probability) {
            return Err(ParamsError::Probability(self.within_probability));
        }
        if self.within_max_swap == Some(0) || self.between_max_swap == Some(0) {
            return Err(ParamsError::MaxSwap);
        }
        Ok(())
    }
}

/// When to end a run. Checked once per iteration; the default never stops.
#[derive(Debug, Clone, Default)]
pub struct Stop {
    pub max_iterations: Option<u64>,
    pub deadline: Option<Instant>,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Stop {
    pub fn never() -> Stop {
        Stop::default()
    }

    pub fn with_max_iterations(mut self, n: u64) -> Self {
        self.max_iterations = Some(n);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn reached(&self, iterations: u64) -> bool {
        self.max_iterations.is_some_and(|max| iterations >= max)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Chance of moving from a state scoring `old` to one scoring `new`.
pub fn acceptance_probability(new: Score, old: Score, temperature: f64) -> f64 {
    if new >= old {
        1.0
    } else {
        ((new - old) / temperature).exp()
    }
}

/// Metropolis acceptance: improvements always pass, regressions pass with
/// probability `exp((new - old) / temperature)`.
pub fn accept<R: Rng>(new: Score, old: Score, temperature: f64, rng: &mut R) -> bool {
    new >= old || acceptance_probability(new, old, temperature) > rng.gen::<f64>()
}

/// What one call to [`Annealer::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Within { accepted: bool },
    Between { accepted: bool },
    /// The same table was drawn twice for a cross-table swap; nothing was
    /// tried and the iteration does not count.
    Collision,
}

impl Step {
    pub fn accepted(&self) -> bool {
        matches!(self, Step::Within { accepted: true } | Step::Between { accepted: true })
    }
}

#[derive(Debug, Clone)]
pub struct State<T> {
    pub arrangement: Arrangement<T>,
    pub n_iterations: u64,
    pub temperature: f64,
}

#[derive(Debug, Clone)]
pub struct Outcome<T> {
    /// The best arrangement seen, which may be earlier than `current`.
    pub best: Arrangement<T>,
    pub best_score: Score,
    pub current: Arrangement<T>,
    pub iterations: u64,
    pub temperature: f64,
    pub accepted_moves: u64,
    pub cancelled: bool,
}

pub struct Annealer<'c, T, R> {
    condition: &'c Condition,
    params: Params,
    state: State<T>,
    rng: R,
}

impl<'c, T: Layout, R: Rng> Annealer<'c, T, R> {
    /// Fails on invalid `params` or an arrangement with no tables. A single
    /// table never gets cross-table moves, since every such draw collides,
    /// so it also needs a nonzero `within_probability`.
    pub fn new(
        arrangement: Arrangement<T>,
        condition: &'c Condition,
        params: Params,
        rng: R,
    ) -> Result<Annealer<'c, T, R>, ParamsError> {
        params.validate()?;
        match arrangement.tables.len() {
            0 => return Err(ParamsError::NoTables),
            1 if params.within_probability == 0.0 => return Err(ParamsError::NoMoves),
            _ => {}
        }
        let state = State { arrangement, n_iterations: 0, temperature: params.initial_temperature };
        Ok(Annealer { condition, params, state, rng })
    }

    pub fn state(&self) -> &State<T> {
        &self.state
    }

    /// Proposes one swap and keeps it if it passes the acceptance rule.
    /// Accepted candidates replace the live tables wholesale.
    pub fn step(&mut self) -> Result<Step, SwapError> {
        let tables = &self.state.arrangement.tables;
        let temperature = self.state.temperature;

        // Spend more time optimizing within tables than moving people
        // around the room.
        if self.rng.gen::<f64>() < self.params.within_probability {
            let i = self.rng.gen_range(0..tables.len());
            let candidate = tables[i].swap_within(self.params.within_max_swap, self.condition, &mut self.rng)?;
            let accepted = accept(candidate.score(), tables[i].score(), temperature, &mut self.rng);
            if accepted {
                trace!(table = i, score = candidate.score(), "accepted swap within table");
                self.state.arrangement.tables[i] = candidate;
            }
            Ok(Step::Within { accepted })
        } else {
            let i1 = self.rng.gen_range(0..tables.len());
            let i2 = self.rng.gen_range(0..tables.len());
            if i1 == i2 {
                return Ok(Step::Collision);
            }
            let (t1, t2) = tables[i1].swap_between(&tables[i2], self.params.between_max_swap, self.condition, &mut self.rng)?;
            let old = tables[i1].score() + tables[i2].score();
            let accepted = accept(t1.score() + t2.score(), old, temperature, &mut self.rng);
            if accepted {
                trace!(tables = ?(i1, i2), score = t1.score() + t2.score(), "accepted swap between tables");
                self.state.arrangement.tables[i1] = t1;
                self.state.arrangement.tables[i2] = t2;
            }
            Ok(Step::Between { accepted })
        }
    }

    /// Anneals until `stop` says otherwise, handing the state to `report`
    /// at most once per report interval.
    pub fn run<F>(mut self, stop: &Stop, mut report: F) -> Result<Outcome<T>, SwapError>
    where
        F: FnMut(&State<T>),
    {
        let mut best = self.state.arrangement.clone();
        let mut best_score = best.score();
        let mut accepted_moves = 0;
        let mut reported = Instant::now();
        debug!(score = best_score, temperature = self.state.temperature, "annealing");

        let cancelled = loop {
            if stop.cancelled() {
                break true;
            }
            if stop.reached(self.state.n_iterations) {
                break false;
            }

            let step = self.step()?;
            if step == Step::Collision {
                continue;
            }
            self.state.n_iterations += 1;

            if step.accepted() {
                accepted_moves += 1;
                let score = self.state.arrangement.score();
                if score > best_score {
                    best = self.state.arrangement.clone();
                    best_score = score;
                }
            }

            if self.state.n_iterations % self.params.cooling_interval == 0 {
                self.state.temperature *= self.params.cooling_rate;
                info!(iteration = self.state.n_iterations, temperature = self.state.temperature, "cooled");
            }

            if reported.elapsed() >= self.params.report_interval {
                report(&self.state);
                reported = Instant::now();
            }
        };

        info!(
            iterations = self.state.n_iterations,
            best = best_score,
            current = self.state.arrangement.score(),
            cancelled,
            "annealing stopped"
        );
        Ok(Outcome {
            best,
            best_score,
            current: self.state.arrangement,
            iterations: self.state.n_iterations,
            temperature: self.state.temperature,
            accepted_moves,
            cancelled,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Table;
    use crate::model::condition::Preferences;
    use crate::model::entity::Guest;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn guests(n: usize) -> Vec<Guest> {
        (0..n).map(|i| Guest::new(&format!("g{i}"), None)).collect()
    }

    fn annealer<'c>(
        condition: &'c Condition,
        capacities: &[usize],
        n_guests: usize,
        params: Params,
        seed: u64,
    ) -> Annealer<'c, Table, SmallRng> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let arrangement = Arrangement::pack(&guests(n_guests), capacities, condition, &mut rng).unwrap();
        Annealer::new(arrangement, condition, params, rng).unwrap()
    }

    #[test]
    fn test_default_params() {
        let params = Params::default();
        assert_eq!(params.initial_temperature, 250.0);
        assert_eq!(params.cooling_rate, 0.99);
        assert_eq!(params.cooling_interval, 1_000_000);
        assert_eq!(params.within_max_swap, Some(2));
        assert_eq!(params.between_max_swap, None);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate_params() {
        assert_eq!(
            Params::default().with_initial_temperature(0.0).validate(),
            Err(ParamsError::Temperature(0.0))
        );
        assert_eq!(Params::default().with_cooling(1.5, 10).validate(), Err(ParamsError::CoolingRate(1.5)));
        assert_eq!(Params::default().with_cooling(0.9, 0).validate(), Err(ParamsError::CoolingInterval));
        assert_eq!(Params::default().with_within_probability(1.2).validate(), Err(ParamsError::Probability(1.2)));
        assert_eq!(Params::default().with_max_swaps(Some(0), None).validate(), Err(ParamsError::MaxSwap));
    }

    #[test]
    fn test_new_rejects_unmovable_arrangements() {
        let condition = Condition::default();
        let empty: Arrangement<Table> = Arrangement { tables: vec![] };
        assert!(matches!(
            Annealer::new(empty, &condition, Params::default(), SmallRng::seed_from_u64(8)),
            Err(ParamsError::NoTables)
        ));

        let mut rng = SmallRng::seed_from_u64(8);
        let single = Arrangement::<Table>::pack(&guests(4), &[6], &condition, &mut rng).unwrap();
        let params = Params::default().with_within_probability(0.0);
        assert!(matches!(
            Annealer::new(single.clone(), &condition, params, rng.clone()),
            Err(ParamsError::NoMoves)
        ));

        let outcome = Annealer::new(single, &condition, Params::default(), rng)
            .unwrap()
            .run(&Stop::never().with_max_iterations(100), |_| {})
            .unwrap();
        assert_eq!(outcome.iterations, 100);
    }

    #[test]
    fn test_accept_improvements_always() {
        let mut rng = SmallRng::seed_from_u64(1);
        for temperature in [1e-12, 0.5, 250.0, 1e12] {
            for _ in 0..100 {
                assert!(accept(10.0, 10.0, temperature, &mut rng));
                assert!(accept(10.5, -3.0, temperature, &mut rng));
            }
        }
    }

    #[test]
    fn test_acceptance_probability_bounds() {
        assert_eq!(acceptance_probability(5.0, 1.0, 3.0), 1.0);
        assert!((acceptance_probability(0.0, 1.0, 1.0) - (-1f64).exp()).abs() < 1e-12);
        assert!(acceptance_probability(0.0, 1.0, 1e-9) < 1e-100);
        assert!(acceptance_probability(0.0, 1.0, 1e9) > 0.999_999);
    }

    #[test]
    fn test_accept_rate_matches_probability() {
        let mut rng = SmallRng::seed_from_u64(2);
        let trials = 20_000;
        let hits = (0..trials).filter(|_| accept(0.0, 1.0, 1.0, &mut rng)).count();
        let rate = hits as f64 / trials as f64;
        assert!((rate - (-1f64).exp()).abs() < 0.02, "acceptance rate {rate}");
    }

    #[test]
    fn test_collisions_are_not_counted() {
        // With two tables, half of the cross-table draws collide, so cross
        // moves make up 0.05 / 0.95 of the counted iterations.
        let condition = Condition::default();
        let mut annealer = annealer(&condition, &[6, 6], 10, Params::default(), 3);
        let (mut within, mut between, mut collisions) = (0, 0, 0);
        for _ in 0..40_000 {
            match annealer.step().unwrap() {
                Step::Within { .. } => within += 1,
                Step::Between { .. } => between += 1,
                Step::Collision => collisions += 1,
            }
        }
        let counted = (within + between) as f64;
        assert!((between as f64 / counted - 0.05 / 0.95).abs() < 0.01);
        assert!((collisions as f64 / 40_000.0 - 0.05).abs() < 0.01);
    }

    #[test]
    fn test_run_cools_geometrically() {
        let condition = Condition::default();
        let params = Params::default().with_cooling(0.5, 10);
        let outcome = annealer(&condition, &[4, 4], 6, params, 4)
            .run(&Stop::never().with_max_iterations(35), |_| {})
            .unwrap();
        assert_eq!(outcome.iterations, 35);
        assert_eq!(outcome.temperature, 250.0 * 0.5 * 0.5 * 0.5);
        assert!(!outcome.cancelled);
    }

    #[test]
    fn test_run_stops_on_cancel_and_deadline() {
        let condition = Condition::default();
        let flag = Arc::new(AtomicBool::new(true));
        let outcome = annealer(&condition, &[4, 4], 6, Params::default(), 5)
            .run(&Stop::never().with_cancel(flag), |_| {})
            .unwrap();
        assert!(outcome.cancelled);
        assert_eq!(outcome.iterations, 0);

        let outcome = annealer(&condition, &[4, 4], 6, Params::default(), 5)
            .run(&Stop::never().with_timeout(Duration::ZERO), |_| {})
            .unwrap();
        assert!(!outcome.cancelled);
        assert_eq!(outcome.iterations, 0);
    }

    #[test]
    fn test_run_reports_state() {
        let condition = Condition::default();
        let params = Params::default().with_report_interval(Duration::ZERO);
        let mut reports = 0;
        annealer(&condition, &[4, 4], 6, params, 6)
            .run(&Stop::never().with_max_iterations(20), |state| {
                assert_eq!(state.arrangement.guest_count(), 6);
                reports += 1;
            })
            .unwrap();
        assert_eq!(reports, 20);
    }

    #[test]
    fn test_run_is_deterministic_and_improves() {
        let mut preferences = Preferences::new();
        preferences.set("g0", "g1", 100.0).unwrap();
        preferences.set("g2", "g3", 100.0).unwrap();
        preferences.set("g0", "g3", -100.0).unwrap();
        preferences.set("g4", "g5", 40.0).unwrap();
        let condition = Condition::new(preferences);
        let params = Params::default().with_initial_temperature(5.0).with_cooling(0.9, 500);
        let stop = Stop::never().with_max_iterations(20_000);

        let initial = annealer(&condition, &[6, 6], 10, params.clone(), 7).state().arrangement.score();
        let first = annealer(&condition, &[6, 6], 10, params.clone(), 7).run(&stop, |_| {}).unwrap();
        let second = annealer(&condition, &[6, 6], 10, params, 7).run(&stop, |_| {}).unwrap();

        assert_eq!(first.best, second.best);
        assert_eq!(first.best_score, second.best_score);
        assert!(first.best_score >= initial);
        assert_eq!(first.best_score, first.best.score());
        assert_eq!(first.current.guest_count(), 10);
        assert!(first.accepted_moves > 0);
    }
}
