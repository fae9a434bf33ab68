pub mod entity {
    use std::fmt;
    use std::rc::Rc;
    use thiserror::Error;

    pub type Name = Rc<str>;

    /// A seat is either empty or holds exactly one guest.
    pub type Seat = Option<Guest>;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Gender {
        Male,
        Female,
    }

    #[derive(Debug, Clone, Error, PartialEq)]
    #[error("unknown gender {0:?}")]
    pub struct UnknownGender(pub String);

    impl Gender {
        /// Guesses a gender from an honorific at the start of a name.
        pub fn infer(name: &str) -> Option<Gender> {
            if name.starts_with("Mr. ") {
                Some(Gender::Male)
            } else if ["Ms. ", "Mrs. ", "Miss"].iter().any(|prefix| name.starts_with(prefix)) {
                Some(Gender::Female)
            } else {
                None
            }
        }

        /// Parses an explicit gender field. Blank and `unknown` mean no gender.
        pub fn parse(field: &str) -> Result<Option<Gender>, UnknownGender> {
            match field.trim().to_ascii_lowercase().as_str() {
                "" | "unknown" => Ok(None),
                "male" | "m" => Ok(Some(Gender::Male)),
                "female" | "f" => Ok(Some(Gender::Female)),
                _ => Err(UnknownGender(field.to_string())),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct Guest {
        pub name: Name,
        pub gender: Option<Gender>,
    }

    impl Guest {
        pub fn new(name: &str, gender: Option<Gender>) -> Guest {
            Guest { name: Rc::from(name), gender }
        }

        /// True when both genders are known and equal.
        pub fn clashes_with(&self, other: &Guest) -> bool {
            matches!((self.gender, other.gender), (Some(a), Some(b)) if a == b)
        }
    }

    impl fmt::Display for Guest {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.name)
        }
    }
}


pub mod condition {
    use std::collections::{HashMap, HashSet};
    use std::iter;

    use itertools::Itertools;
    use thiserror::Error;

    use super::entity::{Guest, Seat};

    pub type Score = f64;

    pub const ADJACENT_WEIGHT: Score = 1.0;
    pub const OPPOSITE_WEIGHT: Score = 0.6;
    pub const DIAGONAL_WEIGHT: Score = 0.3;
    pub const SAME_TABLE_WEIGHT: Score = 0.1;
    /// Applied to each guest of an adjacent pair sharing a known gender.
    pub const GENDER_CLASH_PENALTY: Score = -10.0;
    pub const CAPACITY_PENALTY: Score = -50.0;
    pub const IMBALANCE_PENALTY: Score = -25.0;
    /// Smallest pair weight on a round table.
    pub const RING_MIN_WEIGHT: Score = 0.1;

    #[derive(Debug, Clone, Error, PartialEq)]
    pub enum PreferenceError {
        #[error("cannot prefer self ({0:?})")]
        SelfPreference(String),
        #[error("pref name {0:?} not found in guest list")]
        UnknownGuest(String),
        #[error("pref score {0} is not finite")]
        NonFinite(Score),
    }

    /// Symmetric pairwise affinities. Pairs are stored under their ordered
    /// names so that argument order never matters; missing pairs are `0`.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Preferences {
        scores: HashMap<String, HashMap<String, Score>>,
    }

    fn ordered<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
        if a <= b { (a, b) } else { (b, a) }
    }

    impl Preferences {
        pub fn new() -> Preferences {
            Preferences::default()
        }

        /// Records the affinity of `a` and `b`, returning any previous value.
        pub fn set(&mut self, a: &str, b: &str, score: Score) -> Result<Option<Score>, PreferenceError> {
            if a == b {
                return Err(PreferenceError::SelfPreference(a.to_string()));
            }
            if !score.is_finite() {
                return Err(PreferenceError::NonFinite(score));
            }
            let (lo, hi) = ordered(a, b);
            Ok(self.scores
                .entry(lo.to_string())
                .or_default()
                .insert(hi.to_string(), score))
        }

        pub fn get(&self, a: &str, b: &str) -> Score {
            let (lo, hi) = ordered(a, b);
            self.scores.get(lo).and_then(|inner| inner.get(hi)).copied().unwrap_or(0.0)
        }

        /// Affinity between two seats; empty seats have none.
        pub fn between(&self, a: &Seat, b: &Seat) -> Score {
            match (a, b) {
                (Some(a), Some(b)) => self.get(&a.name, &b.name),
                _ => 0.0,
            }
        }

        pub fn contains(&self, a: &str, b: &str) -> bool {
            let (lo, hi) = ordered(a, b);
            self.scores.get(lo).is_some_and(|inner| inner.contains_key(hi))
        }

        pub fn len(&self) -> usize {
            self.scores.values().map(HashMap::len).sum()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// Every name mentioned by some pair, in sorted order.
        pub fn names(&self) -> Vec<&str> {
            self.scores
                .iter()
                .flat_map(|(a, inner)| iter::once(a.as_str()).chain(inner.keys().map(String::as_str)))
                .sorted()
                .dedup()
                .collect_vec()
        }

        /// Verifies that each preference is for a named guest.
        pub fn check_guests(&self, guests: &[Guest]) -> Result<(), PreferenceError> {
            let known: HashSet<&str> = guests.iter().map(|guest| &*guest.name).collect();
            match self.names().into_iter().find(|name| !known.contains(name)) {
                Some(name) => Err(PreferenceError::UnknownGuest(name.to_string())),
                None => Ok(()),
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Weights {
        pub adjacent: Score,
        pub opposite: Score,
        pub diagonal: Score,
        pub same_table: Score,
        pub gender_clash: Score,
        pub capacity: Score,
        pub imbalance: Score,
        pub ring_floor: Score,
    }

    impl Default for Weights {
        fn default() -> Self {
            Weights {
                adjacent: ADJACENT_WEIGHT,
                opposite: OPPOSITE_WEIGHT,
                diagonal: DIAGONAL_WEIGHT,
                same_table: SAME_TABLE_WEIGHT,
                gender_clash: GENDER_CLASH_PENALTY,
                capacity: CAPACITY_PENALTY,
                imbalance: IMBALANCE_PENALTY,
                ring_floor: RING_MIN_WEIGHT,
            }
        }
    }

    /// Everything a table needs to score itself. Read-only for a whole run.
    #[derive(Debug, Clone, Default)]
    pub struct Condition {
        pub preferences: Preferences,
        pub weights: Weights,
    }

    impl Condition {
        pub fn new(preferences: Preferences) -> Condition {
            Condition { preferences, weights: Weights::default() }
        }
    }
}


pub mod group {
    use rand::seq::SliceRandom;
    use rand::Rng;
    use thiserror::Error;
    use tracing::debug;

    use super::condition::{Condition, Score};
    use super::entity::Guest;
    use crate::action::SwapError;

    /// Every side (or ring half) needs two seats for a swap to be defined.
    pub const MIN_CAPACITY: usize = 4;

    /// A table topology the annealer can seat, score and perturb.
    ///
    /// Implementations are values: swaps never touch `self` and return
    /// freshly scored copies instead.
    pub trait Layout: Clone + Sized {
        /// Seats `guests` in order into a table with `capacity` seats.
        fn seat(capacity: usize, guests: Vec<Guest>, condition: &Condition) -> Self;

        fn capacity(&self) -> usize;

        fn score(&self) -> Score;

        fn guests(&self) -> Vec<&Guest>;

        /// Exchanges a run of seats between two parts of this table.
        fn swap_within<R: Rng>(
            &self,
            max_swap: Option<usize>,
            condition: &Condition,
            rng: &mut R,
        ) -> Result<Self, SwapError>;

        /// Exchanges a run of seats between this table and `other`.
        fn swap_between<R: Rng>(
            &self,
            other: &Self,
            max_swap: Option<usize>,
            condition: &Condition,
            rng: &mut R,
        ) -> Result<(Self, Self), SwapError>;
    }

    #[derive(Debug, Clone, Error, PartialEq)]
    pub enum PackError {
        #[error("no tables")]
        NoTables,
        #[error("table capacity {0} must be an even number of at least {}", MIN_CAPACITY)]
        InvalidCapacity(usize),
        #[error("seats for only {seats} of {guests} guests")]
        InsufficientCapacity { seats: usize, guests: usize },
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct Arrangement<T> {
        pub tables: Vec<T>,
    }

    impl<T: Layout> Arrangement<T> {
        /// Packs the guests into the tables in random order, filling each
        /// table before moving on to the next.
        pub fn pack<R: Rng>(
            guests: &[Guest],
            capacities: &[usize],
            condition: &Condition,
            rng: &mut R,
        ) -> Result<Arrangement<T>, PackError> {
            if capacities.is_empty() {
                return Err(PackError::NoTables);
            }
            if let Some(&bad) = capacities.iter().find(|&&c| c < MIN_CAPACITY || c % 2 != 0) {
                return Err(PackError::InvalidCapacity(bad));
            }
            let seats: usize = capacities.iter().sum();
            if seats < guests.len() {
                return Err(PackError::InsufficientCapacity { seats, guests: guests.len() });
            }

            let mut order = guests.to_vec();
            order.shuffle(rng);
            let mut queue = order.into_iter();
            let tables = capacities
                .iter()
                .map(|&capacity| T::seat(capacity, queue.by_ref().take(capacity).collect(), condition))
                .collect();
            debug!(guests = guests.len(), seats, "packed initial arrangement");
            Ok(Arrangement { tables })
        }

        pub fn score(&self) -> Score {
            self.tables.iter().map(T::score).sum()
        }

        pub fn guest_count(&self) -> usize {
            self.tables.iter().map(|table| table.guests().len()).sum()
        }
    }
}
