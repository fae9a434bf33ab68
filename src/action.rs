use rand::Rng;
use thiserror::Error;

pub type Index = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn random<R: Rng>(rng: &mut R) -> Side {
        if rng.gen() { Side::Left } else { Side::Right }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SwapError {
    #[error("cannot swap on a side of {0} seats")]
    SideTooShort(usize),
}

/// A contiguous run of `len` seats starting at `first_offset` in one side,
/// to be exchanged with the run at `second_offset` in the other side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub len: usize,
    pub first_offset: Index,
    pub second_offset: Index,
}

impl Window {
    /// Picks a random window to swap between sides of `first_len` and
    /// `second_len` seats. The run is at least one seat and strictly
    /// shorter than the shorter side, capped at `max_swap` if given.
    pub fn plan<R: Rng>(
        first_len: usize,
        second_len: usize,
        max_swap: Option<usize>,
        rng: &mut R,
    ) -> Result<Window, SwapError> {
        let flipped = first_len > second_len;
        let (short, long) = if flipped { (second_len, first_len) } else { (first_len, second_len) };
        if short < 2 {
            return Err(SwapError::SideTooShort(short));
        }

        let mut len = rng.gen_range(1..short);
        if let Some(max) = max_swap {
            len = len.min(max);
        }
        let offset = rng.gen_range(0..=short - len);
        // If the other side is longer, maybe index further into it.
        let shifted = if long > short { offset + rng.gen_range(0..=long - short) } else { offset };

        Ok(if flipped {
            Window { len, first_offset: shifted, second_offset: offset }
        } else {
            Window { len, first_offset: offset, second_offset: shifted }
        })
    }

    /// Swaps the planned runs element for element.
    pub fn exchange<T>(&self, first: &mut [T], second: &mut [T]) {
        let first = &mut first[self.first_offset..self.first_offset + self.len];
        let second = &mut second[self.second_offset..self.second_offset + self.len];
        first.swap_with_slice(second);
    }
}

/// Moves every occupied seat to the front, keeping their order, so that
/// empty seats trail.
pub fn close_gaps<T>(side: &mut [Option<T>]) {
    side.sort_by_key(Option::is_none);
}


#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use proptest::prelude::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_plan_rejects_short_sides() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(Window::plan(1, 4, None, &mut rng), Err(SwapError::SideTooShort(1)));
        assert_eq!(Window::plan(4, 0, None, &mut rng), Err(SwapError::SideTooShort(0)));
    }

    #[test]
    fn test_plan_respects_max_swap() {
        let mut rng = SmallRng::seed_from_u64(2);
        for _ in 0..1000 {
            let window = Window::plan(10, 10, Some(2), &mut rng).unwrap();
            assert!((1..=2).contains(&window.len));
        }
    }

    #[test]
    fn test_plan_reaches_every_length() {
        let mut rng = SmallRng::seed_from_u64(3);
        let lengths = (0..2000)
            .map(|_| Window::plan(5, 5, None, &mut rng).unwrap().len)
            .sorted()
            .dedup()
            .collect_vec();
        assert_eq!(lengths, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_plan_reaches_end_of_longer_side() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut reached_end = false;
        for _ in 0..2000 {
            let window = Window::plan(6, 3, None, &mut rng).unwrap();
            assert!(window.first_offset + window.len <= 6);
            assert!(window.second_offset + window.len <= 3);
            reached_end |= window.first_offset + window.len == 6;
        }
        assert!(reached_end);
    }

    #[test]
    fn test_exchange() {
        let window = Window { len: 2, first_offset: 1, second_offset: 0 };
        let mut first = vec![1, 2, 3, 4];
        let mut second = vec![5, 6, 7];
        window.exchange(&mut first, &mut second);
        assert_eq!(first, vec![1, 5, 6, 4]);
        assert_eq!(second, vec![2, 3, 7]);
    }

    #[test]
    fn test_close_gaps_keeps_order() {
        let mut side = vec![None, Some("a"), None, Some("b"), Some("c"), None];
        close_gaps(&mut side);
        assert_eq!(side, vec![Some("a"), Some("b"), Some("c"), None, None, None]);
    }

    fn side_strategy() -> impl Strategy<Value = Vec<Option<u32>>> {
        prop::collection::vec(prop::option::of(0u32..1000), 2..9)
    }

    proptest! {
        #[test]
        fn prop_swap_conserves_seats(
            first in side_strategy(),
            second in side_strategy(),
            max_swap in prop::option::of(1usize..4),
            seed in any::<u64>(),
        ) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let window = Window::plan(first.len(), second.len(), max_swap, &mut rng).unwrap();
            let (mut a, mut b) = (first.clone(), second.clone());
            window.exchange(&mut a, &mut b);
            close_gaps(&mut a);
            close_gaps(&mut b);

            prop_assert_eq!(a.len(), first.len());
            prop_assert_eq!(b.len(), second.len());
            let before = first.iter().chain(&second).sorted().collect_vec();
            let after = a.iter().chain(&b).sorted().collect_vec();
            prop_assert_eq!(before, after);
        }

        #[test]
        fn prop_close_gaps_compacts(side in side_strategy()) {
            let occupied = side.iter().flatten().copied().collect_vec();
            let mut compacted = side.clone();
            close_gaps(&mut compacted);
            prop_assert!(compacted.iter().skip_while(|seat| seat.is_some()).all(Option::is_none));
            prop_assert_eq!(compacted.iter().flatten().copied().collect_vec(), occupied);
        }
    }
}
