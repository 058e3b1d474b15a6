//! 7-bag randomizer for piece generation
//!
//! All 7 pieces are shuffled, then dealt out before reshuffling.
//! This bounds droughts and repeats.

use crate::tetromino::PieceType;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;

/// The 7-bag piece randomizer
#[derive(Debug, Clone)]
pub struct Bag {
    /// Upcoming pieces, front is dealt next
    queue: VecDeque<PieceType>,
    rng: ChaCha8Rng,
}

impl Default for Bag {
    fn default() -> Self {
        Self::new()
    }
}

impl Bag {
    /// Create a new bag randomizer with a random seed
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Create a bag whose sequence is fully determined by `seed`
    pub fn with_seed(seed: u64) -> Self {
        let mut bag = Self {
            queue: VecDeque::with_capacity(14),
            rng: ChaCha8Rng::seed_from_u64(seed),
        };
        bag.refill();
        bag
    }

    /// Append one shuffled set of all 7 types
    pub fn refill(&mut self) {
        let mut new_bag = PieceType::ALL;
        new_bag.shuffle(&mut self.rng);
        self.queue.extend(new_bag);
    }

    /// Deal the next piece, refilling first if the queue ran dry
    pub fn next(&mut self) -> PieceType {
        loop {
            if let Some(piece) = self.queue.pop_front() {
                return piece;
            }
            self.refill();
        }
    }

    /// Preview the next `count` pieces without removing them
    pub fn preview(&mut self, count: usize) -> &[PieceType] {
        while self.queue.len() < count {
            self.refill();
        }
        &self.queue.make_contiguous()[..count]
    }

    /// Number of pieces queued without another refill
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_bag_contains_all_pieces() {
        let mut bag = Bag::new();
        let pieces: HashSet<_> = (0..7).map(|_| bag.next()).collect();
        assert_eq!(pieces.len(), 7);
    }

    #[test]
    fn test_preview_does_not_consume() {
        let mut bag = Bag::with_seed(7);
        let preview = bag.preview(5).to_vec();
        assert_eq!(preview.len(), 5);
        assert_eq!(bag.preview(5), preview.as_slice());
        for expected in preview {
            assert_eq!(bag.next(), expected);
        }
    }

    #[test]
    fn test_preview_beyond_one_bag_refills() {
        let mut bag = Bag::with_seed(1);
        for _ in 0..5 {
            bag.next();
        }
        assert_eq!(bag.len(), 2);
        assert_eq!(bag.preview(5).len(), 5);
        assert_eq!(bag.len(), 9);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = Bag::with_seed(42);
        let mut b = Bag::with_seed(42);
        for _ in 0..50 {
            assert_eq!(a.next(), b.next());
        }
    }

    proptest! {
        #[test]
        fn every_refill_window_is_a_permutation(
            seed in any::<u64>(),
            peeks in prop::collection::vec(0usize..6, 70),
        ) {
            let mut bag = Bag::with_seed(seed);
            let mut drawn = Vec::new();
            for peek in peeks {
                // Interleaved previews must not disturb the bag boundaries
                let _ = bag.preview(peek);
                drawn.push(bag.next());
            }
            for window in drawn.chunks(7) {
                let unique: HashSet<_> = window.iter().collect();
                prop_assert_eq!(unique.len(), 7);
            }
        }
    }
}
