//! Scoring system following modern Tetris guidelines

/// Fastest gravity, in seconds per row
pub const MIN_GRAVITY_INTERVAL: f64 = 0.01;
const GRAVITY_MAX_LEVEL: u32 = 20;

/// How a lock cleared lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineClearType {
    #[default]
    None,
    Single,
    Double,
    Triple,
    Tetris,
    TSpinSingle,
    TSpinDouble,
    TSpinTriple,
}

impl LineClearType {
    /// Classify a clear. A T-spin never clears 4 lines, so 4 is always a Tetris.
    pub fn classify(lines: usize, is_t_spin: bool) -> LineClearType {
        match (lines, is_t_spin) {
            (0, _) => LineClearType::None,
            (1, true) => LineClearType::TSpinSingle,
            (2, true) => LineClearType::TSpinDouble,
            (3, true) => LineClearType::TSpinTriple,
            (1, false) => LineClearType::Single,
            (2, false) => LineClearType::Double,
            (3, false) => LineClearType::Triple,
            _ => LineClearType::Tetris,
        }
    }

    /// Points before level, back-to-back and combo adjustments
    pub fn base_points(self) -> u64 {
        match self {
            LineClearType::None => 0,
            LineClearType::Single => 100,
            LineClearType::Double => 300,
            LineClearType::Triple => 500,
            LineClearType::Tetris => 800,
            LineClearType::TSpinSingle => 800,
            LineClearType::TSpinDouble => 1200,
            LineClearType::TSpinTriple => 1600,
        }
    }

    /// Tetris or any T-spin clear
    pub fn is_difficult(self) -> bool {
        matches!(
            self,
            LineClearType::Tetris
                | LineClearType::TSpinSingle
                | LineClearType::TSpinDouble
                | LineClearType::TSpinTriple
        )
    }

    pub fn is_t_spin(self) -> bool {
        matches!(
            self,
            LineClearType::TSpinSingle | LineClearType::TSpinDouble | LineClearType::TSpinTriple
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            LineClearType::None => "",
            LineClearType::Single => "Single",
            LineClearType::Double => "Double",
            LineClearType::Triple => "Triple",
            LineClearType::Tetris => "Tetris",
            LineClearType::TSpinSingle => "T-Spin Single",
            LineClearType::TSpinDouble => "T-Spin Double",
            LineClearType::TSpinTriple => "T-Spin Triple",
        }
    }
}

/// Score, level, lines, combo and back-to-back tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scorer {
    /// Current score
    pub score: u64,
    /// Current level
    pub level: u32,
    /// Total lines cleared
    pub lines: u32,
    /// Length of the running clear streak (0 = no combo)
    pub combo: u32,
    /// Whether last clear was a "difficult" clear (tetris or t-spin)
    pub back_to_back: bool,
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Scorer {
    pub fn new(start_level: u32) -> Self {
        Self {
            score: 0,
            level: start_level,
            lines: 0,
            combo: 0,
            back_to_back: false,
        }
    }

    /// Add score for soft drop (1 point per cell)
    pub fn add_soft_drop(&mut self, cells: u32) {
        self.score += u64::from(cells);
    }

    /// Add score for hard drop (2 points per cell)
    pub fn add_hard_drop(&mut self, cells: u32) {
        self.score += u64::from(cells) * 2;
    }

    /// Score the lines cleared by one lock and return the clear category.
    /// A lock that clears nothing only breaks the combo.
    pub fn add_line_clear(&mut self, lines_cleared: usize, is_t_spin: bool) -> LineClearType {
        let clear_type = LineClearType::classify(lines_cleared, is_t_spin);
        if clear_type == LineClearType::None {
            self.combo = 0;
            return clear_type;
        }

        let level = u64::from(self.level);
        let mut points = clear_type.base_points() * level;

        // Back-to-back bonus (1.5x for consecutive difficult clears)
        let difficult = clear_type.is_difficult();
        if difficult && self.back_to_back {
            points = points * 3 / 2;
        }
        self.back_to_back = difficult;

        // Combo bonus
        if self.combo > 0 {
            points += 50 * u64::from(self.combo) * level;
        }
        self.combo += 1;

        self.score += points;
        self.lines += lines_cleared as u32;

        // Level up every 10 lines, never down
        self.level = self.level.max(self.lines / 10 + 1);

        clear_type
    }

    /// Seconds between gravity steps at the current level
    pub fn gravity_interval(&self) -> f64 {
        // Past level 20 the curve stays on its floor
        let level = f64::from(self.level.min(GRAVITY_MAX_LEVEL));
        (0.8 - (level - 1.0) * 0.007).powf(level - 1.0).max(MIN_GRAVITY_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_clear() {
        let mut scorer = Scorer::new(1);
        assert_eq!(scorer.add_line_clear(1, false), LineClearType::Single);
        assert_eq!(scorer.score, 100);
        assert_eq!(scorer.lines, 1);
        assert_eq!(scorer.level, 1);
        assert!(!scorer.back_to_back);
    }

    #[test]
    fn test_points_scale_with_level() {
        let mut scorer = Scorer::new(3);
        scorer.add_line_clear(2, false);
        assert_eq!(scorer.score, 900);
    }

    #[test]
    fn test_tetris() {
        let mut scorer = Scorer::new(1);
        assert_eq!(scorer.add_line_clear(4, false), LineClearType::Tetris);
        assert_eq!(scorer.score, 800);
        assert_eq!(scorer.lines, 4);
        assert!(scorer.back_to_back);
    }

    #[test]
    fn test_back_to_back() {
        let mut scorer = Scorer::new(1);
        scorer.add_line_clear(4, false);
        assert_eq!(scorer.score, 800);
        // A lock without lines breaks the combo but keeps back-to-back
        scorer.add_line_clear(0, false);
        assert!(scorer.back_to_back);
        scorer.add_line_clear(4, false);
        assert_eq!(scorer.score, 800 + 1200);
    }

    #[test]
    fn test_back_to_back_with_combo() {
        let mut scorer = Scorer::new(1);
        scorer.add_line_clear(4, false);
        scorer.add_line_clear(4, false);
        // 1200 back-to-back + 50 for a one-clear streak
        assert_eq!(scorer.score, 800 + 1200 + 50);
    }

    #[test]
    fn test_plain_clear_breaks_back_to_back() {
        let mut scorer = Scorer::new(1);
        scorer.add_line_clear(4, false);
        scorer.add_line_clear(0, false);
        scorer.add_line_clear(1, false);
        assert!(!scorer.back_to_back);
        scorer.add_line_clear(0, false);
        scorer.add_line_clear(4, false);
        assert_eq!(scorer.score, 800 + 100 + 800);
    }

    #[test]
    fn test_t_spin_clears() {
        let mut scorer = Scorer::new(2);
        assert_eq!(scorer.add_line_clear(1, true), LineClearType::TSpinSingle);
        assert_eq!(scorer.score, 1600);
        scorer.add_line_clear(0, true);
        assert_eq!(scorer.add_line_clear(2, true), LineClearType::TSpinDouble);
        // 1200 * 2 * 1.5
        assert_eq!(scorer.score, 1600 + 3600);
        assert_eq!(LineClearType::classify(3, true), LineClearType::TSpinTriple);
    }

    #[test]
    fn test_t_spin_without_lines_scores_nothing() {
        let mut scorer = Scorer::new(1);
        assert_eq!(scorer.add_line_clear(0, true), LineClearType::None);
        assert_eq!(scorer.score, 0);
    }

    #[test]
    fn test_combo() {
        let mut scorer = Scorer::new(1);
        scorer.add_line_clear(1, false);
        scorer.add_line_clear(1, false);
        scorer.add_line_clear(1, false);
        // 100, 100 + 50, 100 + 100
        assert_eq!(scorer.score, 450);
        assert_eq!(scorer.combo, 3);
        scorer.add_line_clear(0, false);
        assert_eq!(scorer.combo, 0);
    }

    #[test]
    fn test_drop_points() {
        let mut scorer = Scorer::new(1);
        scorer.add_soft_drop(3);
        scorer.add_hard_drop(10);
        assert_eq!(scorer.score, 23);
    }

    #[test]
    fn test_level_up() {
        let mut scorer = Scorer::new(1);
        for _ in 0..9 {
            scorer.add_line_clear(1, false);
            scorer.add_line_clear(0, false);
        }
        assert_eq!(scorer.level, 1);
        scorer.add_line_clear(1, false);
        assert_eq!(scorer.level, 2);
    }

    #[test]
    fn test_level_never_drops_below_start() {
        let mut scorer = Scorer::new(5);
        for _ in 0..3 {
            scorer.add_line_clear(4, false);
        }
        assert_eq!(scorer.lines, 12);
        assert_eq!(scorer.level, 5);
    }

    #[test]
    fn test_gravity_curve() {
        assert_eq!(Scorer::new(1).gravity_interval(), 1.0);
        let mut previous = Scorer::new(1).gravity_interval();
        for level in 2..=20 {
            let interval = Scorer::new(level).gravity_interval();
            assert!(interval >= 0.01);
            // strictly faster until the curve hits its floor
            assert!(interval < previous || interval == 0.01);
            assert!(interval <= previous);
            previous = interval;
        }
        assert_eq!(Scorer::new(20).gravity_interval(), 0.01);
    }

    #[test]
    fn test_gravity_stays_on_floor_past_level_twenty() {
        let mut scorer = Scorer::new(1);
        for _ in 0..750 {
            scorer.add_line_clear(4, false);
        }
        assert_eq!(scorer.lines, 3000);
        assert_eq!(scorer.level, 301);
        assert_eq!(scorer.gravity_interval(), MIN_GRAVITY_INTERVAL);

        for level in [21, 115, 259, 1000, u32::MAX] {
            assert_eq!(Scorer::new(level).gravity_interval(), MIN_GRAVITY_INTERVAL);
        }
    }
}
