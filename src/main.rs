//! BRIKS terminal driver
//!
//! Reads key events, runs the gravity and lock-check timers and draws a
//! plain text frame of the board after every change.

use anyhow::{Context, Result};
use briks::board::{BOARD_WIDTH, BUFFER_ROWS, Cell, VISIBLE_ROWS};
use briks::clock::Clock;
use briks::engine::{Action, Engine, GameState};
use briks::input::{Command, trigger_name};
use briks::score::LineClearType;
use briks::settings::{FileStore, HighScore, HighScores, MemoryStore, Settings};
use briks::tetromino::{CellColor, Position};
use briks::timer::Ticker;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{
        self, Event, KeyEvent, KeyEventKind, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{
        Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
        enable_raw_mode, supports_keyboard_enhancement,
    },
};
use std::io::{self, Write, stdout};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::filter::Directive;

/// Poll period while no timer is running (paused)
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Get the briks temp directory, creating it if needed
fn briks_temp_dir() -> std::path::PathBuf {
    let dir = std::env::temp_dir().join("briks");
    let _ = std::fs::create_dir_all(&dir);
    dir
}

/// Where settings live for this run. Falls back to memory when there is no
/// usable config directory, so the game still starts.
enum SettingsStore {
    File(FileStore),
    Memory(MemoryStore),
}

impl SettingsStore {
    fn open() -> Self {
        match FileStore::new() {
            Ok(store) => Self::File(store),
            Err(e) => {
                warn!("settings will not persist: {:#}", e);
                Self::Memory(MemoryStore::default())
            }
        }
    }

    fn load(&self) -> Settings {
        match self {
            Self::File(store) => Settings::load(store),
            Self::Memory(store) => Settings::load(store),
        }
    }

    fn save(&mut self, settings: &Settings) -> Result<()> {
        match self {
            Self::File(store) => settings.save(store),
            Self::Memory(store) => settings.save(store),
        }
    }
}

/// Time after which a key counts as released if no event arrived for it
const KEY_TIMEOUT: Duration = Duration::from_millis(100);
/// Poll period while a repeatable key is held
const REPEAT_POLL: Duration = Duration::from_millis(10);

fn repeats(action: Action) -> bool {
    matches!(action, Action::MoveLeft | Action::MoveRight | Action::SoftDrop)
}

fn is_sideways(action: Action) -> bool {
    matches!(action, Action::MoveLeft | Action::MoveRight)
}

#[derive(Debug, Clone, Copy)]
struct HeldKey {
    action: Action,
    first_press: Instant,
    last_seen: Instant,
    /// None until the DAS delay has passed
    last_repeat: Option<Instant>,
}

/// DAS and ARR for held movement keys. Without release events a key is
/// treated as held for as long as the terminal keeps repeating it.
struct AutoShift {
    das: Duration,
    arr: Duration,
    releases_reported: bool,
    held: Vec<HeldKey>,
}

impl AutoShift {
    fn new(das_ms: u64, arr_ms: u64, releases_reported: bool) -> Self {
        Self {
            das: Duration::from_millis(das_ms),
            arr: Duration::from_millis(arr_ms),
            releases_reported,
            held: Vec::new(),
        }
    }

    /// A press or terminal repeat. True when the action should run right away.
    fn key_down(&mut self, action: Action, now: Instant) -> bool {
        if let Some(key) = self.held.iter_mut().find(|key| key.action == action) {
            key.last_seen = now;
            return false;
        }
        // Opposite direction cancels
        if is_sideways(action) {
            self.held.retain(|key| !is_sideways(key.action));
        }
        self.held.push(HeldKey {
            action,
            first_press: now,
            last_seen: now,
            last_repeat: None,
        });
        true
    }

    fn key_up(&mut self, action: Action) {
        self.held.retain(|key| key.action != action);
    }

    fn clear(&mut self) {
        self.held.clear();
    }

    fn is_holding(&self) -> bool {
        !self.held.is_empty()
    }

    /// Repeat actions due at `now`
    fn update(&mut self, now: Instant) -> Vec<Action> {
        if !self.releases_reported {
            self.held.retain(|key| now.duration_since(key.last_seen) <= KEY_TIMEOUT);
        }
        let (das, arr) = (self.das, self.arr);
        self.held
            .iter_mut()
            .filter_map(|key| {
                if now.duration_since(key.first_press) < das {
                    return None;
                }
                match key.last_repeat {
                    Some(last) if now.duration_since(last) < arr => None,
                    _ => {
                        key.last_repeat = Some(now);
                        Some(key.action)
                    }
                }
            })
            .collect()
    }
}

/// Enter a finished game into the table. Quitting mid-game records nothing.
fn record_high_score<C: Clock>(
    high_scores: &mut HighScores,
    engine: &Engine<C>,
) -> Option<usize> {
    if engine.state() != GameState::GameOver || !high_scores.is_high_score(engine.score()) {
        return None;
    }
    high_scores.add(HighScore::now(
        engine.score(),
        engine.level(),
        engine.lines(),
        engine.pieces_placed(),
    ))
}

fn main() -> Result<()> {
    let session_id: u32 = rand::random();
    let briks_dir = briks_temp_dir();
    let log_file = format!("{:08x}.log", session_id);

    // Setup tracing to log file
    let file_appender = tracing_appender::rolling::never(&briks_dir, &log_file);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(
                    "briks=debug"
                        .parse::<Directive>()
                        .context("invalid log directive")?,
                ),
        )
        .with_ansi(false)
        .init();

    info!(
        "BRIKS starting up, session={:08x}, log={}",
        session_id,
        briks_dir.join(&log_file).display()
    );

    let mut store = SettingsStore::open();
    let mut settings = store.load();
    let mut engine = Engine::new(settings.config.start_level, settings.config.preview_count);

    // Setup terminal
    enable_raw_mode().context("failed to enable raw mode")?;
    execute!(stdout(), EnterAlternateScreen, Hide)?;
    let releases_reported = matches!(supports_keyboard_enhancement(), Ok(true));
    if releases_reported {
        execute!(
            stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }

    let result = run(&mut engine, &settings, releases_reported);

    // Restore terminal
    if releases_reported {
        execute!(stdout(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(stdout(), Show, LeaveAlternateScreen)?;
    result?;

    let rank = record_high_score(&mut settings.high_scores, &engine);
    if let Err(e) = store.save(&settings) {
        warn!("could not save settings: {:#}", e);
        eprintln!("Warning: Could not save settings: {:#}", e);
    }

    println!("\nThanks for playing BRIKS!");
    println!("Final Score: {}", engine.score());
    println!("Level: {} | Lines: {}", engine.level(), engine.lines());
    println!(
        "Pieces: {} ({:.2}/s) in {:.1}s",
        engine.pieces_placed(),
        engine.pieces_per_second(),
        engine.elapsed().as_secs_f64()
    );
    if let Some(rank) = rank {
        println!("New high score! Rank #{}", rank);
    }
    info!(score = engine.score(), ?rank, "session finished");
    Ok(())
}

/// Play one game until it ends or the player quits
fn run(engine: &mut Engine, settings: &Settings, releases_reported: bool) -> Result<()> {
    let mut out = stdout();
    let mut ticker = Ticker::new(engine, Instant::now());
    let config = &settings.config;
    let mut auto_shift = AutoShift::new(config.das_ms, config.arr_ms, releases_reported);
    let mut last_clear = LineClearType::None;
    draw(&mut out, engine, settings, last_clear)?;

    loop {
        let mut timeout = ticker.timeout(Instant::now()).unwrap_or(IDLE_POLL);
        if auto_shift.is_holding() {
            timeout = timeout.min(REPEAT_POLL);
        }
        let mut dirty = false;

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match handle_key(engine, &mut ticker, &mut auto_shift, settings, key) {
                    KeyResult::Quit => {
                        info!("player quit");
                        return Ok(());
                    }
                    KeyResult::Cleared(clear) => {
                        last_clear = clear;
                        dirty = true;
                    }
                    KeyResult::Handled => dirty = true,
                    KeyResult::Ignored => {}
                }
            } else {
                // resize and focus events
                dirty = true;
            }
        }

        for action in auto_shift.update(Instant::now()) {
            engine.process(action);
            dirty = true;
        }

        let fired = ticker.fire_due(engine, Instant::now());
        if fired.any() {
            if fired.clear() != LineClearType::None {
                last_clear = fired.clear();
            }
            dirty = true;
        }

        if dirty {
            draw(&mut out, engine, settings, last_clear)?;
        }
        if engine.state() == GameState::GameOver {
            wait_for_key()?;
            return Ok(());
        }
    }
}

enum KeyResult {
    Ignored,
    Handled,
    Cleared(LineClearType),
    Quit,
}

fn handle_key(
    engine: &mut Engine,
    ticker: &mut Ticker,
    auto_shift: &mut AutoShift,
    settings: &Settings,
    key: KeyEvent,
) -> KeyResult {
    let Some(trigger) = trigger_name(&key) else {
        return KeyResult::Ignored;
    };
    let action = match settings.keys.match_action(&trigger) {
        Some(Command::Quit) => return KeyResult::Quit,
        Some(Command::Play(action)) => action,
        None => return KeyResult::Ignored,
    };

    match key.kind {
        KeyEventKind::Release => {
            auto_shift.key_up(action);
            return KeyResult::Ignored;
        }
        KeyEventKind::Repeat if !repeats(action) => return KeyResult::Ignored,
        _ => {}
    }

    match action {
        Action::Pause => {
            auto_shift.clear();
            if engine.toggle_pause() == GameState::Paused {
                ticker.pause();
            } else {
                ticker.resume(engine, Instant::now());
            }
            KeyResult::Handled
        }
        _ if repeats(action) => {
            if auto_shift.key_down(action, Instant::now()) {
                engine.process(action);
                KeyResult::Handled
            } else {
                KeyResult::Ignored
            }
        }
        Action::HardDrop => KeyResult::Cleared(engine.hard_drop()),
        _ => {
            engine.process(action);
            KeyResult::Handled
        }
    }
}

fn wait_for_key() -> io::Result<()> {
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(());
            }
        }
    }
}

fn cell_color(color: CellColor) -> Color {
    match color {
        CellColor::Cyan => Color::Cyan,
        CellColor::Yellow => Color::Yellow,
        CellColor::Purple => Color::Magenta,
        CellColor::Green => Color::Green,
        CellColor::Red => Color::Red,
        CellColor::Blue => Color::Blue,
        CellColor::Orange => Color::DarkYellow,
    }
}

/// What to draw in one board square
#[derive(Clone, Copy)]
enum Square {
    Empty,
    Ghost,
    Block(CellColor),
}

fn draw(
    out: &mut impl Write,
    engine: &mut Engine,
    settings: &Settings,
    last_clear: LineClearType,
) -> io::Result<()> {
    let config = &settings.config;
    let colored = config.theme != "mono";

    // Visible part of the board plus the falling and ghost pieces
    let mut squares = [[Square::Empty; BOARD_WIDTH]; VISIBLE_ROWS];
    for (row, cells) in engine.board().visible_rows().iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            if let Cell::Filled(color) = cell {
                squares[row][col] = Square::Block(*color);
            }
        }
    }
    let mut paint = |cells: Option<[Position; 4]>, square: Square| {
        for pos in cells.into_iter().flatten() {
            let row = pos.row - BUFFER_ROWS as i32;
            if row >= 0 && pos.col >= 0 {
                if let Some(slot) = squares
                    .get_mut(row as usize)
                    .and_then(|r| r.get_mut(pos.col as usize))
                {
                    *slot = square;
                }
            }
        }
    };
    if config.ghost_piece {
        paint(engine.ghost_cells(), Square::Ghost);
    }
    if let Some(piece) = engine.current_piece() {
        let color = piece.piece_type.color();
        paint(engine.current_cells(), Square::Block(color));
    }

    queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;
    for (y, row) in squares.iter().enumerate() {
        queue!(out, MoveTo(0, y as u16), Print("|"))?;
        for square in row {
            match *square {
                Square::Empty if config.show_grid => queue!(out, Print(" ."))?,
                Square::Empty => queue!(out, Print("  "))?,
                Square::Ghost => queue!(out, Print("::"))?,
                Square::Block(color) if colored => queue!(
                    out,
                    SetForegroundColor(cell_color(color)),
                    Print("[]"),
                    ResetColor
                )?,
                Square::Block(_) => queue!(out, Print("[]"))?,
            }
        }
        queue!(out, Print("|"))?;
    }
    let floor = format!("+{}+", "-".repeat(BOARD_WIDTH * 2));
    queue!(out, MoveTo(0, VISIBLE_ROWS as u16), Print(floor))?;

    // Side panel
    let hold = engine.held_piece().map_or("-", |piece| piece.name());
    let next: Vec<&str> = engine.next_pieces().iter().map(|p| p.name()).collect();
    let mut panel = vec![
        format!("Score  {}", engine.score()),
        format!("Level  {}", engine.level()),
        format!("Lines  {}", engine.lines()),
        format!("Combo  {}", engine.combo()),
        format!("B2B    {}", if engine.back_to_back() { "yes" } else { "no" }),
        format!("Hold   {}{}", hold, if engine.hold_used() { " (used)" } else { "" }),
        format!("Next   {}", next.join(" ")),
        format!("Pieces {} ({:.2}/s)", engine.pieces_placed(), engine.pieces_per_second()),
        format!("Best   {}", settings.high_scores.best().unwrap_or(0)),
    ];
    if last_clear != LineClearType::None {
        panel.push(last_clear.name().to_string());
    }
    match engine.state() {
        GameState::Paused => panel.push("PAUSED".to_string()),
        GameState::GameOver => {
            panel.push("GAME OVER".to_string());
            panel.push("press any key".to_string());
        }
        GameState::Playing => {}
    }
    let panel_x = (BOARD_WIDTH * 2 + 4) as u16;
    for (y, line) in panel.iter().enumerate() {
        queue!(out, MoveTo(panel_x, y as u16), Print(line))?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use briks::settings::MAX_HIGH_SCORES;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_held_key_waits_for_das_then_repeats_at_arr() {
        let start = Instant::now();
        let mut shift = AutoShift::new(170, 50, true);
        assert!(shift.key_down(Action::MoveLeft, start));
        // terminal repeats of a held key do not move on their own
        assert!(!shift.key_down(Action::MoveLeft, start + ms(30)));
        assert!(shift.update(start + ms(100)).is_empty());
        assert_eq!(shift.update(start + ms(170)), vec![Action::MoveLeft]);
        assert!(shift.update(start + ms(200)).is_empty());
        assert_eq!(shift.update(start + ms(220)), vec![Action::MoveLeft]);

        shift.key_up(Action::MoveLeft);
        assert!(!shift.is_holding());
        assert!(shift.update(start + ms(400)).is_empty());
    }

    #[test]
    fn test_key_counts_as_released_when_repeats_stop() {
        let start = Instant::now();
        let mut shift = AutoShift::new(170, 50, false);
        assert!(shift.key_down(Action::MoveRight, start));
        assert!(!shift.key_down(Action::MoveRight, start + ms(80)));
        assert!(!shift.key_down(Action::MoveRight, start + ms(160)));
        assert_eq!(shift.update(start + ms(170)), vec![Action::MoveRight]);
        // no events for longer than the timeout
        assert!(shift.update(start + ms(400)).is_empty());
        assert!(!shift.is_holding());
        assert!(shift.key_down(Action::MoveRight, start + ms(410)));
    }

    #[test]
    fn test_reported_releases_keep_key_held() {
        let start = Instant::now();
        let mut shift = AutoShift::new(170, 50, true);
        assert!(shift.key_down(Action::SoftDrop, start));
        assert_eq!(shift.update(start + ms(500)), vec![Action::SoftDrop]);
        assert!(shift.is_holding());
    }

    #[test]
    fn test_opposite_direction_cancels() {
        let start = Instant::now();
        let mut shift = AutoShift::new(170, 50, true);
        assert!(shift.key_down(Action::MoveLeft, start));
        assert!(shift.key_down(Action::SoftDrop, start));
        assert!(shift.key_down(Action::MoveRight, start + ms(10)));
        let due = shift.update(start + ms(200));
        assert!(due.contains(&Action::MoveRight));
        assert!(due.contains(&Action::SoftDrop));
        assert!(!due.contains(&Action::MoveLeft));
    }

    #[test]
    fn test_quitting_mid_game_records_nothing() {
        let engine = Engine::with_seed(1, 5, 3);
        let mut table = HighScores::default();
        assert_eq!(record_high_score(&mut table, &engine), None);
        assert!(table.scores.is_empty());
    }

    fn finished_game() -> Engine {
        let mut engine = Engine::with_seed(1, 5, 3);
        for _ in 0..500 {
            if engine.state() == GameState::GameOver {
                break;
            }
            engine.hard_drop();
        }
        assert_eq!(engine.state(), GameState::GameOver);
        engine
    }

    #[test]
    fn test_game_over_records_high_score() {
        let engine = finished_game();
        let mut table = HighScores::default();
        assert_eq!(record_high_score(&mut table, &engine), Some(1));
        assert_eq!(table.scores[0].score, engine.score());
        assert_eq!(table.scores[0].pieces, engine.pieces_placed());
    }

    #[test]
    fn test_game_over_below_full_table_records_nothing() {
        let engine = finished_game();
        let mut table = HighScores::default();
        for i in 0..MAX_HIGH_SCORES as u64 {
            table.add(HighScore::now(engine.score() + 1_000 + i, 1, 0, 0));
        }
        assert_eq!(record_high_score(&mut table, &engine), None);
        assert!(table.scores.iter().all(|e| e.score > engine.score()));
    }
}
