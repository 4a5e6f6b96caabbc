mod app;
mod components;
mod ui;

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use runwatch_runtime::{Config, InstanceTarget, Provider};

use crate::presentation::theme::Theme;
pub use app::Screen;
use app::App;

/// Run the interactive screen stack starting at `initial` until the user
/// quits. Returns the selector's choice when the initial screen is a
/// selector that hands its result back.
///
/// Only one TUI session may run per process.
pub fn run(
    provider: Arc<dyn Provider>,
    config: &Config,
    initial: Screen,
) -> Result<Option<InstanceTarget>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    ctrlc::set_handler(move || {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        std::process::exit(0);
    })?;

    let mut app = App::new(provider, config.bridge_capacity, initial);
    let result = event_loop(&mut terminal, &mut app, config);

    app.shutdown();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result?;
    app.finish()
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    config: &Config,
) -> Result<()> {
    let theme = Theme::default();
    let drain_interval = config.drain_interval();
    let tick_interval = config.tick_interval();
    let mut last_drain = Instant::now();
    let mut last_tick = Instant::now();
    let mut redraw = true;

    while !app.is_done() {
        if redraw {
            terminal.draw(|f| ui::draw(f, app, &theme, Utc::now()))?;
            redraw = false;
        }

        let timeout = drain_interval
            .checked_sub(last_drain.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    redraw |= app.on_key(key);
                }
                Event::Resize(_, _) => redraw = true,
                _ => {}
            }
        }

        if last_drain.elapsed() >= drain_interval {
            redraw |= app.pump();
            last_drain = Instant::now();
        }

        if last_tick.elapsed() >= tick_interval {
            redraw |= app.tick();
            last_tick = Instant::now();
        }
    }

    Ok(())
}
