mod app;
mod input;
mod message;
pub mod toast;
mod ui;

use crate::config::Config;
use crate::store::FileStore;
use anyhow::Result;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;

pub use app::{App, AppEvent, Panel, ThemeKind};
pub use message::Message;

pub async fn run(config: Config, store: FileStore) -> Result<()> {
    // Check if stdout is a terminal
    if !std::io::IsTerminal::is_terminal(&io::stdout()) {
        anyhow::bail!("demodeck requires an interactive terminal");
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state; picks up a stored token and starts loading
    let mut app = App::new(config, store);

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                let msg = input::dispatch(app, key);
                if app.update(msg)? {
                    return Ok(()); // Quit requested
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();

            // Poll for background task results (non-blocking)
            app.poll_events();

            last_tick = std::time::Instant::now();
        }
    }
}
