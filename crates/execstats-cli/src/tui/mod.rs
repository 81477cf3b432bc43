mod app;
mod event;
mod settings;
mod themes;
mod ui;

pub use app::TuiConfig;

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

use app::App;
use event::{EventHandler, TermEvent};

type Term = Terminal<CrosstermBackend<io::Stdout>>;

const TICK_RATE: Duration = Duration::from_millis(100);

/// Open the dashboard and block until the user quits.
pub fn run(config: TuiConfig) -> Result<()> {
    // Seed from the disk cache before touching the terminal so config errors
    // print normally.
    let mut app = App::new(config)?;

    let mut terminal = enter_terminal()?;
    install_panic_hook();

    let mut events = EventHandler::new(TICK_RATE);
    let result = event_loop(&mut terminal, &mut app, &mut events);

    leave_terminal()?;
    terminal.show_cursor()?;
    tracing::debug!(ok = result.is_ok(), "dashboard closed");

    result
}

fn enter_terminal() -> Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn leave_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)
}

/// A panic inside the loop must not leave the shell in raw mode.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = leave_terminal();
        previous(info);
    }));
}

fn event_loop(terminal: &mut Term, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|f| ui::render(f, app))?;

        // The frame above shows the loading state; fetch before reading input
        if app.has_pending_refresh() {
            app.run_pending_refresh();
            continue;
        }

        match events.next()? {
            TermEvent::Tick => app.on_tick(),
            TermEvent::Key(key) => {
                if app.handle_key_event(key) {
                    break;
                }
            }
            TermEvent::Mouse(mouse) => app.handle_mouse_event(mouse),
            TermEvent::Resize(w, h) => app.handle_resize(w, h),
        }
    }
    Ok(())
}
