use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, KeyEvent, KeyEventKind, MouseEvent};

pub enum TermEvent {
    Tick,
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
}

impl TermEvent {
    fn from_crossterm(event: event::Event) -> Self {
        match event {
            // Windows reports both press and release
            event::Event::Key(key) if key.kind == KeyEventKind::Press => TermEvent::Key(key),
            event::Event::Mouse(mouse) => TermEvent::Mouse(mouse),
            event::Event::Resize(w, h) => TermEvent::Resize(w, h),
            // Focus bursts and releases still advance the spinner
            _ => TermEvent::Tick,
        }
    }
}

/// Terminal input read on a background thread, with a tick when idle.
pub struct EventHandler {
    rx: mpsc::Receiver<TermEvent>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || loop {
            let next = match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(ev) => TermEvent::from_crossterm(ev),
                    Err(_) => TermEvent::Tick,
                },
                _ => TermEvent::Tick,
            };
            if tx.send(next).is_err() {
                break;
            }
        });

        Self { rx }
    }

    pub fn next(&mut self) -> Result<TermEvent> {
        Ok(self.rx.recv()?)
    }
}
