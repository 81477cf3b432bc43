use ratatui::prelude::*;

const WIDTH: usize = 8;
const HOLD_START: usize = 30;
const HOLD_END: usize = 9;
const TRAIL_LENGTH: usize = 4;

const TRAIL_COLORS: [Color; TRAIL_LENGTH] = [
    Color::Rgb(0, 255, 255),
    Color::Rgb(0, 215, 215),
    Color::Rgb(0, 175, 175),
    Color::Rgb(0, 135, 135),
];
const INACTIVE_COLOR: Color = Color::Rgb(68, 68, 68);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Fetching,
    Refreshing,
}

pub fn phase_message(phase: LoadPhase) -> &'static str {
    match phase {
        LoadPhase::Fetching => "Fetching executions...",
        LoadPhase::Refreshing => "Refreshing...",
    }
}

/// Head position of the scanner and whether it is moving right.
fn scanner_head(frame: usize) -> (usize, bool) {
    let backward_frames = WIDTH - 1;
    let cycle = WIDTH + HOLD_END + backward_frames + HOLD_START;
    let t = frame % cycle;

    if t < WIDTH {
        (t, true)
    } else if t < WIDTH + HOLD_END {
        (WIDTH - 1, true)
    } else if t < WIDTH + HOLD_END + backward_frames {
        (WIDTH - 2 - (t - WIDTH - HOLD_END), false)
    } else {
        (0, false)
    }
}

pub fn get_scanner_spans(frame: usize) -> Vec<Span<'static>> {
    let (head, forward) = scanner_head(frame);

    (0..WIDTH)
        .map(|i| {
            // Trail sits behind the head
            let distance = if forward {
                head.checked_sub(i)
            } else {
                i.checked_sub(head)
            };
            let (ch, color) = match distance {
                Some(d) if d < TRAIL_LENGTH => ('■', TRAIL_COLORS[d]),
                _ => ('⬝', INACTIVE_COLOR),
            };
            Span::styled(ch.to_string(), Style::default().fg(color))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scanner_bounces() {
        assert_eq!(scanner_head(0), (0, true));
        assert_eq!(scanner_head(WIDTH - 1), (WIDTH - 1, true));
        assert_eq!(scanner_head(WIDTH + HOLD_END), (WIDTH - 2, false));
        assert_eq!(get_scanner_spans(3).len(), WIDTH);
    }
}
