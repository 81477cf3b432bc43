use execstats_core::format_delta;
use ratatui::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};

/// Short count for chart axes: `950`, `1,2K`, `3,4M`.
pub fn format_compact(count: u64) -> String {
    let (scaled, suffix) = if count >= 1_000_000 {
        (Decimal::from(count) / Decimal::from(1_000_000), "M")
    } else if count >= 1_000 {
        (Decimal::from(count) / Decimal::from(1_000), "K")
    } else {
        return count.to_string();
    };
    let rounded = scaled
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    format!("{}{}", rounded.to_string().replace('.', ","), suffix)
}

/// Arrow and percentage for an interval change, colored by sign.
pub fn delta_span(delta: Option<Decimal>, muted: Color) -> Span<'static> {
    match delta {
        Some(d) if d.is_zero() => {
            Span::styled(format!("= {}", format_delta(d)), Style::default().fg(muted))
        }
        Some(d) if d.is_sign_negative() => {
            Span::styled(format!("▼ {}", format_delta(d)), Style::default().fg(Color::Red))
        }
        Some(d) => Span::styled(format!("▲ {}", format_delta(d)), Style::default().fg(Color::Green)),
        None => Span::styled("no previous interval", Style::default().fg(muted)),
    }
}

/// Shade index into a theme's five colors, 0 for no activity.
pub fn intensity(value: u64, max: u64) -> usize {
    if value == 0 || max == 0 {
        return 0;
    }
    let ratio = value as f64 / max as f64;
    ((ratio * 4.0).ceil() as usize).clamp(1, 4)
}

pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", kept)
}
