//! TUI rendering for trailhead
//!
//! Draws the [`MapState`](crate::view::MapState) the tracker has been
//! updating: a world-map canvas with the travel path, accuracy circle and a
//! heading arrow, plus a side panel with status, heading and address.

use crate::app::App;
use crate::geo::meters_to_degrees;
use crate::tracker::TrackerPhase;
use crate::view::{format_coords, Severity};
use ratatui::{
    prelude::*,
    widgets::{canvas::*, *},
};

use ratatui::text::Line;

/// Renders one frame: map on the left (72%), info panel on the right.
pub fn render(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(72), Constraint::Percentage(28)])
        .split(f.size());

    render_map(f, app, chunks[0]);
    render_sidebar(f, app, chunks[1]);
}

/// Arrow glyph for a heading, snapped to the nearest 45°.
pub fn heading_glyph(heading: Option<f64>) -> &'static str {
    const ARROWS: [&str; 8] = ["↑", "↗", "→", "↘", "↓", "↙", "←", "↖"];
    match heading {
        Some(h) => ARROWS[(((h + 22.5).rem_euclid(360.0)) / 45.0) as usize % 8],
        None => "●",
    }
}

fn render_map(f: &mut Frame, app: &App, area: Rect) {
    let map = &app.map;
    let center = map.center;
    let half_x = map.span_degrees / 2.0;
    // terminal cells are about twice as tall as wide
    let half_y = half_x / 2.0;

    let canvas = Canvas::default()
        .block(Block::bordered().title(" Live Track "))
        .marker(symbols::Marker::Braille)
        .x_bounds([center.lon() - half_x, center.lon() + half_x])
        .y_bounds([center.lat() - half_y, center.lat() + half_y])
        .paint(|ctx| {
            ctx.draw(&Map {
                color: Color::Rgb(50, 50, 50),
                resolution: MapResolution::High,
            });
            ctx.layer();

            for w in map.path.windows(2) {
                ctx.draw(&canvas::Line {
                    x1: w[0].lon(),
                    y1: w[0].lat(),
                    x2: w[1].lon(),
                    y2: w[1].lat(),
                    color: Color::Yellow,
                });
            }

            if let Some(circle) = &map.circle {
                ctx.draw(&Circle {
                    x: circle.center.lon(),
                    y: circle.center.lat(),
                    radius: meters_to_degrees(circle.radius_m),
                    color: Color::Blue,
                });
            }

            if let Some(marker) = &map.marker {
                ctx.print(
                    marker.position.lon(),
                    marker.position.lat(),
                    Line::from(Span::styled(
                        heading_glyph(marker.heading),
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )),
                );
            }
        });

    f.render_widget(canvas, area);
}

fn render_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let map = &app.map;
    let label = Style::default().add_modifier(Modifier::BOLD);

    let (status, severity) = &map.status;
    let status_color = match severity {
        Severity::Info => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    };

    let phase = match app.tracker.phase() {
        TrackerPhase::Idle => "IDLE",
        TrackerPhase::AwaitingFix => "AWAITING FIX",
        TrackerPhase::Tracking => "TRACKING",
    };

    let heading = app
        .tracker
        .heading()
        .map(|h| format!("{:.0}° {}", h, heading_glyph(Some(h))))
        .unwrap_or_else(|| "--".to_string());

    let position = map
        .marker
        .map(|m| format_coords(m.position))
        .unwrap_or_else(|| "--".to_string());

    let accuracy = map
        .circle
        .map(|c| format!("±{:.0} m", c.radius_m))
        .unwrap_or_else(|| "--".to_string());

    let mut lines = vec![
        Line::from(Span::styled(status.as_str(), Style::default().fg(status_color))),
        Line::from(""),
        Line::from(vec![
            Span::styled("STATE: ", label),
            Span::raw(phase),
        ]),
        Line::from(vec![
            Span::styled("SOURCE: ", label),
            Span::raw(app.source_name),
        ]),
        Line::from(vec![
            Span::styled("POSITION: ", label),
            Span::raw(position),
        ]),
        Line::from(vec![
            Span::styled("ACCURACY: ", label),
            Span::raw(accuracy),
        ]),
        Line::from(vec![
            Span::styled("HEADING: ", label),
            Span::raw(heading),
            Span::raw(if app.tracker.orientation_enabled() { " (compass)" } else { "" }),
        ]),
        Line::from(vec![
            Span::styled("FIXES: ", label),
            Span::raw(app.tracker.fix_count().to_string()),
            Span::raw("  │  "),
            Span::styled("PATH: ", label),
            Span::raw(format!(
                "{} pts, {:.0} m",
                app.tracker.path().len(),
                app.tracker.path().distance_m()
            )),
        ]),
        Line::from(""),
        Line::from(Span::styled("Location", label)),
    ];

    let popup = map.popup_text().unwrap_or_else(|| "--".to_string());
    lines.push(Line::from(Span::styled(popup, Style::default().fg(Color::Magenta))));
    if app.lookups_in_flight > 0 {
        lines.push(Line::from(Span::styled(
            "resolving address...",
            Style::default().fg(Color::DarkGray),
        )));
    }

    lines.extend([
        Line::from(""),
        Line::from(Span::styled(
            "s start/stop · c clear · o compass · ←/→ turn · +/- zoom · q quit",
            Style::default().fg(Color::DarkGray),
        )),
    ]);

    let p = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .title(" Tracker ")
            .borders(Borders::ALL)
            .padding(Padding::new(1, 1, 1, 0)),
    );
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_glyph_snaps_to_octants() {
        assert_eq!(heading_glyph(None), "●");
        assert_eq!(heading_glyph(Some(0.0)), "↑");
        assert_eq!(heading_glyph(Some(359.0)), "↑");
        assert_eq!(heading_glyph(Some(44.0)), "↗");
        assert_eq!(heading_glyph(Some(90.0)), "→");
        assert_eq!(heading_glyph(Some(200.0)), "↓");
        assert_eq!(heading_glyph(Some(300.0)), "↖");
    }
}
