use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Sparkline, Wrap};
use vs_core::features::{FeatureName, FeatureSet, MFCC_COUNT};
use vs_core::report::Severity;

use crate::dashboard::Dashboard;

/// Draw the full UI: features | analysis, MFCC bar, status line.
pub fn draw(frame: &mut Frame, dash: &Dashboard) {
    let area = frame.area();

    // Vertical split: [body | status(1)]
    let v_chunks = Layout::vertical([Constraint::Min(8), Constraint::Length(1)]).split(area);

    // Horizontal split of the body: [features(34) | analysis]
    let h_chunks =
        Layout::horizontal([Constraint::Length(34), Constraint::Min(30)]).split(v_chunks[0]);

    // Left column: [values | mfcc(5)]
    let left = Layout::vertical([Constraint::Min(10), Constraint::Length(5)]).split(h_chunks[0]);

    draw_features(frame, left[0], dash.features.as_ref());
    draw_mfcc(frame, left[1], dash.features.as_ref());
    draw_analysis(frame, h_chunks[1], dash);
    draw_status(frame, v_chunks[1], dash);

    if dash.show_help {
        draw_help_overlay(frame, area);
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Positive => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Hint => Color::Cyan,
    }
}

/// One "label: value" line; defaulted values are dimmed.
fn feature_line(label: &str, value: String, defaulted: bool) -> Line<'static> {
    let value_style = if defaulted {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM)
    } else {
        Style::default().fg(Color::White)
    };
    Line::from(vec![
        Span::styled(format!(" {label:<10}"), Style::default().fg(Color::Gray)),
        Span::styled(value, value_style),
    ])
}

/// Draw the feature values panel.
fn draw_features(frame: &mut Frame, area: Rect, features: Option<&FeatureSet>) {
    let lines = match features {
        None => vec![
            Line::from(""),
            Line::from(Span::styled(
                " En attente du premier cycle…",
                Style::default().fg(Color::DarkGray),
            )),
        ],
        Some(f) => {
            let d = |name| f.defaulted.contains(name);
            vec![
                Line::from(Span::styled("─ Hauteur ──", Style::default().fg(Color::Yellow))),
                feature_line(
                    "Pitch",
                    format!("{:.1} Hz", f.pitch_mean),
                    d(FeatureName::PitchMean),
                ),
                feature_line(
                    "Écart",
                    format!("{:.1} Hz", f.pitch_std),
                    d(FeatureName::PitchStd),
                ),
                Line::from(Span::styled("─ Intensité ─", Style::default().fg(Color::Yellow))),
                feature_line(
                    "RMS",
                    format!("{:.3}", f.rms_mean),
                    d(FeatureName::RmsMean),
                ),
                feature_line(
                    "ZCR",
                    format!("{:.3}", f.zcr_mean),
                    d(FeatureName::ZcrMean),
                ),
                feature_line(
                    "Tempo",
                    format!("{:.1} BPM", f.tempo),
                    d(FeatureName::Tempo),
                ),
                Line::from(Span::styled("─ Timbre ───", Style::default().fg(Color::Yellow))),
                feature_line(
                    "Centroïde",
                    format!("{:.0} Hz", f.spectral_centroid),
                    d(FeatureName::SpectralCentroid),
                ),
                feature_line(
                    "Largeur",
                    format!("{:.0} Hz", f.spectral_bandwidth),
                    d(FeatureName::SpectralBandwidth),
                ),
                feature_line(
                    "Chroma",
                    format!("{:.2}", f.chroma_mean),
                    d(FeatureName::ChromaMean),
                ),
            ]
        }
    };

    let panel = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Mesures "));
    frame.render_widget(panel, area);
}

/// MFCCs shifted to be non-negative and scaled to 0..=64 for the sparkline.
fn mfcc_bars(mfccs: &[f32; MFCC_COUNT]) -> Vec<u64> {
    let lo = mfccs.iter().copied().fold(f32::INFINITY, f32::min);
    let hi = mfccs.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let span = hi - lo;
    if !span.is_finite() || span <= f32::EPSILON {
        return vec![0; MFCC_COUNT];
    }
    mfccs
        .iter()
        .map(|&c| (((c - lo) / span) * 64.0).clamp(0.0, 64.0) as u64)
        .collect()
}

/// Draw the MFCC profile sparkline.
fn draw_mfcc(frame: &mut Frame, area: Rect, features: Option<&FeatureSet>) {
    let (data, color) = match features {
        Some(f) if !f.defaulted.contains(FeatureName::Mfccs) => (mfcc_bars(&f.mfccs), Color::Cyan),
        _ => (vec![0; MFCC_COUNT], Color::DarkGray),
    };

    let sparkline = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(" MFCC "))
        .data(&data)
        .style(Style::default().fg(color));

    frame.render_widget(sparkline, area);
}

/// Draw the diagnostics list, coloured by severity.
fn draw_analysis(frame: &mut Frame, area: Rect, dash: &Dashboard) {
    let mut lines: Vec<Line> = dash
        .report
        .iter()
        .map(|d| {
            Line::from(Span::styled(
                format!(" • {}", d.message()),
                Style::default().fg(severity_color(d.severity())),
            ))
        })
        .collect();

    if let Some(err) = &dash.last_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" Erreur : {err}"),
            Style::default().fg(Color::Red),
        )));
        lines.push(Line::from(Span::styled(
            " Poursuite avec l'échantillon suivant…",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" Analyse "));
    frame.render_widget(panel, area);
}

/// Draw the one-line status bar.
fn draw_status(frame: &mut Frame, area: Rect, dash: &Dashboard) {
    let state_color = match dash.state {
        crate::RenderState::Listening => Color::Green,
        crate::RenderState::Paused => Color::Yellow,
        crate::RenderState::Finished => Color::DarkGray,
    };
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", dash.state.label()),
            Style::default().fg(state_color),
        ),
        Span::raw(format!(
            "│ {} │ cycles {} │ erreurs {} │ analyse {:.0} ms ",
            dash.source,
            dash.cycles,
            dash.errors,
            dash.timer.average_ms()
        )),
        Span::styled("│ ? = aide", Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// Draw the help overlay with all keybindings.
fn draw_help_overlay(frame: &mut Frame, area: Rect) {
    let help_text = vec![
        Line::from(Span::styled(
            " voicescope — Commandes ",
            Style::default().fg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(" q/Esc    Quitter"),
        Line::from(" Espace   Pause/Reprise"),
        Line::from(" ?        Aide"),
        Line::from(""),
        Line::from(Span::styled(
            " ? ou Esc pour fermer ",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let help_width = 32u16;
    let help_height = help_text.len() as u16 + 2;
    let x = area.x + area.width.saturating_sub(help_width) / 2;
    let y = area.y + area.height.saturating_sub(help_height) / 2;
    let help_area = Rect::new(
        x,
        y,
        help_width.min(area.width),
        help_height.min(area.height),
    );

    let help = Paragraph::new(help_text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Aide ")
            .style(Style::default().bg(Color::Black).fg(Color::White)),
    );

    frame.render_widget(help, help_area);
}

#[cfg(test)]
mod tests {
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use vs_core::report::{Diagnostic, DiagnosticReport};
    use vs_core::traits::Presenter;

    use super::*;

    fn render(dash: &Dashboard) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal.draw(|f| draw(f, dash)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn empty_dashboard_waits() {
        let screen = render(&Dashboard::new("micro"));
        assert!(screen.contains("En attente"));
        assert!(screen.contains("cycles 0"));
    }

    #[test]
    fn diagnostics_and_values_are_shown() {
        let mut dash = Dashboard::new("micro");
        let features = FeatureSet {
            pitch_mean: 182.5,
            ..FeatureSet::default()
        };
        let report: DiagnosticReport = [Diagnostic::PitchNatural].into_iter().collect();
        dash.present(&features, &report);
        let screen = render(&dash);
        assert!(screen.contains("182.5 Hz"));
        assert!(screen.contains("Pitch is within a natural speaking range"));
        assert!(screen.contains("cycles 1"));
    }

    #[test]
    fn help_overlay_lists_quit() {
        let mut dash = Dashboard::new("micro");
        dash.show_help = true;
        assert!(render(&dash).contains("Quitter"));
    }

    #[test]
    fn flat_mfccs_give_empty_bars() {
        assert_eq!(mfcc_bars(&[1.0; MFCC_COUNT]), vec![0; MFCC_COUNT]);
        let mut ramp = [0.0; MFCC_COUNT];
        for (i, c) in ramp.iter_mut().enumerate() {
            *c = i as f32;
        }
        let bars = mfcc_bars(&ramp);
        assert_eq!(bars[0], 0);
        assert_eq!(bars[MFCC_COUNT - 1], 64);
    }
}
