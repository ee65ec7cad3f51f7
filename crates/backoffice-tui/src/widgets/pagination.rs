//! Page bar shown under every list: `‹ prev  1 … 5 6 [7] 8 9 … 20  next ›`.
//!
//! Prev and next render in the disabled style at the bounds, and the
//! pane ignores their keys there.

use ratatui::style::Modifier;
use ratatui::text::{Line, Span};

use backoffice_core::{PageSlot, Pagination};

use crate::theme;

pub fn render_page_bar(pagination: Option<&Pagination>) -> Line<'static> {
    let Some(p) = pagination else {
        return Line::from(Span::styled(" no pages", theme::key_hint()));
    };

    let bound = |label: &'static str, enabled: bool| {
        Span::styled(
            label,
            if enabled {
                theme::key_hint_key()
            } else {
                theme::disabled()
            },
        )
    };

    let mut spans = vec![bound(" ‹ prev ", p.has_prev())];
    for slot in p.window() {
        spans.push(match slot {
            PageSlot::Page(n) if n == p.current_page => Span::styled(
                format!(" [{n}] "),
                theme::tab_active().add_modifier(Modifier::BOLD),
            ),
            PageSlot::Page(n) => Span::styled(format!(" {n} "), theme::tab_inactive()),
            PageSlot::Gap => Span::styled(" … ", theme::key_hint()),
        });
    }
    spans.push(bound(" next › ", p.has_next()));
    spans.push(Span::styled(format!("  {} records", p.total), theme::key_hint()));
    Line::from(spans)
}
