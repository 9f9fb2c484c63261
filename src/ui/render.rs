use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::{App, AppState, LoginFocus};
use crate::models::CitaStatus;
use crate::utils::{format_date, format_optional, truncate_string};

use super::styles;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Summary counters
            Constraint::Length(3), // Filter bar
            Constraint::Min(8),    // Appointment table
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_stats_bar(frame, app, chunks[1]);
    render_filter_bar(frame, app, chunks[2]);
    render_table(frame, app, chunks[3]);
    render_status_bar(frame, app, chunks[4]);

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::LoggingIn => render_login_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::ConfirmingInstall => render_install_overlay(frame),
        AppState::ShowingExportWarning => render_export_warning_overlay(frame),
        _ => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  Citadesk";
    let shell_hint = if app.install.is_standalone() {
        "[offline shell] "
    } else {
        ""
    };
    let help_hint = "[?] Help";

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            (area.width as usize)
                .saturating_sub(title.len() + shell_hint.len() + help_hint.len() + 4),
        )),
        Span::styled(shell_hint, styles::success_style()),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_stats_bar(frame: &mut Frame, app: &App, area: Rect) {
    let stats = &app.stats;

    let line = Line::from(vec![
        Span::raw(" "),
        Span::styled("Total: ", styles::muted_style()),
        Span::styled(stats.total.to_string(), styles::title_style()),
        Span::styled("   Confirmed: ", styles::muted_style()),
        Span::styled(stats.confirmed.to_string(), styles::success_style()),
        Span::styled("   Pending: ", styles::muted_style()),
        Span::styled(stats.pending.to_string(), styles::highlight_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_filter_bar(frame: &mut Frame, app: &App, area: Rect) {
    let editing_date = matches!(app.state, AppState::EditingDateFilter);
    let searching = matches!(app.state, AppState::Searching);

    let date_value = if app.filter_date.is_empty() && !editing_date {
        "any".to_string()
    } else if editing_date {
        format!("{}_", app.filter_date)
    } else {
        app.filter_date.clone()
    };

    let status_value = match app.filter_status {
        Some(status) => status.label().to_string(),
        None => "any".to_string(),
    };

    let search_value = if searching {
        format!("{}_", app.search_query)
    } else if app.search_query.is_empty() {
        "-".to_string()
    } else {
        app.search_query.clone()
    };

    let line = Line::from(vec![
        Span::raw(" "),
        Span::styled("[f] Date: ", styles::muted_style()),
        Span::styled(date_value, styles::border_style(editing_date)),
        Span::styled("   [s] Status: ", styles::muted_style()),
        Span::raw(status_value),
        Span::styled("   [/] Search: ", styles::muted_style()),
        Span::styled(search_value, styles::search_style()),
        Span::styled("   [a]pply  [c]lear", styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_table(frame: &mut Frame, app: &App, area: Rect) {
    let header = Row::new([
        Cell::from("Name"),
        Cell::from("Email"),
        Cell::from("Phone"),
        Cell::from("Date"),
        Cell::from("Time"),
        Cell::from("Reason"),
        Cell::from("Status"),
    ])
    .style(styles::title_style())
    .height(1);

    let visible = app.visible_citas();

    let rows: Vec<Row> = visible
        .iter()
        .enumerate()
        .map(|(i, cita)| {
            let style = if i == app.selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };

            let status = cita.effective_status();
            let status_cell = Cell::from(status.label()).style(styles::status_style(
                status == CitaStatus::Confirmed,
                status == CitaStatus::Cancelled,
            ));

            Row::new(vec![
                Cell::from(truncate_string(&cita.name, 24)),
                Cell::from(cita.email.clone()),
                Cell::from(format_optional(&cita.phone, "")),
                Cell::from(format_date(&cita.date)),
                Cell::from(cita.time.clone()),
                Cell::from(truncate_string(&format_optional(&cita.reason, ""), 20)),
                status_cell,
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Percentage(20), // Name
        Constraint::Percentage(24), // Email
        Constraint::Length(14),     // Phone
        Constraint::Length(13),     // Date
        Constraint::Length(6),      // Time
        Constraint::Fill(1),        // Reason
        Constraint::Length(10),     // Status
    ];

    let title = format!(
        " Citas ({}/{}) - [Enter] confirm  [x] cancel ",
        visible.len(),
        app.citas.len()
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(true)),
        )
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    state.select((!visible.is_empty()).then_some(app.selection));

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = if app.install.trigger_visible() {
        "[e]xport | [i]nstall | [L]ogout | [q]uit"
    } else {
        "[e]xport | [L]ogout | [q]uit"
    };

    let left_text = match app.status_message {
        Some(ref msg) => format!(" {} ", msg),
        None => " Ready ".to_string(),
    };
    let right_text = format!(" {} ", shortcuts);

    let padding = (area.width as usize)
        .saturating_sub(left_text.len())
        .saturating_sub(right_text.len());

    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding)),
        Span::styled(right_text, styles::muted_style()),
    ]);

    frame.render_widget(
        Paragraph::new(status_line).style(styles::status_bar_style()),
        area,
    );
}

// ============================================================================
// Overlays
// ============================================================================

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 18, frame.area());
    frame.render_widget(Clear, area);

    let entries = [
        ("a / Enter", "Apply filters / confirm row"),
        ("c", "Clear filters and search"),
        ("f", "Edit date filter"),
        ("s", "Cycle status filter"),
        ("/", "Search name, email, phone"),
        ("x", "Cancel selected appointment"),
        ("e", "Export to spreadsheet"),
        ("i", "Install offline shell"),
        ("L", "Log out"),
        ("r", "Reload"),
        ("q", "Quit"),
    ];

    let mut lines = vec![Line::from(""), Line::from("")];
    for (key, desc) in entries {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(format!("{:<10}", key), styles::help_key_style()),
            Span::styled(desc, styles::help_desc_style()),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Press Esc to close",
        styles::muted_style(),
    )));

    let block = Block::default()
        .title(" Help ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(46, 12, frame.area());
    frame.render_widget(Clear, area);

    let email_focus = matches!(app.login_focus, LoginFocus::Email);
    let password_focus = matches!(app.login_focus, LoginFocus::Password);
    let button_focus = matches!(app.login_focus, LoginFocus::Button);

    let masked: String = "*".repeat(app.login_password.len());

    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Email:    ", styles::muted_style()),
            Span::styled(
                format!("{}{}", app.login_email, if email_focus { "_" } else { "" }),
                styles::border_style(email_focus),
            ),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Password: ", styles::muted_style()),
            Span::styled(
                format!("{}{}", masked, if password_focus { "_" } else { "" }),
                styles::border_style(password_focus),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            if button_focus { "  > Sign in <" } else { "    Sign in" },
            styles::border_style(button_focus),
        )),
    ];

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("  {}", error),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .title(" Sign in ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_quit_overlay(frame: &mut Frame) {
    render_confirm_overlay(frame, " Quit ", "Quit Citadesk?", "[y]es   [n]o");
}

fn render_install_overlay(frame: &mut Frame) {
    render_confirm_overlay(
        frame,
        " Install ",
        "Install the offline shell?",
        "[y]es   [n]o",
    );
}

fn render_export_warning_overlay(frame: &mut Frame) {
    render_confirm_overlay(
        frame,
        " Export ",
        "No citas to export.",
        "Press any key to continue",
    );
}

fn render_confirm_overlay(frame: &mut Frame, title: &str, message: &str, hint: &str) {
    let area = centered_rect_fixed(40, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(format!("  {}", message), styles::help_desc_style())),
        Line::from(""),
        Line::from(Span::styled(format!("  {}", hint), styles::muted_style())),
    ];

    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Fixed-size rectangle centered in `r`, clamped to its bounds
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let width = width.min(r.width);
    let height = height.min(r.height);
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
