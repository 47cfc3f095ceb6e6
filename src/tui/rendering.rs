use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Wrap},
    Frame,
};

use robber_rename::diagnostic::MatchInfo;
use robber_rename::orchestrator::WizardState;
use robber_rename::progress::Phase;
use robber_rename::tree::{self, TreeNode};

use super::app::App;
use super::centered_rect;
use super::models::{PairColumn, Screen, SettingsField};

pub fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, chunks[0], app);
    match app.screen {
        Screen::Onboarding => render_onboarding(f, chunks[1]),
        Screen::Settings => render_settings(f, chunks[1], app),
        Screen::Diagnose => render_diagnose(f, chunks[1], app),
        Screen::Process => render_process(f, chunks[1], app),
        Screen::Result => render_result(f, chunks[1], app),
    }
    render_status_bar(f, chunks[2], app);

    if app.browser.is_some() {
        render_browser_popup(f, app);
    }
    if app.show_help {
        render_help_popup(f);
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let title = format!(
        "Robber Rename - Step {}/{}: {}",
        app.screen.step(),
        Screen::COUNT,
        app.screen.title()
    );
    let header = Paragraph::new(title)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );
    f.render_widget(header, area);
}

fn render_onboarding(f: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(Span::styled(
            "Copy a project and swap words across it",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("1. Pick a source folder and where the copy should go."),
        Line::from("2. List the Old -> New word pairs, optionally with case variants."),
        Line::from("3. Review a dry run showing every file and folder that matches."),
        Line::from("4. Run it: the copy is rewritten and, if asked, renamed."),
        Line::from(""),
        Line::from("The source folder is never modified."),
        Line::from(""),
        Line::from(Span::styled("Press Enter to begin", Style::default().fg(Color::Yellow))),
    ];
    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Gray)
    }
}

fn checkbox(on: bool) -> &'static str {
    if on { "[x]" } else { "[ ]" }
}

fn render_settings(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Min(5),
            Constraint::Length(if app.validation_error.is_some() { 3 } else { 0 }),
        ])
        .split(area);

    for (index, field) in [SettingsField::Source, SettingsField::Destination].into_iter().enumerate() {
        let focused = app.field == field;
        let value = match field {
            SettingsField::Source => &app.form.source,
            _ => &app.form.destination,
        };
        let cursor = if focused { "_" } else { "" };
        let input = Paragraph::new(format!("{value}{cursor}"))
            .style(focus_style(focused))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("{} (F2 to browse)", field.label()))
                    .border_style(focus_style(focused)),
            );
        f.render_widget(input, chunks[index]);
    }

    let options: Vec<Line> = [
        (SettingsField::CreateSubfolder, app.form.create_subfolder),
        (SettingsField::UseTimestamp, app.form.use_timestamp),
        (SettingsField::Variants, app.form.variants),
        (SettingsField::Rename, app.form.rename),
    ]
    .into_iter()
    .map(|(field, on)| {
        Line::from(Span::styled(
            format!("{} {}", checkbox(on), field.label()),
            focus_style(app.field == field),
        ))
    })
    .chain(std::iter::once({
        let focused = app.field == SettingsField::FolderName;
        let name = if app.form.folder_name.is_empty() && !focused {
            "(source folder name)".to_string()
        } else {
            format!("{}{}", app.form.folder_name, if focused { "_" } else { "" })
        };
        Line::from(Span::styled(
            format!("    {}: {name}", SettingsField::FolderName.label()),
            focus_style(focused),
        ))
    }))
    .collect();
    let options_focused = !matches!(
        app.field,
        SettingsField::Source | SettingsField::Destination | SettingsField::Pairs
    );
    let options = Paragraph::new(options).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Options")
            .border_style(focus_style(options_focused)),
    );
    f.render_widget(options, chunks[2]);

    render_pairs(f, chunks[3], app);

    if let Some(error) = &app.validation_error {
        let error = Paragraph::new(error.as_str())
            .style(Style::default().fg(Color::Red))
            .block(Block::default().borders(Borders::ALL).title("Cannot continue"));
        f.render_widget(error, chunks[4]);
    }
}

fn render_pairs(f: &mut Frame, area: Rect, app: &App) {
    let focused = app.field == SettingsField::Pairs;
    let selected = app.selected_pair();

    let items: Vec<ListItem> = app
        .form
        .pairs
        .iter()
        .enumerate()
        .map(|(index, pair)| {
            let active = focused && index == selected;
            let cell = |text: &str, column: PairColumn| {
                let editing = active && app.editing_pair && app.pair_column == column;
                let style = if editing {
                    Style::default().fg(Color::Black).bg(Color::Yellow)
                } else if active && app.pair_column == column {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::UNDERLINED)
                } else {
                    Style::default()
                };
                let shown = if text.is_empty() { "<empty>" } else { text };
                Span::styled(format!("{shown:<24}"), style)
            };
            ListItem::new(Line::from(vec![
                Span::raw(format!("{:>3}. ", index + 1)),
                cell(&pair.old, PairColumn::Old),
                Span::raw(" -> "),
                cell(&pair.new, PairColumn::New),
            ]))
        })
        .collect();

    let title = if focused && app.editing_pair {
        "Word pairs - editing (Tab switches column, Enter done)"
    } else {
        "Word pairs (e edit, a add, d delete, g case variants)"
    };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(focus_style(focused)),
        )
        .highlight_symbol(if focused { "> " } else { "  " });

    let mut state = app.pair_state.clone();
    f.render_stateful_widget(list, area, &mut state);
}

fn progress_gauge(title: &str, percent: u8, failed: bool) -> Gauge<'_> {
    let color = if failed { Color::Red } else { Color::Green };
    Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .gauge_style(Style::default().fg(color))
        .percent(u16::from(percent))
        .label(format!("{percent}%"))
}

fn render_diagnose(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(area);

    let failed = app.orchestrator.state() == WizardState::Idle && !app.orchestrator.error().is_empty();
    f.render_widget(
        progress_gauge("Scanning", app.progress(Phase::Diagnose), failed),
        chunks[0],
    );

    if app.is_busy() {
        let waiting = Paragraph::new("Scanning the source folder...")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(waiting, chunks[1]);
        return;
    }

    if failed {
        let error = Paragraph::new(vec![
            Line::from(Span::styled(
                app.orchestrator.error().to_string(),
                Style::default().fg(Color::Red),
            )),
            Line::from(""),
            Line::from("Press Esc to return to the settings and try again."),
        ])
        .block(Block::default().borders(Borders::ALL).title("Dry run failed"))
        .wrap(Wrap { trim: true });
        f.render_widget(error, chunks[1]);
        return;
    }

    let rows = tree::visible_rows(&app.tree);
    let matched: usize = app.tree.iter().map(TreeNode::matched_count).sum();
    let items: Vec<ListItem> = rows.iter().map(|node| tree_row(node)).collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Review: {matched} matching entries (Enter to run, Esc to edit)")),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

    let mut state = app.tree_state.clone();
    f.render_stateful_widget(list, chunks[1], &mut state);
}

fn tree_row(node: &TreeNode) -> ListItem<'static> {
    let marker = match (node.is_dir, node.has_children(), node.expanded) {
        (true, true, true) => "v ",
        (true, true, false) => "> ",
        _ => "  ",
    };
    let name_style = if node.matches.is_empty() {
        Style::default()
    } else {
        Style::default().fg(Color::Yellow)
    };
    let name = if node.is_dir {
        format!("{}/", node.name)
    } else {
        node.name.clone()
    };

    let mut spans = vec![
        Span::raw("  ".repeat(node.level)),
        Span::raw(marker),
        Span::styled(name, name_style),
    ];
    if !node.matches.is_empty() {
        let labels: Vec<String> = node.matches.iter().map(MatchInfo::label).collect();
        spans.push(Span::styled(
            format!("  [{}]", labels.join(", ")),
            Style::default().fg(Color::DarkGray),
        ));
    }
    ListItem::new(Line::from(spans))
}

fn render_process(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let failed = app.orchestrator.state() == WizardState::Failed;
    f.render_widget(
        progress_gauge("Copying and rewriting", app.progress(Phase::Execute), failed),
        chunks[0],
    );

    let body = if failed {
        Text::from(vec![
            Line::from(Span::styled(
                app.orchestrator.error().to_string(),
                Style::default().fg(Color::Red),
            )),
            Line::from(""),
            Line::from("Press r to run again from the start."),
        ])
    } else {
        Text::from(format!("Writing into {}", app.destination().display()))
    };
    let paragraph = Paragraph::new(body)
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, chunks[1]);
}

fn render_result(f: &mut Frame, area: Rect, app: &App) {
    let summary = app.result_summary().unwrap_or_default();
    let text = vec![
        Line::from(Span::styled(
            "Done",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(summary),
        Line::from(format!("Output under {}", app.destination().display())),
        Line::from(""),
        Line::from(Span::styled(
            "Press Enter to start over or q to quit",
            Style::default().fg(Color::Gray),
        )),
    ];
    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let text = match &app.status_message {
        Some(message) => Span::styled(message.clone(), Style::default().fg(Color::Yellow)),
        None => Span::styled(key_hints(app), Style::default().fg(Color::Gray)),
    };
    let bar = Paragraph::new(Line::from(text)).block(Block::default().borders(Borders::ALL));
    f.render_widget(bar, area);
}

fn key_hints(app: &App) -> &'static str {
    match app.screen {
        Screen::Onboarding => "Enter: start | ?: help | q: quit",
        Screen::Settings => "Tab/Up/Down: move | Space: toggle | F2: browse | Enter: dry run | Esc: back",
        Screen::Diagnose => "Up/Down: move | Space: expand | +/-: all | Enter: run | Esc: edit",
        Screen::Process => "r: retry after a failure | q: quit",
        Screen::Result => "Enter: start over | q: quit",
    }
}

fn render_browser_popup(f: &mut Frame, app: &App) {
    let Some((_, browser)) = &app.browser else {
        return;
    };
    let area = centered_rect(70, 60, f.area());

    let items: Vec<ListItem> = browser
        .entries()
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            ListItem::new(format!("{name}/"))
        })
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} (Enter select, Right open, Left up, Esc cancel)", browser.current().display()))
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ratatui::widgets::ListState::default();
    if !browser.entries().is_empty() {
        state.select(Some(browser.selected_index()));
    }
    f.render_widget(Clear, area);
    f.render_stateful_widget(list, area, &mut state);
}

fn render_help_popup(f: &mut Frame) {
    let popup_area = centered_rect(60, 70, f.area());

    let help_text = vec![
        Line::from(vec![Span::styled(
            "Robber Rename - Help",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from("Settings:"),
        Line::from("  Tab/Up/Down - Move between fields"),
        Line::from("  Space       - Toggle an option"),
        Line::from("  F2 / Ctrl+O - Browse for a folder"),
        Line::from("  Enter       - Save and start the dry run"),
        Line::from(""),
        Line::from("Word pairs:"),
        Line::from("  e           - Edit the selected cell"),
        Line::from("  a / d       - Add / delete a pair"),
        Line::from("  g           - Add lowercase and uppercase variants"),
        Line::from(""),
        Line::from("Review:"),
        Line::from("  Space       - Expand or collapse a folder"),
        Line::from("  + / -       - Expand or collapse everything"),
        Line::from("  Enter       - Run on the matching files"),
        Line::from(""),
        Line::from("  r           - Retry a failed run"),
        Line::from("  q / Ctrl+C  - Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press Esc or ? to close",
            Style::default().fg(Color::Gray),
        )]),
    ];

    let paragraph = Paragraph::new(help_text)
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .wrap(Wrap { trim: true });

    f.render_widget(Clear, popup_area);
    f.render_widget(paragraph, popup_area);
}
