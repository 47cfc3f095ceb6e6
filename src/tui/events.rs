use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use robber_rename::orchestrator::{WizardOrchestrator, WizardState};
use robber_rename::LocalEngine;

use super::app::App;
use super::models::{Screen, SettingsField};
use super::rendering::ui;

pub async fn run_tui(orchestrator: WizardOrchestrator<LocalEngine>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(orchestrator);
    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        log::error!("Wizard stopped: {err}");
    }
    Ok(res?)
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        app.clear_status_message_if_expired();
        app.on_tick();

        terminal.draw(|f| ui(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }

        // Let the runtime make progress between frames.
        tokio::task::yield_now().await;
    }
}

pub fn handle_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.request_quit();
        return;
    }
    if app.show_help {
        if matches!(key.code, KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('?')) {
            app.toggle_help();
        }
        return;
    }
    if app.browser.is_some() {
        handle_browser_key(app, key);
        return;
    }
    if key.code == KeyCode::F(1) {
        app.toggle_help();
        return;
    }

    match app.screen {
        Screen::Onboarding => handle_onboarding_key(app, key),
        Screen::Settings => handle_settings_key(app, key),
        Screen::Diagnose => handle_diagnose_key(app, key),
        Screen::Process => handle_process_key(app, key),
        Screen::Result => handle_result_key(app, key),
    }
}

fn handle_onboarding_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.open_settings(),
        KeyCode::Char('?') => app.toggle_help(),
        KeyCode::Char('q') | KeyCode::Esc => app.request_quit(),
        _ => {}
    }
}

fn handle_settings_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Folder picker works from either folder field.
    if (key.code == KeyCode::F(2) || (ctrl && key.code == KeyCode::Char('o'))) && app.field.is_folder() {
        app.open_browser();
        return;
    }

    if app.field == SettingsField::Pairs {
        handle_pairs_key(app, key);
        return;
    }

    match key.code {
        KeyCode::Tab | KeyCode::Down => app.focus_next(),
        KeyCode::BackTab | KeyCode::Up => app.focus_previous(),
        KeyCode::Enter => app.submit_settings(),
        KeyCode::Esc => app.screen = Screen::Onboarding,
        KeyCode::Backspace => app.backspace(),
        KeyCode::Char(' ') if !app.field.is_text() => app.toggle_focused(),
        KeyCode::Char(c) if app.field.is_text() && !ctrl => app.type_char(c),
        KeyCode::Char('q') => app.request_quit(),
        KeyCode::Char('?') => app.toggle_help(),
        _ => {}
    }
}

fn handle_pairs_key(app: &mut App, key: KeyEvent) {
    if app.editing_pair {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => app.toggle_pair_editing(),
            KeyCode::Tab | KeyCode::Left | KeyCode::Right => app.switch_pair_column(),
            KeyCode::Backspace => app.backspace(),
            KeyCode::Char(c) => app.type_char(c),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Down | KeyCode::Char('j') => app.next_pair(),
        KeyCode::Up | KeyCode::Char('k') => app.previous_pair(),
        KeyCode::Left | KeyCode::Right => app.switch_pair_column(),
        KeyCode::Char('e') => app.toggle_pair_editing(),
        KeyCode::Char('a') => app.add_pair(),
        KeyCode::Char('d') | KeyCode::Delete => app.remove_pair(),
        KeyCode::Char('g') => app.generate_variants(),
        KeyCode::Tab => app.focus_next(),
        KeyCode::BackTab => app.focus_previous(),
        KeyCode::Enter => app.submit_settings(),
        KeyCode::Esc => app.screen = Screen::Onboarding,
        KeyCode::Char('q') => app.request_quit(),
        KeyCode::Char('?') => app.toggle_help(),
        _ => {}
    }
}

fn handle_browser_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => app.browser_next(),
        KeyCode::Up | KeyCode::Char('k') => app.browser_previous(),
        KeyCode::Right | KeyCode::Char('l') => app.browser_descend(),
        KeyCode::Left | KeyCode::Backspace | KeyCode::Char('h') => app.browser_up(),
        KeyCode::Enter | KeyCode::Char('s') => app.browser_select(),
        KeyCode::Esc | KeyCode::Char('q') => app.browser_cancel(),
        _ => {}
    }
}

fn handle_diagnose_key(app: &mut App, key: KeyEvent) {
    if app.is_busy() {
        return;
    }
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => app.next_row(),
        KeyCode::Up | KeyCode::Char('k') => app.previous_row(),
        KeyCode::Char(' ') | KeyCode::Right | KeyCode::Left => app.toggle_selected_row(),
        KeyCode::Char('+') => app.expand_all(true),
        KeyCode::Char('-') => app.expand_all(false),
        KeyCode::Enter | KeyCode::Char('n') => {
            if app.orchestrator.state() == WizardState::Reviewing {
                app.start_processing();
            }
        }
        KeyCode::Esc | KeyCode::Char('b') => app.back_to_settings(),
        KeyCode::Char('q') => app.request_quit(),
        KeyCode::Char('?') => app.toggle_help(),
        _ => {}
    }
}

fn handle_process_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('r') if app.orchestrator.state() == WizardState::Failed => app.retry(),
        KeyCode::Char('q') => app.request_quit(),
        KeyCode::Char('?') => app.toggle_help(),
        _ => {}
    }
}

fn handle_result_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.finish(),
        KeyCode::Char('q') | KeyCode::Esc => app.request_quit(),
        _ => {}
    }
}
