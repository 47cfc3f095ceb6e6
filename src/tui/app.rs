use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ratatui::widgets::ListState;

use robber_rename::config::{ConfigPatch, ProcessConfig};
use robber_rename::folder_browser::FolderBrowser;
use robber_rename::orchestrator::{WizardEvent, WizardOrchestrator, WizardState};
use robber_rename::progress::Phase;
use robber_rename::tree::{self, TreeNode};
use robber_rename::word_pair::{expand_variants, WordPair};
use robber_rename::LocalEngine;

use super::models::{BrowseTarget, PairColumn, Screen, SettingsField};

const STATUS_TTL: Duration = Duration::from_secs(3);

/// Editable copy of the settings; written to the store on submit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsForm {
    pub source: String,
    pub destination: String,
    pub folder_name: String,
    pub create_subfolder: bool,
    pub use_timestamp: bool,
    pub variants: bool,
    pub rename: bool,
    pub pairs: Vec<WordPair>,
}

impl SettingsForm {
    pub fn from_config(config: &ProcessConfig) -> Self {
        let mut pairs = config.pairs.clone();
        if pairs.is_empty() {
            pairs.push(WordPair::default());
        }
        Self {
            source: config.source.display().to_string(),
            destination: config.destination.display().to_string(),
            folder_name: config.folder_name.clone().unwrap_or_default(),
            create_subfolder: config.create_subfolder,
            use_timestamp: config.use_timestamp,
            variants: config.variants,
            rename: config.rename,
            pairs,
        }
    }

    /// Also clears any scope left over from an earlier dry run.
    pub fn to_patch(&self) -> ConfigPatch {
        let folder_name = Some(self.folder_name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        ConfigPatch::default()
            .source(self.source.trim())
            .destination(self.destination.trim())
            .folder_name(folder_name)
            .create_subfolder(self.create_subfolder)
            .use_timestamp(self.use_timestamp)
            .variants(self.variants)
            .rename(self.rename)
            .pairs(self.pairs.clone())
            .filter_paths(None)
    }

    fn text_mut(&mut self, field: SettingsField) -> Option<&mut String> {
        match field {
            SettingsField::Source => Some(&mut self.source),
            SettingsField::Destination => Some(&mut self.destination),
            SettingsField::FolderName => Some(&mut self.folder_name),
            _ => None,
        }
    }
}

pub struct App {
    pub screen: Screen,
    pub orchestrator: WizardOrchestrator<LocalEngine>,
    pub form: SettingsForm,
    pub field: SettingsField,
    pub pair_state: ListState,
    pub pair_column: PairColumn,
    pub editing_pair: bool,
    pub validation_error: Option<String>,
    pub tree: Vec<TreeNode>,
    pub tree_state: ListState,
    pub browser: Option<(BrowseTarget, FolderBrowser)>,
    pub show_help: bool,
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,
    pub should_quit: bool,
}

impl App {
    pub fn new(orchestrator: WizardOrchestrator<LocalEngine>) -> Self {
        let form = SettingsForm::from_config(&orchestrator.store().config());
        let mut pair_state = ListState::default();
        pair_state.select(Some(0));

        Self {
            screen: Screen::Onboarding,
            orchestrator,
            form,
            field: SettingsField::Source,
            pair_state,
            pair_column: PairColumn::Old,
            editing_pair: false,
            validation_error: None,
            tree: Vec::new(),
            tree_state: ListState::default(),
            browser: None,
            show_help: false,
            status_message: None,
            status_message_time: None,
            should_quit: false,
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some(message);
        self.status_message_time = Some(Instant::now());
    }

    pub fn clear_status_message_if_expired(&mut self) {
        if let (Some(_), Some(time)) = (&self.status_message, self.status_message_time) {
            if time.elapsed() > STATUS_TTL {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.orchestrator.loading()
    }

    pub fn progress(&self, phase: Phase) -> u8 {
        self.orchestrator.store().progress(phase)
    }

    pub fn request_quit(&mut self) {
        if self.is_busy() {
            self.set_status_message("Wait for the current phase to finish".to_string());
        } else {
            self.should_quit = true;
        }
    }

    /// Called once per frame; applies progress and finished phases.
    pub fn on_tick(&mut self) {
        if let Some(event) = self.orchestrator.pump() {
            self.handle_wizard_event(event);
        }
    }

    fn handle_wizard_event(&mut self, event: WizardEvent) {
        match event {
            WizardEvent::DiagnosisCompleted { entries, matched } => {
                let report = self.orchestrator.store().diagnostic().unwrap_or_default();
                self.tree = tree::build_tree(&report);
                self.tree_state.select(if self.tree.is_empty() { None } else { Some(0) });
                self.set_status_message(format!("{matched} of {entries} entries contain a match"));
            }
            WizardEvent::DiagnosisFailed(message) => {
                self.set_status_message(format!("Dry run failed: {message}"));
            }
            WizardEvent::ExecutionCompleted(_) => {
                self.screen = Screen::Result;
            }
            WizardEvent::ExecutionFailed(message) => {
                self.set_status_message(format!("Run failed: {message}"));
            }
        }
    }

    // Onboarding

    pub fn open_settings(&mut self) {
        self.form = SettingsForm::from_config(&self.orchestrator.store().config());
        self.field = SettingsField::Source;
        self.editing_pair = false;
        self.validation_error = None;
        self.pair_state.select(Some(0));
        self.screen = Screen::Settings;
    }

    // Settings

    pub fn focus_next(&mut self) {
        self.editing_pair = false;
        self.field = self.field.next();
    }

    pub fn focus_previous(&mut self) {
        self.editing_pair = false;
        self.field = self.field.previous();
    }

    pub fn type_char(&mut self, c: char) {
        if self.field == SettingsField::Pairs {
            if let Some(cell) = self.editing_cell() {
                cell.push(c);
            }
        } else if let Some(text) = self.form.text_mut(self.field) {
            text.push(c);
        }
        self.validation_error = None;
    }

    pub fn backspace(&mut self) {
        if self.field == SettingsField::Pairs {
            if let Some(cell) = self.editing_cell() {
                cell.pop();
            }
        } else if let Some(text) = self.form.text_mut(self.field) {
            text.pop();
        }
    }

    pub fn toggle_focused(&mut self) {
        let flag = match self.field {
            SettingsField::CreateSubfolder => &mut self.form.create_subfolder,
            SettingsField::UseTimestamp => &mut self.form.use_timestamp,
            SettingsField::Variants => &mut self.form.variants,
            SettingsField::Rename => &mut self.form.rename,
            _ => return,
        };
        *flag = !*flag;
    }

    pub fn selected_pair(&self) -> usize {
        self.pair_state.selected().unwrap_or(0)
    }

    pub fn next_pair(&mut self) {
        if !self.form.pairs.is_empty() {
            let next = (self.selected_pair() + 1) % self.form.pairs.len();
            self.pair_state.select(Some(next));
        }
    }

    pub fn previous_pair(&mut self) {
        if !self.form.pairs.is_empty() {
            let len = self.form.pairs.len();
            let previous = (self.selected_pair() + len - 1) % len;
            self.pair_state.select(Some(previous));
        }
    }

    pub fn switch_pair_column(&mut self) {
        self.pair_column = self.pair_column.toggle();
    }

    pub fn toggle_pair_editing(&mut self) {
        if self.form.pairs.is_empty() {
            self.add_pair();
        }
        self.editing_pair = !self.editing_pair;
    }

    pub fn add_pair(&mut self) {
        self.form.pairs.push(WordPair::default());
        self.pair_state.select(Some(self.form.pairs.len() - 1));
        self.pair_column = PairColumn::Old;
        self.editing_pair = true;
    }

    pub fn remove_pair(&mut self) {
        let index = self.selected_pair();
        if index < self.form.pairs.len() {
            self.form.pairs.remove(index);
        }
        let last = self.form.pairs.len().checked_sub(1);
        self.pair_state.select(last.map(|last| index.min(last)).or(Some(0)));
        self.editing_pair = false;
    }

    /// Replaces the pair list with its expanded case variants.
    pub fn generate_variants(&mut self) {
        let before = self.form.pairs.len();
        self.form.pairs = expand_variants(&self.form.pairs);
        self.pair_state.select(Some(0));
        self.editing_pair = false;
        self.set_status_message(format!(
            "Generated {} pairs from {}",
            self.form.pairs.len(),
            before
        ));
    }

    fn editing_cell(&mut self) -> Option<&mut String> {
        if !self.editing_pair {
            return None;
        }
        let column = self.pair_column;
        let index = self.selected_pair();
        self.form.pairs.get_mut(index).map(|pair| match column {
            PairColumn::Old => &mut pair.old,
            PairColumn::New => &mut pair.new,
        })
    }

    pub fn open_browser(&mut self) {
        let (target, current) = match self.field {
            SettingsField::Source => (BrowseTarget::Source, self.form.source.clone()),
            SettingsField::Destination => (BrowseTarget::Destination, self.form.destination.clone()),
            _ => return,
        };
        match FolderBrowser::open(Path::new(current.trim())) {
            Ok(browser) => self.browser = Some((target, browser)),
            Err(err) => self.set_status_message(err.to_string()),
        }
    }

    pub fn browser_next(&mut self) {
        if let Some((_, browser)) = self.browser.as_mut() {
            browser.next();
        }
    }

    pub fn browser_previous(&mut self) {
        if let Some((_, browser)) = self.browser.as_mut() {
            browser.previous();
        }
    }

    pub fn browser_descend(&mut self) {
        let result = match self.browser.as_mut() {
            Some((_, browser)) => browser.descend(),
            None => return,
        };
        if let Err(err) = result {
            self.set_status_message(err.to_string());
        }
    }

    pub fn browser_up(&mut self) {
        let result = match self.browser.as_mut() {
            Some((_, browser)) => browser.up(),
            None => return,
        };
        if let Err(err) = result {
            self.set_status_message(err.to_string());
        }
    }

    pub fn browser_select(&mut self) {
        if let Some((target, browser)) = self.browser.take() {
            if let Some(path) = browser.select() {
                self.set_folder(target, &path);
            }
        }
    }

    pub fn browser_cancel(&mut self) {
        if let Some((_, browser)) = self.browser.take() {
            let _ = browser.cancel();
        }
    }

    fn set_folder(&mut self, target: BrowseTarget, path: &Path) {
        let text = path.display().to_string();
        match target {
            BrowseTarget::Source => self.form.source = text,
            BrowseTarget::Destination => self.form.destination = text,
        }
        self.validation_error = None;
    }

    /// Saves the form and starts the dry run.
    pub fn submit_settings(&mut self) {
        self.editing_pair = false;
        let patch = self.form.to_patch();
        let mut candidate = self.orchestrator.store().config();
        candidate.apply(patch.clone());
        if let Err(err) = candidate.validate() {
            self.validation_error = Some(err.to_string());
            return;
        }
        self.orchestrator.store().update_config(patch);

        self.validation_error = None;
        self.tree.clear();
        self.tree_state.select(None);
        match self.orchestrator.start_diagnose() {
            Ok(()) => self.screen = Screen::Diagnose,
            Err(err) => self.validation_error = Some(err.to_string()),
        }
    }

    // Diagnose

    pub fn visible_row_count(&self) -> usize {
        tree::visible_rows(&self.tree).len()
    }

    pub fn next_row(&mut self) {
        let count = self.visible_row_count();
        if count > 0 {
            let next = self.tree_state.selected().map_or(0, |i| (i + 1) % count);
            self.tree_state.select(Some(next));
        }
    }

    pub fn previous_row(&mut self) {
        let count = self.visible_row_count();
        if count > 0 {
            let previous = self
                .tree_state
                .selected()
                .map_or(0, |i| (i + count - 1) % count);
            self.tree_state.select(Some(previous));
        }
    }

    pub fn toggle_selected_row(&mut self) {
        let path = self.tree_state.selected().and_then(|index| {
            tree::visible_rows(&self.tree)
                .get(index)
                .map(|node| node.path.clone())
        });
        if let Some(path) = path {
            tree::toggle(&mut self.tree, &path);
        }
    }

    pub fn expand_all(&mut self, expanded: bool) {
        tree::set_expanded_all(&mut self.tree, expanded);
        let count = self.visible_row_count();
        if let Some(selected) = self.tree_state.selected() {
            self.tree_state.select(Some(selected.min(count.saturating_sub(1))));
        }
    }

    /// Drops the dry run and goes back to editing.
    pub fn back_to_settings(&mut self) {
        if self.is_busy() {
            self.set_status_message("Wait for the dry run to finish".to_string());
            return;
        }
        if let Err(err) = self.orchestrator.reset() {
            self.set_status_message(err.to_string());
            return;
        }
        self.tree.clear();
        self.open_settings();
    }

    pub fn start_processing(&mut self) {
        match self.orchestrator.advance() {
            Ok(()) => self.screen = Screen::Process,
            Err(err) => self.set_status_message(err.to_string()),
        }
    }

    // Process

    pub fn retry(&mut self) {
        if let Err(err) = self.orchestrator.retry() {
            self.set_status_message(err.to_string());
        }
    }

    // Result

    pub fn finish(&mut self) {
        if self.orchestrator.state() != WizardState::Done {
            return;
        }
        if let Err(err) = self.orchestrator.reset() {
            self.set_status_message(err.to_string());
            return;
        }
        self.tree.clear();
        self.tree_state.select(None);
        self.screen = Screen::Onboarding;
    }

    pub fn result_summary(&self) -> Option<String> {
        self.orchestrator.store().result()
    }

    pub fn destination(&self) -> PathBuf {
        self.orchestrator.store().config().destination
    }
}
