use std::fs;
use std::path::{Path, PathBuf};

use crate::error::DialogError;

/// Terminal stand-in for a native "choose folder" dialog.
///
/// Only directories are listed. Consuming the browser with [`select`] or
/// [`cancel`] ends the dialog; cancelling yields `None` and is not an error.
///
/// [`select`]: FolderBrowser::select
/// [`cancel`]: FolderBrowser::cancel
#[derive(Debug)]
pub struct FolderBrowser {
    current: PathBuf,
    entries: Vec<PathBuf>,
    selected: usize,
}

impl FolderBrowser {
    /// Opens at `start`, or at the working directory when `start` is empty
    /// or not a directory.
    pub fn open(start: &Path) -> Result<Self, DialogError> {
        let current = if start.is_dir() {
            start.to_path_buf()
        } else {
            std::env::current_dir().map_err(|source| DialogError {
                path: start.to_path_buf(),
                source,
            })?
        };
        let entries = list_dirs(&current)?;
        Ok(Self {
            current,
            entries,
            selected: 0,
        })
    }

    pub fn current(&self) -> &Path {
        &self.current
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn highlighted(&self) -> Option<&Path> {
        self.entries.get(self.selected).map(PathBuf::as_path)
    }

    pub fn next(&mut self) {
        if !self.entries.is_empty() {
            self.selected = (self.selected + 1) % self.entries.len();
        }
    }

    pub fn previous(&mut self) {
        if !self.entries.is_empty() {
            self.selected = self
                .selected
                .checked_sub(1)
                .unwrap_or(self.entries.len() - 1);
        }
    }

    /// Enters the highlighted folder. On failure the browser stays where it was.
    pub fn descend(&mut self) -> Result<(), DialogError> {
        let Some(target) = self.highlighted().map(Path::to_path_buf) else {
            return Ok(());
        };
        self.move_to(target)
    }

    /// Goes to the parent folder; a no-op at the filesystem root.
    pub fn up(&mut self) -> Result<(), DialogError> {
        let Some(parent) = self.current.parent().map(Path::to_path_buf) else {
            return Ok(());
        };
        let previous = self.current.clone();
        self.move_to(parent)?;
        if let Some(index) = self.entries.iter().position(|entry| *entry == previous) {
            self.selected = index;
        }
        Ok(())
    }

    /// Picks the folder currently shown.
    pub fn select(self) -> Option<PathBuf> {
        log::debug!("Folder selected: {}", self.current.display());
        Some(self.current)
    }

    pub fn cancel(self) -> Option<PathBuf> {
        None
    }

    fn move_to(&mut self, target: PathBuf) -> Result<(), DialogError> {
        self.entries = list_dirs(&target)?;
        self.current = target;
        self.selected = 0;
        Ok(())
    }
}

fn list_dirs(dir: &Path) -> Result<Vec<PathBuf>, DialogError> {
    let read = fs::read_dir(dir).map_err(|source| DialogError {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut dirs: Vec<PathBuf> = read
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort_by_key(|path| {
        path.file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    });
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("beta/inner")).unwrap();
        fs::create_dir(dir.path().join("Alpha")).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        dir
    }

    fn names(browser: &FolderBrowser) -> Vec<String> {
        browser
            .entries()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn lists_only_folders_sorted_case_insensitively() {
        let dir = sample();
        let browser = FolderBrowser::open(dir.path()).unwrap();
        assert_eq!(names(&browser), vec!["Alpha", "beta"]);
    }

    #[test]
    fn descend_then_up_returns_to_the_same_row() {
        let dir = sample();
        let mut browser = FolderBrowser::open(dir.path()).unwrap();
        browser.next();
        browser.descend().unwrap();
        assert_eq!(browser.current(), dir.path().join("beta"));
        assert_eq!(names(&browser), vec!["inner"]);

        browser.up().unwrap();
        assert_eq!(browser.current(), dir.path());
        assert_eq!(browser.selected_index(), 1);
    }

    #[test]
    fn select_returns_the_current_folder() {
        let dir = sample();
        let mut browser = FolderBrowser::open(dir.path()).unwrap();
        browser.descend().unwrap();
        assert_eq!(browser.select(), Some(dir.path().join("Alpha")));
    }

    #[test]
    fn cancel_is_not_an_error() {
        let dir = sample();
        let browser = FolderBrowser::open(dir.path()).unwrap();
        assert_eq!(browser.cancel(), None);
    }

    #[test]
    fn vanished_folder_is_a_dialog_error() {
        let dir = sample();
        let mut browser = FolderBrowser::open(dir.path()).unwrap();
        fs::remove_dir(dir.path().join("Alpha")).unwrap();

        let err = browser.descend().unwrap_err();
        assert_eq!(err.path, dir.path().join("Alpha"));
        assert_eq!(browser.current(), dir.path());
    }

    #[test]
    fn wraps_around_when_moving() {
        let dir = sample();
        let mut browser = FolderBrowser::open(dir.path()).unwrap();
        browser.previous();
        assert_eq!(browser.selected_index(), 1);
        browser.next();
        assert_eq!(browser.selected_index(), 0);
    }
}
