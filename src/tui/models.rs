#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Onboarding,
    Settings,
    Diagnose,
    Process,
    Result,
}

impl Screen {
    pub fn title(self) -> &'static str {
        match self {
            Screen::Onboarding => "Welcome",
            Screen::Settings => "Settings",
            Screen::Diagnose => "Dry run",
            Screen::Process => "Processing",
            Screen::Result => "Result",
        }
    }

    /// 1-based position shown in the header.
    pub fn step(self) -> usize {
        match self {
            Screen::Onboarding => 1,
            Screen::Settings => 2,
            Screen::Diagnose => 3,
            Screen::Process => 4,
            Screen::Result => 5,
        }
    }

    pub const COUNT: usize = 5;
}

/// Focusable rows of the settings form, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    Source,
    Destination,
    CreateSubfolder,
    UseTimestamp,
    FolderName,
    Variants,
    Rename,
    Pairs,
}

impl SettingsField {
    pub const ALL: [SettingsField; 8] = [
        SettingsField::Source,
        SettingsField::Destination,
        SettingsField::CreateSubfolder,
        SettingsField::UseTimestamp,
        SettingsField::FolderName,
        SettingsField::Variants,
        SettingsField::Rename,
        SettingsField::Pairs,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SettingsField::Source => "Source folder",
            SettingsField::Destination => "Destination folder",
            SettingsField::CreateSubfolder => "Create subfolder",
            SettingsField::UseTimestamp => "Timestamp folder name",
            SettingsField::FolderName => "Folder name",
            SettingsField::Variants => "Case variants",
            SettingsField::Rename => "Rename files and folders",
            SettingsField::Pairs => "Word pairs",
        }
    }

    pub fn is_text(self) -> bool {
        matches!(
            self,
            SettingsField::Source | SettingsField::Destination | SettingsField::FolderName
        )
    }

    pub fn is_folder(self) -> bool {
        matches!(self, SettingsField::Source | SettingsField::Destination)
    }

    pub fn next(self) -> Self {
        let index = Self::position(self);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        let index = Self::position(self);
        Self::ALL[(index + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    fn position(field: SettingsField) -> usize {
        Self::ALL.iter().position(|f| *f == field).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairColumn {
    Old,
    New,
}

impl PairColumn {
    pub fn toggle(self) -> Self {
        match self {
            PairColumn::Old => PairColumn::New,
            PairColumn::New => PairColumn::Old,
        }
    }
}

/// Which settings field an open folder browser will fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseTarget {
    Source,
    Destination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_wraps_both_ways() {
        assert_eq!(SettingsField::Pairs.next(), SettingsField::Source);
        assert_eq!(SettingsField::Source.previous(), SettingsField::Pairs);
        assert_eq!(SettingsField::Source.next(), SettingsField::Destination);
    }
}
