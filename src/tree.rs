//! Review tree built from the flat list a dry run returns.
//!
//! Entries are folded into a forest keyed by their `/`-normalized path. A
//! directory implied by a deeper path is synthesized once and reused; the
//! first entry to create a path decides its attributes.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Write;

use crate::diagnostic::{DiagnosticEntry, MatchInfo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    pub path: String,
    pub is_dir: bool,
    pub matches: Vec<MatchInfo>,
    pub children: Vec<TreeNode>,
    /// Presentation only.
    pub expanded: bool,
    pub level: usize,
}

impl TreeNode {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Number of nodes in this subtree with at least one match.
    pub fn matched_count(&self) -> usize {
        let own = usize::from(!self.matches.is_empty());
        own + self.children.iter().map(TreeNode::matched_count).sum::<usize>()
    }
}

struct Slot {
    name: String,
    path: String,
    is_dir: bool,
    matches: Vec<MatchInfo>,
    children: Vec<usize>,
}

pub fn build_tree(entries: &[DiagnosticEntry]) -> Vec<TreeNode> {
    let mut arena: Vec<Slot> = Vec::new();
    let mut by_path: HashMap<String, usize> = HashMap::new();
    let mut roots: Vec<usize> = Vec::new();

    for entry in entries {
        let normalized = entry.path.replace('\\', "/");
        let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            log::debug!("Skipping diagnostic entry with empty path {:?}", entry.path);
            continue;
        }

        let mut current_path = String::new();
        let mut parent: Option<usize> = None;

        for (i, segment) in segments.iter().enumerate() {
            if !current_path.is_empty() {
                current_path.push('/');
            }
            current_path.push_str(segment);
            let is_leaf = i == segments.len() - 1;

            let slot = match by_path.get(&current_path) {
                Some(&slot) => slot,
                None => {
                    let slot = arena.len();
                    arena.push(Slot {
                        name: (*segment).to_string(),
                        path: current_path.clone(),
                        is_dir: if is_leaf { entry.is_dir } else { true },
                        matches: if is_leaf { entry.matches.clone() } else { Vec::new() },
                        children: Vec::new(),
                    });
                    by_path.insert(current_path.clone(), slot);
                    match parent {
                        Some(parent) => arena[parent].children.push(slot),
                        None => roots.push(slot),
                    }
                    slot
                }
            };
            parent = Some(slot);
        }
    }

    let mut forest: Vec<TreeNode> = roots
        .into_iter()
        .map(|root| assemble(&mut arena, root))
        .collect();
    sort_nodes(&mut forest);
    assign_levels(&mut forest, 0);
    forest
}

fn assemble(arena: &mut [Slot], slot: usize) -> TreeNode {
    let child_slots = std::mem::take(&mut arena[slot].children);
    let children = child_slots
        .into_iter()
        .map(|child| assemble(arena, child))
        .collect();

    let slot = &mut arena[slot];
    TreeNode {
        name: std::mem::take(&mut slot.name),
        path: std::mem::take(&mut slot.path),
        is_dir: slot.is_dir,
        matches: std::mem::take(&mut slot.matches),
        children,
        expanded: false,
        level: 0,
    }
}

/// Directories first, then by name ignoring case, with exact case as the
/// tie-break so the order is total.
fn compare_nodes(a: &TreeNode, b: &TreeNode) -> Ordering {
    b.is_dir
        .cmp(&a.is_dir)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        // Case-only ties put the lowercase spelling first.
        .then_with(|| b.name.cmp(&a.name))
}

fn sort_nodes(nodes: &mut [TreeNode]) {
    nodes.sort_by(compare_nodes);
    for node in nodes.iter_mut() {
        sort_nodes(&mut node.children);
    }
}

fn assign_levels(nodes: &mut [TreeNode], level: usize) {
    for node in nodes.iter_mut() {
        node.level = level;
        assign_levels(&mut node.children, level + 1);
    }
}

/// Nodes currently on screen: every root, plus the children of expanded
/// nodes, in display order.
pub fn visible_rows(forest: &[TreeNode]) -> Vec<&TreeNode> {
    fn walk<'a>(nodes: &'a [TreeNode], out: &mut Vec<&'a TreeNode>) {
        for node in nodes {
            out.push(node);
            if node.expanded {
                walk(&node.children, out);
            }
        }
    }

    let mut rows = Vec::new();
    walk(forest, &mut rows);
    rows
}

/// Flips `expanded` on the directory at `path`. Returns false when no such
/// directory exists.
pub fn toggle(forest: &mut [TreeNode], path: &str) -> bool {
    for node in forest.iter_mut() {
        if node.path == path {
            if !node.is_dir {
                return false;
            }
            node.expanded = !node.expanded;
            return true;
        }
        if path.starts_with(&format!("{}/", node.path)) {
            return toggle(&mut node.children, path);
        }
    }
    false
}

pub fn set_expanded_all(forest: &mut [TreeNode], expanded: bool) {
    for node in forest.iter_mut() {
        if node.is_dir {
            node.expanded = expanded;
        }
        set_expanded_all(&mut node.children, expanded);
    }
}

/// Indented plain-text listing of the whole forest.
pub fn render_text(forest: &[TreeNode]) -> String {
    fn walk(nodes: &[TreeNode], out: &mut String) {
        for node in nodes {
            let suffix = if node.is_dir { "/" } else { "" };
            let _ = write!(out, "{}{}{}", "  ".repeat(node.level), node.name, suffix);
            if !node.matches.is_empty() {
                let labels: Vec<String> = node.matches.iter().map(MatchInfo::label).collect();
                let _ = write!(out, "  [{}]", labels.join(", "));
            }
            out.push('\n');
            walk(&node.children, out);
        }
    }

    let mut out = String::new();
    walk(forest, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, is_dir: bool, matches: Vec<MatchInfo>) -> DiagnosticEntry {
        DiagnosticEntry {
            path: path.to_string(),
            is_dir,
            matches,
        }
    }

    fn names(nodes: &[TreeNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    fn assert_sorted_and_levelled(nodes: &[TreeNode], level: usize) {
        for pair in nodes.windows(2) {
            assert_ne!(compare_nodes(&pair[0], &pair[1]), Ordering::Greater);
        }
        for node in nodes {
            assert_eq!(node.level, level);
            assert_eq!(node.path.split('/').count() - 1, level);
            assert_sorted_and_levelled(&node.children, level + 1);
        }
    }

    #[test]
    fn deep_file_synthesizes_parent_directories() {
        let forest = build_tree(&[entry("a/b/c.txt", false, vec![])]);

        assert_eq!(forest.len(), 1);
        let a = &forest[0];
        assert_eq!((a.name.as_str(), a.is_dir, a.level), ("a", true, 0));
        let b = &a.children[0];
        assert_eq!((b.name.as_str(), b.path.as_str(), b.is_dir, b.level), ("b", "a/b", true, 1));
        let c = &b.children[0];
        assert_eq!((c.name.as_str(), c.path.as_str(), c.is_dir, c.level), ("c.txt", "a/b/c.txt", false, 2));
        assert!(c.children.is_empty());
    }

    #[test]
    fn backslashes_are_normalized() {
        let forest = build_tree(&[entry("src\\lib\\mod.rs", false, vec![])]);
        assert_eq!(forest[0].children[0].children[0].path, "src/lib/mod.rs");
    }

    #[test]
    fn directories_sort_before_files_then_by_name() {
        let forest = build_tree(&[
            entry("zeta.txt", false, vec![]),
            entry("Beta", true, vec![]),
            entry("alpha.txt", false, vec![]),
            entry("alpha", true, vec![]),
            entry("Alpha.txt", false, vec![]),
        ]);
        assert_eq!(names(&forest), vec!["alpha", "Beta", "alpha.txt", "Alpha.txt", "zeta.txt"]);
        assert_sorted_and_levelled(&forest, 0);
    }

    #[test]
    fn first_entry_for_a_path_wins() {
        let explicit = entry("docs", true, vec![MatchInfo::in_name("docs")]);
        let forest = build_tree(&[explicit.clone(), entry("docs/readme.md", false, vec![])]);
        assert_eq!(forest[0].matches, explicit.matches);
        assert_eq!(forest[0].children.len(), 1);

        // A synthesized directory keeps its empty attributes even when its own
        // entry arrives later.
        let forest = build_tree(&[entry("docs/readme.md", false, vec![]), explicit]);
        assert_eq!(forest.len(), 1);
        assert!(forest[0].is_dir);
        assert!(forest[0].matches.is_empty());
    }

    #[test]
    fn empty_segments_are_skipped() {
        let forest = build_tree(&[
            entry("", true, vec![]),
            entry("/lead//double/", true, vec![]),
        ]);
        assert_eq!(names(&forest), vec!["lead"]);
        assert_eq!(forest[0].children[0].path, "lead/double");
        assert!(forest[0].children[0].is_dir);
    }

    #[test]
    fn shared_prefixes_are_reused() {
        let forest = build_tree(&[
            entry("src", true, vec![]),
            entry("src/fuse.py", false, vec![MatchInfo::in_content("fuse", 3)]),
            entry("src/util", true, vec![]),
            entry("src/util/io.py", false, vec![]),
            entry("tests/test_fuse.py", false, vec![MatchInfo::in_content("fuse", 1)]),
        ]);
        assert_eq!(names(&forest), vec!["src", "tests"]);
        assert_eq!(names(&forest[0].children), vec!["util", "fuse.py"]);
        assert_eq!(forest[0].matched_count(), 1);
        assert_sorted_and_levelled(&forest, 0);
    }

    #[test]
    fn rows_follow_expansion() {
        let mut forest = build_tree(&[
            entry("a/b/c.txt", false, vec![]),
            entry("d.txt", false, vec![]),
        ]);
        let paths = |f: &[TreeNode]| -> Vec<String> {
            visible_rows(f).iter().map(|n| n.path.clone()).collect()
        };
        assert_eq!(paths(&forest), vec!["a", "d.txt"]);

        assert!(toggle(&mut forest, "a"));
        assert_eq!(paths(&forest), vec!["a", "a/b", "d.txt"]);

        assert!(toggle(&mut forest, "a/b"));
        assert_eq!(paths(&forest), vec!["a", "a/b", "a/b/c.txt", "d.txt"]);

        assert!(!toggle(&mut forest, "d.txt"));
        assert!(!toggle(&mut forest, "missing"));

        set_expanded_all(&mut forest, false);
        assert_eq!(paths(&forest), vec!["a", "d.txt"]);
    }

    #[test]
    fn text_rendering_indents_by_level() {
        let forest = build_tree(&[
            entry("src", true, vec![MatchInfo::in_name("src")]),
            entry("src/fuse.py", false, vec![MatchInfo::in_content("fuse", 2)]),
        ]);
        assert_eq!(render_text(&forest), "src/  [src]\n  fuse.py  [fuse x2]\n");
    }
}
