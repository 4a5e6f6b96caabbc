//! Phase tree view state and its reconciliation against new snapshots.

use std::collections::{HashMap, HashSet};

use runwatch_types::{Phase, Snapshot};

/// One visible line of the phase tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseRow {
    pub phase_id: String,
    pub depth: usize,
    pub has_children: bool,
    pub expanded: bool,
    pub stage_text: &'static str,
    /// Content differs from the previously displayed snapshot
    pub changed: bool,
}

/// Render-ready state of the phase tree widget.
///
/// Holds user interaction state (expansion, selection) next to the tree it
/// was computed for, so the next snapshot can be diffed by `phase_id`.
#[derive(Debug, Clone, Default)]
pub struct PhaseViewState {
    tree: Option<Phase>,
    expanded: HashSet<String>,
    selected: Option<String>,
    parents: HashMap<String, Option<String>>,
    changed: HashSet<String>,
    structure_changed: bool,
    rows: Vec<PhaseRow>,
}

impl PhaseViewState {
    /// Initial state: every node expanded, root selected.
    pub fn new(snapshot: &Snapshot) -> Self {
        let root = &snapshot.root;
        let mut state = Self {
            expanded: root.walk().map(|p| p.phase_id.clone()).collect(),
            selected: Some(root.phase_id.clone()),
            parents: root.parent_map(),
            tree: Some(root.clone()),
            structure_changed: true,
            ..Self::default()
        };
        state.rebuild_rows();
        state
    }

    pub fn rows(&self) -> &[PhaseRow] {
        &self.rows
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_index(&self) -> Option<usize> {
        let selected = self.selected.as_deref()?;
        self.rows.iter().position(|r| r.phase_id == selected)
    }

    /// The selected phase in the tree this state was built for.
    pub fn selected_phase(&self) -> Option<&Phase> {
        let tree = self.tree.as_ref()?;
        tree.find(self.selected.as_deref()?)
    }

    pub fn is_root_selected(&self) -> bool {
        match (&self.tree, &self.selected) {
            (Some(tree), Some(selected)) => &tree.phase_id == selected,
            _ => true,
        }
    }

    pub fn is_expanded(&self, phase_id: &str) -> bool {
        self.expanded.contains(phase_id)
    }

    pub fn is_changed(&self, phase_id: &str) -> bool {
        self.changed.contains(phase_id)
    }

    /// Nodes were added, removed or reordered by the last reconcile.
    pub fn structure_changed(&self) -> bool {
        self.structure_changed
    }

    /// Select a phase by id. Collapsed ancestors are expanded so the
    /// selection stays visible.
    pub fn select(&mut self, phase_id: &str) -> bool {
        if !self.parents.contains_key(phase_id) {
            return false;
        }
        self.selected = Some(phase_id.to_string());
        self.reveal_selected();
        self.rebuild_rows();
        true
    }

    pub fn select_next(&mut self) -> bool {
        let next = match self.selected_index() {
            Some(i) if i + 1 < self.rows.len() => i + 1,
            Some(_) => return false,
            None if !self.rows.is_empty() => 0,
            None => return false,
        };
        self.selected = Some(self.rows[next].phase_id.clone());
        true
    }

    pub fn select_prev(&mut self) -> bool {
        match self.selected_index() {
            Some(i) if i > 0 => {
                self.selected = Some(self.rows[i - 1].phase_id.clone());
                true
            }
            _ => false,
        }
    }

    /// Expand or collapse the selected node. Leaves are left alone.
    pub fn toggle_expanded(&mut self) -> bool {
        let Some(phase) = self.selected_phase() else {
            return false;
        };
        if phase.children.is_empty() {
            return false;
        }
        let id = phase.phase_id.clone();
        if !self.expanded.remove(&id) {
            self.expanded.insert(id);
        }
        self.rebuild_rows();
        true
    }

    fn reveal_selected(&mut self) {
        let mut cursor = self
            .selected
            .as_ref()
            .and_then(|id| self.parents.get(id).cloned().flatten());
        while let Some(ancestor) = cursor {
            cursor = self.parents.get(&ancestor).cloned().flatten();
            self.expanded.insert(ancestor);
        }
    }

    fn rebuild_rows(&mut self) {
        let mut rows = Vec::new();
        if let Some(tree) = &self.tree {
            push_rows(tree, 0, &self.expanded, &self.changed, &mut rows);
        }
        self.rows = rows;
    }
}

fn push_rows(
    phase: &Phase,
    depth: usize,
    expanded: &HashSet<String>,
    changed: &HashSet<String>,
    rows: &mut Vec<PhaseRow>,
) {
    let is_expanded = expanded.contains(&phase.phase_id);
    rows.push(PhaseRow {
        phase_id: phase.phase_id.clone(),
        depth,
        has_children: !phase.children.is_empty(),
        expanded: is_expanded,
        stage_text: phase.stage_text(),
        changed: changed.contains(&phase.phase_id),
    });
    if is_expanded {
        for child in &phase.children {
            push_rows(child, depth + 1, expanded, changed, rows);
        }
    }
}

/// Compute the view state for `snapshot`, carrying over what the user did
/// to the nodes that survive.
///
/// - A node present in both trees keeps its expansion flag and selection.
/// - A new node is expanded only if its parent is expanded or selected.
/// - A removed selected node hands selection to its nearest surviving
///   ancestor, or to the new root if none survives.
pub fn reconcile(current: &PhaseViewState, snapshot: &Snapshot) -> PhaseViewState {
    let root = &snapshot.root;
    let parents = root.parent_map();

    let mut expanded = HashSet::new();
    for phase in root.walk() {
        let id = &phase.phase_id;
        let keep = if current.parents.contains_key(id) {
            current.expanded.contains(id)
        } else {
            match parents.get(id).cloned().flatten() {
                None => true,
                Some(parent) => {
                    expanded.contains(&parent) || current.selected.as_ref() == Some(&parent)
                }
            }
        };
        if keep {
            expanded.insert(id.clone());
        }
    }

    let selected = match &current.selected {
        Some(id) if parents.contains_key(id) => id.clone(),
        Some(id) => surviving_ancestor(id, &current.parents, &parents)
            .unwrap_or_else(|| root.phase_id.clone()),
        None => root.phase_id.clone(),
    };

    let old_tree = current.tree.as_ref();
    let changed: HashSet<String> = root
        .walk()
        .filter(|p| {
            old_tree
                .and_then(|t| t.find(&p.phase_id))
                .is_none_or(|old| !old.same_content(p))
        })
        .map(|p| p.phase_id.clone())
        .collect();

    let structure_changed = match old_tree {
        Some(old) => !old.walk().map(|p| &p.phase_id).eq(root.walk().map(|p| &p.phase_id)),
        None => true,
    };

    if let Some(previous) = &current.selected
        && previous != &selected
    {
        tracing::debug!(from = %previous, to = %selected, "selected phase removed, selection moved");
    }

    let mut state = PhaseViewState {
        tree: Some(root.clone()),
        expanded,
        selected: Some(selected),
        parents,
        changed,
        structure_changed,
        rows: Vec::new(),
    };
    state.reveal_selected();
    state.rebuild_rows();
    state
}

fn surviving_ancestor(
    removed: &str,
    old_parents: &HashMap<String, Option<String>>,
    new_parents: &HashMap<String, Option<String>>,
) -> Option<String> {
    let mut cursor = old_parents.get(removed).cloned().flatten();
    while let Some(ancestor) = cursor {
        if new_parents.contains_key(&ancestor) {
            return Some(ancestor);
        }
        cursor = old_parents.get(&ancestor).cloned().flatten();
    }
    None
}
