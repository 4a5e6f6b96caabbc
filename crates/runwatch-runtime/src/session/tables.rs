use std::cmp::Ordering;

use runwatch_types::{InstanceId, Snapshot};

use crate::navigator::{Direction, LinkedNavigator, Position, TableId};

/// Creation time descending, id as tie-break.
fn newer_first(a: &Snapshot, b: &Snapshot) -> Ordering {
    b.created_at()
        .cmp(&a.created_at())
        .then_with(|| a.instance_id.cmp(&b.instance_id))
}

fn insert_sorted(rows: &mut Vec<Snapshot>, snapshot: Snapshot) -> usize {
    let index = rows.partition_point(|s| newer_first(s, &snapshot) == Ordering::Less);
    rows.insert(index, snapshot);
    index
}

/// Active and history rows with one linked cursor.
///
/// Rows are keyed by instance id. When a row migrates from active to
/// history while it holds the cursor, the cursor follows it.
#[derive(Debug, Clone)]
pub struct RunTables {
    active: Vec<Snapshot>,
    history: Vec<Snapshot>,
    nav: LinkedNavigator,
    cursor: Position,
    history_limit: usize,
}

impl RunTables {
    pub fn new(history_limit: usize) -> Self {
        Self {
            active: Vec::new(),
            history: Vec::new(),
            nav: LinkedNavigator::default(),
            cursor: Position::new(TableId::Active, 0),
            history_limit,
        }
    }

    /// Replace both tables. History entries that are currently active are dropped.
    pub fn load(&mut self, mut active: Vec<Snapshot>, mut history: Vec<Snapshot>) {
        active.sort_by(newer_first);
        history.retain(|h| !active.iter().any(|a| a.instance_id == h.instance_id));
        history.sort_by(newer_first);
        history.truncate(self.history_limit);

        self.active = active;
        self.history = history;
        self.nav = LinkedNavigator::new(self.active.len(), self.history.len());
        self.cursor = self.nav.first().unwrap_or(Position::new(TableId::Active, 0));
    }

    pub fn active(&self) -> &[Snapshot] {
        &self.active
    }

    pub fn history(&self) -> &[Snapshot] {
        &self.history
    }

    pub fn rows(&self, table: TableId) -> &[Snapshot] {
        match table {
            TableId::Active => &self.active,
            TableId::History => &self.history,
        }
    }

    pub fn cursor(&self) -> Position {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.nav.is_empty()
    }

    pub fn active_index(&self, id: &InstanceId) -> Option<usize> {
        self.active.iter().position(|s| &s.instance_id == id)
    }

    pub fn history_index(&self, id: &InstanceId) -> Option<usize> {
        self.history.iter().position(|s| &s.instance_id == id)
    }

    pub fn selected(&self) -> Option<(TableId, &Snapshot)> {
        self.rows(self.cursor.table)
            .get(self.cursor.row)
            .map(|s| (self.cursor.table, s))
    }

    pub fn selected_key(&self) -> Option<InstanceId> {
        self.selected().map(|(_, s)| s.instance_id.clone())
    }

    pub fn move_cursor(&mut self, direction: Direction) {
        self.cursor = self.nav.step(direction, self.cursor);
    }

    /// Put the cursor back on the row with this key, wherever it lives now.
    pub fn restore_cursor(&mut self, key: &InstanceId) -> bool {
        let found = self
            .active_index(key)
            .map(|i| Position::new(TableId::Active, i))
            .or_else(|| {
                self.history_index(key)
                    .map(|i| Position::new(TableId::History, i))
            });
        match found {
            Some(pos) => {
                self.cursor = pos;
                true
            }
            None => {
                self.cursor = self.nav.clamp(self.cursor);
                false
            }
        }
    }

    /// Replace an active row, or add it if the instance is not tracked yet.
    /// Returns `true` when a row was added.
    pub fn upsert_active(&mut self, snapshot: Snapshot) -> bool {
        if let Some(index) = self.active_index(&snapshot.instance_id) {
            self.active[index] = snapshot;
            return false;
        }
        let index = insert_sorted(&mut self.active, snapshot);
        self.cursor = self.nav.on_row_inserted(TableId::Active, index, self.cursor);
        true
    }

    /// Remove an active row without recording it in history.
    pub fn remove_active(&mut self, id: &InstanceId) -> Option<Snapshot> {
        let index = self.active_index(id)?;
        let removed = self.active.remove(index);
        self.cursor = self.nav.on_row_removed(TableId::Active, index, self.cursor);
        Some(removed)
    }

    /// Move an ended run from the active table into history.
    ///
    /// Also accepts runs that were never active (they are simply added to
    /// history) and replaces an existing history row with the same key.
    pub fn migrate_to_history(&mut self, snapshot: Snapshot) {
        let id = snapshot.instance_id.clone();
        let follows = self.selected_key().as_ref() == Some(&id);

        if let Some(index) = self.active_index(&id) {
            self.active.remove(index);
            self.cursor = self.nav.on_row_removed(TableId::Active, index, self.cursor);
        }
        if let Some(index) = self.history_index(&id) {
            self.history.remove(index);
            self.cursor = self.nav.on_row_removed(TableId::History, index, self.cursor);
        }

        let index = insert_sorted(&mut self.history, snapshot);
        self.cursor = self.nav.on_row_inserted(TableId::History, index, self.cursor);
        if follows {
            self.cursor = Position::new(TableId::History, index);
        }

        while self.history.len() > self.history_limit {
            let last = self.history.len() - 1;
            self.history.pop();
            self.cursor = self.nav.on_row_removed(TableId::History, last, self.cursor);
        }
        tracing::debug!(instance = %id, "run moved to history");
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use runwatch_types::{Phase, TerminationStatus};

    fn run(name: &str, created: i64) -> Snapshot {
        let t = Utc.timestamp_opt(1_700_000_000 + created, 0).unwrap();
        let mut root = Phase::new("root", t);
        root.lifecycle.start(t);
        Snapshot::new(InstanceId::new(name, "r1"), root)
    }

    fn ended(mut snapshot: Snapshot) -> Snapshot {
        let t = snapshot.created_at();
        snapshot.root.lifecycle.terminate(TerminationStatus::Completed, t);
        snapshot
    }

    fn keys(rows: &[Snapshot]) -> Vec<&str> {
        rows.iter().map(|s| s.instance_id.job_id.as_str()).collect()
    }

    fn tables() -> RunTables {
        let mut tables = RunTables::new(10);
        // A created after B so it sorts first
        tables.load(
            vec![run("B", 10), run("A", 20)],
            vec![ended(run("X", 3)), ended(run("Y", 2)), ended(run("Z", 1))],
        );
        tables
    }

    #[test]
    fn test_load_sorts_newest_first() {
        let tables = tables();
        assert_eq!(keys(tables.active()), vec!["A", "B"]);
        assert_eq!(keys(tables.history()), vec!["X", "Y", "Z"]);
        assert_eq!(tables.cursor(), Position::new(TableId::Active, 0));
    }

    #[test]
    fn test_load_excludes_active_runs_from_history() {
        let mut tables = RunTables::new(10);
        tables.load(vec![run("A", 5)], vec![ended(run("A", 5)), ended(run("X", 1))]);
        assert_eq!(keys(tables.history()), vec!["X"]);
    }

    #[test]
    fn test_cursor_wraps_between_tables() {
        let mut tables = tables();
        tables.move_cursor(Direction::Next);
        assert_eq!(tables.selected_key().unwrap().job_id, "B");
        tables.move_cursor(Direction::Next);
        assert_eq!(tables.selected_key().unwrap().job_id, "X");
        tables.move_cursor(Direction::Prev);
        tables.move_cursor(Direction::Prev);
        tables.move_cursor(Direction::Prev);
        assert_eq!(tables.selected_key().unwrap().job_id, "Z");
    }

    #[test]
    fn test_migrating_selected_row_is_followed() {
        let mut tables = tables();
        tables.move_cursor(Direction::Next);
        assert_eq!(tables.selected_key().unwrap().job_id, "B");

        tables.migrate_to_history(ended(run("B", 10)));

        assert_eq!(keys(tables.active()), vec!["A"]);
        assert_eq!(keys(tables.history()), vec!["B", "X", "Y", "Z"]);
        let (table, selected) = tables.selected().unwrap();
        assert_eq!(table, TableId::History);
        assert_eq!(selected.instance_id.job_id, "B");
    }

    #[test]
    fn test_migrating_other_row_keeps_cursor_on_its_row() {
        let mut tables = tables();
        for _ in 0..3 {
            tables.move_cursor(Direction::Next);
        }
        assert_eq!(tables.selected_key().unwrap().job_id, "Y");

        tables.migrate_to_history(ended(run("A", 20)));

        assert_eq!(tables.selected_key().unwrap().job_id, "Y");
    }

    #[test]
    fn test_history_limit_evicts_oldest() {
        let mut tables = RunTables::new(3);
        tables.load(
            vec![run("A", 20)],
            vec![ended(run("X", 3)), ended(run("Y", 2)), ended(run("Z", 1))],
        );
        tables.migrate_to_history(ended(run("A", 20)));

        assert_eq!(keys(tables.history()), vec!["A", "X", "Y"]);
        assert!(tables.selected().is_some());
    }

    #[test]
    fn test_remove_active_never_leaves_stale_cursor() {
        let mut tables = RunTables::new(5);
        tables.load(vec![run("A", 2), run("B", 1)], vec![]);
        tables.move_cursor(Direction::Next);
        tables.remove_active(&InstanceId::new("B", "r1"));
        assert_eq!(tables.selected_key().unwrap().job_id, "A");
        tables.remove_active(&InstanceId::new("A", "r1"));
        assert!(tables.selected().is_none());
    }

    #[test]
    fn test_upsert_adds_unknown_and_replaces_known() {
        let mut tables = tables();
        assert!(tables.upsert_active(run("C", 30)));
        assert!(!tables.upsert_active(run("C", 30)));
        assert_eq!(keys(tables.active()), vec!["C", "A", "B"]);
        // cursor stays on A
        assert_eq!(tables.selected_key().unwrap().job_id, "A");
    }

    #[test]
    fn test_restore_cursor_by_key() {
        let mut tables = tables();
        assert!(tables.restore_cursor(&InstanceId::new("Y", "r1")));
        assert_eq!(tables.cursor(), Position::new(TableId::History, 1));
        assert!(!tables.restore_cursor(&InstanceId::new("gone", "r1")));
    }
}
