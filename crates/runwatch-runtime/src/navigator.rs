//! Cursor movement across the active and history tables as one cyclic sequence.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableId {
    Active,
    History,
}

impl TableId {
    pub fn other(self) -> Self {
        match self {
            TableId::Active => TableId::History,
            TableId::History => TableId::Active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub table: TableId,
    pub row: usize,
}

impl Position {
    pub fn new(table: TableId, row: usize) -> Self {
        Self { table, row }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

/// Row counts of both tables; positions are plain indices into them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkedNavigator {
    active_len: usize,
    history_len: usize,
}

impl LinkedNavigator {
    pub fn new(active_len: usize, history_len: usize) -> Self {
        Self {
            active_len,
            history_len,
        }
    }

    pub fn len(&self, table: TableId) -> usize {
        match table {
            TableId::Active => self.active_len,
            TableId::History => self.history_len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.active_len == 0 && self.history_len == 0
    }

    pub fn set_len(&mut self, table: TableId, len: usize) {
        match table {
            TableId::Active => self.active_len = len,
            TableId::History => self.history_len = len,
        }
    }

    /// First row of the first non-empty table, active first.
    pub fn first(&self) -> Option<Position> {
        [TableId::Active, TableId::History]
            .into_iter()
            .find(|&t| self.len(t) > 0)
            .map(|t| Position::new(t, 0))
    }

    /// Next cursor position. Leaving one table's end enters the other
    /// table; an empty table is skipped; with both empty nothing moves.
    pub fn step(&self, direction: Direction, current: Position) -> Position {
        if self.is_empty() {
            return current;
        }
        let len = self.len(current.table);
        let other = current.table.other();
        let other_len = self.len(other);

        if len == 0 {
            return match direction {
                Direction::Next => Position::new(other, 0),
                Direction::Prev => Position::new(other, other_len - 1),
            };
        }

        let row = current.row.min(len - 1);
        match direction {
            Direction::Next if row + 1 < len => Position::new(current.table, row + 1),
            Direction::Next if other_len > 0 => Position::new(other, 0),
            Direction::Next => Position::new(current.table, 0),
            Direction::Prev if row > 0 => Position::new(current.table, row - 1),
            Direction::Prev if other_len > 0 => Position::new(other, other_len - 1),
            Direction::Prev => Position::new(current.table, len - 1),
        }
    }

    /// Bring a possibly stale position back onto an existing row.
    pub fn clamp(&self, pos: Position) -> Position {
        let len = self.len(pos.table);
        if len > 0 {
            return Position::new(pos.table, pos.row.min(len - 1));
        }
        self.first().unwrap_or(pos)
    }

    /// Record the removal of `index` from `table` and return where the
    /// cursor goes.
    ///
    /// A cursor on the removed row stays at the same index, which now holds
    /// the following row; removing the last row moves it up one. When the
    /// table becomes empty the cursor moves to the other table's first row.
    pub fn on_row_removed(&mut self, table: TableId, index: usize, cursor: Position) -> Position {
        let len = self.len(table).saturating_sub(1);
        self.set_len(table, len);

        if cursor.table != table {
            return cursor;
        }
        if cursor.row > index {
            return Position::new(table, cursor.row - 1);
        }
        if len == 0 {
            let other = table.other();
            return if self.len(other) > 0 {
                Position::new(other, 0)
            } else {
                Position::new(table, 0)
            };
        }
        Position::new(table, cursor.row.min(len - 1))
    }

    /// Record an insertion at `index`; the cursor keeps pointing at the same row.
    pub fn on_row_inserted(&mut self, table: TableId, index: usize, cursor: Position) -> Position {
        let len = self.len(table);
        let was_empty = len == 0;
        self.set_len(table, len + 1);

        if cursor.table == table && !was_empty && cursor.row >= index {
            return Position::new(table, cursor.row + 1);
        }
        if self.len(cursor.table) == 0 {
            return Position::new(table, index);
        }
        cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TableId::{Active, History};

    fn at(table: TableId, row: usize) -> Position {
        Position::new(table, row)
    }

    #[test]
    fn test_next_crosses_into_other_table() {
        let nav = LinkedNavigator::new(2, 3);
        assert_eq!(nav.step(Direction::Next, at(Active, 0)), at(Active, 1));
        assert_eq!(nav.step(Direction::Next, at(Active, 1)), at(History, 0));
        assert_eq!(nav.step(Direction::Next, at(History, 2)), at(Active, 0));
    }

    #[test]
    fn test_prev_crosses_into_other_table() {
        let nav = LinkedNavigator::new(2, 3);
        assert_eq!(nav.step(Direction::Prev, at(Active, 0)), at(History, 2));
        assert_eq!(nav.step(Direction::Prev, at(History, 0)), at(Active, 1));
        assert_eq!(nav.step(Direction::Prev, at(History, 2)), at(History, 1));
    }

    #[test]
    fn test_empty_table_is_skipped() {
        let nav = LinkedNavigator::new(0, 3);
        assert_eq!(nav.step(Direction::Next, at(History, 2)), at(History, 0));
        assert_eq!(nav.step(Direction::Prev, at(History, 0)), at(History, 2));
        // stale cursor left on the empty table
        assert_eq!(nav.step(Direction::Next, at(Active, 0)), at(History, 0));
    }

    #[test]
    fn test_both_empty_is_noop() {
        let nav = LinkedNavigator::new(0, 0);
        assert_eq!(nav.step(Direction::Next, at(Active, 0)), at(Active, 0));
        assert_eq!(nav.step(Direction::Prev, at(History, 4)), at(History, 4));
        assert_eq!(nav.first(), None);
    }

    #[test]
    fn test_removed_cursor_row_takes_same_index() {
        let mut nav = LinkedNavigator::new(3, 1);
        assert_eq!(nav.on_row_removed(Active, 1, at(Active, 1)), at(Active, 1));
        assert_eq!(nav.len(Active), 2);
    }

    #[test]
    fn test_removed_last_row_clamps() {
        let mut nav = LinkedNavigator::new(2, 1);
        assert_eq!(nav.on_row_removed(Active, 1, at(Active, 1)), at(Active, 0));
    }

    #[test]
    fn test_removal_above_cursor_shifts_it() {
        let mut nav = LinkedNavigator::new(3, 0);
        assert_eq!(nav.on_row_removed(Active, 0, at(Active, 2)), at(Active, 1));
    }

    #[test]
    fn test_emptied_table_moves_cursor_to_other_table() {
        let mut nav = LinkedNavigator::new(1, 2);
        assert_eq!(nav.on_row_removed(Active, 0, at(Active, 0)), at(History, 0));
    }

    #[test]
    fn test_insertion_keeps_cursor_on_same_row() {
        let mut nav = LinkedNavigator::new(2, 2);
        assert_eq!(nav.on_row_inserted(History, 0, at(History, 1)), at(History, 2));
        assert_eq!(nav.on_row_inserted(History, 3, at(History, 2)), at(History, 2));
        assert_eq!(nav.on_row_inserted(Active, 0, at(History, 2)), at(History, 2));
    }

    #[test]
    fn test_clamp_stale_position() {
        let nav = LinkedNavigator::new(0, 2);
        assert_eq!(nav.clamp(at(History, 9)), at(History, 1));
        assert_eq!(nav.clamp(at(Active, 0)), at(History, 0));
    }
}
