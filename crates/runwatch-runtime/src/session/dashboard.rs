use std::sync::Arc;

use chrono::{DateTime, Utc};
use runwatch_types::{InstanceId, Outcome, RunCriteria};

use crate::Result;
use crate::navigator::{Direction, TableId};
use crate::provider::{InstanceTarget, Provider};
use crate::session::board::{BoardOptions, EndedPolicy, RunBoard};
use crate::session::tables::RunTables;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardSummary {
    pub active: usize,
    pub completed: usize,
    /// History runs whose termination outcome is a fault
    pub failed: usize,
}

/// Controller of the dashboard screen: active and history tables plus the
/// detail screen hand-off.
pub struct DashboardSession {
    board: RunBoard,
    /// Row key of the last opened detail screen
    opened: Option<InstanceId>,
}

impl DashboardSession {
    pub fn open(
        provider: Arc<dyn Provider>,
        criteria: RunCriteria,
        history_limit: usize,
        bridge_capacity: usize,
    ) -> Result<Self> {
        let board = RunBoard::open(
            provider,
            criteria,
            BoardOptions {
                history_limit,
                bridge_capacity,
                policy: EndedPolicy::MigrateToHistory,
            },
        )?;
        Ok(Self {
            board,
            opened: None,
        })
    }

    pub fn tables(&self) -> &RunTables {
        self.board.tables()
    }

    pub fn lost(&self) -> Option<&str> {
        self.board.lost()
    }

    pub fn clock(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.board.clock(now)
    }

    pub fn is_ticking(&self) -> bool {
        self.board.is_ticking()
    }

    pub fn summary(&self) -> DashboardSummary {
        let tables = self.board.tables();
        let failed = tables
            .history()
            .iter()
            .filter(|s| s.outcome() == Some(Outcome::Fault))
            .count();
        DashboardSummary {
            active: tables.active().len(),
            completed: tables.history().len() - failed,
            failed,
        }
    }

    pub fn pump(&mut self) -> bool {
        self.board.pump()
    }

    pub fn move_cursor(&mut self, direction: Direction) {
        self.board.tables_mut().move_cursor(direction);
    }

    /// Target for the detail screen of the selected row.
    pub fn open_selected(&mut self) -> Option<InstanceTarget> {
        let (table, snapshot) = self.board.tables().selected()?;
        let target = match table {
            TableId::Active => InstanceTarget::Live(snapshot.instance_id.clone()),
            TableId::History => InstanceTarget::Historical(snapshot.clone()),
        };
        self.opened = Some(target.instance_id().clone());
        tracing::debug!(instance = %target.instance_id(), "opening detail screen");
        Some(target)
    }

    /// Back from the detail screen: refresh live rows and put the cursor on
    /// the row that was opened, even if it moved to history meanwhile.
    pub fn on_detail_closed(&mut self) {
        self.board.resync();
        if let Some(key) = self.opened.take() {
            self.board.tables_mut().restore_cursor(&key);
        }
    }

    /// Release the environment subscription.
    pub fn detach(&mut self) {
        self.board.release();
    }
}
