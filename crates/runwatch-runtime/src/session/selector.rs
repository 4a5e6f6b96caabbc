use std::sync::Arc;

use chrono::{DateTime, Utc};
use runwatch_types::{RunCriteria, Snapshot};

use crate::Result;
use crate::navigator::{Direction, TableId};
use crate::provider::{InstanceTarget, Provider};
use crate::session::board::{BoardOptions, EndedPolicy, RunBoard};
use crate::session::tables::RunTables;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorMode {
    /// Active instances only; ended ones disappear
    LiveOnly,
    /// Active and history tables with linked navigation; ended ones migrate
    Combined,
}

enum Source {
    Live(RunBoard),
    /// Fixed list of ended runs, never updated
    Static(RunTables),
}

/// Pick one instance or run from a live-updating table.
pub struct SelectorSession {
    source: Source,
    mode: Option<SelectorMode>,
}

impl SelectorSession {
    pub fn open(
        provider: Arc<dyn Provider>,
        criteria: RunCriteria,
        mode: SelectorMode,
        history_limit: usize,
        bridge_capacity: usize,
    ) -> Result<Self> {
        let (policy, history_limit) = match mode {
            SelectorMode::LiveOnly => (EndedPolicy::Remove, 0),
            SelectorMode::Combined => (EndedPolicy::MigrateToHistory, history_limit),
        };
        let board = RunBoard::open(
            provider,
            criteria,
            BoardOptions {
                history_limit,
                bridge_capacity,
                policy,
            },
        )?;
        Ok(Self {
            source: Source::Live(board),
            mode: Some(mode),
        })
    }

    /// Static selector over ended runs. No subscription is opened.
    pub fn historical(runs: Vec<Snapshot>) -> Self {
        let mut tables = RunTables::new(runs.len());
        tables.load(Vec::new(), runs);
        Self {
            source: Source::Static(tables),
            mode: None,
        }
    }

    /// `None` for a static selector.
    pub fn mode(&self) -> Option<SelectorMode> {
        self.mode
    }

    pub fn tables(&self) -> &RunTables {
        match &self.source {
            Source::Live(board) => board.tables(),
            Source::Static(tables) => tables,
        }
    }

    /// Reason the environment subscription was lost, if it was.
    pub fn lost(&self) -> Option<&str> {
        match &self.source {
            Source::Live(board) => board.lost(),
            Source::Static(_) => None,
        }
    }

    pub fn clock(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match &self.source {
            Source::Live(board) => board.clock(now),
            Source::Static(_) => now,
        }
    }

    /// A static selector only lists ended runs, so it never ticks.
    pub fn is_ticking(&self) -> bool {
        match &self.source {
            Source::Live(board) => board.is_ticking(),
            Source::Static(_) => false,
        }
    }

    pub fn pump(&mut self) -> bool {
        match &mut self.source {
            Source::Live(board) => board.pump(),
            Source::Static(_) => false,
        }
    }

    pub fn move_cursor(&mut self, direction: Direction) {
        match &mut self.source {
            Source::Live(board) => board.tables_mut().move_cursor(direction),
            Source::Static(tables) => tables.move_cursor(direction),
        }
    }

    /// Selected row as a screen target. Ends the session.
    pub fn confirm(&mut self) -> Option<InstanceTarget> {
        let target = self.tables().selected().map(|(table, snapshot)| match table {
            TableId::Active => InstanceTarget::Live(snapshot.instance_id.clone()),
            TableId::History => InstanceTarget::Historical(snapshot.clone()),
        });
        self.release();
        target
    }

    /// Leave without a selection.
    pub fn cancel(&mut self) -> Option<InstanceTarget> {
        self.release();
        None
    }

    fn release(&mut self) {
        if let Source::Live(board) = &mut self.source {
            board.release();
        }
    }
}
