use std::collections::HashMap;
use std::thread;

use anyhow::Result;
use runwatch_runtime::{Delivery, EventBridge, OutputBuffer, Scope, Subscription};
use runwatch_types::{Event, InstanceId, OutputLine, RunCriteria};

use super::active_snapshots;
use crate::context::ExecutionContext;
use crate::presentation::presenters::build_output_line;
use crate::presentation::renderers::ConsoleRenderer;

/// Output already printed per instance, and the instance printed last.
#[derive(Default)]
struct TailPrinter {
    seen: HashMap<InstanceId, OutputBuffer>,
    current: Option<InstanceId>,
}

impl TailPrinter {
    /// Lines of `instance_id` not printed yet, in the order given.
    fn fresh<I>(&mut self, instance_id: &InstanceId, lines: I) -> Vec<OutputLine>
    where
        I: IntoIterator<Item = OutputLine>,
    {
        let buffer = self.seen.entry(instance_id.clone()).or_default();
        lines
            .into_iter()
            .filter(|line| buffer.insert(line.clone()))
            .collect()
    }

    /// Whether a header must precede the next line of `instance_id`.
    fn switch_to(&mut self, instance_id: &InstanceId) -> bool {
        if self.current.as_ref() == Some(instance_id) {
            return false;
        }
        self.current = Some(instance_id.clone());
        true
    }

    fn print(
        &mut self,
        renderer: &ConsoleRenderer,
        instance_id: &InstanceId,
        lines: Vec<OutputLine>,
    ) -> Result<()> {
        let fresh = self.fresh(instance_id, lines);
        if fresh.is_empty() {
            return Ok(());
        }
        if self.switch_to(instance_id) {
            renderer.render_output_header(&instance_id.to_string())?;
        }
        for line in fresh {
            renderer.render_output_line(build_output_line(instance_id, line))?;
        }
        Ok(())
    }
}

pub fn handle(ctx: &ExecutionContext, patterns: &[String], follow: bool) -> Result<()> {
    let criteria = RunCriteria::parse_all(patterns)?;
    let provider = ctx.provider();
    let renderer = ctx.renderer();
    let config = ctx.config();

    // Subscribe before fetching tails; the buffers drop the overlap
    let bridge = EventBridge::new(config.bridge_capacity);
    let mut subscription = if follow {
        Some(Subscription::open(provider.clone(), Scope::Environment, &bridge)?)
    } else {
        None
    };

    let mut printer = TailPrinter::default();
    let instances = active_snapshots(provider.as_ref(), &criteria)?;
    if instances.is_empty() && !follow {
        renderer.render_note("No active instances");
        return Ok(());
    }
    for snapshot in &instances {
        let id = &snapshot.instance_id;
        let tail = match provider.fetch_output_tail(id, None) {
            Ok(tail) => tail,
            Err(e) => {
                tracing::debug!(instance = %id, error = %e, "skipping output tail");
                continue;
            }
        };
        if printer.switch_to(id) {
            renderer.render_output_header(&id.to_string())?;
        }
        printer.print(renderer, id, tail)?;
    }

    let Some(subscription) = subscription.as_mut() else {
        return Ok(());
    };
    renderer.render_note("Following output... (Ctrl+C to stop)");

    loop {
        thread::sleep(config.drain_interval());

        for delivery in bridge.drain() {
            match delivery {
                Delivery::Event(Event::OutputAppended { instance_id, line }) => {
                    if criteria.matches_id(&instance_id) {
                        printer.print(renderer, &instance_id, vec![line])?;
                    }
                }
                Delivery::Event(_) => {}
                Delivery::Lost { reason } => {
                    subscription.cancel();
                    anyhow::bail!("Event stream lost: {}", reason);
                }
            }
        }
    }
}
