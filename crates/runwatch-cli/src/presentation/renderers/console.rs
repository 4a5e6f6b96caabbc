use std::io::{self, Write};

use anyhow::Result;
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use runwatch_types::{format_elapsed, format_local};

use crate::presentation::theme::Tone;
use crate::presentation::view_models::{
    LifecycleViewModel, OutputLineViewModel, RunRowViewModel, StopResultViewModel,
    StreamLineViewModel,
};
use crate::types::OutputFormat;

const NULL_TIME: &str = "--:--:--";

fn paint(text: &str, tone: Tone, enable_color: bool) -> String {
    if !enable_color {
        return text.to_string();
    }
    match tone {
        Tone::Neutral => text.to_string(),
        Tone::Subtle => text.bright_black().to_string(),
        Tone::Active => text.blue().to_string(),
        Tone::Success => text.green().to_string(),
        Tone::Warning => text.yellow().to_string(),
        Tone::Failure => text.bright_red().bold().to_string(),
    }
}

pub fn format_run_table(rows: &[RunRowViewModel], enable_color: bool) -> String {
    let mut out = String::new();
    let header = format!(
        "{:<18} {:<10} {:<19} {:<9} {:<12} {:<4} STATUS",
        "JOB ID", "RUN ID", "CREATED", "TIME", "STAGE", "WARN"
    );
    if enable_color {
        out.push_str(&header.bold().to_string());
    } else {
        out.push_str(&header);
    }
    out.push('\n');

    for row in rows {
        let job = format!("{:<18}", row.job_id);
        let stage = format!("{:<12}", row.stage_text);
        let warn = format!("{:<4}", row.warnings);
        out.push_str(&format!(
            "{} {:<10} {:<19} {:<9} {} {} {}\n",
            if enable_color { job.bold().to_string() } else { job },
            row.run_id,
            format_local(Some(row.created_at), "N/A"),
            format_elapsed(row.elapsed_secs.map(chrono::Duration::seconds), NULL_TIME),
            paint(&stage, row.tone, enable_color),
            if row.warnings > 0 {
                paint(&warn, Tone::Warning, enable_color)
            } else {
                warn
            },
            row.status.as_deref().unwrap_or(""),
        ));
    }
    out
}

pub fn format_lifecycle(line: &LifecycleViewModel, enable_color: bool) -> String {
    let stage = match &line.termination {
        Some(status) => format!("ENDED {}", status),
        None => line.stage.as_str().to_string(),
    };
    let timestamp = format_local(Some(line.timestamp), "N/A");
    if enable_color {
        format!(
            "{}  {}  {}",
            timestamp.bright_black(),
            line.instance_id.bold(),
            paint(&stage, line.tone, true)
        )
    } else {
        format!("{}  {}  {}", timestamp, line.instance_id, stage)
    }
}

/// Separator printed before the output of each instance by `tail`.
pub fn format_output_header(instance_id: &str, enable_color: bool) -> String {
    let rule = "\u{2500}".repeat(20);
    if enable_color {
        format!(
            "{} {} {}",
            rule.cyan().bold(),
            instance_id.bold(),
            rule.cyan().bold()
        )
    } else {
        format!("{} {} {}", rule, instance_id, rule)
    }
}

/// Prints command output to stdout, as text or JSON lines.
pub struct ConsoleRenderer {
    format: OutputFormat,
    enable_color: bool,
}

impl ConsoleRenderer {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            enable_color: format == OutputFormat::Plain && io::stdout().is_terminal(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    fn json_line(&self, line: &StreamLineViewModel) -> Result<()> {
        let mut stdout = io::stdout().lock();
        serde_json::to_writer(&mut stdout, line)?;
        writeln!(stdout)?;
        stdout.flush()?;
        Ok(())
    }

    pub fn render_instances(&self, rows: Vec<RunRowViewModel>) -> Result<()> {
        if self.is_json() {
            for row in rows {
                self.json_line(&StreamLineViewModel::Instance(row))?;
            }
            return Ok(());
        }
        if rows.is_empty() {
            println!("No active instances");
            return Ok(());
        }
        print!("{}", format_run_table(&rows, self.enable_color));
        Ok(())
    }

    pub fn render_history(&self, rows: Vec<RunRowViewModel>) -> Result<()> {
        if self.is_json() {
            for row in rows {
                self.json_line(&StreamLineViewModel::Run(row))?;
            }
            return Ok(());
        }
        if rows.is_empty() {
            println!("No ended runs");
            return Ok(());
        }
        print!("{}", format_run_table(&rows, self.enable_color));
        Ok(())
    }

    pub fn render_output_header(&self, instance_id: &str) -> Result<()> {
        if self.is_json() {
            return Ok(());
        }
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "\n{}", format_output_header(instance_id, self.enable_color))?;
        stdout.flush()?;
        Ok(())
    }

    pub fn render_output_line(&self, line: OutputLineViewModel) -> Result<()> {
        if self.is_json() {
            return self.json_line(&StreamLineViewModel::Output(line));
        }
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", line.text)?;
        stdout.flush()?;
        Ok(())
    }

    pub fn render_lifecycle(&self, line: LifecycleViewModel) -> Result<()> {
        if self.is_json() {
            return self.json_line(&StreamLineViewModel::Lifecycle(line));
        }
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", format_lifecycle(&line, self.enable_color))?;
        stdout.flush()?;
        Ok(())
    }

    pub fn render_note(&self, message: &str) {
        if self.is_json() {
            return;
        }
        if self.enable_color {
            println!("{}", message.bright_black());
        } else {
            println!("{}", message);
        }
    }

    pub fn render_stop_results(&self, results: &[StopResultViewModel]) -> Result<()> {
        if self.is_json() {
            println!("{}", serde_json::to_string(results)?);
            return Ok(());
        }
        for result in results {
            let outcome = match &result.error {
                None => paint("stop requested", Tone::Success, self.enable_color),
                Some(e) => paint(e, Tone::Failure, self.enable_color),
            };
            println!("{} -> {}", result.instance_id, outcome);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use runwatch_types::Stage;

    fn row(job: &str, warnings: usize) -> RunRowViewModel {
        RunRowViewModel {
            instance_id: format!("{}@a1b2c3d4", job),
            job_id: job.to_string(),
            run_id: "a1b2c3d4".to_string(),
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            elapsed_secs: Some(75),
            stage: Stage::Running,
            stage_text: "RUNNING".to_string(),
            outcome: None,
            phase_count: 6,
            running_phases: vec!["fetch".to_string()],
            warnings,
            status: Some("downloading batch 1/2".to_string()),
            tone: Tone::Active,
        }
    }

    #[test]
    fn test_plain_table_has_header_and_rows() {
        let table = format_run_table(&[row("backup", 0), row("etl", 2)], false);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("JOB ID"));
        assert!(lines[1].starts_with("backup "));
        assert!(lines[1].contains("00:01:15"));
        assert!(lines[2].contains("RUNNING"));
        assert!(lines[2].ends_with("downloading batch 1/2"));
        assert!(!table.contains('\u{1b}'));
    }

    #[test]
    fn test_colored_table_uses_ansi() {
        let table = format_run_table(&[row("backup", 1)], true);
        assert!(table.contains('\u{1b}'));
    }

    #[test]
    fn test_lifecycle_line() {
        let line = LifecycleViewModel {
            instance_id: "etl@r1".to_string(),
            stage: Stage::Ended,
            termination: Some("FAILED".to_string()),
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            tone: Tone::Failure,
        };
        let text = format_lifecycle(&line, false);
        assert!(text.ends_with("etl@r1  ENDED FAILED"));

        let running = LifecycleViewModel {
            stage: Stage::Running,
            termination: None,
            tone: Tone::Active,
            ..line
        };
        assert!(format_lifecycle(&running, false).ends_with("RUNNING"));
    }

    #[test]
    fn test_output_header_names_instance() {
        let header = format_output_header("etl@r1", false);
        assert!(header.contains(" etl@r1 "));
        assert!(header.starts_with('\u{2500}'));
        assert!(!header.contains('\u{1b}'));
    }

    #[test]
    fn test_history_rows_are_tagged_run() {
        let json = serde_json::to_value(StreamLineViewModel::Run(row("etl", 0))).unwrap();
        assert_eq!(json["type"], "run");
        assert_eq!(json["job_id"], "etl");
    }

    #[test]
    fn test_stream_line_json_is_tagged() {
        let json = serde_json::to_value(StreamLineViewModel::Instance(row("etl", 0))).unwrap();
        assert_eq!(json["type"], "instance");
        assert_eq!(json["stage"], "RUNNING");
        assert_eq!(json["instance_id"], "etl@a1b2c3d4");
        assert!(json.get("tone").is_none());
    }
}
