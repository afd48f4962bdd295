use std::io::Write;

use crossterm::cursor::MoveToPreviousLine;
use crossterm::queue;
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{Clear, ClearType};

use crate::config::WatchConfig;
use crate::error::WatchError;
use crate::status::{classify, visible_jobs, ClassifyError, WorkflowStatus};
use crate::store::SnapshotReader;
use crate::{JobStatus, Snapshot, Verdict, METRICS_WORKFLOW};

pub const CHECK: &str = "\u{2705}";
pub const CROSS: &str = "\u{274C}";
pub const SPINNER_FRAMES: [&str; 8] = ["|", "/", "\u{2015}", "\\", "|", "/", "-", "\\"];

/// Spinner frame shown on `tick` when each frame lasts `period` ticks.
pub fn frame_index(tick: u64, period: u64) -> usize {
    ((tick / period.max(1)) % SPINNER_FRAMES.len() as u64) as usize
}

pub fn status_glyph(status: WorkflowStatus, tick: u64, period: u64) -> &'static str {
    match status {
        WorkflowStatus::Success => CHECK,
        WorkflowStatus::Failure => CROSS,
        WorkflowStatus::InProgress => SPINNER_FRAMES[frame_index(tick, period)],
    }
}

/// Cuts `text` to `width - 3` characters followed by `...` when it is wider than `width`.
pub fn truncate(width: usize, text: &str) -> String {
    if text.chars().count() > width {
        let mut cut: String = text.chars().take(width.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardRow {
    pub workflow: String,
    /// Names of the jobs currently running, comma separated.
    pub running_jobs: String,
    pub status: WorkflowStatus,
}

/// Visible rows of a snapshot: metrics and skipped workflows dropped, sorted by name.
pub fn build_rows(snapshot: &Snapshot, config: &WatchConfig) -> Result<Vec<DashboardRow>, ClassifyError> {
    let mut workflows: Vec<_> = snapshot
        .workflows
        .iter()
        .filter(|workflow| workflow.name != METRICS_WORKFLOW && !config.skip.contains(&workflow.name))
        .collect();
    workflows.sort_by(|a, b| a.name.cmp(&b.name));

    workflows
        .into_iter()
        .map(|workflow| -> Result<DashboardRow, ClassifyError> {
            let status = classify(workflow, &config.skip)?;
            let running_jobs = visible_jobs(workflow, &config.skip)
                .filter(|job| job.status == JobStatus::InProgress)
                .map(|job| job.name.as_str())
                .collect::<Vec<_>>()
                .join(",");
            Ok(DashboardRow {
                workflow: workflow.name.clone(),
                running_jobs,
                status,
            })
        })
        .collect()
}

/// Verdict for one tick's statuses, `None` while the run must keep going.
pub fn decide_verdict(statuses: &[WorkflowStatus], ignore_failures: bool) -> Option<Verdict> {
    if statuses.is_empty() {
        return None;
    }
    if statuses.iter().all(|status| *status == WorkflowStatus::Success) {
        Some(Verdict::Passed)
    } else if !ignore_failures && statuses.iter().any(|status| *status == WorkflowStatus::Failure) {
        Some(Verdict::Failed)
    } else if !statuses.iter().any(|status| *status == WorkflowStatus::InProgress) {
        Some(Verdict::Finished)
    } else {
        None
    }
}

/// In-place table over a line-oriented terminal.
///
/// Remembers how many rows the previous draw printed and moves the cursor back
/// over exactly that many lines before drawing again.
pub struct Dashboard<W> {
    out: W,
    printed_lines: usize,
    workflow_width: usize,
    jobs_width: usize,
    frame_period: u64,
}

impl<W: Write> Dashboard<W> {
    pub fn new(out: W, config: &WatchConfig) -> Self {
        Self {
            out,
            printed_lines: 0,
            workflow_width: config.workflow_width,
            jobs_width: config.jobs_width,
            frame_period: config.frame_period,
        }
    }

    pub fn header(&mut self) -> std::io::Result<()> {
        queue!(
            self.out,
            SetAttribute(Attribute::Bold),
            Print(format!(
                "{:<ww$}{:<jw$}{:<5}",
                "Workflow",
                "Running Jobs",
                "Status",
                ww = self.workflow_width,
                jw = self.jobs_width
            )),
            SetAttribute(Attribute::Reset),
            Print("\n")
        )?;
        self.out.flush()
    }

    pub fn draw(&mut self, rows: &[DashboardRow], tick: u64) -> std::io::Result<()> {
        if self.printed_lines > 0 {
            let lines = u16::try_from(self.printed_lines).unwrap_or(u16::MAX);
            queue!(self.out, MoveToPreviousLine(lines))?;
        }
        queue!(self.out, Clear(ClearType::FromCursorDown))?;
        for row in rows {
            writeln!(
                self.out,
                "{:<ww$}{:<jw$}{}",
                truncate(self.workflow_width, &row.workflow),
                truncate(self.jobs_width, &row.running_jobs),
                status_glyph(row.status, tick, self.frame_period),
                ww = self.workflow_width,
                jw = self.jobs_width
            )?;
        }
        self.printed_lines = rows.len();
        self.out.flush()
    }

    pub fn finish(&mut self, verdict: Verdict) -> std::io::Result<()> {
        let message = match verdict {
            Verdict::Passed => "All workflows completed.",
            Verdict::Failed => "One or more workflows failed.",
            Verdict::Finished => "All workflows finished (failures ignored).",
        };
        writeln!(self.out, "{message}")?;
        self.out.flush()
    }

    pub fn printed_lines(&self) -> usize {
        self.printed_lines
    }

    pub fn writer(&self) -> &W {
        &self.out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    WaitingForData,
    Rendering,
    Done(Verdict),
}

pub struct Renderer<W> {
    dashboard: Dashboard<W>,
    reader: SnapshotReader,
    config: WatchConfig,
    tick: u64,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, reader: SnapshotReader, config: WatchConfig) -> Self {
        Self {
            dashboard: Dashboard::new(out, &config),
            reader,
            config,
            tick: 0,
        }
    }

    /// Redraws every render tick until a verdict is reached. A conclusion that
    /// cannot be interpreted aborts the loop with an error instead.
    pub async fn run(mut self) -> Result<Verdict, WatchError> {
        self.dashboard.header()?;
        let mut ticker = tokio::time::interval(self.config.render_tick);
        loop {
            ticker.tick().await;
            if let RenderState::Done(verdict) = self.step()? {
                self.dashboard.finish(verdict)?;
                return Ok(verdict);
            }
        }
    }

    /// One render tick against the latest snapshot.
    pub fn step(&mut self) -> Result<RenderState, WatchError> {
        let tick = self.tick;
        self.tick += 1;

        let Some(snapshot) = self.reader.latest() else {
            return Ok(RenderState::WaitingForData);
        };
        let rows = build_rows(&snapshot, &self.config)?;
        self.dashboard.draw(&rows, tick)?;

        let statuses: Vec<_> = rows.iter().map(|row| row.status).collect();
        Ok(match decide_verdict(&statuses, self.config.ignore_failures) {
            Some(verdict) => RenderState::Done(verdict),
            None => RenderState::Rendering,
        })
    }

    pub fn dashboard(&self) -> &Dashboard<W> {
        &self.dashboard
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::store::SnapshotStore;
    use crate::{Conclusion, JobRecord, SkipSet, WorkflowRecord};

    fn done(name: &str, conclusion: Conclusion) -> JobRecord {
        JobRecord::new(name, JobStatus::Completed, Some(conclusion))
    }

    fn running(name: &str) -> JobRecord {
        JobRecord::new(name, JobStatus::InProgress, None)
    }

    fn narrow_config() -> WatchConfig {
        WatchConfig {
            workflow_width: 10,
            jobs_width: 12,
            ..WatchConfig::default()
        }
    }

    fn row(workflow: &str, running_jobs: &str, status: WorkflowStatus) -> DashboardRow {
        DashboardRow {
            workflow: workflow.to_string(),
            running_jobs: running_jobs.to_string(),
            status,
        }
    }

    fn output(dashboard: &Dashboard<Vec<u8>>) -> String {
        String::from_utf8(dashboard.writer().clone()).unwrap()
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate(10, "short"), "short");
        assert_eq!(truncate(10, "exactly10!"), "exactly10!");
        assert_eq!(truncate(10, "much longer name"), "much lo...");
        assert_eq!(truncate(5, "ünïcödé"), "ün...");
        assert_eq!(truncate(2, "abc"), "...");
    }

    #[test]
    fn test_frame_advances_every_period() {
        assert_eq!(frame_index(0, 10), 0);
        assert_eq!(frame_index(9, 10), 0);
        assert_eq!(frame_index(10, 10), 1);
        assert_eq!(frame_index(79, 10), 7);
        assert_eq!(frame_index(80, 10), 0);
        assert_eq!(frame_index(3, 0), 3);
    }

    #[test]
    fn test_status_glyphs() {
        assert_eq!(status_glyph(WorkflowStatus::Success, 0, 10), CHECK);
        assert_eq!(status_glyph(WorkflowStatus::Failure, 0, 10), CROSS);
        assert_eq!(status_glyph(WorkflowStatus::InProgress, 0, 10), "|");
        assert_eq!(status_glyph(WorkflowStatus::InProgress, 25, 10), "\u{2015}");
    }

    #[test]
    fn test_build_rows_filters_and_sorts() {
        let snapshot = Snapshot::new(vec![
            WorkflowRecord::new("lint", vec![done("clippy", Conclusion::Success)]),
            WorkflowRecord::new(METRICS_WORKFLOW, vec![running("collect")]),
            WorkflowRecord::new("deploy", vec![running("push")]),
            WorkflowRecord::new(
                "build",
                vec![running("linux"), running("flaky"), running("macos")],
            ),
        ]);
        let config = WatchConfig {
            skip: ["deploy", "flaky"].into_iter().collect(),
            ..WatchConfig::default()
        };

        let rows = build_rows(&snapshot, &config).unwrap();
        assert_eq!(
            rows,
            vec![
                row("build", "linux,macos", WorkflowStatus::InProgress),
                row("lint", "", WorkflowStatus::Success),
            ]
        );
    }

    #[test]
    fn test_decide_verdict() {
        use WorkflowStatus::*;

        assert_eq!(decide_verdict(&[], false), None);
        assert_eq!(decide_verdict(&[Success, Success], false), Some(Verdict::Passed));
        assert_eq!(decide_verdict(&[Success, Failure], false), Some(Verdict::Failed));
        assert_eq!(decide_verdict(&[InProgress, Failure], false), Some(Verdict::Failed));
        assert_eq!(decide_verdict(&[InProgress, Failure], true), None);
        assert_eq!(decide_verdict(&[Success, Failure], true), Some(Verdict::Finished));
        assert_eq!(decide_verdict(&[Success, Success], true), Some(Verdict::Passed));
        assert_eq!(decide_verdict(&[Success, InProgress], false), None);
    }

    #[test]
    fn test_draw_erases_previous_lines() {
        let mut dashboard = Dashboard::new(vec![], &narrow_config());
        dashboard
            .draw(
                &[
                    row("build", "linux", WorkflowStatus::InProgress),
                    row("lint", "", WorkflowStatus::Success),
                ],
                0,
            )
            .unwrap();
        assert_eq!(dashboard.printed_lines(), 2);
        let first = output(&dashboard);
        assert!(!first.contains("\x1b[2F"));
        assert_eq!(first.matches('\n').count(), 2);

        dashboard
            .draw(&[row("build", "", WorkflowStatus::Failure)], 1)
            .unwrap();
        assert_eq!(dashboard.printed_lines(), 1);
        let second = &output(&dashboard)[first.len()..];
        assert!(second.starts_with("\x1b[2F"));
        assert_eq!(second.matches('\n').count(), 1);

        dashboard.draw(&[], 2).unwrap();
        let third = &output(&dashboard)[first.len() + second.len()..];
        assert!(third.starts_with("\x1b[1F"));
        assert_eq!(third.matches('\n').count(), 0);
        assert_eq!(dashboard.printed_lines(), 0);
    }

    #[test]
    fn test_draw_row_layout() {
        let mut dashboard = Dashboard::new(vec![], &narrow_config());
        dashboard
            .draw(
                &[row("a very long workflow", "one,two,three", WorkflowStatus::Failure)],
                0,
            )
            .unwrap();
        assert_eq!(
            output(&dashboard),
            format!("\x1b[Ja very ...one,two,t...{CROSS}\n")
        );
    }

    #[test]
    fn test_waits_for_first_snapshot() {
        let store = SnapshotStore::new();
        let mut renderer = Renderer::new(vec![], store.reader(), narrow_config());
        assert_eq!(renderer.step().unwrap(), RenderState::WaitingForData);
        assert_eq!(renderer.dashboard().printed_lines(), 0);
        assert!(renderer.dashboard().writer().is_empty());
    }

    #[test]
    fn test_empty_snapshot_keeps_rendering() {
        let store = SnapshotStore::new();
        store.publish(Snapshot::new(vec![WorkflowRecord::new(
            METRICS_WORKFLOW,
            vec![done("collect", Conclusion::Success)],
        )]));
        let mut renderer = Renderer::new(vec![], store.reader(), narrow_config());
        assert_eq!(renderer.step().unwrap(), RenderState::Rendering);
    }

    #[test]
    fn test_failure_is_final_while_others_run() {
        let store = SnapshotStore::new();
        store.publish(Snapshot::new(vec![
            WorkflowRecord::new("build", vec![running("linux")]),
            WorkflowRecord::new("test", vec![done("unit", Conclusion::Failure)]),
        ]));
        let mut renderer = Renderer::new(vec![], store.reader(), narrow_config());
        assert_eq!(renderer.step().unwrap(), RenderState::Done(Verdict::Failed));
        assert_eq!(renderer.dashboard().printed_lines(), 2);
    }

    #[test]
    fn test_unknown_conclusion_aborts() {
        let store = SnapshotStore::new();
        store.publish(Snapshot::new(vec![WorkflowRecord::new(
            "build",
            vec![done("linux", Conclusion::Other("CANCELLED".to_string()))],
        )]));
        let mut renderer = Renderer::new(vec![], store.reader(), narrow_config());
        let err = renderer.step().unwrap_err();
        assert!(matches!(err, WatchError::Classify(ClassifyError::UnknownConclusion { .. })));
        assert_eq!(renderer.dashboard().printed_lines(), 0);
    }

    #[test]
    fn test_terminal_snapshot_gives_same_verdict_on_every_tick() {
        let store = SnapshotStore::new();
        store.publish(Snapshot::new(vec![
            WorkflowRecord::new("build", vec![done("linux", Conclusion::Success)]),
            WorkflowRecord::new("test", vec![done("unit", Conclusion::Failure)]),
        ]));
        let config = WatchConfig {
            ignore_failures: true,
            skip: SkipSet::default(),
            ..narrow_config()
        };
        for ticks_before in 0..5 {
            let mut renderer = Renderer::new(vec![], store.reader(), config.clone());
            renderer.tick = ticks_before * 7;
            assert_eq!(renderer.step().unwrap(), RenderState::Done(Verdict::Finished));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_picks_up_published_snapshot() {
        let store = Arc::new(SnapshotStore::new());
        let renderer = Renderer::new(vec![], store.reader(), narrow_config());
        let publisher = {
            let store = store.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                store.publish(Snapshot::new(vec![WorkflowRecord::new(
                    "build",
                    vec![done("linux", Conclusion::Success)],
                )]));
            })
        };

        let verdict = renderer.run().await.unwrap();
        assert_eq!(verdict, Verdict::Passed);
        publisher.await.unwrap();
    }
}
