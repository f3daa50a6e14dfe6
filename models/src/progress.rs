use std::{fmt::Write, sync::Arc, time::{Duration, Instant}};

use crate::notify::{edit_best_effort, MessageHandle, Notifier};

#[derive(Debug, Clone)]
pub struct ProgressStep {
    pub name: String,
    pub started_at: Instant,
    pub ended_at: Option<Instant>,
}

impl ProgressStep {
    fn open(name: &str) -> Self {
        Self { name: name.to_string(), started_at: Instant::now(), ended_at: None }
    }

    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Elapsed time of the step, measured up to now while it is still open.
    pub fn duration(&self) -> Duration {
        let end = self.ended_at.unwrap_or_else(Instant::now);
        end.saturating_duration_since(self.started_at)
    }
}

/// Ordered steps of a single backend's save. At most the last step is open.
#[derive(Debug, Clone, Default)]
pub struct StepTimeline {
    steps: Vec<ProgressStep>,
}

impl StepTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, name: &str) {
        self.close();
        self.steps.push(ProgressStep::open(name));
    }

    pub fn close(&mut self) {
        if let Some(step) = self.steps.last_mut() {
            if step.is_open() {
                step.ended_at = Some(Instant::now());
            }
        }
    }

    pub fn steps(&self) -> &[ProgressStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            if step.is_open() {
                let _ = writeln!(out, "  ⏳ {}", step.name);
            } else {
                let _ = writeln!(out, "  ✔ {} ({})", step.name, format_duration(step.duration()));
            }
        }
        out
    }
}

pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        let secs = d.as_secs();
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

/// Handed to a backend for the length of one save. Each `step` call moves the
/// timeline forward and refreshes the backend's status message.
pub struct Progress {
    backend: String,
    notifier: Option<Arc<dyn Notifier>>,
    handle: Option<MessageHandle>,
    timeline: StepTimeline,
}

impl Progress {
    pub fn new(backend: &str, notifier: Arc<dyn Notifier>, handle: Option<MessageHandle>) -> Self {
        Self { backend: backend.to_string(), notifier: Some(notifier), handle, timeline: StepTimeline::new() }
    }

    pub fn detached(backend: &str) -> Self {
        Self { backend: backend.to_string(), notifier: None, handle: None, timeline: StepTimeline::new() }
    }

    pub async fn step(&mut self, name: &str) {
        tracing::debug!(backend = %self.backend, step = name, "Save step started");
        self.timeline.start(name);
        if let Some(notifier) = &self.notifier {
            let text = format!("📝 {} saving\n{}", self.backend, self.timeline.render());
            edit_best_effort(notifier.as_ref(), self.handle.as_ref(), &text).await;
        }
    }

    pub fn handle(&self) -> Option<&MessageHandle> {
        self.handle.as_ref()
    }

    pub fn timeline(&self) -> &StepTimeline {
        &self.timeline
    }

    pub fn finish(mut self) -> StepTimeline {
        self.timeline.close();
        self.timeline
    }
}
