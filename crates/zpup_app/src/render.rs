use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::{Duration, Instant};

use zpup_core::{BatchPhase, TaskId, UploadResult};
use zpup_engine::UploadEvent;
use zpup_logging::zpup_debug;

const REDRAW_INTERVAL: Duration = Duration::from_millis(200);
const STATUS_WIDTH: usize = 100;

struct Transfer {
    name: String,
    sent: u64,
    total: u64,
}

impl Transfer {
    fn percent(&self) -> u64 {
        if self.total == 0 {
            100
        } else {
            self.sent.min(self.total) * 100 / self.total
        }
    }
}

/// Turns upload events into a single refreshed status line plus one
/// permanent line per finished file.
pub struct Renderer<W: Write> {
    out: W,
    active: BTreeMap<TaskId, Transfer>,
    last_draw: Option<Instant>,
    drawn_width: usize,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            active: BTreeMap::new(),
            last_draw: None,
            drawn_width: 0,
        }
    }

    pub fn handle(&mut self, event: UploadEvent, now: Instant) -> io::Result<()> {
        match event {
            UploadEvent::PhaseChanged(BatchPhase::Cancelling) => {
                self.line("Stopping: no new uploads will start", now)
            }
            UploadEvent::PhaseChanged(_) => Ok(()),
            UploadEvent::TaskStarted {
                task_id,
                display_name,
                total_bytes,
            } => {
                self.active.insert(
                    task_id,
                    Transfer {
                        name: display_name,
                        sent: 0,
                        total: total_bytes,
                    },
                );
                self.redraw(now, true)
            }
            UploadEvent::Progress {
                task_id,
                bytes_sent,
                ..
            } => {
                if let Some(transfer) = self.active.get_mut(&task_id) {
                    transfer.sent = bytes_sent;
                }
                self.redraw(now, false)
            }
            UploadEvent::Retrying {
                task_id,
                attempt,
                reason,
            } => {
                let name = self.name_of(task_id);
                if let Some(transfer) = self.active.get_mut(&task_id) {
                    transfer.sent = 0;
                }
                self.line(&format!("{name}: retrying (attempt {attempt}) after {reason}"), now)
            }
            UploadEvent::TaskFinished { task_id, result } => {
                let name = self.name_of(task_id);
                self.active.remove(&task_id);
                let text = match result {
                    UploadResult::Success { share_url, .. } => {
                        format!("{name} uploaded to {share_url}")
                    }
                    UploadResult::Failure(failure) => {
                        format!("{name} failed: {} ({})", failure.kind, failure.message)
                    }
                };
                self.line(&text, now)
            }
        }
    }

    /// Clears the status line; call once the event stream ends.
    pub fn finish(&mut self) -> io::Result<()> {
        self.clear()?;
        self.out.flush()
    }

    fn name_of(&self, task_id: TaskId) -> String {
        self.active
            .get(&task_id)
            .map(|transfer| transfer.name.clone())
            .unwrap_or_else(|| task_id.to_string())
    }

    fn line(&mut self, text: &str, now: Instant) -> io::Result<()> {
        self.clear()?;
        writeln!(self.out, "{text}")?;
        self.redraw(now, true)
    }

    fn redraw(&mut self, now: Instant, force: bool) -> io::Result<()> {
        let due = self
            .last_draw
            .is_none_or(|last| now.duration_since(last) >= REDRAW_INTERVAL);
        if !force && !due {
            return Ok(());
        }
        self.last_draw = Some(now);

        self.clear()?;
        if self.active.is_empty() {
            return self.out.flush();
        }
        let status = self.status();
        write!(self.out, "{status}")?;
        self.drawn_width = status.chars().count();
        self.out.flush()
    }

    fn status(&self) -> String {
        let transfers: Vec<String> = self
            .active
            .values()
            .map(|transfer| format!("{} {}%", transfer.name, transfer.percent()))
            .collect();
        let status = format!("Uploading {}: {}", self.active.len(), transfers.join(" | "));
        if status.chars().count() > STATUS_WIDTH {
            let cut: String = status.chars().take(STATUS_WIDTH - 3).collect();
            format!("{cut}...")
        } else {
            status
        }
    }

    fn clear(&mut self) -> io::Result<()> {
        if self.drawn_width > 0 {
            write!(self.out, "\r{:width$}\r", "", width = self.drawn_width)?;
            self.drawn_width = 0;
        }
        Ok(())
    }
}

/// Renders events on stderr from a dedicated thread until every sender is dropped.
pub fn spawn(events: Receiver<UploadEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut renderer = Renderer::new(io::stderr());
        for event in events {
            if let Err(err) = renderer.handle(event, Instant::now()) {
                zpup_debug!("Progress output failed: {}", err);
            }
        }
        let _ = renderer.finish();
    })
}
