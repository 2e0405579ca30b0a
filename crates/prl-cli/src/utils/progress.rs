use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use prlstructure::engine::progress::{Progress, ProgressCallback};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

const SPINNER_TICK_MS: u64 = 80;

/// Shows the phases of a generation run on stderr and counts the structure files it writes.
///
/// Each workflow phase is drawn as a numbered spinner and left behind as a `✓` line when it
/// finishes. Per-structure work uses a bar. With `quiet` nothing is drawn but the counts are
/// still kept.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: ProgressBar,
    completed_phases: Arc<Mutex<Vec<&'static str>>>,
    structures_written: Arc<AtomicUsize>,
}

impl CliProgressHandler {
    pub fn new(quiet: bool) -> Self {
        let target = if quiet {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stderr()
        };
        let pb = ProgressBar::with_draw_target(Some(0), target).with_style(spinner_style());
        Self {
            pb,
            completed_phases: Arc::new(Mutex::new(Vec::new())),
            structures_written: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb = self.pb.clone();
        let completed = self.completed_phases.clone();
        let current: Mutex<Option<&'static str>> = Mutex::new(None);

        Box::new(move |progress: Progress| match progress {
            Progress::PhaseStart { name } => {
                let step = completed.lock().map(|c| c.len() + 1).unwrap_or(1);
                if let Ok(mut current) = current.lock() {
                    *current = Some(name);
                }
                pb.reset();
                pb.set_length(0);
                pb.set_style(spinner_style());
                pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                pb.set_message(format!("[{step}] {name}"));
            }
            Progress::PhaseFinish => {
                pb.disable_steady_tick();
                let name = current.lock().ok().and_then(|mut c| c.take());
                let Some(name) = name else {
                    return;
                };
                pb.println(format!("✓ {name}"));
                match completed.lock() {
                    Ok(mut c) => c.push(name),
                    Err(_) => warn!("Phase list mutex was poisoned; '{}' is not recorded.", name),
                }
            }
            Progress::TaskStart { total_steps } => {
                pb.disable_steady_tick();
                pb.reset();
                pb.set_length(total_steps);
                pb.set_style(bar_style());
            }
            Progress::TaskIncrement => pb.inc(1),
            Progress::TaskFinish => {
                if let Some(len) = pb.length() {
                    pb.set_position(len);
                }
            }
            Progress::Message(msg) => pb.println(format!("  {msg}")),
        })
    }

    /// Records one structure file written by the command.
    pub fn structure_written(&self, path: &Path) {
        let count = self.structures_written.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("Structure {} written to {:?}", count, path);
        self.pb.set_message(format!("Writing structures ({count})"));
        self.pb.tick();
    }

    pub fn structures_written(&self) -> usize {
        self.structures_written.load(Ordering::Relaxed)
    }

    pub fn completed_phases(&self) -> Vec<&'static str> {
        self.completed_phases
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Clears the bar and returns the number of structure files written.
    pub fn finish(&self) -> usize {
        self.pb.finish_and_clear();
        self.structures_written()
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg:<24} [{bar:40.cyan/blue}] {pos}/{len} structures")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}
