use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use soaplite::engine::progress::{Progress, ProgressCallback};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Renders frame-batch progress as a single bar on stderr.
///
/// Failed frames are printed above the bar as they happen and counted
/// into the final message.
#[derive(Clone)]
pub struct CliProgressHandler {
    bar: ProgressBar,
    failed: Arc<AtomicUsize>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::with_draw_target(
            Some(0),
            ProgressDrawTarget::stderr(),
        ))
    }

    fn with_bar(bar: ProgressBar) -> Self {
        bar.set_style(Self::bar_style());
        Self {
            bar,
            failed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let bar = self.bar.clone();
        let failed = Arc::clone(&self.failed);

        Box::new(move |progress: Progress| match progress {
            Progress::BatchStart { total_frames } => {
                failed.store(0, Ordering::Relaxed);
                bar.reset();
                bar.set_length(total_frames);
                bar.set_message("Frames");
            }
            Progress::FrameFinished { .. } => bar.inc(1),
            Progress::FrameFailed { index, reason } => {
                failed.fetch_add(1, Ordering::Relaxed);
                bar.println(format!("  ✗ frame {}: {}", index + 1, reason));
                bar.inc(1);
            }
            Progress::BatchFinish => {
                let message = match failed.load(Ordering::Relaxed) {
                    0 => "✓ Done".to_string(),
                    n => format!("✗ {} failed", n),
                };
                bar.finish_with_message(message);
            }
        })
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<12} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .expect("Failed to create bar style template")
            .with_key(
                "eta",
                |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
                },
            )
            .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn hidden_handler() -> CliProgressHandler {
        CliProgressHandler::with_bar(ProgressBar::hidden())
    }

    #[test]
    fn batch_events_drive_the_bar() {
        let handler = hidden_handler();
        let callback = handler.get_callback();

        callback(Progress::BatchStart { total_frames: 3 });
        assert_eq!(handler.bar.length(), Some(3));
        assert_eq!(handler.bar.position(), 0);
        assert_eq!(handler.bar.message(), "Frames");

        callback(Progress::FrameFinished { index: 2 });
        callback(Progress::FrameFinished { index: 0 });
        assert_eq!(handler.bar.position(), 2);

        callback(Progress::FrameFinished { index: 1 });
        callback(Progress::BatchFinish);
        assert!(handler.bar.is_finished());
        assert_eq!(handler.bar.message(), "✓ Done");
    }

    #[test]
    fn failed_frames_advance_the_bar_and_are_counted() {
        let handler = hidden_handler();
        let callback = handler.get_callback();

        callback(Progress::BatchStart { total_frames: 2 });
        callback(Progress::FrameFailed {
            index: 0,
            reason: "Structure contains no atoms".to_string(),
        });
        callback(Progress::FrameFinished { index: 1 });
        callback(Progress::BatchFinish);

        assert_eq!(handler.bar.position(), 2);
        assert_eq!(handler.bar.message(), "✗ 1 failed");
    }

    #[test]
    fn callback_is_thread_safe() {
        let handler = hidden_handler();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::BatchStart { total_frames: 1 });
            callback(Progress::FrameFinished { index: 0 });
            callback(Progress::BatchFinish);
        })
        .join()
        .unwrap();

        assert!(handler.bar.is_finished());
        assert_eq!(handler.bar.position(), 1);
    }
}
