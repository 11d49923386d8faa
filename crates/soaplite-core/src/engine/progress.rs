/// Events emitted while computing descriptors for a batch of structures.
///
/// Frame events may arrive out of order when frames are processed in parallel.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    BatchStart { total_frames: u64 },
    FrameFinished { index: usize },
    FrameFailed { index: usize, reason: String },
    BatchFinish,
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    pub fn is_silent(&self) -> bool {
        self.callback.is_none()
    }
}
