/// Receives `(fraction, label)` notifications while a run advances.
///
/// Purely observational: nothing an observer does can change the outcome.
pub trait ProgressObserver {
    fn on_progress(&mut self, fraction: f32, label: &str);
}

impl<F> ProgressObserver for F
where
    F: FnMut(f32, &str),
{
    fn on_progress(&mut self, fraction: f32, label: &str) {
        self(fraction, label)
    }
}

/// Observer that discards every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&mut self, _fraction: f32, _label: &str) {}
}

/// Pipeline stages as announced to observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Detection,
    Classification,
    Segmentation,
    CalorieEstimation,
    Finishing,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Detection => "Running Detection",
            Stage::Classification => "Running Classification",
            Stage::Segmentation => "Running Segmentation",
            Stage::CalorieEstimation => "Running Calorie Estimation",
            Stage::Finishing => "Finishing Process",
        }
    }
}

/// Announces numbered stages out of a fixed total.
pub(crate) struct StageReporter<'a> {
    observer: &'a mut dyn ProgressObserver,
    total: u32,
}

impl<'a> StageReporter<'a> {
    pub(crate) fn new(observer: &'a mut dyn ProgressObserver, total: u32) -> Self {
        Self { observer, total }
    }

    pub(crate) fn enter(&mut self, step: u32, stage: Stage) {
        log::debug!("[{}/{}] {}", step, self.total, stage.label());
        self.observer
            .on_progress(step as f32 / self.total as f32, stage.label());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_observe_fractions() {
        let mut seen = Vec::new();
        {
            let mut record = |fraction: f32, label: &str| seen.push((fraction, label.to_string()));
            let mut reporter = StageReporter::new(&mut record, 4);
            reporter.enter(1, Stage::Detection);
            reporter.enter(4, Stage::Finishing);
        }
        assert_eq!(
            seen,
            vec![
                (0.25, "Running Detection".to_string()),
                (1.0, "Finishing Process".to_string())
            ]
        );
    }
}
