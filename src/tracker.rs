//! Progress tracking.
//!
//! The step controller tells a [`ProgressTracker`] about every completed
//! step. The tracker answers through an [`Acknowledger`], naming the step the
//! learner has now reached. Answers land on a channel that the session
//! drains once per frame, so a tracker may acknowledge immediately, later,
//! or from another thread without re-entering the controller.

use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::mpsc;

use crate::error::LabError;
use crate::steps::Step;

/// Receives completed steps.
pub trait ProgressTracker {
    /// Called once per completed step. Call `ack.acknowledge` (now or later)
    /// to let the lab continue.
    fn record(&mut self, step: Step, ack: &Acknowledger);
}

impl<F> ProgressTracker for F
where
    F: FnMut(Step, &Acknowledger),
{
    fn record(&mut self, step: Step, ack: &Acknowledger) {
        self(step, ack)
    }
}

/// Sending half of the acknowledgment channel.
#[derive(Clone, Debug)]
pub struct Acknowledger {
    sender: mpsc::Sender<String>,
}

impl Acknowledger {
    /// Queues an acknowledgment tag such as `"step2"`.
    pub fn acknowledge(&self, tag: impl Into<String>) {
        let tag = tag.into();
        if self.sender.send(tag.clone()).is_err() {
            log::debug!("acknowledgment '{}' dropped, session is gone", tag);
        }
    }

    /// Acknowledges that `step` has been reached.
    pub fn reached(&self, step: Step) {
        self.acknowledge(step.as_tag());
    }
}

/// Receiving half of the acknowledgment channel.
pub struct Acknowledgements {
    receiver: mpsc::Receiver<String>,
}

impl Acknowledgements {
    /// Takes every queued acknowledgment, in arrival order.
    pub fn drain(&self) -> Vec<String> {
        self.receiver.try_iter().collect()
    }
}

pub fn acknowledgement_channel() -> (Acknowledger, Acknowledgements) {
    let (sender, receiver) = mpsc::channel();
    (Acknowledger { sender }, Acknowledgements { receiver })
}

/// Acknowledges every step at once and keeps an in-memory log.
#[derive(Clone, Debug, Default)]
pub struct ImmediateTracker {
    log: Rc<RefCell<Vec<Step>>>,
}

impl ImmediateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the recorded steps; stays valid after the tracker
    /// is moved into a session.
    pub fn log(&self) -> Rc<RefCell<Vec<Step>>> {
        Rc::clone(&self.log)
    }
}

impl ProgressTracker for ImmediateTracker {
    fn record(&mut self, step: Step, ack: &Acknowledger) {
        self.log.borrow_mut().push(step);
        ack.reached(step.next());
    }
}

/// Appends each completed step to a file before acknowledging it.
///
/// A step is only acknowledged once its line is on disk. If writing fails
/// the error is logged and the step stays unacknowledged.
pub struct JournalTracker {
    path: PathBuf,
    file: File,
}

impl JournalTracker {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LabError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LabError::Journal {
                path: path.clone(),
                source,
            })?;
        log::info!("recording progress to {}", path.display());
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, step: Step) -> std::io::Result<()> {
        writeln!(self.file, "{}", step)?;
        self.file.flush()?;
        self.file.sync_data()
    }
}

impl ProgressTracker for JournalTracker {
    fn record(&mut self, step: Step, ack: &Acknowledger) {
        match self.append(step) {
            Ok(()) => ack.reached(step.next()),
            Err(e) => log::error!(
                "failed to record {} in {}: {}",
                step,
                self.path.display(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_tracker_acknowledges_the_next_step() {
        let (ack, acks) = acknowledgement_channel();
        let mut tracker = ImmediateTracker::new();
        let log = tracker.log();

        tracker.record(Step::Step1, &ack);
        tracker.record(Step::Step4, &ack);

        assert_eq!(acks.drain(), vec!["step2", "complete"]);
        assert_eq!(*log.borrow(), vec![Step::Step1, Step::Step4]);
        assert!(acks.drain().is_empty());
    }

    #[test]
    fn closures_are_trackers() {
        let (ack, acks) = acknowledgement_channel();
        let mut seen = Vec::new();
        {
            let mut tracker = |step: Step, _: &Acknowledger| seen.push(step);
            tracker.record(Step::Step2, &ack);
        }
        assert_eq!(seen, vec![Step::Step2]);
        assert!(acks.drain().is_empty());
    }

    #[test]
    fn acknowledging_after_the_session_is_gone_is_harmless() {
        let (ack, acks) = acknowledgement_channel();
        drop(acks);
        ack.acknowledge("step2");
    }

    #[test]
    fn journal_appends_one_line_per_step() {
        let path = std::env::temp_dir().join(format!(
            "virtual-lab-journal-{}.log",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let (ack, acks) = acknowledgement_channel();
        let mut tracker = JournalTracker::open(&path).unwrap();
        tracker.record(Step::Step1, &ack);
        tracker.record(Step::Step2, &ack);

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "step1\nstep2\n");
        assert_eq!(acks.drain(), vec!["step2", "step3"]);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn journal_in_missing_directory_fails_to_open() {
        let path = std::env::temp_dir()
            .join("virtual-lab-no-such-dir")
            .join("journal.log");
        assert!(matches!(
            JournalTracker::open(&path),
            Err(LabError::Journal { .. })
        ));
    }
}
