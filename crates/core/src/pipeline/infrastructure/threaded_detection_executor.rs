use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::detection::domain::face_detector::{DetectorOptions, FaceExpressionDetector};
use crate::pipeline::detection_executor::{
    run_detection, DetectionExecutor, DetectionOutcome, SubmitError,
};
use crate::shared::frame::Frame;

type Job = (Frame, DetectorOptions);

/// Runs the detector on a dedicated worker thread.
///
/// Layout: `session --job--> worker --outcome--> session`, both channels
/// bounded to one slot. The frame loop never blocks on inference; while a
/// detection is in flight further submissions are rejected.
pub struct ThreadedDetectionExecutor {
    job_tx: Option<Sender<Job>>,
    outcome_rx: Receiver<DetectionOutcome>,
    handle: Option<std::thread::JoinHandle<()>>,
    in_flight: bool,
}

impl ThreadedDetectionExecutor {
    pub fn new(detector: Box<dyn FaceExpressionDetector>) -> Self {
        let (job_tx, job_rx) = crossbeam_channel::bounded::<Job>(1);
        let (outcome_tx, outcome_rx) = crossbeam_channel::bounded::<DetectionOutcome>(1);
        let handle = spawn_worker(detector, job_rx, outcome_tx);

        Self {
            job_tx: Some(job_tx),
            outcome_rx,
            handle: Some(handle),
            in_flight: false,
        }
    }
}

fn spawn_worker(
    mut detector: Box<dyn FaceExpressionDetector>,
    job_rx: Receiver<Job>,
    outcome_tx: Sender<DetectionOutcome>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for (frame, options) in job_rx {
            let outcome = run_detection(detector.as_mut(), frame, &options);
            if outcome_tx.send(outcome).is_err() {
                break;
            }
        }
    })
}

impl DetectionExecutor for ThreadedDetectionExecutor {
    fn submit(&mut self, frame: Frame, options: DetectorOptions) -> Result<(), SubmitError> {
        if self.in_flight {
            return Err(SubmitError::Busy);
        }
        let job_tx = self.job_tx.as_ref().ok_or(SubmitError::Disconnected)?;
        job_tx
            .send((frame, options))
            .map_err(|_| SubmitError::Disconnected)?;
        self.in_flight = true;
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.in_flight
    }

    fn try_take(&mut self) -> Option<DetectionOutcome> {
        if !self.in_flight {
            return None;
        }
        match self.outcome_rx.try_recv() {
            Ok(outcome) => {
                self.in_flight = false;
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::error!("Detection worker exited with a job in flight");
                self.in_flight = false;
                None
            }
        }
    }

    fn wait(&mut self) -> Option<DetectionOutcome> {
        if !self.in_flight {
            return None;
        }
        self.in_flight = false;
        self.outcome_rx.recv().ok()
    }
}

impl Drop for ThreadedDetectionExecutor {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop.
        self.job_tx.take();
        if self.in_flight {
            let _ = self.outcome_rx.recv();
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Detection worker panicked");
            }
        }
    }
}
