use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::detection::domain::expression_smoother::ExpressionSmoother;
use crate::detection::domain::face_detector::{DetectorOptions, FaceExpressionDetector};
use crate::detection::domain::face_selector::pick_largest_face;
use crate::overlay::domain::overlay_renderer::{Badge, OverlayRenderer};
use crate::pipeline::detection_executor::{DetectionExecutor, DetectionOutcome, SubmitError};
use crate::pipeline::fps_counter::FpsCounter;
use crate::pipeline::interval_gate::IntervalGate;
use crate::pipeline::session_logger::SessionLogger;
use crate::pipeline::session_status::{SessionError, SessionStatus};
use crate::shared::constants::DETECTOR_INPUT_SIZE;
use crate::shared::frame::Frame;
use crate::shared::settings::SettingsSource;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::{VideoReader, VideoSource};

/// Opens the frame source, reporting a camera error status on failure.
pub fn open_source(
    reader: &mut dyn VideoReader,
    source: &VideoSource,
    logger: &mut dyn SessionLogger,
) -> Result<VideoMetadata, SessionError> {
    logger.status(SessionStatus::OpeningCamera);
    reader.open(source).map_err(|e| {
        logger.status(SessionStatus::CameraError);
        SessionError::CameraUnavailable {
            device: source.to_string(),
            reason: e.to_string(),
        }
    })
}

/// Builds the detector once, reporting model load progress and failure.
pub fn load_detector<F>(
    load: F,
    logger: &mut dyn SessionLogger,
) -> Result<Box<dyn FaceExpressionDetector>, SessionError>
where
    F: FnOnce() -> Result<Box<dyn FaceExpressionDetector>, SessionError>,
{
    logger.status(SessionStatus::LoadingModels);
    match load() {
        Ok(detector) => {
            logger.status(SessionStatus::ModelsLoaded);
            Ok(detector)
        }
        Err(e) => {
            logger.status(SessionStatus::ModelLoadFailed);
            Err(e)
        }
    }
}

/// Live expression recognition over a stream of frames.
///
/// Every frame clears the overlays. Once per update interval the current
/// frame goes to the detection executor; finished detections feed the
/// largest face's scores into the smoother (or decay toward neutral when
/// no face was found) and redraw the overlays.
pub struct LiveExpressionSession {
    smoother: ExpressionSmoother,
    gate: IntervalGate,
    fps: FpsCounter,
    executor: Box<dyn DetectionExecutor>,
    settings: Box<dyn SettingsSource>,
    renderers: Vec<Box<dyn OverlayRenderer>>,
    logger: Box<dyn SessionLogger>,
    input_size: u32,
    cycles: usize,
    busy_skips: usize,
}

impl LiveExpressionSession {
    pub fn new(
        executor: Box<dyn DetectionExecutor>,
        settings: Box<dyn SettingsSource>,
        renderers: Vec<Box<dyn OverlayRenderer>>,
        logger: Box<dyn SessionLogger>,
    ) -> Self {
        Self {
            smoother: ExpressionSmoother::new(),
            gate: IntervalGate::new(),
            fps: FpsCounter::new(),
            executor,
            settings,
            renderers,
            logger,
            input_size: DETECTOR_INPUT_SIZE,
            cycles: 0,
            busy_skips: 0,
        }
    }

    pub fn with_input_size(mut self, input_size: u32) -> Self {
        self.input_size = input_size;
        self
    }

    pub fn smoother(&self) -> &ExpressionSmoother {
        &self.smoother
    }

    pub fn last_update_ms(&self) -> f64 {
        self.gate.last_update_ms()
    }

    pub fn fps(&self) -> Option<u32> {
        self.fps.fps()
    }

    /// Detection cycles whose outcome has been applied.
    pub fn cycles(&self) -> usize {
        self.cycles
    }

    /// Due ticks rejected because a detection was still in flight.
    pub fn busy_skips(&self) -> usize {
        self.busy_skips
    }

    /// Handles one frame callback.
    pub fn on_frame(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let now = frame.timestamp_ms();
        self.logger.frame(frame.index());
        if let Some(fps) = self.fps.tick(now) {
            self.logger.metric("fps", fps as f64);
        }

        for renderer in &mut self.renderers {
            renderer.clear();
        }

        let settings = self.settings.current();
        if self.gate.is_due(now, settings.effective_interval_ms()) {
            let options = DetectorOptions {
                input_size: self.input_size,
                score_threshold: settings.min_confidence,
            };
            match self.executor.submit(frame.clone(), options) {
                Ok(()) => self.gate.mark(now),
                Err(SubmitError::Busy) => self.busy_skips += 1,
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(outcome) = self.executor.try_take() {
            self.apply(outcome, settings.smoothing)?;
        }
        Ok(())
    }

    /// Drives the session from `reader` until the source ends, `cancelled`
    /// is set, or `max_frames` frames were handled. Returns the frame count.
    pub fn run(
        &mut self,
        reader: &mut dyn VideoReader,
        cancelled: &AtomicBool,
        max_frames: Option<usize>,
    ) -> Result<usize, Box<dyn std::error::Error>> {
        let mut handled = 0;
        for frame_result in reader.frames() {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            let frame = frame_result?;

            let started = Instant::now();
            self.on_frame(&frame)?;
            self.logger
                .timing("frame", started.elapsed().as_secs_f64() * 1000.0);

            handled += 1;
            if max_frames.is_some_and(|max| handled >= max) {
                break;
            }
        }
        reader.close();

        self.finish()?;
        Ok(handled)
    }

    /// Applies a detection still in flight and emits the summary.
    pub fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(outcome) = self.executor.wait() {
            let alpha = self.settings.current().smoothing;
            self.apply(outcome, alpha)?;
        }
        self.logger.metric("busy_skips", self.busy_skips as f64);
        self.logger.info(&format!(
            "Final expression: {} after {} cycles",
            self.smoother.select_best().label(),
            self.cycles
        ));
        self.logger.summary();
        Ok(())
    }

    fn apply(
        &mut self,
        outcome: DetectionOutcome,
        alpha: f64,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.logger.timing("detect", outcome.duration_ms);

        let detections = match outcome.result {
            Ok(detections) => detections,
            Err(e) => {
                log::error!("Detection failed on frame {}: {e}", outcome.frame.index());
                return Ok(());
            }
        };
        self.cycles += 1;
        self.logger.metric("faces", detections.len() as f64);

        match pick_largest_face(&detections) {
            Some(face) => {
                self.smoother.update(&face.expressions, alpha);
                let best = self.smoother.select_best();
                let badge = Badge::new(&best, Some(1.0 - alpha));
                for renderer in &mut self.renderers {
                    renderer.draw_face(&outcome.frame, &face.region, &best)?;
                    renderer.show_badge(&badge)?;
                }
            }
            None => {
                self.smoother.decay_to_neutral(alpha);
                let badge = Badge::new(&self.smoother.select_best(), None);
                for renderer in &mut self.renderers {
                    renderer.show_badge(&badge)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_detector::FaceDetection;
    use crate::pipeline::detection_executor::InlineDetectionExecutor;
    use crate::pipeline::session_logger::NullSessionLogger;
    use crate::shared::expression::{BestExpression, Expression, ExpressionScores};
    use crate::shared::region::Region;
    use crate::shared::settings::Settings;
    use approx::assert_relative_eq;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    type Script = VecDeque<Result<Vec<FaceDetection>, String>>;

    /// Replays scripted results and records every call.
    struct ScriptedDetector {
        script: Arc<Mutex<Script>>,
        calls: Arc<Mutex<Vec<(usize, DetectorOptions)>>>,
    }

    impl FaceExpressionDetector for ScriptedDetector {
        fn detect(
            &mut self,
            frame: &Frame,
            options: &DetectorOptions,
        ) -> Result<Vec<FaceDetection>, Box<dyn std::error::Error>> {
            self.calls.lock().unwrap().push((frame.index(), *options));
            match self.script.lock().unwrap().pop_front() {
                Some(Ok(faces)) => Ok(faces),
                Some(Err(e)) => Err(e.into()),
                None => Ok(Vec::new()),
            }
        }
    }

    /// Holds every submission until the test completes it by hand.
    #[derive(Default)]
    struct ManualExecutor {
        pending: Option<Frame>,
        finished: Option<DetectionOutcome>,
        submitted: usize,
    }

    struct SharedManual(Arc<Mutex<ManualExecutor>>);

    impl SharedManual {
        fn complete(handle: &Arc<Mutex<ManualExecutor>>, result: Result<Vec<FaceDetection>, String>) {
            let mut inner = handle.lock().unwrap();
            let frame = inner.pending.take().unwrap();
            inner.finished = Some(DetectionOutcome {
                frame,
                result,
                duration_ms: 1.0,
            });
        }
    }

    impl DetectionExecutor for SharedManual {
        fn submit(&mut self, frame: Frame, _options: DetectorOptions) -> Result<(), SubmitError> {
            let mut inner = self.0.lock().unwrap();
            if inner.pending.is_some() || inner.finished.is_some() {
                return Err(SubmitError::Busy);
            }
            inner.pending = Some(frame);
            inner.submitted += 1;
            Ok(())
        }

        fn is_busy(&self) -> bool {
            let inner = self.0.lock().unwrap();
            inner.pending.is_some() || inner.finished.is_some()
        }

        fn try_take(&mut self) -> Option<DetectionOutcome> {
            self.0.lock().unwrap().finished.take()
        }

        fn wait(&mut self) -> Option<DetectionOutcome> {
            let mut inner = self.0.lock().unwrap();
            if let Some(frame) = inner.pending.take() {
                return Some(DetectionOutcome {
                    frame,
                    result: Ok(Vec::new()),
                    duration_ms: 1.0,
                });
            }
            inner.finished.take()
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Clear,
        Face(Region, BestExpression),
        Badge(String, Option<f64>),
    }

    struct RecordingRenderer(Arc<Mutex<Vec<Event>>>);

    impl OverlayRenderer for RecordingRenderer {
        fn clear(&mut self) {
            self.0.lock().unwrap().push(Event::Clear);
        }

        fn draw_face(
            &mut self,
            _frame: &Frame,
            region: &Region,
            best: &BestExpression,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.0.lock().unwrap().push(Event::Face(*region, *best));
            Ok(())
        }

        fn show_badge(&mut self, badge: &Badge) -> Result<(), Box<dyn std::error::Error>> {
            self.0
                .lock()
                .unwrap()
                .push(Event::Badge(format!("{} {}", badge.emoji, badge.text), badge.opacity));
            Ok(())
        }
    }

    struct SharedSettings(Arc<Mutex<Settings>>);

    impl SettingsSource for SharedSettings {
        fn current(&mut self) -> Settings {
            *self.0.lock().unwrap()
        }
    }

    struct Harness {
        session: LiveExpressionSession,
        script: Arc<Mutex<Script>>,
        calls: Arc<Mutex<Vec<(usize, DetectorOptions)>>>,
        events: Arc<Mutex<Vec<Event>>>,
        settings: Arc<Mutex<Settings>>,
    }

    fn settings(smoothing: f64, update_ms: u64) -> Settings {
        Settings {
            smoothing,
            min_confidence: 0.5,
            update_ms,
        }
    }

    fn harness(initial: Settings) -> Harness {
        let script = Arc::new(Mutex::new(Script::new()));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let events = Arc::new(Mutex::new(Vec::new()));
        let shared_settings = Arc::new(Mutex::new(initial));

        let detector = ScriptedDetector {
            script: script.clone(),
            calls: calls.clone(),
        };
        let session = LiveExpressionSession::new(
            Box::new(InlineDetectionExecutor::new(Box::new(detector))),
            Box::new(SharedSettings(shared_settings.clone())),
            vec![Box::new(RecordingRenderer(events.clone()))],
            Box::new(NullSessionLogger),
        );
        Harness {
            session,
            script,
            calls,
            events,
            settings: shared_settings,
        }
    }

    fn frame_at(index: usize, timestamp_ms: f64) -> Frame {
        Frame::new(vec![0u8; 300], 10, 10, 3, index, timestamp_ms)
    }

    fn face(w: f64, h: f64, expressions: ExpressionScores) -> FaceDetection {
        FaceDetection {
            region: Region::new(1.0, 1.0, w, h),
            score: 0.9,
            expressions,
        }
    }

    fn happy_face() -> FaceDetection {
        face(
            10.0,
            10.0,
            ExpressionScores::from_pairs([(Expression::Happy, 0.8), (Expression::Neutral, 0.2)]),
        )
    }

    #[test]
    fn test_frame_before_interval_runs_no_cycle() {
        let mut h = harness(settings(0.5, 100));
        h.session.on_frame(&frame_at(0, 50.0)).unwrap();
        assert!(h.calls.lock().unwrap().is_empty());
        assert_eq!(h.session.last_update_ms(), 0.0);
    }

    #[test]
    fn test_due_frame_runs_one_cycle_and_marks() {
        let mut h = harness(settings(0.5, 100));
        h.script.lock().unwrap().push_back(Ok(vec![happy_face()]));

        h.session.on_frame(&frame_at(0, 50.0)).unwrap();
        h.session.on_frame(&frame_at(1, 150.0)).unwrap();

        assert_eq!(h.calls.lock().unwrap().len(), 1);
        assert_eq!(h.session.last_update_ms(), 150.0);
        assert_eq!(h.session.cycles(), 1);
        let scores = h.session.smoother().scores();
        assert_relative_eq!(scores.get(Expression::Happy), 0.4);
        assert_relative_eq!(scores.get(Expression::Neutral), 0.1);
    }

    #[test]
    fn test_face_cycle_draws_box_and_badge_with_opacity() {
        let mut h = harness(settings(0.5, 100));
        h.script.lock().unwrap().push_back(Ok(vec![happy_face()]));
        h.session.on_frame(&frame_at(0, 100.0)).unwrap();

        let events = h.events.lock().unwrap();
        assert_eq!(events[0], Event::Clear);
        match &events[1] {
            Event::Face(region, best) => {
                assert_eq!(*region, Region::new(1.0, 1.0, 10.0, 10.0));
                assert_eq!(best.expression, Expression::Happy);
                assert_relative_eq!(best.score, 0.4);
            }
            other => panic!("expected face, got {other:?}"),
        }
        assert_eq!(events[2], Event::Badge("😀 happy (0.40)".into(), Some(0.5)));
    }

    #[test]
    fn test_overlay_cleared_on_every_frame() {
        let mut h = harness(settings(0.5, 1000));
        for i in 0..5 {
            h.session.on_frame(&frame_at(i, i as f64 * 33.0)).unwrap();
        }
        let events = h.events.lock().unwrap();
        assert_eq!(events.len(), 5);
        assert!(events.iter().all(|e| *e == Event::Clear));
    }

    #[test]
    fn test_largest_face_drives_update() {
        let mut h = harness(settings(0.0, 100));
        h.script.lock().unwrap().push_back(Ok(vec![
            face(5.0, 5.0, ExpressionScores::only(Expression::Sad, 1.0)),
            face(20.0, 20.0, ExpressionScores::only(Expression::Angry, 1.0)),
            face(20.0, 20.0, ExpressionScores::only(Expression::Surprised, 1.0)),
        ]));
        h.session.on_frame(&frame_at(0, 100.0)).unwrap();

        let best = h.session.smoother().select_best();
        assert_eq!(best.expression, Expression::Angry);
        assert_relative_eq!(best.score, 1.0);
    }

    #[test]
    fn test_no_face_decays_toward_neutral_without_opacity() {
        let mut h = harness(settings(0.5, 100));
        {
            let mut script = h.script.lock().unwrap();
            script.push_back(Ok(vec![happy_face()]));
            script.push_back(Ok(Vec::new()));
        }
        h.session.on_frame(&frame_at(0, 100.0)).unwrap();
        h.session.on_frame(&frame_at(1, 200.0)).unwrap();

        let scores = h.session.smoother().scores();
        assert_relative_eq!(scores.get(Expression::Happy), 0.2);
        assert_relative_eq!(scores.get(Expression::Neutral), 0.55);
        assert_eq!(h.session.smoother().select_best().expression, Expression::Neutral);

        let events = h.events.lock().unwrap();
        assert_eq!(
            events.last(),
            Some(&Event::Badge("😐 neutral (0.55)".into(), None))
        );
        assert_eq!(
            events.iter().filter(|e| matches!(e, Event::Face(..))).count(),
            1
        );
    }

    #[test]
    fn test_repeated_no_face_converges_to_neutral() {
        let mut h = harness(settings(0.5, 30));
        h.script.lock().unwrap().push_back(Ok(vec![happy_face()]));
        for i in 0..60 {
            h.session.on_frame(&frame_at(i, 30.0 * (i + 1) as f64)).unwrap();
        }
        let scores = h.session.smoother().scores();
        assert!(scores.get(Expression::Happy) < 1e-9);
        assert_relative_eq!(scores.get(Expression::Neutral), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_detection_error_leaves_state_unchanged() {
        let mut h = harness(settings(0.5, 100));
        {
            let mut script = h.script.lock().unwrap();
            script.push_back(Ok(vec![happy_face()]));
            script.push_back(Err("session lost".into()));
        }
        h.session.on_frame(&frame_at(0, 100.0)).unwrap();
        let before = *h.session.smoother().scores();
        let events_before = h.events.lock().unwrap().len();

        h.session.on_frame(&frame_at(1, 200.0)).unwrap();

        assert_eq!(*h.session.smoother().scores(), before);
        assert_eq!(h.session.cycles(), 1);
        // only the clear for the failing frame
        assert_eq!(h.events.lock().unwrap().len(), events_before + 1);
        // the interval still advanced, so the next tick retries on schedule
        assert_eq!(h.session.last_update_ms(), 200.0);
    }

    #[test]
    fn test_alpha_one_freezes_state() {
        let mut h = harness(settings(0.5, 100));
        h.script.lock().unwrap().push_back(Ok(vec![happy_face()]));
        h.session.on_frame(&frame_at(0, 100.0)).unwrap();
        let frozen = *h.session.smoother().scores();

        h.settings.lock().unwrap().smoothing = 1.0;
        h.script
            .lock()
            .unwrap()
            .push_back(Ok(vec![face(9.0, 9.0, ExpressionScores::only(Expression::Sad, 1.0))]));
        h.session.on_frame(&frame_at(1, 200.0)).unwrap();
        h.session.on_frame(&frame_at(2, 300.0)).unwrap();

        assert_eq!(*h.session.smoother().scores(), frozen);
    }

    #[test]
    fn test_out_of_range_alpha_passes_through() {
        let mut h = harness(settings(1.5, 100));
        h.script
            .lock()
            .unwrap()
            .push_back(Ok(vec![face(9.0, 9.0, ExpressionScores::only(Expression::Happy, 1.0))]));
        h.session.on_frame(&frame_at(0, 100.0)).unwrap();
        // 1.5 * 0 + (1 - 1.5) * 1 extrapolates below zero
        assert_relative_eq!(h.session.smoother().scores().get(Expression::Happy), -0.5);
    }

    #[test]
    fn test_settings_changes_apply_next_cycle() {
        let mut h = harness(settings(0.5, 100));
        h.session.on_frame(&frame_at(0, 100.0)).unwrap();

        {
            let mut s = h.settings.lock().unwrap();
            s.min_confidence = 0.8;
            s.update_ms = 500;
        }
        h.session.on_frame(&frame_at(1, 200.0)).unwrap();
        h.session.on_frame(&frame_at(2, 600.0)).unwrap();

        let calls = h.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_relative_eq!(calls[0].1.score_threshold, 0.5);
        assert_eq!(calls[1].0, 2);
        assert_relative_eq!(calls[1].1.score_threshold, 0.8);
        assert_eq!(calls[1].1.input_size, DETECTOR_INPUT_SIZE);
    }

    #[test]
    fn test_interval_floor_applies() {
        let mut h = harness(settings(0.5, 1));
        h.session.on_frame(&frame_at(0, 20.0)).unwrap();
        h.session.on_frame(&frame_at(1, 30.0)).unwrap();
        h.session.on_frame(&frame_at(2, 45.0)).unwrap();
        h.session.on_frame(&frame_at(3, 60.0)).unwrap();

        let calls = h.calls.lock().unwrap();
        let frames: Vec<usize> = calls.iter().map(|(index, _)| *index).collect();
        assert_eq!(frames, vec![1, 3]);
    }

    fn manual_session() -> (LiveExpressionSession, Arc<Mutex<ManualExecutor>>, Arc<Mutex<Vec<Event>>>) {
        let manual = Arc::new(Mutex::new(ManualExecutor::default()));
        let events = Arc::new(Mutex::new(Vec::new()));
        let session = LiveExpressionSession::new(
            Box::new(SharedManual(manual.clone())),
            Box::new(SharedSettings(Arc::new(Mutex::new(settings(0.5, 100))))),
            vec![Box::new(RecordingRenderer(events.clone()))],
            Box::new(NullSessionLogger),
        );
        (session, manual, events)
    }

    #[test]
    fn test_busy_executor_rejects_tick_without_advancing() {
        let (mut session, manual, _events) = manual_session();

        session.on_frame(&frame_at(0, 100.0)).unwrap();
        assert_eq!(session.last_update_ms(), 100.0);

        session.on_frame(&frame_at(1, 250.0)).unwrap();
        session.on_frame(&frame_at(2, 260.0)).unwrap();
        assert_eq!(session.last_update_ms(), 100.0);
        assert_eq!(session.busy_skips(), 2);
        assert_eq!(manual.lock().unwrap().submitted, 1);

        SharedManual::complete(&manual, Ok(vec![happy_face()]));
        session.on_frame(&frame_at(3, 270.0)).unwrap();
        assert_eq!(session.cycles(), 1);
        assert_eq!(session.busy_skips(), 3);

        // idle again: the very next callback submits, since the interval
        // was never advanced while busy
        session.on_frame(&frame_at(4, 280.0)).unwrap();
        assert_eq!(manual.lock().unwrap().submitted, 2);
        assert_eq!(session.last_update_ms(), 280.0);
    }

    #[test]
    fn test_result_applied_on_later_callback() {
        let (mut session, manual, events) = manual_session();
        session.on_frame(&frame_at(0, 100.0)).unwrap();
        SharedManual::complete(&manual, Ok(vec![happy_face()]));
        session.on_frame(&frame_at(1, 110.0)).unwrap();

        let events = events.lock().unwrap();
        // clear(frame 0), clear(frame 1), face, badge
        assert_eq!(events.len(), 4);
        assert_eq!(events[1], Event::Clear);
        assert!(matches!(events[2], Event::Face(..)));
        assert_relative_eq!(session.smoother().scores().get(Expression::Happy), 0.4);
    }

    #[test]
    fn test_finish_applies_in_flight_detection() {
        let (mut session, _manual, _events) = manual_session();
        session.on_frame(&frame_at(0, 100.0)).unwrap();
        assert_eq!(session.cycles(), 0);

        session.finish().unwrap();
        assert_eq!(session.cycles(), 1);
        assert_relative_eq!(session.smoother().scores().get(Expression::Neutral), 0.5);
    }

    #[test]
    fn test_fps_reported_after_one_second() {
        let mut h = harness(settings(0.5, 10_000));
        for i in 0..=30 {
            h.session.on_frame(&frame_at(i, i as f64 * 1000.0 / 30.0)).unwrap();
        }
        assert_eq!(h.session.fps(), Some(31));
    }

    struct VecReader {
        frames: Vec<Frame>,
        fail_open: bool,
        closed: bool,
        /// Raises the flag as the frame with this index is read, like a
        /// Ctrl+C arriving mid-stream.
        cancel_at: Option<(usize, Arc<AtomicBool>)>,
    }

    impl VideoReader for VecReader {
        fn open(
            &mut self,
            source: &VideoSource,
        ) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            if self.fail_open {
                return Err("Permission denied".into());
            }
            Ok(VideoMetadata {
                width: 10,
                height: 10,
                fps: 30.0,
                codec: "rawvideo".into(),
                source: source.to_string(),
                live: source.is_camera(),
            })
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            let cancel_at = self.cancel_at.clone();
            Box::new(
                self.frames
                    .drain(..)
                    .inspect(move |frame| {
                        if let Some((index, flag)) = &cancel_at {
                            if frame.index() == *index {
                                flag.store(true, Ordering::SeqCst);
                            }
                        }
                    })
                    .map(Ok::<Frame, Box<dyn std::error::Error>>),
            )
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    fn reader(count: usize) -> VecReader {
        VecReader {
            frames: (0..count).map(|i| frame_at(i, i as f64 * 40.0)).collect(),
            fail_open: false,
            closed: false,
            cancel_at: None,
        }
    }

    #[derive(Default)]
    struct LogRecord {
        infos: Vec<String>,
        summaries: usize,
    }

    struct RecordingLogger(Arc<Mutex<LogRecord>>);

    impl SessionLogger for RecordingLogger {
        fn frame(&mut self, _index: usize) {}
        fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
        fn metric(&mut self, _name: &str, _value: f64) {}
        fn status(&mut self, _status: SessionStatus) {}

        fn info(&mut self, message: &str) {
            self.0.lock().unwrap().infos.push(message.to_string());
        }

        fn summary(&self) {
            self.0.lock().unwrap().summaries += 1;
        }
    }

    #[test]
    fn test_run_processes_all_frames_and_closes() {
        let mut h = harness(settings(0.5, 100));
        let mut source = reader(10);
        let handled = h
            .session
            .run(&mut source, &AtomicBool::new(false), None)
            .unwrap();
        assert_eq!(handled, 10);
        assert!(source.closed);
        // due at 120, 240, 360
        assert_eq!(h.calls.lock().unwrap().len(), 3);
        assert_eq!(h.session.cycles(), 3);
    }

    #[test]
    fn test_run_respects_max_frames() {
        let mut h = harness(settings(0.5, 100));
        let handled = h
            .session
            .run(&mut reader(10), &AtomicBool::new(false), Some(4))
            .unwrap();
        assert_eq!(handled, 4);
    }

    #[test]
    fn test_run_stops_when_cancelled() {
        let mut h = harness(settings(0.5, 100));
        let handled = h
            .session
            .run(&mut reader(10), &AtomicBool::new(true), None)
            .unwrap();
        assert_eq!(handled, 0);
    }

    #[test]
    fn test_cancel_mid_run_closes_source_and_summarizes() {
        let manual = Arc::new(Mutex::new(ManualExecutor::default()));
        let record = Arc::new(Mutex::new(LogRecord::default()));
        let mut session = LiveExpressionSession::new(
            Box::new(SharedManual(manual.clone())),
            Box::new(SharedSettings(Arc::new(Mutex::new(settings(0.5, 100))))),
            Vec::new(),
            Box::new(RecordingLogger(record.clone())),
        );

        let cancelled = Arc::new(AtomicBool::new(false));
        let mut source = reader(10);
        source.cancel_at = Some((5, cancelled.clone()));

        let handled = session.run(&mut source, &cancelled, None).unwrap();

        // frames 0..=4 handled, frame 3 (120 ms) submitted and left in flight
        assert_eq!(handled, 5);
        assert!(source.closed);
        assert_eq!(manual.lock().unwrap().submitted, 1);
        assert_eq!(session.cycles(), 1);

        let record = record.lock().unwrap();
        assert_eq!(record.summaries, 1);
        assert_eq!(
            record.infos,
            vec!["Final expression: neutral (0.50) after 1 cycles".to_string()]
        );
    }

    #[test]
    fn test_open_source_failure_reports_camera_error() {
        let mut logger = crate::pipeline::session_logger::StdoutSessionLogger::default();
        let mut source = reader(0);
        source.fail_open = true;

        let err = open_source(&mut source, &VideoSource::detect("/dev/video0"), &mut logger)
            .unwrap_err();
        assert_eq!(err.status(), SessionStatus::CameraError);
        assert!(err.to_string().contains("Permission denied"));
        assert_eq!(
            logger.statuses(),
            &[SessionStatus::OpeningCamera, SessionStatus::CameraError]
        );
    }

    #[test]
    fn test_open_source_success() {
        let mut logger = NullSessionLogger;
        let metadata =
            open_source(&mut reader(0), &VideoSource::detect("/dev/video0"), &mut logger).unwrap();
        assert!(metadata.live);
    }

    #[test]
    fn test_load_detector_reports_statuses() {
        let mut logger = crate::pipeline::session_logger::StdoutSessionLogger::default();
        let result = load_detector(|| Err(SessionError::ModelLoad("truncated file".into())), &mut logger);
        assert!(result.is_err());
        assert_eq!(
            logger.statuses(),
            &[SessionStatus::LoadingModels, SessionStatus::ModelLoadFailed]
        );

        let mut logger = crate::pipeline::session_logger::StdoutSessionLogger::default();
        let detector = load_detector(
            || {
                Ok(Box::new(ScriptedDetector {
                    script: Arc::new(Mutex::new(Script::new())),
                    calls: Arc::new(Mutex::new(Vec::new())),
                }) as Box<dyn FaceExpressionDetector>)
            },
            &mut logger,
        );
        assert!(detector.is_ok());
        assert_eq!(
            logger.statuses(),
            &[SessionStatus::LoadingModels, SessionStatus::ModelsLoaded]
        );
    }
}
