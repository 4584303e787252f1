//! Event loop that drives a session from user actions and clock ticks.
//!
//! Actions arrive on a channel; ticks come from a periodic timer that
//! exists only while the session's countdown is running. Both kinds of
//! event are handled one at a time, to completion, including any report
//! delivery they trigger. Nothing else touches the session meanwhile, so a
//! submit and an expiry can never both score the same attempt.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval};

use crate::error::SessionError;
use crate::model::ReportAck;
use crate::proctor::Proctor;
use crate::session::{Action, ExamSession, SessionTick};

/// Progress reporting trait.
pub trait SessionObserver: Send + Sync {
    /// One second elapsed; `remaining` seconds are left.
    fn on_tick(&self, remaining: u32);
    /// An action was accepted.
    fn on_action(&self, action: &Action, session: &ExamSession);
    /// The countdown reached zero and the attempt was scored.
    fn on_time_up(&self, session: &ExamSession);
    /// The scored report reached the sink.
    fn on_delivered(&self, session: &ExamSession, ack: &ReportAck);
    /// An action was rejected or a delivery failed.
    fn on_error(&self, error: &SessionError);
}

/// No-op observer.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_tick(&self, _: u32) {}
    fn on_action(&self, _: &Action, _: &ExamSession) {}
    fn on_time_up(&self, _: &ExamSession) {}
    fn on_delivered(&self, _: &ExamSession, _: &ReportAck) {}
    fn on_error(&self, _: &SessionError) {}
}

pub struct SessionRunner {
    proctor: Arc<Proctor>,
    observer: Arc<dyn SessionObserver>,
    tick_period: Duration,
}

impl SessionRunner {
    pub fn new(proctor: Arc<Proctor>, observer: Arc<dyn SessionObserver>) -> Self {
        Self {
            proctor,
            observer,
            tick_period: Duration::from_secs(1),
        }
    }

    /// Override the wall-clock length of one countdown second.
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Process events until [`Action::Leave`] or until `actions` closes.
    ///
    /// Returns the session, with its countdown cancelled.
    pub async fn run(
        &self,
        mut session: ExamSession,
        mut actions: mpsc::Receiver<Action>,
    ) -> ExamSession {
        let mut ticker: Option<Interval> = None;

        loop {
            tokio::select! {
                biased;
                action = actions.recv() => match action {
                    None | Some(Action::Leave) => break,
                    Some(action) => self.handle_action(&mut session, action).await,
                },
                _ = next_tick(&mut ticker) => self.handle_tick(&mut session).await,
            }
            self.sync_ticker(&session, &mut ticker);
        }

        session.leave();
        session
    }

    async fn handle_action(&self, session: &mut ExamSession, action: Action) {
        match session.apply(action.clone()) {
            Ok(Some(_)) => {
                self.observer.on_action(&action, session);
                self.deliver(session).await;
            }
            Ok(None) => self.observer.on_action(&action, session),
            Err(e) => self.observer.on_error(&e),
        }
    }

    async fn handle_tick(&self, session: &mut ExamSession) {
        match session.tick() {
            SessionTick::Ignored => {}
            SessionTick::Remaining(secs) => self.observer.on_tick(secs),
            SessionTick::TimedOut(_) => {
                self.observer.on_tick(0);
                self.observer.on_time_up(session);
                self.deliver(session).await;
            }
        }
    }

    async fn deliver(&self, session: &mut ExamSession) {
        match self.proctor.deliver(session).await {
            Ok(ack) => self.observer.on_delivered(session, &ack),
            Err(e) => self.observer.on_error(&e),
        }
    }

    /// Keep a ticker alive exactly while the countdown runs.
    fn sync_ticker(&self, session: &ExamSession, ticker: &mut Option<Interval>) {
        match (session.is_clock_running(), ticker.is_some()) {
            (true, false) => {
                let first = Instant::now() + self.tick_period;
                *ticker = Some(interval_at(first, self.tick_period));
            }
            (false, true) => *ticker = None,
            _ => {}
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) -> Instant {
    match ticker {
        Some(interval) => interval.tick().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::model::fixtures::two_question_exam;
    use crate::model::{SubmitTrigger, Verdict};
    use crate::proctor::DeliveryPolicy;
    use crate::session::Mode;
    use crate::traits::doubles::{FlakySink, StaticStore};

    #[derive(Default)]
    struct Recorder {
        ticks: Mutex<Vec<u32>>,
        time_ups: Mutex<u32>,
        delivered: Mutex<u32>,
        errors: Mutex<Vec<String>>,
    }

    impl SessionObserver for Recorder {
        fn on_tick(&self, remaining: u32) {
            self.ticks.lock().unwrap().push(remaining);
        }
        fn on_action(&self, _: &Action, _: &ExamSession) {}
        fn on_time_up(&self, _: &ExamSession) {
            *self.time_ups.lock().unwrap() += 1;
        }
        fn on_delivered(&self, _: &ExamSession, _: &ReportAck) {
            *self.delivered.lock().unwrap() += 1;
        }
        fn on_error(&self, error: &SessionError) {
            self.errors.lock().unwrap().push(error.to_string());
        }
    }

    async fn setup(
        sink_failures: u32,
    ) -> (SessionRunner, ExamSession, Arc<FlakySink>, Arc<Recorder>) {
        let sink = Arc::new(FlakySink::new(sink_failures));
        let proctor = Arc::new(Proctor::new(
            Arc::new(StaticStore::with(two_question_exam())),
            sink.clone(),
            DeliveryPolicy {
                max_retries: 0,
                retry_delay: Duration::from_millis(1),
            },
        ));
        let session = proctor.open("exam-1", "user-1").await.unwrap();
        let recorder = Arc::new(Recorder::default());
        let runner = SessionRunner::new(proctor, recorder.clone());
        (runner, session, sink, recorder)
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_scores_and_delivers_once() {
        let (runner, session, sink, recorder) = setup(0).await;
        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(async move { runner.run(session, rx).await });

        tx.send(Action::Start).await.unwrap();
        tx.send(Action::Select {
            index: 0,
            key: "A".into(),
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_secs(15)).await;
        drop(tx);

        let session = handle.await.unwrap();
        assert_eq!(session.mode(), Mode::Scored);
        assert_eq!(session.seconds_remaining(), 0);
        assert_eq!(
            *recorder.ticks.lock().unwrap(),
            vec![9, 8, 7, 6, 5, 4, 3, 2, 1, 0]
        );
        assert_eq!(*recorder.time_ups.lock().unwrap(), 1);
        assert_eq!(*recorder.delivered.lock().unwrap(), 1);

        let delivered = sink.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].trigger, SubmitTrigger::Timeout);
        assert_eq!(delivered[0].result.verdict, Verdict::Pass);
    }

    #[tokio::test(start_paused = true)]
    async fn submit_just_before_expiry_wins() {
        let (runner, session, sink, recorder) = setup(0).await;
        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(async move { runner.run(session, rx).await });

        tx.send(Action::Start).await.unwrap();
        tx.send(Action::Next).await.unwrap();
        tokio::time::sleep(Duration::from_millis(9_500)).await;
        tx.send(Action::Submit).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(tx);

        let session = handle.await.unwrap();
        assert_eq!(session.mode(), Mode::Scored);
        assert_eq!(session.seconds_remaining(), 1);
        assert_eq!(*recorder.time_ups.lock().unwrap(), 0);

        let delivered = sink.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].trigger, SubmitTrigger::Manual);
    }

    #[tokio::test(start_paused = true)]
    async fn leave_stops_the_clock() {
        let (runner, session, sink, recorder) = setup(0).await;
        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(async move { runner.run(session, rx).await });

        tx.send(Action::Start).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        tx.send(Action::Leave).await.unwrap();

        let session = handle.await.unwrap();
        assert!(!session.is_clock_running());
        assert_eq!(session.mode(), Mode::InProgress);
        assert_eq!(*recorder.ticks.lock().unwrap(), vec![9, 8]);
        assert_eq!(sink.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_delivery_can_be_resubmitted() {
        let (runner, session, sink, recorder) = setup(1).await;
        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(async move { runner.run(session, rx).await });

        tx.send(Action::Start).await.unwrap();
        tx.send(Action::Next).await.unwrap();
        tx.send(Action::Submit).await.unwrap();
        tx.send(Action::Review).await.unwrap();
        tx.send(Action::Resubmit).await.unwrap();
        tx.send(Action::Review).await.unwrap();
        drop(tx);

        let session = handle.await.unwrap();
        assert_eq!(session.mode(), Mode::Reviewed);
        assert_eq!(sink.attempts(), 2);
        assert_eq!(sink.delivered().len(), 1);

        let errors = recorder.errors.lock().unwrap();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("failed to submit report"));
        assert!(errors[1].contains("invalid action `review`"));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_timeout_delivery_keeps_result_for_resubmit() {
        let (runner, session, sink, recorder) = setup(1).await;
        let runner = Arc::new(runner);
        let (tx, rx) = mpsc::channel(16);
        let first = Arc::clone(&runner);
        let handle = tokio::spawn(async move { first.run(session, rx).await });

        tx.send(Action::Start).await.unwrap();
        tx.send(Action::Select {
            index: 0,
            key: "A".into(),
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_secs(15)).await;
        drop(tx);

        let session = handle.await.unwrap();
        assert_eq!(session.mode(), Mode::InProgress);
        assert!(!session.is_clock_running());
        assert_eq!(session.seconds_remaining(), 0);
        assert!(session.awaiting_delivery());
        assert_eq!(session.result().map(|r| r.verdict), Some(Verdict::Pass));
        let pending_id = session.pending_report().unwrap().id;
        assert_eq!(*recorder.time_ups.lock().unwrap(), 1);
        assert_eq!(sink.attempts(), 1);

        let (tx, rx) = mpsc::channel(16);
        tx.send(Action::Resubmit).await.unwrap();
        drop(tx);
        let session = runner.run(session, rx).await;

        assert_eq!(session.mode(), Mode::Scored);
        assert!(!session.awaiting_delivery());
        let delivered = sink.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].id, pending_id);
        assert_eq!(delivered[0].trigger, SubmitTrigger::Timeout);
        assert_eq!(*recorder.time_ups.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retake_restarts_the_countdown() {
        let (runner, session, sink, _recorder) = setup(0).await;
        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(async move { runner.run(session, rx).await });

        tx.send(Action::Start).await.unwrap();
        tokio::time::sleep(Duration::from_secs(12)).await;
        tx.send(Action::Retake).await.unwrap();
        tx.send(Action::Start).await.unwrap();
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        drop(tx);

        let session = handle.await.unwrap();
        assert_eq!(session.mode(), Mode::InProgress);
        assert_eq!(session.seconds_remaining(), 7);
        assert_eq!(sink.delivered().len(), 1);
    }
}
