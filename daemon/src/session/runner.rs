//! Session event loop
//!
//! Serializes user commands and clock ticks onto one loop so no two
//! callbacks ever touch the session at the same time. Keeps the ticker
//! armed exactly while the session is running.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::tick::Ticker;

use super::clock::TimerState;
use super::machine::{Session, SessionError};
use super::snapshot::SessionSnapshot;

/// User actions accepted by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    StartPause,
    Reset,
    SetDuration(u32),
    SetSound(bool),
    SetBreathingGuidance(bool),
    SetAmbientSound(bool),
    /// Read-only, returns the current snapshot
    Snapshot,
}

/// An action plus the channel its result is reported on
#[derive(Debug)]
pub struct Command {
    pub action: Action,
    pub reply: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
}

/// Cloneable sender side used by the IPC server
#[derive(Debug, Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    pub fn new(command_tx: mpsc::Sender<Command>) -> Self {
        Self { command_tx }
    }

    /// Submit an action and wait for the resulting snapshot
    pub async fn request(&self, action: Action) -> Result<SessionSnapshot, SessionError> {
        let (reply, reply_rx) = oneshot::channel();
        self.command_tx
            .send(Command { action, reply })
            .await
            .map_err(|_| SessionError::Unavailable)?;
        reply_rx.await.map_err(|_| SessionError::Unavailable)?
    }
}

enum Input {
    Command(Command),
    Tick,
    Closed,
}

/// Owns the session and its tick driver
pub struct SessionRunner {
    session: Session,
    ticker: Ticker,
}

impl SessionRunner {
    pub fn new(session: Session, ticker: Ticker) -> Self {
        Self { session, ticker }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Process commands and ticks until every command sender is gone
    pub async fn run(&mut self, mut command_rx: mpsc::Receiver<Command>) {
        info!(state = %self.session.timer_state(), "session loop started");

        loop {
            let input = tokio::select! {
                command = command_rx.recv() => match command {
                    Some(command) => Input::Command(command),
                    None => Input::Closed,
                },
                _ = self.ticker.tick() => Input::Tick,
            };

            match input {
                Input::Command(Command { action, reply }) => {
                    let result = self.apply(action);
                    if reply.send(result).is_err() {
                        debug!(?action, "requester went away before the reply");
                    }
                }
                Input::Tick => self.on_tick(),
                Input::Closed => break,
            }
        }

        info!("session loop stopped");
    }

    /// Apply one user action
    pub fn apply(&mut self, action: Action) -> Result<SessionSnapshot, SessionError> {
        debug!(?action, "applying action");
        match action {
            Action::StartPause => self.session.start_pause(),
            Action::Reset => self.session.reset(),
            Action::SetDuration(secs) => {
                self.session.set_duration(secs)?;
            }
            Action::SetSound(enabled) => self.session.set_sound_enabled(enabled),
            Action::SetBreathingGuidance(enabled) => self.session.set_breathing_guidance(enabled),
            Action::SetAmbientSound(enabled) => self.session.set_ambient_sound(enabled),
            Action::Snapshot => {}
        }
        self.sync_ticker();
        Ok(self.session.snapshot())
    }

    fn on_tick(&mut self) {
        self.session.tick();
        self.sync_ticker();
    }

    /// Arm on entry to Running, cancel on every exit from it
    fn sync_ticker(&mut self) {
        if self.session.timer_state() == TimerState::Running {
            self.ticker.arm();
        } else {
            self.ticker.cancel();
        }
    }

    /// Stop the tick and release audio on daemon exit
    pub fn teardown(&mut self) {
        self.ticker.cancel();
        self.session.teardown();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::broadcast;

    use super::*;
    use crate::audio::testing::{AudioCall, RecordingAudio};
    use crate::session::{BreathingPhase, SessionDuration, Settings};

    fn create_runner(secs: u32) -> (SessionRunner, RecordingAudio) {
        let (tx, _) = broadcast::channel(64);
        let audio = RecordingAudio::new();
        let session = Session::new(
            Settings {
                ambient_sound_enabled: true,
                ..Settings::default()
            },
            SessionDuration::try_from(secs).unwrap(),
            Box::new(audio.clone()),
            tx,
        );
        (SessionRunner::new(session, Ticker::every_second()), audio)
    }

    fn spawn_runner(mut runner: SessionRunner) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(8);
        tokio::spawn(async move {
            runner.run(command_rx).await;
        });
        SessionHandle::new(command_tx)
    }

    #[test]
    fn test_ticker_follows_running_state() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let _guard = rt.enter();

        let (mut runner, _) = create_runner(60);
        assert!(!runner.ticker.is_armed());

        runner.apply(Action::StartPause).unwrap();
        assert!(runner.ticker.is_armed());

        runner.apply(Action::StartPause).unwrap();
        assert_eq!(runner.session().timer_state(), TimerState::Paused);
        assert!(!runner.ticker.is_armed());

        runner.apply(Action::StartPause).unwrap();
        assert!(runner.ticker.is_armed());

        runner.apply(Action::Reset).unwrap();
        assert!(!runner.ticker.is_armed());
    }

    #[test]
    fn test_invalid_duration_is_reported() {
        let (mut runner, _) = create_runner(60);
        let result = runner.apply(Action::SetDuration(61));
        assert!(matches!(result, Err(SessionError::InvalidDuration(_))));
        assert_eq!(runner.apply(Action::Snapshot).unwrap().duration_secs, 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_drive_session() {
        let (runner, audio) = create_runner(180);
        let handle = spawn_runner(runner);

        let snapshot = handle.request(Action::StartPause).await.unwrap();
        assert_eq!(snapshot.timer_state, TimerState::Running);
        assert_eq!(snapshot.phase, BreathingPhase::In);

        tokio::time::sleep(Duration::from_millis(4500)).await;
        let snapshot = handle.request(Action::Snapshot).await.unwrap();
        assert_eq!(snapshot.time_left_secs, 176);
        assert_eq!(snapshot.time_left_display, "02:56");
        assert_eq!(snapshot.phase, BreathingPhase::Hold);
        assert_eq!(snapshot.phase_text, "Hold");
        assert!(audio.calls().contains(&AudioCall::StartAmbient));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_freezes_countdown() {
        let (runner, _) = create_runner(60);
        let handle = spawn_runner(runner);

        handle.request(Action::StartPause).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        let paused = handle.request(Action::StartPause).await.unwrap();
        assert_eq!(paused.timer_state, TimerState::Paused);
        assert_eq!(paused.time_left_secs, 58);

        tokio::time::sleep(Duration::from_secs(30)).await;
        let snapshot = handle.request(Action::Snapshot).await.unwrap();
        assert_eq!(snapshot.time_left_secs, 58);

        handle.request(Action::StartPause).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let snapshot = handle.request(Action::Snapshot).await.unwrap();
        assert_eq!(snapshot.time_left_secs, 57);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_finishes_and_stops_ticking() {
        let (runner, audio) = create_runner(60);
        let handle = spawn_runner(runner);

        handle.request(Action::StartPause).await.unwrap();
        tokio::time::sleep(Duration::from_secs(90)).await;

        let snapshot = handle.request(Action::Snapshot).await.unwrap();
        assert_eq!(snapshot.timer_state, TimerState::Finished);
        assert_eq!(snapshot.time_left_secs, 0);
        assert_eq!(snapshot.phase, BreathingPhase::Idle);
        assert!(!snapshot.ambient_playing);
        assert!(audio.calls().ends_with(&[AudioCall::StopAmbient]));
    }

    #[tokio::test]
    async fn test_handle_reports_closed_loop() {
        let (command_tx, command_rx) = mpsc::channel(1);
        drop(command_rx);
        let handle = SessionHandle::new(command_tx);
        assert!(matches!(
            handle.request(Action::Snapshot).await,
            Err(SessionError::Unavailable)
        ));
    }

    #[test]
    fn test_teardown_releases_audio() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let _guard = rt.enter();

        let (mut runner, audio) = create_runner(60);
        runner.apply(Action::StartPause).unwrap();
        audio.take();

        runner.teardown();
        assert!(!runner.ticker.is_armed());
        assert_eq!(audio.calls(), vec![AudioCall::CancelSpeech, AudioCall::StopAmbient]);
    }
}
