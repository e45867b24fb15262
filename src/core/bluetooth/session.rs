//! Per-device session management.
//! One actor task owns the peripheral, the write characteristic, and
//! every piece of connection state; the mailbox serializes writes and
//! state transitions so nothing about a device is ever mutated from
//! two places at once.
//!
//! Lifecycle: Idle -> Scanning -> Connecting -> Connected, back to
//! Idle through Disconnecting when the idle timer fires, and through
//! Reconnecting with exponential backoff when the link drops. After
//! `max_reconnect_attempts` consecutive failures the session rests for
//! a cooldown period, then attempts resume from zero.

use std::future::pending;
use std::time::Duration;

use log::{debug, error, info, trace, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, sleep_until, timeout};
use tokio_util::sync::CancellationToken;

use crate::config::SessionTuning;
use crate::core::bluetooth::commands::Frame;
use crate::core::bluetooth::link::LightLink;
use crate::core::bluetooth::queue::{WriteQueue, WriteRequest};
use crate::core::bluetooth::types::SessionStatus;
use crate::error::{Error, LinkError, Result};

/// Spawns the actor task that owns one device session.
///
/// The returned handle is the only way in; dropping every handle (or
/// calling [`SessionHandle::shutdown`]) stops the task after it has
/// torn the link down.
pub fn spawn_session<L: LightLink>(
    link: L,
    tuning: SessionTuning,
) -> (SessionHandle, JoinHandle<()>) {
    let (queue, rx) = WriteQueue::channel();
    let (status_tx, status_rx) = watch::channel(SessionStatus::Idle);
    let cancel = CancellationToken::new();
    let runtime = SessionRuntime {
        link,
        state: SessionState::new(&tuning),
        tuning,
        rx,
        status_tx,
        cancel: cancel.clone(),
    };
    let task = tokio::spawn(runtime.run());
    let handle = SessionHandle {
        queue,
        cancel,
        status: status_rx,
    };
    (handle, task)
}

/// Cloneable submit/teardown surface of a running session.
#[derive(Clone)]
pub struct SessionHandle {
    queue: WriteQueue,
    cancel: CancellationToken,
    status: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    /// Queues one encoded frame; resolves with its terminal outcome.
    pub async fn submit(&self, frame: Frame) -> Result<()> {
        self.queue.submit(frame).await
    }

    /// Last published connection status.
    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Requests teardown; the session disconnects and stops.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Mutable connection state, owned exclusively by the actor task.
struct SessionState {
    status: SessionStatus,
    reconnect_attempts: u32,
    backoff_delay: Duration,
    cooldown_until: Option<Instant>,
    idle_deadline: Option<Instant>,
}

impl SessionState {
    fn new(tuning: &SessionTuning) -> Self {
        Self {
            status: SessionStatus::Idle,
            reconnect_attempts: 0,
            backoff_delay: tuning.initial_backoff(),
            cooldown_until: None,
            idle_deadline: None,
        }
    }
}

enum Wake {
    Request(WriteRequest),
    ConnectionLost,
    IdleElapsed,
    CooldownElapsed,
    Shutdown,
}

struct SessionRuntime<L: LightLink> {
    link: L,
    tuning: SessionTuning,
    state: SessionState,
    rx: mpsc::Receiver<WriteRequest>,
    status_tx: watch::Sender<SessionStatus>,
    cancel: CancellationToken,
}

impl<L: LightLink> SessionRuntime<L> {
    async fn run(mut self) {
        debug!("Session task started");
        loop {
            let wake = {
                let status = self.state.status;
                let link = &self.link;
                let lost = async move {
                    if status == SessionStatus::Connected {
                        link.closed().await;
                    } else {
                        pending::<()>().await;
                    }
                };
                tokio::select! {
                    () = self.cancel.cancelled() => Wake::Shutdown,
                    request = self.rx.recv() => match request {
                        Some(request) => Wake::Request(request),
                        None => Wake::Shutdown,
                    },
                    () = lost => Wake::ConnectionLost,
                    () = maybe_sleep_until(self.state.idle_deadline) => Wake::IdleElapsed,
                    () = maybe_sleep_until(self.state.cooldown_until) => Wake::CooldownElapsed,
                }
            };

            match wake {
                Wake::Request(request) => self.handle_request(request).await,
                Wake::ConnectionLost => self.handle_connection_lost().await,
                Wake::IdleElapsed => self.handle_idle_elapsed().await,
                Wake::CooldownElapsed => self.handle_cooldown_elapsed(),
                Wake::Shutdown => break,
            }
        }
        self.teardown().await;
    }

    async fn handle_request(&mut self, request: WriteRequest) {
        let result = self.process_write(&request.frame).await;
        if let Err(err) = &result {
            error!("Command write failed: {err}");
        }
        // The submitter may have gone away; the outcome is best effort.
        let _ = request.done.send(result);
    }

    /// Runs one queued frame through the bounded retry policy.
    ///
    /// Each attempt first ensures the session is connected; a failed
    /// connection cycle consumes the attempt.
    async fn process_write(&mut self, frame: &Frame) -> Result<()> {
        let attempts = self.tuning.write_attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            if attempt > 1 {
                self.pause(self.tuning.write_retry_delay()).await?;
            }
            if !self.connected().await {
                match self.ensure_connected().await {
                    Ok(()) => {}
                    Err(err) => {
                        warn!("Write attempt {attempt}/{attempts}: no connection: {err}");
                        last_error = err.to_string();
                        continue;
                    }
                }
            }
            match self.link.write_frame(frame).await {
                Ok(()) => {
                    trace!("Wrote frame {frame:02x?}");
                    self.arm_idle_timer();
                    return Ok(());
                }
                Err(err) => {
                    warn!("Write attempt {attempt}/{attempts} failed: {err}");
                    last_error = err.to_string();
                }
            }
        }
        Err(Error::Write {
            attempts,
            reason: last_error,
        })
    }

    /// Brings the session to Connected, one connection cycle per call.
    ///
    /// A call while already connected returns immediately with no side
    /// effects. Each failed cycle increments the reconnect counter and
    /// widens the backoff; exhausting the counter drops the session to
    /// Idle for a cooldown period.
    async fn ensure_connected(&mut self) -> Result<()> {
        if self.connected().await {
            return Ok(());
        }

        if let Some(until) = self.state.cooldown_until {
            if Instant::now() < until {
                return Err(Error::CoolingDown);
            }
            self.handle_cooldown_elapsed();
        }

        if self.state.reconnect_attempts > 0 {
            self.set_status(SessionStatus::Reconnecting);
            debug!(
                "Backing off {:?} before reconnect attempt {}",
                self.state.backoff_delay,
                self.state.reconnect_attempts + 1
            );
            self.pause(self.state.backoff_delay).await?;
        }

        match self.try_connect().await {
            Ok(()) => {
                self.state.reconnect_attempts = 0;
                self.state.backoff_delay = self.tuning.initial_backoff();
                self.state.cooldown_until = None;
                self.set_status(SessionStatus::Connected);
                info!("Link established");
                Ok(())
            }
            Err(err) => {
                let attempt = self.register_failure();
                warn!(
                    "Connection attempt {attempt}/{} failed: {err}",
                    self.tuning.max_reconnect_attempts
                );
                Err(Error::Connection {
                    attempts: attempt,
                    reason: err.to_string(),
                })
            }
        }
    }

    async fn try_connect(&mut self) -> std::result::Result<(), LinkError> {
        if !self.link.located() {
            self.set_status(SessionStatus::Scanning);
            self.link.locate().await?;
        }
        self.set_status(SessionStatus::Connecting);
        match timeout(self.tuning.connect_timeout(), self.link.attach()).await {
            Ok(result) => result,
            Err(_) => Err(LinkError::ConnectTimeout(self.tuning.connect_timeout())),
        }
    }

    /// Records a failed connection cycle. Returns the attempt number.
    fn register_failure(&mut self) -> u32 {
        if self.state.reconnect_attempts > 0 {
            self.state.backoff_delay =
                (self.state.backoff_delay * 2).min(self.tuning.max_backoff());
        }
        self.state.reconnect_attempts += 1;
        if self.state.reconnect_attempts >= self.tuning.max_reconnect_attempts {
            self.state.cooldown_until = Some(Instant::now() + self.tuning.reconnect_cooldown());
            warn!(
                "Reconnect attempts exhausted; cooling down for {:?}",
                self.tuning.reconnect_cooldown()
            );
            self.set_status(SessionStatus::Idle);
        } else {
            self.set_status(SessionStatus::Reconnecting);
        }
        self.state.reconnect_attempts
    }

    async fn handle_connection_lost(&mut self) {
        warn!("Peripheral closed the connection");
        self.state.idle_deadline = None;
        if let Err(err) = self.link.detach().await {
            debug!("Cleanup after connection loss failed: {err}");
        }
        self.set_status(SessionStatus::Reconnecting);
        loop {
            match self.ensure_connected().await {
                Ok(()) => break,
                Err(Error::CoolingDown | Error::SessionClosed) => break,
                Err(_) => {}
            }
        }
    }

    async fn handle_idle_elapsed(&mut self) {
        self.state.idle_deadline = None;
        if self.state.status != SessionStatus::Connected {
            return;
        }
        info!(
            "Idle for {:?}; disconnecting",
            self.tuning.idle_disconnect_delay()
        );
        self.set_status(SessionStatus::Disconnecting);
        if let Err(err) = self.link.detach().await {
            warn!("Disconnect failed: {err}");
        }
        self.set_status(SessionStatus::Idle);
    }

    fn handle_cooldown_elapsed(&mut self) {
        info!("Reconnect cooldown over; attempts reset");
        self.state.cooldown_until = None;
        self.state.reconnect_attempts = 0;
        self.state.backoff_delay = self.tuning.initial_backoff();
    }

    async fn teardown(mut self) {
        self.rx.close();
        self.state.idle_deadline = None;
        if self.state.status == SessionStatus::Connected {
            self.set_status(SessionStatus::Disconnecting);
            if let Err(err) = self.link.detach().await {
                warn!("Disconnect during shutdown failed: {err}");
            }
        }
        self.link.forget();
        self.set_status(SessionStatus::Idle);
        // Fail whatever was still queued.
        while let Ok(request) = self.rx.try_recv() {
            let _ = request.done.send(Err(Error::SessionClosed));
        }
        debug!("Session task stopped");
    }

    async fn connected(&self) -> bool {
        self.state.status == SessionStatus::Connected && self.link.is_attached().await
    }

    /// Cancel-and-replace: at most one idle deadline is pending.
    fn arm_idle_timer(&mut self) {
        self.state.idle_deadline = Some(Instant::now() + self.tuning.idle_disconnect_delay());
    }

    fn set_status(&mut self, status: SessionStatus) {
        if self.state.status != status {
            debug!("Session status: {} -> {}", self.state.status, status);
            self.state.status = status;
            self.status_tx.send_replace(status);
        }
    }

    /// Sleeps unless the session is shut down first.
    async fn pause(&self, delay: Duration) -> Result<()> {
        tokio::select! {
            () = self.cancel.cancelled() => Err(Error::SessionClosed),
            () = sleep(delay) => Ok(()),
        }
    }
}

async fn maybe_sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bluetooth::commands::LightCommand;
    use crate::core::bluetooth::link::testing::ScriptedLink;

    fn test_tuning() -> SessionTuning {
        SessionTuning {
            write_attempts: 3,
            write_retry_delay_ms: 100,
            idle_disconnect_ms: 5_000,
            max_reconnect_attempts: 2,
            initial_backoff_ms: 100,
            max_backoff_ms: 400,
            reconnect_cooldown_ms: 60_000,
            connect_timeout_ms: 1_000,
            scan_timeout_ms: 1_000,
        }
    }

    fn power_frame() -> Frame {
        LightCommand::Power(true).encode().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn writes_preserve_submission_order() {
        let link = ScriptedLink::new();
        link.fail_next_writes(1);
        let (handle, _task) = spawn_session(link.clone(), test_tuning());

        let a = LightCommand::Power(true).encode().unwrap();
        let b = LightCommand::Brightness(50).encode().unwrap();
        let (ra, rb) = tokio::join!(handle.submit(a), handle.submit(b));
        ra.unwrap();
        rb.unwrap();

        assert_eq!(link.writes(), vec![a.to_vec(), b.to_vec()]);
    }

    #[tokio::test(start_paused = true)]
    async fn write_failures_are_bounded() {
        let link = ScriptedLink::new();
        link.fail_next_writes(3);
        let (handle, _task) = spawn_session(link.clone(), test_tuning());

        let err = handle.submit(power_frame()).await.unwrap_err();
        assert!(matches!(err, Error::Write { attempts: 3, .. }));

        // The queue moves on; the next submission succeeds.
        handle.submit(power_frame()).await.unwrap();
        assert_eq!(link.writes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_exhaustion_cools_down_and_recovers() {
        let link = ScriptedLink::new();
        link.fail_next_attaches(2);
        let (handle, _task) = spawn_session(link.clone(), test_tuning());

        // Two failed connection cycles exhaust max_reconnect_attempts;
        // the third write attempt hits the cooldown gate.
        let err = handle.submit(power_frame()).await.unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
        assert_eq!(handle.status(), SessionStatus::Idle);
        assert_eq!(link.attach_calls(), 2);

        // Still cooling down: no further connection attempts are made.
        let err = handle.submit(power_frame()).await.unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
        assert_eq!(link.attach_calls(), 2);

        // After the cooldown the counter is back at zero and the next
        // submission connects without backing off.
        tokio::time::sleep(Duration::from_secs(61)).await;
        handle.submit(power_frame()).await.unwrap();
        assert_eq!(handle.status(), SessionStatus::Connected);
        assert_eq!(link.attach_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn scan_failures_count_as_connection_failures() {
        let link = ScriptedLink::new();
        link.fail_next_locates(3);
        let (handle, _task) = spawn_session(link.clone(), test_tuning());

        let err = handle.submit(power_frame()).await.unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
        assert!(link.locate_calls() >= 2);
        assert_eq!(link.attach_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timer_rearms_on_each_write() {
        let link = ScriptedLink::new();
        let (handle, _task) = spawn_session(link.clone(), test_tuning());

        handle.submit(power_frame()).await.unwrap();
        assert_eq!(handle.status(), SessionStatus::Connected);

        tokio::time::sleep(Duration::from_secs(3)).await;
        handle.submit(power_frame()).await.unwrap();

        // 6s after the first write but only 3s after the second: the
        // link must still be up.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(handle.status(), SessionStatus::Connected);
        assert_eq!(link.detach_calls(), 0);

        // A full quiet period triggers exactly one disconnect.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(handle.status(), SessionStatus::Idle);
        assert_eq!(link.detach_calls(), 1);
        assert!(!link.is_attached_now());
    }

    #[tokio::test(start_paused = true)]
    async fn connection_loss_triggers_reconnect() {
        let link = ScriptedLink::new();
        let (handle, _task) = spawn_session(link.clone(), test_tuning());

        handle.submit(power_frame()).await.unwrap();
        assert_eq!(link.attach_calls(), 1);

        link.drop_connection();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.status(), SessionStatus::Connected);
        assert_eq!(link.attach_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_before_any_connection_is_ignored() {
        let link = ScriptedLink::new();
        let (handle, _task) = spawn_session(link.clone(), test_tuning());

        link.drop_connection();
        handle.submit(power_frame()).await.unwrap();
        assert_eq!(link.attach_calls(), 1);
        assert_eq!(handle.status(), SessionStatus::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_timeout_is_a_connection_failure() {
        let link = ScriptedLink::new();
        link.hang_next_attaches(1);
        let tuning = SessionTuning {
            write_attempts: 1,
            ..test_tuning()
        };
        let (handle, _task) = spawn_session(link.clone(), tuning);

        let err = handle.submit(power_frame()).await.unwrap_err();
        assert!(matches!(err, Error::Write { attempts: 1, .. }));
        assert_eq!(link.attach_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_session() {
        let link = ScriptedLink::new();
        let (handle, task) = spawn_session(link.clone(), test_tuning());

        handle.submit(power_frame()).await.unwrap();
        handle.shutdown();
        task.await.unwrap();

        assert!(!link.is_attached_now());
        assert!(matches!(
            handle.submit(power_frame()).await.unwrap_err(),
            Error::SessionClosed
        ));
    }
}
