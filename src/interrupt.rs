//! Two-phase cooperative interrupt handling.
//!
//! A first SIGINT/SIGTERM requests a graceful early stop: the handler fires
//! its [`CancellationToken`] and the pipeline winds down at the next
//! suspension point. A second signal within the interrupt window (default
//! 2 s) escalates to a hard abort: the handler writes `"Aborted."` to the
//! error sink and invokes the exit hook with code 130.
//!
//! The clock, the signal source, the exit hook, and the error sink are all
//! injected so tests can drive every transition; production wiring uses the
//! OS signal stream, `Instant::now`, stderr, and `process::exit`.
//!
//! # Example
//!
//! ```no_run
//! use transcript_restructure::interrupt::{Decision, InterruptHandler};
//!
//! # async fn run() -> std::io::Result<()> {
//! let handler = InterruptHandler::listen()?;
//! let cancel = handler.cancellation_token();
//! // ... run the pipeline with `cancel` ...
//! if handler.was_interrupted() {
//!     match handler.wait_for_decision("Interrupted. Press Ctrl-C again to abort.\n").await {
//!         Decision::Continue => { /* save partial output */ }
//!         Decision::Abort => unreachable!("the exit hook terminates the process"),
//!     }
//! }
//! handler.stop();
//! # Ok(())
//! # }
//! ```

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How long after a first signal a second one escalates to abort.
pub const DEFAULT_INTERRUPT_WINDOW: Duration = Duration::from_secs(2);

/// Exit code passed to the exit hook on abort (128 + SIGINT).
pub const ABORT_EXIT_CODE: i32 = 130;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Injectable time source.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// The production clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// What the caller should do after an interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Proceed (possibly winding down gracefully).
    Continue,
    /// A second signal arrived; stop everything.
    Abort,
}

#[derive(Default)]
struct InterruptState {
    first_seen_at: Option<Instant>,
    interrupted: bool,
    aborted: bool,
    stopped: bool,
}

type ExitHook = Box<dyn Fn(i32) + Send + Sync>;
type ErrorSink = Box<dyn Write + Send>;

struct Shared {
    state: Mutex<InterruptState>,
    clock: Arc<dyn Clock>,
    window: Duration,
    cancel: CancellationToken,
    sink: Mutex<ErrorSink>,
    exit: ExitHook,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, InterruptState> {
        self.state.lock().expect("interrupt state lock poisoned")
    }

    fn lock_sink(&self) -> MutexGuard<'_, ErrorSink> {
        self.sink.lock().expect("interrupt sink lock poisoned")
    }

    fn on_signal(&self) {
        let mut state = self.lock_state();
        if state.stopped || state.aborted {
            return;
        }
        let now = self.clock.now();

        if !state.interrupted {
            state.interrupted = true;
            state.first_seen_at = Some(now);
            drop(state);
            debug!("interrupt received, requesting cooperative stop");
            self.cancel.cancel();
            return;
        }

        let Some(first_seen) = state.first_seen_at else {
            return;
        };
        if now.duration_since(first_seen) < self.window {
            state.aborted = true;
            drop(state);
            {
                let mut sink = self.lock_sink();
                let _ = sink.write_all(b"\nAborted.\n");
                let _ = sink.flush();
            }
            (self.exit)(ABORT_EXIT_CODE);
        }
        // A second signal outside the window changes nothing; the window is
        // not re-armed.
    }
}

/// Converts OS signals into the two-phase cancellation discipline.
///
/// Observer methods are safe to call from any task; all state lives behind
/// one mutex.
pub struct InterruptHandler {
    shared: Arc<Shared>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl InterruptHandler {
    /// Start building a handler with production defaults: 2 s window,
    /// system clock, stderr sink, `process::exit` hook.
    pub fn builder() -> InterruptHandlerBuilder {
        InterruptHandlerBuilder {
            window: DEFAULT_INTERRUPT_WINDOW,
            clock: Arc::new(SystemClock),
            sink: Box::new(io::stderr()),
            exit: Box::new(|code| std::process::exit(code)),
        }
    }

    /// Listen for SIGINT and SIGTERM with production defaults.
    ///
    /// Must be called within a Tokio runtime.
    #[cfg(unix)]
    pub fn listen() -> io::Result<Self> {
        Self::builder().spawn_os()
    }

    /// Whether a first signal has been observed.
    pub fn was_interrupted(&self) -> bool {
        self.shared.lock_state().interrupted
    }

    /// Whether a second signal escalated to abort.
    pub fn is_aborted(&self) -> bool {
        self.shared.lock_state().aborted
    }

    /// The token fired on the first signal. Clone it into the pipeline.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    /// After an interrupt, give the user the rest of the window to escalate.
    ///
    /// Returns [`Decision::Continue`] immediately when no signal has been
    /// seen or the window has already expired. Otherwise writes `message` to
    /// the error sink and polls for an abort until the window elapses.
    pub async fn wait_for_decision(&self, message: &str) -> Decision {
        let (interrupted, aborted, first_seen_at) = {
            let state = self.shared.lock_state();
            (state.interrupted, state.aborted, state.first_seen_at)
        };
        if !interrupted {
            return Decision::Continue;
        }
        if aborted {
            return Decision::Abort;
        }
        let Some(first_seen) = first_seen_at else {
            return Decision::Continue;
        };
        if self.shared.clock.now().duration_since(first_seen) >= self.shared.window {
            return Decision::Continue;
        }

        {
            let mut sink = self.shared.lock_sink();
            let _ = sink.write_all(message.as_bytes());
            let _ = sink.flush();
        }

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            if self.shared.lock_state().aborted {
                return Decision::Abort;
            }
            if self.shared.clock.now().duration_since(first_seen) >= self.shared.window {
                return Decision::Continue;
            }
        }
    }

    /// Enter the terminal `stopped` state and shut the listener down.
    /// Further signals are ignored.
    pub fn stop(&self) {
        {
            let mut state = self.shared.lock_state();
            if state.stopped {
                return;
            }
            state.stopped = true;
        }
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(handle) = listener.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for InterruptHandler {
    fn drop(&mut self) {
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(handle) = listener.take() {
                handle.abort();
            }
        }
    }
}

/// Builder for [`InterruptHandler`], exposing the test seams.
pub struct InterruptHandlerBuilder {
    window: Duration,
    clock: Arc<dyn Clock>,
    sink: ErrorSink,
    exit: ExitHook,
}

impl InterruptHandlerBuilder {
    /// Override the interrupt window. Default:
    /// [`DEFAULT_INTERRUPT_WINDOW`].
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Override the time source. Default: [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the error sink. Default: stderr.
    pub fn error_sink(mut self, sink: impl Write + Send + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Override the exit hook. Default: `process::exit`.
    pub fn exit_hook(mut self, hook: impl Fn(i32) + Send + Sync + 'static) -> Self {
        self.exit = Box::new(hook);
        self
    }

    /// Spawn the listener over an arbitrary signal source. Each received
    /// unit is one delivered signal.
    pub fn spawn(self, mut signals: mpsc::Receiver<()>) -> InterruptHandler {
        let shared = Arc::new(Shared {
            state: Mutex::new(InterruptState::default()),
            clock: self.clock,
            window: self.window,
            cancel: CancellationToken::new(),
            sink: Mutex::new(self.sink),
            exit: self.exit,
        });

        let listener_shared = Arc::clone(&shared);
        let listener = tokio::spawn(async move {
            while signals.recv().await.is_some() {
                listener_shared.on_signal();
            }
        });

        InterruptHandler {
            shared,
            listener: Mutex::new(Some(listener)),
        }
    }

    /// Spawn the listener over SIGINT and SIGTERM.
    #[cfg(unix)]
    pub fn spawn_os(self) -> io::Result<InterruptHandler> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let (tx, rx) = mpsc::channel(8);

        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    received = sigint.recv() => received,
                    received = sigterm.recv() => received,
                };
                if received.is_none() || tx.send(()).await.is_err() {
                    break;
                }
            }
        });

        Ok(self.spawn(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A clock tests can move by hand.
    struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(Instant::now()),
            })
        }

        fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }

    /// A Write sink tests can read back.
    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl SharedSink {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Harness {
        handler: Arc<InterruptHandler>,
        signals: mpsc::Sender<()>,
        clock: Arc<ManualClock>,
        sink: SharedSink,
        exits: Arc<Mutex<Vec<i32>>>,
    }

    fn harness() -> Harness {
        let clock = ManualClock::new();
        let sink = SharedSink::default();
        let exits: Arc<Mutex<Vec<i32>>> = Arc::new(Mutex::new(Vec::new()));
        let exit_log = Arc::clone(&exits);
        let (tx, rx) = mpsc::channel(8);

        let handler = InterruptHandler::builder()
            .clock(clock.clone())
            .error_sink(sink.clone())
            .exit_hook(move |code| exit_log.lock().unwrap().push(code))
            .spawn(rx);

        Harness {
            handler: Arc::new(handler),
            signals: tx,
            clock,
            sink,
            exits,
        }
    }

    /// Let the listener task drain the channel.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_handler() {
        let h = harness();
        assert!(!h.handler.was_interrupted());
        assert!(!h.handler.is_aborted());
        assert!(!h.handler.cancellation_token().is_cancelled());
        assert_eq!(h.handler.wait_for_decision("msg").await, Decision::Continue);
        assert_eq!(h.sink.contents(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_signal_interrupts_and_cancels() {
        let h = harness();
        h.signals.send(()).await.unwrap();
        settle().await;

        assert!(h.handler.was_interrupted());
        assert!(!h.handler.is_aborted());
        assert!(h.handler.cancellation_token().is_cancelled());
        assert!(h.exits.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_signal_within_window_aborts() {
        let h = harness();
        h.signals.send(()).await.unwrap();
        settle().await;
        h.clock.advance(Duration::from_secs(1));
        h.signals.send(()).await.unwrap();
        settle().await;

        assert!(h.handler.is_aborted());
        assert!(h.handler.was_interrupted());
        assert_eq!(*h.exits.lock().unwrap(), vec![ABORT_EXIT_CODE]);
        assert!(h.sink.contents().contains("Aborted."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_signal_outside_window_is_ignored() {
        let h = harness();
        h.signals.send(()).await.unwrap();
        settle().await;
        h.clock.advance(Duration::from_millis(2_001));
        h.signals.send(()).await.unwrap();
        settle().await;

        assert!(h.handler.was_interrupted());
        assert!(!h.handler.is_aborted());
        assert!(h.exits.lock().unwrap().is_empty());
        assert_eq!(h.sink.contents(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_signal_never_aborts() {
        let h = harness();
        h.signals.send(()).await.unwrap();
        settle().await;
        h.clock.advance(Duration::from_secs(3));
        settle().await;

        assert!(h.handler.was_interrupted());
        assert!(h.exits.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exit_hook_fires_exactly_once() {
        let h = harness();
        for _ in 0..4 {
            h.signals.send(()).await.unwrap();
            settle().await;
        }
        assert_eq!(*h.exits.lock().unwrap(), vec![ABORT_EXIT_CODE]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_decision_expired_window_continues() {
        let h = harness();
        h.signals.send(()).await.unwrap();
        settle().await;
        h.clock.advance(Duration::from_secs(3));

        assert_eq!(h.handler.wait_for_decision("msg").await, Decision::Continue);
        // Expired window: nothing is written.
        assert_eq!(h.sink.contents(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_decision_abort_during_poll() {
        let h = harness();
        h.signals.send(()).await.unwrap();
        settle().await;

        let handler = Arc::clone(&h.handler);
        let waiter =
            tokio::spawn(async move { handler.wait_for_decision("press again to abort\n").await });
        settle().await;

        h.signals.send(()).await.unwrap();
        settle().await;

        assert_eq!(waiter.await.unwrap(), Decision::Abort);
        assert!(h.sink.contents().contains("press again to abort"));
        assert_eq!(*h.exits.lock().unwrap(), vec![ABORT_EXIT_CODE]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_decision_window_elapses_continues() {
        let h = harness();
        h.signals.send(()).await.unwrap();
        settle().await;

        let handler = Arc::clone(&h.handler);
        let waiter = tokio::spawn(async move { handler.wait_for_decision("waiting\n").await });
        settle().await;

        h.clock.advance(Duration::from_secs(3));
        assert_eq!(waiter.await.unwrap(), Decision::Continue);
        assert!(h.sink.contents().contains("waiting"));
        assert!(h.exits.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_decision_after_abort_returns_abort() {
        let h = harness();
        h.signals.send(()).await.unwrap();
        settle().await;
        h.signals.send(()).await.unwrap();
        settle().await;

        assert_eq!(h.handler.wait_for_decision("msg").await, Decision::Abort);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_terminal() {
        let h = harness();
        h.handler.stop();
        // The listener is gone; a queued signal can no longer mutate state.
        let _ = h.signals.send(()).await;
        settle().await;

        assert!(!h.handler.was_interrupted());
        assert!(!h.handler.cancellation_token().is_cancelled());

        // Idempotent.
        h.handler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_implies_interrupted() {
        let h = harness();
        h.signals.send(()).await.unwrap();
        settle().await;
        h.signals.send(()).await.unwrap();
        settle().await;

        assert!(h.handler.is_aborted());
        assert!(h.handler.was_interrupted());
    }
}
