use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::session::{FormSession, SubmissionStart};
use super::submission::{
    run_generator, AbortController, ReportGenerator, SubmissionFailure, SubmitOutcome,
};

/// Composition-root owner of the form session and the report generator.
///
/// The session lock is only taken for synchronous work; the generator call
/// runs with the lock released.
pub struct WizardService<G> {
    session: Mutex<FormSession>,
    generator: Arc<G>,
    abort: Mutex<Option<AbortController>>,
}

impl<G> WizardService<G>
where
    G: ReportGenerator + 'static,
{
    pub fn new(session: FormSession, generator: Arc<G>) -> Self {
        Self {
            session: Mutex::new(session),
            generator,
            abort: Mutex::new(None),
        }
    }

    fn session(&self) -> MutexGuard<'_, FormSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn abort_slot(&self) -> MutexGuard<'_, Option<AbortController>> {
        self.abort.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `operation` against the session under its lock.
    pub fn with_session<T>(&self, operation: impl FnOnce(&mut FormSession) -> T) -> T {
        let mut session = self.session();
        operation(&mut session)
    }

    /// Submits the validated, sanitized document. A click while another
    /// submission is outstanding is ignored.
    pub async fn submit(&self) -> SubmitOutcome {
        let start = self.session().begin_submission();
        let document = match start {
            SubmissionStart::Ignored => return SubmitOutcome::Ignored,
            SubmissionStart::Blocked(_) => return SubmitOutcome::failed(SubmissionFailure::Blocked),
            SubmissionStart::Ready(document) => document,
        };

        let mut in_flight = InFlight {
            service: self,
            settled: false,
        };
        let (controller, signal) = AbortController::channel();
        *self.abort_slot() = Some(controller);
        let result = run_generator(self.generator.as_ref(), document, signal).await;
        in_flight.settled = true;
        self.abort_slot().take();

        self.session().finish_submission(result)
    }

    /// Aborts the outstanding submission; false when none is in flight.
    pub fn cancel_submission(&self) -> bool {
        match self.abort_slot().as_ref() {
            Some(controller) => {
                controller.abort();
                true
            }
            None => false,
        }
    }

    pub fn flush_due(&self, now: Instant) -> bool {
        self.session().flush_due(now)
    }

    pub fn flush(&self) -> bool {
        self.session().flush()
    }

    /// Polls the debounce deadline every `period` until the service is dropped.
    pub fn spawn_flush_loop(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let service = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(service) = service.upgrade() else {
                    break;
                };
                if service.flush_due(Instant::now()) {
                    debug!("form snapshot flushed");
                }
            }
        })
    }
}

/// Settles a submission whose `submit` future was dropped before the
/// generator answered, so the session does not stay `Submitting`.
struct InFlight<'a, G>
where
    G: ReportGenerator + 'static,
{
    service: &'a WizardService<G>,
    settled: bool,
}

impl<G> Drop for InFlight<'_, G>
where
    G: ReportGenerator + 'static,
{
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        warn!("submission abandoned before the generator answered");
        self.service.abort_slot().take();
        self.service
            .session()
            .finish_submission(Err(SubmissionFailure::Cancelled));
    }
}
