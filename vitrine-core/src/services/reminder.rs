//! Background reminder scheduler.
//!
//! One scheduler runs per tenant. Every `poll_interval` it asks the store for
//! unsent reminders that are due (or due within `lookahead`) and hands each
//! one to its own task:
//!
//! - a reminder whose instant has passed is dispatched right away
//! - a reminder in the future waits on a one-shot timer first
//!
//! An armed timer re-reads its event when it fires. A deleted, sent, opted out
//! or rescheduled event is dropped there and left to the next poll.
//!
//! Dispatching notifies the owner and then flips `reminder_sent`. When either
//! step fails the flag stays unset and the next poll picks the event up again.
//! An event is never handed to two tasks at once: ids stay in an in-flight
//! set until their task finishes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashSet;
use tokio::{
    sync::{Mutex, watch},
    task::{JoinHandle, JoinSet},
    time::MissedTickBehavior,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    Error,
    config::SchedulerConfig,
    error::NotificationError,
    repositories::CalendarRepository,
    services::notifier::{Notifier, ReminderNotice},
    storage::DueReminder,
    tenant::TenantId,
};

/// Counts from a single poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Reminders returned by the store.
    pub due: usize,
    /// Reminders whose instant had passed, dispatched immediately.
    pub dispatched: usize,
    /// Reminders armed on a timer.
    pub armed: usize,
    /// Reminders already owned by a running task.
    pub in_flight: usize,
}

struct SchedulerInner<R: CalendarRepository, N: Notifier> {
    tenant: TenantId,
    repository: Arc<R>,
    notifier: Arc<N>,
    config: SchedulerConfig,
    in_flight: DashSet<Uuid>,
    tasks: Mutex<JoinSet<()>>,
    stop: watch::Sender<bool>,
}

/// Polls one tenant's calendar and delivers due reminders.
pub struct ReminderScheduler<R: CalendarRepository, N: Notifier> {
    inner: Arc<SchedulerInner<R, N>>,
}

impl<R: CalendarRepository, N: Notifier> Clone for ReminderScheduler<R, N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: CalendarRepository, N: Notifier> ReminderScheduler<R, N> {
    pub fn new(
        tenant: TenantId,
        repository: Arc<R>,
        notifier: Arc<N>,
        config: SchedulerConfig,
    ) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            inner: Arc::new(SchedulerInner {
                tenant,
                repository,
                notifier,
                config,
                in_flight: DashSet::new(),
                tasks: Mutex::new(JoinSet::new()),
                stop,
            }),
        }
    }

    pub fn tenant(&self) -> &TenantId {
        &self.inner.tenant
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Number of reminders currently waiting on a timer or being dispatched.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.len()
    }

    /// Start the poll loop.
    ///
    /// The first poll happens immediately. When `shutdown` changes, pending
    /// timers are cancelled, running dispatches are awaited and the task ends.
    pub fn start(&self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let scheduler = self.clone();
        let span = tracing::info_span!("reminders", tenant = %self.inner.tenant);

        tokio::spawn(
            async move {
                let mut interval = tokio::time::interval(scheduler.inner.config.poll_interval);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

                tracing::info!(
                    poll_interval_secs = scheduler.inner.config.poll_interval.as_secs(),
                    "Reminder scheduler started"
                );

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            scheduler.reap().await;
                            match scheduler.poll_once().await {
                                Ok(report) if report.due > 0 => {
                                    tracing::info!(
                                        due = report.due,
                                        dispatched = report.dispatched,
                                        armed = report.armed,
                                        in_flight = report.in_flight,
                                        "Polled reminders"
                                    );
                                }
                                Err(e) => {
                                    tracing::error!(error = %e, "Failed to poll due reminders");
                                }
                                _ => {}
                            }
                        }
                        _ = shutdown.changed() => {
                            tracing::info!("Shutting down reminder scheduler");
                            break;
                        }
                    }
                }

                scheduler.inner.stop.send_replace(true);
                scheduler.join_dispatches().await;
                tracing::info!("Reminder scheduler stopped");
            }
            .instrument(span),
        )
    }

    /// Run a single poll: query due reminders and hand each one to a task.
    pub async fn poll_once(&self) -> Result<PollReport, Error> {
        if *self.inner.stop.borrow() {
            return Ok(PollReport::default());
        }

        let now = Utc::now();
        let due = self
            .inner
            .repository
            .due_reminders(now + self.inner.config.lookahead)
            .await?;

        let mut report = PollReport {
            due: due.len(),
            ..Default::default()
        };

        let mut tasks = self.inner.tasks.lock().await;
        for reminder in due {
            let id = reminder.event.id;
            if !self.inner.in_flight.insert(id) {
                report.in_flight += 1;
                continue;
            }

            let remind_at = reminder.event.reminder_at();
            let inner = Arc::clone(&self.inner);
            let span = tracing::Span::current();

            if remind_at <= now {
                report.dispatched += 1;
                tasks.spawn(async move { inner.dispatch(reminder).await }.instrument(span));
            } else {
                report.armed += 1;
                let delay = (remind_at - now).to_std().unwrap_or_default();
                let stop = self.inner.stop.subscribe();
                tracing::debug!(event_id = %id, remind_at = %remind_at, "Armed reminder timer");

                tasks.spawn(
                    async move {
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {
                                match inner.reload(reminder, remind_at).await {
                                    Some(reminder) => inner.dispatch(reminder).await,
                                    None => {
                                        inner.in_flight.remove(&id);
                                    }
                                }
                            }
                            _ = stopped(stop) => {
                                inner.in_flight.remove(&id);
                            }
                        }
                    }
                    .instrument(span),
                );
            }
        }

        Ok(report)
    }

    /// Wait until every dispatch and timer spawned so far has finished.
    pub async fn join_dispatches(&self) {
        let mut tasks = self.inner.tasks.lock().await;
        while let Some(result) = tasks.join_next().await {
            log_task_result(result);
        }
    }

    async fn reap(&self) {
        let mut tasks = self.inner.tasks.lock().await;
        while let Some(result) = tasks.try_join_next() {
            log_task_result(result);
        }
    }
}

impl<R: CalendarRepository, N: Notifier> SchedulerInner<R, N> {
    async fn dispatch(&self, reminder: DueReminder) {
        let id = reminder.event.id;

        match self.deliver(&reminder).await {
            Ok(true) => tracing::info!(event_id = %id, "Reminder sent"),
            Ok(false) => tracing::debug!(event_id = %id, "Reminder was already marked sent"),
            Err(e) => tracing::error!(event_id = %id, error = %e, "Failed to dispatch reminder"),
        }

        self.in_flight.remove(&id);
    }

    /// Fresh copy of an armed reminder, or `None` when it no longer fires at `armed_at`.
    async fn reload(
        &self,
        mut reminder: DueReminder,
        armed_at: DateTime<Utc>,
    ) -> Option<DueReminder> {
        let id = reminder.event.id;
        let event = match self.repository.find_by_id(&id).await {
            Ok(Some(event)) => event,
            Ok(None) => {
                tracing::debug!(event_id = %id, "Armed reminder was deleted");
                return None;
            }
            Err(e) => {
                tracing::error!(event_id = %id, error = %e, "Failed to reload armed reminder");
                return None;
            }
        };

        if !event.wants_reminder() {
            tracing::debug!(event_id = %id, "Armed reminder no longer wanted");
            return None;
        }
        if event.reminder_at() != armed_at {
            tracing::debug!(
                event_id = %id,
                remind_at = %event.reminder_at(),
                "Armed reminder was rescheduled"
            );
            return None;
        }

        reminder.event = event;
        Some(reminder)
    }

    async fn deliver(&self, reminder: &DueReminder) -> Result<bool, Error> {
        let event = &reminder.event;
        let recipient = reminder
            .recipient
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .ok_or(NotificationError::MissingRecipient(event.id))?;

        let notice = ReminderNotice::for_event(event, self.config.timezone);
        self.notifier.notify(recipient, &notice).await?;

        self.repository.mark_reminder_sent(&event.id).await
    }
}

async fn stopped(mut stop: watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

fn log_task_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!(error = %e, "Reminder task panicked");
        }
    }
}
