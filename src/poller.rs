//! The poll loop: fetch, validate, notify, sleep.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::BotError;
use crate::notifier::{ChatSink, Notifier};
use crate::practicum::{StatusSource, check_response};
use crate::verdict::parse_status;

/// Prefix of every failure report sent to the chat.
const FAILURE_PREFIX: &str = "Сбой в программе";

pub fn failure_message(error: &BotError) -> String {
    format!("{FAILURE_PREFIX}: {error}")
}

pub struct Poller<S, C> {
    source: S,
    notifier: Notifier<C>,
    /// Lower bound for the next request, advanced from each successful response.
    cursor: i64,
    retry_period: Duration,
}

impl<S: StatusSource, C: ChatSink> Poller<S, C> {
    pub fn new(source: S, notifier: Notifier<C>, start_cursor: i64, retry_period: Duration) -> Self {
        Self {
            source,
            notifier,
            cursor: start_cursor,
            retry_period,
        }
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    pub fn notifier(&self) -> &Notifier<C> {
        &self.notifier
    }

    /// One fetch-validate-notify pass. The cursor only moves on success.
    pub async fn run_cycle(&mut self) -> Result<(), BotError> {
        let response = self.source.get_api_answer(self.cursor).await?;
        let checked = check_response(&response)?;

        for homework in &checked.homeworks {
            let message = match parse_status(homework) {
                Ok(message) => message,
                Err(BotError::MissingField("homework_name")) => {
                    warn!("Skipping homework record without a name: {homework:?}");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if let Some(lesson) = &homework.lesson_name {
                debug!("Lesson: {lesson}");
            }
            if let Some(comment) = &homework.reviewer_comment {
                debug!("Reviewer comment: {comment}");
            }
            if let Some(updated) = &homework.date_updated {
                debug!("Updated at: {updated}");
            }
            // parse_status has already checked the name
            let name = homework.homework_name.as_deref().unwrap_or_default();
            self.notifier.notify_status(name, &message).await;
        }

        if checked.current_date < self.cursor {
            warn!(
                "Server cursor moved backwards ({} -> {})",
                self.cursor, checked.current_date
            );
        }
        self.cursor = checked.current_date;
        debug!(
            "Cycle done, cursor={}, tracking {} homework(s)",
            self.cursor,
            self.notifier.state().last_sent.len()
        );
        Ok(())
    }

    /// Run one cycle and report its outcome.
    ///
    /// A failure is sent to the chat once per distinct message; a success
    /// clears the error memory so the next failure is always reported.
    pub async fn tick(&mut self) {
        match self.run_cycle().await {
            Ok(()) => self.notifier.clear_error(),
            Err(e) => {
                let category = if e.is_transport() {
                    "transport"
                } else if e.is_schema() {
                    "schema"
                } else {
                    "domain"
                };
                warn!(category, "Cycle failed: {e}");
                let message = failure_message(&e);
                self.notifier.notify_error(&message).await;
            }
        }
    }

    /// Poll forever, sleeping `retry_period` between cycles, until Ctrl-C.
    pub async fn run(mut self) {
        info!(
            "Polling every {}s starting from {}",
            self.retry_period.as_secs(),
            self.cursor
        );
        loop {
            self.tick().await;

            tokio::select! {
                _ = sleep(self.retry_period) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl-C, shutting down");
                    break;
                }
            }
        }
    }
}
