//! Delivery of envelopes to the single bound consumer.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    action::Action,
    consumer::{ConsumerRef, ImmediateConsumer, WeakImmediate},
    envelope::{Envelope, EnvelopeOptions, NewTokenReason, Payload, SubType},
    error::EnvelopeError,
};

/// How a bound consumer receives envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryMode {
    /// Appended to the consumer's inbox and handled later on its own context.
    #[default]
    Queued,
    /// Handled synchronously on the producer's thread before `deliver` returns.
    Immediate,
}

impl DeliveryMode {
    /// Returns a stable string token for diagnostics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Immediate => "immediate",
        }
    }
}

#[derive(Clone)]
enum Binding {
    Queued(ConsumerRef),
    Immediate(WeakImmediate),
}

impl Binding {
    fn mode(&self) -> DeliveryMode {
        match self {
            Self::Queued(_) => DeliveryMode::Queued,
            Self::Immediate(_) => DeliveryMode::Immediate,
        }
    }

    fn consumer_name(&self) -> &str {
        match self {
            Self::Queued(consumer) => consumer.name(),
            Self::Immediate(consumer) => &consumer.name,
        }
    }
}

/// Thread-safe handle producers use to notify the bound consumer.
///
/// Clones share one binding slot. Delivery never fails from the producer's side: with no bound
/// consumer, or one that has gone away, the envelope is dropped.
#[derive(Clone, Default)]
pub struct Dispatcher {
    binding: Arc<RwLock<Option<Binding>>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let binding = self.binding.read();
        f.debug_struct("Dispatcher")
            .field("consumer", &binding.as_ref().map(Binding::consumer_name))
            .field("mode", &binding.as_ref().map(Binding::mode))
            .finish()
    }
}

impl Dispatcher {
    /// Creates an unbound dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes subsequent envelopes into a queued consumer's inbox, replacing any prior binding.
    pub fn bind_queued(&self, consumer: ConsumerRef) {
        trace!(consumer = consumer.name(), "dispatcher bound (queued)");
        *self.binding.write() = Some(Binding::Queued(consumer));
    }

    /// Routes subsequent envelopes straight into an immediate consumer's handler.
    ///
    /// Only a weak reference is kept; dropping the consumer unbinds it in effect.
    pub fn bind_immediate(&self, consumer: &ImmediateConsumer) {
        trace!(consumer = consumer.name(), "dispatcher bound (immediate)");
        *self.binding.write() = Some(Binding::Immediate(consumer.downgrade()));
    }

    /// Clears the binding; later deliveries are no-ops.
    pub fn unbind(&self) {
        self.binding.write().take();
    }

    /// Whether a consumer is bound and still reachable.
    pub fn is_bound(&self) -> bool {
        match self.binding.read().as_ref() {
            Some(Binding::Queued(consumer)) => !consumer.is_closed(),
            Some(Binding::Immediate(consumer)) => consumer.is_alive(),
            None => false,
        }
    }

    /// Delivery mode of the current binding.
    pub fn mode(&self) -> Option<DeliveryMode> {
        self.binding.read().as_ref().map(Binding::mode)
    }

    /// Hands one envelope to the bound consumer.
    pub fn deliver(&self, envelope: Envelope) {
        // The slot lock is released before an immediate handler runs so it may rebind or unbind.
        let binding = self.binding.read().clone();
        match binding {
            Some(Binding::Queued(consumer)) => {
                consumer.post(envelope);
            }
            Some(Binding::Immediate(consumer)) => {
                consumer.invoke(envelope);
            }
            None => {
                trace!(action = %envelope.action(), "no consumer bound; dropping envelope");
            }
        }
    }

    /// Notifies with a bare action.
    pub fn send(&self, action: Action) {
        self.deliver(Envelope::bare(action));
    }

    /// Notifies with a caller payload, see [`Envelope::with_payload`].
    pub fn send_payload(&self, action: Action, payload: Option<Payload>, sub_type: Option<SubType>) {
        self.deliver(Envelope::with_payload(action, payload, sub_type));
    }

    /// Notifies a failure, see [`Envelope::failure`].
    pub fn send_error(&self, action: Action, sub_type: Option<SubType>, error_text: Option<&str>) {
        self.deliver(Envelope::failure(action, sub_type, error_text));
    }

    /// Notifies a failure that a new token may fix, see [`Envelope::failure_with_token_reason`].
    pub fn send_error_with_token_reason(
        &self,
        action: Action,
        sub_type: Option<SubType>,
        error_text: Option<&str>,
        reason: NewTokenReason,
    ) {
        self.deliver(Envelope::failure_with_token_reason(
            action, sub_type, error_text, reason,
        ));
    }

    /// Builds through [`Envelope::build`] and delivers.
    ///
    /// # Errors
    ///
    /// Returns the builder's error; nothing is delivered in that case.
    pub fn send_built(
        &self,
        action: impl AsRef<str>,
        options: EnvelopeOptions,
    ) -> Result<(), EnvelopeError> {
        self.deliver(Envelope::build(action, options)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::mpsc as std_mpsc, thread};

    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{action::actions, consumer::ConsumerLoop};

    fn recorder() -> (Arc<Mutex<Vec<Envelope>>>, impl FnMut(Envelope) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |envelope: Envelope| sink.lock().push(envelope))
    }

    #[test]
    fn unbound_delivery_is_a_silent_no_op() {
        let dispatcher = Dispatcher::new();
        assert!(!dispatcher.is_bound());
        assert_eq!(dispatcher.mode(), None);
        dispatcher.send(actions::FETCH_DONE);
        dispatcher.send_error(actions::FETCH_FAILED, None, Some("offline"));
    }

    #[test]
    fn queued_delivery_preserves_producer_order() {
        let (seen, handler) = recorder();
        let (mut consumer_loop, consumer) = ConsumerLoop::bind("ui", handler);
        let dispatcher = Dispatcher::new();
        dispatcher.bind_queued(consumer);
        assert_eq!(dispatcher.mode(), Some(DeliveryMode::Queued));

        dispatcher.send_error(actions::FETCH_DONE, Some(SubType::ASYNC_SONGS), None);
        dispatcher.send_error_with_token_reason(
            actions::FETCH_FAILED,
            Some(SubType::ASYNC_SONGS),
            Some("timeout"),
            NewTokenReason::Cache,
        );
        assert!(seen.lock().is_empty());

        consumer_loop.run_pending();
        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].action(), &actions::FETCH_DONE);
        assert_eq!(seen[1].action(), &actions::FETCH_FAILED);
        assert_eq!(seen[1].new_token_reason(), Some(NewTokenReason::Cache));
    }

    #[test]
    fn producers_on_other_threads_are_handled_on_the_bound_thread() {
        let (tx, rx) = std_mpsc::channel();
        let (mut consumer_loop, consumer) = ConsumerLoop::bind("ui", move |envelope: Envelope| {
            let _ = tx.send((envelope.action().to_string(), thread::current().id()));
        });
        let dispatcher = Dispatcher::new();
        dispatcher.bind_queued(consumer);

        let producers: Vec<_> = (0..4)
            .map(|worker| {
                let dispatcher = dispatcher.clone();
                thread::spawn(move || {
                    for step in 0..25 {
                        let action = Action::new(format!("w{worker}-{step}")).expect("action");
                        dispatcher.send(action);
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().expect("producer finished");
        }

        assert_eq!(consumer_loop.run_pending(), 100);
        let handled: Vec<_> = rx.try_iter().collect();
        assert!(handled
            .iter()
            .all(|(_, thread_id)| *thread_id == consumer_loop.bound_thread()));
        for worker in 0..4 {
            let prefix = format!("w{worker}-");
            let steps: Vec<usize> = handled
                .iter()
                .filter_map(|(action, _)| action.strip_prefix(&prefix))
                .map(|step| step.parse().expect("step"))
                .collect();
            assert_eq!(steps, (0..25).collect::<Vec<_>>());
        }
    }

    #[test]
    fn immediate_delivery_completes_before_returning() {
        let (seen, handler) = recorder();
        let consumer = ImmediateConsumer::new("legacy", handler);
        let dispatcher = Dispatcher::new();
        dispatcher.bind_immediate(&consumer);
        assert_eq!(dispatcher.mode(), Some(DeliveryMode::Immediate));

        dispatcher.send(actions::CACHE_LOADED);
        assert_eq!(seen.lock().len(), 1);
        assert!(dispatcher.is_bound());

        drop(consumer);
        assert!(!dispatcher.is_bound());
        dispatcher.send(actions::CACHE_LOADED);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn immediate_handler_may_unbind_its_dispatcher() {
        let dispatcher = Dispatcher::new();
        let inner = dispatcher.clone();
        let consumer = ImmediateConsumer::new("legacy", move |_envelope: Envelope| inner.unbind());
        dispatcher.bind_immediate(&consumer);

        dispatcher.send(actions::TOKEN_REFRESH_NEEDED);
        assert!(!dispatcher.is_bound());
    }

    #[test]
    fn immediate_handler_sends_are_handled_after_it_returns() {
        let dispatcher = Dispatcher::new();
        let inner = dispatcher.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let consumer = ImmediateConsumer::new("legacy", move |envelope: Envelope| {
            sink.lock().push(envelope.action().to_string());
            if envelope.action() == &actions::FETCH_FAILED {
                inner.send(actions::TOKEN_REFRESH_NEEDED);
                inner.send(actions::CACHE_LOADED);
                assert_eq!(sink.lock().len(), 1, "nested sends wait for the running call");
            }
        });
        dispatcher.bind_immediate(&consumer);

        dispatcher.send_error(actions::FETCH_FAILED, None, Some("unauthorized"));
        assert_eq!(
            *seen.lock(),
            vec![
                "fetchFailed".to_string(),
                "tokenRefreshNeeded".to_string(),
                "cacheLoaded".to_string(),
            ]
        );

        dispatcher.send(actions::FETCH_DONE);
        assert_eq!(seen.lock().len(), 4);
    }

    #[test]
    fn dropped_consumer_loop_turns_delivery_into_a_no_op() {
        let (_seen, handler) = recorder();
        let (consumer_loop, consumer) = ConsumerLoop::bind("ui", handler);
        let dispatcher = Dispatcher::new();
        dispatcher.bind_queued(consumer);
        drop(consumer_loop);

        assert!(!dispatcher.is_bound());
        dispatcher.send(actions::FETCH_DONE);
    }

    #[test]
    fn send_built_reports_invalid_envelopes_without_delivering() {
        let (seen, handler) = recorder();
        let (mut consumer_loop, consumer) = ConsumerLoop::bind("ui", handler);
        let dispatcher = Dispatcher::new();
        dispatcher.bind_queued(consumer);

        let err = dispatcher
            .send_built(
                "fetchFailed",
                EnvelopeOptions::new().new_token_reason(NewTokenReason::None),
            )
            .expect_err("orphan token reason");
        assert_eq!(err, EnvelopeError::TokenReasonWithoutError);
        dispatcher
            .send_built("fetchDone", EnvelopeOptions::new().extra("count", 3_i64))
            .expect("valid envelope");

        assert_eq!(consumer_loop.run_pending(), 1);
        assert_eq!(seen.lock()[0].extras()["count"].as_int(), Some(3));
    }
}
