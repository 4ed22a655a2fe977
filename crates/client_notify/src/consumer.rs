//! Envelope consumers and their bound execution contexts.
//!
//! A queued consumer is split in two: the [`ConsumerLoop`], which owns the inbox receiver and the
//! handler and never leaves the thread that created it, and any number of [`ConsumerRef`]s that
//! append to the inbox from arbitrary threads. An [`ImmediateConsumer`] has no inbox; its handler
//! runs on whichever thread delivers.

use std::{
    cell::RefCell,
    collections::VecDeque,
    io,
    marker::PhantomData,
    sync::Arc,
    thread::{self, JoinHandle, ThreadId},
};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace, warn};

use crate::envelope::Envelope;

/// Routine interpreting delivered envelopes.
pub trait EnvelopeHandler {
    /// Handles one envelope.
    fn handle(&mut self, envelope: Envelope);
}

impl<F> EnvelopeHandler for F
where
    F: FnMut(Envelope),
{
    fn handle(&mut self, envelope: Envelope) {
        self(envelope);
    }
}

enum Mail {
    Deliver(Envelope),
    Shutdown,
}

/// Cloneable, thread-safe reference used to post envelopes to a queued consumer.
#[derive(Debug, Clone)]
pub struct ConsumerRef {
    name: Arc<str>,
    inbox: UnboundedSender<Mail>,
}

impl ConsumerRef {
    /// Consumer name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends an envelope to the consumer's inbox without blocking.
    ///
    /// Returns `false` when the consumer loop is gone or stopped; the envelope is dropped.
    pub fn post(&self, envelope: Envelope) -> bool {
        match self.inbox.send(Mail::Deliver(envelope)) {
            Ok(()) => true,
            Err(_) => {
                trace!(consumer = %self.name, "consumer inbox closed; dropping envelope");
                false
            }
        }
    }

    /// Asks the loop to stop once every envelope posted before this call is handled.
    pub fn request_shutdown(&self) {
        let _ = self.inbox.send(Mail::Shutdown);
    }

    /// Whether the consumer loop has stopped or been dropped.
    pub fn is_closed(&self) -> bool {
        self.inbox.is_closed()
    }
}

impl std::fmt::Debug for Mail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deliver(envelope) => f.debug_tuple("Deliver").field(envelope).finish(),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// Inbox owner and handler of a queued consumer, pinned to the thread that created it.
///
/// The loop is neither `Send` nor `Sync`, so envelopes are always handled on the bound context.
/// The host drives it with [`Self::run_pending`] from its own event loop, or hands the context
/// over entirely with [`Self::run_blocking`] or [`Self::run`].
pub struct ConsumerLoop<H> {
    name: Arc<str>,
    inbox: UnboundedReceiver<Mail>,
    handler: H,
    bound_thread: ThreadId,
    stopped: bool,
    _bound: PhantomData<*const ()>,
}

impl<H: EnvelopeHandler> ConsumerLoop<H> {
    /// Creates a consumer bound to the current thread.
    pub fn bind(name: &str, handler: H) -> (Self, ConsumerRef) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let name: Arc<str> = Arc::from(name);
        let consumer = ConsumerRef {
            name: name.clone(),
            inbox: sender,
        };
        (Self::from_parts(name, receiver, handler), consumer)
    }

    fn from_parts(name: Arc<str>, inbox: UnboundedReceiver<Mail>, handler: H) -> Self {
        debug!(consumer = %name, "consumer bound");
        Self {
            name,
            inbox,
            handler,
            bound_thread: thread::current().id(),
            stopped: false,
            _bound: PhantomData,
        }
    }

    /// Consumer name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Thread this consumer is bound to.
    pub fn bound_thread(&self) -> ThreadId {
        self.bound_thread
    }

    /// Whether a shutdown request has been handled.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Borrows the handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Handles every envelope already queued, in arrival order, and returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut handled = 0;
        while !self.stopped {
            match self.inbox.try_recv() {
                Ok(mail) => handled += usize::from(self.dispatch(mail)),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        handled
    }

    /// Handles envelopes until shutdown is requested or every [`ConsumerRef`] is dropped, blocking
    /// the current thread while the inbox is empty. Returns the handler.
    ///
    /// Must not be called from inside an async runtime; use [`Self::run`] there.
    pub fn run_blocking(mut self) -> H {
        while !self.stopped {
            match self.inbox.blocking_recv() {
                Some(mail) => {
                    self.dispatch(mail);
                }
                None => break,
            }
        }
        self.finish()
    }

    /// Async form of [`Self::run_blocking`] for consumers living on a local task.
    pub async fn run(mut self) -> H {
        while !self.stopped {
            match self.inbox.recv().await {
                Some(mail) => {
                    self.dispatch(mail);
                }
                None => break,
            }
        }
        self.finish()
    }

    /// Releases the handler; envelopes still queued are discarded.
    pub fn into_handler(self) -> H {
        self.finish()
    }

    fn dispatch(&mut self, mail: Mail) -> bool {
        match mail {
            Mail::Deliver(envelope) => {
                trace!(consumer = %self.name, action = %envelope.action(), "handling envelope");
                self.handler.handle(envelope);
                true
            }
            Mail::Shutdown => {
                debug!(consumer = %self.name, "consumer shutdown requested");
                self.stopped = true;
                self.inbox.close();
                false
            }
        }
    }

    fn finish(mut self) -> H {
        self.inbox.close();
        debug!(consumer = %self.name, "consumer unbound");
        self.handler
    }
}

/// Dedicated consumer thread started by [`spawn_consumer`].
pub struct ConsumerThread<H> {
    consumer: ConsumerRef,
    join: Option<JoinHandle<H>>,
}

impl<H> ConsumerThread<H> {
    /// Reference for posting envelopes to the thread's inbox.
    pub fn consumer(&self) -> &ConsumerRef {
        &self.consumer
    }

    /// Requests shutdown, waits for queued envelopes to drain, and returns the handler.
    ///
    /// Returns `None` when the handler panicked.
    pub fn shutdown(mut self) -> Option<H> {
        self.consumer.request_shutdown();
        let join = self.join.take()?;
        match join.join() {
            Ok(handler) => Some(handler),
            Err(_) => {
                warn!(consumer = %self.consumer.name, "consumer thread panicked");
                None
            }
        }
    }
}

impl<H> Drop for ConsumerThread<H> {
    fn drop(&mut self) {
        if self.join.is_some() {
            self.consumer.request_shutdown();
        }
    }
}

/// Starts a named thread that owns a consumer loop for `handler`.
///
/// # Errors
///
/// Returns the OS error when the thread cannot be spawned.
pub fn spawn_consumer<H>(name: &str, handler: H) -> io::Result<ConsumerThread<H>>
where
    H: EnvelopeHandler + Send + 'static,
{
    let (sender, receiver) = mpsc::unbounded_channel();
    let name: Arc<str> = Arc::from(name);
    let consumer = ConsumerRef {
        name: name.clone(),
        inbox: sender,
    };
    let join = thread::Builder::new()
        .name(format!("consumer-{name}"))
        .spawn(move || ConsumerLoop::from_parts(name, receiver, handler).run_blocking())?;
    Ok(ConsumerThread {
        consumer,
        join: Some(join),
    })
}

type SharedHandler = Arc<Mutex<dyn EnvelopeHandler + Send>>;

/// Immediate handler running on this thread, with envelopes it delivered to itself.
struct ActiveFrame {
    id: usize,
    pending: VecDeque<Envelope>,
}

thread_local! {
    static ACTIVE_IMMEDIATE: RefCell<Vec<ActiveFrame>> = const { RefCell::new(Vec::new()) };
}

/// Consumer whose handler runs synchronously on the delivering thread.
///
/// Kept for compatibility with callers that expect the handler to have finished when delivery
/// returns. The handler executes with the producer's thread identity.
#[derive(Clone)]
pub struct ImmediateConsumer {
    name: Arc<str>,
    handler: SharedHandler,
}

impl ImmediateConsumer {
    /// Wraps a handler for immediate delivery.
    pub fn new<H>(name: &str, handler: H) -> Self
    where
        H: EnvelopeHandler + Send + 'static,
    {
        let handler: SharedHandler = Arc::new(Mutex::new(handler));
        Self {
            name: Arc::from(name),
            handler,
        }
    }

    /// Consumer name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn downgrade(&self) -> WeakImmediate {
        WeakImmediate {
            name: self.name.clone(),
            handler: Arc::downgrade(&self.handler),
        }
    }
}

/// Non-owning handle the dispatcher keeps for an [`ImmediateConsumer`].
#[derive(Clone)]
pub(crate) struct WeakImmediate {
    pub(crate) name: Arc<str>,
    handler: std::sync::Weak<Mutex<dyn EnvelopeHandler + Send>>,
}

impl WeakImmediate {
    /// Whether the [`ImmediateConsumer`] still exists.
    pub(crate) fn is_alive(&self) -> bool {
        self.handler.strong_count() > 0
    }

    /// Runs the handler on the calling thread. Returns `false` when the consumer is gone.
    ///
    /// A delivery made from inside the same handler is queued and handled, in order, once the
    /// running call returns, so the handler never re-locks itself.
    pub(crate) fn invoke(&self, envelope: Envelope) -> bool {
        let Some(handler) = self.handler.upgrade() else {
            trace!(consumer = %self.name, "immediate consumer dropped; dropping envelope");
            return false;
        };
        let id = Arc::as_ptr(&handler).cast::<()>() as usize;
        let first = ACTIVE_IMMEDIATE.with(|active| {
            let mut active = active.borrow_mut();
            match active.iter_mut().find(|frame| frame.id == id) {
                Some(frame) => {
                    frame.pending.push_back(envelope);
                    None
                }
                None => {
                    active.push(ActiveFrame {
                        id,
                        pending: VecDeque::new(),
                    });
                    Some(envelope)
                }
            }
        });
        let Some(first) = first else {
            trace!(consumer = %self.name, "re-entrant immediate delivery deferred");
            return true;
        };

        debug!(
            consumer = %self.name,
            producer_thread = ?thread::current().id(),
            "immediate delivery on producer thread"
        );
        let _active = ActiveImmediate(id);
        let mut next = Some(first);
        while let Some(envelope) = next {
            handler.lock().handle(envelope);
            next = ACTIVE_IMMEDIATE.with(|active| {
                active
                    .borrow_mut()
                    .iter_mut()
                    .find(|frame| frame.id == id)
                    .and_then(|frame| frame.pending.pop_front())
            });
        }
        true
    }
}

/// Removes the active frame even when the handler unwinds.
struct ActiveImmediate(usize);

impl Drop for ActiveImmediate {
    fn drop(&mut self) {
        ACTIVE_IMMEDIATE.with(|active| active.borrow_mut().retain(|frame| frame.id != self.0));
    }
}
