//! Process-owned client context.
//!
//! The entry point builds one [`ClientContext`] from configuration and the selected platform
//! services, hands clones of its [`Dispatcher`] to background work, and shuts it down on exit.
//! Nothing here is a process-wide global.

use client_notify::{
    spawn_consumer, ConsumerLoop, ConsumerThread, DeliveryMode, Dispatcher, Envelope,
    EnvelopeHandler, ImmediateConsumer,
};
use client_platform::{
    lookup_server_url_with, AccountRef, ClientServices, NetworkStatus, RecentSearchStore,
    ScalarSettings,
};
use tracing::{debug, info};

use crate::{
    config::ClientConfig,
    error::{RuntimeError, RuntimeResult},
};

type ErasedHandler = Box<dyn FnMut(Envelope) + Send>;

/// Consumer attached through [`ClientContext::attach_consumer`].
pub enum AttachedConsumer<H> {
    /// Queued mode: the caller drives this loop on the current thread.
    Queued(ConsumerLoop<H>),
    /// Immediate mode: the context keeps the handler; producers run it directly.
    Immediate,
}

/// Explicitly injected application context: configuration, platform services, and the
/// notification dispatcher with its consumer.
pub struct ClientContext {
    config: ClientConfig,
    services: ClientServices,
    dispatcher: Dispatcher,
    consumer_thread: Option<ConsumerThread<ErasedHandler>>,
    immediate: Option<ImmediateConsumer>,
}

impl ClientContext {
    /// Builds the context. No consumer is bound yet, so early notifications are dropped.
    pub fn initialize(config: ClientConfig, services: ClientServices) -> Self {
        info!(
            delivery_mode = config.notifications.delivery_mode.as_str(),
            consumer = %config.notifications.consumer_name,
            "client context initialized"
        );
        Self {
            config,
            services,
            dispatcher: Dispatcher::new(),
            consumer_thread: None,
            immediate: None,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Injected platform services.
    pub fn services(&self) -> &ClientServices {
        &self.services
    }

    /// Dispatcher handle for producers; clones share the binding.
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// Recent-search store over the injected prefs service.
    pub fn recent_searches(&self) -> RecentSearchStore {
        RecentSearchStore::with_namespace(
            self.services.prefs.clone(),
            self.config.settings.recent_searches_namespace.clone(),
        )
    }

    /// Scalar settings over the injected prefs service.
    pub fn settings(&self) -> ScalarSettings {
        ScalarSettings::new(self.services.prefs.clone())
            .with_recent_song_count_default(self.config.settings.recent_song_count_default)
    }

    /// Current connectivity.
    pub fn network_status(&self) -> NetworkStatus {
        self.services.network.current_status()
    }

    /// Server URL registered for `account`, if the credential service knows one.
    pub async fn server_url(&self, account: &AccountRef) -> Option<String> {
        lookup_server_url_with(Some(self.services.credentials.as_ref()), account).await
    }

    /// Binds a queued consumer to the current thread, replacing any previous consumer.
    ///
    /// The caller drives the returned loop from its own event loop.
    pub fn attach_queued<H: EnvelopeHandler>(&mut self, handler: H) -> ConsumerLoop<H> {
        self.release_consumer();
        let (consumer_loop, consumer) =
            ConsumerLoop::bind(&self.config.notifications.consumer_name, handler);
        self.dispatcher.bind_queued(consumer);
        consumer_loop
    }

    /// Binds a handler that runs synchronously on producer threads, replacing any previous
    /// consumer.
    pub fn attach_immediate<H>(&mut self, handler: H)
    where
        H: EnvelopeHandler + Send + 'static,
    {
        self.release_consumer();
        let consumer = ImmediateConsumer::new(&self.config.notifications.consumer_name, handler);
        self.dispatcher.bind_immediate(&consumer);
        self.immediate = Some(consumer);
    }

    /// Binds a consumer in the configured delivery mode.
    pub fn attach_consumer<H>(&mut self, handler: H) -> AttachedConsumer<H>
    where
        H: EnvelopeHandler + Send + 'static,
    {
        match self.config.notifications.delivery_mode {
            DeliveryMode::Queued => AttachedConsumer::Queued(self.attach_queued(handler)),
            DeliveryMode::Immediate => {
                self.attach_immediate(handler);
                AttachedConsumer::Immediate
            }
        }
    }

    /// Binds a queued consumer running on its own named thread.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ConsumerSpawn`] when the thread cannot be started; the dispatcher
    /// is left unbound.
    pub fn spawn_consumer<H>(&mut self, mut handler: H) -> RuntimeResult<()>
    where
        H: EnvelopeHandler + Send + 'static,
    {
        self.release_consumer();
        let name = self.config.notifications.consumer_name.clone();
        let erased: ErasedHandler = Box::new(move |envelope| handler.handle(envelope));
        let thread = spawn_consumer(&name, erased)
            .map_err(|source| RuntimeError::ConsumerSpawn { name, source })?;
        self.dispatcher.bind_queued(thread.consumer().clone());
        self.consumer_thread = Some(thread);
        Ok(())
    }

    /// Unbinds the dispatcher and stops the consumer, waiting for a consumer thread to drain.
    pub fn shutdown(&mut self) {
        self.release_consumer();
        debug!("client context shut down");
    }

    fn release_consumer(&mut self) {
        self.dispatcher.unbind();
        self.immediate = None;
        if let Some(thread) = self.consumer_thread.take() {
            thread.shutdown();
        }
    }
}

impl Drop for ClientContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{mpsc, Arc};

    use client_notify::{actions, SubType};
    use client_platform::{MemoryCredentialStore, MemoryPrefsStore};
    use futures::executor::block_on;

    use super::*;
    use crate::config::NotificationConfig;

    fn immediate_config() -> ClientConfig {
        ClientConfig {
            notifications: NotificationConfig {
                delivery_mode: DeliveryMode::Immediate,
                ..NotificationConfig::default()
            },
            ..ClientConfig::default()
        }
    }

    #[test]
    fn queued_attach_defers_handling_to_the_loop() {
        let mut context = ClientContext::initialize(ClientConfig::default(), ClientServices::noop());
        let (tx, rx) = mpsc::channel();
        let attached = context.attach_consumer(move |envelope: Envelope| {
            let _ = tx.send(envelope.action().to_string());
        });
        let AttachedConsumer::Queued(mut consumer_loop) = attached else {
            panic!("default mode is queued");
        };

        context.dispatcher().send(actions::FETCH_DONE);
        assert!(rx.try_recv().is_err());
        assert_eq!(consumer_loop.run_pending(), 1);
        assert_eq!(rx.try_recv().expect("handled"), "fetchDone");
    }

    #[test]
    fn immediate_attach_runs_handler_inline() {
        let mut context = ClientContext::initialize(immediate_config(), ClientServices::noop());
        let (tx, rx) = mpsc::channel();
        assert!(matches!(
            context.attach_consumer(move |envelope: Envelope| {
                let _ = tx.send(envelope.sub_type());
            }),
            AttachedConsumer::Immediate
        ));

        context
            .dispatcher()
            .send_error(actions::FETCH_DONE, Some(SubType::ASYNC_SONGS), None);
        assert_eq!(rx.try_recv().expect("handled inline"), Some(SubType::ASYNC_SONGS));
    }

    #[test]
    fn shutdown_unbinds_dispatcher() {
        let mut context = ClientContext::initialize(ClientConfig::default(), ClientServices::noop());
        let producer = context.dispatcher();
        context
            .spawn_consumer(|_envelope: Envelope| {})
            .expect("spawn consumer");
        assert!(producer.is_bound());

        context.shutdown();
        assert!(!producer.is_bound());
        producer.send(actions::FETCH_DONE);
    }

    #[test]
    fn settings_follow_configuration() {
        let mut config = ClientConfig::default();
        config.settings.recent_song_count_default = 60;
        config.settings.recent_searches_namespace = "songs".into();
        let prefs = MemoryPrefsStore::default();
        let services = ClientServices::noop().with_prefs(Arc::new(prefs.clone()));
        let context = ClientContext::initialize(config, services);

        assert_eq!(block_on(context.settings().recent_song_count()), 60);
        block_on(context.recent_searches().save(&["trane".to_string()])).expect("save");
        assert_eq!(prefs.keys(), vec!["songs.0".to_string()]);
    }

    #[test]
    fn server_url_comes_from_injected_credentials() {
        let credentials = MemoryCredentialStore::default();
        let account = AccountRef::new("listener", "music.client");
        credentials.insert_server_url(account.clone(), "https://music.example.com");
        let services = ClientServices {
            credentials: Arc::new(credentials),
            ..ClientServices::noop()
        };
        let context = ClientContext::initialize(ClientConfig::default(), services);

        assert_eq!(
            block_on(context.server_url(&account)).as_deref(),
            Some("https://music.example.com")
        );
        assert_eq!(
            block_on(context.server_url(&AccountRef::new("ghost", "music.client"))),
            None
        );
        assert_eq!(context.network_status(), NetworkStatus::Unknown);
    }
}
