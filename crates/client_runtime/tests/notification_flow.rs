use std::{
    sync::{mpsc, Arc, Barrier},
    thread,
};

use client_notify::{actions, Action, Envelope, NewTokenReason, SubType};
use client_platform::{ClientServices, MemoryPrefsStore, DEFAULT_RECENT_SONG_COUNT};
use client_runtime::{AttachedConsumer, ClientConfig, ClientContext};
use futures::executor::block_on;
use pretty_assertions::assert_eq;

fn summary(envelope: &Envelope) -> (String, Option<u32>, Option<String>) {
    (
        envelope.action().to_string(),
        envelope.sub_type().map(SubType::get),
        envelope.error_message().map(str::to_string),
    )
}

#[test]
fn notifications_before_attach_are_dropped() {
    let mut context = ClientContext::initialize(ClientConfig::default(), ClientServices::noop());
    let producer = context.dispatcher();
    producer.send(actions::FETCH_DONE);

    let (tx, rx) = mpsc::channel();
    let AttachedConsumer::Queued(mut consumer_loop) =
        context.attach_consumer(move |envelope: Envelope| {
            let _ = tx.send(summary(&envelope));
        })
    else {
        panic!("default mode is queued");
    };

    assert_eq!(consumer_loop.run_pending(), 0);
    producer.send(actions::CACHE_LOADED);
    assert_eq!(consumer_loop.run_pending(), 1);
    assert_eq!(
        rx.try_recv().expect("one envelope"),
        ("cacheLoaded".to_string(), None, None)
    );
}

#[test]
fn spawned_consumer_sees_each_producer_in_order() {
    const PER_PRODUCER: u32 = 50;

    let mut context = ClientContext::initialize(ClientConfig::default(), ClientServices::noop());
    let (tx, rx) = mpsc::channel();
    context
        .spawn_consumer(move |envelope: Envelope| {
            let consumer_thread = thread::current().name().map(str::to_string);
            let _ = tx.send((consumer_thread, envelope));
        })
        .expect("spawn consumer");

    let start = Arc::new(Barrier::new(2));
    let producers: Vec<_> = [SubType::ASYNC_ALBUMS, SubType::ASYNC_ARTISTS]
        .into_iter()
        .map(|sub_type| {
            let dispatcher = context.dispatcher();
            let start = start.clone();
            thread::spawn(move || {
                start.wait();
                for sequence in 0..PER_PRODUCER {
                    dispatcher.send_error(
                        actions::FETCH_DONE,
                        Some(sub_type),
                        Some(&sequence.to_string()),
                    );
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().expect("producer thread");
    }
    context.shutdown();

    let received: Vec<_> = rx.try_iter().collect();
    assert_eq!(received.len(), 2 * PER_PRODUCER as usize);
    assert!(received
        .iter()
        .all(|(name, _)| name.as_deref() == Some("consumer-ui")));
    for sub_type in [SubType::ASYNC_ALBUMS, SubType::ASYNC_ARTISTS] {
        let sequences: Vec<u32> = received
            .iter()
            .filter(|(_, envelope)| envelope.sub_type() == Some(sub_type))
            .map(|(_, envelope)| {
                envelope
                    .error_message()
                    .expect("sequence text")
                    .parse()
                    .expect("numeric sequence")
            })
            .collect();
        assert_eq!(sequences, (0..PER_PRODUCER).collect::<Vec<_>>());
    }
}

#[test]
fn immediate_mode_runs_on_the_producer_thread() {
    let config = ClientConfig::from_toml_str("[notifications]\ndelivery_mode = \"immediate\"\n")
        .expect("parse config");
    let mut context = ClientContext::initialize(config, ClientServices::noop());
    let (tx, rx) = mpsc::channel();
    context.attach_immediate(move |envelope: Envelope| {
        let _ = tx.send((thread::current().id(), envelope));
    });

    let dispatcher = context.dispatcher();
    let producer = thread::spawn(move || {
        dispatcher.send_error_with_token_reason(
            actions::TOKEN_REFRESH_NEEDED,
            None,
            Some("expired"),
            NewTokenReason::Cache,
        );
        thread::current().id()
    });
    let producer_id = producer.join().expect("producer thread");

    let (handled_on, envelope) = rx.try_recv().expect("handled before send returned");
    assert_eq!(handled_on, producer_id);
    assert_eq!(envelope.new_token_reason(), Some(NewTokenReason::Cache));
    assert_eq!(envelope.error_message(), Some("expired"));
}

#[test]
fn custom_actions_travel_with_extras() {
    let mut context = ClientContext::initialize(ClientConfig::default(), ClientServices::noop());
    let (tx, rx) = mpsc::channel();
    let mut consumer_loop = context.attach_queued(move |envelope: Envelope| {
        let _ = tx.send(envelope);
    });

    let mut payload = client_notify::Payload::new();
    payload.insert("count".to_string(), 12_i64.into());
    context.dispatcher().send_payload(
        Action::new("playlistUpdated").expect("valid action"),
        Some(payload),
        Some(SubType::ASYNC_PLAYLISTS),
    );
    consumer_loop.run_pending();

    let envelope = rx.try_recv().expect("delivered");
    assert_eq!(envelope.action().as_str(), "playlistUpdated");
    assert_eq!(
        envelope.extras().get("count").and_then(|value| value.as_int()),
        Some(12)
    );
    assert!(!envelope.is_failure());
}

#[test]
fn persisted_settings_round_trip_through_context() {
    let prefs = MemoryPrefsStore::default();
    let services = ClientServices::noop().with_prefs(Arc::new(prefs.clone()));
    let context = ClientContext::initialize(ClientConfig::default(), services);

    let searches = context.recent_searches();
    assert!(block_on(searches.load()).expect("load empty").is_empty());
    block_on(searches.save(&["miles".to_string(), "monk".to_string(), "mingus".to_string()]))
        .expect("save three");
    block_on(searches.save(&["bird".to_string()])).expect("save one");
    assert_eq!(
        block_on(context.recent_searches().load()).expect("reload"),
        vec!["bird".to_string()]
    );
    assert_eq!(prefs.keys(), vec!["recent_search.0".to_string()]);

    let settings = context.settings();
    assert_eq!(block_on(settings.recent_song_count()), DEFAULT_RECENT_SONG_COUNT);
    block_on(settings.set_int(client_platform::RECENT_SONG_COUNT_KEY, 75)).expect("set count");
    assert_eq!(block_on(context.settings().recent_song_count()), 75);
}
