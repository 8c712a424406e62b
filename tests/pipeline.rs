mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use smartbin_host::{BinStatus, ConnectionStatus, Snapshot};

async fn wait_for(
    rx: &mut tokio::sync::watch::Receiver<Arc<Snapshot>>,
    done: impl Fn(&Snapshot) -> bool,
) -> Arc<Snapshot> {
    tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            {
                let current = rx.borrow_and_update().clone();
                if done(&current) {
                    return current;
                }
            }
            rx.changed().await.expect("store dropped");
        }
    })
    .await
    .expect("snapshot never reached the expected state")
}

#[tokio::test(start_paused = true)]
async fn live_frame_flows_into_snapshot() {
    let (manager, store, transport) = common::manager(common::settings());
    let handle = manager.handle();
    let mut rx = store.watch();
    let task = tokio::spawn(manager.run());

    let sink = transport.attempt(0).await;
    sink.opened();
    wait_for(&mut rx, |s| s.connection_status == ConnectionStatus::Connected).await;

    sink.message(r#"{"temperature": 25, "humidity": 60, "ultrasonicDistance": 9}"#);
    let snapshot = wait_for(&mut rx, |s| s.reading.temperature.is_some()).await;

    assert_eq!(snapshot.derived.fill_percentage, 70);
    assert_eq!(snapshot.derived.bin_status, BinStatus::High);
    let stamp = snapshot.last_update.expect("reading stamps the snapshot");
    for (series, value) in [
        (&snapshot.history.temperature, 25.0),
        (&snapshot.history.humidity, 60.0),
        (&snapshot.history.distance, 9.0),
    ] {
        assert_eq!(series.len(), 1);
        let point = series.last().unwrap();
        assert_eq!(point.value, value);
        assert_eq!(point.timestamp, stamp);
    }

    handle.shutdown();
    task.await.unwrap();
    common::settle().await;
    assert_eq!(transport.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn subscribers_never_see_half_applied_readings() {
    let (manager, store, transport) = common::manager(common::settings());
    let handle = manager.handle();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let _sub = store.subscribe(move |s| {
        log.lock().unwrap().push((
            s.reading.distance,
            s.history.distance.last().map(|p| p.value),
            s.derived.fill_percentage,
        ));
    });
    let mut rx = store.watch();
    let task = tokio::spawn(manager.run());

    let sink = transport.attempt(0).await;
    sink.opened();
    for distance in [30, 24, 18, 12, 6, 0] {
        sink.message(format!(r#"{{"ultrasonicDistance": {distance}}}"#));
    }
    wait_for(&mut rx, |s| s.history.distance.len() == 6).await;
    handle.shutdown();
    task.await.unwrap();

    for (distance, last, fill) in seen.lock().unwrap().iter().copied() {
        if let Some(distance) = distance {
            assert_eq!(last, Some(distance));
            assert_eq!(fill, smartbin_host::fill::fill_percentage(Some(distance)));
        }
    }
}

#[tokio::test(start_paused = true)]
async fn history_is_capped_at_fifty_points() {
    let (manager, store, transport) = common::manager(common::settings());
    let handle = manager.handle();
    let mut rx = store.watch();
    let task = tokio::spawn(manager.run());

    let sink = transport.attempt(0).await;
    sink.opened();
    for i in 1..=60 {
        sink.message(format!(r#"{{"temperature": {i}}}"#));
    }
    let snapshot = wait_for(&mut rx, |s| s.reading.temperature == Some(60.0)).await;

    assert_eq!(snapshot.history.temperature.len(), 50);
    assert_eq!(snapshot.history.temperature.first().unwrap().value, 11.0);
    assert!(snapshot.history.humidity.is_empty());
    assert!(snapshot.history.distance.is_empty());
    // no distance ever arrived
    assert_eq!(snapshot.derived.fill_percentage, 0);

    handle.shutdown();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn simulation_feeds_the_same_path() {
    let mut settings = common::settings();
    settings.secure_context = true;
    let (manager, store, _transport) = common::manager(settings);
    let handle = manager.handle();
    let mut rx = store.watch();
    let task = tokio::spawn(manager.run());

    let snapshot = wait_for(&mut rx, |s| s.history.distance.len() == 3).await;
    assert_eq!(snapshot.connection_status, ConnectionStatus::Simulation);
    let distance = snapshot.reading.distance.unwrap();
    assert_eq!(
        snapshot.derived.fill_percentage,
        smartbin_host::fill::fill_percentage(Some(distance))
    );

    handle.shutdown();
    task.await.unwrap();
}
