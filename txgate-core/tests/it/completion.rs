use std::time::Duration;

use txgate_core::{TransmitOptions, Transmitter, WorkerState};
use txgate_wire::FrameTemplate;

use crate::stub::{Mode, StubInterface};

#[tokio::test]
async fn duplicate_completions_release_once() {
    let _ = tracing_subscriber::fmt::try_init();

    let (interface, probe) = StubInterface::new(Mode::AcceptTwice);
    let options = TransmitOptions::default().with_max_in_flight(2).with_count(20);
    let tx = Transmitter::spawn(interface, FrameTemplate::default(), options).unwrap();

    let report = tx.wait().await.unwrap();

    assert_eq!(report.sent, 20);
    assert_eq!(report.completed, 20);
    assert_eq!(report.duplicate_completions, 20);
    assert_eq!(probe.submitted(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_completions_from_other_threads() {
    let _ = tracing_subscriber::fmt::try_init();

    let (interface, probe) = StubInterface::new(Mode::Threaded);
    let options = TransmitOptions::default().with_max_in_flight(4).with_count(200);
    let tx = Transmitter::spawn(interface, FrameTemplate::default(), options).unwrap();

    while tx.state() != WorkerState::Stopped {
        assert!(tx.in_flight() <= 4);
        tokio::time::sleep(Duration::from_micros(50)).await;
    }

    let report =
        tokio::time::timeout(Duration::from_secs(10), tx.wait()).await.unwrap().unwrap();

    assert_eq!(report.sent, 200);
    assert_eq!(report.completed, 200);
    // the losing side of a race may still be counting its duplicate
    assert!(report.duplicate_completions <= 200);
    assert!(probe.max_outstanding() <= 4);
    assert!(probe.released());
}

#[tokio::test]
async fn transmitters_do_not_share_slots() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut probes = Vec::new();
    let mut txs = Vec::new();
    for max_in_flight in 1..=3 {
        let (interface, probe) = StubInterface::new(Mode::AcceptTwice);
        let options = TransmitOptions::default().with_max_in_flight(max_in_flight).with_count(10);
        txs.push(Transmitter::spawn(interface, FrameTemplate::default(), options).unwrap());
        probes.push(probe);
    }

    let reports = futures::future::try_join_all(txs.into_iter().map(Transmitter::wait))
        .await
        .unwrap();

    for (report, probe) in reports.iter().zip(&probes) {
        assert_eq!(report.sent, 10);
        assert_eq!(report.completed, 10);
        assert_eq!(report.duplicate_completions, 10);
        assert_eq!(probe.submitted(), 10);
    }
}
