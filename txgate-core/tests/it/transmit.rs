use std::time::Duration;

use txgate_core::{ConfigError, TransmitError, TransmitOptions, Transmitter, WorkerState};
use txgate_link::{Interface, ResolveError};
use txgate_wire::FrameTemplate;

use crate::stub::{wait_until, Mode, StubInterface, StubResolver, STUB_IFACE};

#[tokio::test]
async fn bounded_count_sends_exactly_n() {
    let _ = tracing_subscriber::fmt::try_init();

    let (interface, probe) = StubInterface::new(Mode::Accept);
    let options = TransmitOptions::default().with_count(5);
    let tx = Transmitter::spawn(interface, FrameTemplate::default(), options).unwrap();

    let report = tx.wait().await.unwrap();

    assert_eq!(report.sent, 5);
    assert_eq!(report.completed, 5);
    assert_eq!(report.rejected, 0);
    assert_eq!(probe.submitted(), 5);
    assert!(probe.released());
}

#[tokio::test]
async fn bounded_count_with_slow_completions() {
    let _ = tracing_subscriber::fmt::try_init();

    let (interface, probe) = StubInterface::new(Mode::Hold);
    let options = TransmitOptions::default().with_max_in_flight(3).with_count(50);
    let tx = Transmitter::spawn(interface, FrameTemplate::default(), options).unwrap();

    let completer = {
        let probe = probe.clone();
        tokio::spawn(async move {
            while probe.submitted() < 50 || probe.held() > 0 {
                tokio::time::sleep(Duration::from_micros(200)).await;
                probe.complete_one();
            }
        })
    };

    while tx.state() != WorkerState::Stopped {
        assert!(tx.in_flight() <= 3);
        tokio::time::sleep(Duration::from_micros(100)).await;
    }

    let report = tx.wait().await.unwrap();
    completer.await.unwrap();

    assert_eq!(report.sent, 50);
    assert_eq!(report.completed, 50);
    assert_eq!(probe.max_outstanding(), 3);
}

#[tokio::test]
async fn unbounded_count_runs_until_stopped() {
    let _ = tracing_subscriber::fmt::try_init();

    let (interface, probe) = StubInterface::new(Mode::Accept);
    let tx = Transmitter::spawn(interface, FrameTemplate::default(), TransmitOptions::default())
        .unwrap();

    wait_until(|| tx.stats().sent() >= 1_000).await;
    assert_eq!(tx.state(), WorkerState::Running);

    let report = tx.shutdown().await.unwrap();

    assert!(report.sent >= 1_000);
    assert_eq!(report.sent, report.completed);
    assert_eq!(report.sent as usize, probe.submitted());
}

#[tokio::test]
async fn rejected_frames_are_rolled_back() {
    let _ = tracing_subscriber::fmt::try_init();

    let (interface, probe) = StubInterface::new(Mode::Reject);
    let options = TransmitOptions::default().with_count(5);
    let tx = Transmitter::spawn(interface, FrameTemplate::default(), options).unwrap();

    wait_until(|| tx.stats().rejected() >= 100).await;
    assert_eq!(tx.stats().sent(), 0);
    assert_eq!(tx.in_flight(), 0);
    assert_eq!(tx.state(), WorkerState::Running);

    let report = tx.shutdown().await.unwrap();

    assert_eq!(report.sent, 0);
    assert_eq!(report.completed, 0);
    assert_eq!(probe.submitted(), 0);
}

#[tokio::test]
async fn full_gate_admits_one_frame_per_completion() {
    let _ = tracing_subscriber::fmt::try_init();

    let (interface, probe) = StubInterface::new(Mode::Hold);
    let options = TransmitOptions::default().with_max_in_flight(2);
    let tx = Transmitter::spawn(interface, FrameTemplate::default(), options).unwrap();

    wait_until(|| probe.submitted() == 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(probe.submitted(), 2);
    assert_eq!(tx.stats().sent(), 2);
    assert_eq!(tx.in_flight(), 2);

    assert!(probe.complete_one());
    wait_until(|| probe.submitted() == 3).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(probe.submitted(), 3);
    assert_eq!(tx.in_flight(), 2);

    let shutdown = tokio::spawn(tx.shutdown());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!shutdown.is_finished());
    assert_eq!(probe.held(), 2);
    probe.complete_all();

    let report = shutdown.await.unwrap().unwrap();
    assert_eq!(report.sent, 3);
    assert_eq!(report.completed, 3);
}

#[tokio::test]
async fn allocation_failures_do_not_leak_slots() {
    let _ = tracing_subscriber::fmt::try_init();

    let (interface, probe) = StubInterface::new(Mode::Accept);
    let interface = interface.with_headroom(usize::MAX - 1);
    let options = TransmitOptions::default().with_max_in_flight(1);
    let tx = Transmitter::spawn(interface, FrameTemplate::default(), options).unwrap();

    wait_until(|| tx.stats().alloc_failures() >= 10).await;
    assert_eq!(tx.in_flight(), 0);
    assert_eq!(tx.stats().sent(), 0);

    let report = tx.shutdown().await.unwrap();
    assert_eq!(report.sent, 0);
    assert_eq!(probe.submitted(), 0);
}

#[tokio::test]
async fn start_resolves_the_interface() {
    let resolver = StubResolver::new(Mode::Accept);
    let options = TransmitOptions::default().with_count(3);

    let tx = Transmitter::start(&resolver, STUB_IFACE, FrameTemplate::default(), options).unwrap();
    assert_eq!(tx.interface().map(|iface| iface.name()), Some(STUB_IFACE));

    let report = tx.wait().await.unwrap();
    assert_eq!(report.sent, 3);

    let probe = resolver.probe.lock().clone().unwrap();
    assert_eq!(probe.submitted(), 3);
    assert!(probe.released());
}

#[tokio::test]
async fn start_rejects_bad_configuration() {
    let resolver = StubResolver::new(Mode::Accept);

    let err = Transmitter::start(&resolver, "", FrameTemplate::default(), Default::default())
        .unwrap_err();
    assert!(matches!(err, TransmitError::Config(ConfigError::EmptyInterfaceName)));

    let options = TransmitOptions::default().with_max_in_flight(0);
    let err = Transmitter::start(&resolver, STUB_IFACE, FrameTemplate::default(), options)
        .unwrap_err();
    assert!(matches!(err, TransmitError::Config(ConfigError::ZeroInFlight)));

    let err = Transmitter::start(&resolver, "eth9", FrameTemplate::default(), Default::default())
        .unwrap_err();
    assert!(matches!(err, TransmitError::Resolve(ResolveError::NotFound(name)) if name == "eth9"));

    // nothing was resolved, so nothing was started
    assert!(resolver.probe.lock().is_none());
}

#[test]
fn spawn_without_runtime_releases_the_interface() {
    let (interface, probe) = StubInterface::new(Mode::Accept);

    let err = Transmitter::spawn(interface, FrameTemplate::default(), Default::default())
        .unwrap_err();

    assert!(matches!(err, TransmitError::WorkerSpawn(_)));
    assert!(probe.released());
    assert_eq!(probe.submitted(), 0);
}
