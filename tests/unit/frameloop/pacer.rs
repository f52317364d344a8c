use super::*;
use crate::encode::sink::InMemorySink;
use std::time::Instant;

const LONG: Duration = Duration::from_secs(5);

fn solid(value: u8) -> Frame {
    Frame::from_rgba8(2, 2, vec![value; 16]).unwrap()
}

/// First byte of every written frame, with consecutive repeats collapsed.
fn written_values(sink: &InMemorySink) -> Vec<u8> {
    let mut values: Vec<u8> = sink.bytes().chunks(16).map(|f| f[0]).collect();
    values.dedup();
    values
}

fn start(
    sink: &InMemorySink,
    rate: i64,
    notify: bool,
) -> (
    FrameLoop<InMemorySink>,
    Sender<Frame>,
    Option<Receiver<Emitted>>,
) {
    let (tx, rx) = frame_channel();
    let (ntx, nrx) = notification_channel();
    let (ntx, nrx) = if notify {
        (Some(ntx), Some(nrx))
    } else {
        (None, None)
    };
    let fl = FrameLoop::new(&CancelToken::new(), sink.clone(), rate, rx, ntx);
    (fl, tx, nrx)
}

#[test]
fn invalid_rate_is_done_immediately() {
    for rate in [0, -5] {
        let sink = InMemorySink::new();
        let (fl, tx, _) = start(&sink, rate, false);
        assert!(fl.is_done());
        assert!(matches!(fl.error(), Some(FrameLoopError::InvalidFrameRate(r)) if r == rate));
        let _ = tx.try_send(solid(1));
        let _sink = fl.join();
        assert_eq!(sink.attempts(), 0);
    }
}

#[test]
fn closed_before_first_frame_is_an_error() {
    let sink = InMemorySink::new();
    let (fl, tx, _) = start(&sink, 50, false);
    drop(tx);
    assert!(fl.wait_timeout(LONG));
    assert!(matches!(
        fl.error(),
        Some(FrameLoopError::ClosedBeforeFirstFrame)
    ));
    assert_eq!(sink.attempts(), 0);
}

#[test]
fn stop_before_first_frame_is_not_an_error() {
    let sink = InMemorySink::new();
    let (fl, _tx, _) = start(&sink, 50, false);
    fl.stop();
    assert!(fl.wait_timeout(LONG));
    assert!(fl.error().is_none());
    assert_eq!(sink.attempts(), 0);
}

#[test]
fn every_frame_is_written_in_order() {
    let sink = InMemorySink::new();
    let (fl, tx, nrx) = start(&sink, 200, true);
    let nrx = nrx.unwrap();
    for v in 1..=5 {
        tx.send(solid(v)).unwrap();
    }
    while let Some(pulse) = fl.wait_for_next_emission(&nrx) {
        if pulse.frame == 5 {
            break;
        }
    }
    fl.stop();
    fl.wait();
    assert!(fl.error().is_none());
    assert_eq!(written_values(&sink), vec![1, 2, 3, 4, 5]);
}

#[test]
fn first_frame_is_written_without_waiting_for_a_tick() {
    let sink = InMemorySink::new();
    // one tick per second
    let (fl, tx, nrx) = start(&sink, 1, true);
    let nrx = nrx.unwrap();
    let started = Instant::now();
    tx.send(solid(7)).unwrap();
    let pulse = fl.wait_for_next_emission(&nrx).unwrap();
    assert_eq!(pulse, Emitted { seq: 1, frame: 1 });
    assert!(started.elapsed() < Duration::from_millis(900));
}

#[test]
fn last_frame_repeats_after_channel_closes() {
    let sink = InMemorySink::new();
    let (fl, tx, _) = start(&sink, 200, false);
    tx.send(solid(3)).unwrap();
    drop(tx);
    std::thread::sleep(Duration::from_millis(150));
    assert!(!fl.is_done());
    fl.stop();
    assert!(fl.wait_timeout(LONG));
    assert!(fl.error().is_none());
    assert!(sink.writes().len() >= 5);
    assert_eq!(written_values(&sink), vec![3]);
}

#[test]
fn write_failure_ends_the_loop() {
    let sink = InMemorySink::failing_from(3);
    let (fl, tx, _) = start(&sink, 200, false);
    tx.send(solid(1)).unwrap();
    assert!(fl.wait_timeout(LONG));
    assert!(matches!(fl.error(), Some(FrameLoopError::Write(_))));
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(sink.attempts(), 3);

    // A later stop does not replace the recorded error.
    fl.stop();
    assert!(matches!(fl.error(), Some(FrameLoopError::Write(_))));
}

#[test]
fn concurrent_stops_are_harmless() {
    let sink = InMemorySink::new();
    let (fl, tx, _) = start(&sink, 100, false);
    tx.send(solid(1)).unwrap();
    let fl = Arc::new(fl);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let fl = Arc::clone(&fl);
            std::thread::spawn(move || fl.stop())
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert!(fl.wait_timeout(LONG));
    assert!(fl.error().is_none());
}

#[test]
fn panic_is_recorded_and_rethrown_on_join() {
    let sink = InMemorySink::panicking_at(2);
    let (fl, tx, _) = start(&sink, 200, false);
    tx.send(solid(1)).unwrap();
    assert!(fl.wait_timeout(LONG));

    let err = fl.error().unwrap();
    assert!(err.is_panic());
    let panic = err.as_panic().unwrap();
    assert_eq!(panic.location(), "frame loop");
    assert!(panic.message().contains("injected panic on write 2"));
    assert!(is_panic(&err));

    let payload = catch_unwind(AssertUnwindSafe(move || fl.join())).unwrap_err();
    assert!(payload.downcast_ref::<PanicSource>().is_some());
}

#[test]
fn wait_for_next_emission_returns_none_once_done() {
    let sink = InMemorySink::new();
    let (fl, tx, nrx) = start(&sink, 100, true);
    let nrx = nrx.unwrap();
    tx.send(solid(1)).unwrap();
    assert!(fl.wait_for_next_emission(&nrx).is_some());
    fl.stop();
    fl.wait();
    // At most one pulse can still be buffered.
    let _ = nrx.try_recv();
    assert!(fl.wait_for_next_emission(&nrx).is_none());
}

#[test]
fn pulses_count_repeats_of_the_same_frame() {
    let sink = InMemorySink::new();
    let (fl, tx, nrx) = start(&sink, 200, true);
    let nrx = nrx.unwrap();
    tx.send(solid(1)).unwrap();
    let mut last = 0;
    for _ in 0..3 {
        let pulse = fl.wait_for_next_emission(&nrx).unwrap();
        assert!(pulse.seq > last);
        assert_eq!(pulse.frame, 1);
        last = pulse.seq;
    }
}

#[test]
fn parent_cancel_ends_the_loop_without_error() {
    let parent = CancelToken::new();
    let sink = InMemorySink::new();
    let (tx, rx) = frame_channel();
    let fl = FrameLoop::new(&parent, sink.clone(), 100, rx, None);
    tx.send(solid(1)).unwrap();
    parent.cancel();
    assert!(fl.wait_timeout(LONG));
    assert!(fl.error().is_none());
}

#[test]
fn parent_timeout_ends_the_loop() {
    let parent = CancelToken::new().with_timeout(Duration::from_millis(50));
    let (tx, rx) = frame_channel();
    let fl = FrameLoop::new(&parent, InMemorySink::new(), 100, rx, None);
    tx.send(solid(1)).unwrap();
    assert!(fl.wait_timeout(LONG));
    assert!(fl.error().is_none());
}

#[test]
fn dropping_the_handle_stops_the_loop() {
    let sink = InMemorySink::new();
    let (fl, tx, _) = start(&sink, 100, false);
    tx.send(solid(1)).unwrap();
    let done = fl.done().clone();
    drop(fl);
    assert!(matches!(
        done.recv_timeout(LONG),
        Err(RecvTimeoutError::Disconnected)
    ));
}

#[test]
fn join_returns_the_sink() {
    let sink = InMemorySink::new();
    let (fl, tx, nrx) = start(&sink, 100, true);
    tx.send(solid(9)).unwrap();
    fl.wait_for_next_emission(nrx.as_ref().unwrap()).unwrap();
    fl.stop();
    let returned = fl.join();
    assert_eq!(returned.bytes()[0], 9);
}

#[test]
fn undrained_notifications_never_block_writes() {
    let sink = InMemorySink::new();
    let (fl, tx, nrx) = start(&sink, 200, true);
    tx.send(solid(4)).unwrap();
    std::thread::sleep(Duration::from_millis(200));

    assert!(!fl.is_done());
    assert_eq!(nrx.as_ref().map(Receiver::len), Some(1));
    fl.stop();
    assert!(fl.wait_timeout(LONG));
    assert!(fl.error().is_none());
    // 40 ticks in 200ms; leave room for a slow scheduler
    assert!(sink.writes().len() >= 10, "wrote {}", sink.writes().len());
    assert_eq!(written_values(&sink), vec![4]);
}
