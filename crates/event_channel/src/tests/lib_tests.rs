use super::*;
use proptest::prelude::*;
use std::{thread, time::Instant};

#[test]
fn values_arrive_in_send_order_per_direction() {
    let (mut left, mut right) = pair::<u32, &str>(Backlog::Unbounded, Backlog::Unbounded);

    for n in 0..5 {
        left.send(n).expect("send");
    }
    right.send("a").expect("send");
    right.send("b").expect("send");

    let received: Vec<u32> = (0..5).map(|_| right.receive().expect("recv")).collect();
    assert_eq!(received, vec![0, 1, 2, 3, 4]);
    assert_eq!(left.receive().expect("recv"), "a");
    assert_eq!(left.receive().expect("recv"), "b");
}

#[test]
fn poll_does_not_consume() {
    let (left, mut right) = pair::<u8, u8>(Backlog::Unbounded, Backlog::Unbounded);
    left.send(7).expect("send");

    assert_eq!(right.poll(), Ok(true));
    assert_eq!(right.poll(), Ok(true));
    assert_eq!(right.receive(), Ok(7));
    assert_eq!(right.poll(), Ok(false));
}

#[test]
fn poll_on_idle_lane_returns_immediately() {
    let (_left, mut right) = pair::<u8, u8>(Backlog::Unbounded, Backlog::Unbounded);
    let started = Instant::now();
    for _ in 0..1_000 {
        assert_eq!(right.poll(), Ok(false));
    }
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[test]
fn receive_without_pending_value_is_an_error() {
    let (_left, mut right) = pair::<u8, u8>(Backlog::Unbounded, Backlog::Unbounded);
    assert_eq!(right.receive(), Err(ChannelError::Empty));
}

#[test]
fn receive_timeout_waits_then_gives_up() {
    let (_left, mut right) = pair::<u8, u8>(Backlog::Unbounded, Backlog::Unbounded);
    assert_eq!(
        right.receive_timeout(Duration::from_millis(10)),
        Err(ChannelError::Timeout)
    );
}

#[test]
fn closing_is_observed_after_pending_values_drain() {
    let (left, mut right) = pair::<u8, u8>(Backlog::Unbounded, Backlog::Unbounded);
    left.send(1).expect("send");
    left.close();

    assert_eq!(right.poll(), Ok(true));
    assert_eq!(right.receive(), Ok(1));
    assert_eq!(right.poll(), Err(ChannelError::Closed));
    assert_eq!(right.receive(), Err(ChannelError::Closed));
}

#[test]
fn send_to_closed_peer_fails_for_every_backlog() {
    for backlog in [Backlog::Bounded(4), Backlog::Unbounded, Backlog::LatestWins] {
        let (left, right) = pair::<u8, u8>(backlog, Backlog::Unbounded);
        drop(right);
        assert!(left.is_peer_closed(), "{backlog:?}");
        assert_eq!(left.send(1), Err(ChannelError::Closed), "{backlog:?}");
    }
}

#[test]
fn bounded_lane_reports_full_without_blocking() {
    let (left, mut right) = pair::<u8, u8>(Backlog::Bounded(2), Backlog::Unbounded);
    left.send(1).expect("send");
    left.send(2).expect("send");
    assert_eq!(left.send(3), Err(ChannelError::Full));
    assert_eq!(right.receive(), Ok(1));
    left.send(3).expect("room again");
}

#[test]
fn latest_wins_keeps_only_newest_pending_value() {
    let (left, mut right) = pair::<u32, u8>(Backlog::LatestWins, Backlog::Unbounded);
    for n in 0..10 {
        left.send(n).expect("send");
    }
    assert_eq!(right.receive(), Ok(9));
    assert_eq!(right.poll(), Ok(false));
}

#[test]
fn latest_wins_reports_closure_once_sender_is_gone() {
    let (left, mut right) = pair::<u32, u8>(Backlog::LatestWins, Backlog::Unbounded);
    left.send(1).expect("send");
    drop(left);
    assert_eq!(right.receive(), Ok(1));
    assert_eq!(right.poll(), Err(ChannelError::Closed));
}

#[test]
fn drain_latest_counts_superseded_values() {
    let (left, mut right) = pair::<u32, u8>(Backlog::Unbounded, Backlog::Unbounded);
    assert_eq!(right.drain_latest(), Ok(None));
    for n in 0..4 {
        left.send(n).expect("send");
    }
    assert_eq!(right.drain_latest(), Ok(Some((3, 3))));
    left.close();
    assert_eq!(right.drain_latest(), Err(ChannelError::Closed));
}

#[test]
fn drain_latest_hands_out_last_value_before_reporting_closure() {
    let (left, mut right) = pair::<u32, u8>(Backlog::Unbounded, Backlog::Unbounded);
    left.send(5).expect("send");
    drop(left);
    assert_eq!(right.drain_latest(), Ok(Some((5, 0))));
    assert_eq!(right.drain_latest(), Err(ChannelError::Closed));
}

#[test]
fn cloned_outboxes_keep_the_lane_open_until_all_drop() {
    let (left, mut right) = pair::<u8, u8>(Backlog::Unbounded, Backlog::Unbounded);
    let (outbox, _inbox) = left.split();
    let second = outbox.clone();
    drop(outbox);
    second.send(4).expect("send via clone");
    assert_eq!(right.receive(), Ok(4));
    drop(second);
    assert_eq!(right.poll(), Err(ChannelError::Closed));
}

#[test]
fn directions_do_not_interfere_under_concurrent_traffic() {
    let (mut front, mut back) = pair::<&'static str, u32>(Backlog::Unbounded, Backlog::LatestWins);

    let producer = thread::spawn(move || {
        for n in 0..10_000u32 {
            back.send(n).expect("frame send");
        }
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            match back.receive_timeout(Duration::from_millis(50)) {
                Ok(value) => return Some(value),
                Err(ChannelError::Timeout) => continue,
                Err(_) => return None,
            }
        }
        None
    });

    front.send("exit").expect("exit send");
    let observed = producer.join().expect("producer thread");
    assert_eq!(observed, Some("exit"));

    let (latest, _) = front
        .drain_latest()
        .expect("lane open or drained")
        .expect("a frame is pending");
    assert_eq!(latest, 9_999);
}

proptest! {
    #[test]
    fn fifo_lanes_preserve_order(values in proptest::collection::vec(any::<u16>(), 0..64)) {
        let (left, mut right) = pair::<u16, ()>(Backlog::Bounded(64), Backlog::Unbounded);
        for v in &values {
            left.send(*v).expect("send");
        }
        let mut received = Vec::new();
        while right.poll().expect("open") {
            received.push(right.receive().expect("pending"));
        }
        prop_assert_eq!(received, values);
    }
}

#[test]
fn send_timeout_waits_for_room_on_a_full_lane() {
    let (left, mut right) = pair::<u8, u8>(Backlog::Bounded(1), Backlog::Unbounded);
    left.send(1).expect("send");
    assert_eq!(left.send(2), Err(ChannelError::Full));
    assert_eq!(
        left.outbox.send_timeout(2, Duration::from_millis(10)),
        Err(ChannelError::Timeout)
    );

    let reader = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        let first = right.receive_timeout(Duration::from_secs(1));
        let second = right.receive_timeout(Duration::from_secs(1));
        (first, second)
    });
    assert_eq!(left.outbox.send_timeout(2, Duration::from_secs(2)), Ok(()));
    assert_eq!(reader.join().unwrap(), (Ok(1), Ok(2)));
}

#[test]
fn send_timeout_reports_a_closed_peer() {
    let (left, right) = pair::<u8, u8>(Backlog::Bounded(1), Backlog::Unbounded);
    left.send(1).expect("send");
    drop(right);
    assert_eq!(
        left.outbox.send_timeout(2, Duration::from_millis(10)),
        Err(ChannelError::Closed)
    );
}
