use std::{thread, time::Duration};

use event_channel::ChannelError;
use shared::PixelFormat;

use super::*;
use crate::{config::ChannelConfig, event_channel, ControllerEndpoint};

const TICK: Duration = Duration::from_millis(100);

fn session() -> (WindowedSession, ControllerEndpoint) {
    let (frontend, controller) = event_channel(&ChannelConfig::default());
    (WindowedSession::new(frontend, TICK), controller)
}

#[test]
fn button_row_maps_one_to_one_onto_actions() {
    let labels: Vec<_> = WindowButton::ROW.iter().map(|b| b.label()).collect();
    assert_eq!(labels, ["B1", "<", "*", ">", "B2"]);

    let actions: Vec<_> = WindowButton::ROW.iter().map(|b| b.action()).collect();
    assert_eq!(
        actions,
        [
            Action::AuxButtonLeft,
            Action::Left,
            Action::ActionPress,
            Action::Right,
            Action::AuxButtonRight,
        ]
    );
}

#[test]
fn aux_button_left_reaches_controller_within_one_tick() {
    let (session, mut controller) = session();

    let mock = thread::spawn(move || {
        let started = Instant::now();
        let received = controller.receive_timeout(TICK);
        (received, started.elapsed())
    });

    session.press(WindowButton::B1).expect("action queued");

    let (received, elapsed) = mock.join().unwrap();
    assert_eq!(received, Ok(Action::AuxButtonLeft));
    assert!(elapsed <= TICK);
}

#[test]
fn tick_polls_at_most_once_per_period() {
    let (mut session, controller) = session();
    let t0 = Instant::now();

    assert_eq!(session.tick(t0), TickOutcome::Idle);
    controller
        .send(Frame::blank(128, 64, PixelFormat::Mono1))
        .unwrap();
    assert_eq!(session.tick(t0 + TICK / 2), TickOutcome::NotDue);
    assert_eq!(session.until_next_poll(t0 + TICK / 2), TICK / 2);
    assert_eq!(session.tick(t0 + TICK), TickOutcome::NewFrame);
    assert_eq!(session.generation(), 1);
    assert!(session.current_frame().unwrap().has_size(128, 64));
}

#[test]
fn newest_frame_supersedes_undisplayed_ones() {
    let (mut session, controller) = session();

    controller.send(Frame::blank(8, 8, PixelFormat::Mono1)).unwrap();
    controller.send(Frame::blank(16, 8, PixelFormat::Mono1)).unwrap();

    assert_eq!(session.tick(Instant::now()), TickOutcome::NewFrame);
    assert!(session.current_frame().unwrap().has_size(16, 8));
    assert_eq!(session.generation(), 1);
}

#[test]
fn closing_the_window_sends_exit_program_once() {
    let (mut session, mut controller) = session();

    session.request_close();
    session.request_close();

    assert!(session.close_requested());
    assert!(session.is_shutting_down());
    assert_eq!(session.tick(Instant::now()), TickOutcome::Closed);
    assert_eq!(controller.receive(), Ok(Action::ExitProgram));
    assert_eq!(controller.receive(), Err(ChannelError::Empty));
}

#[test]
fn exit_button_action_is_routed_through_shutdown() {
    let (session, mut controller) = session();

    session.on_action(Action::ExitProgram).unwrap();
    session.shutdown_handle().shutdown();

    assert_eq!(controller.receive(), Ok(Action::ExitProgram));
    assert_eq!(controller.receive(), Err(ChannelError::Empty));
}

#[test]
fn vanished_controller_closes_the_session() {
    let (mut session, controller) = session();
    drop(controller);

    assert_eq!(session.tick(Instant::now()), TickOutcome::Closed);
    assert!(session.is_shutting_down());
    assert!(matches!(
        session.press(WindowButton::Center),
        Err(BackendError::PeerClosed)
    ));
}
