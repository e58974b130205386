mod common;

use core::time::Duration;

use common::*;
use engine_core::script::Opcode;
use engine_core::{Engine, EngineConfig, EngineState, GameLoop, HostRequest, OpcodeRevision};

fn engine(config: EngineConfig) -> Engine {
    let bytes = bytecode(OpcodeRevision::Current, |asm| {
        asm.begin_function("idle").op(Opcode::End);
    });
    let mut idler = object("idler");
    idler.main = Some("idle".into());
    let stage = manifest("idle", vec![idler], vec![spawn("idler", 0, 0)]);
    Engine::load(config, &bytes, &[stage], Recorders::new().services()).expect("content loads")
}

fn config() -> EngineConfig {
    EngineConfig {
        tick_rate: 60,
        frame_skip: 1,
        max_catch_up_ticks: 8,
        fast_forward_speed: 4,
        ..EngineConfig::default()
    }
}

#[test]
fn elapsed_time_becomes_whole_ticks() {
    let config = config();
    let mut engine = engine(config.clone());
    let mut game_loop = GameLoop::new(&config);

    let report = game_loop.advance(&mut engine, Duration::from_millis(100));
    assert_eq!(report.ticks, 6);
    // frame_skip 1 renders every other tick.
    assert_eq!(report.rendered, 3);
    assert_eq!(report.dropped, 0);
    assert_eq!(engine.frame(), 6);

    let report = game_loop.advance(&mut engine, Duration::from_millis(5));
    assert_eq!(report.ticks, 0);
}

#[test]
fn stalled_host_drops_backlog_beyond_catch_up_cap() {
    let config = config();
    let mut engine = engine(config.clone());
    let mut game_loop = GameLoop::new(&config);

    let report = game_loop.advance(&mut engine, Duration::from_secs(1));
    assert_eq!(report.ticks, 8);
    assert!(report.dropped > 40);

    // The backlog is gone; a normal frame runs normally again.
    let report = game_loop.advance(&mut engine, game_loop.tick_duration());
    assert_eq!(report.ticks, 1);
}

#[test]
fn speed_multiplier_scales_ticks() {
    let config = config();
    let mut engine = engine(config.clone());
    let mut game_loop = GameLoop::new(&config);

    game_loop.set_speed(10);
    assert_eq!(game_loop.speed(), 4);
    game_loop.set_speed(2);
    let report = game_loop.advance(&mut engine, Duration::from_millis(50));
    assert_eq!(report.ticks, 6);
}

#[test]
fn master_pause_only_advances_on_frame_step() {
    let config = config();
    let mut engine = engine(config.clone());
    let mut game_loop = GameLoop::new(&config);

    game_loop.set_master_pause(true);
    assert_eq!(game_loop.advance(&mut engine, Duration::from_secs(1)).ticks, 0);
    game_loop.request_frame_step();
    assert_eq!(game_loop.advance(&mut engine, Duration::from_secs(1)).ticks, 1);
    assert_eq!(game_loop.advance(&mut engine, Duration::from_secs(1)).ticks, 0);
    assert_eq!(engine.frame(), 1);
}

#[test]
fn quit_ends_the_loop() {
    let config = config();
    let mut engine = engine(config.clone());
    let mut game_loop = GameLoop::new(&config);

    engine.request(HostRequest::Quit).unwrap();
    let report = game_loop.run_ticks(&mut engine, 5);
    assert_eq!(report.ticks, 1);
    assert_eq!(engine.state(), EngineState::EndGame);
    assert!(engine.is_finished());
    assert!(engine.render().is_none());
}

#[test]
fn finished_engine_reports_no_dropped_backlog() {
    let config = config();
    let mut engine = engine(config.clone());
    let mut game_loop = GameLoop::new(&config);

    engine.request(HostRequest::Quit).unwrap();
    let report = game_loop.advance(&mut engine, Duration::from_secs(1));
    assert_eq!(report.ticks, 1);
    assert_eq!(report.dropped, 0);
    assert!(engine.is_finished());

    let report = game_loop.advance(&mut engine, Duration::from_secs(1));
    assert_eq!(report.ticks, 0);
    assert_eq!(report.dropped, 0);
}
