//! Frame protocol tests against the recording headless device.
//!
//! Covers render target resizing, zero-size output, constant store rotation
//! and the staging/copy/draw ordering within a frame.

mod common;

use common::{engine, engine_with};
use weldview::error::DeviceError;
use weldview::gfx::device::{headless::DeviceCommand, GraphicsDevice, HeadlessDevice};
use weldview::gfx::resources::FrameConstants;

// ============================================================================
// Resize
// ============================================================================

#[test]
fn test_resize_same_size_keeps_back_buffer() {
    let mut engine = engine();
    engine.resize(800, 600).unwrap();
    engine.resize(800, 600).unwrap();

    assert_eq!(engine.render_targets().size(), (800, 600));
    assert_eq!(engine.device().back_buffer_allocations(), 1);
    // Views are recreated on every resize, never leaked
    assert_eq!(engine.device().targets_created(), 4);
    assert_eq!(engine.device().live_target_count(), 2);
}

#[test]
fn test_resize_new_size_reallocates_both_targets() {
    let mut engine = engine();
    engine.resize(800, 600).unwrap();
    engine.resize(1024, 768).unwrap();

    let device = engine.device();
    assert_eq!(device.back_buffer_size(), (1024, 768));
    assert_eq!(device.back_buffer_allocations(), 2);

    let (color, depth) = engine.render_targets().targets().unwrap();
    let color = device.target(color).unwrap();
    let depth = device.target(depth).unwrap();
    assert_eq!((color.width, color.height), (1024, 768));
    assert_eq!((depth.width, depth.height), (1024, 768));
}

#[test]
fn test_zero_size_frames_are_no_ops() {
    let mut engine = engine();
    engine.resize(800, 600).unwrap();
    engine.device_mut().clear_commands();

    engine.resize(0, 0).unwrap();
    engine.update(0.016).unwrap();
    engine.draw().unwrap();
    engine.present().unwrap();

    assert!(engine.device().commands().is_empty());
    assert_eq!(engine.frame_resources().frame_index(), 0);
    assert!(!engine.device().is_mapped(engine.frame_resources().staging()));
}

#[test]
fn test_zero_width_frame_is_a_no_op() {
    let mut engine = engine();
    engine.resize(0, 480).unwrap();
    engine.render_frame(0.1).unwrap();

    assert!(engine.device().commands().is_empty());
    assert_eq!(engine.render_targets().aspect_ratio(), 1.0);
}

#[test]
fn test_frame_before_first_resize_is_a_no_op() {
    let mut engine = engine();
    engine.render_frame(0.1).unwrap();
    engine.render_frame(0.1).unwrap();

    assert!(engine.device().commands().is_empty());
    assert_eq!(engine.frame_resources().frame_index(), 0);
}

#[test]
fn test_minimize_and_restore() {
    let mut engine = engine();
    engine.resize(800, 600).unwrap();
    engine.render_frame(0.016).unwrap();

    engine.resize(800, 0).unwrap();
    engine.render_frame(0.016).unwrap();
    engine.resize(800, 600).unwrap();
    engine.render_frame(0.016).unwrap();

    assert_eq!(engine.device().draws().len(), 2);
    assert_eq!(engine.frame_resources().frame_index(), 2);
}

// ============================================================================
// Constant store rotation
// ============================================================================

#[test]
fn test_constant_stores_alternate() {
    let mut engine = engine();
    engine.resize(640, 480).unwrap();

    for _ in 0..6 {
        engine.render_frame(0.016).unwrap();
    }

    let [store0, store1] = *engine.frame_resources().constant_stores();
    assert_eq!(
        engine.device().copy_destinations(),
        vec![store0, store1, store0, store1, store0, store1]
    );
    assert_eq!(engine.frame_resources().frame_index(), 6);
}

#[test]
fn test_next_copy_targets_present_count_mod_two() {
    let mut engine = engine();
    engine.resize(640, 480).unwrap();

    for presents in 0..5u64 {
        let stores = *engine.frame_resources().constant_stores();
        assert_eq!(
            engine.frame_resources().current_store(),
            stores[(presents % 2) as usize]
        );
        engine.render_frame(0.016).unwrap();
    }
}

#[test]
fn test_copy_precedes_draw_reading_same_store() {
    let mut engine = engine();
    engine.resize(640, 480).unwrap();
    engine.render_frame(0.016).unwrap();
    engine.render_frame(0.016).unwrap();

    let commands = engine.device().commands();
    assert_eq!(commands.len(), 6);
    for frame in commands.chunks(3) {
        let (DeviceCommand::Copy { dst, .. }, DeviceCommand::Draw(call)) = (&frame[0], &frame[1])
        else {
            panic!("unexpected command order: {:?}", frame);
        };
        assert_eq!(*dst, call.constants);
        assert!(matches!(frame[2], DeviceCommand::Present { sync_interval: 1 }));
    }
}

#[test]
fn test_store_receives_latest_constants() {
    let mut engine = engine();
    engine.resize(640, 480).unwrap();
    engine.render_frame(0.5).unwrap();

    let store = engine.frame_resources().constant_stores()[0];
    let expected = engine.scene().frame_constants(640.0 / 480.0);
    let bytes = &engine.device().buffer_contents(store)[..FrameConstants::SIZE as usize];
    let uploaded: FrameConstants = bytemuck::pod_read_unaligned(bytes);

    assert_eq!(uploaded, expected);
    assert_eq!(uploaded.object_shininess, 256.0);
}

#[test]
fn test_copy_repeats_without_state_change() {
    let mut engine = engine();
    engine.resize(640, 480).unwrap();

    engine.update(0.0).unwrap();
    engine.draw().unwrap();
    engine.present().unwrap();
    engine.draw().unwrap();
    engine.present().unwrap();

    assert_eq!(engine.device().copy_destinations().len(), 2);
}

// ============================================================================
// Device latency
// ============================================================================

#[test]
fn test_two_stores_cover_single_frame_latency() {
    let mut engine = engine_with(HeadlessDevice::new().with_frame_latency(1));
    engine.resize(640, 480).unwrap();

    for _ in 0..10 {
        engine.render_frame(0.016).unwrap();
    }
}

#[test]
fn test_deeper_latency_exposes_hazard() {
    let mut engine = engine_with(HeadlessDevice::new().with_frame_latency(2));
    engine.resize(640, 480).unwrap();

    engine.render_frame(0.016).unwrap();
    engine.render_frame(0.016).unwrap();
    let err = engine.render_frame(0.016).unwrap_err();

    assert!(matches!(err, DeviceError::Operation { operation: "copy_buffer", .. }));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_allocation_failure_aborts_startup() {
    // Room for the mesh (720 bytes) and one constant store, not the rest
    let device = HeadlessDevice::new().with_memory_budget(1000);
    let result = weldview::gfx::rendering::RenderEngine::new(
        device,
        &common::cube(),
        &weldview::ViewerConfig::default(),
    );
    assert!(matches!(result, Err(DeviceError::Allocation { .. })));
}

#[test]
fn test_present_failure_is_fatal_and_keeps_frame_index() {
    let mut engine = engine();
    engine.resize(640, 480).unwrap();
    engine.device_mut().fail_next_present();

    let err = engine.render_frame(0.016).unwrap_err();
    assert!(matches!(err, DeviceError::Operation { operation: "present", .. }));
    assert_eq!(engine.frame_resources().frame_index(), 0);
}

#[test]
fn test_staging_released_after_failed_write() {
    let mut engine = engine();
    let staging = engine.frame_resources().staging();

    let device = engine.device_mut();
    {
        let mut view = device.map_for_write(staging).unwrap();
        assert!(view.write(250, &[0u8; 16]).is_err());
    }
    assert!(!device.is_mapped(staging));

    // The next frame can map it again
    engine.resize(640, 480).unwrap();
    engine.render_frame(0.016).unwrap();
}
