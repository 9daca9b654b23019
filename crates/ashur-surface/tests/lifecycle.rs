//! End-to-end lifecycle scenarios: mount, first paint, redraw coalescing,
//! draw failure isolation, context loss/restore, reboot, and teardown.

use std::cell::RefCell;
use std::rc::Rc;

use ashur_harness::{
    FakeGpu, GpuProbe, MapShaderRegistry, RecordingVisitor, StubView, TestRoot, VisitorEvent,
};
use ashur_surface::capture::{CaptureRect, EncodedImageFormat};
use ashur_surface::dispatch::{DrawOutcome, SkipReason};
use ashur_surface::registry::SurfaceRegistry;
use ashur_surface::surface::{Surface, SurfaceOptions, SurfacePhase};

fn leak_registry() -> &'static SurfaceRegistry {
    Box::leak(Box::new(SurfaceRegistry::new()))
}

struct Fixture {
    surface: Surface,
    view: Rc<RefCell<StubView>>,
    root: Rc<RefCell<TestRoot>>,
    visitor: Rc<RecordingVisitor>,
    probe: GpuProbe,
}

/// Mounts a 300x200 surface with a root attached and a live context, no
/// preloads. Ready by the time it returns.
fn mount_ready() -> Fixture {
    let view = StubView::new(300, 200);
    let visitor = RecordingVisitor::new();
    let shaders = Rc::new(MapShaderRegistry::with_names(&["fill"]));

    let mut surface = Surface::mount_with_registry(
        view.clone(),
        shaders,
        SurfaceOptions { visitor: Some(visitor.clone()), ..SurfaceOptions::default() },
        leak_registry(),
    );

    let root = TestRoot::new(300, 200);
    surface.attach_root(root.clone()).unwrap();

    let (gpu, probe) = FakeGpu::new();
    surface.context_created(Box::new(gpu));

    Fixture { surface, view, root, visitor, probe }
}

// ── mount and first paint ─────────────────────────────────────────────────

#[test]
fn mount_without_preload_is_ready_synchronously() {
    let f = mount_ready();
    let id = f.surface.id();

    assert_eq!(f.surface.phase(), SurfacePhase::Ready);
    assert!(f.surface.is_loop_running());
    assert!(f.surface.is_context_available());
    assert_eq!(
        f.visitor.events(),
        vec![
            VisitorEvent::Mounted(id),
            VisitorEvent::ContextChanged(id, true),
        ]
    );
}

#[test]
fn first_tick_draws_once_with_start_end_sequence() {
    let mut f = mount_ready();
    let id = f.surface.id();
    f.visitor.take();

    // Multiple requests between ticks coalesce into one pass.
    f.surface.request_redraw();
    f.surface.request_redraw();
    f.surface.on_frame();

    assert_eq!(
        f.visitor.take(),
        vec![VisitorEvent::DrawStart(id), VisitorEvent::DrawEnd(id)]
    );
    assert_eq!(f.root.borrow().draws, 1);
    assert_eq!(f.view.borrow().before_draws, 1);
    assert_eq!(f.view.borrow().after_draws, 1);
    assert_eq!(f.probe.outputs(), vec![(300, 200)]);
}

#[test]
fn tick_without_pending_redraw_skips() {
    let mut f = mount_ready();
    let id = f.surface.id();
    f.surface.on_frame();
    f.visitor.take();

    f.surface.on_frame();

    assert_eq!(
        f.visitor.take(),
        vec![VisitorEvent::DrawSkipped(id, SkipReason::NotRequested)]
    );
    assert_eq!(f.root.borrow().draws, 1);
}

#[test]
fn redraw_requested_during_draw_lands_on_the_next_tick() {
    let mut f = mount_ready();
    f.root.borrow_mut().redraw_once_during_draw = true;

    f.surface.on_frame();
    assert_eq!(f.root.borrow().draws, 1);

    f.surface.on_frame();
    assert_eq!(f.root.borrow().draws, 2);

    f.surface.on_frame();
    assert_eq!(f.root.borrow().draws, 2);
}

#[test]
fn flush_now_bypasses_the_pending_flag_and_the_clock() {
    let mut f = mount_ready();
    f.surface.on_frame();
    assert_eq!(f.root.borrow().draws, 1);

    // Pending flag is spent; a flush still draws.
    assert_eq!(f.surface.flush_now(), DrawOutcome::Drawn);
    assert_eq!(f.root.borrow().draws, 2);
}

#[test]
fn flush_now_without_context_is_a_guarded_skip() {
    let view = StubView::new(64, 64);
    let mut surface = Surface::mount_with_registry(
        view,
        Rc::new(MapShaderRegistry::new()),
        SurfaceOptions::default(),
        leak_registry(),
    );
    surface.attach_root(TestRoot::new(64, 64)).unwrap();

    assert_eq!(
        surface.flush_now(),
        DrawOutcome::Skipped(SkipReason::NoContext)
    );
}

// ── draw failure isolation ────────────────────────────────────────────────

#[test]
fn failed_draw_reports_error_and_loop_continues() {
    let mut f = mount_ready();
    let id = f.surface.id();
    f.visitor.take();
    f.root.borrow_mut().fail_next_draw = Some("lost uniforms".to_string());

    f.surface.on_frame();

    assert_eq!(
        f.visitor.take(),
        vec![
            VisitorEvent::DrawStart(id),
            VisitorEvent::DrawError(id, "lost uniforms".to_string()),
        ]
    );
    // The after-draw hook is skipped on failure.
    assert_eq!(f.view.borrow().after_draws, 0);
    assert!(f.surface.is_loop_running());

    f.surface.request_redraw();
    f.surface.on_frame();
    assert_eq!(
        f.visitor.take(),
        vec![VisitorEvent::DrawStart(id), VisitorEvent::DrawEnd(id)]
    );
    assert_eq!(f.root.borrow().draws, 2);
}

// ── root binding ──────────────────────────────────────────────────────────

#[test]
fn second_root_attachment_is_rejected() {
    let mut f = mount_ready();
    let err = f.surface.attach_root(TestRoot::new(1, 1)).unwrap_err();
    assert!(err.message.contains("already attached"));

    f.surface.detach_root();
    assert_eq!(f.root.borrow().unbound_events, 1);
    f.surface.attach_root(TestRoot::new(1, 1)).unwrap();
    assert!(f.surface.has_root());
}

#[test]
fn detaching_the_root_surfaces_a_no_root_skip() {
    let mut f = mount_ready();
    let id = f.surface.id();
    f.surface.on_frame();
    f.visitor.take();

    f.surface.detach_root();
    f.surface.on_frame();

    assert_eq!(
        f.visitor.take(),
        vec![VisitorEvent::DrawSkipped(id, SkipReason::NoRoot)]
    );
}

// ── context loss and restoration ──────────────────────────────────────────

#[test]
fn context_lost_tears_down_all_epoch_resources() {
    let mut f = mount_ready();
    let id = f.surface.id();
    f.root.borrow_mut().shader_to_request = Some("fill".to_string());
    f.surface.on_frame();
    assert_eq!(f.probe.live_programs(), 1);
    f.visitor.take();

    f.surface.context_lost();

    assert!(!f.surface.is_context_available());
    assert_eq!(f.surface.phase(), SurfacePhase::Lost);
    assert_eq!(f.root.borrow().lost_events, 1);
    assert_eq!(f.probe.live_programs(), 0);
    assert_eq!(f.probe.live_buffers(), 0);
    assert_eq!(f.probe.live_textures(), 0);
    assert_eq!(f.visitor.take(), vec![VisitorEvent::ContextChanged(id, false)]);

    // No ticks are processed while lost.
    f.surface.on_frame();
    assert!(f.visitor.take().is_empty());
}

#[test]
fn restore_rebuilds_the_epoch_and_repopulates_the_cache_lazily() {
    let mut f = mount_ready();
    f.root.borrow_mut().shader_to_request = Some("fill".to_string());
    f.surface.on_frame();
    f.surface.context_lost();

    let (gpu, probe) = FakeGpu::new();
    f.surface.context_restored(Box::new(gpu));

    assert_eq!(f.surface.phase(), SurfacePhase::Ready);
    assert_eq!(f.root.borrow().restored_events, 1);
    // Fresh static buffer, empty shader cache.
    assert_eq!(probe.live_buffers(), 1);
    assert!(probe.compiled().is_empty());

    f.surface.on_frame();
    assert_eq!(probe.compiled(), vec!["fill"]);

    f.surface.request_redraw();
    f.surface.on_frame();
    assert_eq!(probe.compiled(), vec!["fill"]);
}

#[test]
fn force_reboot_destroys_the_epoch_and_asks_the_view_for_a_new_one() {
    let mut f = mount_ready();
    f.surface.force_reboot();

    assert_eq!(f.surface.reboot_count(), 1);
    assert_eq!(f.surface.phase(), SurfacePhase::Detached);
    assert!(!f.surface.is_context_available());
    assert_eq!(f.root.borrow().lost_events, 1);
    assert_eq!(f.probe.live_buffers(), 0);
    assert_eq!(f.view.borrow().reboots, vec![1]);

    let (gpu, _probe) = FakeGpu::new();
    f.surface.context_created(Box::new(gpu));
    assert_eq!(f.surface.phase(), SurfacePhase::Ready);
}

// ── capture ───────────────────────────────────────────────────────────────

#[test]
fn capture_returns_root_pixels() {
    let mut f = mount_ready();
    f.root.borrow_mut().fill = [10, 20, 30, 255];

    let full = f.surface.capture_pixels(None).unwrap();
    assert_eq!((full.width(), full.height()), (300, 200));
    assert_eq!(full.pixel(0, 0), Some([10, 20, 30, 255]));

    let rect = CaptureRect { x: 5, y: 5, width: 16, height: 8 };
    let sub = f.surface.capture_pixels(Some(rect)).unwrap();
    assert_eq!((sub.width(), sub.height()), (16, 8));

    let png = f
        .surface
        .capture_encoded(EncodedImageFormat::Png, 0)
        .unwrap();
    assert!(!png.is_empty());
    let jpeg = f
        .surface
        .capture_encoded(EncodedImageFormat::Jpeg, 85)
        .unwrap();
    assert!(!jpeg.is_empty());
}

#[test]
fn capture_requires_context_and_root() {
    let view = StubView::new(32, 32);
    let mut surface = Surface::mount_with_registry(
        view,
        Rc::new(MapShaderRegistry::new()),
        SurfaceOptions::default(),
        leak_registry(),
    );
    assert!(surface.capture_pixels(None).is_err());

    let (gpu, _probe) = FakeGpu::new();
    surface.context_created(Box::new(gpu));
    assert!(surface.capture_pixels(None).is_err());

    surface.attach_root(TestRoot::new(32, 32)).unwrap();
    assert!(surface.capture_pixels(None).is_ok());
}

// ── registry and unmount ──────────────────────────────────────────────────

#[test]
fn registry_tracks_live_surfaces_as_a_snapshot() {
    let registry = leak_registry();
    let a = Surface::mount_with_registry(
        StubView::new(1, 1),
        Rc::new(MapShaderRegistry::new()),
        SurfaceOptions::default(),
        registry,
    );
    let mut b = Surface::mount_with_registry(
        StubView::new(1, 1),
        Rc::new(MapShaderRegistry::new()),
        SurfaceOptions::default(),
        registry,
    );

    assert_eq!(registry.snapshot(), vec![a.id(), b.id()]);

    let snap = registry.snapshot();
    b.unmount();
    assert_eq!(snap.len(), 2);
    assert_eq!(registry.snapshot(), vec![a.id()]);
}

#[test]
fn unmount_tears_down_and_is_idempotent() {
    let mut f = mount_ready();
    let id = f.surface.id();
    f.visitor.take();

    f.surface.unmount();

    assert_eq!(f.surface.phase(), SurfacePhase::Unmounted);
    assert!(!f.surface.is_context_available());
    assert_eq!(f.probe.live_buffers(), 0);
    assert_eq!(f.root.borrow().unbound_events, 1);
    assert_eq!(
        f.visitor.take(),
        vec![
            VisitorEvent::ContextChanged(id, false),
            VisitorEvent::Unmounted(id),
        ]
    );

    f.surface.unmount();
    assert!(f.visitor.take().is_empty());
}

#[test]
fn dropping_a_surface_unmounts_it() {
    let registry = leak_registry();
    let visitor = RecordingVisitor::new();
    let id;
    {
        let surface = Surface::mount_with_registry(
            StubView::new(1, 1),
            Rc::new(MapShaderRegistry::new()),
            SurfaceOptions { visitor: Some(visitor.clone()), ..SurfaceOptions::default() },
            registry,
        );
        id = surface.id();
        assert!(registry.contains(id));
    }
    assert!(!registry.contains(id));
    assert!(visitor.events().contains(&VisitorEvent::Unmounted(id)));
}
