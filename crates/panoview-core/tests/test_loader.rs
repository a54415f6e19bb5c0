mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use panoview_core::config::ViewerConfig;
use panoview_core::context::GraphicsContext;
use panoview_core::loader::{
    ImageCrateDecoder, ImageLoader, LoadEvent, LoadEventKind, LoadStage, LoaderOptions,
};
use panoview_core::raster::{DecodedImage, SourceFormat};
use panoview_core::texture::cpu::CpuBackend;

use common::{collect_until_terminal, cpu_context, gray_ramp, png_bytes, FnDecoder, GRAY8};

const LIMIT: Duration = Duration::from_secs(30);

fn small_image_decoder() -> FnDecoder {
    FnDecoder::new(|_| Ok(gray_ramp(64, 32)))
}

fn options(tile_size: u32) -> LoaderOptions {
    LoaderOptions {
        tile_size,
        poll_interval: Duration::from_millis(1),
        waker: None,
    }
}

fn terminals(events: &[LoadEvent]) -> Vec<&LoadEvent> {
    events.iter().filter(|e| e.is_terminal()).collect()
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[test]
fn test_load_reports_size_progress_and_ready() {
    let context = cpu_context();
    let loader = ImageLoader::spawn(&context, Arc::new(small_image_decoder()), options(8192)).unwrap();
    let token = loader.open_file("synthetic.raw");
    let events = collect_until_terminal(&loader, LIMIT);

    assert!(events.iter().all(|e| e.request == token));
    let size = events.iter().find_map(|e| match e.kind {
        LoadEventKind::SizeKnown { width, height, is_360 } => Some((width, height, is_360)),
        _ => None,
    });
    assert_eq!(size, Some((64, 32, true)));

    let percents: Vec<u8> = events
        .iter()
        .filter_map(|e| match e.kind {
            LoadEventKind::Progress { percent, .. } => Some(percent),
            _ => None,
        })
        .collect();
    assert!(!percents.is_empty());
    assert!(percents.windows(2).all(|w| w[0] < w[1]), "got: {percents:?}");
    assert_eq!(percents.last(), Some(&100));

    match &events.last().unwrap().kind {
        LoadEventKind::Ready(loaded) => {
            assert_eq!(loaded.metadata.source_name, "synthetic.raw");
            assert!(loaded.metadata.is_360);
            assert!(loaded.texture.all_ready());
        }
        other => panic!("expected Ready, got {other:?}"),
    }
    loader.shutdown();
}

#[test]
fn test_big_image_tiles_and_single_ready() {
    let backend = CpuBackend::with_max_dimension(8192).retain_pixels(false);
    let context = GraphicsContext::primary(Arc::new(backend));
    let decoder = FnDecoder::new(|_| DecodedImage::new(20000, 15000, GRAY8, vec![0; 20000 * 15000]));
    let loader = ImageLoader::spawn(&context, Arc::new(decoder), options(8192)).unwrap();
    loader.open_file("big.tif");
    let events = collect_until_terminal(&loader, Duration::from_secs(120));

    let done = terminals(&events);
    assert_eq!(done.len(), 1);
    match &done[0].kind {
        LoadEventKind::Ready(loaded) => {
            assert_eq!(loaded.texture.len(), 6);
            assert_eq!(loaded.texture.grid(), (3, 2));
            assert_eq!(loaded.texture.ready_count(), 6);
            assert!(!loaded.metadata.is_360);
        }
        other => panic!("expected Ready, got {other:?}"),
    }
    // Nothing else arrives for this request.
    assert!(loader.next_event_timeout(Duration::from_millis(50)).is_none());
}

#[test]
fn test_slow_fences_are_polled_until_ready() {
    let context = GraphicsContext::primary(Arc::new(CpuBackend::with_max_dimension(16).fence_latency(3)));
    let decoder = FnDecoder::new(|_| Ok(gray_ramp(40, 20)));
    let loader = ImageLoader::spawn(&context, Arc::new(decoder), options(16)).unwrap();
    loader.open_file("fenced");
    let events = collect_until_terminal(&loader, LIMIT);

    let uploading = events
        .iter()
        .filter(|e| matches!(e.kind, LoadEventKind::Progress { stage: LoadStage::Uploading, .. }))
        .count();
    assert!(uploading >= 1);
    match &events.last().unwrap().kind {
        LoadEventKind::Ready(loaded) => assert!(loaded.texture.len() > 1 && loaded.texture.all_ready()),
        other => panic!("expected Ready, got {other:?}"),
    }
}

#[test]
fn test_png_bytes_through_image_decoder() {
    let context = cpu_context();
    let loader = ImageLoader::spawn(&context, Arc::new(ImageCrateDecoder), options(8192)).unwrap();
    loader.open_bytes("pano.png", png_bytes(64, 32));
    let events = collect_until_terminal(&loader, LIMIT);

    match &events.last().unwrap().kind {
        LoadEventKind::Ready(loaded) => {
            assert_eq!(loaded.metadata.format, SourceFormat::Png);
            assert!(loaded.metadata.is_360);
            assert_eq!(loaded.texture.len(), 1);
        }
        other => panic!("expected Ready, got {other:?}"),
    }
}

#[test]
fn test_waker_called_per_event() {
    let context = cpu_context();
    let wakes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&wakes);
    let opts = options(8192).with_waker(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let loader = ImageLoader::spawn(&context, Arc::new(small_image_decoder()), opts).unwrap();
    loader.open_file("wake");
    let events = collect_until_terminal(&loader, LIMIT);
    assert!(wakes.load(Ordering::SeqCst) >= events.len());
}

#[test]
fn test_loader_options_from_config() {
    let mut config = ViewerConfig::default();
    config.textures.tile_size = 4096;
    config.loader.ready_poll_interval_ms = 0;
    let opts = LoaderOptions::from_config(&config);
    assert_eq!(opts.tile_size, 4096);
    assert_eq!(opts.poll_interval, Duration::from_millis(1));
}

// ---------------------------------------------------------------------------
// Supersession and cancellation
// ---------------------------------------------------------------------------

#[test]
fn test_newer_request_supersedes_older() {
    let context = cpu_context();
    let decoder = small_image_decoder().slow(Duration::from_millis(300));
    let loader = ImageLoader::spawn(&context, Arc::new(decoder), options(8192)).unwrap();

    let first = loader.open_file("slow-a");
    let second = loader.open_file("fast-b");
    assert!(!loader.is_current(first));
    assert!(loader.is_current(second));

    let events = collect_until_terminal(&loader, LIMIT);
    assert!(events.iter().all(|e| e.request == second));
    let done = terminals(&events);
    assert_eq!(done.len(), 1);
    match &done[0].kind {
        LoadEventKind::Ready(loaded) => assert_eq!(loaded.metadata.source_name, "fast-b"),
        other => panic!("expected Ready, got {other:?}"),
    }

    // The abandoned request never reports back.
    assert!(loader.next_event_timeout(Duration::from_millis(500)).is_none());
}

#[test]
fn test_cancel_silences_in_flight_request() {
    let context = cpu_context();
    let decoder = small_image_decoder().slow(Duration::from_millis(200));
    let loader = ImageLoader::spawn(&context, Arc::new(decoder), options(8192)).unwrap();

    let token = loader.open_file("slow-cancelled");
    loader.cancel();
    assert!(!loader.is_current(token));
    assert!(loader.next_event_timeout(Duration::from_millis(600)).is_none());
    assert!(loader.try_next_event().is_none());

    // The loader keeps serving new requests after a cancel.
    let token = loader.open_file("after-cancel");
    let events = collect_until_terminal(&loader, LIMIT);
    assert!(events.iter().all(|e| e.request == token));
    assert!(matches!(events.last().unwrap().kind, LoadEventKind::Ready(_)));
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn test_undecodable_bytes_fail_with_name() {
    let context = cpu_context();
    let loader = ImageLoader::spawn(&context, Arc::new(ImageCrateDecoder), options(8192)).unwrap();
    loader.open_bytes("broken.jpg", b"\xff\xd8 truncated".to_vec());
    let events = collect_until_terminal(&loader, LIMIT);

    let done = terminals(&events);
    assert_eq!(done.len(), 1);
    match &done[0].kind {
        LoadEventKind::Failed { reason } => assert!(reason.contains("broken.jpg"), "got: {reason}"),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[test]
fn test_missing_file_fails() {
    let context = cpu_context();
    let loader = ImageLoader::spawn(&context, Arc::new(ImageCrateDecoder), options(8192)).unwrap();
    loader.open_file("/nonexistent/dir/image.png");
    let events = collect_until_terminal(&loader, LIMIT);
    match &events.last().unwrap().kind {
        LoadEventKind::Failed { reason } => assert!(reason.contains("not readable"), "got: {reason}"),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[test]
fn test_tile_size_above_limit_fails() {
    let context = GraphicsContext::primary(Arc::new(CpuBackend::with_max_dimension(16)));
    let loader = ImageLoader::spawn(&context, Arc::new(small_image_decoder()), options(32)).unwrap();
    loader.open_file("too-big-tiles");
    let events = collect_until_terminal(&loader, LIMIT);
    match &events.last().unwrap().kind {
        LoadEventKind::Failed { reason } => assert!(reason.contains("Tile size 32"), "got: {reason}"),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[test]
fn test_shutdown_when_idle() {
    let context = cpu_context();
    let loader = ImageLoader::spawn(&context, Arc::new(small_image_decoder()), options(8192)).unwrap();
    assert!(loader.is_running());
    loader.shutdown();
}
