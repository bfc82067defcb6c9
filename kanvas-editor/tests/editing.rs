//! Editing Integration Tests
//!
//! Runs the pixel-producing edits end to end through `Editor`:
//! - Crop commit (direct and from input events)
//! - Combine
//! - Import
//! - Background removal and object isolation
//! - Persistence and its in-memory fallback

mod common;

use std::sync::Arc;

use common::{editor_with, pixels, png_source, MockCollaborator, BLUE, GREEN, RED};
use kanvas_compositor::CompositeError;
use kanvas_core::{CanvasError, CropBox, CropCommit, ImageId, InputEvent, PlacedImage, Point};
use kanvas_editor::{CollaboratorError, Editor, EditorError};

fn add(editor: &mut Editor, image: PlacedImage) -> ImageId {
    editor.state_mut().scene.add(image).expect("add")
}

fn assert_rect(image: &PlacedImage, x: f64, y: f64, w: f64, h: f64) {
    let eps = 1e-9;
    assert!((image.x - x).abs() < eps, "x = {}", image.x);
    assert!((image.y - y).abs() < eps, "y = {}", image.y);
    assert!((image.width - w).abs() < eps, "width = {}", image.width);
    assert!((image.height - h).abs() < eps, "height = {}", image.height);
}

// ==========================================================================
// Crop
// ==========================================================================

#[tokio::test]
async fn test_crop_commit_bakes_native_pixels() {
    let mut editor = editor_with(Arc::new(MockCollaborator::default()));
    let original = png_source(200, 200, RED);
    let id = add(
        &mut editor,
        PlacedImage::new(original.clone(), 0.0, 0.0, 100.0, 100.0),
    );

    editor
        .commit_crop(CropCommit {
            id,
            crop_box: CropBox::new(0.25, 0.25, 0.5, 0.5).expect("valid"),
            original: None,
        })
        .await
        .expect("commit");

    let image = editor.scene().get(id).expect("same id");
    assert_rect(image, 25.0, 25.0, 50.0, 50.0);
    assert!(image.crop_box.is_none());
    assert_eq!(pixels(&image.source).dimensions(), (100, 100));

    assert!(editor.state_mut().undo());
    let restored = editor.scene().get(id).expect("restored");
    assert_rect(restored, 0.0, 0.0, 100.0, 100.0);
    assert_eq!(restored.source, original);
    assert!(restored.crop_box.is_none());
}

#[tokio::test]
async fn test_crop_from_input_events() {
    let mut editor = editor_with(Arc::new(MockCollaborator::default()));
    let id = add(
        &mut editor,
        PlacedImage::new(png_source(200, 200, RED), 0.0, 0.0, 100.0, 100.0),
    );

    editor
        .handle_event(&InputEvent::DoubleClick {
            position: Point::new(50.0, 50.0),
        })
        .await
        .expect("enter crop");
    assert!(editor.state().crop.is_active());

    // Drag the top-left handle inward.
    for event in [
        InputEvent::press(0.0, 0.0),
        InputEvent::moved(25.0, 25.0),
        InputEvent::release(25.0, 25.0),
    ] {
        editor.handle_event(&event).await.expect("crop drag");
    }

    // Clicking outside the crop box commits it.
    let intents = editor
        .handle_event(&InputEvent::press(500.0, 500.0))
        .await
        .expect("commit");
    assert!(intents.is_empty());
    assert!(!editor.state().crop.is_active());

    let image = editor.scene().get(id).expect("image");
    assert_rect(image, 25.0, 25.0, 75.0, 75.0);
    assert_eq!(pixels(&image.source).dimensions(), (150, 150));
}

#[tokio::test]
async fn test_failed_crop_restores_crop_box() {
    let mut editor = editor_with(Arc::new(MockCollaborator::default()));
    let broken = kanvas_core::ImageSource::encoded(b"not an image".to_vec());
    let id = add(
        &mut editor,
        PlacedImage::new(broken, 0.0, 0.0, 100.0, 100.0),
    );
    let before = editor.scene().clone();

    let err = editor
        .commit_crop(CropCommit {
            id,
            crop_box: CropBox::new(0.0, 0.0, 0.5, 0.5).expect("valid"),
            original: None,
        })
        .await
        .expect_err("undecodable");
    assert!(matches!(err, EditorError::Composite(ref e) if e.is_decode_failure()));
    assert_eq!(editor.scene(), &before);
}

// ==========================================================================
// Combine
// ==========================================================================

#[tokio::test]
async fn test_combine_replaces_inputs_with_selected_result() {
    let mut editor = editor_with(Arc::new(MockCollaborator::default()));
    let a = add(
        &mut editor,
        PlacedImage::new(png_source(100, 100, RED), 0.0, 0.0, 10.0, 10.0),
    );
    let b = add(
        &mut editor,
        PlacedImage::new(png_source(100, 100, BLUE), 20.0, 0.0, 10.0, 10.0),
    );
    editor.state_mut().scene.select_all();

    let id = editor.combine_selection().await.expect("combine");

    assert_eq!(editor.scene().len(), 1);
    assert!(!editor.scene().contains(a));
    assert!(!editor.scene().contains(b));
    assert_eq!(editor.scene().selected(), &[id]);
    let combined = editor.scene().get(id).expect("combined");
    assert_rect(combined, 0.0, 0.0, 30.0, 10.0);
    // Ratio 10 is capped at 4.
    assert_eq!(pixels(&combined.source).dimensions(), (120, 40));

    assert!(editor.state_mut().undo());
    assert_eq!(editor.scene().len(), 2);
}

#[tokio::test]
async fn test_combine_needs_two_images() {
    let mut editor = editor_with(Arc::new(MockCollaborator::default()));
    let a = add(
        &mut editor,
        PlacedImage::new(png_source(10, 10, RED), 0.0, 0.0, 10.0, 10.0),
    );
    editor.state_mut().scene.select_only(a);

    let err = editor.combine_selection().await.expect_err("one image");
    assert!(matches!(
        err,
        EditorError::Canvas(CanvasError::InvalidSelection(_))
    ));
    assert_eq!(editor.scene().len(), 1);
}

#[tokio::test]
async fn test_combine_refuses_oversized_output() {
    let mut editor = editor_with(Arc::new(MockCollaborator::default()));
    add(
        &mut editor,
        PlacedImage::new(png_source(10, 10, RED), 0.0, 0.0, 10.0, 10.0),
    );
    add(
        &mut editor,
        PlacedImage::new(png_source(10, 10, BLUE), 4.0e9, 4.0e9, 10.0, 10.0),
    );
    editor.state_mut().scene.select_all();
    let before = editor.scene().clone();

    let err = editor.combine_selection().await.expect_err("too large");
    assert!(matches!(
        err,
        EditorError::Composite(CompositeError::Geometry(_))
    ));
    assert_eq!(editor.scene(), &before);
}

// ==========================================================================
// Import
// ==========================================================================

#[tokio::test]
async fn test_import_fits_and_offsets_files() {
    let mut editor = editor_with(Arc::new(MockCollaborator::default()));
    let ids = editor
        .import(
            vec![png_source(600, 300, RED), png_source(100, 100, BLUE)],
            Some(Point::new(100.0, 100.0)),
        )
        .await
        .expect("import");

    assert_eq!(ids.len(), 2);
    assert_rect(
        editor.scene().get(ids[0]).expect("first"),
        -50.0,
        25.0,
        300.0,
        150.0,
    );
    assert_rect(
        editor.scene().get(ids[1]).expect("second"),
        -30.0,
        -30.0,
        300.0,
        300.0,
    );
    assert_eq!(editor.scene().selected(), ids.as_slice());
}

#[tokio::test]
async fn test_import_is_all_or_nothing() {
    let mut editor = editor_with(Arc::new(MockCollaborator::default()));
    let err = editor
        .import(
            vec![
                png_source(10, 10, RED),
                kanvas_core::ImageSource::encoded(b"garbage".to_vec()),
            ],
            None,
        )
        .await
        .expect_err("bad file");
    assert!(matches!(err, EditorError::Composite(_)));
    assert!(editor.scene().is_empty());
}

// ==========================================================================
// Collaborator edits
// ==========================================================================

#[tokio::test]
async fn test_remove_background_replaces_all_in_one_step() {
    let mock = Arc::new(MockCollaborator::default());
    let mut editor = editor_with(Arc::clone(&mock));
    let plain = add(
        &mut editor,
        PlacedImage::new(png_source(40, 40, RED), 0.0, 0.0, 40.0, 40.0),
    );
    let cropped = add(
        &mut editor,
        PlacedImage::new(png_source(100, 100, BLUE), 100.0, 0.0, 100.0, 100.0)
            .with_crop(CropBox::new(0.5, 0.0, 0.5, 1.0).expect("valid")),
    );
    editor.state_mut().scene.select_all();

    editor.remove_background().await.expect("remove background");
    assert_eq!(mock.calls(), 2);

    let plain_img = editor.scene().get(plain).expect("plain");
    assert_eq!(pixels(&plain_img.source).get_pixel(0, 0), &GREEN);

    let cropped_img = editor.scene().get(cropped).expect("cropped");
    assert!(cropped_img.crop_box.is_none());
    assert_rect(cropped_img, 150.0, 0.0, 50.0, 100.0);
    assert_eq!(pixels(&cropped_img.source).dimensions(), (50, 100));

    assert!(editor.state_mut().undo());
    let undone = editor.scene().get(cropped).expect("cropped");
    assert!(undone.crop_box.is_some());
    assert_eq!(
        pixels(&editor.scene().get(plain).expect("plain").source).get_pixel(0, 0),
        &RED
    );
}

#[tokio::test]
async fn test_remove_background_failure_changes_nothing() {
    let mock = Arc::new(MockCollaborator {
        fail_background: true,
        ..MockCollaborator::default()
    });
    let mut editor = editor_with(mock);
    add(
        &mut editor,
        PlacedImage::new(png_source(10, 10, RED), 0.0, 0.0, 10.0, 10.0),
    );
    editor.state_mut().scene.select_all();
    let before = editor.scene().clone();
    let history = editor.state().history.len();

    let err = editor.remove_background().await.expect_err("service down");
    assert!(matches!(
        err,
        EditorError::Collaborator(CollaboratorError::Service(_))
    ));
    assert_eq!(editor.scene(), &before);
    assert_eq!(editor.state().history.len(), history);
}

#[tokio::test]
async fn test_isolate_replaces_in_place() {
    let mut editor = editor_with(Arc::new(MockCollaborator::default()));
    let target = add(
        &mut editor,
        PlacedImage::new(png_source(40, 20, RED), 0.0, 0.0, 40.0, 20.0),
    );
    let other = add(
        &mut editor,
        PlacedImage::new(png_source(10, 10, BLUE), 50.0, 0.0, 10.0, 10.0),
    );
    editor.state_mut().scene.select_only(target);

    let id = editor.isolate_object("the left half").await.expect("isolate");

    assert_ne!(id, target);
    assert!(!editor.scene().contains(target));
    assert_eq!(editor.scene().index_of(id), Some(0));
    assert_eq!(editor.scene().index_of(other), Some(1));
    assert_eq!(editor.scene().selected(), &[id]);

    let cut = pixels(&editor.scene().get(id).expect("isolated").source);
    assert_eq!(cut.dimensions(), (40, 20));
    assert_eq!(cut.get_pixel(5, 10)[3], 255);
    assert_eq!(cut.get_pixel(35, 10)[3], 0);
    assert_eq!(cut.get_pixel(35, 10)[0], 255);
}

#[tokio::test]
async fn test_isolate_not_found_leaves_scene_untouched() {
    let mock = Arc::new(MockCollaborator {
        object_present: false,
        ..MockCollaborator::default()
    });
    let mut editor = editor_with(mock);
    let id = add(
        &mut editor,
        PlacedImage::new(png_source(10, 10, RED), 0.0, 0.0, 10.0, 10.0),
    );
    editor.state_mut().scene.select_only(id);
    let before = editor.scene().clone();
    let history = editor.state().history.len();

    let err = editor.isolate_object("a unicorn").await.expect_err("absent");
    assert!(matches!(
        err,
        EditorError::Collaborator(CollaboratorError::NotFound(ref what)) if what == "a unicorn"
    ));
    assert_eq!(editor.scene(), &before);
    assert_eq!(editor.state().history.len(), history);
}

#[tokio::test]
async fn test_isolate_needs_exactly_one_image() {
    let mut editor = editor_with(Arc::new(MockCollaborator::default()));
    let err = editor.isolate_object("anything").await.expect_err("none");
    assert!(matches!(
        err,
        EditorError::Canvas(CanvasError::InvalidSelection(_))
    ));
}

// ==========================================================================
// Persistence
// ==========================================================================

#[tokio::test]
async fn test_session_round_trips_through_store() {
    let dir = tempfile::tempdir().expect("tempdir");

    let mut editor = editor_with(Arc::new(MockCollaborator::default()));
    assert!(!editor.attach_store(dir.path()));
    assert!(!editor.is_in_memory_only());
    editor
        .import(vec![png_source(20, 10, RED)], None)
        .await
        .expect("import");
    assert!(editor.save());

    let mut reopened = editor_with(Arc::new(MockCollaborator::default()));
    assert!(reopened.attach_store(dir.path()));
    assert_eq!(reopened.scene().len(), 1);
    let image = &reopened.scene().images()[0];
    assert_eq!(pixels(&image.source).dimensions(), (20, 10));
}

#[tokio::test]
async fn test_unusable_store_falls_back_to_memory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let occupied = dir.path().join("occupied");
    std::fs::write(&occupied, b"not a directory").expect("write");

    let mut editor = editor_with(Arc::new(MockCollaborator::default()));
    assert!(!editor.attach_store(&occupied));
    assert!(editor.is_in_memory_only());

    // Editing keeps working; saving is a no-op.
    editor
        .import(vec![png_source(10, 10, RED)], None)
        .await
        .expect("import");
    assert!(!editor.save());
    assert_eq!(editor.scene().len(), 1);
}

#[tokio::test]
async fn test_save_failure_switches_to_memory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = dir.path().join("canvas");

    let mut editor = editor_with(Arc::new(MockCollaborator::default()));
    editor.attach_store(&data);
    std::fs::remove_dir_all(&data).expect("remove");

    assert!(!editor.save());
    assert!(editor.is_in_memory_only());
}
