//! Shared fixtures for editor integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use image::{Rgba, RgbaImage};
use kanvas_compositor::{decode, encode_png};
use kanvas_core::{EditorConfig, ImageSource, Size};
use kanvas_editor::{
    Collaborator, CollaboratorError, Editor, GeneratedImage, GenerationEvent, ImageToImageRequest,
};

pub const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
pub const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

/// Encoded PNG source of a solid colour.
pub fn png_source(width: u32, height: u32, color: Rgba<u8>) -> ImageSource {
    ImageSource::encoded(encode_png(&RgbaImage::from_pixel(width, height, color)).expect("encode"))
}

/// Decode the pixels behind an encoded source.
pub fn pixels(source: &ImageSource) -> RgbaImage {
    match source {
        ImageSource::Encoded { bytes, .. } => decode(bytes).expect("decode"),
        ImageSource::Uri(uri) => panic!("expected encoded source, got {uri}"),
    }
}

/// How the mock answers image-to-image requests.
#[derive(Debug, Clone)]
pub enum Script {
    /// One progress frame, then the final image.
    Succeed,
    /// One progress frame, then an error.
    Fail,
    /// One progress frame, then the stream ends.
    EndEarly,
    /// Never yields anything.
    Hang,
}

/// In-process collaborator with scripted answers.
pub struct MockCollaborator {
    pub script: Script,
    pub fail_background: bool,
    pub object_present: bool,
    pub text_size: (u32, u32),
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<ImageToImageRequest>>,
}

impl Default for MockCollaborator {
    fn default() -> Self {
        Self {
            script: Script::Succeed,
            fail_background: false,
            object_present: true,
            text_size: (1024, 256),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl MockCollaborator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Collaborator for MockCollaborator {
    async fn remove_background(&self, image: ImageSource) -> Result<ImageSource, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_background {
            return Err(CollaboratorError::Service("model overloaded".to_string()));
        }
        let (w, h) = pixels(&image).dimensions();
        Ok(png_source(w, h, GREEN))
    }

    async fn isolate_object_mask(
        &self,
        image: ImageSource,
        description: &str,
    ) -> Result<ImageSource, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.object_present {
            return Err(CollaboratorError::NotFound(description.to_string()));
        }
        // Left half white, right half black, at half the input resolution.
        let (w, h) = pixels(&image).dimensions();
        let mask = RgbaImage::from_fn((w / 2).max(2), (h / 2).max(1), |x, _| {
            if x < (w / 4).max(1) {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        Ok(ImageSource::encoded(encode_png(&mask).expect("encode")))
    }

    async fn generate_from_text(
        &self,
        _prompt: &str,
        _style: Option<ImageSource>,
    ) -> Result<GeneratedImage, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (w, h) = self.text_size;
        Ok(GeneratedImage {
            source: png_source(w, h, BLUE),
            native_size: Size::new(f64::from(w), f64::from(h)),
        })
    }

    fn generate_from_image(
        &self,
        request: ImageToImageRequest,
    ) -> BoxStream<'static, GenerationEvent> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (w, h) = (request.width, request.height);
        self.requests.lock().expect("lock").push(request);
        let frame = GenerationEvent::Progress(png_source(w, h, GREEN));
        match self.script {
            Script::Succeed => {
                stream::iter(vec![frame, GenerationEvent::Complete(png_source(w, h, BLUE))])
                    .boxed()
            }
            Script::Fail => stream::iter(vec![
                frame,
                GenerationEvent::Error("content policy".to_string()),
            ])
            .boxed(),
            Script::EndEarly => stream::iter(vec![frame]).boxed(),
            Script::Hang => stream::pending().boxed(),
        }
    }
}

/// Editor on an 800x600 screen backed by `mock`.
pub fn editor_with(mock: Arc<MockCollaborator>) -> Editor {
    Editor::new(EditorConfig::default(), Size::new(800.0, 600.0), mock)
}
