//! The async editor.
//!
//! [`Editor`] wraps the synchronous [`CanvasState`] and runs the operations
//! that need pixels or an external service. Every such operation follows
//! the same shape:
//!
//! 1. Read what it needs from the scene.
//! 2. Await decoding, compositing and collaborator calls.
//! 3. Only when all of that succeeded, push history and mutate.
//!
//! A failure in step 2 returns an error and leaves the scene untouched.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::try_join_all;
use image::RgbaImage;
use kanvas_compositor::{
    apply_mask, bake, combine, extract_crop, native_size, to_source, CacheConfig, ImageCache,
    Layer, SourceLoader,
};
use kanvas_core::{
    CanvasError, CanvasState, CanvasStore, CropCommit, EditorConfig, ImageId, ImagePatch,
    ImageSource, InputEvent, Intent, PlacedImage, Point, Rect, Scene, Size,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::collaborator::{Collaborator, CollaboratorError, GenerationEvent, ImageToImageRequest};
use crate::error::EditorResult;
use crate::generation::{GenerationConfig, GenerationDispatcher};

/// Shared resources the editor's operations work with.
pub struct EditorContext {
    /// Decoded-image cache.
    pub cache: ImageCache,
    /// Source fetching and decoding.
    pub loader: SourceLoader,
    /// Running generations.
    pub generation: GenerationDispatcher,
    collaborator: Arc<dyn Collaborator>,
    store: Option<CanvasStore>,
    in_memory_only: bool,
}

impl std::fmt::Debug for EditorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorContext")
            .field("cache", &self.cache)
            .field("generation", &self.generation)
            .field("store", &self.store)
            .field("in_memory_only", &self.in_memory_only)
            .finish_non_exhaustive()
    }
}

/// The canvas editor: the single mutator of the scene.
#[derive(Debug)]
pub struct Editor {
    state: CanvasState,
    ctx: EditorContext,
}

impl Editor {
    /// Create an editor with an empty canvas.
    #[must_use]
    pub fn new(config: EditorConfig, screen: Size, collaborator: Arc<dyn Collaborator>) -> Self {
        Self {
            state: CanvasState::new(config, screen),
            ctx: EditorContext {
                cache: ImageCache::new(),
                loader: SourceLoader::new(),
                generation: GenerationDispatcher::default(),
                collaborator,
                store: None,
                in_memory_only: true,
            },
        }
    }

    /// Use a custom loader.
    #[must_use]
    pub fn with_loader(mut self, loader: SourceLoader) -> Self {
        self.ctx.loader = loader;
        self
    }

    /// Use a custom cache configuration.
    #[must_use]
    pub fn with_cache_config(mut self, config: CacheConfig) -> Self {
        self.ctx.cache = ImageCache::with_config(config);
        self
    }

    /// Use a custom generation configuration.
    #[must_use]
    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.ctx.generation = GenerationDispatcher::new(config);
        self
    }

    /// The synchronous canvas state.
    #[must_use]
    pub fn state(&self) -> &CanvasState {
        &self.state
    }

    /// Mutable access to the canvas state for synchronous edits.
    pub fn state_mut(&mut self) -> &mut CanvasState {
        &mut self.state
    }

    /// The scene.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.state.scene
    }

    /// The shared resources.
    #[must_use]
    pub fn context(&self) -> &EditorContext {
        &self.ctx
    }

    // ---------------------------------------------------------------------
    // Input
    // ---------------------------------------------------------------------

    /// Feed an input event through the state machine and run any crop
    /// commit it produces.
    ///
    /// Returns the intents the host must fulfil itself (generation needs a
    /// prompt).
    ///
    /// # Errors
    ///
    /// Returns an error if a crop commit fails; the crop is then reverted.
    pub async fn handle_event(&mut self, event: &InputEvent) -> EditorResult<Vec<Intent>> {
        let mut pending = Vec::new();
        for intent in self.state.process_event(event) {
            match intent {
                Intent::CommitCrop(commit) => self.commit_crop(commit).await?,
                Intent::Generate => pending.push(intent),
            }
        }
        Ok(pending)
    }

    // ---------------------------------------------------------------------
    // Pixel loading
    // ---------------------------------------------------------------------

    async fn load(&mut self, sources: &[ImageSource]) -> EditorResult<Vec<Arc<RgbaImage>>> {
        Ok(self.ctx.loader.load_cached(&mut self.ctx.cache, sources).await?)
    }

    /// Encode the visible (cropped) pixels of each image as new sources.
    async fn baked_sources(&mut self, images: &[PlacedImage]) -> EditorResult<Vec<ImageSource>> {
        let sources: Vec<ImageSource> = images.iter().map(|img| img.source.clone()).collect();
        let pixels = self.load(&sources).await?;
        images
            .iter()
            .zip(&pixels)
            .map(|(img, px)| Ok(to_source(&bake(px, img.crop_box.as_ref())?)?))
            .collect()
    }

    async fn call<T>(
        &self,
        request: impl std::future::Future<Output = Result<T, CollaboratorError>>,
    ) -> Result<T, CollaboratorError> {
        tokio::time::timeout(self.ctx.generation.config().timeout, request)
            .await
            .map_err(|_| CollaboratorError::Timeout)?
    }

    fn invalidate(&mut self, source: &ImageSource) {
        self.ctx.cache.invalidate(source);
    }

    // ---------------------------------------------------------------------
    // Crop
    // ---------------------------------------------------------------------

    /// Bake a committed crop into a new source.
    ///
    /// The image keeps its id and takes the geometry of its visible region.
    /// A commit for an image that no longer exists is ignored.
    ///
    /// # Errors
    ///
    /// Returns a decode or geometry error; the image's crop box is put back
    /// to what it was before the session.
    pub async fn commit_crop(&mut self, commit: CropCommit) -> EditorResult<()> {
        let Some(image) = self.state.scene.get(commit.id).cloned() else {
            debug!(id = %commit.id, "crop commit for missing image ignored");
            return Ok(());
        };

        let baked = match self.bake_crop(&image, &commit).await {
            Ok(source) => source,
            Err(e) => {
                warn!(id = %commit.id, "crop failed: {e}");
                self.state.scene.update(
                    commit.id,
                    &ImagePatch {
                        crop_box: Some(commit.original),
                        ..ImagePatch::default()
                    },
                );
                return Err(e);
            }
        };

        let mut before = self.state.scene.clone();
        before.update(
            commit.id,
            &ImagePatch {
                crop_box: Some(commit.original),
                ..ImagePatch::default()
            },
        );
        self.state.history.push(&before);

        let visible = image.clone().with_crop(commit.crop_box).visible_rect();
        self.invalidate(&image.source);
        self.state
            .scene
            .update(commit.id, &Self::baked_patch(baked, visible));
        info!(
            id = %commit.id,
            width = visible.width,
            height = visible.height,
            "crop committed"
        );
        Ok(())
    }

    async fn bake_crop(
        &mut self,
        image: &PlacedImage,
        commit: &CropCommit,
    ) -> EditorResult<ImageSource> {
        let pixels = self.load(std::slice::from_ref(&image.source)).await?;
        let cropped = extract_crop(&pixels[0], &commit.crop_box)?;
        Ok(to_source(&cropped)?)
    }

    /// Patch installing baked pixels at `rect` with no crop.
    fn baked_patch(source: ImageSource, rect: Rect) -> ImagePatch {
        ImagePatch {
            source: Some(source),
            crop_box: Some(None),
            ..ImagePatch::rect(rect)
        }
    }

    // ---------------------------------------------------------------------
    // Combine
    // ---------------------------------------------------------------------

    /// Flatten the selected images into one, in their stacking order.
    ///
    /// The result takes the stacking position of the top-most input and
    /// becomes the selection.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidSelection`] with fewer than two images
    /// selected, or a decode or geometry error.
    pub async fn combine_selection(&mut self) -> EditorResult<ImageId> {
        let inputs: Vec<PlacedImage> = self.state.scene.selected_in_z_order().cloned().collect();
        if inputs.len() < 2 {
            return Err(CanvasError::InvalidSelection(format!(
                "combining needs at least two images, {} selected",
                inputs.len()
            ))
            .into());
        }

        let sources: Vec<ImageSource> = inputs.iter().map(|img| img.source.clone()).collect();
        let pixels = self.load(&sources).await?;
        let layers: Vec<Layer<'_>> = inputs
            .iter()
            .zip(&pixels)
            .map(|(img, px)| Layer::new(img, px))
            .collect();
        let combined = combine(
            &layers,
            self.state.config.combine_scale_cap,
            self.state.config.combine_max_pixels,
        )?;
        let source = to_source(&combined.image)?;

        let bounds = combined.bounds;
        let result = PlacedImage::new(source, bounds.x, bounds.y, bounds.width, bounds.height);
        let id = result.id;

        self.state.checkpoint();
        if let Some((top, rest)) = inputs.split_last() {
            let rest: Vec<ImageId> = rest.iter().map(|img| img.id).collect();
            self.state.scene.replace(top.id, result);
            self.state.scene.remove(&rest);
        }
        if self
            .state
            .crop
            .cropping_id()
            .is_some_and(|cropping| inputs.iter().any(|img| img.id == cropping))
        {
            self.state.crop.abandon();
        }
        self.state.scene.select_only(id);

        info!(
            %id,
            inputs = inputs.len(),
            width = combined.image.width(),
            height = combined.image.height(),
            scale = combined.scale,
            "combined images"
        );
        Ok(id)
    }

    // ---------------------------------------------------------------------
    // Import
    // ---------------------------------------------------------------------

    /// Add dropped or uploaded images.
    ///
    /// Each file is fitted into the import box and centred on the drop point
    /// (a screen position) or the viewport centre; the n-th file is offset
    /// diagonally by n steps. The new images become the selection.
    ///
    /// # Errors
    ///
    /// Returns a decode error if any file cannot be read; nothing is added.
    pub async fn import(
        &mut self,
        files: Vec<ImageSource>,
        drop_point: Option<Point>,
    ) -> EditorResult<Vec<ImageId>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }
        let pixels = self.load(&files).await?;

        let viewport = self.state.viewport;
        let center = drop_point.map_or_else(
            || viewport.canvas_center(self.state.screen),
            |p| viewport.to_canvas(p),
        );
        let step = self.state.config.duplicate_offset;
        let max = self.state.config.import_max_size;

        self.state.checkpoint();
        let mut ids = Vec::with_capacity(files.len());
        for (n, (source, px)) in files.into_iter().zip(&pixels).enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let offset = step * n as f64;
            let size = native_size(px).fit_within(max);
            let image = PlacedImage::new(
                source,
                center.x - size.width / 2.0 + offset,
                center.y - size.height / 2.0 + offset,
                size.width,
                size.height,
            );
            ids.push(self.state.scene.add(image)?);
        }
        self.state.scene.set_selection(ids.iter().copied());
        info!(count = ids.len(), "imported images");
        Ok(ids)
    }

    // ---------------------------------------------------------------------
    // Generation
    // ---------------------------------------------------------------------

    /// Generate from the selection if there is one, otherwise from text.
    ///
    /// # Errors
    ///
    /// See [`Editor::generate_from_text`] and [`Editor::generate_from_selection`].
    pub async fn generate(
        &mut self,
        prompt: &str,
        style: Option<ImageSource>,
    ) -> EditorResult<Vec<ImageId>> {
        if self.state.scene.selected().is_empty() {
            Ok(vec![self.generate_from_text(prompt, style).await?])
        } else {
            self.generate_from_selection(prompt, style).await
        }
    }

    /// Generate an image from text and place it in the middle of the view.
    ///
    /// # Errors
    ///
    /// Returns the collaborator failure; nothing is added.
    pub async fn generate_from_text(
        &mut self,
        prompt: &str,
        style: Option<ImageSource>,
    ) -> EditorResult<ImageId> {
        let collaborator = Arc::clone(&self.ctx.collaborator);
        let generated = self
            .call(collaborator.generate_from_text(prompt, style))
            .await
            .inspect_err(|e| warn!("text generation failed: {e}"))?;

        let max = self.state.config.generated_max_size;
        let width = generated.native_size.width.min(max);
        let height = generated.native_size.height.min(max);
        let center = self.state.viewport.canvas_center(self.state.screen);
        let image = PlacedImage::new(
            generated.source,
            center.x - width / 2.0,
            center.y - height / 2.0,
            width,
            height,
        );

        self.state.checkpoint();
        let id = self.state.scene.add(image)?;
        self.state.scene.select_only(id);
        info!(%id, width, height, "generated image from text");
        Ok(id)
    }

    /// Start an image-to-image generation for every selected image.
    ///
    /// Each input gets a placeholder to its right. Results stream into the
    /// placeholders as [`Editor::apply_generation_event`] is fed.
    ///
    /// # Errors
    ///
    /// Returns a decode error if an input cannot be read; nothing is added.
    pub async fn generate_from_selection(
        &mut self,
        prompt: &str,
        style: Option<ImageSource>,
    ) -> EditorResult<Vec<ImageId>> {
        let inputs: Vec<PlacedImage> = self.state.scene.selected_in_z_order().cloned().collect();
        if inputs.is_empty() {
            return Err(CanvasError::InvalidSelection("nothing selected".to_string()).into());
        }
        let baked = self.baked_sources(&inputs).await?;

        let base = self.state.config.generation_base_size;
        let gap = self.state.config.generation_gap;
        let mut ids = Vec::with_capacity(inputs.len());
        for (input, source) in inputs.iter().zip(baked) {
            let visible = input.visible_rect();
            let (width, height) = output_size(visible, base);

            let mut placeholder = PlacedImage::new(
                ImageSource::placeholder(),
                visible.right() + gap,
                visible.y,
                visible.width,
                visible.height,
            );
            placeholder.is_generated = true;
            placeholder.parent_group_id = Some(Uuid::new_v4());
            let id = self.state.scene.add(placeholder)?;

            let stream = self.ctx.collaborator.generate_from_image(ImageToImageRequest {
                image: source,
                prompt: prompt.to_string(),
                style: style.clone(),
                width,
                height,
            });
            self.ctx.generation.spawn(id, stream);
            info!(%id, source = %input.id, width, height, "generation started");
            ids.push(id);
        }
        Ok(ids)
    }

    /// Apply one generation event to the placeholder it belongs to.
    ///
    /// Events for images that no longer exist change nothing. Returns
    /// whether the scene changed.
    pub fn apply_generation_event(&mut self, id: ImageId, event: GenerationEvent) -> bool {
        if event.is_terminal() {
            self.ctx.generation.finish(id);
        }
        let Some(old) = self.state.scene.get(id).map(|img| img.source.clone()) else {
            debug!(%id, "generation event for missing image ignored");
            return false;
        };
        match event {
            GenerationEvent::Progress(source) => {
                self.invalidate(&old);
                self.state
                    .scene
                    .update(id, &ImagePatch::replace_source(source))
            }
            GenerationEvent::Complete(source) => {
                self.invalidate(&old);
                info!(%id, "generation completed");
                self.state.scene.update(
                    id,
                    &ImagePatch {
                        is_generated: Some(false),
                        ..ImagePatch::replace_source(source)
                    },
                )
            }
            GenerationEvent::Error(reason) => {
                warn!(%id, "generation failed: {reason}");
                !self.state.scene.remove(&[id]).is_empty()
            }
        }
    }

    /// Apply every generation event that is already waiting.
    pub fn poll_generations(&mut self) -> usize {
        let mut applied = 0;
        while let Some((id, event)) = self.ctx.generation.try_recv() {
            self.apply_generation_event(id, event);
            applied += 1;
        }
        applied
    }

    /// Wait for and apply the next generation event. Returns the placeholder
    /// id it belonged to, or `None` if nothing is running.
    pub async fn next_generation_event(&mut self) -> Option<ImageId> {
        if self.ctx.generation.in_flight_count() == 0 {
            return None;
        }
        let (id, event) = self.ctx.generation.recv().await?;
        self.apply_generation_event(id, event);
        Some(id)
    }

    /// Apply events until no generation is running.
    pub async fn wait_for_generations(&mut self) {
        while self.next_generation_event().await.is_some() {}
    }

    /// Stop a generation and remove its placeholder.
    pub fn cancel_generation(&mut self, id: ImageId) -> bool {
        let cancelled = self.ctx.generation.cancel(id);
        if cancelled {
            self.state.scene.remove(&[id]);
        }
        cancelled
    }

    // ---------------------------------------------------------------------
    // Collaborator edits
    // ---------------------------------------------------------------------

    /// Remove the background of every selected image.
    ///
    /// All requests must succeed before anything changes; the edit is one
    /// undo step.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidSelection`] with nothing selected, or
    /// the first decode or collaborator failure.
    pub async fn remove_background(&mut self) -> EditorResult<()> {
        let inputs: Vec<PlacedImage> = self.state.scene.selected_in_z_order().cloned().collect();
        if inputs.is_empty() {
            return Err(CanvasError::InvalidSelection("nothing selected".to_string()).into());
        }
        let baked = self.baked_sources(&inputs).await?;

        let collaborator = Arc::clone(&self.ctx.collaborator);
        let results = self
            .call(try_join_all(
                baked
                    .into_iter()
                    .map(|source| collaborator.remove_background(source)),
            ))
            .await
            .inspect_err(|e| warn!("background removal failed: {e}"))?;

        self.state.checkpoint();
        for (input, source) in inputs.iter().zip(results) {
            self.invalidate(&input.source);
            self.state
                .scene
                .update(input.id, &Self::baked_patch(source, input.visible_rect()));
        }
        info!(count = inputs.len(), "removed backgrounds");
        Ok(())
    }

    /// Cut the object described by `description` out of the single selected
    /// image.
    ///
    /// The image is replaced in place by a new image holding the cut-out,
    /// which becomes the selection.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidSelection`] unless exactly one image is
    /// selected, [`CollaboratorError::NotFound`] if the object is not in the
    /// image, or a decode failure.
    pub async fn isolate_object(&mut self, description: &str) -> EditorResult<ImageId> {
        let input = match self.state.scene.single_selection() {
            Some(img) => img.clone(),
            None => {
                return Err(CanvasError::InvalidSelection(format!(
                    "isolating needs exactly one image, {} selected",
                    self.state.scene.selected().len()
                ))
                .into())
            }
        };

        let pixels = self.load(std::slice::from_ref(&input.source)).await?;
        let baked = bake(&pixels[0], input.crop_box.as_ref())?;
        let request = to_source(&baked)?;

        let collaborator = Arc::clone(&self.ctx.collaborator);
        let mask_source = self
            .call(collaborator.isolate_object_mask(request, description))
            .await
            .inspect_err(|e| warn!(id = %input.id, "isolation failed: {e}"))?;
        let mask = self.ctx.loader.load(&mask_source).await?;
        let isolated = to_source(&apply_mask(&baked, &mask)?)?;

        let visible = input.visible_rect();
        let result = PlacedImage::new(isolated, visible.x, visible.y, visible.width, visible.height)
            .with_rotation(input.rotation);
        let id = result.id;

        self.state.checkpoint();
        self.state.scene.replace(input.id, result);
        self.state.scene.select_only(id);
        info!(%id, from = %input.id, description, "isolated object");
        Ok(id)
    }

    // ---------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------

    /// Open the store in `dir` and load any saved canvas into the editor.
    ///
    /// On failure the editor keeps running as an in-memory session. Returns
    /// whether a saved canvas was loaded.
    pub fn attach_store(&mut self, dir: impl Into<PathBuf>) -> bool {
        let dir = dir.into();
        let mut store = match CanvasStore::open(&dir) {
            Ok(store) => store,
            Err(e) => {
                warn!(
                    "Persistence unavailable at {}: {e}; session is in-memory only",
                    dir.display()
                );
                self.detach_store();
                return false;
            }
        };
        match store.load() {
            Ok(loaded) => {
                let restored = loaded.is_some();
                if let Some((scene, viewport)) = loaded {
                    info!(images = scene.len(), "restored canvas");
                    self.state.load(scene, viewport);
                }
                self.ctx.store = Some(store);
                self.ctx.in_memory_only = false;
                restored
            }
            Err(e) => {
                warn!("Failed to load canvas: {e}; session is in-memory only");
                self.detach_store();
                false
            }
        }
    }

    /// Persist the canvas. Returns whether it was written.
    ///
    /// A failure logs a warning and switches the session to in-memory only.
    pub fn save(&mut self) -> bool {
        let Some(store) = self.ctx.store.as_mut() else {
            return false;
        };
        match store.save(&self.state.scene, self.state.viewport) {
            Ok(report) => {
                if !report.skipped.is_empty() {
                    warn!(count = report.skipped.len(), "images too large to persist");
                }
                true
            }
            Err(e) => {
                warn!("Failed to save canvas: {e}; session is in-memory only");
                self.detach_store();
                false
            }
        }
    }

    fn detach_store(&mut self) {
        self.ctx.store = None;
        self.ctx.in_memory_only = true;
    }

    /// Whether changes are only kept in memory.
    #[must_use]
    pub fn is_in_memory_only(&self) -> bool {
        self.ctx.in_memory_only
    }
}

/// Output pixel size for image-to-image: the longer side is `base`, the
/// other keeps the aspect ratio of `visible`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn output_size(visible: Rect, base: f64) -> (u32, u32) {
    let (w, h) = if !visible.has_area() {
        (base, base)
    } else if visible.width >= visible.height {
        (base, base * visible.height / visible.width)
    } else {
        (base * visible.width / visible.height, base)
    };
    (w.round().max(1.0) as u32, h.round().max(1.0) as u32)
}
