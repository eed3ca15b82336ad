//! The keyed video overlay: lifecycle, sizing and the material handed to
//! the renderer.
//!
//! Overlays are never updated in place. Switching media disposes the old
//! overlay (playback, texture, geometry) before the new one is built, so
//! decoders and GPU textures cannot pile up across switches.

use crate::chroma::{self, ChromaKeyParams};
use crate::config::OverlayConfig;
use crate::types::OverlayTransform;
use crate::Result;
use std::time::Instant;

/// A video to key, with its letterbox crop.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSource {
    pub id: String,
    pub crop_top: f32,
    pub crop_bottom: f32,
}

impl MediaSource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            crop_top: 0.0,
            crop_bottom: 0.0,
        }
    }

    pub fn with_crop(mut self, crop_top: f32, crop_bottom: f32) -> Self {
        self.crop_top = crop_top;
        self.crop_bottom = crop_bottom;
        self
    }
}

/// Renderer-side texture name.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// A decoded video bound to a texture.
pub trait OverlayMedia {
    fn texture(&self) -> TextureHandle;

    /// Intrinsic video size, once metadata has loaded.
    fn natural_size(&self) -> Option<(u32, u32)>;

    /// Start playback. Platforms may reject autoplay.
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    /// Upload the current video frame to the texture.
    fn refresh_texture(&mut self);

    /// Free the decoder and the texture.
    fn release(&mut self);
}

/// Loads media sources.
pub trait MediaFactory {
    fn load(&mut self, source: &MediaSource) -> Result<Box<dyn OverlayMedia>>;
}

/// Plane size in camera-local units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneGeometry {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Playing,
    /// Autoplay was rejected; try once more at this time.
    RetryAt(Instant),
    /// Gave up; the last frame stays composited.
    Paused,
}

/// Uniform value in the material contract.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Texture(TextureHandle),
    Vec3([f32; 3]),
    Float(f32),
}

/// Chroma-key material: the shader pair and its uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChromaKeyMaterial {
    pub texture: TextureHandle,
    pub params: ChromaKeyParams,
}

impl ChromaKeyMaterial {
    pub fn vertex_shader(&self) -> &'static str {
        chroma::VERTEX_SHADER
    }

    pub fn fragment_shader(&self) -> &'static str {
        chroma::FRAGMENT_SHADER
    }

    /// Uniforms by the names the fragment shader declares.
    pub fn uniforms(&self) -> [(&'static str, UniformValue); 6] {
        let p = &self.params;
        [
            ("videoTexture", UniformValue::Texture(self.texture)),
            ("keyColor", UniformValue::Vec3(p.key_color)),
            ("similarity", UniformValue::Float(p.similarity)),
            ("smoothness", UniformValue::Float(p.smoothness)),
            ("cropTop", UniformValue::Float(p.crop_top)),
            ("cropBottom", UniformValue::Float(p.crop_bottom)),
        ]
    }
}

/// What the renderer draws for the overlay, as a child of the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayDrawable {
    pub transform: OverlayTransform,
    pub geometry: PlaneGeometry,
    pub material: ChromaKeyMaterial,
}

struct Overlay {
    source: MediaSource,
    transform: OverlayTransform,
    geometry: PlaneGeometry,
    aspect_corrected: bool,
    params: ChromaKeyParams,
    media: Box<dyn OverlayMedia>,
    playback: Playback,
}

/// Owner of the single overlay.
pub struct OverlayCompositor {
    factory: Box<dyn MediaFactory>,
    config: OverlayConfig,
    depth: f64,
    last_source: Option<MediaSource>,
    overlay: Option<Overlay>,
}

impl OverlayCompositor {
    pub fn new(factory: Box<dyn MediaFactory>, config: OverlayConfig, depth: f64) -> Self {
        Self {
            factory,
            config,
            depth,
            last_source: None,
            overlay: None,
        }
    }

    pub fn is_placed(&self) -> bool {
        self.overlay.is_some()
    }

    /// Source of the current overlay, or the one the next placement reuses.
    pub fn current_source(&self) -> Option<&MediaSource> {
        self.overlay
            .as_ref()
            .map(|o| &o.source)
            .or(self.last_source.as_ref())
    }

    pub fn transform(&self) -> Option<&OverlayTransform> {
        self.overlay.as_ref().map(|o| &o.transform)
    }

    pub fn transform_mut(&mut self) -> Option<&mut OverlayTransform> {
        self.overlay.as_mut().map(|o| &mut o.transform)
    }

    pub fn geometry(&self) -> Option<PlaneGeometry> {
        self.overlay.as_ref().map(|o| o.geometry)
    }

    pub fn playback(&self) -> Option<Playback> {
        self.overlay.as_ref().map(|o| o.playback)
    }

    /// Replace the overlay with a fresh one playing `source`.
    ///
    /// Without a source the last used one is replayed, falling back to the
    /// configured default. The previous overlay is always disposed first; if
    /// loading fails no overlay remains.
    pub fn place(&mut self, source: Option<MediaSource>, now: Instant) -> Result<()> {
        let source = source
            .or_else(|| self.last_source.clone())
            .unwrap_or_else(|| self.config.default_media.clone());

        self.dispose();
        self.last_source = Some(source.clone());

        let mut media = self.factory.load(&source)?;
        let playback = match media.play() {
            Ok(()) => Playback::Playing,
            Err(e) => {
                log::warn!("Autoplay rejected for '{}': {}, retrying", source.id, e);
                Playback::RetryAt(now + self.config.autoplay_retry_delay)
            }
        };

        let height = self.config.height;
        let params = self
            .config
            .chroma
            .with_crop(source.crop_top, source.crop_bottom);

        log::info!("Overlay placed: {}", source.id);
        self.overlay = Some(Overlay {
            source,
            transform: OverlayTransform::at_depth(self.depth),
            geometry: PlaneGeometry {
                width: height,
                height,
            },
            aspect_corrected: false,
            params,
            media,
            playback,
        });
        Ok(())
    }

    /// Stop, release and detach the overlay. Returns whether one existed.
    pub fn dispose(&mut self) -> bool {
        let Some(mut overlay) = self.overlay.take() else {
            return false;
        };
        overlay.media.pause();
        overlay.media.release();
        log::debug!("Overlay disposed: {}", overlay.source.id);
        true
    }

    /// Per-tick refresh: texture upload, one-time aspect fix, autoplay retry.
    pub fn update(&mut self, now: Instant) {
        let Some(overlay) = self.overlay.as_mut() else {
            return;
        };

        if let Playback::RetryAt(at) = overlay.playback {
            if now >= at {
                overlay.playback = match overlay.media.play() {
                    Ok(()) => Playback::Playing,
                    Err(e) => {
                        log::warn!("Playback still rejected for '{}': {}", overlay.source.id, e);
                        Playback::Paused
                    }
                };
            }
        }

        overlay.media.refresh_texture();

        if !overlay.aspect_corrected {
            if let Some((w, h)) = overlay.media.natural_size().filter(|&(w, h)| w > 0 && h > 0) {
                let height = overlay.geometry.height;
                overlay.geometry = PlaneGeometry {
                    width: height * w as f64 / h as f64,
                    height,
                };
                overlay.aspect_corrected = true;
                log::debug!("Overlay geometry resized for {}x{} media", w, h);
            }
        }
    }

    pub fn drawable(&self) -> Option<OverlayDrawable> {
        self.overlay.as_ref().map(|o| OverlayDrawable {
            transform: o.transform,
            geometry: o.geometry,
            material: ChromaKeyMaterial {
                texture: o.media.texture(),
                params: o.params,
            },
        })
    }
}
