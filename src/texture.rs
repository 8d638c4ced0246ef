use std::path::Path;
use std::rc::Rc;

use log::info;
use thiserror::Error;

use crate::gl::{GlBackend, TextureParams};

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to decode image {path}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("expected {expected} bytes of RGB data for a {width}x{height} texture, got {actual}")]
    DataLength {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("graphics backend refused to create a texture: {0}")]
    Backend(String),
}

/// Something that can be bound to the active texture unit.
pub trait TextureBinding {
    fn bind(&self);
    fn unbind(&self);
}

/// RGB8 2D texture with repeat wrapping, linear filtering and mipmaps.
pub struct Texture2D<B: GlBackend> {
    backend: Rc<B>,
    raw: B::Texture,
    width: u32,
    height: u32,
}

impl<B: GlBackend> Texture2D<B> {
    /// Decodes an image file and uploads it as RGB.
    pub fn load(backend: Rc<B>, path: impl AsRef<Path>) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|source| TextureError::Decode {
                path: path.display().to_string(),
                source,
            })?
            .to_rgb8();
        let (width, height) = image.dimensions();
        let texture = Self::from_rgb8(backend, width, height, image.as_raw())?;
        info!("loaded texture {} ({width}x{height})", path.display());
        Ok(texture)
    }

    pub fn from_rgb8(
        backend: Rc<B>,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<Self, TextureError> {
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected || expected == 0 {
            return Err(TextureError::DataLength {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        let raw = backend.create_texture().map_err(TextureError::Backend)?;
        backend.bind_texture_2d(Some(raw));
        backend.tex_image_2d_rgb8(width, height, pixels, TextureParams::default());
        backend.bind_texture_2d(None);
        Ok(Self {
            backend,
            raw,
            width,
            height,
        })
    }

    /// Single-pixel texture, used when an image asset is unavailable.
    pub fn solid(backend: Rc<B>, rgb: [u8; 3]) -> Result<Self, TextureError> {
        Self::from_rgb8(backend, 1, 1, &rgb)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn raw(&self) -> B::Texture {
        self.raw
    }
}

impl<B: GlBackend> TextureBinding for Texture2D<B> {
    fn bind(&self) {
        self.backend.bind_texture_2d(Some(self.raw));
    }

    fn unbind(&self) {
        self.backend.bind_texture_2d(None);
    }
}

impl<B: GlBackend> Drop for Texture2D<B> {
    fn drop(&mut self) {
        self.backend.delete_texture(self.raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::testing::RecordingBackend;

    #[test]
    fn upload_leaves_nothing_bound() {
        let backend = Rc::new(RecordingBackend::new());
        let pixels = vec![128u8; 2 * 3 * 3];
        let texture = Texture2D::from_rgb8(Rc::clone(&backend), 2, 3, &pixels).unwrap();
        assert_eq!((texture.width(), texture.height()), (2, 3));
        assert_eq!(backend.uploads(), vec![(2, 3, 18)]);
        assert_eq!(backend.texture_on_unit(0), None);
    }

    #[test]
    fn rejects_short_pixel_data() {
        let backend = Rc::new(RecordingBackend::new());
        let err = Texture2D::from_rgb8(Rc::clone(&backend), 4, 4, &[0u8; 10])
            .err()
            .unwrap();
        assert!(matches!(
            err,
            TextureError::DataLength {
                expected: 48,
                actual: 10,
                ..
            }
        ));
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn bind_and_unbind_follow_the_active_unit() {
        let backend = Rc::new(RecordingBackend::new());
        let texture = Texture2D::solid(Rc::clone(&backend), [0, 0, 255]).unwrap();
        backend.active_texture(1);
        texture.bind();
        assert_eq!(backend.texture_on_unit(1), Some(texture.raw()));
        texture.unbind();
        assert_eq!(backend.texture_on_unit(1), None);
    }

    #[test]
    fn missing_image_is_a_decode_error() {
        let backend = Rc::new(RecordingBackend::new());
        let err = Texture2D::load(Rc::clone(&backend), "no/such/diffuse_map.png")
            .err()
            .unwrap();
        assert!(matches!(err, TextureError::Decode { .. }));
    }

    #[test]
    fn loads_png_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checker.png");
        let image = image::RgbImage::from_fn(3, 2, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgb([255, 255, 255])
            } else {
                image::Rgb([0, 0, 0])
            }
        });
        image.save(&path).unwrap();

        let backend = Rc::new(RecordingBackend::new());
        let texture = Texture2D::load(Rc::clone(&backend), &path).unwrap();
        assert_eq!((texture.width(), texture.height()), (3, 2));
        assert_eq!(backend.uploads(), vec![(3, 2, 18)]);
    }

    #[test]
    fn drop_deletes_the_texture() {
        let backend = Rc::new(RecordingBackend::new());
        let texture = Texture2D::solid(Rc::clone(&backend), [1, 2, 3]).unwrap();
        drop(texture);
        assert_eq!(backend.textures_deleted(), 1);
        assert_eq!(backend.live_textures(), 0);
    }
}
