// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Exporting PRIME frames as external images for GPU composition.
//!
//! Instead of putting a frame on an overlay plane, the frame's DMA-BUFs are
//! imported into the GPU context with `EGL_EXT_image_dma_buf_import`. The
//! result is a single opaque image covering every plane; the renderer samples
//! it as one external texture and the driver does the YUV conversion using
//! the colorspace and range hints attached here.
//!
//! [`ExternalImageApi`] is the seam to the GPU context
//! (`scanout_backend_egl` implements it over `khronos-egl`).

use core::fmt;
use std::error::Error;

use crate::adapter::{RawFdImporter, normalize};
use crate::backend::{PixelFormat, VideoPresenter};
use crate::color::{Colorspace, HdrMetadata};
use crate::descriptor::PrimeFrame;
use crate::error::{CapabilityAbsent, ImportFailure, PresentError};
use crate::format::{is_explicit_modifier, modifier_words};
use crate::negotiate::PresentationPath;

/// `EGL_NONE`.
pub const EGL_NONE: i32 = 0x3038;
/// `EGL_HEIGHT`.
pub const EGL_HEIGHT: i32 = 0x3056;
/// `EGL_WIDTH`.
pub const EGL_WIDTH: i32 = 0x3057;
/// `EGL_LINUX_DMA_BUF_EXT`, the image target.
pub const EGL_LINUX_DMA_BUF_EXT: u32 = 0x3270;
/// `EGL_LINUX_DRM_FOURCC_EXT`.
pub const EGL_LINUX_DRM_FOURCC_EXT: i32 = 0x3271;
/// `EGL_YUV_COLOR_SPACE_HINT_EXT`.
pub const EGL_YUV_COLOR_SPACE_HINT_EXT: i32 = 0x327B;
/// `EGL_SAMPLE_RANGE_HINT_EXT`.
pub const EGL_SAMPLE_RANGE_HINT_EXT: i32 = 0x327C;
/// `EGL_ITU_REC601_EXT`.
pub const EGL_ITU_REC601_EXT: i32 = 0x327F;
/// `EGL_ITU_REC709_EXT`.
pub const EGL_ITU_REC709_EXT: i32 = 0x3280;
/// `EGL_ITU_REC2020_EXT`.
pub const EGL_ITU_REC2020_EXT: i32 = 0x3281;
/// `EGL_YUV_FULL_RANGE_EXT`.
pub const EGL_YUV_FULL_RANGE_EXT: i32 = 0x3282;
/// `EGL_YUV_NARROW_RANGE_EXT`.
pub const EGL_YUV_NARROW_RANGE_EXT: i32 = 0x3283;

/// Required extension.
pub const DMA_BUF_IMPORT_EXT: &str = "EGL_EXT_image_dma_buf_import";
/// Optional extension enabling explicit modifiers.
pub const DMA_BUF_IMPORT_MODIFIERS_EXT: &str = "EGL_EXT_image_dma_buf_import_modifiers";

/// Attribute names for one plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PlaneAttribs {
    fd: i32,
    offset: i32,
    pitch: i32,
    modifier_lo: i32,
    modifier_hi: i32,
}

const PLANE_ATTRIBS: [PlaneAttribs; 4] = [
    PlaneAttribs {
        fd: 0x3272,
        offset: 0x3273,
        pitch: 0x3274,
        modifier_lo: 0x3443,
        modifier_hi: 0x3444,
    },
    PlaneAttribs {
        fd: 0x3275,
        offset: 0x3276,
        pitch: 0x3277,
        modifier_lo: 0x3445,
        modifier_hi: 0x3446,
    },
    PlaneAttribs {
        fd: 0x3278,
        offset: 0x3279,
        pitch: 0x327A,
        modifier_lo: 0x3447,
        modifier_hi: 0x3448,
    },
    PlaneAttribs {
        fd: 0x3440,
        offset: 0x3441,
        pitch: 0x3442,
        modifier_lo: 0x3449,
        modifier_hi: 0x344A,
    },
];

/// A key/value attribute list for image creation.
///
/// Values are stored as `EGLint`. [`to_attrib_list`](Self::to_attrib_list)
/// widens them for `eglCreateImage` and
/// [`to_int_list`](Self::to_int_list) keeps them for `eglCreateImageKHR`.
/// Both lists are `EGL_NONE`-terminated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageAttribs {
    pairs: Vec<(i32, i32)>,
}

impl ImageAttribs {
    /// Appends one attribute.
    pub fn push(&mut self, key: i32, value: i32) {
        self.pairs.push((key, value));
    }

    /// The attributes in order, without the terminator.
    #[must_use]
    pub fn pairs(&self) -> &[(i32, i32)] {
        &self.pairs
    }

    /// The value of `key`, if present.
    #[must_use]
    pub fn get(&self, key: i32) -> Option<i32> {
        self.pairs
            .iter()
            .find(|&&(k, _)| k == key)
            .map(|&(_, v)| v)
    }

    /// `EGLAttrib` list for `eglCreateImage`. Values are sign-extended.
    #[must_use]
    pub fn to_attrib_list(&self) -> Vec<usize> {
        let widen = |v: i32| (v as isize).cast_unsigned();
        self.pairs
            .iter()
            .flat_map(|&(k, v)| [widen(k), widen(v)])
            .chain([widen(EGL_NONE)])
            .collect()
    }

    /// `EGLint` list for `eglCreateImageKHR`.
    #[must_use]
    pub fn to_int_list(&self) -> Vec<i32> {
        self.pairs
            .iter()
            .flat_map(|&(k, v)| [k, v])
            .chain([EGL_NONE])
            .collect()
    }
}

/// A GPU context that can wrap DMA-BUFs in images.
pub trait ExternalImageApi {
    /// The driver's image handle.
    type Image;
    /// Errors reported by the driver.
    type Error: Error + Send + Sync + 'static;

    /// Whether the display exposes the named extension.
    fn has_extension(&self, name: &str) -> bool;

    /// Whether an image create/destroy entry point pair is available.
    fn has_image_entry_points(&self) -> bool;

    /// Creates an `EGL_LINUX_DMA_BUF_EXT` image.
    fn create_image(&mut self, attribs: &ImageAttribs) -> Result<Self::Image, Self::Error>;

    /// Destroys an image.
    fn destroy_image(&mut self, image: Self::Image) -> Result<(), Self::Error>;
}

/// An exported image. Hand it back to
/// [`ExternalImageExporter::free_external_image`] once sampling is done.
#[must_use = "external images must be freed with `free_external_image`"]
pub struct ExternalImage<I> {
    image: I,
}

impl<I> ExternalImage<I> {
    /// The driver's image handle.
    pub fn image(&self) -> &I {
        &self.image
    }
}

impl<I: fmt::Debug> fmt::Debug for ExternalImage<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExternalImage").field(&self.image).finish()
    }
}

/// Builds external images from PRIME frames.
#[derive(Debug)]
pub struct ExternalImageExporter<A: ExternalImageApi> {
    api: A,
    modifiers_supported: bool,
    live_images: usize,
}

impl<A: ExternalImageApi> ExternalImageExporter<A> {
    /// Checks that `api` can import DMA-BUFs.
    pub fn initialize(api: A) -> Result<Self, CapabilityAbsent> {
        if !api.has_extension(DMA_BUF_IMPORT_EXT) {
            log::error!("{DMA_BUF_IMPORT_EXT} is not supported");
            return Err(CapabilityAbsent::Extension(DMA_BUF_IMPORT_EXT));
        }
        if !api.has_image_entry_points() {
            log::error!("missing eglCreateImage()/eglDestroyImage() in EGL driver");
            return Err(CapabilityAbsent::ImageEntryPoints);
        }
        let modifiers_supported = api.has_extension(DMA_BUF_IMPORT_MODIFIERS_EXT);
        Ok(Self {
            api,
            modifiers_supported,
            live_images: 0,
        })
    }

    /// Whether explicit modifiers are passed to the driver.
    #[must_use]
    pub fn modifiers_supported(&self) -> bool {
        self.modifiers_supported
    }

    /// Images exported and not yet freed.
    #[must_use]
    pub fn live_images(&self) -> usize {
        self.live_images
    }

    /// The GPU context.
    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// The pixel format to report to the renderer: the image is one opaque
    /// PRIME texture regardless of the planes behind it.
    #[must_use]
    pub fn pixel_format(&self) -> PixelFormat {
        PixelFormat::DrmPrime
    }

    /// The attribute list for `frame`.
    pub fn build_attribs(&self, frame: &PrimeFrame<'_>) -> Result<ImageAttribs, ImportFailure> {
        let planes = normalize(frame, &mut RawFdImporter)?;
        let dimension = |v: u32| {
            i32::try_from(v).map_err(|_| ImportFailure::Descriptor("value exceeds EGLint range"))
        };

        let mut attribs = ImageAttribs::default();
        attribs.push(EGL_LINUX_DRM_FOURCC_EXT, planes.format.0.cast_signed());
        attribs.push(EGL_WIDTH, dimension(planes.width)?);
        attribs.push(EGL_HEIGHT, dimension(planes.height)?);

        for (plane, names) in planes.planes.iter().zip(&PLANE_ATTRIBS) {
            attribs.push(names.fd, plane.handle);
            attribs.push(names.offset, dimension(plane.offset)?);
            attribs.push(names.pitch, dimension(plane.pitch)?);
            if self.modifiers_supported && is_explicit_modifier(plane.modifier) {
                let (lo, hi) = modifier_words(plane.modifier);
                attribs.push(names.modifier_lo, lo.cast_signed());
                attribs.push(names.modifier_hi, hi.cast_signed());
            }
        }

        let colorspace_hint = match frame.color.colorspace {
            Colorspace::Rec601 => Some(EGL_ITU_REC601_EXT),
            Colorspace::Rec709 => Some(EGL_ITU_REC709_EXT),
            Colorspace::Rec2020 => Some(EGL_ITU_REC2020_EXT),
            Colorspace::Unknown => None,
        };
        if let Some(hint) = colorspace_hint {
            attribs.push(EGL_YUV_COLOR_SPACE_HINT_EXT, hint);
        }
        attribs.push(
            EGL_SAMPLE_RANGE_HINT_EXT,
            if frame.color.full_range {
                EGL_YUV_FULL_RANGE_EXT
            } else {
                EGL_YUV_NARROW_RANGE_EXT
            },
        );
        Ok(attribs)
    }

    /// Imports `frame` as one external image.
    ///
    /// The driver either returns an image or nothing, so a failure leaves no
    /// resources behind.
    pub fn export_external_image(
        &mut self,
        frame: &PrimeFrame<'_>,
    ) -> Result<ExternalImage<A::Image>, ImportFailure> {
        let attribs = self.build_attribs(frame)?;
        match self.api.create_image(&attribs) {
            Ok(image) => {
                self.live_images += 1;
                Ok(ExternalImage { image })
            }
            Err(err) => {
                log::error!("failed to create external image: {err}");
                Err(ImportFailure::ExternalImage(Box::new(err)))
            }
        }
    }

    /// Destroys an exported image.
    pub fn free_external_image(&mut self, image: ExternalImage<A::Image>) {
        self.live_images = self.live_images.saturating_sub(1);
        if let Err(err) = self.api.destroy_image(image.image) {
            log::error!("failed to destroy external image: {err}");
        }
    }
}

/// The GPU renderer that samples exported images.
pub trait ExternalImageConsumer<I> {
    /// Draws `image`. Returns once the image is no longer needed.
    fn draw(
        &mut self,
        image: &I,
        frame: &PrimeFrame<'_>,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Called when the stream enters or leaves HDR mode.
    fn set_hdr_mode(&mut self, enabled: bool, metadata: Option<&HdrMetadata>) {
        _ = (enabled, metadata);
    }
}

/// Presents frames by exporting them and handing them to a GPU renderer.
#[derive(Debug)]
pub struct ExternalImagePresenter<A: ExternalImageApi, C> {
    exporter: ExternalImageExporter<A>,
    consumer: C,
}

impl<A: ExternalImageApi, C: ExternalImageConsumer<A::Image>> ExternalImagePresenter<A, C> {
    /// Creates a presenter.
    #[must_use]
    pub fn new(exporter: ExternalImageExporter<A>, consumer: C) -> Self {
        Self { exporter, consumer }
    }

    /// The exporter.
    #[must_use]
    pub fn exporter(&self) -> &ExternalImageExporter<A> {
        &self.exporter
    }

    /// The renderer.
    #[must_use]
    pub fn consumer(&self) -> &C {
        &self.consumer
    }
}

impl<A: ExternalImageApi, C: ExternalImageConsumer<A::Image>> VideoPresenter
    for ExternalImagePresenter<A, C>
{
    fn path(&self) -> PresentationPath {
        PresentationPath::External
    }

    fn present(&mut self, frame: &PrimeFrame<'_>) -> Result<(), PresentError> {
        let image = self.exporter.export_external_image(frame)?;
        let drawn = self.consumer.draw(image.image(), frame);
        self.exporter.free_external_image(image);
        drawn.map_err(PresentError::Render)
    }

    fn set_hdr_mode(&mut self, enabled: bool, metadata: Option<&HdrMetadata>) {
        self.consumer.set_hdr_mode(enabled, metadata);
    }
}
