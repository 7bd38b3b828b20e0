// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`ExternalImageApi`] over a dynamically loaded EGL.

#![expect(
    unsafe_code,
    reason = "EGL handles are raw pointers and the KHR entry points are resolved at runtime"
)]

use core::fmt;
use core::ptr;
use std::mem;

use khronos_egl as egl;
use scanout_core::export::{EGL_LINUX_DMA_BUF_EXT, ExternalImageApi, ImageAttribs};

type CreateImageKhr = unsafe extern "system" fn(
    egl::EGLDisplay,
    egl::EGLContext,
    egl::Enum,
    egl::EGLClientBuffer,
    *const egl::Int,
) -> egl::EGLImage;

type DestroyImageKhr = unsafe extern "system" fn(egl::EGLDisplay, egl::EGLImage) -> egl::Boolean;

/// Errors from image creation and destruction.
#[derive(Debug, thiserror::Error)]
pub enum EglImageError {
    /// EGL reported an error.
    #[error("EGL call failed: {0}")]
    Egl(#[from] egl::Error),
    /// EGL failed without setting an error code.
    #[error("EGL call failed without an error code")]
    Unknown,
    /// Neither image entry point pair is available.
    #[error("no EGL image entry points are available")]
    NoEntryPoints,
}

/// `EGL_KHR_image_base`, which provides `eglCreateImageKHR`.
const KHR_IMAGE_BASE: &str = "EGL_KHR_image_base";

/// Which image API a display offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ImageApi {
    /// EGL 1.5 core, `EGLAttrib` lists.
    Core,
    /// `EGL_KHR_image_base`, `EGLint` lists.
    Khr,
    Missing,
}

/// Picks the image API: core on an EGL 1.5 display whose library exports the
/// 1.5 entry points, else the KHR extension if its entry points resolved.
fn select_image_api(
    version: Option<(u32, u32)>,
    core_loaded: bool,
    khr_resolved: bool,
    extensions: &[String],
) -> ImageApi {
    if core_loaded && version.is_some_and(|v| v >= (1, 5)) {
        ImageApi::Core
    } else if khr_resolved && extensions.iter().any(|ext| ext == KHR_IMAGE_BASE) {
        ImageApi::Khr
    } else {
        ImageApi::Missing
    }
}

/// Parses the leading `major.minor` of an `EGL_VERSION` string.
fn parse_version(version: &str) -> Option<(u32, u32)> {
    let mut numbers = version.split_ascii_whitespace().next()?.split('.');
    let major = numbers.next()?.parse().ok()?;
    let minor = numbers.next()?.parse().ok()?;
    Some((major, minor))
}

/// An attribute list in the width the chosen API takes.
#[derive(Debug, PartialEq, Eq)]
enum AttribList {
    Attrib(Vec<egl::Attrib>),
    Int(Vec<egl::Int>),
}

impl AttribList {
    fn for_api(api: ImageApi, attribs: &ImageAttribs) -> Option<Self> {
        match api {
            ImageApi::Core => Some(Self::Attrib(attribs.to_attrib_list())),
            ImageApi::Khr => Some(Self::Int(attribs.to_int_list())),
            ImageApi::Missing => None,
        }
    }
}

/// Which pair of entry points creates images.
#[derive(Clone, Copy)]
enum EntryPoints {
    /// `eglCreateImage` / `eglDestroyImage` from EGL 1.5.
    Core,
    /// `eglCreateImageKHR` / `eglDestroyImageKHR`, which take `EGLint`
    /// attribute lists.
    Khr {
        create: CreateImageKhr,
        destroy: DestroyImageKhr,
    },
    Missing,
}

impl EntryPoints {
    fn api(self) -> ImageApi {
        match self {
            Self::Core => ImageApi::Core,
            Self::Khr { .. } => ImageApi::Khr,
            Self::Missing => ImageApi::Missing,
        }
    }
}

impl fmt::Debug for EntryPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Core => "Core",
            Self::Khr { .. } => "Khr",
            Self::Missing => "Missing",
        })
    }
}

/// Splits an `EGL_EXTENSIONS` string.
fn parse_extensions(extensions: &str) -> Vec<String> {
    extensions.split_ascii_whitespace().map(str::to_owned).collect()
}

/// DMA-BUF image import on one EGL display.
pub struct EglImageApi<'a> {
    egl: &'a egl::DynamicInstance<egl::EGL1_4>,
    display: egl::Display,
    extensions: Vec<String>,
    entry_points: EntryPoints,
}

impl fmt::Debug for EglImageApi<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EglImageApi")
            .field("display", &self.display.as_ptr())
            .field("extensions", &self.extensions.len())
            .field("entry_points", &self.entry_points)
            .finish_non_exhaustive()
    }
}

impl<'a> EglImageApi<'a> {
    /// Queries `display`'s version and extensions and resolves the image
    /// entry points, preferring the EGL 1.5 core pair.
    pub fn new(
        egl: &'a egl::DynamicInstance<egl::EGL1_4>,
        display: egl::Display,
    ) -> Result<Self, EglImageError> {
        let extensions = egl.query_string(Some(display), egl::EXTENSIONS)?;
        let extensions = parse_extensions(&extensions.to_string_lossy());
        let version = egl.query_string(Some(display), egl::VERSION)?;
        let version = parse_version(&version.to_string_lossy());

        let khr = match (
            egl.get_proc_address("eglCreateImageKHR"),
            egl.get_proc_address("eglDestroyImageKHR"),
        ) {
            (Some(create), Some(destroy)) => Some((create, destroy)),
            _ => None,
        };
        let api = select_image_api(
            version,
            egl.upcast::<egl::EGL1_5>().is_some(),
            khr.is_some(),
            &extensions,
        );
        let entry_points = match (api, khr) {
            (ImageApi::Core, _) => EntryPoints::Core,
            // SAFETY: the driver returns these entry points with the
            // signatures from EGL_KHR_image_base.
            (ImageApi::Khr, Some((create, destroy))) => unsafe {
                EntryPoints::Khr {
                    create: mem::transmute::<extern "system" fn(), CreateImageKhr>(create),
                    destroy: mem::transmute::<extern "system" fn(), DestroyImageKhr>(destroy),
                }
            },
            _ => EntryPoints::Missing,
        };
        log::debug!("EGL {version:?} image entry points: {entry_points:?}");

        Ok(Self {
            egl,
            display,
            extensions,
            entry_points,
        })
    }

    /// The display images are created on.
    #[must_use]
    pub fn display(&self) -> egl::Display {
        self.display
    }

    fn last_error(&self) -> EglImageError {
        self.egl
            .get_error()
            .map_or(EglImageError::Unknown, EglImageError::Egl)
    }
}

impl ExternalImageApi for EglImageApi<'_> {
    type Image = egl::Image;
    type Error = EglImageError;

    fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|ext| ext == name)
    }

    fn has_image_entry_points(&self) -> bool {
        !matches!(self.entry_points, EntryPoints::Missing)
    }

    fn create_image(&mut self, attribs: &ImageAttribs) -> Result<egl::Image, EglImageError> {
        // SAFETY: DMA-BUF imports take no context and no client buffer.
        let (no_context, no_buffer) = unsafe {
            (
                egl::Context::from_ptr(egl::NO_CONTEXT),
                egl::ClientBuffer::from_ptr(ptr::null_mut()),
            )
        };
        let list = AttribList::for_api(self.entry_points.api(), attribs)
            .ok_or(EglImageError::NoEntryPoints)?;
        match (self.entry_points, list) {
            (EntryPoints::Core, AttribList::Attrib(list)) => {
                let egl15 = self
                    .egl
                    .upcast::<egl::EGL1_5>()
                    .ok_or(EglImageError::NoEntryPoints)?;
                Ok(egl15.create_image(
                    self.display,
                    no_context,
                    EGL_LINUX_DMA_BUF_EXT,
                    no_buffer,
                    &list,
                )?)
            }
            (EntryPoints::Khr { create, .. }, AttribList::Int(list)) => {
                // SAFETY: `list` is EGL_NONE-terminated and outlives the call.
                let image = unsafe {
                    create(
                        self.display.as_ptr(),
                        egl::NO_CONTEXT,
                        EGL_LINUX_DMA_BUF_EXT,
                        ptr::null_mut(),
                        list.as_ptr(),
                    )
                };
                if image == egl::NO_IMAGE {
                    Err(self.last_error())
                } else {
                    // SAFETY: a non-null image just returned by the driver.
                    Ok(unsafe { egl::Image::from_ptr(image) })
                }
            }
            _ => Err(EglImageError::NoEntryPoints),
        }
    }

    fn destroy_image(&mut self, image: egl::Image) -> Result<(), EglImageError> {
        match self.entry_points {
            EntryPoints::Core => {
                let egl15 = self
                    .egl
                    .upcast::<egl::EGL1_5>()
                    .ok_or(EglImageError::NoEntryPoints)?;
                Ok(egl15.destroy_image(self.display, image)?)
            }
            EntryPoints::Khr { destroy, .. } => {
                // SAFETY: `image` was created on this display and is
                // destroyed exactly once.
                let ok = unsafe { destroy(self.display.as_ptr(), image.as_ptr()) };
                if ok == egl::TRUE {
                    Ok(())
                } else {
                    Err(self.last_error())
                }
            }
            EntryPoints::Missing => Err(EglImageError::NoEntryPoints),
        }
    }
}
