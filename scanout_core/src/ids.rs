// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display-engine object identifiers.
//!
//! These are lightweight handles for KMS objects. Backends assign them from
//! the kernel's object ids; core code passes them through without
//! interpreting the value.

use core::fmt;

macro_rules! object_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub u32);

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

object_id! {
    /// Identifies a hardware plane (overlay, primary or cursor).
    PlaneId
}

object_id! {
    /// Identifies a CRTC, the scanout engine a plane is attached to.
    CrtcId
}

object_id! {
    /// Identifies a connector (the physical output).
    ConnectorId
}

object_id! {
    /// Identifies a framebuffer object created by the display engine.
    FramebufferId
}

object_id! {
    /// Identifies a property on a plane, CRTC or connector.
    PropertyId
}

object_id! {
    /// Identifies a property blob. `BlobId(0)` is the null blob.
    BlobId
}

impl BlobId {
    /// The null blob, used to clear blob-valued properties.
    pub const NONE: Self = Self(0);
}

/// The object a property write is addressed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyTarget {
    /// A plane property such as `COLOR_ENCODING`.
    Plane(PlaneId),
    /// A connector property such as `HDR_OUTPUT_METADATA`.
    Connector(ConnectorId),
}
