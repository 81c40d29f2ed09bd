//! Media picker capability.
//!
//! Wraps the platform photo library: one operation to ask for access,
//! one to open the picker. The shell returns image bytes along with the
//! display URI so previews never need a second round trip.

use crux_core::capability::{CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::{AppError, ErrorKind, PermissionState};

pub const DEFAULT_PICK_QUALITY: f32 = 0.8;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PickConfig {
    pub allow_multiple: bool,
    /// Upper bound the picker should enforce when `allow_multiple` is set.
    pub max_selections: u32,
    /// Re-encode quality hint in `0.0..=1.0`, applied by the shell.
    pub quality: f32,
}

impl Default for PickConfig {
    fn default() -> Self {
        Self {
            allow_multiple: false,
            max_selections: 1,
            quality: DEFAULT_PICK_QUALITY,
        }
    }
}

impl PickConfig {
    #[must_use]
    pub fn single() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn multiple(max_selections: u32) -> Self {
        Self {
            allow_multiple: max_selections > 1,
            max_selections: max_selections.max(1),
            quality: DEFAULT_PICK_QUALITY,
        }
    }

    /// Clamps out-of-range values instead of failing the pick.
    #[must_use]
    pub fn validated(mut self) -> Self {
        if !self.quality.is_finite() {
            self.quality = DEFAULT_PICK_QUALITY;
        }
        self.quality = self.quality.clamp(0.1, 1.0);
        self.max_selections = self.max_selections.max(1);
        if self.max_selections == 1 {
            self.allow_multiple = false;
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MediaOperation {
    RequestPermission,
    Pick { config: PickConfig },
}

impl Operation for MediaOperation {
    type Output = MediaResult;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaPermission {
    Granted,
    Denied,
    DeniedPermanently,
    Restricted,
    NotDetermined,
}

impl MediaPermission {
    #[must_use]
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }

    #[must_use]
    pub fn can_request(self) -> bool {
        matches!(self, Self::NotDetermined | Self::Denied)
    }
}

impl From<MediaPermission> for PermissionState {
    fn from(p: MediaPermission) -> Self {
        match p {
            MediaPermission::Granted => PermissionState::Granted,
            MediaPermission::Denied | MediaPermission::DeniedPermanently => PermissionState::Denied,
            MediaPermission::Restricted => PermissionState::Restricted,
            MediaPermission::NotDetermined => PermissionState::Unknown,
        }
    }
}

/// One image as handed over by the platform picker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PickedImage {
    /// Platform URI for preview rendering (file://, content://, ph://).
    pub uri: String,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    /// Shell-reported MIME type, used only when magic-byte sniffing fails.
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MediaOutput {
    Permission { status: MediaPermission },
    Images { images: Vec<PickedImage> },
    /// The user backed out of the picker. Not an error.
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum MediaError {
    #[error("photo library permission denied")]
    PermissionDenied,
    #[error("photo library unavailable")]
    Unavailable,
    #[error("image pick failed: {message}")]
    PickFailed { message: String },
}

pub type MediaResult = Result<MediaOutput, MediaError>;

impl From<MediaError> for AppError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::PermissionDenied => AppError::new(
                ErrorKind::MediaPermissionDenied,
                "Photo access is turned off",
            ),
            MediaError::Unavailable => {
                AppError::new(ErrorKind::MediaPicker, "Photo library unavailable")
            }
            MediaError::PickFailed { message } => {
                AppError::new(ErrorKind::MediaPicker, "We couldn't open your photos")
                    .with_internal(message)
            }
        }
    }
}

pub struct MediaPicker<E> {
    context: CapabilityContext<MediaOperation, E>,
}

impl<E> crux_core::capability::Capability<E> for MediaPicker<E> {
    type Operation = MediaOperation;
    type MappedSelf<MappedEv> = MediaPicker<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> E + Send + Sync + 'static,
        E: 'static,
        NewEv: 'static + Send,
    {
        MediaPicker::new(self.context.map_event(f))
    }
}

impl<E> MediaPicker<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<MediaOperation, E>) -> Self {
        Self { context }
    }

    pub fn request_permission<F>(&self, make_event: F)
    where
        F: FnOnce(MediaResult) -> E + Send + 'static,
    {
        self.run(MediaOperation::RequestPermission, make_event);
    }

    pub fn pick<F>(&self, config: PickConfig, make_event: F)
    where
        F: FnOnce(MediaResult) -> E + Send + 'static,
    {
        self.run(
            MediaOperation::Pick {
                config: config.validated(),
            },
            make_event,
        );
    }

    fn run<F>(&self, operation: MediaOperation, make_event: F)
    where
        F: FnOnce(MediaResult) -> E + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let response = context.request_from_shell(operation).await;
            context.update_app(make_event(response));
        });
    }
}
