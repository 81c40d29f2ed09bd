// lib.rs - GramHaat core: profile and equipment listing flows

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod capabilities;
pub mod validate;

use std::collections::{HashMap, VecDeque};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use capabilities::{MediaResult, ObjectStoreResult, PickedImage, StoreResult};
use validate::{EquipmentDraft, ProfileDraft};

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use crux_core::App as CruxApp;

pub const PROFILE_TABLE: &str = "profiles";
pub const EQUIPMENT_TABLE: &str = "equipment_listings";
pub const AVATAR_BUCKET: &str = "avatars";
pub const EQUIPMENT_PHOTO_BUCKET: &str = "equipment-photos";
pub const MAX_BIO_CHARS: usize = 500;
pub const MOBILE_NUMBER_DIGITS: usize = 10;
pub const MAX_EQUIPMENT_PHOTOS: usize = 5;
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    Authentication,
    Validation,
    Persistence,
    Upload,
    MediaPermissionDenied,
    MediaPicker,
    ImageTooLarge,
    ImageFormatUnsupported,
    Serialization,
    InvalidState,
    Internal,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Authentication => "AUTH_ERROR",
            Self::Validation => "VALIDATION_ERROR",
            Self::Persistence => "PERSISTENCE_ERROR",
            Self::Upload => "UPLOAD_ERROR",
            Self::MediaPermissionDenied => "MEDIA_PERMISSION_DENIED",
            Self::MediaPicker => "MEDIA_PICKER_ERROR",
            Self::ImageTooLarge => "IMAGE_TOO_LARGE",
            Self::ImageFormatUnsupported => "IMAGE_FORMAT_UNSUPPORTED",
            Self::Serialization => "SERIALIZATION_ERROR",
            Self::InvalidState => "INVALID_STATE",
            Self::Internal => "INTERNAL_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network | Self::Timeout | Self::Persistence | Self::Upload | Self::MediaPicker => {
                ErrorSeverity::Transient
            }
            Self::Authentication
            | Self::Validation
            | Self::MediaPermissionDenied
            | Self::ImageTooLarge
            | Self::ImageFormatUnsupported
            | Self::Unknown => ErrorSeverity::Permanent,
            Self::Serialization | Self::InvalidState | Self::Internal => ErrorSeverity::Fatal,
        }
    }
}

/// Application error with enough structure for the shell to decide how to
/// present it. `message` may be shown to the user (see
/// [`AppError::user_facing_message`]); `internal_message` never is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Network
                | ErrorKind::Timeout
                | ErrorKind::Persistence
                | ErrorKind::Upload
                | ErrorKind::MediaPicker
        )
    }

    /// Copy suitable for direct display. Validation and persistence
    /// failures carry their own text; everything else gets fixed copy so
    /// backend internals never leak onto the screen.
    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Network => "Please check your internet connection and try again.".into(),
            ErrorKind::Timeout => "The request took too long. Please try again.".into(),
            ErrorKind::Authentication => "Please sign in to continue.".into(),
            ErrorKind::Validation | ErrorKind::InvalidState => self.message.clone(),
            ErrorKind::Persistence => {
                if self.message.is_empty() {
                    "We couldn't save your changes. Please try again.".into()
                } else {
                    self.message.clone()
                }
            }
            ErrorKind::Upload => "We couldn't upload your photo. Please try again.".into(),
            ErrorKind::MediaPermissionDenied => {
                "Photo access is turned off for this app. You can change it in Settings, or continue without photos."
                    .into()
            }
            ErrorKind::MediaPicker => "We couldn't open your photo library. Please try again.".into(),
            ErrorKind::ImageTooLarge => format!(
                "That image is too large. Please choose one under {} MB.",
                MAX_IMAGE_BYTES / (1024 * 1024)
            ),
            ErrorKind::ImageFormatUnsupported => {
                "That image format isn't supported. Please choose a JPEG or PNG photo.".into()
            }
            ErrorKind::Serialization | ErrorKind::Internal | ErrorKind::Unknown => {
                "Something went wrong. Please try again.".into()
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " ({internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

#[must_use]
pub fn get_current_time_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnixTimeMs(pub u64);

impl UnixTimeMs {
    #[must_use]
    pub fn now() -> Self {
        Self(get_current_time_ms())
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn as_secs(self) -> u64 {
        self.0 / 1000
    }

    #[must_use]
    pub fn elapsed_since(self, earlier: UnixTimeMs) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Identity handed to the core by the shell's auth provider. The core never
/// mints one of these itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlates in-flight capability responses with the submit attempt that
/// requested them. Responses carrying a different id are stale and ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accepts only parseable http(s) URLs and returns them in canonical form.
#[must_use]
pub fn sanitized_public_url(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    match parsed.scheme() {
        "http" | "https" => Some(String::from(parsed)),
        _ => None,
    }
}

/// Last path segment of a public object URL, which is the object name we
/// chose at upload time. Used to delete a replaced avatar.
#[must_use]
pub fn object_name_from_public_url(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    let name = parsed.path_segments()?.last()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Truncates to at most `max_chars` characters without splitting a char.
#[must_use]
pub fn cap_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((byte_index, _)) => value[..byte_index].to_string(),
        None => value.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentType {
    Tractor,
    Harvester,
    Rotavator,
    Thresher,
    Sprayer,
    Trailer,
    WaterPump,
    Other,
}

impl EquipmentType {
    pub const ALL: [EquipmentType; 8] = [
        Self::Tractor,
        Self::Harvester,
        Self::Rotavator,
        Self::Thresher,
        Self::Sprayer,
        Self::Trailer,
        Self::WaterPump,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tractor => "tractor",
            Self::Harvester => "harvester",
            Self::Rotavator => "rotavator",
            Self::Thresher => "thresher",
            Self::Sprayer => "sprayer",
            Self::Trailer => "trailer",
            Self::WaterPump => "water_pump",
            Self::Other => "other",
        }
    }

    #[must_use]
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "tractor" => Some(Self::Tractor),
            "harvester" | "combine" | "combine_harvester" => Some(Self::Harvester),
            "rotavator" | "rotovator" => Some(Self::Rotavator),
            "thresher" => Some(Self::Thresher),
            "sprayer" => Some(Self::Sprayer),
            "trailer" | "trolley" => Some(Self::Trailer),
            "water_pump" | "water pump" | "waterpump" | "pump" => Some(Self::WaterPump),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Tractor => "Tractor",
            Self::Harvester => "Harvester",
            Self::Rotavator => "Rotavator",
            Self::Thresher => "Thresher",
            Self::Sprayer => "Sprayer",
            Self::Trailer => "Trailer",
            Self::WaterPump => "Water pump",
            Self::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceUnit {
    PerHour,
    PerDay,
}

impl PriceUnit {
    pub const ALL: [PriceUnit; 2] = [Self::PerHour, Self::PerDay];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PerHour => "per_hour",
            Self::PerDay => "per_day",
        }
    }

    #[must_use]
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "per_hour" | "hour" | "hourly" => Some(Self::PerHour),
            "per_day" | "day" | "daily" => Some(Self::PerDay),
            _ => None,
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::PerHour => "Per hour",
            Self::PerDay => "Per day",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Available,
    Unavailable,
}

impl Default for ListingStatus {
    fn default() -> Self {
        Self::Available
    }
}

impl ListingStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Unavailable => "unavailable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Home,
    ProfileSetup,
    ProfileEdit,
    EquipmentAdd,
}

impl Route {
    #[must_use]
    pub const fn as_path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::ProfileSetup => "/profile/setup",
            Self::ProfileEdit => "/profile/edit",
            Self::EquipmentAdd => "/equipment/add",
        }
    }
}

/// Row shape of the `profiles` table. Field names are the wire contract
/// with the backend and must not be renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: String,
    pub full_name: String,
    pub mobile_number: String,
    pub village: String,
    pub bio: String,
    /// Serialized even when `None`: the backend clears the column on an
    /// explicit null, not on an absent key.
    pub avatar_url: Option<String>,
    pub experience_years: u32,
}

/// Row shape of the `equipment_listings` table. Same contract rules as
/// [`ProfileRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    pub owner_id: String,
    pub name: String,
    pub equipment_type: EquipmentType,
    pub description: String,
    pub photo_urls: Vec<String>,
    pub rental_price: f64,
    pub price_type: PriceUnit,
    pub availability_start: NaiveDate,
    pub availability_end: NaiveDate,
    pub location: String,
    pub status: ListingStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
    Heic,
}

impl ImageKind {
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Heic => "image/heic",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Heic => "heic",
        }
    }

    /// Sniffs the format from the first bytes. The shell-reported MIME type
    /// is only trusted when this fails.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() >= 3 && data[..3] == [0xFF, 0xD8, 0xFF] {
            return Some(Self::Jpeg);
        }
        if data.len() >= 8 && data[..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
            return Some(Self::Png);
        }
        if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(Self::Webp);
        }
        if data.len() >= 12 && &data[4..8] == b"ftyp" {
            let brand = &data[8..12];
            if brand == b"heic" || brand == b"heix" || brand == b"hevc" || brand == b"mif1" {
                return Some(Self::Heic);
            }
        }
        None
    }

    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            "image/heic" | "image/heif" => Some(Self::Heic),
            _ => None,
        }
    }
}

/// An image the user picked but has not submitted yet. Bytes live in the
/// model until upload; the URI is only for preview rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingImage {
    pub id: String,
    pub uri: String,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    pub kind: ImageKind,
}

impl PendingImage {
    pub fn from_picked(picked: PickedImage) -> AppResult<Self> {
        if picked.data.is_empty() {
            return Err(AppError::new(
                ErrorKind::MediaPicker,
                "The selected photo could not be read",
            ));
        }
        if picked.data.len() > MAX_IMAGE_BYTES {
            return Err(AppError::new(
                ErrorKind::ImageTooLarge,
                "Image exceeds the size limit",
            ));
        }
        let kind = ImageKind::from_magic_bytes(&picked.data)
            .or_else(|| picked.mime_type.as_deref().and_then(ImageKind::from_mime))
            .ok_or_else(|| {
                AppError::new(ErrorKind::ImageFormatUnsupported, "Unrecognized image format")
            })?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            uri: picked.uri,
            data: picked.data,
            kind,
        })
    }

    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    FullName,
    MobileNumber,
    Village,
    Bio,
    ExperienceYears,
}

/// Raw echo of what the user typed on the profile screens. Values are kept
/// verbatim; validation happens against a snapshot at submit time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub full_name: String,
    pub mobile_number: String,
    pub village: String,
    pub bio: String,
    pub experience_years: String,
    pub avatar: Option<PendingImage>,
    pub existing_avatar_url: Option<String>,
    pub picker_open: bool,
}

impl ProfileForm {
    pub fn set_field(&mut self, field: ProfileField, value: String) {
        match field {
            ProfileField::FullName => self.full_name = value,
            ProfileField::MobileNumber => self.mobile_number = value,
            ProfileField::Village => self.village = value,
            // The bio cap is enforced at input time so the counter in the
            // view can never go negative.
            ProfileField::Bio => self.bio = cap_chars(&value, MAX_BIO_CHARS),
            ProfileField::ExperienceYears => self.experience_years = value,
        }
    }

    #[must_use]
    pub fn from_record(record: &ProfileRecord) -> Self {
        Self {
            full_name: record.full_name.clone(),
            mobile_number: record.mobile_number.clone(),
            village: record.village.clone(),
            bio: record.bio.clone(),
            experience_years: record.experience_years.to_string(),
            avatar: None,
            existing_avatar_url: record.avatar_url.clone(),
            picker_open: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentField {
    Name,
    EquipmentType,
    Description,
    RentalPrice,
    PriceType,
    AvailabilityStart,
    AvailabilityEnd,
    Location,
}

/// Raw echo of the listing form. Selection fields hold the selected value's
/// wire string, or empty when nothing is chosen yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EquipmentForm {
    pub name: String,
    pub equipment_type: String,
    pub description: String,
    pub rental_price: String,
    pub price_type: String,
    pub availability_start: String,
    pub availability_end: String,
    pub location: String,
    pub photos: Vec<PendingImage>,
    pub type_menu_open: bool,
    pub unit_menu_open: bool,
    pub picker_open: bool,
}

impl EquipmentForm {
    pub fn set_field(&mut self, field: EquipmentField, value: String) {
        match field {
            EquipmentField::Name => self.name = value,
            EquipmentField::EquipmentType => {
                self.equipment_type = value;
                self.type_menu_open = false;
            }
            EquipmentField::Description => self.description = value,
            EquipmentField::RentalPrice => self.rental_price = value,
            EquipmentField::PriceType => {
                self.price_type = value;
                self.unit_menu_open = false;
            }
            EquipmentField::AvailabilityStart => self.availability_start = value,
            EquipmentField::AvailabilityEnd => self.availability_end = value,
            EquipmentField::Location => self.location = value,
        }
    }

    /// Appends up to the photo cap, preserving selection order. Returns how
    /// many images did not fit.
    pub fn append_photos(&mut self, images: Vec<PendingImage>) -> usize {
        let available = MAX_EQUIPMENT_PHOTOS.saturating_sub(self.photos.len());
        let take = available.min(images.len());
        let dropped = images.len() - take;
        self.photos.extend(images.into_iter().take(take));
        dropped
    }

    pub fn remove_photo(&mut self, index: usize) -> bool {
        if index < self.photos.len() {
            self.photos.remove(index);
            true
        } else {
            false
        }
    }
}

/// Who is signed in, if anyone, and their saved profile. Populated by the
/// shell's auth provider via [`Event::SignedIn`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub user_id: Option<UserId>,
    pub profile: Option<ProfileRecord>,
}

impl SessionContext {
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.user_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitPhase {
    Uploading,
    Persisting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileScreen {
    Setup,
    Edit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPhoto {
    pub path: String,
    pub url: String,
}

/// In-flight profile save. Holds everything the response handlers need so
/// the form can keep changing underneath without corrupting the attempt.
#[derive(Debug, Clone)]
pub struct ProfileSubmission {
    pub id: SubmissionId,
    pub user_id: UserId,
    pub screen: ProfileScreen,
    pub draft: ProfileDraft,
    pub uploaded_path: Option<String>,
    pub avatar_url: Option<String>,
    /// Kept when editing without picking a new image.
    pub retained_avatar_url: Option<String>,
    /// Old avatar to delete after a successful save with a new image.
    pub replaces_avatar_url: Option<String>,
    pub phase: SubmitPhase,
}

/// In-flight listing publish. Photos upload one at a time off the queue;
/// a failed photo is counted and skipped, never retried.
#[derive(Debug, Clone)]
pub struct EquipmentSubmission {
    pub id: SubmissionId,
    pub user_id: UserId,
    pub draft: EquipmentDraft,
    pub queue: VecDeque<PendingImage>,
    pub photos_total: usize,
    pub next_index: usize,
    pub pending_url_path: Option<String>,
    pub uploaded: Vec<UploadedPhoto>,
    pub failed_uploads: usize,
    pub phase: SubmitPhase,
}

/// The single busy slot. At most one submission exists at a time, which is
/// what makes double-taps on Save a no-op.
#[derive(Debug, Clone)]
pub enum SubmissionFlow {
    Profile(ProfileSubmission),
    Equipment(EquipmentSubmission),
}

impl SubmissionFlow {
    #[must_use]
    pub fn phase(&self) -> SubmitPhase {
        match self {
            Self::Profile(sub) => sub.phase,
            Self::Equipment(sub) => sub.phase,
        }
    }

    #[must_use]
    pub fn id(&self) -> &SubmissionId {
        match self {
            Self::Profile(sub) => &sub.id,
            Self::Equipment(sub) => &sub.id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Unknown,
    Requesting,
    Granted,
    Denied,
    Restricted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
}

impl ToastKind {
    #[must_use]
    pub const fn display_duration_ms(self) -> u64 {
        match self {
            Self::Info => 3000,
            Self::Success => 2000,
            Self::Warning => 4000,
            Self::Error => 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastMessage {
    pub message: String,
    pub kind: ToastKind,
    pub created_at_ms: u64,
    pub duration_ms: u64,
}

impl ToastMessage {
    pub fn new(message: impl Into<String>, kind: ToastKind) -> Self {
        Self {
            message: message.into(),
            kind,
            created_at_ms: get_current_time_ms(),
            duration_ms: kind.display_duration_ms(),
        }
    }

    #[must_use]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_at_ms) >= self.duration_ms
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    SignedOut,
    Home,
    ProfileSetup(ProfileForm),
    ProfileEdit(ProfileForm),
    EquipmentAdd(EquipmentForm),
}

impl Default for Screen {
    fn default() -> Self {
        Self::SignedOut
    }
}

#[derive(Debug)]
pub struct Model {
    pub session: SessionContext,
    pub screen: Screen,
    pub submission: Option<SubmissionFlow>,
    pub media_permission: PermissionState,
    pub active_error: Option<AppError>,
    pub active_toast: Option<ToastMessage>,
    pub view_timestamp_ms: u64,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            session: SessionContext::default(),
            screen: Screen::default(),
            submission: None,
            media_permission: PermissionState::Unknown,
            active_error: None,
            active_toast: None,
            view_timestamp_ms: 0,
        }
    }
}

impl Model {
    pub fn update_timestamp(&mut self) {
        self.view_timestamp_ms = get_current_time_ms();
    }

    pub fn set_error(&mut self, error: AppError) {
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }

    pub fn show_toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.active_toast = Some(ToastMessage::new(message, kind));
    }

    pub fn clear_toast(&mut self) {
        self.active_toast = None;
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submission.is_some()
    }

    pub fn profile_form_mut(&mut self) -> Option<&mut ProfileForm> {
        match &mut self.screen {
            Screen::ProfileSetup(form) | Screen::ProfileEdit(form) => Some(form),
            _ => None,
        }
    }

    pub fn equipment_form_mut(&mut self) -> Option<&mut EquipmentForm> {
        match &mut self.screen {
            Screen::EquipmentAdd(form) => Some(form),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickIntent {
    Avatar,
    EquipmentPhotos,
}

#[derive(Debug, Clone)]
pub enum Event {
    Noop,

    // Session, driven by the shell's auth provider.
    SignedIn {
        user_id: String,
        profile: Option<ProfileRecord>,
    },
    SignedOut,

    // Screen entry.
    HomeOpened,
    ProfileSetupOpened,
    ProfileEditOpened,
    EquipmentAddOpened,

    // Form edits.
    ProfileFieldChanged {
        field: ProfileField,
        value: String,
    },
    EquipmentFieldChanged {
        field: EquipmentField,
        value: String,
    },
    TypeMenuToggled,
    UnitMenuToggled,

    // Image acquisition.
    AvatarPickRequested,
    AvatarCleared,
    EquipmentPhotosPickRequested,
    EquipmentPhotoRemoved {
        index: usize,
    },
    MediaPermissionResult {
        intent: PickIntent,
        result: Box<MediaResult>,
    },
    ImagesPicked {
        intent: PickIntent,
        result: Box<MediaResult>,
    },

    // Submit pipeline.
    SubmitRequested,
    AvatarUploadResponse {
        submission_id: String,
        result: Box<ObjectStoreResult>,
    },
    AvatarUrlResponse {
        submission_id: String,
        result: Box<ObjectStoreResult>,
    },
    ProfilePersistResponse {
        submission_id: String,
        result: Box<StoreResult>,
    },
    EquipmentUploadResponse {
        submission_id: String,
        index: usize,
        result: Box<ObjectStoreResult>,
    },
    EquipmentUrlResponse {
        submission_id: String,
        index: usize,
        result: Box<ObjectStoreResult>,
    },
    EquipmentPersistResponse {
        submission_id: String,
        result: Box<StoreResult>,
    },
    CleanupCompleted {
        result: Box<ObjectStoreResult>,
    },

    // Surface housekeeping.
    DismissError,
    DismissToast,
    TimerTick,
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::SignedIn { .. } => "signed_in",
            Self::SignedOut => "signed_out",
            Self::HomeOpened => "home_opened",
            Self::ProfileSetupOpened => "profile_setup_opened",
            Self::ProfileEditOpened => "profile_edit_opened",
            Self::EquipmentAddOpened => "equipment_add_opened",
            Self::ProfileFieldChanged { .. } => "profile_field_changed",
            Self::EquipmentFieldChanged { .. } => "equipment_field_changed",
            Self::TypeMenuToggled => "type_menu_toggled",
            Self::UnitMenuToggled => "unit_menu_toggled",
            Self::AvatarPickRequested => "avatar_pick_requested",
            Self::AvatarCleared => "avatar_cleared",
            Self::EquipmentPhotosPickRequested => "equipment_photos_pick_requested",
            Self::EquipmentPhotoRemoved { .. } => "equipment_photo_removed",
            Self::MediaPermissionResult { .. } => "media_permission_result",
            Self::ImagesPicked { .. } => "images_picked",
            Self::SubmitRequested => "submit_requested",
            Self::AvatarUploadResponse { .. } => "avatar_upload_response",
            Self::AvatarUrlResponse { .. } => "avatar_url_response",
            Self::ProfilePersistResponse { .. } => "profile_persist_response",
            Self::EquipmentUploadResponse { .. } => "equipment_upload_response",
            Self::EquipmentUrlResponse { .. } => "equipment_url_response",
            Self::EquipmentPersistResponse { .. } => "equipment_persist_response",
            Self::CleanupCompleted { .. } => "cleanup_completed",
            Self::DismissError => "dismiss_error",
            Self::DismissToast => "dismiss_toast",
            Self::TimerTick => "timer_tick",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::HomeOpened
                | Self::ProfileSetupOpened
                | Self::ProfileEditOpened
                | Self::EquipmentAddOpened
                | Self::ProfileFieldChanged { .. }
                | Self::EquipmentFieldChanged { .. }
                | Self::TypeMenuToggled
                | Self::UnitMenuToggled
                | Self::AvatarPickRequested
                | Self::AvatarCleared
                | Self::EquipmentPhotosPickRequested
                | Self::EquipmentPhotoRemoved { .. }
                | Self::SubmitRequested
                | Self::DismissError
                | Self::DismissToast
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhotoPreview {
    pub id: String,
    pub uri: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadProgress {
    pub done: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileFormView {
    pub full_name: String,
    pub mobile_number: String,
    pub village: String,
    pub bio: String,
    pub bio_chars_left: usize,
    pub experience_years: String,
    pub avatar_preview_uri: Option<String>,
    pub current_avatar_url: Option<String>,
    pub has_avatar: bool,
    pub media_permission: PermissionState,
    pub picker_open: bool,
    pub is_uploading: bool,
    pub is_saving: bool,
    pub can_submit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EquipmentFormView {
    pub name: String,
    pub equipment_type: String,
    pub description: String,
    pub rental_price: String,
    pub price_type: String,
    pub availability_start: String,
    pub availability_end: String,
    pub location: String,
    pub type_options: Vec<SelectOption>,
    pub unit_options: Vec<SelectOption>,
    pub type_menu_open: bool,
    pub unit_menu_open: bool,
    pub photos: Vec<PhotoPreview>,
    pub photo_slots_left: usize,
    pub picker_open: bool,
    pub media_permission: PermissionState,
    pub upload_progress: Option<UploadProgress>,
    pub is_uploading: bool,
    pub is_saving: bool,
    pub can_submit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserFacingError {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl From<&AppError> for UserFacingError {
    fn from(error: &AppError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.user_facing_message(),
            retryable: error.is_retryable(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToastView {
    pub message: String,
    pub kind: ToastKind,
}

impl From<&ToastMessage> for ToastView {
    fn from(toast: &ToastMessage) -> Self {
        Self {
            message: toast.message.clone(),
            kind: toast.kind,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScreenView {
    SignedOut,
    Home {
        full_name: Option<String>,
        village: Option<String>,
        has_profile: bool,
    },
    ProfileSetup {
        form: ProfileFormView,
    },
    ProfileEdit {
        form: ProfileFormView,
    },
    EquipmentAdd {
        form: EquipmentFormView,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub screen: ScreenView,
    pub error: Option<UserFacingError>,
    pub toast: Option<ToastView>,
    pub is_busy: bool,
    pub is_signed_in: bool,
    pub user_id: Option<String>,
}

pub mod app {
    use tracing::{debug, error, info, warn};

    use super::{
        capabilities::{MediaOutput, ObjectStoreOutput, PickConfig, PickedImage, StoreOutput},
        object_name_from_public_url, sanitized_public_url, validate, AppError, AppResult,
        Capabilities, EquipmentForm, EquipmentFormView, EquipmentSubmission, EquipmentType,
        ErrorKind, Event, ImageKind, MediaResult, Model, ObjectStoreResult, PendingImage,
        PermissionState, PhotoPreview, PickIntent, PriceUnit, ProfileForm, ProfileFormView,
        ProfileScreen, ProfileSubmission, Route, Screen, ScreenView, SelectOption, SessionContext,
        StoreResult, SubmissionFlow, SubmissionId, SubmitPhase, ToastKind, ToastView, UnixTimeMs,
        UploadProgress, UploadedPhoto, UserFacingError, UserId, ViewModel, AVATAR_BUCKET,
        EQUIPMENT_PHOTO_BUCKET, EQUIPMENT_TABLE, MAX_BIO_CHARS, MAX_EQUIPMENT_PHOTOS,
        PROFILE_TABLE,
    };

    #[derive(Default)]
    pub struct App;

    fn avatar_object_name(user_id: &UserId, now: UnixTimeMs, kind: ImageKind) -> String {
        format!("{}-{}.{}", user_id.as_str(), now.as_millis(), kind.extension())
    }

    fn equipment_object_name(
        user_id: &UserId,
        now: UnixTimeMs,
        index: usize,
        kind: ImageKind,
    ) -> String {
        format!(
            "{}-{}-{}.{}",
            user_id.as_str(),
            now.as_millis(),
            index,
            kind.extension()
        )
    }

    enum SubmitTarget {
        Profile(ProfileScreen, ProfileForm),
        Equipment(EquipmentForm),
        None,
    }

    impl crux_core::App for App {
        type Event = Event;
        type Model = Model;
        type ViewModel = ViewModel;
        type Capabilities = Capabilities;

        fn update(&self, event: Self::Event, model: &mut Self::Model, caps: &Self::Capabilities) {
            model.update_timestamp();
            debug!(event = event.name(), "handling event");

            match event {
                Event::Noop => {}

                Event::SignedIn { user_id, profile } => {
                    let user_id = UserId::new(user_id);
                    let has_profile = profile.is_some();
                    info!(user_id = %user_id, has_profile, "signed in");
                    model.session.user_id = Some(user_id);
                    model.session.profile = profile;
                    model.submission = None;
                    model.clear_error();
                    model.screen = if has_profile {
                        Screen::Home
                    } else {
                        Screen::ProfileSetup(ProfileForm::default())
                    };
                    caps.render.render();
                }

                Event::SignedOut => {
                    info!("signed out");
                    model.session = SessionContext::default();
                    model.submission = None;
                    model.screen = Screen::SignedOut;
                    model.clear_error();
                    model.clear_toast();
                    caps.render.render();
                }

                Event::HomeOpened => {
                    if self.require_signed_in(model, caps) {
                        model.screen = Screen::Home;
                        caps.render.render();
                    }
                }

                Event::ProfileSetupOpened => {
                    if self.require_signed_in(model, caps) {
                        model.screen = Screen::ProfileSetup(ProfileForm::default());
                        caps.render.render();
                    }
                }

                Event::ProfileEditOpened => {
                    if self.require_signed_in(model, caps) {
                        let form = match model.session.profile.as_ref() {
                            Some(record) => ProfileForm::from_record(record),
                            None => {
                                warn!("profile edit opened with no saved profile");
                                ProfileForm::default()
                            }
                        };
                        model.screen = Screen::ProfileEdit(form);
                        caps.render.render();
                    }
                }

                Event::EquipmentAddOpened => {
                    if self.require_signed_in(model, caps) {
                        model.screen = Screen::EquipmentAdd(EquipmentForm::default());
                        caps.render.render();
                    }
                }

                Event::ProfileFieldChanged { field, value } => {
                    if let Some(form) = model.profile_form_mut() {
                        form.set_field(field, value);
                        caps.render.render();
                    } else {
                        debug!(field = ?field, "profile field change outside a profile screen");
                    }
                }

                Event::EquipmentFieldChanged { field, value } => {
                    if let Some(form) = model.equipment_form_mut() {
                        form.set_field(field, value);
                        caps.render.render();
                    } else {
                        debug!(field = ?field, "listing field change outside the listing screen");
                    }
                }

                Event::TypeMenuToggled => {
                    if let Some(form) = model.equipment_form_mut() {
                        form.type_menu_open = !form.type_menu_open;
                        form.unit_menu_open = false;
                        caps.render.render();
                    }
                }

                Event::UnitMenuToggled => {
                    if let Some(form) = model.equipment_form_mut() {
                        form.unit_menu_open = !form.unit_menu_open;
                        form.type_menu_open = false;
                        caps.render.render();
                    }
                }

                Event::AvatarPickRequested => {
                    self.on_pick_requested(model, caps, PickIntent::Avatar);
                }

                Event::AvatarCleared => {
                    if let Some(form) = model.profile_form_mut() {
                        form.avatar = None;
                        form.existing_avatar_url = None;
                        caps.render.render();
                    }
                }

                Event::EquipmentPhotosPickRequested => {
                    self.on_pick_requested(model, caps, PickIntent::EquipmentPhotos);
                }

                Event::EquipmentPhotoRemoved { index } => {
                    if let Some(form) = model.equipment_form_mut() {
                        if form.remove_photo(index) {
                            caps.render.render();
                        } else {
                            warn!(index, "photo removal index out of range");
                        }
                    }
                }

                Event::MediaPermissionResult { intent, result } => {
                    self.on_permission_result(model, caps, intent, *result);
                }

                Event::ImagesPicked { intent, result } => {
                    self.on_images_picked(model, caps, intent, *result);
                }

                Event::SubmitRequested => self.on_submit(model, caps),

                Event::AvatarUploadResponse {
                    submission_id,
                    result,
                } => {
                    self.on_avatar_upload_response(model, caps, &submission_id, *result);
                }

                Event::AvatarUrlResponse {
                    submission_id,
                    result,
                } => {
                    self.on_avatar_url_response(model, caps, &submission_id, *result);
                }

                Event::ProfilePersistResponse {
                    submission_id,
                    result,
                } => {
                    self.on_profile_persist_response(model, caps, &submission_id, *result);
                }

                Event::EquipmentUploadResponse {
                    submission_id,
                    index,
                    result,
                } => {
                    self.on_equipment_upload_response(model, caps, &submission_id, index, *result);
                }

                Event::EquipmentUrlResponse {
                    submission_id,
                    index,
                    result,
                } => {
                    self.on_equipment_url_response(model, caps, &submission_id, index, *result);
                }

                Event::EquipmentPersistResponse {
                    submission_id,
                    result,
                } => {
                    self.on_equipment_persist_response(model, caps, &submission_id, *result);
                }

                Event::CleanupCompleted { result } => match *result {
                    Ok(_) => debug!("storage cleanup finished"),
                    Err(e) => warn!(error = %e, "storage cleanup failed"),
                },

                Event::DismissError => {
                    model.clear_error();
                    caps.render.render();
                }

                Event::DismissToast => {
                    model.clear_toast();
                    caps.render.render();
                }

                Event::TimerTick => {
                    let expired = model
                        .active_toast
                        .as_ref()
                        .is_some_and(|toast| toast.is_expired(model.view_timestamp_ms));
                    if expired {
                        model.clear_toast();
                        caps.render.render();
                    }
                }
            }
        }

        fn view(&self, model: &Self::Model) -> Self::ViewModel {
            let screen = match &model.screen {
                Screen::SignedOut => ScreenView::SignedOut,
                Screen::Home => ScreenView::Home {
                    full_name: model.session.profile.as_ref().map(|p| p.full_name.clone()),
                    village: model.session.profile.as_ref().map(|p| p.village.clone()),
                    has_profile: model.session.profile.is_some(),
                },
                Screen::ProfileSetup(form) => ScreenView::ProfileSetup {
                    form: Self::build_profile_view(model, form),
                },
                Screen::ProfileEdit(form) => ScreenView::ProfileEdit {
                    form: Self::build_profile_view(model, form),
                },
                Screen::EquipmentAdd(form) => ScreenView::EquipmentAdd {
                    form: Self::build_equipment_view(model, form),
                },
            };

            ViewModel {
                screen,
                error: model.active_error.as_ref().map(UserFacingError::from),
                toast: model.active_toast.as_ref().map(ToastView::from),
                is_busy: model.is_submitting(),
                is_signed_in: model.session.is_signed_in(),
                user_id: model
                    .session
                    .user_id
                    .as_ref()
                    .map(|id| id.as_str().to_string()),
            }
        }
    }

    impl App {
        fn require_signed_in(&self, model: &mut Model, caps: &Capabilities) -> bool {
            if model.session.is_signed_in() {
                true
            } else {
                warn!("screen requires a signed-in user");
                model.set_error(AppError::new(
                    ErrorKind::Authentication,
                    "Please sign in to continue",
                ));
                caps.render.render();
                false
            }
        }

        fn on_submit(&self, model: &mut Model, caps: &Capabilities) {
            if model.is_submitting() {
                warn!("submit ignored: a submission is already in flight");
                return;
            }
            model.clear_error();

            let target = match &model.screen {
                Screen::ProfileSetup(form) => {
                    SubmitTarget::Profile(ProfileScreen::Setup, form.clone())
                }
                Screen::ProfileEdit(form) => {
                    SubmitTarget::Profile(ProfileScreen::Edit, form.clone())
                }
                Screen::EquipmentAdd(form) => SubmitTarget::Equipment(form.clone()),
                Screen::SignedOut | Screen::Home => SubmitTarget::None,
            };

            match target {
                SubmitTarget::Profile(screen, form) => {
                    self.begin_profile(model, caps, screen, &form);
                }
                SubmitTarget::Equipment(form) => self.begin_equipment(model, caps, &form),
                SubmitTarget::None => {
                    warn!("submit on a screen without a form");
                    caps.render.render();
                }
            }
        }

        fn begin_profile(
            &self,
            model: &mut Model,
            caps: &Capabilities,
            screen: ProfileScreen,
            form: &ProfileForm,
        ) {
            let Some(user_id) = model.session.user_id.clone() else {
                model.set_error(AppError::new(
                    ErrorKind::Authentication,
                    "Please sign in to continue",
                ));
                caps.render.render();
                return;
            };

            let draft = match validate::profile_draft(form) {
                Ok(draft) => draft,
                Err(e) => {
                    debug!(rule = %e, "profile validation failed");
                    model.set_error(e.into());
                    caps.render.render();
                    return;
                }
            };

            let mut submission = ProfileSubmission {
                id: SubmissionId::generate(),
                user_id,
                screen,
                draft,
                uploaded_path: None,
                avatar_url: None,
                retained_avatar_url: if form.avatar.is_none() {
                    form.existing_avatar_url.clone()
                } else {
                    None
                },
                replaces_avatar_url: if form.avatar.is_some() {
                    form.existing_avatar_url.clone()
                } else {
                    None
                },
                phase: SubmitPhase::Uploading,
            };

            if let Some(image) = form.avatar.clone() {
                let name = avatar_object_name(&submission.user_id, UnixTimeMs::now(), image.kind);
                info!(bucket = AVATAR_BUCKET, name = %name, "uploading avatar");
                let submission_id = submission.id.as_str().to_string();
                caps.object_store.upload(
                    AVATAR_BUCKET,
                    name,
                    image.data,
                    image.kind.mime_type(),
                    move |result| Event::AvatarUploadResponse {
                        submission_id,
                        result: Box::new(result),
                    },
                );
                model.submission = Some(SubmissionFlow::Profile(submission));
            } else {
                submission.phase = SubmitPhase::Persisting;
                match self.send_profile_upsert(caps, &submission) {
                    Ok(()) => model.submission = Some(SubmissionFlow::Profile(submission)),
                    Err(e) => {
                        error!(error = %e, "could not build the profile write");
                        model.set_error(e);
                    }
                }
            }
            caps.render.render();
        }

        fn begin_equipment(&self, model: &mut Model, caps: &Capabilities, form: &EquipmentForm) {
            let Some(user_id) = model.session.user_id.clone() else {
                model.set_error(AppError::new(
                    ErrorKind::Authentication,
                    "Please sign in to continue",
                ));
                caps.render.render();
                return;
            };

            let draft = match validate::equipment_draft(form) {
                Ok(draft) => draft,
                Err(e) => {
                    debug!(rule = %e, "listing validation failed");
                    model.set_error(e.into());
                    caps.render.render();
                    return;
                }
            };

            let mut submission = EquipmentSubmission {
                id: SubmissionId::generate(),
                user_id,
                draft,
                queue: form.photos.iter().cloned().collect(),
                photos_total: form.photos.len(),
                next_index: 0,
                pending_url_path: None,
                uploaded: Vec::new(),
                failed_uploads: 0,
                phase: SubmitPhase::Uploading,
            };

            match self.advance_equipment(caps, &mut submission) {
                Ok(()) => model.submission = Some(SubmissionFlow::Equipment(submission)),
                Err(e) => {
                    error!(error = %e, "could not build the listing write");
                    model.set_error(e);
                }
            }
            caps.render.render();
        }

        fn send_profile_upsert(
            &self,
            caps: &Capabilities,
            submission: &ProfileSubmission,
        ) -> AppResult<()> {
            let avatar_url = submission
                .avatar_url
                .clone()
                .or_else(|| submission.retained_avatar_url.clone());
            let record = submission
                .draft
                .clone()
                .into_record(&submission.user_id, avatar_url);
            let value = serde_json::to_value(&record).map_err(|e| {
                AppError::new(
                    ErrorKind::Serialization,
                    "Could not prepare your profile for saving",
                )
                .with_internal(e.to_string())
            })?;

            info!(table = PROFILE_TABLE, user_id = %submission.user_id, "persisting profile");
            let submission_id = submission.id.as_str().to_string();
            caps.data_store
                .upsert(PROFILE_TABLE, value, move |result| {
                    Event::ProfilePersistResponse {
                        submission_id,
                        result: Box::new(result),
                    }
                });
            Ok(())
        }

        fn send_equipment_insert(
            &self,
            caps: &Capabilities,
            submission: &EquipmentSubmission,
        ) -> AppResult<()> {
            let photo_urls: Vec<String> = submission
                .uploaded
                .iter()
                .map(|photo| photo.url.clone())
                .collect();
            let record = submission
                .draft
                .clone()
                .into_record(&submission.user_id, photo_urls);
            let value = serde_json::to_value(&record).map_err(|e| {
                AppError::new(
                    ErrorKind::Serialization,
                    "Could not prepare your listing for saving",
                )
                .with_internal(e.to_string())
            })?;

            info!(
                table = EQUIPMENT_TABLE,
                photos = submission.uploaded.len(),
                failed_uploads = submission.failed_uploads,
                "persisting listing"
            );
            let submission_id = submission.id.as_str().to_string();
            caps.data_store
                .insert(EQUIPMENT_TABLE, value, move |result| {
                    Event::EquipmentPersistResponse {
                        submission_id,
                        result: Box::new(result),
                    }
                });
            Ok(())
        }

        /// Uploads the next queued photo, or moves on to the insert once the
        /// queue is drained.
        fn advance_equipment(
            &self,
            caps: &Capabilities,
            submission: &mut EquipmentSubmission,
        ) -> AppResult<()> {
            if let Some(image) = submission.queue.pop_front() {
                let index = submission.next_index;
                submission.next_index += 1;
                let name = equipment_object_name(
                    &submission.user_id,
                    UnixTimeMs::now(),
                    index,
                    image.kind,
                );
                info!(bucket = EQUIPMENT_PHOTO_BUCKET, name = %name, index, "uploading listing photo");
                let submission_id = submission.id.as_str().to_string();
                caps.object_store.upload(
                    EQUIPMENT_PHOTO_BUCKET,
                    name,
                    image.data,
                    image.kind.mime_type(),
                    move |result| Event::EquipmentUploadResponse {
                        submission_id,
                        index,
                        result: Box::new(result),
                    },
                );
                return Ok(());
            }

            submission.phase = SubmitPhase::Persisting;
            self.send_equipment_insert(caps, submission)
        }

        fn advance_profile_to_persist(&self, model: &mut Model, caps: &Capabilities) {
            let sent = {
                let Some(SubmissionFlow::Profile(submission)) = model.submission.as_mut() else {
                    return;
                };
                submission.phase = SubmitPhase::Persisting;
                self.send_profile_upsert(caps, submission)
            };
            if let Err(e) = sent {
                error!(error = %e, "could not build the profile write");
                model.set_error(e);
                model.submission = None;
            }
        }

        fn advance_equipment_submission(&self, model: &mut Model, caps: &Capabilities) {
            let sent = {
                let Some(SubmissionFlow::Equipment(submission)) = model.submission.as_mut() else {
                    return;
                };
                self.advance_equipment(caps, submission)
            };
            if let Err(e) = sent {
                error!(error = %e, "could not build the listing write");
                model.set_error(e);
                model.submission = None;
            }
        }

        fn profile_submission_mut<'a>(
            model: &'a mut Model,
            submission_id: &str,
        ) -> Option<&'a mut ProfileSubmission> {
            match model.submission.as_mut() {
                Some(SubmissionFlow::Profile(sub)) if sub.id.as_str() == submission_id => Some(sub),
                _ => None,
            }
        }

        fn equipment_submission_mut<'a>(
            model: &'a mut Model,
            submission_id: &str,
        ) -> Option<&'a mut EquipmentSubmission> {
            match model.submission.as_mut() {
                Some(SubmissionFlow::Equipment(sub)) if sub.id.as_str() == submission_id => {
                    Some(sub)
                }
                _ => None,
            }
        }

        fn on_avatar_upload_response(
            &self,
            model: &mut Model,
            caps: &Capabilities,
            submission_id: &str,
            result: ObjectStoreResult,
        ) {
            let uploaded_path = {
                let Some(submission) = Self::profile_submission_mut(model, submission_id) else {
                    warn!(submission_id, "stale avatar upload response ignored");
                    return;
                };
                match result {
                    Ok(ObjectStoreOutput::Uploaded { path }) => {
                        submission.uploaded_path = Some(path.clone());
                        Some(path)
                    }
                    Ok(other) => {
                        warn!(output = ?other, "unexpected object store output for an upload");
                        None
                    }
                    Err(e) => {
                        warn!(error = %e, "avatar upload failed");
                        None
                    }
                }
            };

            match uploaded_path {
                Some(path) => {
                    let submission_id = submission_id.to_string();
                    caps.object_store
                        .public_url(AVATAR_BUCKET, path, move |result| {
                            Event::AvatarUrlResponse {
                                submission_id,
                                result: Box::new(result),
                            }
                        });
                }
                // Upload failure downgrades to a warning: the profile still
                // saves, with an explicit null avatar.
                None => {
                    model.show_toast(
                        "Couldn't upload your photo. Saving your profile without it.",
                        ToastKind::Warning,
                    );
                    self.advance_profile_to_persist(model, caps);
                }
            }
            caps.render.render();
        }

        fn on_avatar_url_response(
            &self,
            model: &mut Model,
            caps: &Capabilities,
            submission_id: &str,
            result: ObjectStoreResult,
        ) {
            let attached = {
                let Some(submission) = Self::profile_submission_mut(model, submission_id) else {
                    warn!(submission_id, "stale avatar url response ignored");
                    return;
                };
                match result {
                    Ok(ObjectStoreOutput::PublicUrl { url }) => match sanitized_public_url(&url) {
                        Some(url) => {
                            submission.avatar_url = Some(url);
                            true
                        }
                        None => {
                            warn!("unusable public url for the avatar");
                            false
                        }
                    },
                    Ok(other) => {
                        warn!(output = ?other, "unexpected object store output for a url lookup");
                        false
                    }
                    Err(e) => {
                        warn!(error = %e, "avatar url lookup failed");
                        false
                    }
                }
            };

            if !attached {
                model.show_toast(
                    "Couldn't attach your photo. Saving your profile without it.",
                    ToastKind::Warning,
                );
            }
            self.advance_profile_to_persist(model, caps);
            caps.render.render();
        }

        fn on_profile_persist_response(
            &self,
            model: &mut Model,
            caps: &Capabilities,
            submission_id: &str,
            result: StoreResult,
        ) {
            if Self::profile_submission_mut(model, submission_id).is_none() {
                warn!(submission_id, "stale profile persist response ignored");
                return;
            }

            match result {
                Ok(StoreOutput::Written) => {
                    let Some(SubmissionFlow::Profile(submission)) = model.submission.take() else {
                        return;
                    };
                    let avatar_url = submission
                        .avatar_url
                        .clone()
                        .or_else(|| submission.retained_avatar_url.clone());
                    let record = submission
                        .draft
                        .clone()
                        .into_record(&submission.user_id, avatar_url);
                    info!(user_id = %submission.user_id, "profile saved");
                    model.session.profile = Some(record);

                    // A replaced avatar is removed only after the new row is
                    // safely written. Best effort; failures are logged.
                    if submission.uploaded_path.is_some() {
                        if let Some(previous) = submission
                            .replaces_avatar_url
                            .as_deref()
                            .and_then(object_name_from_public_url)
                        {
                            debug!(bucket = AVATAR_BUCKET, object = %previous, "removing the replaced avatar");
                            caps.object_store.remove(AVATAR_BUCKET, vec![previous], |result| {
                                Event::CleanupCompleted {
                                    result: Box::new(result),
                                }
                            });
                        }
                    }

                    match submission.screen {
                        ProfileScreen::Setup => {
                            model.show_toast("Profile saved. Welcome!", ToastKind::Success);
                            model.screen = Screen::Home;
                            caps.nav.replace(Route::Home);
                        }
                        ProfileScreen::Edit => {
                            model.show_toast("Profile updated", ToastKind::Success);
                            model.screen = Screen::Home;
                            caps.nav.back();
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "profile persist failed");
                    model.set_error(AppError::from(e));
                    model.submission = None;
                }
            }
            caps.render.render();
        }

        fn on_equipment_upload_response(
            &self,
            model: &mut Model,
            caps: &Capabilities,
            submission_id: &str,
            index: usize,
            result: ObjectStoreResult,
        ) {
            let failed = {
                let Some(submission) = Self::equipment_submission_mut(model, submission_id) else {
                    warn!(submission_id, index, "stale listing upload response ignored");
                    return;
                };
                match result {
                    Ok(ObjectStoreOutput::Uploaded { path }) => {
                        submission.pending_url_path = Some(path.clone());
                        let submission_id = submission_id.to_string();
                        caps.object_store.public_url(
                            EQUIPMENT_PHOTO_BUCKET,
                            path,
                            move |result| Event::EquipmentUrlResponse {
                                submission_id,
                                index,
                                result: Box::new(result),
                            },
                        );
                        false
                    }
                    Ok(other) => {
                        warn!(output = ?other, index, "unexpected object store output for an upload");
                        submission.failed_uploads += 1;
                        true
                    }
                    Err(e) => {
                        warn!(error = %e, index, "listing photo upload failed");
                        submission.failed_uploads += 1;
                        true
                    }
                }
            };

            // A failed photo is skipped, not fatal: the rest of the queue
            // still uploads and the listing still publishes.
            if failed {
                model.show_toast(
                    "One photo couldn't be uploaded. Continuing without it.",
                    ToastKind::Warning,
                );
                self.advance_equipment_submission(model, caps);
            }
            caps.render.render();
        }

        fn on_equipment_url_response(
            &self,
            model: &mut Model,
            caps: &Capabilities,
            submission_id: &str,
            index: usize,
            result: ObjectStoreResult,
        ) {
            let failed = {
                let Some(submission) = Self::equipment_submission_mut(model, submission_id) else {
                    warn!(submission_id, index, "stale listing url response ignored");
                    return;
                };
                let path = submission.pending_url_path.take();
                match (result, path) {
                    (Ok(ObjectStoreOutput::PublicUrl { url }), Some(path)) => {
                        match sanitized_public_url(&url) {
                            Some(url) => {
                                submission.uploaded.push(UploadedPhoto { path, url });
                                false
                            }
                            None => {
                                warn!(index, "unusable public url for a listing photo");
                                submission.failed_uploads += 1;
                                true
                            }
                        }
                    }
                    (Ok(other), _) => {
                        warn!(output = ?other, index, "unexpected object store output for a url lookup");
                        submission.failed_uploads += 1;
                        true
                    }
                    (Err(e), _) => {
                        warn!(error = %e, index, "listing photo url lookup failed");
                        submission.failed_uploads += 1;
                        true
                    }
                }
            };

            if failed {
                model.show_toast(
                    "One photo couldn't be attached to your listing.",
                    ToastKind::Warning,
                );
            }
            self.advance_equipment_submission(model, caps);
            caps.render.render();
        }

        fn on_equipment_persist_response(
            &self,
            model: &mut Model,
            caps: &Capabilities,
            submission_id: &str,
            result: StoreResult,
        ) {
            if Self::equipment_submission_mut(model, submission_id).is_none() {
                warn!(submission_id, "stale listing persist response ignored");
                return;
            }

            match result {
                Ok(StoreOutput::Written) => {
                    let Some(SubmissionFlow::Equipment(submission)) = model.submission.take()
                    else {
                        return;
                    };
                    info!(
                        user_id = %submission.user_id,
                        photos = submission.uploaded.len(),
                        "listing published"
                    );
                    if submission.failed_uploads > 0 {
                        model.show_toast(
                            "Listing published. Some photos were left out.",
                            ToastKind::Success,
                        );
                    } else {
                        model.show_toast("Listing published", ToastKind::Success);
                    }
                    model.screen = Screen::Home;
                    caps.nav.back();
                }
                Err(e) => {
                    let Some(SubmissionFlow::Equipment(submission)) = model.submission.take()
                    else {
                        return;
                    };
                    // The listing row never landed, so the uploaded photos
                    // are orphans. Remove them; the form keeps its state for
                    // another attempt.
                    if !submission.uploaded.is_empty() {
                        let names: Vec<String> = submission
                            .uploaded
                            .iter()
                            .map(|photo| photo.path.clone())
                            .collect();
                        warn!(count = names.len(), "removing uploaded photos for the failed listing");
                        caps.object_store
                            .remove(EQUIPMENT_PHOTO_BUCKET, names, |result| {
                                Event::CleanupCompleted {
                                    result: Box::new(result),
                                }
                            });
                    }
                    error!(error = %e, "listing persist failed");
                    model.set_error(AppError::from(e));
                }
            }
            caps.render.render();
        }

        fn on_pick_requested(&self, model: &mut Model, caps: &Capabilities, intent: PickIntent) {
            if model.is_submitting() {
                debug!("pick ignored while a submission is in flight");
                return;
            }

            match intent {
                PickIntent::Avatar => {
                    if model.profile_form_mut().is_none() {
                        warn!("avatar pick outside a profile screen");
                        return;
                    }
                }
                PickIntent::EquipmentPhotos => {
                    let full = match &model.screen {
                        Screen::EquipmentAdd(form) => form.photos.len() >= MAX_EQUIPMENT_PHOTOS,
                        _ => {
                            warn!("photo pick outside the listing screen");
                            return;
                        }
                    };
                    if full {
                        model.show_toast(
                            format!("You can attach up to {MAX_EQUIPMENT_PHOTOS} photos"),
                            ToastKind::Info,
                        );
                        caps.render.render();
                        return;
                    }
                }
            }

            match model.media_permission {
                PermissionState::Granted => self.open_picker(model, caps, intent),
                PermissionState::Requesting => debug!("permission request already pending"),
                _ => {
                    model.media_permission = PermissionState::Requesting;
                    caps.media.request_permission(move |result| {
                        Event::MediaPermissionResult {
                            intent,
                            result: Box::new(result),
                        }
                    });
                    caps.render.render();
                }
            }
        }

        fn on_permission_result(
            &self,
            model: &mut Model,
            caps: &Capabilities,
            intent: PickIntent,
            result: MediaResult,
        ) {
            match result {
                Ok(MediaOutput::Permission { status }) => {
                    model.media_permission = PermissionState::from(status);
                    if status.is_granted() {
                        self.open_picker(model, caps, intent);
                    } else {
                        warn!(status = ?status, "photo permission not granted");
                        model.show_toast(
                            "Photo access was declined. You can continue without photos.",
                            ToastKind::Warning,
                        );
                        caps.render.render();
                    }
                }
                Ok(other) => {
                    warn!(output = ?other, "unexpected media output for a permission request");
                    model.media_permission = PermissionState::Unknown;
                    caps.render.render();
                }
                Err(e) => {
                    model.media_permission = PermissionState::Denied;
                    let error = AppError::from(e);
                    warn!(error = %error, "photo permission request failed");
                    model.show_toast(error.user_facing_message(), ToastKind::Warning);
                    caps.render.render();
                }
            }
        }

        fn open_picker(&self, model: &mut Model, caps: &Capabilities, intent: PickIntent) {
            match intent {
                PickIntent::Avatar => {
                    let Some(form) = model.profile_form_mut() else {
                        warn!("avatar pick outside a profile screen");
                        return;
                    };
                    form.picker_open = true;
                    caps.media.pick(PickConfig::single(), move |result| {
                        Event::ImagesPicked {
                            intent: PickIntent::Avatar,
                            result: Box::new(result),
                        }
                    });
                }
                PickIntent::EquipmentPhotos => {
                    let Some(form) = model.equipment_form_mut() else {
                        warn!("photo pick outside the listing screen");
                        return;
                    };
                    let slots = MAX_EQUIPMENT_PHOTOS.saturating_sub(form.photos.len());
                    if slots == 0 {
                        return;
                    }
                    form.picker_open = true;
                    let config = PickConfig::multiple(u32::try_from(slots).unwrap_or(1));
                    caps.media.pick(config, move |result| Event::ImagesPicked {
                        intent: PickIntent::EquipmentPhotos,
                        result: Box::new(result),
                    });
                }
            }
            caps.render.render();
        }

        fn close_picker(&self, model: &mut Model, intent: PickIntent) {
            let flag = match intent {
                PickIntent::Avatar => model.profile_form_mut().map(|form| &mut form.picker_open),
                PickIntent::EquipmentPhotos => {
                    model.equipment_form_mut().map(|form| &mut form.picker_open)
                }
            };
            if let Some(flag) = flag {
                *flag = false;
            }
        }

        fn on_images_picked(
            &self,
            model: &mut Model,
            caps: &Capabilities,
            intent: PickIntent,
            result: MediaResult,
        ) {
            self.close_picker(model, intent);

            match result {
                Ok(MediaOutput::Images { images }) => {
                    info!(count = images.len(), "images picked");
                    self.ingest_images(model, intent, images);
                }
                // Cancel is a plain dismissal: no error, no toast, form as
                // it was.
                Ok(MediaOutput::Cancelled) => debug!("picker dismissed without a selection"),
                Ok(other) => warn!(output = ?other, "unexpected media output for a pick"),
                Err(e) => {
                    let error = AppError::from(e);
                    warn!(error = %error, "image pick failed");
                    model.show_toast(error.user_facing_message(), ToastKind::Error);
                }
            }
            caps.render.render();
        }

        fn ingest_images(&self, model: &mut Model, intent: PickIntent, images: Vec<PickedImage>) {
            match intent {
                PickIntent::Avatar => {
                    let Some(picked) = images.into_iter().next() else {
                        return;
                    };
                    match PendingImage::from_picked(picked) {
                        Ok(image) => {
                            if let Some(form) = model.profile_form_mut() {
                                form.avatar = Some(image);
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "rejected picked avatar");
                            model.show_toast(e.user_facing_message(), ToastKind::Warning);
                        }
                    }
                }
                PickIntent::EquipmentPhotos => {
                    let mut accepted = Vec::new();
                    let mut rejected: Option<AppError> = None;
                    for picked in images {
                        match PendingImage::from_picked(picked) {
                            Ok(image) => accepted.push(image),
                            Err(e) => {
                                warn!(error = %e, "rejected picked photo");
                                rejected.get_or_insert(e);
                            }
                        }
                    }

                    let dropped = {
                        let Some(form) = model.equipment_form_mut() else {
                            return;
                        };
                        form.append_photos(accepted)
                    };
                    if dropped > 0 {
                        model.show_toast(
                            format!("Only {MAX_EQUIPMENT_PHOTOS} photos can be attached"),
                            ToastKind::Info,
                        );
                    }
                    if let Some(e) = rejected {
                        model.show_toast(e.user_facing_message(), ToastKind::Warning);
                    }
                }
            }
        }

        fn submission_flags(model: &Model) -> (bool, bool) {
            match model.submission.as_ref().map(SubmissionFlow::phase) {
                Some(SubmitPhase::Uploading) => (true, false),
                Some(SubmitPhase::Persisting) => (false, true),
                None => (false, false),
            }
        }

        fn build_profile_view(model: &Model, form: &ProfileForm) -> ProfileFormView {
            let (is_uploading, is_saving) = Self::submission_flags(model);
            ProfileFormView {
                full_name: form.full_name.clone(),
                mobile_number: form.mobile_number.clone(),
                village: form.village.clone(),
                bio: form.bio.clone(),
                bio_chars_left: MAX_BIO_CHARS.saturating_sub(form.bio.chars().count()),
                experience_years: form.experience_years.clone(),
                avatar_preview_uri: form.avatar.as_ref().map(|image| image.uri.clone()),
                current_avatar_url: form.existing_avatar_url.clone(),
                has_avatar: form.avatar.is_some() || form.existing_avatar_url.is_some(),
                media_permission: model.media_permission,
                picker_open: form.picker_open,
                is_uploading,
                is_saving,
                can_submit: !model.is_submitting() && validate::profile_draft(form).is_ok(),
            }
        }

        fn build_equipment_view(model: &Model, form: &EquipmentForm) -> EquipmentFormView {
            let (is_uploading, is_saving) = Self::submission_flags(model);
            let upload_progress = match &model.submission {
                Some(SubmissionFlow::Equipment(sub))
                    if sub.phase == SubmitPhase::Uploading && sub.photos_total > 0 =>
                {
                    Some(UploadProgress {
                        done: sub.uploaded.len() + sub.failed_uploads,
                        total: sub.photos_total,
                    })
                }
                _ => None,
            };

            EquipmentFormView {
                name: form.name.clone(),
                equipment_type: form.equipment_type.clone(),
                description: form.description.clone(),
                rental_price: form.rental_price.clone(),
                price_type: form.price_type.clone(),
                availability_start: form.availability_start.clone(),
                availability_end: form.availability_end.clone(),
                location: form.location.clone(),
                type_options: EquipmentType::ALL
                    .iter()
                    .map(|t| SelectOption {
                        value: t.as_str().to_string(),
                        label: t.display_name().to_string(),
                        selected: form.equipment_type.trim() == t.as_str(),
                    })
                    .collect(),
                unit_options: PriceUnit::ALL
                    .iter()
                    .map(|unit| SelectOption {
                        value: unit.as_str().to_string(),
                        label: unit.display_name().to_string(),
                        selected: form.price_type.trim() == unit.as_str(),
                    })
                    .collect(),
                type_menu_open: form.type_menu_open,
                unit_menu_open: form.unit_menu_open,
                photos: form
                    .photos
                    .iter()
                    .map(|photo| PhotoPreview {
                        id: photo.id.clone(),
                        uri: photo.uri.clone(),
                    })
                    .collect(),
                photo_slots_left: MAX_EQUIPMENT_PHOTOS.saturating_sub(form.photos.len()),
                picker_open: form.picker_open,
                media_permission: model.media_permission,
                upload_progress,
                is_uploading,
                is_saving,
                can_submit: !model.is_submitting() && validate::equipment_draft(form).is_ok(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod error_tests {
        use super::*;

        #[test]
        fn validation_messages_pass_through() {
            let err = AppError::new(ErrorKind::Validation, "Village is required");
            assert_eq!(err.user_facing_message(), "Village is required");
            assert!(!err.is_retryable());
        }

        #[test]
        fn persistence_message_is_verbatim_when_present() {
            let err = AppError::new(ErrorKind::Persistence, "row violates policy");
            assert_eq!(err.user_facing_message(), "row violates policy");

            let empty = AppError::new(ErrorKind::Persistence, "");
            assert!(!empty.user_facing_message().is_empty());
        }

        #[test]
        fn internal_detail_never_reaches_the_user() {
            let err = AppError::new(ErrorKind::Network, "request failed")
                .with_internal("connect ETIMEDOUT 10.0.2.2:443");
            assert!(!err.user_facing_message().contains("10.0.2.2"));
            assert!(format!("{err}").contains("10.0.2.2"));
        }

        #[test]
        fn severity_follows_kind_unless_overridden() {
            let err = AppError::new(ErrorKind::Timeout, "slow");
            assert_eq!(err.severity, ErrorSeverity::Transient);

            let fatal = AppError::new(ErrorKind::Timeout, "slow").with_severity(ErrorSeverity::Fatal);
            assert_eq!(fatal.severity, ErrorSeverity::Fatal);
        }

        #[test]
        fn codes_are_stable_identifiers() {
            assert_eq!(ErrorKind::Validation.code(), "VALIDATION_ERROR");
            assert_eq!(ErrorKind::Persistence.code(), "PERSISTENCE_ERROR");
            assert_eq!(ErrorKind::MediaPermissionDenied.code(), "MEDIA_PERMISSION_DENIED");
        }
    }

    mod record_tests {
        use super::*;

        #[test]
        fn profile_record_uses_the_contract_field_names() {
            let record = ProfileRecord {
                id: "user-1".into(),
                full_name: "Ravi Kumar".into(),
                mobile_number: "9876543210".into(),
                village: "Rampur".into(),
                bio: String::new(),
                avatar_url: None,
                experience_years: 4,
            };
            let value = serde_json::to_value(&record).unwrap();
            let object = value.as_object().unwrap();
            for key in [
                "id",
                "full_name",
                "mobile_number",
                "village",
                "bio",
                "avatar_url",
                "experience_years",
            ] {
                assert!(object.contains_key(key), "missing key {key}");
            }
        }

        #[test]
        fn absent_avatar_serializes_as_explicit_null() {
            let record = ProfileRecord {
                id: "user-1".into(),
                full_name: "Ravi Kumar".into(),
                mobile_number: "9876543210".into(),
                village: "Rampur".into(),
                bio: String::new(),
                avatar_url: None,
                experience_years: 0,
            };
            let value = serde_json::to_value(&record).unwrap();
            assert!(value.as_object().unwrap().contains_key("avatar_url"));
            assert!(value["avatar_url"].is_null());
        }

        #[test]
        fn equipment_record_uses_the_contract_field_names() {
            let record = EquipmentRecord {
                owner_id: "user-1".into(),
                name: "Mahindra 575 DI".into(),
                equipment_type: EquipmentType::Tractor,
                description: "45 HP".into(),
                photo_urls: vec!["https://cdn.example.com/a.jpg".into()],
                rental_price: 500.0,
                price_type: PriceUnit::PerDay,
                availability_start: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
                availability_end: NaiveDate::from_ymd_opt(2026, 11, 30).unwrap(),
                location: "Rampur".into(),
                status: ListingStatus::Available,
            };
            let value = serde_json::to_value(&record).unwrap();
            let object = value.as_object().unwrap();
            for key in [
                "owner_id",
                "name",
                "equipment_type",
                "description",
                "photo_urls",
                "rental_price",
                "price_type",
                "availability_start",
                "availability_end",
                "location",
                "status",
            ] {
                assert!(object.contains_key(key), "missing key {key}");
            }
            assert_eq!(value["equipment_type"], "tractor");
            assert_eq!(value["price_type"], "per_day");
            assert_eq!(value["availability_start"], "2026-09-01");
            assert_eq!(value["availability_end"], "2026-11-30");
            assert_eq!(value["status"], "available");
        }
    }

    mod enum_tests {
        use super::*;

        #[test]
        fn equipment_type_round_trips_wire_strings() {
            for t in EquipmentType::ALL {
                assert_eq!(EquipmentType::from_str(t.as_str()), Some(t));
            }
        }

        #[test]
        fn equipment_type_accepts_common_aliases() {
            assert_eq!(EquipmentType::from_str("Tractor"), Some(EquipmentType::Tractor));
            assert_eq!(EquipmentType::from_str("water pump"), Some(EquipmentType::WaterPump));
            assert_eq!(EquipmentType::from_str("combine"), Some(EquipmentType::Harvester));
            assert_eq!(EquipmentType::from_str("trolley"), Some(EquipmentType::Trailer));
            assert_eq!(EquipmentType::from_str("spaceship"), None);
        }

        #[test]
        fn price_unit_is_a_closed_set() {
            assert_eq!(PriceUnit::from_str("per_hour"), Some(PriceUnit::PerHour));
            assert_eq!(PriceUnit::from_str("daily"), Some(PriceUnit::PerDay));
            assert_eq!(PriceUnit::from_str("per_week"), None);
            assert_eq!(PriceUnit::ALL.len(), 2);
        }

        #[test]
        fn routes_map_to_paths() {
            assert_eq!(Route::Home.as_path(), "/");
            assert_eq!(Route::ProfileSetup.as_path(), "/profile/setup");
            assert_eq!(Route::EquipmentAdd.as_path(), "/equipment/add");
        }
    }

    mod image_tests {
        use super::*;

        fn picked(data: Vec<u8>, mime: Option<&str>) -> PickedImage {
            PickedImage {
                uri: "file:///tmp/pick.img".into(),
                data,
                mime_type: mime.map(String::from),
            }
        }

        #[test]
        fn jpeg_and_png_magic_bytes_are_recognized() {
            let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
            assert_eq!(ImageKind::from_magic_bytes(&jpeg), Some(ImageKind::Jpeg));

            let png = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00];
            assert_eq!(ImageKind::from_magic_bytes(&png), Some(ImageKind::Png));
        }

        #[test]
        fn webp_and_heic_magic_bytes_are_recognized() {
            let mut webp = Vec::new();
            webp.extend_from_slice(b"RIFF");
            webp.extend_from_slice(&[0, 0, 0, 0]);
            webp.extend_from_slice(b"WEBP");
            assert_eq!(ImageKind::from_magic_bytes(&webp), Some(ImageKind::Webp));

            let mut heic = vec![0, 0, 0, 24];
            heic.extend_from_slice(b"ftyp");
            heic.extend_from_slice(b"heic");
            assert_eq!(ImageKind::from_magic_bytes(&heic), Some(ImageKind::Heic));
        }

        #[test]
        fn garbage_is_not_an_image() {
            assert_eq!(ImageKind::from_magic_bytes(b"hello world"), None);
            assert_eq!(ImageKind::from_magic_bytes(&[]), None);
        }

        #[test]
        fn empty_picks_are_rejected() {
            let err = PendingImage::from_picked(picked(vec![], None)).unwrap_err();
            assert_eq!(err.kind, ErrorKind::MediaPicker);
        }

        #[test]
        fn oversized_picks_are_rejected() {
            let mut data = vec![0xFF, 0xD8, 0xFF];
            data.resize(MAX_IMAGE_BYTES + 1, 0);
            let err = PendingImage::from_picked(picked(data, None)).unwrap_err();
            assert_eq!(err.kind, ErrorKind::ImageTooLarge);
        }

        #[test]
        fn mime_type_is_the_fallback_not_the_authority() {
            // Sniffable JPEG bytes win over a wrong shell MIME type.
            let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0];
            let image = PendingImage::from_picked(picked(jpeg, Some("image/png"))).unwrap();
            assert_eq!(image.kind, ImageKind::Jpeg);

            // Unsniffable bytes fall back to the reported type.
            let blob = vec![0x00, 0x01, 0x02, 0x03];
            let image = PendingImage::from_picked(picked(blob.clone(), Some("image/png"))).unwrap();
            assert_eq!(image.kind, ImageKind::Png);

            let err = PendingImage::from_picked(picked(blob, None)).unwrap_err();
            assert_eq!(err.kind, ErrorKind::ImageFormatUnsupported);
        }
    }

    mod form_tests {
        use super::*;

        fn jpeg_image(id: &str) -> PendingImage {
            PendingImage {
                id: id.into(),
                uri: format!("file:///tmp/{id}.jpg"),
                data: vec![0xFF, 0xD8, 0xFF, 0xE0],
                kind: ImageKind::Jpeg,
            }
        }

        #[test]
        fn bio_is_capped_at_input_time() {
            let mut form = ProfileForm::default();
            form.set_field(ProfileField::Bio, "x".repeat(MAX_BIO_CHARS + 50));
            assert_eq!(form.bio.chars().count(), MAX_BIO_CHARS);
        }

        #[test]
        fn bio_cap_respects_multibyte_boundaries() {
            let mut form = ProfileForm::default();
            let long = "नमस्ते".repeat(200);
            form.set_field(ProfileField::Bio, long);
            assert_eq!(form.bio.chars().count(), MAX_BIO_CHARS);
        }

        #[test]
        fn selecting_a_type_closes_the_menu() {
            let mut form = EquipmentForm::default();
            form.type_menu_open = true;
            form.set_field(EquipmentField::EquipmentType, "tractor".into());
            assert!(!form.type_menu_open);
            assert_eq!(form.equipment_type, "tractor");
        }

        #[test]
        fn photos_append_in_order_up_to_the_cap() {
            let mut form = EquipmentForm::default();
            let dropped = form.append_photos(vec![jpeg_image("a"), jpeg_image("b")]);
            assert_eq!(dropped, 0);
            let dropped = form.append_photos(vec![
                jpeg_image("c"),
                jpeg_image("d"),
                jpeg_image("e"),
                jpeg_image("f"),
            ]);
            assert_eq!(dropped, 1);
            let ids: Vec<&str> = form.photos.iter().map(|p| p.id.as_str()).collect();
            assert_eq!(ids, ["a", "b", "c", "d", "e"]);
        }

        #[test]
        fn photo_removal_is_bounds_checked() {
            let mut form = EquipmentForm::default();
            form.append_photos(vec![jpeg_image("a"), jpeg_image("b")]);
            assert!(form.remove_photo(0));
            assert_eq!(form.photos.len(), 1);
            assert_eq!(form.photos[0].id, "b");
            assert!(!form.remove_photo(5));
        }

        #[test]
        fn edit_form_prefills_from_the_saved_record() {
            let record = ProfileRecord {
                id: "user-1".into(),
                full_name: "Ravi Kumar".into(),
                mobile_number: "9876543210".into(),
                village: "Rampur".into(),
                bio: "Tractor owner".into(),
                avatar_url: Some("https://cdn.example.com/avatars/user-1.jpg".into()),
                experience_years: 8,
            };
            let form = ProfileForm::from_record(&record);
            assert_eq!(form.full_name, "Ravi Kumar");
            assert_eq!(form.experience_years, "8");
            assert_eq!(
                form.existing_avatar_url.as_deref(),
                Some("https://cdn.example.com/avatars/user-1.jpg")
            );
            assert!(form.avatar.is_none());
        }
    }

    mod url_tests {
        use super::*;

        #[test]
        fn object_name_comes_from_the_last_segment() {
            assert_eq!(
                object_name_from_public_url(
                    "https://cdn.example.com/storage/avatars/user-1-1700000000000.jpg"
                )
                .as_deref(),
                Some("user-1-1700000000000.jpg")
            );
        }

        #[test]
        fn unusable_urls_yield_nothing() {
            assert_eq!(object_name_from_public_url("not a url"), None);
            assert_eq!(object_name_from_public_url("https://cdn.example.com/"), None);
        }

        #[test]
        fn only_http_schemes_pass_sanitization() {
            assert!(sanitized_public_url("https://cdn.example.com/a/b.jpg").is_some());
            assert!(sanitized_public_url("http://cdn.example.com/a/b.jpg").is_some());
            assert_eq!(sanitized_public_url("javascript:alert(1)"), None);
            assert_eq!(sanitized_public_url("file:///etc/passwd"), None);
            assert_eq!(sanitized_public_url("b.jpg"), None);
        }
    }

    mod session_tests {
        use super::*;

        #[test]
        fn session_lifecycle() {
            let mut session = SessionContext::default();
            assert!(!session.is_signed_in());

            session.user_id = Some(UserId::new("user-1"));
            assert!(session.is_signed_in());
            assert!(session.profile.is_none());

            session = SessionContext::default();
            assert!(!session.is_signed_in());
        }
    }

    mod toast_tests {
        use super::*;

        #[test]
        fn toasts_expire_after_their_duration() {
            let toast = ToastMessage::new("saved", ToastKind::Success);
            let created = toast.created_at_ms;
            assert!(!toast.is_expired(created));
            assert!(!toast.is_expired(created + toast.duration_ms - 1));
            assert!(toast.is_expired(created + toast.duration_ms));
        }

        #[test]
        fn durations_scale_with_kind() {
            assert!(ToastKind::Error.display_duration_ms() > ToastKind::Success.display_duration_ms());
        }
    }

    mod event_tests {
        use super::*;

        #[test]
        fn names_are_stable() {
            assert_eq!(Event::SubmitRequested.name(), "submit_requested");
            assert_eq!(Event::TimerTick.name(), "timer_tick");
        }

        #[test]
        fn capability_responses_are_not_user_initiated() {
            assert!(Event::SubmitRequested.is_user_initiated());
            assert!(Event::AvatarPickRequested.is_user_initiated());
            assert!(!Event::TimerTick.is_user_initiated());
            assert!(!Event::Noop.is_user_initiated());
            assert!(!Event::SignedOut.is_user_initiated());
        }
    }

    mod time_tests {
        use super::*;

        #[test]
        fn elapsed_is_saturating() {
            let earlier = UnixTimeMs(1_000);
            let later = UnixTimeMs(4_500);
            assert_eq!(later.elapsed_since(earlier), 3_500);
            assert_eq!(earlier.elapsed_since(later), 0);
        }

        #[test]
        fn seconds_truncate_milliseconds() {
            assert_eq!(UnixTimeMs(1999).as_secs(), 1);
        }
    }
}
