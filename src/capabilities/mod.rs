mod data_store;
mod media;
mod nav;
mod object_store;

pub use self::data_store::{DataStore, StoreError, StoreOperation, StoreOutput, StoreResult};
pub use self::media::{
    MediaError, MediaOperation, MediaOutput, MediaPermission, MediaPicker, MediaResult, PickConfig,
    PickedImage, DEFAULT_PICK_QUALITY,
};
pub use self::nav::{NavOperation, Navigator};
pub use self::object_store::{
    ObjectStore, ObjectStoreError, ObjectStoreOperation, ObjectStoreOutput, ObjectStoreResult,
};

pub use crux_core::render::Render;

use crate::{App, Event};

pub type AppDataStore = DataStore<Event>;
pub type AppObjectStore = ObjectStore<Event>;
pub type AppMediaPicker = MediaPicker<Event>;
pub type AppNavigator = Navigator<Event>;
pub type AppRender = Render<Event>;

// The Effect derive names each variant after the field's type name, so the
// picker and navigator are declared through these aliases to get the
// `Effect::Media` / `Effect::Nav` variants the rest of the crate relies on.
type Media<E> = MediaPicker<E>;
type Nav<E> = Navigator<E>;

#[derive(crux_macros::Effect)]
#[effect(app = "App")]
pub struct Capabilities {
    pub data_store: DataStore<Event>,
    pub object_store: ObjectStore<Event>,
    pub media: Media<Event>,
    pub nav: Nav<Event>,
    pub render: Render<Event>,
}
