mod images;
mod note_store;

pub use images::{ImageStore, StoredImage};
pub use note_store::NoteStore;
