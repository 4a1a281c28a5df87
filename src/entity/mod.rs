mod note;

pub use note::{CreateNote, NewNote, Note, NoteType, NoteUpdate};
