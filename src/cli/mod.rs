mod commands;
mod handlers;

pub use commands::{Cli, Commands, Remote};
pub use handlers::{
    handle_add, handle_attach, handle_delete, handle_edit, handle_favorite, handle_get,
    handle_list, handle_serve, handle_token,
};
