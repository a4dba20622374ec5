pub mod codec;
pub mod consts;
pub mod error;
pub mod file;
pub mod folder;
pub mod settings;
mod word;

pub use codec::{decorate, peek_version, Codec, RonCodec};
pub use error::{CodecError, FileError};
pub use file::{File, StoreOptions, Upgrade};
pub use folder::{remove_contents, remove_folder, shape_of_folder, Folder, KeysNames};
pub use settings::Settings;

pub use satchel_base::*;
pub use satchel_derive::{Enumeration, Message};
