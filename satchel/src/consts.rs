pub const READ_FILE: &str = "read file";
pub const WRITE_FILE: &str = "write file";
pub const REMOVE_FILE: &str = "remove file";
pub const CREATE_FOLDER: &str = "create folder";
pub const REMOVE_FOLDER: &str = "remove folder";
pub const REMOVE_CONTENTS: &str = "remove contents from";
pub const LIST_FOLDER: &str = "list folder";
pub const RESOLVE_PATH: &str = "resolve path";

pub const ADD_ENTRY: &str = "add";
pub const UPDATE_ENTRY: &str = "update";
pub const REMOVE_ENTRY: &str = "remove from";
pub const COMPOSE_KEY: &str = "compose key";
pub const COMPOSE_NAME: &str = "compose name";

pub const KEYS_NAMES_NOT_SET: &str = "key/name functions not set";
