/// Behaviour of a [`File`](crate::File) or [`Folder`](crate::Folder). Files and sub-folders
/// created from a folder start from the folder's settings.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Human-readable, indented file contents.
    pub pretty_format: bool,
    /// Append the codec extension to file names.
    pub decorate_names: bool,
    /// Recovering a missing file returns a default value instead of failing.
    pub create_default: bool,
    /// Resolve relative locations against the current directory when created.
    pub make_absolute: bool,
    /// Create missing folders.
    pub auto_create: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            pretty_format: true,
            decorate_names: true,
            create_default: false,
            make_absolute: true,
            auto_create: true,
        }
    }
}

impl Settings {
    pub fn pretty_format(mut self, pretty_format: bool) -> Self {
        self.pretty_format = pretty_format;
        self
    }

    pub fn decorate_names(mut self, decorate_names: bool) -> Self {
        self.decorate_names = decorate_names;
        self
    }

    pub fn create_default(mut self, create_default: bool) -> Self {
        self.create_default = create_default;
        self
    }

    pub fn make_absolute(mut self, make_absolute: bool) -> Self {
        self.make_absolute = make_absolute;
        self
    }

    pub fn auto_create(mut self, auto_create: bool) -> Self {
        self.auto_create = auto_create;
        self
    }
}
