use crate::codec::{Codec, RonCodec};
use crate::consts::{CREATE_FOLDER, READ_FILE, REMOVE_FILE, RESOLVE_PATH, WRITE_FILE};
use crate::error::FileError;
use crate::settings::Settings;
use log::{trace, warn};
use satchel_base::{Message, Registry, TypeExpr, Value, VersionTag};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Called with a decoded value and the older version it was stored at. Returns the value
/// promoted to the current version, or `None` to keep the decoded one.
pub type Upgrade<'a> = &'a mut dyn FnMut(&Value, VersionTag) -> Option<Value>;

/// Per-call overrides for [`File::store`].
#[derive(Clone, Copy, Debug, Default)]
pub struct StoreOptions<'a> {
    /// Write an older version of the record, limited to the fields it had then.
    pub as_version: Option<VersionTag>,
    /// Write under another name in the same folder.
    pub as_name: Option<&'a str>,
    /// Write into another folder.
    pub as_path: Option<&'a Path>,
}

/// A single value of a fixed type, stored at a named location.
pub struct File<C: Codec = RonCodec> {
    folder: PathBuf,
    name: PathBuf,
    te: TypeExpr,
    registry: Arc<Registry>,
    settings: Settings,
    codec: C,
}

pub(crate) fn resolve(path: &Path, settings: &Settings) -> Result<PathBuf, FileError> {
    if !settings.make_absolute || path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| FileError::from_io(e, RESOLVE_PATH, path))?;
    Ok(cwd.join(path))
}

pub(crate) fn create_parent(target: &Path) -> Result<(), FileError> {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| FileError::from_io(e, CREATE_FOLDER, parent))
        }
        _ => Ok(()),
    }
}

impl File<RonCodec> {
    /// File holding a `te` at `name`, with default settings.
    pub fn new(name: impl AsRef<Path>, te: TypeExpr, registry: Arc<Registry>) -> Result<Self, FileError> {
        File::with_settings(name, te, registry, Settings::default())
    }

    pub fn message<M: Message>(name: impl AsRef<Path>, registry: Arc<Registry>) -> Result<Self, FileError> {
        File::new(name, M::type_expr(), registry)
    }
}

impl<C: Codec> File<C> {
    pub fn with_settings(
        name: impl AsRef<Path>,
        te: TypeExpr,
        registry: Arc<Registry>,
        settings: Settings,
    ) -> Result<Self, FileError> {
        let name = name.as_ref();
        let Some(file_name) = name.file_name() else {
            return Err(FileError::failure(RESOLVE_PATH, name, "no file name"));
        };
        let folder = name.parent().unwrap_or(Path::new(""));
        Ok(File {
            folder: resolve(folder, &settings)?,
            name: PathBuf::from(file_name),
            te,
            registry,
            settings,
            codec: C::with_settings(&settings),
        })
    }

    pub fn type_expr(&self) -> &TypeExpr {
        &self.te
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Decorated location on disk.
    pub fn full_path(&self) -> PathBuf {
        self.codec.full_name(&self.folder.join(&self.name))
    }

    fn target(&self, as_name: Option<&str>, as_path: Option<&Path>) -> PathBuf {
        let folder = as_path.unwrap_or(&self.folder);
        let name = as_name.map(Path::new).unwrap_or(&self.name);
        self.codec.full_name(&folder.join(name))
    }

    /// Encode `value` and write it out, replacing any previous contents.
    pub fn store(&self, value: &Value, options: StoreOptions<'_>) -> Result<(), FileError> {
        let target = self.target(options.as_name, options.as_path);
        let text = self
            .codec
            .encode(value, &self.te, options.as_version, &self.registry)
            .map_err(|source| FileError::Encoding {
                path: target.clone(),
                source,
            })?;
        if self.settings.auto_create {
            create_parent(&target)?;
        }
        fs::write(&target, text).map_err(|e| FileError::from_io(e, WRITE_FILE, &target))?;
        trace!("stored {}", target.display());
        Ok(())
    }

    /// Read and decode the stored value.
    ///
    /// When the data is behind the current version and `upgrade` promotes it, the promoted
    /// value is returned, and written back at the current version if `migrate` is set. The
    /// version returned is the one found on disk.
    pub fn recover(
        &self,
        upgrade: Option<Upgrade<'_>>,
        migrate: bool,
    ) -> Result<(Value, Option<VersionTag>), FileError> {
        let target = self.full_path();
        let text = match fs::read_to_string(&target) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound && self.settings.create_default => {
                trace!("no {}, recovered a default", target.display());
                return Ok((self.registry.make(&self.te), None));
            }
            Err(e) => return Err(FileError::from_io(e, READ_FILE, &target)),
        };
        let (value, version) = self
            .codec
            .decode(&text, &self.te, &self.registry)
            .map_err(|source| FileError::Decoding {
                path: target.clone(),
                source,
            })?;
        trace!("recovered {}", target.display());

        let (Some(upgrade), Some(tag)) = (upgrade, version) else {
            return Ok((value, version));
        };
        let Some(promoted) = upgrade(&value, tag) else {
            return Ok((value, version));
        };
        if migrate {
            warn!("migrating {} from version {tag}", target.display());
            self.store(&promoted, StoreOptions::default())?;
        }
        Ok((promoted, version))
    }

    pub fn store_message<M: Message>(&self, message: &M) -> Result<(), FileError> {
        self.store(&message.to_value(), StoreOptions::default())
    }

    pub fn recover_message<M: Message>(&self) -> Result<(M, Option<VersionTag>), FileError> {
        let (value, version) = self.recover(None, false)?;
        let message = M::from_value(value).map_err(|e| FileError::Decoding {
            path: self.full_path(),
            source: e.into(),
        })?;
        Ok((message, version))
    }

    pub fn exists(&self) -> bool {
        self.full_path().is_file()
    }

    pub fn remove(&self) -> Result<(), FileError> {
        let target = self.full_path();
        fs::remove_file(&target).map_err(|e| FileError::from_io(e, REMOVE_FILE, &target))
    }
}
