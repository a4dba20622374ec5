use crate::codec::{Codec, RonCodec};
use crate::consts::{
    ADD_ENTRY, COMPOSE_KEY, COMPOSE_NAME, CREATE_FOLDER, KEYS_NAMES_NOT_SET, LIST_FOLDER, REMOVE_CONTENTS,
    REMOVE_ENTRY, REMOVE_FILE, REMOVE_FOLDER, RESOLVE_PATH, UPDATE_ENTRY,
};
use crate::error::FileError;
use crate::file::{resolve, File, StoreOptions, Upgrade};
use crate::settings::Settings;
use log::{debug, trace, warn};
use regex::Regex;
use satchel_base::{Registry, TypeExpr, Value, VersionTag};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type KeyFn<K> = dyn Fn(&Value) -> Option<K> + Send + Sync;
type NameFn = dyn Fn(&Value) -> Option<String> + Send + Sync;

/// How the entries of a [`Folder`] are identified: a key for the in-memory table and a file
/// name, both taken from the value itself.
pub struct KeysNames<K> {
    key: Arc<KeyFn<K>>,
    name: Arc<NameFn>,
}

impl<K> Clone for KeysNames<K> {
    fn clone(&self) -> Self {
        KeysNames {
            key: self.key.clone(),
            name: self.name.clone(),
        }
    }
}

impl<K> KeysNames<K> {
    pub fn new(
        key: impl Fn(&Value) -> Option<K> + Send + Sync + 'static,
        name: impl Fn(&Value) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        KeysNames {
            key: Arc::new(key),
            name: Arc::new(name),
        }
    }
}

/// A directory of values of one type, one file each.
///
/// [`Folder::store`] is not atomic across files: a failure part way leaves the entries
/// written so far in place and stale files undeleted.
pub struct Folder<K = String, C: Codec = RonCodec> {
    path: PathBuf,
    te: Option<TypeExpr>,
    registry: Arc<Registry>,
    settings: Settings,
    keys_names: Option<KeysNames<K>>,
    re: Option<Regex>,
    codec: C,
}

impl<K> Folder<K, RonCodec> {
    pub fn new(path: impl AsRef<Path>, te: Option<TypeExpr>, registry: Arc<Registry>) -> Result<Self, FileError> {
        Folder::with_settings(path, te, registry, Settings::default())
    }
}

impl<K, C: Codec> Folder<K, C> {
    pub fn with_settings(
        path: impl AsRef<Path>,
        te: Option<TypeExpr>,
        registry: Arc<Registry>,
        settings: Settings,
    ) -> Result<Self, FileError> {
        let path = resolve(path.as_ref(), &settings)?;
        if settings.auto_create {
            fs::create_dir_all(&path).map_err(|e| FileError::from_io(e, CREATE_FOLDER, &path))?;
        }
        Ok(Folder {
            path,
            te,
            registry,
            settings,
            keys_names: None,
            re: None,
            codec: C::with_settings(&settings),
        })
    }

    pub fn keys_names(mut self, keys_names: KeysNames<K>) -> Self {
        self.keys_names = Some(keys_names);
        self
    }

    /// Only consider entries whose undecorated name matches `pattern` in full.
    pub fn filter(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.re = Some(Regex::new(&format!("^(?:{pattern})$"))?);
        Ok(self)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Undecorated names of the entries in this folder, sorted.
    pub fn matching(&self) -> Result<Vec<String>, FileError> {
        let listing = fs::read_dir(&self.path).map_err(|e| FileError::from_io(e, LIST_FOLDER, &self.path))?;
        let suffix = format!(".{}", C::EXTENSION);
        let mut names = Vec::new();
        for entry in listing {
            let entry = entry.map_err(|e| FileError::from_io(e, LIST_FOLDER, &self.path))?;
            if !entry.path().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let name = if self.settings.decorate_names {
                match name.strip_suffix(&suffix) {
                    Some(bare) => bare.to_string(),
                    None => continue,
                }
            } else {
                name
            };
            if self.re.as_ref().is_some_and(|re| !re.is_match(&name)) {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Full paths of the entries in this folder.
    pub fn each(&self) -> Result<Vec<PathBuf>, FileError> {
        let names = self.matching()?;
        Ok(names
            .iter()
            .map(|name| self.codec.full_name(&self.path.join(name)))
            .collect())
    }

    /// An entry of this folder, typed `te` or the folder's own type.
    pub fn file(&self, name: &str, te: Option<TypeExpr>) -> Result<File<C>, FileError> {
        let Some(te) = te.or_else(|| self.te.clone()) else {
            return Err(FileError::failure(RESOLVE_PATH, self.path.join(name), "no type for entry"));
        };
        File::with_settings(self.path.join(name), te, self.registry.clone(), self.settings)
    }

    /// A sub-folder sharing this folder's settings and keys.
    pub fn folder(&self, name: &str, te: Option<TypeExpr>) -> Result<Folder<K, C>, FileError> {
        let mut folder = Folder::with_settings(
            self.path.join(name),
            te.or_else(|| self.te.clone()),
            self.registry.clone(),
            self.settings,
        )?;
        folder.keys_names = self.keys_names.clone();
        Ok(folder)
    }

    fn keys(&self) -> Result<&KeysNames<K>, FileError> {
        self.keys_names
            .as_ref()
            .ok_or_else(|| FileError::failure(COMPOSE_KEY, &self.path, KEYS_NAMES_NOT_SET))
    }

    pub fn key(&self, value: &Value) -> Result<K, FileError> {
        let keys = self.keys()?;
        (keys.key)(value).ok_or_else(|| FileError::failure(COMPOSE_KEY, &self.path, value.describe()))
    }

    pub fn name(&self, value: &Value) -> Result<String, FileError> {
        let keys = self.keys()?;
        (keys.name)(value).ok_or_else(|| FileError::failure(COMPOSE_NAME, &self.path, value.describe()))
    }

    /// Write every value and delete the entries no value was written to.
    pub fn store<'v>(&self, values: impl IntoIterator<Item = &'v Value>) -> Result<(), FileError> {
        let mut written = BTreeSet::new();
        for value in values {
            let name = self.name(value)?;
            self.file(&name, None)?.store(value, StoreOptions::default())?;
            written.insert(name);
        }
        for stale in self.matching()?.into_iter().filter(|n| !written.contains(n)) {
            debug!("removing stale entry {stale} from {}", self.path.display());
            if let Err(e) = self.erase(&stale) {
                warn!("{e}");
            }
        }
        Ok(())
    }

    /// Decode every entry, with the key of each when keys are set.
    pub fn recover(
        &self,
        mut upgrade: Option<Upgrade<'_>>,
        migrate: bool,
    ) -> Result<Vec<(Option<K>, Value, Option<VersionTag>)>, FileError> {
        let mut recovered = Vec::new();
        for name in self.matching()? {
            let file = self.file(&name, None)?;
            let upgrade = match upgrade {
                Some(ref mut u) => Some(&mut **u as Upgrade<'_>),
                None => None,
            };
            let (value, version) = file.recover(upgrade, migrate)?;
            let key = match &self.keys_names {
                Some(keys) => (keys.key)(&value),
                None => None,
            };
            recovered.push((key, value, version));
        }
        Ok(recovered)
    }

    /// Remove the entry called `name`.
    pub fn erase(&self, name: &str) -> Result<(), FileError> {
        let target = self.codec.full_name(&self.path.join(name));
        fs::remove_file(&target).map_err(|e| FileError::from_io(e, REMOVE_FILE, &target))?;
        trace!("erased {}", target.display());
        Ok(())
    }

    pub fn exists(&self, name: &str) -> bool {
        self.codec.full_name(&self.path.join(name)).is_file()
    }
}

impl<K: Eq + Hash, C: Codec> Folder<K, C> {
    /// Store a value that is not yet in `values` and record it there.
    pub fn add(&self, values: &mut HashMap<K, Value>, value: Value) -> Result<(), FileError> {
        let key = self.key(&value)?;
        let name = self.name(&value)?;
        if values.contains_key(&key) {
            return Err(FileError::AlreadyExists {
                what: ADD_ENTRY,
                path: self.path.join(&name),
                note: "entry already present".into(),
            });
        }
        self.file(&name, None)?.store(&value, StoreOptions::default())?;
        values.insert(key, value);
        Ok(())
    }

    /// Store a new version of a value already in `values`.
    pub fn update(&self, values: &mut HashMap<K, Value>, value: Value) -> Result<(), FileError> {
        let key = self.key(&value)?;
        let name = self.name(&value)?;
        if !values.contains_key(&key) {
            return Err(FileError::NotFound {
                what: UPDATE_ENTRY,
                path: self.path.join(&name),
                note: "not an existing entry".into(),
            });
        }
        self.file(&name, None)?.store(&value, StoreOptions::default())?;
        values.insert(key, value);
        Ok(())
    }

    /// Delete the entry of `value` from disk and from `values`.
    pub fn remove(&self, values: &mut HashMap<K, Value>, value: &Value) -> Result<(), FileError> {
        let key = self.key(value)?;
        let name = self.name(value)?;
        if !values.contains_key(&key) {
            return Err(FileError::NotFound {
                what: REMOVE_ENTRY,
                path: self.path.join(&name),
                note: "not an existing entry".into(),
            });
        }
        self.erase(&name)?;
        values.remove(&key);
        Ok(())
    }

    /// Delete every entry in `values`, leaving it empty.
    pub fn clear(&self, values: &mut HashMap<K, Value>) -> Result<(), FileError> {
        for value in values.values() {
            let name = self.name(value)?;
            self.erase(&name)?;
        }
        values.clear();
        Ok(())
    }
}

/// Delete `path` and everything below it.
pub fn remove_folder(path: &Path) -> Result<(), FileError> {
    fs::remove_dir_all(path).map_err(|e| FileError::from_io(e, REMOVE_FOLDER, path))
}

/// Delete everything below `path`, keeping the folder itself.
pub fn remove_contents(path: &Path) -> Result<(), FileError> {
    let listing = fs::read_dir(path).map_err(|e| FileError::from_io(e, REMOVE_CONTENTS, path))?;
    for entry in listing {
        let entry = entry.map_err(|e| FileError::from_io(e, REMOVE_CONTENTS, path))?;
        let p = entry.path();
        let removed = if p.is_dir() { fs::remove_dir_all(&p) } else { fs::remove_file(&p) };
        removed.map_err(|e| FileError::from_io(e, REMOVE_CONTENTS, &p))?;
    }
    Ok(())
}

/// Number of folders, files and file bytes below `path`, not counting `path` itself.
pub fn shape_of_folder(path: &Path) -> Result<(u64, u64, u64), FileError> {
    let mut shape = (0, 0, 0);
    let listing = fs::read_dir(path).map_err(|e| FileError::from_io(e, LIST_FOLDER, path))?;
    for entry in listing {
        let entry = entry.map_err(|e| FileError::from_io(e, LIST_FOLDER, path))?;
        let p = entry.path();
        let meta = entry.metadata().map_err(|e| FileError::from_io(e, LIST_FOLDER, &p))?;
        if meta.is_dir() {
            let (folders, files, bytes) = shape_of_folder(&p)?;
            shape.0 += folders + 1;
            shape.1 += files;
            shape.2 += bytes;
        } else {
            shape.1 += 1;
            shape.2 += meta.len();
        }
    }
    Ok(shape)
}
