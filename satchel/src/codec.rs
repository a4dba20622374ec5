use crate::error::CodecError;
use crate::settings::Settings;
use crate::word::{Decoder, Encoder};
use ron::ser::PrettyConfig;
use satchel_base::{version_scenario, Registration, Registry, TypeExpr, Value, VersionTag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Turns a value and its type expression into text and back.
///
/// `decode` returns the remote version only when the stored data is behind the current version
/// of its record, so the caller knows an upgrade may be due.
pub trait Codec {
    /// File extension, without the dot.
    const EXTENSION: &'static str;

    fn with_settings(settings: &Settings) -> Self
    where
        Self: Sized;

    fn encode(
        &self,
        value: &Value,
        te: &TypeExpr,
        version: Option<VersionTag>,
        registry: &Registry,
    ) -> Result<String, CodecError>;

    fn decode(
        &self,
        text: &str,
        te: &TypeExpr,
        registry: &Registry,
    ) -> Result<(Value, Option<VersionTag>), CodecError>;

    /// On-disk name for `path`.
    fn full_name(&self, path: &Path) -> PathBuf;
}

/// Append `.extension` to `path`. A name ending in a dot is taken literally, minus the dot.
pub fn decorate(path: &Path, extension: &str) -> PathBuf {
    if let Some(bare) = path.to_str().and_then(|s| s.strip_suffix('.')) {
        return PathBuf::from(bare);
    }
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

#[derive(Serialize, Deserialize)]
struct Shipment {
    value: ron::Value,
    #[serde(default)]
    version: Option<String>,
}

/// Version tag recorded in a stored shipment, without decoding its value.
pub fn peek_version(text: &str) -> Result<Option<VersionTag>, CodecError> {
    let shipment: Shipment = ron::from_str(text).map_err(|e| CodecError::Failed(e.to_string()))?;
    shipment
        .version
        .map(|v| v.parse::<VersionTag>())
        .transpose()
        .map_err(|e| CodecError::Failed(e.to_string()))
}

/// RON text codec.
#[derive(Copy, Clone, Debug)]
pub struct RonCodec {
    pub pretty_format: bool,
    pub decorate_names: bool,
}

impl Default for RonCodec {
    fn default() -> Self {
        RonCodec::with_settings(&Settings::default())
    }
}

type Sliced<'r> = Option<(&'r str, &'r BTreeSet<String>)>;

fn portable<'r>(te: &TypeExpr, registry: &'r Registry) -> Result<Option<&'r Registration>, CodecError> {
    let registration = registry.effective_type(te).map(|r| r.as_ref());
    if let Some(r) = registration {
        if r.options().not_portable {
            return Err(CodecError::Usage(format!("\"{}\" is not portable", r.path())));
        }
    }
    Ok(registration)
}

/// Version to write and the fields visible at it.
fn versioning<'r>(
    te: &TypeExpr,
    version: Option<VersionTag>,
    registry: &'r Registry,
) -> Result<(Option<VersionTag>, Sliced<'r>), CodecError> {
    let Some(registration) = portable(te, registry)? else {
        return match version {
            Some(tag) => Err(CodecError::Usage(format!("no version context for {tag} in {te}"))),
            None => Ok((None, None)),
        };
    };
    let current = TypeExpr::user_defined(registration.path());
    let Some(tag) = version.or_else(|| registry.type_version(&current)) else {
        return Ok((None, None));
    };
    match registration.slice(&tag) {
        Some(names) => Ok((Some(tag), Some((registration.path(), names)))),
        None => Err(CodecError::Usage(format!(
            "\"{tag}\" is not a version of \"{}\"",
            registration.path()
        ))),
    }
}

impl Codec for RonCodec {
    const EXTENSION: &'static str = "ron";

    fn with_settings(settings: &Settings) -> Self {
        RonCodec {
            pretty_format: settings.pretty_format,
            decorate_names: settings.decorate_names,
        }
    }

    fn encode(
        &self,
        value: &Value,
        te: &TypeExpr,
        version: Option<VersionTag>,
        registry: &Registry,
    ) -> Result<String, CodecError> {
        let (version, slice) = versioning(te, version, registry)?;
        let encoder = Encoder { registry, slice };
        let shipment = Shipment {
            value: encoder.word(value, te)?,
            version: version.map(|v| v.to_string()),
        };
        let text = if self.pretty_format {
            ron::ser::to_string_pretty(&shipment, PrettyConfig::default().compact_arrays(true))
        } else {
            ron::ser::to_string(&shipment)
        };
        text.map_err(|e| CodecError::Failed(e.to_string()))
    }

    fn decode(
        &self,
        text: &str,
        te: &TypeExpr,
        registry: &Registry,
    ) -> Result<(Value, Option<VersionTag>), CodecError> {
        let shipment: Shipment = ron::from_str(text).map_err(|e| CodecError::Failed(e.to_string()))?;
        let remote = shipment
            .version
            .as_deref()
            .map(str::parse::<VersionTag>)
            .transpose()
            .map_err(|e| CodecError::Failed(e.to_string()))?;

        let registration = portable(te, registry)?;
        let local = registration.and_then(|r| r.history_range());
        let (tag, scenario) = version_scenario(remote, local);
        if !scenario.is_acceptable() {
            return Err(CodecError::Version {
                record: registration.map(|r| r.path().to_string()).unwrap_or_default(),
                version: shipment.version.unwrap_or_default(),
                scenario,
            });
        }

        let value = Decoder { registry }.value(&shipment.value, te)?;
        Ok((value, tag))
    }

    fn full_name(&self, path: &Path) -> PathBuf {
        if self.decorate_names {
            decorate(path, Self::EXTENSION)
        } else {
            path.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satchel_base::{equal_values, Edit, Record, RecordDecl, Scenario, VersionHistory};

    fn registry() -> Registry {
        let mut registry = Registry::new();
        let default = Record::new("shop::Item")
            .with("name", Value::Unicode(String::new()))
            .with("count", Value::Integer(0))
            .with("label", Value::Unicode(String::new()));
        let history = VersionHistory::new()
            .version("1.0", [Edit::added("name")])
            .version("1.1", [Edit::added("count")])
            .version("1.2", [Edit::added("label")]);
        registry
            .register_record(
                RecordDecl::new("shop::Item")
                    .default_value(Value::Record(default))
                    .history(history),
            )
            .unwrap();
        registry
    }

    fn item(name: &str, count: i64, label: &str) -> Value {
        Value::Record(
            Record::new("shop::Item")
                .with("name", Value::Unicode(name.into()))
                .with("count", Value::Integer(count))
                .with("label", Value::Unicode(label.into())),
        )
    }

    #[test]
    fn names_are_decorated() {
        let codec = RonCodec::default();
        assert_eq!(codec.full_name(Path::new("a/b")), PathBuf::from("a/b.ron"));
        assert_eq!(codec.full_name(Path::new("a/b.")), PathBuf::from("a/b"));
        let plain = RonCodec::with_settings(&Settings::default().decorate_names(false));
        assert_eq!(plain.full_name(Path::new("a/b")), PathBuf::from("a/b"));
    }

    #[test]
    fn current_version_round_trip() {
        let registry = registry();
        let codec = RonCodec::default();
        let te = TypeExpr::user_defined("shop::Item");
        let value = item("pen", 3, "blue");

        let text = codec.encode(&value, &te, None, &registry).unwrap();
        assert!(text.contains("\"1.2\""));
        assert_eq!(peek_version(&text).unwrap(), Some(VersionTag::new(1, 2)));

        let (back, tag) = codec.decode(&text, &te, &registry).unwrap();
        assert_eq!(tag, None);
        assert!(equal_values(&back, &value, &registry));
    }

    #[test]
    fn older_version_hides_later_fields() {
        let registry = registry();
        let codec = RonCodec::default();
        let te = TypeExpr::user_defined("shop::Item");

        let text = codec
            .encode(&item("pen", 3, "blue"), &te, Some(VersionTag::new(1, 0)), &registry)
            .unwrap();
        assert!(!text.contains("count"));

        let (back, tag) = codec.decode(&text, &te, &registry).unwrap();
        assert_eq!(tag, Some(VersionTag::new(1, 0)));
        assert!(equal_values(&back, &item("pen", 0, ""), &registry));
    }

    #[test]
    fn unknown_version_is_a_usage_error() {
        let registry = registry();
        let te = TypeExpr::user_defined("shop::Item");
        let e = RonCodec::default()
            .encode(&item("pen", 1, ""), &te, Some(VersionTag::new(1, 7)), &registry)
            .unwrap_err();
        assert!(matches!(e, CodecError::Usage(_)));
    }

    #[test]
    fn versions_outside_the_range_are_rejected() {
        let registry = registry();
        let codec = RonCodec::default();
        let te = TypeExpr::user_defined("shop::Item");
        let text = r#"(value: {"name": "pen"}, version: Some("1.9"))"#;
        let e = codec.decode(text, &te, &registry).unwrap_err();
        assert!(matches!(
            e,
            CodecError::Version {
                scenario: Scenario::Ahead,
                ..
            }
        ));

        let text = r#"(value: {"name": "pen"}, version: Some("2.0"))"#;
        let e = codec.decode(text, &te, &registry).unwrap_err();
        assert!(matches!(
            e,
            CodecError::Version {
                scenario: Scenario::Inappropriate,
                ..
            }
        ));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let registry = registry();
        let te = TypeExpr::user_defined("shop::Item");
        let text = r#"(value: {"name": "pen", "colour": "red"}, version: Some("1.2"))"#;
        let (back, _) = RonCodec::default().decode(text, &te, &registry).unwrap();
        assert!(equal_values(&back, &item("pen", 0, ""), &registry));
    }

    #[test]
    fn containers_and_leaves() {
        let registry = registry();
        let codec = RonCodec::with_settings(&Settings::default().pretty_format(false));
        let te = TypeExpr::map_of(TypeExpr::Unicode, TypeExpr::vector_of(TypeExpr::Byte));
        let value = Value::Map(vec![(
            Value::Unicode("k".into()),
            Value::Sequence(vec![Value::Unsigned(1), Value::Unsigned(255)]),
        )]);
        let text = codec.encode(&value, &te, None, &registry).unwrap();
        assert!(!text.contains('\n'));
        assert!(text.contains(r#"{"k":[1,255]}"#));
        let (back, tag) = codec.decode(&text, &te, &registry).unwrap();
        assert_eq!(tag, None);
        assert_eq!(back, value);

        let e = codec.decode(r#"(value:{"k":[256]})"#, &te, &registry).unwrap_err();
        assert!(e.to_string().contains("value: [0]"));
    }

    #[test]
    fn every_kind_survives_a_round_trip() {
        use chrono::Duration;
        use satchel_base::date_time::fake_world;
        use satchel_base::{equal_to, Enumeration};
        use std::sync::Arc;
        use uuid::Uuid;

        let registry = registry();
        let colour = Enumeration::new("Colour", [("Red", 0), ("Green", 5)]).unwrap();
        let cases = vec![
            (TypeExpr::Boolean, Value::Bool(true)),
            (TypeExpr::Byte, Value::Unsigned(255)),
            (TypeExpr::Character, Value::Character(b'a')),
            (TypeExpr::Character, Value::Character(0x80)),
            (TypeExpr::Character, Value::Character(0xE9)),
            (TypeExpr::Character, Value::Character(0xFF)),
            (TypeExpr::Rune, Value::Rune('λ')),
            (TypeExpr::Integer2, Value::Integer(-32768)),
            (TypeExpr::Integer8, Value::Integer(i64::MIN)),
            (TypeExpr::Integer8, Value::Integer(i64::MAX)),
            (TypeExpr::Unsigned4, Value::Unsigned(u32::MAX as u64)),
            (TypeExpr::Unsigned8, Value::Unsigned(i64::MAX as u64)),
            (TypeExpr::Unsigned8, Value::Unsigned(i64::MAX as u64 + 1)),
            (TypeExpr::Unsigned8, Value::Unsigned(u64::MAX)),
            (TypeExpr::Float4, Value::Float(-2.25)),
            (TypeExpr::Float8, Value::Float(1.0)),
            (TypeExpr::ClockTime, Value::ClockTime(1.5)),
            (TypeExpr::TimeSpan, Value::TimeSpan(-0.125)),
            (TypeExpr::Block, Value::Block(vec![0, 0x7f, 0xff])),
            (TypeExpr::String, Value::String(b"CAFE\xff".to_vec())),
            (TypeExpr::Unicode, Value::Unicode("naïve \"quoted\"".into())),
            (TypeExpr::Enumeration(Arc::new(colour)), Value::Enumeration(5)),
            (
                TypeExpr::WorldTime,
                Value::WorldTime(fake_world() + Duration::microseconds(1_500_250)),
            ),
            (TypeExpr::TimeDelta, Value::TimeDelta(Duration::microseconds(-42))),
            (TypeExpr::Uuid, Value::Uuid(Uuid::new_v4())),
            (TypeExpr::Type, Value::Type("shop::Item".into())),
            (TypeExpr::Type, Value::Null),
            (TypeExpr::Word, Value::Null),
            (TypeExpr::Any, Value::Null),
            (
                TypeExpr::Any,
                Value::Any(Box::new(item("pen", 3, "blue").as_record().unwrap().clone())),
            ),
            (TypeExpr::Address, Value::Address(vec![1, u64::MAX])),
            (TypeExpr::TargetAddress, Value::Address(vec![])),
            (
                TypeExpr::ArrayOf(Box::new(TypeExpr::Integer4), 3),
                Value::Sequence(vec![Value::Integer(1), Value::Integer(-2), Value::Integer(3)]),
            ),
            (
                TypeExpr::SetOf(Box::new(TypeExpr::Unicode)),
                Value::Set(vec![Value::Unicode("a".into()), Value::Unicode("b".into())]),
            ),
            (
                TypeExpr::DequeOf(Box::new(TypeExpr::Float8)),
                Value::Sequence(vec![Value::Float(0.5), Value::Float(-1.0)]),
            ),
            (
                TypeExpr::map_of(TypeExpr::Integer8, TypeExpr::Boolean),
                Value::Map(vec![(Value::Integer(-1), Value::Bool(false))]),
            ),
            (TypeExpr::user_defined("shop::Item"), item("pen", 3, "blue")),
        ];

        for pretty in [true, false] {
            let codec = RonCodec::with_settings(&Settings::default().pretty_format(pretty));
            for (te, value) in &cases {
                let text = codec.encode(value, te, None, &registry).unwrap();
                let (back, _) = codec.decode(&text, te, &registry).unwrap();
                assert!(equal_to(&back, value, te, &registry), "{te}: {value:?} came back as {back:?}");
            }
        }
    }

    #[test]
    fn large_unsigned_values_are_written_as_text() {
        let registry = registry();
        let codec = RonCodec::with_settings(&Settings::default().pretty_format(false));
        let text = codec
            .encode(&Value::Unsigned(u64::MAX), &TypeExpr::Unsigned8, None, &registry)
            .unwrap();
        assert!(text.contains("\"18446744073709551615\""));

        let e = codec
            .encode(&Value::Unsigned(u64::MAX), &TypeExpr::Integer8, None, &registry)
            .unwrap_err();
        assert!(matches!(e, CodecError::Failed(_)));
    }
}
