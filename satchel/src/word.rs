//! Conversion between runtime values and RON words, driven by type expressions.

use crate::error::CodecError;
use ron::value::{Float, Map, Number};
use ron::Value as Word;
use satchel_base::date_time::{delta_from_micros, delta_to_micros, world_from_text, world_to_text};
use satchel_base::{Record, Registration, Registry, TypeExpr, Value};
use std::collections::BTreeSet;
use uuid::Uuid;

fn integer(i: i64) -> Word {
    Word::Number(Number::Integer(i))
}

fn float(f: f64) -> Word {
    Word::Number(Number::Float(Float::new(f)))
}

fn unexpected(value: &Value, te: &TypeExpr) -> CodecError {
    CodecError::Failed(format!("cannot encode {} as {te}", value.describe()))
}

fn not_a(word: &Word, te: &TypeExpr) -> CodecError {
    CodecError::Failed(format!("cannot decode {word:?} as {te}"))
}

fn within(e: CodecError, name: impl std::fmt::Display) -> CodecError {
    match e {
        CodecError::Failed(m) => CodecError::Failed(format!("{name}: {m}")),
        other => other,
    }
}

fn portable<'a>(registry: &'a Registry, path: &str) -> Result<&'a Registration, CodecError> {
    let Some(registration) = registry.get(path) else {
        return Err(CodecError::Usage(format!("\"{path}\" is not a registered record")));
    };
    if registration.options().not_portable {
        return Err(CodecError::Usage(format!("\"{path}\" is not portable")));
    }
    Ok(registration)
}

fn signed(u: u64) -> Result<Word, CodecError> {
    i64::try_from(u)
        .map(integer)
        .map_err(|_| CodecError::Failed(format!("{u} is out of range")))
}

/// Values above `i64::MAX` are written as decimal text.
fn unsigned(u: u64) -> Word {
    match i64::try_from(u) {
        Ok(i) => integer(i),
        Err(_) => Word::String(u.to_string()),
    }
}

fn bytes(b: &[u8]) -> Word {
    Word::Seq(b.iter().map(|b| integer(*b as i64)).collect())
}

/// Writes values as words. Records of the sliced kind only carry the fields visible at the
/// version being written.
pub(crate) struct Encoder<'a> {
    pub registry: &'a Registry,
    pub slice: Option<(&'a str, &'a BTreeSet<String>)>,
}

impl<'a> Encoder<'a> {
    pub fn word(&self, value: &Value, te: &TypeExpr) -> Result<Word, CodecError> {
        let word = match (te, value) {
            (TypeExpr::Boolean, Value::Bool(b)) => Word::Bool(*b),
            (TypeExpr::Integer2 | TypeExpr::Integer4 | TypeExpr::Integer8, Value::Integer(i)) => {
                integer(*i)
            }
            (TypeExpr::Integer2 | TypeExpr::Integer4 | TypeExpr::Integer8, Value::Unsigned(u)) => {
                signed(*u)?
            }
            (
                TypeExpr::Byte | TypeExpr::Unsigned2 | TypeExpr::Unsigned4 | TypeExpr::Unsigned8,
                Value::Unsigned(u),
            ) => unsigned(*u),
            (
                TypeExpr::Byte | TypeExpr::Unsigned2 | TypeExpr::Unsigned4 | TypeExpr::Unsigned8,
                Value::Integer(i),
            ) if *i >= 0 => integer(*i),
            (TypeExpr::Float4 | TypeExpr::Float8, Value::Float(f)) => float(*f),
            (TypeExpr::ClockTime, Value::ClockTime(f)) => float(*f),
            (TypeExpr::TimeSpan, Value::TimeSpan(f)) => float(*f),
            (TypeExpr::Character, Value::Character(c)) => integer(*c as i64),
            (TypeExpr::Rune, Value::Rune(c)) => Word::Char(*c),
            (TypeExpr::Block, Value::Block(b)) => bytes(b),
            (TypeExpr::String, Value::String(b)) => bytes(b),
            (TypeExpr::Unicode, Value::Unicode(s)) => Word::String(s.clone()),
            (TypeExpr::Enumeration(e), Value::Enumeration(n)) => match e.to_name(*n) {
                Some(name) => Word::String(name.to_string()),
                None => {
                    return Err(CodecError::Failed(format!("no member {n} in {}", e.name())))
                }
            },
            (TypeExpr::WorldTime, Value::WorldTime(dt)) => Word::String(world_to_text(dt)),
            (TypeExpr::TimeDelta, Value::TimeDelta(d)) => match delta_to_micros(d) {
                Some(micros) => integer(micros),
                None => return Err(CodecError::Failed(format!("time delta {d} overflows"))),
            },
            (TypeExpr::Uuid, Value::Uuid(u)) => Word::String(u.to_string()),
            (TypeExpr::Type, Value::Type(path)) => Word::String(path.clone()),
            (TypeExpr::Type | TypeExpr::Word | TypeExpr::Any, Value::Null) => Word::Unit,
            (TypeExpr::Any, Value::Any(record)) => {
                let kind = Word::String(record.kind().to_string());
                Word::Seq(vec![kind, self.record(record, record.kind())?])
            }
            (TypeExpr::TargetAddress | TypeExpr::Address, Value::Address(a)) => {
                Word::Seq(a.iter().map(|u| unsigned(*u)).collect())
            }
            (TypeExpr::ArrayOf(e, size), Value::Sequence(items)) => {
                if items.len() != *size {
                    return Err(CodecError::Failed(format!(
                        "array of {size} holds {} element(s)",
                        items.len()
                    )));
                }
                self.sequence(items, e)?
            }
            (TypeExpr::VectorOf(e) | TypeExpr::DequeOf(e), Value::Sequence(items)) => {
                self.sequence(items, e)?
            }
            (TypeExpr::SetOf(e), Value::Set(items)) => self.sequence(items, e)?,
            (TypeExpr::MapOf(k, v), Value::Map(pairs)) => {
                let mut map = Map::new();
                for (key, value) in pairs {
                    let key = self.word(key, k).map_err(|e| within(e, "key"))?;
                    let value = self.word(value, v).map_err(|e| within(e, "value"))?;
                    map.insert(key, value);
                }
                Word::Map(map)
            }
            (TypeExpr::UserDefined(path), Value::Record(record)) => self.record(record, path)?,
            (TypeExpr::PointerTo(_), Value::Pointer(None) | Value::Null) => Word::Option(None),
            (TypeExpr::PointerTo(p), Value::Pointer(Some(v))) => {
                let Some(element) = p.element() else {
                    return Err(CodecError::Failed("pointer target is not resolved".into()));
                };
                Word::Option(Some(Box::new(self.word(v, element)?)))
            }
            (te, value) => return Err(unexpected(value, te)),
        };
        Ok(word)
    }

    fn sequence(&self, items: &[Value], te: &TypeExpr) -> Result<Word, CodecError> {
        let words = items
            .iter()
            .enumerate()
            .map(|(i, v)| self.word(v, te).map_err(|e| within(e, format!("[{i}]"))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Word::Seq(words))
    }

    fn record(&self, record: &Record, path: &str) -> Result<Word, CodecError> {
        if record.kind() != path {
            return Err(CodecError::Failed(format!(
                "expected record \"{path}\", found \"{}\"",
                record.kind()
            )));
        }
        let registration = portable(self.registry, path)?;
        let visible = match self.slice {
            Some((kind, names)) if kind == path => Some(names),
            _ => None,
        };
        let mut map = Map::new();
        for (name, te) in registration.schema().iter() {
            if visible.is_some_and(|v| !v.contains(name)) {
                continue;
            }
            let word = match record.field(name) {
                Some(v) => self.word(v, te),
                None => self.word(&self.registry.make(te), te),
            }
            .map_err(|e| within(e, name))?;
            map.insert(Word::String(name.to_string()), word);
        }
        Ok(Word::Map(map))
    }
}

fn whole(word: &Word) -> Option<i64> {
    match word {
        Word::Number(Number::Integer(i)) => Some(*i),
        _ => None,
    }
}

fn natural(word: &Word) -> Option<u64> {
    match word {
        Word::String(s) => s.parse().ok(),
        _ => whole(word).and_then(|i| u64::try_from(i).ok()),
    }
}

fn real(word: &Word) -> Option<f64> {
    match word {
        Word::Number(Number::Integer(i)) => Some(*i as f64),
        Word::Number(Number::Float(f)) => Some(f.get()),
        _ => None,
    }
}

fn byte_seq(word: &Word) -> Option<Vec<u8>> {
    let Word::Seq(items) = word else {
        return None;
    };
    items
        .iter()
        .map(|w| whole(w).and_then(|i| u8::try_from(i).ok()))
        .collect()
}

/// Reads words back into values. Record fields missing from a word keep their default,
/// names the schema does not know are skipped.
pub(crate) struct Decoder<'a> {
    pub registry: &'a Registry,
}

impl<'a> Decoder<'a> {
    pub fn value(&self, word: &Word, te: &TypeExpr) -> Result<Value, CodecError> {
        let value = match te {
            TypeExpr::Boolean => match word {
                Word::Bool(b) => Value::Bool(*b),
                _ => return Err(not_a(word, te)),
            },
            TypeExpr::Integer2 | TypeExpr::Integer4 | TypeExpr::Integer8 => {
                Value::Integer(whole(word).ok_or_else(|| not_a(word, te))?)
            }
            TypeExpr::Byte | TypeExpr::Unsigned2 | TypeExpr::Unsigned4 | TypeExpr::Unsigned8 => {
                Value::Unsigned(natural(word).ok_or_else(|| not_a(word, te))?)
            }
            TypeExpr::Float4 | TypeExpr::Float8 => {
                Value::Float(real(word).ok_or_else(|| not_a(word, te))?)
            }
            TypeExpr::ClockTime => Value::ClockTime(real(word).ok_or_else(|| not_a(word, te))?),
            TypeExpr::TimeSpan => Value::TimeSpan(real(word).ok_or_else(|| not_a(word, te))?),
            TypeExpr::Character => {
                let c = match word {
                    Word::Char(c) => u8::try_from(u32::from(*c)).ok(),
                    _ => whole(word).and_then(|i| u8::try_from(i).ok()),
                };
                Value::Character(c.ok_or_else(|| not_a(word, te))?)
            }
            TypeExpr::Rune => match word {
                Word::Char(c) => Value::Rune(*c),
                _ => return Err(not_a(word, te)),
            },
            TypeExpr::Block => Value::Block(byte_seq(word).ok_or_else(|| not_a(word, te))?),
            TypeExpr::String => Value::String(byte_seq(word).ok_or_else(|| not_a(word, te))?),
            TypeExpr::Unicode => match word {
                Word::String(s) => Value::Unicode(s.clone()),
                _ => return Err(not_a(word, te)),
            },
            TypeExpr::Enumeration(e) => {
                let Word::String(name) = word else {
                    return Err(not_a(word, te));
                };
                match e.to_number(name) {
                    Some(n) => Value::Enumeration(n),
                    None => {
                        return Err(CodecError::Failed(format!(
                            "no member \"{name}\" in {}",
                            e.name()
                        )))
                    }
                }
            }
            TypeExpr::WorldTime => match word {
                Word::String(s) => {
                    Value::WorldTime(world_from_text(s).ok_or_else(|| not_a(word, te))?)
                }
                _ => return Err(not_a(word, te)),
            },
            TypeExpr::TimeDelta => {
                Value::TimeDelta(delta_from_micros(whole(word).ok_or_else(|| not_a(word, te))?))
            }
            TypeExpr::Uuid => match word {
                Word::String(s) => {
                    Value::Uuid(Uuid::parse_str(s).map_err(|e| CodecError::Failed(e.to_string()))?)
                }
                _ => return Err(not_a(word, te)),
            },
            TypeExpr::Type => match word {
                Word::Unit => Value::Null,
                Word::String(path) if self.registry.contains(path) => Value::Type(path.clone()),
                _ => return Err(not_a(word, te)),
            },
            TypeExpr::Word => match word {
                Word::Unit => Value::Null,
                _ => return Err(not_a(word, te)),
            },
            TypeExpr::Any => match word {
                Word::Unit => Value::Null,
                Word::Seq(pair) => match pair.as_slice() {
                    [Word::String(kind), record] => {
                        Value::Any(Box::new(self.record(record, kind)?))
                    }
                    _ => return Err(not_a(word, te)),
                },
                _ => return Err(not_a(word, te)),
            },
            TypeExpr::TargetAddress | TypeExpr::Address => {
                let Word::Seq(items) = word else {
                    return Err(not_a(word, te));
                };
                let address = items
                    .iter()
                    .map(natural)
                    .collect::<Option<Vec<_>>>();
                Value::Address(address.ok_or_else(|| not_a(word, te))?)
            }
            TypeExpr::ArrayOf(e, size) => {
                let items = self.sequence(word, e, te)?;
                if items.len() != *size {
                    return Err(CodecError::Failed(format!(
                        "array of {size} decoded {} element(s)",
                        items.len()
                    )));
                }
                Value::Sequence(items)
            }
            TypeExpr::VectorOf(e) | TypeExpr::DequeOf(e) => {
                Value::Sequence(self.sequence(word, e, te)?)
            }
            TypeExpr::SetOf(e) => Value::Set(self.sequence(word, e, te)?),
            TypeExpr::MapOf(k, v) => {
                let Word::Map(map) = word else {
                    return Err(not_a(word, te));
                };
                let mut pairs = Vec::with_capacity(map.len());
                for (key, value) in map.iter() {
                    let key = self.value(key, k).map_err(|e| within(e, "key"))?;
                    let value = self.value(value, v).map_err(|e| within(e, "value"))?;
                    pairs.push((key, value));
                }
                Value::Map(pairs)
            }
            TypeExpr::UserDefined(path) => Value::Record(self.record(word, path)?),
            TypeExpr::PointerTo(p) => match word {
                Word::Option(None) | Word::Unit => Value::Pointer(None),
                Word::Option(Some(w)) => {
                    let Some(element) = p.element() else {
                        return Err(CodecError::Failed("pointer target is not resolved".into()));
                    };
                    Value::Pointer(Some(Box::new(self.value(w, element)?)))
                }
                _ => return Err(not_a(word, te)),
            },
        };
        Ok(value)
    }

    fn sequence(&self, word: &Word, element: &TypeExpr, te: &TypeExpr) -> Result<Vec<Value>, CodecError> {
        let Word::Seq(items) = word else {
            return Err(not_a(word, te));
        };
        items
            .iter()
            .enumerate()
            .map(|(i, w)| self.value(w, element).map_err(|e| within(e, format!("[{i}]"))))
            .collect()
    }

    fn record(&self, word: &Word, path: &str) -> Result<Record, CodecError> {
        let registration = portable(self.registry, path)?;
        let Word::Map(map) = word else {
            return Err(CodecError::Failed(format!("cannot decode {word:?} as record \"{path}\"")));
        };
        let mut record = match registration.default_value() {
            Value::Record(r) => r.clone(),
            _ => Record::new(path),
        };
        for (key, w) in map.iter() {
            let Word::String(name) = key else {
                continue;
            };
            let Some(te) = registration.schema().get(name) else {
                log::trace!("ignoring \"{name}\", not a field of {path}");
                continue;
            };
            let value = self.value(w, te).map_err(|e| within(e, name))?;
            record.set(name.as_str(), value);
        }
        Ok(record)
    }
}
