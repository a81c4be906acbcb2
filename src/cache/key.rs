//! Cache key derivation.
//!
//! A [`CacheKey`] is `{identity}:{positional}:{named}` where both argument
//! parts use a canonical JSON-like encoding:
//!
//! - named arguments are emitted sorted by name, whatever order the caller
//!   built them in;
//! - numbers are encoded by value, so `5`, `5u64` and `5.0` produce the same
//!   text;
//! - strings use JSON escaping.
//!
//! Identities may not contain `:`, which keeps the encoding injective: the
//! identity ends at the first `:` and the positional part is a self-delimiting
//! JSON array.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use sha2::{Digest, Sha256};

use crate::{FinmemoError, Result};

/// Floats below this magnitude with no fractional part encode as integers.
const INTEGRAL_FLOAT_LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63

/// A single argument value participating in key derivation.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyArg {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    List(Vec<KeyArg>),
    Map(BTreeMap<String, KeyArg>),
}

impl KeyArg {
    /// Append the canonical encoding of this value to `out`.
    fn encode(&self, out: &mut String) -> Result<()> {
        match self {
            KeyArg::Null => out.push_str("null"),
            KeyArg::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            KeyArg::Int(n) => push_display(out, n),
            KeyArg::UInt(n) => push_display(out, n),
            KeyArg::Float(f) => {
                if !f.is_finite() {
                    return Err(FinmemoError::KeySerialization(format!(
                        "non-finite number {f} cannot be part of a cache key"
                    )));
                }
                if f.fract() == 0.0 && f.abs() < INTEGRAL_FLOAT_LIMIT {
                    // also folds -0.0 into 0
                    push_display(out, &(*f as i64));
                } else {
                    push_display(out, f);
                }
            }
            KeyArg::Str(s) => out.push_str(&serde_json::to_string(s)?),
            KeyArg::List(items) => encode_list(items, out)?,
            KeyArg::Map(entries) => encode_map(entries, out)?,
        }
        Ok(())
    }
}

fn push_display(out: &mut String, value: &dyn fmt::Display) {
    // Writing into a String cannot fail.
    let _ = write!(out, "{value}");
}

fn encode_list(items: &[KeyArg], out: &mut String) -> Result<()> {
    out.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        item.encode(out)?;
    }
    out.push(']');
    Ok(())
}

fn encode_map(entries: &BTreeMap<String, KeyArg>, out: &mut String) -> Result<()> {
    out.push('{');
    for (i, (name, value)) in entries.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&serde_json::to_string(name)?);
        out.push(':');
        value.encode(out)?;
    }
    out.push('}');
    Ok(())
}

macro_rules! key_arg_from {
    ($($ty:ty => $variant:ident via $conv:expr),* $(,)?) => {
        $(
            impl From<$ty> for KeyArg {
                fn from(value: $ty) -> Self {
                    KeyArg::$variant($conv(value))
                }
            }
        )*
    };
}

key_arg_from! {
    bool => Bool via |v| v,
    i32 => Int via i64::from,
    i64 => Int via |v| v,
    u32 => UInt via u64::from,
    u64 => UInt via |v| v,
    usize => UInt via |v: usize| v as u64,
    f64 => Float via |v| v,
    String => Str via |v| v,
    &str => Str via str::to_owned,
    &String => Str via Clone::clone,
}

impl<T: Into<KeyArg>> From<Option<T>> for KeyArg {
    fn from(value: Option<T>) -> Self {
        value.map_or(KeyArg::Null, Into::into)
    }
}

impl<T: Into<KeyArg>> From<Vec<T>> for KeyArg {
    fn from(values: Vec<T>) -> Self {
        KeyArg::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for KeyArg {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => KeyArg::Null,
            Value::Bool(b) => KeyArg::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    KeyArg::Int(i)
                } else if let Some(u) = n.as_u64() {
                    KeyArg::UInt(u)
                } else {
                    KeyArg::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => KeyArg::Str(s),
            Value::Array(items) => KeyArg::List(items.into_iter().map(KeyArg::from).collect()),
            Value::Object(entries) => KeyArg::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, KeyArg::from(v)))
                    .collect(),
            ),
        }
    }
}

impl KeyArg {
    /// Convert any serializable value into a key argument.
    ///
    /// Fails with [`FinmemoError::KeySerialization`] when serde cannot
    /// represent the value (e.g. maps with non-string keys).
    pub fn from_serialize<T: serde::Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(KeyArg::from)
            .map_err(|e| FinmemoError::KeySerialization(e.to_string()))
    }

    /// The canonical text this value contributes to a key.
    pub fn canonical(&self) -> Result<String> {
        let mut out = String::new();
        self.encode(&mut out)?;
        Ok(out)
    }

    /// Hex SHA-256 of the canonical encoding.
    ///
    /// Stands in for a large argument so the key stays short while still
    /// changing whenever the argument does.
    pub fn digest(&self) -> Result<KeyArg> {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical()?.as_bytes());
        Ok(KeyArg::Str(hex::encode(hasher.finalize())))
    }
}

/// Arguments of a memoized call, split the way the key deriver sees them.
///
/// `force_reload` is never part of an implementor: it is passed to the
/// wrapper separately, so it cannot influence the key.
pub trait CacheArgs {
    /// Positional arguments, in call order.
    fn positional(&self) -> Vec<KeyArg>;

    /// Named arguments. Order of insertion is irrelevant.
    fn named(&self) -> BTreeMap<String, KeyArg> {
        BTreeMap::new()
    }
}

impl CacheArgs for () {
    fn positional(&self) -> Vec<KeyArg> {
        Vec::new()
    }
}

macro_rules! tuple_cache_args {
    ($($name:ident),+) => {
        impl<$($name),+> CacheArgs for ($($name,)+)
        where
            $($name: Clone + Into<KeyArg>),+
        {
            #[allow(non_snake_case)]
            fn positional(&self) -> Vec<KeyArg> {
                let ($($name,)+) = self.clone();
                vec![$($name.into()),+]
            }
        }
    };
}

tuple_cache_args!(A);
tuple_cache_args!(A, B);
tuple_cache_args!(A, B, C);
tuple_cache_args!(A, B, C, D);
tuple_cache_args!(A, B, C, D, E);

/// Deterministic fingerprint of a producer identity plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for `identity` called with the given arguments.
    pub fn derive(
        identity: &str,
        positional: &[KeyArg],
        named: &BTreeMap<String, KeyArg>,
    ) -> Result<Self> {
        if identity.is_empty() || identity.contains(':') {
            return Err(FinmemoError::KeySerialization(format!(
                "invalid function identity {identity:?}: must be non-empty and contain no ':'"
            )));
        }
        let mut key = String::with_capacity(identity.len() + 16);
        key.push_str(identity);
        key.push(':');
        encode_list(positional, &mut key)?;
        key.push(':');
        encode_map(named, &mut key)?;
        Ok(Self(key))
    }

    /// Derive the key for `identity` called with `args`.
    pub fn for_args<A: CacheArgs + ?Sized>(identity: &str, args: &A) -> Result<Self> {
        Self::derive(identity, &args.positional(), &args.named())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
