//! Typed access to the byte-oriented state.
//!
//! Every component wraps its on-chain values in [`StoredValue`], so reading a key that
//! holds a value of another kind fails instead of silently misinterpreting bytes.

pub(crate) mod keys;
mod stored_value;

use eyre::{
    Result,
    WrapErr as _,
};
use occ_storage::{
    KeyRange,
    Order,
    StateRead,
    StateWrite,
};

pub(crate) use self::stored_value::StoredValue;

/// Reads and decodes the value at `key`.
pub(crate) fn get<S, T>(state: &S, key: &str) -> Result<Option<T>>
where
    S: StateRead + ?Sized,
    T: TryFrom<StoredValue, Error = eyre::Report>,
{
    let Some(bytes) = state
        .get_raw(key.as_bytes())
        .wrap_err_with(|| format!("failed reading raw value at `{key}`"))?
    else {
        return Ok(None);
    };
    StoredValue::deserialize(&bytes)
        .and_then(T::try_from)
        .map(Some)
        .wrap_err_with(|| format!("invalid bytes at `{key}`"))
}

/// Encodes `value` and writes it to `key`.
pub(crate) fn put<S, T>(state: &mut S, key: String, value: T) -> Result<()>
where
    S: StateWrite + ?Sized,
    T: Into<StoredValue>,
{
    let bytes = value
        .into()
        .serialize()
        .wrap_err_with(|| format!("failed to serialize value for `{key}`"))?;
    state.put_raw(key.into_bytes(), bytes);
    Ok(())
}

pub(crate) fn delete<S: StateWrite + ?Sized>(state: &mut S, key: String) {
    state.delete(key.into_bytes());
}

/// Collects up to `limit` keys under `prefix` in ascending order.
///
/// Keys are returned as strings with the prefix stripped.
pub(crate) fn prefix_keys<S: StateRead + ?Sized>(
    state: &S,
    prefix: &str,
    limit: usize,
) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    if limit == 0 {
        return Ok(keys);
    }
    let iter = state
        .iter_raw(KeyRange::prefix(prefix.as_bytes()), Order::Ascending)
        .wrap_err_with(|| format!("failed iterating keys under `{prefix}`"))?;
    for item in iter {
        let (key, _) = item.wrap_err_with(|| format!("failed iterating keys under `{prefix}`"))?;
        let key = String::from_utf8(key).wrap_err("state key is not valid utf-8")?;
        let Some(rest) = key.strip_prefix(prefix) else {
            eyre::bail!("iterator returned key `{key}` outside of prefix `{prefix}`");
        };
        keys.push(rest.to_string());
        if keys.len() >= limit {
            break;
        }
    }
    Ok(keys)
}

/// Collects up to `limit` decoded values under `prefix` together with their
/// prefix-stripped keys.
pub(crate) fn prefix_values<S, T>(state: &S, prefix: &str, limit: usize) -> Result<Vec<(String, T)>>
where
    S: StateRead + ?Sized,
    T: TryFrom<StoredValue, Error = eyre::Report>,
{
    let mut values = Vec::new();
    if limit == 0 {
        return Ok(values);
    }
    let iter = state
        .iter_raw(KeyRange::prefix(prefix.as_bytes()), Order::Ascending)
        .wrap_err_with(|| format!("failed iterating values under `{prefix}`"))?;
    for item in iter {
        let (key, bytes) =
            item.wrap_err_with(|| format!("failed iterating values under `{prefix}`"))?;
        let key = String::from_utf8(key).wrap_err("state key is not valid utf-8")?;
        let value = StoredValue::deserialize(&bytes)
            .and_then(T::try_from)
            .wrap_err_with(|| format!("invalid bytes at `{key}`"))?;
        let Some(rest) = key.strip_prefix(prefix) else {
            eyre::bail!("iterator returned key `{key}` outside of prefix `{prefix}`");
        };
        values.push((rest.to_string(), value));
        if values.len() >= limit {
            break;
        }
    }
    Ok(values)
}

/// Collects queue keys of the form `{prefix}{sortable time}/{rest}` whose time is at
/// most `until`, in ascending time order.
///
/// Returns the decoded time and the remainder after the time segment.
pub(crate) fn due_queue_keys<S: StateRead + ?Sized>(
    state: &S,
    prefix: &str,
    until: u64,
    limit: usize,
) -> Result<Vec<(u64, String)>> {
    let end = match until.checked_add(1) {
        Some(end) => format!("{prefix}{}", keys::Sortable(end)),
        None => return queue_entries(state, prefix, KeyRange::prefix(prefix.as_bytes()), limit),
    };
    let range = KeyRange::new(prefix.as_bytes(), end.into_bytes());
    queue_entries(state, prefix, range, limit)
}

fn queue_entries<S: StateRead + ?Sized>(
    state: &S,
    prefix: &str,
    range: KeyRange,
    limit: usize,
) -> Result<Vec<(u64, String)>> {
    let mut entries = Vec::new();
    if limit == 0 {
        return Ok(entries);
    }
    let iter = state
        .iter_raw(range, Order::Ascending)
        .wrap_err_with(|| format!("failed iterating queue `{prefix}`"))?;
    for item in iter {
        let (key, _) = item.wrap_err_with(|| format!("failed iterating queue `{prefix}`"))?;
        let key = String::from_utf8(key).wrap_err("state key is not valid utf-8")?;
        let (time, rest) = key
            .strip_prefix(prefix)
            .and_then(|rest| rest.split_once('/'))
            .ok_or_else(|| eyre::eyre!("malformed queue key `{key}`"))?;
        entries.push((keys::Sortable::parse(time)?, rest.to_string()));
        if entries.len() >= limit {
            break;
        }
    }
    Ok(entries)
}

/// Implements the conversions between a component's value types and [`StoredValue`].
///
/// Each listed type must be unique across the crate, which is why primitives are
/// wrapped in component-local newtypes.
macro_rules! impl_stored_value {
    ($component:ident, $value:ident, $kind:ident {
        $($variant:ident($ty:ty) => $desc:literal),+ $(,)?
    }) => {
        $(
            impl From<$ty> for $crate::storage::StoredValue {
                fn from(value: $ty) -> Self {
                    $crate::storage::StoredValue::$component($value($kind::$variant(value)))
                }
            }

            impl TryFrom<$crate::storage::StoredValue> for $ty {
                type Error = eyre::Report;

                fn try_from(value: $crate::storage::StoredValue) -> Result<Self, Self::Error> {
                    let $crate::storage::StoredValue::$component($value($kind::$variant(inner))) =
                        value
                    else {
                        eyre::bail!(
                            "{} stored value type mismatch: expected {}, found {value:?}",
                            stringify!($component).to_lowercase(),
                            $desc,
                        );
                    };
                    Ok(inner)
                }
            }
        )+
    };
}

pub(crate) use impl_stored_value;
