use crate::{KrakenError, Result};

/// Ordered request parameters, sent as an `application/x-www-form-urlencoded`
/// body.
///
/// Insertion order is preserved because the encoded body is part of the
/// signed message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    /// Creates an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter, replacing the value of an existing key in place.
    pub fn push(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    /// Appends a parameter only when `value` is `Some`.
    pub fn push_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.push(key, value),
            None => self,
        }
    }

    /// Appends `true` only when `flag` is set; omitted flags default to false
    /// on the exchange side.
    pub fn push_flag(self, key: impl Into<String>, flag: bool) -> Self {
        if flag {
            self.push(key, true)
        } else {
            self
        }
    }

    /// Appends a comma-separated list, skipping the key when `values` is empty.
    pub fn push_list<I, S>(self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = comma_separated(values);
        if joined.is_empty() {
            self
        } else {
            self.push(key, joined)
        }
    }

    /// Sets `key` to `value`, keeping the original position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        match self.0.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Returns the value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Form-encodes the parameters as they are.
    pub fn encode(&self) -> Result<String> {
        serde_urlencoded::to_string(&self.0)
            .map_err(|err| KrakenError::Validation(format!("cannot encode parameters: {err}")))
    }

    /// Form-encodes with `nonce` as the first field. A caller-supplied
    /// `nonce` is dropped.
    pub(crate) fn encode_with_nonce(&self, nonce: u64) -> Result<String> {
        let mut fields = Vec::with_capacity(self.0.len() + 1);
        fields.push(("nonce", nonce.to_string()));
        fields.extend(
            self.0
                .iter()
                .filter(|(key, _)| key != "nonce")
                .map(|(key, value)| (key.as_str(), value.clone())),
        );
        serde_urlencoded::to_string(&fields)
            .map_err(|err| KrakenError::Validation(format!("cannot encode parameters: {err}")))
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Params
where
    K: Into<String>,
    V: ToString,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs
            .into_iter()
            .fold(Self::new(), |params, (key, value)| params.push(key, value))
    }
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

pub(crate) fn comma_separated<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|value| value.as_ref().trim().to_owned())
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}
