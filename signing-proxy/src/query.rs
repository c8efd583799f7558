use indexmap::IndexMap;
use std::collections::HashMap;
use url::form_urlencoded;

/// Query string for one outbound call, and the part of it that gets signed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuiltQuery {
    pub transmitted: String,
    /// Either identical to `transmitted` or empty, depending on the signing setup
    pub signed_fragment: String,
}

/// Caller-supplied parameters, parsed from the inbound query string.
///
/// When a name is repeated, the first value wins.
#[derive(Clone, Debug, Default)]
pub struct CallerParams(HashMap<String, String>);

impl CallerParams {
    pub fn parse(query: Option<&str>) -> Self {
        let mut params = HashMap::new();
        for (name, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            params
                .entry(name.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        CallerParams(params)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

impl<const N: usize> From<[(&str, &str); N]> for CallerParams {
    fn from(pairs: [(&str, &str); N]) -> Self {
        let mut params = HashMap::new();
        for (name, value) in pairs {
            params
                .entry(name.to_string())
                .or_insert_with(|| value.to_string());
        }
        CallerParams(params)
    }
}

/// Normalizes caller parameters against a resource's declared parameters.
#[derive(Clone, Copy, Debug, Default)]
pub struct QueryBuilder {
    include_in_signature: bool,
}

impl QueryBuilder {
    pub fn new(include_in_signature: bool) -> Self {
        Self {
            include_in_signature,
        }
    }

    /// Builds the outbound query.
    ///
    /// Parameters come out in declaration order. A declared parameter takes the
    /// caller's value when it is present and non-empty, otherwise its default;
    /// one that still resolves to empty is left out. Undeclared caller
    /// parameters are dropped.
    pub fn build(&self, declared: &IndexMap<String, String>, caller: &CallerParams) -> BuiltQuery {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, default) in declared {
            let value = caller
                .get(name)
                .filter(|value| !value.is_empty())
                .unwrap_or(default.as_str());
            if !value.is_empty() {
                serializer.append_pair(name, value);
            }
        }
        let transmitted = serializer.finish();

        let signed_fragment = match self.include_in_signature {
            true => transmitted.clone(),
            false => String::new(),
        };

        BuiltQuery {
            transmitted,
            signed_fragment,
        }
    }
}
