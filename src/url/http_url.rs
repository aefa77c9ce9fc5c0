//! An absolute `http`/`https` URL, validated at construction.
//!
//! Grounded on the teacher's `imurl::ImUrl`: an `Arc`-wrapped `url::Url` for
//! cheap `Clone`, plus a cached string form. `HttpUrl` narrows `ImUrl`'s
//! "any scheme `url::Url` accepts" to exactly `{http, https}`, since it is
//! only ever used as the anchor URL a captured document was fetched from.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use url::Url;

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HttpUrl {
    url_str: Cow<'static, str>,
    #[serde(with = "url_serde")]
    url: Arc<Url>,
}

mod url_serde {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(url: &Arc<Url>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(url.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Arc<Url>, D::Error> {
        let s = String::deserialize(d)?;
        Url::parse(&s).map(Arc::new).map_err(serde::de::Error::custom)
    }
}

impl HttpUrl {
    pub fn parse(input: &str) -> Result<Self> {
        let parsed = Url::parse(input).with_context(|| format!("failed to parse URL: {input}"))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            bail!("unsupported scheme {:?} (only http/https accepted)", parsed.scheme());
        }
        let url_str = Cow::Owned(parsed.as_str().to_string());
        Ok(Self { url_str, url: Arc::new(parsed) })
    }

    pub fn as_str(&self) -> &str {
        &self.url_str
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.url.query()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.url.fragment()
    }

    /// Resolve `relative` against this URL (identical to `url::Url::join`).
    pub fn join(&self, relative: &str) -> Result<Url> {
        self.url.join(relative).with_context(|| format!("failed to resolve {relative:?} against {}", self.url))
    }

    pub fn without_fragment(&self) -> Result<Self> {
        let mut url = (*self.url).clone();
        url.set_fragment(None);
        Self::parse(url.as_str())
    }
}

impl fmt::Display for HttpUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url_str)
    }
}

impl Hash for HttpUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url_str.hash(state);
    }
}

impl FromStr for HttpUrl {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for HttpUrl {
    type Error = anyhow::Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HttpUrl {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl AsRef<str> for HttpUrl {
    fn as_ref(&self) -> &str {
        &self.url_str
    }
}

impl AsRef<Url> for HttpUrl {
    fn as_ref(&self) -> &Url {
        &self.url
    }
}

impl Deref for HttpUrl {
    type Target = Url;

    fn deref(&self) -> &Self::Target {
        &self.url
    }
}

/// Used by callers that only have a generic `&str`/`anyhow::Error` interface.
pub fn reject_non_http(scheme: &str) -> Result<()> {
    if scheme != "http" && scheme != "https" {
        return Err(anyhow!("unsupported scheme {scheme:?}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_http_and_https() {
        assert!(HttpUrl::parse("http://example.com/").is_ok());
        assert!(HttpUrl::parse("https://example.com/").is_ok());
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(HttpUrl::parse("ftp://example.com/").is_err());
        assert!(HttpUrl::parse("data:text/plain,hi").is_err());
    }

    #[test]
    fn clone_is_cheap() {
        let a = HttpUrl::parse("https://example.com/path").unwrap();
        let b = a.clone();
        assert!(Arc::ptr_eq(&a.url, &b.url));
    }

    #[test]
    fn without_fragment_strips_it() {
        let u = HttpUrl::parse("https://example.com/p#frag").unwrap();
        let stripped = u.without_fragment().unwrap();
        assert_eq!(stripped.fragment(), None);
        assert_eq!(stripped.path(), "/p");
    }

    #[test]
    fn join_resolves_relative() {
        let base = HttpUrl::parse("https://example.com/a/b").unwrap();
        let joined = base.join("../c").unwrap();
        assert_eq!(joined.as_str(), "https://example.com/c");
    }
}
