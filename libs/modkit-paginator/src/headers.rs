//! Response targets for the page metadata headers.

use std::collections::HashMap;
use std::hash::BuildHasher;

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Response};

use crate::error::{PaginatorError, Result};

/// Anything a page can write its `X-Total` / `X-Limit` / `X-Offset` headers to.
pub trait HeaderSink {
    /// Set (replace) one header.
    ///
    /// # Errors
    /// Returns `PaginatorError::InvalidResponseTarget` if the target cannot
    /// carry the header.
    fn set_header(&mut self, name: &str, value: &str) -> Result<()>;

    /// Set several headers at once.
    ///
    /// The default writes them one by one and stops at the first rejected
    /// header, so earlier ones stay written. Sinks that can reject a header
    /// should override it to check every pair before writing any.
    ///
    /// # Errors
    /// Returns `PaginatorError::InvalidResponseTarget` if a header is rejected.
    fn set_all(&mut self, headers: &[(&str, &str)]) -> Result<()> {
        for (name, value) in headers {
            self.set_header(name, value)?;
        }
        Ok(())
    }
}

fn typed_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| PaginatorError::InvalidResponseTarget(format!("header {name}: {e}")))?;
    let value = HeaderValue::from_str(value)
        .map_err(|e| PaginatorError::InvalidResponseTarget(format!("value {value}: {e}")))?;
    Ok((header, value))
}

impl HeaderSink for HeaderMap {
    fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let (name, value) = typed_header(name, value)?;
        self.insert(name, value);
        Ok(())
    }

    fn set_all(&mut self, headers: &[(&str, &str)]) -> Result<()> {
        let typed = headers
            .iter()
            .map(|(name, value)| typed_header(name, value))
            .collect::<Result<Vec<_>>>()?;
        for (name, value) in typed {
            self.insert(name, value);
        }
        Ok(())
    }
}

impl<B> HeaderSink for Response<B> {
    fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        self.headers_mut().set_header(name, value)
    }

    fn set_all(&mut self, headers: &[(&str, &str)]) -> Result<()> {
        self.headers_mut().set_all(headers)
    }
}

impl<S: BuildHasher> HeaderSink for HashMap<String, String, S> {
    fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        self.insert(name.to_owned(), value.to_owned());
        Ok(())
    }
}
