use http::Request;

/// Values of the placeholders of the matched route, in pattern order,
/// percent-decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: Vec<(String, String)>,
}

impl PathParams {
    pub fn empty() -> Self {
        Default::default()
    }

    pub(crate) fn push(&mut self, name: String, value: String) {
        self.params.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

/// Access to what the router stored in a request.
pub trait RequestExt {
    /// Empty outside of a matched route.
    fn path_params(&self) -> &PathParams;

    fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params().get(name)
    }
}

static NO_PARAMS: PathParams = PathParams { params: Vec::new() };

impl<B> RequestExt for Request<B> {
    fn path_params(&self) -> &PathParams {
        self.extensions().get::<PathParams>().unwrap_or(&NO_PARAMS)
    }
}

/// A copy of the request line, headers and extensions of `req`.
pub(crate) fn clone_head<B>(req: &Request<B>) -> Request<()> {
    let mut head = Request::new(());
    *head.method_mut() = req.method().clone();
    *head.uri_mut() = req.uri().clone();
    *head.version_mut() = req.version();
    *head.headers_mut() = req.headers().clone();
    *head.extensions_mut() = req.extensions().clone();
    head
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name() {
        let mut params = PathParams::empty();
        params.push("user".into(), "alice".into());
        params.push("group".into(), "admins".into());

        let mut request = Request::new(());
        assert!(request.path_params().is_empty());
        request.extensions_mut().insert(params);

        assert_eq!(request.path_param("group"), Some("admins"));
        assert_eq!(request.path_param("other"), None);
        assert_eq!(request.path_params().iter().collect::<Vec<_>>(), vec![("user", "alice"), ("group", "admins")]);
    }
}
