//! URL construction for class, object, collection and query endpoints.
//!
//! Pure string building: class names and object ids are passed through
//! unchecked, and nothing here touches the network.

use crate::query::Query;

#[derive(Debug, Clone)]
pub struct UrlBuilder {
    base: String,
}

impl UrlBuilder {
    /// `classes_url` is the class root, e.g. `https://api.parse.com/1/classes`.
    pub fn new(classes_url: &str) -> Self {
        Self {
            base: classes_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn class_url(&self, class_name: &str) -> String {
        format!("{}/{class_name}", self.base)
    }

    pub fn object_url(&self, class_name: &str, object_id: &str) -> String {
        format!("{}/{class_name}/{object_id}", self.base)
    }

    pub fn object_url_with_include<S: AsRef<str>>(
        &self,
        class_name: &str,
        object_id: &str,
        include: &[S],
    ) -> String {
        with_params(self.object_url(class_name, object_id), include_param(include))
    }

    pub fn collection_url<S: AsRef<str>>(&self, class_name: &str, include: &[S]) -> String {
        with_params(self.class_url(class_name), include_param(include))
    }

    /// `<base>/<class>?where=<url-encoded JSON>&include=a,b`; either parameter
    /// is omitted when empty.
    pub fn query_url(&self, class_name: &str, query: &Query) -> String {
        let where_param = query.where_clause().map(|clause| {
            let json = serde_json::Value::Object(clause).to_string();
            let encoded: String = url::form_urlencoded::byte_serialize(json.as_bytes()).collect();
            format!("where={encoded}")
        });
        let params = match (where_param, include_param(query.includes())) {
            (Some(w), Some(i)) => Some(format!("{w}&{i}")),
            (w, i) => w.or(i),
        };
        with_params(self.class_url(class_name), params)
    }
}

fn include_param<S: AsRef<str>>(include: &[S]) -> Option<String> {
    if include.is_empty() {
        return None;
    }
    // Each name is encoded on its own so the separating commas stay literal.
    let fields: Vec<String> = include
        .iter()
        .map(|f| url::form_urlencoded::byte_serialize(f.as_ref().as_bytes()).collect())
        .collect();
    Some(format!("include={}", fields.join(",")))
}

fn with_params(url: String, params: Option<String>) -> String {
    match params {
        Some(p) => format!("{url}?{p}"),
        None => url,
    }
}
