//! Completion-callback variants of the asynchronous-result operations.
//!
//! Each `*_with` method runs the operation, hands `Result<&T, &E>` to the
//! callback, then returns the same `Result<T, E>` so both styles compose.

use lowladb_core::{Collection, CoreError, CoreResult, Cursor, Database, Document, Filter};
use serde_json::Value;

/// Delivers `result` to `callback` and returns it.
pub fn complete<T, E, F>(result: Result<T, E>, callback: F) -> Result<T, E>
where
    F: FnOnce(Result<&T, &E>),
{
    callback(result.as_ref());
    result
}

/// Options for [`DatabaseCallbacks::collection_names_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionNamesOptions {
    /// Return bare strings instead of `{ "name": ... }` objects.
    pub names_only: bool,
}

impl CollectionNamesOptions {
    /// Options returning plain name strings.
    pub fn names_only() -> Self {
        Self { names_only: true }
    }
}

/// Callback style for [`Collection`].
pub trait CollectionCallbacks {
    /// [`Collection::insert`] with a completion callback.
    fn insert_with<F>(&self, doc: Document, callback: F) -> CoreResult<Document>
    where
        F: FnOnce(Result<&Document, &CoreError>);

    /// [`Collection::insert_many`] with a completion callback.
    fn insert_many_with<F>(&self, docs: Vec<Document>, callback: F) -> CoreResult<Vec<Document>>
    where
        F: FnOnce(Result<&Vec<Document>, &CoreError>);

    /// [`Collection::find_one`] with a completion callback.
    fn find_one_with<F>(&self, filter: Filter, callback: F) -> CoreResult<Option<Document>>
    where
        F: FnOnce(Result<&Option<Document>, &CoreError>);

    /// [`Collection::count`] with a completion callback.
    fn count_with<F>(&self, filter: Filter, callback: F) -> CoreResult<usize>
    where
        F: FnOnce(Result<&usize, &CoreError>);

    /// [`Collection::remove`] with a completion callback.
    fn remove_with<F>(&self, filter: Filter, callback: F) -> CoreResult<usize>
    where
        F: FnOnce(Result<&usize, &CoreError>);

    /// [`Collection::find_and_modify`] with a completion callback.
    fn find_and_modify_with<F>(
        &self,
        filter: Filter,
        update: &Document,
        callback: F,
    ) -> CoreResult<Option<Document>>
    where
        F: FnOnce(Result<&Option<Document>, &CoreError>);
}

impl CollectionCallbacks for Collection {
    fn insert_with<F>(&self, doc: Document, callback: F) -> CoreResult<Document>
    where
        F: FnOnce(Result<&Document, &CoreError>),
    {
        complete(self.insert(doc), callback)
    }

    fn insert_many_with<F>(&self, docs: Vec<Document>, callback: F) -> CoreResult<Vec<Document>>
    where
        F: FnOnce(Result<&Vec<Document>, &CoreError>),
    {
        complete(self.insert_many(docs), callback)
    }

    fn find_one_with<F>(&self, filter: Filter, callback: F) -> CoreResult<Option<Document>>
    where
        F: FnOnce(Result<&Option<Document>, &CoreError>),
    {
        complete(self.find_one(filter), callback)
    }

    fn count_with<F>(&self, filter: Filter, callback: F) -> CoreResult<usize>
    where
        F: FnOnce(Result<&usize, &CoreError>),
    {
        complete(self.count(filter), callback)
    }

    fn remove_with<F>(&self, filter: Filter, callback: F) -> CoreResult<usize>
    where
        F: FnOnce(Result<&usize, &CoreError>),
    {
        complete(self.remove(filter), callback)
    }

    fn find_and_modify_with<F>(
        &self,
        filter: Filter,
        update: &Document,
        callback: F,
    ) -> CoreResult<Option<Document>>
    where
        F: FnOnce(Result<&Option<Document>, &CoreError>),
    {
        complete(self.find_and_modify(filter, update), callback)
    }
}

/// Callback style for [`Cursor`].
pub trait CursorCallbacks {
    /// [`Cursor::to_array`] with a completion callback.
    fn to_array_with<F>(&self, callback: F) -> CoreResult<Vec<Document>>
    where
        F: FnOnce(Result<&Vec<Document>, &CoreError>);

    /// [`Cursor::count`] with a completion callback.
    fn count_with<F>(&self, apply_limit: bool, callback: F) -> CoreResult<usize>
    where
        F: FnOnce(Result<&usize, &CoreError>);
}

impl CursorCallbacks for Cursor {
    fn to_array_with<F>(&self, callback: F) -> CoreResult<Vec<Document>>
    where
        F: FnOnce(Result<&Vec<Document>, &CoreError>),
    {
        complete(self.to_array(), callback)
    }

    fn count_with<F>(&self, apply_limit: bool, callback: F) -> CoreResult<usize>
    where
        F: FnOnce(Result<&usize, &CoreError>),
    {
        complete(self.count(apply_limit), callback)
    }
}

/// Callback style for [`Database`].
pub trait DatabaseCallbacks {
    /// Lists collections as JSON values: strings when
    /// `options.names_only`, `{ "name": ... }` objects otherwise.
    fn collection_names_with<F>(
        &self,
        prefix: Option<&str>,
        options: CollectionNamesOptions,
        callback: F,
    ) -> CoreResult<Vec<Value>>
    where
        F: FnOnce(Result<&Vec<Value>, &CoreError>);

    /// [`Database::drop_database`] with a completion callback.
    fn drop_database_with<F>(&self, callback: F) -> CoreResult<()>
    where
        F: FnOnce(Result<&(), &CoreError>);
}

impl DatabaseCallbacks for Database {
    fn collection_names_with<F>(
        &self,
        prefix: Option<&str>,
        options: CollectionNamesOptions,
        callback: F,
    ) -> CoreResult<Vec<Value>>
    where
        F: FnOnce(Result<&Vec<Value>, &CoreError>),
    {
        let names = self.collection_names_only(prefix).map(|names| {
            names
                .into_iter()
                .map(|name| {
                    if options.names_only {
                        Value::String(name)
                    } else {
                        serde_json::json!({ "name": name })
                    }
                })
                .collect()
        });
        complete(names, callback)
    }

    fn drop_database_with<F>(&self, callback: F) -> CoreResult<()>
    where
        F: FnOnce(Result<&(), &CoreError>),
    {
        complete(self.drop_database(), callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_passes_result_through() {
        let mut seen = None;
        let result: Result<u8, String> = complete(Ok(3), |r| seen = Some(r.copied().map_err(String::clone)));
        assert_eq!(result, Ok(3));
        assert_eq!(seen, Some(Ok(3)));

        let mut message = String::new();
        let result: Result<u8, String> =
            complete(Err("boom".into()), |r| message = r.unwrap_err().clone());
        assert!(result.is_err());
        assert_eq!(message, "boom");
    }
}
