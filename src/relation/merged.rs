//! Merged-relation facade: read a merged view as a relation of one parent.
//!
//! The view is filtered by `foreign_key = <parent key>`; rows are decoded into their
//! concrete models, eager loads are dispatched per type and the foreign key is dropped
//! before models are returned.

use crate::error::{MergeError, MergeResult};
use crate::hydration::decoder::{decode_batch, Hydrated};
use crate::hydration::row::{MergedRow, FOREIGN_KEY, METADATA_COLUMNS};
use crate::manager::MergeManager;
use crate::model::{is_null, Attributes, MergedModel, Related};
use crate::relation::def::{column_expr, Where};
use crate::relation::eager::dispatch;
use sea_query::{Alias, Asterisk, Expr, Order, Query, SelectStatement, Value};

/// Alias of the count column in `count` queries
const AGGREGATE: &str = "aggregate";

/// Which rows of the view a relation reads
enum Scope {
    /// `foreign_key = <parent key>`
    Parent(Where),
    /// Scoped to a parent whose key is unset: nothing to read
    MissingKey,
    /// No parent: the whole view
    Unscoped,
}

/// One page of results
#[derive(Debug, Clone)]
pub struct Page<T = Box<dyn MergedModel>> {
    pub items: Vec<T>,
    /// Rows matching the relation over all pages
    pub total: u64,
    pub per_page: u64,
    /// 1-based
    pub current_page: u64,
}

impl<T> Page<T> {
    /// Last page number, at least 1
    pub fn last_page(&self) -> u64 {
        if self.per_page == 0 {
            return 1;
        }
        self.total.div_ceil(self.per_page).max(1)
    }

    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page()
    }
}

/// Relation over a merged view
///
/// Built through [`MergeManager::merged_relation`] (one parent) or
/// [`MergeManager::merged`] (no parent, for batched eager loading).
#[derive(Clone)]
pub struct MergedRelation<'m> {
    manager: &'m MergeManager,
    view: String,
    parent: Option<Attributes>,
    parent_key_name: Option<String>,
    local_key: Option<String>,
    columns: Vec<String>,
    wheres: Vec<Where>,
    orders: Vec<(String, Order)>,
    limit: Option<u64>,
    offset: Option<u64>,
    with: Vec<String>,
    pivot_columns: Vec<String>,
    fallback_tag: Option<String>,
}

impl<'m> MergedRelation<'m> {
    pub fn new(manager: &'m MergeManager, view: impl Into<String>) -> Self {
        Self {
            manager,
            view: view.into(),
            parent: None,
            parent_key_name: None,
            local_key: None,
            columns: Vec::new(),
            wheres: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            with: Vec::new(),
            pivot_columns: Vec::new(),
            fallback_tag: None,
        }
    }

    /// Scope the relation to one parent model
    pub fn for_parent(mut self, parent: &dyn MergedModel) -> Self {
        self.parent_key_name = Some(parent.key_name().to_string());
        self.parent = Some(parent.attributes().clone());
        self
    }

    /// Parent column compared against `foreign_key`, instead of the parent's key
    pub fn with_local_key(mut self, local_key: impl Into<String>) -> Self {
        self.local_key = Some(local_key.into());
        self
    }

    /// Model class for rows without a type tag
    pub fn with_fallback_tag(mut self, tag: impl Into<String>) -> Self {
        self.fallback_tag = Some(tag.into());
        self
    }

    /// Restrict the projection; metadata columns are always added
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.wheres.push(Where::eq(column, value));
        self
    }

    pub fn where_clause(mut self, predicate: Where) -> Self {
        self.wheres.push(predicate);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.orders.push((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Eager load relations on every result, on top of each branch's own list
    pub fn with<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for relation in relations {
            let relation = relation.into();
            if !self.with.contains(&relation) {
                self.with.push(relation);
            }
        }
        self
    }

    /// Pivot column aliases to keep when the projection is restricted
    pub fn with_pivot_columns<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pivot_columns.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    fn local_key_name(&self) -> Option<&str> {
        self.local_key.as_deref().or(self.parent_key_name.as_deref())
    }

    /// Value of the parent's local key, `None` when unset or NULL
    pub fn parent_key(&self) -> Option<Value> {
        let parent = self.parent.as_ref()?;
        parent
            .get(self.local_key_name()?)
            .filter(|value| !is_null(value))
            .cloned()
    }

    /// Lazy default access
    ///
    /// Returns an empty collection without querying when the parent key is unknown.
    /// A relation without a parent reads the whole view.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn get_results(&self) -> MergeResult<Vec<Box<dyn MergedModel>>> {
        if matches!(self.scope(), Scope::MissingKey) {
            log::debug!("Parent key unknown, skipping query on {}", self.view);
            return Ok(Vec::new());
        }
        self.get(&[])
    }

    /// Fetch, decode and eager load the related models
    ///
    /// `columns` extends the projection; with no columns at all every view column is read.
    /// A relation scoped to a parent whose key is unset returns an empty collection.
    ///
    /// # Errors
    ///
    /// Engine errors unchanged; `MergeError::UnknownModelType` for an unregistered type tag.
    pub fn get(&self, columns: &[&str]) -> MergeResult<Vec<Box<dyn MergedModel>>> {
        let filter = match self.scope() {
            Scope::MissingKey => return Ok(Vec::new()),
            Scope::Parent(filter) => Some(filter),
            Scope::Unscoped => None,
        };

        let mut select = self.base_select(filter);
        self.project(&mut select, columns);
        if let Some(limit) = self.limit {
            select.limit(limit);
        }
        if let Some(offset) = self.offset {
            select.offset(offset);
        }

        let hydrated = self.hydrate(&select)?;
        Ok(hydrated.into_iter().map(Hydrated::into_model).collect())
    }

    /// First related model, `None` when there is none
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn first(&self, columns: &[&str]) -> MergeResult<Option<Box<dyn MergedModel>>> {
        Ok(self.clone().limit(1).get(columns)?.into_iter().next())
    }

    /// Number of related rows
    ///
    /// # Errors
    ///
    /// Engine errors unchanged; `MergeError::ParseError` if the count is not an integer.
    pub fn count(&self) -> MergeResult<u64> {
        let filter = match self.scope() {
            Scope::MissingKey => return Ok(0),
            Scope::Parent(filter) => Some(filter),
            Scope::Unscoped => None,
        };

        let mut select = self.base_select(filter);
        select.expr_as(Expr::cust("COUNT(*)"), Alias::new(AGGREGATE));
        let (sql, values) = self.manager.backend().build_select(&select);

        let rows = self.manager.executor().query_all(&sql, &values)?;
        rows.first()
            .and_then(|row| row.get(AGGREGATE))
            .map(value_as_u64)
            .unwrap_or(Ok(0))
    }

    /// One page of related models
    ///
    /// `per_page` defaults to the configured page size; `page` is 1-based.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn paginate(&self, per_page: Option<u64>, columns: &[&str], page: u64) -> MergeResult<Page> {
        let per_page = per_page.unwrap_or(self.manager.config().per_page).max(1);
        let current_page = page.max(1);

        let total = self.count()?;
        let items = match (current_page - 1).checked_mul(per_page) {
            Some(offset) if total > 0 && offset < total => {
                self.clone().limit(per_page).offset(offset).get(columns)?
            }
            _ => Vec::new(),
        };

        Ok(Page {
            items,
            total,
            per_page,
            current_page,
        })
    }

    /// Load this relation onto a batch of parents with one query
    ///
    /// Each row is matched to its parents through its foreign key; every parent gets
    /// `relation_name` set, empty when nothing matched.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn eager_load(&self, parents: &mut [Box<dyn MergedModel>], relation_name: &str) -> MergeResult<()> {
        let Some(local_key) = self
            .local_key
            .clone()
            .or_else(|| parents.first().map(|parent| parent.key_name().to_string()))
        else {
            return Ok(());
        };

        let mut keys: Vec<Value> = Vec::new();
        for parent in parents.iter() {
            if let Some(key) = parent.get_attribute(&local_key).filter(|value| !is_null(value)) {
                if !keys.contains(key) {
                    keys.push(key.clone());
                }
            }
        }

        let hydrated = if keys.is_empty() {
            Vec::new()
        } else {
            let mut select = self.base_select(Some(Where::In {
                column: FOREIGN_KEY.to_string(),
                values: keys,
            }));
            self.project(&mut select, &[]);
            self.hydrate(&select)?
        };

        for parent in parents.iter_mut() {
            let key = parent.get_attribute(&local_key).and_then(match_key);
            let matched = hydrated
                .iter()
                .filter(|entry| key.is_some() && entry.foreign_key.as_ref().and_then(match_key) == key)
                .map(|entry| entry.model.clone())
                .collect();
            parent.set_relation(relation_name, Related::Many(matched));
        }
        log::debug!(
            "Eager loaded {relation_name} from {} onto {} parents ({} rows)",
            self.view,
            parents.len(),
            hydrated.len()
        );

        Ok(())
    }

    fn scope(&self) -> Scope {
        match &self.parent {
            Some(_) => match self.parent_key() {
                Some(key) => Scope::Parent(Where::eq(FOREIGN_KEY, key)),
                None => Scope::MissingKey,
            },
            None => Scope::Unscoped,
        }
    }

    fn base_select(&self, filter: Option<Where>) -> SelectStatement {
        let mut select = Query::select();
        select.from(Alias::new(self.view.clone()));
        if let Some(filter) = filter {
            select.and_where(filter.to_expr());
        }
        for predicate in &self.wheres {
            select.and_where(predicate.to_expr());
        }
        select
    }

    fn project(&self, select: &mut SelectStatement, columns: &[&str]) {
        let mut requested: Vec<String> = self.columns.clone();
        requested.extend(columns.iter().map(|column| column.to_string()));

        if requested.is_empty() || requested.iter().any(|column| column == "*") {
            select.column(Asterisk);
        } else {
            requested.extend(self.pivot_columns.iter().cloned());
            requested.extend(METADATA_COLUMNS.iter().map(|column| column.to_string()));
            let mut seen: Vec<&str> = Vec::with_capacity(requested.len());
            for column in &requested {
                if seen.contains(&column.as_str()) {
                    continue;
                }
                seen.push(column);
                select.expr(column_expr(column));
            }
        }

        for (column, order) in &self.orders {
            select.order_by(Alias::new(column.clone()), order.clone());
        }
    }

    fn hydrate(&self, select: &SelectStatement) -> MergeResult<Vec<Hydrated>> {
        let (sql, values) = self.manager.backend().build_select(select);
        let rows: Vec<MergedRow> = self.manager.executor().query_all(&sql, &values)?;

        let mut hydrated = decode_batch(self.manager.registry(), rows, self.fallback_tag.as_deref())?;
        if !hydrated.is_empty() {
            dispatch(&mut hydrated, &self.with, self.manager.loader())?;
        }
        Ok(hydrated)
    }
}

impl std::fmt::Debug for MergedRelation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergedRelation")
            .field("view", &self.view)
            .field("parent_key", &self.parent_key())
            .field("columns", &self.columns)
            .field("with", &self.with)
            .finish_non_exhaustive()
    }
}

fn value_as_u64(value: &Value) -> MergeResult<u64> {
    let count = match value {
        Value::TinyInt(Some(v)) => u64::try_from(*v).ok(),
        Value::SmallInt(Some(v)) => u64::try_from(*v).ok(),
        Value::Int(Some(v)) => u64::try_from(*v).ok(),
        Value::BigInt(Some(v)) => u64::try_from(*v).ok(),
        Value::TinyUnsigned(Some(v)) => Some(u64::from(*v)),
        Value::SmallUnsigned(Some(v)) => Some(u64::from(*v)),
        Value::Unsigned(Some(v)) => Some(u64::from(*v)),
        Value::BigUnsigned(Some(v)) => Some(*v),
        Value::String(Some(v)) => v.parse().ok(),
        _ => None,
    };
    count.ok_or_else(|| MergeError::ParseError(format!("count is not a non-negative integer: {value:?}")))
}

/// Comparable form of a key; integer widths and string keys compare by value
fn match_key(value: &Value) -> Option<String> {
    let key = match value {
        Value::TinyInt(Some(v)) => v.to_string(),
        Value::SmallInt(Some(v)) => v.to_string(),
        Value::Int(Some(v)) => v.to_string(),
        Value::BigInt(Some(v)) => v.to_string(),
        Value::TinyUnsigned(Some(v)) => v.to_string(),
        Value::SmallUnsigned(Some(v)) => v.to_string(),
        Value::Unsigned(Some(v)) => v.to_string(),
        Value::BigUnsigned(Some(v)) => v.to_string(),
        Value::String(Some(v)) => v.clone(),
        Value::Uuid(Some(v)) => v.to_string(),
        other if is_null(other) => return None,
        other => format!("{other:?}"),
    };
    Some(key)
}
