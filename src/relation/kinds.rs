//! Relationship definitions that can be merged into a view.
//!
//! `Relation` is a closed enum: every shape the view compiler understands has its own
//! variant and struct, and `MorphTo` exists only so that it can be rejected.
//! Constructors build the related query the way an ORM would, including the
//! `foreign key = parent key` constraint (see [`Relation::constrain`]).

use crate::relation::def::{qualify, Join, ModelMeta, RelationQuery, Where};
use sea_query::Value;

/// Inverse direct key: the child row holds the foreign key of its owner
///
/// `comments.post_id → posts.id` seen from a comment.
#[derive(Debug, Clone, PartialEq)]
pub struct BelongsTo {
    /// Model declaring the relation (holds the foreign key)
    pub child: ModelMeta,
    /// Owner model
    pub related: ModelMeta,
    /// Foreign key column on the child table
    pub foreign_key: String,
    /// Referenced column on the owner table
    pub owner_key: String,
    pub query: RelationQuery,
}

impl BelongsTo {
    pub fn new(child: ModelMeta, related: ModelMeta, foreign_key: impl Into<String>) -> Self {
        let owner_key = related.key_name.clone();
        let query = RelationQuery::new(related.table.clone());
        Self {
            child,
            related,
            foreign_key: foreign_key.into(),
            owner_key,
            query,
        }
    }

    pub fn with_owner_key(mut self, owner_key: impl Into<String>) -> Self {
        self.owner_key = owner_key.into();
        self
    }

    pub fn qualified_foreign_key(&self) -> String {
        self.child.qualify(&self.foreign_key)
    }

    pub fn qualified_owner_key(&self) -> String {
        self.related.qualify(&self.owner_key)
    }

    /// The child's own key
    pub fn qualified_parent_key(&self) -> String {
        self.child.qualified_key_name()
    }
}

/// Owning direct key: has-one or has-many
#[derive(Debug, Clone, PartialEq)]
pub struct HasOneOrMany {
    pub parent: ModelMeta,
    pub related: ModelMeta,
    /// Foreign key column on the related table
    pub foreign_key: String,
    /// Referenced column on the parent table
    pub local_key: String,
    pub query: RelationQuery,
}

impl HasOneOrMany {
    pub fn new(parent: ModelMeta, related: ModelMeta, foreign_key: impl Into<String>) -> Self {
        let foreign_key = foreign_key.into();
        let local_key = parent.key_name.clone();
        let mut query = RelationQuery::new(related.table.clone());
        query.and_where(Where::not_null(related.qualify(&foreign_key)));
        Self {
            parent,
            related,
            foreign_key,
            local_key,
            query,
        }
    }

    pub fn with_local_key(mut self, local_key: impl Into<String>) -> Self {
        self.local_key = local_key.into();
        self
    }

    pub fn qualified_foreign_key(&self) -> String {
        self.related.qualify(&self.foreign_key)
    }
}

/// Many-to-many through a pivot table
#[derive(Debug, Clone, PartialEq)]
pub struct BelongsToMany {
    pub parent: ModelMeta,
    pub related: ModelMeta,
    /// Pivot table
    pub table: String,
    /// Pivot column referencing the parent
    pub foreign_pivot_key: String,
    /// Pivot column referencing the related model
    pub related_pivot_key: String,
    /// Referenced column on the related table
    pub related_key: String,
    /// Extra pivot columns carried with every related row
    pub pivot_columns: Vec<String>,
    /// Name the pivot record is attached under
    pub accessor: String,
    pub query: RelationQuery,
}

impl BelongsToMany {
    pub fn new(
        parent: ModelMeta,
        related: ModelMeta,
        table: impl Into<String>,
        foreign_pivot_key: impl Into<String>,
        related_pivot_key: impl Into<String>,
    ) -> Self {
        let table = table.into();
        let related_pivot_key = related_pivot_key.into();
        let related_key = related.key_name.clone();
        let mut query = RelationQuery::new(related.table.clone());
        query.join(Join::new(
            table.clone(),
            related.qualify(&related_key),
            qualify(&table, &related_pivot_key),
        ));
        Self {
            parent,
            related,
            table,
            foreign_pivot_key: foreign_pivot_key.into(),
            related_pivot_key,
            related_key,
            pivot_columns: Vec::new(),
            accessor: "pivot".to_string(),
            query,
        }
    }

    /// Polymorphic pivot (morphed-by-many): restrict the pivot rows to the related type
    pub fn morphed_by(mut self, type_column: &str) -> Self {
        let type_column = qualify(&self.table, type_column);
        let morph_class = self.related.morph_class.clone();
        self.query.and_where(Where::eq(type_column, morph_class));
        self
    }

    /// Carry pivot columns with every related row
    pub fn with_pivot<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            let column = column.into();
            if !self.pivot_columns.contains(&column) {
                self.pivot_columns.push(column);
            }
        }
        self
    }

    pub fn with_accessor(mut self, accessor: impl Into<String>) -> Self {
        self.accessor = accessor.into();
        self
    }

    pub fn qualified_foreign_pivot_key(&self) -> String {
        qualify(&self.table, &self.foreign_pivot_key)
    }
}

/// Has-many-through or has-one-through: one intermediate table
#[derive(Debug, Clone, PartialEq)]
pub struct HasManyThrough {
    pub far_parent: ModelMeta,
    pub through: ModelMeta,
    pub related: ModelMeta,
    /// Column on the intermediate table referencing the far parent
    pub first_key: String,
    /// Column on the related table referencing the intermediate table
    pub second_key: String,
    /// Referenced column on the far parent
    pub local_key: String,
    /// Referenced column on the intermediate table
    pub second_local_key: String,
    pub query: RelationQuery,
}

impl HasManyThrough {
    pub fn new(
        far_parent: ModelMeta,
        through: ModelMeta,
        related: ModelMeta,
        first_key: impl Into<String>,
        second_key: impl Into<String>,
    ) -> Self {
        let second_key = second_key.into();
        let local_key = far_parent.key_name.clone();
        let second_local_key = through.key_name.clone();
        let mut query = RelationQuery::new(related.table.clone());
        query.join(Join::new(
            through.table.clone(),
            through.qualify(&second_local_key),
            related.qualify(&second_key),
        ));
        Self {
            far_parent,
            through,
            related,
            first_key: first_key.into(),
            second_key,
            local_key,
            second_local_key,
            query,
        }
    }

    pub fn qualified_first_key(&self) -> String {
        self.through.qualify(&self.first_key)
    }
}

/// End of a hop holding the polymorphic type column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphSide {
    /// The previous table, e.g. `taggables.taggable_type` when entering `videos`
    Local,
    /// The table being entered, e.g. `comments.commentable_type` when entering from `posts`
    Foreign,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorphType {
    pub column: String,
    pub value: String,
    pub side: MorphSide,
}

/// One link of a deep chain: `next.foreign_key = previous.local_key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepHop {
    /// Column on the table being entered
    pub foreign_key: String,
    /// Column on the previous table
    pub local_key: String,
    pub morph_type: Option<MorphType>,
}

impl DeepHop {
    pub fn new(foreign_key: impl Into<String>, local_key: impl Into<String>) -> Self {
        Self {
            foreign_key: foreign_key.into(),
            local_key: local_key.into(),
            morph_type: None,
        }
    }

    /// Inverse polymorphic link, e.g. `taggables.taggable_id` + `taggables.taggable_type = 'Video'`
    pub fn morph(
        foreign_key: impl Into<String>,
        local_key: impl Into<String>,
        type_column: impl Into<String>,
        type_value: impl Into<String>,
    ) -> Self {
        Self::with_morph_type(foreign_key, local_key, type_column, type_value, MorphSide::Local)
    }

    /// Owning polymorphic link, e.g. `comments.commentable_id` + `comments.commentable_type = 'Post'`
    pub fn morph_many(
        foreign_key: impl Into<String>,
        local_key: impl Into<String>,
        type_column: impl Into<String>,
        type_value: impl Into<String>,
    ) -> Self {
        Self::with_morph_type(foreign_key, local_key, type_column, type_value, MorphSide::Foreign)
    }

    fn with_morph_type(
        foreign_key: impl Into<String>,
        local_key: impl Into<String>,
        type_column: impl Into<String>,
        type_value: impl Into<String>,
        side: MorphSide,
    ) -> Self {
        Self {
            foreign_key: foreign_key.into(),
            local_key: local_key.into(),
            morph_type: Some(MorphType {
                column: type_column.into(),
                value: type_value.into(),
                side,
            }),
        }
    }
}

/// Intermediate table whose columns are carried with every related row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntermediateTable {
    pub table: String,
    pub columns: Vec<String>,
    pub accessor: String,
}

/// Chain of any depth from a far parent to the related model
///
/// `through` lists the intermediate models in order; `hops` has one more entry
/// than `through` and links far parent → through\[0\] → … → related.
#[derive(Debug, Clone, PartialEq)]
pub struct HasManyDeep {
    pub far_parent: ModelMeta,
    pub related: ModelMeta,
    pub through: Vec<ModelMeta>,
    pub hops: Vec<DeepHop>,
    pub intermediates: Vec<IntermediateTable>,
    pub query: RelationQuery,
}

impl HasManyDeep {
    pub fn new(far_parent: ModelMeta, related: ModelMeta, through: Vec<ModelMeta>, hops: Vec<DeepHop>) -> Self {
        let mut query = RelationQuery::new(related.table.clone());

        let mut tables = Vec::with_capacity(through.len() + 2);
        tables.push(far_parent.table.clone());
        tables.extend(through.iter().map(|model| model.table.clone()));
        tables.push(related.table.clone());

        // Join every intermediate table, walking back from the related table
        for (index, hop) in hops.iter().enumerate().rev() {
            let (Some(previous), Some(entered)) = (tables.get(index), tables.get(index + 1)) else {
                continue;
            };
            if index > 0 {
                query.join(Join::new(
                    previous.clone(),
                    qualify(entered, &hop.foreign_key),
                    qualify(previous, &hop.local_key),
                ));
            }
            if let Some(morph_type) = &hop.morph_type {
                let type_table = match morph_type.side {
                    MorphSide::Local => previous,
                    MorphSide::Foreign => entered,
                };
                // The far parent is not part of the query; see `has_far_parent_morph_type`
                if index > 0 || morph_type.side == MorphSide::Foreign {
                    query.and_where(Where::eq(qualify(type_table, &morph_type.column), morph_type.value.clone()));
                }
            }
        }

        Self {
            far_parent,
            related,
            through,
            hops,
            intermediates: Vec::new(),
            query,
        }
    }

    /// Carry columns of an intermediate table with every related row
    pub fn with_intermediate<I, S>(mut self, table: impl Into<String>, columns: I, accessor: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.intermediates.push(IntermediateTable {
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            accessor: accessor.into(),
        });
        self
    }

    /// Column on the first intermediate table referencing the far parent
    pub fn first_key_name(&self) -> Option<&str> {
        self.hops.first().map(|hop| hop.foreign_key.as_str())
    }

    pub fn qualified_first_key(&self) -> Option<String> {
        Some(self.through.first()?.qualify(self.first_key_name()?))
    }

    /// First hop enters the first intermediate through its own key, i.e. it is an inverse hop
    pub fn has_leading_inverse_hop(&self) -> bool {
        match (self.first_key_name(), self.through.first()) {
            (Some(first_key), Some(intermediate)) => first_key == intermediate.key_name,
            _ => false,
        }
    }

    /// First hop filters by a polymorphic type stored on the far parent
    pub fn has_far_parent_morph_type(&self) -> bool {
        matches!(
            self.hops.first().and_then(|hop| hop.morph_type.as_ref()),
            Some(MorphType { side: MorphSide::Local, .. })
        )
    }

    /// Column on the far parent the chain starts from
    pub fn qualified_local_key(&self) -> Option<String> {
        let hop = self.hops.first()?;
        Some(self.far_parent.qualify(&hop.local_key))
    }
}

/// Polymorphic inverse relation; its target table is only known per row
#[derive(Debug, Clone, PartialEq)]
pub struct MorphTo {
    pub child: ModelMeta,
    pub type_column: String,
    pub id_column: String,
    pub query: RelationQuery,
}

impl MorphTo {
    pub fn new(child: ModelMeta, type_column: impl Into<String>, id_column: impl Into<String>) -> Self {
        Self {
            child,
            type_column: type_column.into(),
            id_column: id_column.into(),
            query: RelationQuery::default(),
        }
    }
}

/// A relationship definition
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    BelongsTo(BelongsTo),
    HasOneOrMany(HasOneOrMany),
    BelongsToMany(BelongsToMany),
    HasManyThrough(HasManyThrough),
    HasManyDeep(HasManyDeep),
    MorphTo(MorphTo),
}

impl Relation {
    /// Short name of the relation shape
    pub fn kind_name(&self) -> &'static str {
        match self {
            Relation::BelongsTo(_) => "belongs_to",
            Relation::HasOneOrMany(_) => "has_one_or_many",
            Relation::BelongsToMany(_) => "belongs_to_many",
            Relation::HasManyThrough(_) => "has_many_through",
            Relation::HasManyDeep(_) => "has_many_deep",
            Relation::MorphTo(_) => "morph_to",
        }
    }

    pub fn query(&self) -> &RelationQuery {
        match self {
            Relation::BelongsTo(relation) => &relation.query,
            Relation::HasOneOrMany(relation) => &relation.query,
            Relation::BelongsToMany(relation) => &relation.query,
            Relation::HasManyThrough(relation) => &relation.query,
            Relation::HasManyDeep(relation) => &relation.query,
            Relation::MorphTo(relation) => &relation.query,
        }
    }

    pub fn query_mut(&mut self) -> &mut RelationQuery {
        match self {
            Relation::BelongsTo(relation) => &mut relation.query,
            Relation::HasOneOrMany(relation) => &mut relation.query,
            Relation::BelongsToMany(relation) => &mut relation.query,
            Relation::HasManyThrough(relation) => &mut relation.query,
            Relation::HasManyDeep(relation) => &mut relation.query,
            Relation::MorphTo(relation) => &mut relation.query,
        }
    }

    /// Related model, unknown for `MorphTo`
    pub fn related(&self) -> Option<&ModelMeta> {
        match self {
            Relation::BelongsTo(relation) => Some(&relation.related),
            Relation::HasOneOrMany(relation) => Some(&relation.related),
            Relation::BelongsToMany(relation) => Some(&relation.related),
            Relation::HasManyThrough(relation) => Some(&relation.related),
            Relation::HasManyDeep(relation) => Some(&relation.related),
            Relation::MorphTo(_) => None,
        }
    }

    /// Column the relation filters by parent key when used on its own
    pub fn constraint_column(&self) -> Option<String> {
        match self {
            Relation::BelongsTo(relation) => Some(relation.qualified_owner_key()),
            Relation::HasOneOrMany(relation) => Some(relation.qualified_foreign_key()),
            Relation::BelongsToMany(relation) => Some(relation.qualified_foreign_pivot_key()),
            Relation::HasManyThrough(relation) => Some(relation.qualified_first_key()),
            Relation::HasManyDeep(relation) => relation.qualified_first_key(),
            Relation::MorphTo(_) => None,
        }
    }

    /// Restrict the relation to one parent key value
    pub fn constrain(mut self, parent_key: impl Into<Value>) -> Self {
        if let Some(column) = self.constraint_column() {
            self.query_mut().and_where(Where::eq(column, parent_key));
        }
        self
    }

    /// Eager load relations on every related row
    pub fn with<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query_mut().with(relations);
        self
    }

    /// Add an arbitrary predicate to the related query
    pub fn where_clause(mut self, predicate: Where) -> Self {
        self.query_mut().and_where(predicate);
        self
    }
}

macro_rules! impl_from_relation {
    ($($kind:ident),+) => {
        $(
            impl From<$kind> for Relation {
                fn from(relation: $kind) -> Self {
                    Relation::$kind(relation)
                }
            }
        )+
    };
}

impl_from_relation!(BelongsTo, HasOneOrMany, BelongsToMany, HasManyThrough, HasManyDeep, MorphTo);
