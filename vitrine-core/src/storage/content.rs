//! Position-ordered content: blog posts and catalogue items.
//!
//! Both live in per-language partitions and carry a `position` that the
//! sequencer keeps collision-free within a partition.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The ordered collections known to the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Blog,
    Item,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Blog => "blog",
            ContentKind::Item => "item",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entity ordered by an integer position inside a partition.
pub trait Orderable: Clone + Send + Sync + 'static {
    const KIND: ContentKind;

    /// Input used to create a new entity.
    type Draft: ContentDraft;
    /// Partial update applied to an existing entity.
    type Patch: ContentPatch<Self>;

    fn id(&self) -> Uuid;
    fn owner_id(&self) -> Uuid;
    fn partition(&self) -> &str;
    fn position(&self) -> i32;
    fn set_position(&mut self, position: i32);
}

/// Fields of a creation request the content service validates and sequences on.
pub trait ContentDraft: Send + Sync + 'static {
    fn title(&self) -> &str;
    fn partition(&self) -> &str;
    fn position(&self) -> i32;
    fn owner_id(&self) -> Uuid;
    fn set_owner(&mut self, owner_id: Uuid);
}

/// A partial update. The position is pulled out so the sequencer can claim it first.
pub trait ContentPatch<T>: Send + Sync + 'static {
    fn requested_position(&self) -> Option<i32>;
    fn title(&self) -> Option<&str>;
    fn apply_to(self, entity: &mut T);
}

/// Pagination and partition filter for listing ordered content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub language: Option<String>,
    pub offset: u32,
    pub limit: u32,
}

impl ListQuery {
    pub const MAX_LIMIT: u32 = 100;

    pub fn language(language: impl Into<String>) -> Self {
        Self {
            language: Some(language.into()),
            ..Default::default()
        }
    }

    pub fn with_page(mut self, offset: u32, limit: u32) -> Self {
        self.offset = offset;
        self.limit = limit.clamp(1, Self::MAX_LIMIT);
        self
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            language: None,
            offset: 0,
            limit: Self::MAX_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blog {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub position: i32,
    pub language: String,
    pub status: bool,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBlog {
    pub title: String,
    pub content: String,
    pub position: i32,
    pub language: String,
    #[serde(default)]
    pub status: bool,
    #[serde(skip)]
    pub owner_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlogPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub position: Option<i32>,
    pub status: Option<bool>,
}

impl Orderable for Blog {
    const KIND: ContentKind = ContentKind::Blog;
    type Draft = NewBlog;
    type Patch = BlogPatch;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn partition(&self) -> &str {
        &self.language
    }

    fn position(&self) -> i32 {
        self.position
    }

    fn set_position(&mut self, position: i32) {
        self.position = position;
    }
}

impl ContentDraft for NewBlog {
    fn title(&self) -> &str {
        &self.title
    }

    fn partition(&self) -> &str {
        &self.language
    }

    fn position(&self) -> i32 {
        self.position
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn set_owner(&mut self, owner_id: Uuid) {
        self.owner_id = owner_id;
    }
}

impl ContentPatch<Blog> for BlogPatch {
    fn requested_position(&self) -> Option<i32> {
        self.position
    }

    fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn apply_to(self, blog: &mut Blog) {
        if let Some(title) = self.title {
            blog.title = title;
        }
        if let Some(content) = self.content {
            blog.content = content;
        }
        if let Some(position) = self.position {
            blog.position = position;
        }
        if let Some(status) = self.status {
            blog.status = status;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub price: f64,
    pub quantity: i32,
    pub position: i32,
    pub language: String,
    pub item_url: Option<String>,
    pub category: Option<String>,
    pub status: bool,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
    pub title: String,
    pub content: String,
    pub price: f64,
    pub quantity: i32,
    pub position: i32,
    pub language: String,
    pub item_url: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub status: bool,
    #[serde(skip)]
    pub owner_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i32>,
    pub position: Option<i32>,
    pub item_url: Option<String>,
    pub category: Option<String>,
    pub status: Option<bool>,
}

impl Orderable for Item {
    const KIND: ContentKind = ContentKind::Item;
    type Draft = NewItem;
    type Patch = ItemPatch;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn partition(&self) -> &str {
        &self.language
    }

    fn position(&self) -> i32 {
        self.position
    }

    fn set_position(&mut self, position: i32) {
        self.position = position;
    }
}

impl ContentDraft for NewItem {
    fn title(&self) -> &str {
        &self.title
    }

    fn partition(&self) -> &str {
        &self.language
    }

    fn position(&self) -> i32 {
        self.position
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn set_owner(&mut self, owner_id: Uuid) {
        self.owner_id = owner_id;
    }
}

impl ContentPatch<Item> for ItemPatch {
    fn requested_position(&self) -> Option<i32> {
        self.position
    }

    fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn apply_to(self, item: &mut Item) {
        if let Some(title) = self.title {
            item.title = title;
        }
        if let Some(content) = self.content {
            item.content = content;
        }
        if let Some(price) = self.price {
            item.price = price;
        }
        if let Some(quantity) = self.quantity {
            item.quantity = quantity;
        }
        if let Some(position) = self.position {
            item.position = position;
        }
        if let Some(item_url) = self.item_url {
            item.item_url = Some(item_url);
        }
        if let Some(category) = self.category {
            item.category = Some(category);
        }
        if let Some(status) = self.status {
            item.status = status;
        }
    }
}
