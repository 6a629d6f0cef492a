use pictalk_types::models::Picto;
use uuid::Uuid;

use crate::error::StoreResult;

/// Parent component of a [`PictoFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parent {
    #[default]
    Any,
    /// Only pictos without a father.
    Root,
    Of(Uuid),
}

/// Equality filter over picto records.
///
/// There is no way to build a filter without an owner, so every store query
/// is scoped to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictoFilter {
    user_id: Uuid,
    id: Option<Uuid>,
    parent: Parent,
    collection_id: Option<Uuid>,
}

impl PictoFilter {
    pub fn owned_by(user_id: Uuid) -> Self {
        Self {
            user_id,
            id: None,
            parent: Parent::Any,
            collection_id: None,
        }
    }

    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn children_of(mut self, father_id: Uuid) -> Self {
        self.parent = Parent::Of(father_id);
        self
    }

    pub fn root(mut self) -> Self {
        self.parent = Parent::Root;
        self
    }

    pub fn parent(mut self, parent: Parent) -> Self {
        self.parent = parent;
        self
    }

    pub fn collection(mut self, collection_id: Uuid) -> Self {
        self.collection_id = Some(collection_id);
        self
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn id_filter(&self) -> Option<Uuid> {
        self.id
    }

    pub fn parent_filter(&self) -> Parent {
        self.parent
    }

    pub fn collection_filter(&self) -> Option<Uuid> {
        self.collection_id
    }

    /// In-process evaluation, for backends that cannot push the filter down.
    pub fn matches(&self, picto: &Picto) -> bool {
        if picto.user_id != self.user_id {
            return false;
        }
        if self.id.is_some_and(|id| id != picto.id) {
            return false;
        }
        let parent_ok = match self.parent {
            Parent::Any => true,
            Parent::Root => picto.father_id.is_none(),
            Parent::Of(father) => picto.father_id == Some(father),
        };
        parent_ok
            && self
                .collection_id
                .is_none_or(|c| picto.collection_id == Some(c))
    }
}

/// A picto that has not been persisted yet; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewPicto {
    pub speech: String,
    pub meaning: String,
    pub folder: bool,
    pub father_id: Option<Uuid>,
    pub path: String,
    pub user_id: Uuid,
    pub collection_id: Option<Uuid>,
}

impl NewPicto {
    pub fn into_picto(self, id: Uuid) -> Picto {
        Picto {
            id,
            speech: self.speech,
            meaning: self.meaning,
            folder: self.folder,
            father_id: self.father_id,
            path: self.path,
            user_id: self.user_id,
            collection_id: self.collection_id,
        }
    }
}

/// Durable storage of picto records.
///
/// Implementations are synchronous; the manager moves calls off the async
/// runtime. Deletes and updates are scoped by id and owner and report the
/// number of rows they touched so callers can detect a vanished record.
pub trait TreeStore: Send + Sync {
    fn create(&self, record: NewPicto) -> StoreResult<Picto>;

    fn find_one(&self, filter: &PictoFilter) -> StoreResult<Option<Picto>>;

    /// All matches, in no particular order.
    fn find_many(&self, filter: &PictoFilter) -> StoreResult<Vec<Picto>>;

    /// Overwrite `speech`, `meaning`, `folder`, `father_id` and `path` of the
    /// record matching `picto.id` and `picto.user_id`.
    fn update(&self, picto: &Picto) -> StoreResult<usize>;

    fn delete_one(&self, id: Uuid, user_id: Uuid) -> StoreResult<usize>;

    fn delete_many(&self, filter: &PictoFilter) -> StoreResult<usize>;
}
