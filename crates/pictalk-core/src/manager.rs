use std::collections::HashSet;
use std::sync::Arc;

use pictalk_types::api::{CreatePictoRequest, EditPictoRequest};
use pictalk_types::models::{Collection, Picto, PictoView, User};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::blob::BlobStore;
use crate::error::{PictoError, StoreError, StoreResult};
use crate::store::{NewPicto, Parent, PictoFilter, TreeStore};

type Result<T> = std::result::Result<T, PictoError>;

/// Tree operations over a user's pictos, keeping records and blobs in step.
///
/// Blob removals are dispatched as background tasks and never awaited by the
/// operation that issued them: a failed removal shows up in the logs only.
/// Record deletion is strict per node. Subtree deletion is not transactional,
/// so a failure part-way leaves the already-removed nodes removed.
pub struct PictoManager<T, B> {
    tree: Arc<T>,
    blobs: Arc<B>,
    bucket: String,
    removals: TaskTracker,
}

impl<T, B> PictoManager<T, B>
where
    T: TreeStore + 'static,
    B: BlobStore,
{
    pub fn new(tree: Arc<T>, blobs: Arc<B>, bucket: impl Into<String>) -> Self {
        Self {
            tree,
            blobs,
            bucket: bucket.into(),
            removals: TaskTracker::new(),
        }
    }

    /// Direct children of `parent` (roots when `None`), optionally narrowed to
    /// one collection, projected without `id` and `userId`.
    pub async fn get_pictos(
        &self,
        parent: Option<Uuid>,
        user: &User,
        collection: Option<Uuid>,
    ) -> Result<Vec<PictoView>> {
        let mut filter = PictoFilter::owned_by(user.id).parent(match parent {
            Some(father_id) => Parent::Of(father_id),
            None => Parent::Root,
        });
        if let Some(collection_id) = collection {
            filter = filter.collection(collection_id);
        }

        let pictos = self.with_tree(move |t| t.find_many(&filter)).await?;
        Ok(pictos.into_iter().map(PictoView::from).collect())
    }

    /// Persist a picto whose image was already uploaded under `blob_key`.
    ///
    /// A child inherits its parent's collection when none is given; a root
    /// must name one. A collection owned by someone else is treated as
    /// absent.
    pub async fn create_picto(
        &self,
        input: CreatePictoRequest,
        user: &User,
        blob_key: &str,
        collection: Option<&Collection>,
    ) -> Result<Picto> {
        self.ensure_bucket().await?;

        if collection.is_some_and(|c| c.user_id != user.id) {
            return Err(PictoError::NotFound);
        }
        let collection = collection.map(|c| c.id);

        let collection_id = match input.father_id {
            Some(father_id) => {
                let father = self.find(father_id, user).await?.ok_or(PictoError::NotFound)?;
                if !father.folder {
                    return Err(PictoError::InvalidTree(format!(
                        "parent {} is not a folder",
                        father_id
                    )));
                }
                // the father is owner-scoped, so an inherited collection is the user's too
                if collection.is_some()
                    && father.collection_id.is_some()
                    && collection != father.collection_id
                {
                    return Err(PictoError::InvalidTree(format!(
                        "parent {} belongs to another collection",
                        father_id
                    )));
                }
                collection.or(father.collection_id)
            }
            None => Some(collection.ok_or_else(|| {
                PictoError::InvalidTree("a root picto needs a collection".into())
            })?),
        };

        let record = NewPicto {
            speech: input.speech.clone(),
            meaning: input.meaning.clone(),
            folder: input.folder,
            father_id: input.father_id,
            path: blob_key.to_string(),
            user_id: user.id,
            collection_id,
        };

        match self.with_tree(move |t| t.create(record)).await {
            Ok(picto) => {
                info!("Picto {} created by {}", picto.id, user.username);
                Ok(picto)
            }
            Err(e) => {
                error!(
                    "Failed to create a picto for user \"{}\". Data: {}: {}",
                    user.username,
                    serde_json::to_string(&input).unwrap_or_default(),
                    e
                );
                Err(PictoError::Internal)
            }
        }
    }

    /// Replace the mutable fields of a picto. A new `blob_key` replaces the
    /// image; the previous blob is scheduled for removal.
    pub async fn edit_picto(
        &self,
        id: Uuid,
        input: EditPictoRequest,
        user: &User,
        blob_key: Option<&str>,
    ) -> Result<Picto> {
        let mut picto = self.find(id, user).await?.ok_or(PictoError::NotFound)?;

        if input.father_id != picto.father_id {
            match input.father_id {
                Some(father_id) => self.check_new_father(&picto, father_id, user).await?,
                None if picto.collection_id.is_none() => {
                    return Err(PictoError::InvalidTree(
                        "a root picto needs a collection".into(),
                    ));
                }
                None => {}
            }
        }

        if picto.folder && !input.folder {
            let filter = PictoFilter::owned_by(user.id).children_of(id);
            if self.with_tree(move |t| t.find_one(&filter)).await?.is_some() {
                return Err(PictoError::InvalidTree(format!(
                    "picto {} still has children",
                    id
                )));
            }
        }

        picto.speech = input.speech;
        picto.meaning = input.meaning;
        picto.folder = input.folder;
        picto.father_id = input.father_id;
        let replaced = blob_key
            .filter(|key| *key != picto.path)
            .map(|key| std::mem::replace(&mut picto.path, key.to_string()));

        let updated = picto.clone();
        if self.with_tree(move |t| t.update(&updated)).await? == 0 {
            return Err(PictoError::NotFound);
        }

        if let Some(old_path) = replaced {
            self.remove_blob_later(old_path);
        }
        Ok(picto)
    }

    /// Delete a picto and every picto below it.
    pub async fn delete_picto(&self, id: Uuid, user: &User) -> Result<()> {
        let picto = self.find(id, user).await?.ok_or(PictoError::NotFound)?;
        let removed = self.delete_subtree(picto, user).await?;
        info!(
            "Deleted {} picto(s) under {} for user \"{}\"",
            removed, id, user.username
        );
        Ok(())
    }

    /// Work-list traversal: each node has its blob removal dispatched, its
    /// children collected, then its own record deleted. A node whose record is
    /// already gone aborts the traversal with `NotFound`. Sibling order is
    /// unspecified.
    async fn delete_subtree(&self, root: Picto, user: &User) -> Result<usize> {
        let user_id = user.id;
        let mut pending = vec![root];
        let mut removed = 0;

        while let Some(node) = pending.pop() {
            self.remove_blob_later(node.path.clone());

            let node_id = node.id;
            let (children, affected) = self
                .with_tree(move |t| {
                    let filter = PictoFilter::owned_by(user_id).children_of(node_id);
                    let children = t.find_many(&filter)?;
                    let affected = t.delete_one(node_id, user_id)?;
                    Ok((children, affected))
                })
                .await?;

            if affected == 0 {
                return Err(PictoError::NotFound);
            }
            removed += affected;
            pending.extend(children);
        }

        Ok(removed)
    }

    /// Delete every picto of a collection, including descendants that are not
    /// themselves tagged with it. Any store failure along the way is logged
    /// and reported as `Internal`.
    pub async fn delete_picto_of_collection(&self, collection: Uuid, user: &User) -> Result<()> {
        match self.purge_collection(collection, user.id).await {
            Ok(removed) => {
                info!(
                    "Deleted {} picto(s) of collection {} for user \"{}\"",
                    removed, collection, user.username
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    "Failed to delete pictos of collection {} for user \"{}\": {}",
                    collection, user.username, e
                );
                Err(PictoError::Internal)
            }
        }
    }

    async fn purge_collection(&self, collection: Uuid, user_id: Uuid) -> Result<usize> {
        let tagged_filter = PictoFilter::owned_by(user_id).collection(collection);
        let tagged = {
            let filter = tagged_filter.clone();
            self.with_tree(move |t| t.find_many(&filter)).await?
        };

        let mut seen: HashSet<Uuid> = tagged.iter().map(|p| p.id).collect();
        let mut pending: Vec<Uuid> = seen.iter().copied().collect();
        let mut stray = Vec::new();
        while let Some(father_id) = pending.pop() {
            let filter = PictoFilter::owned_by(user_id).children_of(father_id);
            for child in self.with_tree(move |t| t.find_many(&filter)).await? {
                if seen.insert(child.id) {
                    pending.push(child.id);
                    stray.push(child);
                }
            }
        }

        for picto in tagged.iter().chain(stray.iter()) {
            self.remove_blob_later(picto.path.clone());
        }

        let stray_ids: Vec<Uuid> = stray.iter().map(|p| p.id).collect();
        self.with_tree(move |t| {
            let mut removed = t.delete_many(&tagged_filter)?;
            for id in stray_ids {
                removed += t.delete_one(id, user_id)?;
            }
            Ok(removed)
        })
        .await
    }

    /// `false` both for a missing picto and for a picto that is not a folder.
    pub async fn is_folder(&self, id: Uuid, user: &User) -> Result<bool> {
        Ok(self.find(id, user).await?.is_some_and(|p| p.folder))
    }

    pub async fn get_collection(&self, id: Uuid, user: &User) -> Result<Collection> {
        let picto = self.find(id, user).await?.ok_or(PictoError::NotFound)?;
        let collection_id = picto.collection_id.ok_or(PictoError::NotFound)?;
        Ok(Collection {
            id: collection_id,
            user_id: user.id,
        })
    }

    /// Wait until every blob removal dispatched so far has finished.
    pub async fn flush_blob_removals(&self) {
        self.removals.close();
        self.removals.wait().await;
        self.removals.reopen();
    }

    async fn ensure_bucket(&self) -> Result<()> {
        match self.blobs.exists(&self.bucket).await {
            Ok(true) => {
                debug!("Bucket {} exists", self.bucket);
                Ok(())
            }
            Ok(false) => Err(StoreError::Unavailable(format!(
                "bucket {} does not exist",
                self.bucket
            ))
            .into()),
            Err(e) => {
                error!("Blob store unreachable: {}", e);
                Err(StoreError::Unavailable(e.to_string()).into())
            }
        }
    }

    /// Reject re-parenting that would leave the forest: the new father must be
    /// a folder in the same collection and must not sit below the picto.
    async fn check_new_father(&self, picto: &Picto, father_id: Uuid, user: &User) -> Result<()> {
        if father_id == picto.id {
            return Err(PictoError::InvalidTree(format!(
                "picto {} cannot be its own parent",
                picto.id
            )));
        }

        let father = self.find(father_id, user).await?.ok_or(PictoError::NotFound)?;
        if !father.folder {
            return Err(PictoError::InvalidTree(format!(
                "parent {} is not a folder",
                father_id
            )));
        }
        if father.collection_id != picto.collection_id {
            return Err(PictoError::InvalidTree(format!(
                "parent {} belongs to another collection",
                father_id
            )));
        }

        let mut visited = HashSet::new();
        let mut cursor = father.father_id;
        while let Some(ancestor) = cursor {
            if ancestor == picto.id {
                return Err(PictoError::InvalidTree(format!(
                    "parent {} is a descendant of {}",
                    father_id, picto.id
                )));
            }
            if !visited.insert(ancestor) {
                break;
            }
            cursor = self.find(ancestor, user).await?.and_then(|p| p.father_id);
        }
        Ok(())
    }

    async fn find(&self, id: Uuid, user: &User) -> Result<Option<Picto>> {
        let filter = PictoFilter::owned_by(user.id).id(id);
        self.with_tree(move |t| t.find_one(&filter)).await
    }

    fn remove_blob_later(&self, key: String) {
        let blobs = Arc::clone(&self.blobs);
        self.removals.spawn(async move {
            match blobs.remove(&key).await {
                Ok(()) => debug!("Picto of path \"{}\" successfully deleted", key),
                Err(e) => info!("Could not delete picto of path \"{}\": {}", key, e),
            }
        });
    }

    /// Run a blocking store call off the async runtime.
    async fn with_tree<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&T) -> StoreResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let tree = Arc::clone(&self.tree);
        tokio::task::spawn_blocking(move || f(&tree))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                PictoError::Internal
            })?
            .map_err(PictoError::from)
    }
}
