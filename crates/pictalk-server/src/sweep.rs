use std::sync::Arc;
use std::time::Duration;

use pictalk_core::{BlobStore, PictoError, PictoManager};
use pictalk_db::Database;
use pictalk_types::models::User;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Background task that removes orphaned pictos.
///
/// An orphan is a picto whose father vanished, typically because a create
/// raced with the deletion of its parent. Each orphan is deleted together
/// with its subtree and blobs.
pub async fn run_sweep_loop<B: BlobStore>(
    db: Arc<Database>,
    manager: Arc<PictoManager<Database, B>>,
    every: Duration,
) {
    let mut interval = tokio::time::interval(every);

    loop {
        interval.tick().await;

        match sweep_orphans(&db, &manager).await {
            Ok(count) => {
                if count > 0 {
                    info!("Sweep: removed {} orphaned picto trees", count);
                }
            }
            Err(e) => {
                warn!("Sweep error: {}", e);
            }
        }
    }
}

pub async fn sweep_orphans<B: BlobStore>(
    db: &Arc<Database>,
    manager: &PictoManager<Database, B>,
) -> anyhow::Result<usize> {
    let reader = db.clone();
    let orphans = tokio::task::spawn_blocking(move || reader.find_orphans()).await??;

    let mut swept = 0;
    for orphan in orphans {
        let parsed = (orphan.id.parse::<Uuid>(), orphan.user_id.parse::<Uuid>());
        let (Ok(id), Ok(user_id)) = parsed else {
            warn!("Corrupt orphan row '{}' (user '{}')", orphan.id, orphan.user_id);
            continue;
        };

        let reader = db.clone();
        let owner_id = orphan.user_id.clone();
        let owner =
            tokio::task::spawn_blocking(move || reader.get_user_by_id(&owner_id)).await??;
        let Some(owner) = owner else {
            warn!("Orphan {} belongs to unknown user {}", id, user_id);
            continue;
        };
        let user = User {
            id: user_id,
            username: owner.username,
        };

        match manager.delete_picto(id, &user).await {
            Ok(()) => swept += 1,
            Err(PictoError::NotFound) => debug!("Orphan {} already gone", id),
            Err(e) => warn!("Failed to sweep orphan {}: {}", id, e),
        }
    }

    Ok(swept)
}
